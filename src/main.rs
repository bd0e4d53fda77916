#![forbid(unsafe_code)]

//! pscue — management CLI for the completion and prediction module.
//!
//! CLI entry point: parses arguments, dispatches subcommands, renders
//! output. Learned-data operations go through [`LearningHost`]; every
//! subcommand supports `--json` for machine consumption.

use std::path::PathBuf;

use clap::{CommandFactory, Parser};
use colored::Colorize;
use tracing_subscriber::EnvFilter;

use pscue::catalog::dynamic::ProbeContext;
use pscue::config::CueConfig;
use pscue::engine::parse_cursor;
use pscue::host::LearningHost;
use pscue::snapshot::ImportMode;

/// pscue — shell completion and inline prediction that learns from your
/// command history.
#[derive(Parser, Debug)]
#[command(
    name = "pscue",
    version = long_version(),
    about,
    long_about = None,
)]
struct Cli {
    /// Show detailed progress.
    #[arg(long, global = true)]
    verbose: bool,

    /// Show everything including per-record detail.
    #[arg(long, global = true)]
    trace: bool,

    /// Output as JSON for machine consumption.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand, Debug)]
enum Command {
    /// View learned data for a command, or list all known commands.
    Show {
        /// Command-key to inspect (e.g. "git commit").
        command: Option<String>,
    },

    /// Clear learned data.
    Clear {
        /// Only clear this command-key.
        command: Option<String>,

        /// Clear workflow transitions instead of command knowledge.
        #[arg(long)]
        workflows: bool,
    },

    /// Export learned data to a JSON document.
    Export {
        /// Destination file.
        file: PathBuf,
    },

    /// Import learned data from a JSON document.
    Import {
        /// Source file.
        file: PathBuf,

        /// Add counts into existing data instead of replacing it.
        #[arg(long)]
        merge: bool,
    },

    /// Force an immediate save of pending learned data.
    Save,

    /// List learned workflow transitions.
    Workflows,

    /// Query the persisted command history.
    History {
        /// Maximum entries to show.
        #[arg(long, default_value = "20")]
        limit: usize,
    },

    /// Diagnostics summary of module state.
    Status,

    /// Run the inline predictor once (debugging aid).
    Predict {
        /// The partial command line.
        line: String,
    },

    /// Run the completion engine once (debugging aid).
    Complete {
        /// Word being completed (may be empty).
        word: String,
        /// Command line up to the cursor.
        line: String,
        /// Cursor position.
        cursor: String,
    },

    /// Smart directory-navigation candidates for a word.
    Navigate {
        /// The (possibly partial or misspelled) directory word.
        word: String,

        /// Print only the best existing match, for `cd` redirection.
        #[arg(long)]
        best: bool,
    },

    /// Print the shell-side registration snippet.
    Register,

    /// Generate shell completions for the pscue CLI itself.
    Completions {
        /// Shell to generate completions for (bash, zsh, fish, powershell).
        shell: clap_complete::Shell,
    },
}

/// Build the long version string with embedded build metadata.
///
/// vergen-gix always emits these env vars (uses placeholders when values
/// are unavailable), so `env!()` is safe here.
fn long_version() -> &'static str {
    concat!(
        env!("CARGO_PKG_VERSION"),
        " (",
        env!("VERGEN_GIT_SHA"),
        " ",
        env!("VERGEN_BUILD_TIMESTAMP"),
        " ",
        env!("VERGEN_CARGO_TARGET_TRIPLE"),
        ")",
    )
}

/// Initialize the tracing subscriber based on CLI flags.
///
/// Priority: `--trace` > `--verbose` > `PSCUE_DEBUG` > `RUST_LOG` > warn.
fn init_tracing(cli: &Cli) {
    let filter = if cli.trace {
        EnvFilter::new("pscue=trace")
    } else if cli.verbose || std::env::var("PSCUE_DEBUG").is_ok_and(|v| !v.is_empty() && v != "0")
    {
        EnvFilter::new("pscue=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(&cli);

    let exit_code = match run(&cli) {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("{} {e}", "error:".red().bold());
            1
        }
    };
    std::process::exit(exit_code);
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    // Completions and the registration snippet need no host or store.
    match &cli.command {
        Command::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(*shell, &mut cmd, "pscue", &mut std::io::stdout());
            return Ok(());
        }
        Command::Register => {
            print!("{}", registration_snippet());
            return Ok(());
        }
        _ => {}
    }

    let host = LearningHost::init(CueConfig::from_env());

    match &cli.command {
        Command::Show { command } => show(&host, command.as_deref(), cli.json)?,
        Command::Clear { command, workflows } => {
            host.clear(command.as_deref(), *workflows)?;
            let target = match (command, workflows) {
                (_, true) => "workflow transitions".to_string(),
                (Some(cmd), _) => format!("learned data for '{cmd}'"),
                (None, _) => "all learned data".to_string(),
            };
            if cli.json {
                println!(r#"{{"cleared":true}}"#);
            } else {
                println!("Cleared {target}.");
            }
        }
        Command::Export { file } => {
            host.save()?;
            host.export(file)?;
            if cli.json {
                println!(r#"{{"exported":"{}"}}"#, file.display());
            } else {
                println!("Exported learned data to {}.", file.display().to_string().cyan());
            }
        }
        Command::Import { file, merge } => {
            let mode = if *merge {
                ImportMode::Merge
            } else {
                ImportMode::Replace
            };
            host.import(file, mode)?;
            if cli.json {
                println!(r#"{{"imported":"{}","merged":{merge}}}"#, file.display());
            } else {
                println!(
                    "Imported learned data from {} ({}).",
                    file.display().to_string().cyan(),
                    if *merge { "merged" } else { "replaced" }
                );
            }
        }
        Command::Save => {
            let flushed = host.save()?;
            if cli.json {
                println!(r#"{{"flushed":{flushed}}}"#);
            } else {
                println!("Saved {flushed} pending change(s).");
            }
        }
        Command::Workflows => workflows(&host, cli.json)?,
        Command::History { limit } => history(&host, *limit, cli.json)?,
        Command::Status => status(&host, cli.json)?,
        Command::Predict { line } => {
            let ctx = ProbeContext::default();
            match host.predict(line, &ctx) {
                Some(prediction) if cli.json => {
                    println!(
                        r#"{{"line":{},"score":{:.3}}}"#,
                        serde_json::to_string(&prediction.line)?,
                        prediction.score
                    );
                }
                Some(prediction) => println!("{}", prediction.line),
                None if cli.json => println!("null"),
                None => {}
            }
        }
        Command::Complete { word, line, cursor } => {
            let Some(cursor) = parse_cursor(cursor) else {
                anyhow::bail!("cursor must be a non-negative integer");
            };
            let line: String = line.chars().take(cursor).collect();
            let ctx = ProbeContext::default();
            let results = host.complete(&line, word, true, &ctx);
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&results_json(&results))?);
            } else {
                for candidate in results {
                    let tooltip = candidate.tooltip.as_deref().unwrap_or(&candidate.text);
                    println!("{}|{}", candidate.text, tooltip);
                }
            }
        }
        Command::Navigate { word, best } => {
            let cwd = std::env::current_dir()?;
            if *best {
                match host.navigate_best_match(word, &cwd) {
                    Some(path) if cli.json => {
                        println!(r#"{{"path":{}}}"#, serde_json::to_string(&path.display().to_string())?);
                    }
                    Some(path) => println!("{}", path.display()),
                    None if cli.json => println!("null"),
                    None => {}
                }
            } else {
                let candidates = host.navigate(word, &cwd);
                if cli.json {
                    println!("{}", serde_json::to_string_pretty(&candidates)?);
                } else {
                    for c in candidates {
                        println!("{:<40} {:>6.3}  {}", c.relative_path, c.score, c.tooltip.dimmed());
                    }
                }
            }
        }
        Command::Register | Command::Completions { .. } => unreachable!("handled above"),
    }
    Ok(())
}

fn results_json(results: &[pscue::catalog::Candidate]) -> Vec<serde_json::Value> {
    results
        .iter()
        .map(|c| {
            serde_json::json!({
                "text": c.text,
                "tooltip": c.tooltip,
            })
        })
        .collect()
}

fn show(host: &LearningHost, command: Option<&str>, json: bool) -> anyhow::Result<()> {
    match command {
        Some(key) => {
            let knowledge = host.show(key)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&knowledge)?);
                return Ok(());
            }
            println!(
                "{} — used {} time(s)",
                knowledge.command_key.bold(),
                knowledge.total_usage
            );
            let mut arguments: Vec<_> = knowledge.arguments.values().collect();
            arguments.sort_by(|a, b| b.usage_count.cmp(&a.usage_count));
            for arg in arguments {
                println!(
                    "  {:<30} {:>6}x  last used {}",
                    arg.argument,
                    arg.usage_count,
                    format_timestamp(arg.last_used).dimmed()
                );
            }
        }
        None => {
            let commands = host.known_commands();
            if json {
                println!("{}", serde_json::to_string_pretty(&commands)?);
                return Ok(());
            }
            if commands.is_empty() {
                println!("No learned data yet. Use your shell; pscue will learn.");
                return Ok(());
            }
            for key in commands {
                println!("{key}");
            }
        }
    }
    Ok(())
}

fn workflows(host: &LearningHost, json: bool) -> anyhow::Result<()> {
    let transitions = host.workflows();
    if json {
        println!("{}", serde_json::to_string_pretty(&transitions)?);
        return Ok(());
    }
    if transitions.is_empty() {
        println!("No workflow transitions learned yet.");
        return Ok(());
    }
    for t in transitions {
        println!(
            "{} {} {}  {:>4}x  confidence {:.2}  avg gap {}",
            t.from_key.bold(),
            "→".dimmed(),
            t.to_key.bold(),
            t.frequency,
            t.confidence,
            format_millis(t.mean_delta_ms).dimmed()
        );
    }
    Ok(())
}

fn history(host: &LearningHost, limit: usize, json: bool) -> anyhow::Result<()> {
    let entries = host.persisted_history(limit)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }
    for entry in entries {
        let marker = if entry.success {
            "✓".green()
        } else {
            "✗".red()
        };
        println!(
            "{marker} {}  {}  {}",
            format_timestamp(entry.timestamp).dimmed(),
            entry.command_line,
            entry.working_directory.dimmed()
        );
    }
    Ok(())
}

fn status(host: &LearningHost, json: bool) -> anyhow::Result<()> {
    let status = host.status();
    if json {
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }
    println!("{}", "pscue module status".bold());
    println!("  commands learned:     {}", status.command_count);
    println!("  history entries:      {}", status.history_len);
    println!("  workflow transitions: {}", status.transition_count);
    println!("  pending changes:      {}", status.pending_delta);
    println!("  catalogue nodes:      {}", status.catalog_nodes);
    match &status.store_path {
        Some(path) => println!("  store:                {}", path.display()),
        None => println!("  store:                {}", "unavailable (memory only)".red()),
    }
    if let Some(quarantined) = &status.quarantined_store {
        println!(
            "  {} corrupt store moved to {}",
            "note:".yellow(),
            quarantined.display()
        );
    }
    match status.last_save_at {
        Some(at) => println!("  last save:            {}", format_timestamp(at)),
        None => println!("  last save:            (not yet this session)"),
    }
    if status.learning_disabled {
        println!("  {} learning disabled via PSCUE_DISABLE_LEARNING", "note:".yellow());
    }
    Ok(())
}

/// PowerShell registration snippet: argument completers for every
/// catalogued command plus the predictor/feedback hooks.
fn registration_snippet() -> String {
    let commands = [
        "git", "gt", "wt", "claude", "docker", "kubectl", "npm", "cargo", "gh", "dotnet", "az",
    ];
    let mut out = String::new();
    out.push_str("# pscue shell registration — add to your PowerShell profile\n");
    out.push_str(&format!(
        "$commands = @({})\n",
        commands
            .iter()
            .map(|c| format!("'{c}'"))
            .collect::<Vec<_>>()
            .join(", ")
    ));
    out.push_str(
        "foreach ($command in $commands) {\n\
         \x20   Register-ArgumentCompleter -Native -CommandName $command -ScriptBlock {\n\
         \x20       param($wordToComplete, $commandAst, $cursorPosition)\n\
         \x20       pscue-complete $wordToComplete \"$commandAst\" $cursorPosition | ForEach-Object {\n\
         \x20           $text, $tooltip = $_ -split '\\|', 2\n\
         \x20           [System.Management.Automation.CompletionResult]::new(\n\
         \x20               $text, $text, 'ParameterValue', $tooltip)\n\
         \x20       }\n\
         \x20   }\n\
         }\n",
    );
    out
}

fn format_timestamp(epoch_ms: i64) -> String {
    chrono::DateTime::from_timestamp_millis(epoch_ms)
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| epoch_ms.to_string())
}

fn format_millis(ms: i64) -> String {
    if ms >= 60_000 {
        format!("{:.1}min", ms as f64 / 60_000.0)
    } else if ms >= 1000 {
        format!("{:.1}s", ms as f64 / 1000.0)
    } else {
        format!("{ms}ms")
    }
}
