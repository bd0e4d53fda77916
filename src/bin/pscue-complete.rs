#![forbid(unsafe_code)]

//! pscue-complete — the short-lived tab-completion front end.
//!
//! Invoked by the shell's argument completer with exactly three positional
//! arguments: the word to complete, the command line up to the cursor, and
//! the cursor position. Prints one `completion_text|tooltip_text` line per
//! candidate. Exit code 0 on success, 1 on internal error; silent on any
//! other argument count.
//!
//! No clap here: the contract is fixed, the process must cold-start in
//! single-digit milliseconds, and there is nothing to parse beyond argv.

use std::io::Write;
use std::sync::Arc;

use pscue::catalog::Catalog;
use pscue::catalog::dynamic::ProbeContext;
use pscue::engine::{CompletionEngine, parse_cursor};

fn main() {
    // Completion output goes to stdout; diagnostics must stay on stderr.
    if std::env::var("PSCUE_DEBUG").is_ok_and(|v| !v.is_empty() && v != "0") {
        tracing_subscriber::fmt()
            .with_env_filter("pscue=debug")
            .with_writer(std::io::stderr)
            .init();
    }

    let args: Vec<String> = std::env::args().skip(1).collect();
    let [word_to_complete, command_ast, cursor_position] = args.as_slice() else {
        // Wrong arity: stay silent so the shell shows nothing odd.
        return;
    };

    let exit_code = match run(word_to_complete, command_ast, cursor_position) {
        Ok(()) => 0,
        Err(e) => {
            tracing::error!(error = %e, "completion failed");
            1
        }
    };
    std::process::exit(exit_code);
}

fn run(word_to_complete: &str, command_ast: &str, cursor_position: &str) -> anyhow::Result<()> {
    let Some(cursor) = parse_cursor(cursor_position) else {
        // Malformed input: no completions, but not an error either.
        return Ok(());
    };

    // The shell may hand us the full line; cut at the cursor.
    let line: String = command_ast.chars().take(cursor).collect();

    let engine = CompletionEngine::new(Arc::new(Catalog::builtin()));
    let ctx = ProbeContext::default();
    let completions = engine.get_completions(&line, word_to_complete, true, &ctx);

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    for candidate in completions {
        let tooltip = candidate.tooltip.as_deref().unwrap_or(&candidate.text);
        writeln!(out, "{}|{}", candidate.text, tooltip)?;
    }
    Ok(())
}
