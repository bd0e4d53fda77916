//! The built-in command trees.
//!
//! This is the static allow-list of tools pscue completes for: version
//! control, container tooling, cloud CLIs, package managers, and directory
//! navigation. Adding a command means adding a tree here and rebuilding.
//!
//! The trees cover the commonly used surface of each tool, not its entire
//! manual. Arguments that can only be known at request time (branches,
//! containers, scripts, directories) are wired to [`DynamicSource`] probes.

use super::builder::{CatalogBuilder, CommandBuilder, command, parameter};
use super::dynamic::DynamicSource;
use super::{Argument, Catalog};

/// Build the full built-in catalogue.
pub fn build() -> Catalog {
    CatalogBuilder::new()
        .command(git())
        .command(graphite())
        .command(worktrunk())
        .command(claude())
        .command(docker())
        .command(kubectl())
        .command(npm())
        .command(cargo())
        .command(gh())
        .command(dotnet())
        .command(az())
        .command(navigation("cd"))
        .command(navigation("set-location").alias("sl"))
        .command(navigation("chdir"))
        .build()
}

fn git() -> CommandBuilder {
    command("git")
        .tooltip("distributed version control")
        .subcommand(
            command("status")
                .tooltip("show the working tree status")
                .parameter(parameter("--short").alias("-s"))
                .parameter(parameter("--branch").alias("-b")),
        )
        .subcommand(
            command("add")
                .tooltip("add file contents to the index")
                .parameter(parameter("--all").alias("-A"))
                .parameter(parameter("--patch").alias("-p"))
                .parameter(parameter("--update").alias("-u")),
        )
        .subcommand(
            command("commit")
                .tooltip("record changes to the repository")
                .parameter(
                    parameter("--message")
                        .alias("-m")
                        .requires_value()
                        .tooltip("commit message"),
                )
                .parameter(parameter("--all").alias("-a").tooltip("stage modified files"))
                .parameter(parameter("--amend").tooltip("amend the previous commit"))
                .parameter(parameter("--no-verify").tooltip("skip pre-commit hooks"))
                .parameter(parameter("--signoff").alias("-s")),
        )
        .subcommand(
            command("push")
                .tooltip("update remote refs")
                .parameter(parameter("--force").alias("-f"))
                .parameter(
                    parameter("--set-upstream")
                        .alias("-u")
                        .requires_value()
                        .dynamic(DynamicSource::GitRemotes),
                )
                .parameter(parameter("--tags"))
                .parameter(parameter("--dry-run")),
        )
        .subcommand(
            command("pull")
                .tooltip("fetch and integrate")
                .parameter(parameter("--rebase"))
                .parameter(parameter("--ff-only")),
        )
        .subcommand(
            command("fetch")
                .parameter(parameter("--all"))
                .parameter(parameter("--prune").alias("-p"))
                .dynamic(DynamicSource::GitRemotes),
        )
        .subcommand(
            command("checkout")
                .tooltip("switch branches or restore files")
                .parameter(
                    parameter("-b")
                        .requires_value()
                        .tooltip("create a new branch"),
                )
                .dynamic(DynamicSource::GitBranches),
        )
        .subcommand(
            command("switch")
                .tooltip("switch branches")
                .parameter(parameter("--create").alias("-c").requires_value())
                .dynamic(DynamicSource::GitBranches),
        )
        .subcommand(
            command("branch")
                .tooltip("list, create, or delete branches")
                .parameter(parameter("--delete").alias("-d"))
                .parameter(parameter("--all").alias("-a"))
                .parameter(parameter("--move").alias("-m"))
                .dynamic(DynamicSource::GitBranches),
        )
        .subcommand(
            command("merge")
                .parameter(parameter("--no-ff"))
                .parameter(parameter("--squash"))
                .parameter(parameter("--abort"))
                .dynamic(DynamicSource::GitBranches),
        )
        .subcommand(
            command("rebase")
                .parameter(parameter("--interactive").alias("-i"))
                .parameter(parameter("--continue"))
                .parameter(parameter("--abort"))
                .parameter(parameter("--onto").requires_value())
                .dynamic(DynamicSource::GitBranches),
        )
        .subcommand(
            command("log")
                .parameter(parameter("--oneline"))
                .parameter(parameter("--graph"))
                .parameter(parameter("--all"))
                .parameter(parameter("--max-count").alias("-n").requires_value()),
        )
        .subcommand(
            command("diff")
                .parameter(parameter("--staged"))
                .parameter(parameter("--stat")),
        )
        .subcommand(
            command("stash")
                .subcommand(command("push").parameter(parameter("--message").alias("-m").requires_value()))
                .subcommand(command("pop"))
                .subcommand(command("list"))
                .subcommand(command("apply"))
                .subcommand(command("drop")),
        )
        .subcommand(
            command("reset")
                .parameter(parameter("--hard"))
                .parameter(parameter("--soft"))
                .parameter(parameter("--mixed")),
        )
        .subcommand(
            command("remote")
                .subcommand(command("add"))
                .subcommand(command("remove").dynamic(DynamicSource::GitRemotes))
                .subcommand(command("show").dynamic(DynamicSource::GitRemotes))
                .parameter(parameter("--verbose").alias("-v")),
        )
        .subcommand(
            command("clone")
                .parameter(parameter("--depth").requires_value())
                .parameter(parameter("--branch").alias("-b").requires_value()),
        )
        .subcommand(
            command("tag")
                .parameter(parameter("--delete").alias("-d"))
                .parameter(parameter("--list").alias("-l")),
        )
        .subcommand(command("init"))
}

/// Graphite stacked-PR CLI.
fn graphite() -> CommandBuilder {
    command("gt")
        .tooltip("Graphite — stacked pull requests")
        .subcommand(
            command("create")
                .alias("c")
                .tooltip("create a new branch in the stack")
                .parameter(parameter("--message").alias("-m").requires_value())
                .parameter(parameter("--all").alias("-a")),
        )
        .subcommand(
            command("submit")
                .alias("s")
                .tooltip("submit the stack as pull requests")
                .parameter(parameter("--stack"))
                .parameter(parameter("--draft").alias("-d")),
        )
        .subcommand(
            command("sync")
                .tooltip("pull trunk and restack")
                .parameter(parameter("--force").alias("-f")),
        )
        .subcommand(command("checkout").alias("co").dynamic(DynamicSource::GitBranches))
        .subcommand(command("log").parameter(parameter("--stack").alias("-s")))
        .subcommand(command("restack"))
        .subcommand(
            command("modify")
                .alias("m")
                .parameter(parameter("--all").alias("-a"))
                .parameter(parameter("--commit").alias("-c")),
        )
}

/// Worktrunk git-worktree manager.
fn worktrunk() -> CommandBuilder {
    command("wt")
        .tooltip("git worktree manager")
        .subcommand(command("list").alias("ls").tooltip("list worktrees"))
        .subcommand(
            command("switch")
                .alias("sw")
                .tooltip("switch to a worktree")
                .dynamic(DynamicSource::GitBranches),
        )
        .subcommand(
            command("spawn")
                .alias("sp")
                .tooltip("create a worktree for a branch")
                .parameter(parameter("--branch").alias("-b").requires_value())
                .parameter(parameter("--path").requires_value()),
        )
        .subcommand(command("merge").dynamic(DynamicSource::GitBranches))
        .subcommand(command("remove").alias("rm").dynamic(DynamicSource::GitBranches))
}

fn claude() -> CommandBuilder {
    command("claude")
        .tooltip("Claude Code CLI")
        .subcommand(
            command("plugin")
                .tooltip("manage plugins")
                .subcommand(command("install").tooltip("install a plugin"))
                .subcommand(command("list"))
                .subcommand(command("remove")),
        )
        .subcommand(
            command("mcp")
                .tooltip("manage MCP servers")
                .subcommand(command("add"))
                .subcommand(command("list"))
                .subcommand(command("remove")),
        )
        .subcommand(
            command("config")
                .subcommand(command("get"))
                .subcommand(command("set"))
                .subcommand(command("list")),
        )
        .parameter(parameter("--continue").alias("-c").tooltip("continue the last session"))
        .parameter(parameter("--resume").alias("-r").requires_value())
        .parameter(parameter("--print").alias("-p"))
        .parameter(parameter("--model").requires_value())
}

fn docker() -> CommandBuilder {
    command("docker")
        .tooltip("container runtime")
        .subcommand(
            command("run")
                .tooltip("run a command in a new container")
                .parameter(parameter("--detach").alias("-d"))
                .parameter(parameter("--interactive").alias("-i"))
                .parameter(parameter("--tty").alias("-t"))
                .parameter(parameter("--name").requires_value())
                .parameter(parameter("--publish").alias("-p").requires_value())
                .parameter(parameter("--volume").alias("-v").requires_value())
                .parameter(parameter("--rm"))
                .dynamic(DynamicSource::DockerImages),
        )
        .subcommand(
            command("ps")
                .tooltip("list containers")
                .parameter(parameter("--all").alias("-a"))
                .parameter(parameter("--quiet").alias("-q")),
        )
        .subcommand(command("images"))
        .subcommand(command("pull").dynamic(DynamicSource::DockerImages))
        .subcommand(command("push").dynamic(DynamicSource::DockerImages))
        .subcommand(
            command("build")
                .parameter(parameter("--tag").alias("-t").requires_value())
                .parameter(parameter("--file").alias("-f").requires_value())
                .parameter(parameter("--no-cache")),
        )
        .subcommand(
            command("exec")
                .parameter(parameter("--interactive").alias("-i"))
                .parameter(parameter("--tty").alias("-t"))
                .dynamic(DynamicSource::DockerContainers),
        )
        .subcommand(command("stop").dynamic(DynamicSource::DockerContainers))
        .subcommand(command("start").dynamic(DynamicSource::DockerContainers))
        .subcommand(command("rm").dynamic(DynamicSource::DockerContainers))
        .subcommand(command("rmi").dynamic(DynamicSource::DockerImages))
        .subcommand(
            command("logs")
                .parameter(parameter("--follow").alias("-f"))
                .parameter(parameter("--tail").requires_value())
                .dynamic(DynamicSource::DockerContainers),
        )
        .subcommand(
            command("compose")
                .subcommand(command("up").parameter(parameter("--detach").alias("-d")))
                .subcommand(command("down"))
                .subcommand(command("logs").parameter(parameter("--follow").alias("-f")))
                .subcommand(command("ps")),
        )
}

fn kubectl() -> CommandBuilder {
    let resource_args = ["pods", "services", "deployments", "nodes", "namespaces"];
    let mut get = command("get")
        .tooltip("display resources")
        .parameter(parameter("--namespace").alias("-n").requires_value())
        .parameter(
            parameter("--output")
                .alias("-o")
                .requires_value()
                .choices(["json", "yaml", "wide"]),
        );
    for r in resource_args {
        get = get.argument(Argument::new(r));
    }
    let mut describe = command("describe");
    for r in resource_args {
        describe = describe.argument(Argument::new(r));
    }
    let mut delete = command("delete").parameter(parameter("--force"));
    for r in resource_args {
        delete = delete.argument(Argument::new(r));
    }

    command("kubectl")
        .alias("k")
        .tooltip("Kubernetes CLI")
        .subcommand(get)
        .subcommand(describe)
        .subcommand(
            command("apply")
                .parameter(parameter("--filename").alias("-f").requires_value())
                .parameter(parameter("--recursive").alias("-R")),
        )
        .subcommand(delete)
        .subcommand(
            command("logs")
                .parameter(parameter("--follow").alias("-f"))
                .parameter(parameter("--previous").alias("-p")),
        )
        .subcommand(
            command("exec")
                .parameter(parameter("--stdin").alias("-i"))
                .parameter(parameter("--tty").alias("-t")),
        )
        .subcommand(
            command("config")
                .subcommand(command("get-contexts"))
                .subcommand(command("use-context"))
                .subcommand(command("current-context")),
        )
        .subcommand(command("rollout").subcommand(command("status")).subcommand(command("restart")))
}

fn npm() -> CommandBuilder {
    command("npm")
        .tooltip("Node package manager")
        .subcommand(
            command("install")
                .alias("i")
                .parameter(parameter("--save-dev").alias("-D"))
                .parameter(parameter("--global").alias("-g"))
                .parameter(parameter("--save-exact").alias("-E")),
        )
        .subcommand(
            command("run")
                .tooltip("run a package script")
                .dynamic(DynamicSource::NpmScripts),
        )
        .subcommand(command("test").alias("t"))
        .subcommand(command("uninstall").parameter(parameter("--global").alias("-g")))
        .subcommand(command("update"))
        .subcommand(command("ci"))
        .subcommand(command("init").parameter(parameter("--yes").alias("-y")))
        .subcommand(command("publish").parameter(parameter("--dry-run")))
        .subcommand(command("audit").parameter(parameter("--fix")))
        .subcommand(command("outdated"))
}

fn cargo() -> CommandBuilder {
    command("cargo")
        .tooltip("Rust package manager")
        .subcommand(
            command("build")
                .alias("b")
                .parameter(parameter("--release").alias("-r"))
                .parameter(parameter("--target").requires_value())
                .parameter(parameter("--features").alias("-F").requires_value()),
        )
        .subcommand(
            command("run")
                .alias("r")
                .parameter(parameter("--release"))
                .parameter(parameter("--bin").requires_value()),
        )
        .subcommand(
            command("test")
                .alias("t")
                .parameter(parameter("--release"))
                .parameter(parameter("--no-default-features"))
                .parameter(parameter("--workspace")),
        )
        .subcommand(command("check").alias("c"))
        .subcommand(
            command("clippy")
                .parameter(parameter("--fix"))
                .parameter(parameter("--workspace")),
        )
        .subcommand(command("fmt").parameter(parameter("--check")))
        .subcommand(command("add").parameter(parameter("--dev")).parameter(parameter("--features").alias("-F").requires_value()))
        .subcommand(command("remove"))
        .subcommand(command("update"))
        .subcommand(command("publish").parameter(parameter("--dry-run")))
        .subcommand(command("doc").parameter(parameter("--open")).parameter(parameter("--no-deps")))
        .subcommand(command("clean"))
        .subcommand(
            command("new")
                .parameter(parameter("--lib"))
                .parameter(parameter("--bin")),
        )
        .subcommand(command("bench"))
}

fn gh() -> CommandBuilder {
    command("gh")
        .tooltip("GitHub CLI")
        .subcommand(
            command("pr")
                .tooltip("work with pull requests")
                .subcommand(
                    command("create")
                        .parameter(parameter("--title").alias("-t").requires_value())
                        .parameter(parameter("--body").alias("-b").requires_value())
                        .parameter(parameter("--draft").alias("-d"))
                        .parameter(parameter("--fill").alias("-f")),
                )
                .subcommand(command("list"))
                .subcommand(command("view").parameter(parameter("--web").alias("-w")))
                .subcommand(command("checkout"))
                .subcommand(
                    command("merge")
                        .parameter(parameter("--squash").alias("-s"))
                        .parameter(parameter("--rebase").alias("-r"))
                        .parameter(parameter("--merge").alias("-m")),
                ),
        )
        .subcommand(
            command("issue")
                .subcommand(command("create").parameter(parameter("--title").alias("-t").requires_value()))
                .subcommand(command("list"))
                .subcommand(command("view"))
                .subcommand(command("close")),
        )
        .subcommand(
            command("repo")
                .subcommand(command("clone"))
                .subcommand(command("create"))
                .subcommand(command("view").parameter(parameter("--web").alias("-w")))
                .subcommand(command("fork")),
        )
        .subcommand(
            command("auth")
                .subcommand(command("login"))
                .subcommand(command("logout"))
                .subcommand(command("status")),
        )
        .subcommand(
            command("release")
                .subcommand(command("create"))
                .subcommand(command("list")),
        )
        .subcommand(
            command("run")
                .subcommand(command("list"))
                .subcommand(command("view"))
                .subcommand(command("watch")),
        )
        .subcommand(
            command("workflow")
                .subcommand(command("list"))
                .subcommand(command("run"))
                .subcommand(command("view")),
        )
}

fn dotnet() -> CommandBuilder {
    command("dotnet")
        .tooltip(".NET CLI")
        .subcommand(
            command("build").parameter(
                parameter("--configuration")
                    .alias("-c")
                    .requires_value()
                    .choices(["Debug", "Release"]),
            ),
        )
        .subcommand(command("run").parameter(parameter("--project").requires_value()))
        .subcommand(
            command("test")
                .parameter(parameter("--filter").requires_value())
                .parameter(parameter("--no-build")),
        )
        .subcommand(command("restore"))
        .subcommand(
            command("publish").parameter(
                parameter("--configuration")
                    .alias("-c")
                    .requires_value()
                    .choices(["Debug", "Release"]),
            ),
        )
        .subcommand(
            command("add")
                .subcommand(command("package"))
                .subcommand(command("reference")),
        )
        .subcommand(
            command("new")
                .argument(Argument::new("console"))
                .argument(Argument::new("classlib"))
                .argument(Argument::new("sln"))
                .argument(Argument::new("webapi"))
                .argument(Argument::new("xunit")),
        )
        .subcommand(command("clean"))
        .subcommand(command("pack"))
}

fn az() -> CommandBuilder {
    command("az")
        .tooltip("Azure CLI")
        .subcommand(command("login").parameter(parameter("--use-device-code")))
        .subcommand(command("logout"))
        .subcommand(
            command("account")
                .subcommand(command("show"))
                .subcommand(command("list"))
                .subcommand(
                    command("set")
                        .parameter(parameter("--subscription").alias("-s").requires_value()),
                ),
        )
        .subcommand(
            command("group")
                .subcommand(
                    command("create")
                        .parameter(parameter("--name").alias("-n").requires_value())
                        .parameter(parameter("--location").alias("-l").requires_value()),
                )
                .subcommand(command("list"))
                .subcommand(command("delete").parameter(parameter("--yes").alias("-y"))),
        )
        .subcommand(
            command("vm")
                .subcommand(command("list"))
                .subcommand(command("start"))
                .subcommand(command("stop"))
                .subcommand(command("create")),
        )
        .subcommand(
            command("storage").subcommand(
                command("account")
                    .subcommand(command("list"))
                    .subcommand(command("create")),
            ),
        )
}

/// A directory-navigation command: completes subdirectories dynamically.
fn navigation(name: &str) -> CommandBuilder {
    command(name)
        .tooltip("change the working directory")
        .dynamic(DynamicSource::Directories)
}
