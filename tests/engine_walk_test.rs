//! End-to-end completion-engine scenarios against the built-in catalogue.
//!
//! Covers the boundary behaviors of the catalogue walk: alias handling,
//! value-less parameters, trailing spaces, and ordering guarantees.

use std::sync::Arc;

use pscue::catalog::Catalog;
use pscue::catalog::dynamic::ProbeContext;
use pscue::engine::CompletionEngine;

fn engine() -> CompletionEngine {
    CompletionEngine::new(Arc::new(Catalog::builtin()))
}

fn complete(line: &str, word: &str) -> Vec<String> {
    engine()
        .get_completions(line, word, false, &ProbeContext::default())
        .into_iter()
        .map(|c| c.text)
        .collect()
}

#[test]
fn alias_with_sibling_prefix_matches_stays_at_parent() {
    // `s` is the alias of `gt submit` but also a prefix of `sync`; the
    // walk must not commit to the alias.
    let results = complete("gt s", "s");
    assert!(results.contains(&"submit".to_string()), "got {results:?}");
    assert!(results.contains(&"sync".to_string()), "got {results:?}");
    // Alphabetical order, and no argument noise mixed in.
    let mut sorted = results.clone();
    sorted.sort_by_key(|s| s.to_ascii_lowercase());
    assert_eq!(results, sorted);
}

#[test]
fn unique_alias_descends_into_target() {
    // `sp` names only `wt spawn`; completion happens inside it.
    let results = complete("wt sp", "sp");
    assert!(results.contains(&"--branch".to_string()), "got {results:?}");
    assert!(results.contains(&"--path".to_string()), "got {results:?}");
    assert!(!results.contains(&"spawn".to_string()));
}

#[test]
fn valueless_parameter_offers_its_siblings() {
    // `--all` takes no value and has no children; the walk stays at
    // `git commit` so its other parameters remain suggestible.
    let results = complete("git commit --all ", "");
    assert!(results.contains(&"--message".to_string()), "got {results:?}");
    assert!(results.contains(&"--amend".to_string()));
    assert!(results.contains(&"--no-verify".to_string()));
}

#[test]
fn empty_line_completes_to_nothing() {
    assert!(complete("", "").is_empty());
}

#[test]
fn bare_known_command_returns_the_command_node() {
    assert_eq!(complete("git", "git"), vec!["git".to_string()]);
}

#[test]
fn unknown_command_completes_to_nothing() {
    assert!(complete("definitely-not-a-tool sub", "sub").is_empty());
}

#[test]
fn nested_subcommand_walk() {
    let results = complete("claude plugin ", "");
    assert_eq!(
        results,
        vec![
            "install".to_string(),
            "list".to_string(),
            "remove".to_string()
        ]
    );
}

#[test]
fn value_binding_parameter_resumes_at_command() {
    // `--message` consumed `wip` as its value; completion continues at
    // `git commit`.
    let results = complete("git commit --message wip --am", "--am");
    assert_eq!(results, vec!["--amend".to_string()]);
}

#[test]
fn static_choices_complete_for_value_parameters() {
    let results = complete("dotnet build --configuration ", "");
    assert_eq!(results, vec!["Debug".to_string(), "Release".to_string()]);
}

#[test]
fn root_alias_walks_the_same_tree() {
    let via_alias = complete("k get ", "");
    let via_name = complete("kubectl get ", "");
    assert_eq!(via_alias, via_name);
    assert!(via_alias.contains(&"pods".to_string()));
}

#[test]
fn case_insensitive_walk_and_filter() {
    let results = complete("GIT.EXE COMM", "COMM");
    assert_eq!(results, vec!["commit".to_string()]);
}
