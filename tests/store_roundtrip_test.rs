//! Persistence round-trips and additive-merge guarantees across store
//! handles, mirroring multiple host processes sharing one file.

use std::path::Path;

use pscue::config::CueConfig;
use pscue::host::LearningHost;
use pscue::store::{Delta, Store, TransitionEvent, UsageEvent};

const T0: i64 = 1_700_000_000_000;

fn usage(key: &str, args: &[(&str, bool)], at: i64) -> UsageEvent {
    UsageEvent {
        command_key: key.to_string(),
        arguments: args.iter().map(|(a, f)| (a.to_string(), *f)).collect(),
        timestamp: at,
    }
}

#[test]
fn save_then_reload_reproduces_memory_state() {
    let dir = tempfile::tempdir().expect("tmpdir");
    let path = dir.path().join("learned-data.db");

    let before = {
        let host = LearningHost::with_options(CueConfig::default(), &path, None);
        host.record_feedback_at("git add .", true, Path::new("/w"), T0);
        host.record_feedback_at("git commit -m x", true, Path::new("/w"), T0 + 3000);
        host.record_feedback_at("cargo test", true, Path::new("/w"), T0 + 9000);
        host.save().expect("save");
        (
            host.knowledge().snapshot(),
            host.workflow().snapshot(),
            host.history().snapshot().len(),
        )
    };

    let host = LearningHost::with_options(CueConfig::default(), &path, None);
    assert_eq!(host.knowledge().snapshot(), before.0);
    assert_eq!(host.workflow().snapshot(), before.1);
    assert_eq!(host.history().snapshot().len(), before.2);
}

#[test]
fn interleaved_writers_sum_rather_than_clobber() {
    let dir = tempfile::tempdir().expect("tmpdir");
    let path = dir.path().join("learned-data.db");
    let a = Store::open(&path).expect("open a");
    let b = Store::open(&path).expect("open b");

    let delta_a = Delta {
        usage: vec![usage("git push", &[("--tags", true)], T0)],
        transitions: vec![TransitionEvent {
            from_key: "git commit".into(),
            to_key: "git push".into(),
            delta_ms: 4000,
            timestamp: T0,
        }],
        ..Default::default()
    };
    let delta_b = Delta {
        usage: vec![usage("git push", &[("--tags", true), ("--force", true)], T0 + 50)],
        transitions: vec![TransitionEvent {
            from_key: "git commit".into(),
            to_key: "git push".into(),
            delta_ms: 6000,
            timestamp: T0 + 50,
        }],
        ..Default::default()
    };

    // Interleave from two handles, as two processes would.
    a.flush(&delta_a).expect("flush a");
    b.flush(&delta_b).expect("flush b");
    a.flush(&delta_a).expect("flush a again");

    let snapshot = a.load().expect("load");
    let push = snapshot
        .commands
        .iter()
        .find(|c| c.command_key == "git push")
        .expect("git push knowledge");
    assert_eq!(push.total_usage, 3);
    assert_eq!(push.arguments["--tags"].usage_count, 3);
    assert_eq!(push.arguments["--force"].usage_count, 1);

    let transition = &snapshot.transitions[0];
    assert_eq!(transition.stats.frequency, 3);
    assert_eq!(transition.stats.total_time_delta_ms, 14_000);
    assert_eq!(transition.stats.first_seen, T0);
    assert_eq!(transition.stats.last_seen, T0 + 50);
}

#[test]
fn merge_order_does_not_matter() {
    let dir = tempfile::tempdir().expect("tmpdir");
    let forward = Store::open(&dir.path().join("forward.db")).expect("open");
    let reverse = Store::open(&dir.path().join("reverse.db")).expect("open");

    let first = Delta {
        usage: vec![usage("npm run", &[("build", false)], T0)],
        ..Default::default()
    };
    let second = Delta {
        usage: vec![usage("npm run", &[("build", false), ("test", false)], T0 + 100)],
        ..Default::default()
    };

    forward.flush(&first).expect("flush");
    forward.flush(&second).expect("flush");
    reverse.flush(&second).expect("flush");
    reverse.flush(&first).expect("flush");

    let f = forward.load().expect("load");
    let r = reverse.load().expect("load");
    assert_eq!(f.commands, r.commands);
}

#[test]
fn empty_delta_flush_is_a_noop() {
    let dir = tempfile::tempdir().expect("tmpdir");
    let store = Store::open(&dir.path().join("db")).expect("open");
    store.flush(&Delta::default()).expect("flush");
    assert!(store.load().expect("load").commands.is_empty());
}

#[test]
fn store_directory_is_created_on_first_open() {
    let dir = tempfile::tempdir().expect("tmpdir");
    let nested = dir.path().join("PSCue").join("learned-data.db");
    assert!(!nested.parent().unwrap().exists());

    let store = Store::open(&nested).expect("open");
    assert!(nested.parent().unwrap().is_dir());
    store
        .flush(&Delta {
            usage: vec![usage("git", &[], T0)],
            ..Default::default()
        })
        .expect("flush");
    assert!(nested.is_file());
}
