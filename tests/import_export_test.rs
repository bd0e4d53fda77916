//! Export/import round-trips and additive-import semantics through the
//! host, including persistence of imported state.

use std::path::Path;

use pscue::config::CueConfig;
use pscue::host::LearningHost;
use pscue::snapshot::{ImportMode, Snapshot};

const T0: i64 = 1_700_000_000_000;

fn host(dir: &tempfile::TempDir, name: &str) -> LearningHost {
    LearningHost::with_options(CueConfig::default(), &dir.path().join(name), None)
}

#[test]
fn export_then_import_replace_reproduces_state() {
    let dir = tempfile::tempdir().expect("tmpdir");
    let source = host(&dir, "source.db");
    source.record_feedback_at("git commit --amend", true, Path::new("/w"), T0);
    source.record_feedback_at("git add .", true, Path::new("/w"), T0 + 1000);
    source.record_feedback_at("git commit -m x", true, Path::new("/w"), T0 + 2000);

    let export_path = dir.path().join("export.json");
    source.export(&export_path).expect("export");

    let target = host(&dir, "target.db");
    target
        .import(&export_path, ImportMode::Replace)
        .expect("import");

    assert_eq!(
        target.knowledge().snapshot(),
        source.knowledge().snapshot()
    );
    assert_eq!(target.workflow().snapshot(), source.workflow().snapshot());
}

#[test]
fn importing_a_snapshot_twice_equals_importing_it_doubled() {
    let dir = tempfile::tempdir().expect("tmpdir");
    let source = host(&dir, "source.db");
    source.record_feedback_at("cargo build --release", true, Path::new("/w"), T0);
    source.record_feedback_at("cargo test", true, Path::new("/w"), T0 + 500);

    let export_path = dir.path().join("export.json");
    source.export(&export_path).expect("export");

    // Import the same snapshot twice, additively.
    let twice = host(&dir, "twice.db");
    twice.import(&export_path, ImportMode::Merge).expect("import 1");
    twice.import(&export_path, ImportMode::Merge).expect("import 2");

    // Build the doubled document by hand.
    let mut doubled = Snapshot::read_from(&export_path).expect("read");
    for command in &mut doubled.commands {
        command.total_usage *= 2;
        for arg in command.arguments.values_mut() {
            arg.usage_count *= 2;
        }
    }
    for transition in &mut doubled.transitions {
        transition.stats.frequency *= 2;
        transition.stats.total_time_delta_ms *= 2;
    }
    let doubled_path = dir.path().join("doubled.json");
    doubled.write_to(&doubled_path).expect("write doubled");

    let once = host(&dir, "once.db");
    once.import(&doubled_path, ImportMode::Merge).expect("import doubled");

    assert_eq!(twice.knowledge().snapshot(), once.knowledge().snapshot());
    assert_eq!(twice.workflow().snapshot(), once.workflow().snapshot());
}

#[test]
fn imported_state_survives_a_restart() {
    let dir = tempfile::tempdir().expect("tmpdir");
    let source = host(&dir, "source.db");
    source.record_feedback_at("kubectl get pods", true, Path::new("/w"), T0);
    let export_path = dir.path().join("export.json");
    source.export(&export_path).expect("export");

    let path = dir.path().join("restarting.db");
    {
        let target =
            LearningHost::with_options(CueConfig::default(), &path, None);
        target
            .import(&export_path, ImportMode::Replace)
            .expect("import");
    }

    let reloaded = LearningHost::with_options(CueConfig::default(), &path, None);
    assert!(
        reloaded
            .knowledge()
            .get_command_knowledge("kubectl get")
            .is_some()
    );
}

#[test]
fn failed_import_leaves_state_untouched() {
    let dir = tempfile::tempdir().expect("tmpdir");
    let target = host(&dir, "target.db");
    target.record_feedback_at("git status", true, Path::new("/w"), T0);
    let before = target.knowledge().snapshot();

    let bad = dir.path().join("bad.json");
    std::fs::write(&bad, "]]not a snapshot[[").expect("write");
    assert!(target.import(&bad, ImportMode::Merge).is_err());
    assert_eq!(target.knowledge().snapshot(), before);
}
