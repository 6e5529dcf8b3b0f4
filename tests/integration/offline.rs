//! Rule files, captured snapshots and offline explanation.

use std::io::Write;

use autarch_foundation::{Entity, EntityId, ErrorKind, GameStateSnapshot, SnapshotClock, Station};
use autarch_runtime::{EngineConfig, explain, load_from_file, load_rule_set, save_to_file};
use tempfile::{NamedTempFile, tempdir};

use crate::world::RULES;

#[test]
fn captured_snapshot_explains_the_same_as_live() {
    let mut rules = NamedTempFile::new().unwrap();
    rules.write_all(RULES.as_bytes()).unwrap();
    let goals = load_rule_set(rules.path()).unwrap();

    let mut clock = SnapshotClock::new();
    let snapshot = GameStateSnapshot::builder(12)
        .entity(Entity::new(EntityId(1), "stew"))
        .station(Station::idle("kitchen"))
        .memory("meals", 1)
        .build(&mut clock);

    let dir = tempdir().unwrap();
    let path = dir.path().join("capture.msgpack");
    save_to_file(&snapshot, &path).unwrap();
    let restored = load_from_file(&path).unwrap();
    assert_eq!(restored.tick(), 12);

    let live = explain(&goals, &snapshot);
    let offline = explain(&goals, &restored);
    assert_eq!(live, offline);
    assert_eq!(offline.len(), 1);
    assert!(!offline[0].admissible);
    assert!(offline[0].to_string().contains("feed/cook [goal Active]: blocked"));
}

#[test]
fn broken_rule_file_names_the_file() {
    let mut rules = NamedTempFile::new().unwrap();
    rules
        .write_all(b"[[goals]]\nname = \"feed\"\n[[goals.rules]]\nname = \"cook\"\n")
        .unwrap();

    let err = load_rule_set(rules.path()).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::Configuration(_)), "{err:?}");
    let context = err.context.map(|c| c.to_string()).unwrap_or_default();
    assert!(context.contains("file "), "{context}");
    assert!(context.contains("rule cook"), "{context}");
}

#[test]
fn engine_config_file_drives_the_orchestrator() {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(b"action_delay_ms = 250\ntrace = true\n").unwrap();

    let config = EngineConfig::load(file.path()).unwrap();
    assert_eq!(config.action_delay(), std::time::Duration::from_millis(250));
    assert!(config.trace_mode().is_on());
}
