//! SyncEngine operations: get, apply, validation

use std::sync::Arc;

use ninja_backend::{BackendOptions, BackendRegistry};
use ninja_core::{Error, Settings, SyncEngine, WriteOutcome};
use ninja_test_utils::{RecordingHookRunner, ScriptedBackend, ScriptedFactory, Step, TestWorkspace};
use pretty_assertions::assert_eq;
use serde_json::json;

fn scripted_object(ws: &TestWorkspace, key: &str, format: &str, dest_format: &str, hooks: &str) -> String {
    format!(
        "  {key}:\n    source:\n      backend: scripted\n      format: {format}\n      init: {{ kwargs: {{ name: {key} }} }}\n    dest:\n      path: \"{}\"\n      format: {dest_format}\n    hooks: [{hooks}]\n",
        ws.path(&format!("{key}.out")).display()
    )
}

fn registry(factory: &ScriptedFactory) -> BackendRegistry {
    let mut registry = BackendRegistry::with_builtins(BackendOptions::default());
    registry.register(Arc::new(factory.clone()));
    registry
}

fn keys(names: &[&str]) -> Vec<String> {
    names.iter().map(|n| n.to_string()).collect()
}

#[tokio::test]
async fn get_decodes_without_writing() {
    let ws = TestWorkspace::new();
    let factory = ScriptedFactory::new();
    factory.add("cfg", ScriptedBackend::values("cfg", ["a: 1\nb: [x, y]\n"]));
    let settings = Settings::load(ws.settings(&scripted_object(&ws, "cfg", "yaml", "json", "reload"))).unwrap();
    let hooks = Arc::new(RecordingHookRunner::new());

    let engine = SyncEngine::new(&settings, registry(&factory), hooks.clone()).unwrap();
    let values = engine.get(&[]).await.unwrap();

    assert_eq!(values, vec![("cfg".to_string(), json!({"a": 1, "b": ["x", "y"]}))]);
    assert!(!ws.exists("cfg.out"));
    assert_eq!(hooks.calls().len(), 0);
}

#[tokio::test]
async fn apply_writes_and_runs_hooks_once_per_change() {
    let ws = TestWorkspace::new();
    let factory = ScriptedFactory::new();
    factory.add("cfg", ScriptedBackend::values("cfg", ["same", "same"]));
    let settings = Settings::load(ws.settings(&scripted_object(&ws, "cfg", "raw", "raw", "reload"))).unwrap();
    let hooks = Arc::new(RecordingHookRunner::new());
    let engine = SyncEngine::new(&settings, registry(&factory), hooks.clone()).unwrap();

    let first = engine.apply(&[]).await.unwrap();
    let second = engine.apply(&[]).await.unwrap();

    assert!(first.is_success());
    assert_eq!(first.written(), 1);
    assert!(matches!(second.entries[0].result, Ok(WriteOutcome::Unchanged)));
    assert_eq!(hooks.runs_for("cfg"), 1);
    ws.assert_content("cfg.out", "same");
}

#[tokio::test]
async fn apply_continues_past_failing_objects() {
    let ws = TestWorkspace::new();
    let factory = ScriptedFactory::new();
    factory.add("bad", ScriptedBackend::new("bad", [Step::fail("no route to host")]));
    factory.add("good", ScriptedBackend::values("good", ["ok"]));
    let objects = format!(
        "{}{}",
        scripted_object(&ws, "bad", "raw", "raw", ""),
        scripted_object(&ws, "good", "raw", "raw", "")
    );
    let settings = Settings::load(ws.settings(&objects)).unwrap();
    let engine =
        SyncEngine::new(&settings, registry(&factory), Arc::new(RecordingHookRunner::new())).unwrap();

    let report = engine.apply(&[]).await.unwrap();

    assert!(!report.is_success());
    let failed: Vec<&str> = report.failures().map(|e| e.key.as_str()).collect();
    assert_eq!(failed, vec!["bad"]);
    ws.assert_content("good.out", "ok");
}

#[tokio::test]
async fn hook_failure_is_reported_but_write_stands() {
    let ws = TestWorkspace::new();
    let factory = ScriptedFactory::new();
    factory.add("cfg", ScriptedBackend::values("cfg", ["new"]));
    let settings = Settings::load(ws.settings(&scripted_object(&ws, "cfg", "raw", "raw", "reload"))).unwrap();
    let hooks = Arc::new(RecordingHookRunner::new().failing("reload"));
    let engine = SyncEngine::new(&settings, registry(&factory), hooks).unwrap();

    let report = engine.apply(&[]).await.unwrap();

    assert!(!report.is_success());
    assert!(matches!(report.entries[0].result, Ok(WriteOutcome::Written)));
    assert!(matches!(report.entries[0].hook_error, Some(Error::Hook { .. })));
    ws.assert_content("cfg.out", "new");
}

#[tokio::test]
async fn unknown_key_lists_available() {
    let ws = TestWorkspace::new();
    let factory = ScriptedFactory::new();
    let settings = Settings::load(ws.settings(&scripted_object(&ws, "cfg", "raw", "raw", ""))).unwrap();
    let engine =
        SyncEngine::new(&settings, registry(&factory), Arc::new(RecordingHookRunner::new())).unwrap();

    let err = engine.apply(&keys(&["missing"])).await.unwrap_err();
    match err {
        Error::UnknownObject { key, available } => {
            assert_eq!(key, "missing");
            assert_eq!(available, vec!["cfg".to_string()]);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn unknown_backend_fails_validation() {
    let ws = TestWorkspace::new();
    let objects = "  cfg:\n    source: { backend: vault, init: { kwargs: { path: x } } }\n    dest: { path: out, format: raw }\n";
    let settings = Settings::load(ws.settings(objects)).unwrap();

    let err = SyncEngine::new(
        &settings,
        BackendRegistry::with_builtins(BackendOptions::default()),
        Arc::new(RecordingHookRunner::new()),
    )
    .err()
    .unwrap();
    assert!(err.is_configuration());
    assert!(err.to_string().contains("vault"), "{err}");
}

#[test]
fn undefined_hook_fails_validation() {
    let ws = TestWorkspace::new();
    let factory = ScriptedFactory::new();
    let settings = Settings::load(ws.settings(&scripted_object(&ws, "cfg", "raw", "raw", "missing"))).unwrap();

    let err = SyncEngine::new(
        &settings,
        registry(&factory),
        Arc::new(RecordingHookRunner::new().knowing(&["reload"])),
    )
    .err()
    .unwrap();
    assert!(err.to_string().contains("hook 'missing' is not defined"), "{err}");
}

#[test]
fn invalid_objects_are_collected() {
    let ws = TestWorkspace::new();
    let objects = concat!(
        "  one:\n    source: { backend: local }\n    dest: { path: a, format: json }\n",
        "  two:\n    source: { backend: local, format: ini, init: { kwargs: { path: x } } }\n    dest: { path: b, format: json }\n",
    );
    let settings = Settings::load(ws.settings(objects)).unwrap();

    match settings.objects().unwrap_err() {
        Error::Validation { problems } => assert_eq!(problems.len(), 2),
        other => panic!("unexpected error: {other}"),
    }
}
