//! End-to-end: local YAML source mirrored to a JSON destination

use std::sync::Arc;
use std::time::Duration;

use ninja_backend::{BackendRegistry, CancellationToken};
use ninja_core::{ObjectState, Settings, SyncEngine, WriteOutcome};
use ninja_test_utils::{RecordingHookRunner, TestWorkspace};

const POLLING: &str = "CONFIG_NINJA_POLLING:\n  local_fallback_secs: 1\n";

async fn wait_until(what: &str, condition: impl Fn() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(15);
    while !condition() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "timed out waiting for {what}"
        );
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
}

async fn wait_for(ws: &TestWorkspace, rel: &str, expected: &str) {
    wait_until(&format!("{rel} to contain {expected:?}"), || {
        ws.exists(rel) && ws.read(rel) == expected
    })
    .await;
}

#[tokio::test]
async fn yaml_source_is_mirrored_as_json() {
    let ws = TestWorkspace::new();
    ws.write("cfg.yaml", "a: 1\n");
    let objects = ws.local_object("example", "cfg.yaml", "yaml", "out.json", "json", &["notify"]);
    let settings = Settings::load(ws.settings_with(&objects, POLLING)).unwrap();
    let hooks = Arc::new(RecordingHookRunner::new());
    let engine = SyncEngine::new(
        &settings,
        BackendRegistry::with_builtins(settings.backend_options()),
        hooks.clone(),
    )
    .unwrap();

    let cancel = CancellationToken::new();
    let monitor = {
        let cancel = cancel.clone();
        async move {
            engine
                .monitor(&[], cancel, Arc::new(|_: &str, _: WriteOutcome| {}))
                .await
        }
    };
    let handle = tokio::spawn(monitor);

    wait_for(&ws, "out.json", "{\n  \"a\": 1\n}\n").await;
    wait_until("first hook run", || hooks.runs_for("example") == 1).await;

    ninja_fs::write_atomic(&ws.path("cfg.yaml"), b"a: 2\n").unwrap();
    wait_for(&ws, "out.json", "{\n  \"a\": 2\n}\n").await;
    wait_until("second hook run", || hooks.runs_for("example") == 2).await;

    // No further writes or hooks once the source is quiet.
    tokio::time::sleep(Duration::from_millis(300)).await;
    cancel.cancel();
    let report = handle.await.unwrap().unwrap();

    assert_eq!(hooks.runs_for("example"), 2);
    assert_eq!(report.outcomes[0].state, ObjectState::Stopped);
}

#[tokio::test]
async fn one_shot_apply_renders_template() {
    let ws = TestWorkspace::new();
    ws.write("cfg.json", r#"{"name": "web", "ports": [80, 443]}"#);
    let template = ws.write(
        "nginx.j2",
        "server {{ name }}\n{% for port in ports %}listen {{ port }}\n{% endfor %}",
    );
    let objects = ws.local_object(
        "nginx",
        "cfg.json",
        "json",
        "nginx.conf",
        &template.display().to_string(),
        &[],
    );
    let settings = Settings::load(ws.settings(&objects)).unwrap();
    let engine = SyncEngine::new(
        &settings,
        BackendRegistry::with_builtins(settings.backend_options()),
        Arc::new(RecordingHookRunner::new()),
    )
    .unwrap();

    let report = engine.apply(&[]).await.unwrap();

    assert!(report.is_success());
    ws.assert_content("nginx.conf", "server web\nlisten 80\nlisten 443\n");
}

#[tokio::test]
async fn missing_template_field_fails_object() {
    let ws = TestWorkspace::new();
    ws.write("cfg.json", r#"{"name": "web"}"#);
    let template = ws.write("t.j2", "{{ name }} {{ missing_field }}");
    let objects = ws.local_object("t", "cfg.json", "json", "t.out", &template.display().to_string(), &[]);
    let settings = Settings::load(ws.settings(&objects)).unwrap();
    let engine = SyncEngine::new(
        &settings,
        BackendRegistry::with_builtins(settings.backend_options()),
        Arc::new(RecordingHookRunner::new()),
    )
    .unwrap();

    let report = engine.apply(&[]).await.unwrap();

    let err = report.entries[0].result.as_ref().unwrap_err();
    assert!(err.to_string().contains("missing_field"), "{err}");
    assert!(!ws.exists("t.out"));
}
