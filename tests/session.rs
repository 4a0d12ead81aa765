use std::time::Duration;

use once_cell::sync::Lazy;
use pollster::block_on;
use serde_json::json;
use showcase_viewer::{
    HeadlessEngine, LoadOutcome, ModelRegistry, ModelSource, RenderEngine, RotationState,
    SessionManager, ViewerConfig, ViewerError,
};

static CATALOG: Lazy<ModelRegistry> = Lazy::new(|| {
    ModelRegistry::new()
        .with_model("loving", "https://cdn.example.com/models/loving.glb")
        .with_model("minimal", "https://cdn.example.com/models/minimal.glb")
        .with_model("bold", "https://cdn.example.com/models/bold.gltf")
});

fn catalog_config() -> ViewerConfig {
    ViewerConfig {
        initial_model: ModelSource::Registry {
            key: "loving".to_string(),
        },
        registry: CATALOG.clone(),
        accept_host_messages: true,
        ..ViewerConfig::transparent()
    }
}

fn start(config: ViewerConfig) -> SessionManager<HeadlessEngine> {
    block_on(SessionManager::initialize(config, HeadlessEngine::create)).expect("session starts")
}

fn ms(value: u64) -> Duration {
    Duration::from_millis(value)
}

#[test]
fn cycling_through_the_catalog_keeps_one_model_in_the_scene() {
    let session = start(catalog_config());
    for key in CATALOG.keys() {
        let outcome = block_on(session.switch_model(key)).expect("switch succeeds");
        assert!(matches!(outcome, LoadOutcome::Installed { ref label, .. } if label == key));
        assert_eq!(session.engine().live_models().len(), 1);
    }
    let snapshot = session.engine().snapshot();
    assert_eq!(snapshot.disposed.len(), CATALOG.len());
    let mut disposed = snapshot.disposed.clone();
    disposed.dedup();
    assert_eq!(disposed.len(), CATALOG.len());
}

#[test]
fn later_request_wins_when_it_completes_first() {
    let session = start(catalog_config());
    let first = session.switch_model("minimal");
    let second = session.switch_model("bold");

    let second = block_on(second).expect("second load");
    let first = block_on(first).expect("first load");

    assert!(matches!(second, LoadOutcome::Installed { .. }));
    assert_eq!(
        first,
        LoadOutcome::Superseded {
            label: "minimal".to_string()
        }
    );
    assert_eq!(session.state().current_model.as_deref(), Some("bold"));
    assert_eq!(session.engine().live_models().len(), 1);
}

#[test]
fn host_messages_drive_the_session() {
    let session = start(catalog_config());

    let outcome = block_on(session.handle_host_message(&json!({
        "type": "loadModel",
        "modelUrl": "https://cdn.example.com/custom/engraved.glb",
        "style": "custom",
    })))
    .expect("load succeeds");
    assert!(matches!(outcome, Some(LoadOutcome::Installed { .. })));
    assert_eq!(session.state().current_model.as_deref(), Some("custom"));

    let ignored = block_on(session.handle_host_message(&json!({ "kind": "resize" })))
        .expect("untyped messages are ignored");
    assert!(ignored.is_none());

    let err = block_on(session.handle_host_message(&json!({
        "type": "changeModel",
        "modelType": "sapphire",
    })))
    .unwrap_err();
    assert!(matches!(err, ViewerError::UnknownModelKey(ref key) if key == "sapphire"));
    assert_eq!(session.state().current_model.as_deref(), Some("custom"));
}

#[test]
fn orbit_interaction_pauses_until_the_delay_elapses() {
    let session = start(catalog_config());
    let delay = session.config().camera.resume_delay();
    assert!(session.engine().camera_rig().snapshot().auto_rotate);

    session.notify_interaction_start(ms(5_000)).unwrap();
    session.notify_interaction_start(ms(5_400)).unwrap();
    assert_eq!(session.pending_resumes(), 1);
    assert_eq!(session.rotation_state(), RotationState::Paused);

    assert!(!session.tick(ms(5_000) + delay).unwrap());
    assert!(!session.engine().camera_rig().snapshot().auto_rotate);
    assert!(session.tick(ms(5_400) + delay).unwrap());
    assert!(session.engine().camera_rig().snapshot().auto_rotate);
    assert_eq!(session.pending_resumes(), 0);
}

#[test]
fn missing_canvas_is_fatal() {
    let config = ViewerConfig {
        canvas_id: String::new(),
        ..catalog_config()
    };
    let err = block_on(SessionManager::initialize(config, HeadlessEngine::create))
        .err()
        .expect("startup fails");
    assert!(matches!(err, ViewerError::EngineInit(_)));
    assert!(!err.is_recoverable());
}
