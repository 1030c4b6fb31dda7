//! End-to-end flows over the virtual transport: recipe document on disk,
//! discovery, binding, cooking, and the retry loop.

use std::time::Duration;

use ovenctl_adapter_virtual::VirtualTransport;
use ovenctl_app::dispatcher::WireCommand;
use ovenctl_app::recipes::RecipeLibrary;
use ovenctl_app::session::{DeviceSession, RetryPolicy, SessionState};
use ovenctl_domain::device::{CookerId, DeviceState};
use ovenctl_domain::error::{CommandError, OvenError};
use ovenctl_domain::temperature::Temperature;

const RECIPES: &str = r#"
    [[recipes]]
    id = "sous_vide_steak"
    name = "Sous Vide Steak"
    description = "Low and slow, then sear"
    hardware_revision = "v2"

    [[recipes.stages]]
    title = "Sous Vide"
    temperature = { value = 131, unit = "F" }
    mode = "WET"
    timer = { initial_secs = 3600 }
    steam = { steam_percentage = 100 }

    [[recipes.stages]]
    title = "Sear"
    temperature = { value = 250 }
    timer = { initial_secs = 300, start = "WHEN_PREHEATED" }
    heating_elements = { top = true, bottom = true, rear = false }
    fan_speed = 0

    [[recipes]]
    id = "simple_roast"
    name = "Simple Roast"
    stages = [{ temperature = { value = 200 }, timer = { initial_secs = 2700 } }]
"#;

fn fast_retry() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 3,
        initial_backoff: Duration::from_millis(1),
        max_backoff: Duration::from_millis(4),
    }
}

fn library_from_disk() -> RecipeLibrary {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("recipes.toml");
    std::fs::write(&path, RECIPES).unwrap();
    RecipeLibrary::load_path(&path).unwrap()
}

#[tokio::test]
async fn cooks_a_multi_stage_recipe_end_to_end() {
    let library = library_from_disk();
    let recipe = library.get("sous_vide_steak").unwrap();

    let transport = VirtualTransport::default();
    let session = DeviceSession::new(&transport, fast_retry());

    let devices = session.discover(Duration::from_secs(1)).await.unwrap();
    assert_eq!(devices.len(), 2);

    session.bind(&CookerId::from("virtual-apo2")).unwrap();
    session.start(&recipe.plan).await.unwrap();

    // Two advanced stages travel as one program command.
    let delivered = transport.delivered();
    assert_eq!(delivered.len(), 1);
    let WireCommand::StartProgram { ref stages } = delivered[0].1 else {
        panic!("expected a program command, got {:?}", delivered[0].1);
    };
    assert_eq!(stages.len(), 2);

    // The virtual oven reports the cook over telemetry.
    let bound = session.bound_device().unwrap();
    assert_eq!(bound.state, DeviceState::Cooking);

    session.stop().await.unwrap();
    let bound = session.bound_device().unwrap();
    assert_eq!(bound.state, DeviceState::Idle);
}

#[tokio::test]
async fn collapses_a_plain_recipe_into_a_simple_cook() {
    let library = library_from_disk();
    let recipe = library.get("simple_roast").unwrap();

    let transport = VirtualTransport::default();
    let session = DeviceSession::new(&transport, fast_retry());
    session.discover(Duration::from_secs(1)).await.unwrap();
    session.bind(&CookerId::from("virtual-apo2")).unwrap();

    session.start(&recipe.plan).await.unwrap();

    let delivered = transport.delivered();
    assert_eq!(delivered.len(), 1);
    assert!(matches!(
        delivered[0].1,
        WireCommand::StartSimpleCook {
            timer_secs: Some(2700),
            ..
        }
    ));
}

#[tokio::test]
async fn refuses_a_v2_recipe_on_first_generation_hardware() {
    let library = library_from_disk();
    let recipe = library.get("sous_vide_steak").unwrap();

    let transport = VirtualTransport::default();
    let session = DeviceSession::new(&transport, fast_retry());
    session.discover(Duration::from_secs(1)).await.unwrap();
    session.bind(&CookerId::from("virtual-apo1")).unwrap();

    let result = session.start(&recipe.plan).await;
    assert!(matches!(result, Err(OvenError::Validation(_))));
    // Nothing reached the oven.
    assert!(transport.delivered().is_empty());
}

#[tokio::test]
async fn rides_out_transient_failures_within_the_retry_budget() {
    let library = library_from_disk();
    let recipe = library.get("simple_roast").unwrap();

    let transport = VirtualTransport::default();
    transport.inject_failures(2);

    let session = DeviceSession::new(&transport, fast_retry());
    session.discover(Duration::from_secs(1)).await.unwrap();
    session.bind(&CookerId::from("virtual-apo2")).unwrap();

    session.start(&recipe.plan).await.unwrap();
    assert_eq!(transport.delivered().len(), 1);
    assert_eq!(session.state(), SessionState::Bound);
}

#[tokio::test]
async fn disconnects_once_the_retry_budget_is_spent() {
    let transport = VirtualTransport::default();
    transport.inject_failures(10);

    let session = DeviceSession::new(&transport, fast_retry());
    session.discover(Duration::from_secs(1)).await.unwrap();
    session.bind(&CookerId::from("virtual-apo2")).unwrap();

    let result = session.stop().await;
    assert!(matches!(
        result,
        Err(OvenError::Command(CommandError::RetriesExhausted {
            attempts: 3
        }))
    ));
    assert_eq!(session.state(), SessionState::Disconnected);
}

#[tokio::test]
async fn refuses_to_stack_cooks_on_a_busy_oven() {
    let library = library_from_disk();
    let recipe = library.get("simple_roast").unwrap();

    let transport = VirtualTransport::default();
    let session = DeviceSession::new(&transport, fast_retry());
    session.discover(Duration::from_secs(1)).await.unwrap();
    session.bind(&CookerId::from("virtual-apo2")).unwrap();

    session.start(&recipe.plan).await.unwrap();
    let result = session.start(&recipe.plan).await;
    assert!(matches!(
        result,
        Err(OvenError::Command(CommandError::Busy {
            state: DeviceState::Cooking
        }))
    ));
    // Only the first start was ever transmitted.
    assert_eq!(transport.delivered().len(), 1);
}

#[tokio::test]
async fn sets_a_probe_target_during_a_cook() {
    let transport = VirtualTransport::default();
    let session = DeviceSession::new(&transport, fast_retry());
    session.discover(Duration::from_secs(1)).await.unwrap();
    session.bind(&CookerId::from("virtual-apo2")).unwrap();

    session
        .probe(Temperature::from_fahrenheit(149.0).unwrap())
        .await
        .unwrap();

    let delivered = transport.delivered();
    assert!(matches!(
        delivered[0].1,
        WireCommand::SetProbe { target_c } if (target_c - 65.0).abs() < 1e-6
    ));
}
