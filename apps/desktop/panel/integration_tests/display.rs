use panel::commands::display as commands;
use panel::error::PanelError;
use panel::services::{DisplayClient, DisplayService, display_contract};
use panel::state::PanelState;

use ipc_core::affinity::{ProcessContext, mark_process};
use ipc_core::{HostEndpoint, MemoryBus, MessagingConfig};

use std::sync::Arc;

// ============================================================================
// Integration tests for panel commands over a live host/client pair
// Host and client share one in-memory bus, as they do in the panel binary
// ============================================================================

fn start_panel() -> (HostEndpoint<DisplayService>, PanelState, DisplayClient) {
    mark_process(ProcessContext::Host);
    mark_process(ProcessContext::Client);

    let contract = display_contract().expect("display contract");
    let bus = MemoryBus::new();
    let host = HostEndpoint::construct(DisplayService::new, &contract, Arc::new(bus.host()))
        .expect("display service binds");
    let client = DisplayClient::connect(
        &contract,
        Arc::new(bus.connect()),
        &MessagingConfig::default(),
    )
    .expect("display client connects");

    (host, PanelState::new(), client)
}

/// **VALUE**: Tests the full command path: state lookup, typed call, host handler,
/// converter and event mirror.
///
/// **WHY THIS MATTERS**: This is the closest to the running panel without a UI. Each
/// command crosses the bus through a different message kind.
///
/// **BUG THIS CATCHES**: Would catch a kind mismatch between the display contract and
/// either side's bindings, or the brightness event never reaching the panel state.
#[tokio::test]
async fn given_connected_panel_when_running_commands_then_host_and_state_agree() {
    // GIVEN: A connected panel watching brightness
    let (host, state, client) = start_panel();
    state.connect(client).await;
    commands::watch_brightness(&state).await.expect("watch");

    // WHEN: Exercising each command
    let pong = commands::ping(&state).await.expect("ping");
    let version = commands::service_version(&state).await.expect("version");
    let initial = commands::get_brightness(&state).await.expect("get");
    let set = commands::set_brightness(&state, 80).await.expect("set");

    // THEN: Answers reflect the host
    assert_eq!(pong, "pong from display at 50%");
    assert_eq!(
        (version.major, version.minor, version.patch),
        (0, 1, 0),
        "Converter should split the crate version"
    );
    assert_eq!(initial, 50);
    assert_eq!(set, 80);
    assert_eq!(host.instance().brightness(), 80);
    assert_eq!(state.last_brightness(), 80);
    assert_eq!(host.subscriber_count("brightnessChanged"), 1);
}

#[tokio::test]
async fn given_connected_panel_when_fading_then_last_level_wins() {
    let (host, state, client) = start_panel();
    state.connect(client).await;

    let level = commands::fade_brightness(&state, vec![60, 40, 20])
        .await
        .expect("fade");

    assert_eq!(level, 20);
    assert_eq!(host.instance().brightness(), 20);
    assert_eq!(state.last_brightness(), 20);
}

/// **VALUE**: Verifies one rejected step inside a fade is reported while the other
/// steps still run.
///
/// **WHY THIS MATTERS**: A batch settles each call on its own. A bad level in the
/// middle must not leave the display stuck half way.
///
/// **BUG THIS CATCHES**: Would catch a failing batch item aborting the rest of the
/// batch on the host, or the failure being dropped on the client.
#[tokio::test]
async fn given_out_of_range_step_when_fading_then_call_error_and_other_steps_applied() {
    // GIVEN: A connected panel
    let (host, state, client) = start_panel();
    state.connect(client).await;

    // WHEN: The middle step is out of range
    let result = commands::fade_brightness(&state, vec![30, 150, 10]).await;

    // THEN: Call error, but the last valid step landed
    assert!(
        matches!(result, Err(PanelError::Call { .. })),
        "Expected Call error, got {result:?}"
    );
    assert_eq!(host.instance().brightness(), 10);
}

#[tokio::test]
async fn given_out_of_range_level_when_setting_then_call_error() {
    let (host, state, client) = start_panel();
    state.connect(client).await;

    let result = commands::set_brightness(&state, 101).await;

    assert!(matches!(result, Err(PanelError::Call { .. })));
    assert_eq!(host.instance().brightness(), 50);
}

#[tokio::test]
async fn given_no_client_when_running_command_then_not_connected() {
    let state = PanelState::new();

    let result = commands::ping(&state).await;

    assert!(matches!(result, Err(PanelError::NotConnected { .. })));
}

/// **VALUE**: Verifies disconnecting the panel releases its host subscription.
///
/// **WHY THIS MATTERS**: A disconnected panel that stays subscribed keeps receiving
/// (and the host keeps sending) every brightness change.
///
/// **BUG THIS CATCHES**: Would catch `disconnect` dropping the client without
/// disposing it.
#[tokio::test]
async fn given_watching_panel_when_disconnecting_then_host_subscription_released() {
    // GIVEN: A watching panel
    let (host, state, client) = start_panel();
    state.connect(client).await;
    commands::watch_brightness(&state).await.expect("watch");
    assert_eq!(host.subscriber_count("brightnessChanged"), 1);

    // WHEN: Disconnecting
    let was_connected = state.disconnect().await;

    // THEN: Unsubscribed, further commands refused
    assert!(was_connected);
    assert_eq!(host.subscriber_count("brightnessChanged"), 0);
    assert!(!state.disconnect().await);
    assert!(matches!(
        commands::get_brightness(&state).await,
        Err(PanelError::NotConnected { .. })
    ));
}
