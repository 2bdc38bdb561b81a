// Unit tests for the display service types: bindings, brightness rules and the
// version converter

use crate::services::client::parse_version;
use crate::services::display::MAX_BRIGHTNESS;
use crate::services::{CHANNEL, DisplayClient, DisplayService, display_contract};

use ipc_core::affinity::ProcessContext;
use ipc_core::error::CallError;
use ipc_core::{MessageKind, bindings_for};

use std::sync::{Arc, Mutex};

use serde_json::{Value, json};

/// **VALUE**: Verifies DisplayService inherits ServiceInfo's bindings and overrides ping.
///
/// **WHY THIS MATTERS**: The display host answers `version` and `uptime` only through
/// its embedded ServiceInfo. If inheritance drops base tables those calls go unanswered;
/// if the override loses, `ping` reports the wrong service state.
///
/// **BUG THIS CATCHES**: Would catch base tables winning over derived ones during
/// resolution, or a base binding being resolved twice.
#[test]
fn given_display_service_when_resolving_then_ping_overridden_and_base_inherited() {
    // GIVEN: Registered bindings
    let bindings = bindings_for::<DisplayService>().expect("display bindings declare");

    // WHEN: Resolving the display channel
    let resolved = bindings.resolve(CHANNEL);
    let declared_by = |name: &str| {
        resolved
            .iter()
            .find(|binding| binding.name == name)
            .map(|binding| binding.declared_by)
    };

    // THEN: Every contract message resolved once, from the right type
    assert_eq!(resolved.len(), 6);
    assert_eq!(declared_by("ping"), Some("DisplayService"));
    assert_eq!(declared_by("setBrightness"), Some("DisplayService"));
    assert_eq!(declared_by("version"), Some("ServiceInfo"));
    assert_eq!(declared_by("uptime"), Some("ServiceInfo"));
}

#[test]
fn given_display_bindings_when_checked_against_contract_then_all_match() {
    let contract = display_contract().unwrap();
    let bindings = bindings_for::<DisplayService>().unwrap();

    for binding in bindings.resolve(CHANNEL) {
        assert!(
            contract.check(&binding.name, binding.entry.kind).is_ok(),
            "{} should match the contract",
            binding.name
        );
    }
}

#[test]
fn given_service_types_when_reading_guards_then_host_and_client_prefixed() {
    let host = bindings_for::<DisplayService>().unwrap();
    let client = bindings_for::<DisplayClient>().unwrap();

    assert_eq!(host.guard().context(), Some(ProcessContext::Host));
    assert_eq!(host.guard().display_name(), "HostDisplayService");
    assert_eq!(client.guard().context(), Some(ProcessContext::Client));
    assert_eq!(client.guard().display_name(), "ClientDisplayClient");
}

#[test]
fn given_client_stubs_when_resolving_then_version_has_converter() {
    let client = bindings_for::<DisplayClient>().unwrap();

    let version = client
        .resolve(CHANNEL)
        .into_iter()
        .find(|binding| binding.name == "version")
        .expect("version stub");

    assert_eq!(version.entry.kind, MessageKind::SyncMethod);
    assert!(version.entry.converter.is_some());
}

/// **VALUE**: Verifies brightnessChanged fires only on an actual change.
///
/// **WHY THIS MATTERS**: Every fire is a message to every subscribed client. Re-setting
/// the current level is common (slider release) and must not produce traffic.
///
/// **BUG THIS CATCHES**: Would catch the event firing before comparing levels.
#[test]
fn given_display_service_when_setting_levels_then_fires_only_on_change() {
    // GIVEN: A service at 50% with a recording listener
    let display = DisplayService::with_brightness(50);
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    display
        .brightness_changed
        .subscribe(move |args: &[Value]| sink.lock().unwrap().push(args.to_vec()));

    // WHEN: Setting 50 (no change), then 70
    display.set_level(50).unwrap();
    display.set_level(70).unwrap();

    // THEN: One fire with the new level
    assert_eq!(*seen.lock().unwrap(), vec![vec![json!(70)]]);
    assert_eq!(display.brightness(), 70);
}

#[test]
fn given_level_above_max_when_setting_then_argument_error_and_level_kept() {
    let display = DisplayService::with_brightness(30);

    let result = display.set_level(MAX_BRIGHTNESS + 1);

    assert!(matches!(result, Err(CallError::Argument { .. })));
    assert_eq!(display.brightness(), 30);
}

#[test]
fn given_version_strings_when_converting_then_objects_or_conversion_errors() {
    assert_eq!(
        parse_version(json!("1.4.2")).unwrap(),
        json!({"major": 1, "minor": 4, "patch": 2})
    );
    assert_eq!(
        parse_version(json!("v0.1.0")).unwrap(),
        json!({"major": 0, "minor": 1, "patch": 0})
    );
    assert!(matches!(
        parse_version(json!("1.4")),
        Err(CallError::Conversion { .. })
    ));
    assert!(matches!(
        parse_version(json!(14)),
        Err(CallError::Conversion { .. })
    ));
}
