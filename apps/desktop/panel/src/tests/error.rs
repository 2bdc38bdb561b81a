// Unit tests for error module
// Tests error serialization (the UI layer receives errors as JSON)

use crate::error::PanelError;

use common::ErrorLocation;

use std::panic::Location;

/// **VALUE**: Tests that errors can be serialized for the UI layer.
///
/// **WHY THIS MATTERS**: Panel commands hand their errors to the frontend as JSON. If
/// serialization breaks, the frontend receives opaque errors.
///
/// **BUG THIS CATCHES**: Would catch if someone removes the `#[derive(Serialize)]`
/// or adds a non-serializable field (e.g. the underlying `CallError`).
#[test]
fn given_panel_error_when_serialized_then_carries_variant_and_message() {
    // GIVEN: A PanelError
    let err = PanelError::NotConnected {
        message: String::from("Test"),
        location: ErrorLocation::from(Location::caller()),
    };

    // WHEN: Serializing to JSON
    let json = serde_json::to_value(&err).expect("Error should be serializable");

    // THEN: Tagged with the variant, message under data
    assert_eq!(json["type"], "NotConnected");
    assert_eq!(json["data"]["message"], "Test");
    assert!(json["data"]["location"]["line"].is_u64());
}

#[test]
fn given_call_error_when_displayed_then_names_category() {
    let err = PanelError::Call {
        message: String::from("brightness 120 is above 100"),
        location: ErrorLocation::from(Location::caller()),
    };

    let text = err.to_string();

    assert!(text.starts_with("Call Error: brightness 120 is above 100"));
}
