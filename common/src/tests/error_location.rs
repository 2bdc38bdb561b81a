use crate::ErrorLocation;

/// **VALUE**: Verifies that `ErrorLocation::caller()` records the position of the call site.
///
/// **WHY THIS MATTERS**: Every messaging error carries a location. If the capture points at
/// the constructor instead of the raising line, contract conflicts and disposed-use errors
/// become impossible to trace back to the offending declaration.
///
/// **BUG THIS CATCHES**: Would catch if `#[track_caller]` is dropped from `caller()`, which
/// makes every location report `error_location.rs` in the `error` module.
#[test]
fn given_caller_helper_when_invoked_then_reports_this_test_file() {
    // GIVEN/WHEN: Capturing a location from this test
    let location = ErrorLocation::caller();

    // THEN: The file is the test file, not the error module
    assert!(
        location.file.ends_with("tests/error_location.rs"),
        "Should capture the test file, got {}",
        location.file
    );
    assert!(location.line > 0, "Should capture a line number");
}

/// **VALUE**: Verifies the `[file:line:column]` display format.
///
/// **WHY THIS MATTERS**: Error messages are formatted as `"<Kind> Error: <message> <location>"`.
/// Log scrapers and humans both rely on the bracketed suffix.
///
/// **BUG THIS CATCHES**: Would catch a changed Display implementation (missing brackets or
/// separators).
#[test]
fn given_error_location_when_formatted_then_produces_bracketed_format() {
    // GIVEN: A fixed location
    let location = ErrorLocation {
        file: "src/host/mod.rs",
        line: 12,
        column: 7,
    };

    // WHEN: Formatting
    let formatted = location.to_string();

    // THEN: Bracketed file:line:column
    assert_eq!(formatted, "[src/host/mod.rs:12:7]");
}

/// **VALUE**: Verifies the location serializes with its three fields.
///
/// **WHY THIS MATTERS**: The panel app serializes its errors for the UI layer, and the
/// location travels inside them.
///
/// **BUG THIS CATCHES**: Would catch removal of the `Serialize` derive or renamed fields.
#[test]
fn given_error_location_when_serialized_then_contains_fields() {
    let location = ErrorLocation {
        file: "a.rs",
        line: 1,
        column: 2,
    };

    let json = serde_json::to_string(&location).expect("location should serialize");

    assert_eq!(json, r#"{"file":"a.rs","line":1,"column":2}"#);
}
