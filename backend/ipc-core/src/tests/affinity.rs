// Unit tests for the process-affinity guard. Markers are process-wide, so
// every test that touches them runs serially.

use crate::affinity::{ContextGuard, ProcessContext, clear_process_marker, mark_process};
use crate::error::AffinityError;

use std::cell::Cell;

use serial_test::serial;

/// **VALUE**: Verifies a host-only type refuses construction before its constructor runs.
///
/// **WHY THIS MATTERS**: Host types open handlers and touch host-only resources in their
/// constructors. Constructing one in a client context must fail before any of that happens.
///
/// **BUG THIS CATCHES**: Would catch the check running after the constructor.
#[test]
#[serial]
fn given_no_host_marker_when_constructing_host_only_type_then_fails_before_constructor() {
    // GIVEN: No host marker
    clear_process_marker(ProcessContext::Host);
    let guard = ContextGuard::unguarded("DisplayService").host_only();
    let ran = Cell::new(false);

    // WHEN: Constructing through the guard
    let result = guard.construct(|| ran.set(true));

    // THEN: Context mismatch, constructor never ran
    match result {
        Err(AffinityError::ContextMismatch {
            class_name,
            required,
            ..
        }) => {
            assert_eq!(class_name, "HostDisplayService");
            assert_eq!(required, ProcessContext::Host);
        }
        other => panic!("Expected ContextMismatch, got {other:?}"),
    }
    assert!(!ran.get(), "Constructor must not run");
}

#[test]
#[serial]
fn given_host_marker_when_constructing_host_only_type_then_runs_constructor() {
    mark_process(ProcessContext::Host);
    let guard = ContextGuard::unguarded("DisplayService").host_only();

    let value = guard.construct(|| 42).expect("host context is marked");

    assert_eq!(value, 42);
    clear_process_marker(ProcessContext::Host);
}

#[test]
#[serial]
fn given_only_host_marker_when_constructing_client_only_type_then_fails() {
    mark_process(ProcessContext::Host);
    clear_process_marker(ProcessContext::Client);

    let result = ContextGuard::unguarded("DisplayClient")
        .client_only()
        .check();

    assert!(matches!(
        result,
        Err(AffinityError::ContextMismatch {
            required: ProcessContext::Client,
            ..
        })
    ));
    clear_process_marker(ProcessContext::Host);
}

/// **VALUE**: Verifies guarding twice is a no-op and names are prefixed once.
///
/// **WHY THIS MATTERS**: Derived types inherit their base's guard and may guard again.
/// Re-guarding must not flip the context or produce names like `HostHostDisplay`.
///
/// **BUG THIS CATCHES**: Would catch a second `guard()` overwriting the first context.
#[test]
fn given_guarded_type_when_guarding_again_then_keeps_first_context_and_name() {
    let guard = ContextGuard::unguarded("Display").host_only().client_only();
    assert_eq!(guard.context(), Some(ProcessContext::Host));
    assert_eq!(guard.display_name(), "HostDisplay");

    let already_prefixed = ContextGuard::unguarded("HostBridge").host_only();
    assert_eq!(already_prefixed.display_name(), "HostBridge");
    assert_eq!(already_prefixed.class_name(), "HostBridge");
}

#[test]
fn given_unguarded_type_when_checking_then_always_passes() {
    assert!(ContextGuard::unguarded("Plain").check().is_ok());
}
