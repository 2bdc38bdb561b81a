// Unit tests for the contract model: wire names, kind uniqueness, payload tagging

use crate::contract::{Channel, Contract, MessageKind, join_message, split_message};
use crate::error::{CallError, ContractError};

use serde_json::{Value, json};

/// **VALUE**: Verifies the five per-contract wire names plus the batch name.
///
/// **WHY THIS MATTERS**: Host and client compute these names independently. Any drift
/// between the two sides means calls land on no handler and events are never seen.
///
/// **BUG THIS CATCHES**: Would catch a changed prefix constant (e.g. `sync.message` typed as
/// `message.sync`) or a forgotten separator.
#[test]
fn given_channel_when_deriving_wire_names_then_uses_fixed_prefixes() {
    // GIVEN: A channel named "display"
    let channel = Channel::new("display").expect("valid channel");

    // THEN: Every derived name follows the fixed convention
    assert_eq!(channel.async_call_name(), "message:display");
    assert_eq!(channel.sync_call_name(), "sync.message:display");
    assert_eq!(channel.subscribe_name(), "event.subscribe:display");
    assert_eq!(channel.unsubscribe_name(), "event.unsubscribe:display");
    assert_eq!(channel.event_name(), "event:display");
    assert_eq!(channel.batch_name(), "batch:display");
}

#[test]
fn given_malformed_names_when_creating_channel_then_rejects_them() {
    for name in ["", "1display", "dis play", "display:x", "-x"] {
        let result = Channel::new(name);
        assert!(
            matches!(result, Err(ContractError::InvalidChannel { .. })),
            "'{name}' should be rejected"
        );
    }
    assert!(Channel::new("panel.display-v2_x").is_ok());
}

/// **VALUE**: Verifies a message name belongs to exactly one kind within a contract.
///
/// **WHY THIS MATTERS**: The host multiplexes async and sync calls on different wire names
/// but looks members up by message name only. A name with two kinds would be ambiguous.
///
/// **BUG THIS CATCHES**: Would catch `declare` silently overwriting the earlier kind.
#[test]
fn given_declared_async_method_when_declaring_same_name_as_event_then_returns_kind_conflict() {
    // GIVEN: A contract with async method "ping"
    let mut contract = Contract::new("display")
        .and_then(|c| c.with_async_method("ping"))
        .expect("valid contract");

    // WHEN: Declaring "ping" again as an event
    let result = contract.declare("ping", MessageKind::Event);

    // THEN: Kind conflict naming both kinds, original kind kept
    match result {
        Err(ContractError::KindConflict {
            existing,
            requested,
            ..
        }) => {
            assert_eq!(existing, MessageKind::AsyncMethod);
            assert_eq!(requested, MessageKind::Event);
        }
        other => panic!("Expected KindConflict, got {other:?}"),
    }
    assert_eq!(contract.kind_of("ping"), Some(MessageKind::AsyncMethod));
}

#[test]
fn given_declared_name_when_declaring_same_kind_again_then_is_idempotent() {
    let mut contract = Contract::new("display").expect("valid contract");

    contract
        .declare("getBrightness", MessageKind::SyncMethod)
        .expect("first declaration");
    contract
        .declare("getBrightness", MessageKind::SyncMethod)
        .expect("repeat declaration of the same kind");

    assert_eq!(contract.messages().count(), 1);
}

/// **VALUE**: Verifies `check` distinguishes unknown names from wrong kinds.
///
/// **WHY THIS MATTERS**: Endpoints call `check` for every binding while wiring. The two
/// failure modes point at different mistakes (typo vs. wrong declaration kind).
///
/// **BUG THIS CATCHES**: Would catch `check` accepting any declared name regardless of kind.
#[test]
fn given_contract_when_checking_bindings_then_reports_unknown_and_mismatched_kinds() {
    // GIVEN: A contract with one sync method
    let contract = Contract::new("display")
        .and_then(|c| c.with_sync_method("getBrightness"))
        .expect("valid contract");

    // THEN: Matching kind passes, unknown name and wrong kind fail distinctly
    assert!(contract.check("getBrightness", MessageKind::SyncMethod).is_ok());
    assert!(matches!(
        contract.check("setBrightness", MessageKind::AsyncMethod),
        Err(ContractError::NotInContract { .. })
    ));
    assert!(matches!(
        contract.check("getBrightness", MessageKind::AsyncMethod),
        Err(ContractError::KindConflict { .. })
    ));
}

#[test]
fn given_tagged_payload_when_splitting_then_recovers_name_and_arguments() {
    // GIVEN: A payload tagged with its message name
    let payload = join_message("bar", vec![json!(5), json!("x")]);
    assert_eq!(payload, vec![json!("bar"), json!(5), json!("x")]);

    // WHEN: Splitting it again
    let (name, args) = split_message(payload).expect("well-formed payload");

    // THEN: Name and arguments are separated
    assert_eq!(name, "bar");
    assert_eq!(args, vec![json!(5), json!("x")]);
}

/// **VALUE**: Verifies payloads without a string name are rejected as argument errors.
///
/// **BUG THIS CATCHES**: Would catch a panic on an empty payload (indexing `args[0]`).
#[test]
fn given_payload_without_name_when_splitting_then_returns_argument_error() {
    assert!(matches!(
        split_message(Vec::new()),
        Err(CallError::Argument { .. })
    ));
    assert!(matches!(
        split_message(vec![Value::Bool(true)]),
        Err(CallError::Argument { .. })
    ));
}
