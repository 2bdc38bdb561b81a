// Unit tests for the batch wire format and typed argument helpers

use crate::contract::{
    BatchOutcome, BatchRequest, BatchResponse, decode_args, decode_batch, encode_args,
    encode_batch,
};
use crate::error::CallError;

use serde_json::json;

/// **VALUE**: Verifies the request envelope is `[batchId, [{id, name, args}]]`.
///
/// **WHY THIS MATTERS**: The host decodes this shape field by field. A renamed field or a
/// flattened envelope makes every batch fail on the host with an argument error.
///
/// **BUG THIS CATCHES**: Would catch serde renames or a changed envelope order.
#[test]
fn given_recorded_requests_when_encoding_batch_then_produces_id_and_request_list() {
    // GIVEN: Two recorded requests
    let requests = vec![
        BatchRequest {
            id: 1,
            name: "ping".to_string(),
            args: vec![],
        },
        BatchRequest {
            id: 2,
            name: "setBrightness".to_string(),
            args: vec![json!(40)],
        },
    ];

    // WHEN: Encoding the batch
    let args = encode_batch("b-1", &requests).expect("encodable");

    // THEN: Envelope matches the wire format exactly
    assert_eq!(
        args,
        vec![
            json!("b-1"),
            json!([
                {"id": 1, "name": "ping", "args": []},
                {"id": 2, "name": "setBrightness", "args": [40]}
            ])
        ]
    );

    // AND: The host side reads it back
    let (batch_id, decoded) = decode_batch(args).expect("decodable");
    assert_eq!(batch_id, "b-1");
    assert_eq!(decoded, requests);
}

#[test]
fn given_request_without_args_field_when_decoding_batch_then_defaults_to_empty() {
    let (_, decoded) = decode_batch(vec![json!("b"), json!([{"id": 7, "name": "ping"}])])
        .expect("args default to empty");
    assert!(decoded[0].args.is_empty());
}

#[test]
fn given_wrong_arity_when_decoding_batch_then_returns_argument_error() {
    assert!(matches!(
        decode_batch(vec![json!("only-an-id")]),
        Err(CallError::Argument { .. })
    ));
}

/// **VALUE**: Verifies the response shape `{id, ok}` / `{id, error}`.
///
/// **WHY THIS MATTERS**: The client correlates responses by `id` and decides success by
/// which of `ok`/`error` is present.
///
/// **BUG THIS CATCHES**: Would catch the outcome serializing as a nested enum object
/// (`{"outcome": {"Ok": ..}}`) instead of being flattened.
#[test]
fn given_results_when_serializing_responses_then_flattens_outcome() {
    let responses = vec![
        BatchResponse::from_result(1, Ok(json!(10))),
        BatchResponse::from_result(2, Err(CallError::remote("boom"))),
    ];

    let value = serde_json::to_value(&responses).expect("serializable");

    assert_eq!(
        value,
        json!([{"id": 1, "ok": 10}, {"id": 2, "error": "boom"}])
    );
    let decoded: Vec<BatchResponse> = serde_json::from_value(value).expect("decodable");
    assert_eq!(decoded[1].outcome, BatchOutcome::Error("boom".to_string()));
}

/// **VALUE**: Verifies how typed arguments spread into an argument list.
///
/// **WHY THIS MATTERS**: `invoke("bar", (5,))` must send exactly one argument `5`, and
/// `invoke("ping", ())` must send none, or host handlers decode the wrong arity.
///
/// **BUG THIS CATCHES**: Would catch a unit value being sent as `[null]`.
#[test]
fn given_typed_arguments_when_encoding_then_spreads_tuples_and_drops_unit() {
    assert_eq!(encode_args((5, "x")).expect("tuple"), vec![json!(5), json!("x")]);
    assert!(encode_args(()).expect("unit").is_empty());
    assert_eq!(encode_args(42).expect("scalar"), vec![json!(42)]);

    let (n, s): (i64, String) = decode_args(vec![json!(5), json!("x")]).expect("decodable");
    assert_eq!((n, s.as_str()), (5, "x"));
}
