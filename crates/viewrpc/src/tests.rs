use serde_json::json;
use serde_json::Value;

use crate::*;

fn invoke(id: &str, method: &str, args: Vec<Value>) -> Envelope {
    Envelope::Invoke(InvokeEnvelope {
        id: CallId::new(id),
        method: method.to_string(),
        args,
    })
}

// --- Wire layout ---

#[test]
fn test_invoke_layout_is_positional() {
    let env = invoke("abc", "add", vec![json!(2), json!(3)]);
    assert_eq!(env.to_value().unwrap(), json!([0, ["abc", "add", [2, 3]]]));
}

#[test]
fn test_result_layout_double_encodes_payload() {
    let env = Envelope::Result(ResultEnvelope::ok(CallId::new("abc"), &json!({"sum": 5})).unwrap());
    let value = env.to_value().unwrap();
    assert_eq!(value, json!([1, ["abc", "{\"sum\":5}", false]]));
}

#[test]
fn test_error_result_layout() {
    let error = RemoteError::new("X", "Y").with_stack("at f");
    let env = Envelope::Result(ResultEnvelope::err(CallId::new("e1"), &error).unwrap());
    let value = env.to_value().unwrap();

    assert_eq!(value[0], json!(1));
    assert_eq!(value[1][0], json!("e1"));
    assert_eq!(value[1][2], json!(true));

    let nested: Value = serde_json::from_str(value[1][1].as_str().unwrap()).unwrap();
    assert_eq!(nested, json!({"name": "X", "message": "Y", "stack": "at f"}));
}

#[test]
fn test_decode_page_messages() {
    // What the page posts for a call and for a settled promise.
    let call = br#"[0, ["9f2c", "greet", ["world", 1]]]"#;
    let reply = br#"[1, ["9f2c", "\"hello\"", false]]"#;

    assert_eq!(
        Envelope::decode(call).unwrap(),
        invoke("9f2c", "greet", vec![json!("world"), json!(1)])
    );

    let Envelope::Result(result) = Envelope::decode(reply).unwrap() else {
        panic!("Expected Result envelope");
    };
    assert_eq!(result.settle().unwrap(), Ok(json!("hello")));
}

#[test]
fn test_encode_then_decode_keeps_envelope() {
    let env = invoke("id-1", "echo", vec![json!({"nested": [1, 2, {"x": null}]})]);
    let bytes = env.encode().unwrap();
    assert_eq!(Envelope::decode(&bytes).unwrap(), env);
}

#[test]
fn test_serde_deserialize_impl() {
    let env: Envelope = serde_json::from_str(r#"[1, ["a", null, false]]"#).unwrap();
    assert_eq!(env.id().as_str(), "a");
}

// --- Malformed frames ---

#[test]
fn test_unknown_kind() {
    let err = Envelope::decode(br#"[7, ["a", "b", []]]"#).unwrap_err();
    assert_eq!(err, RpcError::UnknownKind(7));
}

#[test]
fn test_not_an_array() {
    match Envelope::decode(br#"{"kind": 0}"#) {
        Err(RpcError::ProtocolViolation(msg)) => assert!(msg.contains("not an array")),
        other => panic!("Expected ProtocolViolation, got {:?}", other),
    }
}

#[test]
fn test_wrong_arity() {
    match Envelope::decode(br#"[0, ["a", "b", []], 3]"#) {
        Err(RpcError::ProtocolViolation(msg)) => assert!(msg.contains("3 elements")),
        other => panic!("Expected ProtocolViolation, got {:?}", other),
    }
}

#[test]
fn test_not_json() {
    assert!(matches!(
        Envelope::decode(b"\xff\xfe"),
        Err(RpcError::ProtocolViolation(_))
    ));
}

#[test]
fn test_malformed_invoke_still_exposes_id() {
    let value = json!([0, ["lost-call", "add", "not a list"]]);
    assert!(Envelope::from_value(value.clone()).is_err());
    assert_eq!(decode_invoke_id(&value), Some(CallId::new("lost-call")));
}

#[test]
fn test_invoke_id_ignores_results() {
    assert_eq!(decode_invoke_id(&json!([1, ["r", null, false]])), None);
    assert_eq!(decode_invoke_id(&json!("junk")), None);
    assert_eq!(decode_invoke_id(&json!([0, [42, "m", []]])), None);
}

// --- Payloads ---

#[test]
fn test_missing_payload_is_null() {
    let result = ResultEnvelope { id: CallId::new("u"), payload: None, is_error: false };
    assert_eq!(result.settle().unwrap(), Ok(Value::Null));
}

#[test]
fn test_garbage_success_payload_is_serialization_error() {
    let result = ResultEnvelope { id: CallId::new("g"), payload: Some("{oops".into()), is_error: false };
    assert!(matches!(result.settle(), Err(RpcError::Serialization(_))));
}

#[test]
fn test_encode_args_spreads_tuples() {
    assert_eq!(encode_args(&(2, 3)).unwrap(), vec![json!(2), json!(3)]);
    assert_eq!(encode_args(&("one",)).unwrap(), vec![json!("one")]);
    assert_eq!(encode_args(&()).unwrap(), Vec::<Value>::new());
    assert_eq!(encode_args(&(json!({"k": 1}),)).unwrap(), vec![json!({"k": 1})]);
    assert_eq!(encode_args(&vec![1, 2, 3]).unwrap().len(), 3);
}

#[test]
fn test_encode_args_wraps_lone_null_and_list() {
    assert_eq!(encode_args(&(Value::Null,)).unwrap(), vec![Value::Null]);
    assert_eq!(encode_args(&(vec![1, 2],)).unwrap(), vec![json!([1, 2])]);
}

#[test]
fn test_encode_args_rejects_non_lists() {
    for args in [json!({"k": 1}), json!(7), json!("text"), json!(true)] {
        match encode_args(&args) {
            Err(RpcError::Serialization(message)) => assert!(message.contains("must encode to a list")),
            other => panic!("Expected Serialization error for {}, got {:?}", args, other),
        }
    }
}

#[test]
fn test_parse_message() {
    assert_eq!(parse_message(b"[1, 2]").unwrap(), json!([1, 2]));
    match parse_message(b"{nope") {
        Err(RpcError::ProtocolViolation(message)) => assert!(message.starts_with("message is not JSON")),
        other => panic!("Expected ProtocolViolation, got {:?}", other),
    }
    assert!(matches!(Envelope::decode(b"{nope"), Err(RpcError::ProtocolViolation(_))));
}

#[test]
fn test_encode_args_rejects_non_string_keys() {
    let mut map = std::collections::HashMap::new();
    map.insert((1, 2), "tuple keys cannot be JSON object keys");
    assert!(matches!(encode_args(&(map,)), Err(RpcError::Serialization(_))));
}

// --- Remote errors ---

#[test]
fn test_remote_error_from_full_payload() {
    let error = RemoteError::from_payload(Some(r#"{"name":"RangeError","message":"too big","stack":"at x"}"#));
    assert_eq!(error, RemoteError::new("RangeError", "too big").with_stack("at x"));
    assert_eq!(error.to_string(), "RangeError: too big");
}

#[test]
fn test_remote_error_from_empty_object() {
    // `JSON.stringify(new Error("x"))` yields "{}" since Error fields are not enumerable.
    let error = RemoteError::from_payload(Some("{}"));
    assert_eq!(error.name, "Error");
    assert_eq!(error.message, "");
}

#[test]
fn test_remote_error_with_null_fields() {
    let error = RemoteError::from_payload(Some(r#"{"name":null,"message":"m","stack":null}"#));
    assert_eq!(error.name, "Error");
    assert_eq!(error.message, "m");
    assert_eq!(error.stack, "");
}

#[test]
fn test_remote_error_from_non_object() {
    assert_eq!(RemoteError::from_payload(Some("\"plain\"")).message, "plain");
    assert_eq!(RemoteError::from_payload(Some("not json")).message, "not json");
    assert_eq!(RemoteError::from_payload(None).name, "Error");
}

#[test]
fn test_remote_error_from_anyhow() {
    let e = anyhow::anyhow!("disk full").context("saving settings");
    let remote = RemoteError::from(e);
    assert_eq!(remote.name, "Error");
    assert_eq!(remote.message, "saving settings");
    assert!(remote.stack.contains("disk full"));
}

#[test]
fn test_remote_error_survives_anyhow() {
    let original = RemoteError::new("X", "Y");
    let e = anyhow::Error::new(original.clone());
    assert_eq!(RemoteError::from(e), original);
}
