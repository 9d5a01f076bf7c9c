use serde_json::{Map, Value};

use crate::error::MessageError;

/// The two inbound message shapes, as decoded from the wire.
///
/// Produced only by [`classify`]; the channel turns these into
/// [`Message`](crate::Message)s bound to itself.
#[derive(Debug, Clone, PartialEq)]
pub enum IncomingMessage {
    /// `{"method", "id", "data"?, "internal"?}`
    Request {
        id: String,
        method: String,
        data: Option<Value>,
        internal: Option<Value>,
    },
    /// `{"event", "data"?, "internal"?}`
    Notification {
        event: String,
        data: Option<Value>,
        internal: Option<Value>,
    },
}

/// Parse a frame payload and classify it.
///
/// `method` is checked before `event`: an object carrying both is a request,
/// and is rejected if it has no `id`.
pub fn classify(payload: &[u8]) -> Result<IncomingMessage, MessageError> {
    let Value::Object(mut object) = serde_json::from_slice::<Value>(payload)? else {
        return Err(MessageError::NotAnObject);
    };

    if object.contains_key("method") {
        let Some(id) = object.remove("id") else {
            return Err(MessageError::MissingId);
        };
        return Ok(IncomingMessage::Request {
            id: string_field("id", Some(id))?,
            method: string_field("method", object.remove("method"))?,
            data: optional_field(&mut object, "data"),
            internal: optional_field(&mut object, "internal"),
        });
    }

    if object.contains_key("event") {
        return Ok(IncomingMessage::Notification {
            event: string_field("event", object.remove("event"))?,
            data: optional_field(&mut object, "data"),
            internal: optional_field(&mut object, "internal"),
        });
    }

    Err(MessageError::Unrecognized)
}

fn string_field(field: &'static str, value: Option<Value>) -> Result<String, MessageError> {
    match value {
        Some(Value::String(text)) => Ok(text),
        _ => Err(MessageError::FieldType { field }),
    }
}

// `null` is treated the same as an absent field.
fn optional_field(object: &mut Map<String, Value>, field: &str) -> Option<Value> {
    object.remove(field).filter(|value| !value.is_null())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn request_shape() {
        let msg = classify(br#"{"method":"m","id":"1"}"#).unwrap();
        assert_eq!(
            msg,
            IncomingMessage::Request {
                id: "1".to_string(),
                method: "m".to_string(),
                data: None,
                internal: None,
            }
        );
    }

    #[test]
    fn request_with_data_and_internal() {
        let msg = classify(
            br#"{"method":"handler.send","id":"7","internal":{"handlerId":"h1"},"data":{"kind":"audio"}}"#,
        )
        .unwrap();
        match msg {
            IncomingMessage::Request {
                id,
                method,
                data,
                internal,
            } => {
                assert_eq!(id, "7");
                assert_eq!(method, "handler.send");
                assert_eq!(data, Some(json!({"kind": "audio"})));
                assert_eq!(internal, Some(json!({"handlerId": "h1"})));
            }
            other => panic!("expected request, got {other:?}"),
        }
    }

    #[test]
    fn notification_shape() {
        let msg = classify(br#"{"event":"e"}"#).unwrap();
        assert_eq!(
            msg,
            IncomingMessage::Notification {
                event: "e".to_string(),
                data: None,
                internal: None,
            }
        );
    }

    #[test]
    fn notification_ignores_id() {
        let msg = classify(br#"{"event":"e","id":"9","data":[1,2]}"#).unwrap();
        assert_eq!(
            msg,
            IncomingMessage::Notification {
                event: "e".to_string(),
                data: Some(json!([1, 2])),
                internal: None,
            }
        );
    }

    #[test]
    fn method_takes_precedence_over_event() {
        let msg = classify(br#"{"method":"m","event":"e","id":"1"}"#).unwrap();
        assert!(matches!(msg, IncomingMessage::Request { ref method, .. } if method == "m"));
    }

    #[test]
    fn method_without_id_is_invalid_even_with_event() {
        let err = classify(br#"{"method":"m"}"#).unwrap_err();
        assert!(matches!(err, MessageError::MissingId));

        let err = classify(br#"{"method":"m","event":"e"}"#).unwrap_err();
        assert!(matches!(err, MessageError::MissingId));
    }

    #[test]
    fn unrecognized_object() {
        let err = classify(br#"{"foo":"bar"}"#).unwrap_err();
        assert!(matches!(err, MessageError::Unrecognized));
        assert!(!err.is_decode());
    }

    #[test]
    fn invalid_json() {
        let err = classify(b"{not json").unwrap_err();
        assert!(err.is_decode());
    }

    #[test]
    fn non_object_json() {
        let err = classify(b"[1,2,3]").unwrap_err();
        assert!(matches!(err, MessageError::NotAnObject));
    }

    #[test]
    fn non_string_fields_rejected() {
        let err = classify(br#"{"method":"m","id":1}"#).unwrap_err();
        assert!(matches!(err, MessageError::FieldType { field: "id" }));

        let err = classify(br#"{"event":5}"#).unwrap_err();
        assert!(matches!(err, MessageError::FieldType { field: "event" }));
    }

    #[test]
    fn null_data_is_absent() {
        let msg = classify(br#"{"event":"e","data":null}"#).unwrap();
        assert!(matches!(msg, IncomingMessage::Notification { data: None, .. }));
    }
}
