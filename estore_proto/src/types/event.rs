use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::EventVersion;

/// A fully materialized event read from a stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    event_type: String,
    version: EventVersion,
    data: Value,
    metadata: Option<Value>,
}

impl EventRecord {
    pub fn new(
        event_type: impl Into<String>,
        version: EventVersion,
        data: Value,
        metadata: Option<Value>,
    ) -> Self {
        Self {
            event_type: event_type.into(),
            version,
            data,
            metadata: metadata.filter(|m| !is_empty_payload(m)),
        }
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn version(&self) -> EventVersion {
        self.version
    }

    pub fn data(&self) -> &Value {
        &self.data
    }

    pub fn metadata(&self) -> Option<&Value> {
        self.metadata.as_ref()
    }

    /// Build an event from the `content` object of an event document
    pub fn from_content(content: EventContent) -> Self {
        Self::new(
            content.event_type,
            content.event_number,
            content.data,
            content.metadata,
        )
    }
}

/// `content` of the atom document served for a single event
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventContent {
    pub event_type: String,
    pub event_number: EventVersion,
    #[serde(default)]
    pub data: Value,
    #[serde(default)]
    pub metadata: Option<Value>,
}

/// Atom document served for a single event
#[derive(Debug, Clone, Deserialize)]
pub struct EventDocument {
    pub content: EventContent,
}

/// Missing, null, empty string and empty containers all mean "no payload"
pub(crate) fn is_empty_payload(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
        _ => false,
    }
}

/// Embedded bodies of json events arrive as json text; decode them so embedded and
/// fetched events carry the same payload.
pub(crate) fn decode_embedded(value: Value, is_json: bool) -> Value {
    match value {
        Value::String(text) if is_json => serde_json::from_str(&text).unwrap_or(Value::String(text)),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_metadata_is_absent() {
        for empty in [json!(null), json!(""), json!({}), json!([])] {
            let event = EventRecord::new("OrderPlaced", 0, json!({"id": 1}), Some(empty));
            assert_eq!(event.metadata(), None);
        }
        let event = EventRecord::new("OrderPlaced", 0, json!({}), Some(json!({"by": "me"})));
        assert_eq!(event.metadata(), Some(&json!({"by": "me"})));
    }

    #[test]
    fn parses_event_document() {
        let doc: EventDocument = serde_json::from_value(json!({
            "title": "2@orders",
            "id": "http://127.0.0.1:2113/streams/orders/2",
            "content": {
                "eventStreamId": "orders",
                "eventNumber": 2,
                "eventType": "OrderShipped",
                "data": {"id": 7},
                "metadata": ""
            }
        }))
        .unwrap();
        let event = EventRecord::from_content(doc.content);
        assert_eq!(event.event_type(), "OrderShipped");
        assert_eq!(event.version(), 2);
        assert_eq!(event.data(), &json!({"id": 7}));
        assert_eq!(event.metadata(), None);
    }

    #[test]
    fn decodes_json_text_only_for_json_events() {
        assert_eq!(
            decode_embedded(json!("{\"id\":7}"), true),
            json!({"id": 7})
        );
        assert_eq!(
            decode_embedded(json!("{\"id\":7}"), false),
            json!("{\"id\":7}")
        );
        assert_eq!(decode_embedded(json!("not json"), true), json!("not json"));
    }
}
