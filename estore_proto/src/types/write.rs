use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

/// An event to append to a stream
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WritableEvent {
    event_id: Uuid,
    event_type: String,
    data: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    metadata: Option<Value>,
}

impl WritableEvent {
    /// A new event with a freshly generated id
    pub fn new(event_type: impl Into<String>, data: Value) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            event_type: event_type.into(),
            data,
            metadata: None,
        }
    }

    pub fn with_id(mut self, event_id: Uuid) -> Self {
        self.event_id = event_id;
        self
    }

    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn event_id(&self) -> Uuid {
        self.event_id
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn data(&self) -> &Value {
        &self.data
    }

    pub fn metadata(&self) -> Option<&Value> {
        self.metadata.as_ref()
    }
}

/// One or more events written in a single request
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
#[serde(transparent)]
pub struct WritableEvents(Vec<WritableEvent>);

impl WritableEvents {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &WritableEvent> {
        self.0.iter()
    }
}

impl From<WritableEvent> for WritableEvents {
    fn from(event: WritableEvent) -> Self {
        Self(vec![event])
    }
}

impl From<Vec<WritableEvent>> for WritableEvents {
    fn from(events: Vec<WritableEvent>) -> Self {
        Self(events)
    }
}

impl FromIterator<WritableEvent> for WritableEvents {
    fn from_iter<I: IntoIterator<Item = WritableEvent>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Optimistic concurrency check of a write
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExpectedVersion {
    /// write regardless of the stream's current version
    #[default]
    Any,
    /// the stream must not exist yet
    NoStream,
    /// the stream's last event must have this version
    Exact(u64),
}

impl ExpectedVersion {
    pub fn header_value(&self) -> String {
        match self {
            Self::Any => "-2".to_string(),
            Self::NoStream => "-1".to_string(),
            Self::Exact(version) => version.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamDeletion {
    /// the stream can be recreated by writing to it again
    Soft,
    /// the stream is gone for good, reads answer 410
    Hard,
}
