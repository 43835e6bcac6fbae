//! In-memory event store rendering streams the way the atom api pages them
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{json, Value};

use estore_proto::api_client::{FeedStats, HasStats, StreamFeedClient, StreamWriteClient};
use estore_proto::types::{
    EmbedMode, EventDocument, EventRecord, EventVersion, ExpectedVersion, StreamDeletion,
    StreamFeed, StreamId, WritableEvents,
};
use estore_proto::FeedError;

pub const FIXTURE_HOST: &str = "http://fixture.local";

const EVENT_TYPES: [&str; 3] = ["OrderPlaced", "OrderPaid", "OrderShipped"];

/// Event `version` of a generated stream
pub fn fixture_event(version: EventVersion) -> EventRecord {
    let metadata = (version % 2 == 1).then(|| json!({"by": "fixture"}));
    EventRecord::new(
        EVENT_TYPES[version as usize % EVENT_TYPES.len()],
        version,
        json!({"order": version}),
        metadata,
    )
}

#[derive(Debug, Default)]
struct StoredStream {
    events: Vec<EventRecord>,
    deleted: Option<StreamDeletion>,
    metadata: Option<Value>,
    missing: HashSet<EventVersion>,
}

enum Resource {
    Head(String),
    Page {
        stream: String,
        start: EventVersion,
        forward: bool,
    },
    Event(String, EventVersion),
    Metadata(String),
}

/// Serves newest-first pages of `page_size` entries with `first`, `last`, `next` and
/// `previous` links, and counts every request in [`FeedStats`].
pub struct FeedFixture {
    page_size: usize,
    streams: Mutex<HashMap<String, StoredStream>>,
    stats: FeedStats,
}

impl FeedFixture {
    pub fn new(page_size: usize) -> Self {
        Self {
            page_size: page_size.max(1),
            streams: Mutex::new(HashMap::new()),
            stats: FeedStats::default(),
        }
    }

    /// Add a stream holding events `0..len`
    pub fn with_stream(self, name: &str, len: u64) -> Self {
        self.with_events(name, (0..len).map(fixture_event).collect())
    }

    pub fn with_events(self, name: &str, events: Vec<EventRecord>) -> Self {
        self.lock().entry(name.to_string()).or_default().events = events;
        self
    }

    pub fn with_deleted_stream(self, name: &str, mode: StreamDeletion) -> Self {
        self.lock().entry(name.to_string()).or_default().deleted = Some(mode);
        self
    }

    pub fn with_metadata(self, name: &str, metadata: Value) -> Self {
        self.lock().entry(name.to_string()).or_default().metadata = Some(metadata);
        self
    }

    /// Make the document of one event answer 404 while the feed keeps listing it
    pub fn with_missing_event(self, name: &str, version: EventVersion) -> Self {
        self.lock()
            .entry(name.to_string())
            .or_default()
            .missing
            .insert(version);
        self
    }

    pub fn stats(&self) -> &FeedStats {
        &self.stats
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, StoredStream>> {
        self.streams.lock().expect("fixture lock poisoned")
    }

    fn stream_base(stream: &str) -> String {
        format!("{FIXTURE_HOST}/streams/{stream}")
    }

    fn parse(url: &str) -> Result<Resource, FeedError> {
        let not_found = || FeedError::NotFound {
            url: url.to_string(),
        };
        let path = url
            .strip_prefix(FIXTURE_HOST)
            .and_then(|p| p.strip_prefix("/streams/"))
            .ok_or_else(not_found)?;
        let path = path.split('?').next().unwrap_or_default();
        let number = |s: &str| s.parse::<EventVersion>().map_err(|_| not_found());
        let parts: Vec<&str> = path.split('/').collect();
        Ok(match parts.as_slice() {
            [stream] => Resource::Head(stream.to_string()),
            [stream, "metadata"] => Resource::Metadata(stream.to_string()),
            [stream, "head", "backward", _] => Resource::Head(stream.to_string()),
            [stream, start, direction, _] => Resource::Page {
                stream: stream.to_string(),
                start: number(start)?,
                forward: match *direction {
                    "forward" => true,
                    "backward" => false,
                    _ => return Err(not_found()),
                },
            },
            [stream, version] => Resource::Event(stream.to_string(), number(version)?),
            _ => return Err(not_found()),
        })
    }

    fn readable<'a>(
        streams: &'a HashMap<String, StoredStream>,
        stream: &str,
        url: &str,
    ) -> Result<&'a StoredStream, FeedError> {
        let url = url.to_string();
        match streams.get(stream) {
            None | Some(StoredStream {
                deleted: Some(StreamDeletion::Soft),
                ..
            }) => Err(FeedError::NotFound { url }),
            Some(StoredStream {
                deleted: Some(StreamDeletion::Hard),
                ..
            }) => Err(FeedError::Gone { url }),
            Some(stored) => Ok(stored),
        }
    }

    fn render_page(&self, url: &str, embed_mode: EmbedMode) -> Result<Value, FeedError> {
        let streams = self.lock();
        let (stream, start, forward, head) = match Self::parse(url)? {
            Resource::Head(stream) => {
                let len = Self::readable(&streams, &stream, url)?.events.len() as u64;
                (stream, len.saturating_sub(1), false, true)
            }
            Resource::Page {
                stream,
                start,
                forward,
            } => (stream, start, forward, false),
            _ => {
                return Err(FeedError::malformed(url, "not a feed"));
            }
        };
        let stored = Self::readable(&streams, &stream, url)?;
        let len = stored.events.len() as u64;
        let size = self.page_size as u64;

        // versions on the page, oldest first
        let versions: Vec<EventVersion> = if len == 0 {
            vec![]
        } else if forward {
            (start..(start + size).min(len)).collect()
        } else {
            let top = start.min(len - 1);
            ((top + 1).saturating_sub(size)..=top).collect()
        };

        let base = Self::stream_base(&stream);
        let mut links = vec![
            json!({"uri": url.split('?').next().unwrap_or(url), "relation": "self"}),
            json!({"uri": format!("{base}/head/backward/{size}"), "relation": "first"}),
            json!({"uri": format!("{base}/metadata"), "relation": "metadata"}),
        ];
        let lowest = versions.first().copied().unwrap_or(start);
        if lowest > 0 && len > 0 {
            links.push(json!({"uri": format!("{base}/0/forward/{size}"), "relation": "last"}));
            links.push(json!({
                "uri": format!("{base}/{}/backward/{size}", lowest - 1),
                "relation": "next"
            }));
        }
        let newer = if forward {
            start + size
        } else {
            versions.last().map(|v| v + 1).unwrap_or(0)
        };
        links.push(json!({"uri": format!("{base}/{newer}/forward/{size}"), "relation": "previous"}));

        let entries: Vec<Value> = versions
            .iter()
            .rev()
            .filter_map(|v| stored.events.get(*v as usize))
            .map(|event| Self::render_entry(&base, &stream, event, embed_mode))
            .collect();

        Ok(json!({
            "title": format!("Event stream '{stream}'"),
            "id": base,
            "streamId": stream,
            "headOfStream": head,
            "links": links,
            "entries": entries,
        }))
    }

    fn render_entry(base: &str, stream: &str, event: &EventRecord, embed_mode: EmbedMode) -> Value {
        let url = format!("{base}/{}", event.version());
        let mut entry = json!({
            "id": url,
            "title": format!("{}@{stream}", event.version()),
            "summary": event.event_type(),
            "links": [
                {"uri": url, "relation": "edit"},
                {"uri": url, "relation": "alternate"}
            ]
        });
        let Some(fields) = entry.as_object_mut() else {
            return entry;
        };
        if matches!(embed_mode, EmbedMode::Rich | EmbedMode::Body) {
            fields.insert("eventType".into(), json!(event.event_type()));
            fields.insert("eventNumber".into(), json!(event.version()));
            fields.insert("streamId".into(), json!(stream));
            fields.insert("isJson".into(), json!(true));
        }
        if embed_mode == EmbedMode::Body {
            // bodies are embedded as json text
            fields.insert("data".into(), json!(event.data().to_string()));
            let metadata = event.metadata().map(Value::to_string).unwrap_or_default();
            fields.insert("metaData".into(), json!(metadata));
        }
        entry
    }

    fn render_event(&self, url: &str) -> Result<Value, FeedError> {
        let streams = self.lock();
        let Resource::Event(stream, version) = Self::parse(url)? else {
            return Err(FeedError::malformed(url, "not an event"));
        };
        let stored = Self::readable(&streams, &stream, url)?;
        let not_found = || FeedError::NotFound {
            url: url.to_string(),
        };
        if stored.missing.contains(&version) {
            return Err(not_found());
        }
        let event = stored.events.get(version as usize).ok_or_else(not_found)?;
        Ok(json!({
            "title": format!("{version}@{stream}"),
            "id": url,
            "content": {
                "eventStreamId": stream,
                "eventNumber": version,
                "eventType": event.event_type(),
                "data": event.data(),
                "metadata": event.metadata().cloned().unwrap_or_else(|| json!(""))
            }
        }))
    }

    fn event(&self, url: &str) -> Result<EventRecord, FeedError> {
        let document: EventDocument = serde_json::from_value(self.render_event(url)?)
            .map_err(|e| FeedError::malformed(url, e))?;
        Ok(EventRecord::from_content(document.content))
    }

    fn append(
        &self,
        stream_id: &StreamId,
        events: &WritableEvents,
        expected_version: ExpectedVersion,
    ) -> Result<(), FeedError> {
        let mut streams = self.lock();
        let stored = streams.entry(stream_id.to_string()).or_default();
        let conflict = || FeedError::WrongExpectedVersion {
            stream: stream_id.to_string(),
        };
        let deleted = stored.deleted;
        match deleted {
            Some(StreamDeletion::Hard) => {
                return Err(FeedError::Gone {
                    url: Self::stream_base(stream_id.as_str()),
                })
            }
            Some(StreamDeletion::Soft) => stored.deleted = None,
            None => (),
        }
        let last = stored.events.last().map(EventRecord::version);
        match (expected_version, last) {
            (ExpectedVersion::Any, _) | (ExpectedVersion::NoStream, None) => (),
            (ExpectedVersion::Exact(expected), Some(last)) if expected == last => (),
            _ => return Err(conflict()),
        }
        let mut next = last.map(|v| v + 1).unwrap_or(0);
        for event in events.iter() {
            stored.events.push(EventRecord::new(
                event.event_type(),
                next,
                event.data().clone(),
                event.metadata().cloned(),
            ));
            next += 1;
        }
        Ok(())
    }
}

#[async_trait]
impl StreamFeedClient for FeedFixture {
    fn stream_url(&self, stream_id: &StreamId) -> String {
        Self::stream_base(stream_id.as_str())
    }

    async fn read_feed(&self, url: &str, embed_mode: EmbedMode) -> Result<StreamFeed, FeedError> {
        self.stats.read_feed.count_request();
        let page = self.render_page(url, embed_mode)?;
        StreamFeed::from_value(page, embed_mode, url)
    }

    async fn read_event(&self, url: &str) -> Result<EventRecord, FeedError> {
        self.stats.read_event.count_request();
        self.event(url)
    }

    async fn read_event_batch(&self, urls: &[String]) -> Result<Vec<EventRecord>, FeedError> {
        self.stats.read_event_batch.count_request();
        urls.iter()
            .map(|url| self.event(url).map_err(|e| FeedError::batch(url.as_str(), e)))
            .collect()
    }

    async fn read_json(&self, url: &str) -> Result<Value, FeedError> {
        self.stats.read_json.count_request();
        let streams = self.lock();
        let Resource::Metadata(stream) = Self::parse(url)? else {
            return Err(FeedError::NotFound {
                url: url.to_string(),
            });
        };
        let stored = Self::readable(&streams, &stream, url)?;
        Ok(stored.metadata.clone().unwrap_or_else(|| json!({})))
    }
}

#[async_trait]
impl StreamWriteClient for FeedFixture {
    async fn write_to_stream(
        &self,
        stream_id: &StreamId,
        events: &WritableEvents,
        expected_version: ExpectedVersion,
    ) -> Result<(), FeedError> {
        self.stats.write_to_stream.count_request();
        self.append(stream_id, events, expected_version)
    }

    async fn delete_stream(
        &self,
        stream_id: &StreamId,
        mode: StreamDeletion,
    ) -> Result<(), FeedError> {
        self.stats.delete_stream.count_request();
        let mut streams = self.lock();
        let url = Self::stream_base(stream_id.as_str());
        let stored = streams
            .get_mut(stream_id.as_str())
            .ok_or_else(|| FeedError::NotFound { url: url.clone() })?;
        let deleted = stored.deleted;
        match deleted {
            Some(StreamDeletion::Hard) => Err(FeedError::Gone { url }),
            _ => {
                stored.deleted = Some(mode);
                Ok(())
            }
        }
    }
}

impl HasStats for FeedFixture {
    fn feed_stats(&self) -> FeedStats {
        self.stats.clone()
    }
}
