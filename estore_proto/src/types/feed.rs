//! One page of a stream's atom feed
use std::collections::HashMap;

use serde::Deserialize;
use serde_json::Value;

use super::event::decode_embedded;
use super::{EmbedMode, EventRecord, EventVersion, LinkRelation};
use crate::FeedError;

#[derive(Debug, Deserialize)]
struct RawLink {
    uri: String,
    relation: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawEntry {
    id: String,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    event_type: Option<String>,
    #[serde(default)]
    event_number: Option<EventVersion>,
    #[serde(default)]
    is_json: Option<bool>,
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    meta_data: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawFeed {
    entries: Option<Vec<RawEntry>>,
    #[serde(default)]
    links: Vec<RawLink>,
    #[serde(default)]
    stream_id: Option<String>,
    #[serde(default)]
    head_of_stream: bool,
}

/// What a page carries for one event
#[derive(Debug, Clone, PartialEq)]
pub enum EntryContent {
    /// the page inlined everything needed to build the event
    Inlined(EventRecord),
    /// the event has to be fetched from the entry url
    Reference,
}

/// One line item of a feed page
#[derive(Debug, Clone, PartialEq)]
pub struct FeedEntry {
    url: String,
    title: Option<String>,
    summary: Option<String>,
    content: EntryContent,
}

impl FeedEntry {
    /// Url of the event document this entry points at
    pub fn event_url(&self) -> &str {
        &self.url
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    /// Event type as advertised by the feed
    pub fn summary(&self) -> Option<&str> {
        self.summary.as_deref()
    }

    pub fn content(&self) -> &EntryContent {
        &self.content
    }

    pub fn inlined_event(&self) -> Option<&EventRecord> {
        match &self.content {
            EntryContent::Inlined(event) => Some(event),
            EntryContent::Reference => None,
        }
    }

    fn from_raw(raw: RawEntry, embed_mode: EmbedMode) -> Self {
        let content = match (embed_mode.may_inline(), raw.event_type, raw.event_number, raw.data) {
            (true, Some(event_type), Some(version), Some(data)) => {
                let is_json = raw.is_json.unwrap_or(false);
                EntryContent::Inlined(EventRecord::new(
                    event_type,
                    version,
                    decode_embedded(data, is_json),
                    raw.meta_data.map(|m| decode_embedded(m, is_json)),
                ))
            }
            _ => EntryContent::Reference,
        };
        Self {
            url: raw.id,
            title: raw.title,
            summary: raw.summary,
            content,
        }
    }
}

/// A parsed page of a stream feed.
///
/// Entries stay in the order the server delivered them (newest first) and the page is never
/// mutated after parsing.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamFeed {
    entries: Vec<FeedEntry>,
    links: HashMap<LinkRelation, String>,
    embed_mode: EmbedMode,
    stream_id: Option<String>,
    head_of_stream: bool,
}

impl StreamFeed {
    /// Parse a page body. `embed_mode` is the mode the page was requested with, `url` is
    /// only used to report errors.
    pub fn parse(body: &[u8], embed_mode: EmbedMode, url: &str) -> Result<Self, FeedError> {
        let raw: RawFeed =
            serde_json::from_slice(body).map_err(|e| FeedError::malformed(url, e))?;
        Self::from_raw(raw, embed_mode, url)
    }

    pub fn from_value(value: Value, embed_mode: EmbedMode, url: &str) -> Result<Self, FeedError> {
        let raw: RawFeed = serde_json::from_value(value).map_err(|e| FeedError::malformed(url, e))?;
        Self::from_raw(raw, embed_mode, url)
    }

    fn from_raw(raw: RawFeed, embed_mode: EmbedMode, url: &str) -> Result<Self, FeedError> {
        let entries = raw
            .entries
            .ok_or_else(|| FeedError::malformed(url, "missing entries"))?;

        let mut links = HashMap::new();
        for link in raw.links {
            match link.relation.parse::<LinkRelation>() {
                // first occurrence wins, a relation maps to one url
                Ok(relation) => {
                    links.entry(relation).or_insert(link.uri);
                }
                Err(e) => tracing::trace!("ignoring link at {url}: {e}"),
            }
        }
        if !links.contains_key(&LinkRelation::SelfLink) {
            return Err(FeedError::malformed(url, "missing self link"));
        }

        Ok(Self {
            entries: entries
                .into_iter()
                .map(|e| FeedEntry::from_raw(e, embed_mode))
                .collect(),
            links,
            embed_mode,
            stream_id: raw.stream_id,
            head_of_stream: raw.head_of_stream,
        })
    }

    pub fn entries(&self) -> &[FeedEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn link_url(&self, relation: LinkRelation) -> Option<&str> {
        self.links.get(&relation).map(String::as_str)
    }

    pub fn has_link(&self, relation: LinkRelation) -> bool {
        self.links.contains_key(&relation)
    }

    /// Url this page was served from
    pub fn self_url(&self) -> &str {
        // presence is checked while parsing
        self.link_url(LinkRelation::SelfLink).unwrap_or_default()
    }

    /// Mode this page was requested with
    pub fn embed_mode(&self) -> EmbedMode {
        self.embed_mode
    }

    pub fn stream_id(&self) -> Option<&str> {
        self.stream_id.as_deref()
    }

    pub fn is_head_of_stream(&self) -> bool {
        self.head_of_stream
    }
}
