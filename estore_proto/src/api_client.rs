//! Traits implemented by every event store transport
use crate::types::{
    EmbedMode, EventRecord, ExpectedVersion, Projection, ProjectionCommand, Statistics, StreamDeletion,
    StreamFeed, StreamId, WritableEvents,
};
use crate::FeedError;

mod stats;
pub use stats::*;

/// Event Store Api Super Trait
/// Implements all Trait Network APIs for convenience.
pub trait EventStoreApi
where
    Self: StreamFeedClient + StreamWriteClient + ProjectionClient + Send + Sync,
{
}

impl<T> EventStoreApi for T where
    T: StreamFeedClient + StreamWriteClient + ProjectionClient + Send + Sync + ?Sized
{
}

/// Read side: feed pages and event documents.
///
/// Every call issues exactly one request, except [`StreamFeedClient::read_event_batch`], and
/// none of them retry.
#[cfg_attr(not(target_arch = "wasm32"), async_trait::async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait::async_trait(?Send))]
pub trait StreamFeedClient {
    /// Url of the head page of a stream's feed
    fn stream_url(&self, stream_id: &StreamId) -> String;

    /// Fetch and parse one feed page
    async fn read_feed(&self, url: &str, embed_mode: EmbedMode) -> Result<StreamFeed, FeedError>;

    /// Fetch one event document
    async fn read_event(&self, url: &str) -> Result<EventRecord, FeedError>;

    /// Fetch several event documents, returned in the order of `urls`.
    /// Any failing member fails the whole call.
    async fn read_event_batch(&self, urls: &[String]) -> Result<Vec<EventRecord>, FeedError>;

    /// Fetch an arbitrary json document, e.g. the target of a `metadata` link
    async fn read_json(&self, url: &str) -> Result<serde_json::Value, FeedError>;
}

#[cfg_attr(not(target_arch = "wasm32"), async_trait::async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait::async_trait(?Send))]
pub trait StreamWriteClient {
    async fn write_to_stream(
        &self,
        stream_id: &StreamId,
        events: &WritableEvents,
        expected_version: ExpectedVersion,
    ) -> Result<(), FeedError>;

    async fn delete_stream(&self, stream_id: &StreamId, mode: StreamDeletion)
        -> Result<(), FeedError>;
}

#[cfg_attr(not(target_arch = "wasm32"), async_trait::async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait::async_trait(?Send))]
pub trait ProjectionClient {
    async fn write_projection(&self, projection: &Projection) -> Result<(), FeedError>;

    async fn read_projection(&self, name: &str) -> Result<Statistics, FeedError>;

    async fn update_projection(&self, projection: &Projection) -> Result<(), FeedError>;

    async fn delete_projection(
        &self,
        name: &str,
        with_checkpoints: bool,
        with_streams: bool,
    ) -> Result<(), FeedError>;

    async fn command_projection(
        &self,
        command: ProjectionCommand,
        name: &str,
    ) -> Result<(), FeedError>;
}

/// Access to per-endpoint request counters
pub trait HasStats {
    fn feed_stats(&self) -> FeedStats;
}
