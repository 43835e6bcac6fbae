use async_trait::async_trait;
use mockall::mock;

use estore_proto::api_client::{ProjectionClient, StreamFeedClient, StreamWriteClient};
use estore_proto::types::{
    EmbedMode, EventRecord, ExpectedVersion, Projection, ProjectionCommand, Statistics,
    StreamDeletion, StreamFeed, StreamId, WritableEvents,
};
use estore_proto::FeedError;

mod fixture;
pub use fixture::*;

// Create a mock client for testing the client wrapper
mock! {
    pub ApiClient {}

    #[async_trait]
    impl StreamFeedClient for ApiClient {
        fn stream_url(&self, stream_id: &StreamId) -> String;
        async fn read_feed(&self, url: &str, embed_mode: EmbedMode) -> Result<StreamFeed, FeedError>;
        async fn read_event(&self, url: &str) -> Result<EventRecord, FeedError>;
        async fn read_event_batch(&self, urls: &[String]) -> Result<Vec<EventRecord>, FeedError>;
        async fn read_json(&self, url: &str) -> Result<serde_json::Value, FeedError>;
    }

    #[async_trait]
    impl StreamWriteClient for ApiClient {
        async fn write_to_stream(
            &self,
            stream_id: &StreamId,
            events: &WritableEvents,
            expected_version: ExpectedVersion,
        ) -> Result<(), FeedError>;
        async fn delete_stream(&self, stream_id: &StreamId, mode: StreamDeletion) -> Result<(), FeedError>;
    }

    #[async_trait]
    impl ProjectionClient for ApiClient {
        async fn write_projection(&self, projection: &Projection) -> Result<(), FeedError>;
        async fn read_projection(&self, name: &str) -> Result<Statistics, FeedError>;
        async fn update_projection(&self, projection: &Projection) -> Result<(), FeedError>;
        async fn delete_projection(
            &self,
            name: &str,
            with_checkpoints: bool,
            with_streams: bool,
        ) -> Result<(), FeedError>;
        async fn command_projection(&self, command: ProjectionCommand, name: &str) -> Result<(), FeedError>;
    }
}
