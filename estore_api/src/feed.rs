use estore_common::retry_async;
use estore_proto::api_client::StreamFeedClient;
use estore_proto::types::{EmbedMode, EventRecord, LinkRelation, StreamFeed, StreamId};
use serde_json::Value;

use super::ApiClientWrapper;
use crate::Result;

impl<ApiClient> ApiClientWrapper<ApiClient>
where
    ApiClient: StreamFeedClient + Send + Sync,
{
    /// Fetch the head page of a stream's feed
    #[tracing::instrument(level = "trace", skip_all, fields(stream = %stream_id))]
    pub async fn open_stream_feed(
        &self,
        stream_id: &StreamId,
        embed_mode: EmbedMode,
    ) -> Result<StreamFeed> {
        tracing::debug!(stream = %stream_id, ?embed_mode, "open stream feed");
        let url = self.api_client.stream_url(stream_id);
        self.read_feed_page(&url, embed_mode).await
    }

    /// Fetch the page `feed` links to under `relation`, in the mode `feed` was read with.
    /// `None` when the page carries no such link.
    pub async fn navigate_stream_feed(
        &self,
        feed: &StreamFeed,
        relation: LinkRelation,
    ) -> Result<Option<StreamFeed>> {
        self.navigate_stream_feed_with(feed, relation, feed.embed_mode())
            .await
    }

    #[tracing::instrument(level = "trace", skip_all, fields(relation = %relation))]
    pub async fn navigate_stream_feed_with(
        &self,
        feed: &StreamFeed,
        relation: LinkRelation,
        embed_mode: EmbedMode,
    ) -> Result<Option<StreamFeed>> {
        let Some(url) = feed.link_url(relation) else {
            tracing::debug!(from = feed.self_url(), "no {} link", relation);
            return Ok(None);
        };
        self.read_feed_page(url, embed_mode).await.map(Some)
    }

    /// Fetch one page by url
    #[tracing::instrument(level = "trace", skip_all, fields(url = url))]
    pub async fn read_feed_page(&self, url: &str, embed_mode: EmbedMode) -> Result<StreamFeed> {
        tracing::trace!(url, "read feed page");
        retry_async!(
            self.retry_strategy,
            (async { self.api_client.read_feed(url, embed_mode).await })
        )
    }

    #[tracing::instrument(level = "trace", skip_all, fields(url = url))]
    pub async fn read_event(&self, url: &str) -> Result<EventRecord> {
        retry_async!(
            self.retry_strategy,
            (async { self.api_client.read_event(url).await })
        )
    }

    /// Resolve several event references in one call, in input order
    #[tracing::instrument(level = "trace", skip_all, fields(count = urls.len()))]
    pub async fn read_event_batch(&self, urls: &[String]) -> Result<Vec<EventRecord>> {
        if urls.is_empty() {
            return Ok(vec![]);
        }
        tracing::debug!(count = urls.len(), "resolve event batch");
        retry_async!(
            self.retry_strategy,
            (async { self.api_client.read_event_batch(urls).await })
        )
    }

    /// The stream metadata document the page links to, if it links to one
    #[tracing::instrument(level = "trace", skip_all)]
    pub async fn read_stream_metadata(&self, feed: &StreamFeed) -> Result<Option<Value>> {
        let Some(url) = feed.link_url(LinkRelation::Metadata) else {
            return Ok(None);
        };
        retry_async!(
            self.retry_strategy,
            (async { self.api_client.read_json(url).await })
        )
        .map(Some)
    }
}
