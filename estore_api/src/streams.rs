use estore_common::retry_async;
use estore_proto::api_client::StreamWriteClient;
use estore_proto::types::{ExpectedVersion, StreamDeletion, StreamId, WritableEvents};
use estore_proto::FeedError;

use super::ApiClientWrapper;
use crate::Result;

impl<ApiClient> ApiClientWrapper<ApiClient>
where
    ApiClient: StreamWriteClient + Send + Sync,
{
    /// Append one or more events. Fails with [`FeedError::WrongExpectedVersion`] when the
    /// stream is not at `expected_version`.
    #[tracing::instrument(level = "trace", skip_all, fields(stream = %stream_id))]
    pub async fn write_to_stream(
        &self,
        stream_id: &StreamId,
        events: impl Into<WritableEvents>,
        expected_version: ExpectedVersion,
    ) -> Result<()> {
        let events = events.into();
        if events.is_empty() {
            return Err(FeedError::InvalidArgument(
                "cannot write an empty batch of events".to_string(),
            ));
        }
        tracing::debug!(
            stream = %stream_id,
            count = events.len(),
            ?expected_version,
            "write to stream"
        );
        retry_async!(
            self.retry_strategy,
            (async {
                self.api_client
                    .write_to_stream(stream_id, &events, expected_version)
                    .await
            })
        )
    }

    #[tracing::instrument(level = "trace", skip_all, fields(stream = %stream_id))]
    pub async fn delete_stream(&self, stream_id: &StreamId, mode: StreamDeletion) -> Result<()> {
        tracing::debug!(stream = %stream_id, ?mode, "delete stream");
        retry_async!(
            self.retry_strategy,
            (async { self.api_client.delete_stream(stream_id, mode).await })
        )
    }
}
