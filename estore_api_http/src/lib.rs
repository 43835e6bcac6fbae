//! reqwest transport for the event store HTTP API
mod error;
mod util;

#[cfg(test)]
mod test;

pub use error::*;

use std::time::Duration;

use async_trait::async_trait;
use estore_configuration::{
    ApiUrls, Headers, MediaTypes, RestApiEndpoints, DEFAULT_BATCH_CONCURRENCY,
};
use estore_proto::api_client::{
    FeedStats, HasStats, ProjectionClient, StreamFeedClient, StreamWriteClient,
};
use estore_proto::types::{
    yes_no, EmbedMode, EventDocument, EventRecord, ExpectedVersion, Projection,
    ProjectionCommand, Statistics, StreamDeletion, StreamFeed, StreamId, WritableEvents,
};
use estore_proto::FeedError;
use futures::{StreamExt, TryStreamExt};
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{RequestBuilder, StatusCode};
use url::Url;
use util::{endpoint, feed_request_url, parse_url, read_body, send};

#[derive(Clone)]
struct Credentials {
    user: String,
    password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Client of one event store node
#[derive(Debug, Clone)]
pub struct EventStoreHttpClient {
    http_client: reqwest::Client,
    host_url: Url,
    credentials: Option<Credentials>,
    batch_concurrency: usize,
    stats: FeedStats,
}

pub struct ClientBuilder {
    host: String,
    credentials: Option<Credentials>,
    batch_concurrency: usize,
    timeout: Option<Duration>,
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self {
            host: ApiUrls::LOCAL_ADDRESS.to_string(),
            credentials: None,
            batch_concurrency: DEFAULT_BATCH_CONCURRENCY,
            timeout: None,
        }
    }
}

impl ClientBuilder {
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Basic auth credentials, sent with writes, deletes and projection management
    pub fn credentials(mut self, user: impl Into<String>, password: impl Into<String>) -> Self {
        self.credentials = Some(Credentials {
            user: user.into(),
            password: password.into(),
        });
        self
    }

    pub fn batch_concurrency(mut self, concurrency: usize) -> Self {
        self.batch_concurrency = concurrency.max(1);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn build(self) -> Result<EventStoreHttpClient, HttpClientError> {
        let host_url = Url::parse(&self.host)?;
        if host_url.cannot_be_a_base() {
            return Err(HttpClientError::NotABase(self.host));
        }

        let mut builder = reqwest::Client::builder().connection_verbose(true);
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }

        Ok(EventStoreHttpClient {
            http_client: builder.build()?,
            host_url,
            credentials: self.credentials,
            batch_concurrency: self.batch_concurrency,
            stats: FeedStats::default(),
        })
    }
}

impl EventStoreHttpClient {
    pub fn builder() -> ClientBuilder {
        ClientBuilder::default()
    }

    pub fn new(host: impl Into<String>) -> Result<Self, HttpClientError> {
        Self::builder().host(host).build()
    }

    pub fn host_url(&self) -> &Url {
        &self.host_url
    }

    /// Whether the node answers at all. Any response, including an error status, counts.
    pub async fn check_connection(&self) -> Result<(), FeedError> {
        let url = self.host_url.to_string();
        send(self.http_client.get(self.host_url.clone()), &url).await?;
        Ok(())
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.credentials {
            Some(c) => request.basic_auth(&c.user, Some(&c.password)),
            None => request,
        }
    }

    fn projection_url(&self, name: &str, rest: &[&str]) -> Url {
        let mut segments = vec![RestApiEndpoints::PROJECTION, name];
        segments.extend_from_slice(rest);
        endpoint(&self.host_url, &segments)
    }

    async fn fetch_event(&self, url: &str) -> Result<EventRecord, FeedError> {
        let request = self
            .http_client
            .get(parse_url(url)?)
            .header(ACCEPT, MediaTypes::ATOM_JSON);
        let body = read_body(send(request, url).await?, url).await?;
        let document: EventDocument =
            serde_json::from_slice(&body).map_err(|e| FeedError::malformed(url, e))?;
        Ok(EventRecord::from_content(document.content))
    }

    /// Send a request and classify its status. `on_status` may claim a status first.
    async fn execute(
        &self,
        request: RequestBuilder,
        url: &str,
        on_status: impl FnOnce(StatusCode) -> Option<FeedError>,
    ) -> Result<Vec<u8>, FeedError> {
        let response = send(request, url).await?;
        if let Some(e) = on_status(response.status()) {
            return Err(e);
        }
        read_body(response, url).await
    }
}

#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
impl StreamFeedClient for EventStoreHttpClient {
    fn stream_url(&self, stream_id: &StreamId) -> String {
        endpoint(&self.host_url, &[RestApiEndpoints::STREAMS, stream_id.as_str()]).to_string()
    }

    #[tracing::instrument(level = "trace", skip_all, fields(url = url))]
    async fn read_feed(&self, url: &str, embed_mode: EmbedMode) -> Result<StreamFeed, FeedError> {
        self.stats.read_feed.count_request();
        let request_url = feed_request_url(url, embed_mode)?;
        let request = self
            .http_client
            .get(request_url)
            .header(ACCEPT, MediaTypes::ATOM_JSON);
        let body = read_body(send(request, url).await?, url).await?;
        tracing::debug!("read_feed {} bytes", body.len());
        StreamFeed::parse(&body, embed_mode, url)
    }

    #[tracing::instrument(level = "trace", skip_all, fields(url = url))]
    async fn read_event(&self, url: &str) -> Result<EventRecord, FeedError> {
        self.stats.read_event.count_request();
        self.fetch_event(url).await
    }

    #[tracing::instrument(level = "trace", skip_all, fields(count = urls.len()))]
    async fn read_event_batch(&self, urls: &[String]) -> Result<Vec<EventRecord>, FeedError> {
        self.stats.read_event_batch.count_request();
        tracing::debug!("read_event_batch");
        futures::stream::iter((0..urls.len()).map(|i| {
            let url = &urls[i];
            async move {
                self.fetch_event(url)
                    .await
                    .map_err(|e| FeedError::batch(url.as_str(), e))
            }
        }))
        .buffered(self.batch_concurrency)
        .try_collect()
        .await
    }

    #[tracing::instrument(level = "trace", skip_all, fields(url = url))]
    async fn read_json(&self, url: &str) -> Result<serde_json::Value, FeedError> {
        self.stats.read_json.count_request();
        let request = self
            .http_client
            .get(parse_url(url)?)
            .header(ACCEPT, MediaTypes::JSON);
        let body = read_body(send(request, url).await?, url).await?;
        serde_json::from_slice(&body).map_err(|e| FeedError::malformed(url, e))
    }
}

#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
impl StreamWriteClient for EventStoreHttpClient {
    #[tracing::instrument(level = "trace", skip_all, fields(stream = %stream_id, count = events.len()))]
    async fn write_to_stream(
        &self,
        stream_id: &StreamId,
        events: &WritableEvents,
        expected_version: ExpectedVersion,
    ) -> Result<(), FeedError> {
        self.stats.write_to_stream.count_request();
        let url = self.stream_url(stream_id);
        let body = serde_json::to_vec(events)
            .map_err(|e| FeedError::InvalidArgument(format!("unserializable events: {e}")))?;
        let request = self
            .http_client
            .post(parse_url(&url)?)
            .header(CONTENT_TYPE, MediaTypes::EVENTS_JSON)
            .header(Headers::EXPECTED_VERSION, expected_version.header_value())
            .body(body);
        self.execute(self.authorized(request), &url, |status| {
            (status == StatusCode::BAD_REQUEST).then(|| FeedError::WrongExpectedVersion {
                stream: stream_id.to_string(),
            })
        })
        .await?;
        tracing::debug!("write_to_stream");
        Ok(())
    }

    #[tracing::instrument(level = "trace", skip_all, fields(stream = %stream_id))]
    async fn delete_stream(
        &self,
        stream_id: &StreamId,
        mode: StreamDeletion,
    ) -> Result<(), FeedError> {
        self.stats.delete_stream.count_request();
        let url = self.stream_url(stream_id);
        let mut request = self.http_client.delete(parse_url(&url)?);
        if mode == StreamDeletion::Hard {
            request = request.header(Headers::HARD_DELETE, "true");
        }
        self.execute(self.authorized(request), &url, |_| None).await?;
        tracing::debug!("delete_stream {:?}", mode);
        Ok(())
    }
}

#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
impl ProjectionClient for EventStoreHttpClient {
    #[tracing::instrument(level = "trace", skip_all, fields(name = projection.name()))]
    async fn write_projection(&self, projection: &Projection) -> Result<(), FeedError> {
        self.stats.projection.count_request();
        let mut url = endpoint(
            &self.host_url,
            &[RestApiEndpoints::PROJECTIONS, projection.mode().as_str()],
        );
        url.query_pairs_mut().extend_pairs(projection.create_params());
        let url_str = url.to_string();
        let request = self
            .http_client
            .post(url)
            .header(CONTENT_TYPE, MediaTypes::JSON)
            .body(projection.body().to_string());
        self.execute(self.authorized(request), &url_str, |status| {
            (status == StatusCode::CONFLICT).then(|| FeedError::ProjectionAlreadyExists {
                name: projection.name().to_string(),
            })
        })
        .await?;
        Ok(())
    }

    #[tracing::instrument(level = "trace", skip_all, fields(name = name))]
    async fn read_projection(&self, name: &str) -> Result<Statistics, FeedError> {
        require_name(name)?;
        self.stats.projection.count_request();
        let url = self.projection_url(name, &[]);
        let url_str = url.to_string();
        let request = self.http_client.get(url).header(ACCEPT, MediaTypes::JSON);
        let body = self
            .execute(request, &url_str, |status| not_found(status, name))
            .await?;
        serde_json::from_slice(&body).map_err(|e| FeedError::malformed(url_str, e))
    }

    #[tracing::instrument(level = "trace", skip_all, fields(name = projection.name()))]
    async fn update_projection(&self, projection: &Projection) -> Result<(), FeedError> {
        self.stats.projection.count_request();
        let mut url = self.projection_url(projection.name(), &[RestApiEndpoints::QUERY]);
        url.query_pairs_mut()
            .append_pair("emit", yes_no(projection.emit()));
        let url_str = url.to_string();
        let request = self
            .http_client
            .put(url)
            .header(CONTENT_TYPE, MediaTypes::JSON)
            .body(projection.body().to_string());
        self.execute(self.authorized(request), &url_str, |status| {
            not_found(status, projection.name())
        })
        .await?;
        Ok(())
    }

    #[tracing::instrument(level = "trace", skip_all, fields(name = name))]
    async fn delete_projection(
        &self,
        name: &str,
        with_checkpoints: bool,
        with_streams: bool,
    ) -> Result<(), FeedError> {
        require_name(name)?;
        self.stats.projection.count_request();
        let mut url = self.projection_url(name, &[]);
        url.query_pairs_mut()
            .append_pair("deleteCheckpointStream", yes_no(with_checkpoints))
            .append_pair("deleteStateStream", yes_no(with_streams));
        let url_str = url.to_string();
        let request = self
            .http_client
            .delete(url)
            .header(CONTENT_TYPE, MediaTypes::JSON);
        self.execute(self.authorized(request), &url_str, |status| {
            not_found(status, name)
        })
        .await?;
        Ok(())
    }

    #[tracing::instrument(level = "trace", skip_all, fields(name = name, command = command.as_str()))]
    async fn command_projection(
        &self,
        command: ProjectionCommand,
        name: &str,
    ) -> Result<(), FeedError> {
        require_name(name)?;
        self.stats.projection.count_request();
        let url = self.projection_url(name, &[RestApiEndpoints::COMMAND, command.as_str()]);
        let url_str = url.to_string();
        let request = self
            .http_client
            .post(url)
            .header(CONTENT_TYPE, MediaTypes::JSON);
        self.execute(self.authorized(request), &url_str, |status| {
            not_found(status, name)
        })
        .await?;
        Ok(())
    }
}

fn require_name(name: &str) -> Result<(), FeedError> {
    if name.trim().is_empty() {
        return Err(FeedError::InvalidArgument(
            "projection name cannot be empty".to_string(),
        ));
    }
    Ok(())
}

fn not_found(status: StatusCode, name: &str) -> Option<FeedError> {
    (status == StatusCode::NOT_FOUND).then(|| FeedError::ProjectionNotFound {
        name: name.to_string(),
    })
}

impl HasStats for EventStoreHttpClient {
    fn feed_stats(&self) -> FeedStats {
        self.stats.clone()
    }
}
