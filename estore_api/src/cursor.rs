//! Flat, ordered traversal of a stream's paged feed.
//!
//! A cursor holds at most one page. Pages arrive newest-first and are never reordered: a
//! forward cursor consumes each page from its oldest end and walks `previous` links, a
//! backward cursor consumes from the newest end and walks `next` links. The traversal ends
//! when the page in hand has no link in the walking direction, or when following that link
//! yields a page without entries.
use futures::Stream;

use estore_proto::api_client::StreamFeedClient;
use estore_proto::types::{Direction, EmbedMode, EventRecord, StreamFeed, StreamId};
use estore_proto::FeedError;

use crate::ApiClientWrapper;

/// When bare entry references are turned into events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BatchPolicy {
    /// one batch read per page, issued as the page is loaded
    #[default]
    Eager,
    /// one event read per entry, issued as the entry is taken
    Lazy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CursorOptions {
    /// mode every page of the traversal is requested with
    pub embed_mode: EmbedMode,
    pub batch: BatchPolicy,
}

impl CursorOptions {
    pub fn with_embed_mode(mut self, embed_mode: EmbedMode) -> Self {
        self.embed_mode = embed_mode;
        self
    }

    pub fn with_batch(mut self, batch: BatchPolicy) -> Self {
        self.batch = batch;
        self
    }
}

enum CursorState {
    Uninitialized,
    PageLoaded(LoadedPage),
    Exhausted,
    Failed(FeedError),
}

enum Pending {
    Ready(EventRecord),
    Unresolved(String),
    Failed(FeedError),
}

/// What is known about one entry of the loaded page
enum Slot {
    Ready(EventRecord),
    Unresolved,
    /// a batch resolution failed on this entry; surfaced once the cursor reaches it
    Failed(FeedError),
}

struct LoadedPage {
    feed: StreamFeed,
    taken: usize,
    /// indexed like the page's entries
    slots: Vec<Slot>,
}

impl LoadedPage {
    fn take_next(&mut self, direction: Direction) -> Option<Pending> {
        let index = direction.entry_index(self.taken, self.feed.len())?;
        self.taken += 1;
        let slot = self
            .slots
            .get_mut(index)
            .map(|slot| std::mem::replace(slot, Slot::Unresolved));
        match slot {
            Some(Slot::Ready(event)) => Some(Pending::Ready(event)),
            Some(Slot::Failed(e)) => Some(Pending::Failed(e)),
            Some(Slot::Unresolved) | None => self
                .feed
                .entries()
                .get(index)
                .map(|entry| Pending::Unresolved(entry.event_url().to_string())),
        }
    }
}

/// Stateful reader yielding a stream's events one at a time.
///
/// Once [`StreamFeedCursor::advance`] has reported the end of the stream or a failure, every
/// later call repeats that result without touching the network.
pub struct StreamFeedCursor<'a, ApiClient> {
    api: &'a ApiClientWrapper<ApiClient>,
    stream_id: StreamId,
    direction: Direction,
    options: CursorOptions,
    state: CursorState,
}

impl<'a, ApiClient> StreamFeedCursor<'a, ApiClient>
where
    ApiClient: StreamFeedClient + Send + Sync,
{
    pub fn new(
        api: &'a ApiClientWrapper<ApiClient>,
        stream_id: StreamId,
        direction: Direction,
        options: CursorOptions,
    ) -> Self {
        Self {
            api,
            stream_id,
            direction,
            options,
            state: CursorState::Uninitialized,
        }
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn stream_id(&self) -> &StreamId {
        &self.stream_id
    }

    pub fn options(&self) -> CursorOptions {
        self.options
    }

    /// Whether the end of the stream or a failure has been reached
    pub fn is_terminated(&self) -> bool {
        matches!(self.state, CursorState::Exhausted | CursorState::Failed(_))
    }

    /// The next event, `Ok(None)` at the end of the stream.
    #[tracing::instrument(level = "trace", skip_all, fields(stream = %self.stream_id, direction = ?self.direction))]
    pub async fn advance(&mut self) -> Result<Option<EventRecord>, FeedError> {
        match &self.state {
            CursorState::Exhausted => return Ok(None),
            CursorState::Failed(e) => return Err(e.clone()),
            CursorState::Uninitialized | CursorState::PageLoaded(_) => (),
        }
        match self.step().await {
            Ok(Some(event)) => Ok(Some(event)),
            Ok(None) => {
                tracing::debug!(stream = %self.stream_id, "end of stream");
                self.state = CursorState::Exhausted;
                Ok(None)
            }
            Err(e) => {
                tracing::debug!(stream = %self.stream_id, "traversal failed: {}", e);
                self.state = CursorState::Failed(e.clone());
                Err(e)
            }
        }
    }

    /// Adapt into a stream ending at the end of the stream or right after the first failure
    pub fn into_stream(mut self) -> impl Stream<Item = Result<EventRecord, FeedError>> + 'a
    where
        ApiClient: 'a,
    {
        async_stream::stream! {
            loop {
                match self.advance().await {
                    Ok(Some(event)) => yield Ok(event),
                    Ok(None) => break,
                    Err(e) => {
                        yield Err(e);
                        break;
                    }
                }
            }
        }
    }

    async fn step(&mut self) -> Result<Option<EventRecord>, FeedError> {
        if matches!(self.state, CursorState::Uninitialized) {
            let page = self.load_starting_page().await?;
            self.state = CursorState::PageLoaded(page);
        }
        loop {
            let CursorState::PageLoaded(page) = &mut self.state else {
                return Ok(None);
            };
            if let Some(pending) = page.take_next(self.direction) {
                return match pending {
                    Pending::Ready(event) => Ok(Some(event)),
                    Pending::Unresolved(url) => self.api.read_event(&url).await.map(Some),
                    Pending::Failed(e) => Err(e),
                };
            }
            let relation = self.direction.advancing_relation();
            let Some(url) = page.feed.link_url(relation).map(str::to_string) else {
                return Ok(None);
            };
            let page = self.load_page(&url).await?;
            if page.feed.is_empty() {
                return Ok(None);
            }
            self.state = CursorState::PageLoaded(page);
        }
    }

    async fn load_starting_page(&self) -> Result<LoadedPage, FeedError> {
        let head_url = self.api.api_client.stream_url(&self.stream_id);
        let Some(relation) = self.direction.starting_relation() else {
            return self.load_page(&head_url).await;
        };
        let head = self
            .api
            .read_feed_page(&head_url, self.options.embed_mode)
            .await?;
        match head.link_url(relation).map(str::to_string) {
            Some(url) => self.load_page(&url).await,
            // the head page is also the oldest one
            None => self.prepare(head).await,
        }
    }

    async fn load_page(&self, url: &str) -> Result<LoadedPage, FeedError> {
        let feed = self.api.read_feed_page(url, self.options.embed_mode).await?;
        self.prepare(feed).await
    }

    /// Resolve the page's bare entries up front under the eager policy.
    ///
    /// A failed batch does not fail the page. The error is pinned to the entry it names and the
    /// entries consumed before it fall back to single reads.
    async fn prepare(&self, feed: StreamFeed) -> Result<LoadedPage, FeedError> {
        tracing::debug!(url = feed.self_url(), entries = feed.len(), "page loaded");
        let mut slots: Vec<Slot> = feed
            .entries()
            .iter()
            .map(|entry| match entry.inlined_event() {
                Some(event) => Slot::Ready(event.clone()),
                None => Slot::Unresolved,
            })
            .collect();

        if self.options.batch == BatchPolicy::Eager {
            let pending: Vec<usize> = slots
                .iter()
                .enumerate()
                .filter_map(|(index, slot)| matches!(slot, Slot::Unresolved).then_some(index))
                .collect();
            let urls: Vec<String> = pending
                .iter()
                .filter_map(|index| feed.entries().get(*index))
                .map(|entry| entry.event_url().to_string())
                .collect();
            if !urls.is_empty() {
                let resolution = match self.api.read_event_batch(&urls).await {
                    Ok(events) if events.len() == urls.len() => Ok(events),
                    Ok(events) => Err(FeedError::batch(
                        feed.self_url(),
                        FeedError::malformed(
                            feed.self_url(),
                            format!("{} events resolved for {} entries", events.len(), urls.len()),
                        ),
                    )),
                    Err(e @ FeedError::ResolutionBatchFailure { .. }) => Err(e),
                    Err(e) => Err(FeedError::batch(feed.self_url(), e)),
                };
                match resolution {
                    Ok(events) => {
                        for (index, event) in pending.into_iter().zip(events) {
                            if let Some(slot) = slots.get_mut(index) {
                                *slot = Slot::Ready(event);
                            }
                        }
                    }
                    Err(e) => {
                        tracing::debug!(url = feed.self_url(), "batch resolution failed: {}", e);
                        if let Some(slot) = self
                            .failed_entry(&feed, &pending, &e)
                            .and_then(|index| slots.get_mut(index))
                        {
                            *slot = Slot::Failed(e);
                        }
                    }
                }
            }
        }

        Ok(LoadedPage {
            feed,
            taken: 0,
            slots,
        })
    }

    /// Entry a batch failure belongs to: the one it names, otherwise the first pending entry
    /// in consumption order
    fn failed_entry(&self, feed: &StreamFeed, pending: &[usize], e: &FeedError) -> Option<usize> {
        let named = match e {
            FeedError::ResolutionBatchFailure { url, .. } => pending.iter().copied().find(|index| {
                feed.entries()
                    .get(*index)
                    .is_some_and(|entry| entry.event_url() == url)
            }),
            _ => None,
        };
        named.or_else(|| {
            (0..feed.len())
                .filter_map(|taken| self.direction.entry_index(taken, feed.len()))
                .find(|index| pending.contains(index))
        })
    }
}

impl<ApiClient> ApiClientWrapper<ApiClient>
where
    ApiClient: StreamFeedClient + Send + Sync,
{
    /// Oldest to newest traversal with default options
    pub fn open_forward(&self, stream_id: StreamId) -> StreamFeedCursor<'_, ApiClient> {
        self.open_cursor(stream_id, Direction::Forward, CursorOptions::default())
    }

    /// Newest to oldest traversal with default options
    pub fn open_backward(&self, stream_id: StreamId) -> StreamFeedCursor<'_, ApiClient> {
        self.open_cursor(stream_id, Direction::Backward, CursorOptions::default())
    }

    pub fn open_cursor(
        &self,
        stream_id: StreamId,
        direction: Direction,
        options: CursorOptions,
    ) -> StreamFeedCursor<'_, ApiClient> {
        tracing::debug!(stream = %stream_id, ?direction, ?options, "open cursor");
        StreamFeedCursor::new(self, stream_id, direction, options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::*;
    use estore_common::Retry;
    use estore_proto::types::{LinkRelation, StreamDeletion};
    use futures::StreamExt;
    use rstest::rstest;
    use serde_json::json;

    fn fixture_api(fixture: FeedFixture) -> ApiClientWrapper<FeedFixture> {
        ApiClientWrapper::new(fixture, Retry::none())
    }

    fn id(name: &str) -> StreamId {
        StreamId::new(name).unwrap()
    }

    async fn drain<C: StreamFeedClient + Send + Sync>(
        cursor: &mut StreamFeedCursor<'_, C>,
    ) -> Vec<u64> {
        let mut versions = vec![];
        while let Some(event) = cursor.advance().await.unwrap() {
            versions.push(event.version());
        }
        versions
    }

    #[tokio::test]
    async fn orders_forward_and_backward() {
        let api = fixture_api(FeedFixture::new(2).with_stream("orders", 3));

        let mut forward = api.open_forward(id("orders"));
        assert_eq!(drain(&mut forward).await, vec![0, 1, 2]);
        assert!(forward.is_terminated());

        let mut backward = api.open_backward(id("orders"));
        assert_eq!(drain(&mut backward).await, vec![2, 1, 0]);
        assert_eq!(backward.direction(), Direction::Backward);
    }

    #[tokio::test]
    async fn ghost_stream_is_gone() {
        let api = fixture_api(FeedFixture::new(2).with_deleted_stream("ghost", StreamDeletion::Hard));
        let mut cursor = api.open_forward(id("ghost"));
        let err = cursor.advance().await.unwrap_err();
        assert!(matches!(err, FeedError::Gone { .. }));
    }

    #[tokio::test]
    async fn missing_stream_is_not_found() {
        let api = fixture_api(FeedFixture::new(2));
        let mut cursor = api.open_backward(id("nothing-here"));
        assert!(cursor.advance().await.unwrap_err().is_not_found());
    }

    #[rstest]
    #[case(Direction::Forward, 0)]
    #[case(Direction::Backward, 0)]
    #[case(Direction::Forward, 1)]
    #[case(Direction::Backward, 4)]
    #[case(Direction::Forward, 7)]
    #[case(Direction::Backward, 7)]
    #[tokio::test]
    async fn every_event_exactly_once(#[case] direction: Direction, #[case] len: u64) {
        let api = fixture_api(FeedFixture::new(3).with_stream("orders", len));
        let mut cursor = api.open_cursor(id("orders"), direction, CursorOptions::default());
        let mut expected: Vec<u64> = (0..len).collect();
        if direction == Direction::Backward {
            expected.reverse();
        }
        assert_eq!(drain(&mut cursor).await, expected);
    }

    #[rstest]
    #[case(Direction::Forward)]
    #[case(Direction::Backward)]
    #[tokio::test]
    async fn embed_modes_yield_identical_events(#[case] direction: Direction) {
        let api = fixture_api(FeedFixture::new(2).with_stream("orders", 5));
        let mut runs = vec![];
        for (embed_mode, batch) in [
            (EmbedMode::None, BatchPolicy::Eager),
            (EmbedMode::None, BatchPolicy::Lazy),
            (EmbedMode::Rich, BatchPolicy::Eager),
            (EmbedMode::Body, BatchPolicy::Eager),
        ] {
            let options = CursorOptions::default()
                .with_embed_mode(embed_mode)
                .with_batch(batch);
            let events: Vec<EventRecord> = api
                .open_cursor(id("orders"), direction, options)
                .into_stream()
                .map(|e| e.unwrap())
                .collect()
                .await;
            runs.push(events);
        }
        assert_eq!(runs[0].len(), 5);
        assert_eq!(runs[0][1].metadata(), Some(&json!({"by": "fixture"})));
        assert_eq!(runs[0][0].metadata(), runs[3][0].metadata());
        for run in &runs[1..] {
            assert_eq!(run, &runs[0]);
        }
    }

    #[tokio::test]
    async fn body_mode_needs_no_event_reads() {
        let api = fixture_api(FeedFixture::new(2).with_stream("orders", 3));
        let options = CursorOptions::default().with_embed_mode(EmbedMode::Body);
        let mut cursor = api.open_cursor(id("orders"), Direction::Forward, options);
        assert_eq!(drain(&mut cursor).await, vec![0, 1, 2]);
        let stats = api.api_client.stats();
        assert_eq!(stats.read_event.get_count(), 0);
        assert_eq!(stats.read_event_batch.get_count(), 0);
    }

    #[tokio::test]
    async fn two_entry_page_resolves_in_one_batch() {
        let api = fixture_api(FeedFixture::new(2).with_stream("orders", 2));
        let mut cursor = api.open_backward(id("orders"));
        assert_eq!(cursor.advance().await.unwrap().unwrap().version(), 1);
        assert_eq!(cursor.advance().await.unwrap().unwrap().version(), 0);

        let stats = api.api_client.stats();
        assert_eq!(stats.read_event_batch.get_count(), 1);
        assert_eq!(stats.read_event.get_count(), 0);
    }

    #[tokio::test]
    async fn lazy_policy_reads_events_as_taken() {
        let api = fixture_api(FeedFixture::new(2).with_stream("orders", 2));
        let options = CursorOptions::default().with_batch(BatchPolicy::Lazy);
        let mut cursor = api.open_cursor(id("orders"), Direction::Backward, options);
        cursor.advance().await.unwrap();

        let stats = api.api_client.stats();
        assert_eq!(stats.read_event.get_count(), 1);
        assert_eq!(stats.read_event_batch.get_count(), 0);
        cursor.advance().await.unwrap();
        assert_eq!(stats.read_event.get_count(), 2);
    }

    #[tokio::test]
    async fn termination_is_idempotent() {
        let api = fixture_api(FeedFixture::new(2).with_stream("orders", 3));
        let mut cursor = api.open_forward(id("orders"));
        drain(&mut cursor).await;
        let requests = api.api_client.stats().read_requests();
        for _ in 0..3 {
            assert_eq!(cursor.advance().await.unwrap(), None);
        }
        assert_eq!(api.api_client.stats().read_requests(), requests);

        let api = fixture_api(FeedFixture::new(2).with_deleted_stream("ghost", StreamDeletion::Hard));
        let mut cursor = api.open_backward(id("ghost"));
        let first = cursor.advance().await.unwrap_err();
        let requests = api.api_client.stats().read_requests();
        for _ in 0..3 {
            assert_eq!(cursor.advance().await.unwrap_err(), first);
        }
        assert_eq!(api.api_client.stats().read_requests(), requests);
        assert!(cursor.is_terminated());
    }

    #[tokio::test]
    async fn deletion_mid_traversal_is_gone() {
        let api = fixture_api(FeedFixture::new(2).with_stream("orders", 5));
        let mut cursor = api.open_forward(id("orders"));
        assert_eq!(cursor.advance().await.unwrap().unwrap().version(), 0);
        assert_eq!(cursor.advance().await.unwrap().unwrap().version(), 1);

        api.delete_stream(&id("orders"), StreamDeletion::Hard)
            .await
            .unwrap();

        let err = cursor.advance().await.unwrap_err();
        assert!(matches!(err, FeedError::Gone { .. }));
        assert_eq!(cursor.advance().await.unwrap_err(), err);
    }

    #[rstest]
    #[case(BatchPolicy::Eager, Direction::Forward, 2, vec![0, 1])]
    #[case(BatchPolicy::Lazy, Direction::Forward, 2, vec![0, 1])]
    #[case(BatchPolicy::Eager, Direction::Forward, 3, vec![0, 1, 2])]
    #[case(BatchPolicy::Lazy, Direction::Forward, 3, vec![0, 1, 2])]
    #[case(BatchPolicy::Eager, Direction::Backward, 0, vec![3, 2, 1])]
    #[case(BatchPolicy::Lazy, Direction::Backward, 0, vec![3, 2, 1])]
    #[tokio::test]
    async fn unresolvable_entry_fails_after_the_events_before_it(
        #[case] batch: BatchPolicy,
        #[case] direction: Direction,
        #[case] missing: u64,
        #[case] expected: Vec<u64>,
    ) {
        let api = fixture_api(
            FeedFixture::new(2)
                .with_stream("orders", 4)
                .with_missing_event("orders", missing),
        );
        let options = CursorOptions::default().with_batch(batch);
        let mut cursor = api.open_cursor(id("orders"), direction, options);
        let mut seen = vec![];
        let err = loop {
            match cursor.advance().await {
                Ok(Some(event)) => seen.push(event.version()),
                Ok(None) => panic!("stream ended without the missing event"),
                Err(e) => break e,
            }
        };
        assert_eq!(seen, expected);
        assert!(err.is_not_found());
        assert_eq!(
            matches!(err, FeedError::ResolutionBatchFailure { .. }),
            batch == BatchPolicy::Eager
        );
        assert_eq!(cursor.advance().await.unwrap_err(), err);
    }

    #[tokio::test]
    async fn batch_failure_naming_no_entry_fails_at_the_next_entry() {
        let mut mock_api = MockApiClient::new();
        mock_api
            .expect_stream_url()
            .returning(|stream| format!("http://h/streams/{stream}"));
        mock_api.expect_read_feed().times(1).returning(|url, embed_mode| {
            let page = json!({
                "links": [{"uri": url, "relation": "self"}],
                "entries": [
                    {"id": "http://h/streams/orders/1"},
                    {"id": "http://h/streams/orders/0"}
                ]
            });
            StreamFeed::from_value(page, embed_mode, url)
        });
        mock_api
            .expect_read_event_batch()
            .times(1)
            .returning(|_| Err(FeedError::Unauthorized { url: "http://h".into() }));
        mock_api.expect_read_event().never();

        let api = ApiClientWrapper::new(mock_api, Retry::none());
        let mut cursor = api.open_forward(id("orders"));
        let err = cursor.advance().await.unwrap_err();
        assert!(matches!(err, FeedError::ResolutionBatchFailure { .. }));
        assert!(err.root().is_unauthorized());
    }

    #[tokio::test]
    async fn stream_ends_after_the_failure() {
        let api = fixture_api(FeedFixture::new(2).with_deleted_stream("ghost", StreamDeletion::Hard));
        let items: Vec<_> = api.open_forward(id("ghost")).into_stream().collect().await;
        assert_eq!(items.len(), 1);
        assert!(items[0].as_ref().unwrap_err().is_gone());
    }

    #[tokio::test]
    async fn batch_covers_both_entries_of_a_reference_page() {
        let mut mock_api = MockApiClient::new();
        mock_api
            .expect_stream_url()
            .returning(|stream| format!("http://h/streams/{stream}"));
        mock_api
            .expect_read_feed()
            .times(2)
            .returning(|url, embed_mode| {
                let page = if url.ends_with("/orders") {
                    json!({
                        "links": [
                            {"uri": url, "relation": "self"},
                            {"uri": "http://h/streams/orders/2/forward/2", "relation": "previous"}
                        ],
                        "entries": [
                            {"id": "http://h/streams/orders/1"},
                            {"id": "http://h/streams/orders/0"}
                        ]
                    })
                } else {
                    json!({"links": [{"uri": url, "relation": "self"}], "entries": []})
                };
                StreamFeed::from_value(page, embed_mode, url)
            });
        mock_api
            .expect_read_event_batch()
            .withf(|urls| {
                urls == ["http://h/streams/orders/1", "http://h/streams/orders/0"]
            })
            .times(1)
            .returning(|urls| {
                Ok(urls
                    .iter()
                    .enumerate()
                    .map(|(i, _)| EventRecord::new("OrderPlaced", 1 - i as u64, json!({}), None))
                    .collect())
            });
        mock_api.expect_read_event().never();

        let api = ApiClientWrapper::new(mock_api, Retry::none());
        let mut cursor = api.open_forward(id("orders"));
        assert_eq!(cursor.advance().await.unwrap().unwrap().version(), 0);
        assert_eq!(cursor.advance().await.unwrap().unwrap().version(), 1);
        assert_eq!(cursor.advance().await.unwrap(), None);
    }

    #[tokio::test]
    async fn forward_starts_from_the_last_page() {
        let api = fixture_api(FeedFixture::new(2).with_stream("orders", 6));
        let head = api
            .open_stream_feed(&id("orders"), EmbedMode::None)
            .await
            .unwrap();
        assert!(head.has_link(LinkRelation::Last));

        let mut cursor = api.open_forward(id("orders"));
        assert_eq!(cursor.advance().await.unwrap().unwrap().version(), 0);
    }
}
