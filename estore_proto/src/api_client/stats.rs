use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

/// Calls per client operation.
///
/// A batch counts once under `read_event_batch`; the event reads it fans out into are not
/// added to `read_event`.
#[derive(Clone, Default, Debug)]
pub struct FeedStats {
    pub read_feed: Arc<EndpointStats>,
    /// single event reads issued through `read_event`
    pub read_event: Arc<EndpointStats>,
    /// `read_event_batch` calls, whatever their size
    pub read_event_batch: Arc<EndpointStats>,
    pub read_json: Arc<EndpointStats>,
    pub write_to_stream: Arc<EndpointStats>,
    pub delete_stream: Arc<EndpointStats>,
    pub projection: Arc<EndpointStats>,
}

impl FeedStats {
    pub fn clear(&self) {
        self.read_feed.clear();
        self.read_event.clear();
        self.read_event_batch.clear();
        self.read_json.clear();
        self.write_to_stream.clear();
        self.delete_stream.clear();
        self.projection.clear();
    }

    /// Read-side calls, a batch counting once
    pub fn read_requests(&self) -> usize {
        self.read_feed.get_count()
            + self.read_event.get_count()
            + self.read_event_batch.get_count()
            + self.read_json.get_count()
    }
}

#[derive(Default, Debug)]
pub struct EndpointStats {
    request_count: AtomicUsize,
}

impl std::fmt::Display for EndpointStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.request_count.load(Ordering::Relaxed))
    }
}

impl EndpointStats {
    pub fn count_request(&self) {
        self.request_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get_count(&self) -> usize {
        self.request_count.load(Ordering::Relaxed)
    }

    pub fn clear(&self) {
        self.request_count.store(0, Ordering::Relaxed)
    }
}
