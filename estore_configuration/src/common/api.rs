//! Configuration values for the event store HTTP API

/// Name of the query parameter selecting how much of each entry a feed page inlines
pub const EMBED_QUERY_PARAM: &str = "embed";

/// Upper bound on event reads in flight during one batch resolution
pub const DEFAULT_BATCH_CONCURRENCY: usize = 8;

pub struct ApiUrls;

impl ApiUrls {
    pub const LOCAL_ADDRESS: &'static str = "http://127.0.0.1:2113";
}

/// Path segments of the REST surface, relative to the host url
pub struct RestApiEndpoints;

impl RestApiEndpoints {
    pub const STREAMS: &'static str = "streams";
    pub const PROJECTION: &'static str = "projection";
    pub const PROJECTIONS: &'static str = "projections";
    pub const COMMAND: &'static str = "command";
    pub const QUERY: &'static str = "query";
}

pub struct MediaTypes;

impl MediaTypes {
    /// Negotiates the JSON rendering of atom feeds and event documents
    pub const ATOM_JSON: &'static str = "application/vnd.eventstore.atom+json";
    /// Body of a batch write
    pub const EVENTS_JSON: &'static str = "application/vnd.eventstore.events+json";
    pub const JSON: &'static str = "application/json";
}

pub struct Headers;

impl Headers {
    pub const EXPECTED_VERSION: &'static str = "ES-ExpectedVersion";
    pub const HARD_DELETE: &'static str = "ES-HardDelete";
}
