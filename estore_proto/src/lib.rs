//! Wire and domain types of the event store HTTP API, and the client traits every transport implements

mod error;
pub use error::*;

pub mod api_client;
pub mod types;

pub mod prelude {
    pub use crate::api_client::{
        EventStoreApi, HasStats, ProjectionClient, StreamFeedClient, StreamWriteClient,
    };
    pub use crate::error::FeedError;
    pub use crate::types::*;
}

#[cfg(test)]
#[ctor::ctor]
fn _setup() {
    estore_common::logger()
}
