#![warn(clippy::unwrap_used)]

pub mod cursor;
pub mod feed;
pub mod projections;
pub mod streams;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

use std::sync::Arc;

use estore_common::Retry;
pub use estore_proto::api_client::EventStoreApi;
use estore_proto::api_client::{FeedStats, HasStats};
pub use estore_proto::FeedError;

pub use cursor::*;

/// Every wrapper operation surfaces the domain taxonomy unchanged
pub type Result<T> = std::result::Result<T, FeedError>;

pub mod strategies {
    use super::*;
    use estore_configuration::{DEFAULT_RETRIES, DEFAULT_RETRY_DELAY_MS};

    pub fn exponential_cooldown() -> Retry {
        Retry::builder()
            .retries(DEFAULT_RETRIES)
            .duration(std::time::Duration::from_millis(DEFAULT_RETRY_DELAY_MS))
            .build()
    }
}

#[derive(Clone, Debug)]
pub struct ApiClientWrapper<ApiClient> {
    pub api_client: ApiClient,
    pub(crate) retry_strategy: Arc<Retry>,
}

impl<ApiClient> ApiClientWrapper<ApiClient> {
    pub fn new(api_client: ApiClient, retry_strategy: Retry) -> Self {
        Self {
            api_client,
            retry_strategy: retry_strategy.into(),
        }
    }

    pub fn retry_strategy(&self) -> &Retry {
        &self.retry_strategy
    }
}

impl<ApiClient> HasStats for ApiClientWrapper<ApiClient>
where
    ApiClient: HasStats,
{
    fn feed_stats(&self) -> FeedStats {
        self.api_client.feed_stats()
    }
}

#[cfg(test)]
#[ctor::ctor]
fn _setup() {
    estore_common::logger()
}
