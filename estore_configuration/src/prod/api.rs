//! Release configuration for API calls

/// how many times a retryable request is re-issued
pub const DEFAULT_RETRIES: usize = 5;

/// wait before the first re-issue, in milliseconds
pub const DEFAULT_RETRY_DELAY_MS: u64 = 200;
