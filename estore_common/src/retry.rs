//! A retry strategy that works with rusts native [`std::error::Error`] type.
//!
//! Only errors that declare themselves retryable through [`RetryableError`] are re-issued.
//! Everything else is returned to the caller on the first failure.

use std::time::Duration;

use rand::Rng;
use smart_default::SmartDefault;

/// Specifies which errors are retryable.
/// All Errors are not retryable by-default.
pub trait RetryableError: std::error::Error {
    fn is_retryable(&self) -> bool;
}

impl<T: RetryableError + ?Sized> RetryableError for &T {
    fn is_retryable(&self) -> bool {
        (**self).is_retryable()
    }
}

/// Options to specify how to retry a function
#[derive(SmartDefault, Debug, PartialEq, Eq, Copy, Clone)]
pub struct Retry {
    #[default = 5]
    retries: usize,
    #[default(_code = "std::time::Duration::from_millis(200)")]
    duration: std::time::Duration,
    #[default = 3]
    multiplier: u32,
}

impl Retry {
    /// Get the number of retries this is configured with.
    pub fn retries(&self) -> usize {
        self.retries
    }

    /// Get the duration to wait before the first retry.
    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Wait before retry number `attempt` (1-based), growing by the multiplier with a little jitter
    pub fn backoff(&self, attempt: usize) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16) as u32;
        let jitter = rand::thread_rng().gen_range(0..=25);
        self.duration
            .saturating_mul(self.multiplier.saturating_pow(exponent))
            .saturating_add(Duration::from_millis(jitter))
    }

    /// A strategy that never re-issues a request
    pub fn none() -> Self {
        Self {
            retries: 0,
            ..Default::default()
        }
    }
}

/// Builder for [`Retry`].
///
/// # Example
/// ```
/// use estore_common::retry::RetryBuilder;
///
/// RetryBuilder::default()
///     .retries(5)
///     .duration(std::time::Duration::from_millis(1000))
///     .build();
/// ```
#[derive(Default, PartialEq, Eq, Copy, Clone)]
pub struct RetryBuilder {
    retries: Option<usize>,
    duration: Option<std::time::Duration>,
    multiplier: Option<u32>,
}

impl RetryBuilder {
    /// Specify the number of retries to allow
    pub fn retries(mut self, retries: usize) -> Self {
        self.retries = Some(retries);
        self
    }

    /// Specify the duration to wait before retrying again
    pub fn duration(mut self, duration: std::time::Duration) -> Self {
        self.duration = Some(duration);
        self
    }

    /// Specify how much the wait grows between consecutive retries
    pub fn multiplier(mut self, multiplier: u32) -> Self {
        self.multiplier = Some(multiplier);
        self
    }

    /// Build the Retry Strategy
    pub fn build(self) -> Retry {
        let mut retry = Retry::default();

        if let Some(retries) = self.retries {
            retry.retries = retries;
        }

        if let Some(duration) = self.duration {
            retry.duration = duration;
        }

        if let Some(multiplier) = self.multiplier {
            retry.multiplier = multiplier;
        }

        retry
    }
}

impl Retry {
    /// Get the builder for [`Retry`]
    pub fn builder() -> RetryBuilder {
        RetryBuilder::default()
    }
}

/// Retry an async block, specifying the strategy with $retry.
/// ```
/// use estore_common::{retry_async, retry::{RetryableError, Retry}};
/// use thiserror::Error;
///
/// #[derive(Debug, Error)]
/// enum MyError {
///     #[error("A retryable error")]
///     Retryable,
///     #[error("An error we don't want to retry")]
///     NotRetryable
/// }
///
/// impl RetryableError for MyError {
///     fn is_retryable(&self) -> bool {
///         matches!(self, Self::Retryable)
///     }
/// }
///
/// async fn fallable_fn(attempt: &mut usize) -> Result<(), MyError> {
///     *attempt += 1;
///     if *attempt == 2 {
///         return Ok(());
///     }
///     Err(MyError::Retryable)
/// }
///
/// #[tokio::main]
/// async fn main() -> Result<(), MyError> {
///     let mut attempt = 0;
///     retry_async!(Retry::default(), (async {
///         fallable_fn(&mut attempt).await
///     }))
/// }
/// ```
#[macro_export]
macro_rules! retry_async {
    ($retry: expr, $code: tt) => {{
        use tracing::Instrument as _;
        #[allow(unused)]
        use $crate::retry::RetryableError;
        let mut attempts = 0;
        let span = tracing::trace_span!("retry");
        loop {
            let span = span.clone();
            #[allow(clippy::redundant_closure_call)]
            let res = $code.instrument(span).await;
            match res {
                Ok(v) => break Ok(v),
                Err(e) => {
                    if (&e).is_retryable() && attempts < $retry.retries() {
                        attempts += 1;
                        tracing::warn!(
                            "retrying function that failed with error=`{}`, attempt {}",
                            e.to_string(),
                            attempts
                        );
                        $crate::time::sleep($retry.backoff(attempts)).await;
                    } else {
                        tracing::trace!("error is not retryable. {}", e);
                        break Err(e);
                    }
                }
            }
        }
    }};
}

#[cfg(test)]
mod tests {
    use super::*;
    use thiserror::Error;

    #[derive(Debug, Error)]
    enum SomeError {
        #[error("this is a retryable error")]
        ARetryableError,
        #[error("Dont retry")]
        DontRetryThis,
    }

    impl RetryableError for SomeError {
        fn is_retryable(&self) -> bool {
            matches!(self, Self::ARetryableError)
        }
    }

    fn fast() -> Retry {
        Retry::builder()
            .retries(3)
            .duration(Duration::from_millis(1))
            .multiplier(1)
            .build()
    }

    #[tokio::test]
    async fn it_retries_twice_and_succeeds() {
        let mut attempts = 0;
        let res: Result<(), SomeError> = retry_async!(
            fast(),
            (async {
                attempts += 1;
                if attempts == 3 {
                    return Ok(());
                }
                Err(SomeError::ARetryableError)
            })
        );
        assert!(res.is_ok());
        assert_eq!(attempts, 3);
    }

    #[tokio::test]
    async fn it_fails_after_exhausting_retries() {
        let mut attempts = 0;
        let res: Result<(), SomeError> = retry_async!(
            fast(),
            (async {
                attempts += 1;
                Err(SomeError::ARetryableError)
            })
        );
        assert!(res.is_err());
        assert_eq!(attempts, 4);
    }

    #[tokio::test]
    async fn it_only_runs_non_retryable_once() {
        let mut attempts = 0;
        let res: Result<(), SomeError> = retry_async!(
            fast(),
            (async {
                attempts += 1;
                Err(SomeError::DontRetryThis)
            })
        );
        assert!(matches!(res, Err(SomeError::DontRetryThis)));
        assert_eq!(attempts, 1);
    }

    #[tokio::test]
    async fn none_never_retries() {
        let mut attempts = 0;
        let res: Result<(), SomeError> = retry_async!(
            Retry::none(),
            (async {
                attempts += 1;
                Err(SomeError::ARetryableError)
            })
        );
        assert!(res.is_err());
        assert_eq!(attempts, 1);
    }

    #[test]
    fn backoff_grows_with_multiplier() {
        let retry = Retry::builder()
            .duration(Duration::from_millis(100))
            .multiplier(2)
            .build();
        let first = retry.backoff(1);
        let third = retry.backoff(3);
        assert!(first >= Duration::from_millis(100) && first <= Duration::from_millis(125));
        assert!(third >= Duration::from_millis(400) && third <= Duration::from_millis(425));
    }
}
