use estore_common::RetryableError;
use thiserror::Error;

/// Classified failure of a call against the event store.
///
/// Every variant carries owned data only, so a terminal failure can be handed out again
/// without re-issuing the request that produced it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FeedError {
    #[error("no stream or event found at {url}")]
    NotFound { url: String },
    #[error("stream at {url} has been permanently deleted")]
    Gone { url: String },
    #[error("unauthorized request to {url}")]
    Unauthorized { url: String },
    #[error("malformed feed at {url}: {reason}")]
    MalformedFeed { url: String, reason: String },
    #[error("transport error at {url}: {message}")]
    Transport {
        url: String,
        /// http status, absent when no response was received
        status: Option<u16>,
        message: String,
    },
    #[error("batch resolution failed at {url}: {source}")]
    ResolutionBatchFailure {
        url: String,
        #[source]
        source: Box<FeedError>,
    },
    #[error("wrong expected version writing to stream {stream}")]
    WrongExpectedVersion { stream: String },
    #[error("projection {name} not found")]
    ProjectionNotFound { name: String },
    #[error("projection {name} already exists")]
    ProjectionAlreadyExists { name: String },
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl FeedError {
    pub fn malformed(url: impl Into<String>, reason: impl ToString) -> Self {
        Self::MalformedFeed {
            url: url.into(),
            reason: reason.to_string(),
        }
    }

    pub fn transport(url: impl Into<String>, message: impl ToString) -> Self {
        Self::Transport {
            url: url.into(),
            status: None,
            message: message.to_string(),
        }
    }

    /// Wrap the failure of one member of a batch resolution
    pub fn batch(url: impl Into<String>, source: FeedError) -> Self {
        Self::ResolutionBatchFailure {
            url: url.into(),
            source: Box::new(source),
        }
    }

    /// The underlying classification, looking through batch wrappers
    pub fn root(&self) -> &FeedError {
        match self {
            Self::ResolutionBatchFailure { source, .. } => source.root(),
            e => e,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self.root(), Self::NotFound { .. })
    }

    pub fn is_gone(&self) -> bool {
        matches!(self.root(), Self::Gone { .. })
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self.root(), Self::Unauthorized { .. })
    }

    pub fn status(&self) -> Option<u16> {
        match self.root() {
            Self::NotFound { .. } => Some(404),
            Self::Gone { .. } => Some(410),
            Self::Unauthorized { .. } => Some(401),
            Self::Transport { status, .. } => *status,
            _ => None,
        }
    }
}

/// Map a response status onto the read-path taxonomy.
/// 404, 410 and 401 are distinct outcomes; every other non-2xx status is a transport failure.
pub fn classify_status(status: u16, url: &str) -> Result<(), FeedError> {
    let url = url.to_string();
    match status {
        200..=299 => Ok(()),
        404 => Err(FeedError::NotFound { url }),
        410 => Err(FeedError::Gone { url }),
        401 => Err(FeedError::Unauthorized { url }),
        status => Err(FeedError::Transport {
            url,
            status: Some(status),
            message: format!("unexpected response status {status}"),
        }),
    }
}

impl RetryableError for FeedError {
    fn is_retryable(&self) -> bool {
        match self {
            Self::Transport { status: None, .. } => true,
            Self::Transport {
                status: Some(status),
                ..
            } => *status >= 500 || *status == 429,
            Self::ResolutionBatchFailure { source, .. } => source.is_retryable(),
            _ => false,
        }
    }
}
