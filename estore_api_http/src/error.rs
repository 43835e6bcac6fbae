use estore_proto::FeedError;

#[derive(Debug, thiserror::Error)]
pub enum HttpClientError {
    #[error(transparent)]
    Reqwest(#[from] reqwest::Error),
    #[error("error deserializing json response {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),
    #[error("host url {0} cannot carry a path")]
    NotABase(String),
}

impl HttpClientError {
    /// Attach the request url and fold into the domain taxonomy
    pub fn into_feed_error(self, url: &str) -> FeedError {
        match self {
            Self::Reqwest(e) => FeedError::Transport {
                url: url.to_string(),
                status: e.status().map(|s| s.as_u16()),
                message: e.to_string(),
            },
            Self::Json(e) => FeedError::malformed(url, e),
            Self::Url(e) => FeedError::InvalidArgument(format!("{url}: {e}")),
            Self::NotABase(host) => FeedError::InvalidArgument(format!("{host} is not a base url")),
        }
    }
}
