use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::FeedError;

/// Name of a stream. Never empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct StreamId(String);

impl StreamId {
    pub fn new(id: impl Into<String>) -> Result<Self, FeedError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(FeedError::InvalidArgument(
                "stream id cannot be empty".to_string(),
            ));
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for StreamId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for StreamId {
    type Err = FeedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for StreamId {
    type Error = FeedError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<&str> for StreamId {
    type Error = FeedError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<StreamId> for String {
    fn from(id: StreamId) -> String {
        id.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_ids() {
        assert!(StreamId::new("").is_err());
        assert!(StreamId::new("   ").is_err());
        assert!(serde_json::from_str::<StreamId>("\"\"").is_err());
    }

    #[test]
    fn keeps_the_name_verbatim() {
        let id: StreamId = "$ce-orders".parse().unwrap();
        assert_eq!(id.as_str(), "$ce-orders");
        assert_eq!(id.to_string(), "$ce-orders");
    }
}
