use std::fmt;
use std::str::FromStr;

/// Named pointer from a feed page to another page or to the stream's metadata.
///
/// Pages are served newest-first: `next` always leads to older entries and `previous`
/// to newer ones, whichever way a reader is walking the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LinkRelation {
    /// the head page
    First,
    /// the page holding the oldest entries
    Last,
    /// the next older page
    Next,
    /// the next newer page
    Previous,
    /// the page itself
    SelfLink,
    Metadata,
    Edit,
    Alternate,
}

impl LinkRelation {
    pub const ALL: [LinkRelation; 8] = [
        Self::First,
        Self::Last,
        Self::Next,
        Self::Previous,
        Self::SelfLink,
        Self::Metadata,
        Self::Edit,
        Self::Alternate,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::First => "first",
            Self::Last => "last",
            Self::Next => "next",
            Self::Previous => "previous",
            Self::SelfLink => "self",
            Self::Metadata => "metadata",
            Self::Edit => "edit",
            Self::Alternate => "alternate",
        }
    }
}

impl fmt::Display for LinkRelation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
#[error("unknown link relation {0}")]
pub struct UnknownLinkRelation(pub String);

impl FromStr for LinkRelation {
    type Err = UnknownLinkRelation;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|r| r.as_str() == s)
            .ok_or_else(|| UnknownLinkRelation(s.to_string()))
    }
}
