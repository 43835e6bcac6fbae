use super::LinkRelation;

/// Chronological direction of a traversal. Fixed for the lifetime of a cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// oldest to newest
    Forward,
    /// newest to oldest
    Backward,
}

impl Direction {
    /// Relation followed from the head page to reach the first page of the traversal.
    /// `None` means the traversal starts on the head page itself.
    pub fn starting_relation(&self) -> Option<LinkRelation> {
        match self {
            Self::Forward => Some(LinkRelation::Last),
            Self::Backward => None,
        }
    }

    /// Relation followed once a page is exhausted
    pub fn advancing_relation(&self) -> LinkRelation {
        match self {
            Self::Forward => LinkRelation::Previous,
            Self::Backward => LinkRelation::Next,
        }
    }

    /// Position in a newest-first page of the `taken`-th entry this direction consumes
    pub fn entry_index(&self, taken: usize, len: usize) -> Option<usize> {
        if taken >= len {
            return None;
        }
        match self {
            Self::Forward => Some(len - 1 - taken),
            Self::Backward => Some(taken),
        }
    }
}
