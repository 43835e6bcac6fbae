/// How much of each entry a feed page inlines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum EmbedMode {
    /// link-only entries, no query parameter is sent
    #[default]
    None,
    /// entries carry the event type and number
    Rich,
    /// entries additionally carry the event body and metadata
    Body,
}

impl EmbedMode {
    /// Value of the `embed` query parameter, `None` when no parameter is sent
    pub fn query_value(&self) -> Option<&'static str> {
        match self {
            Self::None => None,
            Self::Rich => Some("rich"),
            Self::Body => Some("body"),
        }
    }

    /// Whether entries of a page read in this mode may be used without fetching the event
    pub fn may_inline(&self) -> bool {
        match self {
            Self::None => false,
            Self::Rich | Self::Body => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn none_sends_no_parameter() {
        assert_eq!(EmbedMode::default(), EmbedMode::None);
        assert_eq!(EmbedMode::None.query_value(), None);
        assert_eq!(EmbedMode::Rich.query_value(), Some("rich"));
        assert_eq!(EmbedMode::Body.query_value(), Some("body"));
    }
}
