use serde::Deserialize;

use crate::FeedError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    OneTime,
    Continuous,
}

impl RunMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OneTime => "onetime",
            Self::Continuous => "continuous",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectionCommand {
    Enable,
    Disable,
    Reset,
}

impl ProjectionCommand {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Enable => "enable",
            Self::Disable => "disable",
            Self::Reset => "reset",
        }
    }
}

/// A server-side projection definition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Projection {
    mode: RunMode,
    name: String,
    body: String,
    checkpoints: bool,
    emit: bool,
    enabled: bool,
}

impl Projection {
    pub fn new(mode: RunMode, name: impl Into<String>) -> Result<Self, FeedError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(FeedError::InvalidArgument(
                "projection name cannot be empty".to_string(),
            ));
        }
        Ok(Self {
            mode,
            name,
            body: String::new(),
            checkpoints: true,
            emit: true,
            enabled: true,
        })
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_checkpoints(mut self, checkpoints: bool) -> Self {
        self.checkpoints = checkpoints;
        self
    }

    pub fn with_emit(mut self, emit: bool) -> Self {
        self.emit = emit;
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn mode(&self) -> RunMode {
        self.mode
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn emit(&self) -> bool {
        self.emit
    }

    /// Query parameters of the creation request
    pub fn create_params(&self) -> Vec<(&'static str, String)> {
        vec![
            ("name", self.name.clone()),
            ("emit", yes_no(self.emit).to_string()),
            ("checkpoints", yes_no(self.checkpoints).to_string()),
            ("enable", yes_no(self.enabled).to_string()),
        ]
    }
}

pub fn yes_no(flag: bool) -> &'static str {
    if flag {
        "yes"
    } else {
        "no"
    }
}

/// Runtime statistics of a projection as reported by the server
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Statistics {
    pub core_processing_time: Option<i64>,
    pub version: Option<i64>,
    pub epoch: Option<i64>,
    pub effective_name: Option<String>,
    pub writes_in_progress: Option<i64>,
    pub reads_in_progress: Option<i64>,
    pub partitions_cached: Option<i64>,
    pub status: Option<String>,
    pub state_reason: Option<String>,
    pub name: Option<String>,
    pub mode: Option<String>,
    pub position: Option<String>,
    pub progress: Option<f64>,
    pub last_checkpoint: Option<String>,
    pub events_processed_after_restart: Option<i64>,
    pub status_url: Option<String>,
    pub state_url: Option<String>,
    pub result_url: Option<String>,
    pub query_url: Option<String>,
    pub enable_command_url: Option<String>,
    pub disable_command_url: Option<String>,
    pub checkpoint_status: Option<String>,
    pub buffered_events: Option<i64>,
    pub write_pending_events_before_checkpoint: Option<i64>,
    pub write_pending_events_after_checkpoint: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn creation_params_default_to_yes() {
        let projection = Projection::new(RunMode::Continuous, "byCategory")
            .unwrap()
            .with_checkpoints(false);
        assert_eq!(
            projection.create_params(),
            vec![
                ("name", "byCategory".to_string()),
                ("emit", "yes".to_string()),
                ("checkpoints", "no".to_string()),
                ("enable", "yes".to_string()),
            ]
        );
        assert_eq!(projection.mode().as_str(), "continuous");
    }

    #[test]
    fn empty_name_is_rejected() {
        assert!(matches!(
            Projection::new(RunMode::OneTime, ""),
            Err(FeedError::InvalidArgument(_))
        ));
    }

    #[test]
    fn statistics_tolerate_partial_documents() {
        let stats: Statistics = serde_json::from_value(json!({
            "name": "byCategory",
            "status": "Running",
            "progress": 100.0,
            "bufferedEvents": 0,
            "somethingNew": true
        }))
        .unwrap();
        assert_eq!(stats.name.as_deref(), Some("byCategory"));
        assert_eq!(stats.status.as_deref(), Some("Running"));
        assert_eq!(stats.buffered_events, Some(0));
        assert_eq!(stats.epoch, None);
    }
}
