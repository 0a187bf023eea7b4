//! Health report value type, serializable for any readiness endpoint.

use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthState {
    Up,
    Down,
}

/// Result of one health check
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub check_id: String,
    pub state: HealthState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_error"
    )]
    pub error: Option<Arc<anyhow::Error>>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub details: BTreeMap<String, String>,
}

fn serialize_error<S: Serializer>(
    error: &Option<Arc<anyhow::Error>>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match error {
        Some(error) => serializer.serialize_str(&format!("{error:#}")),
        None => serializer.serialize_none(),
    }
}

impl HealthReport {
    pub fn up(check_id: impl Into<String>) -> Self {
        Self::with_state(check_id, HealthState::Up)
    }

    pub fn down(check_id: impl Into<String>) -> Self {
        Self::with_state(check_id, HealthState::Down)
    }

    fn with_state(check_id: impl Into<String>, state: HealthState) -> Self {
        Self {
            check_id: check_id.into(),
            state,
            message: None,
            error: None,
            details: BTreeMap::new(),
        }
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn error(mut self, error: Option<Arc<anyhow::Error>>) -> Self {
        self.error = error;
        self
    }

    pub fn detail(mut self, key: &str, value: impl ToString) -> Self {
        self.details.insert(key.to_string(), value.to_string());
        self
    }

    pub fn is_up(&self) -> bool {
        self.state == HealthState::Up
    }
}
