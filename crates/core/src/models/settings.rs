use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::errors::CoreError;

pub const DEFAULT_ENDPOINT: &str = "https://cursor.com/api/dashboard/list-invoices";
pub const DEFAULT_PANEL_ID: &str = "cis-invoice-summary-panel";
pub const DEFAULT_ANCHOR_TITLE: &str = "Invoices";

/// Tunables for the presence coordinator and the invoice source.
///
/// Every field has a default; a JSON override only needs the fields it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinatorSettings {
    /// list-invoices endpoint
    pub endpoint: String,

    /// Element id of the injected panel
    pub panel_id: String,

    /// Title text identifying the anchor card
    pub anchor_title: String,

    /// Trailing-edge debounce applied to host mutations
    #[serde(with = "millis")]
    pub debounce: Duration,

    /// How many times to look for the anchor before giving up
    pub anchor_poll_attempts: u32,

    /// Pause between anchor lookups
    #[serde(with = "millis")]
    pub anchor_poll_interval: Duration,

    /// HTTP request timeout
    #[serde(with = "millis")]
    pub request_timeout: Duration,
}

impl Default for CoordinatorSettings {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            panel_id: DEFAULT_PANEL_ID.to_string(),
            anchor_title: DEFAULT_ANCHOR_TITLE.to_string(),
            debounce: Duration::from_millis(200),
            anchor_poll_attempts: 40,
            anchor_poll_interval: Duration::from_millis(200),
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl CoordinatorSettings {
    /// Parse settings from JSON, filling anything absent with defaults.
    pub fn from_json(json: &str) -> Result<Self, CoreError> {
        let settings: Self = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Reject settings the coordinator cannot work with.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.panel_id.trim().is_empty() {
            return Err(CoreError::Config("panel_id must not be empty".into()));
        }
        if self.anchor_title.trim().is_empty() {
            return Err(CoreError::Config("anchor_title must not be empty".into()));
        }
        if self.endpoint.trim().is_empty() {
            return Err(CoreError::Config("endpoint must not be empty".into()));
        }
        Ok(())
    }
}

mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}
