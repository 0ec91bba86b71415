//! Recommendation tunables.
//!
//! Every field has a default, so an empty TOML document is a valid config.
//! Scoring weights are not tunable; they are fixed constants in
//! [`crate::preference`] and [`crate::scorer`].

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{RendezvousError, Result};
use crate::temporal;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecommendConfig {
    /// Cell size of backend status strings.
    pub granularity_minutes: u32,
    /// Spacing between consecutive candidate slot starts.
    pub slot_step_minutes: u32,
    /// Cap on the ranked slot list.
    pub max_results: usize,
    /// Cap on the conflicted alternatives returned alongside recommendations.
    pub max_alternatives: usize,
    /// Per-tenant fetch timeout.
    pub fetch_timeout_secs: u64,
    /// Longest accepted request range.
    pub max_range_days: u32,
    /// Zone handed to the backend when a request names none.
    pub default_time_zone: String,
}

impl Default for RecommendConfig {
    fn default() -> Self {
        Self {
            granularity_minutes: 30,
            slot_step_minutes: 30,
            max_results: 20,
            max_alternatives: 5,
            fetch_timeout_secs: 30,
            max_range_days: 31,
            default_time_zone: "UTC".to_string(),
        }
    }
}

impl RecommendConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: RecommendConfig =
            toml::from_str(raw).map_err(|e| RendezvousError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            RendezvousError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&raw)
    }

    pub fn validate(&self) -> Result<()> {
        let zero = |field: &str| -> Result<()> {
            Err(RendezvousError::Config(format!("{} must be positive", field)))
        };
        if self.granularity_minutes == 0 {
            return zero("granularity_minutes");
        }
        if self.slot_step_minutes == 0 {
            return zero("slot_step_minutes");
        }
        if self.max_results == 0 {
            return zero("max_results");
        }
        if self.fetch_timeout_secs == 0 {
            return zero("fetch_timeout_secs");
        }
        if self.max_range_days == 0 {
            return zero("max_range_days");
        }
        temporal::parse_time_zone(&self.default_time_zone)
            .map_err(|e| RendezvousError::Config(e.to_string()))?;
        Ok(())
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}
