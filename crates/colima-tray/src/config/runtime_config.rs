use crate::config::{default_poll_interval_secs, default_runtime_binary};

use serde::{Deserialize, Serialize};

/// VM runtime configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Runtime binary, looked up on `PATH` unless absolute.
    #[serde(default = "default_runtime_binary")]
    pub binary: String,

    /// Seconds between status polls for every entity.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            binary: default_runtime_binary(),
            poll_interval_secs: default_poll_interval_secs(),
        }
    }
}
