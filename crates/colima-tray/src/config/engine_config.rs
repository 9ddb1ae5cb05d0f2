use crate::config::{default_engine_binary, default_rescan_interval_secs};

use serde::{Deserialize, Serialize};

/// Container engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Engine binary, looked up on `PATH` unless absolute.
    #[serde(default = "default_engine_binary")]
    pub binary: String,

    /// Seconds between container re-enumerations (0 = startup only).
    #[serde(default = "default_rescan_interval_secs")]
    pub rescan_interval_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            binary: default_engine_binary(),
            rescan_interval_secs: default_rescan_interval_secs(),
        }
    }
}
