use crate::config::default_notify_on_failure;

use serde::{Deserialize, Serialize};

/// Application behaviour configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BehaviourConfig {
    /// Show a desktop notification when a start/stop/restart/delete fails.
    #[serde(default = "default_notify_on_failure")]
    pub notify_on_failure: bool,
}

impl Default for BehaviourConfig {
    fn default() -> Self {
        Self {
            notify_on_failure: default_notify_on_failure(),
        }
    }
}
