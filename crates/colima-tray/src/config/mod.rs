mod behaviour_config;
#[allow(clippy::module_inception)]
mod config;
mod engine_config;
mod runtime_config;
mod terminal_config;

pub(crate) use {
    behaviour_config::BehaviourConfig, config::Config, engine_config::EngineConfig,
    runtime_config::RuntimeConfig, terminal_config::TerminalConfig,
};

pub(crate) const DEFAULT_RUNTIME_BINARY: &str = "colima";
pub(crate) const DEFAULT_ENGINE_BINARY: &str = "docker";
pub(crate) const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;
pub(crate) const DEFAULT_RESCAN_INTERVAL_SECS: u64 = 30;
pub(crate) const DEFAULT_NOTIFY_ON_FAILURE: bool = false;

pub(crate) fn default_runtime_binary() -> String {
    DEFAULT_RUNTIME_BINARY.to_string()
}

pub(crate) fn default_engine_binary() -> String {
    DEFAULT_ENGINE_BINARY.to_string()
}

pub(crate) fn default_poll_interval_secs() -> u64 {
    DEFAULT_POLL_INTERVAL_SECS
}

pub(crate) fn default_rescan_interval_secs() -> u64 {
    DEFAULT_RESCAN_INTERVAL_SECS
}

pub(crate) fn default_notify_on_failure() -> bool {
    DEFAULT_NOTIFY_ON_FAILURE
}
