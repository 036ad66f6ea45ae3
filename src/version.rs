// Build identity baked in from Cargo.toml: served on /version, sent as the agent's User-Agent.

use serde::Serialize;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BuildInfo {
    pub name: &'static str,
    pub version: &'static str,
}

pub const BUILD: BuildInfo = BuildInfo {
    name: NAME,
    version: VERSION,
};

/// e.g. `hostmetrics-agent/0.3.0`
pub fn agent_user_agent() -> String {
    format!("{NAME}-agent/{VERSION}")
}
