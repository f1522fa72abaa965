use serde::{Deserialize, Serialize};
use std::time::Duration;

fn default_wait_secs() -> u64 {
    5
}

fn default_poll_interval_ms() -> u64 {
    250
}

/// Wait budget shared by shadow searches and explicit waits.
///
/// Deserializable so a host configuration layer can supply it; defaults to
/// 5 seconds total with a 250ms poll interval.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct WaitConfig {
    /// Total wait budget in seconds.
    #[serde(default = "default_wait_secs")]
    pub wait_secs: u64,
    /// Sleep between polls in milliseconds.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl Default for WaitConfig {
    fn default() -> Self {
        WaitConfig {
            wait_secs: default_wait_secs(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

impl WaitConfig {
    /// Budget of `wait_secs` seconds with the default poll interval.
    pub fn from_secs(wait_secs: u64) -> Self {
        WaitConfig {
            wait_secs,
            ..Default::default()
        }
    }

    pub fn wait_duration(&self) -> Duration {
        Duration::from_secs(self.wait_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}
