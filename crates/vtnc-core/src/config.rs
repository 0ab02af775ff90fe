// ── Runtime configuration ──
//
// Tuning for liveness probing and southbound call bounds. Built by the
// embedding layer and passed into `Coordinator::new` -- the core never
// reads config files or ambient global state.

use std::time::Duration;

/// Liveness probe cadence and debounce thresholds.
#[derive(Debug, Clone)]
pub struct LivenessConfig {
    /// How often each controller is probed.
    pub probe_interval: Duration,
    /// Bound on a single probe round-trip.
    pub probe_timeout: Duration,
    /// Consecutive failed probes before declaring DOWN.
    pub down_threshold: u32,
    /// Consecutive successful probes before declaring UP.
    pub up_threshold: u32,
}

impl Default for LivenessConfig {
    fn default() -> Self {
        Self {
            probe_interval: Duration::from_secs(5),
            probe_timeout: Duration::from_secs(2),
            down_threshold: 3,
            up_threshold: 2,
        }
    }
}

/// Top-level coordinator configuration.
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    pub liveness: LivenessConfig,
    /// Bound on a single southbound get/push call (audit steps and
    /// immediate-path pushes). Expiry fails that one operation only.
    pub southbound_timeout: Duration,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            liveness: LivenessConfig::default(),
            southbound_timeout: Duration::from_secs(5),
        }
    }
}

impl CoordinatorConfig {
    /// Validate threshold sanity. A zero threshold would make the state
    /// machine transition on no evidence at all.
    pub fn validate(&self) -> Result<(), crate::error::CoreError> {
        if self.liveness.down_threshold == 0 || self.liveness.up_threshold == 0 {
            return Err(crate::error::CoreError::Config {
                message: "liveness thresholds must be at least 1".into(),
            });
        }
        if self.liveness.probe_interval.is_zero() {
            return Err(crate::error::CoreError::Config {
                message: "probe interval must be non-zero".into(),
            });
        }
        Ok(())
    }
}
