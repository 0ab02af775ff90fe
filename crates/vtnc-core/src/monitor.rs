// ── Controller liveness ──
//
// Edge-triggered UP/DOWN detection over a periodic probe. Single
// failures and single successes never flip the state; a transition
// needs `down_threshold` consecutive failures or `up_threshold`
// consecutive successes. The per-controller probe loop lives in the
// coordinator; this module is the state machine and the observers.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::watch;
use tokio::time::timeout;

use crate::config::LivenessConfig;
use crate::error::CoreError;

/// Observed reachability of a controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ControllerState {
    /// Registered but not yet determined either way.
    Unknown,
    Up,
    Down,
}

impl ControllerState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unknown => "UNKNOWN",
            Self::Up => "UP",
            Self::Down => "DOWN",
        }
    }
}

impl std::fmt::Display for ControllerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One recorded state change, newest last in the history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StateTransition {
    pub state: ControllerState,
    pub at: DateTime<Utc>,
}

/// Consecutive-outcome debouncer. Controllers start UNKNOWN and earn
/// UP or DOWN through `up_threshold` straight successes or
/// `down_threshold` straight failures; the same thresholds govern
/// every later flip.
#[derive(Debug)]
pub(crate) struct Debounce {
    state: ControllerState,
    up_threshold: u32,
    down_threshold: u32,
    successes: u32,
    failures: u32,
}

impl Debounce {
    pub(crate) fn new(config: &LivenessConfig) -> Self {
        Self {
            state: ControllerState::Unknown,
            up_threshold: config.up_threshold,
            down_threshold: config.down_threshold,
            successes: 0,
            failures: 0,
        }
    }

    pub(crate) fn state(&self) -> ControllerState {
        self.state
    }

    /// Feed one probe outcome. Returns the new state only on a
    /// transition edge.
    pub(crate) fn observe(&mut self, reachable: bool) -> Option<ControllerState> {
        if reachable {
            self.failures = 0;
            self.successes += 1;
            if self.state != ControllerState::Up && self.successes >= self.up_threshold {
                self.state = ControllerState::Up;
                return Some(ControllerState::Up);
            }
        } else {
            self.successes = 0;
            self.failures += 1;
            if self.state != ControllerState::Down && self.failures >= self.down_threshold {
                self.state = ControllerState::Down;
                return Some(ControllerState::Down);
            }
        }
        None
    }
}

/// Block until `rx` reports `target`. Fails with
/// [`CoreError::WaitTimeout`] once `wait` elapses, or with
/// [`CoreError::NoSuchController`] if the controller is unregistered
/// while the wait is in flight.
pub async fn wait_until_state(
    controller: &str,
    mut rx: watch::Receiver<ControllerState>,
    target: ControllerState,
    wait: std::time::Duration,
) -> Result<(), CoreError> {
    let reached = timeout(wait, async {
        loop {
            if *rx.borrow_and_update() == target {
                return Ok(());
            }
            if rx.changed().await.is_err() {
                // Sender dropped: the controller was removed.
                return Err(());
            }
        }
    })
    .await;

    match reached {
        Ok(Ok(())) => Ok(()),
        Ok(Err(())) => Err(CoreError::NoSuchController {
            name: controller.to_owned(),
        }),
        Err(_) => Err(CoreError::WaitTimeout {
            controller: controller.to_owned(),
            target: target.as_str().to_owned(),
            waited_ms: wait.as_millis() as u64,
        }),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    fn debounce(up: u32, down: u32) -> Debounce {
        Debounce::new(&LivenessConfig {
            up_threshold: up,
            down_threshold: down,
            ..LivenessConfig::default()
        })
    }

    #[test]
    fn starts_unknown_and_earns_up() {
        let mut d = debounce(2, 3);
        assert_eq!(d.state(), ControllerState::Unknown);
        assert_eq!(d.observe(true), None);
        assert_eq!(d.observe(true), Some(ControllerState::Up));
        // Already UP: further successes are not edges.
        assert_eq!(d.observe(true), None);
    }

    #[test]
    fn unreachable_from_the_start_goes_down() {
        let mut d = debounce(2, 3);
        assert_eq!(d.observe(false), None);
        assert_eq!(d.observe(false), None);
        assert_eq!(d.observe(false), Some(ControllerState::Down));
    }

    #[test]
    fn single_blip_does_not_flip() {
        let mut d = debounce(1, 3);
        assert_eq!(d.observe(true), Some(ControllerState::Up));

        assert_eq!(d.observe(false), None);
        assert_eq!(d.observe(false), None);
        // A success resets the failure streak.
        assert_eq!(d.observe(true), None);
        assert_eq!(d.state(), ControllerState::Up);

        assert_eq!(d.observe(false), None);
        assert_eq!(d.observe(false), None);
        assert_eq!(d.observe(false), Some(ControllerState::Down));
    }

    #[tokio::test(start_paused = true)]
    async fn wait_resolves_on_transition() {
        let (tx, rx) = watch::channel(ControllerState::Down);
        let waiter = tokio::spawn(wait_until_state(
            "c1",
            rx,
            ControllerState::Up,
            Duration::from_secs(10),
        ));

        tokio::time::sleep(Duration::from_secs(1)).await;
        tx.send(ControllerState::Up).unwrap();
        waiter.await.unwrap().unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn wait_reports_removed_controller_not_timeout() {
        let (tx, rx) = watch::channel(ControllerState::Down);
        drop(tx);

        // The deadline has not elapsed; the controller is simply gone.
        let err = wait_until_state("c1", rx, ControllerState::Up, Duration::from_secs(60))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::NoSuchController { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn wait_times_out() {
        let (_tx, rx) = watch::channel(ControllerState::Down);
        let err = wait_until_state("c1", rx, ControllerState::Up, Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::WaitTimeout { waited_ms: 5000, .. }));
    }
}
