use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::session::TransitionGate;

/// Periodic elapsed-time output while the session is recording
pub struct ProgressReporter {
    gate: TransitionGate,
    interval: Duration,
    cancel: CancellationToken,
}

impl ProgressReporter {
    pub fn new(gate: TransitionGate, interval: Duration, cancel: CancellationToken) -> Self {
        Self {
            gate,
            interval,
            cancel,
        }
    }

    /// Tick until cancelled or the session reaches a terminal state
    pub async fn run(self) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => break,
                _ = ticker.tick() => {
                    if self.gate.emit_progress().is_terminal() {
                        break;
                    }
                }
            }
        }

        debug!("Progress reporter stopped");
    }
}
