use std::time::{Duration, Instant};

/// Elapsed recording time, excluding time spent paused
#[derive(Debug, Clone, Default)]
pub struct ElapsedClock {
    accumulated: Duration,
    running_since: Option<Instant>,
}

impl ElapsedClock {
    /// Reset to zero and start counting
    pub fn restart(&mut self) {
        self.accumulated = Duration::ZERO;
        self.running_since = Some(Instant::now());
    }

    /// Stop counting, keeping the accumulated time
    pub fn pause(&mut self) {
        if let Some(since) = self.running_since.take() {
            self.accumulated += since.elapsed();
        }
    }

    pub fn resume(&mut self) {
        if self.running_since.is_none() {
            self.running_since = Some(Instant::now());
        }
    }

    pub fn is_running(&self) -> bool {
        self.running_since.is_some()
    }

    pub fn elapsed(&self) -> Duration {
        match self.running_since {
            Some(since) => self.accumulated + since.elapsed(),
            None => self.accumulated,
        }
    }
}
