//! Stage timing that logs on drop

use std::time::{Duration, Instant};

/// Logs when a named stage starts and, on drop, how long it took
pub struct Timer {
    name: &'static str,
    start: Instant,
}

impl Timer {
    /// Start timing `name`
    pub fn start(name: &'static str) -> Self {
        tracing::info!("[{}] Started", name);
        Self {
            name,
            start: Instant::now(),
        }
    }

    /// Time since start
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Elapsed milliseconds, for response bodies
    pub fn elapsed_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        tracing::info!(
            "[{}] Finished in {:.2}s",
            self.name,
            self.start.elapsed().as_secs_f64()
        );
    }
}
