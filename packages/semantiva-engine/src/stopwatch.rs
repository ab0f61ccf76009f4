use std::time::Instant;

use chrono::{DateTime, Utc};

/// Captures wall-clock timing for one node execution (§4.J), grounded on
/// `semantiva/pipeline/payload_processors.py`'s `Stopwatch` (`start`/`stop`/`elapsed_wall_time`).
///
/// `std`, and the rest of this workspace's dependency stack, expose no portable per-process CPU
/// clock without reaching for a platform syscall crate, so `cpu_ms` here is measured with the
/// same `Instant` as `wall_ms`: a faithful value only for the engine's own single-threaded,
/// synchronous step loop (§4.J, §5), where a node never yields to other work while it runs.
pub struct Stopwatch {
    start_wall: Option<Instant>,
    accumulated_wall_ms: f64,
    started_at: Option<DateTime<Utc>>,
    finished_at: Option<DateTime<Utc>>,
}

impl Stopwatch {
    pub fn new() -> Self {
        Self {
            start_wall: None,
            accumulated_wall_ms: 0.0,
            started_at: None,
            finished_at: None,
        }
    }

    pub fn start(&mut self) {
        if self.started_at.is_none() {
            self.started_at = Some(Utc::now());
        }
        self.start_wall = Some(Instant::now());
    }

    pub fn stop(&mut self) {
        if let Some(start) = self.start_wall.take() {
            self.accumulated_wall_ms += start.elapsed().as_secs_f64() * 1000.0;
        }
        self.finished_at = Some(Utc::now());
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    pub fn finished_at(&self) -> Option<DateTime<Utc>> {
        self.finished_at
    }

    pub fn wall_ms(&self) -> f64 {
        self.accumulated_wall_ms
    }

    /// See the struct-level doc comment: identical to `wall_ms` in this single-threaded executor.
    pub fn cpu_ms(&self) -> f64 {
        self.accumulated_wall_ms
    }
}

impl Default for Stopwatch {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;
    use std::time::Duration;

    #[test]
    fn start_stop_accumulates_elapsed_wall_time() {
        let mut sw = Stopwatch::new();
        sw.start();
        sleep(Duration::from_millis(5));
        sw.stop();
        assert!(sw.wall_ms() >= 5.0);
        assert!(sw.started_at().is_some());
        assert!(sw.finished_at().is_some());
    }

    #[test]
    fn accumulates_across_multiple_start_stop_cycles() {
        let mut sw = Stopwatch::new();
        sw.start();
        sleep(Duration::from_millis(2));
        sw.stop();
        let first = sw.wall_ms();
        sw.start();
        sleep(Duration::from_millis(2));
        sw.stop();
        assert!(sw.wall_ms() > first);
    }
}
