use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Monotonic millisecond clock driving the scheduler.
pub trait Clock: Send {
    /// Milliseconds elapsed since the clock's epoch.
    fn now_ms(&self) -> f64;
}

/// Wall clock backed by `Instant`.
#[derive(Debug, Clone)]
pub struct SystemClock {
    epoch: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> f64 {
        self.epoch.elapsed().as_secs_f64() * 1000.0
    }
}

/// Simulated clock advanced explicitly. Clones share the same time.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    /// Current time in nanoseconds.
    nanos: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, ms: f64) {
        let delta = (ms * 1_000_000.0).round() as u64;
        self.nanos.fetch_add(delta, Ordering::SeqCst);
    }

    pub fn set(&self, ms: f64) {
        self.nanos
            .store((ms * 1_000_000.0).round() as u64, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> f64 {
        self.nanos.load(Ordering::SeqCst) as f64 / 1_000_000.0
    }
}

/// Rolling average over the most recent samples.
#[derive(Debug, Clone)]
pub struct Sampler {
    data: VecDeque<f64>,
    max: usize,
}

impl Sampler {
    /// Window sizes below 2 are raised to 2.
    pub fn new(max_points: usize) -> Self {
        let max = max_points.max(2);
        Self {
            data: VecDeque::with_capacity(max),
            max,
        }
    }

    pub fn add_point(&mut self, value: f64) {
        self.data.push_back(value);
        if self.data.len() > self.max {
            self.data.pop_front();
        }
    }

    /// Mean of the window, or 0.0 before the first sample.
    pub fn average(&self) -> f64 {
        if self.data.is_empty() {
            return 0.0;
        }
        self.data.iter().sum::<f64>() / self.data.len() as f64
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.max
    }
}

/// Timer for one periodic activity (logic or draw).
///
/// The timer resets to the current time when the activity runs, so overshoot
/// is not carried into the next interval. The auto-offset controller corrects
/// the resulting bias.
#[derive(Debug, Clone)]
pub struct Cadence {
    last_run_ms: f64,
    last_interval_ms: f64,
    rate: Sampler,
    runs: u64,
}

impl Cadence {
    pub fn new(now_ms: f64, window: usize) -> Self {
        Self {
            last_run_ms: now_ms,
            last_interval_ms: 0.0,
            rate: Sampler::new(window),
            runs: 0,
        }
    }

    pub fn elapsed(&self, now_ms: f64) -> f64 {
        now_ms - self.last_run_ms
    }

    pub fn is_due(&self, now_ms: f64, interval_ms: f64) -> bool {
        self.elapsed(now_ms) >= interval_ms
    }

    /// Record a run at `now_ms`. Returns the measured interval since the last run.
    pub fn mark(&mut self, now_ms: f64) -> f64 {
        let interval = self.elapsed(now_ms);
        self.last_run_ms = now_ms;
        self.last_interval_ms = interval;
        self.runs += 1;
        if interval > 0.0 {
            self.rate.add_point(1000.0 / interval);
        }
        interval
    }

    pub fn last_interval(&self) -> f64 {
        self.last_interval_ms
    }

    /// Smoothed runs per second.
    pub fn rate(&self) -> f64 {
        self.rate.average()
    }

    pub fn runs(&self) -> u64 {
        self.runs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sampler_rolls_window() {
        let mut s = Sampler::new(3);
        for v in [1.0, 2.0, 3.0, 4.0] {
            s.add_point(v);
        }
        assert_eq!(s.len(), 3);
        assert!((s.average() - 3.0).abs() < 1e-9);
    }

    #[test]
    fn sampler_empty_average_is_zero() {
        let s = Sampler::new(10);
        assert_eq!(s.average(), 0.0);
    }

    #[test]
    fn sampler_minimum_window() {
        assert_eq!(Sampler::new(0).capacity(), 2);
    }

    #[test]
    fn manual_clock_is_shared_between_clones() {
        let clock = ManualClock::new();
        let other = clock.clone();
        clock.advance(12.5);
        assert!((other.now_ms() - 12.5).abs() < 1e-9);
    }

    #[test]
    fn cadence_due_and_mark() {
        let mut c = Cadence::new(0.0, 10);
        assert!(!c.is_due(10.0, 15.625));
        assert!(c.is_due(16.0, 15.625));
        let measured = c.mark(16.0);
        assert!((measured - 16.0).abs() < 1e-9);
        assert!((c.rate() - 62.5).abs() < 1e-9);
        assert!(!c.is_due(20.0, 15.625));
        assert_eq!(c.runs(), 1);
    }
}
