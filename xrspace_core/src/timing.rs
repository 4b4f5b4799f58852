//! Frame timing
//!
//! The platform frame-timing primitive, reduced to what the session loop
//! needs: a millisecond clock and a way to wait for the next frame slot.
//! [`SystemClock`] is backed by `Instant` and really sleeps; [`ManualClock`]
//! jumps straight to the deadline, which keeps loop tests deterministic.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Monotonic clock in milliseconds
pub trait FrameClock: Send + Sync {
    /// Milliseconds since the clock's origin
    fn now_ms(&self) -> f64;

    /// Wait until `deadline_ms` (no-op when already past)
    fn sleep_until(&self, deadline_ms: f64);
}

/// Wall clock, origin at construction
#[derive(Debug, Clone)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameClock for SystemClock {
    fn now_ms(&self) -> f64 {
        self.origin.elapsed().as_secs_f64() * 1000.0
    }

    fn sleep_until(&self, deadline_ms: f64) {
        let remaining = deadline_ms - self.now_ms();
        if remaining > 0.0 {
            std::thread::sleep(Duration::from_secs_f64(remaining / 1000.0));
        }
    }
}

/// Clock advanced by hand; clones share the same time
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    bits: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new(start_ms: f64) -> Self {
        Self {
            bits: Arc::new(AtomicU64::new(start_ms.to_bits())),
        }
    }

    /// Set the current time
    pub fn set_ms(&self, now_ms: f64) {
        self.bits.store(now_ms.to_bits(), Ordering::SeqCst);
    }

    /// Move the clock forward
    pub fn advance_ms(&self, delta_ms: f64) {
        self.set_ms(self.now_ms() + delta_ms);
    }
}

impl FrameClock for ManualClock {
    fn now_ms(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::SeqCst))
    }

    fn sleep_until(&self, deadline_ms: f64) {
        if deadline_ms > self.now_ms() {
            self.set_ms(deadline_ms);
        }
    }
}

/// Fixed-rate frame pacing
///
/// Hands out one deadline per frame period. A caller that falls more than a
/// full period behind is re-anchored to "now" instead of bursting frames to
/// catch up.
#[derive(Debug, Clone)]
pub struct FramePacer {
    period_ms: f64,
    next_deadline_ms: Option<f64>,
    frames: u64,
}

impl FramePacer {
    /// Create a pacer for `rate_hz` frames per second (clamped to 1..=1000 Hz)
    pub fn new(rate_hz: f64) -> Self {
        let rate_hz = if rate_hz.is_finite() {
            rate_hz.clamp(1.0, 1000.0)
        } else {
            60.0
        };
        Self {
            period_ms: 1000.0 / rate_hz,
            next_deadline_ms: None,
            frames: 0,
        }
    }

    /// Frame period in milliseconds
    pub fn period_ms(&self) -> f64 {
        self.period_ms
    }

    /// Number of frames handed out so far
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Wait for the next frame slot and return its timestamp
    pub fn wait_for_next_frame(&mut self, clock: &dyn FrameClock) -> f64 {
        let now = clock.now_ms();
        let deadline = match self.next_deadline_ms {
            None => now,
            Some(deadline) if now - deadline > self.period_ms => {
                log::trace!(
                    "frame pacer fell {:.2} ms behind, re-anchoring",
                    now - deadline
                );
                now
            }
            Some(deadline) => deadline,
        };
        clock.sleep_until(deadline);
        self.next_deadline_ms = Some(deadline + self.period_ms);
        self.frames += 1;
        clock.now_ms().max(deadline)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_shared_between_clones() {
        let clock = ManualClock::new(10.0);
        let other = clock.clone();
        clock.advance_ms(5.0);
        assert_eq!(other.now_ms(), 15.0);
        other.sleep_until(12.0);
        assert_eq!(clock.now_ms(), 15.0);
    }

    #[test]
    fn test_pacer_spaces_frames_by_period() {
        let clock = ManualClock::new(0.0);
        let mut pacer = FramePacer::new(50.0);
        assert_eq!(pacer.wait_for_next_frame(&clock), 0.0);
        assert_eq!(pacer.wait_for_next_frame(&clock), 20.0);
        assert_eq!(pacer.wait_for_next_frame(&clock), 40.0);
        assert_eq!(pacer.frames(), 3);
    }

    #[test]
    fn test_pacer_reanchors_after_stall() {
        let clock = ManualClock::new(0.0);
        let mut pacer = FramePacer::new(100.0);
        pacer.wait_for_next_frame(&clock);
        clock.advance_ms(500.0);
        assert_eq!(pacer.wait_for_next_frame(&clock), 500.0);
        assert_eq!(pacer.wait_for_next_frame(&clock), 510.0);
    }

    #[test]
    fn test_rate_is_clamped() {
        assert_eq!(FramePacer::new(0.0).period_ms(), 1000.0);
        assert_eq!(FramePacer::new(f64::NAN).period_ms(), 1000.0 / 60.0);
    }

    #[test]
    fn test_system_clock_is_monotonic() {
        let clock = SystemClock::new();
        let a = clock.now_ms();
        clock.sleep_until(a + 1.0);
        assert!(clock.now_ms() >= a + 1.0);
    }
}
