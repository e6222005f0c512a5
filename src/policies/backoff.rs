//! # Relaunch delay policy.
//!
//! [`BackoffPolicy`] controls how long a worker waits between an exit and its relaunch.
//! The observed rig behavior is a **fixed** delay per worker (1–2 s), which is what
//! [`BackoffPolicy::fixed`] and the default produce. Exponential growth is available
//! by raising [`BackoffPolicy::factor`] above 1.0.
//!
//! The delay for `n` consecutive failed runs is `first × factor^n`, clamped to `max`,
//! then jitter is applied. The base is derived only from `n`, so jitter output never
//! feeds back into later delays.
//!
//! # Example
//! ```rust
//! use std::time::Duration;
//! use rigvisor::{BackoffPolicy, JitterPolicy};
//!
//! let backoff = BackoffPolicy {
//!     first: Duration::from_millis(500),
//!     max: Duration::from_secs(8),
//!     factor: 2.0,
//!     jitter: JitterPolicy::None,
//! };
//!
//! assert_eq!(backoff.next(0), Duration::from_millis(500));
//! assert_eq!(backoff.next(1), Duration::from_secs(1));
//! assert_eq!(backoff.next(10), Duration::from_secs(8));
//!
//! assert_eq!(BackoffPolicy::fixed(Duration::from_secs(2)).next(7), Duration::from_secs(2));
//! ```

use std::time::Duration;

use crate::policies::jitter::JitterPolicy;

/// Delay applied by the supervisor before relaunching a worker.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BackoffPolicy {
    /// Delay before the first relaunch.
    pub first: Duration,
    /// Cap for grown delays.
    pub max: Duration,
    /// Multiplicative growth factor (`1.0` = fixed delay).
    pub factor: f64,
    /// Randomization applied on top of the base delay.
    pub jitter: JitterPolicy,
}

impl Default for BackoffPolicy {
    /// Fixed 2s delay, no jitter.
    fn default() -> Self {
        Self::fixed(Duration::from_millis(2000))
    }
}

impl BackoffPolicy {
    /// A constant delay, regardless of how many runs failed in a row.
    pub fn fixed(delay: Duration) -> Self {
        Self {
            first: delay,
            max: delay,
            factor: 1.0,
            jitter: JitterPolicy::None,
        }
    }

    /// Computes the delay after `failures` consecutive failed runs (0-indexed).
    ///
    /// Non-finite or negative intermediate values fall back to `max`.
    pub fn next(&self, failures: u32) -> Duration {
        let max_secs = self.max.as_secs_f64();
        let exp = failures.min(i32::MAX as u32) as i32;
        let unclamped_secs = self.first.as_secs_f64() * self.factor.powi(exp);

        let base =
            if !unclamped_secs.is_finite() || unclamped_secs < 0.0 || unclamped_secs > max_secs {
                self.max
            } else {
                Duration::from_secs_f64(unclamped_secs)
            };

        match self.jitter {
            JitterPolicy::Decorrelated => {
                self.jitter
                    .apply_decorrelated(self.first.min(self.max), base, self.max)
            }
            _ => self.jitter.apply(base),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exponential(jitter: JitterPolicy) -> BackoffPolicy {
        BackoffPolicy {
            first: Duration::from_millis(100),
            max: Duration::from_secs(30),
            factor: 2.0,
            jitter,
        }
    }

    #[test]
    fn default_is_fixed_two_seconds() {
        let policy = BackoffPolicy::default();
        for failures in [0, 1, 5, 50] {
            assert_eq!(policy.next(failures), Duration::from_secs(2));
        }
    }

    #[test]
    fn exponential_growth_without_jitter() {
        let policy = exponential(JitterPolicy::None);
        assert_eq!(policy.next(0), Duration::from_millis(100));
        assert_eq!(policy.next(1), Duration::from_millis(200));
        assert_eq!(policy.next(2), Duration::from_millis(400));
        assert_eq!(policy.next(4), Duration::from_millis(1600));
    }

    #[test]
    fn first_above_max_is_clamped() {
        let policy = BackoffPolicy {
            first: Duration::from_secs(10),
            max: Duration::from_secs(5),
            factor: 2.0,
            jitter: JitterPolicy::None,
        };
        assert_eq!(policy.next(0), Duration::from_secs(5));
    }

    #[test]
    fn overflow_clamps_to_max() {
        let policy = BackoffPolicy {
            max: Duration::from_secs(10),
            ..exponential(JitterPolicy::None)
        };
        assert_eq!(policy.next(u32::MAX), Duration::from_secs(10));
    }

    #[test]
    fn equal_jitter_stays_within_half_and_base() {
        let policy = exponential(JitterPolicy::Equal);
        for failures in 0..15 {
            let base_ms = (100.0 * 2.0f64.powi(failures as i32)).min(30_000.0);
            let delay = policy.next(failures);
            assert!(delay >= Duration::from_millis((base_ms / 2.0) as u64));
            assert!(delay <= Duration::from_millis(base_ms as u64));
        }
    }

    #[test]
    fn full_jitter_never_exceeds_base() {
        let policy = BackoffPolicy {
            jitter: JitterPolicy::Full,
            ..BackoffPolicy::fixed(Duration::from_secs(1))
        };
        for failures in 0..50 {
            assert!(policy.next(failures) <= Duration::from_secs(1));
        }
    }

    #[test]
    fn decorrelated_jitter_respects_floor() {
        let policy = exponential(JitterPolicy::Decorrelated);
        for _ in 0..100 {
            let delay = policy.next(8);
            assert!(delay >= Duration::from_millis(100));
            assert!(delay <= Duration::from_secs(30));
        }
    }
}
