use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use governor::clock::DefaultClock;
use governor::state::direct::NotKeyed;
use governor::state::InMemoryState;
use governor::{Quota, RateLimiter};

type DirectRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Request budget over a rolling window, e.g. 30 calls per 60 seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThrottlePolicy {
    pub quota_window: Duration,
    pub quota_limit: u32,
}

impl Default for ThrottlePolicy {
    fn default() -> Self {
        Self {
            quota_window: Duration::from_secs(60),
            quota_limit: 30,
        }
    }
}

/// In-memory rate gate in front of the remote trade source.
///
/// Budget denial is reported to the caller instead of blocking; the retry
/// layer above decides whether to wait and come back.
#[derive(Clone)]
pub struct RateGate {
    limiter: Arc<DirectRateLimiter>,
    policy: ThrottlePolicy,
}

impl RateGate {
    pub fn new(policy: ThrottlePolicy) -> Self {
        let quota = quota_from_window(policy.quota_window, policy.quota_limit);
        Self {
            limiter: Arc::new(RateLimiter::direct(quota)),
            policy,
        }
    }

    /// Tries to take one cell of budget.
    pub fn try_acquire(&self) -> bool {
        self.limiter.check().is_ok()
    }

    pub fn policy(&self) -> ThrottlePolicy {
        self.policy
    }
}

fn quota_from_window(quota_window: Duration, quota_limit: u32) -> Quota {
    let safe_limit = quota_limit.max(1);
    let burst = NonZeroU32::new(safe_limit).expect("safe limit must be non-zero");

    let seconds_per_cell = (quota_window.as_secs_f64() / f64::from(safe_limit)).max(0.001);
    let period = Duration::from_secs_f64(seconds_per_cell);

    Quota::with_period(period)
        .expect("period is always greater than zero")
        .allow_burst(burst)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn denies_once_the_window_budget_is_spent() {
        let gate = RateGate::new(ThrottlePolicy {
            quota_window: Duration::from_secs(60),
            quota_limit: 2,
        });

        assert!(gate.try_acquire());
        assert!(gate.try_acquire());
        assert!(!gate.try_acquire());
    }

    #[test]
    fn zero_limit_is_clamped_to_one() {
        let gate = RateGate::new(ThrottlePolicy {
            quota_window: Duration::from_secs(60),
            quota_limit: 0,
        });
        assert!(gate.try_acquire());
        assert!(!gate.try_acquire());
    }
}
