// Local stand-in for venue-side rate limiting: one accepted call per endpoint
// key per `min_interval`, enforced by a keyed GCRA limiter with burst 1.

use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::{Duration, Instant};

use governor::middleware::NoOpMiddleware;
use governor::nanos::Nanos;
use governor::state::keyed::DashMapStateStore;
use governor::{Quota, RateLimiter};
use tracing::trace;

use crate::market_data::clock::Clock;

type KeyedLimiter =
    RateLimiter<String, DashMapStateStore<String>, LimiterClock, NoOpMiddleware<Nanos>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Admitted,
    /// Rejected; `retry_in` is how long until the key would be admitted.
    Throttled { retry_in: Duration },
}

impl Admission {
    pub fn is_admitted(&self) -> bool {
        matches!(self, Admission::Admitted)
    }
}

/// Feeds our [`Clock`] to the limiter as nanoseconds since construction, so a
/// `ManualClock` drives admissions the same way it drives backoff sleeps.
#[derive(Clone)]
struct LimiterClock {
    clock: Arc<dyn Clock>,
    origin: Instant,
}

impl governor::clock::Clock for LimiterClock {
    type Instant = Nanos;

    fn now(&self) -> Nanos {
        Nanos::from(self.clock.now().saturating_duration_since(self.origin))
    }
}

pub struct RateGovernor {
    min_interval: Duration,
    clock: Arc<dyn Clock>,
    limiter_clock: LimiterClock,
    /// `None` when `min_interval` is zero: every call is admitted.
    limiter: Option<KeyedLimiter>,
}

impl RateGovernor {
    pub fn new(min_interval: Duration, clock: Arc<dyn Clock>) -> Self {
        let limiter_clock = LimiterClock { clock: clock.clone(), origin: clock.now() };
        let limiter = Quota::with_period(min_interval).map(|quota| {
            RateLimiter::new(
                quota.allow_burst(NonZeroU32::MIN),
                DashMapStateStore::default(),
                &limiter_clock,
            )
        });
        Self { min_interval, clock, limiter_clock, limiter }
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Admit or throttle a call to `endpoint_key`. Only admissions move the
    /// key's state; concurrent callers on one key are settled atomically.
    pub fn admit(&self, endpoint_key: &str) -> Admission {
        let Some(limiter) = &self.limiter else {
            return Admission::Admitted;
        };
        match limiter.check_key(&endpoint_key.to_owned()) {
            Ok(()) => {
                trace!(endpoint = endpoint_key, "admitted");
                Admission::Admitted
            }
            Err(not_until) => {
                let now = governor::clock::Clock::now(&self.limiter_clock);
                let retry_in = not_until.wait_time_from(now);
                trace!(
                    endpoint = endpoint_key,
                    retry_in_ms = retry_in.as_millis() as u64,
                    "throttled"
                );
                Admission::Throttled { retry_in }
            }
        }
    }
}

impl std::fmt::Debug for RateGovernor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateGovernor")
            .field("min_interval", &self.min_interval)
            .field("enabled", &self.limiter.is_some())
            .finish()
    }
}
