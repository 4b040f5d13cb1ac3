use log::debug;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

use crate::oracle::OracleError;

/// Bounded retry with exponential backoff for transient oracle failures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total tries, including the first one.
    pub attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self { Self { attempts: 3, base_delay_ms: 250, max_delay_ms: 8_000 } }
}

impl RetryPolicy {
    pub fn none() -> Self { Self { attempts: 1, base_delay_ms: 0, max_delay_ms: 0 } }

    /// Delay before retry number `retry` (1-based), without jitter.
    pub fn backoff(&self, retry: u32) -> Duration {
        let exp = self.base_delay_ms.saturating_mul(1u64 << retry.saturating_sub(1).min(20));
        Duration::from_millis(exp.min(self.max_delay_ms))
    }

    /// Runs `op` until it succeeds, attempts run out, or `deadline` passes.
    /// Returns the last error together with the number of retries spent.
    pub fn run<T>(
        &self,
        deadline: Option<Instant>,
        mut op: impl FnMut() -> Result<T, OracleError>,
    ) -> (Result<T, OracleError>, u32) {
        let attempts = self.attempts.max(1);
        let mut rng = SmallRng::from_entropy();
        let mut retries = 0;
        loop {
            let err = match op() {
                Ok(v) => return (Ok(v), retries),
                Err(e) => e,
            };
            if retries + 1 >= attempts { return (Err(err), retries); }
            retries += 1;
            let mut wait = self.backoff(retries);
            if wait > Duration::ZERO {
                let jitter = rng.gen_range(0..=wait.as_millis() as u64 / 4);
                wait += Duration::from_millis(jitter);
            }
            if let OracleError::RateLimited { retry_after: Some(hint) } = &err {
                wait = wait.max(*hint);
            }
            if let Some(d) = deadline {
                if Instant::now() + wait >= d { return (Err(err), retries); }
            }
            debug!("retry {retries}/{} in {:?} after: {err}", attempts - 1, wait);
            std::thread::sleep(wait);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast(attempts: u32) -> RetryPolicy { RetryPolicy { attempts, base_delay_ms: 0, max_delay_ms: 0 } }

    #[test]
    fn succeeds_after_transient_failures() {
        let mut calls = 0;
        let (res, retries) = fast(3).run(None, || {
            calls += 1;
            if calls < 3 { Err(OracleError::unavailable("flaky")) } else { Ok(calls) }
        });
        assert_eq!(res, Ok(3));
        assert_eq!(retries, 2);
    }

    #[test]
    fn gives_up_after_bounded_attempts() {
        let mut calls = 0;
        let (res, _) = fast(4).run(None, || -> Result<(), _> { calls += 1; Err(OracleError::unavailable("down")) });
        assert!(res.is_err());
        assert_eq!(calls, 4);
    }

    #[test]
    fn backoff_doubles_and_caps() {
        let p = RetryPolicy { attempts: 10, base_delay_ms: 100, max_delay_ms: 500 };
        assert_eq!(p.backoff(1), Duration::from_millis(100));
        assert_eq!(p.backoff(2), Duration::from_millis(200));
        assert_eq!(p.backoff(3), Duration::from_millis(400));
        assert_eq!(p.backoff(4), Duration::from_millis(500));
    }

    #[test]
    fn expired_deadline_stops_retrying() {
        let p = RetryPolicy { attempts: 5, base_delay_ms: 1_000, max_delay_ms: 1_000 };
        let mut calls = 0;
        let (res, _) = p.run(Some(Instant::now()), || -> Result<(), _> { calls += 1; Err(OracleError::unavailable("x")) });
        assert!(res.is_err());
        assert_eq!(calls, 1);
    }
}
