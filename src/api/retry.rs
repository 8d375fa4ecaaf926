//
//  bkt-cli
//  api/retry.rs
//
//  Created by Ngonidzashe Mangudya on 2026/01/12.
//  Copyright (c) 2025 IAMNGONI. All rights reserved.
//

//! # Retry Policy
//!
//! Decides if, when and how often an exchange is replayed. The policy is pure
//! data plus arithmetic; the replay loop itself lives in
//! [`RetryLayer`](super::layers::RetryLayer).
//!
//! ## Backoff
//!
//! The delay before attempt `n + 1` is
//! `min(max_backoff, initial_backoff * multiplier^(n-1)) * (1 ± jitter)`,
//! raised to the server's `Retry-After` when that is longer.
//!
//! ## Retryable outcomes
//!
//! - statuses in [`RetryPolicy::retryable_status`] (408, 425, 429, 500, 502, 503, 504)
//! - transient network failures (see [`ApiError::is_transient`](super::ApiError::is_transient))

use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::Rng;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::StatusCode;

use super::common::ApiError;

/// Statuses that are retried by default.
pub const DEFAULT_RETRYABLE_STATUS: [u16; 7] = [408, 425, 429, 500, 502, 503, 504];

/// Retry configuration owned by a transport.
///
/// # Defaults
///
/// | Field | Default |
/// |-------|---------|
/// | `max_attempts` | 3 |
/// | `initial_backoff` | 250 ms |
/// | `max_backoff` | 5 s |
/// | `backoff_multiplier` | 2.0 |
/// | `jitter` | 0.25 (±25%) |
/// | `retryable_status` | 408, 425, 429, 500, 502, 503, 504 |
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts including the first; at least 1.
    pub max_attempts: u32,
    /// Delay before the second attempt.
    pub initial_backoff: Duration,
    /// Upper bound for the computed (pre-jitter) delay.
    pub max_backoff: Duration,
    /// Growth factor between attempts.
    pub backoff_multiplier: f64,
    /// Relative jitter in `[0, 1)`; 0.25 means ±25%.
    pub jitter: f64,
    /// HTTP statuses treated as transient.
    pub retryable_status: Vec<u16>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(250),
            max_backoff: Duration::from_secs(5),
            backoff_multiplier: 2.0,
            jitter: 0.25,
            retryable_status: DEFAULT_RETRYABLE_STATUS.to_vec(),
        }
    }
}

impl RetryPolicy {
    /// A policy that never replays.
    pub fn disabled() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Checks the policy invariants.
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.max_attempts == 0 {
            return Err(ApiError::Validation(
                "retry max_attempts must be at least 1".to_string(),
            ));
        }
        if self.initial_backoff > self.max_backoff {
            return Err(ApiError::Validation(
                "retry initial_backoff must not exceed max_backoff".to_string(),
            ));
        }
        if !(0.0..1.0).contains(&self.jitter) {
            return Err(ApiError::Validation(
                "retry jitter must be in [0, 1)".to_string(),
            ));
        }
        if self.backoff_multiplier < 1.0 {
            return Err(ApiError::Validation(
                "retry backoff_multiplier must be at least 1.0".to_string(),
            ));
        }
        Ok(())
    }

    /// Whether a response status should be retried.
    pub fn is_retryable_status(&self, status: StatusCode) -> bool {
        self.retryable_status.contains(&status.as_u16())
    }

    /// Capped exponential delay after `attempt` (1-based), before jitter.
    pub fn base_backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(30) as i32;
        let scaled = self.initial_backoff.as_secs_f64() * self.backoff_multiplier.powi(exponent);
        let capped = scaled.min(self.max_backoff.as_secs_f64());
        Duration::from_secs_f64(capped.max(0.0))
    }

    /// [`base_backoff`](Self::base_backoff) with jitter applied.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let base = self.base_backoff(attempt);
        if self.jitter <= 0.0 {
            return base;
        }
        let factor = 1.0 + rand::rng().random_range(-self.jitter..=self.jitter);
        base.mul_f64(factor.max(0.0))
    }

    /// Delay before the next attempt, honouring `Retry-After` when longer.
    pub fn delay(&self, attempt: u32, retry_after: Option<Duration>) -> Duration {
        let computed = self.backoff(attempt);
        match retry_after {
            Some(server) if server > computed => server,
            _ => computed,
        }
    }
}

/// Reads a `Retry-After` header from a response.
pub fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    let value = headers.get(RETRY_AFTER)?.to_str().ok()?;
    parse_retry_after(value, Utc::now())
}

/// Parses `Retry-After` in delta-seconds or HTTP-date form.
///
/// Dates in the past yield a zero delay.
pub fn parse_retry_after(value: &str, now: DateTime<Utc>) -> Option<Duration> {
    let value = value.trim();
    if let Ok(secs) = value.parse::<u64>() {
        return Some(Duration::from_secs(secs));
    }

    let at = DateTime::parse_from_rfc2822(value).ok()?.with_timezone(&Utc);
    Some((at - now).to_std().unwrap_or(Duration::ZERO))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_defaults_are_valid() {
        let policy = RetryPolicy::default();
        assert!(policy.validate().is_ok());
        assert_eq!(policy.max_attempts, 3);
        assert!(policy.is_retryable_status(StatusCode::TOO_MANY_REQUESTS));
        assert!(policy.is_retryable_status(StatusCode::REQUEST_TIMEOUT));
        assert!(policy.is_retryable_status(StatusCode::from_u16(425).unwrap()));
        assert!(!policy.is_retryable_status(StatusCode::NOT_FOUND));
        assert!(!policy.is_retryable_status(StatusCode::CONFLICT));
        assert!(!policy.is_retryable_status(StatusCode::UNAUTHORIZED));
    }

    #[test]
    fn test_validate_rejects_inverted_bounds() {
        let policy = RetryPolicy {
            initial_backoff: Duration::from_secs(10),
            max_backoff: Duration::from_secs(1),
            ..RetryPolicy::default()
        };
        assert!(policy.validate().is_err());

        let policy = RetryPolicy {
            max_attempts: 0,
            ..RetryPolicy::default()
        };
        assert!(policy.validate().is_err());
    }

    #[test]
    fn test_base_backoff_grows_and_caps() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.base_backoff(1), Duration::from_millis(250));
        assert_eq!(policy.base_backoff(2), Duration::from_millis(500));
        assert_eq!(policy.base_backoff(3), Duration::from_secs(1));
        assert_eq!(policy.base_backoff(10), Duration::from_secs(5));
        assert_eq!(policy.base_backoff(1000), Duration::from_secs(5));
    }

    #[test]
    fn test_jitter_stays_in_band() {
        let policy = RetryPolicy::default();
        for _ in 0..200 {
            let delay = policy.backoff(2);
            assert!(delay >= Duration::from_millis(375), "{delay:?}");
            assert!(delay <= Duration::from_millis(625), "{delay:?}");
        }
    }

    #[test]
    fn test_retry_after_wins_when_longer() {
        let policy = RetryPolicy {
            jitter: 0.0,
            ..RetryPolicy::default()
        };
        assert_eq!(
            policy.delay(1, Some(Duration::from_secs(3))),
            Duration::from_secs(3)
        );
        assert_eq!(
            policy.delay(1, Some(Duration::from_millis(10))),
            Duration::from_millis(250)
        );
    }

    #[test]
    fn test_parse_retry_after_seconds() {
        let now = Utc::now();
        assert_eq!(parse_retry_after("120", now), Some(Duration::from_secs(120)));
        assert_eq!(parse_retry_after("soon", now), None);
    }

    #[test]
    fn test_parse_retry_after_http_date() {
        let now = Utc.with_ymd_and_hms(2015, 10, 21, 7, 27, 30).unwrap();
        assert_eq!(
            parse_retry_after("Wed, 21 Oct 2015 07:28:00 GMT", now),
            Some(Duration::from_secs(30))
        );
        let later = Utc.with_ymd_and_hms(2015, 10, 21, 8, 0, 0).unwrap();
        assert_eq!(
            parse_retry_after("Wed, 21 Oct 2015 07:28:00 GMT", later),
            Some(Duration::ZERO)
        );
    }
}
