//
//  bkt-cli
//  api/ratelimit.rs
//
//  Created by Ngonidzashe Mangudya on 2026/01/12.
//  Copyright (c) 2025 IAMNGONI. All rights reserved.
//

//! # Rate-Limit Tracker
//!
//! Scrapes the vendor rate-limit headers from every response a transport
//! receives and keeps the latest snapshot.
//!
//! | Dialect | Headers | `X-RateLimit-Reset` |
//! |---------|---------|---------------------|
//! | Cloud | `X-RateLimit-Limit`, `X-RateLimit-Remaining`, `X-RateLimit-Reset` | epoch seconds |
//! | DC | same names | ISO-8601, epoch seconds, or delta seconds |
//!
//! A response without the limit/remaining pair leaves the snapshot untouched.

use std::sync::RwLock;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use reqwest::header::HeaderMap;
use serde::Serialize;

use super::client::Dialect;

const LIMIT: &str = "x-ratelimit-limit";
const REMAINING: &str = "x-ratelimit-remaining";
const RESET: &str = "x-ratelimit-reset";
const DC_REQUEST_ID: &str = "x-arequestid";

/// Numeric reset values at or above this are epoch seconds; smaller ones are deltas.
const EPOCH_THRESHOLD: i64 = 1_000_000_000;

/// Which server produced a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RateLimitSource {
    /// No snapshot yet, or headers seen on a response that did not come from DC.
    #[default]
    None,
    /// Bitbucket Data Center
    Dc,
    /// Bitbucket Cloud
    Cloud,
}

/// The most recent `(limit, remaining, reset)` triple observed.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct RateLimit {
    /// Requests allowed in the current window.
    pub limit: i64,
    /// Requests left in the current window.
    pub remaining: i64,
    /// When the window resets, if the server said.
    pub reset: Option<DateTime<Utc>>,
    /// Which dialect reported it.
    pub source: RateLimitSource,
}

/// Per-transport holder of the latest [`RateLimit`] snapshot.
#[derive(Debug)]
pub struct RateLimitTracker {
    dialect: Dialect,
    state: RwLock<RateLimit>,
}

impl RateLimitTracker {
    /// An empty tracker for the given dialect.
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            state: RwLock::new(RateLimit::default()),
        }
    }

    /// Updates the snapshot from response headers, if they carry rate-limit data.
    pub fn observe(&self, headers: &HeaderMap) {
        let Some(snapshot) = parse_rate_limit(self.dialect, headers, Utc::now()) else {
            return;
        };
        tracing::debug!(
            limit = snapshot.limit,
            remaining = snapshot.remaining,
            "rate limit updated"
        );
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        *state = snapshot;
    }

    /// The latest snapshot.
    pub fn snapshot(&self) -> RateLimit {
        self.state.read().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

/// Extracts a snapshot from response headers.
///
/// Returns `None` when the limit/remaining pair is missing or malformed.
/// A malformed reset value is dropped rather than discarding the snapshot.
pub fn parse_rate_limit(
    dialect: Dialect,
    headers: &HeaderMap,
    now: DateTime<Utc>,
) -> Option<RateLimit> {
    let limit = header_str(headers, LIMIT)?;
    let remaining = header_str(headers, REMAINING)?;

    let (Ok(limit), Ok(remaining)) = (limit.parse::<i64>(), remaining.parse::<i64>()) else {
        tracing::warn!(limit, remaining, "ignoring malformed rate limit headers");
        return None;
    };

    let reset = header_str(headers, RESET).and_then(|raw| match dialect {
        Dialect::Cloud => parse_epoch(raw),
        Dialect::DataCenter => parse_dc_reset(raw, now),
    });

    let source = match dialect {
        Dialect::Cloud => RateLimitSource::Cloud,
        Dialect::DataCenter if headers.contains_key(DC_REQUEST_ID) => RateLimitSource::Dc,
        Dialect::DataCenter => RateLimitSource::None,
    };

    Some(RateLimit {
        limit,
        remaining,
        reset,
        source,
    })
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

fn parse_epoch(raw: &str) -> Option<DateTime<Utc>> {
    raw.parse::<i64>()
        .ok()
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
}

fn parse_dc_reset(raw: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    if let Ok(secs) = raw.parse::<i64>() {
        return if secs >= EPOCH_THRESHOLD {
            DateTime::from_timestamp(secs, 0)
        } else {
            Some(now + ChronoDuration::seconds(secs))
        };
    }
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use reqwest::header::HeaderValue;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_static(value));
        }
        map
    }

    #[test]
    fn test_cloud_epoch_reset() {
        let h = headers(&[
            ("X-RateLimit-Limit", "1000"),
            ("X-RateLimit-Remaining", "998"),
            ("X-RateLimit-Reset", "1706400000"),
        ]);
        let rl = parse_rate_limit(Dialect::Cloud, &h, Utc::now()).unwrap();
        assert_eq!(rl.limit, 1000);
        assert_eq!(rl.remaining, 998);
        assert_eq!(rl.reset, DateTime::from_timestamp(1_706_400_000, 0));
        assert_eq!(rl.source, RateLimitSource::Cloud);
    }

    #[test]
    fn test_dc_iso_reset() {
        let h = headers(&[
            ("X-RateLimit-Limit", "60"),
            ("X-RateLimit-Remaining", "12"),
            ("X-RateLimit-Reset", "2026-01-12T10:00:00Z"),
            ("X-AREQUESTID", "@1ABC"),
        ]);
        let rl = parse_rate_limit(Dialect::DataCenter, &h, Utc::now()).unwrap();
        assert_eq!(
            rl.reset,
            Some(Utc.with_ymd_and_hms(2026, 1, 12, 10, 0, 0).unwrap())
        );
        assert_eq!(rl.source, RateLimitSource::Dc);
    }

    #[test]
    fn test_dc_seconds_reset() {
        let now = Utc.with_ymd_and_hms(2026, 1, 12, 10, 0, 0).unwrap();
        let h = headers(&[
            ("X-RateLimit-Limit", "60"),
            ("X-RateLimit-Remaining", "0"),
            ("X-RateLimit-Reset", "30"),
        ]);
        let rl = parse_rate_limit(Dialect::DataCenter, &h, now).unwrap();
        assert_eq!(rl.reset, Some(now + ChronoDuration::seconds(30)));
        assert_eq!(rl.source, RateLimitSource::None);

        let h = headers(&[
            ("X-RateLimit-Limit", "60"),
            ("X-RateLimit-Remaining", "0"),
            ("X-RateLimit-Reset", "1706400000"),
            ("X-AREQUESTID", "x"),
        ]);
        let rl = parse_rate_limit(Dialect::DataCenter, &h, now).unwrap();
        assert_eq!(rl.reset, DateTime::from_timestamp(1_706_400_000, 0));
    }

    #[test]
    fn test_missing_or_malformed_headers() {
        assert!(parse_rate_limit(Dialect::Cloud, &HeaderMap::new(), Utc::now()).is_none());
        let h = headers(&[
            ("X-RateLimit-Limit", "lots"),
            ("X-RateLimit-Remaining", "1"),
        ]);
        assert!(parse_rate_limit(Dialect::Cloud, &h, Utc::now()).is_none());
    }

    #[test]
    fn test_absent_headers_keep_previous_snapshot() {
        let tracker = RateLimitTracker::new(Dialect::Cloud);
        tracker.observe(&headers(&[
            ("X-RateLimit-Limit", "100"),
            ("X-RateLimit-Remaining", "42"),
        ]));
        tracker.observe(&HeaderMap::new());
        let rl = tracker.snapshot();
        assert_eq!(rl.remaining, 42);
        assert_eq!(rl.reset, None);
    }
}
