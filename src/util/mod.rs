//
//  bkt-cli
//  util/mod.rs
//
//  Created by Ngonidzashe Mangudya on 2026/01/12.
//  Copyright (c) 2025 IAMNGONI. All rights reserved.
//

//! Small formatting helpers shared by the commands.
//!
//! Data Center reports times as Unix milliseconds and Cloud as ISO 8601
//! strings; both are shown as `YYYY-MM-DD HH:MM` UTC.

use chrono::{DateTime, Utc};

const DISPLAY_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Formats a Unix-millisecond timestamp; `0` renders as `-`.
pub fn format_millis(millis: u64) -> String {
    i64::try_from(millis)
        .ok()
        .filter(|m| *m > 0)
        .and_then(DateTime::<Utc>::from_timestamp_millis)
        .map_or_else(|| "-".to_string(), |dt| dt.format(DISPLAY_FORMAT).to_string())
}

/// Formats an RFC 3339 timestamp, passing through anything unparsable.
pub fn format_iso(value: Option<&str>) -> String {
    match value {
        Some(raw) => DateTime::parse_from_rfc3339(raw)
            .map(|dt| dt.with_timezone(&Utc).format(DISPLAY_FORMAT).to_string())
            .unwrap_or_else(|_| raw.to_string()),
        None => "-".to_string(),
    }
}

/// Truncates to `max_len` characters, ending in `...` when cut.
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        return s.to_string();
    }
    if max_len <= 3 {
        return s.chars().take(max_len).collect();
    }
    let kept: String = s.chars().take(max_len - 3).collect();
    format!("{kept}...")
}

/// Human-readable byte size.
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{size:.1} {}", UNITS[unit])
    }
}
