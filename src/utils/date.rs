//! UTC timestamp utilities.
//!
//! `DateTimeUtc` renders file modification times as ISO 8601 strings
//! (`YYYY-MM-DDTHH:MM:SS.mmmZ`), which feed static-file etags. HTTP dates
//! (`Last-Modified`, `If-Modified-Since`) go through `httpdate`.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// UTC datetime without timezone complexity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateTimeUtc {
    pub year: i32,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    pub millis: u16,
}

impl DateTimeUtc {
    /// Convert a `SystemTime`. Times before the epoch clamp to the epoch.
    pub fn from_system_time(time: SystemTime) -> Self {
        let since = time.duration_since(UNIX_EPOCH).unwrap_or_default();
        Self::from_unix_millis(since.as_millis() as u64)
    }

    #[allow(clippy::cast_possible_truncation)] // all components are range-bounded
    pub fn from_unix_millis(millis: u64) -> Self {
        let secs = millis / 1000;
        let days = (secs / 86_400) as i64;
        let rem = secs % 86_400;
        let (year, month, day) = civil_from_days(days);

        Self {
            year,
            month,
            day,
            hour: (rem / 3600) as u8,
            minute: ((rem / 60) % 60) as u8,
            second: (rem % 60) as u8,
            millis: (millis % 1000) as u16,
        }
    }

    /// Format like JavaScript's `Date.prototype.toISOString`.
    ///
    /// Returns: `YYYY-MM-DDTHH:MM:SS.mmmZ`
    pub fn to_iso_millis(self) -> String {
        format!(
            "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}.{:03}Z",
            self.year, self.month, self.day, self.hour, self.minute, self.second, self.millis
        )
    }
}

/// Days since 1970-01-01 to (year, month, day), proleptic Gregorian.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn civil_from_days(days: i64) -> (i32, u8, u8) {
    let z = days + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z.rem_euclid(146_097);
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = (doy - (153 * mp + 2) / 5 + 1) as u8;
    let month = (if mp < 10 { mp + 3 } else { mp - 9 }) as u8;
    let year = (yoe + era * 400 + i64::from(month <= 2)) as i32;
    (year, month, day)
}

/// ISO 8601 string for a modification time.
#[inline]
pub fn iso_string(time: SystemTime) -> String {
    DateTimeUtc::from_system_time(time).to_iso_millis()
}

/// `Last-Modified` header value (`Sun, 06 Nov 1994 08:49:37 GMT`).
#[inline]
pub fn http_date(time: SystemTime) -> String {
    httpdate::fmt_http_date(time)
}

/// Parse an HTTP date header. Malformed values yield `None`.
#[inline]
pub fn parse_http_date(value: &str) -> Option<SystemTime> {
    httpdate::parse_http_date(value.trim()).ok()
}

/// Drop sub-second precision (HTTP dates carry whole seconds).
pub fn truncate_to_secs(time: SystemTime) -> SystemTime {
    let secs = time
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    UNIX_EPOCH + Duration::from_secs(secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_epoch() {
        let dt = DateTimeUtc::from_unix_millis(0);
        assert_eq!(dt.to_iso_millis(), "1970-01-01T00:00:00.000Z");
    }

    #[test]
    fn test_known_timestamp() {
        // 2024-06-15T14:30:45.123Z
        let dt = DateTimeUtc::from_unix_millis(1_718_461_845_123);
        assert_eq!(dt.to_iso_millis(), "2024-06-15T14:30:45.123Z");
    }

    #[test]
    fn test_leap_day() {
        // 2024-02-29T00:00:00Z
        let dt = DateTimeUtc::from_unix_millis(1_709_164_800_000);
        assert_eq!((dt.year, dt.month, dt.day), (2024, 2, 29));
    }

    #[test]
    fn test_http_date_roundtrip_truncates() {
        let time = UNIX_EPOCH + Duration::from_millis(1_718_461_845_123);
        let header = http_date(time);
        assert_eq!(header, "Sat, 15 Jun 2024 14:30:45 GMT");
        assert_eq!(parse_http_date(&header), Some(truncate_to_secs(time)));
    }

    #[test]
    fn test_parse_http_date_invalid() {
        assert_eq!(parse_http_date("yesterday"), None);
    }
}
