use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, Weekday};
use crate::error::{FleetError, Result};

/// Fixed ordering used to break weekday ties.
pub const WEEKDAYS: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

pub const UNKNOWN: &str = "Unknown";

pub fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

/// Parse a git strict-ISO author date (`%aI`), keeping the author's offset.
pub fn parse_git_date(input: &str) -> Option<DateTime<FixedOffset>> {
    let input = input.trim();
    DateTime::parse_from_rfc3339(input)
        .or_else(|_| DateTime::parse_from_str(input, "%Y-%m-%d %H:%M:%S %z"))
        .ok()
}

/// `YYYY-MM` in the author's own timezone.
pub fn month_key(timestamp: &DateTime<FixedOffset>) -> String {
    format!("{:04}-{:02}", timestamp.year(), timestamp.month())
}

/// Accepts `YYYY-MM-DD`, RFC 3339 or git's `YYYY-MM-DD HH:MM:SS +ZZZZ`; only the calendar date is kept.
pub fn parse_bound_date(input: &str) -> Result<NaiveDate> {
    let trimmed = input.trim();
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Ok(date);
    }
    parse_git_date(trimmed)
        .map(|dt| dt.date_naive())
        .ok_or_else(|| FleetError::InvalidDate(format!("'{input}' is not a date")))
}

/// Collapse large counts for display: `1.2M+`, `3K`, `999`.
pub fn format_compact(n: u64) -> String {
    if n >= 1_000_000 {
        format!("{:.1}M+", n as f64 / 1_000_000.0)
    } else if n >= 1_000 {
        format!("{:.0}K", n as f64 / 1_000.0)
    } else {
        n.to_string()
    }
}

pub fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn month_key_uses_author_offset() {
        let ts = parse_git_date("2020-01-31T23:30:00-05:00").unwrap();
        assert_eq!(month_key(&ts), "2020-01");
        assert_eq!(weekday_name(ts.weekday()), "Friday");
    }

    #[test]
    fn bound_dates_accept_several_shapes() {
        let expected = NaiveDate::from_ymd_opt(2021, 6, 1).unwrap();
        assert_eq!(parse_bound_date("2021-06-01").unwrap(), expected);
        assert_eq!(parse_bound_date("2021-06-01T10:00:00+02:00").unwrap(), expected);
        assert_eq!(parse_bound_date("2021-06-01 10:00:00 +0200").unwrap(), expected);
        assert!(parse_bound_date("last tuesday").is_err());
    }

    #[test]
    fn compact_numbers() {
        assert_eq!(format_compact(999), "999");
        assert_eq!(format_compact(3_200), "3K");
        assert_eq!(format_compact(1_234_567), "1.2M+");
        assert_eq!(group_thousands(1_234_567), "1,234,567");
        assert_eq!(group_thousands(12), "12");
    }
}
