//! Duration parsing utilities.
//!
//! Human-readable duration strings like "500ms", "30s", "2m" or "1h", used
//! for the timeouts in `hermes.yaml`.

use std::time::Duration;

/// Parse a duration string like "500ms", "30s", "2m" or "1h".
///
/// A bare number is taken as seconds. Returns `None` if the string cannot be
/// parsed.
///
/// # Examples
///
/// ```
/// use hermes_fleet::config::parse_duration_string;
/// use std::time::Duration;
///
/// assert_eq!(parse_duration_string("500ms"), Some(Duration::from_millis(500)));
/// assert_eq!(parse_duration_string("2m"), Some(Duration::from_secs(120)));
/// assert_eq!(parse_duration_string("30"), Some(Duration::from_secs(30)));
/// ```
pub fn parse_duration_string(s: &str) -> Option<Duration> {
    let s = s.trim();

    if s.is_empty() {
        return None;
    }

    let (digits, unit_secs, is_millis) = if let Some(n) = s.strip_suffix("ms") {
        (n, 0, true)
    } else if let Some(n) = s.strip_suffix('s') {
        (n, 1, false)
    } else if let Some(n) = s.strip_suffix('m') {
        (n, 60, false)
    } else if let Some(n) = s.strip_suffix('h') {
        (n, 3600, false)
    } else {
        (s, 1, false)
    };

    let value = digits.parse::<u64>().ok()?;
    if is_millis {
        Some(Duration::from_millis(value))
    } else {
        value.checked_mul(unit_secs).map(Duration::from_secs)
    }
}

/// Render a duration the way [`parse_duration_string`] reads it back.
pub fn format_duration(d: &Duration) -> String {
    if d.subsec_millis() != 0 || d.as_secs() == 0 {
        format!("{}ms", d.as_millis())
    } else if d.as_secs() % 3600 == 0 {
        format!("{}h", d.as_secs() / 3600)
    } else if d.as_secs() % 60 == 0 {
        format!("{}m", d.as_secs() / 60)
    } else {
        format!("{}s", d.as_secs())
    }
}

/// `#[serde(with = "duration_str")]` for duration fields in config files.
pub mod duration_str {
    use super::{format_duration, parse_duration_string};
    use serde::{de, Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&format_duration(d))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let raw = String::deserialize(d)?;
        parse_duration_string(&raw).ok_or_else(|| {
            de::Error::custom(format!(
                "invalid duration '{}', expected e.g. 500ms, 30s, 2m, 1h",
                raw
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_duration_units() {
        assert_eq!(parse_duration_string("5s"), Some(Duration::from_secs(5)));
        assert_eq!(parse_duration_string("2m"), Some(Duration::from_secs(120)));
        assert_eq!(parse_duration_string("1h"), Some(Duration::from_secs(3600)));
        assert_eq!(
            parse_duration_string("500ms"),
            Some(Duration::from_millis(500))
        );
    }

    #[test]
    fn test_parse_duration_no_suffix() {
        assert_eq!(parse_duration_string("10"), Some(Duration::from_secs(10)));
    }

    #[test]
    fn test_parse_duration_with_whitespace() {
        assert_eq!(
            parse_duration_string("  5s  "),
            Some(Duration::from_secs(5))
        );
    }

    #[test]
    fn test_parse_duration_invalid() {
        assert_eq!(parse_duration_string(""), None);
        assert_eq!(parse_duration_string("abc"), None);
        assert_eq!(parse_duration_string("5x"), None);
        assert_eq!(parse_duration_string("-5s"), None);
        assert_eq!(parse_duration_string("5ss"), None);
    }

    #[test]
    fn test_format_round_trips() {
        for text in ["500ms", "30s", "2m", "1h", "90s"] {
            let d = parse_duration_string(text).unwrap();
            assert_eq!(format_duration(&d), text);
        }
        assert_eq!(format_duration(&Duration::ZERO), "0ms");
    }
}
