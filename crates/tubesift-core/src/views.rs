//! Pure parser for human-readable view-count strings.
//!
//! Handles magnitude suffixes in both Latin (K/M/B) and Japanese (千/万/億)
//! conventions, thousands separators (ASCII and full-width commas), and
//! trailing decoration like "回" or "views". Wholly unparseable input yields
//! `None`; the caller decides whether such records are stored with a null
//! count or dropped.

use once_cell::sync::Lazy;
use regex::Regex;

/// Leading numeric portion plus an optional magnitude suffix directly behind
/// it. Anchoring the suffix to the number keeps stray letters in trailing
/// words ("Streamed", "views") from being read as multipliers.
static COUNT_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d+(?:\.\d+)?)\s*([KkMmBb千万億])?").expect("valid regex")
});

/// Multiplier for a magnitude suffix.
fn multiplier(suffix: &str) -> f64 {
    match suffix {
        "K" | "k" | "千" => 1_000.0,
        "万" => 10_000.0,
        "M" | "m" => 1_000_000.0,
        "億" => 100_000_000.0,
        "B" | "b" => 1_000_000_000.0,
        _ => 1.0,
    }
}

/// Parse a human-readable view-count string into an integer.
///
/// Fractional results are rounded, never truncated.
///
/// # Examples
///
/// ```rust
/// use tubesift_core::parse_views;
///
/// assert_eq!(parse_views("1.2M"), Some(1_200_000));
/// assert_eq!(parse_views("1,234"), Some(1_234));
/// assert_eq!(parse_views("3.4万回"), Some(34_000));
/// assert_eq!(parse_views("not a number"), None);
/// ```
#[must_use]
pub fn parse_views(text: &str) -> Option<u64> {
    // Thousands separators, ASCII and full-width
    let cleaned = text.replace([',', '，'], "");

    let captures = COUNT_REGEX.captures(&cleaned)?;
    let number: f64 = captures.get(1)?.as_str().parse().ok()?;
    let mult = captures
        .get(2)
        .map_or(1.0, |suffix| multiplier(suffix.as_str()));

    let value = number * mult;
    if value.is_finite() && value >= 0.0 {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        Some(value.round() as u64)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_integer() {
        assert_eq!(parse_views("823"), Some(823));
        assert_eq!(parse_views("0"), Some(0));
    }

    #[test]
    fn test_thousands_separators() {
        assert_eq!(parse_views("1,234"), Some(1_234));
        assert_eq!(parse_views("12，345，678"), Some(12_345_678));
    }

    #[test]
    fn test_latin_suffixes() {
        assert_eq!(parse_views("1.2K"), Some(1_200));
        assert_eq!(parse_views("1.2M"), Some(1_200_000));
        assert_eq!(parse_views("3B"), Some(3_000_000_000));
        assert_eq!(parse_views("4.5k"), Some(4_500));
    }

    #[test]
    fn test_japanese_suffixes() {
        assert_eq!(parse_views("3.4万回"), Some(34_000));
        assert_eq!(parse_views("1.5億"), Some(150_000_000));
        assert_eq!(parse_views("2千"), Some(2_000));
    }

    #[test]
    fn test_trailing_decoration() {
        assert_eq!(parse_views("1.2M views"), Some(1_200_000));
        assert_eq!(parse_views("823回視聴"), Some(823));
    }

    #[test]
    fn test_rounding_not_truncation() {
        // 1.006K = 1006, and 1.0067K rounds to 1007 rather than truncating
        assert_eq!(parse_views("1.0067K"), Some(1_007));
        assert_eq!(parse_views("2.5"), Some(3));
    }

    #[test]
    fn test_suffix_must_follow_number() {
        // The 'm' in "Streamed" is not a multiplier
        assert_eq!(parse_views("823 Streamed"), Some(823));
    }

    #[test]
    fn test_unparseable() {
        assert_eq!(parse_views("not a number"), None);
        assert_eq!(parse_views(""), None);
        assert_eq!(parse_views("ライブ配信中"), None);
    }

    #[test]
    fn test_deterministic() {
        for _ in 0..3 {
            assert_eq!(parse_views("1.2M"), Some(1_200_000));
        }
    }
}
