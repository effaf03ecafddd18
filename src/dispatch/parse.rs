//! Parsers for the human-readable distance and time strings the navigation
//! app displays. Both degrade to 0 on anything they do not understand.

use crate::utils::text::normalize_text;

const DAY_UNITS: &[&str] = &["д", "дн", "день", "дня", "дней", "day", "days"];
const HOUR_UNITS: &[&str] = &["ч", "час", "часа", "часов", "h", "hr", "hrs", "hour", "hours"];
const MINUTE_UNITS: &[&str] = &["мин", "min", "mins", "minute", "minutes"];
const SECOND_UNITS: &[&str] = &["с", "сек", "s", "sec", "secs", "second", "seconds"];

/// Metres in texts like `"350 м"`, `"1.2 км"` or `"2,5 km"`.
pub fn parse_distance_meters(text: &str) -> u32 {
    let text = normalize_text(text).to_lowercase();
    let Some((value, rest)) = leading_number(&text) else {
        return 0;
    };
    let unit = rest.trim_start();
    let multiplier = if unit.starts_with("km") || unit.starts_with("км") {
        1_000.0
    } else {
        1.0
    };
    to_u32((value * multiplier).round())
}

/// Seconds until arrival in texts like `"12 мин"`, `"1 ч 5 мин"`, `"12:30"`
/// (minutes and seconds), `"1:02:03"` or `"2 дня 3 ч"`.
///
/// Returns `None` when the text contains no number or the duration does not
/// fit in `u32` seconds.
pub fn parse_eta_seconds(text: &str) -> Option<u32> {
    let text = normalize_text(text).to_lowercase();
    if text.is_empty() {
        return None;
    }

    if let Some(seconds) = text
        .split_whitespace()
        .find(|token| token.contains(':'))
        .and_then(parse_colon_duration)
    {
        return Some(seconds);
    }

    if let Some(seconds) = parse_unit_tokens(&text) {
        return Some(seconds);
    }

    let (minutes, _) = leading_number(&text)?;
    seconds_in_range(minutes.trunc() * 60.0)
}

fn parse_colon_duration(token: &str) -> Option<u32> {
    let parts: Vec<u64> = token
        .split(':')
        .map(|part| part.parse::<u64>().ok())
        .collect::<Option<Vec<_>>>()?;
    let seconds = match parts.as_slice() {
        [minutes, seconds] => minutes.checked_mul(60)?.checked_add(*seconds)?,
        [hours, minutes, seconds] => hours
            .checked_mul(3_600)?
            .checked_add(minutes.checked_mul(60)?)?
            .checked_add(*seconds)?,
        _ => return None,
    };
    u32::try_from(seconds).ok()
}

/// Sum of `<number> <unit>` pairs. `None` when no pair has a known unit.
fn parse_unit_tokens(text: &str) -> Option<u32> {
    let mut total = 0f64;
    let mut matched = false;
    let mut rest = text;

    while let Some((value, after)) = leading_number(rest) {
        let after = after.trim_start();
        let unit_len = after
            .char_indices()
            .find(|(_, c)| !c.is_alphabetic())
            .map(|(index, _)| index)
            .unwrap_or(after.len());
        let unit = &after[..unit_len];

        let scale = if DAY_UNITS.contains(&unit) {
            Some(86_400.0)
        } else if HOUR_UNITS.contains(&unit) {
            Some(3_600.0)
        } else if MINUTE_UNITS.contains(&unit) {
            Some(60.0)
        } else if SECOND_UNITS.contains(&unit) {
            Some(1.0)
        } else {
            None
        };
        if let Some(scale) = scale {
            total += value * scale;
            matched = true;
        }
        rest = &after[unit_len..];
    }

    if !matched {
        return None;
    }
    Some(seconds_in_range(total.round()).unwrap_or(0))
}

/// First number in `text` (decimal point or comma) and the text after it.
fn leading_number(text: &str) -> Option<(f64, &str)> {
    let start = text.find(|c: char| c.is_ascii_digit())?;
    let bytes = text.as_bytes();
    let mut end = start;
    let mut seen_separator = false;
    while end < bytes.len() {
        let byte = bytes[end];
        if byte.is_ascii_digit() {
            end += 1;
        } else if (byte == b'.' || byte == b',')
            && !seen_separator
            && bytes.get(end + 1).map_or(false, u8::is_ascii_digit)
        {
            seen_separator = true;
            end += 1;
        } else {
            break;
        }
    }
    let value = text[start..end].replace(',', ".").parse::<f64>().ok()?;
    Some((value, &text[end..]))
}

/// Durations that do not fit are treated as unparseable.
fn seconds_in_range(value: f64) -> Option<u32> {
    (value.is_finite() && (0.0..=f64::from(u32::MAX)).contains(&value)).then(|| value as u32)
}

fn to_u32(value: f64) -> u32 {
    if value.is_finite() && value > 0.0 {
        value.min(f64::from(u32::MAX)) as u32
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_distance() {
        assert_eq!(parse_distance_meters("350 м"), 350);
        assert_eq!(parse_distance_meters("1.2 км"), 1_200);
        assert_eq!(parse_distance_meters("2,5 km"), 2_500);
        assert_eq!(parse_distance_meters("800m"), 800);
        assert_eq!(parse_distance_meters("12"), 12);
        assert_eq!(parse_distance_meters("через 1,5\u{a0}км"), 1_500);
    }

    #[test]
    fn test_malformed_distance_is_zero() {
        assert_eq!(parse_distance_meters(""), 0);
        assert_eq!(parse_distance_meters("км"), 0);
        assert_eq!(parse_distance_meters("Turn left"), 0);
    }

    #[test]
    fn test_parse_eta_tokens() {
        assert_eq!(parse_eta_seconds("12 мин"), Some(720));
        assert_eq!(parse_eta_seconds("1 ч 5 мин"), Some(3_900));
        assert_eq!(parse_eta_seconds("1h 20min"), Some(4_800));
        assert_eq!(parse_eta_seconds("45 сек"), Some(45));
        assert_eq!(parse_eta_seconds("2 дня 3 ч"), Some(2 * 86_400 + 3 * 3_600));
        assert_eq!(parse_eta_seconds("1 day"), Some(86_400));
    }

    #[test]
    fn test_parse_eta_colon_forms() {
        assert_eq!(parse_eta_seconds("12:30"), Some(750));
        assert_eq!(parse_eta_seconds("1:02:03"), Some(3_723));
        assert_eq!(parse_eta_seconds("1:02:30"), Some(3_750));
        assert_eq!(parse_eta_seconds("осталось 0:45"), Some(45));
    }

    #[test]
    fn test_parse_eta_fallback_and_garbage() {
        assert_eq!(parse_eta_seconds("17"), Some(1_020));
        assert_eq!(parse_eta_seconds("about 3 parsecs"), Some(180));
        assert_eq!(parse_eta_seconds("soon"), None);
        assert_eq!(parse_eta_seconds("18446744073709551615:00"), None);
        assert_eq!(parse_eta_seconds("99999999999999:00:00"), None);
        assert_eq!(parse_eta_seconds("99999999999999999999 ч"), Some(0));
        assert_eq!(parse_eta_seconds(""), None);
    }
}
