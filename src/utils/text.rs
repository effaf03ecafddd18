//! Text helpers shared by the event normalizer and the payload parsers.

/// Collapse whitespace runs (including non-breaking spaces) and trim.
pub fn normalize_text(value: &str) -> String {
    if value.trim().is_empty() {
        return String::new();
    }
    value
        .split(|c: char| c.is_whitespace() || c == '\u{00A0}')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Returns `candidate` unless it is blank, in which case `current` is kept.
pub fn non_blank_or(candidate: &str, current: &str) -> String {
    if candidate.trim().is_empty() {
        current.to_string()
    } else {
        candidate.to_string()
    }
}

/// Extract a trailing unit suffix such as `"км"` from `"1,2 км"`.
///
/// The suffix is the run of characters at the end of the text that are not
/// digits, separators (`.`/`,`) or whitespace. Text without any digit before
/// the suffix yields an empty string, so plain street names never register
/// as a unit.
pub fn extract_trailing_unit(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return String::new();
    }
    let is_unit_char = |c: char| !(c.is_ascii_digit() || c == '.' || c == ',' || c.is_whitespace());
    let head = trimmed.trim_end_matches(is_unit_char);
    let unit = &trimmed[head.len()..];
    if unit.is_empty() || !head.chars().any(|c| c.is_ascii_digit()) {
        return String::new();
    }
    unit.to_string()
}

/// Append `unit` to a bare number (`"350"` -> `"350 м"`); anything else is
/// returned unchanged.
pub fn append_unit_if_missing(text: &str, unit: &str) -> String {
    let trimmed = text.trim();
    if trimmed.is_empty() || unit.trim().is_empty() || !is_plain_number(trimmed) {
        return text.to_string();
    }
    format!("{} {}", trimmed, unit.trim())
}

fn is_plain_number(text: &str) -> bool {
    let mut parts = text.splitn(2, |c| c == '.' || c == ',');
    let whole = parts.next().unwrap_or_default();
    let fraction = parts.next();
    let digits = |s: &str| !s.is_empty() && s.chars().all(|c| c.is_ascii_digit());
    digits(whole) && fraction.map_or(true, digits)
}

/// Find the first clock time in `text` and render it as 24-hour `HH:MM`.
///
/// Accepts `7:05 pm`, `7.05 p.m.`, `19:05` and similar. Returns `None` when no
/// valid time is present.
pub fn normalize_to_24_hour(text: &str) -> Option<String> {
    let chars: Vec<char> = text.trim().chars().collect();
    for start in 0..chars.len() {
        if !chars[start].is_ascii_digit() {
            continue;
        }
        if start > 0 && chars[start - 1].is_ascii_digit() {
            continue;
        }
        if let Some(formatted) = clock_at(&chars, start) {
            return Some(formatted);
        }
    }
    None
}

fn clock_at(chars: &[char], start: usize) -> Option<String> {
    let mut pos = start;
    let mut hour = 0u32;
    while pos < chars.len() && chars[pos].is_ascii_digit() {
        if pos - start == 2 {
            return None;
        }
        hour = hour * 10 + chars[pos].to_digit(10)?;
        pos += 1;
    }
    if !matches!(chars.get(pos), Some(':') | Some('.')) {
        return None;
    }
    pos += 1;
    let tens = chars.get(pos)?.to_digit(10)?;
    let ones = chars.get(pos + 1)?.to_digit(10)?;
    let minute = tens * 10 + ones;
    pos += 2;
    if chars.get(pos).map_or(false, |c| c.is_ascii_digit()) || minute > 59 {
        return None;
    }

    match meridiem_at(chars, pos) {
        Some(meridiem) => {
            if !(1..=12).contains(&hour) {
                return None;
            }
            let hour24 = match (meridiem, hour) {
                ('a', 12) => 0,
                ('p', h) if h != 12 => h + 12,
                (_, h) => h,
            };
            Some(format!("{:02}:{:02}", hour24, minute))
        }
        None if hour <= 23 => Some(format!("{:02}:{:02}", hour, minute)),
        None => None,
    }
}

fn meridiem_at(chars: &[char], mut pos: usize) -> Option<char> {
    while chars.get(pos).map_or(false, |c| c.is_whitespace()) {
        pos += 1;
    }
    let marker = chars.get(pos)?.to_ascii_lowercase();
    if marker != 'a' && marker != 'p' {
        return None;
    }
    pos += 1;
    if chars.get(pos) == Some(&'.') {
        pos += 1;
    }
    while chars.get(pos).map_or(false, |c| c.is_whitespace()) {
        pos += 1;
    }
    match chars.get(pos) {
        Some(c) if c.to_ascii_lowercase() == 'm' => Some(marker),
        _ => None,
    }
}
