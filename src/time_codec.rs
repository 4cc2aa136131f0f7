// ⏱️ Time Codec
// Converts race times between display strings and whole seconds.
//
// Accepted input: "M:SS", "MM:SS", "H:MM:SS". Purely arithmetic, so
// "1:75" is 135 seconds; components are not range checked.

/// Parse a race time into seconds.
///
/// Returns `None` for empty input, non-numeric parts, anything other
/// than two or three colon-separated parts, or totals that overflow.
pub fn parse_time(text: &str) -> Option<i64> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    let parts: Vec<&str> = text.split(':').collect();
    if parts.len() < 2 || parts.len() > 3 {
        return None;
    }

    let mut values = Vec::with_capacity(parts.len());
    for part in parts {
        values.push(parse_part(part)?);
    }

    match values.as_slice() {
        [h, m, s] => h
            .checked_mul(3600)?
            .checked_add(m.checked_mul(60)?)?
            .checked_add(*s),
        [m, s] => m.checked_mul(60)?.checked_add(*s),
        _ => None,
    }
}

fn parse_part(part: &str) -> Option<i64> {
    let part = part.trim();
    if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    part.parse().ok()
}

/// Format seconds as `H:MM:SS` (when at least an hour) or `M:SS`.
///
/// Non-finite input yields an empty string. Fractions are floored.
pub fn format_time(seconds: f64) -> String {
    if !seconds.is_finite() {
        return String::new();
    }
    let whole = seconds.abs().floor() as u64;
    if seconds < 0.0 && whole > 0 {
        return format!("-{}", format_whole(whole));
    }
    format_whole(whole)
}

/// Format an integral number of seconds.
pub fn format_seconds(seconds: i64) -> String {
    let whole = seconds.unsigned_abs();
    if seconds < 0 {
        return format!("-{}", format_whole(whole));
    }
    format_whole(whole)
}

fn format_whole(total: u64) -> String {
    let h = total / 3600;
    let m = (total % 3600) / 60;
    let s = total % 60;

    if h > 0 {
        format!("{}:{:02}:{:02}", h, m, s)
    } else {
        format!("{}:{:02}", m, s)
    }
}
