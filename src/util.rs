// Utility helpers for parsing, normalization, and formatting.
//
// This module centralizes all the "dirty" CSV/number/date handling so the
// rest of the code can assume clean, typed values.
use chrono::NaiveDate;
use num_format::{Locale, ToFormattedString};

/// Parse a string-like value into `f64` while being forgiving about
/// formatting issues that are common in CSV exports (commas, spaces, text).
///
/// - Accepts `Option<&str>` so callers can pass through optional fields.
/// - Trims whitespace.
/// - Rejects values that contain alphabetic characters.
/// - Strips thousands separators like `","` before parsing.
/// - Returns `None` for anything that cannot be safely parsed.
pub fn parse_f64_safe(s: Option<&str>) -> Option<f64> {
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    if s.chars().any(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    let s = s.replace(",", "");
    s.parse::<f64>().ok()
}

pub fn parse_i32_safe(s: Option<&str>) -> Option<i32> {
    // `?` propagates `None` early if the option is missing.
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    s.parse::<i32>().ok()
}

pub fn parse_date_safe(s: Option<&str>) -> Option<NaiveDate> {
    // CSV dates are expected in `YYYY-MM-DD` format.
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
}

/// Extract the state (UF) suffix from an origin municipality written as
/// `"Name-UF"`. The state is whatever follows the last `-`, trimmed.
/// Returns `None` when there is no `-` or the suffix is blank.
pub fn origin_state(origin: &str) -> Option<&str> {
    let (_, uf) = origin.rsplit_once('-')?;
    let uf = uf.trim();
    if uf.is_empty() {
        None
    } else {
        Some(uf)
    }
}

/// Render a branch code zero-padded to four digits (`7` -> `"0007"`).
/// Codes wider than four digits keep all their digits.
pub fn format_code(code: u32) -> String {
    format!("{:04}", code)
}

/// Render an economic group as a four-digit code (`"12"` -> `"0012"`).
/// Blank or non-numeric groups have no code.
pub fn group_code(group: &str) -> Option<String> {
    let g = group.trim();
    if g.is_empty() {
        return None;
    }
    g.parse::<u32>().ok().map(format_code)
}

/// Eligibility columns carry `"S"` for yes; anything else means no.
pub fn flag_is_set(s: Option<&str>) -> bool {
    s.map(|v| v.trim().eq_ignore_ascii_case("S")).unwrap_or(false)
}

pub fn format_number(n: f64, decimals: usize) -> String {
    // Format a floating-point value with:
    // - a fixed number of decimal places, and
    // - locale-aware thousands separators (e.g., `1,234,567.89`).
    let neg = n.is_sign_negative();
    let abs_n = n.abs();
    // First, format to a plain fixed-decimal string like `1234567.89`.
    let s = format!("{:.*}", decimals, abs_n);
    let mut parts = s.split('.');
    let int_part = parts.next().unwrap_or("0");
    let frac_part = parts.next();
    // Use `num-format` to insert commas into the integer portion.
    let int_val: i64 = int_part.parse().unwrap_or(0);
    let mut res = int_val.to_formatted_string(&Locale::en);
    if let Some(frac) = frac_part {
        if decimals > 0 {
            res.push('.');
            res.push_str(frac);
        }
    } else if decimals > 0 {
        res.push('.');
        res.push_str(&"0".repeat(decimals));
    }
    if neg {
        format!("-{}", res)
    } else {
        res
    }
}

pub fn format_int<T>(n: T) -> String
where
    T: ToFormattedString,
{
    // Thin wrapper around `num-format` for integer-like values. This is used
    // for counts in console messages (e.g., `9,855 rows loaded`).
    n.to_formatted_string(&Locale::en)
}

// `tabled` display adapters for optional columns.

pub fn display_opt(o: &Option<String>) -> String {
    o.clone().unwrap_or_default()
}

pub fn display_opt_km(o: &Option<f64>) -> String {
    o.map(|v| format_number(v, 1)).unwrap_or_default()
}
