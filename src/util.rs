// Utility helpers for parsing, rounding and console formatting.
//
// Spreadsheet exports are messy; everything that turns loose text into
// typed values lives here so the pipeline only ever sees clean numbers.
use chrono::{Days, NaiveDate};
use num_format::{Locale, ToFormattedString};

const MONTH_ABBR: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Parse a cell into `f64`, forgiving thousands separators, percent signs
/// and stray spaces.
///
/// - Trims whitespace.
/// - Rejects values that contain alphabetic characters.
/// - Strips `,`, the Arabic comma `،` and `%` before parsing.
/// - Returns `None` for anything that cannot be safely parsed.
pub fn parse_f64_safe(s: Option<&str>) -> Option<f64> {
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    if s.chars().any(|c| c.is_alphabetic()) {
        return None;
    }
    let s: String = s
        .chars()
        .filter(|c| !matches!(c, ',' | '،' | '%') && !c.is_whitespace())
        .collect();
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Parse the date formats seen in the source workbooks:
/// `2026-01-01`, `01/02/2026` (day first), `1-Jan-2026` / `1/Jan/26` and
/// Excel serial day numbers such as `46023`.
pub fn parse_date_safe(s: Option<&str>) -> Option<NaiveDate> {
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(d);
    }
    if let Ok(d) = NaiveDate::parse_from_str(s, "%d/%m/%Y") {
        return Some(d);
    }
    parse_day_month_name(s).or_else(|| parse_excel_serial(s))
}

/// Excel stores dates as days since 1899-12-30 (the epoch that absorbs its
/// 1900 leap-year bug). Fractions are a time of day and are dropped.
fn parse_excel_serial(s: &str) -> Option<NaiveDate> {
    let serial: f64 = s.parse().ok()?;
    if !serial.is_finite() || serial < 1.0 {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    epoch.checked_add_days(Days::new(serial.floor() as u64))
}

fn parse_day_month_name(s: &str) -> Option<NaiveDate> {
    let parts: Vec<&str> = s.split(|c| c == '/' || c == '-' || c == ' ').collect();
    let [day, month, year] = parts.as_slice() else {
        return None;
    };
    let day: u32 = day.parse().ok()?;
    let prefix: String = month.chars().take(3).collect::<String>().to_ascii_lowercase();
    let month = MONTH_ABBR
        .iter()
        .position(|m| m.to_ascii_lowercase() == prefix)? as u32
        + 1;
    let mut year: i32 = year.parse().ok()?;
    if year < 100 {
        year += 2000;
    }
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Arithmetic mean; 0 for an empty slice so callers never see NaN.
pub fn average(v: &[f64]) -> f64 {
    if v.is_empty() {
        return 0.0;
    }
    let sum: f64 = v.iter().copied().sum();
    sum / v.len() as f64
}

/// `round(part / whole * 100)`, or 0 when `whole` is 0.
pub fn round_pct(part: usize, whole: usize) -> i64 {
    if whole == 0 {
        return 0;
    }
    (part as f64 / whole as f64 * 100.0).round() as i64
}

pub fn pct(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    part as f64 / whole as f64 * 100.0
}

/// Apply a percentage delta: `value * (1 + pct/100)`.
pub fn apply_pct(value: f64, pct: i32) -> f64 {
    value * (1.0 + f64::from(pct) / 100.0)
}

pub fn month_abbr(month: u32) -> &'static str {
    MONTH_ABBR
        .get(month.saturating_sub(1) as usize)
        .copied()
        .unwrap_or("?")
}

pub fn format_number(n: f64, decimals: usize) -> String {
    // Fixed decimals plus `num-format` grouping on the integer part,
    // e.g. `1,234,567.89`.
    let neg = n.is_sign_negative() && n != 0.0;
    let abs_n = n.abs();
    let s = format!("{:.*}", decimals, abs_n);
    let mut parts = s.split('.');
    let int_part = parts.next().unwrap_or("0");
    let frac_part = parts.next();
    let int_val: i64 = int_part.parse().unwrap_or(0);
    let mut res = int_val.to_formatted_string(&Locale::en);
    if let Some(frac) = frac_part {
        if decimals > 0 {
            res.push('.');
            res.push_str(frac);
        }
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
    n.to_formatted_string(&Locale::en)
}
