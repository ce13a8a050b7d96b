// Parsing and number-formatting helpers.
//
// All of the "dirty" cell handling lives here so the normalizer can work in
// terms of typed values and explicit failure reasons.
use chrono::NaiveDate;
use num_format::{Locale, ToFormattedString};

use crate::error::MetricProblem;

/// Parse a count cell such as `"1,234"` or `" 17 "`.
///
/// - Trims whitespace.
/// - Rejects values that contain alphabetic characters (this also keeps
///   `NaN` and `inf` out).
/// - Strips thousands separators like `","` before parsing.
/// - Rejects negative values; counts can't go below zero.
pub fn parse_count(s: Option<&str>) -> Result<f64, MetricProblem> {
    let s = s.map(str::trim).unwrap_or("");
    if s.is_empty() {
        return Err(MetricProblem::Missing);
    }
    if s.chars().any(|c| c.is_ascii_alphabetic()) {
        return Err(MetricProblem::NotNumeric);
    }
    let v = s
        .replace(',', "")
        .parse::<f64>()
        .map_err(|_| MetricProblem::NotNumeric)?;
    if !v.is_finite() {
        return Err(MetricProblem::NotNumeric);
    }
    if v < 0.0 {
        return Err(MetricProblem::Negative);
    }
    Ok(v)
}

/// Parse a date with exactly one declared format. No fallbacks.
pub fn parse_date(s: Option<&str>, format: &str) -> Option<NaiveDate> {
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    NaiveDate::parse_from_str(s, format).ok()
}

/// `decimals` fixed places with `en` thousands grouping (`1,234,567.89`).
/// A value that rounds to zero never gets a minus sign.
pub fn format_number(n: f64, decimals: usize) -> String {
    let fixed = format!("{:.*}", decimals, n.abs());
    let (whole, frac) = fixed.split_once('.').unwrap_or((fixed.as_str(), ""));
    let grouped = whole.parse::<u64>().unwrap_or(0).to_formatted_string(&Locale::en);
    let sign = if n < 0.0 && fixed.bytes().any(|b| matches!(b, b'1'..=b'9')) {
        "-"
    } else {
        ""
    };
    if frac.is_empty() {
        format!("{sign}{grouped}")
    } else {
        format!("{sign}{grouped}.{frac}")
    }
}

pub fn format_int<T>(n: T) -> String
where
    T: ToFormattedString,
{
    n.to_formatted_string(&Locale::en)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_count_accepts_plain_and_grouped_numbers() {
        assert_eq!(parse_count(Some("17")), Ok(17.0));
        assert_eq!(parse_count(Some(" 1,234 ")), Ok(1234.0));
        assert_eq!(parse_count(Some("0")), Ok(0.0));
    }

    #[test]
    fn parse_count_rejects_bad_cells() {
        assert_eq!(parse_count(None), Err(MetricProblem::Missing));
        assert_eq!(parse_count(Some("  ")), Err(MetricProblem::Missing));
        assert_eq!(parse_count(Some("abc")), Err(MetricProblem::NotNumeric));
        assert_eq!(parse_count(Some("NaN")), Err(MetricProblem::NotNumeric));
        assert_eq!(parse_count(Some("1..2")), Err(MetricProblem::NotNumeric));
        assert_eq!(parse_count(Some("-3")), Err(MetricProblem::Negative));
    }

    #[test]
    fn parse_date_uses_only_the_declared_format() {
        let d = parse_date(Some("2021-01-01"), "%Y-%m-%d");
        assert_eq!(d, NaiveDate::from_ymd_opt(2021, 1, 1));
        assert_eq!(parse_date(Some("01/01/2021"), "%Y-%m-%d"), None);
        assert_eq!(parse_date(Some("13/45/2021"), "%d/%m/%Y"), None);
        assert_eq!(parse_date(Some("2021"), "%Y-%m-%d"), None);
    }

    #[test]
    fn format_number_groups_thousands() {
        assert_eq!(format_number(1234567.891, 2), "1,234,567.89");
        assert_eq!(format_number(-20200.0, 0), "-20,200");
        assert_eq!(format_number(0.0, 1), "0.0");
        assert_eq!(format_number(-0.004, 2), "0.00");
        assert_eq!(format_number(-1.26, 1), "-1.3");
        assert_eq!(format_int(9855_i64), "9,855");
    }
}
