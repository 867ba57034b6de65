//! Display formatting for view objects.

use chrono::{DateTime, Utc};

/// Formats an amount with the currency symbol and thousands separators.
///
/// Unknown currencies fall back to `"<amount> <CODE>"`.
pub fn format_currency(amount: f64, currency: &str) -> String {
    let code = currency.to_ascii_uppercase();
    let symbol = match code.as_str() {
        "USD" => Some("$"),
        "EUR" => Some("€"),
        "GBP" => Some("£"),
        "INR" => Some("₹"),
        "JPY" => Some("¥"),
        _ => None,
    };

    let sign = if amount < 0.0 { "-" } else { "" };
    let body = group_thousands(amount.abs());
    match symbol {
        Some(symbol) => format!("{sign}{symbol}{body}"),
        None => format!("{sign}{body} {code}"),
    }
}

fn group_thousands(value: f64) -> String {
    let fixed = format!("{value:.2}");
    let (whole, frac) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    format!("{grouped}.{frac}")
}

/// Formats a timestamp as a short calendar date, e.g. `"Jan 5, 2024"`.
pub fn format_date(at: &DateTime<Utc>) -> String {
    at.format("%b %-d, %Y").to_string()
}

/// Formats a timestamp with time of day, e.g. `"Jan 5, 2024 14:03"`.
pub fn format_datetime(at: &DateTime<Utc>) -> String {
    at.format("%b %-d, %Y %H:%M").to_string()
}

/// Converts seconds of listening time to hours, rounded to one decimal.
pub fn seconds_to_hours(seconds: i64) -> f64 {
    (seconds as f64 / 360.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_format_currency_known_symbols() {
        assert_eq!(format_currency(1234.5, "USD"), "$1,234.50");
        assert_eq!(format_currency(12.0, "eur"), "€12.00");
        assert_eq!(format_currency(0.0, "GBP"), "£0.00");
    }

    #[test]
    fn test_format_currency_large_and_negative() {
        assert_eq!(format_currency(1_000_000.0, "USD"), "$1,000,000.00");
        assert_eq!(format_currency(-42.129, "USD"), "-$42.13");
    }

    #[test]
    fn test_format_currency_unknown_code() {
        assert_eq!(format_currency(12.0, "xyz"), "12.00 XYZ");
    }

    #[test]
    fn test_format_date() {
        let at = Utc.with_ymd_and_hms(2024, 1, 5, 14, 3, 0).unwrap();
        assert_eq!(format_date(&at), "Jan 5, 2024");
        assert_eq!(format_datetime(&at), "Jan 5, 2024 14:03");
    }

    #[test]
    fn test_seconds_to_hours() {
        assert_eq!(seconds_to_hours(3600), 1.0);
        assert_eq!(seconds_to_hours(5400), 1.5);
        assert_eq!(seconds_to_hours(0), 0.0);
    }
}
