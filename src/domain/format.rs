//! Display helpers shared by every view.
//!
//! Missing values render as `N/A` so a sparse record never breaks a layout.

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;

use super::record::{Period, Value};

/// Placeholder for a missing value.
pub const NOT_AVAILABLE: &str = "N/A";

static TEST_MARKERS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\[(testing|тестування|тестирование)\]\s?").expect("marker pattern is valid")
});

/// Strips test-environment markers such as `[TESTING]` from a title.
#[must_use]
pub fn title(raw: Option<&str>) -> String {
    raw.map_or_else(String::new, |raw| {
        TEST_MARKERS.replace_all(raw, "").trim().to_string()
    })
}

/// Formats a monetary value with thousands separators and at most two
/// decimals.
///
/// Dollar amounts (or amounts without a currency) are prefixed with `$`;
/// other currencies are suffixed with their code.
#[must_use]
pub fn amount(value: Option<&Value>) -> String {
    let Some((amount, currency)) =
        value.and_then(|value| value.amount.map(|amount| (amount, value.currency.as_deref())))
    else {
        return NOT_AVAILABLE.to_string();
    };

    let sign = if amount < 0.0 { "-" } else { "" };
    let digits = group_thousands(amount.abs());

    match currency {
        None | Some("USD") => format!("{sign}${digits}"),
        Some(code) => format!("{sign}{digits} {code}"),
    }
}

/// Formats a plain number with thousands separators and at most two
/// decimals.
#[must_use]
pub fn number(value: f64) -> String {
    let sign = if value < 0.0 { "-" } else { "" };
    format!("{sign}{}", group_thousands(value.abs()))
}

fn group_thousands(value: f64) -> String {
    let fixed = format!("{value:.2}");
    let (whole, fraction) = fixed.split_once('.').unwrap_or((fixed.as_str(), ""));
    let fraction = fraction.trim_end_matches('0');

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (index, digit) in whole.chars().enumerate() {
        if index > 0 && (whole.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    if fraction.is_empty() {
        grouped
    } else {
        format!("{grouped}.{fraction}")
    }
}

/// Formats a timestamp as a calendar date.
#[must_use]
pub fn date(value: Option<DateTime<Utc>>) -> String {
    value.map_or_else(
        || NOT_AVAILABLE.to_string(),
        |value| value.format("%Y-%m-%d").to_string(),
    )
}

/// Formats a timestamp with minute precision.
#[must_use]
pub fn datetime(value: Option<DateTime<Utc>>) -> String {
    value.map_or_else(
        || NOT_AVAILABLE.to_string(),
        |value| value.format("%Y-%m-%d %H:%M").to_string(),
    )
}

/// Formats both ends of a period.
#[must_use]
pub fn period(value: Option<&Period>) -> String {
    let (start, end) = value.map_or((None, None), |period| (period.start_date, period.end_date));
    format!("{} - {}", date(start), date(end))
}

/// Returns the value or the `N/A` placeholder.
#[must_use]
pub fn or_na(value: Option<&str>) -> &str {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or(NOT_AVAILABLE)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use test_case::test_case;

    use super::*;

    fn value(amount: f64, currency: Option<&str>) -> Value {
        Value {
            amount: Some(amount),
            currency: currency.map(str::to_string),
        }
    }

    #[test_case(0.0, "$0")]
    #[test_case(999.0, "$999")]
    #[test_case(1000.0, "$1,000")]
    #[test_case(1234.5, "$1,234.5")]
    #[test_case(1_234_567.891, "$1,234,567.89")]
    #[test_case(-2500.0, "-$2,500")]
    fn formats_dollar_amounts(amount_value: f64, expected: &str) {
        assert_eq!(amount(Some(&value(amount_value, Some("USD")))), expected);
    }

    #[test]
    fn formats_other_currencies_with_code() {
        assert_eq!(amount(Some(&value(15000.0, Some("UAH")))), "15,000 UAH");
    }

    #[test]
    fn missing_amount_is_na() {
        assert_eq!(amount(None), "N/A");
        assert_eq!(amount(Some(&Value::default())), "N/A");
    }

    #[test_case("[TESTING] Road repair", "Road repair")]
    #[test_case("[testing]Road repair", "Road repair")]
    #[test_case("[ТЕСТУВАННЯ] Ремонт", "Ремонт")]
    #[test_case("[тестирование] Ремонт", "Ремонт")]
    #[test_case("  Bridge  ", "Bridge")]
    fn strips_test_markers(raw: &str, expected: &str) {
        assert_eq!(title(Some(raw)), expected);
    }

    #[test]
    fn missing_title_is_empty() {
        assert_eq!(title(None), "");
    }

    #[test]
    fn formats_dates() {
        let when = Utc.with_ymd_and_hms(2024, 2, 29, 13, 45, 0).unwrap();
        assert_eq!(date(Some(when)), "2024-02-29");
        assert_eq!(datetime(Some(when)), "2024-02-29 13:45");
        assert_eq!(date(None), "N/A");
    }

    #[test]
    fn formats_partial_periods() {
        let period_value = Period {
            start_date: Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()),
            end_date: None,
        };
        assert_eq!(period(Some(&period_value)), "2024-01-01 - N/A");
        assert_eq!(period(None), "N/A - N/A");
    }

    #[test]
    fn blank_text_is_na() {
        assert_eq!(or_na(Some("  ")), "N/A");
        assert_eq!(or_na(Some("open")), "open");
        assert_eq!(or_na(None), "N/A");
    }

    #[test]
    fn formats_quantities() {
        assert_eq!(number(12500.0), "12,500");
        assert_eq!(number(2.5), "2.5");
    }
}
