//! Cell parsers for numbers, rates, dates and pay periods.
//!
//! Parsers return the rejection reason as a `String`; the normalizer wraps
//! it with the row index and column name.

use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;

use super::row::RawValue;
use super::schema::RateUnit;
use crate::core::PayPeriod;

const CURRENCY_SYMBOLS: &[char] = &['€', '$', '£', '¥', '₣', '¢', '₤'];
const CURRENCY_CODES: &[&str] = &["EUR", "USD", "GBP", "CHF", "JPY", "CAD", "XPF"];

/// Digit grouping characters: space, NBSP, narrow NBSP, apostrophes.
const GROUPING: &[char] = &[' ', '\u{00A0}', '\u{202F}', '\'', '\u{2019}'];

/// Parse a decimal number written the French or the English way.
///
/// Accepts "1234.56", "1234,56", "1 234,56", "1.234,56", "1,234.56" and
/// "1'234.56". A single separator is the decimal separator; a repeated one
/// is a thousands separator.
pub fn parse_decimal(text: &str) -> Result<Decimal, String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err("empty value".into());
    }
    if has_currency_marker(trimmed) {
        return Err(format!(
            "currency symbol in numeric value '{trimmed}'"
        ));
    }

    let compact: String = trimmed.chars().filter(|c| !GROUPING.contains(c)).collect();
    let (sign, digits) = match compact.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", compact.strip_prefix('+').unwrap_or(&compact)),
    };
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit() || c == '.' || c == ',') {
        return Err(format!("'{trimmed}' is not a number"));
    }

    let dots = digits.matches('.').count();
    let commas = digits.matches(',').count();
    let mut canonical = match (dots, commas) {
        (0, 0) => digits.to_string(),
        (_, 0) => single_separator(digits, '.')?,
        (0, _) => single_separator(digits, ',')?,
        _ => {
            let last_dot = digits.rfind('.').unwrap_or(0);
            let last_comma = digits.rfind(',').unwrap_or(0);
            let (decimal, grouping) = if last_dot > last_comma {
                ('.', ',')
            } else {
                (',', '.')
            };
            if digits.matches(decimal).count() > 1 {
                return Err(format!("'{trimmed}' has more than one decimal separator"));
            }
            let pos = digits.rfind(decimal).unwrap_or(0);
            let (int_part, frac_part) = digits.split_at(pos);
            check_groups(int_part, grouping)?;
            format!("{}.{}", int_part.replace(grouping, ""), &frac_part[1..])
        }
    };

    if canonical.ends_with('.') {
        return Err(format!("'{trimmed}' ends with a decimal separator"));
    }
    if canonical.starts_with('.') {
        canonical.insert(0, '0');
    }

    Decimal::from_str(&format!("{sign}{canonical}"))
        .map_err(|e| format!("'{trimmed}' is not a number: {e}"))
}

fn has_currency_marker(s: &str) -> bool {
    if s.chars().any(|c| CURRENCY_SYMBOLS.contains(&c)) {
        return true;
    }
    let letters: String = s
        .chars()
        .filter(|c| c.is_alphabetic())
        .collect::<String>()
        .to_uppercase();
    CURRENCY_CODES.iter().any(|code| letters == *code)
}

fn single_separator(digits: &str, sep: char) -> Result<String, String> {
    if digits.matches(sep).count() == 1 {
        return Ok(digits.replace(sep, "."));
    }
    check_groups(digits, sep)?;
    Ok(digits.replace(sep, ""))
}

fn check_groups(int_part: &str, sep: char) -> Result<(), String> {
    let mut groups = int_part.split(sep);
    let first_ok = groups
        .next()
        .is_some_and(|g| (1..=3).contains(&g.len()));
    if !first_ok || !groups.all(|g| g.len() == 3) {
        return Err(format!("misplaced thousands separator in '{int_part}'"));
    }
    Ok(())
}

/// Parse a rate and convert it to a fraction in [0, 1].
///
/// A trailing `%` always means percent; otherwise `unit` decides.
pub fn parse_rate(raw: &RawValue, unit: RateUnit) -> Result<Decimal, String> {
    let (value, percent) = match raw {
        RawValue::Number(d) => (*d, unit == RateUnit::Percent),
        RawValue::Text(s) => match s.trim().strip_suffix('%') {
            Some(number) => (parse_decimal(number)?, true),
            None => (parse_decimal(s)?, unit == RateUnit::Percent),
        },
        RawValue::Empty => return Err("empty value".into()),
    };
    let rate = if percent {
        value / Decimal::ONE_HUNDRED
    } else {
        value
    };
    if rate < Decimal::ZERO || rate > Decimal::ONE {
        return Err(format!("rate {raw} is outside 0-100 %"));
    }
    Ok(rate.normalize())
}

/// First format in `formats` that parses `text` wins.
///
/// A trailing time part ("2024-03-15 00:00:00", "2024-03-15T08:00") is
/// ignored, as spreadsheet exports often carry one.
pub fn parse_date<S: AsRef<str>>(text: &str, formats: &[S]) -> Option<NaiveDate> {
    let trimmed = text.trim();
    let date_part = trimmed
        .split(|c| c == ' ' || c == 'T')
        .next()
        .unwrap_or(trimmed);
    formats.iter().find_map(|f| {
        NaiveDate::parse_from_str(trimmed, f.as_ref())
            .or_else(|_| NaiveDate::parse_from_str(date_part, f.as_ref()))
            .ok()
    })
}

/// Parse "MM/YYYY", "MM-YYYY", "MM.YYYY", "YYYY-MM" or a full date.
pub fn parse_period<S: AsRef<str>>(text: &str, date_formats: &[S]) -> Option<PayPeriod> {
    let trimmed = text.trim();
    for sep in ['/', '-', '.'] {
        let parts: Vec<&str> = trimmed.split(sep).collect();
        if parts.len() != 2 || !parts.iter().all(|p| !p.is_empty() && p.chars().all(|c| c.is_ascii_digit())) {
            continue;
        }
        let (year, month) = match (parts[0].len(), parts[1].len()) {
            (4, 1..=2) => (parts[0], parts[1]),
            (1..=2, 4) => (parts[1], parts[0]),
            _ => continue,
        };
        return PayPeriod::new(year.parse().ok()?, month.parse().ok()?);
    }
    parse_date(trimmed, date_formats).map(PayPeriod::containing)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    const FORMATS: &[&str] = &["%d/%m/%Y", "%Y-%m-%d", "%d.%m.%Y", "%d-%m-%Y", "%Y%m%d"];

    #[test]
    fn decimal_separators() {
        assert_eq!(parse_decimal("1234.56").unwrap(), dec!(1234.56));
        assert_eq!(parse_decimal("1234,56").unwrap(), dec!(1234.56));
        assert_eq!(parse_decimal("1 234,56").unwrap(), dec!(1234.56));
        assert_eq!(parse_decimal("1\u{00A0}234,56").unwrap(), dec!(1234.56));
        assert_eq!(parse_decimal("1.234,56").unwrap(), dec!(1234.56));
        assert_eq!(parse_decimal("1,234.56").unwrap(), dec!(1234.56));
        assert_eq!(parse_decimal("1'234.5").unwrap(), dec!(1234.5));
        assert_eq!(parse_decimal("1.234.567").unwrap(), dec!(1234567));
        assert_eq!(parse_decimal("-0,5").unwrap(), dec!(-0.5));
        assert_eq!(parse_decimal(",5").unwrap(), dec!(0.5));
    }

    #[test]
    fn rejects_currency_and_text() {
        assert!(parse_decimal("12,50 €").unwrap_err().contains("currency"));
        assert!(parse_decimal("EUR 12.50").unwrap_err().contains("currency"));
        assert!(parse_decimal("$5").is_err());
        assert!(parse_decimal("douze").is_err());
        assert!(parse_decimal("1.2.3,4,5").is_err());
        assert!(parse_decimal("12,34,5").is_err());
        assert!(parse_decimal("5.").is_err());
        assert!(parse_decimal("").is_err());
    }

    #[test]
    fn rates() {
        let text = |s: &str| RawValue::Text(s.into());
        assert_eq!(parse_rate(&text("0.2"), RateUnit::Fraction).unwrap(), dec!(0.2));
        assert_eq!(parse_rate(&text("20"), RateUnit::Percent).unwrap(), dec!(0.2));
        assert_eq!(parse_rate(&text("5,5 %"), RateUnit::Fraction).unwrap(), dec!(0.055));
        assert_eq!(
            parse_rate(&RawValue::Number(dec!(20)), RateUnit::Percent).unwrap(),
            dec!(0.2)
        );
        assert!(parse_rate(&text("20"), RateUnit::Fraction).is_err());
        assert!(parse_rate(&text("-1%"), RateUnit::Fraction).is_err());
    }

    #[test]
    fn dates() {
        let d = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        assert_eq!(parse_date("15/03/2024", FORMATS), Some(d));
        assert_eq!(parse_date("2024-03-15", FORMATS), Some(d));
        assert_eq!(parse_date("15.03.2024", FORMATS), Some(d));
        assert_eq!(parse_date("20240315", FORMATS), Some(d));
        assert_eq!(parse_date("2024-03-15 00:00:00", FORMATS), Some(d));
        assert_eq!(parse_date("31/02/2024", FORMATS), None);
        assert_eq!(parse_date("March 15", FORMATS), None);
    }

    #[test]
    fn periods() {
        let march = PayPeriod::new(2024, 3).unwrap();
        assert_eq!(parse_period("03/2024", FORMATS), Some(march));
        assert_eq!(parse_period("3-2024", FORMATS), Some(march));
        assert_eq!(parse_period("03.2024", FORMATS), Some(march));
        assert_eq!(parse_period("2024-03", FORMATS), Some(march));
        assert_eq!(parse_period("01/03/2024", FORMATS), Some(march));
        assert_eq!(parse_period("13/2024", FORMATS), None);
        assert_eq!(parse_period("mars", FORMATS), None);
    }
}
