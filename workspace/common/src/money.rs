use std::str::FromStr;

use rust_decimal::Decimal;
use rusty_money::{Money, iso};
use tracing::warn;

/// Formats an amount with its currency symbol, e.g. `$100.00`.
///
/// Unknown currency codes fall back to `<amount> <code>`.
pub fn format_amount(amount: Decimal, currency_code: &str) -> String {
    match iso::find(currency_code) {
        Some(currency) => Money::from_decimal(amount, currency).to_string(),
        None => {
            warn!("Unknown currency code '{}', formatting without symbol", currency_code);
            format!("{} {}", amount.round_dp(2), currency_code)
        }
    }
}

/// Parses a user-entered amount, tolerating a leading `$` and thousands
/// separators.
pub fn parse_amount(input: &str) -> Result<Decimal, String> {
    let cleaned: String = input
        .trim()
        .trim_start_matches('$')
        .chars()
        .filter(|c| *c != ',' && !c.is_whitespace())
        .collect();
    Decimal::from_str(&cleaned).map_err(|e| format!("invalid amount '{}': {}", input, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_usd() {
        assert_eq!(format_amount(Decimal::new(10000, 2), "USD"), "$100.00");
    }

    #[test]
    fn test_format_unknown_currency() {
        assert_eq!(format_amount(Decimal::new(1050, 2), "XYZ"), "10.50 XYZ");
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("$1,250.50"), Ok(Decimal::new(125050, 2)));
        assert_eq!(parse_amount(" 42 "), Ok(Decimal::new(42, 0)));
        assert!(parse_amount("abc").is_err());
    }
}
