//! Reading a price out of free-form model output

use std::sync::LazyLock;

use regex::Regex;

use crate::error::{PricingError, Result};

static NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[-+]?\d*\.\d+|\d+").expect("valid price pattern"));

/// First number in `reply` after dropping `$` and `,`
///
/// Zero, negative and non-finite values are rejected like missing numbers.
pub fn parse_price(reply: &str) -> Result<f64> {
    let cleaned = reply.replace(['$', ','], "");
    NUMBER
        .find(&cleaned)
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .filter(|price| price.is_finite() && *price > 0.0)
        .ok_or_else(|| PricingError::UnparsablePrice(reply.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_first_number() {
        assert_eq!(parse_price("$1,299.99").unwrap(), 1299.99);
        assert_eq!(parse_price("Price is $42").unwrap(), 42.0);
        assert_eq!(parse_price("about 99.5 or 120").unwrap(), 99.5);
        assert_eq!(parse_price(".75").unwrap(), 0.75);
    }

    #[test]
    fn test_no_number_is_an_error() {
        assert!(matches!(parse_price("I cannot say"), Err(PricingError::UnparsablePrice(_))));
        assert!(parse_price("").is_err());
    }

    #[test]
    fn test_non_positive_price_is_an_error() {
        for reply in ["0", "$0.00", "-15", "Price is $0"] {
            assert!(
                matches!(parse_price(reply), Err(PricingError::UnparsablePrice(_))),
                "{reply} should not parse"
            );
        }
    }
}
