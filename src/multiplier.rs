//! Multiplier form: reads two loosely-typed inputs and reports their product

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductResult {
    pub first: f64,
    pub second: f64,
    pub product: f64,
    pub message: String,
}

/// Multiply two raw form inputs. Unparsable inputs count as zero.
pub fn calculate_product(first: &str, second: &str) -> ProductResult {
    let first = parse_operand(first);
    let second = parse_operand(second);
    let product = first * second;

    let message = format!(
        "The product of {} and {} is: {}",
        format_number(first),
        format_number(second),
        format_number(product)
    );
    log::debug!("{}", message);

    ProductResult {
        first,
        second,
        product,
        message,
    }
}

/// Lenient float parsing: the longest numeric prefix after leading
/// whitespace wins, anything else (or NaN) is 0.
pub fn parse_operand(input: &str) -> f64 {
    let value = numeric_prefix(input.trim_start())
        .and_then(|prefix| prefix.parse::<f64>().ok())
        .unwrap_or(0.0);
    if value.is_nan() {
        0.0
    } else {
        value
    }
}

fn numeric_prefix(s: &str) -> Option<&str> {
    let bytes = s.as_bytes();
    let mut end = 0;

    if matches!(bytes.first(), Some(b'+') | Some(b'-')) {
        end = 1;
    }
    if s[end..].starts_with("Infinity") {
        return Some(&s[..end + "Infinity".len()]);
    }

    let int_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let mut digits = end - int_start;

    if end < bytes.len() && bytes[end] == b'.' {
        let frac_start = end + 1;
        let mut frac_end = frac_start;
        while frac_end < bytes.len() && bytes[frac_end].is_ascii_digit() {
            frac_end += 1;
        }
        digits += frac_end - frac_start;
        if digits > 0 {
            end = frac_end;
        }
    }

    if digits == 0 {
        return None;
    }

    // Exponent only counts when followed by at least one digit.
    if end < bytes.len() && (bytes[end] == b'e' || bytes[end] == b'E') {
        let mut exp_end = end + 1;
        if exp_end < bytes.len() && (bytes[exp_end] == b'+' || bytes[exp_end] == b'-') {
            exp_end += 1;
        }
        let exp_digits_start = exp_end;
        while exp_end < bytes.len() && bytes[exp_end].is_ascii_digit() {
            exp_end += 1;
        }
        if exp_end > exp_digits_start {
            end = exp_end;
        }
    }

    Some(&s[..end])
}

/// Render a number the way a browser would show it in text
pub fn format_number(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value.is_infinite() {
        if value > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else if value == 0.0 {
        "0".to_string()
    } else {
        format_finite(value)
    }
}

/// Plain decimal for exponents -7 < e < 21, otherwise `d.ddde+N` / `d.ddde-N`
fn format_finite(value: f64) -> String {
    let scientific = format!("{:e}", value);
    let Some((mantissa, exponent)) = scientific.split_once('e') else {
        return value.to_string();
    };
    let exponent: i32 = exponent.parse().unwrap_or(0);

    if (-6..21).contains(&exponent) {
        value.to_string()
    } else if exponent > 0 {
        format!("{}e+{}", mantissa, exponent)
    } else {
        format!("{}e{}", mantissa, exponent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exponent_form_past_thresholds() {
        assert_eq!(format_number(1e21), "1e+21");
        assert_eq!(format_number(-1.5e22), "-1.5e+22");
        assert_eq!(format_number(1e20), "100000000000000000000");
        assert_eq!(format_number(1e-7), "1e-7");
        assert_eq!(format_number(1.25e-9), "1.25e-9");
        assert_eq!(format_number(0.000001), "0.000001");
    }

    #[test]
    fn test_plain_numbers() {
        assert_eq!(parse_operand("42"), 42.0);
        assert_eq!(parse_operand("-2.5"), -2.5);
        assert_eq!(parse_operand("  7"), 7.0);
    }

    #[test]
    fn test_prefix_parsing() {
        assert_eq!(parse_operand("3.5kg"), 3.5);
        assert_eq!(parse_operand("1e3x"), 1000.0);
        assert_eq!(parse_operand("1e"), 1.0);
        assert_eq!(parse_operand(".5"), 0.5);
        assert_eq!(parse_operand("5."), 5.0);
    }

    #[test]
    fn test_garbage_is_zero() {
        assert_eq!(parse_operand(""), 0.0);
        assert_eq!(parse_operand("abc"), 0.0);
        assert_eq!(parse_operand("-"), 0.0);
        assert_eq!(parse_operand("."), 0.0);
    }

    #[test]
    fn test_infinity() {
        assert_eq!(parse_operand("Infinity"), f64::INFINITY);
        assert_eq!(parse_operand("-Infinity and beyond"), f64::NEG_INFINITY);
    }

    #[test]
    fn test_message_formatting() {
        let result = calculate_product("2.5", "4");
        assert_eq!(result.product, 10.0);
        assert_eq!(result.message, "The product of 2.5 and 4 is: 10");
    }

    #[test]
    fn test_negative_zero_prints_as_zero() {
        let result = calculate_product("-0", "5");
        assert_eq!(result.message, "The product of 0 and 5 is: 0");
    }

    #[test]
    fn test_infinite_product() {
        let result = calculate_product("Infinity", "2");
        assert_eq!(result.message, "The product of Infinity and 2 is: Infinity");
    }
}
