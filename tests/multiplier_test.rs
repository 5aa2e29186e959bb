#[cfg(test)]
mod multiplier_tests {
    use camwidget::multiplier::{calculate_product, format_number, parse_operand};

    #[test]
    fn test_whole_numbers() {
        let result = calculate_product("6", "7");
        assert_eq!(result.product, 42.0);
        assert_eq!(result.message, "The product of 6 and 7 is: 42");
    }

    #[test]
    fn test_fractions() {
        let result = calculate_product("2.5", "4");
        assert_eq!(result.message, "The product of 2.5 and 4 is: 10");

        let result = calculate_product("-1.5", "3");
        assert_eq!(result.message, "The product of -1.5 and 3 is: -4.5");
    }

    #[test]
    fn test_empty_and_garbage_count_as_zero() {
        assert_eq!(
            calculate_product("", "5").message,
            "The product of 0 and 5 is: 0"
        );
        assert_eq!(
            calculate_product("abc", "xyz").message,
            "The product of 0 and 0 is: 0"
        );
    }

    #[test]
    fn test_trailing_text_is_ignored() {
        assert_eq!(
            calculate_product("12px", "3 apples").message,
            "The product of 12 and 3 is: 36"
        );
    }

    #[test]
    fn test_negative_zero_prints_as_zero() {
        assert_eq!(
            calculate_product("-0", "5").message,
            "The product of 0 and 5 is: 0"
        );
    }

    #[test]
    fn test_infinity() {
        assert_eq!(parse_operand("Infinity"), f64::INFINITY);
        assert_eq!(parse_operand("-Infinity"), f64::NEG_INFINITY);
        assert_eq!(
            calculate_product("Infinity", "0").message,
            "The product of Infinity and 0 is: NaN"
        );
        assert_eq!(
            calculate_product("-Infinity", "2").message,
            "The product of -Infinity and 2 is: -Infinity"
        );
    }

    #[test]
    fn test_nan_input_is_zero() {
        assert_eq!(parse_operand("NaN"), 0.0);
    }

    #[test]
    fn test_large_and_tiny_products_use_exponent_form() {
        assert_eq!(
            calculate_product("1e11", "1e10").message,
            "The product of 100000000000 and 10000000000 is: 1e+21"
        );
        assert_eq!(
            calculate_product("0.0000001", "1").message,
            "The product of 1e-7 and 1 is: 1e-7"
        );
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(0.1 + 0.2), "0.30000000000000004");
        assert_eq!(format_number(1e6), "1000000");
        assert_eq!(format_number(f64::NAN), "NaN");
    }
}
