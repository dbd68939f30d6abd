//! Number formatting for tool output
//!
//! Operands and results are rendered the way Python's `repr(float)` does, so
//! the text matches what Python MCP math servers emit:
//! integral values keep a trailing `.0`, and magnitudes outside `[1e-4, 1e16)`
//! switch to exponent form with a signed, two-digit exponent.

/// Render a float as Python's `repr` would
pub fn format_number(value: f64) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }

    let magnitude = value.abs();
    if magnitude == 0.0 || (1e-4..1e16).contains(&magnitude) {
        let text = value.to_string();
        return if text.contains('.') {
            text
        } else {
            format!("{text}.0")
        };
    }

    // `{:e}` is already the shortest round-trip mantissa, e.g. "1.5e-7"
    let text = format!("{value:e}");
    match text.split_once('e') {
        Some((mantissa, exponent)) => {
            let (sign, digits) = match exponent.strip_prefix('-') {
                Some(digits) => ('-', digits),
                None => ('+', exponent),
            };
            format!("{mantissa}e{sign}{digits:0>2}")
        }
        None => text,
    }
}

/// Join operands with an operator and append the result: `"a + b = r"`
pub fn format_expression(operands: &[f64], operator: &str, result: f64) -> String {
    let joined = operands
        .iter()
        .map(|n| format_number(*n))
        .collect::<Vec<_>>()
        .join(&format!(" {operator} "));
    format!("{joined} = {}", format_number(result))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integral_values_keep_decimal() {
        assert_eq!(format_number(54.0), "54.0");
        assert_eq!(format_number(0.0), "0.0");
        assert_eq!(format_number(-0.0), "-0.0");
        assert_eq!(format_number(-7.0), "-7.0");
        assert_eq!(format_number(1e15), "1000000000000000.0");
    }

    #[test]
    fn test_fractions_use_shortest_form() {
        assert_eq!(format_number(0.1), "0.1");
        assert_eq!(format_number(2.5), "2.5");
        assert_eq!(format_number(0.1 + 0.2), "0.30000000000000004");
        assert_eq!(format_number(0.0001), "0.0001");
    }

    #[test]
    fn test_exponent_form() {
        assert_eq!(format_number(1e16), "1e+16");
        assert_eq!(format_number(1.5e20), "1.5e+20");
        assert_eq!(format_number(1e-5), "1e-05");
        assert_eq!(format_number(-2.5e-7), "-2.5e-07");
        assert_eq!(format_number(1e300), "1e+300");
    }

    #[test]
    fn test_non_finite() {
        assert_eq!(format_number(f64::NAN), "nan");
        assert_eq!(format_number(f64::INFINITY), "inf");
        assert_eq!(format_number(f64::NEG_INFINITY), "-inf");
    }

    #[test]
    fn test_expression() {
        assert_eq!(format_expression(&[54.0, 6.0], "+", 60.0), "54.0 + 6.0 = 60.0");
        assert_eq!(
            format_expression(&[2.0, 3.0, 4.0], "*", 24.0),
            "2.0 * 3.0 * 4.0 = 24.0"
        );
        assert_eq!(format_expression(&[], "*", 1.0), " = 1.0");
    }
}
