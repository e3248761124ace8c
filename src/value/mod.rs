/// Runtime value. The tag alone decides which payload is live; there is no
/// coercion between booleans and numbers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    Nil,
    Bool(bool),
    Number(f64),
}

/// Significant digits used when printing numbers (C's `%g` default).
const SIGNIFICANT_DIGITS: usize = 6;

impl Value {
    /// `nil` and `false` are falsey, everything else is truthy (including `0`).
    pub fn is_falsey(&self) -> bool {
        matches!(self, Value::Nil | Value::Bool(false))
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Number(n) => write!(f, "{}", format_general(*n)),
        }
    }
}

/// Formats a number the way C's `printf("%g", n)` does.
fn format_general(n: f64) -> String {
    if n.is_nan() {
        return "nan".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    if n == 0.0 {
        return if n.is_sign_negative() { "-0" } else { "0" }.to_string();
    }

    // Round to the significant digits first: the exponent that decides
    // between fixed and scientific notation is the one after rounding.
    let scientific = format!("{:.*e}", SIGNIFICANT_DIGITS - 1, n);
    let Some((mantissa, exponent)) = scientific.split_once('e') else {
        return scientific;
    };
    let exponent: i32 = exponent.parse().unwrap_or(0);

    if exponent < -4 || exponent >= SIGNIFICANT_DIGITS as i32 {
        let sign = if exponent < 0 { '-' } else { '+' };
        format!("{}e{}{:02}", strip_trailing_zeros(mantissa), sign, exponent.unsigned_abs())
    } else {
        let decimals = (SIGNIFICANT_DIGITS as i32 - 1 - exponent) as usize;
        strip_trailing_zeros(&format!("{:.*}", decimals, n)).to_string()
    }
}

fn strip_trailing_zeros(digits: &str) -> &str {
    if digits.contains('.') {
        digits.trim_end_matches('0').trim_end_matches('.')
    } else {
        digits
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn show(n: f64) -> String {
        Value::Number(n).to_string()
    }

    #[test]
    fn falsey_values() {
        assert!(Value::Nil.is_falsey());
        assert!(Value::Bool(false).is_falsey());
        assert!(!Value::Bool(true).is_falsey());
        assert!(!Value::Number(0.0).is_falsey());
    }

    #[test]
    fn equality_is_tagged() {
        assert_eq!(Value::Number(1.0), Value::Number(1.0));
        assert_ne!(Value::Nil, Value::Bool(false));
        assert_ne!(Value::Number(0.0), Value::Bool(false));
        assert_ne!(Value::Number(1.0), Value::Bool(true));
        assert_ne!(Value::Number(f64::NAN), Value::Number(f64::NAN));
    }

    #[test]
    fn display_literals() {
        assert_eq!(Value::Nil.to_string(), "nil");
        assert_eq!(Value::Bool(true).to_string(), "true");
        assert_eq!(Value::Bool(false).to_string(), "false");
    }

    #[test]
    fn display_integers_without_fraction() {
        assert_eq!(show(7.0), "7");
        assert_eq!(show(-3.0), "-3");
        assert_eq!(show(100000.0), "100000");
        assert_eq!(show(123456.0), "123456");
    }

    #[test]
    fn display_fractions() {
        assert_eq!(show(1.2), "1.2");
        assert_eq!(show(0.5), "0.5");
        assert_eq!(show(1.0 / 3.0), "0.333333");
        assert_eq!(show(2.0 / 3.0), "0.666667");
        assert_eq!(show(0.0001), "0.0001");
        assert_eq!(show(123456.7), "123457");
    }

    #[test]
    fn display_exponent_form() {
        assert_eq!(show(1000000.0), "1e+06");
        assert_eq!(show(1e21), "1e+21");
        assert_eq!(show(1.5e-5), "1.5e-05");
        assert_eq!(show(9999999.0), "1e+07");
        assert_eq!(show(-2.5e100), "-2.5e+100");
    }

    #[test]
    fn display_special_numbers() {
        assert_eq!(show(f64::INFINITY), "inf");
        assert_eq!(show(f64::NEG_INFINITY), "-inf");
        assert_eq!(show(f64::NAN), "nan");
        assert_eq!(show(0.0), "0");
        assert_eq!(show(-0.0), "-0");
    }
}
