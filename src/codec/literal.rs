//! Numeric literal parsing shared by the integer and floating codecs.
//!
//! Integer literals are base-flexible: `0x`/`0X` selects hexadecimal, a
//! leading `0` selects octal, anything else is decimal. An optional sign may
//! precede the prefix. Unlike C's `strtol` family the whole token must be
//! consumed; `12abc` is rejected rather than read as `12`.

/// Why a literal was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LiteralError {
    Syntax,
    Range,
}

/// Split a literal into (negative, radix, digits).
fn split_radix(token: &str) -> Result<(bool, u32, &str), LiteralError> {
    let (negative, rest) = match token.as_bytes().first() {
        Some(b'-') => (true, &token[1..]),
        Some(b'+') => (false, &token[1..]),
        _ => (false, token),
    };
    let (radix, digits) = if let Some(hex) = rest
        .strip_prefix("0x")
        .or_else(|| rest.strip_prefix("0X"))
    {
        (16, hex)
    } else if rest.len() > 1 && rest.starts_with('0') {
        (8, &rest[1..])
    } else {
        (10, rest)
    };
    if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
        return Err(LiteralError::Syntax);
    }
    Ok((negative, radix, digits))
}

/// Parse an unsigned literal. Negative literals are a range error.
pub(crate) fn parse_unsigned(token: &str) -> Result<u64, LiteralError> {
    let (negative, radix, digits) = split_radix(token)?;
    let magnitude = u64::from_str_radix(digits, radix).map_err(|_| LiteralError::Range)?;
    if negative && magnitude != 0 {
        return Err(LiteralError::Range);
    }
    Ok(magnitude)
}

/// Parse a signed literal into the full `i64` range.
pub(crate) fn parse_signed(token: &str) -> Result<i64, LiteralError> {
    let (negative, radix, digits) = split_radix(token)?;
    let magnitude = u64::from_str_radix(digits, radix).map_err(|_| LiteralError::Range)?;
    if negative {
        if magnitude > i64::MIN.unsigned_abs() {
            return Err(LiteralError::Range);
        }
        Ok((magnitude as i64).wrapping_neg())
    } else {
        i64::try_from(magnitude).map_err(|_| LiteralError::Range)
    }
}

/// Parse a floating literal as a double.
///
/// A finite-looking literal that overflows to infinity is a range error;
/// explicit `inf`/`nan` spellings are accepted as-is.
pub(crate) fn parse_double(token: &str) -> Result<f64, LiteralError> {
    let value: f64 = token.parse().map_err(|_| LiteralError::Syntax)?;
    if value.is_infinite() {
        let lowered = token.trim_start_matches(['+', '-']).to_ascii_lowercase();
        if !lowered.starts_with("inf") {
            return Err(LiteralError::Range);
        }
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_prefixes() {
        assert_eq!(parse_unsigned("42"), Ok(42));
        assert_eq!(parse_unsigned("0x2A"), Ok(42));
        assert_eq!(parse_unsigned("0X2a"), Ok(42));
        assert_eq!(parse_unsigned("052"), Ok(42));
        assert_eq!(parse_unsigned("0"), Ok(0));
        assert_eq!(parse_unsigned("+7"), Ok(7));
        assert_eq!(parse_signed("-0x10"), Ok(-16));
        assert_eq!(parse_signed("-9223372036854775808"), Ok(i64::MIN));
    }

    #[test]
    fn integer_rejections() {
        assert_eq!(parse_unsigned(""), Err(LiteralError::Syntax));
        assert_eq!(parse_unsigned("12abc"), Err(LiteralError::Syntax));
        assert_eq!(parse_unsigned("08"), Err(LiteralError::Syntax));
        assert_eq!(parse_unsigned("0x"), Err(LiteralError::Syntax));
        assert_eq!(parse_unsigned("-1"), Err(LiteralError::Range));
        assert_eq!(parse_unsigned("18446744073709551616"), Err(LiteralError::Range));
        assert_eq!(parse_signed("9223372036854775808"), Err(LiteralError::Range));
    }

    #[test]
    fn doubles() {
        assert_eq!(parse_double("1.5"), Ok(1.5));
        assert_eq!(parse_double("-2e3"), Ok(-2000.0));
        assert!(parse_double("inf").is_ok_and(f64::is_infinite));
        assert!(parse_double("NaN").is_ok_and(f64::is_nan));
        assert_eq!(parse_double("1e400"), Err(LiteralError::Range));
        assert_eq!(parse_double(""), Err(LiteralError::Syntax));
        assert_eq!(parse_double("1.5x"), Err(LiteralError::Syntax));
    }
}
