//! Native decimal (Oracle NUMBER) codec.
//!
//! The native encoding is variable-length:
//! - First byte is the base-100 exponent in excess-193 form, with the sign
//!   in the high bit (negative numbers store the complement).
//! - Remaining bytes are base-100 mantissa digits, stored +1 for positive
//!   numbers and as 101-digit for negative numbers, with a trailing 102
//!   terminator on short negative encodings.
//!
//! Zero is the single byte 0x80.

use crate::error::{Error, Result};
use crate::oci::constants::NUMBER_MAX_MANTISSA;

/// Fixed size a numeric bind declares for its payload, regardless of how
/// many encoding bytes are occupied.
pub const NUMBER_WIRE_SIZE: u32 = 22;

/// A number in the native decimal encoding.
///
/// Values round-trip exactly through the encoding for up to 38 significant
/// digits; `is_int` and the `to_*` decoders implement the conversion
/// primitives the marshaling pipeline relies on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OciNumber {
    bytes: Vec<u8>,
}

impl Default for OciNumber {
    fn default() -> Self {
        Self::zero()
    }
}

impl OciNumber {
    /// The encoded zero.
    pub fn zero() -> Self {
        Self { bytes: vec![0x80] }
    }

    /// Wrap raw encoding bytes without validation.
    pub fn from_wire_bytes(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    /// Raw encoding bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Encode a 64-bit signed integer.
    pub fn from_i64(value: i64) -> Result<Self> {
        Self::from_str(&value.to_string())
    }

    /// Encode a finite floating-point value.
    ///
    /// Non-finite inputs are a conversion error; out-of-range magnitudes are
    /// a range error.
    pub fn from_f64(value: f64) -> Result<Self> {
        if !value.is_finite() {
            return Err(Error::type_conversion("non-finite number"));
        }
        // Display formatting of f64 is plain decimal, shortest round-trip.
        Self::from_str(&value.to_string())
    }

    /// Encode a plain decimal string (optional sign, digits, optional
    /// fractional part). Exponent notation is rejected.
    pub fn from_str(text: &str) -> Result<Self> {
        let (negative, rest) = match text.as_bytes().first() {
            Some(b'-') => (true, &text[1..]),
            Some(b'+') => (false, &text[1..]),
            _ => (false, text),
        };

        let (int_part, frac_part) = match rest.split_once('.') {
            Some((i, f)) => (i, f),
            None => (rest, ""),
        };
        if int_part.is_empty() && frac_part.is_empty() {
            return Err(Error::type_conversion(format!("malformed number {:?}", text)));
        }
        if !int_part.bytes().all(|b| b.is_ascii_digit())
            || !frac_part.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(Error::type_conversion(format!("malformed number {:?}", text)));
        }

        // Normalize to a digit sequence with a decimal position: `position`
        // digits precede the point (may be negative for values below 1).
        let int_trim = int_part.trim_start_matches('0');
        let mut digits: Vec<u8>;
        let mut position: i32;
        if int_trim.is_empty() {
            let leading = frac_part.len() - frac_part.trim_start_matches('0').len();
            position = -(leading as i32);
            digits = frac_part[leading..].bytes().map(|b| b - b'0').collect();
        } else {
            position = int_trim.len() as i32;
            digits = int_trim.bytes().map(|b| b - b'0').collect();
            digits.extend(frac_part.bytes().map(|b| b - b'0'));
        }
        while digits.last() == Some(&0) {
            digits.pop();
        }
        if digits.is_empty() {
            return Ok(Self::zero());
        }

        // Base-100 pairing requires an even number of digits before the
        // point; a leading zero shifts the boundary without changing value.
        if position.rem_euclid(2) == 1 {
            digits.insert(0, 0);
            position += 1;
        }
        while (digits.len() as i32) < position {
            digits.push(0);
        }

        let exponent = position / 2 - 1;
        if !(-65..=62).contains(&exponent) {
            return Err(Error::NumericRange);
        }

        let mut mantissa: Vec<u8> = digits
            .chunks(2)
            .take(NUMBER_MAX_MANTISSA)
            .map(|pair| pair[0] * 10 + *pair.get(1).unwrap_or(&0))
            .collect();
        while mantissa.last() == Some(&0) {
            mantissa.pop();
        }

        let mut bytes = Vec::with_capacity(mantissa.len() + 2);
        if negative {
            bytes.push(!((exponent + 193) as u8));
            bytes.extend(mantissa.iter().map(|p| 101 - p));
            if bytes.len() < NUMBER_MAX_MANTISSA + 1 {
                bytes.push(102);
            }
        } else {
            bytes.push((exponent + 193) as u8);
            bytes.extend(mantissa.iter().map(|p| p + 1));
        }
        Ok(Self { bytes })
    }

    /// Probe whether the encoded value is integer-valued.
    pub fn is_int(&self) -> Result<bool> {
        let text = self.to_decimal_string()?;
        Ok(!text.contains('.') && !text.contains('e'))
    }

    /// Decode to a 64-bit signed integer. Errors if the value has a
    /// fractional part or does not fit.
    pub fn to_i64(&self) -> Result<i64> {
        let text = self.to_decimal_string()?;
        text.parse().map_err(|_| Error::NumericRange)
    }

    /// Decode to a floating-point value.
    pub fn to_f64(&self) -> Result<f64> {
        let text = self.to_decimal_string()?;
        text.parse()
            .map_err(|_| Error::type_conversion("unparseable native number"))
    }

    /// Decode the native encoding to a plain decimal string.
    pub fn to_decimal_string(&self) -> Result<String> {
        let bytes = &self.bytes;
        if bytes.is_empty() {
            return Ok("0".to_string());
        }

        let exp_byte = bytes[0];
        let is_positive = (exp_byte & 0x80) != 0;
        let exponent: i16 = if is_positive {
            exp_byte as i16 - 193
        } else {
            (!exp_byte) as i16 - 193
        };

        // Where the decimal point lands in the digit stream.
        let mut point: i16 = exponent * 2 + 2;

        if bytes.len() == 1 {
            return if is_positive {
                Ok("0".to_string())
            } else {
                // Maximum negative magnitude has no mantissa bytes.
                Ok("-1e126".to_string())
            };
        }

        let mantissa_end = if !is_positive && bytes[bytes.len() - 1] == 102 {
            bytes.len() - 1
        } else {
            bytes.len()
        };

        let mut digits: Vec<u8> = Vec::with_capacity((mantissa_end - 1) * 2);
        for (i, &byte) in bytes.iter().enumerate().take(mantissa_end).skip(1) {
            let pair = if is_positive {
                byte.wrapping_sub(1)
            } else {
                101u8.wrapping_sub(byte)
            };
            if pair > 100 {
                return Err(Error::type_conversion("corrupt native number encoding"));
            }
            let d1 = pair / 10;
            let d2 = pair % 10;

            if digits.is_empty() && d1 == 0 {
                point -= 1;
                if d2 != 0 || i < mantissa_end - 1 {
                    digits.push(d2);
                } else {
                    point -= 1;
                }
            } else if d1 == 10 {
                digits.push(1);
                digits.push(0);
                point += 1;
            } else {
                digits.push(d1);
                if d2 != 0 || i < mantissa_end - 1 {
                    digits.push(d2);
                }
            }
        }

        while digits.last() == Some(&0) {
            digits.pop();
        }
        if digits.is_empty() {
            return Ok("0".to_string());
        }

        let mut out = String::new();
        if !is_positive {
            out.push('-');
        }
        let count = digits.len() as i16;
        if point <= 0 {
            out.push('0');
            out.push('.');
            for _ in point..0 {
                out.push('0');
            }
            for d in &digits {
                out.push((b'0' + d) as char);
            }
        } else if point >= count {
            for d in &digits {
                out.push((b'0' + d) as char);
            }
            for _ in count..point {
                out.push('0');
            }
        } else {
            for (i, d) in digits.iter().enumerate() {
                if i as i16 == point {
                    out.push('.');
                }
                out.push((b'0' + d) as char);
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero() {
        assert_eq!(OciNumber::zero().as_bytes(), &[0x80]);
        assert_eq!(OciNumber::from_i64(0).unwrap().as_bytes(), &[0x80]);
        assert_eq!(OciNumber::zero().to_decimal_string().unwrap(), "0");
    }

    #[test]
    fn test_encode_positive_integers() {
        assert_eq!(OciNumber::from_i64(1).unwrap().as_bytes(), &[0xC1, 0x02]);
        assert_eq!(OciNumber::from_i64(10).unwrap().as_bytes(), &[0xC1, 0x0B]);
        assert_eq!(OciNumber::from_i64(100).unwrap().as_bytes(), &[0xC2, 0x02]);
    }

    #[test]
    fn test_encode_negative_integer() {
        assert_eq!(
            OciNumber::from_i64(-1).unwrap().as_bytes(),
            &[0x3E, 0x64, 0x66]
        );
    }

    #[test]
    fn test_encode_fraction() {
        assert_eq!(OciNumber::from_f64(0.5).unwrap().as_bytes(), &[0xC0, 0x33]);
    }

    #[test]
    fn test_round_trip_values() {
        for text in ["1", "42", "123.45", "-987654321", "0.005", "-0.25", "1000000"] {
            let n = OciNumber::from_str(text).unwrap();
            assert_eq!(n.to_decimal_string().unwrap(), text, "round trip of {}", text);
        }
    }

    #[test]
    fn test_round_trip_i64_extremes() {
        for v in [i64::MAX, i64::MIN + 1, 7, -7] {
            let n = OciNumber::from_i64(v).unwrap();
            assert!(n.is_int().unwrap());
            assert_eq!(n.to_i64().unwrap(), v);
        }
    }

    #[test]
    fn test_is_int_probe() {
        assert!(OciNumber::from_i64(5).unwrap().is_int().unwrap());
        assert!(!OciNumber::from_f64(5.5).unwrap().is_int().unwrap());
        assert!(OciNumber::from_f64(6.0).unwrap().is_int().unwrap());
    }

    #[test]
    fn test_fraction_to_f64() {
        let n = OciNumber::from_f64(123.45).unwrap();
        assert_eq!(n.to_f64().unwrap(), 123.45);
    }

    #[test]
    fn test_malformed_input() {
        assert!(matches!(
            OciNumber::from_str("abc"),
            Err(Error::TypeConversion { .. })
        ));
        assert!(matches!(
            OciNumber::from_str("1e3"),
            Err(Error::TypeConversion { .. })
        ));
        assert!(matches!(
            OciNumber::from_f64(f64::NAN),
            Err(Error::TypeConversion { .. })
        ));
    }

    #[test]
    fn test_out_of_range() {
        let mut big = String::from("1");
        big.push_str(&"0".repeat(130));
        assert!(matches!(OciNumber::from_str(&big), Err(Error::NumericRange)));
    }
}
