//! Leaf value encoding

use serde_json::Value as JsonValue;

use super::classify::{BigInt, Scalar};
use crate::value::Complex;
use crate::value::json::float_json;

pub fn encode_scalar(scalar: Scalar) -> JsonValue {
    match scalar {
        Scalar::Bool(b) => JsonValue::Bool(b),
        Scalar::Int(n) => JsonValue::from(n),
        Scalar::Float(f) => float_json(f),
    }
}

/// Wide integers stay JSON numbers, digit for digit.
pub fn encode_big_int(value: BigInt<'_>) -> JsonValue {
    value
        .0
        .parse::<serde_json::Number>()
        .map_or_else(|_| JsonValue::String(value.0.to_string()), JsonValue::Number)
}

/// UTF-8 text when the bytes decode, lowercase hex otherwise.
pub fn encode_bytes(bytes: &[u8]) -> JsonValue {
    let text = match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => hex::encode(bytes),
    };
    JsonValue::String(text)
}

pub fn encode_text(text: &str) -> JsonValue {
    JsonValue::String(text.to_string())
}

pub fn encode_complex(value: Complex) -> JsonValue {
    JsonValue::String(value.to_string())
}

pub fn encode_ellipsis() -> JsonValue {
    JsonValue::String("...".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn utf8_bytes_decode() {
        assert_eq!(encode_bytes("héllo".as_bytes()), JsonValue::from("héllo"));
    }

    #[test]
    fn invalid_utf8_falls_back_to_hex() {
        assert_eq!(encode_bytes(&[0xff, 0x00, 0xab]), JsonValue::from("ff00ab"));
    }

    #[test]
    fn nan_is_null() {
        assert_eq!(encode_scalar(Scalar::Float(f64::NAN)), JsonValue::Null);
        assert_eq!(encode_scalar(Scalar::Float(1.5)), JsonValue::from(1.5));
    }

    #[test]
    fn wide_ints_stay_numbers() {
        let encoded = encode_big_int(BigInt("123456789012345678901234567890"));
        assert!(encoded.is_number());
        assert_eq!(encoded.to_string(), "123456789012345678901234567890");
    }

    #[test]
    fn complex_uses_repr() {
        assert_eq!(
            encode_complex(Complex::new(1.0, -1.0)),
            JsonValue::from("(1-1j)")
        );
    }
}
