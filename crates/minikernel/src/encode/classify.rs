//! Value classification
//!
//! Every value that can appear in a node field falls into one [`Kind`].
//! Order matters where representations overlap: bools are checked before
//! ints, and only Python lists (not tuples) count as ordered lists.

use super::EncodeError;
use crate::ast::{Constant, Field, NodeRef};
use crate::value::{Complex, Value};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Scalar {
    Bool(bool),
    Int(i64),
    Float(f64),
}

/// Integer literal too wide for `i64`, as decimal digits.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BigInt<'a>(pub &'a str);

#[derive(Debug, Clone)]
pub enum Kind<'a> {
    Absent,
    Scalar(Scalar),
    BigInt(BigInt<'a>),
    Bytes(&'a [u8]),
    Text(&'a str),
    Complex(Complex),
    List(Vec<Field<'a>>),
    Node(NodeRef<'a>),
    Ellipsis,
}

pub fn classify<'a>(field: &'a Field<'_>) -> Result<Kind<'a>, EncodeError> {
    Ok(match field {
        Field::Absent => Kind::Absent,
        Field::Int(n) => Kind::Scalar(Scalar::Int(*n)),
        Field::Text(s) => Kind::Text(s),
        Field::Constant(constant) => classify_constant(constant),
        Field::Node(node) => Kind::Node(*node),
        Field::List(items) => Kind::List(items.clone()),
        Field::Value(value) => classify_value(value)?,
    })
}

fn classify_constant(constant: &Constant) -> Kind<'_> {
    match constant {
        Constant::None => Kind::Absent,
        Constant::Bool(b) => Kind::Scalar(Scalar::Bool(*b)),
        Constant::Int(n) => Kind::Scalar(Scalar::Int(*n)),
        Constant::BigInt(digits) => Kind::BigInt(BigInt(digits)),
        Constant::Float(f) => Kind::Scalar(Scalar::Float(*f)),
        Constant::Bytes(b) => Kind::Bytes(b),
        Constant::Str(s) => Kind::Text(s),
        Constant::Complex(c) => Kind::Complex(*c),
        Constant::Ellipsis => Kind::Ellipsis,
    }
}

fn classify_value(value: &Value) -> Result<Kind<'_>, EncodeError> {
    Ok(match value {
        Value::None => Kind::Absent,
        Value::Bool(b) => Kind::Scalar(Scalar::Bool(*b)),
        Value::Int(n) => Kind::Scalar(Scalar::Int(*n)),
        Value::Float(f) => Kind::Scalar(Scalar::Float(*f)),
        Value::Bytes(b) => Kind::Bytes(b),
        Value::Str(s) => Kind::Text(s),
        Value::Complex(c) => Kind::Complex(*c),
        // Encoding works on a snapshot; the list stays free for other holders.
        Value::List(items) => Kind::List(items.snapshot().into_iter().map(Field::Value).collect()),
        Value::Ellipsis => Kind::Ellipsis,
        Value::Tuple(_)
        | Value::Dict(_)
        | Value::Range(_)
        | Value::DataFrame(_)
        | Value::Module(_)
        | Value::Builtin(_) => {
            return Err(EncodeError::UnsupportedValueKind {
                type_name: value.type_name().to_string(),
            });
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bool_is_not_int() {
        let kind = classify(&Field::Constant(&Constant::Bool(true))).unwrap();
        assert!(matches!(kind, Kind::Scalar(Scalar::Bool(true))));
        let kind = classify(&Field::Value(Value::Bool(false))).unwrap();
        assert!(matches!(kind, Kind::Scalar(Scalar::Bool(false))));
    }

    #[test]
    fn none_is_absent() {
        assert!(matches!(
            classify(&Field::Value(Value::None)).unwrap(),
            Kind::Absent
        ));
        assert!(matches!(classify(&Field::Absent).unwrap(), Kind::Absent));
    }

    #[test]
    fn tuples_are_unsupported() {
        let field = Field::Value(Value::Tuple(vec![Value::Int(1)]));
        let err = classify(&field).unwrap_err();
        assert_eq!(
            err,
            EncodeError::UnsupportedValueKind {
                type_name: "tuple".to_string()
            }
        );
    }

    #[test]
    fn lists_expose_their_items() {
        let field = Field::Value(Value::list(vec![Value::Int(1), Value::Str("a".into())]));
        let Kind::List(items) = classify(&field).unwrap() else {
            panic!("expected list");
        };
        assert_eq!(items.len(), 2);
    }

    #[test]
    fn wide_int_literals_keep_their_digits() {
        let constant = Constant::BigInt("18446744073709551616".into());
        let field = Field::Constant(&constant);
        let kind = classify(&field).unwrap();
        assert!(matches!(kind, Kind::BigInt(BigInt("18446744073709551616"))));
    }
}
