//! Structural encoder: syntax tree to JSON records
//!
//! Every node becomes an object whose first key, `_type`, names the node
//! kind; its fields follow in schema order. Literal constants get a refined
//! tag (`IntConstant`, `StringConstant`, ...) so consumers can read the
//! literal's type without inspecting its value.
//!
//! Encoding either produces a complete record or fails; nothing partial is
//! returned.

mod classify;
mod scalar;

use serde_json::{Map, Value as JsonValue};
use thiserror::Error;

pub use classify::{BigInt, Kind, Scalar, classify};
pub use scalar::encode_bytes;

use crate::ast::{Constant, ExprKind, Field, Module, NodeRef};
use crate::value::Value;

/// Reserved record key holding the node kind.
pub const TYPE_KEY: &str = "_type";

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EncodeError {
    #[error("unsupported value kind: {type_name}")]
    UnsupportedValueKind { type_name: String },

    #[error("unhandled constant kind: {type_name}")]
    UnhandledConstantKind { type_name: String },
}

impl EncodeError {
    pub fn kind(&self) -> &'static str {
        match self {
            EncodeError::UnsupportedValueKind { .. } => "UnsupportedValueKind",
            EncodeError::UnhandledConstantKind { .. } => "UnhandledConstantKind",
        }
    }
}

type Result<T> = std::result::Result<T, EncodeError>;

/// Encode a whole program.
pub fn encode_module(module: &Module) -> Result<JsonValue> {
    encode_node(NodeRef::Module(module))
}

/// Encode one node and everything under it.
pub fn encode_node(node: NodeRef<'_>) -> Result<JsonValue> {
    let mut record = Map::new();
    record.insert(TYPE_KEY.to_string(), JsonValue::String(node_tag(node)?.to_string()));
    for (name, field) in node.fields() {
        record.insert(name.to_string(), encode_value(&field)?);
    }
    Ok(JsonValue::Object(record))
}

/// Encode any field value.
pub fn encode_value(field: &Field<'_>) -> Result<JsonValue> {
    Ok(match classify(field)? {
        Kind::Absent => JsonValue::Null,
        Kind::Scalar(s) => scalar::encode_scalar(s),
        Kind::BigInt(n) => scalar::encode_big_int(n),
        Kind::Bytes(b) => scalar::encode_bytes(b),
        Kind::Text(s) => scalar::encode_text(s),
        Kind::Complex(c) => scalar::encode_complex(c),
        Kind::Ellipsis => scalar::encode_ellipsis(),
        Kind::List(items) => JsonValue::Array(
            items
                .iter()
                .map(encode_value)
                .collect::<Result<Vec<_>>>()?,
        ),
        Kind::Node(node) => encode_node(node)?,
    })
}

/// Encode a workspace value with the same rules as node fields.
pub fn encode_runtime_value(value: &Value) -> Result<JsonValue> {
    encode_value(&Field::Value(value.clone()))
}

fn node_tag(node: NodeRef<'_>) -> Result<&'static str> {
    let NodeRef::Expr(expr) = node else {
        return Ok(node.kind_name());
    };
    let ExprKind::Constant { value, .. } = &expr.kind else {
        return Ok(node.kind_name());
    };
    match value {
        Constant::Str(_) => Ok("StringConstant"),
        Constant::Bool(_) => Ok("BoolConstant"),
        Constant::Int(_) | Constant::BigInt(_) => Ok("IntConstant"),
        Constant::Float(_) => Ok("FloatConstant"),
        Constant::None => Ok("NoneConstant"),
        Constant::Bytes(_) | Constant::Complex(_) | Constant::Ellipsis => {
            Err(EncodeError::UnhandledConstantKind {
                type_name: value.type_name().to_string(),
            })
        }
    }
}
