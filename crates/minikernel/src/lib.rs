//! minikernel - a remote Python-subset workspace with a syntax-tree encoder
//!
//! Holds a workspace of named values, runs snippets of a Python subset
//! against it, and turns source text into a structural JSON encoding of its
//! syntax tree.
//!
//! ## Quick Start
//!
//! ```ignore
//! use minikernel::{Workspace, parse_to_record};
//!
//! let mut ws = Workspace::new();
//! ws.execute("df = pd.DataFrame({'name': ['ann'], 'age': [31]})")?;
//! let cols = ws.describe_columns("df")?; // {"name": "str", "age": "int"}
//!
//! let record = parse_to_record("x = 1")?;
//! assert_eq!(record["_type"], "Module");
//! ```
//!
//! ## Structural records
//!
//! - every node becomes `{"_type": <kind>, <field>: <value>, ...}`
//! - fields follow `_type` in alphabetical order
//! - literal constants are tagged `IntConstant`, `StringConstant`, ...
//! - bytes that are not UTF-8 are hex encoded

pub mod ast;
pub mod encode;
pub mod eval;
pub mod frame;
pub mod parse;
pub mod value;
mod workspace;

use thiserror::Error;

// ============ Primary Public API ============

pub use encode::{EncodeError, encode_module};
pub use eval::EvalError;
pub use parse::ParseError;
pub use value::Value;
pub use workspace::Workspace;

/// Liveness reply.
pub fn liveness() -> &'static str {
    "Python service is alive!"
}

/// Parse a program and encode its syntax tree.
pub fn parse_to_record(source: &str) -> Result<serde_json::Value, KernelError> {
    let module = parse::parse(source)?;
    Ok(encode_module(&module)?)
}

// ============ Errors ============

#[derive(Error, Debug)]
pub enum KernelError {
    #[error(transparent)]
    Syntax(#[from] ParseError),

    #[error(transparent)]
    Encode(#[from] EncodeError),

    #[error(transparent)]
    Eval(#[from] EvalError),

    #[error("name '{0}' is not defined")]
    NameNotFound(String),

    #[error("'{name}' is a {type_name}, not a DataFrame")]
    WrongValueKind { name: String, type_name: String },

    #[error("DataFrame '{0}' has no rows")]
    EmptyTable(String),
}

impl KernelError {
    /// Taxonomy entry reported to clients.
    pub fn kind(&self) -> &'static str {
        match self {
            KernelError::Syntax(_) => "SyntaxError",
            KernelError::Encode(err) => err.kind(),
            KernelError::Eval(err) => err.kind(),
            KernelError::NameNotFound(_) => "NameNotFound",
            KernelError::WrongValueKind { .. } => "WrongValueKind",
            KernelError::EmptyTable(_) => "EmptyTable",
        }
    }
}
