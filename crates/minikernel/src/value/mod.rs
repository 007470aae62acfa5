//! Runtime values held in the workspace

mod complex;
pub(crate) mod json;
mod shared;

use std::cmp::Ordering;

use polars::prelude::DataFrame;

pub use complex::{Complex, format_float};
pub use json::frame_to_json;
pub use shared::Shared;

use crate::ast::Constant;
use crate::eval::EvalError;
use crate::eval::builtins::Builtin;

/// A value produced by executing or evaluating code.
///
/// Lists, dicts and frames are [`Shared`]: cloning the value aliases the
/// container, the way Python names refer to objects.
#[derive(Debug, Clone)]
pub enum Value {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Complex(Complex),
    Str(String),
    Bytes(Vec<u8>),
    List(Shared<Vec<Value>>),
    Tuple(Vec<Value>),
    Dict(Shared<Dict>),
    Range(Range),
    Ellipsis,
    /// The tabular kind
    DataFrame(Shared<DataFrame>),
    /// The `pd` namespace
    Module(&'static str),
    Builtin(Builtin),
}

/// Insertion-ordered mapping with Python equality on keys.
#[derive(Debug, Clone, Default)]
pub struct Dict {
    entries: Vec<(Value, Value)>,
}

/// `range(start, stop, step)`; `step` is never zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Range {
    pub start: i64,
    pub stop: i64,
    pub step: i64,
}

impl Value {
    pub fn list(items: Vec<Value>) -> Value {
        Value::List(Shared::new(items))
    }

    pub fn dict(dict: Dict) -> Value {
        Value::Dict(Shared::new(dict))
    }

    pub fn frame(df: DataFrame) -> Value {
        Value::DataFrame(Shared::new(df))
    }

    /// Items of a list or tuple, copied out of any shared storage.
    pub fn sequence_items(&self) -> Option<Vec<Value>> {
        match self {
            Value::List(items) => Some(items.snapshot()),
            Value::Tuple(items) => Some(items.clone()),
            _ => None,
        }
    }

    /// Identity of a shared container, `None` for plain values.
    pub fn shared_id(&self) -> Option<usize> {
        match self {
            Value::List(items) => Some(items.id()),
            Value::Dict(dict) => Some(dict.id()),
            Value::DataFrame(df) => Some(df.id()),
            _ => None,
        }
    }

    /// Whether `self` is, or transitively holds, the container `id`.
    ///
    /// Checked before every container store so no container ever holds
    /// itself; the walks in `repr`, `==` and the encoder rely on that.
    pub fn reaches(&self, id: usize) -> bool {
        match self {
            Value::List(items) => {
                items.id() == id || items.with(|items| items.iter().any(|item| item.reaches(id)))
            }
            Value::Dict(dict) => {
                dict.id() == id || dict.with(|dict| dict.values().any(|value| value.reaches(id)))
            }
            Value::Tuple(items) => items.iter().any(|item| item.reaches(id)),
            _ => false,
        }
    }

    /// Python runtime type name (`type(v).__name__`).
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::None => "NoneType",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Complex(_) => "complex",
            Value::Str(_) => "str",
            Value::Bytes(_) => "bytes",
            Value::List(_) => "list",
            Value::Tuple(_) => "tuple",
            Value::Dict(_) => "dict",
            Value::Range(_) => "range",
            Value::Ellipsis => "ellipsis",
            Value::DataFrame(_) => "DataFrame",
            Value::Module(_) => "module",
            Value::Builtin(builtin) => builtin.type_name(),
        }
    }

    pub fn truthy(&self) -> Result<bool, EvalError> {
        Ok(match self {
            Value::None => false,
            Value::Bool(b) => *b,
            Value::Int(n) => *n != 0,
            Value::Float(f) => *f != 0.0,
            Value::Complex(c) => c.re != 0.0 || c.im != 0.0,
            Value::Str(s) => !s.is_empty(),
            Value::Bytes(b) => !b.is_empty(),
            Value::List(items) => items.with(|items| !items.is_empty()),
            Value::Tuple(items) => !items.is_empty(),
            Value::Dict(dict) => dict.with(|dict| !dict.is_empty()),
            Value::Range(range) => range.len() > 0,
            Value::Ellipsis | Value::Module(_) | Value::Builtin(_) => true,
            Value::DataFrame(_) => {
                return Err(EvalError::ValueError(
                    "The truth value of a DataFrame is ambiguous".to_string(),
                ));
            }
        })
    }

    /// Numeric view used by arithmetic and comparisons (bools count as ints).
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Bool(b) => Some(*b as i64),
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Bool(b) => Some(*b as i64 as f64),
            Value::Int(n) => Some(*n as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Python `is`: identity for shared containers, equality for the
    /// immutable kinds whose identity Python does not pin down.
    pub fn is_same(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::List(a), Value::List(b)) => a.ptr_eq(b),
            (Value::Dict(a), Value::Dict(b)) => a.ptr_eq(b),
            (Value::DataFrame(a), Value::DataFrame(b)) => a.ptr_eq(b),
            (Value::None, Value::None) | (Value::Ellipsis, Value::Ellipsis) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Module(a), Value::Module(b)) => a == b,
            (Value::Builtin(a), Value::Builtin(b)) => a == b,
            _ => false,
        }
    }

    /// Python `==`.
    ///
    /// Shared operands are compared on snapshots so no two locks are ever
    /// held at once.
    pub fn py_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::None, Value::None) | (Value::Ellipsis, Value::Ellipsis) => true,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Bytes(a), Value::Bytes(b)) => a == b,
            (Value::List(a), Value::List(b)) => a.ptr_eq(b) || seq_eq(&a.snapshot(), &b.snapshot()),
            (Value::Tuple(a), Value::Tuple(b)) => seq_eq(a, b),
            (Value::Dict(a), Value::Dict(b)) => {
                if a.ptr_eq(b) {
                    return true;
                }
                let (a, b) = (a.snapshot(), b.snapshot());
                a.len() == b.len()
                    && a.iter()
                        .all(|(k, v)| b.get(k).is_some_and(|other| other.py_eq(v)))
            }
            (Value::Range(a), Value::Range(b)) => a.to_values() == b.to_values(),
            (Value::DataFrame(a), Value::DataFrame(b)) => {
                a.ptr_eq(b) || a.snapshot().equals_missing(&b.snapshot())
            }
            (Value::Module(a), Value::Module(b)) => a == b,
            (Value::Builtin(a), Value::Builtin(b)) => a == b,
            (Value::Complex(a), b) | (b, Value::Complex(a)) => match b {
                Value::Complex(c) => a == c,
                other => other.as_float().is_some_and(|f| a.im == 0.0 && a.re == f),
            },
            (a, b) => match (a.as_int(), b.as_int()) {
                (Some(x), Some(y)) => x == y,
                _ => match (a.as_float(), b.as_float()) {
                    (Some(x), Some(y)) => x == y,
                    _ => false,
                },
            },
        }
    }

    /// Python ordering for `<`, `<=`, `>`, `>=`; `None` when unorderable.
    pub fn py_cmp(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
            (Value::Bytes(a), Value::Bytes(b)) => Some(a.cmp(b)),
            (Value::List(a), Value::List(b)) => seq_cmp(&a.snapshot(), &b.snapshot()),
            (Value::Tuple(a), Value::Tuple(b)) => seq_cmp(a, b),
            (a, b) => match (a.as_int(), b.as_int()) {
                (Some(x), Some(y)) => Some(x.cmp(&y)),
                _ => match (a.as_float(), b.as_float()) {
                    (Some(x), Some(y)) => x.partial_cmp(&y),
                    _ => None,
                },
            },
        }
    }

    /// Values usable as dict keys.
    pub fn is_hashable(&self) -> bool {
        match self {
            Value::List(_) | Value::Dict(_) | Value::DataFrame(_) => false,
            Value::Tuple(items) => items.iter().all(Value::is_hashable),
            _ => true,
        }
    }

    /// Python `str(v)`.
    pub fn to_str(&self) -> String {
        match self {
            Value::Str(s) => s.clone(),
            other => other.repr(),
        }
    }

    /// Python `repr(v)`.
    pub fn repr(&self) -> String {
        match self {
            Value::None => "None".to_string(),
            Value::Bool(true) => "True".to_string(),
            Value::Bool(false) => "False".to_string(),
            Value::Int(n) => n.to_string(),
            Value::Float(f) => format_float(*f),
            Value::Complex(c) => c.to_string(),
            Value::Str(s) => quote_str(s),
            Value::Bytes(b) => quote_bytes(b),
            Value::List(items) => format!("[{}]", join_reprs(&items.snapshot())),
            Value::Tuple(items) if items.len() == 1 => format!("({},)", items[0].repr()),
            Value::Tuple(items) => format!("({})", join_reprs(items)),
            Value::Dict(dict) => {
                let entries: Vec<String> = dict
                    .snapshot()
                    .iter()
                    .map(|(k, v)| format!("{}: {}", k.repr(), v.repr()))
                    .collect();
                format!("{{{}}}", entries.join(", "))
            }
            Value::Range(r) if r.step == 1 => format!("range({}, {})", r.start, r.stop),
            Value::Range(r) => format!("range({}, {}, {})", r.start, r.stop, r.step),
            Value::Ellipsis => "Ellipsis".to_string(),
            Value::DataFrame(df) => df.with(|df| format!("{df}")),
            Value::Module(name) => format!("<module '{name}'>"),
            Value::Builtin(builtin) => builtin.repr(),
        }
    }
}

impl TryFrom<&Constant> for Value {
    type Error = EvalError;

    /// Literal to runtime value; ints wider than `i64` do not fit.
    fn try_from(constant: &Constant) -> Result<Self, EvalError> {
        Ok(match constant {
            Constant::None => Value::None,
            Constant::Bool(b) => Value::Bool(*b),
            Constant::Int(n) => Value::Int(*n),
            Constant::BigInt(_) => {
                return Err(EvalError::OverflowError(
                    "integer literal does not fit in 64 bits".to_string(),
                ));
            }
            Constant::Float(f) => Value::Float(*f),
            Constant::Complex(c) => Value::Complex(*c),
            Constant::Str(s) => Value::Str(s.clone()),
            Constant::Bytes(b) => Value::Bytes(b.clone()),
            Constant::Ellipsis => Value::Ellipsis,
        })
    }
}

fn seq_eq(a: &[Value], b: &[Value]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.is_same(y) || x.py_eq(y))
}

fn seq_cmp(a: &[Value], b: &[Value]) -> Option<Ordering> {
    for (x, y) in a.iter().zip(b) {
        if !x.py_eq(y) {
            return x.py_cmp(y);
        }
    }
    Some(a.len().cmp(&b.len()))
}

fn join_reprs(items: &[Value]) -> String {
    items.iter().map(Value::repr).collect::<Vec<_>>().join(", ")
}

fn quote_str(s: &str) -> String {
    let quote = if s.contains('\'') && !s.contains('"') {
        '"'
    } else {
        '\''
    };
    let mut out = String::with_capacity(s.len() + 2);
    out.push(quote);
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c if (c as u32) < 0x20 || c as u32 == 0x7f => {
                out.push_str(&format!("\\x{:02x}", c as u32))
            }
            c => out.push(c),
        }
    }
    out.push(quote);
    out
}

fn quote_bytes(bytes: &[u8]) -> String {
    let quote = if bytes.contains(&b'\'') && !bytes.contains(&b'"') {
        b'"'
    } else {
        b'\''
    };
    let mut out = String::from("b");
    out.push(quote as char);
    for &b in bytes {
        match b {
            b'\\' => out.push_str("\\\\"),
            b'\n' => out.push_str("\\n"),
            b'\r' => out.push_str("\\r"),
            b'\t' => out.push_str("\\t"),
            b if b == quote => {
                out.push('\\');
                out.push(b as char);
            }
            0x20..=0x7e => out.push(b as char),
            b => out.push_str(&format!("\\x{b:02x}")),
        }
    }
    out.push(quote as char);
    out
}

impl Dict {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &Value) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(k, _)| k.py_eq(key))
            .map(|(_, v)| v)
    }

    pub fn get_mut(&mut self, key: &Value) -> Option<&mut Value> {
        self.entries
            .iter_mut()
            .find(|(k, _)| k.py_eq(key))
            .map(|(_, v)| v)
    }

    /// Insert or overwrite; an existing key keeps its position.
    pub fn insert(&mut self, key: Value, value: Value) -> Result<(), EvalError> {
        if !key.is_hashable() {
            return Err(EvalError::TypeError(format!(
                "unhashable type: '{}'",
                key.type_name()
            )));
        }
        match self.get_mut(&key) {
            Some(slot) => *slot = value,
            None => self.entries.push((key, value)),
        }
        Ok(())
    }

    /// Remove a key, keeping the order of the others.
    pub fn remove(&mut self, key: &Value) -> Option<Value> {
        let position = self.entries.iter().position(|(k, _)| k.py_eq(key))?;
        Some(self.entries.remove(position).1)
    }

    pub fn contains_key(&self, key: &Value) -> bool {
        self.get(key).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Value, &Value)> {
        self.entries.iter().map(|(k, v)| (k, v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &Value> {
        self.entries.iter().map(|(k, _)| k)
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.entries.iter().map(|(_, v)| v)
    }
}

impl Range {
    pub fn len(&self) -> usize {
        let span = if self.step > 0 {
            self.stop.saturating_sub(self.start)
        } else {
            self.start.saturating_sub(self.stop)
        };
        if span <= 0 {
            return 0;
        }
        let step = self.step.unsigned_abs();
        (span as u64).div_ceil(step) as usize
    }

    pub fn get(&self, index: usize) -> Option<i64> {
        (index < self.len()).then(|| self.start + self.step * index as i64)
    }

    pub fn to_values(&self) -> Vec<i64> {
        (0..self.len()).filter_map(|i| self.get(i)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bool_equals_int() {
        assert!(Value::Bool(true).py_eq(&Value::Int(1)));
        assert!(Value::Int(2).py_eq(&Value::Float(2.0)));
        assert!(!Value::list(vec![]).py_eq(&Value::Tuple(vec![])));
    }

    #[test]
    fn repr_matches_python() {
        assert_eq!(Value::Str("it's".into()).repr(), "\"it's\"");
        assert_eq!(Value::Bytes(vec![b'a', 0xff]).repr(), "b'a\\xff'");
        assert_eq!(Value::Tuple(vec![Value::Int(1)]).repr(), "(1,)");
        assert_eq!(
            Value::list(vec![Value::None, Value::Float(2.0)]).repr(),
            "[None, 2.0]"
        );
    }

    #[test]
    fn range_length() {
        let r = Range {
            start: 0,
            stop: 10,
            step: 3,
        };
        assert_eq!(r.to_values(), vec![0, 3, 6, 9]);
        let empty = Range {
            start: 5,
            stop: 0,
            step: 1,
        };
        assert_eq!(empty.len(), 0);
        let down = Range {
            start: 5,
            stop: 0,
            step: -2,
        };
        assert_eq!(down.to_values(), vec![5, 3, 1]);
    }

    #[test]
    fn dict_rejects_unhashable_keys() {
        let mut dict = Dict::new();
        assert!(dict.insert(Value::list(vec![]), Value::None).is_err());
        dict.insert(Value::Str("a".into()), Value::Int(1)).unwrap();
        dict.insert(Value::Str("a".into()), Value::Int(2)).unwrap();
        assert_eq!(dict.len(), 1);
        assert!(dict.get(&Value::Str("a".into())).unwrap().py_eq(&Value::Int(2)));
    }

    #[test]
    fn clones_share_list_storage() {
        let a = Value::list(vec![Value::Int(1)]);
        let b = a.clone();
        let Value::List(items) = &b else {
            panic!("expected list");
        };
        items.with_mut(|items| items.push(Value::Int(2)));
        assert_eq!(a.repr(), "[1, 2]");
        assert!(a.is_same(&b));
        assert!(!a.is_same(&Value::list(vec![Value::Int(1), Value::Int(2)])));
    }

    #[test]
    fn reaches_finds_nested_containers() {
        let inner = Value::list(vec![]);
        let outer = Value::list(vec![Value::Tuple(vec![inner.clone()])]);
        let id = inner.shared_id().unwrap();
        assert!(outer.reaches(id));
        assert!(inner.reaches(id));
        assert!(!Value::list(vec![]).reaches(id));
    }
}
