//! Operators, subscripts and iteration over runtime values

use std::cmp::Ordering;

use super::{EvalError, Result};
use crate::ast::{CmpOp, Operator, UnaryOp};
use crate::frame;
use crate::value::{Complex, Dict, Range, Value};

fn overflow() -> EvalError {
    EvalError::OverflowError("int too large to fit in 64 bits".to_string())
}

fn out_of_memory() -> EvalError {
    EvalError::MemoryError(String::new())
}

fn unsupported(op: &str, left: &Value, right: &Value) -> EvalError {
    EvalError::TypeError(format!(
        "unsupported operand type(s) for {op}: '{}' and '{}'",
        left.type_name(),
        right.type_name()
    ))
}

/// Integer view for indices and counts.
pub(crate) fn index_int(value: &Value) -> Result<i64> {
    value.as_int().ok_or_else(|| {
        EvalError::TypeError(format!(
            "'{}' object cannot be interpreted as an integer",
            value.type_name()
        ))
    })
}

fn as_complex(value: &Value) -> Option<Complex> {
    match value {
        Value::Complex(c) => Some(*c),
        other => other.as_float().map(|re| Complex::new(re, 0.0)),
    }
}

pub fn binary(op: Operator, left: Value, right: Value) -> Result<Value> {
    if let (Value::Bool(a), Value::Bool(b)) = (&left, &right) {
        match op {
            Operator::BitAnd => return Ok(Value::Bool(*a & *b)),
            Operator::BitOr => return Ok(Value::Bool(*a | *b)),
            Operator::BitXor => return Ok(Value::Bool(*a ^ *b)),
            _ => {}
        }
    }
    if let (Some(a), Some(b)) = (left.as_int(), right.as_int()) {
        return int_binary(op, a, b);
    }
    if matches!(left, Value::Complex(_)) || matches!(right, Value::Complex(_)) {
        if let (Some(a), Some(b)) = (as_complex(&left), as_complex(&right)) {
            return complex_binary(op, a, b, &left, &right);
        }
    } else if let (Some(a), Some(b)) = (left.as_float(), right.as_float()) {
        return float_binary(op, a, b, &left, &right);
    }
    sequence_binary(op, left, right)
}

fn int_binary(op: Operator, a: i64, b: i64) -> Result<Value> {
    let value = match op {
        Operator::Add => a.checked_add(b).ok_or_else(overflow)?,
        Operator::Sub => a.checked_sub(b).ok_or_else(overflow)?,
        Operator::Mult => a.checked_mul(b).ok_or_else(overflow)?,
        Operator::Div => {
            if b == 0 {
                return Err(EvalError::ZeroDivisionError("division by zero".to_string()));
            }
            return Ok(Value::Float(a as f64 / b as f64));
        }
        Operator::FloorDiv => {
            if b == 0 {
                return Err(EvalError::ZeroDivisionError(
                    "integer division or modulo by zero".to_string(),
                ));
            }
            floor_div(a, b)?
        }
        Operator::Mod => {
            if b == 0 {
                return Err(EvalError::ZeroDivisionError(
                    "integer modulo by zero".to_string(),
                ));
            }
            floor_mod(a, b)
        }
        Operator::Pow => return int_pow(a, b),
        Operator::LShift => {
            if b < 0 {
                return Err(EvalError::ValueError("negative shift count".to_string()));
            }
            if a == 0 {
                0
            } else if b >= 64 {
                return Err(overflow());
            } else {
                let shifted = a << b;
                if shifted >> b != a {
                    return Err(overflow());
                }
                shifted
            }
        }
        Operator::RShift => {
            if b < 0 {
                return Err(EvalError::ValueError("negative shift count".to_string()));
            }
            a >> b.min(63)
        }
        Operator::BitAnd => a & b,
        Operator::BitOr => a | b,
        Operator::BitXor => a ^ b,
        Operator::MatMult => {
            return Err(unsupported("@", &Value::Int(a), &Value::Int(b)));
        }
    };
    Ok(Value::Int(value))
}

fn floor_div(a: i64, b: i64) -> Result<i64> {
    let quotient = a.checked_div(b).ok_or_else(overflow)?;
    if a % b != 0 && (a < 0) != (b < 0) {
        Ok(quotient - 1)
    } else {
        Ok(quotient)
    }
}

fn floor_mod(a: i64, b: i64) -> i64 {
    let rem = a.checked_rem(b).unwrap_or(0);
    if rem != 0 && (rem < 0) != (b < 0) {
        rem + b
    } else {
        rem
    }
}

fn int_pow(base: i64, exp: i64) -> Result<Value> {
    if exp < 0 {
        if base == 0 {
            return Err(EvalError::ZeroDivisionError(
                "0.0 cannot be raised to a negative power".to_string(),
            ));
        }
        return Ok(Value::Float((base as f64).powf(exp as f64)));
    }
    match base {
        0 | 1 => Ok(Value::Int(if exp == 0 { 1 } else { base })),
        -1 => Ok(Value::Int(if exp % 2 == 0 { 1 } else { -1 })),
        _ => {
            let exp = u32::try_from(exp).map_err(|_| overflow())?;
            base.checked_pow(exp).map(Value::Int).ok_or_else(overflow)
        }
    }
}

fn float_binary(op: Operator, a: f64, b: f64, left: &Value, right: &Value) -> Result<Value> {
    let value = match op {
        Operator::Add => a + b,
        Operator::Sub => a - b,
        Operator::Mult => a * b,
        Operator::Div => {
            if b == 0.0 {
                return Err(EvalError::ZeroDivisionError(
                    "float division by zero".to_string(),
                ));
            }
            a / b
        }
        Operator::FloorDiv => {
            if b == 0.0 {
                return Err(EvalError::ZeroDivisionError(
                    "float floor division by zero".to_string(),
                ));
            }
            (a / b).floor()
        }
        Operator::Mod => {
            if b == 0.0 {
                return Err(EvalError::ZeroDivisionError("float modulo".to_string()));
            }
            let rem = a % b;
            if rem != 0.0 && (rem < 0.0) != (b < 0.0) {
                rem + b
            } else {
                rem
            }
        }
        Operator::Pow => return float_pow(a, b),
        _ => return Err(unsupported(op.symbol(), left, right)),
    };
    Ok(Value::Float(value))
}

fn float_pow(a: f64, b: f64) -> Result<Value> {
    if a == 0.0 && b < 0.0 {
        return Err(EvalError::ZeroDivisionError(
            "0.0 cannot be raised to a negative power".to_string(),
        ));
    }
    if a < 0.0 && b.fract() != 0.0 && b.is_finite() {
        return complex_pow(Complex::new(a, 0.0), Complex::new(b, 0.0));
    }
    let value = a.powf(b);
    if value.is_infinite() && a.is_finite() && b.is_finite() {
        return Err(EvalError::OverflowError(
            "(34, 'Numerical result out of range')".to_string(),
        ));
    }
    Ok(Value::Float(value))
}

fn complex_pow(base: Complex, exp: Complex) -> Result<Value> {
    base.pow(exp).map(Value::Complex).ok_or_else(|| {
        EvalError::ZeroDivisionError("0.0 to a negative or complex power".to_string())
    })
}

fn complex_binary(
    op: Operator,
    a: Complex,
    b: Complex,
    left: &Value,
    right: &Value,
) -> Result<Value> {
    let value = match op {
        Operator::Add => a.add(b),
        Operator::Sub => a.sub(b),
        Operator::Mult => a.mul(b),
        Operator::Div => a.div(b).ok_or_else(|| {
            EvalError::ZeroDivisionError("complex division by zero".to_string())
        })?,
        Operator::Pow => return complex_pow(a, b),
        _ => return Err(unsupported(op.symbol(), left, right)),
    };
    Ok(Value::Complex(value))
}

fn sequence_binary(op: Operator, left: Value, right: Value) -> Result<Value> {
    match (op, left, right) {
        (Operator::Add, Value::Str(a), Value::Str(b)) => Ok(Value::Str(a + &b)),
        (Operator::Add, Value::Bytes(mut a), Value::Bytes(b)) => {
            a.extend(b);
            Ok(Value::Bytes(a))
        }
        (Operator::Add, Value::List(a), Value::List(b)) => {
            let mut items = a.snapshot();
            items.extend(b.snapshot());
            Ok(Value::list(items))
        }
        (Operator::Add, Value::Tuple(mut a), Value::Tuple(b)) => {
            a.extend(b);
            Ok(Value::Tuple(a))
        }
        (Operator::Add, left @ (Value::Str(_) | Value::List(_) | Value::Tuple(_)), right) => {
            Err(EvalError::TypeError(format!(
                "can only concatenate {name} (not \"{}\") to {name}",
                right.type_name(),
                name = left.type_name()
            )))
        }
        (Operator::Mult, sequence, count) if count.as_int().is_some() => {
            repeat(sequence, count)
        }
        (Operator::Mult, count, sequence) if count.as_int().is_some() => {
            repeat(sequence, count)
        }
        (Operator::BitOr, Value::Dict(a), Value::Dict(b)) => {
            let mut merged = a.snapshot();
            for (key, value) in b.snapshot().iter() {
                merged.insert(key.clone(), value.clone())?;
            }
            Ok(Value::dict(merged))
        }
        (Operator::Mod, Value::Str(_), _) => Err(EvalError::NotImplementedError(
            "printf-style string formatting is not supported".to_string(),
        )),
        (op, left, right) => Err(unsupported(op.symbol(), &left, &right)),
    }
}

fn repeat(sequence: Value, count: Value) -> Result<Value> {
    let times = usize::try_from(index_int(&count)?.max(0)).map_err(|_| overflow())?;
    match sequence {
        Value::Str(s) => {
            let mut out = String::new();
            out.try_reserve_exact(repeated_len(s.len(), times)?)
                .map_err(|_| out_of_memory())?;
            if !s.is_empty() {
                (0..times).for_each(|_| out.push_str(&s));
            }
            Ok(Value::Str(out))
        }
        Value::Bytes(b) => Ok(Value::Bytes(repeat_items(&b, times)?)),
        Value::List(items) => Ok(Value::list(repeat_items(&items.snapshot(), times)?)),
        Value::Tuple(items) => Ok(Value::Tuple(repeat_items(&items, times)?)),
        other => Err(unsupported("*", &other, &count)),
    }
}

/// Result length of a repeat. An overflowing length can never be
/// allocated, so it reports the same way a failed allocation does.
fn repeated_len(len: usize, times: usize) -> Result<usize> {
    len.checked_mul(times).ok_or_else(out_of_memory)
}

/// `items * times`, with the allocation checked up front.
fn repeat_items<T: Clone>(items: &[T], times: usize) -> Result<Vec<T>> {
    let mut out = Vec::new();
    out.try_reserve_exact(repeated_len(items.len(), times)?)
        .map_err(|_| out_of_memory())?;
    if !items.is_empty() {
        (0..times).for_each(|_| out.extend_from_slice(items));
    }
    Ok(out)
}

/// `target op= operand` for the kinds Python updates in place: list `+=`
/// and `*=`, dict `|=`. Returns `false` when `target` has no in-place form
/// and the caller should rebind to `binary(op, target, operand)` instead.
pub fn binary_in_place(op: Operator, target: &Value, operand: &Value) -> Result<bool> {
    match (op, target, operand) {
        (Operator::Add, Value::List(items), _) => {
            let extra: Vec<Value> = iterate(operand.clone())?.collect();
            for item in &extra {
                check_acyclic(target, item)?;
            }
            items.with_mut(|items| items.extend(extra));
            Ok(true)
        }
        (Operator::Mult, Value::List(items), count) if count.as_int().is_some() => {
            let times = usize::try_from(index_int(count)?.max(0)).map_err(|_| overflow())?;
            let repeated = repeat_items(&items.snapshot(), times)?;
            items.with_mut(|items| *items = repeated);
            Ok(true)
        }
        (Operator::BitOr, Value::Dict(dict), Value::Dict(other)) => {
            let other = other.snapshot();
            for value in other.values() {
                check_acyclic(target, value)?;
            }
            dict.with_mut(|dict| {
                other
                    .iter()
                    .try_for_each(|(key, value)| dict.insert(key.clone(), value.clone()))
            })?;
            Ok(true)
        }
        _ => Ok(false),
    }
}

/// Reject storing `value` where it would end up inside itself.
pub(crate) fn check_acyclic(container: &Value, value: &Value) -> Result<()> {
    match container.shared_id() {
        Some(id) if value.reaches(id) => Err(EvalError::NotImplementedError(format!(
            "a {} cannot contain itself",
            container.type_name()
        ))),
        _ => Ok(()),
    }
}

pub fn unary(op: UnaryOp, operand: Value) -> Result<Value> {
    let bad_operand = |value: &Value| {
        EvalError::TypeError(format!(
            "bad operand type for unary {}: '{}'",
            op.symbol(),
            value.type_name()
        ))
    };
    match (op, operand) {
        (UnaryOp::Not, value) => Ok(Value::Bool(!value.truthy()?)),
        (UnaryOp::USub, Value::Float(f)) => Ok(Value::Float(-f)),
        (UnaryOp::USub, Value::Complex(c)) => Ok(Value::Complex(Complex::new(-c.re, -c.im))),
        (UnaryOp::UAdd, value @ (Value::Float(_) | Value::Complex(_))) => Ok(value),
        (op, value) => {
            let n = value.as_int().ok_or_else(|| bad_operand(&value))?;
            match op {
                UnaryOp::USub => n.checked_neg().map(Value::Int).ok_or_else(overflow),
                UnaryOp::Invert => Ok(Value::Int(!n)),
                _ => Ok(Value::Int(n)),
            }
        }
    }
}

pub fn compare(op: CmpOp, left: &Value, right: &Value) -> Result<bool> {
    let ordering = |left: &Value, right: &Value| match left.py_cmp(right) {
        Some(ordering) => Ok(Some(ordering)),
        // NaN is unordered against everything
        None if left.as_float().is_some() && right.as_float().is_some() => Ok(None),
        None => Err(EvalError::TypeError(format!(
            "'{}' not supported between instances of '{}' and '{}'",
            op.symbol(),
            left.type_name(),
            right.type_name()
        ))),
    };
    Ok(match op {
        CmpOp::Eq => left.py_eq(right),
        CmpOp::NotEq => !left.py_eq(right),
        CmpOp::Lt => ordering(left, right)? == Some(Ordering::Less),
        CmpOp::LtE => matches!(
            ordering(left, right)?,
            Some(Ordering::Less | Ordering::Equal)
        ),
        CmpOp::Gt => ordering(left, right)? == Some(Ordering::Greater),
        CmpOp::GtE => matches!(
            ordering(left, right)?,
            Some(Ordering::Greater | Ordering::Equal)
        ),
        CmpOp::Is => left.is_same(right),
        CmpOp::IsNot => !left.is_same(right),
        CmpOp::In => contains(right, left)?,
        CmpOp::NotIn => !contains(right, left)?,
    })
}

pub fn contains(container: &Value, item: &Value) -> Result<bool> {
    match container {
        Value::Str(haystack) => match item {
            Value::Str(needle) => Ok(haystack.contains(needle.as_str())),
            other => Err(EvalError::TypeError(format!(
                "'in <string>' requires string as left operand, not {}",
                other.type_name()
            ))),
        },
        Value::Bytes(haystack) => match item {
            Value::Bytes(needle) => Ok(needle.is_empty()
                || haystack.windows(needle.len()).any(|window| window == needle)),
            other => {
                let byte = index_int(other)?;
                let byte = u8::try_from(byte).map_err(|_| {
                    EvalError::ValueError("byte must be in range(0, 256)".to_string())
                })?;
                Ok(haystack.contains(&byte))
            }
        },
        Value::List(items) => Ok(items
            .snapshot()
            .iter()
            .any(|v| v.is_same(item) || v.py_eq(item))),
        Value::Tuple(items) => Ok(items.iter().any(|v| v.is_same(item) || v.py_eq(item))),
        Value::Dict(dict) => {
            if !item.is_hashable() {
                return Err(unhashable(item));
            }
            Ok(dict.with(|dict| dict.contains_key(item)))
        }
        Value::Range(range) => match item {
            Value::Int(_) | Value::Bool(_) => {
                let n = index_int(item)?;
                let Some(offset) = n.checked_sub(range.start) else {
                    return Ok(false);
                };
                let in_bounds = if range.step > 0 {
                    n >= range.start && n < range.stop
                } else {
                    n <= range.start && n > range.stop
                };
                Ok(in_bounds && offset.checked_rem(range.step) == Some(0))
            }
            other => Ok(iterate(container.clone())?.any(|v| v.py_eq(other))),
        },
        Value::DataFrame(df) => Ok(match item {
            Value::Str(name) => df.with(|df| df.get_column_index(name).is_some()),
            _ => false,
        }),
        other => Err(EvalError::TypeError(format!(
            "argument of type '{}' is not iterable",
            other.type_name()
        ))),
    }
}

fn unhashable(value: &Value) -> EvalError {
    EvalError::TypeError(format!("unhashable type: '{}'", value.type_name()))
}

fn normalize(index: i64, len: usize) -> Option<usize> {
    let len = i64::try_from(len).ok()?;
    let index = if index < 0 { index + len } else { index };
    (0..len).contains(&index).then_some(index as usize)
}

fn sequence_index(name: &str, key: &Value, len: usize) -> Result<usize> {
    let index = key.as_int().ok_or_else(|| {
        EvalError::TypeError(format!(
            "{name} indices must be integers or slices, not {}",
            key.type_name()
        ))
    })?;
    normalize(index, len)
        .ok_or_else(|| EvalError::IndexError(format!("{name} index out of range")))
}

/// `container[key]` for a non-slice key.
pub fn index(container: &Value, key: &Value) -> Result<Value> {
    match container {
        Value::List(items) => {
            items.with(|items| Ok(items[sequence_index("list", key, items.len())?].clone()))
        }
        Value::Tuple(items) => Ok(items[sequence_index("tuple", key, items.len())?].clone()),
        Value::Str(s) => {
            let index = key.as_int().ok_or_else(|| {
                EvalError::TypeError(format!(
                    "string indices must be integers, not '{}'",
                    key.type_name()
                ))
            })?;
            normalize(index, s.chars().count())
                .and_then(|i| s.chars().nth(i))
                .map(|c| Value::Str(c.to_string()))
                .ok_or_else(|| EvalError::IndexError("string index out of range".to_string()))
        }
        Value::Bytes(bytes) => {
            let index = key.as_int().ok_or_else(|| {
                EvalError::TypeError(format!(
                    "byte indices must be integers or slices, not {}",
                    key.type_name()
                ))
            })?;
            normalize(index, bytes.len())
                .map(|i| Value::Int(bytes[i].into()))
                .ok_or_else(|| EvalError::IndexError("index out of range".to_string()))
        }
        Value::Range(range) => {
            let index = key.as_int().ok_or_else(|| {
                EvalError::TypeError(format!(
                    "range indices must be integers or slices, not {}",
                    key.type_name()
                ))
            })?;
            normalize(index, range.len())
                .and_then(|i| range.get(i))
                .map(Value::Int)
                .ok_or_else(|| {
                    EvalError::IndexError("range object index out of range".to_string())
                })
        }
        Value::Dict(dict) => {
            if !key.is_hashable() {
                return Err(unhashable(key));
            }
            dict.with(|dict| dict.get(key).cloned())
                .ok_or_else(|| EvalError::KeyError(key.repr()))
        }
        Value::DataFrame(df) => match key {
            Value::Str(name) => Ok(Value::list(df.with(|df| frame::column_values(df, name))?)),
            Value::List(names) => {
                let names = names.snapshot();
                let names = names
                    .iter()
                    .map(|name| match name {
                        Value::Str(name) => Ok(name.as_str()),
                        other => Err(EvalError::KeyError(other.repr())),
                    })
                    .collect::<Result<Vec<_>>>()?;
                Ok(Value::frame(df.with(|df| frame::select(df, &names))?))
            }
            other => Err(EvalError::KeyError(other.repr())),
        },
        other => Err(EvalError::TypeError(format!(
            "'{}' object is not subscriptable",
            other.type_name()
        ))),
    }
}

/// `container[key] = value`; the change is seen through every alias of
/// `container`.
pub fn set_item(container: &Value, key: Value, value: Value) -> Result<()> {
    check_acyclic(container, &value)?;
    match container {
        Value::List(items) => {
            let index = key.as_int().ok_or_else(|| {
                EvalError::TypeError(format!(
                    "list indices must be integers or slices, not {}",
                    key.type_name()
                ))
            })?;
            items.with_mut(|items| {
                let position = normalize(index, items.len()).ok_or_else(|| {
                    EvalError::IndexError("list assignment index out of range".to_string())
                })?;
                items[position] = value;
                Ok(())
            })
        }
        Value::Dict(dict) => {
            if !key.is_hashable() {
                return Err(unhashable(&key));
            }
            dict.with_mut(|dict| dict.insert(key, value))
        }
        Value::DataFrame(df) => match key {
            Value::Str(name) => df.with_mut(|df| frame::set_column(df, &name, &value)),
            other => Err(EvalError::KeyError(other.repr())),
        },
        other => Err(EvalError::TypeError(format!(
            "'{}' object does not support item assignment",
            other.type_name()
        ))),
    }
}

/// `del container[key]`
pub fn del_item(container: &Value, key: &Value) -> Result<()> {
    match container {
        Value::List(items) => items.with_mut(|items| {
            let position = sequence_index("list", key, items.len()).map_err(|err| match err {
                EvalError::IndexError(_) => {
                    EvalError::IndexError("list assignment index out of range".to_string())
                }
                other => other,
            })?;
            items.remove(position);
            Ok(())
        }),
        Value::Dict(dict) => {
            if !key.is_hashable() {
                return Err(unhashable(key));
            }
            dict.with_mut(|dict| dict.remove(key))
                .map(|_| ())
                .ok_or_else(|| EvalError::KeyError(key.repr()))
        }
        other => Err(EvalError::TypeError(format!(
            "'{}' object doesn't support item deletion",
            other.type_name()
        ))),
    }
}

/// Resolved `start`, `stop`, `step` for a sequence of length `len`, as
/// Python's `slice.indices` computes them.
fn slice_indices(
    lower: Option<Value>,
    upper: Option<Value>,
    step: Option<Value>,
    len: usize,
) -> Result<(i64, i64, i64)> {
    let bound = |value: Option<Value>| -> Result<Option<i64>> {
        match value {
            None | Some(Value::None) => Ok(None),
            Some(value) => value.as_int().map(Some).ok_or_else(|| {
                EvalError::TypeError(
                    "slice indices must be integers or None or have an __index__ method"
                        .to_string(),
                )
            }),
        }
    };
    let step = bound(step)?.unwrap_or(1);
    if step == 0 {
        return Err(EvalError::ValueError("slice step cannot be zero".to_string()));
    }
    let len = i64::try_from(len).map_err(|_| overflow())?;
    let (low, high) = if step > 0 { (0, len) } else { (-1, len - 1) };
    let clamp = |value: Option<i64>, default: i64| match value {
        None => default,
        Some(v) if v < 0 => (v.saturating_add(len)).max(low),
        Some(v) => v.min(high),
    };
    let start = clamp(bound(lower)?, if step > 0 { low } else { high });
    let stop = clamp(bound(upper)?, if step > 0 { high } else { low });
    Ok((start, stop, step))
}

fn slice_positions(start: i64, stop: i64, step: i64) -> Vec<usize> {
    let mut positions = Vec::new();
    let mut i = start;
    while (step > 0 && i < stop) || (step < 0 && i > stop) {
        positions.push(i as usize);
        match i.checked_add(step) {
            Some(next) => i = next,
            None => break,
        }
    }
    positions
}

/// `container[lower:upper:step]`
pub fn slice(
    container: &Value,
    lower: Option<Value>,
    upper: Option<Value>,
    step: Option<Value>,
) -> Result<Value> {
    let pick = |items: &[Value], lower, upper, step| -> Result<Vec<Value>> {
        let (start, stop, step) = slice_indices(lower, upper, step, items.len())?;
        Ok(slice_positions(start, stop, step)
            .into_iter()
            .map(|i| items[i].clone())
            .collect())
    };
    match container {
        Value::List(items) => Ok(Value::list(
            items.with(|items| pick(items, lower, upper, step))?,
        )),
        Value::Tuple(items) => Ok(Value::Tuple(pick(items, lower, upper, step)?)),
        Value::Str(s) => {
            let chars: Vec<char> = s.chars().collect();
            let (start, stop, step) = slice_indices(lower, upper, step, chars.len())?;
            Ok(Value::Str(
                slice_positions(start, stop, step)
                    .into_iter()
                    .map(|i| chars[i])
                    .collect(),
            ))
        }
        Value::Bytes(bytes) => {
            let (start, stop, step) = slice_indices(lower, upper, step, bytes.len())?;
            Ok(Value::Bytes(
                slice_positions(start, stop, step)
                    .into_iter()
                    .map(|i| bytes[i])
                    .collect(),
            ))
        }
        Value::Range(range) => {
            let (start, stop, step) = slice_indices(lower, upper, step, range.len())?;
            let at = |i: i64| {
                i.checked_mul(range.step)
                    .and_then(|offset| range.start.checked_add(offset))
                    .ok_or_else(overflow)
            };
            Ok(Value::Range(Range {
                start: at(start)?,
                stop: at(stop)?,
                step: range.step.checked_mul(step).ok_or_else(overflow)?,
            }))
        }
        Value::DataFrame(df) => {
            let df = df.snapshot();
            let (start, stop, step) = slice_indices(lower, upper, step, df.height())?;
            if step != 1 {
                return Err(EvalError::NotImplementedError(
                    "DataFrame row slices with a step are not supported".to_string(),
                ));
            }
            let len = usize::try_from(stop - start).unwrap_or(0);
            Ok(Value::frame(df.slice(start, len)))
        }
        Value::Dict(_) => Err(EvalError::TypeError("unhashable type: 'slice'".to_string())),
        other => Err(EvalError::TypeError(format!(
            "'{}' object is not subscriptable",
            other.type_name()
        ))),
    }
}

/// Iterator over a value's items, lazy for ranges.
pub enum ValueIter {
    Items(std::vec::IntoIter<Value>),
    Range { range: Range, next: usize },
}

impl Iterator for ValueIter {
    type Item = Value;

    fn next(&mut self) -> Option<Value> {
        match self {
            ValueIter::Items(items) => items.next(),
            ValueIter::Range { range, next } => {
                let value = range.get(*next)?;
                *next += 1;
                Some(Value::Int(value))
            }
        }
    }
}

/// `iter(value)`: items of sequences, characters of strings, keys of dicts
/// and column names of DataFrames.
pub fn iterate(value: Value) -> Result<ValueIter> {
    let items = match value {
        Value::List(items) => items.snapshot(),
        Value::Tuple(items) => items,
        Value::Str(s) => s.chars().map(|c| Value::Str(c.to_string())).collect(),
        Value::Bytes(bytes) => bytes.into_iter().map(|b| Value::Int(b.into())).collect(),
        Value::Dict(dict) => dict.with(|dict| dict.keys().cloned().collect()),
        Value::Range(range) => return Ok(ValueIter::Range { range, next: 0 }),
        Value::DataFrame(df) => df.with(|df| {
            df.get_column_names()
                .into_iter()
                .map(|name| Value::Str(name.to_string()))
                .collect()
        }),
        other => {
            return Err(EvalError::TypeError(format!(
                "'{}' object is not iterable",
                other.type_name()
            )));
        }
    };
    Ok(ValueIter::Items(items.into_iter()))
}

/// Stable sort with Python ordering; `reverse` keeps equal items in their
/// original order.
pub(crate) fn sort(items: &mut [Value], reverse: bool) -> Result<()> {
    let mut failure = None;
    items.sort_by(|a, b| {
        let (a, b) = if reverse { (b, a) } else { (a, b) };
        match compare(CmpOp::Lt, a, b) {
            Ok(true) => Ordering::Less,
            Ok(false) => match compare(CmpOp::Lt, b, a) {
                Ok(true) => Ordering::Greater,
                _ => Ordering::Equal,
            },
            Err(err) => {
                if failure.is_none() {
                    failure = Some(err);
                }
                Ordering::Equal
            }
        }
    });
    match failure {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

/// Build a new dict from `dict(...)`-style input: a mapping or pairs.
pub(crate) fn dict_from(value: Value) -> Result<Dict> {
    if let Value::Dict(dict) = value {
        return Ok(dict.snapshot());
    }
    let mut dict = Dict::new();
    for (position, item) in iterate(value)?.enumerate() {
        let pair: Vec<Value> = iterate(item)?.collect();
        let [key, value]: [Value; 2] = pair.try_into().map_err(|pair: Vec<Value>| {
            EvalError::ValueError(format!(
                "dictionary update sequence element #{position} has length {}; 2 is required",
                pair.len()
            ))
        })?;
        dict.insert(key, value)?;
    }
    Ok(dict)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int(n: i64) -> Value {
        Value::Int(n)
    }

    fn list(items: &[i64]) -> Value {
        Value::list(items.iter().copied().map(Value::Int).collect())
    }

    #[test]
    fn floor_division_follows_python_signs() {
        assert_eq!(binary(Operator::FloorDiv, int(-7), int(2)).unwrap().repr(), "-4");
        assert_eq!(binary(Operator::Mod, int(-7), int(2)).unwrap().repr(), "1");
        assert_eq!(binary(Operator::Mod, int(7), int(-2)).unwrap().repr(), "-1");
        assert_eq!(
            binary(Operator::Mod, Value::Float(-7.5), int(2)).unwrap().repr(),
            "0.5"
        );
    }

    #[test]
    fn division_by_zero() {
        let err = binary(Operator::Div, int(1), int(0)).unwrap_err();
        assert_eq!(err.kind(), "ZeroDivisionError");
        assert_eq!(err.to_string(), "division by zero");
        let err = binary(Operator::Mod, Value::Float(1.0), Value::Float(0.0)).unwrap_err();
        assert_eq!(err.to_string(), "float modulo");
    }

    #[test]
    fn int_overflow_is_reported() {
        let err = binary(Operator::Mult, int(i64::MAX), int(2)).unwrap_err();
        assert_eq!(err.kind(), "OverflowError");
        assert!(binary(Operator::LShift, int(1), int(63)).is_err());
        assert_eq!(binary(Operator::LShift, int(1), int(62)).unwrap().repr(), "4611686018427387904");
        assert_eq!(binary(Operator::RShift, int(-1), int(100)).unwrap().repr(), "-1");
    }

    #[test]
    fn powers() {
        assert_eq!(binary(Operator::Pow, int(2), int(10)).unwrap().repr(), "1024");
        assert_eq!(binary(Operator::Pow, int(2), int(-1)).unwrap().repr(), "0.5");
        assert_eq!(binary(Operator::Pow, int(-1), int(1_000_001)).unwrap().repr(), "-1");
        assert!(matches!(
            binary(Operator::Pow, int(-8), Value::Float(0.5)).unwrap(),
            Value::Complex(_)
        ));
    }

    #[test]
    fn bool_bitwise_stays_bool() {
        assert_eq!(
            binary(Operator::BitAnd, Value::Bool(true), Value::Bool(false)).unwrap().repr(),
            "False"
        );
        assert_eq!(binary(Operator::Add, Value::Bool(true), Value::Bool(true)).unwrap().repr(), "2");
    }

    #[test]
    fn sequences_concatenate_and_repeat() {
        assert_eq!(binary(Operator::Add, list(&[1]), list(&[2])).unwrap().repr(), "[1, 2]");
        assert_eq!(
            binary(Operator::Mult, Value::Str("ab".into()), int(3)).unwrap().repr(),
            "'ababab'"
        );
        assert_eq!(binary(Operator::Mult, int(-1), list(&[1])).unwrap().repr(), "[]");
        let err = binary(Operator::Add, Value::Str("a".into()), int(1)).unwrap_err();
        assert_eq!(err.to_string(), "can only concatenate str (not \"int\") to str");
    }

    #[test]
    fn huge_repeats_raise_memory_error() {
        let err = binary(Operator::Mult, Value::Str("a".into()), int(1 << 62)).unwrap_err();
        assert_eq!(err.kind(), "MemoryError");
        let err = binary(Operator::Mult, list(&[0]), int(100_000_000_000_000_000)).unwrap_err();
        assert_eq!(err.kind(), "MemoryError");
        let err = binary(Operator::Mult, Value::Tuple(vec![int(1); 4]), int(i64::MAX)).unwrap_err();
        assert_eq!(err.kind(), "MemoryError");
        assert_eq!(
            binary(Operator::Mult, Value::Str(String::new()), int(1 << 62)).unwrap().repr(),
            "''"
        );
    }

    #[test]
    fn in_place_updates_are_shared() {
        let target = list(&[1]);
        let alias = target.clone();
        assert!(binary_in_place(Operator::Add, &target, &list(&[2])).unwrap());
        assert!(binary_in_place(Operator::Mult, &target, &int(2)).unwrap());
        assert_eq!(alias.repr(), "[1, 2, 1, 2]");
        assert!(!binary_in_place(Operator::Add, &int(1), &int(2)).unwrap());
    }

    #[test]
    fn containers_cannot_hold_themselves() {
        let xs = list(&[1]);
        let err = set_item(&xs, int(0), xs.clone()).unwrap_err();
        assert_eq!(err.kind(), "NotImplementedError");
        let nested = Value::list(vec![xs.clone()]);
        assert!(set_item(&xs, int(0), nested).is_err());
        assert!(binary_in_place(Operator::Add, &xs, &Value::list(vec![xs.clone()])).is_err());
        assert_eq!(xs.repr(), "[1]");
    }

    #[test]
    fn deleting_items() {
        let xs = list(&[1, 2, 3]);
        del_item(&xs, &int(-1)).unwrap();
        assert_eq!(xs.repr(), "[1, 2]");
        let err = del_item(&xs, &int(5)).unwrap_err();
        assert_eq!(err.to_string(), "list assignment index out of range");
        let err = del_item(&Value::Tuple(vec![]), &int(0)).unwrap_err();
        assert_eq!(err.to_string(), "'tuple' object doesn't support item deletion");
    }

    #[test]
    fn identity_follows_shared_storage() {
        let xs = list(&[1]);
        assert!(compare(CmpOp::Is, &xs, &xs.clone()).unwrap());
        assert!(!compare(CmpOp::Is, &xs, &list(&[1])).unwrap());
        assert!(compare(CmpOp::Eq, &xs, &list(&[1])).unwrap());
    }

    #[test]
    fn mixed_operands_are_rejected() {
        let err = binary(Operator::Sub, Value::Str("a".into()), int(1)).unwrap_err();
        assert_eq!(
            err.to_string(),
            "unsupported operand type(s) for -: 'str' and 'int'"
        );
    }

    #[test]
    fn ordering_errors_name_both_types() {
        let err = compare(CmpOp::Lt, &int(1), &Value::Str("a".into())).unwrap_err();
        assert_eq!(
            err.to_string(),
            "'<' not supported between instances of 'int' and 'str'"
        );
        assert!(!compare(CmpOp::Lt, &Value::Float(f64::NAN), &int(1)).unwrap());
    }

    #[test]
    fn membership() {
        assert!(contains(&Value::Str("hello".into()), &Value::Str("ell".into())).unwrap());
        assert!(contains(&list(&[1, 2]), &Value::Float(2.0)).unwrap());
        let range = Value::Range(Range { start: 0, stop: 10, step: 3 });
        assert!(contains(&range, &int(9)).unwrap());
        assert!(!contains(&range, &int(10)).unwrap());
        assert!(contains(&int(1), &int(1)).is_err());
    }

    #[test]
    fn negative_indices() {
        assert_eq!(index(&list(&[1, 2, 3]), &int(-1)).unwrap().repr(), "3");
        let err = index(&list(&[1]), &int(5)).unwrap_err();
        assert_eq!(err.to_string(), "list index out of range");
        assert_eq!(index(&Value::Str("héllo".into()), &int(1)).unwrap().repr(), "'é'");
    }

    #[test]
    fn slices_follow_python_bounds() {
        let xs = list(&[0, 1, 2, 3, 4]);
        let s = |lower: Option<i64>, upper: Option<i64>, step: Option<i64>| {
            slice(&xs, lower.map(int), upper.map(int), step.map(int))
                .unwrap()
                .repr()
        };
        assert_eq!(s(Some(1), Some(3), None), "[1, 2]");
        assert_eq!(s(None, None, Some(-1)), "[4, 3, 2, 1, 0]");
        assert_eq!(s(Some(-2), None, None), "[3, 4]");
        assert_eq!(s(Some(10), Some(20), None), "[]");
        assert_eq!(s(None, None, Some(2)), "[0, 2, 4]");
        assert_eq!(s(Some(3), Some(0), Some(-2)), "[3, 1]");
        let err = slice(&xs, None, None, Some(int(0))).unwrap_err();
        assert_eq!(err.to_string(), "slice step cannot be zero");
    }

    #[test]
    fn range_slices_stay_ranges() {
        let range = Value::Range(Range { start: 0, stop: 10, step: 1 });
        let sliced = slice(&range, Some(int(2)), None, Some(int(3))).unwrap();
        assert_eq!(sliced.repr(), "range(2, 10, 3)");
    }

    #[test]
    fn sort_reports_unorderable_items() {
        let mut items = vec![int(2), Value::Str("a".into())];
        assert_eq!(sort(&mut items, false).unwrap_err().kind(), "TypeError");
        let mut items = vec![int(2), int(3), int(1)];
        sort(&mut items, true).unwrap();
        assert_eq!(Value::list(items).repr(), "[3, 2, 1]");
    }

    #[test]
    fn dict_from_pairs() {
        let pairs = Value::list(vec![
            Value::Tuple(vec![Value::Str("a".into()), int(1)]),
            Value::list(vec![Value::Str("b".into()), int(2)]),
        ]);
        assert_eq!(Value::dict(dict_from(pairs).unwrap()).repr(), "{'a': 1, 'b': 2}");
        let err = dict_from(Value::list(vec![list(&[1, 2, 3])])).unwrap_err();
        assert_eq!(
            err.to_string(),
            "dictionary update sequence element #0 has length 3; 2 is required"
        );
    }
}
