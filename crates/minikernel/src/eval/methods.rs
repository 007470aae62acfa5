//! Attribute access and method calls on runtime values

use std::sync::Arc;

use polars::prelude::{DataFrame, IdxSize, IntoLazy, PlSmallStr, Selector, SortMultipleOptions};

use super::builtins::pandas_member;
use super::ops::{self, check_acyclic, index_int, iterate};
use super::{Args, EvalError, Result};
use crate::frame;
use crate::value::{Dict, Shared, Value};

const STR_METHODS: &[&str] = &[
    "upper",
    "lower",
    "strip",
    "lstrip",
    "rstrip",
    "split",
    "join",
    "replace",
    "startswith",
    "endswith",
    "find",
    "count",
];

const LIST_METHODS: &[&str] = &[
    "append", "extend", "pop", "insert", "index", "count", "remove", "reverse", "sort", "clear",
    "copy",
];

const TUPLE_METHODS: &[&str] = &["index", "count"];

const DICT_METHODS: &[&str] = &["keys", "values", "items", "get", "update", "pop", "copy"];

const FRAME_METHODS: &[&str] = &["head", "tail", "sort_values", "drop", "rename", "copy"];

fn methods_of(value: &Value) -> &'static [&'static str] {
    match value {
        Value::Str(_) => STR_METHODS,
        Value::List(_) => LIST_METHODS,
        Value::Tuple(_) => TUPLE_METHODS,
        Value::Dict(_) => DICT_METHODS,
        Value::DataFrame(_) => FRAME_METHODS,
        _ => &[],
    }
}

fn no_attribute(value: &Value, attr: &str) -> EvalError {
    EvalError::AttributeError(format!(
        "'{}' object has no attribute '{attr}'",
        value.type_name()
    ))
}

/// `value.attr` outside a call.
pub fn attribute(value: &Value, attr: &str) -> Result<Value> {
    match value {
        Value::Module(module) => pandas_member(attr).map(Value::Builtin).ok_or_else(|| {
            EvalError::AttributeError(format!("module '{module}' has no attribute '{attr}'"))
        }),
        Value::DataFrame(df) => df.with(|df| match attr {
            "columns" => Ok(Value::list(
                df.get_column_names()
                    .into_iter()
                    .map(|name| Value::Str(name.to_string()))
                    .collect(),
            )),
            "shape" => Ok(Value::Tuple(vec![
                Value::Int(df.height() as i64),
                Value::Int(df.width() as i64),
            ])),
            _ if FRAME_METHODS.contains(&attr) => Err(unbound(value, attr)),
            _ if df.get_column_index(attr).is_some() => {
                Ok(Value::list(frame::column_values(df, attr)?))
            }
            _ => Err(no_attribute(value, attr)),
        }),
        Value::Complex(c) => match attr {
            "real" => Ok(Value::Float(c.re)),
            "imag" => Ok(Value::Float(c.im)),
            _ => Err(no_attribute(value, attr)),
        },
        _ if methods_of(value).contains(&attr) => Err(unbound(value, attr)),
        _ => Err(no_attribute(value, attr)),
    }
}

/// Methods exist only as call targets; there is no bound-method value.
fn unbound(value: &Value, attr: &str) -> EvalError {
    EvalError::NotImplementedError(format!(
        "method '{attr}' of '{}' objects can only be called",
        value.type_name()
    ))
}

/// `target.name(args)`. Mutating methods change the shared contents of
/// `target`, so every alias sees the change.
pub fn call(target: &Value, name: &str, args: Args) -> Result<Value> {
    match target {
        Value::Str(s) if STR_METHODS.contains(&name) => str_method(s, name, args),
        Value::List(items) if LIST_METHODS.contains(&name) => {
            list_method(target, items, name, args)
        }
        Value::Tuple(items) if TUPLE_METHODS.contains(&name) => {
            sequence_method(items, name, &args, "tuple")
        }
        Value::Dict(dict) if DICT_METHODS.contains(&name) => {
            dict_method(target, dict, name, args)
        }
        Value::DataFrame(df) if FRAME_METHODS.contains(&name) => {
            frame_method(&df.snapshot(), name, &args).map(Value::frame)
        }
        _ => match attribute(target, name)? {
            Value::Builtin(builtin) => builtin.call(args),
            other => Err(EvalError::TypeError(format!(
                "'{}' object is not callable",
                other.type_name()
            ))),
        },
    }
}

fn str_arg<'a>(value: &'a Value, func: &str) -> Result<&'a str> {
    match value {
        Value::Str(s) => Ok(s),
        other => Err(EvalError::TypeError(format!(
            "{func}() argument must be str, not {}",
            other.type_name()
        ))),
    }
}

/// Optional str argument; an explicit `None` counts as absent.
fn opt_str_arg<'a>(args: &'a Args, index: usize, name: &str, func: &str) -> Result<Option<&'a str>> {
    match args.get(index, name) {
        None | Some(Value::None) => Ok(None),
        Some(value) => str_arg(value, func).map(Some),
    }
}

/// `maxsplit`/`count` style limit: negative means unlimited.
fn limit(args: &Args, index: usize, name: &str) -> Result<Option<usize>> {
    Ok(args
        .int(index, name)?
        .and_then(|n| usize::try_from(n).ok()))
}

fn str_method(s: &str, name: &str, args: Args) -> Result<Value> {
    let text = |value: String| -> Result<Value> { Ok(Value::Str(value)) };
    match name {
        "upper" => {
            args.check(name, 0, &[])?;
            text(s.to_uppercase())
        }
        "lower" => {
            args.check(name, 0, &[])?;
            text(s.to_lowercase())
        }
        "strip" | "lstrip" | "rstrip" => {
            args.check(name, 1, &["chars"])?;
            let chars = opt_str_arg(&args, 0, "chars", name)?;
            let matches = |c: char| match chars {
                Some(set) => set.contains(c),
                None => c.is_whitespace(),
            };
            text(match name {
                "strip" => s.trim_matches(matches),
                "lstrip" => s.trim_start_matches(matches),
                _ => s.trim_end_matches(matches),
            }
            .to_string())
        }
        "split" => {
            args.check(name, 2, &["sep", "maxsplit"])?;
            let sep = opt_str_arg(&args, 0, "sep", name)?;
            let maxsplit = limit(&args, 1, "maxsplit")?;
            let parts: Vec<String> = match sep {
                Some("") => return Err(EvalError::ValueError("empty separator".to_string())),
                Some(sep) => match maxsplit {
                    Some(max) => s.splitn(max + 1, sep).map(str::to_string).collect(),
                    None => s.split(sep).map(str::to_string).collect(),
                },
                None => split_whitespace(s, maxsplit),
            };
            Ok(Value::list(parts.into_iter().map(Value::Str).collect()))
        }
        "join" => {
            args.check(name, 1, &[])?;
            let iterable = args.required(0, "iterable", name)?.clone();
            let mut pieces = Vec::new();
            for (position, item) in iterate(iterable)?.enumerate() {
                match item {
                    Value::Str(piece) => pieces.push(piece),
                    other => {
                        return Err(EvalError::TypeError(format!(
                            "sequence item {position}: expected str instance, {} found",
                            other.type_name()
                        )));
                    }
                }
            }
            text(pieces.join(s))
        }
        "replace" => {
            args.check(name, 3, &["count"])?;
            let old = str_arg(args.required(0, "old", name)?, name)?;
            let new = str_arg(args.required(1, "new", name)?, name)?;
            text(match limit(&args, 2, "count")? {
                Some(count) => s.replacen(old, new, count),
                None => s.replace(old, new),
            })
        }
        "startswith" | "endswith" => {
            args.check(name, 1, &[])?;
            let affixes = match args.required(0, "prefix", name)? {
                Value::Tuple(items) => items
                    .iter()
                    .map(|item| str_arg(item, name))
                    .collect::<Result<Vec<_>>>()?,
                other => vec![str_arg(other, name)?],
            };
            let found = affixes.iter().any(|affix| {
                if name == "startswith" {
                    s.starts_with(affix)
                } else {
                    s.ends_with(affix)
                }
            });
            Ok(Value::Bool(found))
        }
        "find" => {
            args.check(name, 1, &[])?;
            let needle = str_arg(args.required(0, "sub", name)?, name)?;
            let position = s
                .find(needle)
                .map_or(-1, |byte| s[..byte].chars().count() as i64);
            Ok(Value::Int(position))
        }
        "count" => {
            args.check(name, 1, &[])?;
            let needle = str_arg(args.required(0, "sub", name)?, name)?;
            let count = if needle.is_empty() {
                s.chars().count() + 1
            } else {
                s.matches(needle).count()
            };
            Ok(Value::Int(count as i64))
        }
        _ => Err(no_attribute(&Value::Str(String::new()), name)),
    }
}

/// `str.split()` without a separator: runs of whitespace separate, and
/// leading or trailing whitespace yields no empty parts.
fn split_whitespace(s: &str, maxsplit: Option<usize>) -> Vec<String> {
    let mut parts = Vec::new();
    let mut rest = s.trim_start();
    while !rest.is_empty() {
        if maxsplit.is_some_and(|max| parts.len() >= max) {
            parts.push(rest.to_string());
            break;
        }
        match rest.find(char::is_whitespace) {
            Some(end) => {
                parts.push(rest[..end].to_string());
                rest = rest[end..].trim_start();
            }
            None => {
                parts.push(rest.to_string());
                break;
            }
        }
    }
    parts
}

/// Methods shared by lists and tuples.
fn sequence_method(items: &[Value], name: &str, args: &Args, type_name: &str) -> Result<Value> {
    args.check(name, 1, &[])?;
    let needle = args.required(0, "value", name)?;
    match name {
        "index" => items
            .iter()
            .position(|item| item.py_eq(needle))
            .map(|i| Value::Int(i as i64))
            .ok_or_else(|| {
                EvalError::ValueError(format!("{} is not in {type_name}", needle.repr()))
            }),
        _ => Ok(Value::Int(
            items.iter().filter(|item| item.py_eq(needle)).count() as i64,
        )),
    }
}

fn list_method(
    target: &Value,
    items: &Shared<Vec<Value>>,
    name: &str,
    args: Args,
) -> Result<Value> {
    match name {
        "append" => {
            args.check(name, 1, &[])?;
            let item = args.required(0, "object", name)?.clone();
            check_acyclic(target, &item)?;
            items.with_mut(|items| items.push(item));
        }
        "extend" => {
            args.check(name, 1, &[])?;
            let iterable = args.required(0, "iterable", name)?.clone();
            let extra: Vec<Value> = iterate(iterable)?.collect();
            for item in &extra {
                check_acyclic(target, item)?;
            }
            items.with_mut(|items| items.extend(extra));
        }
        "pop" => {
            args.check(name, 1, &[])?;
            let index = args.int(0, "index")?.unwrap_or(-1);
            return items.with_mut(|items| {
                if items.is_empty() {
                    return Err(EvalError::IndexError("pop from empty list".to_string()));
                }
                let len = items.len() as i64;
                let position = if index < 0 { index + len } else { index };
                if !(0..len).contains(&position) {
                    return Err(EvalError::IndexError("pop index out of range".to_string()));
                }
                Ok(items.remove(position as usize))
            });
        }
        "insert" => {
            args.check(name, 2, &[])?;
            let index = index_int(args.required(0, "index", name)?)?;
            let item = args.required(1, "object", name)?.clone();
            check_acyclic(target, &item)?;
            items.with_mut(|items| {
                let len = items.len() as i64;
                let position = if index < 0 {
                    (index + len).max(0)
                } else {
                    index.min(len)
                };
                items.insert(position as usize, item);
            });
        }
        "index" | "count" => return sequence_method(&items.snapshot(), name, &args, "list"),
        "remove" => {
            args.check(name, 1, &[])?;
            let needle = args.required(0, "value", name)?;
            // Compare outside the lock: the needle may be this very list.
            let position = items
                .snapshot()
                .iter()
                .position(|item| item.is_same(needle) || item.py_eq(needle))
                .ok_or_else(|| {
                    EvalError::ValueError("list.remove(x): x not in list".to_string())
                })?;
            items.with_mut(|items| items.remove(position));
        }
        "reverse" => {
            args.check(name, 0, &[])?;
            items.with_mut(|items| items.reverse());
        }
        "sort" => {
            args.check(name, 0, &["reverse"])?;
            let reverse = args.flag(usize::MAX, "reverse", false)?;
            let mut sorted = items.snapshot();
            ops::sort(&mut sorted, reverse)?;
            items.with_mut(|items| *items = sorted);
        }
        "clear" => {
            args.check(name, 0, &[])?;
            items.with_mut(Vec::clear);
        }
        "copy" => {
            args.check(name, 0, &[])?;
            return Ok(Value::list(items.snapshot()));
        }
        _ => return Err(no_attribute(target, name)),
    }
    Ok(Value::None)
}

fn dict_method(target: &Value, dict: &Shared<Dict>, name: &str, args: Args) -> Result<Value> {
    let hashable = |key: &Value| {
        if key.is_hashable() {
            Ok(())
        } else {
            Err(EvalError::TypeError(format!(
                "unhashable type: '{}'",
                key.type_name()
            )))
        }
    };
    match name {
        "keys" => {
            args.check(name, 0, &[])?;
            Ok(Value::list(dict.with(|dict| dict.keys().cloned().collect())))
        }
        "values" => {
            args.check(name, 0, &[])?;
            Ok(Value::list(dict.with(|dict| dict.values().cloned().collect())))
        }
        "items" => {
            args.check(name, 0, &[])?;
            Ok(Value::list(dict.with(|dict| {
                dict.iter()
                    .map(|(key, value)| Value::Tuple(vec![key.clone(), value.clone()]))
                    .collect()
            })))
        }
        "get" => {
            args.check(name, 2, &[])?;
            let key = args.required(0, "key", name)?;
            hashable(key)?;
            Ok(dict
                .with(|dict| dict.get(key).cloned())
                .or_else(|| args.positional.get(1).cloned())
                .unwrap_or(Value::None))
        }
        "update" => {
            args.check(name, 1, &[])?;
            let Args {
                positional,
                keywords,
            } = args;
            let mut entries = Vec::new();
            if let Some(other) = positional.into_iter().next() {
                let other = ops::dict_from(other)?;
                entries.extend(other.iter().map(|(key, value)| (key.clone(), value.clone())));
            }
            entries.extend(keywords.into_iter().map(|(key, value)| (Value::Str(key), value)));
            for (_, value) in &entries {
                check_acyclic(target, value)?;
            }
            dict.with_mut(|dict| {
                entries
                    .into_iter()
                    .try_for_each(|(key, value)| dict.insert(key, value))
            })?;
            Ok(Value::None)
        }
        "pop" => {
            args.check(name, 2, &[])?;
            let key = args.required(0, "key", name)?;
            hashable(key)?;
            match dict.with_mut(|dict| dict.remove(key)) {
                Some(value) => Ok(value),
                None => args
                    .positional
                    .get(1)
                    .cloned()
                    .ok_or_else(|| EvalError::KeyError(key.repr())),
            }
        }
        "copy" => {
            args.check(name, 0, &[])?;
            Ok(Value::dict(dict.snapshot()))
        }
        _ => Err(no_attribute(target, name)),
    }
}

/// DataFrame methods return a new frame; the receiver is left unchanged.
fn frame_method(df: &DataFrame, name: &str, args: &Args) -> Result<DataFrame> {
    match name {
        "head" | "tail" => {
            args.check(name, 1, &["n"])?;
            let n = args.int(0, "n")?.unwrap_or(5);
            head_tail(df, name == "head", n)
        }
        "sort_values" => sort_values(df, args),
        "drop" => drop_columns(df, args),
        "rename" => rename_columns(df, args),
        _ => {
            args.check(name, 0, &[])?;
            Ok(df.clone())
        }
    }
}

/// A negative `n` keeps everything except the last (`head`) or first
/// (`tail`) `|n|` rows.
fn head_tail(df: &DataFrame, head: bool, n: i64) -> Result<DataFrame> {
    if n < 0 {
        let keep = df.height().saturating_sub(usize::try_from(n.unsigned_abs()).unwrap_or(usize::MAX));
        let offset = if head { 0 } else { (df.height() - keep) as i64 };
        return Ok(df.slice(offset, keep));
    }
    let n = IdxSize::try_from(n).unwrap_or(IdxSize::MAX);
    let lf = df.clone().lazy();
    let lf = if head { lf.limit(n) } else { lf.tail(n) };
    Ok(lf.collect()?)
}

/// Column names from a str or a list/tuple of str.
fn column_names(value: &Value, what: &str) -> Result<Vec<String>> {
    match value {
        Value::Str(name) => Ok(vec![name.clone()]),
        Value::List(_) | Value::Tuple(_) => value
            .sequence_items()
            .unwrap_or_default()
            .iter()
            .map(|item| match item {
                Value::Str(name) => Ok(name.clone()),
                other => Err(EvalError::KeyError(other.repr())),
            })
            .collect(),
        other => Err(EvalError::TypeError(format!(
            "{what} must be a column name or a list of column names, not {}",
            other.type_name()
        ))),
    }
}

fn sort_values(df: &DataFrame, args: &Args) -> Result<DataFrame> {
    args.check("sort_values", 2, &["by", "ascending"])?;
    let by = column_names(args.required(0, "by", "sort_values")?, "by")?;
    if let Some(missing) = by.iter().find(|name| df.get_column_index(name).is_none()) {
        return Err(EvalError::KeyError(Value::Str(missing.clone()).repr()));
    }
    let descending = match args.get(1, "ascending") {
        None => vec![false; by.len()],
        Some(Value::List(flags)) => {
            let flags = flags.snapshot();
            if flags.len() != by.len() {
                return Err(EvalError::ValueError(format!(
                    "Length of ascending ({}) != length of by ({})",
                    flags.len(),
                    by.len()
                )));
            }
            flags
                .iter()
                .map(|flag| flag.truthy().map(|ascending| !ascending))
                .collect::<Result<Vec<_>>>()?
        }
        Some(flag) => vec![!flag.truthy()?; by.len()],
    };
    let options = SortMultipleOptions::new()
        .with_order_descending_multi(descending)
        .with_nulls_last(true)
        .with_maintain_order(true);
    Ok(df.clone().lazy().sort(&by, options).collect()?)
}

fn is_column_axis(axis: Option<&Value>) -> bool {
    match axis {
        Some(Value::Int(1)) => true,
        Some(Value::Str(axis)) => axis == "columns",
        _ => false,
    }
}

/// `drop(columns=...)` or `drop(labels, axis=1)`; rows cannot be dropped.
fn drop_columns(df: &DataFrame, args: &Args) -> Result<DataFrame> {
    args.check("drop", 2, &["labels", "axis", "columns"])?;
    let labels = match (args.keyword("columns"), args.get(0, "labels")) {
        (Some(columns), _) => columns,
        (None, Some(labels)) => {
            if !is_column_axis(args.get(1, "axis")) {
                return Err(EvalError::NotImplementedError(
                    "dropping rows by label is not supported; pass axis=1 or columns=".to_string(),
                ));
            }
            labels
        }
        (None, None) => {
            return Err(EvalError::ValueError(
                "Need to specify at least one of 'labels' or 'columns'".to_string(),
            ));
        }
    };
    let names = column_names(labels, "labels")?;
    let missing: Vec<Value> = names
        .iter()
        .filter(|name| df.get_column_index(name).is_none())
        .map(|name| Value::Str(name.clone()))
        .collect();
    if !missing.is_empty() {
        return Err(EvalError::KeyError(format!(
            "{} not found in axis",
            Value::list(missing).repr()
        )));
    }
    let names: Arc<[PlSmallStr]> = names.into_iter().map(PlSmallStr::from).collect();
    let selector = Selector::ByName {
        names,
        strict: true,
    };
    Ok(df.clone().lazy().drop(selector).collect()?)
}

/// `rename(columns={old: new})`; names not in the frame are ignored.
fn rename_columns(df: &DataFrame, args: &Args) -> Result<DataFrame> {
    args.check("rename", 0, &["columns"])?;
    let mapping = match args.keyword("columns") {
        None | Some(Value::None) => return Ok(df.clone()),
        Some(Value::Dict(mapping)) => mapping.snapshot(),
        Some(other) => {
            return Err(EvalError::TypeError(format!(
                "rename() columns must be a dict, not {}",
                other.type_name()
            )));
        }
    };
    let mut old_names = Vec::with_capacity(mapping.len());
    let mut new_names = Vec::with_capacity(mapping.len());
    for (old, new) in mapping.iter() {
        let (Value::Str(old), Value::Str(new)) = (old, new) else {
            return Err(EvalError::TypeError(
                "rename() column names must be str".to_string(),
            ));
        };
        old_names.push(old.clone());
        new_names.push(new.clone());
    }
    Ok(df
        .clone()
        .lazy()
        .rename(old_names, new_names, false)
        .collect()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::df;

    fn s(text: &str) -> Value {
        Value::Str(text.to_string())
    }

    fn call_str(text: &str, name: &str, positional: Vec<Value>) -> String {
        call(&s(text), name, Args::new(positional)).unwrap().repr()
    }

    fn people() -> Value {
        Value::frame(
            df! {
                "name" => &["carol", "alice", "bob"],
                "age" => &[Some(35i64), None, Some(28)],
            }
            .unwrap(),
        )
    }

    fn frame_call(name: &str, args: Args) -> Result<DataFrame> {
        match call(&people(), name, args)? {
            Value::DataFrame(df) => Ok(df.snapshot()),
            other => panic!("expected a DataFrame, got {}", other.type_name()),
        }
    }

    fn column_labels(df: &DataFrame) -> Vec<String> {
        df.get_column_names()
            .into_iter()
            .map(|name| name.to_string())
            .collect()
    }

    fn names(df: &DataFrame) -> Vec<Value> {
        frame::column_values(df, "name").unwrap()
    }

    #[test]
    fn string_methods() {
        assert_eq!(call_str("  Hi  ", "strip", vec![]), "'Hi'");
        assert_eq!(call_str("xxhixx", "lstrip", vec![s("x")]), "'hixx'");
        assert_eq!(call_str("a  b c ", "split", vec![]), "['a', 'b', 'c']");
        assert_eq!(
            call_str("a,b,c", "split", vec![s(","), Value::Int(1)]),
            "['a', 'b,c']"
        );
        assert_eq!(call_str("a b  c", "split", vec![Value::None, Value::Int(1)]), "['a', 'b  c']");
        assert_eq!(
            call_str("-", "join", vec![Value::list(vec![s("a"), s("b")])]),
            "'a-b'"
        );
        assert_eq!(call_str("aaa", "replace", vec![s("a"), s("b"), Value::Int(2)]), "'bba'");
        assert_eq!(
            call_str("report.csv", "endswith", vec![Value::Tuple(vec![s(".csv"), s(".txt")])]),
            "True"
        );
        assert_eq!(call_str("héllo", "find", vec![s("l")]), "2");
        assert_eq!(call_str("abc", "count", vec![s("")]), "4");
    }

    #[test]
    fn join_rejects_non_strings() {
        let err = call(&s(","), "join", Args::new(vec![Value::list(vec![Value::Int(1)])]))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "sequence item 0: expected str instance, int found"
        );
    }

    #[test]
    fn list_methods_mutate_in_place() {
        let list = Value::list(vec![Value::Int(1), Value::Int(2), Value::Int(3)]);
        let alias = list.clone();
        let popped = call(&list, "pop", Args::new(vec![])).unwrap();
        assert_eq!(popped.repr(), "3");
        call(&list, "insert", Args::new(vec![Value::Int(-10), Value::Int(0)])).unwrap();
        assert_eq!(alias.repr(), "[0, 1, 2]");
        let err = call(&list, "index", Args::new(vec![Value::Int(9)])).unwrap_err();
        assert_eq!(err.to_string(), "9 is not in list");
        let empty = Value::list(vec![]);
        let err = call(&empty, "pop", Args::new(vec![])).unwrap_err();
        assert_eq!(err.to_string(), "pop from empty list");
    }

    #[test]
    fn copies_are_independent() {
        let list = Value::list(vec![Value::Int(1)]);
        let copy = call(&list, "copy", Args::new(vec![])).unwrap();
        call(&copy, "append", Args::new(vec![Value::Int(2)])).unwrap();
        assert_eq!(list.repr(), "[1]");
        assert!(!list.is_same(&copy));
    }

    #[test]
    fn appending_a_list_to_itself_is_rejected() {
        let list = Value::list(vec![]);
        let err = call(&list, "append", Args::new(vec![list.clone()])).unwrap_err();
        assert_eq!(err.kind(), "NotImplementedError");
        call(&list, "extend", Args::new(vec![list.clone()])).unwrap();
        assert_eq!(list.repr(), "[]");
    }

    #[test]
    fn dict_methods() {
        let mut dict = Dict::new();
        dict.insert(s("a"), Value::Int(1)).unwrap();
        let value = Value::dict(dict);
        assert_eq!(
            call(&value, "get", Args::new(vec![s("b"), Value::Int(0)])).unwrap().repr(),
            "0"
        );
        assert_eq!(call(&value, "items", Args::new(vec![])).unwrap().repr(), "[('a', 1)]");
        let err = call(&value, "pop", Args::new(vec![s("zz")])).unwrap_err();
        assert_eq!(err.kind(), "KeyError");
        assert_eq!(err.to_string(), "'zz'");
        assert_eq!(call(&value, "pop", Args::new(vec![s("a")])).unwrap().repr(), "1");
        assert_eq!(value.repr(), "{}");
    }

    #[test]
    fn unknown_attribute() {
        let err = attribute(&Value::Int(1), "foo").unwrap_err();
        assert_eq!(err.to_string(), "'int' object has no attribute 'foo'");
        let err = attribute(&Value::Module("pandas"), "Series").unwrap_err();
        assert_eq!(err.to_string(), "module 'pandas' has no attribute 'Series'");
        let err = attribute(&s("x"), "upper").unwrap_err();
        assert_eq!(err.kind(), "NotImplementedError");
    }

    #[test]
    fn frame_attributes() {
        let frame = people();
        assert_eq!(attribute(&frame, "shape").unwrap().repr(), "(3, 2)");
        assert_eq!(attribute(&frame, "columns").unwrap().repr(), "['name', 'age']");
        assert_eq!(attribute(&frame, "age").unwrap().repr(), "[35, None, 28]");
    }

    #[test]
    fn head_and_tail() {
        let head = frame_call("head", Args::new(vec![Value::Int(2)])).unwrap();
        assert_eq!(Value::list(names(&head)).repr(), "['carol', 'alice']");
        let tail = frame_call("tail", Args::new(vec![Value::Int(1)])).unwrap();
        assert_eq!(Value::list(names(&tail)).repr(), "['bob']");
        let trimmed = frame_call("head", Args::new(vec![Value::Int(-1)])).unwrap();
        assert_eq!(trimmed.height(), 2);
    }

    #[test]
    fn sort_values_puts_nulls_last() {
        let sorted = frame_call("sort_values", Args::new(vec![s("age")])).unwrap();
        assert_eq!(Value::list(names(&sorted)).repr(), "['bob', 'carol', 'alice']");
        let args = Args {
            positional: vec![s("name")],
            keywords: vec![("ascending".to_string(), Value::Bool(false))],
        };
        let sorted = frame_call("sort_values", args).unwrap();
        assert_eq!(Value::list(names(&sorted)).repr(), "['carol', 'bob', 'alice']");
        let err = frame_call("sort_values", Args::new(vec![s("height")])).unwrap_err();
        assert_eq!(err.kind(), "KeyError");
    }

    #[test]
    fn drop_and_rename_columns() {
        let args = Args {
            positional: vec![],
            keywords: vec![("columns".to_string(), s("age"))],
        };
        let dropped = frame_call("drop", args).unwrap();
        assert_eq!(column_labels(&dropped), vec!["name"]);

        let args = Args {
            positional: vec![s("zzz")],
            keywords: vec![("axis".to_string(), Value::Int(1))],
        };
        let err = frame_call("drop", args).unwrap_err();
        assert_eq!(err.to_string(), "['zzz'] not found in axis");

        let mut mapping = Dict::new();
        mapping.insert(s("age"), s("years")).unwrap();
        mapping.insert(s("missing"), s("ignored")).unwrap();
        let args = Args {
            positional: vec![],
            keywords: vec![("columns".to_string(), Value::dict(mapping))],
        };
        let renamed = frame_call("rename", args).unwrap();
        assert_eq!(column_labels(&renamed), vec!["name", "years"]);
    }

    #[test]
    fn pandas_functions_are_callable_through_the_module() {
        let module = Value::Module("pandas");
        let frame = call(&module, "DataFrame", Args::new(vec![])).unwrap();
        assert_eq!(frame.type_name(), "DataFrame");
    }
}
