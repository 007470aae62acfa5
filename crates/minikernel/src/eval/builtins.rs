//! Built-in functions and the `pd` namespace

use std::num::IntErrorKind;
use std::path::Path;

use polars::prelude::DataFrame;

use super::ops::{self, index_int, iterate};
use super::{Args, EvalError, Result};
use crate::ast::{CmpOp, Operator};
use crate::frame;
use crate::value::{Dict, Range, Value};

/// Name the `pd` module is bound to.
pub const PANDAS: &str = "pandas";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    Len,
    Range,
    Print,
    Str,
    Int,
    Float,
    Bool,
    List,
    Tuple,
    Dict,
    Abs,
    Min,
    Max,
    Sum,
    Round,
    Sorted,
    PdDataFrame,
    PdReadCsv,
    PdReadParquet,
}

const GLOBALS: [Builtin; 16] = [
    Builtin::Len,
    Builtin::Range,
    Builtin::Print,
    Builtin::Str,
    Builtin::Int,
    Builtin::Float,
    Builtin::Bool,
    Builtin::List,
    Builtin::Tuple,
    Builtin::Dict,
    Builtin::Abs,
    Builtin::Min,
    Builtin::Max,
    Builtin::Sum,
    Builtin::Round,
    Builtin::Sorted,
];

const PANDAS_MEMBERS: [Builtin; 3] = [
    Builtin::PdDataFrame,
    Builtin::PdReadCsv,
    Builtin::PdReadParquet,
];

/// Value of a global name that is not in the workspace.
pub fn global(name: &str) -> Option<Value> {
    if name == "pd" {
        return Some(Value::Module(PANDAS));
    }
    GLOBALS
        .into_iter()
        .find(|builtin| builtin.name() == name)
        .map(Value::Builtin)
}

/// `pd.<name>`
pub fn pandas_member(name: &str) -> Option<Builtin> {
    PANDAS_MEMBERS
        .into_iter()
        .find(|builtin| builtin.name() == name)
}

impl Builtin {
    pub fn name(self) -> &'static str {
        match self {
            Builtin::Len => "len",
            Builtin::Range => "range",
            Builtin::Print => "print",
            Builtin::Str => "str",
            Builtin::Int => "int",
            Builtin::Float => "float",
            Builtin::Bool => "bool",
            Builtin::List => "list",
            Builtin::Tuple => "tuple",
            Builtin::Dict => "dict",
            Builtin::Abs => "abs",
            Builtin::Min => "min",
            Builtin::Max => "max",
            Builtin::Sum => "sum",
            Builtin::Round => "round",
            Builtin::Sorted => "sorted",
            Builtin::PdDataFrame => "DataFrame",
            Builtin::PdReadCsv => "read_csv",
            Builtin::PdReadParquet => "read_parquet",
        }
    }

    /// Runtime type name: classes are `type`, pandas readers are plain
    /// functions.
    pub fn type_name(self) -> &'static str {
        match self {
            Builtin::Range
            | Builtin::Str
            | Builtin::Int
            | Builtin::Float
            | Builtin::Bool
            | Builtin::List
            | Builtin::Tuple
            | Builtin::Dict
            | Builtin::PdDataFrame => "type",
            Builtin::PdReadCsv | Builtin::PdReadParquet => "function",
            _ => "builtin_function_or_method",
        }
    }

    pub fn repr(self) -> String {
        match (self, self.type_name()) {
            (Builtin::PdDataFrame, _) => "<class 'pandas.core.frame.DataFrame'>".to_string(),
            (_, "type") => format!("<class '{}'>", self.name()),
            (_, "function") => format!("<function {}>", self.name()),
            _ => format!("<built-in function {}>", self.name()),
        }
    }

    pub fn call(self, args: Args) -> Result<Value> {
        let name = self.name();
        match self {
            Builtin::Len => {
                args.check(name, 1, &[])?;
                len(args.required(0, "obj", name)?)
            }
            Builtin::Range => range(&args),
            Builtin::Print => print(&args),
            Builtin::Str => {
                args.check(name, 1, &[])?;
                Ok(Value::Str(
                    args.positional.first().map_or_else(String::new, Value::to_str),
                ))
            }
            Builtin::Int => int(&args),
            Builtin::Float => {
                args.check(name, 1, &[])?;
                match args.positional.first() {
                    None => Ok(Value::Float(0.0)),
                    Some(value) => float(value),
                }
            }
            Builtin::Bool => {
                args.check(name, 1, &[])?;
                match args.positional.first() {
                    None => Ok(Value::Bool(false)),
                    Some(value) => Ok(Value::Bool(value.truthy()?)),
                }
            }
            Builtin::List | Builtin::Tuple => {
                args.check(name, 1, &[])?;
                let items: Vec<Value> = match args.positional.into_iter().next() {
                    None => Vec::new(),
                    Some(value) => iterate(value)?.collect(),
                };
                Ok(match self {
                    Builtin::List => Value::list(items),
                    _ => Value::Tuple(items),
                })
            }
            Builtin::Dict => {
                if args.positional.len() > 1 {
                    return Err(EvalError::TypeError(format!(
                        "dict expected at most 1 argument, got {}",
                        args.positional.len()
                    )));
                }
                let Args {
                    positional,
                    keywords,
                } = args;
                let mut dict = match positional.into_iter().next() {
                    None => Dict::new(),
                    Some(value) => ops::dict_from(value)?,
                };
                for (key, value) in keywords {
                    dict.insert(Value::Str(key), value)?;
                }
                Ok(Value::dict(dict))
            }
            Builtin::Abs => {
                args.check(name, 1, &[])?;
                abs(args.required(0, "x", name)?)
            }
            Builtin::Min => extreme(args, name, CmpOp::Lt),
            Builtin::Max => extreme(args, name, CmpOp::Gt),
            Builtin::Sum => sum(&args),
            Builtin::Round => round(&args),
            Builtin::Sorted => {
                args.check(name, 1, &["reverse"])?;
                let reverse = args.flag(usize::MAX, "reverse", false)?;
                let iterable = args.required(0, "iterable", name)?.clone();
                let mut items: Vec<Value> = iterate(iterable)?.collect();
                ops::sort(&mut items, reverse)?;
                Ok(Value::list(items))
            }
            Builtin::PdDataFrame => data_frame(&args),
            Builtin::PdReadCsv => {
                args.check(name, 1, &[])?;
                let path = path_arg(args.required(0, "filepath_or_buffer", name)?, name)?;
                log::debug!("read_csv {}", path.display());
                Ok(Value::frame(frame::read_csv(path)?))
            }
            Builtin::PdReadParquet => {
                args.check(name, 1, &[])?;
                let path = path_arg(args.required(0, "path", name)?, name)?;
                log::debug!("read_parquet {}", path.display());
                Ok(Value::frame(frame::read_parquet(path)?))
            }
        }
    }
}

fn len(value: &Value) -> Result<Value> {
    let len = match value {
        Value::Str(s) => s.chars().count(),
        Value::Bytes(b) => b.len(),
        Value::List(items) => items.with(Vec::len),
        Value::Tuple(items) => items.len(),
        Value::Dict(dict) => dict.with(Dict::len),
        Value::Range(range) => range.len(),
        Value::DataFrame(df) => df.with(DataFrame::height),
        other => {
            return Err(EvalError::TypeError(format!(
                "object of type '{}' has no len()",
                other.type_name()
            )));
        }
    };
    Ok(Value::Int(len as i64))
}

fn range(args: &Args) -> Result<Value> {
    args.check("range", 3, &[])?;
    let bounds = args
        .positional
        .iter()
        .map(index_int)
        .collect::<Result<Vec<_>>>()?;
    let (start, stop, step) = match bounds.as_slice() {
        [] => {
            return Err(EvalError::TypeError(
                "range expected at least 1 argument, got 0".to_string(),
            ));
        }
        [stop] => (0, *stop, 1),
        [start, stop] => (*start, *stop, 1),
        [start, stop, step, ..] => (*start, *stop, *step),
    };
    if step == 0 {
        return Err(EvalError::ValueError(
            "range() arg 3 must not be zero".to_string(),
        ));
    }
    Ok(Value::Range(Range { start, stop, step }))
}

/// Output goes to the log; the service has no terminal.
fn print(args: &Args) -> Result<Value> {
    args.check("print", usize::MAX, &["sep", "end"])?;
    let sep = match args.keyword("sep") {
        None | Some(Value::None) => " ".to_string(),
        Some(Value::Str(sep)) => sep.clone(),
        Some(other) => {
            return Err(EvalError::TypeError(format!(
                "sep must be None or a string, not {}",
                other.type_name()
            )));
        }
    };
    let line = args
        .positional
        .iter()
        .map(Value::to_str)
        .collect::<Vec<_>>()
        .join(&sep);
    log::info!("print: {line}");
    Ok(Value::None)
}

fn int(args: &Args) -> Result<Value> {
    args.check("int", 2, &["base"])?;
    let Some(value) = args.positional.first() else {
        return Ok(Value::Int(0));
    };
    let base = args.int(1, "base")?;
    if let Some(base) = base {
        let Value::Str(text) = value else {
            return Err(EvalError::TypeError(
                "int() can't convert non-string with explicit base".to_string(),
            ));
        };
        return parse_int(text, base);
    }
    match value {
        Value::Int(_) | Value::Bool(_) => Ok(Value::Int(index_int(value)?)),
        Value::Float(f) => float_to_int(*f),
        Value::Str(text) => parse_int(text, 10),
        other => Err(EvalError::TypeError(format!(
            "int() argument must be a string, a bytes-like object or a real number, not '{}'",
            other.type_name()
        ))),
    }
}

fn float_to_int(value: f64) -> Result<Value> {
    if value.is_nan() {
        return Err(EvalError::ValueError(
            "cannot convert float NaN to integer".to_string(),
        ));
    }
    if value.is_infinite() {
        return Err(EvalError::OverflowError(
            "cannot convert float infinity to integer".to_string(),
        ));
    }
    let truncated = value.trunc();
    if truncated < -9.223_372_036_854_776e18 || truncated >= 9.223_372_036_854_776e18 {
        return Err(EvalError::OverflowError(
            "int too large to fit in 64 bits".to_string(),
        ));
    }
    Ok(Value::Int(truncated as i64))
}

/// `int(text, base)`: surrounding whitespace, a sign, a radix prefix matching
/// `base` and single underscores between digits are accepted.
fn parse_int(text: &str, base: i64) -> Result<Value> {
    let invalid = || {
        EvalError::ValueError(format!(
            "invalid literal for int() with base {base}: {}",
            Value::Str(text.to_string()).repr()
        ))
    };
    if base != 0 && !(2..=36).contains(&base) {
        return Err(EvalError::ValueError(
            "int() base must be >= 2 and <= 36, or 0".to_string(),
        ));
    }
    let trimmed = text.trim();
    let (negative, unsigned) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };
    let lower = unsigned.to_ascii_lowercase();
    let prefixed = |prefix: &str, radix: i64| {
        lower
            .strip_prefix(prefix)
            .filter(|_| base == radix || base == 0)
            .map(|rest| (rest.trim_start_matches('_').to_string(), radix))
    };
    let (digits, radix) = prefixed("0x", 16)
        .or_else(|| prefixed("0o", 8))
        .or_else(|| prefixed("0b", 2))
        .unwrap_or((lower.clone(), if base == 0 { 10 } else { base }));
    if digits.is_empty()
        || digits.starts_with('_')
        || digits.ends_with('_')
        || digits.contains("__")
        || digits.starts_with(['+', '-'])
    {
        return Err(invalid());
    }
    let digits = digits.replace('_', "");
    let signed = if negative { format!("-{digits}") } else { digits };
    match i64::from_str_radix(&signed, radix as u32) {
        Ok(n) => Ok(Value::Int(n)),
        Err(err) => match err.kind() {
            IntErrorKind::PosOverflow | IntErrorKind::NegOverflow => Err(EvalError::OverflowError(
                "int too large to fit in 64 bits".to_string(),
            )),
            _ => Err(invalid()),
        },
    }
}

fn float(value: &Value) -> Result<Value> {
    match value {
        Value::Str(text) => {
            let trimmed = text.trim();
            let valid_underscores = !trimmed.starts_with('_')
                && !trimmed.ends_with('_')
                && !trimmed.contains("__");
            trimmed
                .replace('_', "")
                .parse::<f64>()
                .ok()
                .filter(|_| valid_underscores && !trimmed.is_empty())
                .map(Value::Float)
                .ok_or_else(|| {
                    EvalError::ValueError(format!(
                        "could not convert string to float: {}",
                        value.repr()
                    ))
                })
        }
        other => other.as_float().map(Value::Float).ok_or_else(|| {
            EvalError::TypeError(format!(
                "float() argument must be a string or a real number, not '{}'",
                other.type_name()
            ))
        }),
    }
}

fn abs(value: &Value) -> Result<Value> {
    match value {
        Value::Int(_) | Value::Bool(_) => index_int(value)?
            .checked_abs()
            .map(Value::Int)
            .ok_or_else(|| EvalError::OverflowError("int too large to fit in 64 bits".to_string())),
        Value::Float(f) => Ok(Value::Float(f.abs())),
        Value::Complex(c) => Ok(Value::Float(c.abs())),
        other => Err(EvalError::TypeError(format!(
            "bad operand type for abs(): '{}'",
            other.type_name()
        ))),
    }
}

/// `min` and `max`: one iterable or several arguments; the first extreme
/// item wins ties.
fn extreme(args: Args, name: &str, better: CmpOp) -> Result<Value> {
    args.check(name, usize::MAX, &["default"])?;
    let default = args.keyword("default").cloned();
    let Args { positional, .. } = args;
    let items: Vec<Value> = match positional.len() {
        0 => {
            return Err(EvalError::TypeError(format!(
                "{name} expected at least 1 argument, got 0"
            )));
        }
        1 => {
            let iterable = positional.into_iter().next().unwrap_or(Value::None);
            iterate(iterable)?.collect()
        }
        _ => {
            if default.is_some() {
                return Err(EvalError::TypeError(format!(
                    "Cannot specify a default for {name}() with multiple positional arguments"
                )));
            }
            positional
        }
    };
    let mut items = items.into_iter();
    let Some(mut best) = items.next() else {
        return default.ok_or_else(|| {
            EvalError::ValueError(format!("{name}() iterable argument is empty"))
        });
    };
    for item in items {
        if ops::compare(better, &item, &best)? {
            best = item;
        }
    }
    Ok(best)
}

fn sum(args: &Args) -> Result<Value> {
    args.check("sum", 2, &["start"])?;
    let start = args.get(1, "start").cloned().unwrap_or(Value::Int(0));
    if matches!(start, Value::Str(_)) {
        return Err(EvalError::TypeError(
            "sum() can't sum strings [use ''.join(seq) instead]".to_string(),
        ));
    }
    let iterable = args.required(0, "iterable", "sum")?.clone();
    iterate(iterable)?.try_fold(start, |total, item| ops::binary(Operator::Add, total, item))
}

/// `round(number, ndigits=None)` with ties to even.
fn round(args: &Args) -> Result<Value> {
    args.check("round", 2, &["ndigits"])?;
    let number = args.required(0, "number", "round")?;
    let ndigits = args.int(1, "ndigits")?;
    match (number, ndigits) {
        (Value::Int(_) | Value::Bool(_), None) => Ok(Value::Int(index_int(number)?)),
        (Value::Int(_) | Value::Bool(_), Some(digits)) => {
            round_int(index_int(number)?, digits).map(Value::Int)
        }
        (Value::Float(f), None) => float_to_int(f.round_ties_even()),
        (Value::Float(f), Some(digits)) => Ok(Value::Float(round_float(*f, digits))),
        (other, _) => Err(EvalError::TypeError(format!(
            "type {} doesn't define __round__ method",
            other.type_name()
        ))),
    }
}

fn round_int(n: i64, digits: i64) -> Result<i64> {
    if digits >= 0 {
        return Ok(n);
    }
    let Some(unit) = u32::try_from(-digits).ok().and_then(|exp| 10i64.checked_pow(exp)) else {
        return Ok(0);
    };
    let quotient = n.div_euclid(unit);
    let remainder = n.rem_euclid(unit);
    let quotient = match (remainder * 2).cmp(&unit) {
        std::cmp::Ordering::Greater => quotient + 1,
        std::cmp::Ordering::Equal if quotient % 2 != 0 => quotient + 1,
        _ => quotient,
    };
    quotient
        .checked_mul(unit)
        .ok_or_else(|| EvalError::OverflowError("int too large to fit in 64 bits".to_string()))
}

fn round_float(value: f64, digits: i64) -> f64 {
    if !value.is_finite() || digits > 325 {
        return value;
    }
    if digits >= 0 {
        // Formatting rounds the exact binary value half to even
        return format!("{value:.*}", digits as usize)
            .parse()
            .unwrap_or(value);
    }
    let unit = 10f64.powi((-digits).min(400) as i32);
    if unit.is_infinite() {
        return 0.0 * value.signum();
    }
    (value / unit).round_ties_even() * unit
}

/// `pd.DataFrame(data)` from a dict of columns or a list of row dicts.
fn data_frame(args: &Args) -> Result<Value> {
    args.check("DataFrame", 1, &["data"])?;
    let df = match args.get(0, "data") {
        None | Some(Value::None) => DataFrame::empty(),
        Some(Value::Dict(columns)) => frame::from_dict(&columns.snapshot())?,
        Some(Value::List(rows)) => frame::from_dict(&columns_from_rows(&rows.snapshot())?)?,
        Some(Value::DataFrame(df)) => df.snapshot(),
        Some(other) => {
            return Err(EvalError::ValueError(format!(
                "DataFrame constructor not properly called with {}",
                other.type_name()
            )));
        }
    };
    Ok(Value::frame(df))
}

/// Records to columns; keys missing from a row become None.
fn columns_from_rows(rows: &[Value]) -> Result<Dict> {
    let rows = rows
        .iter()
        .map(|row| match row {
            Value::Dict(row) => Ok(row.snapshot()),
            other => Err(EvalError::TypeError(format!(
                "DataFrame rows must be dicts, not {}",
                other.type_name()
            ))),
        })
        .collect::<Result<Vec<Dict>>>()?;
    let mut names: Vec<Value> = Vec::new();
    for row in &rows {
        for key in row.keys() {
            if !names.iter().any(|name| name.py_eq(key)) {
                names.push(key.clone());
            }
        }
    }
    let mut columns = Dict::new();
    for name in names {
        let values = rows
            .iter()
            .map(|row| row.get(&name).cloned().unwrap_or(Value::None))
            .collect();
        columns.insert(name, Value::list(values))?;
    }
    Ok(columns)
}

fn path_arg<'a>(value: &'a Value, func: &str) -> Result<&'a Path> {
    match value {
        Value::Str(path) => Ok(Path::new(path)),
        other => Err(EvalError::TypeError(format!(
            "{func}() expects a path string, not {}",
            other.type_name()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(builtin: Builtin, positional: Vec<Value>) -> Result<Value> {
        builtin.call(Args::new(positional))
    }

    fn s(text: &str) -> Value {
        Value::Str(text.to_string())
    }

    #[test]
    fn globals_resolve() {
        assert!(matches!(global("len"), Some(Value::Builtin(Builtin::Len))));
        assert!(matches!(global("pd"), Some(Value::Module(PANDAS))));
        assert!(global("DataFrame").is_none());
        assert_eq!(pandas_member("read_csv"), Some(Builtin::PdReadCsv));
    }

    #[test]
    fn type_names_and_reprs() {
        assert_eq!(Builtin::Len.type_name(), "builtin_function_or_method");
        assert_eq!(Builtin::Int.repr(), "<class 'int'>");
        assert_eq!(Builtin::Print.repr(), "<built-in function print>");
        assert_eq!(Builtin::PdDataFrame.type_name(), "type");
    }

    #[test]
    fn len_counts_characters() {
        assert_eq!(call(Builtin::Len, vec![s("héllo")]).unwrap().repr(), "5");
        let err = call(Builtin::Len, vec![Value::Int(3)]).unwrap_err();
        assert_eq!(err.to_string(), "object of type 'int' has no len()");
    }

    #[test]
    fn int_conversions() {
        assert_eq!(call(Builtin::Int, vec![s(" -1_000 ")]).unwrap().repr(), "-1000");
        assert_eq!(call(Builtin::Int, vec![Value::Float(-2.7)]).unwrap().repr(), "-2");
        assert_eq!(
            call(Builtin::Int, vec![s("0x1f"), Value::Int(16)]).unwrap().repr(),
            "31"
        );
        assert_eq!(call(Builtin::Int, vec![s("ff"), Value::Int(16)]).unwrap().repr(), "255");
        let err = call(Builtin::Int, vec![s("1.5")]).unwrap_err();
        assert_eq!(err.to_string(), "invalid literal for int() with base 10: '1.5'");
        let err = call(Builtin::Int, vec![Value::Float(f64::NAN)]).unwrap_err();
        assert_eq!(err.kind(), "ValueError");
    }

    #[test]
    fn float_conversions() {
        assert_eq!(call(Builtin::Float, vec![s(" 1e3 ")]).unwrap().repr(), "1000.0");
        assert_eq!(call(Builtin::Float, vec![s("-inf")]).unwrap().repr(), "-inf");
        let err = call(Builtin::Float, vec![s("abc")]).unwrap_err();
        assert_eq!(err.to_string(), "could not convert string to float: 'abc'");
    }

    #[test]
    fn range_arguments() {
        assert_eq!(
            call(Builtin::Range, vec![Value::Int(1), Value::Int(4)]).unwrap().repr(),
            "range(1, 4)"
        );
        let err = call(Builtin::Range, vec![Value::Int(0), Value::Int(4), Value::Int(0)])
            .unwrap_err();
        assert_eq!(err.kind(), "ValueError");
        let err = call(Builtin::Range, vec![Value::Float(1.0)]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "'float' object cannot be interpreted as an integer"
        );
    }

    #[test]
    fn min_max_and_sum() {
        let xs = Value::list(vec![Value::Int(3), Value::Int(1), Value::Int(2)]);
        assert_eq!(call(Builtin::Min, vec![xs.clone()]).unwrap().repr(), "1");
        assert_eq!(
            call(Builtin::Max, vec![Value::Int(3), Value::Float(7.5)]).unwrap().repr(),
            "7.5"
        );
        assert_eq!(call(Builtin::Sum, vec![xs]).unwrap().repr(), "6");
        let err = call(Builtin::Max, vec![Value::list(vec![])]).unwrap_err();
        assert_eq!(err.to_string(), "max() iterable argument is empty");
    }

    #[test]
    fn round_half_to_even() {
        assert_eq!(call(Builtin::Round, vec![Value::Float(2.5)]).unwrap().repr(), "2");
        assert_eq!(call(Builtin::Round, vec![Value::Float(3.5)]).unwrap().repr(), "4");
        assert_eq!(
            call(Builtin::Round, vec![Value::Float(2.675), Value::Int(2)]).unwrap().repr(),
            "2.67"
        );
        assert_eq!(
            call(Builtin::Round, vec![Value::Int(1250), Value::Int(-2)]).unwrap().repr(),
            "1200"
        );
    }

    #[test]
    fn sorted_with_reverse() {
        let args = Args {
            positional: vec![Value::list(vec![Value::Int(1), Value::Int(3), Value::Int(2)])],
            keywords: vec![("reverse".to_string(), Value::Bool(true))],
        };
        assert_eq!(Builtin::Sorted.call(args).unwrap().repr(), "[3, 2, 1]");
    }

    #[test]
    fn unknown_keyword_is_rejected() {
        let args = Args {
            positional: vec![Value::list(vec![])],
            keywords: vec![("key".to_string(), Value::None)],
        };
        let err = Builtin::Sorted.call(args).unwrap_err();
        assert_eq!(err.to_string(), "sorted() got an unexpected keyword argument 'key'");
    }

    #[test]
    fn dict_from_keywords() {
        let args = Args {
            positional: vec![],
            keywords: vec![("a".to_string(), Value::Int(1))],
        };
        assert_eq!(Builtin::Dict.call(args).unwrap().repr(), "{'a': 1}");
    }

    #[test]
    fn data_frame_from_records() {
        let mut first = Dict::new();
        first.insert(s("a"), Value::Int(1)).unwrap();
        let mut second = Dict::new();
        second.insert(s("b"), s("x")).unwrap();
        let rows = Value::list(vec![Value::dict(first), Value::dict(second)]);
        let Value::DataFrame(df) = call(Builtin::PdDataFrame, vec![rows]).unwrap() else {
            panic!("expected a DataFrame");
        };
        assert_eq!(df.snapshot().shape(), (2, 2));
    }
}
