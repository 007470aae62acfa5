//! Tree-walking interpreter for the kernel's Python subset
//!
//! Statements run against a borrowed name table. Effects are applied as each
//! statement runs, so a fault part-way through a program keeps the effects
//! of the statements before it.

pub mod builtins;
mod methods;
mod ops;

use indexmap::IndexMap;
use polars::prelude::PolarsError;
use thiserror::Error;

pub use builtins::Builtin;
pub use ops::iterate;

use crate::ast::{
    Alias, BoolOp, Comprehension, Expr, ExprKind, Keyword, Operator, Stmt, StmtKind, UnaryOp,
};
use crate::value::{Dict, Value};
use ops::ValueIter;

/// Runtime fault. Messages follow Python's wording so clients see what the
/// interactive interpreter would have printed.
#[derive(Error, Debug)]
pub enum EvalError {
    #[error("{0}")]
    NameError(String),

    #[error("{0}")]
    TypeError(String),

    #[error("{0}")]
    ValueError(String),

    #[error("{0}")]
    ZeroDivisionError(String),

    #[error("{0}")]
    IndexError(String),

    #[error("{0}")]
    KeyError(String),

    #[error("{0}")]
    AttributeError(String),

    #[error("{0}")]
    OverflowError(String),

    #[error("{0}")]
    NotImplementedError(String),

    #[error("{0}")]
    MemoryError(String),

    #[error("{0}")]
    AssertionError(String),

    #[error("{0}")]
    ImportError(String),

    #[error("{0}")]
    ModuleNotFoundError(String),

    #[error("{0}")]
    Polars(#[from] PolarsError),
}

impl EvalError {
    /// Exception class name.
    pub fn kind(&self) -> &'static str {
        match self {
            EvalError::NameError(_) => "NameError",
            EvalError::TypeError(_) => "TypeError",
            EvalError::ValueError(_) => "ValueError",
            EvalError::ZeroDivisionError(_) => "ZeroDivisionError",
            EvalError::IndexError(_) => "IndexError",
            EvalError::KeyError(_) => "KeyError",
            EvalError::AttributeError(_) => "AttributeError",
            EvalError::OverflowError(_) => "OverflowError",
            EvalError::NotImplementedError(_) => "NotImplementedError",
            EvalError::MemoryError(_) => "MemoryError",
            EvalError::AssertionError(_) => "AssertionError",
            EvalError::ImportError(_) => "ImportError",
            EvalError::ModuleNotFoundError(_) => "ModuleNotFoundError",
            EvalError::Polars(_) => "DataFrameError",
        }
    }
}

type Result<T> = std::result::Result<T, EvalError>;

/// Evaluated call arguments.
#[derive(Debug, Default)]
pub struct Args {
    pub positional: Vec<Value>,
    pub keywords: Vec<(String, Value)>,
}

impl Args {
    pub fn new(positional: Vec<Value>) -> Self {
        Args {
            positional,
            keywords: Vec::new(),
        }
    }

    /// Reject surplus positionals and keywords `func` does not take.
    pub(crate) fn check(&self, func: &str, max_positional: usize, keywords: &[&str]) -> Result<()> {
        if self.positional.len() > max_positional {
            return Err(EvalError::TypeError(format!(
                "{func}() takes at most {max_positional} positional argument{} ({} given)",
                if max_positional == 1 { "" } else { "s" },
                self.positional.len()
            )));
        }
        if let Some((name, _)) = self
            .keywords
            .iter()
            .find(|(name, _)| !keywords.contains(&name.as_str()))
        {
            return Err(EvalError::TypeError(format!(
                "{func}() got an unexpected keyword argument '{name}'"
            )));
        }
        Ok(())
    }

    pub(crate) fn keyword(&self, name: &str) -> Option<&Value> {
        self.keywords
            .iter()
            .find(|(arg, _)| arg == name)
            .map(|(_, value)| value)
    }

    /// Positional `index`, falling back to keyword `name`.
    pub(crate) fn get(&self, index: usize, name: &str) -> Option<&Value> {
        self.positional.get(index).or_else(|| self.keyword(name))
    }

    pub(crate) fn required(&self, index: usize, name: &str, func: &str) -> Result<&Value> {
        self.get(index, name).ok_or_else(|| {
            EvalError::TypeError(format!(
                "{func}() missing required argument: '{name}'"
            ))
        })
    }

    /// Optional integer; an explicit `None` counts as absent.
    pub(crate) fn int(&self, index: usize, name: &str) -> Result<Option<i64>> {
        match self.get(index, name) {
            None | Some(Value::None) => Ok(None),
            Some(value) => ops::index_int(value).map(Some),
        }
    }

    pub(crate) fn flag(&self, index: usize, name: &str, default: bool) -> Result<bool> {
        match self.get(index, name) {
            None => Ok(default),
            Some(value) => value.truthy(),
        }
    }
}

enum Flow {
    Normal,
    Break,
    Continue,
}

/// What a comprehension produces per iteration.
enum Element<'e> {
    Item(&'e Expr),
    Pair(&'e Expr, &'e Expr),
}

fn unsupported(what: &str) -> EvalError {
    EvalError::NotImplementedError(format!("{what} not supported"))
}

/// Executes statements against a name table it borrows for its lifetime.
///
/// Comprehensions push a scope of their own, so their loop variables never
/// reach the name table.
pub struct Interpreter<'w> {
    names: &'w mut IndexMap<String, Value>,
    scopes: Vec<IndexMap<String, Value>>,
}

impl<'w> Interpreter<'w> {
    pub fn new(names: &'w mut IndexMap<String, Value>) -> Self {
        Interpreter {
            names,
            scopes: Vec::new(),
        }
    }

    pub fn run(&mut self, body: &[Stmt]) -> Result<()> {
        self.block(body).map(|_| ())
    }

    fn block(&mut self, body: &[Stmt]) -> Result<Flow> {
        for stmt in body {
            match self.exec(stmt)? {
                Flow::Normal => {}
                flow => return Ok(flow),
            }
        }
        Ok(Flow::Normal)
    }

    fn exec(&mut self, stmt: &Stmt) -> Result<Flow> {
        match &stmt.kind {
            StmtKind::Expr { value } => {
                self.eval(value)?;
            }
            StmtKind::Assign { targets, value } => {
                let value = self.eval(value)?;
                for target in targets {
                    self.assign(target, value.clone())?;
                }
            }
            StmtKind::AugAssign { target, op, value } => match &target.kind {
                ExprKind::Name { id, .. } => {
                    let current = self.lookup(id)?;
                    let operand = self.eval(value)?;
                    let result = augmented(*op, current, operand)?;
                    self.bind(id, result);
                }
                ExprKind::Subscript {
                    value: container,
                    slice,
                    ..
                } if !matches!(slice.kind, ExprKind::Slice { .. }) => {
                    let container = self.eval(container)?;
                    let key = self.eval(slice)?;
                    let current = ops::index(&container, &key)?;
                    let operand = self.eval(value)?;
                    let result = augmented(*op, current, operand)?;
                    ops::set_item(&container, key, result)?;
                }
                _ => {
                    let current = self.eval(target)?;
                    let operand = self.eval(value)?;
                    let result = augmented(*op, current, operand)?;
                    self.assign(target, result)?;
                }
            },
            StmtKind::AnnAssign { target, value, .. } => {
                if let Some(value) = value {
                    let value = self.eval(value)?;
                    self.assign(target, value)?;
                }
            }
            StmtKind::Delete { targets } => {
                for target in targets {
                    self.delete(target)?;
                }
            }
            StmtKind::If { test, body, orelse } => {
                let branch = if self.eval(test)?.truthy()? {
                    body
                } else {
                    orelse
                };
                return self.block(branch);
            }
            StmtKind::While { test, body, orelse } => {
                while self.eval(test)?.truthy()? {
                    if let Flow::Break = self.block(body)? {
                        return Ok(Flow::Normal);
                    }
                }
                return self.block(orelse);
            }
            StmtKind::For { is_async: true, .. } => return Err(unsupported("'async for' is")),
            StmtKind::For {
                target,
                iter,
                body,
                orelse,
                ..
            } => {
                let items = iterate(self.eval(iter)?)?;
                for item in items {
                    self.assign(target, item)?;
                    if let Flow::Break = self.block(body)? {
                        return Ok(Flow::Normal);
                    }
                }
                return self.block(orelse);
            }
            StmtKind::Assert { test, msg } => {
                if !self.eval(test)?.truthy()? {
                    let message = match msg {
                        Some(msg) => self.eval(msg)?.to_str(),
                        None => String::new(),
                    };
                    return Err(EvalError::AssertionError(message));
                }
            }
            StmtKind::Import { names } => {
                for alias in names {
                    self.import(alias)?;
                }
            }
            StmtKind::ImportFrom {
                module,
                names,
                level,
            } => self.import_from(module.as_deref(), names, *level)?,
            // Module level is already the global scope.
            StmtKind::Global { .. } => {}
            StmtKind::Pass => {}
            StmtKind::Break => return Ok(Flow::Break),
            StmtKind::Continue => return Ok(Flow::Continue),
            StmtKind::FunctionDef { .. } => return Err(unsupported("function definitions are")),
            StmtKind::ClassDef { .. } => return Err(unsupported("class definitions are")),
            StmtKind::Return { .. } => return Err(unsupported("'return' is")),
            StmtKind::With { .. } => return Err(unsupported("'with' statements are")),
            StmtKind::Raise { .. } => return Err(unsupported("'raise' is")),
            StmtKind::Try { .. } => return Err(unsupported("'try' statements are")),
            StmtKind::Nonlocal { .. } => return Err(unsupported("'nonlocal' is")),
        }
        Ok(Flow::Normal)
    }

    /// Evaluate an expression to a value.
    pub fn eval(&mut self, expr: &Expr) -> Result<Value> {
        match &expr.kind {
            ExprKind::Constant { value, .. } => Value::try_from(value),
            ExprKind::Name { id, .. } => self.lookup(id),
            ExprKind::NamedExpr { target, value } => {
                let value = self.eval(value)?;
                if let ExprKind::Name { id, .. } = &target.kind {
                    // `:=` inside a comprehension binds in the enclosing scope.
                    self.names.insert(id.clone(), value.clone());
                }
                Ok(value)
            }
            ExprKind::BoolOp { op, values } => {
                let mut last = Value::None;
                for operand in values {
                    last = self.eval(operand)?;
                    let truthy = last.truthy()?;
                    match op {
                        BoolOp::And if !truthy => break,
                        BoolOp::Or if truthy => break,
                        _ => {}
                    }
                }
                Ok(last)
            }
            ExprKind::BinOp { left, op, right } => {
                let left = self.eval(left)?;
                let right = self.eval(right)?;
                ops::binary(*op, left, right)
            }
            ExprKind::UnaryOp { op, operand } => {
                let operand = self.eval(operand)?;
                match op {
                    UnaryOp::Not => Ok(Value::Bool(!operand.truthy()?)),
                    _ => ops::unary(*op, operand),
                }
            }
            ExprKind::IfExp { test, body, orelse } => {
                if self.eval(test)?.truthy()? {
                    self.eval(body)
                } else {
                    self.eval(orelse)
                }
            }
            ExprKind::Compare {
                left,
                ops: operators,
                comparators,
            } => {
                let mut left = self.eval(left)?;
                for (op, comparator) in operators.iter().zip(comparators) {
                    let right = self.eval(comparator)?;
                    if !ops::compare(*op, &left, &right)? {
                        return Ok(Value::Bool(false));
                    }
                    left = right;
                }
                Ok(Value::Bool(true))
            }
            ExprKind::Call {
                func,
                args,
                keywords,
            } => {
                if let ExprKind::Attribute { value, attr, .. } = &func.kind {
                    let receiver = self.eval(value)?;
                    let args = self.call_args(args, keywords)?;
                    return methods::call(&receiver, attr, args);
                }
                let func = self.eval(func)?;
                let args = self.call_args(args, keywords)?;
                match func {
                    Value::Builtin(builtin) => builtin.call(args),
                    other => Err(EvalError::TypeError(format!(
                        "'{}' object is not callable",
                        other.type_name()
                    ))),
                }
            }
            ExprKind::Attribute { value, attr, .. } => {
                let value = self.eval(value)?;
                methods::attribute(&value, attr)
            }
            ExprKind::Subscript { value, slice, .. } => {
                let container = self.eval(value)?;
                if let ExprKind::Slice { lower, upper, step } = &slice.kind {
                    let lower = self.eval_opt(lower.as_deref())?;
                    let upper = self.eval_opt(upper.as_deref())?;
                    let step = self.eval_opt(step.as_deref())?;
                    return ops::slice(&container, lower, upper, step);
                }
                let key = self.eval(slice)?;
                ops::index(&container, &key)
            }
            ExprKind::Slice { .. } => Err(unsupported("extended slicing is")),
            ExprKind::List { elts, .. } => Ok(Value::list(self.eval_items(elts)?)),
            ExprKind::Tuple { elts, .. } => Ok(Value::Tuple(self.eval_items(elts)?)),
            ExprKind::Dict { keys, values } => {
                let mut dict = Dict::new();
                for (key, value) in keys.iter().zip(values) {
                    match key {
                        Some(key) => {
                            let key = self.eval(key)?;
                            let value = self.eval(value)?;
                            dict.insert(key, value)?;
                        }
                        None => match self.eval(value)? {
                            Value::Dict(other) => {
                                for (key, value) in other.snapshot().iter() {
                                    dict.insert(key.clone(), value.clone())?;
                                }
                            }
                            other => {
                                return Err(EvalError::TypeError(format!(
                                    "'{}' object is not a mapping",
                                    other.type_name()
                                )));
                            }
                        },
                    }
                }
                Ok(Value::dict(dict))
            }
            ExprKind::ListComp { elt, generators } => {
                Ok(Value::list(self.comprehension(Element::Item(elt), generators)?))
            }
            // Generators run to completion; the consumer sees a list.
            ExprKind::GeneratorExp { elt, generators } => {
                Ok(Value::list(self.comprehension(Element::Item(elt), generators)?))
            }
            ExprKind::DictComp {
                key,
                value,
                generators,
            } => {
                let mut dict = Dict::new();
                for pair in self.comprehension(Element::Pair(key, value), generators)? {
                    if let Value::Tuple(mut pair) = pair {
                        if let (Some(value), Some(key)) = (pair.pop(), pair.pop()) {
                            dict.insert(key, value)?;
                        }
                    }
                }
                Ok(Value::dict(dict))
            }
            ExprKind::JoinedStr { values } => {
                let mut out = String::new();
                for part in values {
                    match &part.kind {
                        ExprKind::Constant { value, .. } => {
                            out.push_str(&Value::try_from(value)?.to_str())
                        }
                        _ => out.push_str(&self.eval(part)?.to_str()),
                    }
                }
                Ok(Value::Str(out))
            }
            ExprKind::FormattedValue {
                value,
                conversion,
                format_spec,
            } => {
                if format_spec.is_some() {
                    return Err(unsupported("format specifications are"));
                }
                let value = self.eval(value)?;
                let text = match u8::try_from(*conversion).map(char::from) {
                    Ok('r') => value.repr(),
                    Ok('a') => ascii(&value.repr()),
                    _ => value.to_str(),
                };
                Ok(Value::Str(text))
            }
            ExprKind::Starred { .. } => Err(EvalError::TypeError(
                "can't use starred expression here".to_string(),
            )),
            ExprKind::Set { .. } | ExprKind::SetComp { .. } => Err(unsupported("sets are")),
            ExprKind::Lambda { .. } => Err(unsupported("lambda is")),
            ExprKind::Await { .. } => Err(unsupported("'await' is")),
            ExprKind::Yield { .. } | ExprKind::YieldFrom { .. } => Err(unsupported("'yield' is")),
        }
    }

    /// Items of a display or argument list, with `*iterable` spliced in.
    fn eval_items(&mut self, exprs: &[Expr]) -> Result<Vec<Value>> {
        let mut items = Vec::with_capacity(exprs.len());
        for expr in exprs {
            match &expr.kind {
                ExprKind::Starred { value, .. } => items.extend(iterate(self.eval(value)?)?),
                _ => items.push(self.eval(expr)?),
            }
        }
        Ok(items)
    }

    fn eval_opt(&mut self, expr: Option<&Expr>) -> Result<Option<Value>> {
        expr.map(|expr| self.eval(expr)).transpose()
    }

    fn call_args(&mut self, args: &[Expr], keywords: &[Keyword]) -> Result<Args> {
        let positional = self.eval_items(args)?;
        let mut named: Vec<(String, Value)> = Vec::with_capacity(keywords.len());
        for keyword in keywords {
            let value = self.eval(&keyword.value)?;
            let pairs = match &keyword.arg {
                Some(arg) => vec![(arg.clone(), value)],
                None => keyword_mapping(value)?,
            };
            for (name, value) in pairs {
                if named.iter().any(|(seen, _)| *seen == name) {
                    return Err(EvalError::TypeError(format!(
                        "got multiple values for keyword argument '{name}'"
                    )));
                }
                named.push((name, value));
            }
        }
        Ok(Args {
            positional,
            keywords: named,
        })
    }

    fn comprehension(
        &mut self,
        element: Element,
        generators: &[Comprehension],
    ) -> Result<Vec<Value>> {
        if generators.iter().any(|clause| clause.is_async) {
            return Err(unsupported("asynchronous comprehensions are"));
        }
        let Some((first, rest)) = generators.split_first() else {
            return Ok(Vec::new());
        };
        // The outermost iterable is evaluated in the enclosing scope.
        let items = iterate(self.eval(&first.iter)?)?;
        self.scopes.push(IndexMap::new());
        let mut out = Vec::new();
        let result = self.generate(items, first, rest, &element, &mut out);
        self.scopes.pop();
        result.map(|()| out)
    }

    fn generate(
        &mut self,
        items: ValueIter,
        clause: &Comprehension,
        rest: &[Comprehension],
        element: &Element,
        out: &mut Vec<Value>,
    ) -> Result<()> {
        'items: for item in items {
            self.assign(&clause.target, item)?;
            for condition in &clause.ifs {
                if !self.eval(condition)?.truthy()? {
                    continue 'items;
                }
            }
            match rest.split_first() {
                Some((next, rest)) => {
                    let items = iterate(self.eval(&next.iter)?)?;
                    self.generate(items, next, rest, element, out)?;
                }
                None => out.push(match element {
                    Element::Item(elt) => self.eval(elt)?,
                    Element::Pair(key, value) => {
                        Value::Tuple(vec![self.eval(key)?, self.eval(value)?])
                    }
                }),
            }
        }
        Ok(())
    }

    fn lookup(&self, id: &str) -> Result<Value> {
        if let Some(value) = self.scopes.iter().rev().find_map(|scope| scope.get(id)) {
            return Ok(value.clone());
        }
        if let Some(value) = self.names.get(id) {
            return Ok(value.clone());
        }
        builtins::global(id).ok_or_else(|| undefined(id))
    }

    fn bind(&mut self, id: &str, value: Value) {
        let scope = match self.scopes.last_mut() {
            Some(scope) => scope,
            None => &mut *self.names,
        };
        scope.insert(id.to_string(), value);
    }

    fn assign(&mut self, target: &Expr, value: Value) -> Result<()> {
        match &target.kind {
            ExprKind::Name { id, .. } => {
                self.bind(id, value);
                Ok(())
            }
            ExprKind::Tuple { elts, .. } | ExprKind::List { elts, .. } => {
                let items: Vec<Value> = iterate(value)?.collect();
                for (elt, item) in elts.iter().zip(unpack(elts, items)?) {
                    self.assign(elt, item)?;
                }
                Ok(())
            }
            ExprKind::Starred { value: inner, .. } => self.assign(inner, value),
            ExprKind::Subscript {
                value: container,
                slice,
                ..
            } => {
                if let ExprKind::Slice { .. } = slice.kind {
                    return Err(unsupported("slice assignment is"));
                }
                let container = self.eval(container)?;
                let key = self.eval(slice)?;
                ops::set_item(&container, key, value)
            }
            ExprKind::Attribute {
                value: object,
                attr,
                ..
            } => {
                let object = self.eval(object)?;
                Err(EvalError::AttributeError(format!(
                    "'{}' object attribute '{attr}' is read-only",
                    object.type_name()
                )))
            }
            _ => Err(EvalError::TypeError(format!(
                "cannot assign to {}",
                target.describe()
            ))),
        }
    }

    fn delete(&mut self, target: &Expr) -> Result<()> {
        match &target.kind {
            // Workspace entries live until shutdown.
            ExprKind::Name { .. } => Err(unsupported("deleting names is")),
            ExprKind::Tuple { elts, .. } | ExprKind::List { elts, .. } => {
                elts.iter().try_for_each(|elt| self.delete(elt))
            }
            ExprKind::Subscript {
                value: container,
                slice,
                ..
            } => {
                if let ExprKind::Slice { .. } = slice.kind {
                    return Err(unsupported("slice deletion is"));
                }
                let container = self.eval(container)?;
                let key = self.eval(slice)?;
                ops::del_item(&container, &key)
            }
            ExprKind::Attribute {
                value: object,
                attr,
                ..
            } => {
                let object = self.eval(object)?;
                Err(EvalError::AttributeError(format!(
                    "'{}' object attribute '{attr}' is read-only",
                    object.type_name()
                )))
            }
            _ => Err(EvalError::TypeError(format!(
                "cannot delete {}",
                target.describe()
            ))),
        }
    }

    /// `import pandas [as name]`; no other module exists.
    fn import(&mut self, alias: &Alias) -> Result<()> {
        if alias.name != builtins::PANDAS {
            return Err(EvalError::ModuleNotFoundError(format!(
                "No module named '{}'",
                alias.name
            )));
        }
        let name = alias.asname.as_deref().unwrap_or(builtins::PANDAS);
        self.bind(name, Value::Module(builtins::PANDAS));
        Ok(())
    }

    fn import_from(&mut self, module: Option<&str>, names: &[Alias], level: usize) -> Result<()> {
        if level > 0 {
            return Err(EvalError::ImportError(
                "attempted relative import with no known parent package".to_string(),
            ));
        }
        let module = module.unwrap_or_default();
        if module != builtins::PANDAS {
            return Err(EvalError::ModuleNotFoundError(format!(
                "No module named '{module}'"
            )));
        }
        for alias in names {
            if alias.name == "*" {
                return Err(unsupported("wildcard imports are"));
            }
            let member = builtins::pandas_member(&alias.name).ok_or_else(|| {
                EvalError::ImportError(format!(
                    "cannot import name '{}' from '{module}'",
                    alias.name
                ))
            })?;
            let name = alias.asname.as_deref().unwrap_or(&alias.name);
            self.bind(name, Value::Builtin(member));
        }
        Ok(())
    }
}

/// `target op= operand`: lists and dicts update in place, everything else
/// rebinds to a new value.
fn augmented(op: Operator, target: Value, operand: Value) -> Result<Value> {
    if ops::binary_in_place(op, &target, &operand)? {
        return Ok(target);
    }
    ops::binary(op, target, operand)
}

/// Split `items` over target `elts`, collecting the surplus into a list at
/// the starred target.
fn unpack(elts: &[Expr], mut items: Vec<Value>) -> Result<Vec<Value>> {
    let star = elts
        .iter()
        .position(|elt| matches!(elt.kind, ExprKind::Starred { .. }));
    let Some(star) = star else {
        if items.len() > elts.len() {
            return Err(EvalError::ValueError(format!(
                "too many values to unpack (expected {})",
                elts.len()
            )));
        }
        if items.len() < elts.len() {
            return Err(EvalError::ValueError(format!(
                "not enough values to unpack (expected {}, got {})",
                elts.len(),
                items.len()
            )));
        }
        return Ok(items);
    };
    let fixed = elts.len() - 1;
    if items.len() < fixed {
        return Err(EvalError::ValueError(format!(
            "not enough values to unpack (expected at least {fixed}, got {})",
            items.len()
        )));
    }
    let after = items.split_off(items.len() - (fixed - star));
    let middle = items.split_off(star);
    items.push(Value::list(middle));
    items.extend(after);
    Ok(items)
}

/// `**mapping` in a call.
fn keyword_mapping(value: Value) -> Result<Vec<(String, Value)>> {
    let dict = match value {
        Value::Dict(dict) => dict.snapshot(),
        other => {
            return Err(EvalError::TypeError(format!(
                "argument after ** must be a mapping, not {}",
                other.type_name()
            )));
        }
    };
    dict
        .iter()
        .map(|(key, value)| match key {
            Value::Str(name) => Ok((name.clone(), value.clone())),
            _ => Err(EvalError::TypeError("keywords must be strings".to_string())),
        })
        .collect()
}

/// `ascii()`: `repr` with every non-ASCII character escaped.
fn ascii(repr: &str) -> String {
    let mut out = String::with_capacity(repr.len());
    for c in repr.chars() {
        match u32::from(c) {
            code if code < 0x80 => out.push(c),
            code if code <= 0xff => out.push_str(&format!("\\x{code:02x}")),
            code if code <= 0xffff => out.push_str(&format!("\\u{code:04x}")),
            code => out.push_str(&format!("\\U{code:08x}")),
        }
    }
    out
}

fn undefined(id: &str) -> EvalError {
    EvalError::NameError(format!("name '{id}' is not defined"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::{parse, parse_expression};

    fn run(source: &str) -> IndexMap<String, Value> {
        let mut names = IndexMap::new();
        let module = parse(source).unwrap();
        Interpreter::new(&mut names).run(&module.body).unwrap();
        names
    }

    fn run_err(source: &str) -> EvalError {
        let mut names = IndexMap::new();
        let module = parse(source).unwrap();
        Interpreter::new(&mut names).run(&module.body).unwrap_err()
    }

    fn eval(source: &str) -> Value {
        let mut names = IndexMap::new();
        let expr = parse_expression(source).unwrap();
        Interpreter::new(&mut names).eval(&expr).unwrap()
    }

    fn eval_err(source: &str) -> EvalError {
        let mut names = IndexMap::new();
        let expr = parse_expression(source).unwrap();
        Interpreter::new(&mut names).eval(&expr).unwrap_err()
    }

    fn repr(source: &str) -> String {
        eval(source).repr()
    }

    #[test]
    fn assignment_chain_and_unpacking() {
        let names = run("a = b = 3\nx, (y, z) = 1, [2, 3]");
        assert_eq!(names["a"].repr(), "3");
        assert_eq!(names["b"].repr(), "3");
        assert_eq!(names["y"].repr(), "2");
        assert_eq!(names["z"].repr(), "3");
    }

    #[test]
    fn unpacking_length_mismatch() {
        let err = run_err("a, b = [1, 2, 3]");
        assert_eq!(err.to_string(), "too many values to unpack (expected 2)");
        let err = run_err("a, b, c = 1, 2");
        assert_eq!(
            err.to_string(),
            "not enough values to unpack (expected 3, got 2)"
        );
    }

    #[test]
    fn nested_subscript_assignment() {
        let names = run("d = {'a': [1, 2]}\nd['a'][0] = 9\nd['b'] = 3");
        assert_eq!(names["d"].repr(), "{'a': [9, 2], 'b': 3}");
    }

    #[test]
    fn tuple_items_are_read_only() {
        let err = run_err("t = (1, 2)\nt[0] = 5");
        assert_eq!(err.kind(), "TypeError");
        assert_eq!(
            err.to_string(),
            "'tuple' object does not support item assignment"
        );
    }

    #[test]
    fn mutating_methods_update_the_binding() {
        let names = run("xs = [3]\nxs.append(1)\nxs.extend([2])\nxs.sort()\nm = {'k': []}\nm['k'].append(1)");
        assert_eq!(names["xs"].repr(), "[1, 2, 3]");
        assert_eq!(names["m"].repr(), "{'k': [1]}");
    }

    #[test]
    fn augmented_assignment() {
        let names = run("n = 5\nn += 2\nn *= 3\nxs = [1, 2]\nxs[1] -= 5");
        assert_eq!(names["n"].repr(), "21");
        assert_eq!(names["xs"].repr(), "[1, -3]");
    }

    #[test]
    fn loops_and_else_clauses() {
        let source = "\
total = 0
for i in range(10):
    if i == 5:
        break
    if i % 2:
        continue
    total += i
else:
    total = -1
n = 0
while n < 3:
    n += 1
else:
    done = True
";
        let names = run(source);
        assert_eq!(names["total"].repr(), "6");
        assert_eq!(names["n"].repr(), "3");
        assert_eq!(names["done"].repr(), "True");
    }

    #[test]
    fn side_effects_survive_a_fault() {
        let mut names = IndexMap::new();
        let module = parse("a = 1\nb = 1 / 0\nc = 3").unwrap();
        let err = Interpreter::new(&mut names).run(&module.body).unwrap_err();
        assert_eq!(err.kind(), "ZeroDivisionError");
        assert!(names.contains_key("a"));
        assert!(!names.contains_key("c"));
    }

    #[test]
    fn boolean_operators_return_operands() {
        assert_eq!(repr("0 or 'x'"), "'x'");
        assert_eq!(repr("[] and 1"), "[]");
        assert_eq!(repr("1 and 2 and 3"), "3");
        assert_eq!(repr("not []"), "True");
    }

    #[test]
    fn short_circuit_skips_faults() {
        assert_eq!(repr("False and 1 / 0"), "False");
        assert_eq!(repr("1 < 0 < 1 / 0"), "False");
    }

    #[test]
    fn chained_comparison() {
        assert_eq!(repr("1 < 2 <= 2 != 3"), "True");
        assert_eq!(repr("3 > 2 > 2"), "False");
    }

    #[test]
    fn conditional_expression() {
        assert_eq!(repr("'yes' if 2 > 1 else 'no'"), "'yes'");
    }

    #[test]
    fn undefined_name() {
        let err = eval_err("missing + 1");
        assert_eq!(err.kind(), "NameError");
        assert_eq!(err.to_string(), "name 'missing' is not defined");
    }

    #[test]
    fn calling_a_non_callable() {
        assert_eq!(eval_err("(1)(2)").to_string(), "'int' object is not callable");
    }

    #[test]
    fn attribute_assignment_is_rejected() {
        assert_eq!(run_err("x = 1\nx.y = 2").kind(), "AttributeError");
    }

    #[test]
    fn builtins_are_shadowable() {
        let names = run("len = 3\ny = len + 1");
        assert_eq!(names["y"].repr(), "4");
    }

    #[test]
    fn names_alias_the_same_list() {
        let names =
            run("a = [1]\nb = a\nb.append(2)\nsame = a is b\nd = {}\ne = d\ne['k'] = 1");
        assert_eq!(names["a"].repr(), "[1, 2]");
        assert_eq!(names["same"].repr(), "True");
        assert_eq!(names["d"].repr(), "{'k': 1}");
    }

    #[test]
    fn containers_alias_their_items() {
        let names = run("row = [1]\nrows = [row]\nrow.append(2)\nrows[0].append(3)");
        assert_eq!(names["rows"].repr(), "[[1, 2, 3]]");
        assert_eq!(names["row"].repr(), "[1, 2, 3]");
    }

    #[test]
    fn augmented_assignment_updates_lists_in_place() {
        let names = run("a = [1]\nb = a\nb += [2]\nn = 1\nm = n\nm += 1");
        assert_eq!(names["a"].repr(), "[1, 2]");
        assert_eq!(names["n"].repr(), "1");
        assert_eq!(names["m"].repr(), "2");
    }

    #[test]
    fn self_containing_lists_are_rejected() {
        let err = run_err("a = [1]\na.append(a)");
        assert_eq!(err.kind(), "NotImplementedError");
    }

    #[test]
    fn comprehensions_keep_their_variables_local() {
        let names = run(
            "x = 'kept'\nys = [x * y for x in range(3) for y in (1, 10) if x]\nd = {k: v for k, v in [('a', 1)]}",
        );
        assert_eq!(names["ys"].repr(), "[1, 10, 2, 20]");
        assert_eq!(names["d"].repr(), "{'a': 1}");
        assert_eq!(names["x"].repr(), "'kept'");
        assert!(!names.contains_key("y"));
        assert!(!names.contains_key("k"));
    }

    #[test]
    fn generator_arguments_are_consumed_eagerly() {
        assert_eq!(repr("sum(x for x in range(4))"), "6");
    }

    #[test]
    fn starred_unpacking() {
        let names = run("a, *b = 1, 2, 3\n*c, d = [4]\ne = [*b, *(5, 6)]\nf = max(*e)");
        assert_eq!(names["b"].repr(), "[2, 3]");
        assert_eq!(names["c"].repr(), "[]");
        assert_eq!(names["d"].repr(), "4");
        assert_eq!(names["f"].repr(), "6");
        let err = run_err("a, *b, c = [1]");
        assert_eq!(
            err.to_string(),
            "not enough values to unpack (expected at least 2, got 1)"
        );
    }

    #[test]
    fn double_star_unpacking() {
        assert_eq!(repr("{**{'a': 1}, 'b': 2}"), "{'a': 1, 'b': 2}");
        assert_eq!(repr("dict(**{'a': 1}, b=2)"), "{'a': 1, 'b': 2}");
        let err = eval_err("dict(a=1, **{'a': 2})");
        assert_eq!(err.to_string(), "got multiple values for keyword argument 'a'");
    }

    #[test]
    fn format_strings() {
        assert_eq!(
            eval("f'{1 + 1}-{\"x\"!r}-{\"é\"!a}'").to_str(),
            r"2-'x'-'\xe9'"
        );
        let names = run("n = 3\ns = f'{n=}'");
        assert_eq!(names["s"].to_str(), "n=3");
        assert_eq!(eval_err("f'{1:>3}'").kind(), "NotImplementedError");
    }

    #[test]
    fn named_expressions_bind() {
        let names = run("z = (y := 5) + 1");
        assert_eq!(names["y"].repr(), "5");
        assert_eq!(names["z"].repr(), "6");
    }

    #[test]
    fn pandas_imports_bind() {
        let names = run("import pandas as p\nfrom pandas import DataFrame as Frame");
        assert_eq!(names["p"].type_name(), "module");
        assert_eq!(names["Frame"].repr(), "<class 'pandas.core.frame.DataFrame'>");
    }

    #[test]
    fn other_imports_fail() {
        let err = run_err("import os");
        assert_eq!(err.kind(), "ModuleNotFoundError");
        assert_eq!(err.to_string(), "No module named 'os'");
        let err = run_err("from pandas import nothing");
        assert_eq!(err.kind(), "ImportError");
    }

    #[test]
    fn assertions() {
        run("assert 1 == 1");
        let err = run_err("assert 1 == 2, 'nope'");
        assert_eq!(err.kind(), "AssertionError");
        assert_eq!(err.to_string(), "nope");
    }

    #[test]
    fn annotated_assignment_binds_the_value() {
        let names = run("x: int = 4\ny: int");
        assert_eq!(names["x"].repr(), "4");
        assert!(!names.contains_key("y"));
    }

    #[test]
    fn deleting_items() {
        let names = run("xs = [1, 2]\ndel xs[0]\nd = {'a': 1, 'b': 2}\ndel d['a']");
        assert_eq!(names["xs"].repr(), "[2]");
        assert_eq!(names["d"].repr(), "{'b': 2}");
        assert_eq!(run_err("x = 1\ndel x").kind(), "NotImplementedError");
        assert_eq!(run_err("d = {}\ndel d['k']").kind(), "KeyError");
    }

    #[test]
    fn definitions_run_as_not_implemented() {
        let sources = [
            "def f():\n    return 1",
            "class A:\n    pass",
            "g = lambda x: x",
            "s = {1, 2}",
        ];
        for source in sources {
            assert_eq!(run_err(source).kind(), "NotImplementedError", "{source}");
        }
    }

    #[test]
    fn wide_integer_literals_overflow() {
        assert_eq!(eval_err("100000000000000000000").kind(), "OverflowError");
    }
}
