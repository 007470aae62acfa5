//! Tree nodes produced by the parser

use super::{BoolOp, CmpOp, ExprContext, Location, Operator, UnaryOp};
use crate::value::Complex;

/// Whole-program root.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Module {
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Stmt {
    pub kind: StmtKind,
    pub loc: Location,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    /// `def name(args) -> returns: body`, `async def` when `is_async`
    FunctionDef {
        is_async: bool,
        name: String,
        args: Box<Arguments>,
        body: Vec<Stmt>,
        decorator_list: Vec<Expr>,
        returns: Option<Expr>,
    },

    ClassDef {
        name: String,
        bases: Vec<Expr>,
        keywords: Vec<Keyword>,
        body: Vec<Stmt>,
        decorator_list: Vec<Expr>,
    },

    Return { value: Option<Expr> },

    /// `del a, b[0]`
    Delete { targets: Vec<Expr> },

    /// Expression statement: `f(x)`
    Expr { value: Expr },

    /// `a = b = value`
    Assign { targets: Vec<Expr>, value: Expr },

    /// `target op= value`
    AugAssign {
        target: Expr,
        op: Operator,
        value: Expr,
    },

    /// `target: annotation = value`; `simple` for an unparenthesized name
    AnnAssign {
        target: Expr,
        annotation: Expr,
        value: Option<Expr>,
        simple: bool,
    },

    /// `if test: body else: orelse` (`elif` nests another `If` in `orelse`)
    If {
        test: Expr,
        body: Vec<Stmt>,
        orelse: Vec<Stmt>,
    },

    While {
        test: Expr,
        body: Vec<Stmt>,
        orelse: Vec<Stmt>,
    },

    For {
        is_async: bool,
        target: Expr,
        iter: Expr,
        body: Vec<Stmt>,
        orelse: Vec<Stmt>,
    },

    With {
        is_async: bool,
        items: Vec<WithItem>,
        body: Vec<Stmt>,
    },

    Raise {
        exc: Option<Expr>,
        cause: Option<Expr>,
    },

    Try {
        body: Vec<Stmt>,
        handlers: Vec<ExceptHandler>,
        orelse: Vec<Stmt>,
        finalbody: Vec<Stmt>,
    },

    Assert { test: Expr, msg: Option<Expr> },

    Import { names: Vec<Alias> },

    /// `from ..module import names`; `level` counts the leading dots
    ImportFrom {
        module: Option<String>,
        names: Vec<Alias>,
        level: usize,
    },

    Global { names: Vec<String> },
    Nonlocal { names: Vec<String> },

    Pass,
    Break,
    Continue,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub loc: Location,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    /// `a and b and c` (operands flattened)
    BoolOp { op: BoolOp, values: Vec<Expr> },

    /// `name := value`
    NamedExpr {
        target: Box<Expr>,
        value: Box<Expr>,
    },

    BinOp {
        left: Box<Expr>,
        op: Operator,
        right: Box<Expr>,
    },

    UnaryOp { op: UnaryOp, operand: Box<Expr> },

    Lambda {
        args: Box<Arguments>,
        body: Box<Expr>,
    },

    /// `body if test else orelse`
    IfExp {
        test: Box<Expr>,
        body: Box<Expr>,
        orelse: Box<Expr>,
    },

    /// `{**a, 'k': v}`: a `None` key marks a `**` unpacking
    Dict {
        keys: Vec<Option<Expr>>,
        values: Vec<Expr>,
    },

    Set { elts: Vec<Expr> },

    ListComp {
        elt: Box<Expr>,
        generators: Vec<Comprehension>,
    },

    SetComp {
        elt: Box<Expr>,
        generators: Vec<Comprehension>,
    },

    DictComp {
        key: Box<Expr>,
        value: Box<Expr>,
        generators: Vec<Comprehension>,
    },

    GeneratorExp {
        elt: Box<Expr>,
        generators: Vec<Comprehension>,
    },

    Await { value: Box<Expr> },
    Yield { value: Option<Box<Expr>> },
    YieldFrom { value: Box<Expr> },

    /// `a < b <= c`
    Compare {
        left: Box<Expr>,
        ops: Vec<CmpOp>,
        comparators: Vec<Expr>,
    },

    Call {
        func: Box<Expr>,
        args: Vec<Expr>,
        keywords: Vec<Keyword>,
    },

    /// One `{value!conversion:format_spec}` field of an f-string.
    ///
    /// `conversion` is -1 when absent, otherwise the code point of `s`, `r`
    /// or `a`.
    FormattedValue {
        value: Box<Expr>,
        conversion: i64,
        format_spec: Option<Box<Expr>>,
    },

    /// An f-string: literal `Constant` parts and `FormattedValue` fields.
    JoinedStr { values: Vec<Expr> },

    Constant {
        value: Constant,
        /// `Some("u")` for `u"..."` strings
        kind: Option<String>,
    },

    Attribute {
        value: Box<Expr>,
        attr: String,
        ctx: ExprContext,
    },

    Subscript {
        value: Box<Expr>,
        slice: Box<Expr>,
        ctx: ExprContext,
    },

    /// `*value` in a display, call or target list
    Starred { value: Box<Expr>, ctx: ExprContext },

    Name { id: String, ctx: ExprContext },

    List { elts: Vec<Expr>, ctx: ExprContext },
    Tuple { elts: Vec<Expr>, ctx: ExprContext },

    /// `lower:upper:step`, only valid directly inside a subscript
    Slice {
        lower: Option<Box<Expr>>,
        upper: Option<Box<Expr>>,
        step: Option<Box<Expr>>,
    },
}

/// One `for target in iter if cond` clause of a comprehension.
#[derive(Debug, Clone, PartialEq)]
pub struct Comprehension {
    pub target: Expr,
    pub iter: Expr,
    pub ifs: Vec<Expr>,
    pub is_async: bool,
}

/// Parameter list of a `def` or `lambda`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Arguments {
    pub posonlyargs: Vec<Arg>,
    pub args: Vec<Arg>,
    pub vararg: Option<Arg>,
    pub kwonlyargs: Vec<Arg>,
    /// One entry per keyword-only parameter, `None` where it has no default
    pub kw_defaults: Vec<Option<Expr>>,
    pub kwarg: Option<Arg>,
    /// Defaults of the trailing positional parameters
    pub defaults: Vec<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Arg {
    pub arg: String,
    pub annotation: Option<Expr>,
    pub loc: Location,
}

/// Keyword argument in a call: `f(arg=value)`, or `f(**value)` when `arg` is
/// `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct Keyword {
    pub arg: Option<String>,
    pub value: Expr,
    pub loc: Location,
}

/// `name as asname` in an import.
#[derive(Debug, Clone, PartialEq)]
pub struct Alias {
    pub name: String,
    pub asname: Option<String>,
    pub loc: Location,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExceptHandler {
    pub type_: Option<Expr>,
    pub name: Option<String>,
    pub body: Vec<Stmt>,
    pub loc: Location,
}

/// `context_expr as optional_vars` in a `with` header.
#[derive(Debug, Clone, PartialEq)]
pub struct WithItem {
    pub context_expr: Expr,
    pub optional_vars: Option<Expr>,
}

/// Payload of a literal constant.
#[derive(Debug, Clone, PartialEq)]
pub enum Constant {
    None,
    Bool(bool),
    Int(i64),
    /// Integer literal outside the `i64` range, as canonical decimal digits
    BigInt(String),
    Float(f64),
    Complex(Complex),
    Str(String),
    Bytes(Vec<u8>),
    Ellipsis,
}

impl Constant {
    pub fn type_name(&self) -> &'static str {
        match self {
            Constant::None => "NoneType",
            Constant::Bool(_) => "bool",
            Constant::Int(_) | Constant::BigInt(_) => "int",
            Constant::Float(_) => "float",
            Constant::Complex(_) => "complex",
            Constant::Str(_) => "str",
            Constant::Bytes(_) => "bytes",
            Constant::Ellipsis => "ellipsis",
        }
    }
}

impl Expr {
    pub fn new(kind: ExprKind, loc: Location) -> Self {
        Expr { kind, loc }
    }

    /// Context of an assignable expression, `None` for everything else.
    pub fn ctx(&self) -> Option<ExprContext> {
        match &self.kind {
            ExprKind::Name { ctx, .. }
            | ExprKind::Attribute { ctx, .. }
            | ExprKind::Subscript { ctx, .. }
            | ExprKind::Starred { ctx, .. }
            | ExprKind::List { ctx, .. }
            | ExprKind::Tuple { ctx, .. } => Some(*ctx),
            _ => None,
        }
    }

    /// Rewrite a parsed `Load` expression as a `Store` or `Del` target.
    ///
    /// On failure returns the offending sub-expression, which callers report
    /// as "cannot assign to ..." or "cannot delete ...".
    pub fn into_target(self, ctx: ExprContext) -> Result<Expr, Expr> {
        let Expr { kind, loc } = self;
        let kind = match kind {
            ExprKind::Name { id, .. } => ExprKind::Name { id, ctx },
            ExprKind::Attribute { value, attr, .. } => ExprKind::Attribute { value, attr, ctx },
            ExprKind::Subscript { value, slice, .. } => ExprKind::Subscript { value, slice, ctx },
            ExprKind::Starred { value, .. } if ctx == ExprContext::Store => ExprKind::Starred {
                value: Box::new((*value).into_target(ctx)?),
                ctx,
            },
            ExprKind::Tuple { elts, .. } => ExprKind::Tuple {
                elts: targets(elts, ctx)?,
                ctx,
            },
            ExprKind::List { elts, .. } => ExprKind::List {
                elts: targets(elts, ctx)?,
                ctx,
            },
            other => return Err(Expr { kind: other, loc }),
        };
        Ok(Expr { kind, loc })
    }

    /// Short description used in "cannot assign to ..." messages.
    pub fn describe(&self) -> &'static str {
        match &self.kind {
            ExprKind::BoolOp { .. } | ExprKind::BinOp { .. } | ExprKind::UnaryOp { .. } => {
                "expression"
            }
            ExprKind::NamedExpr { .. } => "named expression",
            ExprKind::Lambda { .. } => "lambda",
            ExprKind::IfExp { .. } => "conditional expression",
            ExprKind::Dict { .. } => "dict literal",
            ExprKind::Set { .. } => "set display",
            ExprKind::ListComp { .. } => "list comprehension",
            ExprKind::SetComp { .. } => "set comprehension",
            ExprKind::DictComp { .. } => "dict comprehension",
            ExprKind::GeneratorExp { .. } => "generator expression",
            ExprKind::Await { .. } => "await expression",
            ExprKind::Yield { .. } | ExprKind::YieldFrom { .. } => "yield expression",
            ExprKind::Compare { .. } => "comparison",
            ExprKind::Call { .. } => "function call",
            ExprKind::FormattedValue { .. } | ExprKind::JoinedStr { .. } => "f-string expression",
            ExprKind::Constant { value, .. } => match value {
                Constant::None => "None",
                Constant::Bool(true) => "True",
                Constant::Bool(false) => "False",
                Constant::Ellipsis => "ellipsis",
                _ => "literal",
            },
            ExprKind::Attribute { .. } => "attribute",
            ExprKind::Subscript { .. } => "subscript",
            ExprKind::Starred { .. } => "starred",
            ExprKind::Name { .. } => "name",
            ExprKind::List { .. } => "list",
            ExprKind::Tuple { .. } => "tuple",
            ExprKind::Slice { .. } => "slice",
        }
    }
}

fn targets(elts: Vec<Expr>, ctx: ExprContext) -> Result<Vec<Expr>, Expr> {
    elts.into_iter().map(|elt| elt.into_target(ctx)).collect()
}

impl Stmt {
    pub fn new(kind: StmtKind, loc: Location) -> Self {
        Stmt { kind, loc }
    }
}
