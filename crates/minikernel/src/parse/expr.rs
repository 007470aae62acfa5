//! Expression grammar
//!
//! Precedence, loosest first: `lambda`, conditional, `or`, `and`, `not`,
//! comparisons, `|`, `^`, `&`, shifts, `+ -`, `* / // % @`, unary `+ - ~`,
//! `**`, `await`, then trailers (`.attr`, calls, subscripts) on atoms.
//! Named expressions (`:=`), starred items and `yield` are only accepted in
//! the positions that allow them.
//!
//! Every parser consumes its own leading whitespace and never trailing
//! whitespace, so the stream offset right after a parser returns is the end
//! of the node it produced.

use std::ops::Range;

use winnow::combinator::{alt, cut_err, eof, fail, not, opt, peek, preceded, repeat, terminated};
use winnow::error::{ContextError, ErrMode, StrContext, StrContextValue};
use winnow::prelude::*;
use winnow::stream::{Stateful, Stream};
use winnow::token::{one_of, take_till, take_while};

use super::lines::LineIndex;
use super::literals::{FormatPart, Piece, scan_number, scan_string};
use crate::ast::{
    Arg, Arguments, BoolOp, CmpOp, Comprehension, Constant, Expr, ExprContext, ExprKind, Keyword,
    Location, Operator, UnaryOp,
};

pub(super) type PResult<T> = winnow::ModalResult<T>;
pub(super) type Input<'a> = Stateful<&'a str, Cursor<'a>>;

/// Bracket and unary nesting allowed inside one logical line.
pub(super) const MAX_NESTING: usize = 50;

#[derive(Debug, Clone)]
pub(super) struct Cursor<'a> {
    /// Absolute offset one past the end of the text being parsed
    pub end: usize,
    pub index: &'a LineIndex,
    pub nesting: usize,
}

const KEYWORDS: &[&str] = &[
    "False", "None", "True", "and", "as", "assert", "async", "await", "break", "class",
    "continue", "def", "del", "elif", "else", "except", "finally", "for", "from", "global", "if",
    "import", "in", "is", "lambda", "nonlocal", "not", "or", "pass", "raise", "return", "try",
    "while", "with", "yield",
];

pub(super) fn is_keyword(word: &str) -> bool {
    KEYWORDS.contains(&word)
}

// ============ Positions ============

pub(super) fn offset(input: &Input<'_>) -> usize {
    input.state.end - input.input.len()
}

/// Span from `start` to the current stream position.
pub(super) fn span(input: &Input<'_>, start: usize) -> Location {
    between(input, start, offset(input))
}

/// Span between two absolute offsets.
pub(super) fn between(input: &Input<'_>, start: usize, end: usize) -> Location {
    let (lineno, col_offset) = input.state.index.position(start);
    let (end_lineno, end_col_offset) = input.state.index.position(end);
    Location {
        lineno,
        col_offset,
        end_lineno,
        end_col_offset,
    }
}

/// Span from `start` to the end of `end`.
pub(super) fn starting_at(input: &Input<'_>, start: usize, end: Location) -> Location {
    let (lineno, col_offset) = input.state.index.position(start);
    Location {
        lineno,
        col_offset,
        end_lineno: end.end_lineno,
        end_col_offset: end.end_col_offset,
    }
}

// ============ Errors ============

/// Fail with a non-recoverable error carrying `message`.
pub(super) fn syntax_error<T>(input: &mut Input<'_>, message: &'static str) -> PResult<T> {
    cut_err(fail::<_, T, _>)
        .context(StrContext::Label(message))
        .parse_next(input)
}

fn backtrack<T>() -> PResult<T> {
    Err(ErrMode::Backtrack(ContextError::new()))
}

/// Message for an expression that cannot be a `ctx` target, `what` being
/// its [`Expr::describe`] text.
pub(super) fn target_error(ctx: ExprContext, what: &str) -> &'static str {
    macro_rules! messages {
        ($($what:literal),* $(,)?) => {
            match (ctx, what) {
                $((ExprContext::Del, $what) => concat!("cannot delete ", $what),)*
                $((_, $what) => concat!("cannot assign to ", $what),)*
                _ => "invalid syntax",
            }
        };
    }
    messages!(
        "expression",
        "named expression",
        "lambda",
        "conditional expression",
        "dict literal",
        "set display",
        "list comprehension",
        "set comprehension",
        "dict comprehension",
        "generator expression",
        "await expression",
        "yield expression",
        "comparison",
        "function call",
        "f-string expression",
        "None",
        "True",
        "False",
        "ellipsis",
        "literal",
        "starred",
        "slice",
    )
}

/// Convert a parsed expression to a `Store` target or fail with a syntax
/// error naming the offending part.
pub(super) fn store_target(input: &mut Input<'_>, target: Expr) -> PResult<Expr> {
    match target.into_target(ExprContext::Store) {
        Ok(target) => Ok(target),
        Err(bad) => syntax_error(input, target_error(ExprContext::Store, bad.describe())),
    }
}

/// Run `parser` one nesting level deeper: brackets, unary operators and
/// the right operand of `**` each count a level.
pub(super) fn nested<'a, O>(
    mut parser: impl Parser<Input<'a>, O, ErrMode<ContextError>>,
) -> impl Parser<Input<'a>, O, ErrMode<ContextError>> {
    move |input: &mut Input<'a>| {
        if input.state.nesting >= MAX_NESTING {
            return syntax_error(input, "expression too deeply nested");
        }
        input.state.nesting += 1;
        let result = parser.parse_next(input);
        input.state.nesting -= 1;
        result
    }
}

// ============ Whitespace and words ============

/// Spaces, comments, newlines inside brackets, and line continuations.
pub(super) fn ws(input: &mut Input<'_>) -> PResult<()> {
    repeat(
        0..,
        alt((
            take_while(1.., (' ', '\t', '\x0c', '\r', '\n')).void(),
            ('#', take_till(0.., '\n')).void(),
            ('\\', opt('\r'), '\n').void(),
        )),
    )
    .parse_next(input)
}

fn word<'a>(input: &mut Input<'a>) -> PResult<&'a str> {
    (
        one_of(|c: char| c.is_alphabetic() || c == '_'),
        take_while(0.., |c: char| c.is_alphanumeric() || c == '_'),
    )
        .take()
        .parse_next(input)
}

pub(super) fn keyword<'a>(
    expected: &'static str,
) -> impl Parser<Input<'a>, (), ErrMode<ContextError>> {
    word.verify(move |w: &str| w == expected)
        .void()
        .context(StrContext::Expected(StrContextValue::StringLiteral(expected)))
}

pub(super) fn identifier(input: &mut Input<'_>) -> PResult<String> {
    word.verify(|w: &str| !is_keyword(w))
        .map(str::to_string)
        .context(StrContext::Expected(StrContextValue::Description("identifier")))
        .parse_next(input)
}

fn expect<'a>(close: char) -> impl Parser<Input<'a>, char, ErrMode<ContextError>> {
    cut_err(close).context(StrContext::Expected(StrContextValue::CharLiteral(close)))
}

// ============ Expression lists ============

/// `star_expression ("," star_expression)* [","]`, a tuple when any comma
/// appears.
pub(super) fn expression_list(input: &mut Input<'_>) -> PResult<Expr> {
    bare_list(input, star_expression)
}

/// A `yield` expression or an expression list: the right-hand side of an
/// assignment.
pub(super) fn assigned_value(input: &mut Input<'_>) -> PResult<Expr> {
    alt((yield_expr, expression_list)).parse_next(input)
}

/// Assignment targets of a `for` header or comprehension: stops before `in`.
pub(super) fn target_list(input: &mut Input<'_>) -> PResult<Expr> {
    bare_list(input, star_target)
}

/// Whole input of an `eval`-mode parse.
pub(super) fn eval_input(input: &mut Input<'_>) -> PResult<Expr> {
    let expr = expression_list(input)?;
    ws(input)?;
    cut_err(eof)
        .context(StrContext::Label("invalid syntax"))
        .parse_next(input)?;
    Ok(expr)
}

fn bare_list<'a>(
    input: &mut Input<'a>,
    item: fn(&mut Input<'a>) -> PResult<Expr>,
) -> PResult<Expr> {
    let first = item(input)?;
    let mut items = vec![first];
    let mut trailing = false;
    while opt(preceded(ws, ',')).parse_next(input)?.is_some() {
        trailing = true;
        match opt(item).parse_next(input)? {
            Some(next) => {
                items.push(next);
                trailing = false;
            }
            None => break,
        }
    }
    tuple_or_single(input, items, trailing)
}

fn tuple_or_single(input: &mut Input<'_>, mut items: Vec<Expr>, trailing: bool) -> PResult<Expr> {
    if items.len() == 1 && !trailing {
        if let Some(single) = items.pop() {
            if matches!(single.kind, ExprKind::Starred { .. }) {
                return syntax_error(input, "can't use starred expression here");
            }
            return Ok(single);
        }
    }
    let first = items.first().map_or_else(|| span(input, offset(input)), |e| e.loc);
    let loc = items.last().map_or(first, |last| first.to(last.loc));
    Ok(Expr::new(
        ExprKind::Tuple {
            elts: items,
            ctx: ExprContext::Load,
        },
        loc,
    ))
}

/// Items up to and including `close`. Returns the items and whether a comma
/// followed the last one.
fn bracketed<'a>(
    input: &mut Input<'a>,
    item: fn(&mut Input<'a>) -> PResult<Expr>,
    close: char,
) -> PResult<(Vec<Expr>, bool)> {
    let mut items = Vec::new();
    let mut trailing = false;
    loop {
        ws(input)?;
        if peek(opt(close)).parse_next(input)?.is_some() {
            break;
        }
        items.push(cut_err(item).parse_next(input)?);
        ws(input)?;
        if opt(',').parse_next(input)?.is_none() {
            trailing = false;
            break;
        }
        trailing = true;
    }
    ws(input)?;
    expect(close).parse_next(input)?;
    Ok((items, trailing))
}

// ============ Starred and named items ============

fn starred<'a>(
    input: &mut Input<'a>,
    inner: fn(&mut Input<'a>) -> PResult<Expr>,
) -> PResult<Expr> {
    ws(input)?;
    let start = offset(input);
    if opt(terminated('*', not(one_of(['*', '=']))))
        .parse_next(input)?
        .is_none()
    {
        return inner(input);
    }
    let value = cut_err(nested(bit_or)).parse_next(input)?;
    let loc = starting_at(input, start, value.loc);
    Ok(Expr::new(
        ExprKind::Starred {
            value: Box::new(value),
            ctx: ExprContext::Load,
        },
        loc,
    ))
}

fn star_expression(input: &mut Input<'_>) -> PResult<Expr> {
    starred(input, expression)
}

fn star_named_expression(input: &mut Input<'_>) -> PResult<Expr> {
    starred(input, named_expression)
}

fn star_target(input: &mut Input<'_>) -> PResult<Expr> {
    starred(input, bit_or)
}

/// `name := value`, or a plain expression.
pub(super) fn named_expression(input: &mut Input<'_>) -> PResult<Expr> {
    ws(input)?;
    let start = offset(input);
    let Some(id) = opt(terminated(identifier, (ws, ":="))).parse_next(input)? else {
        return expression(input);
    };
    let target = Expr::new(
        ExprKind::Name {
            ctx: ExprContext::Store,
            id: id.clone(),
        },
        between(input, start, start + id.len()),
    );
    let value = cut_err(expression).parse_next(input)?;
    let loc = target.loc.to(value.loc);
    Ok(Expr::new(
        ExprKind::NamedExpr {
            target: Box::new(target),
            value: Box::new(value),
        },
        loc,
    ))
}

// ============ Precedence levels ============

pub(super) fn expression(input: &mut Input<'_>) -> PResult<Expr> {
    nested(alt((lambda, conditional))).parse_next(input)
}

fn lambda(input: &mut Input<'_>) -> PResult<Expr> {
    ws(input)?;
    let start = offset(input);
    keyword("lambda").parse_next(input)?;
    let args = cut_err(|input: &mut Input<'_>| parameters(input, false, ':')).parse_next(input)?;
    ws(input)?;
    expect(':').parse_next(input)?;
    let body = cut_err(expression).parse_next(input)?;
    let loc = starting_at(input, start, body.loc);
    Ok(Expr::new(
        ExprKind::Lambda {
            args: Box::new(args),
            body: Box::new(body),
        },
        loc,
    ))
}

fn conditional(input: &mut Input<'_>) -> PResult<Expr> {
    let body = or_test(input)?;
    if opt(preceded(ws, keyword("if"))).parse_next(input)?.is_none() {
        return Ok(body);
    }
    let test = cut_err(or_test).parse_next(input)?;
    cut_err(preceded(ws, keyword("else"))).parse_next(input)?;
    let orelse = cut_err(expression).parse_next(input)?;
    let loc = body.loc.to(orelse.loc);
    Ok(Expr::new(
        ExprKind::IfExp {
            test: Box::new(test),
            body: Box::new(body),
            orelse: Box::new(orelse),
        },
        loc,
    ))
}

pub(super) fn or_test(input: &mut Input<'_>) -> PResult<Expr> {
    bool_chain(input, "or", BoolOp::Or, and_test)
}

fn and_test(input: &mut Input<'_>) -> PResult<Expr> {
    bool_chain(input, "and", BoolOp::And, not_test)
}

fn bool_chain<'a>(
    input: &mut Input<'a>,
    name: &'static str,
    op: BoolOp,
    operand: fn(&mut Input<'a>) -> PResult<Expr>,
) -> PResult<Expr> {
    let first = operand(input)?;
    let rest: Vec<Expr> =
        repeat(0.., preceded((ws, keyword(name)), cut_err(operand))).parse_next(input)?;
    if rest.is_empty() {
        return Ok(first);
    }
    let mut values = vec![first];
    values.extend(rest);
    let loc = values[0].loc.to(values[values.len() - 1].loc);
    Ok(Expr::new(ExprKind::BoolOp { op, values }, loc))
}

fn not_test(input: &mut Input<'_>) -> PResult<Expr> {
    ws(input)?;
    let start = offset(input);
    if opt(keyword("not")).parse_next(input)?.is_none() {
        return comparison(input);
    }
    let operand = cut_err(nested(not_test)).parse_next(input)?;
    let loc = starting_at(input, start, operand.loc);
    Ok(Expr::new(
        ExprKind::UnaryOp {
            op: UnaryOp::Not,
            operand: Box::new(operand),
        },
        loc,
    ))
}

fn comparison(input: &mut Input<'_>) -> PResult<Expr> {
    let left = bit_or(input)?;
    let rest: Vec<(CmpOp, Expr)> =
        repeat(0.., (preceded(ws, comparison_op), cut_err(bit_or))).parse_next(input)?;
    if rest.is_empty() {
        return Ok(left);
    }
    let (ops, comparators): (Vec<CmpOp>, Vec<Expr>) = rest.into_iter().unzip();
    let loc = left.loc.to(comparators[comparators.len() - 1].loc);
    Ok(Expr::new(
        ExprKind::Compare {
            left: Box::new(left),
            ops,
            comparators,
        },
        loc,
    ))
}

fn comparison_op(input: &mut Input<'_>) -> PResult<CmpOp> {
    alt((
        "==".value(CmpOp::Eq),
        "!=".value(CmpOp::NotEq),
        "<=".value(CmpOp::LtE),
        ">=".value(CmpOp::GtE),
        terminated('<', not(one_of(['<', '=']))).value(CmpOp::Lt),
        terminated('>', not(one_of(['>', '=']))).value(CmpOp::Gt),
        (keyword("not"), ws, keyword("in")).value(CmpOp::NotIn),
        keyword("in").value(CmpOp::In),
        (keyword("is"), ws, keyword("not")).value(CmpOp::IsNot),
        keyword("is").value(CmpOp::Is),
    ))
    .parse_next(input)
}

fn binary_chain<'a>(
    input: &mut Input<'a>,
    operand: fn(&mut Input<'a>) -> PResult<Expr>,
    operator: fn(&mut Input<'a>) -> PResult<Operator>,
) -> PResult<Expr> {
    let mut left = operand(input)?;
    while let Some(op) = opt(preceded(ws, operator)).parse_next(input)? {
        let right = cut_err(operand).parse_next(input)?;
        let loc = left.loc.to(right.loc);
        left = Expr::new(
            ExprKind::BinOp {
                left: Box::new(left),
                op,
                right: Box::new(right),
            },
            loc,
        );
    }
    Ok(left)
}

pub(super) fn bit_or(input: &mut Input<'_>) -> PResult<Expr> {
    binary_chain(input, bit_xor, |input| {
        terminated('|', not('=')).value(Operator::BitOr).parse_next(input)
    })
}

fn bit_xor(input: &mut Input<'_>) -> PResult<Expr> {
    binary_chain(input, bit_and, |input| {
        terminated('^', not('=')).value(Operator::BitXor).parse_next(input)
    })
}

fn bit_and(input: &mut Input<'_>) -> PResult<Expr> {
    binary_chain(input, shift, |input| {
        terminated('&', not('=')).value(Operator::BitAnd).parse_next(input)
    })
}

fn shift(input: &mut Input<'_>) -> PResult<Expr> {
    binary_chain(input, arith, |input| {
        alt((
            terminated("<<", not('=')).value(Operator::LShift),
            terminated(">>", not('=')).value(Operator::RShift),
        ))
        .parse_next(input)
    })
}

fn arith(input: &mut Input<'_>) -> PResult<Expr> {
    binary_chain(input, term, |input| {
        alt((
            terminated('+', not('=')).value(Operator::Add),
            terminated('-', not('=')).value(Operator::Sub),
        ))
        .parse_next(input)
    })
}

fn term(input: &mut Input<'_>) -> PResult<Expr> {
    binary_chain(input, factor, |input| {
        alt((
            terminated("//", not('=')).value(Operator::FloorDiv),
            terminated('/', not(one_of(['/', '=']))).value(Operator::Div),
            terminated('*', not(one_of(['*', '=']))).value(Operator::Mult),
            terminated('%', not('=')).value(Operator::Mod),
            terminated('@', not('=')).value(Operator::MatMult),
        ))
        .parse_next(input)
    })
}

fn factor(input: &mut Input<'_>) -> PResult<Expr> {
    ws(input)?;
    let start = offset(input);
    let op = opt(alt((
        '+'.value(UnaryOp::UAdd),
        '-'.value(UnaryOp::USub),
        '~'.value(UnaryOp::Invert),
    )))
    .parse_next(input)?;
    let Some(op) = op else {
        return power(input);
    };
    let operand = cut_err(nested(factor)).parse_next(input)?;
    let loc = starting_at(input, start, operand.loc);
    Ok(Expr::new(
        ExprKind::UnaryOp {
            op,
            operand: Box::new(operand),
        },
        loc,
    ))
}

fn power(input: &mut Input<'_>) -> PResult<Expr> {
    let base = await_primary(input)?;
    if opt(preceded(ws, terminated("**", not('='))))
        .parse_next(input)?
        .is_none()
    {
        return Ok(base);
    }
    let exponent = cut_err(nested(factor)).parse_next(input)?;
    let loc = base.loc.to(exponent.loc);
    Ok(Expr::new(
        ExprKind::BinOp {
            left: Box::new(base),
            op: Operator::Pow,
            right: Box::new(exponent),
        },
        loc,
    ))
}

fn await_primary(input: &mut Input<'_>) -> PResult<Expr> {
    ws(input)?;
    let start = offset(input);
    if opt(keyword("await")).parse_next(input)?.is_none() {
        return primary(input);
    }
    let value = cut_err(nested(primary)).parse_next(input)?;
    let loc = starting_at(input, start, value.loc);
    Ok(Expr::new(
        ExprKind::Await {
            value: Box::new(value),
        },
        loc,
    ))
}

/// `yield`, `yield value, ...` or `yield from value`.
pub(super) fn yield_expr(input: &mut Input<'_>) -> PResult<Expr> {
    ws(input)?;
    let start = offset(input);
    keyword("yield").parse_next(input)?;
    if opt(preceded(ws, keyword("from"))).parse_next(input)?.is_some() {
        let value = cut_err(expression).parse_next(input)?;
        let loc = starting_at(input, start, value.loc);
        return Ok(Expr::new(
            ExprKind::YieldFrom {
                value: Box::new(value),
            },
            loc,
        ));
    }
    let value = opt(expression_list).parse_next(input)?;
    let loc = match &value {
        Some(value) => starting_at(input, start, value.loc),
        None => span(input, start),
    };
    Ok(Expr::new(
        ExprKind::Yield {
            value: value.map(Box::new),
        },
        loc,
    ))
}

// ============ Parameters ============

/// Parameter list of a `def` (with annotations) or `lambda`, up to but not
/// including `close`.
pub(super) fn parameters(
    input: &mut Input<'_>,
    annotated: bool,
    close: char,
) -> PResult<Arguments> {
    let mut args = Arguments::default();
    let mut star = false;
    let mut bare_star = false;
    let mut slash = false;
    loop {
        ws(input)?;
        if peek(opt(close)).parse_next(input)?.is_some() {
            break;
        }
        if args.kwarg.is_some() {
            return syntax_error(input, "arguments cannot follow var-keyword argument");
        }
        if opt("**").parse_next(input)?.is_some() {
            args.kwarg = Some(cut_err(|i: &mut Input<'_>| parameter(i, annotated)).parse_next(input)?);
        } else if opt('*').parse_next(input)?.is_some() {
            if star {
                return syntax_error(input, "* argument may appear only once");
            }
            star = true;
            ws(input)?;
            if peek(opt(one_of([',', close]))).parse_next(input)?.is_some() {
                bare_star = true;
            } else {
                args.vararg =
                    Some(cut_err(|i: &mut Input<'_>| parameter(i, annotated)).parse_next(input)?);
            }
        } else if opt('/').parse_next(input)?.is_some() {
            if slash {
                return syntax_error(input, "/ may appear only once");
            }
            if star {
                return syntax_error(input, "/ must be ahead of *");
            }
            if args.args.is_empty() {
                return syntax_error(input, "at least one argument must precede /");
            }
            slash = true;
            args.posonlyargs = std::mem::take(&mut args.args);
        } else {
            let param = cut_err(|i: &mut Input<'_>| parameter(i, annotated)).parse_next(input)?;
            let default = opt(preceded((ws, '='), cut_err(expression))).parse_next(input)?;
            if star {
                args.kwonlyargs.push(param);
                args.kw_defaults.push(default);
            } else {
                match default {
                    Some(default) => args.defaults.push(default),
                    None if !args.defaults.is_empty() => {
                        return syntax_error(
                            input,
                            "non-default argument follows default argument",
                        );
                    }
                    None => {}
                }
                args.args.push(param);
            }
        }
        ws(input)?;
        if opt(',').parse_next(input)?.is_none() {
            break;
        }
    }
    if bare_star && args.kwonlyargs.is_empty() {
        return syntax_error(input, "named arguments must follow bare *");
    }
    Ok(args)
}

fn parameter(input: &mut Input<'_>, annotated: bool) -> PResult<Arg> {
    ws(input)?;
    let start = offset(input);
    let arg = identifier(input)?;
    let annotation = if annotated {
        opt(preceded((ws, ':'), cut_err(expression))).parse_next(input)?
    } else {
        None
    };
    Ok(Arg {
        arg,
        annotation,
        loc: span(input, start),
    })
}

// ============ Trailers ============

enum Trailer {
    Attr(String),
    Call(Vec<Expr>, Vec<Keyword>),
    Index(Expr),
}

fn primary(input: &mut Input<'_>) -> PResult<Expr> {
    ws(input)?;
    let start = offset(input);
    let mut expr = atom(input)?;
    while let Some(trailer) = opt(preceded(ws, trailer)).parse_next(input)? {
        let loc = span(input, start);
        let value = Box::new(expr);
        let kind = match trailer {
            Trailer::Attr(attr) => ExprKind::Attribute {
                value,
                attr,
                ctx: ExprContext::Load,
            },
            Trailer::Call(args, keywords) => ExprKind::Call {
                func: value,
                args,
                keywords,
            },
            Trailer::Index(slice) => ExprKind::Subscript {
                value,
                slice: Box::new(slice),
                ctx: ExprContext::Load,
            },
        };
        expr = Expr::new(kind, loc);
    }
    Ok(expr)
}

fn trailer(input: &mut Input<'_>) -> PResult<Trailer> {
    alt((
        preceded(('.', ws), cut_err(identifier)).map(Trailer::Attr),
        call,
        subscript,
    ))
    .parse_next(input)
}

fn call(input: &mut Input<'_>) -> PResult<Trailer> {
    let open = offset(input);
    '('.parse_next(input)?;
    let (args, keywords) = call_arguments(input, open)?;
    Ok(Trailer::Call(args, keywords))
}

/// Arguments after the `(` at offset `open`, through the closing `)`.
pub(super) fn call_arguments(
    input: &mut Input<'_>,
    open: usize,
) -> PResult<(Vec<Expr>, Vec<Keyword>)> {
    let mut args = Vec::new();
    let mut keywords: Vec<Keyword> = Vec::new();
    loop {
        ws(input)?;
        if opt(')').parse_next(input)?.is_some() {
            break;
        }
        let start = offset(input);
        if opt("**").parse_next(input)?.is_some() {
            let value = cut_err(expression).parse_next(input)?;
            let loc = starting_at(input, start, value.loc);
            keywords.push(Keyword {
                arg: None,
                value,
                loc,
            });
        } else if opt('*').parse_next(input)?.is_some() {
            if keywords.iter().any(|k| k.arg.is_none()) {
                return syntax_error(
                    input,
                    "iterable argument unpacking follows keyword argument unpacking",
                );
            }
            let value = cut_err(expression).parse_next(input)?;
            let loc = starting_at(input, start, value.loc);
            args.push(Expr::new(
                ExprKind::Starred {
                    value: Box::new(value),
                    ctx: ExprContext::Load,
                },
                loc,
            ));
        } else if let Some(kw) = opt(keyword_argument).parse_next(input)? {
            if kw.arg.is_some() && keywords.iter().any(|k| k.arg == kw.arg) {
                return syntax_error(input, "keyword argument repeated");
            }
            keywords.push(kw);
        } else {
            let arg = cut_err(named_expression).parse_next(input)?;
            let generators = comprehension_clauses(input)?;
            if !generators.is_empty() {
                ws(input)?;
                if !args.is_empty() || !keywords.is_empty() || opt(')').parse_next(input)?.is_none()
                {
                    return syntax_error(input, "Generator expression must be parenthesized");
                }
                args.push(Expr::new(
                    ExprKind::GeneratorExp {
                        elt: Box::new(arg),
                        generators,
                    },
                    span(input, open),
                ));
                break;
            }
            if keywords.iter().any(|k| k.arg.is_none()) {
                return syntax_error(
                    input,
                    "positional argument follows keyword argument unpacking",
                );
            }
            if !keywords.is_empty() {
                return syntax_error(input, "positional argument follows keyword argument");
            }
            args.push(arg);
        }
        ws(input)?;
        if opt(',').parse_next(input)?.is_none() {
            ws(input)?;
            expect(')').parse_next(input)?;
            break;
        }
    }
    Ok((args, keywords))
}

fn keyword_argument(input: &mut Input<'_>) -> PResult<Keyword> {
    let start = offset(input);
    let arg = terminated(identifier, (ws, '=', not('='))).parse_next(input)?;
    let value = cut_err(expression).parse_next(input)?;
    let loc = starting_at(input, start, value.loc);
    Ok(Keyword {
        arg: Some(arg),
        value,
        loc,
    })
}

fn subscript(input: &mut Input<'_>) -> PResult<Trailer> {
    '['.parse_next(input)?;
    let (items, trailing) = bracketed(input, slice_item, ']')?;
    if items.is_empty() {
        return syntax_error(input, "invalid syntax");
    }
    Ok(Trailer::Index(tuple_or_single(input, items, trailing)?))
}

fn slice_item(input: &mut Input<'_>) -> PResult<Expr> {
    ws(input)?;
    let start = offset(input);
    let lower = opt(expression).parse_next(input)?;
    if opt(preceded(ws, ':')).parse_next(input)?.is_none() {
        return match lower {
            Some(index) => Ok(index),
            None => backtrack(),
        };
    }
    let upper = opt(expression).parse_next(input)?;
    let step = match opt(preceded(ws, ':')).parse_next(input)? {
        Some(_) => opt(expression).parse_next(input)?,
        None => None,
    };
    Ok(Expr::new(
        ExprKind::Slice {
            lower: lower.map(Box::new),
            upper: upper.map(Box::new),
            step: step.map(Box::new),
        },
        span(input, start),
    ))
}

// ============ Comprehensions ============

/// Zero or more `[async] for target in iter (if cond)*` clauses.
fn comprehension_clauses(input: &mut Input<'_>) -> PResult<Vec<Comprehension>> {
    let mut generators = Vec::new();
    while let Some(is_async) = opt(comprehension_for).parse_next(input)? {
        let target = cut_err(target_list).parse_next(input)?;
        let target = store_target(input, target)?;
        cut_err(preceded(ws, keyword("in"))).parse_next(input)?;
        let iter = cut_err(or_test).parse_next(input)?;
        let ifs: Vec<Expr> =
            repeat(0.., preceded((ws, keyword("if")), cut_err(or_test))).parse_next(input)?;
        generators.push(Comprehension {
            target,
            iter,
            ifs,
            is_async,
        });
    }
    Ok(generators)
}

fn comprehension_for(input: &mut Input<'_>) -> PResult<bool> {
    ws(input)?;
    let is_async = opt(terminated(keyword("async"), ws))
        .parse_next(input)?
        .is_some();
    keyword("for").parse_next(input)?;
    Ok(is_async)
}

// ============ Atoms ============

fn atom(input: &mut Input<'_>) -> PResult<Expr> {
    ws(input)?;
    alt((
        parenthesized,
        list_display,
        brace_display,
        strings,
        number,
        ellipsis,
        name_or_constant,
    ))
    .context(StrContext::Expected(StrContextValue::Description("expression")))
    .parse_next(input)
}

/// Contents of a bracketed display after the opening bracket.
enum Display {
    Items(Vec<Expr>, bool),
    Comprehension(Expr, Vec<Comprehension>),
}

fn display(input: &mut Input<'_>, close: char) -> PResult<Display> {
    ws(input)?;
    if opt(close).parse_next(input)?.is_some() {
        return Ok(Display::Items(Vec::new(), false));
    }
    let first = cut_err(star_named_expression).parse_next(input)?;
    display_after(input, first, close)
}

fn display_after(input: &mut Input<'_>, first: Expr, close: char) -> PResult<Display> {
    let generators = comprehension_clauses(input)?;
    if !generators.is_empty() {
        if matches!(first.kind, ExprKind::Starred { .. }) {
            return syntax_error(input, "iterable unpacking cannot be used in comprehension");
        }
        ws(input)?;
        expect(close).parse_next(input)?;
        return Ok(Display::Comprehension(first, generators));
    }
    ws(input)?;
    if opt(close).parse_next(input)?.is_some() {
        return Ok(Display::Items(vec![first], false));
    }
    expect(',').parse_next(input)?;
    let (rest, trailing) = bracketed(input, star_named_expression, close)?;
    let trailing = trailing || rest.is_empty();
    let mut items = vec![first];
    items.extend(rest);
    Ok(Display::Items(items, trailing))
}

fn parenthesized(input: &mut Input<'_>) -> PResult<Expr> {
    let start = offset(input);
    '('.parse_next(input)?;
    if let Some(value) = opt(yield_expr).parse_next(input)? {
        ws(input)?;
        expect(')').parse_next(input)?;
        return Ok(value);
    }
    let kind = match display(input, ')')? {
        Display::Comprehension(elt, generators) => ExprKind::GeneratorExp {
            elt: Box::new(elt),
            generators,
        },
        Display::Items(mut items, false) if items.len() == 1 => {
            let Some(single) = items.pop() else {
                return backtrack();
            };
            if matches!(single.kind, ExprKind::Starred { .. }) {
                return syntax_error(input, "cannot use starred expression here");
            }
            // `(x)` keeps the inner node's span
            return Ok(single);
        }
        Display::Items(elts, _) => ExprKind::Tuple {
            elts,
            ctx: ExprContext::Load,
        },
    };
    Ok(Expr::new(kind, span(input, start)))
}

fn list_display(input: &mut Input<'_>) -> PResult<Expr> {
    let start = offset(input);
    '['.parse_next(input)?;
    let kind = match display(input, ']')? {
        Display::Comprehension(elt, generators) => ExprKind::ListComp {
            elt: Box::new(elt),
            generators,
        },
        Display::Items(elts, _) => ExprKind::List {
            elts,
            ctx: ExprContext::Load,
        },
    };
    Ok(Expr::new(kind, span(input, start)))
}

/// Dict and set displays and their comprehensions.
fn brace_display(input: &mut Input<'_>) -> PResult<Expr> {
    let start = offset(input);
    '{'.parse_next(input)?;
    ws(input)?;
    if opt('}').parse_next(input)?.is_some() {
        let empty = ExprKind::Dict {
            keys: Vec::new(),
            values: Vec::new(),
        };
        return Ok(Expr::new(empty, span(input, start)));
    }

    let first_key = if opt("**").parse_next(input)?.is_some() {
        None
    } else {
        let first = cut_err(star_named_expression).parse_next(input)?;
        ws(input)?;
        let is_entry = !matches!(first.kind, ExprKind::Starred { .. })
            && opt(':').parse_next(input)?.is_some();
        if !is_entry {
            let kind = match display_after(input, first, '}')? {
                Display::Comprehension(elt, generators) => ExprKind::SetComp {
                    elt: Box::new(elt),
                    generators,
                },
                Display::Items(elts, _) => ExprKind::Set { elts },
            };
            return Ok(Expr::new(kind, span(input, start)));
        }
        Some(first)
    };

    let first_value = match first_key {
        Some(_) => cut_err(expression).parse_next(input)?,
        None => cut_err(bit_or).parse_next(input)?,
    };
    let generators = comprehension_clauses(input)?;
    if !generators.is_empty() {
        let Some(key) = first_key else {
            return syntax_error(input, "dict unpacking cannot be used in dict comprehension");
        };
        ws(input)?;
        expect('}').parse_next(input)?;
        let kind = ExprKind::DictComp {
            key: Box::new(key),
            value: Box::new(first_value),
            generators,
        };
        return Ok(Expr::new(kind, span(input, start)));
    }

    let mut keys = vec![first_key];
    let mut values = vec![first_value];
    loop {
        ws(input)?;
        if opt(',').parse_next(input)?.is_none() {
            expect('}').parse_next(input)?;
            break;
        }
        ws(input)?;
        if opt('}').parse_next(input)?.is_some() {
            break;
        }
        if opt("**").parse_next(input)?.is_some() {
            keys.push(None);
            values.push(cut_err(bit_or).parse_next(input)?);
            continue;
        }
        keys.push(Some(cut_err(expression).parse_next(input)?));
        ws(input)?;
        cut_err(':')
            .context(StrContext::Label("':' expected after dictionary key"))
            .parse_next(input)?;
        values.push(cut_err(expression).parse_next(input)?);
    }
    Ok(Expr::new(ExprKind::Dict { keys, values }, span(input, start)))
}

fn ellipsis(input: &mut Input<'_>) -> PResult<Expr> {
    let start = offset(input);
    "...".parse_next(input)?;
    Ok(constant(Constant::Ellipsis, None, span(input, start)))
}

fn name_or_constant(input: &mut Input<'_>) -> PResult<Expr> {
    let start = offset(input);
    let w = word.parse_next(input)?;
    let value = match w {
        "True" => Constant::Bool(true),
        "False" => Constant::Bool(false),
        "None" => Constant::None,
        w if is_keyword(w) => return backtrack(),
        w => {
            let kind = ExprKind::Name {
                id: w.to_string(),
                ctx: ExprContext::Load,
            };
            return Ok(Expr::new(kind, span(input, start)));
        }
    };
    Ok(constant(value, None, span(input, start)))
}

fn constant(value: Constant, kind: Option<String>, loc: Location) -> Expr {
    Expr::new(ExprKind::Constant { value, kind }, loc)
}

fn number(input: &mut Input<'_>) -> PResult<Expr> {
    let start = offset(input);
    let Some((len, scanned)) = scan_number(input.input) else {
        return backtrack();
    };
    match scanned {
        Ok(value) => {
            input.next_slice(len);
            Ok(constant(value, None, span(input, start)))
        }
        Err(message) => syntax_error(input, message),
    }
}

// ============ Strings ============

enum Literal {
    Text(String),
    Bytes(Vec<u8>),
    Format(Vec<Segment>),
}

/// f-string part with its field expressions parsed.
enum Segment {
    Text(String),
    Field {
        value: Expr,
        conversion: i64,
        spec: Option<Vec<Segment>>,
    },
}

/// Adjacent string literals, concatenated. Any f-string among them makes
/// the whole run a `JoinedStr`.
fn strings(input: &mut Input<'_>) -> PResult<Expr> {
    let start = offset(input);
    let (first, unicode) = string_piece(input)?;
    let mut pieces = vec![first];
    while let Some((next, _)) = opt(preceded(ws, string_piece)).parse_next(input)? {
        pieces.push(next);
    }
    let loc = span(input, start);

    let is_bytes = matches!(pieces[0], Literal::Bytes(_));
    if pieces
        .iter()
        .any(|piece| matches!(piece, Literal::Bytes(_)) != is_bytes)
    {
        return syntax_error(input, "cannot mix bytes and nonbytes literals");
    }
    if is_bytes {
        let mut bytes = Vec::new();
        for piece in pieces {
            if let Literal::Bytes(b) = piece {
                bytes.extend(b);
            }
        }
        return Ok(constant(Constant::Bytes(bytes), None, loc));
    }

    if !pieces.iter().any(|piece| matches!(piece, Literal::Format(_))) {
        let mut text = String::new();
        for piece in pieces {
            if let Literal::Text(s) = piece {
                text.push_str(&s);
            }
        }
        let kind = unicode.then(|| "u".to_string());
        return Ok(constant(Constant::Str(text), kind, loc));
    }

    let mut segments = Vec::new();
    for piece in pieces {
        match piece {
            Literal::Text(s) => segments.push(Segment::Text(s)),
            Literal::Format(parts) => segments.extend(parts),
            Literal::Bytes(_) => {}
        }
    }
    let values = joined(segments, loc);
    Ok(Expr::new(ExprKind::JoinedStr { values }, loc))
}

/// `JoinedStr` values: runs of text merged into one constant. Every part
/// carries the span of the whole literal.
fn joined(segments: Vec<Segment>, loc: Location) -> Vec<Expr> {
    let mut values = Vec::new();
    let mut text = String::new();
    for segment in segments {
        match segment {
            Segment::Text(s) => text.push_str(&s),
            Segment::Field {
                value,
                conversion,
                spec,
            } => {
                if !text.is_empty() {
                    values.push(constant(Constant::Str(std::mem::take(&mut text)), None, loc));
                }
                let format_spec = spec.map(|spec| {
                    let values = joined(spec, loc);
                    Box::new(Expr::new(ExprKind::JoinedStr { values }, loc))
                });
                let kind = ExprKind::FormattedValue {
                    value: Box::new(value),
                    conversion,
                    format_spec,
                };
                values.push(Expr::new(kind, loc));
            }
        }
    }
    if !text.is_empty() {
        values.push(constant(Constant::Str(text), None, loc));
    }
    values
}

fn string_piece(input: &mut Input<'_>) -> PResult<(Literal, bool)> {
    let at = offset(input);
    let text = input.input;
    let Some((len, scanned)) = scan_string(text) else {
        return backtrack();
    };
    let piece = match scanned {
        Ok(piece) => piece,
        Err(message) => return syntax_error(input, message),
    };
    let value = match piece.value {
        Piece::Text(s) => Literal::Text(s),
        Piece::Bytes(b) => Literal::Bytes(b),
        Piece::Format(parts) => Literal::Format(segments(input, text, at, parts)?),
    };
    input.next_slice(len);
    Ok((value, piece.unicode))
}

fn segments<'a>(
    input: &Input<'a>,
    literal: &'a str,
    at: usize,
    parts: Vec<FormatPart>,
) -> PResult<Vec<Segment>> {
    let mut out = Vec::with_capacity(parts.len());
    for part in parts {
        out.push(match part {
            FormatPart::Text(s) => Segment::Text(s),
            FormatPart::Field(field) => Segment::Field {
                value: field_expression(input, literal, at, field.expr)?,
                conversion: field.conversion.map_or(-1, |c| i64::from(u32::from(c))),
                spec: field
                    .spec
                    .map(|spec| segments(input, literal, at, spec))
                    .transpose()?,
            },
        });
    }
    Ok(out)
}

/// Parse the expression of a replacement field in place, so its nodes get
/// their real source positions.
fn field_expression<'a>(
    input: &Input<'a>,
    literal: &'a str,
    at: usize,
    range: Range<usize>,
) -> PResult<Expr> {
    let mut field = Stateful {
        input: &literal[range.clone()],
        state: Cursor {
            end: at + range.end,
            index: input.state.index,
            nesting: input.state.nesting,
        },
    };
    let value = nested(assigned_value).parse_next(&mut field)?;
    ws(&mut field)?;
    cut_err(eof)
        .context(StrContext::Label("f-string: expecting '}'"))
        .parse_next(&mut field)?;
    Ok(value)
}
