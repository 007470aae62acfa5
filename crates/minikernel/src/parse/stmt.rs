//! Grammar for one logical line
//!
//! A line is a run of `;`-separated simple statements, a decorator, or a
//! compound statement header (`if`, `while`, `for`, `def`, `try`, ...) with
//! an optional inline body. Assignment targets are still in load context
//! here; the block builder validates and converts them.

use winnow::combinator::{alt, cut_err, eof, not, opt, peek, preceded, separated, terminated};
use winnow::error::{ContextError, ErrMode, StrContext, StrContextValue};
use winnow::prelude::*;

use super::expr::{
    Input, PResult, assigned_value, between, bit_or, call_arguments, expression, expression_list,
    identifier, keyword, named_expression, offset, parameters, span, syntax_error,
    target_error, target_list, ws,
};
use crate::ast::{
    Alias, Arguments, Expr, ExprContext, ExprKind, Keyword, Location, Operator, Stmt, StmtKind,
    WithItem,
};

#[derive(Debug)]
pub(super) enum Simple {
    /// A statement needing no block-level checks
    Done(Stmt),
    Expr(Expr),
    /// Targets followed by the assigned value
    Assign(Vec<Expr>),
    AugAssign(Expr, Operator, Expr),
    AnnAssign {
        target: Expr,
        annotation: Expr,
        value: Option<Expr>,
        simple: bool,
    },
    Break(Location),
    Continue(Location),
}

#[derive(Debug)]
pub(super) enum Header {
    If(Expr),
    Elif(Expr),
    Else,
    While(Expr),
    For {
        is_async: bool,
        target: Expr,
        iter: Expr,
    },
    With {
        is_async: bool,
        items: Vec<WithItem>,
    },
    Def {
        is_async: bool,
        name: String,
        args: Arguments,
        returns: Option<Expr>,
    },
    Class {
        name: String,
        bases: Vec<Expr>,
        keywords: Vec<Keyword>,
    },
    Try,
    Except {
        type_: Option<Expr>,
        name: Option<String>,
    },
    Finally,
}

#[derive(Debug)]
pub(super) struct Compound {
    pub header: Header,
    /// Span of the leading keyword
    pub head: Location,
    /// Statements after the colon on the same line
    pub inline: Option<Vec<Simple>>,
}

#[derive(Debug)]
pub(super) enum Line {
    Simple(Vec<Simple>),
    Compound(Compound),
    Decorator(Expr),
}

pub(super) fn logical_line(input: &mut Input<'_>) -> PResult<Line> {
    ws(input)?;
    if opt('@').parse_next(input)?.is_some() {
        let decorator = cut_err(named_expression).parse_next(input)?;
        end_of_line(input)?;
        return Ok(Line::Decorator(decorator));
    }
    let start = offset(input);
    let Some((head_end, header)) = opt(header).parse_next(input)? else {
        return simple_statements.map(Line::Simple).parse_next(input);
    };
    let head = between(input, start, head_end);
    ws(input)?;
    cut_err(':')
        .context(StrContext::Expected(StrContextValue::CharLiteral(':')))
        .parse_next(input)?;
    ws(input)?;
    let inline = match opt(eof).parse_next(input)? {
        Some(_) => None,
        None => Some(simple_statements(input)?),
    };
    Ok(Line::Compound(Compound {
        header,
        head,
        inline,
    }))
}

fn end_of_line(input: &mut Input<'_>) -> PResult<()> {
    ws(input)?;
    cut_err(eof)
        .context(StrContext::Label("invalid syntax"))
        .void()
        .parse_next(input)
}

/// A header keyword: returns the offset just past it.
fn lead<'a>(word: &'static str) -> impl Parser<Input<'a>, usize, ErrMode<ContextError>> {
    move |input: &mut Input<'a>| {
        keyword(word).parse_next(input)?;
        Ok(offset(input))
    }
}

fn header(input: &mut Input<'_>) -> PResult<(usize, Header)> {
    alt((
        (lead("if"), cut_err(named_expression)).map(|(end, test)| (end, Header::If(test))),
        (lead("elif"), cut_err(named_expression)).map(|(end, test)| (end, Header::Elif(test))),
        lead("else").map(|end| (end, Header::Else)),
        (lead("while"), cut_err(named_expression)).map(|(end, test)| (end, Header::While(test))),
        (lead("try"), peek((ws, ':'))).map(|(end, _)| (end, Header::Try)),
        lead("finally").map(|end| (end, Header::Finally)),
        except_header,
        class_header,
        async_header,
    ))
    .parse_next(input)
}

/// `def`, `for` and `with`, each optionally prefixed by `async`.
fn async_header(input: &mut Input<'_>) -> PResult<(usize, Header)> {
    let is_async = opt(terminated(keyword("async"), ws))
        .parse_next(input)?
        .is_some();
    let parsed = if is_async {
        cut_err(alt((def_header, for_header, with_header))).parse_next(input)?
    } else {
        alt((def_header, for_header, with_header)).parse_next(input)?
    };
    let (end, mut header) = parsed;
    match &mut header {
        Header::Def { is_async: flag, .. }
        | Header::For { is_async: flag, .. }
        | Header::With { is_async: flag, .. } => *flag = is_async,
        _ => {}
    }
    Ok((end, header))
}

fn for_header(input: &mut Input<'_>) -> PResult<(usize, Header)> {
    let end = lead("for").parse_next(input)?;
    let target = cut_err(target_list).parse_next(input)?;
    cut_err((ws, keyword("in"))).parse_next(input)?;
    let iter = cut_err(expression_list).parse_next(input)?;
    Ok((
        end,
        Header::For {
            is_async: false,
            target,
            iter,
        },
    ))
}

fn with_header(input: &mut Input<'_>) -> PResult<(usize, Header)> {
    let end = lead("with").parse_next(input)?;
    let items = match opt(parenthesized_with_items).parse_next(input)? {
        Some(items) => items,
        None => separated(1.., with_item, (ws, ',')).parse_next(input)?,
    };
    Ok((
        end,
        Header::With {
            is_async: false,
            items,
        },
    ))
}

/// `with (a as b, c):`; a parenthesized expression is tried afterwards.
fn parenthesized_with_items(input: &mut Input<'_>) -> PResult<Vec<WithItem>> {
    ws(input)?;
    '('.parse_next(input)?;
    let items = separated(1.., with_item, (ws, ',')).parse_next(input)?;
    (ws, opt(','), ws, ')', peek((ws, ':'))).parse_next(input)?;
    Ok(items)
}

fn with_item(input: &mut Input<'_>) -> PResult<WithItem> {
    let context_expr = expression(input)?;
    let optional_vars = opt(preceded((ws, keyword("as")), cut_err(target_list))).parse_next(input)?;
    Ok(WithItem {
        context_expr,
        optional_vars,
    })
}

fn def_header(input: &mut Input<'_>) -> PResult<(usize, Header)> {
    let end = lead("def").parse_next(input)?;
    ws(input)?;
    let name = cut_err(identifier).parse_next(input)?;
    ws(input)?;
    cut_err('(')
        .context(StrContext::Expected(StrContextValue::CharLiteral('(')))
        .parse_next(input)?;
    let args = parameters(input, true, ')')?;
    ws(input)?;
    cut_err(')')
        .context(StrContext::Expected(StrContextValue::CharLiteral(')')))
        .parse_next(input)?;
    let returns = opt(preceded((ws, "->"), cut_err(expression))).parse_next(input)?;
    Ok((
        end,
        Header::Def {
            is_async: false,
            name,
            args,
            returns,
        },
    ))
}

fn class_header(input: &mut Input<'_>) -> PResult<(usize, Header)> {
    let end = lead("class").parse_next(input)?;
    ws(input)?;
    let name = cut_err(identifier).parse_next(input)?;
    ws(input)?;
    let open = offset(input);
    let (bases, keywords) = match opt('(').parse_next(input)? {
        Some(_) => call_arguments(input, open)?,
        None => (Vec::new(), Vec::new()),
    };
    Ok((
        end,
        Header::Class {
            name,
            bases,
            keywords,
        },
    ))
}

fn except_header(input: &mut Input<'_>) -> PResult<(usize, Header)> {
    let end = lead("except").parse_next(input)?;
    ws(input)?;
    if opt('*').parse_next(input)?.is_some() {
        return syntax_error(input, "except* is not supported");
    }
    let Some(type_) = opt(expression).parse_next(input)? else {
        return Ok((
            end,
            Header::Except {
                type_: None,
                name: None,
            },
        ));
    };
    if peek(opt((ws, ','))).parse_next(input)?.is_some() {
        return syntax_error(input, "multiple exception types must be parenthesized");
    }
    let name = opt(preceded((ws, keyword("as"), ws), cut_err(identifier))).parse_next(input)?;
    Ok((
        end,
        Header::Except {
            type_: Some(type_),
            name,
        },
    ))
}

fn simple_statements(input: &mut Input<'_>) -> PResult<Vec<Simple>> {
    let mut statements = vec![cut_err(simple_statement).parse_next(input)?];
    loop {
        ws(input)?;
        if opt(';').parse_next(input)?.is_none() {
            break;
        }
        ws(input)?;
        if opt(eof).parse_next(input)?.is_some() {
            break;
        }
        statements.push(cut_err(simple_statement).parse_next(input)?);
    }
    end_of_line(input)?;
    Ok(statements)
}

fn simple_statement(input: &mut Input<'_>) -> PResult<Simple> {
    ws(input)?;
    let start = offset(input);
    if opt(keyword("break")).parse_next(input)?.is_some() {
        return Ok(Simple::Break(span(input, start)));
    }
    if opt(keyword("continue")).parse_next(input)?.is_some() {
        return Ok(Simple::Continue(span(input, start)));
    }
    if let Some(kind) = opt(keyword_statement).parse_next(input)? {
        return Ok(Simple::Done(Stmt::new(kind, span(input, start))));
    }

    let text = input.input;
    let first = assigned_value(input)?;
    if let Some(op) = opt(preceded(ws, augmented_op)).parse_next(input)? {
        let value = cut_err(assigned_value).parse_next(input)?;
        return Ok(Simple::AugAssign(first, op, value));
    }
    if opt(preceded(ws, terminated(':', not('='))))
        .parse_next(input)?
        .is_some()
    {
        let annotation = cut_err(expression).parse_next(input)?;
        let value = opt(preceded((ws, '='), cut_err(assigned_value))).parse_next(input)?;
        let simple = matches!(first.kind, ExprKind::Name { .. }) && !text.starts_with('(');
        return Ok(Simple::AnnAssign {
            target: first,
            annotation,
            value,
            simple,
        });
    }

    let mut values = Vec::new();
    while opt(preceded(ws, terminated('=', not('='))))
        .parse_next(input)?
        .is_some()
    {
        values.push(cut_err(assigned_value).parse_next(input)?);
    }
    if values.is_empty() {
        return Ok(Simple::Expr(first));
    }
    let mut chain = vec![first];
    chain.extend(values);
    Ok(Simple::Assign(chain))
}

/// Simple statements introduced by a keyword, other than `break` and
/// `continue`.
fn keyword_statement(input: &mut Input<'_>) -> PResult<StmtKind> {
    alt((
        keyword("pass").map(|()| StmtKind::Pass),
        preceded(keyword("return"), cut_err(opt(expression_list)))
            .map(|value| StmtKind::Return { value }),
        preceded(keyword("global"), cut_err(names)).map(|names| StmtKind::Global { names }),
        preceded(keyword("nonlocal"), cut_err(names)).map(|names| StmtKind::Nonlocal { names }),
        preceded(keyword("del"), cut_err(delete_targets))
            .map(|targets| StmtKind::Delete { targets }),
        raise,
        assert,
        import,
        import_from,
    ))
    .parse_next(input)
}

fn names(input: &mut Input<'_>) -> PResult<Vec<String>> {
    separated(1.., preceded(ws, identifier), (ws, ',')).parse_next(input)
}

fn delete_targets(input: &mut Input<'_>) -> PResult<Vec<Expr>> {
    let parsed: Vec<Expr> = separated(1.., bit_or, (ws, ',')).parse_next(input)?;
    opt((ws, ',')).parse_next(input)?;
    let mut targets = Vec::with_capacity(parsed.len());
    for target in parsed {
        match target.into_target(ExprContext::Del) {
            Ok(target) => targets.push(target),
            Err(bad) => return syntax_error(input, target_error(ExprContext::Del, bad.describe())),
        }
    }
    Ok(targets)
}

fn raise(input: &mut Input<'_>) -> PResult<StmtKind> {
    keyword("raise").parse_next(input)?;
    let Some(exc) = opt(expression).parse_next(input)? else {
        return Ok(StmtKind::Raise {
            exc: None,
            cause: None,
        });
    };
    let cause = opt(preceded((ws, keyword("from")), cut_err(expression))).parse_next(input)?;
    Ok(StmtKind::Raise {
        exc: Some(exc),
        cause,
    })
}

fn assert(input: &mut Input<'_>) -> PResult<StmtKind> {
    keyword("assert").parse_next(input)?;
    let test = cut_err(expression).parse_next(input)?;
    let msg = opt(preceded((ws, ','), cut_err(expression))).parse_next(input)?;
    Ok(StmtKind::Assert { test, msg })
}

fn import(input: &mut Input<'_>) -> PResult<StmtKind> {
    keyword("import").parse_next(input)?;
    let names = cut_err(separated(1.., |i: &mut Input<'_>| alias(i, dotted_name), (ws, ',')))
        .parse_next(input)?;
    Ok(StmtKind::Import { names })
}

fn import_from(input: &mut Input<'_>) -> PResult<StmtKind> {
    keyword("from").parse_next(input)?;
    let mut level = 0;
    loop {
        ws(input)?;
        if opt("...").parse_next(input)?.is_some() {
            level += 3;
        } else if opt('.').parse_next(input)?.is_some() {
            level += 1;
        } else {
            break;
        }
    }
    let module = if level == 0 {
        Some(cut_err(dotted_name).parse_next(input)?)
    } else {
        opt(dotted_name).parse_next(input)?
    };
    cut_err((ws, keyword("import"))).parse_next(input)?;
    ws(input)?;
    let start = offset(input);
    let names = if opt('*').parse_next(input)?.is_some() {
        vec![Alias {
            name: "*".to_string(),
            asname: None,
            loc: span(input, start),
        }]
    } else if opt('(').parse_next(input)?.is_some() {
        let names = cut_err(separated(1.., |i: &mut Input<'_>| alias(i, plain_name), (ws, ',')))
            .parse_next(input)?;
        (ws, opt(','), ws).parse_next(input)?;
        cut_err(')')
            .context(StrContext::Expected(StrContextValue::CharLiteral(')')))
            .parse_next(input)?;
        names
    } else {
        let names = cut_err(separated(1.., |i: &mut Input<'_>| alias(i, plain_name), (ws, ',')))
            .parse_next(input)?;
        if peek(opt((ws, ','))).parse_next(input)?.is_some() {
            return syntax_error(input, "trailing comma not allowed without surrounding parentheses");
        }
        names
    };
    Ok(StmtKind::ImportFrom {
        module,
        names,
        level,
    })
}

fn plain_name(input: &mut Input<'_>) -> PResult<String> {
    identifier(input)
}

/// `a.b.c`
fn dotted_name(input: &mut Input<'_>) -> PResult<String> {
    ws(input)?;
    let parts: Vec<String> = separated(1.., identifier, (ws, '.', ws)).parse_next(input)?;
    Ok(parts.join("."))
}

fn alias(
    input: &mut Input<'_>,
    name: fn(&mut Input<'_>) -> PResult<String>,
) -> PResult<Alias> {
    ws(input)?;
    let start = offset(input);
    let name = name(input)?;
    let asname = opt(preceded((ws, keyword("as"), ws), cut_err(identifier))).parse_next(input)?;
    Ok(Alias {
        name,
        asname,
        loc: span(input, start),
    })
}

fn augmented_op(input: &mut Input<'_>) -> PResult<Operator> {
    alt((
        "**=".value(Operator::Pow),
        "//=".value(Operator::FloorDiv),
        ">>=".value(Operator::RShift),
        "<<=".value(Operator::LShift),
        "+=".value(Operator::Add),
        "-=".value(Operator::Sub),
        "*=".value(Operator::Mult),
        "/=".value(Operator::Div),
        "%=".value(Operator::Mod),
        "@=".value(Operator::MatMult),
        "&=".value(Operator::BitAnd),
        "|=".value(Operator::BitOr),
        "^=".value(Operator::BitXor),
    ))
    .parse_next(input)
}

