//! Parser for the kernel's Python subset
//!
//! Source text is first split into logical lines with their indentation
//! (`lines`). Each line is parsed on its own with winnow (`stmt`, `expr`),
//! then the block builder below assembles indented suites into compound
//! statements and checks what a line-local grammar cannot: indentation,
//! `break`/`continue` placement, assignment targets and overall depth.

mod expr;
mod lines;
mod literals;
mod stmt;

use winnow::error::{ContextError, ErrMode, StrContext};
use winnow::prelude::*;
use winnow::stream::Stateful;

use crate::ast::schema;
use crate::ast::{
    ExceptHandler, Expr, ExprContext, ExprKind, Location, Module, NodeRef, Stmt, StmtKind,
    WithItem,
};
use expr::{Cursor, Input};
use lines::{LineIndex, LogicalLine};
use stmt::{Compound, Header, Line, Simple};

/// Nested suites allowed below the module level.
const MAX_BLOCK_DEPTH: usize = 100;

/// Longest root-to-leaf path allowed in a finished tree.
pub const MAX_TREE_DEPTH: usize = 500;

#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub message: String,
    pub offset: usize,
    pub line: usize,
    pub column: usize,
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} (line {}, column {}, offset {})",
            self.message, self.line, self.column, self.offset
        )
    }
}

impl std::error::Error for ParseError {}

impl ParseError {
    pub(crate) fn at(source: &str, offset: usize, message: impl Into<String>) -> Self {
        let (line, column) = offset_to_line_column(source, offset);
        ParseError {
            message: message.into(),
            offset,
            line,
            column,
        }
    }
}

fn offset_to_line_column(input: &str, offset: usize) -> (usize, usize) {
    let bounded = offset.min(input.len());
    let mut line = 1usize;
    let mut column = 1usize;

    for ch in input[..bounded].chars() {
        if ch == '\n' {
            line += 1;
            column = 1;
        } else {
            column += 1;
        }
    }

    (line, column)
}

/// Parse a whole program (`exec` mode).
pub fn parse(source: &str) -> Result<Module, ParseError> {
    let lines = lines::logical_lines(source)?;
    let index = LineIndex::new(source);
    let mut blocks = Blocks {
        source,
        index: &index,
        lines: &lines,
        pos: 0,
    };
    let body = blocks.statements(0, Scope::default())?;
    let module = Module { body };
    check_depth(source, NodeRef::Module(&module))?;
    Ok(module)
}

/// Parse a single expression (`eval` mode). Leading indentation is ignored.
pub fn parse_expression(source: &str) -> Result<Expr, ParseError> {
    let lines = lines::logical_lines(source)?;
    let index = LineIndex::new(source);
    let line = match lines.as_slice() {
        [] => {
            return Err(ParseError::at(
                source,
                source.len(),
                "unexpected EOF while parsing",
            ));
        }
        [line] => *line,
        [_, second, ..] => return Err(ParseError::at(source, second.start, "invalid syntax")),
    };
    let expr = parse_line(source, &index, line, expr::eval_input)?;
    check_depth(source, NodeRef::Expr(&expr))?;
    Ok(expr)
}

fn parse_line<'a, O>(
    source: &'a str,
    index: &'a LineIndex,
    line: LogicalLine,
    mut parser: impl Parser<Input<'a>, O, ErrMode<ContextError>>,
) -> Result<O, ParseError> {
    let mut input = Stateful {
        input: &source[line.start..line.end],
        state: Cursor {
            end: line.end,
            index,
            nesting: 0,
        },
    };
    parser.parse_next(&mut input).map_err(|err| {
        let offset = line.end - input.input.len();
        let message = match err {
            ErrMode::Backtrack(e) | ErrMode::Cut(e) => error_message(&e),
            ErrMode::Incomplete(_) => "unexpected EOF while parsing".to_string(),
        };
        ParseError::at(source, offset, message)
    })
}

fn error_message(error: &ContextError) -> String {
    let mut expected = Vec::new();
    for context in error.context() {
        match context {
            StrContext::Label(label) => return (*label).to_string(),
            StrContext::Expected(value) => expected.push(value.to_string()),
            _ => {}
        }
    }
    if expected.is_empty() {
        "invalid syntax".to_string()
    } else {
        format!("invalid syntax (expected {})", expected.join(" or "))
    }
}

fn check_depth(source: &str, root: NodeRef<'_>) -> Result<(), ParseError> {
    if schema::depth(root) > MAX_TREE_DEPTH {
        return Err(ParseError::at(source, 0, "expression too deeply nested"));
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, Default)]
struct Scope {
    in_loop: bool,
    depth: usize,
}

impl Scope {
    fn enter(self) -> Self {
        Scope {
            depth: self.depth + 1,
            ..self
        }
    }

    fn looping(self) -> Self {
        Scope {
            in_loop: true,
            ..self
        }
    }

    /// Body of a `def` or `class`: loops outside it do not count.
    fn definition(self) -> Self {
        Scope {
            in_loop: false,
            ..self
        }
    }
}

/// Assembles logical lines into nested statement lists.
struct Blocks<'a> {
    source: &'a str,
    index: &'a LineIndex,
    lines: &'a [LogicalLine],
    pos: usize,
}

impl<'a> Blocks<'a> {
    fn error(&self, offset: usize, message: impl Into<String>) -> ParseError {
        ParseError::at(self.source, offset, message)
    }

    fn error_at(&self, loc: Location, message: impl Into<String>) -> ParseError {
        self.error(self.index.offset(loc.lineno, loc.col_offset), message)
    }

    /// Offset of the next unread line, or the end of the source.
    fn next_offset(&self) -> usize {
        self.lines
            .get(self.pos)
            .map_or(self.source.len(), |line| line.start)
    }

    fn next_line(&mut self) -> Result<(LogicalLine, Line), ParseError> {
        let line = self.lines[self.pos];
        self.pos += 1;
        let parsed = parse_line(self.source, self.index, line, stmt::logical_line)?;
        Ok((line, parsed))
    }

    /// Statements at exactly `indent`, up to the first shallower line.
    fn statements(&mut self, indent: usize, scope: Scope) -> Result<Vec<Stmt>, ParseError> {
        let mut body = Vec::new();
        let mut decorators = Vec::new();
        while let Some(line) = self.lines.get(self.pos).copied() {
            if line.indent < indent {
                break;
            }
            if line.indent > indent {
                return Err(self.error(line.start, "unexpected indent"));
            }
            match self.next_line()? {
                (_, Line::Decorator(decorator)) => decorators.push(decorator),
                (line, Line::Compound(compound)) => {
                    let decorators = std::mem::take(&mut decorators);
                    body.push(self.compound(compound, decorators, line, indent, scope)?);
                }
                (line, Line::Simple(_)) if !decorators.is_empty() => {
                    return Err(self.error(line.start, "invalid syntax"));
                }
                (_, Line::Simple(simple)) => {
                    for s in simple {
                        body.push(self.simple(s, scope)?);
                    }
                }
            }
        }
        if !decorators.is_empty() {
            return Err(self.error(self.next_offset(), "invalid syntax"));
        }
        Ok(body)
    }

    /// Body of a compound statement: inline statements or an indented block.
    fn suite(
        &mut self,
        inline: Option<Vec<Simple>>,
        header: LogicalLine,
        indent: usize,
        scope: Scope,
    ) -> Result<Vec<Stmt>, ParseError> {
        let scope = scope.enter();
        if scope.depth > MAX_BLOCK_DEPTH {
            return Err(self.error(header.start, "too many levels of indentation"));
        }
        if let Some(simple) = inline {
            return simple.into_iter().map(|s| self.simple(s, scope)).collect();
        }

        let Some(first) = self.lines.get(self.pos).copied() else {
            return Err(self.error(self.source.len(), "expected an indented block"));
        };
        if first.indent <= indent {
            return Err(self.error(first.start, "expected an indented block"));
        }
        let body = self.statements(first.indent, scope)?;
        if let Some(after) = self.lines.get(self.pos)
            && after.indent > indent
        {
            return Err(self.error(
                after.start,
                "unindent does not match any outer indentation level",
            ));
        }
        Ok(body)
    }

    /// Consume a clause (`elif`, `else`, `except`, `finally`) continuing the
    /// statement at `indent`.
    fn clause(&mut self, indent: usize, words: &[&str]) -> Result<Option<(LogicalLine, Compound)>, ParseError> {
        let Some(line) = self.lines.get(self.pos).copied() else {
            return Ok(None);
        };
        let text = &self.source[line.start..line.end];
        if line.indent != indent || !words.iter().any(|w| starts_with_keyword(text, w)) {
            return Ok(None);
        }
        match self.next_line()? {
            (line, Line::Compound(compound)) => Ok(Some((line, compound))),
            (line, _) => Err(self.error(line.start, "invalid syntax")),
        }
    }

    fn else_suite(&mut self, indent: usize, scope: Scope) -> Result<Vec<Stmt>, ParseError> {
        match self.clause(indent, &["else"])? {
            Some((line, Compound { inline, .. })) => self.suite(inline, line, indent, scope),
            None => Ok(Vec::new()),
        }
    }

    fn compound(
        &mut self,
        compound: Compound,
        decorator_list: Vec<Expr>,
        line: LogicalLine,
        indent: usize,
        scope: Scope,
    ) -> Result<Stmt, ParseError> {
        let Compound {
            header,
            head,
            inline,
        } = compound;
        if !decorator_list.is_empty() && !matches!(header, Header::Def { .. } | Header::Class { .. })
        {
            return Err(self.error(line.start, "invalid syntax"));
        }
        match header {
            Header::If(test) => self.if_chain(test, head, inline, line, indent, scope),
            Header::While(test) => {
                let body = self.suite(inline, line, indent, scope.looping())?;
                let orelse = self.else_suite(indent, scope)?;
                let loc = head.to(last_loc(&body, &orelse, head));
                Ok(Stmt::new(StmtKind::While { test, body, orelse }, loc))
            }
            Header::For {
                is_async,
                target,
                iter,
            } => {
                let target = self.store(target)?;
                let body = self.suite(inline, line, indent, scope.looping())?;
                let orelse = self.else_suite(indent, scope)?;
                let loc = head.to(last_loc(&body, &orelse, head));
                Ok(Stmt::new(
                    StmtKind::For {
                        is_async,
                        target,
                        iter,
                        body,
                        orelse,
                    },
                    loc,
                ))
            }
            Header::With { is_async, items } => {
                let items = items
                    .into_iter()
                    .map(|item| {
                        Ok(WithItem {
                            optional_vars: item.optional_vars.map(|t| self.store(t)).transpose()?,
                            context_expr: item.context_expr,
                        })
                    })
                    .collect::<Result<Vec<_>, ParseError>>()?;
                let body = self.suite(inline, line, indent, scope)?;
                let loc = head.to(last_loc(&body, &[], head));
                Ok(Stmt::new(
                    StmtKind::With {
                        is_async,
                        items,
                        body,
                    },
                    loc,
                ))
            }
            Header::Def {
                is_async,
                name,
                args,
                returns,
            } => {
                let body = self.suite(inline, line, indent, scope.definition())?;
                let loc = head.to(last_loc(&body, &[], head));
                Ok(Stmt::new(
                    StmtKind::FunctionDef {
                        is_async,
                        name,
                        args: Box::new(args),
                        body,
                        decorator_list,
                        returns,
                    },
                    loc,
                ))
            }
            Header::Class {
                name,
                bases,
                keywords,
            } => {
                let body = self.suite(inline, line, indent, scope.definition())?;
                let loc = head.to(last_loc(&body, &[], head));
                Ok(Stmt::new(
                    StmtKind::ClassDef {
                        name,
                        bases,
                        keywords,
                        body,
                        decorator_list,
                    },
                    loc,
                ))
            }
            Header::Try => self.try_statement(head, inline, line, indent, scope),
            Header::Elif(_) | Header::Else | Header::Except { .. } | Header::Finally => {
                Err(self.error(line.start, "invalid syntax"))
            }
        }
    }

    fn if_chain(
        &mut self,
        test: Expr,
        head: Location,
        inline: Option<Vec<Simple>>,
        line: LogicalLine,
        indent: usize,
        scope: Scope,
    ) -> Result<Stmt, ParseError> {
        let body = self.suite(inline, line, indent, scope)?;
        let orelse = match self.clause(indent, &["elif", "else"])? {
            Some((line, Compound { header: Header::Elif(test), head, inline })) => {
                vec![self.if_chain(test, head, inline, line, indent, scope)?]
            }
            Some((line, Compound { inline, .. })) => self.suite(inline, line, indent, scope)?,
            None => Vec::new(),
        };
        let loc = head.to(last_loc(&body, &orelse, head));
        Ok(Stmt::new(StmtKind::If { test, body, orelse }, loc))
    }

    fn try_statement(
        &mut self,
        head: Location,
        inline: Option<Vec<Simple>>,
        line: LogicalLine,
        indent: usize,
        scope: Scope,
    ) -> Result<Stmt, ParseError> {
        let body = self.suite(inline, line, indent, scope)?;
        let mut handlers: Vec<ExceptHandler> = Vec::new();
        while let Some((line, clause)) = self.clause(indent, &["except"])? {
            let Header::Except { type_, name } = clause.header else {
                return Err(self.error(line.start, "invalid syntax"));
            };
            if handlers.last().is_some_and(|h| h.type_.is_none()) {
                return Err(self.error(line.start, "default 'except:' must be last"));
            }
            let handler_body = self.suite(clause.inline, line, indent, scope)?;
            let loc = clause.head.to(last_loc(&handler_body, &[], clause.head));
            handlers.push(ExceptHandler {
                type_,
                name,
                body: handler_body,
                loc,
            });
        }
        let orelse = if handlers.is_empty() {
            Vec::new()
        } else {
            self.else_suite(indent, scope)?
        };
        let finalbody = match self.clause(indent, &["finally"])? {
            Some((line, Compound { inline, .. })) => self.suite(inline, line, indent, scope)?,
            None => Vec::new(),
        };
        if handlers.is_empty() && finalbody.is_empty() {
            return Err(self.error(self.next_offset(), "expected 'except' or 'finally' block"));
        }
        let end = finalbody
            .last()
            .or(orelse.last())
            .map(|stmt| stmt.loc)
            .or(handlers.last().map(|handler| handler.loc))
            .unwrap_or_else(|| last_loc(&body, &[], head));
        Ok(Stmt::new(
            StmtKind::Try {
                body,
                handlers,
                orelse,
                finalbody,
            },
            head.to(end),
        ))
    }

    fn simple(&self, simple: Simple, scope: Scope) -> Result<Stmt, ParseError> {
        Ok(match simple {
            Simple::Done(stmt) => stmt,
            Simple::Expr(value) => {
                let loc = value.loc;
                Stmt::new(StmtKind::Expr { value }, loc)
            }
            Simple::Assign(mut chain) => {
                let Some(value) = chain.pop() else {
                    return Err(self.error(0, "invalid syntax"));
                };
                let targets = chain
                    .into_iter()
                    .map(|target| self.store(target))
                    .collect::<Result<Vec<_>, _>>()?;
                let loc = targets.first().map_or(value.loc, |t| t.loc.to(value.loc));
                Stmt::new(StmtKind::Assign { targets, value }, loc)
            }
            Simple::AugAssign(target, op, value) => {
                if !matches!(
                    target.kind,
                    ExprKind::Name { .. } | ExprKind::Attribute { .. } | ExprKind::Subscript { .. }
                ) {
                    return Err(self.error_at(
                        target.loc,
                        format!(
                            "'{}' is an illegal expression for augmented assignment",
                            target.describe()
                        ),
                    ));
                }
                let target = self.store(target)?;
                let loc = target.loc.to(value.loc);
                Stmt::new(StmtKind::AugAssign { target, op, value }, loc)
            }
            Simple::AnnAssign {
                target,
                annotation,
                value,
                simple,
            } => {
                let illegal = match target.kind {
                    ExprKind::Name { .. } | ExprKind::Attribute { .. } | ExprKind::Subscript { .. } => None,
                    ExprKind::Tuple { .. } => Some("only single target (not tuple) can be annotated"),
                    ExprKind::List { .. } => Some("only single target (not list) can be annotated"),
                    _ => Some("illegal target for annotation"),
                };
                if let Some(message) = illegal {
                    return Err(self.error_at(target.loc, message));
                }
                let target = self.store(target)?;
                let end = value.as_ref().map_or(annotation.loc, |value| value.loc);
                let loc = target.loc.to(end);
                Stmt::new(
                    StmtKind::AnnAssign {
                        target,
                        annotation,
                        value,
                        simple,
                    },
                    loc,
                )
            }
            Simple::Break(loc) => {
                if !scope.in_loop {
                    return Err(self.error_at(loc, "'break' outside loop"));
                }
                Stmt::new(StmtKind::Break, loc)
            }
            Simple::Continue(loc) => {
                if !scope.in_loop {
                    return Err(self.error_at(loc, "'continue' not properly in loop"));
                }
                Stmt::new(StmtKind::Continue, loc)
            }
        })
    }

    /// Convert an expression to an assignment target.
    fn store(&self, target: Expr) -> Result<Expr, ParseError> {
        target
            .into_target(ExprContext::Store)
            .map_err(|bad| self.error_at(bad.loc, expr::target_error(ExprContext::Store, bad.describe())))
    }
}

fn last_loc(body: &[Stmt], orelse: &[Stmt], fallback: Location) -> Location {
    orelse
        .last()
        .or(body.last())
        .map_or(fallback, |stmt| stmt.loc)
}

fn starts_with_keyword(text: &str, word: &str) -> bool {
    text.strip_prefix(word)
        .is_some_and(|rest| !rest.starts_with(|c: char| c.is_alphanumeric() || c == '_'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{BoolOp, CmpOp, Constant, Operator, UnaryOp};

    fn expr(source: &str) -> ExprKind {
        parse_expression(source).unwrap().kind
    }

    fn first_stmt(source: &str) -> StmtKind {
        parse(source).unwrap().body.remove(0).kind
    }

    #[test]
    fn empty_source_is_empty_module() {
        assert!(parse("").unwrap().body.is_empty());
        assert!(parse("\n# only a comment\n\n").unwrap().body.is_empty());
    }

    #[test]
    fn operator_precedence() {
        let ExprKind::BinOp { left, op, .. } = expr("a * b + c") else {
            panic!("expected BinOp");
        };
        assert_eq!(op, Operator::Add);
        assert!(matches!(left.kind, ExprKind::BinOp { op: Operator::Mult, .. }));

        let ExprKind::UnaryOp { op, operand } = expr("-2 ** 2") else {
            panic!("expected UnaryOp");
        };
        assert_eq!(op, UnaryOp::USub);
        assert!(matches!(operand.kind, ExprKind::BinOp { op: Operator::Pow, .. }));
    }

    #[test]
    fn power_is_right_associative() {
        let ExprKind::BinOp { right, .. } = expr("2 ** 3 ** 2") else {
            panic!("expected BinOp");
        };
        assert!(matches!(right.kind, ExprKind::BinOp { op: Operator::Pow, .. }));
    }

    #[test]
    fn bool_ops_flatten() {
        let ExprKind::BoolOp { op, values } = expr("a or b or c and d") else {
            panic!("expected BoolOp");
        };
        assert_eq!(op, BoolOp::Or);
        assert_eq!(values.len(), 3);
        assert!(matches!(values[2].kind, ExprKind::BoolOp { op: BoolOp::And, .. }));
    }

    #[test]
    fn chained_comparison() {
        let ExprKind::Compare { ops, comparators, .. } = expr("a < b <= c not in d is not e")
        else {
            panic!("expected Compare");
        };
        assert_eq!(ops, vec![CmpOp::Lt, CmpOp::LtE, CmpOp::NotIn, CmpOp::IsNot]);
        assert_eq!(comparators.len(), 4);
    }

    #[test]
    fn calls_with_keywords() {
        let ExprKind::Call { args, keywords, .. } = expr("f(1, x, sep='-',)") else {
            panic!("expected Call");
        };
        assert_eq!(args.len(), 2);
        assert_eq!(keywords[0].arg.as_deref(), Some("sep"));
        assert!(parse_expression("f(a=1, 2)").is_err());
        assert!(parse_expression("f(a=1, a=2)").is_err());
    }

    #[test]
    fn subscripts_and_slices() {
        let ExprKind::Subscript { slice, .. } = expr("x[1:2]") else {
            panic!("expected Subscript");
        };
        assert!(matches!(slice.kind, ExprKind::Slice { step: None, .. }));

        let ExprKind::Subscript { slice, .. } = expr("x[::2]") else {
            panic!("expected Subscript");
        };
        let ExprKind::Slice { lower, upper, step } = slice.kind else {
            panic!("expected Slice");
        };
        assert!(lower.is_none() && upper.is_none() && step.is_some());

        let ExprKind::Subscript { slice, .. } = expr("df[['a', 'b']]") else {
            panic!("expected Subscript");
        };
        assert!(matches!(slice.kind, ExprKind::List { .. }));
    }

    #[test]
    fn tuples_and_parens() {
        assert!(matches!(expr("(1)"), ExprKind::Constant { .. }));
        assert!(matches!(expr("(1,)"), ExprKind::Tuple { .. }));
        assert!(matches!(expr("()"), ExprKind::Tuple { ref elts, .. } if elts.is_empty()));
        assert!(matches!(expr("1, 2"), ExprKind::Tuple { ref elts, .. } if elts.len() == 2));
    }

    #[test]
    fn adjacent_strings_concatenate() {
        assert!(matches!(
            expr("'ab' \"cd\""),
            ExprKind::Constant { value: Constant::Str(ref s), .. } if s == "abcd"
        ));
        assert!(parse_expression("'a' b'b'").is_err());
        assert!(matches!(
            expr("'é' + 'ü'"),
            ExprKind::BinOp { op: Operator::Add, .. }
        ));
    }

    #[test]
    fn dict_display() {
        let ExprKind::Dict { keys, values } = expr("{'a': 1, 'b': [2]}") else {
            panic!("expected Dict");
        };
        assert_eq!(keys.len(), 2);
        assert_eq!(values.len(), 2);
        assert!(matches!(expr("{1, 2}"), ExprKind::Set { ref elts } if elts.len() == 2));
        assert!(matches!(expr("{}"), ExprKind::Dict { ref keys, .. } if keys.is_empty()));

        let ExprKind::Dict { keys, .. } = expr("{**a, 'k': 1}") else {
            panic!("expected Dict");
        };
        assert!(keys[0].is_none() && keys[1].is_some());
        assert!(parse_expression("{'a' 1}").is_err());
        assert!(parse_expression("{**a for a in b}").is_err());
    }

    #[test]
    fn assignment_targets_are_store() {
        let StmtKind::Assign { targets, .. } = first_stmt("a = b, c = 1, 2") else {
            panic!("expected Assign");
        };
        assert_eq!(targets.len(), 2);
        assert_eq!(targets[0].ctx(), Some(ExprContext::Store));
        let ExprKind::Tuple { elts, .. } = &targets[1].kind else {
            panic!("expected Tuple target");
        };
        assert!(elts.iter().all(|e| e.ctx() == Some(ExprContext::Store)));
    }

    #[test]
    fn invalid_assignment_targets() {
        assert_eq!(parse("1 = x").unwrap_err().message, "cannot assign to literal");
        assert_eq!(parse("f() = x").unwrap_err().message, "cannot assign to function call");
        assert!(parse("(a, b) += 1").is_err());
    }

    #[test]
    fn augmented_assignment() {
        let StmtKind::AugAssign { target, op, .. } = first_stmt("x[0] //= 2") else {
            panic!("expected AugAssign");
        };
        assert_eq!(op, Operator::FloorDiv);
        assert_eq!(target.ctx(), Some(ExprContext::Store));
    }

    #[test]
    fn if_elif_else_nests() {
        let source = "if a:\n    x = 1\nelif b:\n    x = 2\nelse:\n    x = 3\n";
        let StmtKind::If { orelse, .. } = first_stmt(source) else {
            panic!("expected If");
        };
        let StmtKind::If { orelse: inner, .. } = &orelse[0].kind else {
            panic!("expected nested If");
        };
        assert_eq!(inner.len(), 1);
        assert_eq!(orelse[0].loc.lineno, 3);
    }

    #[test]
    fn compound_location_spans_body() {
        let module = parse("for i in range(3):\n    total += i\n").unwrap();
        let loc = module.body[0].loc;
        assert_eq!((loc.lineno, loc.col_offset), (1, 0));
        assert_eq!((loc.end_lineno, loc.end_col_offset), (2, 14));
    }

    #[test]
    fn inline_suites_and_semicolons() {
        let module = parse("while x: x -= 1; y = 2\nz = 3; pass").unwrap();
        assert_eq!(module.body.len(), 3);
        let StmtKind::While { body, .. } = &module.body[0].kind else {
            panic!("expected While");
        };
        assert_eq!(body.len(), 2);
    }

    #[test]
    fn loop_control_outside_loop() {
        assert_eq!(parse("break").unwrap_err().message, "'break' outside loop");
        assert!(parse("if x:\n    continue").is_err());
        assert!(parse("while x:\n    if y:\n        break").is_ok());
        assert!(parse("for a in b:\n    pass\nelse:\n    break").is_err());
    }

    #[test]
    fn indentation_errors() {
        assert_eq!(parse("  x = 1").unwrap_err().message, "unexpected indent");
        assert_eq!(
            parse("if x:\ny = 1").unwrap_err().message,
            "expected an indented block"
        );
        assert_eq!(
            parse("if x:\n    y = 1\n  z = 2").unwrap_err().message,
            "unindent does not match any outer indentation level"
        );
        assert!(parse("else:\n    pass").is_err());
    }

    #[test]
    fn syntax_error_positions() {
        let err = parse("x = 1\ny = (").unwrap_err();
        assert_eq!(err.line, 2);
        assert_eq!(err.offset, 10);
        assert!(parse("x = = 1").is_err());
        assert!(parse("lambda: ").is_err());
        assert_eq!(
            parse("f'{}'").unwrap_err().message,
            "f-string: empty expression not allowed"
        );
    }

    #[test]
    fn eval_mode_rejects_statements() {
        assert!(parse_expression("x = 1").is_err());
        assert!(parse_expression("a\nb").is_err());
        assert!(parse_expression("").is_err());
        assert!(parse_expression("  1 + 1  ").is_ok());
    }

    #[test]
    fn nesting_limits() {
        let deep = format!("{}1{}", "(".repeat(60), ")".repeat(60));
        assert_eq!(
            parse_expression(&deep).unwrap_err().message,
            "expression too deeply nested"
        );
        let unary = format!("{}x", "- ".repeat(60));
        assert_eq!(
            parse_expression(&unary).unwrap_err().message,
            "expression too deeply nested"
        );
        let chain = vec!["1"; 600].join(" + ");
        assert_eq!(
            parse(&chain).unwrap_err().message,
            "expression too deeply nested"
        );
        assert!(parse(&vec!["1"; 100].join(" + ")).is_ok());
    }

    #[test]
    fn power_chains_are_depth_limited() {
        for n in [1000, 8000] {
            let source = format!("x = 2{}", "**2".repeat(n));
            let err = parse(&source).unwrap_err();
            assert_eq!(err.message, "expression too deeply nested");
        }
        assert!(parse(&format!("x = 2{}", "**2".repeat(20))).is_ok());
    }

    #[test]
    fn lambdas_and_named_expressions() {
        let ExprKind::Lambda { args, body } = expr("lambda x, y=1, *rest, k, **kw: x + k") else {
            panic!("expected Lambda");
        };
        assert_eq!(args.args.len(), 2);
        assert_eq!(args.defaults.len(), 1);
        assert_eq!(args.vararg.as_ref().map(|a| a.arg.as_str()), Some("rest"));
        assert_eq!(args.kwonlyargs[0].arg, "k");
        assert_eq!(args.kw_defaults, vec![None]);
        assert!(args.kwarg.is_some());
        assert!(matches!(body.kind, ExprKind::BinOp { .. }));
        assert!(matches!(expr("lambda: 0"), ExprKind::Lambda { .. }));

        let StmtKind::If { test, .. } = first_stmt("if (n := len(a)) > 10:\n    pass") else {
            panic!("expected If");
        };
        let ExprKind::Compare { left, .. } = test.kind else {
            panic!("expected Compare");
        };
        let ExprKind::NamedExpr { target, .. } = left.kind else {
            panic!("expected NamedExpr");
        };
        assert_eq!(target.ctx(), Some(ExprContext::Store));
        assert_eq!((target.loc.col_offset, target.loc.end_col_offset), (4, 5));
        assert!(parse("x := 1").is_err());
    }

    #[test]
    fn comprehensions() {
        let ExprKind::ListComp { elt, generators } = expr("[x * 2 for x in xs if x if x > 1]")
        else {
            panic!("expected ListComp");
        };
        assert!(matches!(elt.kind, ExprKind::BinOp { .. }));
        assert_eq!(generators.len(), 1);
        assert_eq!(generators[0].ifs.len(), 2);
        assert_eq!(generators[0].target.ctx(), Some(ExprContext::Store));

        let ExprKind::DictComp { generators, .. } = expr("{k: v for k, v in d.items()}") else {
            panic!("expected DictComp");
        };
        assert!(matches!(generators[0].target.kind, ExprKind::Tuple { .. }));
        assert!(matches!(expr("{x for x in y}"), ExprKind::SetComp { .. }));
        assert!(matches!(
            expr("[y for x in a for y in x]"),
            ExprKind::ListComp { ref generators, .. } if generators.len() == 2
        ));

        let ExprKind::Call { args, .. } = expr("sum(x for x in xs)") else {
            panic!("expected Call");
        };
        assert!(matches!(args[0].kind, ExprKind::GeneratorExp { .. }));
        assert_eq!((args[0].loc.col_offset, args[0].loc.end_col_offset), (3, 18));
        assert_eq!(
            parse_expression("f(x for x in y, 1)").unwrap_err().message,
            "Generator expression must be parenthesized"
        );
        assert_eq!(
            parse_expression("[f() for f() in a]").unwrap_err().message,
            "cannot assign to function call"
        );
        assert!(matches!(expr("(x for x in y)"), ExprKind::GeneratorExp { .. }));
    }

    #[test]
    fn starred_items_and_unpacking() {
        let ExprKind::Call { args, keywords, .. } = expr("f(a, *b, c=1, **d)") else {
            panic!("expected Call");
        };
        assert!(matches!(args[1].kind, ExprKind::Starred { .. }));
        assert_eq!(keywords.len(), 2);
        assert!(keywords[1].arg.is_none());
        assert_eq!(
            parse_expression("f(**k, *a)").unwrap_err().message,
            "iterable argument unpacking follows keyword argument unpacking"
        );
        assert_eq!(
            parse_expression("f(**k, a)").unwrap_err().message,
            "positional argument follows keyword argument unpacking"
        );

        assert!(matches!(
            expr("[*a, 1]"),
            ExprKind::List { ref elts, .. } if matches!(elts[0].kind, ExprKind::Starred { .. })
        ));
        let StmtKind::Assign { targets, .. } = first_stmt("first, *rest = items") else {
            panic!("expected Assign");
        };
        let ExprKind::Tuple { elts, .. } = &targets[0].kind else {
            panic!("expected Tuple");
        };
        assert_eq!(elts[1].ctx(), Some(ExprContext::Store));
        assert_eq!(
            parse("*a = b").unwrap_err().message,
            "can't use starred expression here"
        );
    }

    #[test]
    fn format_strings_become_joined_strings() {
        let ExprKind::JoinedStr { values } = expr("f'total: {n + 1:>8} {name!r}'") else {
            panic!("expected JoinedStr");
        };
        assert_eq!(values.len(), 4);
        assert!(matches!(
            values[0].kind,
            ExprKind::Constant { value: Constant::Str(ref s), .. } if s == "total: "
        ));
        let ExprKind::FormattedValue { value, conversion, format_spec } = &values[1].kind else {
            panic!("expected FormattedValue");
        };
        assert_eq!(*conversion, -1);
        assert_eq!((value.loc.col_offset, value.loc.end_col_offset), (10, 15));
        assert!(format_spec.is_some());
        assert!(matches!(
            values[3].kind,
            ExprKind::FormattedValue { conversion: 114, .. }
        ));
        // parts carry the span of the whole literal
        assert_eq!(values[0].loc, values[1].loc);

        let ExprKind::JoinedStr { values } = expr("'a' f'{x}' 'b'") else {
            panic!("expected JoinedStr");
        };
        assert_eq!(values.len(), 3);
        assert!(matches!(expr("f''"), ExprKind::JoinedStr { ref values } if values.is_empty()));
        assert!(parse_expression("b'a' f'b'").is_err());
        assert!(parse_expression("f'{x +}'").is_err());
    }

    #[test]
    fn wide_integer_literals_parse() {
        let StmtKind::Assign { value, .. } = first_stmt("n = 100000000000000000000") else {
            panic!("expected Assign");
        };
        assert!(matches!(
            value.kind,
            ExprKind::Constant { value: Constant::BigInt(ref digits), .. }
                if digits == "100000000000000000000"
        ));
        assert!(matches!(
            expr("'\\N{BULLET}'"),
            ExprKind::Constant { value: Constant::Str(ref s), .. } if s == "\u{2022}"
        ));
    }

    #[test]
    fn function_definitions() {
        let source = "@cache\n@app.route('/x')\nasync def f(a, /, b: int = 1, *, c, d=2, **kw) -> str:\n    return a\n";
        let module = parse(source).unwrap();
        let stmt = &module.body[0];
        let StmtKind::FunctionDef { is_async, name, args, body, decorator_list, returns } =
            &stmt.kind
        else {
            panic!("expected FunctionDef");
        };
        assert!(*is_async);
        assert_eq!(name, "f");
        assert_eq!(decorator_list.len(), 2);
        assert_eq!(args.posonlyargs[0].arg, "a");
        assert_eq!(args.args[0].arg, "b");
        assert!(args.args[0].annotation.is_some());
        assert_eq!(args.defaults.len(), 1);
        assert_eq!(args.kw_defaults.len(), 2);
        assert!(args.kw_defaults[0].is_none() && args.kw_defaults[1].is_some());
        assert!(returns.is_some());
        assert!(matches!(body[0].kind, StmtKind::Return { value: Some(_) }));
        assert_eq!((stmt.loc.lineno, stmt.loc.col_offset), (3, 0));
        assert_eq!(stmt.loc.end_lineno, 4);

        assert_eq!(
            parse("def f(a=1, b): pass").unwrap_err().message,
            "non-default argument follows default argument"
        );
        assert_eq!(
            parse("def f(*): pass").unwrap_err().message,
            "named arguments must follow bare *"
        );
        assert!(parse("@dec\nx = 1").is_err());
        assert!(parse("for a in b:\n    def f():\n        break").is_err());
    }

    #[test]
    fn class_try_and_with_statements() {
        let source = "class A(Base, metaclass=M):\n    x: int = 0\n";
        let StmtKind::ClassDef { bases, keywords, body, .. } = first_stmt(source) else {
            panic!("expected ClassDef");
        };
        assert_eq!(bases.len(), 1);
        assert_eq!(keywords[0].arg.as_deref(), Some("metaclass"));
        assert!(matches!(body[0].kind, StmtKind::AnnAssign { simple: true, .. }));

        let source = "try:\n    x = 1\nexcept (KeyError, ValueError) as e:\n    pass\nexcept:\n    raise\nelse:\n    y = 2\nfinally:\n    z = 3\n";
        let module = parse(source).unwrap();
        let StmtKind::Try { handlers, orelse, finalbody, .. } = &module.body[0].kind else {
            panic!("expected Try");
        };
        assert_eq!(handlers.len(), 2);
        assert_eq!(handlers[0].name.as_deref(), Some("e"));
        assert!(handlers[1].type_.is_none());
        assert_eq!(handlers[0].loc.lineno, 3);
        assert_eq!(orelse.len(), 1);
        assert_eq!(finalbody.len(), 1);
        assert_eq!(module.body[0].loc.end_lineno, 10);
        assert_eq!(
            parse("try:\n    pass\nx = 1").unwrap_err().message,
            "expected 'except' or 'finally' block"
        );
        assert_eq!(
            parse("try:\n    pass\nexcept:\n    pass\nexcept E:\n    pass").unwrap_err().message,
            "default 'except:' must be last"
        );

        let StmtKind::With { items, .. } = first_stmt("with open(p) as f, lock:\n    pass") else {
            panic!("expected With");
        };
        assert_eq!(items.len(), 2);
        assert_eq!(
            items[0].optional_vars.as_ref().and_then(Expr::ctx),
            Some(ExprContext::Store)
        );
        let StmtKind::With { items, .. } = first_stmt("with (a as b, c as d):\n    pass") else {
            panic!("expected With");
        };
        assert_eq!(items.len(), 2);
    }

    #[test]
    fn imports() {
        let StmtKind::Import { names } = first_stmt("import numpy as np, os.path") else {
            panic!("expected Import");
        };
        assert_eq!(names[0].asname.as_deref(), Some("np"));
        assert_eq!(names[1].name, "os.path");

        let StmtKind::ImportFrom { module, names, level } =
            first_stmt("from ..pkg.mod import (a as b,\n    c,)")
        else {
            panic!("expected ImportFrom");
        };
        assert_eq!(module.as_deref(), Some("pkg.mod"));
        assert_eq!(level, 2);
        assert_eq!(names.len(), 2);
        assert!(matches!(
            first_stmt("from . import *"),
            StmtKind::ImportFrom { module: None, level: 1, .. }
        ));
        assert!(parse("from x import a,").is_err());
    }

    #[test]
    fn keyword_statements() {
        let module = parse("global a, b\ndel x[0], y\nassert x, 'msg'\nraise E from e\nreturn\n").unwrap();
        assert!(matches!(module.body[0].kind, StmtKind::Global { ref names } if names.len() == 2));
        let StmtKind::Delete { targets } = &module.body[1].kind else {
            panic!("expected Delete");
        };
        assert!(targets.iter().all(|t| t.ctx() == Some(ExprContext::Del)));
        assert!(matches!(module.body[2].kind, StmtKind::Assert { msg: Some(_), .. }));
        assert!(matches!(module.body[3].kind, StmtKind::Raise { cause: Some(_), .. }));
        assert!(matches!(module.body[4].kind, StmtKind::Return { value: None }));
        assert_eq!(parse("del f()").unwrap_err().message, "cannot delete function call");
        assert_eq!(
            parse("a, b: int").unwrap_err().message,
            "only single target (not tuple) can be annotated"
        );
        assert!(matches!(
            first_stmt("(x): int"),
            StmtKind::AnnAssign { simple: false, value: None, .. }
        ));
    }

    #[test]
    fn yield_and_await() {
        let module = parse("def g():\n    x = yield 1\n    yield from h()\n    await t\n").unwrap();
        let StmtKind::FunctionDef { body, .. } = &module.body[0].kind else {
            panic!("expected FunctionDef");
        };
        assert!(matches!(
            body[0].kind,
            StmtKind::Assign { ref value, .. } if matches!(value.kind, ExprKind::Yield { .. })
        ));
        assert!(matches!(
            body[1].kind,
            StmtKind::Expr { ref value } if matches!(value.kind, ExprKind::YieldFrom { .. })
        ));
        assert!(matches!(
            body[2].kind,
            StmtKind::Expr { ref value } if matches!(value.kind, ExprKind::Await { .. })
        ));
    }

    #[test]
    fn keywords_are_not_names() {
        assert!(parse_expression("import").is_err());
        assert!(matches!(expr("iffy"), ExprKind::Name { .. }));
        assert!(matches!(
            expr("None"),
            ExprKind::Constant { value: Constant::None, .. }
        ));
    }
}
