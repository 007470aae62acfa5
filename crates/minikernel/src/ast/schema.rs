//! Field schema for every node kind
//!
//! Each node kind maps to a fixed set of named fields. The structural encoder
//! walks this table instead of inspecting nodes at run time, so a new node
//! kind cannot be added without deciding how it is encoded.
//!
//! Fields are reported in alphabetical order, the order Python's `dir()`
//! lists node attributes in.

use super::nodes::{
    Alias, Arg, Arguments, Comprehension, Constant, ExceptHandler, Expr, ExprKind, Keyword,
    Module, Stmt, StmtKind, WithItem,
};
use super::{BoolOp, CmpOp, ExprContext, Location, Operator, UnaryOp};
use crate::value::Value;

/// Borrowed view of any node in the tree.
#[derive(Debug, Clone, Copy)]
pub enum NodeRef<'a> {
    Module(&'a Module),
    Stmt(&'a Stmt),
    Expr(&'a Expr),
    Keyword(&'a Keyword),
    Arguments(&'a Arguments),
    Arg(&'a Arg),
    Alias(&'a Alias),
    Comprehension(&'a Comprehension),
    ExceptHandler(&'a ExceptHandler),
    WithItem(&'a WithItem),
    Context(ExprContext),
    Operator(Operator),
    BoolOp(BoolOp),
    UnaryOp(UnaryOp),
    CmpOp(CmpOp),
}

/// Value held by one node field.
#[derive(Debug, Clone)]
pub enum Field<'a> {
    Absent,
    Int(i64),
    Text(&'a str),
    Constant(&'a Constant),
    Node(NodeRef<'a>),
    List(Vec<Field<'a>>),
    /// A workspace value; only reaches the encoder through introspection.
    Value(Value),
}

impl<'a> NodeRef<'a> {
    /// Grammar name of the node kind.
    pub fn kind_name(&self) -> &'static str {
        match self {
            NodeRef::Module(_) => "Module",
            NodeRef::Stmt(stmt) => match &stmt.kind {
                StmtKind::FunctionDef { is_async: false, .. } => "FunctionDef",
                StmtKind::FunctionDef { is_async: true, .. } => "AsyncFunctionDef",
                StmtKind::ClassDef { .. } => "ClassDef",
                StmtKind::Return { .. } => "Return",
                StmtKind::Delete { .. } => "Delete",
                StmtKind::Expr { .. } => "Expr",
                StmtKind::Assign { .. } => "Assign",
                StmtKind::AugAssign { .. } => "AugAssign",
                StmtKind::AnnAssign { .. } => "AnnAssign",
                StmtKind::If { .. } => "If",
                StmtKind::While { .. } => "While",
                StmtKind::For { is_async: false, .. } => "For",
                StmtKind::For { is_async: true, .. } => "AsyncFor",
                StmtKind::With { is_async: false, .. } => "With",
                StmtKind::With { is_async: true, .. } => "AsyncWith",
                StmtKind::Raise { .. } => "Raise",
                StmtKind::Try { .. } => "Try",
                StmtKind::Assert { .. } => "Assert",
                StmtKind::Import { .. } => "Import",
                StmtKind::ImportFrom { .. } => "ImportFrom",
                StmtKind::Global { .. } => "Global",
                StmtKind::Nonlocal { .. } => "Nonlocal",
                StmtKind::Pass => "Pass",
                StmtKind::Break => "Break",
                StmtKind::Continue => "Continue",
            },
            NodeRef::Expr(expr) => match &expr.kind {
                ExprKind::BoolOp { .. } => "BoolOp",
                ExprKind::NamedExpr { .. } => "NamedExpr",
                ExprKind::BinOp { .. } => "BinOp",
                ExprKind::UnaryOp { .. } => "UnaryOp",
                ExprKind::Lambda { .. } => "Lambda",
                ExprKind::IfExp { .. } => "IfExp",
                ExprKind::Dict { .. } => "Dict",
                ExprKind::Set { .. } => "Set",
                ExprKind::ListComp { .. } => "ListComp",
                ExprKind::SetComp { .. } => "SetComp",
                ExprKind::DictComp { .. } => "DictComp",
                ExprKind::GeneratorExp { .. } => "GeneratorExp",
                ExprKind::Await { .. } => "Await",
                ExprKind::Yield { .. } => "Yield",
                ExprKind::YieldFrom { .. } => "YieldFrom",
                ExprKind::Compare { .. } => "Compare",
                ExprKind::Call { .. } => "Call",
                ExprKind::FormattedValue { .. } => "FormattedValue",
                ExprKind::JoinedStr { .. } => "JoinedStr",
                ExprKind::Constant { .. } => "Constant",
                ExprKind::Attribute { .. } => "Attribute",
                ExprKind::Subscript { .. } => "Subscript",
                ExprKind::Starred { .. } => "Starred",
                ExprKind::Name { .. } => "Name",
                ExprKind::List { .. } => "List",
                ExprKind::Tuple { .. } => "Tuple",
                ExprKind::Slice { .. } => "Slice",
            },
            NodeRef::Keyword(_) => "keyword",
            NodeRef::Arguments(_) => "arguments",
            NodeRef::Arg(_) => "arg",
            NodeRef::Alias(_) => "alias",
            NodeRef::Comprehension(_) => "comprehension",
            NodeRef::ExceptHandler(_) => "ExceptHandler",
            NodeRef::WithItem(_) => "withitem",
            NodeRef::Context(ctx) => ctx.name(),
            NodeRef::Operator(op) => op.name(),
            NodeRef::BoolOp(op) => op.name(),
            NodeRef::UnaryOp(op) => op.name(),
            NodeRef::CmpOp(op) => op.name(),
        }
    }

    /// Named fields of this node, sorted by name.
    pub fn fields(&self) -> Vec<(&'static str, Field<'a>)> {
        let mut fields = match *self {
            NodeRef::Module(module) => vec![
                ("body", stmts(&module.body)),
                ("type_ignores", Field::List(Vec::new())),
            ],
            NodeRef::Stmt(stmt) => located(stmt_fields(stmt), &stmt.loc),
            NodeRef::Expr(expr) => located(expr_fields(expr), &expr.loc),
            NodeRef::Keyword(keyword) => located(
                vec![
                    ("arg", opt_text(keyword.arg.as_deref())),
                    ("value", expr(&keyword.value)),
                ],
                &keyword.loc,
            ),
            NodeRef::Arguments(arguments) => vec![
                ("args", args(&arguments.args)),
                ("defaults", exprs(&arguments.defaults)),
                (
                    "kw_defaults",
                    Field::List(
                        arguments
                            .kw_defaults
                            .iter()
                            .map(|default| opt_expr(default.as_ref()))
                            .collect(),
                    ),
                ),
                ("kwarg", opt_arg(arguments.kwarg.as_ref())),
                ("kwonlyargs", args(&arguments.kwonlyargs)),
                ("posonlyargs", args(&arguments.posonlyargs)),
                ("vararg", opt_arg(arguments.vararg.as_ref())),
            ],
            NodeRef::Arg(arg) => located(
                vec![
                    ("annotation", opt_expr(arg.annotation.as_ref())),
                    ("arg", Field::Text(&arg.arg)),
                    ("type_comment", Field::Absent),
                ],
                &arg.loc,
            ),
            NodeRef::Alias(alias) => located(
                vec![
                    ("asname", opt_text(alias.asname.as_deref())),
                    ("name", Field::Text(&alias.name)),
                ],
                &alias.loc,
            ),
            NodeRef::Comprehension(comprehension) => vec![
                ("ifs", exprs(&comprehension.ifs)),
                ("is_async", Field::Int(comprehension.is_async.into())),
                ("iter", expr(&comprehension.iter)),
                ("target", expr(&comprehension.target)),
            ],
            NodeRef::ExceptHandler(handler) => located(
                vec![
                    ("body", stmts(&handler.body)),
                    ("name", opt_text(handler.name.as_deref())),
                    ("type", opt_expr(handler.type_.as_ref())),
                ],
                &handler.loc,
            ),
            NodeRef::WithItem(item) => vec![
                ("context_expr", expr(&item.context_expr)),
                ("optional_vars", opt_expr(item.optional_vars.as_ref())),
            ],
            NodeRef::Context(_)
            | NodeRef::Operator(_)
            | NodeRef::BoolOp(_)
            | NodeRef::UnaryOp(_)
            | NodeRef::CmpOp(_) => Vec::new(),
        };
        fields.sort_by_key(|(name, _)| *name);
        fields
    }

    /// Direct child nodes, in field order.
    pub fn children(&self) -> Vec<NodeRef<'a>> {
        fn collect<'a>(field: Field<'a>, out: &mut Vec<NodeRef<'a>>) {
            match field {
                Field::Node(node) => out.push(node),
                Field::List(items) => items.into_iter().for_each(|item| collect(item, out)),
                _ => {}
            }
        }

        let mut out = Vec::new();
        for (_, field) in self.fields() {
            collect(field, &mut out);
        }
        out
    }
}

fn stmt_fields(stmt: &Stmt) -> Vec<(&'static str, Field<'_>)> {
    match &stmt.kind {
        StmtKind::FunctionDef {
            name,
            args,
            body,
            decorator_list,
            returns,
            ..
        } => vec![
            ("args", Field::Node(NodeRef::Arguments(args))),
            ("body", stmts(body)),
            ("decorator_list", exprs(decorator_list)),
            ("name", Field::Text(name)),
            ("returns", opt_expr(returns.as_ref())),
            ("type_comment", Field::Absent),
        ],
        StmtKind::ClassDef {
            name,
            bases,
            keywords,
            body,
            decorator_list,
        } => vec![
            ("bases", exprs(bases)),
            ("body", stmts(body)),
            ("decorator_list", exprs(decorator_list)),
            ("keywords", self::keywords(keywords)),
            ("name", Field::Text(name)),
        ],
        StmtKind::Return { value } => vec![("value", opt_expr(value.as_ref()))],
        StmtKind::Delete { targets } => vec![("targets", exprs(targets))],
        StmtKind::Expr { value } => vec![("value", expr(value))],
        StmtKind::Assign { targets, value } => vec![
            ("targets", exprs(targets)),
            ("type_comment", Field::Absent),
            ("value", expr(value)),
        ],
        StmtKind::AugAssign { target, op, value } => vec![
            ("op", Field::Node(NodeRef::Operator(*op))),
            ("target", expr(target)),
            ("value", expr(value)),
        ],
        StmtKind::AnnAssign {
            target,
            annotation,
            value,
            simple,
        } => vec![
            ("annotation", expr(annotation)),
            ("simple", Field::Int((*simple).into())),
            ("target", expr(target)),
            ("value", opt_expr(value.as_ref())),
        ],
        StmtKind::If { test, body, orelse } | StmtKind::While { test, body, orelse } => vec![
            ("body", stmts(body)),
            ("orelse", stmts(orelse)),
            ("test", expr(test)),
        ],
        StmtKind::For {
            target,
            iter,
            body,
            orelse,
            ..
        } => vec![
            ("body", stmts(body)),
            ("iter", expr(iter)),
            ("orelse", stmts(orelse)),
            ("target", expr(target)),
            ("type_comment", Field::Absent),
        ],
        StmtKind::With { items, body, .. } => vec![
            ("body", stmts(body)),
            (
                "items",
                Field::List(
                    items
                        .iter()
                        .map(|item| Field::Node(NodeRef::WithItem(item)))
                        .collect(),
                ),
            ),
            ("type_comment", Field::Absent),
        ],
        StmtKind::Raise { exc, cause } => vec![
            ("cause", opt_expr(cause.as_ref())),
            ("exc", opt_expr(exc.as_ref())),
        ],
        StmtKind::Try {
            body,
            handlers,
            orelse,
            finalbody,
        } => vec![
            ("body", stmts(body)),
            ("finalbody", stmts(finalbody)),
            (
                "handlers",
                Field::List(
                    handlers
                        .iter()
                        .map(|handler| Field::Node(NodeRef::ExceptHandler(handler)))
                        .collect(),
                ),
            ),
            ("orelse", stmts(orelse)),
        ],
        StmtKind::Assert { test, msg } => vec![
            ("msg", opt_expr(msg.as_ref())),
            ("test", expr(test)),
        ],
        StmtKind::Import { names } => vec![("names", aliases(names))],
        StmtKind::ImportFrom {
            module,
            names,
            level,
        } => vec![
            ("level", Field::Int(*level as i64)),
            ("module", opt_text(module.as_deref())),
            ("names", aliases(names)),
        ],
        StmtKind::Global { names } | StmtKind::Nonlocal { names } => vec![(
            "names",
            Field::List(names.iter().map(|name| Field::Text(name)).collect()),
        )],
        StmtKind::Pass | StmtKind::Break | StmtKind::Continue => Vec::new(),
    }
}

fn expr_fields(node: &Expr) -> Vec<(&'static str, Field<'_>)> {
    match &node.kind {
        ExprKind::BoolOp { op, values } => vec![
            ("op", Field::Node(NodeRef::BoolOp(*op))),
            ("values", exprs(values)),
        ],
        ExprKind::NamedExpr { target, value } => {
            vec![("target", expr(target)), ("value", expr(value))]
        }
        ExprKind::BinOp { left, op, right } => vec![
            ("left", expr(left)),
            ("op", Field::Node(NodeRef::Operator(*op))),
            ("right", expr(right)),
        ],
        ExprKind::UnaryOp { op, operand } => vec![
            ("op", Field::Node(NodeRef::UnaryOp(*op))),
            ("operand", expr(operand)),
        ],
        ExprKind::Lambda { args, body } => vec![
            ("args", Field::Node(NodeRef::Arguments(args))),
            ("body", expr(body)),
        ],
        ExprKind::IfExp { test, body, orelse } => vec![
            ("body", expr(body)),
            ("orelse", expr(orelse)),
            ("test", expr(test)),
        ],
        ExprKind::Dict { keys, values } => vec![
            (
                "keys",
                Field::List(keys.iter().map(|key| opt_expr(key.as_ref())).collect()),
            ),
            ("values", exprs(values)),
        ],
        ExprKind::Set { elts } => vec![("elts", exprs(elts))],
        ExprKind::ListComp { elt, generators }
        | ExprKind::SetComp { elt, generators }
        | ExprKind::GeneratorExp { elt, generators } => vec![
            ("elt", expr(elt)),
            ("generators", comprehensions(generators)),
        ],
        ExprKind::DictComp {
            key,
            value,
            generators,
        } => vec![
            ("generators", comprehensions(generators)),
            ("key", expr(key)),
            ("value", expr(value)),
        ],
        ExprKind::Await { value } | ExprKind::YieldFrom { value } => {
            vec![("value", expr(value))]
        }
        ExprKind::Yield { value } => vec![("value", opt_expr(value.as_deref()))],
        ExprKind::Compare {
            left,
            ops,
            comparators,
        } => vec![
            ("comparators", exprs(comparators)),
            ("left", expr(left)),
            (
                "ops",
                Field::List(
                    ops.iter()
                        .map(|op| Field::Node(NodeRef::CmpOp(*op)))
                        .collect(),
                ),
            ),
        ],
        ExprKind::Call {
            func,
            args,
            keywords,
        } => vec![
            ("args", exprs(args)),
            ("func", expr(func)),
            ("keywords", self::keywords(keywords)),
        ],
        ExprKind::FormattedValue {
            value,
            conversion,
            format_spec,
        } => vec![
            ("conversion", Field::Int(*conversion)),
            ("format_spec", opt_expr(format_spec.as_deref())),
            ("value", expr(value)),
        ],
        ExprKind::JoinedStr { values } => vec![("values", exprs(values))],
        ExprKind::Constant { value, kind } => vec![
            ("kind", opt_text(kind.as_deref())),
            ("value", Field::Constant(value)),
        ],
        ExprKind::Attribute { value, attr, ctx } => vec![
            ("attr", Field::Text(attr)),
            ("ctx", Field::Node(NodeRef::Context(*ctx))),
            ("value", expr(value)),
        ],
        ExprKind::Subscript { value, slice, ctx } => vec![
            ("ctx", Field::Node(NodeRef::Context(*ctx))),
            ("slice", expr(slice)),
            ("value", expr(value)),
        ],
        ExprKind::Starred { value, ctx } => vec![
            ("ctx", Field::Node(NodeRef::Context(*ctx))),
            ("value", expr(value)),
        ],
        ExprKind::Name { id, ctx } => vec![
            ("ctx", Field::Node(NodeRef::Context(*ctx))),
            ("id", Field::Text(id)),
        ],
        ExprKind::List { elts, ctx } | ExprKind::Tuple { elts, ctx } => vec![
            ("ctx", Field::Node(NodeRef::Context(*ctx))),
            ("elts", exprs(elts)),
        ],
        ExprKind::Slice { lower, upper, step } => vec![
            ("lower", opt_expr(lower.as_deref())),
            ("step", opt_expr(step.as_deref())),
            ("upper", opt_expr(upper.as_deref())),
        ],
    }
}

fn located<'a>(
    mut fields: Vec<(&'static str, Field<'a>)>,
    loc: &Location,
) -> Vec<(&'static str, Field<'a>)> {
    fields.extend(location_fields(loc));
    fields
}

fn location_fields<'a>(loc: &Location) -> [(&'static str, Field<'a>); 4] {
    [
        ("col_offset", Field::Int(loc.col_offset as i64)),
        ("end_col_offset", Field::Int(loc.end_col_offset as i64)),
        ("end_lineno", Field::Int(loc.end_lineno as i64)),
        ("lineno", Field::Int(loc.lineno as i64)),
    ]
}

fn expr(node: &Expr) -> Field<'_> {
    Field::Node(NodeRef::Expr(node))
}

fn opt_expr(node: Option<&Expr>) -> Field<'_> {
    node.map_or(Field::Absent, expr)
}

fn opt_text(text: Option<&str>) -> Field<'_> {
    text.map_or(Field::Absent, Field::Text)
}

fn opt_arg(arg: Option<&Arg>) -> Field<'_> {
    arg.map_or(Field::Absent, |arg| Field::Node(NodeRef::Arg(arg)))
}

fn args(nodes: &[Arg]) -> Field<'_> {
    Field::List(nodes.iter().map(|arg| Field::Node(NodeRef::Arg(arg))).collect())
}

fn keywords(nodes: &[Keyword]) -> Field<'_> {
    Field::List(
        nodes
            .iter()
            .map(|keyword| Field::Node(NodeRef::Keyword(keyword)))
            .collect(),
    )
}

fn aliases(nodes: &[Alias]) -> Field<'_> {
    Field::List(
        nodes
            .iter()
            .map(|alias| Field::Node(NodeRef::Alias(alias)))
            .collect(),
    )
}

fn comprehensions(nodes: &[Comprehension]) -> Field<'_> {
    Field::List(
        nodes
            .iter()
            .map(|generator| Field::Node(NodeRef::Comprehension(generator)))
            .collect(),
    )
}

fn exprs(nodes: &[Expr]) -> Field<'_> {
    Field::List(nodes.iter().map(expr).collect())
}

fn stmts(nodes: &[Stmt]) -> Field<'_> {
    Field::List(
        nodes
            .iter()
            .map(|stmt| Field::Node(NodeRef::Stmt(stmt)))
            .collect(),
    )
}

/// Depth of the deepest node under `root`, counting `root` as 1.
///
/// Iterative so it can vet trees before anything recursive walks them.
pub fn depth(root: NodeRef<'_>) -> usize {
    let mut deepest = 0;
    let mut stack = vec![(root, 1usize)];
    while let Some((node, level)) = stack.pop() {
        deepest = deepest.max(level);
        stack.extend(node.children().into_iter().map(|child| (child, level + 1)));
    }
    deepest
}
