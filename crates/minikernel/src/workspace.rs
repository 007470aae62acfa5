//! Workspace store: the named values code runs against
//!
//! One workspace lives for the whole service. Execution is unrestricted:
//! submitted code can read and overwrite every entry, and nothing limits the
//! time or memory it uses.

use std::collections::BTreeMap;

use indexmap::IndexMap;
use serde_json::Value as JsonValue;

use crate::eval::Interpreter;
use crate::frame;
use crate::parse::{parse, parse_expression};
use crate::value::{Value, frame_to_json};
use crate::KernelError;

/// Name to value mapping in insertion order. Entries are added or
/// overwritten, never removed.
#[derive(Debug, Default)]
pub struct Workspace {
    names: IndexMap<String, Value>,
}

impl Workspace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a value directly (used for preloading data).
    pub fn insert(&mut self, name: impl Into<String>, value: Value) {
        self.names.insert(name.into(), value);
    }

    /// Run a program. A syntax error changes nothing; a runtime fault keeps
    /// the effects of the statements that ran before it.
    pub fn execute(&mut self, source: &str) -> Result<(), KernelError> {
        let module = parse(source)?;
        log::debug!("executing {} statement(s)", module.body.len());
        Interpreter::new(&mut self.names).run(&module.body)?;
        Ok(())
    }

    /// Evaluate one expression. Names change only through mutating method
    /// calls and `:=`.
    pub fn evaluate(&mut self, source: &str) -> Result<Value, KernelError> {
        let expr = parse_expression(source)?;
        Ok(Interpreter::new(&mut self.names).eval(&expr)?)
    }

    /// Evaluate and convert the result to JSON: column-oriented for a
    /// DataFrame, the generic form for everything else.
    pub fn evaluate_json(&mut self, source: &str) -> Result<JsonValue, KernelError> {
        let value = self.evaluate(source)?;
        let json = match &value {
            Value::DataFrame(df) => df.with(frame_to_json)?,
            other => other.to_json()?,
        };
        Ok(json)
    }

    /// Every name with the runtime type name of its value.
    pub fn list_names(&self) -> BTreeMap<String, String> {
        self.names
            .iter()
            .map(|(name, value)| (name.clone(), value.type_name().to_string()))
            .collect()
    }

    /// Column name to the type name of that column's first-row value.
    pub fn describe_columns(&self, name: &str) -> Result<IndexMap<String, String>, KernelError> {
        let value = self
            .names
            .get(name)
            .ok_or_else(|| KernelError::NameNotFound(name.to_string()))?;
        let Value::DataFrame(df) = value else {
            return Err(KernelError::WrongValueKind {
                name: name.to_string(),
                type_name: value.type_name().to_string(),
            });
        };
        df.with(frame::first_row_types)?
            .ok_or_else(|| KernelError::EmptyTable(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn execute_then_list() {
        let mut ws = Workspace::new();
        ws.execute("a = 5\nb = 'x'\nc = [1, 2]").unwrap();
        let names = ws.list_names();
        assert_eq!(names["a"], "int");
        assert_eq!(names["b"], "str");
        assert_eq!(names["c"], "list");
    }

    #[test]
    fn syntax_error_changes_nothing() {
        let mut ws = Workspace::new();
        let err = ws.execute("a = 1\nb = (").unwrap_err();
        assert_eq!(err.kind(), "SyntaxError");
        assert!(ws.list_names().is_empty());
    }

    #[test]
    fn evaluate_sees_executed_names() {
        let mut ws = Workspace::new();
        ws.execute("x = 40").unwrap();
        assert_eq!(ws.evaluate_json("x + 2").unwrap(), json!(42));
        assert_eq!(ws.evaluate_json("x, None").unwrap(), json!([40, null]));
    }

    #[test]
    fn evaluate_rejects_statements() {
        let mut ws = Workspace::new();
        assert_eq!(ws.evaluate("x = 1").unwrap_err().kind(), "SyntaxError");
    }

    #[test]
    fn evaluate_json_rejects_unserializable_results() {
        let mut ws = Workspace::new();
        let err = ws.evaluate_json("b'raw'").unwrap_err();
        assert_eq!(err.kind(), "TypeError");
        assert_eq!(err.to_string(), "Object of type bytes is not JSON serializable");
    }

    #[test]
    fn frames_evaluate_to_column_form() {
        let mut ws = Workspace::new();
        ws.execute("df = pd.DataFrame({'name': ['ann', 'bo'], 'age': [31, 42]})")
            .unwrap();
        assert_eq!(
            ws.evaluate_json("df").unwrap(),
            json!({
                "name": {"0": "ann", "1": "bo"},
                "age": {"0": 31, "1": 42},
            })
        );
    }

    #[test]
    fn describe_columns_errors() {
        let mut ws = Workspace::new();
        ws.execute("n = 1\nempty = pd.DataFrame({'a': []})").unwrap();
        assert!(matches!(
            ws.describe_columns("missing"),
            Err(KernelError::NameNotFound(_))
        ));
        assert!(matches!(
            ws.describe_columns("n"),
            Err(KernelError::WrongValueKind { .. })
        ));
        assert!(matches!(
            ws.describe_columns("empty"),
            Err(KernelError::EmptyTable(_))
        ));
    }

    #[test]
    fn describe_columns_uses_first_row() {
        let mut ws = Workspace::new();
        ws.execute("df = pd.DataFrame({'name': ['a'], 'score': [1.5], 'ok': [True]})")
            .unwrap();
        let types = ws.describe_columns("df").unwrap();
        assert_eq!(
            types.into_iter().collect::<Vec<_>>(),
            vec![
                ("name".to_string(), "str".to_string()),
                ("score".to_string(), "float".to_string()),
                ("ok".to_string(), "bool".to_string()),
            ]
        );
    }
}
