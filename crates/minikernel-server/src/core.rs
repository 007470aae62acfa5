//! KernelCore - the workspace behind the HTTP surface

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use indexmap::IndexMap;
use minikernel::{Value, Workspace, frame};
use polars::prelude::*;
use serde_json::Value as JsonValue;
use tokio::sync::RwLock;

use crate::error::AppError;

/// Owns the single workspace. Execute and evaluate hold the write lock for
/// the whole call, so submissions run one at a time.
#[derive(Clone, Default)]
pub struct KernelCore {
    workspace: Arc<RwLock<Workspace>>,
}

impl KernelCore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_workspace(workspace: Workspace) -> Self {
        Self {
            workspace: Arc::new(RwLock::new(workspace)),
        }
    }

    /// Bind a DataFrame by name
    pub async fn insert_df(&self, name: impl Into<String>, df: DataFrame) {
        self.workspace.write().await.insert(name, Value::frame(df));
    }

    /// Load a csv/parquet/ipc file and bind it under its file stem
    pub async fn preload(&self, path: &Path) -> Result<String, PolarsError> {
        let df = load_file(path).await?;
        let name = frame::name_from_path(path);
        log::info!(
            "Loaded {} as '{}' ({} rows)",
            path.display(),
            name,
            df.height()
        );
        self.insert_df(name.clone(), df).await;
        Ok(name)
    }

    pub async fn execute(&self, source: String) -> Result<(), AppError> {
        let mut workspace = self.workspace.clone().write_owned().await;
        tokio::task::spawn_blocking(move || workspace.execute(&source)).await??;
        Ok(())
    }

    pub async fn evaluate(&self, source: String) -> Result<JsonValue, AppError> {
        let mut workspace = self.workspace.clone().write_owned().await;
        let json = tokio::task::spawn_blocking(move || workspace.evaluate_json(&source)).await??;
        Ok(json)
    }

    pub async fn list_names(&self) -> BTreeMap<String, String> {
        self.workspace.read().await.list_names()
    }

    pub async fn describe_columns(&self, name: &str) -> Result<IndexMap<String, String>, AppError> {
        Ok(self.workspace.read().await.describe_columns(name)?)
    }

    /// Parse and encode; touches no workspace state.
    pub async fn parse(&self, source: String) -> Result<JsonValue, AppError> {
        let record = tokio::task::spawn_blocking(move || minikernel::parse_to_record(&source)).await??;
        Ok(record)
    }
}

/// Load a DataFrame from a file path (async, runs on blocking thread pool)
pub async fn load_file(path: &Path) -> Result<DataFrame, PolarsError> {
    let path: PathBuf = path.to_path_buf();
    tokio::task::spawn_blocking(move || frame::load_file_sync(&path))
        .await
        .map_err(|e| PolarsError::ComputeError(format!("blocking task failed: {e}").into()))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::df;
    use serde_json::json;

    #[tokio::test]
    async fn execute_then_evaluate() {
        let core = KernelCore::new();
        core.execute("a = [1, 2]\na.append(3)".to_string()).await.unwrap();
        let value = core.evaluate("a".to_string()).await.unwrap();
        assert_eq!(value, json!([1, 2, 3]));
        assert_eq!(core.list_names().await["a"], "list");
    }

    #[tokio::test]
    async fn inserted_frames_are_described() {
        let core = KernelCore::new();
        let df = df! {
            "name" => &["alice", "bob"],
            "gold" => &[100, 250],
        }
        .unwrap();
        core.insert_df("entities", df).await;

        let cols = core.describe_columns("entities").await.unwrap();
        assert_eq!(cols["name"], "str");
        assert_eq!(cols["gold"], "int");

        let err = core.describe_columns("nope").await.unwrap_err();
        assert_eq!(err.kind(), "NameNotFound");
    }

    #[tokio::test]
    async fn concurrent_submissions_are_serialized() {
        let core = KernelCore::new();
        core.execute("n = 0".to_string()).await.unwrap();
        let tasks: Vec<_> = (0..16)
            .map(|_| {
                let core = core.clone();
                tokio::spawn(async move { core.execute("n += 1".to_string()).await })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }
        assert_eq!(core.evaluate("n".to_string()).await.unwrap(), json!(16));
    }

    #[tokio::test]
    async fn preload_missing_file_fails() {
        let core = KernelCore::new();
        assert!(core.preload(Path::new("/no/such/file.csv")).await.is_err());
        assert!(core.list_names().await.is_empty());
    }
}
