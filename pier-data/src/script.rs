use std::collections::BTreeMap;
use std::path::Path;

use serde::Serialize;

use crate::adapter::Adapter;
use crate::error::DataError;

/// A multi-statement SQL script with `{$name}` placeholders.
///
/// Statements are separated by a semicolon at the end of a line.
///
/// ```ignore
/// let script = Script::new("CREATE TABLE {$tp}plugins (id INTEGER);\nINSERT INTO {$tp}plugins VALUES (1);")
///     .with_var("tp", "pp_");
/// let report = run_script(adapter.as_ref(), &script).await?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct Script {
    sql: String,
    vars: BTreeMap<String, String>,
}

impl Script {
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            vars: BTreeMap::new(),
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, DataError> {
        std::fs::read_to_string(path)
            .map(Self::new)
            .map_err(DataError::database)
    }

    pub fn with_var(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(name.into(), value.into());
        self
    }

    /// The executable statements, placeholders substituted. Empty and
    /// comment-only chunks are dropped.
    pub fn statements(&self) -> Vec<String> {
        let mut sql = self.sql.replace("\r\n", "\n").replace('\r', "\n");
        for (name, value) in &self.vars {
            sql = sql.replace(&format!("{{${name}}}"), value);
        }
        sql.split(";\n")
            .map(|chunk| chunk.trim().trim_end_matches(';').trim_end().to_string())
            .filter(|statement| {
                statement
                    .lines()
                    .any(|line| !line.trim().is_empty() && !line.trim_start().starts_with("--"))
            })
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScriptReport {
    pub total: usize,
    pub executed: usize,
}

/// Run every statement of `script` inside one transaction.
///
/// The first failing statement rolls the transaction back; the error carries
/// how many statements had run before it.
pub async fn run_script(adapter: &dyn Adapter, script: &Script) -> Result<ScriptReport, DataError> {
    let statements = script.statements();
    let total = statements.len();
    adapter.begin_work().await?;

    let mut executed = 0;
    for statement in &statements {
        if let Err(err) = adapter.execute(statement).await {
            tracing::warn!(executed, total, error = %err, "Script failed, rolling back");
            if let Err(rollback_err) = adapter.rollback().await {
                tracing::warn!(error = %rollback_err, "Rollback failed");
            }
            return Err(DataError::Script {
                total,
                executed,
                source: Box::new(err),
            });
        }
        executed += 1;
    }

    if let Err(err) = adapter.commit().await {
        tracing::warn!(executed, total, error = %err, "Commit failed, rolling back");
        if let Err(rollback_err) = adapter.rollback().await {
            tracing::warn!(error = %rollback_err, "Rollback failed");
        }
        return Err(DataError::Script {
            total,
            executed,
            source: Box::new(err),
        });
    }
    tracing::info!(executed, "Script executed");
    Ok(ScriptReport { total, executed })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::StubAdapter;

    #[test]
    fn test_split_and_substitute() {
        let script = Script::new(
            "-- schema\r\nCREATE TABLE {$tp}plugins (id INTEGER);\r\n\r\nINSERT INTO {$tp}plugins VALUES (1);\n;\n",
        )
        .with_var("tp", "pp_");
        assert_eq!(
            script.statements(),
            vec![
                "-- schema\nCREATE TABLE pp_plugins (id INTEGER)",
                "INSERT INTO pp_plugins VALUES (1)",
            ]
        );
    }

    #[test]
    fn test_comment_only_chunks_dropped() {
        let script = Script::new("-- nothing here;\nSELECT 1");
        assert_eq!(script.statements(), vec!["SELECT 1"]);
    }

    #[test]
    fn test_semicolons_inside_a_line_do_not_split() {
        let script = Script::new("INSERT INTO t VALUES ('a;b');\nSELECT 1;");
        assert_eq!(script.statements().len(), 2);
    }

    #[tokio::test]
    async fn test_run_commits() {
        let stub = StubAdapter::default();
        let report = run_script(&stub, &Script::new("SELECT 1;\nSELECT 2;\n"))
            .await
            .unwrap();
        assert_eq!(report, ScriptReport { total: 2, executed: 2 });
        assert_eq!(stub.statements(), vec!["BEGIN", "SELECT 1", "SELECT 2", "COMMIT"]);
    }

    #[tokio::test]
    async fn test_failure_rolls_back() {
        let stub = StubAdapter::default();
        stub.respond_affected(0, None);
        stub.respond(Err(DataError::query("BROKEN", "syntax error")));
        let err = run_script(&stub, &Script::new("SELECT 1;\nBROKEN;\nSELECT 3;"))
            .await
            .unwrap_err();
        match err {
            DataError::Script { total, executed, ref source } => {
                assert_eq!((total, executed), (3, 1));
                assert!(matches!(**source, DataError::Query { .. }));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(stub.statements().last().map(String::as_str), Some("ROLLBACK"));
        assert!(!stub.in_transaction());
    }
}
