//! Running rendered statements.
//!
//! [`Executor`] binds a [`Rendered`] statement's arguments, applies the
//! configured timeout and emits one `pgstmt.sql` tracing event per statement
//! (SQL, parameter count and selection descriptor; argument values are never
//! logged). The free functions use [`ExecConfig::default`].

use crate::builder::Rendered;
use crate::client::GenericClient;
use crate::config::ExecConfig;
use crate::error::{StmtError, StmtResult};
use crate::row::FromRow;
use tokio_postgres::Row;

/// Statement runner with a fixed [`ExecConfig`].
#[derive(Debug, Clone, Default)]
pub struct Executor {
    config: ExecConfig,
}

impl Executor {
    pub fn new(config: ExecConfig) -> Self {
        Self { config }
    }

    /// Build from the `PGSTMT_*` environment variables.
    pub fn from_env() -> StmtResult<Self> {
        Ok(Self::new(ExecConfig::from_env()?))
    }

    pub fn config(&self) -> &ExecConfig {
        &self.config
    }

    /// Run a statement that must match exactly one row.
    ///
    /// - 0 rows: [`StmtError::NotFound`] carrying the selection descriptor
    /// - more than 1 row: [`StmtError::TooManyRows`]
    pub async fn fetch_one<C, T>(
        &self,
        client: &C,
        stmt: &Rendered,
        map: impl Fn(&Row) -> StmtResult<T>,
    ) -> StmtResult<T>
    where
        C: GenericClient,
    {
        let rows = self.query(client, stmt, "fetch_one").await?;
        match rows.as_slice() {
            [] => Err(StmtError::not_found(stmt.selection.to_string())),
            [row] => map(row),
            _ => Err(StmtError::too_many_rows(1, rows.len())),
        }
    }

    /// Run a statement that matches at most one row.
    pub async fn fetch_opt<C, T>(
        &self,
        client: &C,
        stmt: &Rendered,
        map: impl Fn(&Row) -> StmtResult<T>,
    ) -> StmtResult<Option<T>>
    where
        C: GenericClient,
    {
        let rows = self.query(client, stmt, "fetch_opt").await?;
        match rows.as_slice() {
            [] => Ok(None),
            [row] => map(row).map(Some),
            _ => Err(StmtError::too_many_rows(1, rows.len())),
        }
    }

    /// Run a statement and map every returned row.
    pub async fn fetch_many<C, T>(
        &self,
        client: &C,
        stmt: &Rendered,
        map: impl Fn(&Row) -> StmtResult<T>,
    ) -> StmtResult<Vec<T>>
    where
        C: GenericClient,
    {
        let rows = self.query(client, stmt, "fetch_many").await?;
        rows.iter().map(map).collect()
    }

    /// [`Executor::fetch_one`] mapped through [`FromRow`].
    pub async fn fetch_one_as<C, T>(&self, client: &C, stmt: &Rendered) -> StmtResult<T>
    where
        C: GenericClient,
        T: FromRow,
    {
        self.fetch_one(client, stmt, T::from_row).await
    }

    /// [`Executor::fetch_many`] mapped through [`FromRow`].
    pub async fn fetch_many_as<C, T>(&self, client: &C, stmt: &Rendered) -> StmtResult<Vec<T>>
    where
        C: GenericClient,
        T: FromRow,
    {
        self.fetch_many(client, stmt, T::from_row).await
    }

    /// Run a statement and return the number of affected rows.
    pub async fn execute<C>(&self, client: &C, stmt: &Rendered) -> StmtResult<u64>
    where
        C: GenericClient,
    {
        self.log(stmt, "execute");
        let params = stmt.params_ref();
        self.with_timeout(client, client.execute(&stmt.sql, &params))
            .await
    }

    /// Run a single-row write (typically with RETURNING) in its own
    /// transaction. The transaction is rolled back when the row count is
    /// wrong or `map` fails.
    pub async fn write_one<T>(
        &self,
        client: &mut tokio_postgres::Client,
        stmt: &Rendered,
        map: impl Fn(&Row) -> StmtResult<T>,
    ) -> StmtResult<T> {
        crate::transaction!(client, tx, { self.fetch_one(&tx, stmt, &map).await })
    }

    /// Run several statements atomically, returning the total affected rows.
    /// Stops and rolls back at the first failure.
    pub async fn write_many(
        &self,
        client: &mut tokio_postgres::Client,
        stmts: &[Rendered],
    ) -> StmtResult<u64> {
        crate::transaction!(client, tx, {
            let mut affected = 0;
            for stmt in stmts {
                affected += self.execute(&tx, stmt).await?;
            }
            Ok(affected)
        })
    }

    async fn query<C>(&self, client: &C, stmt: &Rendered, op: &'static str) -> StmtResult<Vec<Row>>
    where
        C: GenericClient,
    {
        self.log(stmt, op);
        let params = stmt.params_ref();
        self.with_timeout(client, client.query(&stmt.sql, &params))
            .await
    }

    async fn with_timeout<C, T, F>(&self, client: &C, future: F) -> StmtResult<T>
    where
        C: GenericClient,
        F: std::future::Future<Output = StmtResult<T>>,
    {
        match self.config.statement_timeout {
            Some(timeout) => {
                tokio::pin!(future);
                tokio::select! {
                    result = &mut future => result,
                    _ = tokio::time::sleep(timeout) => {
                        if let Some(cancel_token) = client.cancel_token() {
                            tokio::spawn(async move {
                                let _ = cancel_token.cancel_query(tokio_postgres::NoTls).await;
                            });
                        }
                        Err(StmtError::Timeout(timeout))
                    }
                }
            }
            None => future.await,
        }
    }

    fn log(&self, stmt: &Rendered, op: &'static str) {
        if !self.config.log_sql {
            return;
        }
        let sql = truncate_sql(&stmt.sql, self.config.max_sql_length);
        tracing::debug!(
            target: "pgstmt.sql",
            op,
            param_count = stmt.args.len(),
            selection = %stmt.selection,
            sql = %sql,
        );
    }
}

/// [`Executor::fetch_one`] with the default configuration.
pub async fn fetch_one<C, T>(
    client: &C,
    stmt: &Rendered,
    map: impl Fn(&Row) -> StmtResult<T>,
) -> StmtResult<T>
where
    C: GenericClient,
{
    Executor::default().fetch_one(client, stmt, map).await
}

/// [`Executor::fetch_many`] with the default configuration.
pub async fn fetch_many<C, T>(
    client: &C,
    stmt: &Rendered,
    map: impl Fn(&Row) -> StmtResult<T>,
) -> StmtResult<Vec<T>>
where
    C: GenericClient,
{
    Executor::default().fetch_many(client, stmt, map).await
}

/// [`Executor::execute`] with the default configuration.
pub async fn execute<C>(client: &C, stmt: &Rendered) -> StmtResult<u64>
where
    C: GenericClient,
{
    Executor::default().execute(client, stmt).await
}

/// Truncate to at most `max` bytes on a char boundary, marking the cut.
pub(crate) fn truncate_sql(sql: &str, max: Option<usize>) -> String {
    match max {
        Some(max) if sql.len() > max => {
            let mut end = max;
            while end > 0 && !sql.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}...", &sql[..end])
        }
        _ => sql.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncates_long_sql() {
        assert_eq!(truncate_sql("SELECT 1", Some(100)), "SELECT 1");
        assert_eq!(truncate_sql("SELECT * FROM banks", Some(8)), "SELECT *...");
        assert_eq!(truncate_sql("SELECT * FROM banks", None), "SELECT * FROM banks");
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        // 'é' is two bytes; cutting at byte 2 would split it
        assert_eq!(truncate_sql("aéb", Some(2)), "a...");
    }

    #[test]
    fn default_executor_logs_without_timeout() {
        let exec = Executor::default();
        assert!(exec.config().log_sql);
        assert!(exec.config().statement_timeout.is_none());
    }
}
