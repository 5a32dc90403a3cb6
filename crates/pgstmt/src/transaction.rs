//! Transaction helper macro.
//!
//! Prefer passing a transaction (`tokio_postgres::Transaction` or
//! `deadpool_postgres::Transaction`) into APIs that accept [`GenericClient`],
//! so repository methods compose with or without a surrounding transaction.
//!
//! ```ignore
//! use pgstmt::{QueryBuilder, StmtResult, args, execute};
//!
//! # async fn demo(client: &mut tokio_postgres::Client) -> StmtResult<()> {
//! pgstmt::transaction!(client, tx, {
//!     let mut debit = QueryBuilder::update_table("ledgers");
//!     debit
//!         .set_update("balance = balance - 100", None)
//!         .where_eq("id", 1);
//!     execute(&tx, &debit.generate_sql()?).await?;
//!     Ok(())
//! })?;
//! # Ok(()) }
//! ```
//!
//! [`GenericClient`]: crate::GenericClient

/// Runs the given block inside a database transaction.
///
/// - Begins a transaction via `$client.transaction().await`.
/// - Commits on `Ok(_)`.
/// - Rolls back on `Err(_)`.
///
/// The block must evaluate to `pgstmt::StmtResult<T>`.
#[macro_export]
macro_rules! transaction {
    ($client:expr, $tx:ident, $body:block) => {{
        let $tx = ($client)
            .transaction()
            .await
            .map_err($crate::StmtError::from_db_error)?;

        let __pgstmt_tx_body_result: $crate::StmtResult<_> = async { $body }.await;
        match __pgstmt_tx_body_result {
            Ok(value) => {
                $tx.commit()
                    .await
                    .map_err($crate::StmtError::from_db_error)?;
                Ok(value)
            }
            Err(error) => match $tx.rollback().await {
                Ok(()) => Err(error),
                Err(rollback_err) => Err($crate::StmtError::Transaction(format!(
                    "{error} (rollback failed: {rollback_err})"
                ))),
            },
        }
    }};
}
