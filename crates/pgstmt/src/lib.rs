//! # pgstmt
//!
//! A composable, parameter-safe Postgres statement builder for entity
//! repositories.
//!
//! ## Features
//!
//! - **One builder per statement**: INSERT (multi-row, upsert), UPDATE (partial, FROM source),
//!   SELECT (aliased joins, paging) and DELETE through [`QueryBuilder`]
//! - **Nested predicates**: [`FilterBracket`] groups conditions under AND/OR and merges brackets
//!   built by other repositories
//! - **Placeholder numbering in one place**: conditions use generic `?` markers; `$1, $2, ...` are
//!   assigned once, in text order, so SQL and arguments cannot drift apart
//! - **First-class aliases**: join one table several times via [`Join`]
//! - **Execution helpers**: row-count checks, timeouts and `tracing` output on any
//!   [`GenericClient`]
//!
//! ## Example
//!
//! ```ignore
//! use pgstmt::{FilterBracket, Join, QueryBuilder, fetch_many};
//!
//! let mut country = FilterBracket::and();
//! country.eq("countries.code", "NL");
//!
//! let mut qb = QueryBuilder::select_from("addresses");
//! qb.select(&["addresses.*"])
//!     .join(Join::inner("countries", "countries").on_col("id", "addresses.country_id"))
//!     .where_bracket(country)
//!     .where_eq("addresses.kind", "home")
//!     .order_by("addresses.id");
//!
//! let stmt = qb.generate_sql()?;
//! let addresses = fetch_many(&client, &stmt, Address::from_row).await?;
//! ```

pub mod bracket;
pub mod builder;
pub mod client;
pub mod config;
pub mod descriptor;
pub mod error;
pub mod exec;
pub mod fanout;
pub mod row;
pub mod sequencer;
pub mod transaction;
pub mod value;

pub use bracket::{Combinator, FilterBracket};
pub use builder::{Join, JoinKind, Mode, QueryBuilder, Rendered, delete, insert, select, update};
pub use client::GenericClient;
pub use config::ExecConfig;
pub use descriptor::Selection;
pub use error::{StmtError, StmtResult};
pub use exec::{Executor, execute, fetch_many, fetch_one};
pub use fanout::{resolve, resolve_pair, resolve_related};
pub use row::{FromRow, RowExt};
pub use sequencer::{ArgSequencer, Fragment};
pub use value::Value;

#[cfg(feature = "pool")]
pub mod pool;

#[cfg(feature = "pool")]
pub use pool::{create_pool, create_pool_with_config};

/// Build a `Vec<Value>` from heterogeneous values.
///
/// ```ignore
/// qb.set_insert_values(args![1, "ABN AMRO", None::<&str>])?;
/// ```
#[macro_export]
macro_rules! args {
    () => {
        ::std::vec::Vec::<$crate::Value>::new()
    };
    ($($value:expr),+ $(,)?) => {
        ::std::vec![$($crate::Value::from($value)),+]
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn args_macro_converts_each_value() {
        let values = args![1, "x", None::<i64>, true];
        assert_eq!(
            values,
            vec![Value::Int(1), Value::from("x"), Value::Null, Value::Bool(true)]
        );
        assert!(args![].is_empty());
    }
}
