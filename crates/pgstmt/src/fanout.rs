//! Concurrent lookup of related entities.
//!
//! A repository resolving an entity often needs a few related rows (the
//! address of a bank, the country of that address, ...). Those lookups are
//! independent, so they run concurrently and are joined before the caller
//! carries on. A lookup that fails is treated as "related entity absent": it
//! is logged at `WARN` (target `pgstmt.fanout`) and yields `None`, the
//! remaining lookups are unaffected.
//!
//! ```ignore
//! let (address, country) = resolve_pair(
//!     ("address", fetch_address(&client, bank.address_id)),
//!     ("country", fetch_country(&client, bank.country_id)),
//! )
//! .await;
//! ```

use crate::error::StmtResult;
use futures_util::future::join_all;
use std::future::Future;

/// Await one labelled lookup, degrading failure to `None`.
pub async fn resolve<T, F>(label: &str, lookup: F) -> Option<T>
where
    F: Future<Output = StmtResult<Option<T>>>,
{
    match lookup.await {
        Ok(Some(value)) => Some(value),
        Ok(None) => {
            tracing::debug!(target: "pgstmt.fanout", lookup = label, "related entity absent");
            None
        }
        Err(error) => {
            tracing::warn!(
                target: "pgstmt.fanout",
                lookup = label,
                error = %error,
                "related lookup failed; treating as absent"
            );
            None
        }
    }
}

/// Run a fixed set of same-typed lookups concurrently. Results keep the
/// input order.
pub async fn resolve_related<'a, T, F, I>(lookups: I) -> Vec<Option<T>>
where
    I: IntoIterator<Item = (&'a str, F)>,
    F: Future<Output = StmtResult<Option<T>>>,
{
    join_all(
        lookups
            .into_iter()
            .map(|(label, lookup)| resolve(label, lookup)),
    )
    .await
}

/// Run two differently-typed lookups concurrently.
pub async fn resolve_pair<A, B, FA, FB>(a: (&str, FA), b: (&str, FB)) -> (Option<A>, Option<B>)
where
    FA: Future<Output = StmtResult<Option<A>>>,
    FB: Future<Output = StmtResult<Option<B>>>,
{
    tokio::join!(resolve(a.0, a.1), resolve(b.0, b.1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StmtError;

    #[tokio::test]
    async fn failure_degrades_to_none() {
        let found = resolve("bank", async { Ok::<_, StmtError>(Some(1)) }).await;
        let failed =
            resolve("bank", async { Err::<Option<i32>, _>(StmtError::not_found("id = 1")) }).await;
        assert_eq!(found, Some(1));
        assert_eq!(failed, None);
    }
}
