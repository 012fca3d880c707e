//! At-most-once persistence of facts.

use crate::store::{Fact, Storage, StoreError};

/// Outcome of [`insert_if_absent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Insertion {
    /// The fact was new; carries the row id.
    Inserted(i64),
    /// A row with the same natural key already exists.
    Duplicate,
}

/// Insert `fact` unless a row with its natural key exists.
///
/// The check and the insert are separate statements. Callers must hold the
/// per-file lock so no other writer races on the same key.
///
/// # Errors
///
/// Returns an error if either storage call fails.
pub async fn insert_if_absent<S, F>(store: &S, fact: &F) -> Result<Insertion, StoreError>
where
    S: Storage + ?Sized,
    F: Fact + Sync + ?Sized,
{
    let table = fact.table();
    if store.exists(table, &fact.natural_key()).await? {
        tracing::trace!(table = table.name(), "Fact already recorded");
        return Ok(Insertion::Duplicate);
    }
    let id = store.insert(table, &fact.fields()).await?;
    Ok(Insertion::Inserted(id))
}
