use log::info;

use crate::account::Account;
use crate::error::CResult;
use crate::progress::{Progress, Step};
use crate::store::AccountStore;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SeedSummary {
    /// Documents deleted before inserting the baseline.
    pub removed: u64,
    pub inserted: usize,
}

/// Deletes every document in the store, then inserts the baseline accounts.
///
/// Destructive: whatever the collection held before is gone, so only point
/// this at a disposable collection.
pub async fn seed<S: AccountStore, P: Progress>(store: &S, progress: &mut P) -> CResult<SeedSummary> {
    let removed = store.clear().await?;

    let baseline = Account::baseline();
    store.insert_many(&baseline).await?;
    info!("seeded {} accounts, removed {} stale documents", baseline.len(), removed);

    progress.step(Step::Prepared);
    Ok(SeedSummary {
        removed,
        inserted: baseline.len(),
    })
}
