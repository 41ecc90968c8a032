pub mod memory;
pub mod mongo;

use crate::account::{Account, AccountId};
use crate::error::CResult;

/// Collection-level access to the account documents. Operations here are not
/// scoped to any session, so they only ever observe committed data.
///
/// All calls are awaited one after another by a single task; implementations
/// need not be shareable across threads.
#[allow(async_fn_in_trait)]
pub trait AccountStore {
    /// The session handle returned by start_session().
    type Session: StoreSession;

    /// Deletes every document in the collection, returning how many were removed.
    async fn clear(&self) -> CResult<u64>;

    /// Inserts the given accounts.
    async fn insert_many(&self, accounts: &[Account]) -> CResult<()>;

    /// Gets an account by id, if it exists.
    async fn find(&self, id: AccountId) -> CResult<Option<Account>>;

    /// Returns every account, ordered by id.
    async fn find_all(&self) -> CResult<Vec<Account>>;

    /// Opens a new, independent session.
    async fn start_session(&self) -> CResult<Self::Session>;
}

/// A logical sequence of operations, used to scope a transaction.
///
/// Dropping a session releases it. If a transaction is still open at that
/// point its writes are discarded.
#[allow(async_fn_in_trait)]
pub trait StoreSession {
    async fn start_transaction(&mut self) -> CResult<()>;

    async fn commit_transaction(&mut self) -> CResult<()>;

    async fn abort_transaction(&mut self) -> CResult<()>;

    /// Adds `delta` to the balance of `id` within this session, returning the
    /// number of matched documents.
    async fn increment_balance(&mut self, id: AccountId, delta: i32) -> CResult<u64>;

    /// Gets an account by id, reading through this session.
    async fn find(&mut self, id: AccountId) -> CResult<Option<Account>>;

    /// Whether a transaction is currently open on this session.
    fn in_transaction(&self) -> bool;
}
