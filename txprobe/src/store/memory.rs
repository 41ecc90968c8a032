use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

use log::debug;

use crate::account::{Account, AccountId};
use crate::error::{CResult, Error};
use crate::store::{AccountStore, StoreSession};

type SessionId = u64;

/// Operations of the memory store that can be made to fail on demand.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
    StartTransaction,
    Update,
    Commit,
    Abort,
    /// The unscoped read, [`AccountStore::find`].
    Find,
}

#[derive(Debug, Default)]
struct Shared {
    /// Committed documents, visible to every session.
    committed: BTreeMap<AccountId, Account>,
    /// Documents written by an open transaction, and the session that owns it.
    intents: HashMap<AccountId, SessionId>,
    next_session: SessionId,
    /// Error message returned by the next call of each armed operation.
    faults: HashMap<Operation, String>,
}

impl Shared {
    fn trip(&mut self, op: Operation) -> CResult<()> {
        match self.faults.remove(&op) {
            Some(message) => Err(Error::Store(message)),
            None => Ok(()),
        }
    }

    /// Fails if a transaction other than `session` holds a write on `id`.
    fn check_intent(&self, id: AccountId, session: Option<SessionId>) -> CResult<()> {
        match self.intents.get(&id) {
            Some(owner) if Some(*owner) != session => Err(Error::WriteConflict(id)),
            _ => Ok(()),
        }
    }
}

fn lock(shared: &Mutex<Shared>) -> CResult<MutexGuard<'_, Shared>> {
    shared
        .lock()
        .map_err(|e| Error::Store(format!("memory store lock poisoned: {}", e)))
}

fn add_balance(account: &mut Account, delta: i32) -> CResult<()> {
    account.balance = account.balance.checked_add(delta).ok_or_else(|| {
        Error::Store(format!(
            "balance overflow on account {}: {} + {}",
            account.id, account.balance, delta
        ))
    })?;
    Ok(())
}

/// An in-process account collection with per-session transactions.
///
/// Transactions buffer their writes and only publish them on commit, so
/// other sessions and unscoped reads never observe uncommitted data. Reads are
/// read-committed: a transaction sees its own writes over the latest committed
/// state. The first write to a document takes a write intent on it; any other
/// write to that document, transactional or not, including `clear` and
/// `insert_many`, fails with a write conflict until the owner commits or aborts.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    shared: Arc<Mutex<Shared>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next call of `op`, in any session, fail with `message`.
    pub fn fail_next(&self, op: Operation, message: &str) -> CResult<()> {
        lock(&self.shared)?.faults.insert(op, message.to_string());
        Ok(())
    }

    /// Whether a failure armed with [`fail_next`](Self::fail_next) is still waiting.
    pub fn is_armed(&self, op: Operation) -> CResult<bool> {
        Ok(lock(&self.shared)?.faults.contains_key(&op))
    }

    /// Number of documents currently locked by open transactions.
    pub fn pending_intents(&self) -> CResult<usize> {
        Ok(lock(&self.shared)?.intents.len())
    }
}

impl AccountStore for MemoryStore {
    type Session = MemorySession;

    async fn clear(&self) -> CResult<u64> {
        let mut shared = lock(&self.shared)?;
        if let Some(id) = shared.intents.keys().min().copied() {
            return Err(Error::WriteConflict(id));
        }
        let removed = shared.committed.len() as u64;
        shared.committed.clear();
        Ok(removed)
    }

    async fn insert_many(&self, accounts: &[Account]) -> CResult<()> {
        let mut shared = lock(&self.shared)?;
        for account in accounts {
            shared.check_intent(account.id, None)?;
            if shared.committed.contains_key(&account.id) {
                return Err(Error::Store(format!("duplicate key: _id {}", account.id)));
            }
        }
        for account in accounts {
            shared.committed.insert(account.id, *account);
        }
        Ok(())
    }

    async fn find(&self, id: AccountId) -> CResult<Option<Account>> {
        let mut shared = lock(&self.shared)?;
        shared.trip(Operation::Find)?;
        Ok(shared.committed.get(&id).copied())
    }

    async fn find_all(&self) -> CResult<Vec<Account>> {
        Ok(lock(&self.shared)?.committed.values().copied().collect())
    }

    async fn start_session(&self) -> CResult<MemorySession> {
        let mut shared = lock(&self.shared)?;
        shared.next_session += 1;
        let id = shared.next_session;
        debug!("memory session {} started", id);

        Ok(MemorySession {
            id,
            shared: self.shared.clone(),
            txn: None,
        })
    }
}

/// A session on a [`MemoryStore`].
#[derive(Debug)]
pub struct MemorySession {
    id: SessionId,
    shared: Arc<Mutex<Shared>>,
    /// Writes buffered by the open transaction, if any.
    txn: Option<BTreeMap<AccountId, Account>>,
}

impl MemorySession {
    /// Ends the open transaction. An armed fault fails the call and leaves the
    /// transaction open.
    fn finish(&mut self, commit: bool) -> CResult<()> {
        if self.txn.is_none() {
            return Err(Error::TransactionState(format!(
                "no transaction started on session {}",
                self.id
            )));
        }

        let mut shared = lock(&self.shared)?;
        shared.trip(if commit { Operation::Commit } else { Operation::Abort })?;

        let writes = self.txn.take().unwrap_or_default();
        if commit {
            shared.committed.extend(writes);
        }
        let id = self.id;
        shared.intents.retain(|_, owner| *owner != id);
        Ok(())
    }
}

impl StoreSession for MemorySession {
    async fn start_transaction(&mut self) -> CResult<()> {
        if self.txn.is_some() {
            return Err(Error::TransactionState(format!(
                "transaction already in progress on session {}",
                self.id
            )));
        }
        lock(&self.shared)?.trip(Operation::StartTransaction)?;
        self.txn = Some(BTreeMap::new());
        Ok(())
    }

    async fn commit_transaction(&mut self) -> CResult<()> {
        self.finish(true)
    }

    async fn abort_transaction(&mut self) -> CResult<()> {
        self.finish(false)
    }

    async fn increment_balance(&mut self, id: AccountId, delta: i32) -> CResult<u64> {
        let mut shared = lock(&self.shared)?;
        shared.trip(Operation::Update)?;
        shared.check_intent(id, Some(self.id))?;

        match self.txn.as_mut() {
            Some(writes) => {
                let current = writes.get(&id).or_else(|| shared.committed.get(&id)).copied();
                let Some(mut account) = current else {
                    return Ok(0);
                };
                add_balance(&mut account, delta)?;
                writes.insert(id, account);
                shared.intents.insert(id, self.id);
            }
            None => {
                let Some(account) = shared.committed.get_mut(&id) else {
                    return Ok(0);
                };
                add_balance(account, delta)?;
            }
        }
        Ok(1)
    }

    async fn find(&mut self, id: AccountId) -> CResult<Option<Account>> {
        let own = self.txn.as_ref().and_then(|writes| writes.get(&id)).copied();
        if own.is_some() {
            return Ok(own);
        }
        Ok(lock(&self.shared)?.committed.get(&id).copied())
    }

    fn in_transaction(&self) -> bool {
        self.txn.is_some()
    }
}

impl Drop for MemorySession {
    fn drop(&mut self) {
        if self.txn.take().is_some() {
            if let Ok(mut shared) = self.shared.lock() {
                let id = self.id;
                shared.intents.retain(|_, owner| *owner != id);
            }
            debug!("memory session {} dropped with an open transaction, writes discarded", self.id);
        }
    }
}
