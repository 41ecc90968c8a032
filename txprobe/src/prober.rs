use log::{info, warn};

use crate::account::{Account, PROBED_ACCOUNT, PROBE_DELTA};
use crate::error::CResult;
use crate::progress::{Progress, Step};
use crate::store::{AccountStore, StoreSession};

/// Log target of warnings worth surfacing to the operator.
pub const WARNINGS_TARGET: &str = "probe_warnings";

/// Where the probe's transaction ended up.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ProbeState {
    #[default]
    NotStarted,
    InTransaction,
    Committed,
    Aborted,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProbeReport {
    pub state: ProbeState,
    /// Balance read through an independent session while the transaction was open.
    pub before_commit: Option<i32>,
    /// Balance read without a session once the transaction committed.
    pub after_commit: Option<i32>,
    /// Message of the error that ended the transaction body, if any.
    pub error: Option<String>,
    /// The error was a write conflict with another transaction.
    pub write_conflict: bool,
}

impl ProbeReport {
    pub fn committed(&self) -> bool {
        self.state == ProbeState::Committed
    }

    /// True when the independent session saw the balance as it was before the
    /// transaction, i.e. the uncommitted write stayed invisible.
    pub fn isolation_held(&self) -> bool {
        self.before_commit.is_some() && self.before_commit == Account::baseline_balance(PROBED_ACCOUNT)
    }
}

/// Opens a transaction on one session, writes through it, reads the same
/// document through a second session, then commits and reads again.
///
/// An error inside the transaction body is reported through `progress`, the
/// transaction is aborted if still open, and the probe returns normally with
/// the error recorded in the report. Only failing to open the first session is
/// returned as an error.
pub async fn probe<S: AccountStore, P: Progress>(store: &S, progress: &mut P) -> CResult<ProbeReport> {
    // owned for the whole probe, so the abort below always has an open session
    let mut session = store.start_session().await?;
    let mut report = ProbeReport::default();

    if let Err(e) = transaction_body(store, &mut session, progress, &mut report).await {
        let message = e.to_string();
        report.write_conflict = e.is_write_conflict();
        if report.write_conflict {
            warn!(
                target: WARNINGS_TARGET,
                "account {} is held by another transaction: {}", PROBED_ACCOUNT, message
            );
        } else {
            warn!(target: WARNINGS_TARGET, "transaction failed in state {:?}: {}", report.state, message);
        }
        progress.step(Step::TransactionError(message.clone()));

        if session.in_transaction() {
            if let Err(abort) = session.abort_transaction().await {
                warn!(target: WARNINGS_TARGET, "abort failed: {}", abort);
            }
        }
        if report.state != ProbeState::Committed {
            report.state = ProbeState::Aborted;
        }
        report.error = Some(message);
    }

    info!(
        "probe finished: state={:?} before_commit={:?} after_commit={:?} isolation_held={}",
        report.state,
        report.before_commit,
        report.after_commit,
        report.isolation_held()
    );
    Ok(report)
}

async fn transaction_body<S: AccountStore, P: Progress>(
    store: &S,
    session: &mut S::Session,
    progress: &mut P,
    report: &mut ProbeReport,
) -> CResult<()> {
    session.start_transaction().await?;
    report.state = ProbeState::InTransaction;
    progress.step(Step::TransactionStarted);

    let matched = session.increment_balance(PROBED_ACCOUNT, PROBE_DELTA).await?;
    if matched == 0 {
        warn!(target: WARNINGS_TARGET, "account {} not found, nothing updated", PROBED_ACCOUNT);
    }
    progress.step(Step::Updated(PROBED_ACCOUNT));

    let seen = {
        let mut other = store.start_session().await?;
        other.find(PROBED_ACCOUNT).await?
    };
    report.before_commit = seen.map(|a| a.balance);
    progress.step(Step::OtherSessionRead {
        id: PROBED_ACCOUNT,
        balance: report.before_commit,
    });

    session.commit_transaction().await?;
    report.state = ProbeState::Committed;
    progress.step(Step::Committed);

    let committed = store.find(PROBED_ACCOUNT).await?;
    report.after_commit = committed.map(|a| a.balance);
    progress.step(Step::AfterCommitRead {
        id: PROBED_ACCOUNT,
        balance: report.after_commit,
    });

    Ok(())
}
