//! `txprobe` seeds an account collection and runs one multi-document
//! transaction against it, to observe whether an independent session can see
//! the transaction's uncommitted write.
//!
//! The flow is strictly sequential: seed, open a transaction on session A,
//! decrement account 1, read account 1 through session B, commit, read again.
//! Every step is reported through a [`progress::Progress`] sink.
//!
//! ## Getting started
//!
//! ```rust,no_run
//! use txprobe::progress::ConsoleProgress;
//! use txprobe::store::mongo::{Endpoint, MongoStore};
//!
//! async fn probe() -> txprobe::error::CResult<()> {
//!     let store = MongoStore::connect(&Endpoint::default()).await?;
//!     let report = txprobe::run(&store, &mut ConsoleProgress).await?;
//!     assert!(report.probe.isolation_held());
//!     Ok(())
//! }
//! ```

pub mod account;
pub mod error;
pub mod progress;
pub mod prober;
pub mod seeder;
pub mod store;

use crate::error::CResult;
use crate::prober::ProbeReport;
use crate::progress::{Progress, Step};
use crate::seeder::SeedSummary;
use crate::store::AccountStore;

/// Outcome of a full run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RunReport {
    pub seed: SeedSummary,
    pub probe: ProbeReport,
}

/// Seeds the store and probes it.
///
/// Seeding errors, and failing to open the probing session, are returned.
/// Errors inside the transaction are reported and recorded in the result.
pub async fn run<S: AccountStore, P: Progress>(store: &S, progress: &mut P) -> CResult<RunReport> {
    progress.step(Step::Preparing);
    let seed = seeder::seed(store, progress).await?;

    progress.step(Step::Testing);
    let probe = prober::probe(store, progress).await?;

    progress.step(Step::Completed);
    Ok(RunReport { seed, probe })
}
