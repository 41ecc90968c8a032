use pretty_assertions::assert_eq;

use txprobe::account::Account;
use txprobe::error::CResult;
use txprobe::prober::ProbeState;
use txprobe::progress::{RecordingProgress, Step};
use txprobe::store::memory::{MemoryStore, Operation};
use txprobe::store::{AccountStore, StoreSession};

fn expected_lines() -> Vec<String> {
    vec![
        "Preparing test environment...",
        "Test environment prepared.",
        "Testing transaction isolation level...",
        "Transaction started...",
        "Updated Account 1 balance within transaction.",
        "Other session read (before commit): AccountId=1, Balance=1000",
        "Transaction committed.",
        "After commit read: AccountId=1, Balance=900",
        "Test completed.",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

#[tokio::test]
async fn setup_leaves_exactly_the_baseline() -> CResult<()> {
    let store = MemoryStore::new();
    store.insert_many(&[Account::new(42, 1)]).await?;

    let mut progress = RecordingProgress::new();
    txprobe::seeder::seed(&store, &mut progress).await?;

    assert_eq!(
        store.find_all().await?,
        vec![Account::new(1, 1000), Account::new(2, 500)]
    );
    Ok(())
}

#[tokio::test]
async fn independent_session_does_not_see_uncommitted_write() -> CResult<()> {
    let store = MemoryStore::new();
    let mut progress = RecordingProgress::new();

    let report = txprobe::run(&store, &mut progress).await?;

    assert_eq!(report.probe.before_commit, Some(1000));
    assert!(report.probe.isolation_held());
    Ok(())
}

#[tokio::test]
async fn committed_write_is_visible_everywhere() -> CResult<()> {
    let store = MemoryStore::new();
    let mut progress = RecordingProgress::new();

    let report = txprobe::run(&store, &mut progress).await?;
    assert!(report.probe.committed());
    assert_eq!(report.probe.after_commit, Some(900));

    let mut session = store.start_session().await?;
    assert_eq!(session.find(1).await?, Some(Account::new(1, 900)));
    assert_eq!(store.find(1).await?, Some(Account::new(1, 900)));
    Ok(())
}

#[tokio::test]
async fn failed_update_leaves_no_partial_write() -> CResult<()> {
    let store = MemoryStore::new();
    let mut progress = RecordingProgress::new();

    // seed first so the injected fault hits the probe's update, not a stale write
    txprobe::seeder::seed(&store, &mut progress).await?;
    store.fail_next(Operation::Update, "WriteConflict: simulated")?;
    let report = txprobe::prober::probe(&store, &mut progress).await?;

    assert_eq!(report.state, ProbeState::Aborted);
    assert_eq!(report.error.as_deref(), Some("store failure: WriteConflict: simulated"));
    assert_eq!(report.before_commit, None);
    assert_eq!(store.find(1).await?, Some(Account::new(1, 1000)));
    assert_eq!(store.find(2).await?, Some(Account::new(2, 500)));
    assert_eq!(store.pending_intents()?, 0);
    assert_eq!(
        progress.lines(),
        vec![
            "Test environment prepared.",
            "Transaction started...",
            "Error during transaction: store failure: WriteConflict: simulated",
        ]
    );
    Ok(())
}

#[tokio::test]
async fn reruns_converge_to_the_same_state() -> CResult<()> {
    let store = MemoryStore::new();

    for _ in 0..2 {
        let mut progress = RecordingProgress::new();
        let report = txprobe::run(&store, &mut progress).await?;
        assert_eq!(report.probe.before_commit, Some(1000));
        assert_eq!(report.probe.after_commit, Some(900));
        assert_eq!(
            store.find_all().await?,
            vec![Account::new(1, 900), Account::new(2, 500)]
        );
    }
    Ok(())
}

#[tokio::test]
async fn second_run_removes_first_runs_documents() -> CResult<()> {
    let store = MemoryStore::new();
    txprobe::run(&store, &mut RecordingProgress::new()).await?;

    let report = txprobe::run(&store, &mut RecordingProgress::new()).await?;
    assert_eq!(report.seed.removed, 2);
    assert_eq!(report.seed.inserted, 2);
    Ok(())
}

#[tokio::test]
async fn progress_lines_follow_the_fixed_order() -> CResult<()> {
    let store = MemoryStore::new();
    let mut progress = RecordingProgress::new();

    txprobe::run(&store, &mut progress).await?;

    assert_eq!(progress.lines(), expected_lines());
    assert_eq!(
        progress.steps.iter().filter(|s| **s == Step::Committed).count(),
        1
    );
    Ok(())
}

#[tokio::test]
async fn conflicting_transaction_is_reported_and_aborted() -> CResult<()> {
    let store = MemoryStore::new();
    let mut progress = RecordingProgress::new();
    txprobe::seeder::seed(&store, &mut progress).await?;

    // a transaction left open elsewhere holds account 1
    let mut blocker = store.start_session().await?;
    blocker.start_transaction().await?;
    blocker.increment_balance(1, 1).await?;

    let report = txprobe::prober::probe(&store, &mut progress).await?;
    assert_eq!(report.state, ProbeState::Aborted);
    assert!(report.write_conflict);
    assert!(progress
        .lines()
        .iter()
        .any(|l| l.starts_with("Error during transaction: write conflict on account 1")));

    blocker.abort_transaction().await?;
    assert_eq!(store.find(1).await?, Some(Account::new(1, 1000)));
    Ok(())
}

#[tokio::test]
async fn reseeding_under_an_open_transaction_is_fatal() -> CResult<()> {
    let store = MemoryStore::new();
    txprobe::run(&store, &mut RecordingProgress::new()).await?;

    let mut blocker = store.start_session().await?;
    blocker.start_transaction().await?;
    blocker.increment_balance(1, -5).await?;

    let mut progress = RecordingProgress::new();
    let err = txprobe::run(&store, &mut progress).await.unwrap_err();
    assert!(err.is_write_conflict());
    assert_eq!(progress.lines(), vec!["Preparing test environment..."]);

    // the blocker's commit lands on the untouched previous state
    blocker.commit_transaction().await?;
    assert_eq!(
        store.find_all().await?,
        vec![Account::new(1, 895), Account::new(2, 500)]
    );
    Ok(())
}
