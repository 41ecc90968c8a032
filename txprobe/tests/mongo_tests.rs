//! Runs the probe against a live deployment. Transactions need a replica set
//! or a sharded cluster, e.g. a single-node `mongod --replSet rs0`.
//!
//! ```text
//! TXPROBE_TEST_URI=mongodb://localhost:27017/?directConnection=true cargo test -- --ignored
//! ```

use std::time::Duration;

use pretty_assertions::assert_eq;

use txprobe::account::Account;
use txprobe::error::CResult;
use txprobe::progress::RecordingProgress;
use txprobe::store::mongo::{Endpoint, MongoStore};
use txprobe::store::AccountStore;

fn endpoint() -> Endpoint {
    Endpoint {
        uri: std::env::var("TXPROBE_TEST_URI").unwrap_or_else(|_| "mongodb://localhost:27017".to_string()),
        collection: "accounts_probe_test".to_string(),
        server_selection_timeout: Duration::from_secs(5),
        ..Endpoint::default()
    }
}

#[tokio::test]
#[ignore = "needs a MongoDB replica set"]
async fn probe_against_mongodb() -> CResult<()> {
    let store = MongoStore::connect(&endpoint()).await?;

    for _ in 0..2 {
        let mut progress = RecordingProgress::new();
        let report = txprobe::run(&store, &mut progress).await?;

        assert_eq!(report.probe.error, None);
        assert_eq!(report.probe.before_commit, Some(1000));
        assert_eq!(report.probe.after_commit, Some(900));
        assert_eq!(
            store.find_all().await?,
            vec![Account::new(1, 900), Account::new(2, 500)]
        );
    }

    store.clear().await?;
    Ok(())
}

#[tokio::test]
async fn unreachable_endpoint_fails_to_connect() {
    let endpoint = Endpoint {
        uri: "mongodb://127.0.0.1:1/?serverSelectionTimeoutMS=200".to_string(),
        ..Endpoint::default()
    };
    assert!(MongoStore::connect(&endpoint).await.is_err());
}
