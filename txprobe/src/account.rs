use serde_derive::{Deserialize, Serialize};

pub type AccountId = i32;

/// The account probed by the transaction.
pub const PROBED_ACCOUNT: AccountId = 1;

/// Increment applied to the probed account inside the transaction.
pub const PROBE_DELTA: i32 = -100;

/// BSON field holding the balance. The id lives in `_id`.
pub const BALANCE_FIELD: &str = "Balance";

/// An account document: `{ "_id": <id>, "Balance": <balance> }`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    #[serde(rename = "_id")]
    pub id: AccountId,

    #[serde(rename = "Balance")]
    pub balance: i32,
}

impl Account {
    pub fn new(id: AccountId, balance: i32) -> Self {
        Account { id, balance }
    }

    /// The records every run starts from.
    pub fn baseline() -> Vec<Account> {
        vec![Account::new(1, 1000), Account::new(2, 500)]
    }

    /// Balance of `id` in the baseline, if it is a baseline account.
    pub fn baseline_balance(id: AccountId) -> Option<i32> {
        Account::baseline()
            .into_iter()
            .find(|a| a.id == id)
            .map(|a| a.balance)
    }
}

#[cfg(test)]
mod test {
    use mongodb::bson::{self, doc};

    use super::Account;

    #[test]
    fn bson_layout() {
        let encoded = bson::to_document(&Account::new(1, 1000)).unwrap();
        assert_eq!(encoded, doc! { "_id": 1, "Balance": 1000 });

        let decoded: Account = bson::from_document(doc! { "_id": 2, "Balance": 500 }).unwrap();
        assert_eq!(decoded, Account::new(2, 500));
    }

    #[test]
    fn baseline() {
        assert_eq!(Account::baseline().len(), 2);
        assert_eq!(Account::baseline_balance(1), Some(1000));
        assert_eq!(Account::baseline_balance(2), Some(500));
        assert_eq!(Account::baseline_balance(3), None);
    }
}
