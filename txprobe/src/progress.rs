use std::fmt::{Display, Formatter};

use log::info;

use crate::account::AccountId;

/// One line of the run log, in the order a run emits them.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Step {
    Preparing,
    Prepared,
    Testing,
    TransactionStarted,
    Updated(AccountId),
    OtherSessionRead { id: AccountId, balance: Option<i32> },
    Committed,
    AfterCommitRead { id: AccountId, balance: Option<i32> },
    TransactionError(String),
    Completed,
}

/// Missing documents print an empty balance.
struct Balance(Option<i32>);

impl Display for Balance {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.0 {
            Some(v) => write!(f, "{}", v),
            None => Ok(()),
        }
    }
}

impl Display for Step {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Step::Preparing => write!(f, "Preparing test environment..."),
            Step::Prepared => write!(f, "Test environment prepared."),
            Step::Testing => write!(f, "Testing transaction isolation level..."),
            Step::TransactionStarted => write!(f, "Transaction started..."),
            Step::Updated(id) => write!(f, "Updated Account {} balance within transaction.", id),
            Step::OtherSessionRead { id, balance } => write!(
                f,
                "Other session read (before commit): AccountId={}, Balance={}",
                id,
                Balance(*balance)
            ),
            Step::Committed => write!(f, "Transaction committed."),
            Step::AfterCommitRead { id, balance } => write!(
                f,
                "After commit read: AccountId={}, Balance={}",
                id,
                Balance(*balance)
            ),
            Step::TransactionError(message) => write!(f, "Error during transaction: {}", message),
            Step::Completed => write!(f, "Test completed."),
        }
    }
}

/// Receives the steps of a run as they happen.
pub trait Progress {
    fn step(&mut self, step: Step);
}

/// Prints each step on its own stdout line.
#[derive(Debug, Default)]
pub struct ConsoleProgress;

impl Progress for ConsoleProgress {
    fn step(&mut self, step: Step) {
        info!("{}", step);
        println!("{}", step);
    }
}

/// Keeps the steps in memory.
#[derive(Debug, Default)]
pub struct RecordingProgress {
    pub steps: Vec<Step>,
}

impl RecordingProgress {
    pub fn new() -> Self {
        Self::default()
    }

    /// The steps rendered as console lines.
    pub fn lines(&self) -> Vec<String> {
        self.steps.iter().map(|s| s.to_string()).collect()
    }
}

impl Progress for RecordingProgress {
    fn step(&mut self, step: Step) {
        self.steps.push(step);
    }
}
