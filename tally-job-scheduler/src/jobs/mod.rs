mod reset_budgets;

pub use reset_budgets::{ResetBudgetsJob, ResetSettings};

use tally_common::db::DaoError;

use async_trait::async_trait;
use std::fmt;
use std::time::Duration;
use tokio::task::JoinError;

#[derive(Debug)]
pub enum JobError {
    DaoFailure(DaoError),
    ConcurrencyError(JoinError),
    TimedOut(Duration),
}

impl fmt::Display for JobError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobError::DaoFailure(e) => {
                write!(f, "JobError: {e}")
            }
            JobError::ConcurrencyError(e) => {
                write!(f, "JobError: ConcurrencyError: {e}")
            }
            JobError::TimedOut(limit) => {
                write!(f, "JobError: Gave up after {} ms", limit.as_millis())
            }
        }
    }
}

impl std::error::Error for JobError {}

impl From<DaoError> for JobError {
    fn from(e: DaoError) -> Self {
        JobError::DaoFailure(e)
    }
}

impl From<JoinError> for JobError {
    fn from(e: JoinError) -> Self {
        JobError::ConcurrencyError(e)
    }
}

#[async_trait]
pub trait Job: Send {
    fn name(&self) -> &'static str;
    fn is_ready(&self) -> bool;
    async fn execute(&mut self) -> Result<(), JobError>;
}
