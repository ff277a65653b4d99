use tally_common::clock::Clock;
use tally_common::db::budget::{self, ResetOutcome};
use tally_common::db::DaoError;
use tally_common::models::budget::Budget;
use tally_common::period;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::time;
use uuid::Uuid;

use crate::jobs::{Job, JobError};

/// Storage the reset job needs. Calls block, so the job runs them on the blocking pool.
pub trait BudgetResetStore: Send + Sync + 'static {
    fn budgets_with_anchor(&self) -> Result<Vec<Budget>, DaoError>;
    fn reset_if_due(&self, budget_id: Uuid, now: DateTime<Utc>)
        -> Result<ResetOutcome, DaoError>;
}

impl BudgetResetStore for budget::Dao {
    fn budgets_with_anchor(&self) -> Result<Vec<Budget>, DaoError> {
        self.get_budgets_with_anchor()
    }

    fn reset_if_due(
        &self,
        budget_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<ResetOutcome, DaoError> {
        self.reset_budget_if_due(budget_id, now)
    }
}

#[derive(Clone, Copy, Debug)]
pub struct ResetSettings {
    pub concurrency: usize,
    pub item_timeout: Duration,
    pub max_attempts: u32,
    pub retry_delay: Duration,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TickSummary {
    pub loaded: usize,
    pub due: usize,
    pub reset: usize,
    pub skipped: usize,
    pub failed: usize,
}

pub struct ResetBudgetsJob<S: BudgetResetStore> {
    store: Arc<S>,
    clock: Arc<dyn Clock>,
    settings: ResetSettings,
    is_running: bool,
}

impl<S: BudgetResetStore> ResetBudgetsJob<S> {
    pub fn new(store: S, clock: Arc<dyn Clock>, settings: ResetSettings) -> Self {
        Self {
            store: Arc::new(store),
            clock,
            settings,
            is_running: false,
        }
    }

    /// Closes every window that is due as of the clock's current time. Each budget is reset in
    /// its own transaction; a budget that fails is logged and counted, and the rest of the tick
    /// carries on. Only a failure to load the budgets fails the tick as a whole.
    pub async fn run_tick(&self) -> Result<TickSummary, JobError> {
        let now = self.clock.now();

        let store = Arc::clone(&self.store);
        let loaded_budgets =
            tokio::task::spawn_blocking(move || store.budgets_with_anchor()).await??;

        let due_budget_ids = loaded_budgets
            .iter()
            .filter(|b| match b.last_reset {
                Some(anchor) => period::is_due(b.period, b.reset_day, anchor, now),
                None => false,
            })
            .map(|b| b.id)
            .collect::<Vec<_>>();

        let mut summary = TickSummary {
            loaded: loaded_budgets.len(),
            due: due_budget_ids.len(),
            ..Default::default()
        };

        let mut results = stream::iter(due_budget_ids)
            .map(|budget_id| async move {
                (budget_id, self.reset_with_retries(budget_id, now).await)
            })
            .buffer_unordered(self.settings.concurrency.max(1));

        while let Some((budget_id, result)) = results.next().await {
            match result {
                Ok(ResetOutcome::Reset(record)) => {
                    summary.reset += 1;
                    log::debug!(
                        "Reset budget {} for tick at {}: spent {} in [{}, {})",
                        budget_id,
                        now,
                        record.amount_spent,
                        record.period_start,
                        record.period_end,
                    );
                }
                Ok(ResetOutcome::NotDue) | Ok(ResetOutcome::Missing) => summary.skipped += 1,
                Err(e) => {
                    summary.failed += 1;
                    log::error!(
                        "Failed to reset budget {} for tick at {}: {}",
                        budget_id,
                        now,
                        e
                    );
                }
            }
        }

        log::info!(
            "Budget reset tick at {}: {} loaded, {} due, {} reset, {} skipped, {} failed",
            now,
            summary.loaded,
            summary.due,
            summary.reset,
            summary.skipped,
            summary.failed,
        );

        Ok(summary)
    }

    async fn reset_with_retries(
        &self,
        budget_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<ResetOutcome, JobError> {
        let mut attempt = 1;

        loop {
            match self.reset_once(budget_id, now).await {
                Err(JobError::DaoFailure(e))
                    if e.is_transient() && attempt < self.settings.max_attempts =>
                {
                    log::warn!(
                        "Attempt {} to reset budget {} for tick at {} failed, retrying: {}",
                        attempt,
                        budget_id,
                        now,
                        e
                    );

                    attempt += 1;
                    time::sleep(self.settings.retry_delay).await;
                }
                result => return result,
            }
        }
    }

    async fn reset_once(
        &self,
        budget_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<ResetOutcome, JobError> {
        let store = Arc::clone(&self.store);
        let reset = tokio::task::spawn_blocking(move || store.reset_if_due(budget_id, now));

        // A timed out reset keeps running on the blocking pool and still commits or rolls back as
        // a whole. It is not retried.
        let outcome = time::timeout(self.settings.item_timeout, reset)
            .await
            .map_err(|_| JobError::TimedOut(self.settings.item_timeout))???;

        Ok(outcome)
    }
}

#[async_trait]
impl<S: BudgetResetStore> Job for ResetBudgetsJob<S> {
    fn name(&self) -> &'static str {
        "Reset Budgets"
    }

    fn is_ready(&self) -> bool {
        !self.is_running
    }

    async fn execute(&mut self) -> Result<(), JobError> {
        self.is_running = true;
        let result = self.run_tick().await;
        self.is_running = false;

        result.map(|_| ())
    }
}
