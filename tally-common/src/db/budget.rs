use chrono::{DateTime, Utc};
use diesel::pg::PgConnection;
use diesel::{
    dsl, BoolExpressionMethods, ExpressionMethods, OptionalExtension, QueryDsl, QueryResult,
    RunQueryDsl,
};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::db::{budget_history as history_recorder, ledger, DaoError, DbThreadPool};
use crate::messages::{BudgetHistoryList, BudgetWithSpending};
use crate::models::budget::{Budget, NewBudget};
use crate::models::budget_history::BudgetHistory;
use crate::period::{self, Period};
use crate::schema::budgets as budget_fields;
use crate::schema::budgets::dsl::budgets;
use crate::schema::categories as category_fields;
use crate::schema::categories::dsl::categories;
use crate::validators::{self, Validity};

pub const UNIQUE_BUDGET_PER_CATEGORY: &str = "unique_budget_per_category";

#[derive(Clone, Debug, PartialEq)]
pub enum ResetOutcome {
    Reset(BudgetHistory),
    NotDue,
    Missing,
}

pub struct Dao {
    db_thread_pool: DbThreadPool,
}

impl Dao {
    pub fn new(db_thread_pool: &DbThreadPool) -> Self {
        Self {
            db_thread_pool: db_thread_pool.clone(),
        }
    }

    pub fn create_budget(
        &self,
        user_id: Uuid,
        category_id: Uuid,
        amount: Decimal,
        period: Period,
        reset_day: i32,
        now: DateTime<Utc>,
    ) -> Result<Budget, DaoError> {
        if let Validity::Invalid(msg) = validators::validate_budget_terms(amount, period, reset_day)
        {
            return Err(DaoError::ValidationFailure(msg));
        }

        let new_budget = NewBudget {
            id: Uuid::now_v7(),
            user_id,
            category_id,
            amount,
            period,
            reset_day,
            last_reset: Some(period::initial_anchor(period, reset_day, now)),
            created_timestamp: now,
        };

        let mut db_connection = self.db_thread_pool.get()?;

        let budget = db_connection
            .build_transaction()
            .run::<_, diesel::result::Error, _>(|conn| {
                // Users may budget against system categories and their own categories only
                categories
                    .select(category_fields::id)
                    .find(category_id)
                    .filter(
                        category_fields::user_id
                            .is_null()
                            .or(category_fields::user_id.eq(user_id)),
                    )
                    .get_result::<Uuid>(conn)?;

                dsl::insert_into(budgets)
                    .values(&new_budget)
                    .get_result::<Budget>(conn)
            })?;

        Ok(budget)
    }

    pub fn update_budget(
        &self,
        budget_id: Uuid,
        user_id: Uuid,
        amount: Option<Decimal>,
        period: Option<Period>,
        reset_day: Option<i32>,
    ) -> Result<Budget, DaoError> {
        let mut db_connection = self.db_thread_pool.get()?;

        db_connection
            .build_transaction()
            .run::<_, DaoError, _>(|conn| {
                let current = budgets
                    .find(budget_id)
                    .filter(budget_fields::user_id.eq(user_id))
                    .for_update()
                    .get_result::<Budget>(conn)?;

                let amount = amount.unwrap_or(current.amount);
                let period = period.unwrap_or(current.period);
                let reset_day = reset_day.unwrap_or(current.reset_day);

                if let Validity::Invalid(msg) =
                    validators::validate_budget_terms(amount, period, reset_day)
                {
                    return Err(DaoError::ValidationFailure(msg));
                }

                // last_reset stays as it is. The open window keeps its anchor and the new terms
                // take effect from the next reset.
                let updated = dsl::update(budgets.find(budget_id))
                    .set((
                        budget_fields::amount.eq(amount),
                        budget_fields::period.eq(period),
                        budget_fields::reset_day.eq(reset_day),
                    ))
                    .get_result::<Budget>(conn)?;

                Ok(updated)
            })
    }

    pub fn delete_budget(&self, budget_id: Uuid, user_id: Uuid) -> Result<(), DaoError> {
        let deleted_row_count = diesel::delete(
            budgets
                .find(budget_id)
                .filter(budget_fields::user_id.eq(user_id)),
        )
        .execute(&mut self.db_thread_pool.get()?)?;

        if deleted_row_count == 0 {
            return Err(DaoError::QueryFailure(diesel::result::Error::NotFound));
        }

        Ok(())
    }

    pub fn get_budget_with_spending(
        &self,
        budget_id: Uuid,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<BudgetWithSpending, DaoError> {
        let mut db_connection = self.db_thread_pool.get()?;

        let budget = db_connection
            .build_transaction()
            .read_only()
            .run::<_, diesel::result::Error, _>(|conn| {
                let (budget, category_name, category_type) = budgets
                    .inner_join(categories)
                    .filter(budget_fields::id.eq(budget_id))
                    .filter(budget_fields::user_id.eq(user_id))
                    .select((
                        budget_fields::all_columns,
                        category_fields::name,
                        category_fields::category_type,
                    ))
                    .get_result::<(Budget, String, String)>(conn)?;

                attach_current_spending(conn, budget, category_name, category_type, now)
            })?;

        Ok(budget)
    }

    pub fn get_budgets_with_spending(
        &self,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Vec<BudgetWithSpending>, DaoError> {
        let mut db_connection = self.db_thread_pool.get()?;

        let output_budgets = db_connection
            .build_transaction()
            .read_only()
            .run::<_, diesel::result::Error, _>(|conn| {
                let loaded_budgets = budgets
                    .inner_join(categories)
                    .filter(budget_fields::user_id.eq(user_id))
                    .order(category_fields::name.asc())
                    .select((
                        budget_fields::all_columns,
                        category_fields::name,
                        category_fields::category_type,
                    ))
                    .load::<(Budget, String, String)>(conn)?;

                loaded_budgets
                    .into_iter()
                    .map(|(budget, category_name, category_type)| {
                        attach_current_spending(conn, budget, category_name, category_type, now)
                    })
                    .collect::<QueryResult<Vec<_>>>()
            })?;

        Ok(output_budgets)
    }

    pub fn get_budget_history(
        &self,
        budget_id: Uuid,
        user_id: Uuid,
    ) -> Result<BudgetHistoryList, DaoError> {
        let mut db_connection = self.db_thread_pool.get()?;

        let history = db_connection
            .build_transaction()
            .read_only()
            .run::<_, diesel::result::Error, _>(|conn| {
                budgets
                    .select(budget_fields::id)
                    .find(budget_id)
                    .filter(budget_fields::user_id.eq(user_id))
                    .get_result::<Uuid>(conn)?;

                history_recorder::load_for_budget(conn, budget_id)
            })?;

        Ok(BudgetHistoryList { budget_id, history })
    }

    pub fn get_budgets_with_anchor(&self) -> Result<Vec<Budget>, DaoError> {
        Ok(budgets
            .filter(budget_fields::last_reset.is_not_null())
            .order(budget_fields::id.asc())
            .load::<Budget>(&mut self.db_thread_pool.get()?)?)
    }

    /// Closes the budget's open window if it is due as of `now`: the spend over
    /// `[last_reset, now)` is archived and the anchor moves to `now`. All of it commits together
    /// or not at all.
    ///
    /// The budget row stays locked for the whole transaction and the due check is repeated under
    /// the lock, so a reset that races another reset or an edit of the same budget either sees the
    /// advanced anchor (and reports `NotDue`) or waits for the other transaction to finish.
    pub fn reset_budget_if_due(
        &self,
        budget_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<ResetOutcome, DaoError> {
        let mut db_connection = self.db_thread_pool.get()?;

        let outcome = db_connection
            .build_transaction()
            .run::<_, diesel::result::Error, _>(|conn| {
                let budget = budgets
                    .find(budget_id)
                    .for_update()
                    .get_result::<Budget>(conn)
                    .optional()?;

                let Some(budget) = budget else {
                    return Ok(ResetOutcome::Missing);
                };

                let Some(anchor) = budget.last_reset else {
                    return Ok(ResetOutcome::NotDue);
                };

                if !period::is_due(budget.period, budget.reset_day, anchor, now) {
                    return Ok(ResetOutcome::NotDue);
                }

                let amount_spent = ledger::sum_spending_in_window(
                    conn,
                    budget.user_id,
                    budget.category_id,
                    anchor,
                    now,
                )?;

                let record =
                    history_recorder::record_closed_window(conn, budget.id, amount_spent, anchor, now)?;

                dsl::update(budgets.find(budget.id))
                    .set(budget_fields::last_reset.eq(now))
                    .execute(conn)?;

                Ok(ResetOutcome::Reset(record))
            })?;

        Ok(outcome)
    }
}

fn attach_current_spending(
    conn: &mut PgConnection,
    budget: Budget,
    category_name: String,
    category_type: String,
    now: DateTime<Utc>,
) -> QueryResult<BudgetWithSpending> {
    let current_spent = match budget.last_reset {
        Some(anchor) if anchor < now => {
            ledger::sum_spending_in_window(conn, budget.user_id, budget.category_id, anchor, now)?
        }
        _ => Decimal::ZERO,
    };

    Ok(BudgetWithSpending {
        budget,
        category_name,
        category_type,
        current_spent,
    })
}
