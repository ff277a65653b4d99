use chrono::{DateTime, Utc};
use diesel::pg::PgConnection;
use diesel::{dsl, ExpressionMethods, QueryDsl, QueryResult, RunQueryDsl};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::models::budget_history::{BudgetHistory, NewBudgetHistory};
use crate::schema::budget_history as budget_history_fields;
use crate::schema::budget_history::dsl::budget_history;

// History rows are append-only. They are removed only when their budget is deleted, through the
// ON DELETE CASCADE on budget_history.budget_id.

pub fn record_closed_window(
    conn: &mut PgConnection,
    budget_id: Uuid,
    amount_spent: Decimal,
    period_start: DateTime<Utc>,
    period_end: DateTime<Utc>,
) -> QueryResult<BudgetHistory> {
    let new_record = NewBudgetHistory {
        id: Uuid::now_v7(),
        budget_id,
        amount_spent,
        period_start,
        period_end,
        created_timestamp: period_end,
    };

    dsl::insert_into(budget_history)
        .values(&new_record)
        .get_result::<BudgetHistory>(conn)
}

/// Newest window first
pub fn load_for_budget(conn: &mut PgConnection, budget_id: Uuid) -> QueryResult<Vec<BudgetHistory>> {
    budget_history
        .filter(budget_history_fields::budget_id.eq(budget_id))
        .order(budget_history_fields::period_start.desc())
        .get_results::<BudgetHistory>(conn)
}
