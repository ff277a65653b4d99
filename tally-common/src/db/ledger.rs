use chrono::{DateTime, Utc};
use diesel::pg::PgConnection;
use diesel::{dsl, ExpressionMethods, QueryDsl, QueryResult, RunQueryDsl};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::schema::transactions as transaction_fields;
use crate::schema::transactions::dsl::transactions;

/// Sums the ledger entries recorded for `user_id` under `category_id` within the half-open window
/// `[start, end)`. An empty window sums to zero.
///
/// Takes a bare connection so it can run inside a caller's transaction.
pub fn sum_spending_in_window(
    conn: &mut PgConnection,
    user_id: Uuid,
    category_id: Uuid,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> QueryResult<Decimal> {
    let total = transactions
        .select(dsl::sum(transaction_fields::amount))
        .filter(transaction_fields::user_id.eq(user_id))
        .filter(transaction_fields::category_id.eq(category_id))
        .filter(transaction_fields::transaction_timestamp.ge(start))
        .filter(transaction_fields::transaction_timestamp.lt(end))
        .get_result::<Option<Decimal>>(conn)?;

    Ok(total.unwrap_or(Decimal::ZERO))
}
