use chrono::{DateTime, Utc};
use diesel::{Insertable, Queryable};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::budget::Budget;
use crate::schema::budget_history;

#[derive(
    Clone, Debug, PartialEq, Serialize, Deserialize, Associations, Identifiable, Queryable,
)]
#[diesel(belongs_to(Budget, foreign_key = budget_id))]
#[diesel(table_name = budget_history)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct BudgetHistory {
    pub id: Uuid,
    pub budget_id: Uuid,
    pub amount_spent: Decimal,
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
    pub created_timestamp: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = budget_history)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NewBudgetHistory {
    pub id: Uuid,
    pub budget_id: Uuid,
    pub amount_spent: Decimal,
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
    pub created_timestamp: DateTime<Utc>,
}
