use chrono::{DateTime, Utc};
use diesel::{Insertable, Queryable};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::category::Category;
use crate::period::Period;
use crate::schema::budgets;

#[derive(
    Clone, Debug, PartialEq, Serialize, Deserialize, Associations, Identifiable, Queryable,
)]
#[diesel(belongs_to(Category, foreign_key = category_id))]
#[diesel(table_name = budgets)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Budget {
    pub id: Uuid,
    pub user_id: Uuid,
    pub category_id: Uuid,
    pub amount: Decimal,
    pub period: Period,
    pub reset_day: i32,

    // Start of the window that is currently open
    pub last_reset: Option<DateTime<Utc>>,

    pub created_timestamp: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = budgets)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NewBudget {
    pub id: Uuid,
    pub user_id: Uuid,
    pub category_id: Uuid,
    pub amount: Decimal,
    pub period: Period,
    pub reset_day: i32,
    pub last_reset: Option<DateTime<Utc>>,
    pub created_timestamp: DateTime<Utc>,
}
