use chrono::{DateTime, Utc};
use diesel::{Insertable, Queryable};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::category::Category;
use crate::schema::transactions;

#[derive(Clone, Debug, Serialize, Deserialize, Associations, Identifiable, Queryable)]
#[diesel(belongs_to(Category, foreign_key = category_id))]
#[diesel(table_name = transactions)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Transaction {
    pub id: Uuid,
    pub user_id: Uuid,
    pub category_id: Option<Uuid>,
    pub amount: Decimal,
    pub description: String,
    pub transaction_type: String,
    pub transaction_timestamp: DateTime<Utc>,
    pub created_timestamp: DateTime<Utc>,
}

#[derive(Clone, Debug, Insertable)]
#[diesel(table_name = transactions)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NewTransaction<'a> {
    pub id: Uuid,
    pub user_id: Uuid,
    pub category_id: Option<Uuid>,
    pub amount: Decimal,
    pub description: &'a str,
    pub transaction_type: &'a str,
    pub transaction_timestamp: DateTime<Utc>,
    pub created_timestamp: DateTime<Utc>,
}
