use chrono::{DateTime, Utc};
use diesel::{Insertable, Queryable};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::schema::categories;

#[derive(Clone, Debug, Serialize, Deserialize, Identifiable, Queryable)]
#[diesel(table_name = categories)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Category {
    pub id: Uuid,

    // System categories have no owner and are visible to every user
    pub user_id: Option<Uuid>,

    pub name: String,
    pub category_type: String,
    pub color: String,
    pub is_system: bool,
    pub created_timestamp: DateTime<Utc>,
}

#[derive(Clone, Debug, Insertable)]
#[diesel(table_name = categories)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NewCategory<'a> {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub name: &'a str,
    pub category_type: &'a str,
    pub color: &'a str,
    pub is_system: bool,
    pub created_timestamp: DateTime<Utc>,
}
