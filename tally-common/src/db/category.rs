use diesel::{BoolExpressionMethods, ExpressionMethods, QueryDsl, RunQueryDsl};
use uuid::Uuid;

use crate::db::{DaoError, DbThreadPool};
use crate::models::category::Category;
use crate::schema::categories as category_fields;
use crate::schema::categories::dsl::categories;

pub struct Dao {
    db_thread_pool: DbThreadPool,
}

impl Dao {
    pub fn new(db_thread_pool: &DbThreadPool) -> Self {
        Self {
            db_thread_pool: db_thread_pool.clone(),
        }
    }

    /// System categories first, then the user's own, each group sorted by name
    pub fn get_categories_for_user(&self, user_id: Uuid) -> Result<Vec<Category>, DaoError> {
        Ok(categories
            .filter(
                category_fields::user_id
                    .is_null()
                    .or(category_fields::user_id.eq(user_id)),
            )
            .order((category_fields::is_system.desc(), category_fields::name.asc()))
            .load::<Category>(&mut self.db_thread_pool.get()?)?)
    }
}
