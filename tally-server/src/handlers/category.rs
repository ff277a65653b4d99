use tally_common::db::{self, DbThreadPool};
use tally_common::messages::CategoryList;

use actix_web::{web, HttpResponse};

use crate::handlers::error::HttpErrorResponse;
use crate::middleware::user::RequestingUser;

pub async fn get_all(
    db_thread_pool: web::Data<DbThreadPool>,
    user: RequestingUser,
) -> Result<HttpResponse, HttpErrorResponse> {
    let category_dao = db::category::Dao::new(&db_thread_pool);
    let categories =
        match web::block(move || category_dao.get_categories_for_user(user.id())).await? {
            Ok(c) => c,
            Err(e) => {
                return Err(HttpErrorResponse::from_dao_error(
                    e,
                    "Failed to get categories",
                ))
            }
        };

    Ok(HttpResponse::Ok().json(CategoryList { categories }))
}

#[cfg(test)]
mod tests {
    use super::*;

    use tally_common::clock::ManualClock;
    use tally_common::messages::{ErrorType, ServerErrorResponse};

    use actix_web::http::StatusCode;
    use actix_web::test::{self, TestRequest};
    use chrono::Utc;
    use std::sync::Arc;
    use uuid::Uuid;

    use crate::handlers::test_utils;
    use crate::handlers::USER_ID_HEADER;

    #[actix_web::test]
    async fn test_get_all_requires_user_and_storage() {
        let app = test_utils::init_app(
            test_utils::unreachable_db_pool(),
            Arc::new(ManualClock::new(Utc::now())),
        )
        .await;

        let req = TestRequest::get().uri("/api/category").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let body: ServerErrorResponse = test::read_body_json(resp).await;
        assert_eq!(body.err_type, ErrorType::MissingHeader);

        let req = TestRequest::get()
            .uri("/api/category")
            .insert_header((USER_ID_HEADER, Uuid::now_v7().to_string()))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[actix_web::test]
    async fn test_get_all_lists_system_and_own_categories() {
        let app = test_utils::init_app(
            test_utils::DB_THREAD_POOL.clone(),
            Arc::new(ManualClock::new(Utc::now())),
        )
        .await;

        let user_id = Uuid::now_v7();
        let system_category_id = test_utils::insert_category(None);
        let own_category_id = test_utils::insert_category(Some(user_id));
        let other_users_category_id = test_utils::insert_category(Some(Uuid::now_v7()));

        let req = TestRequest::get()
            .uri("/api/category")
            .insert_header((USER_ID_HEADER, user_id.to_string()))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let list: CategoryList = test::read_body_json(resp).await;
        let ids = list.categories.iter().map(|c| c.id).collect::<Vec<_>>();

        assert!(ids.contains(&system_category_id));
        assert!(ids.contains(&own_category_id));
        assert!(!ids.contains(&other_users_category_id));

        let system_position = ids.iter().position(|id| *id == system_category_id);
        let own_position = ids.iter().position(|id| *id == own_category_id);
        assert!(system_position < own_position);
    }
}
