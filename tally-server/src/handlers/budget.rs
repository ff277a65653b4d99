use tally_common::clock::Clock;
use tally_common::db::budget::UNIQUE_BUDGET_PER_CATEGORY;
use tally_common::db::{self, DbThreadPool};
use tally_common::messages::{BudgetList, BudgetUpdate, Confirmation, NewBudget};
use tally_common::validators::{self, Validity};

use actix_web::{web, HttpResponse};
use std::borrow::Cow;
use uuid::Uuid;

use crate::handlers::error::{DoesNotExistType, HttpErrorResponse};
use crate::middleware::user::RequestingUser;

const BUDGET_NOT_FOUND_MSG: &str = "No budget with the given ID belongs to the user";

pub async fn get_all(
    db_thread_pool: web::Data<DbThreadPool>,
    clock: web::Data<dyn Clock>,
    user: RequestingUser,
) -> Result<HttpResponse, HttpErrorResponse> {
    let now = clock.now();

    let budget_dao = db::budget::Dao::new(&db_thread_pool);
    let budgets =
        match web::block(move || budget_dao.get_budgets_with_spending(user.id(), now)).await? {
            Ok(b) => b,
            Err(e) => return Err(HttpErrorResponse::from_dao_error(e, "Failed to get budgets")),
        };

    Ok(HttpResponse::Ok().json(BudgetList { budgets }))
}

pub async fn get(
    db_thread_pool: web::Data<DbThreadPool>,
    clock: web::Data<dyn Clock>,
    user: RequestingUser,
    budget_id: web::Path<Uuid>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let now = clock.now();
    let budget_id = budget_id.into_inner();

    let budget_dao = db::budget::Dao::new(&db_thread_pool);
    let budget = match web::block(move || {
        budget_dao.get_budget_with_spending(budget_id, user.id(), now)
    })
    .await?
    {
        Ok(b) => b,
        Err(e) if e.is_not_found() => {
            return Err(HttpErrorResponse::DoesNotExist(
                Cow::Borrowed(BUDGET_NOT_FOUND_MSG),
                DoesNotExistType::Budget,
            ));
        }
        Err(e) => return Err(HttpErrorResponse::from_dao_error(e, "Failed to get budget")),
    };

    Ok(HttpResponse::Ok().json(budget))
}

pub async fn create(
    db_thread_pool: web::Data<DbThreadPool>,
    clock: web::Data<dyn Clock>,
    user: RequestingUser,
    new_budget: web::Json<NewBudget>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let new_budget = new_budget.into_inner();

    if let Validity::Invalid(msg) =
        validators::validate_budget_terms(new_budget.amount, new_budget.period, new_budget.reset_day)
    {
        return Err(HttpErrorResponse::IncorrectlyFormed(Cow::Borrowed(msg)));
    }

    let now = clock.now();

    let budget_dao = db::budget::Dao::new(&db_thread_pool);
    let budget = match web::block(move || {
        budget_dao.create_budget(
            user.id(),
            new_budget.category_id,
            new_budget.amount,
            new_budget.period,
            new_budget.reset_day,
            now,
        )
    })
    .await?
    {
        Ok(b) => b,
        Err(e) if e.is_unique_violation(UNIQUE_BUDGET_PER_CATEGORY) => {
            return Err(HttpErrorResponse::ConflictWithExisting(Cow::Borrowed(
                "A budget already exists for this category",
            )));
        }
        Err(e) if e.is_not_found() => {
            return Err(HttpErrorResponse::DoesNotExist(
                Cow::Borrowed("No category with the given ID is available to the user"),
                DoesNotExistType::Category,
            ));
        }
        Err(e) => return Err(HttpErrorResponse::from_dao_error(e, "Failed to create budget")),
    };

    Ok(HttpResponse::Created().json(budget))
}

pub async fn edit(
    db_thread_pool: web::Data<DbThreadPool>,
    user: RequestingUser,
    budget_id: web::Path<Uuid>,
    budget_update: web::Json<BudgetUpdate>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let budget_id = budget_id.into_inner();
    let budget_update = budget_update.into_inner();

    if budget_update.is_empty() {
        return Err(HttpErrorResponse::IncorrectlyFormed(Cow::Borrowed(
            "Request did not include any changes",
        )));
    }

    if let Some(amount) = budget_update.amount {
        if let Validity::Invalid(msg) = validators::validate_amount(amount) {
            return Err(HttpErrorResponse::IncorrectlyFormed(Cow::Borrowed(msg)));
        }
    }

    let budget_dao = db::budget::Dao::new(&db_thread_pool);
    let budget = match web::block(move || {
        budget_dao.update_budget(
            budget_id,
            user.id(),
            budget_update.amount,
            budget_update.period,
            budget_update.reset_day,
        )
    })
    .await?
    {
        Ok(b) => b,
        Err(e) if e.is_not_found() => {
            return Err(HttpErrorResponse::DoesNotExist(
                Cow::Borrowed(BUDGET_NOT_FOUND_MSG),
                DoesNotExistType::Budget,
            ));
        }
        Err(e) => return Err(HttpErrorResponse::from_dao_error(e, "Failed to update budget")),
    };

    Ok(HttpResponse::Ok().json(budget))
}

pub async fn delete(
    db_thread_pool: web::Data<DbThreadPool>,
    user: RequestingUser,
    budget_id: web::Path<Uuid>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let budget_id = budget_id.into_inner();

    let budget_dao = db::budget::Dao::new(&db_thread_pool);
    match web::block(move || budget_dao.delete_budget(budget_id, user.id())).await? {
        Ok(()) => (),
        Err(e) if e.is_not_found() => {
            return Err(HttpErrorResponse::DoesNotExist(
                Cow::Borrowed(BUDGET_NOT_FOUND_MSG),
                DoesNotExistType::Budget,
            ));
        }
        Err(e) => return Err(HttpErrorResponse::from_dao_error(e, "Failed to delete budget")),
    };

    Ok(HttpResponse::Ok().json(Confirmation {
        message: String::from("Budget deleted"),
    }))
}

pub async fn get_history(
    db_thread_pool: web::Data<DbThreadPool>,
    user: RequestingUser,
    budget_id: web::Path<Uuid>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let budget_id = budget_id.into_inner();

    let budget_dao = db::budget::Dao::new(&db_thread_pool);
    let history =
        match web::block(move || budget_dao.get_budget_history(budget_id, user.id())).await? {
            Ok(h) => h,
            Err(e) if e.is_not_found() => {
                return Err(HttpErrorResponse::DoesNotExist(
                    Cow::Borrowed(BUDGET_NOT_FOUND_MSG),
                    DoesNotExistType::Budget,
                ));
            }
            Err(e) => {
                return Err(HttpErrorResponse::from_dao_error(
                    e,
                    "Failed to get budget history",
                ))
            }
        };

    Ok(HttpResponse::Ok().json(history))
}

#[cfg(test)]
mod tests {
    use super::*;

    use tally_common::clock::ManualClock;
    use tally_common::messages::{
        BudgetHistoryList, BudgetWithSpending, ErrorType, ServerErrorResponse,
    };
    use tally_common::models::budget::Budget;
    use tally_common::period::Period;

    use actix_web::http::StatusCode;
    use actix_web::test::{self, TestRequest};
    use chrono::{DateTime, TimeZone, Utc};
    use rust_decimal::Decimal;
    use serde_json::json;
    use std::sync::Arc;

    use crate::handlers::test_utils;
    use crate::handlers::USER_ID_HEADER;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 20, 9, 0, 0).unwrap()
    }

    #[actix_web::test]
    async fn test_requests_without_user_are_rejected() {
        let app = test_utils::init_app(
            test_utils::unreachable_db_pool(),
            Arc::new(ManualClock::new(now())),
        )
        .await;

        let req = TestRequest::get().uri("/api/budget").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let body: ServerErrorResponse = test::read_body_json(resp).await;
        assert_eq!(body.err_type, ErrorType::MissingHeader);

        let req = TestRequest::get()
            .uri("/api/budget")
            .insert_header((USER_ID_HEADER, "user-1"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let body: ServerErrorResponse = test::read_body_json(resp).await;
        assert_eq!(body.err_type, ErrorType::IncorrectlyFormed);
    }

    #[actix_web::test]
    async fn test_create_rejects_invalid_terms_before_storage() {
        let app = test_utils::init_app(
            test_utils::unreachable_db_pool(),
            Arc::new(ManualClock::new(now())),
        )
        .await;

        let user_id = Uuid::now_v7();

        let req = TestRequest::post()
            .uri("/api/budget")
            .insert_header((USER_ID_HEADER, user_id.to_string()))
            .set_json(json!({
                "category_id": Uuid::now_v7(),
                "amount": "50.00",
                "period": "weekly",
                "reset_day": 7,
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let body: ServerErrorResponse = test::read_body_json(resp).await;
        assert_eq!(body.err_type, ErrorType::IncorrectlyFormed);
        assert!(body.err_message.contains("Weekly reset day"));

        let req = TestRequest::post()
            .uri("/api/budget")
            .insert_header((USER_ID_HEADER, user_id.to_string()))
            .set_json(json!({
                "category_id": Uuid::now_v7(),
                "amount": "0",
                "period": "monthly",
                "reset_day": 1,
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let body: ServerErrorResponse = test::read_body_json(resp).await;
        assert!(body.err_message.contains("greater than zero"));

        let req = TestRequest::post()
            .uri("/api/budget")
            .insert_header((USER_ID_HEADER, user_id.to_string()))
            .set_json(json!({
                "category_id": Uuid::now_v7(),
                "amount": "20.00",
                "period": "fortnightly",
                "reset_day": 1,
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let body: ServerErrorResponse = test::read_body_json(resp).await;
        assert_eq!(body.err_type, ErrorType::IncorrectlyFormed);
    }

    #[actix_web::test]
    async fn test_malformed_ids_and_empty_edits_are_rejected() {
        let app = test_utils::init_app(
            test_utils::unreachable_db_pool(),
            Arc::new(ManualClock::new(now())),
        )
        .await;

        let user_id = Uuid::now_v7();

        let req = TestRequest::get()
            .uri("/api/budget/not-a-uuid")
            .insert_header((USER_ID_HEADER, user_id.to_string()))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let req = TestRequest::put()
            .uri(&format!("/api/budget/{}", Uuid::now_v7()))
            .insert_header((USER_ID_HEADER, user_id.to_string()))
            .set_json(json!({}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let body: ServerErrorResponse = test::read_body_json(resp).await;
        assert_eq!(body.err_type, ErrorType::IncorrectlyFormed);

        let req = TestRequest::put()
            .uri(&format!("/api/budget/{}", Uuid::now_v7()))
            .insert_header((USER_ID_HEADER, user_id.to_string()))
            .set_json(json!({ "amount": "-5" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn test_unreachable_storage_is_reported_as_unavailable() {
        let app = test_utils::init_app(
            test_utils::unreachable_db_pool(),
            Arc::new(ManualClock::new(now())),
        )
        .await;

        let req = TestRequest::get()
            .uri("/api/budget")
            .insert_header((USER_ID_HEADER, Uuid::now_v7().to_string()))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);

        let body: ServerErrorResponse = test::read_body_json(resp).await;
        assert_eq!(body.err_type, ErrorType::StorageUnavailable);
    }

    #[actix_web::test]
    async fn test_budget_lifecycle() {
        let clock = Arc::new(ManualClock::new(now()));
        let app =
            test_utils::init_app(test_utils::DB_THREAD_POOL.clone(), Arc::clone(&clock)).await;

        let user_id = Uuid::now_v7();
        let category_id = test_utils::insert_category(Some(user_id));
        let other_users_category_id = test_utils::insert_category(Some(Uuid::now_v7()));

        let req = TestRequest::post()
            .uri("/api/budget")
            .insert_header((USER_ID_HEADER, user_id.to_string()))
            .set_json(json!({
                "category_id": category_id,
                "amount": "300.00",
                "period": "monthly",
                "reset_day": 15,
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);

        let budget: Budget = test::read_body_json(resp).await;
        assert_eq!(budget.user_id, user_id);
        assert_eq!(budget.amount, Decimal::new(30000, 2));
        assert_eq!(budget.period, Period::Monthly);
        assert_eq!(
            budget.last_reset,
            Some(Utc.with_ymd_and_hms(2024, 6, 15, 9, 0, 0).unwrap())
        );

        // Only one budget per category
        let req = TestRequest::post()
            .uri("/api/budget")
            .insert_header((USER_ID_HEADER, user_id.to_string()))
            .set_json(json!({
                "category_id": category_id,
                "amount": "100.00",
                "period": "weekly",
                "reset_day": 1,
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CONFLICT);

        let req = TestRequest::post()
            .uri("/api/budget")
            .insert_header((USER_ID_HEADER, user_id.to_string()))
            .set_json(json!({
                "category_id": other_users_category_id,
                "amount": "100.00",
                "period": "weekly",
                "reset_day": 1,
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let body: ServerErrorResponse = test::read_body_json(resp).await;
        assert_eq!(body.err_type, ErrorType::CategoryDoesNotExist);

        test_utils::insert_transaction(
            user_id,
            category_id,
            Decimal::new(4250, 2),
            Utc.with_ymd_and_hms(2024, 6, 16, 12, 0, 0).unwrap(),
        );

        let req = TestRequest::get()
            .uri("/api/budget")
            .insert_header((USER_ID_HEADER, user_id.to_string()))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let list: BudgetList = test::read_body_json(resp).await;
        assert_eq!(list.budgets.len(), 1);
        assert_eq!(list.budgets[0].budget.id, budget.id);
        assert_eq!(list.budgets[0].current_spent, Decimal::new(4250, 2));

        let req = TestRequest::get()
            .uri(&format!("/api/budget/{}", budget.id))
            .insert_header((USER_ID_HEADER, Uuid::now_v7().to_string()))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let req = TestRequest::put()
            .uri(&format!("/api/budget/{}", budget.id))
            .insert_header((USER_ID_HEADER, user_id.to_string()))
            .set_json(json!({ "amount": "350.00" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let updated: Budget = test::read_body_json(resp).await;
        assert_eq!(updated.amount, Decimal::new(35000, 2));
        assert_eq!(updated.last_reset, budget.last_reset);

        let req = TestRequest::get()
            .uri(&format!("/api/budget/{}", budget.id))
            .insert_header((USER_ID_HEADER, user_id.to_string()))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let single: BudgetWithSpending = test::read_body_json(resp).await;
        assert_eq!(single.budget, updated);
        assert_eq!(single.current_spent, Decimal::new(4250, 2));

        let req = TestRequest::get()
            .uri(&format!("/api/budget/{}/history", budget.id))
            .insert_header((USER_ID_HEADER, user_id.to_string()))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let history: BudgetHistoryList = test::read_body_json(resp).await;
        assert_eq!(history.budget_id, budget.id);
        assert!(history.history.is_empty());

        let req = TestRequest::delete()
            .uri(&format!("/api/budget/{}", budget.id))
            .insert_header((USER_ID_HEADER, user_id.to_string()))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let req = TestRequest::delete()
            .uri(&format!("/api/budget/{}", budget.id))
            .insert_header((USER_ID_HEADER, user_id.to_string()))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let body: ServerErrorResponse = test::read_body_json(resp).await;
        assert_eq!(body.err_type, ErrorType::BudgetDoesNotExist);
    }
}
