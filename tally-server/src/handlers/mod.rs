pub mod budget;
pub mod category;
pub mod health;

pub const USER_ID_HEADER: &str = "TallyUserId";

pub mod error {
    use tally_common::db::DaoError;
    use tally_common::messages::{ErrorType, ServerErrorResponse};

    use actix_web::http::StatusCode;
    use actix_web::HttpResponse;
    use std::borrow::Cow;
    use std::fmt;

    #[derive(Debug)]
    pub enum DoesNotExistType {
        Budget,
        Category,
    }

    #[derive(Debug)]
    pub enum HttpErrorResponse {
        // 400
        IncorrectlyFormed(Cow<'static, str>),
        MissingHeader(Cow<'static, str>),

        // 404
        DoesNotExist(Cow<'static, str>, DoesNotExistType),

        // 409
        ConflictWithExisting(Cow<'static, str>),

        // 500
        InternalError(Cow<'static, str>),

        // 503
        StorageUnavailable(Cow<'static, str>),
    }

    impl HttpErrorResponse {
        /// For DAO failures the caller has no more specific mapping for. Pool exhaustion and
        /// connection failures surface as 503 so clients know to retry.
        pub fn from_dao_error(error: DaoError, context: &'static str) -> Self {
            match error {
                DaoError::DbThreadPoolFailure(e) => {
                    log::error!("{context}: {e}");
                    HttpErrorResponse::StorageUnavailable(Cow::Borrowed(context))
                }
                DaoError::ValidationFailure(msg) => {
                    HttpErrorResponse::IncorrectlyFormed(Cow::Borrowed(msg))
                }
                e => {
                    log::error!("{context}: {e}");
                    HttpErrorResponse::InternalError(Cow::Borrowed(context))
                }
            }
        }
    }

    impl std::error::Error for HttpErrorResponse {}

    impl fmt::Display for HttpErrorResponse {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            let server_error: ServerErrorResponse = self.into();
            write!(f, "{:?}", server_error)
        }
    }

    impl From<HttpErrorResponse> for ServerErrorResponse {
        fn from(resp: HttpErrorResponse) -> Self {
            (&resp).into()
        }
    }

    impl From<&HttpErrorResponse> for ServerErrorResponse {
        fn from(resp: &HttpErrorResponse) -> Self {
            match resp {
                // 400
                HttpErrorResponse::IncorrectlyFormed(msg) => ServerErrorResponse {
                    err_type: ErrorType::IncorrectlyFormed,
                    err_message: format!("Incorrectly formed request: {msg}"),
                },
                HttpErrorResponse::MissingHeader(msg) => ServerErrorResponse {
                    err_type: ErrorType::MissingHeader,
                    err_message: format!("Missing header: {msg}"),
                },

                // 404
                HttpErrorResponse::DoesNotExist(msg, dne_type) => ServerErrorResponse {
                    err_type: match dne_type {
                        DoesNotExistType::Budget => ErrorType::BudgetDoesNotExist,
                        DoesNotExistType::Category => ErrorType::CategoryDoesNotExist,
                    },
                    err_message: format!("Does not exist: {msg}"),
                },

                // 409
                HttpErrorResponse::ConflictWithExisting(msg) => ServerErrorResponse {
                    err_type: ErrorType::ConflictWithExisting,
                    err_message: format!("Conflict with existing data: {msg}"),
                },

                // 500
                HttpErrorResponse::InternalError(msg) => ServerErrorResponse {
                    err_type: ErrorType::InternalError,
                    err_message: format!("Internal error: {msg}"),
                },

                // 503
                HttpErrorResponse::StorageUnavailable(msg) => ServerErrorResponse {
                    err_type: ErrorType::StorageUnavailable,
                    err_message: format!("Storage unavailable: {msg}"),
                },
            }
        }
    }

    impl actix_web::error::ResponseError for HttpErrorResponse {
        fn error_response(&self) -> HttpResponse {
            HttpResponse::build(self.status_code()).json(ServerErrorResponse::from(self))
        }

        fn status_code(&self) -> StatusCode {
            match *self {
                HttpErrorResponse::IncorrectlyFormed(_) | HttpErrorResponse::MissingHeader(_) => {
                    StatusCode::BAD_REQUEST
                }
                HttpErrorResponse::DoesNotExist(_, _) => StatusCode::NOT_FOUND,
                HttpErrorResponse::ConflictWithExisting(_) => StatusCode::CONFLICT,
                HttpErrorResponse::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
                HttpErrorResponse::StorageUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            }
        }
    }

    impl From<actix_web::error::BlockingError> for HttpErrorResponse {
        fn from(_err: actix_web::error::BlockingError) -> Self {
            HttpErrorResponse::InternalError(Cow::Borrowed("Actix thread pool failure"))
        }
    }

}
