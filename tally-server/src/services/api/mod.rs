use actix_web::error::{JsonPayloadError, PathError};
use actix_web::web::*;
use actix_web::HttpRequest;
use std::borrow::Cow;

use crate::handlers::error::HttpErrorResponse;

mod budget;
mod category;
mod health;

pub fn configure(cfg: &mut ServiceConfig) {
    cfg.service(
        scope("/api")
            .app_data(JsonConfig::default().error_handler(json_error_handler))
            .app_data(PathConfig::default().error_handler(path_error_handler))
            .configure(budget::configure)
            .configure(category::configure),
    )
    .configure(health::configure);
}

fn json_error_handler(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    HttpErrorResponse::IncorrectlyFormed(Cow::Owned(err.to_string())).into()
}

fn path_error_handler(_err: PathError, _req: &HttpRequest) -> actix_web::Error {
    HttpErrorResponse::IncorrectlyFormed(Cow::Borrowed("Budget ID must be a UUID")).into()
}
