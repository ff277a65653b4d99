use actix_web::dev::Payload;
use actix_web::http::header::HeaderMap;
use actix_web::{FromRequest, HttpRequest};
use futures::future::{ready, Ready};
use std::borrow::Cow;
use uuid::Uuid;

use crate::handlers::error::HttpErrorResponse;
use crate::handlers::USER_ID_HEADER;

/// The user a request acts on behalf of. Callers are authenticated upstream, which forwards the
/// user's ID in the `TallyUserId` header.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct RequestingUser(Uuid);

impl RequestingUser {
    pub fn id(&self) -> Uuid {
        self.0
    }
}

impl FromRequest for RequestingUser {
    type Error = HttpErrorResponse;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(user_id_from_headers(req.headers()).map(RequestingUser))
    }
}

fn user_id_from_headers(headers: &HeaderMap) -> Result<Uuid, HttpErrorResponse> {
    let Some(header) = headers.get(USER_ID_HEADER) else {
        return Err(HttpErrorResponse::MissingHeader(Cow::Borrowed(
            "Requests must identify the user in the TallyUserId header",
        )));
    };

    header
        .to_str()
        .ok()
        .and_then(|s| Uuid::parse_str(s.trim()).ok())
        .ok_or(HttpErrorResponse::IncorrectlyFormed(Cow::Borrowed(
            "TallyUserId header must contain a UUID",
        )))
}
