use std::future::{Ready, ready};

use actix_web::dev::Payload;
use actix_web::http::header;
use actix_web::{FromRequest, HttpRequest, web};

use crate::adapters::api::{ApiError, ApiState};
use crate::app::services::AuthHandler;
use crate::domain::models::Actor;

/// Caller resolved from the `Authorization: Bearer <token>` header.
/// Handlers taking this extractor reject unauthenticated requests with 401.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub Actor);

impl FromRequest for AuthenticatedUser {
    type Error = ApiError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(authenticate(req))
    }
}

fn authenticate(req: &HttpRequest) -> Result<AuthenticatedUser, ApiError> {
    let token = bearer_token(req).ok_or(ApiError::Unauthorized(
        "No token, authorization denied",
    ))?;

    let state = req.app_data::<web::Data<ApiState>>().ok_or_else(|| {
        tracing::error!("api state is not registered on the app");
        ApiError::Internal
    })?;

    match state.auth.authenticate(token)? {
        Some(actor) => Ok(AuthenticatedUser(actor)),
        None => Err(ApiError::Unauthorized("Token is not valid")),
    }
}

fn bearer_token(req: &HttpRequest) -> Option<&str> {
    req.headers()
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}
