//! Current-user middleware.
//!
//! Authentication happens upstream. This layer only reads the identity the
//! gateway forwarded in `X-User-Id` and injects `UserContext`.

use axum::http::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::api::error::ApiError;
use crate::api::types::{UserContext, USER_HEADER};

/// Reject requests without a user identity; inject `UserContext` otherwise.
pub async fn require_user(mut req: Request<axum::body::Body>, next: Next) -> Response {
    let user_id = req
        .headers()
        .get(USER_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from);

    match user_id {
        Some(user_id) => {
            req.extensions_mut().insert(UserContext { user_id });
            next.run(req).await
        }
        None => ApiError::Unauthorized.into_response(),
    }
}
