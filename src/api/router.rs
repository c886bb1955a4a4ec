//! Query API router.
//!
//! Returns a composable `Router` that can be mounted on any axum server.
//! Routes are nested under `/api/`.
//!
//! Middleware stack (outermost → innermost):
//! 1. User identity → 2. Access logger

use axum::http::{header, HeaderName, HeaderValue, Method, Uri};
use axum::routing::get;
use axum::Router;
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::api::endpoints;
use crate::api::error::ApiError;
use crate::api::middleware;
use crate::api::types::{ApiContext, USER_HEADER};

/// Build the analytics API router.
///
/// `/api/health` and `/api/analysis/reference-ranges` are open. Everything
/// else needs an `X-User-Id` header.
///
/// NOTE: Path params use `:param` syntax (matchit 0.7 / axum 0.7).
pub fn analytics_router(ctx: ApiContext) -> Router {
    // Layers are applied from bottom (innermost) to top (outermost):
    //   User → Audit → Handler
    let protected = Router::new()
        .route(
            "/analysis/trends/:parameter",
            get(endpoints::analysis::trends),
        )
        .route("/analysis/anomalies", get(endpoints::analysis::anomalies))
        .route(
            "/analysis/health-score",
            get(endpoints::analysis::health_score),
        )
        .route(
            "/records",
            get(endpoints::records::list).post(endpoints::records::append),
        )
        .with_state(ctx.clone())
        .layer(axum::middleware::from_fn(middleware::audit::log_access))
        .layer(axum::middleware::from_fn(middleware::user::require_user));

    // Open routes: nothing user-specific
    let unprotected = Router::new()
        .route("/health", get(endpoints::health::check))
        .route(
            "/analysis/reference-ranges",
            get(endpoints::analysis::reference_ranges),
        )
        .with_state(ctx);

    Router::new()
        .nest("/api", protected)
        .nest("/api", unprotected)
        .fallback(unknown_route)
}

async fn unknown_route(uri: Uri) -> ApiError {
    ApiError::NotFound(format!("No route for {}", uri.path()))
}

/// CORS for the configured front-end origins. Unparseable origins are skipped.
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(%origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([
            header::CONTENT_TYPE,
            HeaderName::from_static("x-user-id"),
        ])
}
