pub mod educator;
pub mod extract;
pub mod health;
pub mod quiz;

use axum::{
    extract::DefaultBodyLimit,
    middleware::{from_fn, from_fn_with_state},
    routing::{delete, get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::middleware::{
    auth::{require_bearer_auth, require_educator},
    cors::quiz_cors,
    rate_limit::{rps_middleware, RateLimiter},
};
use crate::AppState;

const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Builds the full HTTP surface. Every `/api/quiz` route requires a bearer
/// token; the management routes additionally require an educator or admin.
pub fn router(state: AppState, public_rps: u32, educator_rps: u32) -> Router {
    let base_routes = Router::new().route("/health", get(health::health));

    let student_api = Router::new()
        .route("/api/quiz/all", get(quiz::list_available))
        .route("/api/quiz/take/:quiz_id", get(quiz::take_quiz))
        .route("/api/quiz/submit/:quiz_id", post(quiz::submit_quiz))
        .layer(from_fn_with_state(
            RateLimiter::new(public_rps),
            rps_middleware,
        ));

    let educator_api = Router::new()
        .route("/api/quiz/create", post(educator::create_quiz))
        .route("/api/quiz/all-managed", get(educator::list_managed))
        .route("/api/quiz/results/:quiz_id", get(educator::get_results))
        .route(
            "/api/quiz/export-results/:quiz_id",
            get(educator::export_results),
        )
        .route("/api/quiz/:quiz_id", delete(educator::delete_quiz))
        .route_layer(from_fn(require_educator))
        .layer(from_fn_with_state(
            RateLimiter::new(educator_rps),
            rps_middleware,
        ));

    let authenticated = student_api
        .merge(educator_api)
        .route_layer(from_fn_with_state(state.clone(), require_bearer_auth));

    base_routes
        .merge(authenticated)
        .with_state(state)
        .layer(quiz_cors())
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
}
