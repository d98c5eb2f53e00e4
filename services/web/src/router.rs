use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use tower::ServiceBuilder;
use tower_http::{services::ServeDir, trace::TraceLayer};

use schoolhub_core::health::healthz;
use schoolhub_core::middleware::{propagate_request_id_layer, request_id_layer};
use schoolhub_domain::image::MAX_IMAGE_BYTES;

use crate::handlers::{
    auth::{logout, me, request_otp, verify_otp},
    health::readyz,
    school::{add_school, get_schools},
};
use crate::state::AppState;

/// Room for the largest accepted image plus the text fields and multipart framing.
const ADD_SCHOOL_BODY_LIMIT: usize = MAX_IMAGE_BYTES as usize + 1024 * 1024;

pub fn build_router(state: AppState) -> Router {
    let mut router = Router::new()
        // Health
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        // Auth
        .route("/api/auth/request-otp", post(request_otp))
        .route("/api/auth/verify-otp", post(verify_otp))
        .route("/api/auth/logout", get(logout).post(logout))
        .route("/api/auth/me", get(me))
        // Directory
        .route(
            "/api/addSchool",
            post(add_school).layer(DefaultBodyLimit::max(ADD_SCHOOL_BODY_LIMIT)),
        )
        .route("/api/getSchools", get(get_schools));

    if let Some((url_prefix, dir)) = state.images.public_dir() {
        router = router.nest_service(url_prefix, ServeDir::new(dir));
    }

    router
        .layer(
            ServiceBuilder::new()
                .layer(request_id_layer())
                .layer(TraceLayer::new_for_http())
                .layer(propagate_request_id_layer()),
        )
        .with_state(state)
}
