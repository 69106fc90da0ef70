use std::path::Path;

use axum::{
    Router, middleware,
    routing::{delete, get, post},
};
use tower_http::services::ServeDir;

use crate::auth::{self, AppState};
use crate::metrics;
use crate::middleware::require_auth;
use crate::posts;
use crate::webhooks;

/// All routes. CORS and tracing layers are added by the binary.
pub fn router(state: AppState, static_dir: &Path) -> Router {
    let auth_layer = middleware::from_fn_with_state(state.clone(), require_auth);

    let api = Router::new()
        .route("/", get(metrics::index))
        .route("/api/healthz", get(metrics::healthz))
        .route("/api/reset", get(metrics::reset))
        .route("/api/users", post(auth::register).put(auth::update_profile))
        .route("/api/login", post(auth::login))
        .route("/api/refresh", post(auth::refresh))
        .route("/api/revoke", post(auth::revoke))
        .route(
            "/api/posts",
            get(posts::list).merge(post(posts::create).route_layer(auth_layer.clone())),
        )
        .route(
            "/api/posts/{post_id}",
            get(posts::get).merge(delete(posts::delete).route_layer(auth_layer)),
        )
        .route("/api/polka/webhooks", post(webhooks::polka))
        .route("/admin/metrics", get(metrics::admin_metrics));

    let files = Router::new()
        .nest_service("/app", ServeDir::new(static_dir))
        .layer(middleware::from_fn_with_state(state.clone(), metrics::count_hits));

    api.merge(files).with_state(state)
}
