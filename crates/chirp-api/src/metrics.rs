use std::sync::atomic::Ordering;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{Html, IntoResponse, Response},
};

use crate::auth::AppState;

/// Count every request that reaches the static file server.
pub async fn count_hits(State(state): State<AppState>, req: Request, next: Next) -> Response {
    state.file_server_hits.fetch_add(1, Ordering::Relaxed);
    next.run(req).await
}

/// Landing page at the root.
pub async fn index() -> impl IntoResponse {
    Html("<html>\n<body>\n  <h1>Welcome to Chirp</h1>\n</body>\n</html>\n")
}

pub async fn admin_metrics(State(state): State<AppState>) -> impl IntoResponse {
    let hits = state.file_server_hits.load(Ordering::Relaxed);
    Html(format!(
        "<html>\n<body>\n  <h1>Welcome, Chirp Admin</h1>\n  <p>Chirp has been visited {hits} times!</p>\n</body>\n</html>\n"
    ))
}

pub async fn reset(State(state): State<AppState>) -> impl IntoResponse {
    state.file_server_hits.store(0, Ordering::Relaxed);
    "Hits reset"
}

pub async fn healthz() -> impl IntoResponse {
    "OK"
}
