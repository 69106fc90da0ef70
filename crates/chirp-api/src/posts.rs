use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::info;

use chirp_db::Database;
use chirp_types::api::{CreatePostRequest, ListPostsQuery, SortOrder};
use chirp_types::models::{PostId, PostView, UserId};

use crate::auth::{AppState, blocking};
use crate::error::{ApiError, ApiResult};
use crate::middleware::{AuthUser, ensure_owner};

pub const MAX_POST_CHARS: usize = 140;

const MASK: &str = "****";
const PROFANITY: &[&str] = &["kerfuffle", "sharbert", "fornax"];

/// Reject bodies over [`MAX_POST_CHARS`] characters.
pub fn validate_body(body: &str) -> ApiResult<()> {
    if body.chars().count() > MAX_POST_CHARS {
        return Err(ApiError::ValidationFailed("Post is too long".into()));
    }
    Ok(())
}

/// Replace whole space-separated words on the profanity list, ignoring case.
/// Punctuation attached to a word keeps it from matching.
pub fn mask_profanity(body: &str) -> String {
    body.split(' ')
        .map(|word| {
            let lower = word.to_lowercase();
            if PROFANITY.contains(&lower.as_str()) { MASK } else { word }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// `NotFound("user")` if `author_id` was never a user.
pub fn create_post(db: &Database, author_id: UserId, body: &str) -> ApiResult<PostView> {
    validate_body(body)?;
    let post = db.create_post(author_id, &mask_profanity(body))?;
    info!("User {} created post {}", author_id, post.id);
    Ok(post.view())
}

pub fn get_post(db: &Database, id: PostId) -> ApiResult<PostView> {
    db.get_post(id)?
        .map(|p| p.view())
        .ok_or(ApiError::NotFound("post"))
}

pub fn list_posts(
    db: &Database,
    author_id: Option<UserId>,
    order: SortOrder,
) -> ApiResult<Vec<PostView>> {
    Ok(db
        .list_posts(author_id, order)?
        .iter()
        .map(|p| p.view())
        .collect())
}

/// Delete a post owned by `subject`. The ownership check and the removal
/// happen in one transaction.
pub fn delete_post(db: &Database, subject: UserId, id: PostId) -> ApiResult<()> {
    db.transaction(|doc| {
        let post = doc.posts.get(&id).ok_or(ApiError::NotFound("post"))?;
        ensure_owner(post, subject)?;
        doc.posts.remove(&id);
        Ok::<_, ApiError>(())
    })?;
    info!("User {} deleted post {}", subject, id);
    Ok(())
}

// -- Handlers --

pub async fn create(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<CreatePostRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let post = blocking(move || create_post(&state.db, user.id, &req.body)).await?;
    Ok((StatusCode::CREATED, Json(post)))
}

pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<ListPostsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let posts = blocking(move || list_posts(&state.db, query.author_id, query.sort)).await?;
    Ok(Json(posts))
}

pub async fn get(
    State(state): State<AppState>,
    Path(post_id): Path<PostId>,
) -> Result<impl IntoResponse, ApiError> {
    let post = blocking(move || get_post(&state.db, post_id)).await?;
    Ok(Json(post))
}

pub async fn delete(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(post_id): Path<PostId>,
) -> Result<impl IntoResponse, ApiError> {
    blocking(move || delete_post(&state.db, user.id, post_id)).await?;
    Ok(StatusCode::NO_CONTENT)
}
