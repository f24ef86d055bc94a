//! Comment threads and reviews on listings, plus the moderator actions on
//! both.

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use repomart_model::comment::{
    EditCommentRequest, FlagRequest, NewCommentRequest, ReviewRequest, VoteRequest,
};
use repomart_model::{ApiResponse, Comment, CommentId, RepoId, Review, ReviewId};

use crate::infra::{app_state::AppState, errors::AppResult};
use crate::middleware::CurrentUser;

pub async fn list_comments(
    State(state): State<AppState>,
    current: Option<Extension<CurrentUser>>,
    Path(repo_id): Path<RepoId>,
) -> AppResult<Json<ApiResponse<Vec<Comment>>>> {
    let viewer = current.as_ref().map(|Extension(c)| &c.user);
    let comments = state.market().comments.list(repo_id, viewer).await?;
    Ok(Json(ApiResponse::success(comments)))
}

pub async fn post_comment(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(repo_id): Path<RepoId>,
    Json(request): Json<NewCommentRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<Comment>>)> {
    let comment = state
        .market()
        .comments
        .post(&current.user, repo_id, request)
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(comment))))
}

pub async fn edit_comment(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(comment_id): Path<CommentId>,
    Json(request): Json<EditCommentRequest>,
) -> AppResult<Json<ApiResponse<Comment>>> {
    let comment = state
        .market()
        .comments
        .edit(&current.user, comment_id, request)
        .await?;
    Ok(Json(ApiResponse::success(comment)))
}

pub async fn delete_comment(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(comment_id): Path<CommentId>,
) -> AppResult<Json<ApiResponse<Comment>>> {
    let comment = state
        .market()
        .comments
        .delete(&current.user, comment_id)
        .await?;
    Ok(Json(ApiResponse::success(comment)))
}

pub async fn vote_comment(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(comment_id): Path<CommentId>,
    Json(request): Json<VoteRequest>,
) -> AppResult<Json<ApiResponse<Comment>>> {
    let comment = state
        .market()
        .comments
        .vote(&current.user, comment_id, request.direction)
        .await?;
    Ok(Json(ApiResponse::success(comment)))
}

pub async fn flag_comment(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(comment_id): Path<CommentId>,
    Json(request): Json<FlagRequest>,
) -> AppResult<Json<ApiResponse<Comment>>> {
    let comment = state
        .market()
        .comments
        .flag(&current.user, comment_id, &request.reason)
        .await?;
    Ok(Json(ApiResponse::success(comment)))
}

pub async fn unflag_comment(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(comment_id): Path<CommentId>,
) -> AppResult<Json<ApiResponse<Comment>>> {
    let comment = state
        .market()
        .comments
        .revert_flag(&current.user, comment_id)
        .await?;
    Ok(Json(ApiResponse::success(comment)))
}

pub async fn list_reviews(
    State(state): State<AppState>,
    Path(repo_id): Path<RepoId>,
) -> AppResult<Json<ApiResponse<Vec<Review>>>> {
    let reviews = state.market().reviews.list(repo_id).await?;
    Ok(Json(ApiResponse::success(reviews)))
}

pub async fn submit_review(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(repo_id): Path<RepoId>,
    Json(request): Json<ReviewRequest>,
) -> AppResult<Json<ApiResponse<Review>>> {
    let review = state
        .market()
        .reviews
        .submit(&current.user, repo_id, request)
        .await?;
    Ok(Json(ApiResponse::success(review)))
}

pub async fn delete_review(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(review_id): Path<ReviewId>,
) -> AppResult<StatusCode> {
    state
        .market()
        .reviews
        .delete(&current.user, review_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn flag_review(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(review_id): Path<ReviewId>,
    Json(request): Json<FlagRequest>,
) -> AppResult<Json<ApiResponse<Review>>> {
    let review = state
        .market()
        .reviews
        .flag(&current.user, review_id, &request.reason)
        .await?;
    Ok(Json(ApiResponse::success(review)))
}

pub async fn unflag_review(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(review_id): Path<ReviewId>,
) -> AppResult<Json<ApiResponse<Review>>> {
    let review = state
        .market()
        .reviews
        .revert_flag(&current.user, review_id)
        .await?;
    Ok(Json(ApiResponse::success(review)))
}
