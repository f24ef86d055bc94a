use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use repomart_model::payout::{PayoutDecisionBody, PayoutRequestBody};
use repomart_model::{ApiResponse, LedgerEntry, PayoutId, PayoutRequest};

use crate::infra::{app_state::AppState, errors::AppResult};
use crate::middleware::CurrentUser;

pub async fn request_payout(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Json(body): Json<PayoutRequestBody>,
) -> AppResult<(StatusCode, Json<ApiResponse<PayoutRequest>>)> {
    let request = state
        .market()
        .payouts
        .request_payout(&current.user, body.amount)
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(request))))
}

pub async fn my_payouts(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> AppResult<Json<ApiResponse<Vec<PayoutRequest>>>> {
    let requests = state
        .market()
        .payouts
        .list_for_seller(&current.user)
        .await?;
    Ok(Json(ApiResponse::success(requests)))
}

pub async fn ledger(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> AppResult<Json<ApiResponse<Vec<LedgerEntry>>>> {
    let entries = state.market().payouts.ledger(&current.user).await?;
    Ok(Json(ApiResponse::success(entries)))
}

pub async fn pending_queue(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> AppResult<Json<ApiResponse<Vec<PayoutRequest>>>> {
    let pending = state.market().payouts.pending_queue(&current.user).await?;
    Ok(Json(ApiResponse::success(pending)))
}

pub async fn approve(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(payout_id): Path<PayoutId>,
    body: Option<Json<PayoutDecisionBody>>,
) -> AppResult<Json<ApiResponse<PayoutRequest>>> {
    let note = body.and_then(|Json(body)| body.note);
    let request = state
        .market()
        .payouts
        .approve(&current.user, payout_id, note)
        .await?;
    Ok(Json(ApiResponse::success(request)))
}

pub async fn reject(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(payout_id): Path<PayoutId>,
    body: Option<Json<PayoutDecisionBody>>,
) -> AppResult<Json<ApiResponse<PayoutRequest>>> {
    let note = body.and_then(|Json(body)| body.note);
    let request = state
        .market()
        .payouts
        .reject(&current.user, payout_id, note)
        .await?;
    Ok(Json(ApiResponse::success(request)))
}
