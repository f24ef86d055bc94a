use axum::{
    Extension, Json,
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
};
use repomart_core::checkout::WebhookOutcome;
use repomart_core::error::CoreError;
use repomart_model::order::{CheckoutRequest, CheckoutResponse, ConfirmResponse};
use repomart_model::{ApiResponse, Order, OrderId};
use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::infra::{
    app_state::AppState,
    errors::{AppError, AppResult},
};
use crate::middleware::CurrentUser;

pub const SIGNATURE_HEADER: &str = "stripe-signature";

/// Starts a checkout. Free listings are granted immediately; paid listings
/// return the client secret for the payment intent.
pub async fn checkout(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Json(request): Json<CheckoutRequest>,
) -> AppResult<Json<ApiResponse<CheckoutResponse>>> {
    let response = state
        .market()
        .checkout
        .start_checkout(&current.user, request.repo_id)
        .await?;
    Ok(Json(ApiResponse::success(response)))
}

pub async fn confirm(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(order_id): Path<OrderId>,
) -> AppResult<Json<ApiResponse<ConfirmResponse>>> {
    let response = state
        .market()
        .checkout
        .confirm_payment(&current.user, order_id)
        .await?;
    Ok(Json(ApiResponse::success(response)))
}

pub async fn list_orders(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> AppResult<Json<ApiResponse<Vec<Order>>>> {
    let orders = state.market().checkout.list_orders(&current.user).await?;
    Ok(Json(ApiResponse::success(orders)))
}

pub async fn get_order(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(order_id): Path<OrderId>,
) -> AppResult<Json<ApiResponse<Order>>> {
    let order = state
        .market()
        .checkout
        .get_order(&current.user, order_id)
        .await?;
    Ok(Json(ApiResponse::success(order)))
}

pub async fn refund(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(order_id): Path<OrderId>,
) -> AppResult<Json<ApiResponse<Order>>> {
    let order = state.market().checkout.refund(&current.user, order_id).await?;
    Ok(Json(ApiResponse::success(order)))
}

/// Payment provider callback. Signature failures are answered with 400 so
/// the provider does not keep retrying a forged delivery.
pub async fn webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<Json<Value>> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| AppError::bad_request("Missing webhook signature"))?;

    let outcome = state
        .market()
        .checkout
        .handle_webhook(&body, signature)
        .await
        .map_err(|err| match err {
            CoreError::Unauthorized(msg) | CoreError::Validation(msg) => {
                warn!(error = %msg, "rejected webhook delivery");
                AppError::new(StatusCode::BAD_REQUEST, msg)
            }
            other => AppError::from(other),
        })?;

    debug!(?outcome, "webhook processed");
    Ok(Json(outcome_body(&outcome)))
}

fn outcome_body(outcome: &WebhookOutcome) -> Value {
    let (result, order_id) = match outcome {
        WebhookOutcome::Settled(id) => ("settled", Some(*id)),
        WebhookOutcome::AlreadySettled(id) => ("already_settled", Some(*id)),
        WebhookOutcome::MarkedFailed(id) => ("failed", Some(*id)),
        WebhookOutcome::MarkedCanceled(id) => ("canceled", Some(*id)),
        WebhookOutcome::Ignored => ("ignored", None),
    };
    json!({ "received": true, "result": result, "order_id": order_id })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcomes_are_reported_by_name() {
        let id = OrderId::new();
        let body = outcome_body(&WebhookOutcome::Settled(id));
        assert_eq!(body["result"], "settled");
        assert_eq!(body["order_id"], json!(id));

        let body = outcome_body(&WebhookOutcome::Ignored);
        assert_eq!(body["result"], "ignored");
        assert!(body["order_id"].is_null());
    }
}
