use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
};
use tracing::debug;

use giftcoin_core::service::PaymentOutcome;
use giftcoin_types::api::{CompletePaymentResponse, CreatePaymentRequest, PaymentResponse};

use crate::error::{ApiError, blocking};
use crate::state::AppState;

const COMPLETED_MESSAGE: &str = "결제가 완료되었습니다.";

pub async fn create_payment(
    State(state): State<AppState>,
    payload: Result<Json<CreatePaymentRequest>, JsonRejection>,
) -> Result<Json<PaymentResponse>, ApiError> {
    let Json(req) = payload?;

    let payment =
        blocking(move || state.gifts.create_payment(req.gift_id, req.amount, req.method)).await?;

    Ok(Json(PaymentResponse {
        id: payment.id,
        gift_id: payment.gift_id,
        amount: payment.amount,
        method: payment.method,
        status: payment.status,
    }))
}

/// Called by the payment provider's return page. Repeating the call for an
/// already paid gift succeeds.
pub async fn complete_payment(
    State(state): State<AppState>,
    Path(payment_id): Path<String>,
) -> Result<Json<CompletePaymentResponse>, ApiError> {
    let outcome = blocking(move || state.gifts.complete_payment(&payment_id)).await?;
    if outcome == PaymentOutcome::AlreadyCompleted {
        debug!("Payment completion repeated");
    }

    Ok(Json(CompletePaymentResponse {
        success: true,
        message: COMPLETED_MESSAGE.to_string(),
    }))
}
