use axum::{Json, extract::State};
use tracing::info;

use giftcoin_types::api::{HealthResponse, SweepResponse};

use crate::error::{ApiError, blocking};
use crate::state::AppState;

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        ok: true,
        service: "giftcoin",
    })
}

/// Run the expiry sweep now instead of waiting for the background loop.
pub async fn sweep(State(state): State<AppState>) -> Result<Json<SweepResponse>, ApiError> {
    let report = blocking(move || state.gifts.sweep()).await?;
    info!("Manual sweep: refunded={} expired={}", report.refunded, report.expired);

    Ok(Json(SweepResponse {
        refunded: report.refunded,
        expired: report.expired,
    }))
}
