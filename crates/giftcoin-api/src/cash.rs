use axum::{
    Json,
    extract::{Query, State, rejection::QueryRejection},
};

use giftcoin_types::api::{CashResponse, ContactQuery};
use giftcoin_types::models::Identity;

use crate::error::{ApiError, blocking};
use crate::state::AppState;

pub async fn get_cash(
    State(state): State<AppState>,
    query: Result<Query<ContactQuery>, QueryRejection>,
) -> Result<Json<CashResponse>, ApiError> {
    let Query(q) = query?;
    let sender = Identity::new(q.phone, q.email);
    if sender.is_empty() {
        return Err(ApiError::missing_contact());
    }

    let ledger = blocking(move || state.gifts.cash(&sender)).await?;
    Ok(Json(CashResponse {
        history: ledger.history,
        total_cash: ledger.total,
    }))
}
