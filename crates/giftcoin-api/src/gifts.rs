use axum::{
    Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
};

use giftcoin_core::GiftError;
use giftcoin_core::lifecycle::{GiftDraft, GiftPatch};
use giftcoin_core::store::GiftQuery;
use giftcoin_types::api::{
    ContactQuery, CreateGiftRequest, CreateGiftResponse, GiftListQuery, RegisterGiftRequest,
    RegisterGiftResponse, RegisteredGift, ThankYouRequest, UpdateGiftRequest,
};
use giftcoin_types::models::{Gift, Identity};

use crate::error::{ApiError, blocking, parse_id};
use crate::state::AppState;

const REGISTERED_MESSAGE: &str = "코인이 성공적으로 등록되었습니다!";

pub async fn create_gift(
    State(state): State<AppState>,
    payload: Result<Json<CreateGiftRequest>, JsonRejection>,
) -> Result<Json<CreateGiftResponse>, ApiError> {
    let Json(req) = payload?;
    let draft = GiftDraft {
        amount: req.amount,
        sender_name: req.sender_name,
        sender_phone: req.sender_phone,
        sender_email: req.sender_email,
        receiver_name: req.receiver_name,
        receiver_phone: req.receiver_phone,
        receiver_email: req.receiver_email,
        message: req.message,
    };

    let gift = blocking(move || state.gifts.create_gift(draft)).await?;

    Ok(Json(CreateGiftResponse {
        id: gift.id,
        code: gift.code,
        amount: gift.amount,
        sender_name: gift.sender_name,
        receiver_name: gift.receiver_name,
        expires_at: gift.expires_at,
    }))
}

/// `?admin=true` lists everything; otherwise gifts sent by `phone`/`email`.
pub async fn list_gifts(
    State(state): State<AppState>,
    query: Result<Query<GiftListQuery>, QueryRejection>,
) -> Result<Json<Vec<Gift>>, ApiError> {
    let Query(q) = query?;
    let filter = if q.admin.as_deref() == Some("true") {
        GiftQuery::All
    } else {
        let sender = Identity::new(q.phone, q.email);
        if sender.is_empty() {
            return Err(ApiError::missing_contact());
        }
        GiftQuery::SentBy(sender)
    };

    let gifts = blocking(move || state.gifts.list_gifts(&filter)).await?;
    Ok(Json(gifts))
}

pub async fn received_gifts(
    State(state): State<AppState>,
    query: Result<Query<ContactQuery>, QueryRejection>,
) -> Result<Json<Vec<Gift>>, ApiError> {
    let Query(q) = query?;
    let receiver = Identity::new(q.phone, q.email);
    if receiver.is_empty() {
        return Err(ApiError::missing_contact());
    }

    let gifts = blocking(move || state.gifts.list_gifts(&GiftQuery::ReceivedBy(receiver))).await?;
    Ok(Json(gifts))
}

/// Accepts either the gift id or its redemption code in any spacing/case.
pub async fn get_gift(
    State(state): State<AppState>,
    Path(id_or_code): Path<String>,
) -> Result<Json<Gift>, ApiError> {
    let gift = blocking(move || state.gifts.get_gift(&id_or_code)).await?;
    Ok(Json(gift))
}

pub async fn update_gift(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateGiftRequest>, JsonRejection>,
) -> Result<Json<Gift>, ApiError> {
    let gift_id = parse_id(&id, GiftError::GiftNotFound)?;
    let Json(req) = payload?;
    let patch = GiftPatch {
        status: req.status,
        thank_you_message: req.thank_you_message,
        registered_at: req.registered_at,
        payment_id: req.payment_id,
    };

    let gift = blocking(move || state.gifts.update_gift(gift_id, patch)).await?;
    Ok(Json(gift))
}

pub async fn thank_you(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<ThankYouRequest>, JsonRejection>,
) -> Result<Json<Gift>, ApiError> {
    let gift_id = parse_id(&id, GiftError::GiftNotFound)?;
    let Json(req) = payload?;

    let gift = blocking(move || state.gifts.thank_you(gift_id, req.message)).await?;
    Ok(Json(gift))
}

pub async fn register_gift(
    State(state): State<AppState>,
    payload: Result<Json<RegisterGiftRequest>, JsonRejection>,
) -> Result<Json<RegisterGiftResponse>, ApiError> {
    let Json(req) = payload?;
    let code = req.code.unwrap_or_default();

    let gift = blocking(move || state.gifts.redeem(&code)).await?;

    Ok(Json(RegisterGiftResponse {
        success: true,
        message: REGISTERED_MESSAGE.to_string(),
        gift: RegisteredGift {
            id: gift.id,
            amount: gift.amount,
            sender_name: gift.sender_name,
        },
    }))
}
