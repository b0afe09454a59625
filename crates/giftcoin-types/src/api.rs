use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{CashEntry, GiftStatus, PaymentStatus, SenderType};

// Request fields the storefront may omit are `Option`s so that a missing
// value is reported as a validation error with a readable message rather
// than as a deserialization failure.

// -- Errors --

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub service: &'static str,
}

// -- Gifts --

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateGiftRequest {
    pub amount: Option<i64>,
    pub sender_name: Option<String>,
    pub sender_phone: Option<String>,
    pub sender_email: Option<String>,
    pub receiver_name: Option<String>,
    pub receiver_phone: Option<String>,
    pub receiver_email: Option<String>,
    pub message: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateGiftResponse {
    pub id: Uuid,
    pub code: String,
    pub amount: i64,
    pub sender_name: String,
    pub receiver_name: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Default, Deserialize)]
pub struct GiftListQuery {
    pub admin: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ContactQuery {
    pub phone: Option<String>,
    pub email: Option<String>,
}

/// Admin partial update. Every field is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateGiftRequest {
    pub status: Option<GiftStatus>,
    pub thank_you_message: Option<String>,
    pub registered_at: Option<DateTime<Utc>>,
    pub payment_id: Option<Uuid>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ThankYouRequest {
    pub message: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RegisterGiftRequest {
    pub code: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisteredGift {
    pub id: Uuid,
    pub amount: i64,
    pub sender_name: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterGiftResponse {
    pub success: bool,
    pub message: String,
    pub gift: RegisteredGift,
}

// -- Payments --

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentRequest {
    pub gift_id: Option<Uuid>,
    pub amount: Option<i64>,
    pub method: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentResponse {
    pub id: Uuid,
    pub gift_id: Uuid,
    pub amount: i64,
    pub method: String,
    pub status: PaymentStatus,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CompletePaymentResponse {
    pub success: bool,
    pub message: String,
}

// -- Cash --

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CashResponse {
    pub history: Vec<CashEntry>,
    pub total_cash: i64,
}

// -- Support chat --

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateConversationRequest {
    pub user_name: Option<String>,
    pub user_email: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    pub sender_type: Option<SenderType>,
    pub content: Option<String>,
}

// -- Admin --

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepResponse {
    pub refunded: usize,
    pub expired: usize,
}
