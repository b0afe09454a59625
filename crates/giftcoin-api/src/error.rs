use axum::{
    Json,
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::{debug, error, warn};
use uuid::Uuid;

use giftcoin_core::{ErrorKind, GiftError};
use giftcoin_types::api::ErrorResponse;

const INTERNAL_MESSAGE: &str = "서버 오류가 발생했습니다. 잠시 후 다시 시도해주세요.";
const MALFORMED_REQUEST: &str = "잘못된 요청입니다.";
const MISSING_CONTACT: &str = "조회 조건을 입력해주세요.";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Gift(#[from] GiftError),

    #[error("{0}")]
    BadRequest(&'static str),

    #[error("blocking task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl ApiError {
    pub fn missing_contact() -> Self {
        Self::BadRequest(MISSING_CONTACT)
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::Gift(e) => match e.kind() {
                ErrorKind::Validation | ErrorKind::Conflict => StatusCode::BAD_REQUEST,
                ErrorKind::NotFound => StatusCode::NOT_FOUND,
                ErrorKind::Storage => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Join(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        warn!("Rejected JSON body: {}", rejection.body_text());
        Self::BadRequest(MALFORMED_REQUEST)
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        warn!("Rejected query string: {}", rejection.body_text());
        Self::BadRequest(MALFORMED_REQUEST)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status.is_server_error() {
            error!("Request failed: {:?}", self);
            INTERNAL_MESSAGE.to_string()
        } else {
            if let Self::Gift(GiftError::MissingField(field)) = &self {
                debug!("Request is missing field {}", field);
            }
            self.to_string()
        };
        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

/// Run a blocking service call off the async runtime.
pub(crate) async fn blocking<F, T>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> giftcoin_core::error::Result<T> + Send + 'static,
    T: Send + 'static,
{
    Ok(tokio::task::spawn_blocking(f).await??)
}

/// Parse a path id, reporting a malformed one as the given not-found error.
pub(crate) fn parse_id(raw: &str, not_found: GiftError) -> Result<Uuid, ApiError> {
    raw.trim().parse().map_err(|_| ApiError::Gift(not_found))
}
