use giftcoin_types::models::GiftStatus;
use thiserror::Error;

/// Coarse classification used by the HTTP layer to choose a status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Conflict,
    Storage,
}

/// Every rejection the storefront can report. The `Display` text is shown to
/// the customer as-is.
#[derive(Debug, Error)]
pub enum GiftError {
    /// The field name is for logs only; customers see the generic prompt.
    #[error("필수 항목을 입력해주세요.")]
    MissingField(&'static str),

    #[error("코인 코드를 입력해주세요.")]
    MissingCode,

    #[error("최소 선물 금액은 {min}원입니다.")]
    AmountTooSmall { amount: i64, min: i64 },

    #[error("최대 선물 금액은 {max}원입니다.")]
    AmountTooLarge { amount: i64, max: i64 },

    #[error("결제 금액이 선물 금액과 일치하지 않습니다.")]
    AmountMismatch { expected: i64, actual: i64 },

    #[error("등록되지 않은 선물에는 등록 시각을 지정할 수 없습니다.")]
    RegisteredAtWithoutRegistration,

    #[error("선물을 찾을 수 없습니다.")]
    GiftNotFound,

    #[error("유효하지 않은 코인 코드입니다.")]
    InvalidCode,

    #[error("결제를 찾을 수 없습니다.")]
    PaymentNotFound,

    #[error("대화를 찾을 수 없습니다.")]
    ConversationNotFound,

    #[error("이미 등록된 코인 코드입니다.")]
    AlreadyRegistered,

    #[error("환불된 코인 코드입니다.")]
    Refunded,

    #[error("만료된 코인 코드입니다.")]
    Expired,

    #[error("결제가 완료되지 않은 선물입니다.")]
    NotPaid,

    #[error("결제 대기 중인 선물이 아닙니다.")]
    NotPending,

    #[error("이미 처리된 결제입니다.")]
    PaymentAlreadyProcessed,

    #[error("등록된 선물에만 감사 메시지를 남길 수 있습니다.")]
    NotRegistered,

    #[error("감사 메시지는 한 번만 남길 수 있습니다.")]
    ThankYouAlreadySent,

    #[error("'{from}' 상태에서 '{to}' 상태로 변경할 수 없습니다.")]
    InvalidTransition { from: GiftStatus, to: GiftStatus },

    #[error("만료 전에는 '{0}' 상태로 변경할 수 없습니다.")]
    NotYetExpired(GiftStatus),

    #[error("다른 요청이 먼저 선물을 변경했습니다. 다시 시도해주세요.")]
    ConcurrentUpdate,

    #[error("환불 금액 합계를 계산할 수 없습니다.")]
    CashOverflow,

    #[error("선물 코드를 생성하지 못했습니다.")]
    CodeSpaceExhausted,

    #[error("storage error: {0}")]
    Storage(#[from] anyhow::Error),
}

impl GiftError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingField(_)
            | Self::MissingCode
            | Self::AmountTooSmall { .. }
            | Self::AmountTooLarge { .. }
            | Self::AmountMismatch { .. }
            | Self::RegisteredAtWithoutRegistration
            | Self::InvalidCode
            | Self::PaymentNotFound => ErrorKind::Validation,
            Self::GiftNotFound | Self::ConversationNotFound => ErrorKind::NotFound,
            Self::AlreadyRegistered
            | Self::Refunded
            | Self::Expired
            | Self::NotPaid
            | Self::NotPending
            | Self::PaymentAlreadyProcessed
            | Self::NotRegistered
            | Self::ThankYouAlreadySent
            | Self::InvalidTransition { .. }
            | Self::NotYetExpired(_)
            | Self::ConcurrentUpdate => ErrorKind::Conflict,
            Self::CodeSpaceExhausted | Self::CashOverflow | Self::Storage(_) => ErrorKind::Storage,
        }
    }
}

pub type Result<T> = std::result::Result<T, GiftError>;
