pub mod admin;
pub mod cash;
pub mod conversations;
pub mod error;
pub mod gifts;
pub mod payments;
pub mod state;

use axum::{
    Router,
    routing::{get, post},
};

pub use error::ApiError;
pub use state::{AppState, AppStateInner};

/// All storefront routes. CORS and request tracing are layered on by the
/// binary.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(admin::health))
        .route("/api/gifts", post(gifts::create_gift).get(gifts::list_gifts))
        .route("/api/gifts/received", get(gifts::received_gifts))
        .route("/api/gifts/register", post(gifts::register_gift))
        .route("/api/gifts/{id}", get(gifts::get_gift).patch(gifts::update_gift))
        .route("/api/gifts/{id}/thank-you", post(gifts::thank_you))
        .route("/api/payments", post(payments::create_payment))
        .route("/api/payments/{id}/complete", post(payments::complete_payment))
        .route("/api/cash", get(cash::get_cash))
        .route(
            "/api/conversations",
            get(conversations::list_conversations).post(conversations::create_conversation),
        )
        .route("/api/conversations/{id}/close", post(conversations::close_conversation))
        .route(
            "/api/conversations/{id}/messages",
            get(conversations::get_messages).post(conversations::send_message),
        )
        .route("/api/admin/sweep", post(admin::sweep))
        .with_state(state)
}
