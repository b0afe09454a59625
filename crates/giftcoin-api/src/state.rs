use std::sync::Arc;

use giftcoin_core::store::{ChatStore, GiftStore};
use giftcoin_core::{ChatService, GiftService};

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub gifts: GiftService,
    pub chat: ChatService,
}

impl AppStateInner {
    /// Build the shared state over one store backing both gifts and chat.
    pub fn new<S>(store: Arc<S>) -> AppState
    where
        S: GiftStore + ChatStore + 'static,
    {
        Self::from_services(GiftService::new(store.clone()), ChatService::new(store))
    }

    pub fn from_services(gifts: GiftService, chat: ChatService) -> AppState {
        Arc::new(Self { gifts, chat })
    }
}
