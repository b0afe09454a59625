pub mod cash;
pub mod chat;
pub mod code;
pub mod error;
pub mod lifecycle;
pub mod memory;
pub mod payment;
pub mod service;
pub mod store;

pub use error::{ErrorKind, GiftError};
pub use service::{ChatService, GiftService};
