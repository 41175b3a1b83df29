//! # Greeting Card Common Library
//!
//! Shared code for the greeting card services including:
//! - Message identifiers and the card catalog (portraits, captions, greetings)
//! - Event types (CardEvent enum) and the EventBus
//! - TOML configuration loading
//! - Common error type

pub mod config;
pub mod error;
pub mod events;
pub mod message;

pub use error::{Error, Result};
pub use message::MessageId;
