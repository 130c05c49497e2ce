pub mod engine;
pub mod error;
pub mod friends;
pub mod invites;
pub mod notifications;
pub mod visibility;

pub use engine::{ChatEngine, SentMessage, pair_key};
pub use error::{ChatError, Result};
