//! Persistent dialog state for stateless conversational handlers
//!
//! A conversation's paused dialog logic is kept as a serializable stack of
//! frames (a [`fiber::Fiber`]). Each inbound message is one turn: the
//! [`driver::Conversation`] loads the stored fiber, delivers the message,
//! runs dialogs until the next wait, and writes the fiber back.

pub mod cli;
pub mod config;
pub mod db;
pub mod dialog;
pub mod driver;
pub mod fiber;
pub mod snapshot;
pub mod store;
pub mod types;

#[cfg(test)]
pub mod test_dialogs;

// Re-export main types
pub use types::*;

pub use config::Config;
pub use dialog::{Dialog, DialogContext, DialogError, DialogRegistry};
pub use driver::{Conversation, TurnError, TurnResponse};
pub use fiber::{Fiber, Val};
pub use snapshot::{SnapshotCodec, SnapshotError};
pub use store::{BotDataStore, MemoryStore, PgStore};
