//! Dialogs
//!
//! A dialog is a serializable struct whose fields are its locals and whose
//! `Resume` type names the points it can continue from. Dialog code only
//! talks to the conversation through [`DialogContext`]; it never sees the
//! fiber or the store.

pub mod context;
pub mod registry;
pub mod root_loop;


use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

use crate::fiber::{DialogState, ProtocolError, Val};
use crate::store::StorageError;

pub use context::{DialogContext, TurnScope};
pub use registry::{DialogRegistry, DialogRunner};
pub use root_loop::{RootLoop, RootLoopResume};

/// Start/resume contract every dialog implements
///
/// Each call must end with exactly one of `ctx.wait`, `ctx.call` or
/// `ctx.done`.
pub trait Dialog: Serialize + DeserializeOwned + Send + 'static {
    /// Stable name the dialog is registered and persisted under
    const KIND: &'static str;

    /// Continuations of this dialog
    type Resume: Serialize + DeserializeOwned;

    fn start(&mut self, ctx: &mut DialogContext<'_, Self::Resume>, args: Val)
        -> Result<(), DialogError>;

    /// `input` is the child's result after a call, or the inbound message
    /// (see [`crate::types::Message::to_val`]) after a wait
    fn resume(
        &mut self,
        ctx: &mut DialogContext<'_, Self::Resume>,
        resume: Self::Resume,
        input: Val,
    ) -> Result<(), DialogError>;
}

/// Capture a dialog instance as frame data
pub fn dialog_state<D: Dialog>(dialog: &D) -> Result<DialogState, DialogError> {
    let state = serde_json::to_value(dialog).map_err(|source| DialogError::EncodeState {
        kind: D::KIND,
        source,
    })?;
    Ok(DialogState::new(D::KIND, state))
}

#[derive(Debug, Error)]
pub enum DialogError {
    #[error("failed to encode state of dialog '{kind}': {source}")]
    EncodeState {
        kind: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to decode state of dialog '{kind}': {source}")]
    DecodeState {
        kind: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to encode continuation of dialog '{kind}': {source}")]
    EncodeResume {
        kind: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to decode continuation of dialog '{kind}': {source}")]
    DecodeResume {
        kind: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("dialog '{0}' is not registered")]
    Unregistered(String),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("dialog '{kind}' failed: {message}")]
    Failed { kind: String, message: String },
}

impl DialogError {
    /// Failure raised by dialog logic itself
    pub fn failed(kind: impl Into<String>, message: impl Into<String>) -> Self {
        DialogError::Failed {
            kind: kind.into(),
            message: message.into(),
        }
    }
}
