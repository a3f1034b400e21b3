//! Frame types

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Persisted state of one dialog instance
///
/// `kind` names the registered dialog type, `state` holds its fields
/// (the dialog's locals) as JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DialogState {
    pub kind: String,
    pub state: JsonValue,
}

impl DialogState {
    pub fn new(kind: impl Into<String>, state: JsonValue) -> Self {
        Self {
            kind: kind.into(),
            state,
        }
    }
}

/// What a frame runs when the pending item is delivered to it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "t", content = "v")]
pub enum Rest {
    /// The dialog has been called but not started; the item is its arguments
    Start,
    /// A named continuation of the dialog; the item is a child result or a message
    Resume(JsonValue),
    /// The continuation has been taken by the running step
    Idle,
}

/// Execution frame - one per pending dialog call
///
/// Frames are stored innermost last. The frame stack replaces the native
/// call stack, making a paused conversation serializable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub dialog: DialogState,
    pub rest: Rest,
}
