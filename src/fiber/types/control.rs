//! Step commands

use super::frame::DialogState;
use super::values::Val;
use serde_json::Value as JsonValue;

/// The single instruction a dialog step leaves behind
///
/// Every step of a dialog must end in exactly one of these.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Push `dialog`, start it with `args`, then run `resume` on its result
    Call {
        dialog: DialogState,
        args: Val,
        resume: JsonValue,
    },
    /// Suspend until the next inbound message, then run `resume`
    Wait { resume: JsonValue },
    /// Complete the current frame with a result
    Done(Val),
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::Call { .. } => "call",
            Command::Wait { .. } => "wait",
            Command::Done(_) => "done",
        }
    }
}
