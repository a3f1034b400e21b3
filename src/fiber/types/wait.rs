//! Wait descriptor

use super::values::Val;
use serde::{Deserialize, Serialize};

/// What the top frame needs before it can run again
///
/// A fiber carries exactly one of these. At a rest point it is always
/// `AwaitingMessage`; `Done` only exists transiently inside a turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "t", content = "v")]
pub enum Wait {
    /// Nothing pending (running step, or terminal fiber)
    None,
    /// Suspended until the next inbound message
    AwaitingMessage,
    /// An item is ready to be fed to the top frame's rest
    Done(Val),
}

impl Wait {
    pub fn is_awaiting_message(&self) -> bool {
        matches!(self, Wait::AwaitingMessage)
    }
}
