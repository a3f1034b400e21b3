//! Suspension protocol errors
//!
//! Any of these is fatal to the turn in which it occurs. The driver never
//! persists a fiber after one of them.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("input delivered while no wait is pending (fiber is {found})")]
    NoPendingWait { found: &'static str },

    #[error("done emitted with an empty frame stack")]
    Underflow,

    #[error("'{op}' requires an active frame but the stack is empty")]
    EmptyStack { op: &'static str },

    #[error("fiber already has a root frame")]
    AlreadyStarted,

    #[error("dialog '{kind}' returned without calling wait, call or done")]
    NoCommand { kind: String },

    #[error("dialog '{kind}' issued '{second}' after already issuing '{first}' in the same step")]
    MultipleCommands {
        kind: String,
        first: &'static str,
        second: &'static str,
    },

    #[error("top frame '{kind}' has no continuation to deliver to")]
    MissingContinuation { kind: String },

    #[error("fiber has frames but nothing pending and is not awaiting input")]
    Stalled,

    #[error("turn exceeded its budget of {steps} steps without reaching a rest point")]
    StepBudgetExhausted { steps: usize },
}
