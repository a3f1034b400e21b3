//! # Fiber - Serializable Continuation Stack
//!
//! A conversation's paused computation, kept as data instead of a native
//! call stack so it can be written out between turns.
//!
//! ## Core Principles
//!
//! 1. **Stack-driven execution**: All state in `frames: Vec<Frame>`, no recursion
//! 2. **One pending wait**: `Fiber::wait` says what the top frame needs next
//! 3. **Trampoline**: each frame step returns a `Command`; the loop applies it
//! 4. **Pure engine**: No storage, no async - just runs until suspend or complete

pub mod errors;
pub mod exec_loop;
pub mod stack;
pub mod types;

#[cfg(test)]
mod tests;

pub use errors::ProtocolError;
pub use exec_loop::{run_until_rest, step, RunOutcome, Step, StepRunner};
pub use stack::Fiber;
pub use types::{json_to_val, val_to_json, Command, DialogState, Frame, Rest, Val, Wait, MAX_EXACT_INT};
