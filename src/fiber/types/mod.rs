//! Type definitions for the fiber engine
//!
//! - Runtime values (Val)
//! - Frames and their continuations (Frame, Rest, DialogState)
//! - The wait descriptor (Wait)
//! - Step commands (Command)

pub mod control;
pub mod frame;
pub mod values;
pub mod wait;

pub use control::Command;
pub use frame::{DialogState, Frame, Rest};
pub use values::{json_to_val, val_to_json, Val, MAX_EXACT_INT};
pub use wait::Wait;
