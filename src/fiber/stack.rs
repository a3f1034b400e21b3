//! Fiber state
//!
//! The fiber holds all execution state of one conversation:
//! - frames: Stack of pending dialog calls, innermost last
//! - wait: What the top frame needs next

use super::errors::ProtocolError;
use super::types::{Command, DialogState, Frame, Rest, Val, Wait};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt::Write;

/* ===================== Fiber ===================== */

/// Serializable continuation stack
///
/// This contains everything needed to persist and resume a conversation.
/// The data store it operates on is not part of it; the driver binds that
/// fresh for every turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fiber {
    /// Stack of pending frames
    pub frames: Vec<Frame>,

    /// The single pending wait
    pub wait: Wait,
}

impl Default for Fiber {
    fn default() -> Self {
        Self::new()
    }
}

impl Fiber {
    /// Create an empty fiber with nothing pending
    pub fn new() -> Self {
        Fiber {
            frames: vec![],
            wait: Wait::None,
        }
    }

    /// Push the root frame; `args` becomes its start item
    pub fn start(&mut self, dialog: DialogState, args: Val) -> Result<(), ProtocolError> {
        if !self.frames.is_empty() {
            return Err(ProtocolError::AlreadyStarted);
        }

        self.frames.push(Frame {
            dialog,
            rest: Rest::Start,
        });
        self.wait = Wait::Done(args);
        Ok(())
    }

    /// Push a child frame; the current top frame resumes with `resume` once
    /// the child is done
    pub fn call(
        &mut self,
        dialog: DialogState,
        args: Val,
        resume: JsonValue,
    ) -> Result<(), ProtocolError> {
        let top = self
            .frames
            .last_mut()
            .ok_or(ProtocolError::EmptyStack { op: "call" })?;
        top.rest = Rest::Resume(resume);

        self.frames.push(Frame {
            dialog,
            rest: Rest::Start,
        });
        self.wait = Wait::Done(args);
        Ok(())
    }

    /// Suspend the top frame until the next inbound message
    pub fn wait(&mut self, resume: JsonValue) -> Result<(), ProtocolError> {
        let top = self
            .frames
            .last_mut()
            .ok_or(ProtocolError::EmptyStack { op: "wait" })?;
        top.rest = Rest::Resume(resume);
        self.wait = Wait::AwaitingMessage;
        Ok(())
    }

    /// Pop the top frame and hand `value` to its caller
    ///
    /// Returns `Some(value)` when this emptied the stack, i.e. the fiber is
    /// now terminal.
    pub fn done(&mut self, value: Val) -> Result<Option<Val>, ProtocolError> {
        self.frames.pop().ok_or(ProtocolError::Underflow)?;

        if self.frames.is_empty() {
            self.wait = Wait::None;
            Ok(Some(value))
        } else {
            self.wait = Wait::Done(value);
            Ok(None)
        }
    }

    /// Deliver external input to the pending wait
    pub fn post(&mut self, input: Val) -> Result<(), ProtocolError> {
        if !self.wait.is_awaiting_message() || self.frames.is_empty() {
            return Err(ProtocolError::NoPendingWait {
                found: self.state_name(),
            });
        }

        self.wait = Wait::Done(input);
        Ok(())
    }

    /// Apply the command produced by a dialog step
    pub fn apply(&mut self, command: Command) -> Result<Option<Val>, ProtocolError> {
        match command {
            Command::Call {
                dialog,
                args,
                resume,
            } => self.call(dialog, args, resume).map(|_| None),
            Command::Wait { resume } => self.wait(resume).map(|_| None),
            Command::Done(value) => self.done(value),
        }
    }

    /// Take the pending item, leaving nothing pending
    pub(crate) fn take_item(&mut self) -> Option<Val> {
        match std::mem::replace(&mut self.wait, Wait::None) {
            Wait::Done(item) => Some(item),
            other => {
                self.wait = other;
                None
            }
        }
    }

    /* ===================== Inspection ===================== */

    pub fn is_terminal(&self) -> bool {
        self.frames.is_empty()
    }

    /// At a rest point: frames remain and exactly one message wait is pending
    pub fn is_suspended(&self) -> bool {
        !self.frames.is_empty() && self.wait.is_awaiting_message()
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn top(&self) -> Option<&Frame> {
        self.frames.last()
    }

    pub fn state_name(&self) -> &'static str {
        match (&self.wait, self.frames.is_empty()) {
            (_, true) => "terminal",
            (Wait::AwaitingMessage, false) => "suspended",
            (Wait::Done(_), false) => "running",
            (Wait::None, false) => "stalled",
        }
    }

    /// Human-readable listing of the stack, outermost first
    pub fn describe(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "state: {} (depth {})", self.state_name(), self.depth());
        for (idx, frame) in self.frames.iter().enumerate() {
            let rest = match &frame.rest {
                Rest::Start => "start".to_string(),
                Rest::Resume(r) => format!("resume {}", r),
                Rest::Idle => "idle".to_string(),
            };
            let _ = writeln!(
                out,
                "  #{} {} [{}] {}",
                idx, frame.dialog.kind, rest, frame.dialog.state
            );
        }
        out
    }
}
