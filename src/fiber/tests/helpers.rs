//! Test helpers for fiber tests
//!
//! A closure-backed runner, so engine tests don't depend on the dialog layer

use crate::fiber::{Command, DialogState, Frame, ProtocolError, Rest, StepRunner, Val};
use serde_json::json;

/// Runner that forwards every step to a closure
pub struct FnRunner<F>(pub F);

impl<F> StepRunner for FnRunner<F>
where
    F: FnMut(&mut Frame, Rest, Val) -> Command,
{
    type Error = ProtocolError;

    fn run_step(&mut self, frame: &mut Frame, rest: Rest, item: Val) -> Result<Command, ProtocolError> {
        Ok((self.0)(frame, rest, item))
    }
}

pub fn dialog(kind: &str) -> DialogState {
    DialogState::new(kind, json!({}))
}

pub fn resume(name: &str) -> Rest {
    Rest::Resume(json!(name))
}

pub fn wait(name: &str) -> Command {
    Command::Wait {
        resume: json!(name),
    }
}

pub fn call(kind: &str, args: Val, name: &str) -> Command {
    Command::Call {
        dialog: dialog(kind),
        args,
        resume: json!(name),
    }
}
