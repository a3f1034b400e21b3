//! Core execution loop
//!
//! The trampoline that runs one turn. Frames never call each other
//! directly; each step hands back a `Command` and the loop applies it.
//!
//! ## Function Organization
//! 1. run_until_rest() - Top-level driver (calls step repeatedly)
//! 2. step() - Runs the top frame once

use super::errors::ProtocolError;
use super::stack::Fiber;
use super::types::{Command, Frame, Rest, Val, Wait};
use tracing::trace;

/// Executes the body of a single frame
///
/// Implemented by the dialog layer. The runner may update the frame's
/// persisted dialog state; it must not touch the rest of the stack.
pub trait StepRunner {
    type Error: From<ProtocolError>;

    fn run_step(&mut self, frame: &mut Frame, rest: Rest, item: Val)
        -> Result<Command, Self::Error>;
}

/// Where a fiber came to rest
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    /// Exactly one message wait is pending
    Suspended,
    /// The stack emptied; carries the root's result
    Terminal(Val),
}

/// Result of executing one step
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// More work is pending in this turn
    Continue,
    /// A rest point was reached
    Rest(RunOutcome),
}

/* ===================== Public API ===================== */

/// Run the fiber until it suspends or terminates
///
/// At most `max_steps` frame steps are executed.
pub fn run_until_rest<R: StepRunner>(
    fiber: &mut Fiber,
    runner: &mut R,
    max_steps: usize,
) -> Result<RunOutcome, R::Error> {
    let mut steps = 0;
    let mut result = None;

    loop {
        if fiber.is_terminal() {
            return Ok(RunOutcome::Terminal(result.take().unwrap_or(Val::Null)));
        }

        if steps >= max_steps {
            return Err(ProtocolError::StepBudgetExhausted { steps }.into());
        }
        steps += 1;

        match step(fiber, runner, &mut result)? {
            Step::Continue => continue,
            Step::Rest(outcome) => return Ok(outcome),
        }
    }
}

/// Execute one step of the fiber
///
/// 1. Stops if the fiber is already at a rest point
/// 2. Takes the pending item and the top frame's continuation
/// 3. Runs the frame and applies the command it produced
pub fn step<R: StepRunner>(
    fiber: &mut Fiber,
    runner: &mut R,
    result: &mut Option<Val>,
) -> Result<Step, R::Error> {
    match &fiber.wait {
        _ if fiber.is_terminal() => {
            return Ok(Step::Rest(RunOutcome::Terminal(
                result.take().unwrap_or(Val::Null),
            )))
        }
        Wait::AwaitingMessage => return Ok(Step::Rest(RunOutcome::Suspended)),
        Wait::None => return Err(ProtocolError::Stalled.into()),
        Wait::Done(_) => {}
    }

    let Some(item) = fiber.take_item() else {
        return Err(ProtocolError::Stalled.into());
    };

    let Some(frame) = fiber.frames.last_mut() else {
        return Err(ProtocolError::Underflow.into());
    };

    let rest = std::mem::replace(&mut frame.rest, Rest::Idle);
    if rest == Rest::Idle {
        return Err(ProtocolError::MissingContinuation {
            kind: frame.dialog.kind.clone(),
        }
        .into());
    }

    let command = runner.run_step(frame, rest, item)?;
    trace!(
        dialog = fiber.top().map(|f| f.dialog.kind.as_str()).unwrap_or_default(),
        command = command.name(),
        depth = fiber.depth(),
        "fiber step"
    );

    if let Some(value) = fiber.apply(command)? {
        *result = Some(value);
    }

    Ok(Step::Continue)
}
