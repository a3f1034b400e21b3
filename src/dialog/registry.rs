//! Dialog registry and the fiber step runner
//!
//! The registry maps a persisted dialog kind back to code. It is the
//! per-turn binding that turns frame data into runnable frames again.

use std::collections::HashMap;

use super::context::{DialogContext, TurnScope};
use super::root_loop::RootLoop;
use super::{Dialog, DialogError};
use crate::fiber::{Command, Frame, ProtocolError, Rest, StepRunner, Val};

type StepFn = fn(&mut Frame, Rest, Val, &mut TurnScope<'_>) -> Result<Command, DialogError>;

#[derive(Clone)]
pub struct DialogRegistry {
    steps: HashMap<&'static str, StepFn>,
}

impl Default for DialogRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for DialogRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DialogRegistry")
            .field("kinds", &self.kinds())
            .finish()
    }
}

impl DialogRegistry {
    /// Registry holding only the built-in root loop
    pub fn new() -> Self {
        let mut registry = Self {
            steps: HashMap::new(),
        };
        registry.register::<RootLoop>();
        registry
    }

    pub fn register<D: Dialog>(&mut self) -> &mut Self {
        self.steps.insert(D::KIND, run_dialog_step::<D>);
        self
    }

    pub fn with<D: Dialog>(mut self) -> Self {
        self.register::<D>();
        self
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.steps.contains_key(kind)
    }

    pub fn kinds(&self) -> Vec<&'static str> {
        let mut kinds: Vec<_> = self.steps.keys().copied().collect();
        kinds.sort_unstable();
        kinds
    }

    fn lookup(&self, kind: &str) -> Result<StepFn, DialogError> {
        self.steps
            .get(kind)
            .copied()
            .ok_or_else(|| DialogError::Unregistered(kind.to_string()))
    }
}

/// Rebuild the dialog from its frame, run one step, and store it back
fn run_dialog_step<D: Dialog>(
    frame: &mut Frame,
    rest: Rest,
    item: Val,
    scope: &mut TurnScope<'_>,
) -> Result<Command, DialogError> {
    let mut dialog: D = serde_json::from_value(frame.dialog.state.clone())
        .map_err(|source| DialogError::DecodeState {
            kind: D::KIND,
            source,
        })?;

    let mut ctx = DialogContext::<D::Resume>::new(D::KIND, scope);
    match rest {
        Rest::Start => dialog.start(&mut ctx, item)?,
        Rest::Resume(resume) => {
            let resume: D::Resume =
                serde_json::from_value(resume).map_err(|source| DialogError::DecodeResume {
                    kind: D::KIND,
                    source,
                })?;
            dialog.resume(&mut ctx, resume, item)?
        }
        Rest::Idle => {
            return Err(ProtocolError::MissingContinuation {
                kind: D::KIND.to_string(),
            }
            .into())
        }
    }
    let command = ctx.into_command()?;

    frame.dialog.state = serde_json::to_value(&dialog).map_err(|source| {
        DialogError::EncodeState {
            kind: D::KIND,
            source,
        }
    })?;

    Ok(command)
}

/* ===================== Runner ===================== */

/// Runs fiber frames as registered dialogs within one turn
pub struct DialogRunner<'r, 't> {
    registry: &'r DialogRegistry,
    pub scope: TurnScope<'t>,
}

impl<'r, 't> DialogRunner<'r, 't> {
    pub fn new(registry: &'r DialogRegistry, scope: TurnScope<'t>) -> Self {
        Self { registry, scope }
    }

    pub fn into_scope(self) -> TurnScope<'t> {
        self.scope
    }
}

impl StepRunner for DialogRunner<'_, '_> {
    type Error = DialogError;

    fn run_step(&mut self, frame: &mut Frame, rest: Rest, item: Val) -> Result<Command, DialogError> {
        let step = self.registry.lookup(&frame.dialog.kind)?;
        step(frame, rest, item, &mut self.scope)
    }
}
