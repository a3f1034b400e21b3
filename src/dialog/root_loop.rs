//! Root retry loop
//!
//! Wraps the application's entry dialog so that it starts again as soon as
//! it completes. The conversation itself therefore never terminates.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{Dialog, DialogContext, DialogError};
use crate::fiber::{DialogState, Val};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RootLoop {
    /// Initial state of the entry dialog; every iteration starts from it
    pub root: DialogState,

    /// How many times the entry dialog has completed
    pub completions: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum RootLoopResume {
    AfterRoot,
}

impl RootLoop {
    pub fn new(root: DialogState) -> Self {
        Self {
            root,
            completions: 0,
        }
    }
}

impl Dialog for RootLoop {
    const KIND: &'static str = "parley.root_loop";
    type Resume = RootLoopResume;

    fn start(&mut self, ctx: &mut DialogContext<'_, RootLoopResume>, args: Val) -> Result<(), DialogError> {
        ctx.call_state(self.root.clone(), args, RootLoopResume::AfterRoot)
    }

    fn resume(
        &mut self,
        ctx: &mut DialogContext<'_, RootLoopResume>,
        resume: RootLoopResume,
        result: Val,
    ) -> Result<(), DialogError> {
        match resume {
            RootLoopResume::AfterRoot => {
                self.completions += 1;
                debug!(
                    root = %self.root.kind,
                    completions = self.completions,
                    ?result,
                    "root dialog completed, restarting"
                );
                ctx.call_state(self.root.clone(), Val::Null, RootLoopResume::AfterRoot)
            }
        }
    }
}
