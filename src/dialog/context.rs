//! Dialog-facing view of a turn
//!
//! Maps post/wait/call/done onto fiber commands. A context lives for one
//! dialog step; nothing in it survives the turn.

use serde::Serialize;
use serde_json::Value as JsonValue;
use std::marker::PhantomData;
use tracing::warn;

use super::{dialog_state, Dialog, DialogError};
use crate::fiber::{Command, DialogState, ProtocolError, Val};
use crate::store::{BotData, DataBag};
use crate::types::Message;

/* ===================== Turn Scope ===================== */

/// Per-turn bindings handed to every dialog step
///
/// Built fresh by the driver for each inbound message.
pub struct TurnScope<'a> {
    pub inbound: &'a Message,
    pub data: &'a mut BotData,

    /// The turn's single outbound message, if any dialog posted one
    pub outbound: Option<Message>,
}

impl<'a> TurnScope<'a> {
    pub fn new(inbound: &'a Message, data: &'a mut BotData) -> Self {
        Self {
            inbound,
            data,
            outbound: None,
        }
    }
}

/* ===================== Dialog Context ===================== */

pub struct DialogContext<'a, R> {
    kind: &'static str,
    inbound: &'a Message,
    data: &'a mut BotData,
    outbound: &'a mut Option<Message>,
    command: Option<Command>,
    _resume: PhantomData<fn(R)>,
}

impl<'a, R: Serialize> DialogContext<'a, R> {
    pub(crate) fn new(kind: &'static str, scope: &'a mut TurnScope<'_>) -> Self {
        Self {
            kind,
            inbound: scope.inbound,
            data: &mut *scope.data,
            outbound: &mut scope.outbound,
            command: None,
            _resume: PhantomData,
        }
    }

    /// Kind of the dialog this step belongs to
    pub fn kind(&self) -> &'static str {
        self.kind
    }

    /// The message being processed in this turn
    pub fn inbound(&self) -> &Message {
        self.inbound
    }

    /* ---------- Bot to user ---------- */

    /// Reply to the sender of the inbound message
    pub fn post(&mut self, text: impl Into<String>) {
        let reply = Message::reply_to(self.inbound, Some(text.into()));
        self.post_message(reply);
    }

    /// Record a prepared message as the turn's reply
    ///
    /// A turn carries one outbound message; a later post replaces an
    /// earlier one.
    pub fn post_message(&mut self, message: Message) {
        if self.outbound.is_some() {
            warn!(dialog = self.kind, "replacing earlier reply posted in this turn");
        }
        *self.outbound = Some(message);
    }

    /* ---------- Stack ---------- */

    /// Start `child` with `args`; `resume` runs with its result
    pub fn call<D: Dialog>(&mut self, child: &D, args: Val, resume: R) -> Result<(), DialogError> {
        let dialog = dialog_state(child)?;
        self.call_state(dialog, args, resume)
    }

    /// Like [`call`](Self::call) for a dialog already captured as state
    pub fn call_state(&mut self, dialog: DialogState, args: Val, resume: R) -> Result<(), DialogError> {
        let resume = self.encode_resume(&resume)?;
        self.issue(Command::Call {
            dialog,
            args,
            resume,
        })
    }

    /// Suspend until the next inbound message; `resume` receives it
    pub fn wait(&mut self, resume: R) -> Result<(), DialogError> {
        let resume = self.encode_resume(&resume)?;
        self.issue(Command::Wait { resume })
    }

    /// Complete this dialog, handing `value` to the caller's resume
    pub fn done(&mut self, value: impl Into<Val>) -> Result<(), DialogError> {
        self.issue(Command::Done(value.into()))
    }

    /* ---------- Bot data ---------- */

    pub fn conversation_data(&mut self) -> &mut DataBag {
        &mut self.data.conversation
    }

    pub fn user_data(&mut self) -> &mut DataBag {
        &mut self.data.user
    }

    pub fn private_conversation_data(&mut self) -> &mut DataBag {
        &mut self.data.private_conversation
    }

    /* ---------- Internals ---------- */

    fn encode_resume(&self, resume: &R) -> Result<JsonValue, DialogError> {
        serde_json::to_value(resume).map_err(|source| DialogError::EncodeResume {
            kind: self.kind,
            source,
        })
    }

    fn issue(&mut self, command: Command) -> Result<(), DialogError> {
        if let Some(first) = &self.command {
            return Err(ProtocolError::MultipleCommands {
                kind: self.kind.to_string(),
                first: first.name(),
                second: command.name(),
            }
            .into());
        }
        self.command = Some(command);
        Ok(())
    }

    /// The step's single command
    pub(crate) fn into_command(self) -> Result<Command, DialogError> {
        self.command.ok_or_else(|| {
            ProtocolError::NoCommand {
                kind: self.kind.to_string(),
            }
            .into()
        })
    }
}
