//! Sample dialogs shared by the dialog and driver tests

use serde::{Deserialize, Serialize};

use crate::dialog::{Dialog, DialogContext, DialogError};
use crate::fiber::Val;

fn text_of(input: &Val) -> String {
    input
        .get("text")
        .and_then(Val::as_str)
        .unwrap_or_default()
        .to_string()
}

/* ===================== Echo ===================== */

/// Replies with a running count and the user's text
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct EchoDialog {
    pub count: u32,
}

#[derive(Debug, Serialize, Deserialize)]
pub enum EchoResume {
    Message,
}

impl Dialog for EchoDialog {
    const KIND: &'static str = "test.echo";
    type Resume = EchoResume;

    fn start(&mut self, ctx: &mut DialogContext<'_, EchoResume>, _args: Val) -> Result<(), DialogError> {
        ctx.wait(EchoResume::Message)
    }

    fn resume(
        &mut self,
        ctx: &mut DialogContext<'_, EchoResume>,
        _resume: EchoResume,
        input: Val,
    ) -> Result<(), DialogError> {
        self.count += 1;
        ctx.post(format!("{}: You said {}", self.count, text_of(&input)));
        ctx.wait(EchoResume::Message)
    }
}

/* ===================== Silent wait ===================== */

/// Waits forever without ever replying
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct SilentDialog {
    pub seen: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub enum SilentResume {
    Message,
}

impl Dialog for SilentDialog {
    const KIND: &'static str = "test.silent";
    type Resume = SilentResume;

    fn start(&mut self, ctx: &mut DialogContext<'_, SilentResume>, _args: Val) -> Result<(), DialogError> {
        ctx.wait(SilentResume::Message)
    }

    fn resume(
        &mut self,
        ctx: &mut DialogContext<'_, SilentResume>,
        _resume: SilentResume,
        input: Val,
    ) -> Result<(), DialogError> {
        self.seen.push(text_of(&input));
        ctx.wait(SilentResume::Message)
    }
}

/* ===================== Done on message ===================== */

/// Completes with 42 on the first message it receives
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct AnswerDialog;

#[derive(Debug, Serialize, Deserialize)]
pub enum AnswerResume {
    Message,
}

impl Dialog for AnswerDialog {
    const KIND: &'static str = "test.answer";
    type Resume = AnswerResume;

    fn start(&mut self, ctx: &mut DialogContext<'_, AnswerResume>, _args: Val) -> Result<(), DialogError> {
        ctx.wait(AnswerResume::Message)
    }

    fn resume(
        &mut self,
        ctx: &mut DialogContext<'_, AnswerResume>,
        _resume: AnswerResume,
        _input: Val,
    ) -> Result<(), DialogError> {
        ctx.post("42");
        ctx.done(42)
    }
}

/* ===================== Greeter with nested prompt ===================== */

/// Asks for a value and completes with the user's answer
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct PromptDialog {
    pub question: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub enum PromptResume {
    Answer,
}

impl Dialog for PromptDialog {
    const KIND: &'static str = "test.prompt";
    type Resume = PromptResume;

    fn start(&mut self, ctx: &mut DialogContext<'_, PromptResume>, args: Val) -> Result<(), DialogError> {
        self.question = args.as_str().unwrap_or("?").to_string();
        ctx.post(self.question.clone());
        ctx.wait(PromptResume::Answer)
    }

    fn resume(
        &mut self,
        ctx: &mut DialogContext<'_, PromptResume>,
        _resume: PromptResume,
        input: Val,
    ) -> Result<(), DialogError> {
        ctx.done(text_of(&input))
    }
}

/// Greets the user after asking for their name through a child prompt
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct GreeterDialog {
    pub greeted: u32,
}

#[derive(Debug, Serialize, Deserialize)]
pub enum GreeterResume {
    FirstMessage,
    GotName,
}

impl Dialog for GreeterDialog {
    const KIND: &'static str = "test.greeter";
    type Resume = GreeterResume;

    fn start(&mut self, ctx: &mut DialogContext<'_, GreeterResume>, _args: Val) -> Result<(), DialogError> {
        ctx.wait(GreeterResume::FirstMessage)
    }

    fn resume(
        &mut self,
        ctx: &mut DialogContext<'_, GreeterResume>,
        resume: GreeterResume,
        input: Val,
    ) -> Result<(), DialogError> {
        match resume {
            GreeterResume::FirstMessage => ctx.call(
                &PromptDialog::default(),
                Val::from("What is your name?"),
                GreeterResume::GotName,
            ),
            GreeterResume::GotName => {
                let name = input.as_str().unwrap_or_default().to_string();
                self.greeted += 1;
                ctx.user_data().set_json("name", &name)?;
                ctx.post(format!("Hello, {}", name));
                ctx.done(name)
            }
        }
    }
}

/* ===================== Misbehaving dialogs ===================== */

/// Fails on "boom", otherwise records the message in conversation data
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct FragileDialog;

#[derive(Debug, Serialize, Deserialize)]
pub enum FragileResume {
    Message,
}

impl Dialog for FragileDialog {
    const KIND: &'static str = "test.fragile";
    type Resume = FragileResume;

    fn start(&mut self, ctx: &mut DialogContext<'_, FragileResume>, _args: Val) -> Result<(), DialogError> {
        ctx.wait(FragileResume::Message)
    }

    fn resume(
        &mut self,
        ctx: &mut DialogContext<'_, FragileResume>,
        _resume: FragileResume,
        input: Val,
    ) -> Result<(), DialogError> {
        let text = text_of(&input);
        ctx.conversation_data().set("last", text.clone().into_bytes());
        if text == "boom" {
            return Err(DialogError::failed(Self::KIND, "exploded"));
        }
        ctx.post(format!("ok {}", text));
        ctx.wait(FragileResume::Message)
    }
}

/// Issues two commands in one step
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct GreedyDialog;

impl Dialog for GreedyDialog {
    const KIND: &'static str = "test.greedy";
    type Resume = ();

    fn start(&mut self, ctx: &mut DialogContext<'_, ()>, _args: Val) -> Result<(), DialogError> {
        ctx.wait(())?;
        ctx.done(Val::Null)
    }

    fn resume(&mut self, ctx: &mut DialogContext<'_, ()>, _resume: (), _input: Val) -> Result<(), DialogError> {
        ctx.done(Val::Null)
    }
}

/// Returns without issuing any command
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct IdleDialog;

impl Dialog for IdleDialog {
    const KIND: &'static str = "test.idle";
    type Resume = ();

    fn start(&mut self, _ctx: &mut DialogContext<'_, ()>, _args: Val) -> Result<(), DialogError> {
        Ok(())
    }

    fn resume(&mut self, _ctx: &mut DialogContext<'_, ()>, _resume: (), _input: Val) -> Result<(), DialogError> {
        Ok(())
    }
}

/// Completes immediately on start, so a root loop over it never rests
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct RestlessDialog;

impl Dialog for RestlessDialog {
    const KIND: &'static str = "test.restless";
    type Resume = ();

    fn start(&mut self, ctx: &mut DialogContext<'_, ()>, _args: Val) -> Result<(), DialogError> {
        ctx.done(Val::Null)
    }

    fn resume(&mut self, ctx: &mut DialogContext<'_, ()>, _resume: (), _input: Val) -> Result<(), DialogError> {
        ctx.done(Val::Null)
    }
}

/* ===================== Chatty ===================== */

/// Posts twice in the same step; only the second post is delivered
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ChattyDialog;

#[derive(Debug, Serialize, Deserialize)]
pub enum ChattyResume {
    Message,
}

impl Dialog for ChattyDialog {
    const KIND: &'static str = "test.chatty";
    type Resume = ChattyResume;

    fn start(&mut self, ctx: &mut DialogContext<'_, ChattyResume>, _args: Val) -> Result<(), DialogError> {
        ctx.wait(ChattyResume::Message)
    }

    fn resume(
        &mut self,
        ctx: &mut DialogContext<'_, ChattyResume>,
        _resume: ChattyResume,
        _input: Val,
    ) -> Result<(), DialogError> {
        ctx.post("first");
        ctx.post("second");
        ctx.wait(ChattyResume::Message)
    }
}
