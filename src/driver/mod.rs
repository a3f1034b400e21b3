//! Driver loop
//!
//! Runs one turn of a conversation:
//! 1. Load the bags and the stored fiber (or build a fresh one)
//! 2. Deliver the inbound message
//! 3. Run to the next rest point
//! 4. Encode the fiber and write the bags back
//! 5. Return the turn's reply
//!
//! Nothing is written unless every step succeeds, so a failed turn leaves
//! the previous snapshot in place for the next attempt.

use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, info_span, warn, Instrument};

use crate::config::{Config, CorruptSnapshotPolicy, DriverConfig};
use crate::dialog::{dialog_state, Dialog, DialogError, DialogRegistry, DialogRunner, RootLoop, TurnScope};
use crate::fiber::{run_until_rest, DialogState, Fiber, ProtocolError, RunOutcome, Val};
use crate::snapshot::{SnapshotCodec, SnapshotError};
use crate::store::{BagScope, BagWrite, BotData, BotDataStore, DataBag, StorageError};
use crate::types::{Address, Message};

/// Field of the private conversation bag holding the fiber blob
pub const BLOB_KEY: &str = "DialogState";

/* ===================== Errors ===================== */

#[derive(Debug, Error)]
pub enum TurnError {
    #[error("suspension protocol violated: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("stored dialog state is unusable: {0}")]
    Snapshot(#[from] SnapshotError),

    #[error("bot data storage failed: {0}")]
    Storage(#[from] StorageError),

    #[error("dialog failed: {0}")]
    Dialog(DialogError),
}

impl From<DialogError> for TurnError {
    fn from(err: DialogError) -> Self {
        match err {
            DialogError::Protocol(err) => TurnError::Protocol(err),
            DialogError::Storage(err) => TurnError::Storage(err),
            other => TurnError::Dialog(other),
        }
    }
}

impl TurnError {
    /// Status a transport should answer with
    pub fn status(&self) -> u16 {
        match self {
            TurnError::Protocol(_) => 409,
            TurnError::Snapshot(_) | TurnError::Dialog(_) => 500,
            TurnError::Storage(_) => 503,
        }
    }
}

/// Transport-level outcome of a turn
#[derive(Debug, Clone, PartialEq)]
pub enum TurnResponse {
    Reply(Message),
    Error { status: u16, message: String },
}

/* ===================== Conversation ===================== */

type RootFactory = Arc<dyn Fn() -> Result<DialogState, DialogError> + Send + Sync>;

/// Runs turns for every conversation held in one store
///
/// Holds no per-conversation state; any instance can serve any turn.
/// Concurrent turns for the same address race (last write wins) and must
/// be serialized by the caller.
pub struct Conversation<S> {
    store: S,
    registry: DialogRegistry,
    make_root: RootFactory,
    codec: SnapshotCodec,
    config: DriverConfig,
}

impl<S: BotDataStore> Conversation<S> {
    /// `make_root` builds the entry dialog for new conversations; its type is
    /// added to `registry`
    pub fn new<D, F>(store: S, mut registry: DialogRegistry, make_root: F) -> Self
    where
        D: Dialog,
        F: Fn() -> D + Send + Sync + 'static,
    {
        registry.register::<D>();
        Self {
            store,
            registry,
            make_root: Arc::new(move || dialog_state(&make_root())),
            codec: SnapshotCodec::default(),
            config: DriverConfig::default(),
        }
    }

    pub fn with_config(mut self, config: &Config) -> Self {
        self.codec = SnapshotCodec::new(&config.snapshot);
        self.config = config.driver.clone();
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn registry(&self) -> &DialogRegistry {
        &self.registry
    }

    /// Process one inbound message and return the reply
    pub async fn post(&self, inbound: &Message) -> Result<Message, TurnError> {
        let address = inbound.address();
        let span = info_span!(
            "turn",
            channel = %address.channel_id,
            user = %address.user_id,
            conversation = %address.conversation_id,
        );
        self.run_turn(inbound, address).instrument(span).await
    }

    /// Like [`post`](Self::post), but maps failures to an error response
    pub async fn respond(&self, inbound: &Message) -> TurnResponse {
        match self.post(inbound).await {
            Ok(reply) => TurnResponse::Reply(reply),
            Err(err) => {
                warn!(error = %err, "turn failed");
                TurnResponse::Error {
                    status: err.status(),
                    message: err.to_string(),
                }
            }
        }
    }

    async fn run_turn(&self, inbound: &Message, address: Address) -> Result<Message, TurnError> {
        let mut data = BotData::load(&self.store, &address).await?;
        let stored = self.restore(&data)?;

        let mut runner = DialogRunner::new(&self.registry, TurnScope::new(inbound, &mut data));

        let mut fiber = match stored {
            Some(fiber) => fiber,
            None => {
                debug!("starting new conversation");
                let mut fiber = Fiber::new();
                let root = RootLoop::new((self.make_root)()?);
                fiber.start(dialog_state(&root)?, Val::Null)?;
                run_until_rest(&mut fiber, &mut runner, self.config.max_steps_per_turn)?;
                fiber
            }
        };

        fiber.post(inbound.to_val())?;
        let outcome = run_until_rest(&mut fiber, &mut runner, self.config.max_steps_per_turn)?;
        if let RunOutcome::Terminal(result) = &outcome {
            warn!(?result, "conversation fiber terminated");
        }

        let outbound = runner
            .into_scope()
            .outbound
            .unwrap_or_else(|| Message::reply_to(inbound, None));

        let blob = self.codec.encode(&fiber)?;
        let blob_len = blob.len();
        data.private_conversation.set(BLOB_KEY, blob);
        let written = data.save(&self.store).await?;

        info!(
            state = fiber.state_name(),
            depth = fiber.depth(),
            blob_bytes = blob_len,
            bags_written = written,
            replied = outbound.text.is_some(),
            "turn complete"
        );

        Ok(outbound)
    }

    /// Decode the stored fiber, applying the corrupt-snapshot policy
    fn restore(&self, data: &BotData) -> Result<Option<Fiber>, TurnError> {
        let Some(blob) = data.private_conversation.get(BLOB_KEY) else {
            return Ok(None);
        };

        match self.codec.decode(blob, &self.registry) {
            Ok(fiber) => {
                debug!(depth = fiber.depth(), state = fiber.state_name(), "restored fiber");
                Ok(Some(fiber))
            }
            Err(err) if self.config.on_corrupt_snapshot == CorruptSnapshotPolicy::Reset => {
                warn!(error = %err, "discarding unusable dialog state");
                Ok(None)
            }
            Err(err) => Err(err.into()),
        }
    }

    /* ===================== Administration ===================== */

    /// Decode the stored fiber for `address` without running it
    pub async fn load_fiber(&self, address: &Address) -> Result<Option<Fiber>, TurnError> {
        let bag = self.private_bag(address).await?;
        bag.get(BLOB_KEY)
            .map(|blob| self.codec.decode(blob, &self.registry))
            .transpose()
            .map_err(TurnError::from)
    }

    /// Forget the dialog state of `address`; returns whether there was any
    pub async fn reset(&self, address: &Address) -> Result<bool, TurnError> {
        let mut bag = self.private_bag(address).await?;
        if bag.remove(BLOB_KEY).is_none() {
            return Ok(false);
        }

        let key = BagScope::PrivateConversation.bag_key(address);
        self.store
            .save_bags(&[BagWrite {
                scope: BagScope::PrivateConversation,
                key: &key,
                bag: &bag,
            }])
            .await?;
        info!(user = %address.user_id, conversation = %address.conversation_id, "dialog state reset");
        Ok(true)
    }

    async fn private_bag(&self, address: &Address) -> Result<DataBag, StorageError> {
        let key = BagScope::PrivateConversation.bag_key(address);
        self.store.load_bag(BagScope::PrivateConversation, &key).await
    }
}
