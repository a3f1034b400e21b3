//! Bot data storage
//!
//! Three independent bags of byte values per conversation participant:
//! conversation-scoped, user-scoped and user-in-conversation-scoped. A turn
//! loads all three into a `BotData`, works on them in memory and writes them
//! back in one batch only when the turn succeeds.

pub mod memory;
pub mod postgres;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::future::Future;
use thiserror::Error;

use crate::types::Address;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/* ===================== Errors ===================== */

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("value '{field}' is not valid JSON: {source}")]
    Json {
        field: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("storage backend unavailable: {0}")]
    Unavailable(String),
}

/* ===================== Bags ===================== */

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BagScope {
    Conversation,
    User,
    PrivateConversation,
}

impl BagScope {
    pub const ALL: [BagScope; 3] = [
        BagScope::Conversation,
        BagScope::User,
        BagScope::PrivateConversation,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BagScope::Conversation => "conversation",
            BagScope::User => "user",
            BagScope::PrivateConversation => "private_conversation",
        }
    }

    /// Key of the bag this scope selects for `address`
    ///
    /// Each id is written as `<byte length>:<id>`, so ids containing the
    /// `/` separator cannot make two addresses share a bag.
    pub fn bag_key(&self, address: &Address) -> String {
        let channel = address.channel_id.as_str();
        let parts = match self {
            BagScope::Conversation => vec![channel, address.conversation_id.as_str()],
            BagScope::User => vec![channel, address.user_id.as_str()],
            BagScope::PrivateConversation => vec![
                channel,
                address.conversation_id.as_str(),
                address.user_id.as_str(),
            ],
        };
        parts
            .iter()
            .map(|part| format!("{}:{}", part.len(), part))
            .collect::<Vec<_>>()
            .join("/")
    }
}

/// Key-value bag over byte-string values
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DataBag {
    fields: BTreeMap<String, Vec<u8>>,
}

impl DataBag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, field: &str) -> Option<&[u8]> {
        self.fields.get(field).map(Vec::as_slice)
    }

    pub fn set(&mut self, field: impl Into<String>, value: Vec<u8>) {
        self.fields.insert(field.into(), value);
    }

    pub fn remove(&mut self, field: &str) -> Option<Vec<u8>> {
        self.fields.remove(field)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[u8])> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn get_json<T: DeserializeOwned>(&self, field: &str) -> Result<Option<T>, StorageError> {
        self.get(field)
            .map(|bytes| {
                serde_json::from_slice(bytes).map_err(|source| StorageError::Json {
                    field: field.to_string(),
                    source,
                })
            })
            .transpose()
    }

    pub fn set_json<T: Serialize>(&mut self, field: &str, value: &T) -> Result<(), StorageError> {
        let bytes = serde_json::to_vec(value).map_err(|source| StorageError::Json {
            field: field.to_string(),
            source,
        })?;
        self.set(field, bytes);
        Ok(())
    }
}

impl FromIterator<(String, Vec<u8>)> for DataBag {
    fn from_iter<I: IntoIterator<Item = (String, Vec<u8>)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

/// One bag to write as part of a batch
#[derive(Debug, Clone, Copy)]
pub struct BagWrite<'a> {
    pub scope: BagScope,
    pub key: &'a str,
    pub bag: &'a DataBag,
}

/* ===================== Store ===================== */

/// Backend holding the bags
///
/// `save_bags` must apply the whole batch or nothing. Writes are
/// last-write-wins; callers serialize turns per conversation themselves.
pub trait BotDataStore: Send + Sync {
    fn load_bag(
        &self,
        scope: BagScope,
        key: &str,
    ) -> impl Future<Output = Result<DataBag, StorageError>> + Send;

    fn save_bags(
        &self,
        batch: &[BagWrite<'_>],
    ) -> impl Future<Output = Result<(), StorageError>> + Send;
}

/// The three bags of one address, loaded for the duration of a turn
#[derive(Debug, Clone)]
pub struct BotData {
    address: Address,
    pub conversation: DataBag,
    pub user: DataBag,
    pub private_conversation: DataBag,
    loaded: [DataBag; 3],
}

impl BotData {
    /// Empty bags for `address`, as if nothing had been stored yet
    pub fn empty(address: Address) -> Self {
        Self {
            address,
            conversation: DataBag::new(),
            user: DataBag::new(),
            private_conversation: DataBag::new(),
            loaded: Default::default(),
        }
    }

    pub async fn load<S: BotDataStore>(store: &S, address: &Address) -> Result<Self, StorageError> {
        let conversation = store
            .load_bag(BagScope::Conversation, &BagScope::Conversation.bag_key(address))
            .await?;
        let user = store
            .load_bag(BagScope::User, &BagScope::User.bag_key(address))
            .await?;
        let private_conversation = store
            .load_bag(
                BagScope::PrivateConversation,
                &BagScope::PrivateConversation.bag_key(address),
            )
            .await?;

        Ok(Self {
            address: address.clone(),
            loaded: [
                conversation.clone(),
                user.clone(),
                private_conversation.clone(),
            ],
            conversation,
            user,
            private_conversation,
        })
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    pub fn bag(&self, scope: BagScope) -> &DataBag {
        match scope {
            BagScope::Conversation => &self.conversation,
            BagScope::User => &self.user,
            BagScope::PrivateConversation => &self.private_conversation,
        }
    }

    pub fn bag_mut(&mut self, scope: BagScope) -> &mut DataBag {
        match scope {
            BagScope::Conversation => &mut self.conversation,
            BagScope::User => &mut self.user,
            BagScope::PrivateConversation => &mut self.private_conversation,
        }
    }

    /// Bags whose contents differ from what was loaded
    pub fn changed(&self) -> Vec<BagScope> {
        BagScope::ALL
            .into_iter()
            .zip(self.loaded.iter())
            .filter(|(scope, loaded)| self.bag(*scope) != *loaded)
            .map(|(scope, _)| scope)
            .collect()
    }

    /// Write every changed bag in a single batch
    pub async fn save<S: BotDataStore>(&mut self, store: &S) -> Result<usize, StorageError> {
        let changed = self.changed();
        if changed.is_empty() {
            return Ok(0);
        }

        let keys: Vec<String> = changed
            .iter()
            .map(|scope| scope.bag_key(&self.address))
            .collect();
        let batch: Vec<BagWrite<'_>> = changed
            .iter()
            .zip(keys.iter())
            .map(|(scope, key)| BagWrite {
                scope: *scope,
                key,
                bag: self.bag(*scope),
            })
            .collect();

        store.save_bags(&batch).await?;

        let written = batch.len();
        self.loaded = [
            self.conversation.clone(),
            self.user.clone(),
            self.private_conversation.clone(),
        ];
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn address() -> Address {
        Address::new("web", "alice", "conv-1")
    }

    #[test]
    fn test_bag_keys_are_scoped() {
        let address = address();
        assert_eq!(BagScope::Conversation.bag_key(&address), "3:web/6:conv-1");
        assert_eq!(BagScope::User.bag_key(&address), "3:web/5:alice");
        assert_eq!(
            BagScope::PrivateConversation.bag_key(&address),
            "3:web/6:conv-1/5:alice"
        );
    }

    #[test]
    fn test_bag_keys_distinguish_ids_containing_separator() {
        let first = Address::new("web", "c", "a/b");
        let second = Address::new("web", "b/c", "a");

        for scope in BagScope::ALL {
            if scope == BagScope::User {
                continue;
            }
            assert_ne!(scope.bag_key(&first), scope.bag_key(&second), "{}", scope.as_str());
        }
        assert_ne!(
            BagScope::User.bag_key(&Address::new("a/b", "c", "x")),
            BagScope::User.bag_key(&Address::new("a", "b/c", "x"))
        );
    }

    #[test]
    fn test_bag_json_helpers() {
        let mut bag = DataBag::new();
        bag.set_json("count", &json!({"n": 3})).unwrap();

        let value: Option<serde_json::Value> = bag.get_json("count").unwrap();
        assert_eq!(value, Some(json!({"n": 3})));

        let missing: Option<u32> = bag.get_json("missing").unwrap();
        assert_eq!(missing, None);

        bag.set("raw", b"not json".to_vec());
        let err = bag.get_json::<u32>("raw").unwrap_err();
        assert!(matches!(err, StorageError::Json { field, .. } if field == "raw"));
    }

    #[tokio::test]
    async fn test_save_writes_only_changed_bags() {
        let store = MemoryStore::new();
        let mut data = BotData::load(&store, &address()).await.unwrap();
        assert!(data.changed().is_empty());

        data.user.set("name", b"Alice".to_vec());
        assert_eq!(data.changed(), vec![BagScope::User]);

        assert_eq!(data.save(&store).await.unwrap(), 1);
        assert!(data.changed().is_empty());

        let reloaded = BotData::load(&store, &address()).await.unwrap();
        assert_eq!(reloaded.user.get("name"), Some(&b"Alice"[..]));
        assert!(reloaded.conversation.is_empty());
    }
}
