//! In-process store
//!
//! Used by tests and by `parley chat` when no database is configured.
//! Contents are lost when the process exits.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use super::{BagScope, BagWrite, BotDataStore, DataBag, StorageError};

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    bags: Arc<RwLock<HashMap<(BagScope, String), DataBag>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of non-empty bags held
    pub async fn len(&self) -> usize {
        self.bags.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.bags.read().await.is_empty()
    }
}

impl BotDataStore for MemoryStore {
    async fn load_bag(&self, scope: BagScope, key: &str) -> Result<DataBag, StorageError> {
        let bags = self.bags.read().await;
        Ok(bags
            .get(&(scope, key.to_string()))
            .cloned()
            .unwrap_or_default())
    }

    async fn save_bags(&self, batch: &[BagWrite<'_>]) -> Result<(), StorageError> {
        let mut bags = self.bags.write().await;
        for write in batch {
            let slot = (write.scope, write.key.to_string());
            if write.bag.is_empty() {
                bags.remove(&slot);
            } else {
                bags.insert(slot, write.bag.clone());
            }
        }
        debug!(bags = batch.len(), "saved bags to memory store");
        Ok(())
    }
}
