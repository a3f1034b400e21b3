use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::fiber::{json_to_val, Val};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelAccount {
    pub id: String,
    pub name: Option<String>,
}

impl ChannelAccount {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
        }
    }
}

/// Identity of one user in one conversation on one channel
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Address {
    pub channel_id: String,
    pub user_id: String,
    pub conversation_id: String,
}

impl Address {
    pub fn new(
        channel_id: impl Into<String>,
        user_id: impl Into<String>,
        conversation_id: impl Into<String>,
    ) -> Self {
        Self {
            channel_id: channel_id.into(),
            user_id: user_id.into(),
            conversation_id: conversation_id.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub channel_id: String,
    pub conversation_id: String,
    pub from: ChannelAccount,
    pub recipient: ChannelAccount,
    pub text: Option<String>,
    pub reply_to_id: Option<String>,

    /// Opaque per-turn fields owned by the transport; echoed on replies
    pub channel_data: Option<JsonValue>,

    pub timestamp: DateTime<Utc>,
}

impl Message {
    /// Build an inbound message from a user to the bot
    pub fn from_user(address: &Address, bot_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            channel_id: address.channel_id.clone(),
            conversation_id: address.conversation_id.clone(),
            from: ChannelAccount::new(address.user_id.clone()),
            recipient: ChannelAccount::new(bot_id),
            text: Some(text.into()),
            reply_to_id: None,
            channel_data: None,
            timestamp: Utc::now(),
        }
    }

    /// The (user, conversation) key this message belongs to
    pub fn address(&self) -> Address {
        Address {
            channel_id: self.channel_id.clone(),
            user_id: self.from.id.clone(),
            conversation_id: self.conversation_id.clone(),
        }
    }

    /// Build a reply routed back to the sender of `inbound`
    pub fn reply_to(inbound: &Message, text: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            channel_id: inbound.channel_id.clone(),
            conversation_id: inbound.conversation_id.clone(),
            from: inbound.recipient.clone(),
            recipient: inbound.from.clone(),
            text,
            reply_to_id: Some(inbound.id.clone()),
            channel_data: inbound.channel_data.clone(),
            timestamp: Utc::now(),
        }
    }

    pub fn text_or_empty(&self) -> &str {
        self.text.as_deref().unwrap_or("")
    }

    /// The message as a runtime value, as delivered to a message wait
    ///
    /// Field names match the serde form of `Message`.
    pub fn to_val(&self) -> Val {
        fn opt(value: &Option<String>) -> Val {
            value.as_deref().map_or(Val::Null, Val::from)
        }
        fn account(account: &ChannelAccount) -> Val {
            Val::Obj(BTreeMap::from([
                ("id".to_string(), Val::from(account.id.as_str())),
                ("name".to_string(), opt(&account.name)),
            ]))
        }

        Val::Obj(BTreeMap::from([
            ("id".to_string(), Val::from(self.id.as_str())),
            ("channel_id".to_string(), Val::from(self.channel_id.as_str())),
            ("conversation_id".to_string(), Val::from(self.conversation_id.as_str())),
            ("from".to_string(), account(&self.from)),
            ("recipient".to_string(), account(&self.recipient)),
            ("text".to_string(), opt(&self.text)),
            ("reply_to_id".to_string(), opt(&self.reply_to_id)),
            (
                "channel_data".to_string(),
                self.channel_data.as_ref().map_or(Val::Null, json_to_val),
            ),
            ("timestamp".to_string(), Val::from(self.timestamp.to_rfc3339())),
        ]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_reply_swaps_accounts_and_echoes_channel_data() {
        let address = Address::new("web", "alice", "conv-1");
        let mut inbound = Message::from_user(&address, "bot", "hi");
        inbound.channel_data = Some(json!({"route": "eu-1"}));

        let reply = Message::reply_to(&inbound, Some("hello".to_string()));

        assert_eq!(reply.from.id, "bot");
        assert_eq!(reply.recipient.id, "alice");
        assert_eq!(reply.conversation_id, "conv-1");
        assert_eq!(reply.reply_to_id.as_deref(), Some(inbound.id.as_str()));
        assert_eq!(reply.channel_data, Some(json!({"route": "eu-1"})));
        assert_ne!(reply.id, inbound.id);
    }

    #[test]
    fn test_message_val_exposes_text() {
        let address = Address::new("web", "alice", "conv-1");
        let inbound = Message::from_user(&address, "bot", "hi");

        let val = inbound.to_val();
        assert_eq!(val.get("text"), Some(&Val::Str("hi".to_string())));
        assert_eq!(inbound.address(), address);
    }

    #[test]
    fn test_message_val_matches_serde_form() {
        let address = Address::new("web", "alice", "conv-1");
        let mut inbound = Message::from_user(&address, "bot", "hi");
        inbound.channel_data = Some(json!({"route": "eu-1", "hops": [1, 2]}));

        let val = inbound.to_val();
        let serialized = json_to_val(&serde_json::to_value(&inbound).unwrap());

        assert_eq!(val.get("channel_data"), serialized.get("channel_data"));
        assert_eq!(val.get("from"), serialized.get("from"));
        assert_eq!(val.get("reply_to_id"), Some(&Val::Null));
        assert!(val.get("timestamp").and_then(Val::as_str).is_some());
    }
}
