use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::domain::{Conversation, ConversationId, User, UserId};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserPayload {
    #[serde(rename = "_id")]
    pub id: UserId,
    pub username: String,
    pub email: String,
}

impl From<UserPayload> for User {
    fn from(payload: UserPayload) -> Self {
        Self {
            id: payload.id,
            username: payload.username,
            email: payload.email,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectorySearchResponse {
    pub users: Vec<UserPayload>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessConversationRequest {
    pub user_id: UserId,
}

/// Group-creation request. The conversation service expects `users` as a
/// JSON-encoded string of the member id array, not a plain array.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateGroupRequest {
    pub chat_name: String,
    pub users: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationPayload {
    #[serde(rename = "_id")]
    pub id: ConversationId,
    #[serde(rename = "chatName", default, skip_serializing_if = "Option::is_none")]
    pub chat_name: Option<String>,
    #[serde(rename = "isGroupChat", default)]
    pub is_group_chat: bool,
    #[serde(default)]
    pub users: Vec<UserPayload>,
    #[serde(rename = "updatedAt", default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl ConversationPayload {
    /// Maps the wire shape into the domain record, dropping any duplicate
    /// member ids while preserving their first-seen order.
    pub fn into_domain(self) -> Conversation {
        let mut seen = HashSet::new();
        let member_ids = self
            .users
            .into_iter()
            .map(|user| user.id)
            .filter(|id| seen.insert(id.clone()))
            .collect();
        Conversation {
            id: self.id,
            is_group: self.is_group_chat,
            name: self.chat_name,
            member_ids,
            last_activity_hint: self.updated_at,
        }
    }
}

/// Error body shape used by the conversation service. `message` is optional
/// on purpose: malformed or truncated error bodies must still deserialize.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceErrorBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}
