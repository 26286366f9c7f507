use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use shared::{
    domain::{Conversation, ConversationId, User, UserId},
    protocol::{
        AccessConversationRequest, ConversationPayload, CreateGroupRequest,
        DirectorySearchResponse, ServiceErrorBody,
    },
};
use tokio::sync::{broadcast, Mutex};
use tracing::{info, warn};

pub mod cache;
pub mod error;
pub mod selection;

pub use cache::ConversationCache;
pub use error::{ClientError, InvalidGroupReason};
pub use selection::{AlreadySelected, SelectionSet};

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Session identity handed to the client by whatever performed login.
/// The credential is externally supplied; this crate never acquires one.
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub server_url: String,
    pub bearer_token: String,
    pub user_id: UserId,
}

/// State changes the UI can observe. Each event is emitted after the
/// mutation it describes, so reading a snapshot on receipt observes the
/// new state.
#[derive(Debug, Clone)]
pub enum ClientEvent {
    SearchResultsUpdated { users: Vec<User> },
    SelectionUpdated { selected: Vec<User> },
    ConversationUpserted { conversation: Conversation },
    ActiveConversationChanged { conversation_id: Option<ConversationId> },
}

/// How a directory search resolved against concurrent queries for the same
/// input field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchOutcome {
    /// This was the latest query issued; the result view now shows it.
    Applied(Vec<User>),
    /// A newer query was issued while this one was in flight; its response
    /// was discarded and the result view left alone.
    Superseded,
}

struct SessionState {
    search_seq: u64,
    search_results: Vec<User>,
    selection: SelectionSet,
    conversations: ConversationCache,
    active_conversation: Option<ConversationId>,
}

/// The stateful conversation-session workflow behind the chat front-end's
/// search drawer and group-creation modal: directory search, member
/// selection, and access-or-create / group-create against the conversation
/// service, with the conversation cache as the shared source of truth.
pub struct ChatSessionClient {
    http: Client,
    context: SessionContext,
    inner: Mutex<SessionState>,
    events: broadcast::Sender<ClientEvent>,
}

impl ChatSessionClient {
    pub fn new(context: SessionContext) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            http: Client::new(),
            context,
            inner: Mutex::new(SessionState {
                search_seq: 0,
                search_results: Vec::new(),
                selection: SelectionSet::new(),
                conversations: ConversationCache::new(),
                active_conversation: None,
            }),
            events,
        }
    }

    pub fn context(&self) -> &SessionContext {
        &self.context
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<ClientEvent> {
        self.events.subscribe()
    }

    /// Queries the user directory for `term`.
    ///
    /// An empty term never hits the directory, but it still supersedes any
    /// in-flight query and empties the result view, so a slow earlier
    /// response cannot repopulate a field the user has since cleared. On
    /// transport or authorization failure the previous results are left
    /// untouched.
    pub async fn search_users(&self, term: &str) -> Result<SearchOutcome, ClientError> {
        let seq = {
            let mut guard = self.inner.lock().await;
            guard.search_seq += 1;
            guard.search_seq
        };

        if term.is_empty() {
            return Ok(self.apply_search_results(seq, Vec::new()).await);
        }

        let response = self
            .http
            .get(format!("{}/auth/getUserDetails", self.context.server_url))
            .query(&[("username", term)])
            .bearer_auth(&self.context.bearer_token)
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|source| ClientError::DirectoryUnavailable {
                source: source.into(),
            })?;

        let body: DirectorySearchResponse =
            response
                .json()
                .await
                .map_err(|source| ClientError::DirectoryUnavailable {
                    source: source.into(),
                })?;

        let users = body.users.into_iter().map(User::from).collect();
        Ok(self.apply_search_results(seq, users).await)
    }

    async fn apply_search_results(&self, seq: u64, users: Vec<User>) -> SearchOutcome {
        {
            let mut guard = self.inner.lock().await;
            if seq != guard.search_seq {
                info!(
                    seq,
                    latest = guard.search_seq,
                    "discarding stale directory response"
                );
                return SearchOutcome::Superseded;
            }
            guard.search_results = users.clone();
        }

        let _ = self.events.send(ClientEvent::SearchResultsUpdated {
            users: users.clone(),
        });
        SearchOutcome::Applied(users)
    }

    /// Adds `user` to the group-composition selection. Selecting a user who
    /// is already present reports `AlreadySelected` and changes nothing.
    pub async fn select_user(&self, user: User) -> Result<(), AlreadySelected> {
        let selected = {
            let mut guard = self.inner.lock().await;
            guard.selection.add(user)?;
            guard.selection.users().to_vec()
        };
        let _ = self.events.send(ClientEvent::SelectionUpdated { selected });
        Ok(())
    }

    /// Drops `user_id` from the selection if present.
    pub async fn deselect_user(&self, user_id: &UserId) {
        let selected = {
            let mut guard = self.inner.lock().await;
            guard.selection.remove(user_id);
            guard.selection.users().to_vec()
        };
        let _ = self.events.send(ClientEvent::SelectionUpdated { selected });
    }

    /// Opens the one-to-one conversation with `target_user_id`, creating it
    /// remotely if it does not exist. The service is authoritative for
    /// existence; both outcomes are handled uniformly by promoting the
    /// returned conversation to the front of the cache before returning.
    pub async fn access_or_create(
        &self,
        target_user_id: &UserId,
    ) -> Result<Conversation, ClientError> {
        let response = self
            .http
            .post(format!("{}/chat", self.context.server_url))
            .bearer_auth(&self.context.bearer_token)
            .json(&AccessConversationRequest {
                user_id: target_user_id.clone(),
            })
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|source| ClientError::ConversationAccessFailed {
                target_user_id: target_user_id.clone(),
                source: source.into(),
            })?;

        let payload: ConversationPayload =
            response
                .json()
                .await
                .map_err(|source| ClientError::ConversationAccessFailed {
                    target_user_id: target_user_id.clone(),
                    source: source.into(),
                })?;

        let conversation = payload.into_domain();
        info!(
            conversation_id = %conversation.id,
            target_user_id = %target_user_id,
            "one-to-one conversation opened"
        );
        self.adopt_conversation(conversation.clone(), true).await;
        Ok(conversation)
    }

    /// Submits a group-conversation creation request built from `name` and
    /// the current selection. Validation is local and synchronous; invalid
    /// input never issues a request.
    pub async fn create_group(&self, name: &str) -> Result<Conversation, ClientError> {
        if name.trim().is_empty() {
            return Err(ClientError::InvalidGroupRequest {
                reason: InvalidGroupReason::MissingName,
            });
        }

        let member_ids = {
            let guard = self.inner.lock().await;
            guard.selection.to_id_list()
        };
        if member_ids.is_empty() {
            return Err(ClientError::InvalidGroupRequest {
                reason: InvalidGroupReason::NoMembersSelected,
            });
        }

        // The service wants the member list double-encoded as a JSON string.
        let users =
            serde_json::to_string(&member_ids).map_err(|source| ClientError::GroupCreationFailed {
                detail: format!("failed to encode member id list: {source}"),
            })?;

        let response = self
            .http
            .post(format!("{}/chat/group", self.context.server_url))
            .bearer_auth(&self.context.bearer_token)
            .json(&CreateGroupRequest {
                chat_name: name.to_string(),
                users,
            })
            .send()
            .await
            .map_err(|source| ClientError::GroupCreationFailed {
                detail: source.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let detail = response
                .json::<ServiceErrorBody>()
                .await
                .ok()
                .and_then(|body| body.message)
                .unwrap_or_else(|| format!("conversation service returned {status}"));
            warn!(%status, %detail, "group creation rejected by service");
            return Err(ClientError::GroupCreationFailed { detail });
        }

        let payload: ConversationPayload =
            response
                .json()
                .await
                .map_err(|source| ClientError::GroupCreationFailed {
                    detail: format!("malformed conversation payload: {source}"),
                })?;

        let conversation = payload.into_domain();
        info!(
            conversation_id = %conversation.id,
            members = conversation.member_ids.len(),
            "group conversation created"
        );
        self.adopt_conversation(conversation.clone(), false).await;
        Ok(conversation)
    }

    /// Promotes `conversation` in the cache, and marks it active for the
    /// direct-open flow. The cache mutation completes before any event is
    /// emitted and before control returns to the caller.
    async fn adopt_conversation(&self, conversation: Conversation, activate: bool) {
        {
            let mut guard = self.inner.lock().await;
            guard.conversations.upsert_front(conversation.clone());
            if activate {
                guard.active_conversation = Some(conversation.id.clone());
            }
        }

        let _ = self.events.send(ClientEvent::ConversationUpserted {
            conversation: conversation.clone(),
        });
        if activate {
            let _ = self.events.send(ClientEvent::ActiveConversationChanged {
                conversation_id: Some(conversation.id),
            });
        }
    }

    pub async fn search_results(&self) -> Vec<User> {
        self.inner.lock().await.search_results.clone()
    }

    pub async fn selected_users(&self) -> Vec<User> {
        self.inner.lock().await.selection.users().to_vec()
    }

    pub async fn conversations(&self) -> Vec<Conversation> {
        self.inner.lock().await.conversations.snapshot()
    }

    pub async fn active_conversation(&self) -> Option<ConversationId> {
        self.inner.lock().await.active_conversation.clone()
    }

    /// Tears down session-scoped state on logout: search results, selection,
    /// conversation cache, and the active conversation marker. A reset
    /// counts as the newest query, so directory responses still in flight
    /// are discarded as stale instead of repopulating the cleared view.
    pub async fn reset(&self) {
        {
            let mut guard = self.inner.lock().await;
            guard.search_seq += 1;
            guard.search_results.clear();
            guard.selection.clear();
            guard.conversations.clear();
            guard.active_conversation = None;
        }
        let _ = self.events.send(ClientEvent::SearchResultsUpdated {
            users: Vec::new(),
        });
        let _ = self.events.send(ClientEvent::SelectionUpdated {
            selected: Vec::new(),
        });
        let _ = self.events.send(ClientEvent::ActiveConversationChanged {
            conversation_id: None,
        });
    }
}

/// The surface a UI collaborator holds: the three mutating operations plus
/// read-only snapshots, behind a trait object.
#[async_trait]
pub trait SessionHandle: Send + Sync {
    async fn search_users(&self, term: &str) -> Result<SearchOutcome, ClientError>;
    async fn select_user(&self, user: User) -> Result<(), AlreadySelected>;
    async fn deselect_user(&self, user_id: &UserId);
    async fn access_or_create(&self, target_user_id: &UserId)
        -> Result<Conversation, ClientError>;
    async fn create_group(&self, name: &str) -> Result<Conversation, ClientError>;
    async fn search_results(&self) -> Vec<User>;
    async fn selected_users(&self) -> Vec<User>;
    async fn conversations(&self) -> Vec<Conversation>;
    async fn active_conversation(&self) -> Option<ConversationId>;
    fn subscribe_events(&self) -> broadcast::Receiver<ClientEvent>;
}

#[async_trait]
impl SessionHandle for Arc<ChatSessionClient> {
    async fn search_users(&self, term: &str) -> Result<SearchOutcome, ClientError> {
        ChatSessionClient::search_users(self, term).await
    }

    async fn select_user(&self, user: User) -> Result<(), AlreadySelected> {
        ChatSessionClient::select_user(self, user).await
    }

    async fn deselect_user(&self, user_id: &UserId) {
        ChatSessionClient::deselect_user(self, user_id).await
    }

    async fn access_or_create(
        &self,
        target_user_id: &UserId,
    ) -> Result<Conversation, ClientError> {
        ChatSessionClient::access_or_create(self, target_user_id).await
    }

    async fn create_group(&self, name: &str) -> Result<Conversation, ClientError> {
        ChatSessionClient::create_group(self, name).await
    }

    async fn search_results(&self) -> Vec<User> {
        ChatSessionClient::search_results(self).await
    }

    async fn selected_users(&self) -> Vec<User> {
        ChatSessionClient::selected_users(self).await
    }

    async fn conversations(&self) -> Vec<Conversation> {
        ChatSessionClient::conversations(self).await
    }

    async fn active_conversation(&self) -> Option<ConversationId> {
        ChatSessionClient::active_conversation(self).await
    }

    fn subscribe_events(&self) -> broadcast::Receiver<ClientEvent> {
        ChatSessionClient::subscribe_events(self)
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
