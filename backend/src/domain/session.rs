//! Chat session orchestration state.
//!
//! Models the client-side life of a conversation: a draft chat carries a
//! pre-minted identifier before the server has seen it, and becomes
//! persisted once the first assistant response lands. The transcript and
//! sidebar caches are explicit, bounded objects handed to whoever needs
//! them.

use std::collections::HashMap;
use std::collections::VecDeque;

use chrono::{DateTime, Duration, Utc};

use crate::domain::chat::{ChatId, ChatSummary, Message, MessageRole};

/// Whether the active conversation has been persisted yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatSessionState {
    /// Not yet persisted; the identifier is minted but speculative.
    Draft {
        /// Pre-minted identifier the first request will use.
        pending: ChatId,
    },
    /// The server has acknowledged the chat.
    Persisted {
        /// Confirmed identifier.
        chat: ChatId,
    },
}

/// One conversation's session state plus its one-shot navigation flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatSession {
    state: ChatSessionState,
    navigated: bool,
}

impl ChatSession {
    /// Start a draft session with a freshly minted identifier.
    pub fn new_draft() -> Self {
        Self {
            state: ChatSessionState::Draft {
                pending: ChatId::mint(),
            },
            navigated: false,
        }
    }

    /// Open a session over a chat that already exists.
    pub fn for_existing(chat: ChatId) -> Self {
        Self {
            state: ChatSessionState::Persisted { chat },
            navigated: false,
        }
    }

    /// Current session state.
    pub fn state(&self) -> &ChatSessionState {
        &self.state
    }

    /// Identifier every request for this conversation uses, draft or not.
    pub fn chat_id(&self) -> &ChatId {
        match &self.state {
            ChatSessionState::Draft { pending } => pending,
            ChatSessionState::Persisted { chat } => chat,
        }
    }

    /// Record that the first assistant response completed.
    ///
    /// Returns the chat id to navigate to exactly once per draft; later
    /// calls return `None`. Sessions opened over existing chats never
    /// navigate.
    pub fn on_first_response(&mut self) -> Option<ChatId> {
        match &self.state {
            ChatSessionState::Draft { pending } => {
                let chat = pending.clone();
                self.state = ChatSessionState::Persisted { chat: chat.clone() };
                self.navigated = true;
                Some(chat)
            }
            ChatSessionState::Persisted { .. } => None,
        }
    }

    /// Discard this conversation and start a genuinely new draft,
    /// resetting the navigation flag.
    pub fn start_new(&mut self) {
        *self = Self::new_draft();
    }
}

/// Locally cached recent-chats list with optimistic insertion.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecentChatsCache {
    entries: Vec<ChatSummary>,
}

impl RecentChatsCache {
    /// Cached entries, newest first.
    pub fn entries(&self) -> &[ChatSummary] {
        &self.entries
    }

    /// Optimistically insert a placeholder for a chat the server has not
    /// acknowledged yet.
    pub fn insert_placeholder(&mut self, chat: ChatId, created_at: DateTime<Utc>) {
        if self.entries.iter().any(|entry| entry.id == chat) {
            return;
        }
        self.entries.insert(
            0,
            ChatSummary {
                id: chat,
                title: String::new(),
                created_at,
            },
        );
    }

    /// Replace the cache with an authoritative server page. Placeholders
    /// the server does not know yet survive at the front.
    pub fn reconcile(&mut self, server_page: Vec<ChatSummary>) {
        let placeholders: Vec<ChatSummary> = self
            .entries
            .iter()
            .filter(|entry| {
                entry.title.is_empty() && !server_page.iter().any(|known| known.id == entry.id)
            })
            .cloned()
            .collect();
        self.entries = placeholders;
        self.entries.extend(server_page);
    }

    /// Update the title of a cached entry, if present.
    pub fn set_title(&mut self, chat: &ChatId, title: impl Into<String>) {
        if let Some(entry) = self.entries.iter_mut().find(|entry| entry.id == *chat) {
            entry.title = title.into();
        }
    }

    /// Drop a cached entry.
    pub fn remove(&mut self, chat: &ChatId) {
        self.entries.retain(|entry| entry.id != *chat);
    }
}

/// Age bucket a chat falls into for sidebar grouping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChatAgeBucket {
    /// Created today.
    Today,
    /// Created yesterday.
    Yesterday,
    /// Created within the last seven days.
    LastWeek,
    /// Older than seven days.
    Older,
}

/// Bucket a creation timestamp relative to `now`.
pub fn age_bucket(created_at: DateTime<Utc>, now: DateTime<Utc>) -> ChatAgeBucket {
    let today = now.date_naive();
    let created = created_at.date_naive();
    if created == today {
        ChatAgeBucket::Today
    } else if today.signed_duration_since(created) <= Duration::days(1) {
        ChatAgeBucket::Yesterday
    } else if today.signed_duration_since(created) <= Duration::days(7) {
        ChatAgeBucket::LastWeek
    } else {
        ChatAgeBucket::Older
    }
}

/// Group summaries by age bucket, preserving their order inside each
/// bucket.
pub fn group_chats_by_age(
    summaries: &[ChatSummary],
    now: DateTime<Utc>,
) -> Vec<(ChatAgeBucket, Vec<ChatSummary>)> {
    let mut groups: Vec<(ChatAgeBucket, Vec<ChatSummary>)> = Vec::new();
    for summary in summaries {
        let bucket = age_bucket(summary.created_at, now);
        match groups.iter_mut().find(|(known, _)| *known == bucket) {
            Some((_, entries)) => entries.push(summary.clone()),
            None => groups.push((bucket, vec![summary.clone()])),
        }
    }
    groups
}

/// Bounded transcript cache keyed by chat id, evicting least recently
/// used entries.
#[derive(Debug)]
pub struct TranscriptCache {
    capacity: usize,
    entries: HashMap<ChatId, Vec<Message>>,
    order: VecDeque<ChatId>,
}

impl TranscriptCache {
    /// Cache holding at most `capacity` transcripts. A zero capacity
    /// caches nothing.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: HashMap::new(),
            order: VecDeque::new(),
        }
    }

    /// Number of cached transcripts.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Store a transcript, evicting the least recently used entry when
    /// full.
    pub fn put(&mut self, chat: ChatId, transcript: Vec<Message>) {
        if self.capacity == 0 {
            return;
        }
        if self.entries.contains_key(&chat) {
            self.order.retain(|known| *known != chat);
        } else if self.entries.len() >= self.capacity {
            if let Some(evicted) = self.order.pop_front() {
                self.entries.remove(&evicted);
            }
        }
        self.order.push_back(chat.clone());
        self.entries.insert(chat, transcript);
    }

    /// Fetch a cached transcript, refreshing its recency.
    pub fn get(&mut self, chat: &ChatId) -> Option<&[Message]> {
        if self.entries.contains_key(chat) {
            self.order.retain(|known| known != chat);
            self.order.push_back(chat.clone());
        }
        self.entries.get(chat).map(Vec::as_slice)
    }

    /// Drop a cached transcript.
    pub fn invalidate(&mut self, chat: &ChatId) {
        self.entries.remove(chat);
        self.order.retain(|known| known != chat);
    }
}

/// Truncated transcript and the user message to resubmit when retrying
/// the last assistant turn.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPlan {
    /// Transcript up to, and excluding, the resent user message.
    pub history: Vec<Message>,
    /// The user message to submit again.
    pub resend: Message,
}

/// Plan a retry of the last assistant turn.
///
/// Finds the final assistant message, drops it and everything after it,
/// and splits off the nearest preceding user message for resubmission.
/// Returns `None` when the transcript holds no assistant turn to retry.
pub fn retry_last_turn(transcript: &[Message]) -> Option<RetryPlan> {
    let last_assistant = transcript
        .iter()
        .rposition(|message| message.role == MessageRole::Assistant)?;
    let resend_index = transcript
        .iter()
        .take(last_assistant)
        .rposition(|message| message.role == MessageRole::User)?;
    Some(RetryPlan {
        history: transcript.get(..resend_index)?.to_vec(),
        resend: transcript.get(resend_index)?.clone(),
    })
}
