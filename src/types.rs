//! Core types for the messages event bus.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque position in the remote conversation log.
///
/// Revisions are sortable strings minted by the server. Ordering is plain
/// lexical string comparison and must stay that way: tokens are not numbers.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Revision(pub String);

impl Revision {
    pub fn new(rev: impl Into<String>) -> Self {
        Revision(rev.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Rev({})", self.0)
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Revision {
    fn from(s: &str) -> Self {
        Revision(s.to_string())
    }
}

/// Conversation identifier.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConvoId(pub String);

impl ConvoId {
    pub fn new(id: impl Into<String>) -> Self {
        ConvoId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ConvoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ConvoId({})", self.0)
    }
}

impl fmt::Display for ConvoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ConvoId {
    fn from(s: &str) -> Self {
        ConvoId(s.to_string())
    }
}

/// Kind of a log entry, taken from its `$type` discriminator.
///
/// Unrecognised kinds are preserved verbatim so newer servers don't break
/// older clients.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum LogKind {
    BeginConvo,
    LeaveConvo,
    CreateMessage,
    DeleteMessage,
    Other(String),
}

const BEGIN_CONVO: &str = "chat.bsky.convo.defs#logBeginConvo";
const LEAVE_CONVO: &str = "chat.bsky.convo.defs#logLeaveConvo";
const CREATE_MESSAGE: &str = "chat.bsky.convo.defs#logCreateMessage";
const DELETE_MESSAGE: &str = "chat.bsky.convo.defs#logDeleteMessage";

impl LogKind {
    pub fn as_str(&self) -> &str {
        match self {
            LogKind::BeginConvo => BEGIN_CONVO,
            LogKind::LeaveConvo => LEAVE_CONVO,
            LogKind::CreateMessage => CREATE_MESSAGE,
            LogKind::DeleteMessage => DELETE_MESSAGE,
            LogKind::Other(s) => s,
        }
    }
}

impl Default for LogKind {
    fn default() -> Self {
        LogKind::Other(String::new())
    }
}

impl From<String> for LogKind {
    fn from(s: String) -> Self {
        match s.as_str() {
            BEGIN_CONVO => LogKind::BeginConvo,
            LEAVE_CONVO => LogKind::LeaveConvo,
            CREATE_MESSAGE => LogKind::CreateMessage,
            DELETE_MESSAGE => LogKind::DeleteMessage,
            _ => LogKind::Other(s),
        }
    }
}

impl From<LogKind> for String {
    fn from(kind: LogKind) -> Self {
        match kind {
            LogKind::Other(s) => s,
            known => known.as_str().to_string(),
        }
    }
}

/// A single change record from the remote conversation log.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    #[serde(rename = "$type", default)]
    pub kind: LogKind,

    /// Entries without a revision are not understood and get skipped.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rev: Option<Revision>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub convo_id: Option<ConvoId>,

    /// Message view for create/delete entries, kept as raw JSON.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<serde_json::Value>,
}

impl LogEntry {
    /// Build an entry of the given kind. Mostly useful for tests and fixtures.
    pub fn new(kind: LogKind, rev: impl Into<Revision>, convo_id: impl Into<ConvoId>) -> Self {
        Self {
            kind,
            rev: Some(rev.into()),
            convo_id: Some(convo_id.into()),
            message: None,
        }
    }

    /// Whether this entry belongs to the given conversation.
    pub fn is_for(&self, convo_id: &ConvoId) -> bool {
        self.convo_id.as_ref() == Some(convo_id)
    }
}

/// The subset of a conversation view the bus cares about.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConvoView {
    pub id: ConvoId,
    pub rev: Revision,
    #[serde(default)]
    pub unread_count: u64,
}

/// Query for `listConvos`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ListConvosParams {
    pub limit: Option<u32>,
    pub cursor: Option<String>,
}

/// One page of `listConvos`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ListConvosPage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,
    #[serde(default)]
    pub convos: Vec<ConvoView>,
}

/// Query for `getLog`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GetLogParams {
    /// Revision to read after; `None` reads from the start.
    pub cursor: Option<Revision>,
}

/// One page of `getLog`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LogPage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,
    #[serde(default)]
    pub logs: Vec<LogEntry>,
}

/// Identifier of a registered listener.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u64);

/// Identifier of a poll-interval request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PollRequestId(pub u64);
