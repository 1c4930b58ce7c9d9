//! Typed push events.
//!
//! Entity payloads (statuses, notifications, conversations, ...) are kept
//! as raw JSON: their schema belongs to the caller. Only the events whose
//! shape the sync core itself interprets are decoded into typed structs.

use crate::error::{ProtocolError, ProtocolResult};
use crate::frame::StreamFrame;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// A push event decoded from a [`StreamFrame`].
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// A new status on the subscribed timeline.
    Update(Value),
    /// An existing status was edited.
    StatusUpdate(Value),
    /// A status was deleted. Carries the status id.
    Delete(String),
    /// A new notification.
    Notification(Value),
    /// A direct conversation changed.
    Conversation(Value),
    /// An announcement was published or edited.
    Announcement(Value),
    /// An announcement was removed. Carries the announcement id.
    AnnouncementDelete(String),
    /// A chat changed.
    ChatUpdate(Value),
    /// The user's filters changed and must be re-fetched.
    FiltersChanged,
    /// A follow request changed state.
    FollowRelationshipsUpdate(FollowRelationshipsUpdate),
    /// Read markers moved, keyed by timeline name.
    Marker(BTreeMap<String, Marker>),
    /// Any event this client does not interpret.
    Unknown(String),
}

impl StreamEvent {
    /// Event name for `update`.
    pub const UPDATE: &'static str = "update";
    /// Event name for `status.update`.
    pub const STATUS_UPDATE: &'static str = "status.update";
    /// Event name for `delete`.
    pub const DELETE: &'static str = "delete";
    /// Event name for `notification`.
    pub const NOTIFICATION: &'static str = "notification";
    /// Event name for `conversation`.
    pub const CONVERSATION: &'static str = "conversation";
    /// Event name for `announcement`.
    pub const ANNOUNCEMENT: &'static str = "announcement";
    /// Event name for `announcement.delete`.
    pub const ANNOUNCEMENT_DELETE: &'static str = "announcement.delete";
    /// Event name for `chat_update`.
    pub const CHAT_UPDATE: &'static str = "chat_update";
    /// Event name for `filters_changed`.
    pub const FILTERS_CHANGED: &'static str = "filters_changed";
    /// Event name for follow relationship updates.
    pub const FOLLOW_RELATIONSHIPS_UPDATE: &'static str = "pleroma:follow_relationships_update";
    /// Event name for `marker`.
    pub const MARKER: &'static str = "marker";

    /// Decodes the event carried by `frame`.
    ///
    /// Unrecognized event names decode to [`StreamEvent::Unknown`] rather
    /// than failing.
    pub fn from_frame(frame: &StreamFrame) -> ProtocolResult<Self> {
        let event = match frame.event.as_str() {
            Self::UPDATE => Self::Update(frame.payload_as()?),
            Self::STATUS_UPDATE => Self::StatusUpdate(frame.payload_as()?),
            Self::DELETE => Self::Delete(bare_id(frame)?),
            Self::NOTIFICATION => Self::Notification(frame.payload_as()?),
            Self::CONVERSATION => Self::Conversation(frame.payload_as()?),
            Self::ANNOUNCEMENT => Self::Announcement(frame.payload_as()?),
            Self::ANNOUNCEMENT_DELETE => Self::AnnouncementDelete(bare_id(frame)?),
            Self::CHAT_UPDATE => Self::ChatUpdate(frame.payload_as()?),
            Self::FILTERS_CHANGED => Self::FiltersChanged,
            Self::FOLLOW_RELATIONSHIPS_UPDATE => {
                Self::FollowRelationshipsUpdate(frame.payload_as()?)
            }
            Self::MARKER => Self::Marker(frame.payload_as()?),
            other => Self::Unknown(other.to_string()),
        };
        Ok(event)
    }

    /// Parses a text frame and decodes its event in one step.
    pub fn parse(text: &str) -> ProtocolResult<Self> {
        Self::from_frame(&StreamFrame::parse(text)?)
    }

    /// Returns the wire name of this event.
    pub fn name(&self) -> &str {
        match self {
            Self::Update(_) => Self::UPDATE,
            Self::StatusUpdate(_) => Self::STATUS_UPDATE,
            Self::Delete(_) => Self::DELETE,
            Self::Notification(_) => Self::NOTIFICATION,
            Self::Conversation(_) => Self::CONVERSATION,
            Self::Announcement(_) => Self::ANNOUNCEMENT,
            Self::AnnouncementDelete(_) => Self::ANNOUNCEMENT_DELETE,
            Self::ChatUpdate(_) => Self::CHAT_UPDATE,
            Self::FiltersChanged => Self::FILTERS_CHANGED,
            Self::FollowRelationshipsUpdate(_) => Self::FOLLOW_RELATIONSHIPS_UPDATE,
            Self::Marker(_) => Self::MARKER,
            Self::Unknown(name) => name,
        }
    }
}

/// Delete payloads are a bare id, sometimes JSON quoted.
fn bare_id(frame: &StreamFrame) -> ProtocolResult<String> {
    let raw = frame.require_payload()?.trim();
    // Numeric ids may exceed u64, so only quoted ids are decoded.
    let id = match serde_json::from_str::<Value>(raw) {
        Ok(Value::String(s)) => s,
        _ => raw.to_string(),
    };
    if id.is_empty() {
        return Err(ProtocolError::payload(frame.event.clone(), "empty id"));
    }
    Ok(id)
}

/// Direction of a follow request transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FollowState {
    /// The request awaits approval.
    FollowPending,
    /// The request was approved.
    FollowAccept,
    /// The request was rejected.
    FollowReject,
    /// A state this client does not know about.
    #[serde(other)]
    Unknown,
}

impl FollowState {
    /// Returns the `(following, requested)` pair this state implies, or
    /// `None` when the state carries no relationship change.
    pub fn relationship_flags(&self) -> Option<(bool, bool)> {
        match self {
            FollowState::FollowPending => Some((false, true)),
            FollowState::FollowAccept => Some((true, false)),
            FollowState::FollowReject => Some((false, false)),
            FollowState::Unknown => None,
        }
    }
}

/// Follower/following counters reported for one side of a follow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FollowCounters {
    /// Account id.
    pub id: String,
    /// Number of accounts following this account.
    #[serde(default)]
    pub follower_count: Option<u64>,
    /// Number of accounts this account follows.
    #[serde(default)]
    pub following_count: Option<u64>,
}

/// Payload of `pleroma:follow_relationships_update`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FollowRelationshipsUpdate {
    /// New state of the follow request.
    pub state: FollowState,
    /// The account that sent the follow request.
    pub follower: FollowCounters,
    /// The account being followed.
    pub following: FollowCounters,
}

/// A read marker for one timeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Marker {
    /// Id of the last read item.
    pub last_read_id: String,
    /// Server-side version counter.
    #[serde(default)]
    pub version: u64,
    /// When the marker was last moved.
    #[serde(default)]
    pub updated_at: Option<String>,
}
