//! The event model: what happened, to which object, and how severe.

use std::borrow::Cow;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use reeve_core::Body;

/// Cap on a posted message, counted in characters.
pub const MAX_MESSAGE_LENGTH: usize = 1024;

/// Marker spliced in where the middle of an over-long message was removed.
pub const CUT_INFIX: &str = "...";

/// Severity tag carried on every event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventType {
    Normal,
    Warning,
    Error,
}

impl EventType {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Normal => "Normal",
            Self::Warning => "Warning",
            Self::Error => "Error",
        }
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Coordinates of the object an event is attached to.
///
/// Every field is optional: events about partially-known objects are still
/// worth posting, and the receiving side matches on whatever is present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectRef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
}

impl ObjectRef {
    #[must_use]
    pub fn from_body(body: &Body) -> Self {
        Self {
            api_version: body.api_version().map(str::to_owned),
            kind: body.kind().map(str::to_owned),
            name: body.name().map(str::to_owned),
            namespace: body.namespace().map(str::to_owned),
            uid: body.uid().map(str::to_owned),
        }
    }
}

/// One audit event about one object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectEvent {
    pub object: ObjectRef,
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub reason: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl ObjectEvent {
    /// Build an event, capping the message at [`MAX_MESSAGE_LENGTH`].
    #[must_use]
    pub fn new(
        object: ObjectRef,
        event_type: EventType,
        reason: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        let message = message.into();
        let message = match truncate_message(&message) {
            Cow::Borrowed(_) => message,
            Cow::Owned(cut) => cut,
        };
        Self {
            object,
            event_type,
            reason: reason.into(),
            message,
            timestamp: Utc::now(),
        }
    }
}

/// Cap `message` at [`MAX_MESSAGE_LENGTH`] characters.
///
/// The cut is taken from the middle and replaced with [`CUT_INFIX`], keeping
/// the head and the tail, where identifiers and causes usually sit. Lengths
/// are counted in characters, so a multi-byte character is never split.
#[must_use]
pub fn truncate_message(message: &str) -> Cow<'_, str> {
    let total = message.chars().count();
    if total <= MAX_MESSAGE_LENGTH {
        return Cow::Borrowed(message);
    }
    let head_len = MAX_MESSAGE_LENGTH / 2 - CUT_INFIX.len() / 2;
    let tail_len = MAX_MESSAGE_LENGTH - head_len - CUT_INFIX.len();
    let head: String = message.chars().take(head_len).collect();
    let tail: String = message.chars().skip(total - tail_len).collect();
    Cow::Owned(format!("{head}{CUT_INFIX}{tail}"))
}
