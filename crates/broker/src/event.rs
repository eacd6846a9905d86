//! Inbound events from the messaging transport.

use broker_core::GeoPoint;

use crate::action::ActionToken;

/// Who sent an event, as reported by the transport.
#[derive(Debug, Clone, PartialEq)]
pub struct Participant {
    /// Per-channel identity; also the address replies go to.
    pub channel_id: i64,
    /// Public handle without the leading `@`.
    pub handle: Option<String>,
    pub display_name: Option<String>,
}

impl Participant {
    pub fn new(channel_id: i64) -> Self {
        Self {
            channel_id,
            handle: None,
            display_name: None,
        }
    }

    pub fn with_handle(mut self, handle: impl Into<String>) -> Self {
        self.handle = Some(handle.into());
        self
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }
}

/// What the participant sent.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Text(String),
    Action(ActionToken),
    Location(GeoPoint),
}

/// One inbound event.
#[derive(Debug, Clone, PartialEq)]
pub struct InboundEvent {
    pub participant: Participant,
    pub payload: Payload,
}

impl InboundEvent {
    pub fn text(participant: Participant, text: impl Into<String>) -> Self {
        Self {
            participant,
            payload: Payload::Text(text.into()),
        }
    }

    pub fn action(participant: Participant, token: ActionToken) -> Self {
        Self {
            participant,
            payload: Payload::Action(token),
        }
    }

    pub fn location(participant: Participant, point: GeoPoint) -> Self {
        Self {
            participant,
            payload: Payload::Location(point),
        }
    }

    /// Channel the reply goes to.
    pub fn channel_id(&self) -> i64 {
        self.participant.channel_id
    }
}
