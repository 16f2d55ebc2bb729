//! Wire types for the avatar streaming channel.

use rehearse_core::presence::{ChannelEvent, SpeakMode};
use serde::{Deserialize, Serialize};

/// Lifecycle events as they appear on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WireEvent {
    StreamReady,
    StreamDisconnected,
    AvatarStartTalking,
    AvatarStopTalking,
    UserStart,
    UserStop,
    #[serde(other)]
    Unknown,
}

impl WireEvent {
    /// Maps a wire event onto the channel contract the core consumes.
    /// Events this layer does not use collapse to `None`.
    pub fn into_channel_event(self) -> Option<ChannelEvent> {
        match self {
            WireEvent::StreamReady => Some(ChannelEvent::MediaReady),
            WireEvent::StreamDisconnected => Some(ChannelEvent::MediaDisconnected),
            WireEvent::AvatarStartTalking => Some(ChannelEvent::SpeakStarted),
            WireEvent::AvatarStopTalking => Some(ChannelEvent::SpeakEnded),
            WireEvent::UserStart => Some(ChannelEvent::UserSpeechStarted),
            WireEvent::UserStop => Some(ChannelEvent::UserSpeechStopped),
            WireEvent::Unknown => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    /// Render the text verbatim; no generation on the avatar side.
    Repeat,
    Talk,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskMode {
    Sync,
    Async,
}

impl From<SpeakMode> for TaskMode {
    fn from(mode: SpeakMode) -> Self {
        match mode {
            SpeakMode::Sync => TaskMode::Sync,
            SpeakMode::Async => TaskMode::Async,
        }
    }
}

/// Client-to-server requests.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WireRequest<'a> {
    Speak {
        text: &'a str,
        task_type: TaskType,
        task_mode: TaskMode,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifecycle_events_deserialize_from_wire_tags() {
        let event: WireEvent = serde_json::from_str(r#"{"type":"stream_ready"}"#).unwrap();
        assert_eq!(event, WireEvent::StreamReady);
        assert_eq!(event.into_channel_event(), Some(ChannelEvent::MediaReady));

        let event: WireEvent =
            serde_json::from_str(r#"{"type":"avatar_stop_talking","task_id":"t-1"}"#).unwrap();
        assert_eq!(event.into_channel_event(), Some(ChannelEvent::SpeakEnded));
    }

    #[test]
    fn unknown_event_types_are_tolerated() {
        let event: WireEvent = serde_json::from_str(r#"{"type":"stream_stats"}"#).unwrap();
        assert_eq!(event, WireEvent::Unknown);
        assert_eq!(event.into_channel_event(), None);
    }

    #[test]
    fn speak_request_serializes_as_a_task() {
        let request = WireRequest::Speak {
            text: "Tell me about a recent project.",
            task_type: TaskType::Repeat,
            task_mode: SpeakMode::Async.into(),
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["type"], "speak");
        assert_eq!(json["task_type"], "repeat");
        assert_eq!(json["task_mode"], "async");
        assert_eq!(json["text"], "Tell me about a recent project.");
    }
}
