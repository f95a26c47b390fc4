//! IPC response types.

use serde::{Deserialize, Serialize};

use crate::types::{
    ErrorCode, RecognitionEvent, ServiceState, LISTENING_STARTED, SERVICE_CHANNEL,
};

/// IPC response from service to client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    // === Method Channel ===
    /// Command completed (no payload)
    Success,
    /// Method name is not handled by the service
    NotImplemented { method: String },

    // === Event Channel ===
    /// Connection attached as the event sink
    Listening { channel: String },
    /// Connection detached from the event stream
    Cancelled,
    /// Event pushed to the attached sink
    Event { event: EventPayload },

    // === Queries ===
    /// Current controller state
    State { state: ServiceState },
    /// Pong response to ping, naming the command channel that answered
    Pong { channel: String },

    // === Error Response ===
    /// Request could not be handled
    Error { message: String },
}

impl Response {
    /// Create an error response.
    pub fn error(message: impl Into<String>) -> Self {
        Response::Error {
            message: message.into(),
        }
    }

    /// Pong from this service's command channel.
    pub fn pong() -> Self {
        Response::Pong {
            channel: SERVICE_CHANNEL.to_string(),
        }
    }

    /// Check if this response indicates an error.
    pub fn is_error(&self) -> bool {
        matches!(self, Response::Error { .. })
    }
}

/// Payload of a pushed event: either a success value or an error triple.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EventPayload {
    /// `LISTENING_STARTED` or a transcript (partial or final)
    Success { value: String },
    /// Error code, description, and the native code if there is one
    Error {
        code: ErrorCode,
        message: String,
        details: Option<i32>,
    },
}

impl EventPayload {
    /// Whether this is the readiness marker rather than a transcript.
    pub fn is_listening_started(&self) -> bool {
        matches!(self, EventPayload::Success { value } if value == LISTENING_STARTED)
    }
}

impl From<RecognitionEvent> for EventPayload {
    fn from(event: RecognitionEvent) -> Self {
        match event {
            RecognitionEvent::Started => EventPayload::Success {
                value: LISTENING_STARTED.to_string(),
            },
            RecognitionEvent::PartialText(text) | RecognitionEvent::FinalText(text) => {
                EventPayload::Success { value: text }
            }
            RecognitionEvent::Error {
                code,
                message,
                native_code,
            } => EventPayload::Error {
                code,
                message,
                details: native_code,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_and_final_are_indistinguishable_on_the_wire() {
        let partial = EventPayload::from(RecognitionEvent::PartialText("turn on lights".into()));
        let final_ = EventPayload::from(RecognitionEvent::FinalText("turn on lights".into()));
        assert_eq!(partial, final_);
    }

    #[test]
    fn test_started_maps_to_marker() {
        let payload = EventPayload::from(RecognitionEvent::Started);
        assert!(payload.is_listening_started());
        assert!(!EventPayload::Success {
            value: "hello".into()
        }
        .is_listening_started());
    }

    #[test]
    fn test_error_event_wire_format() {
        let response = Response::Event {
            event: RecognitionEvent::recognizer_null().into(),
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["type"], "event");
        assert_eq!(json["event"]["kind"], "error");
        assert_eq!(json["event"]["code"], "SPEECH_RECOGNIZER_NULL");
        assert_eq!(json["event"]["message"], "Speech recognizer not initialized");
        assert!(json["event"]["details"].is_null());
    }

    #[test]
    fn test_success_has_no_payload() {
        let json = serde_json::to_string(&Response::Success).unwrap();
        assert_eq!(json, r#"{"type":"success"}"#);
        assert!(!Response::Success.is_error());
        assert!(Response::error("boom").is_error());
    }

    #[test]
    fn test_pong_names_command_channel() {
        let json = serde_json::to_value(Response::pong()).unwrap();
        assert_eq!(json["type"], "pong");
        assert_eq!(json["channel"], "com.assistlens.app/voice_service");
    }
}
