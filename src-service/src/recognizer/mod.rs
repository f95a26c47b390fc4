//! Speech recognition capability.
//!
//! The recognizer is a black box that accepts start/stop/cancel requests and
//! reports progress through a fixed set of callbacks. Callbacks are delivered
//! over a channel in emission order, one at a time, to whichever task owns
//! the listening controller.

pub mod sidecar;

use assistlens_common::RecognitionConfig;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::error::ServiceError;

pub use sidecar::SidecarProvider;

/// Sending half handed to a recognizer for its callbacks.
pub type CallbackSender = mpsc::UnboundedSender<RecognizerCallback>;

/// Receiving half drained by the controller task.
pub type CallbackReceiver = mpsc::UnboundedReceiver<RecognizerCallback>;

/// Callbacks a recognizer may emit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "callback", rename_all = "snake_case")]
pub enum RecognizerCallback {
    /// The recognizer is ready for the user to speak
    ReadyForSpeech,
    /// The user started speaking
    BeginningOfSpeech,
    /// Input level changed
    RmsChanged { rms_db: f32 },
    /// Raw audio was captured
    BufferReceived {
        #[serde(default)]
        buffer: Vec<u8>,
    },
    /// The user stopped speaking
    EndOfSpeech,
    /// The session failed with a native error code
    Error { code: i32 },
    /// Final hypotheses, best first
    Results {
        #[serde(default)]
        matches: Vec<String>,
    },
    /// Partial hypotheses, best first
    PartialResults {
        #[serde(default)]
        matches: Vec<String>,
    },
    /// Engine-specific event
    Event { event_type: i32 },
}

impl RecognizerCallback {
    /// Whether the current recognition attempt is over after this callback.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RecognizerCallback::EndOfSpeech
                | RecognizerCallback::Error { .. }
                | RecognizerCallback::Results { .. }
        )
    }
}

/// An active speech recognizer.
///
/// All methods are fire-and-forget requests; completion is reported through
/// callbacks, never through return values.
pub trait SpeechRecognizer: Send {
    /// Begin a recognition session with the given configuration.
    fn start_listening(&mut self, config: &RecognitionConfig);

    /// Stop capturing audio; results for speech already heard may still arrive.
    fn stop_listening(&mut self);

    /// Abort the current session without delivering results.
    fn cancel(&mut self);

    /// Release the recognizer. No further callbacks are expected.
    fn destroy(&mut self);
}

/// Factory for the platform recognizer.
pub trait RecognizerProvider: Send + Sync {
    /// Whether speech recognition exists on this device.
    fn is_recognition_available(&self) -> bool;

    /// Construct a recognizer that reports through `callbacks`.
    fn create_recognizer(
        &self,
        callbacks: CallbackSender,
    ) -> Result<Box<dyn SpeechRecognizer>, ServiceError>;
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_callbacks() {
        assert!(RecognizerCallback::EndOfSpeech.is_terminal());
        assert!(RecognizerCallback::Error { code: 7 }.is_terminal());
        assert!(RecognizerCallback::Results { matches: vec![] }.is_terminal());
        assert!(!RecognizerCallback::ReadyForSpeech.is_terminal());
        assert!(!RecognizerCallback::PartialResults { matches: vec![] }.is_terminal());
        assert!(!RecognizerCallback::RmsChanged { rms_db: -2.0 }.is_terminal());
    }

    #[test]
    fn test_callback_line_format() {
        let cb: RecognizerCallback =
            serde_json::from_str(r#"{"callback":"results","matches":["turn on lights"]}"#)
                .unwrap();
        assert_eq!(
            cb,
            RecognizerCallback::Results {
                matches: vec!["turn on lights".to_string()]
            }
        );

        let cb: RecognizerCallback =
            serde_json::from_str(r#"{"callback":"error","code":1}"#).unwrap();
        assert_eq!(cb, RecognizerCallback::Error { code: 1 });

        // Missing match lists are treated as empty
        let cb: RecognizerCallback =
            serde_json::from_str(r#"{"callback":"partial_results"}"#).unwrap();
        assert_eq!(cb, RecognizerCallback::PartialResults { matches: vec![] });
    }
}
