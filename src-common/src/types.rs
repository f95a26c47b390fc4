//! Shared types for the voice listening service.

use serde::{Deserialize, Serialize};

/// Application id reported to the recognizer as the calling package.
pub const CALLING_PACKAGE: &str = "com.assistlens.app";

/// Name of the command (method call) channel.
pub const SERVICE_CHANNEL: &str = "com.assistlens.app/voice_service";

/// Name of the event stream channel.
pub const EVENTS_CHANNEL: &str = "com.assistlens.app/voice_events";

/// Success payload sent when the recognizer is ready for speech.
pub const LISTENING_STARTED: &str = "LISTENING_STARTED";

/// Lifecycle of the listening controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceState {
    /// No recognizer exists (not yet checked, or unavailable on this device)
    #[default]
    Uninitialized,
    /// Recognizer constructed and idle
    Ready,
    /// Recognizer actively listening
    Listening,
    /// Torn down; absorbing
    Destroyed,
}

impl ServiceState {
    /// Convert to string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Uninitialized => "uninitialized",
            Self::Ready => "ready",
            Self::Listening => "listening",
            Self::Destroyed => "destroyed",
        }
    }
}

impl std::fmt::Display for ServiceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Language model requested from the recognizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LanguageModel {
    /// Free-form dictation
    FreeForm,
}

/// Fixed configuration handed to the recognizer on every start.
///
/// Built once at initialization and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecognitionConfig {
    /// Language model to use
    pub language_model: LanguageModel,
    /// Whether partial hypotheses are delivered while the user speaks
    pub partial_results: bool,
    /// Maximum number of hypotheses per result
    pub max_results: u32,
    /// Package id of the caller, required by some recognizer hosts
    pub calling_package: String,
}

impl RecognitionConfig {
    /// Free-form recognition with partial results and a single hypothesis.
    pub fn free_form() -> Self {
        Self {
            language_model: LanguageModel::FreeForm,
            partial_results: true,
            max_results: 1,
            calling_package: CALLING_PACKAGE.to_string(),
        }
    }
}

impl Default for RecognitionConfig {
    fn default() -> Self {
        Self::free_form()
    }
}

/// Error codes reported on the event stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// The recognizer reported an error during a session
    SpeechError,
    /// The device has no speech recognition capability
    SpeechNotAvailable,
    /// A listen attempt was made without a recognizer
    SpeechRecognizerNull,
}

impl ErrorCode {
    /// Wire representation of the code.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SpeechError => "SPEECH_ERROR",
            Self::SpeechNotAvailable => "SPEECH_NOT_AVAILABLE",
            Self::SpeechRecognizerNull => "SPEECH_RECOGNIZER_NULL",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Native error codes raised by the platform recognizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecognizerErrorCode {
    NetworkTimeout = 1,
    Network = 2,
    Audio = 3,
    Server = 4,
    Client = 5,
    SpeechTimeout = 6,
    NoMatch = 7,
    RecognizerBusy = 8,
    InsufficientPermissions = 9,
}

impl RecognizerErrorCode {
    /// Look up a native code. Unknown codes return `None`.
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            1 => Some(Self::NetworkTimeout),
            2 => Some(Self::Network),
            3 => Some(Self::Audio),
            4 => Some(Self::Server),
            5 => Some(Self::Client),
            6 => Some(Self::SpeechTimeout),
            7 => Some(Self::NoMatch),
            8 => Some(Self::RecognizerBusy),
            9 => Some(Self::InsufficientPermissions),
            _ => None,
        }
    }

    /// Native integer code.
    pub fn code(self) -> i32 {
        self as i32
    }

    /// Human-readable description.
    pub fn message(self) -> &'static str {
        match self {
            Self::Audio => "Audio recording error",
            Self::Client => "Client side error",
            Self::InsufficientPermissions => "Insufficient permissions",
            Self::Network => "Network error",
            Self::NetworkTimeout => "Network timeout",
            Self::NoMatch => "No match found",
            Self::RecognizerBusy => "Recognition service busy",
            Self::Server => "Server error",
            Self::SpeechTimeout => "No speech input",
        }
    }
}

/// Describe a native recognizer error code.
///
/// Purely descriptive; every error restarts listening regardless of code.
pub fn describe_error_code(code: i32) -> &'static str {
    RecognizerErrorCode::from_code(code)
        .map(RecognizerErrorCode::message)
        .unwrap_or("Unknown speech recognition error")
}

/// An event produced by the recognizer and forwarded to the event sink.
#[derive(Debug, Clone, PartialEq)]
pub enum RecognitionEvent {
    /// Recognizer is ready for speech
    Started,
    /// Partial hypothesis while the user is still speaking
    PartialText(String),
    /// Final hypothesis for the session
    FinalText(String),
    /// Something went wrong
    Error {
        code: ErrorCode,
        message: String,
        native_code: Option<i32>,
    },
}

impl RecognitionEvent {
    /// Build a `SPEECH_ERROR` event from a native recognizer code.
    pub fn speech_error(native_code: i32) -> Self {
        Self::Error {
            code: ErrorCode::SpeechError,
            message: describe_error_code(native_code).to_string(),
            native_code: Some(native_code),
        }
    }

    /// `SPEECH_NOT_AVAILABLE`, raised once when the device has no recognizer.
    pub fn not_available() -> Self {
        Self::Error {
            code: ErrorCode::SpeechNotAvailable,
            message: "Speech recognition not available".to_string(),
            native_code: None,
        }
    }

    /// `SPEECH_RECOGNIZER_NULL`, raised on every listen attempt without a recognizer.
    pub fn recognizer_null() -> Self {
        Self::Error {
            code: ErrorCode::SpeechRecognizerNull,
            message: "Speech recognizer not initialized".to_string(),
            native_code: None,
        }
    }
}
