//! IPC request types.

use serde::{Deserialize, Serialize};

use crate::validation::{validate_method_name, ValidationError};

/// IPC request from client to service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Request {
    /// Invoke a named command on the service channel
    MethodCall { method: String },
    /// Attach this connection as the event sink
    Listen,
    /// Detach this connection from the event stream
    Cancel,
    /// Get the listening controller state
    GetState,
    /// Health check
    Ping,
}

impl Request {
    /// Build a method call request.
    pub fn method_call(method: impl Into<String>) -> Self {
        Request::MethodCall {
            method: method.into(),
        }
    }

    /// Validate request parameters.
    ///
    /// Only the shape of a method name is checked here; whether the service
    /// implements it is answered by the service itself.
    pub fn validate(&self) -> Result<(), ValidationError> {
        match self {
            Request::MethodCall { method } => validate_method_name(method),
            Request::Listen | Request::Cancel | Request::GetState | Request::Ping => Ok(()),
        }
    }
}

/// Commands the service implements on its method channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Begin (or restart) continuous listening
    StartVoiceService,
    /// Stop listening; the recognizer stays constructed
    StopVoiceService,
}

impl Command {
    /// Method name on the wire.
    pub fn method_name(&self) -> &'static str {
        match self {
            Command::StartVoiceService => "startVoiceService",
            Command::StopVoiceService => "stopVoiceService",
        }
    }

    /// Resolve a method name. Unknown names return `None`.
    pub fn from_method(method: &str) -> Option<Self> {
        match method {
            "startVoiceService" => Some(Command::StartVoiceService),
            "stopVoiceService" => Some(Command::StopVoiceService),
            _ => None,
        }
    }
}

impl From<Command> for Request {
    fn from(command: Command) -> Self {
        Request::method_call(command.method_name())
    }
}
