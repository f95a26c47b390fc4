//! Service error types.

use std::path::PathBuf;

/// Errors raised while bringing the service up.
///
/// Only [`ServiceError::Transport`] aborts initialization; recognizer
/// failures are reported to consumers as events instead.
#[derive(Debug)]
pub enum ServiceError {
    /// The IPC socket could not be created or bound
    Transport { path: PathBuf, source: std::io::Error },
    /// The IPC transport is not implemented on this platform
    UnsupportedPlatform,
    /// The recognizer engine executable could not be found
    RecognizerUnavailable(String),
    /// The recognizer engine could not be spawned
    RecognizerSpawn(std::io::Error),
    /// A pipe to the recognizer engine was not available
    RecognizerPipe(&'static str),
}

impl std::fmt::Display for ServiceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServiceError::Transport { path, source } => {
                write!(f, "Failed to set up IPC socket at {}: {}", path.display(), source)
            }
            ServiceError::UnsupportedPlatform => {
                write!(f, "IPC transport is not supported on this platform")
            }
            ServiceError::RecognizerUnavailable(command) => {
                write!(f, "Recognizer engine not found: {}", command)
            }
            ServiceError::RecognizerSpawn(e) => {
                write!(f, "Failed to spawn recognizer engine: {}", e)
            }
            ServiceError::RecognizerPipe(name) => {
                write!(f, "Recognizer engine {} is not piped", name)
            }
        }
    }
}

impl std::error::Error for ServiceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ServiceError::Transport { source, .. } => Some(source),
            ServiceError::RecognizerSpawn(e) => Some(e),
            _ => None,
        }
    }
}
