//! Assist Lens Common Library
//!
//! Shared types and IPC protocol for communication between the voice
//! service and the clients that consume its recognition events.

pub mod ipc;
pub mod logging;
pub mod types;
pub mod validation;

pub use types::*;
