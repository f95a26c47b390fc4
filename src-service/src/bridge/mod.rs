//! Event and command bridges between the controller and its consumer.

mod commands;
mod events;

pub use commands::{CommandBridge, MethodResult};
pub use events::{EventBridge, EventReceiver, SinkId};
