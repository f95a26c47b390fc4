//! IPC protocol between the voice service and its consumers.

mod protocol;
mod requests;
mod responses;

pub use protocol::*;
pub use requests::*;
pub use responses::*;
