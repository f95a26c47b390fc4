//! IPC transport: the messaging bridge consumers connect to.

mod handlers;
mod server;

pub use handlers::ServiceContext;
pub use server::{bind, remove_socket, run_server};
