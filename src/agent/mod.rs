//! SSH agent: the identity-provider adapter, its protocol session and the
//! socket listener

mod adapter;
mod service;
mod session;

pub use adapter::AgentAdapter;
pub use service::{bind, default_socket_path, serve};
pub use session::AgentSession;
