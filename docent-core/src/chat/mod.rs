//! Conversation state and the per-user session built around it.

mod conversation;
mod session;

pub use conversation::{Conversation, Role, Turn};
pub use session::{Session, SessionError};
