//! Per-user conversation state
//!
//! - [`ConversationStore`]: in-memory session table with trimming and expiry
//! - [`spawn_sweeper`]: periodic task removing expired sessions

mod store;
mod sweeper;
mod types;

pub use store::{ConversationStore, StoreStats};
pub use sweeper::{spawn_sweeper, SweepHandle};
pub use types::{Role, Session, Turn};
