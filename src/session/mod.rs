//! Session resource pool
//!
//! Each logical conversation owns one page of the agent surface. Turns on the
//! same session are serialized by a per-session lock; different sessions run
//! concurrently.

mod id;
mod registry;

pub use id::{derive_session_id, is_new_conversation, DEFAULT_SESSION};
pub use registry::{Session, SessionLease, SessionRegistry};
