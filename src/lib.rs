//! # a3s-relay
//!
//! OpenAI-compatible chat completions in front of a conversational agent that
//! is only reachable through its interactive web front-end.
//!
//! ## Overview
//!
//! Each request is encoded into a single prompt, typed into the session's
//! page, and the rendered answer is read back once it stops changing. Tool
//! calls are recovered from the free-form answer and returned as structured
//! `tool_calls`.
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use a3s_relay::surface::memory::MemorySurface;
//! use a3s_relay::{Message, Relay, RelayConfig};
//!
//! # async fn example() -> a3s_relay::Result<()> {
//! let surface = Arc::new(MemorySurface::new());
//! surface.push_text("4");
//!
//! let relay = Relay::new(surface, &RelayConfig::default());
//! let turn = relay.run_turn(&[Message::user("2+2?")], &[], None).await?;
//!
//! println!("Session {}: {:?}", turn.session_id, turn.output);
//! # Ok(())
//! # }
//! ```
//!
//! ## Surfaces
//!
//! - **webdriver** — a real browser driven over W3C WebDriver
//! - **memory** — scripted in-process surface for tests and offline runs
//!
//! ## Architecture
//!
//! - **AgentSurface** trait — page-level driving of the agent front-end
//! - **SessionRegistry** — one page per conversation, turns serialized per session
//! - **Poller** — submit and wait for the rendered answer to settle
//! - **Extractor** — recover tool calls from free-form output
//! - **Assembler** — wrap the result as OpenAI-compatible responses

pub mod api;
pub mod cli;
pub mod config;
pub mod dirs;
pub mod encoder;
pub mod error;
pub mod extract;
pub mod json;
pub mod poller;
pub mod relay;
pub mod server;
pub mod session;
pub mod startup;
pub mod surface;
pub mod types;

// Re-export core types
pub use config::RelayConfig;
pub use error::{RelayError, Result};
pub use relay::{Relay, Turn};
pub use session::{SessionLease, SessionRegistry};
pub use surface::{AgentSurface, PageId, ResponseUnit};
pub use types::{
    CodeSegment, ExtractedOutput, Message, MessageContent, Role, StructuredCommand, ToolSpec,
};
