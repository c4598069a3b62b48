//! Context-zone monitoring and proactive checkpointing for LLM agent sessions.
//!
//! `ctxsurf` watches how much of an agent's context window is in use and
//! saves a structured checkpoint to a remote store *before* the host
//! compacts or drops the conversation. A later session restores the
//! checkpoint and picks up where the previous one left off.
//!
//! # Getting started
//!
//! ```ignore
//! use ctxsurf::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), String> {
//!     let config = SurfConfig::load(".");
//!     let mut session = SessionManager::new(config)?;
//!
//!     // Surface what the previous session was doing.
//!     if let Some(cp) = session.start().await {
//!         println!("{}", cp.to_markdown());
//!     }
//!
//!     // Feed usage samples as the host reports them.
//!     let info = session.check_context(150_000, None).await.map_err(|e| e.to_string())?;
//!     println!("{}", info.message);
//!
//!     session.on_session_end().await;
//!     Ok(())
//! }
//! ```
//!
//! # Where to find things
//!
//! - **Classify usage:** [`classify`](context::classify) turns a token count
//!   into a [`ZoneInfo`](context::ZoneInfo). Hosts that never report tokens
//!   can estimate with [`ToolUsageTracker`](context::ToolUsageTracker).
//! - **Talk to the store:** [`MemoryClient`](memory::MemoryClient) saves,
//!   fetches and clears checkpoints over a pluggable
//!   [`StoreTransport`](memory::StoreTransport).
//! - **Run a session:** [`SessionManager`](agent::SessionManager) ties the
//!   two together and owns the lifecycle hooks.
//! - **Wire into a host:** [`hooks`] installs shell hooks that call back
//!   into the `ctxsurf` binary; [`runner`] is what they run.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`context`] | Zone thresholds, classification, tool-count estimation |
//! | [`memory`] | Checkpoint records, store transport, memory client |
//! | [`agent`] | Session manager, clock, task side-channel, notifications |
//! | [`config`] | [`SurfConfig`](config::SurfConfig) with env-aware defaults |
//! | [`hooks`] | Hook script installation |
//! | [`runner`] | `ctxsurf hook <event>` handlers |

pub mod agent;
pub mod config;
pub mod context;
pub mod hooks;
pub mod memory;
pub mod prelude;
pub mod runner;
