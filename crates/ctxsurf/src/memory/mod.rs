//! Checkpoint persistence against the remote memory store.
//!
//! - [`checkpoint`]: the [`Checkpoint`] record and [`SaveCheckpointParams`].
//! - [`transport`]: [`StoreTransport`] trait and the reqwest-backed
//!   [`HttpTransport`]. Failures come back tagged as [`TransportError`].
//! - [`client`]: [`MemoryClient`], which turns transport outcomes into the
//!   never-failing `bool` / `Option` surface the session core relies on.

pub mod checkpoint;
pub mod client;
pub mod transport;

pub use checkpoint::{Checkpoint, SaveCheckpointParams};
pub use client::MemoryClient;
pub use transport::{HttpTransport, StoreTransport, TransportError, TransportOutcome};
