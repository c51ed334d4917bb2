//! Domain types shared across the transport, session, and persistence layers.
//!
//! This crate does not redefine the ACP wire schema — that comes from the
//! `agent-client-protocol` crate. It only carries the internal shapes the rest
//! of the workspace agrees on: session state, persisted metadata, and the
//! message log format.

pub mod frame;
pub mod message;
pub mod session;

pub use frame::{JsonRpcError, JsonRpcFrame};
pub use message::{Message, Role};
pub use session::{PersistedMetadata, SessionState};
