//! The amplifier-acp protocol runtime: a JSON-RPC 2.0 endpoint letting an
//! editor drive an agent over stdio, HTTP, or WebSocket.

pub mod bundle_cache;
pub mod capabilities;
pub mod codec;
pub mod config;
pub mod content;
pub mod discovery;
pub mod error;
pub mod event_mapper;
pub mod handler;
pub mod hooks;
pub mod jsonrpc;
pub mod permission;
pub mod routing;
pub mod session;
pub mod spawn;
pub mod tool_metadata;
pub mod tool_tracker;
pub mod transport;

pub use config::{Config, PersistenceConfig, TransportMode};
pub use error::{AcpError, AcpResult};
pub use jsonrpc::{Processor, RpcHandler};
pub use session::{Session, SessionConfig, SessionManager};
