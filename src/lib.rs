//! Synchronous HandlerSocket client.
//!
//! HandlerSocket exposes a storage engine's indexes over a plain TCP line
//! protocol, bypassing the SQL layer. This crate implements the client side:
//! token escaping, the index-opening handshake, find/insert/update/delete, and
//! addressing of sharded session tables through reserved index numbers.
//!
//! - [`codec`]: token escaping and line framing.
//! - [`index`]: index descriptors, the registry and the resolver seam.
//! - [`protocol`]: sockets, per-mode connections, command/response shapes.
//! - [`shard`]: shard number arithmetic and the [`Sharded`] resolver.
//! - [`Client`]: the operations.
//! - [`cli`]: command parsing for the `hs_cli` shell.
pub mod cli;
pub mod client;
pub mod codec;
pub mod config;
pub mod error;
pub mod index;
pub mod protocol;
pub mod shard;

#[cfg(test)]
mod testing;

pub use client::Client;
pub use codec::Token;
pub use config::ClientConfig;
pub use error::{ClientError, ClientResult, CommunicationError};
pub use index::{Direct, IndexDescriptor, IndexRegistry, IndexResolver, Mode};
pub use protocol::{FindOptions, Inserted, Operator, Rows, Tuple, Value};
pub use shard::Sharded;
