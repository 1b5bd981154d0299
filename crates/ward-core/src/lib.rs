//! ward-core: ticket lifecycle control for a municipal service desk.
//!
//! The layers, bottom up:
//!
//! - [`state`]: the [`state::Status`] machine and its successor table.
//! - [`model`]: ticket records, ids, priorities, field patches.
//! - [`port`]: the [`port::TicketStore`] persistence contract.
//! - [`store`]: in-memory and SQLite adapters of that contract.
//! - [`audit`]: audit events and the sinks they flow into.
//! - [`command`]: reversible admin commands and the bounded undo/redo
//!   history that records them.
//! - [`snapshot`]: point-in-time ticket captures and their bounded store.
//! - [`service`]: the [`service::TicketDesk`] facade transports bind to.
//!
//! # Conventions
//!
//! - **Errors**: library code returns [`error::LifecycleError`] (or
//!   [`port::StoreError`] below the port); binaries wrap in `anyhow`.
//! - **Logging**: `tracing` macros throughout; no direct stdout/stderr.

pub mod audit;
pub mod command;
pub mod error;
pub mod model;
pub mod port;
pub mod service;
pub mod snapshot;
pub mod state;
pub mod store;

pub use error::{ErrorCode, LifecycleError};
pub use model::ticket::{FieldPatch, Priority, TicketId, TicketRecord};
pub use port::{StoreError, TicketStore};
pub use service::{CommandRequest, TicketDesk};
pub use state::Status;
