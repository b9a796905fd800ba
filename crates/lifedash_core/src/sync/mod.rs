//! Best-effort remote mirroring of local store writes.
//!
//! # Responsibility
//! - Define the remote adapter seam (`RemoteStore`).
//! - Queue pending mutations and flush them outside the write path.
//!
//! # Invariants
//! - Local state is the source of truth; remote failures never surface as
//!   store errors.
//! - Only the latest value per key is ever pushed.

pub mod outbox;
pub mod remote;

pub use outbox::{FlushReport, SyncOutbox};
pub use remote::{PendingMutation, RemoteErrorEnvelope, RemoteResult, RemoteStore};
