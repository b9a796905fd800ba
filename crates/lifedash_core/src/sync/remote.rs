//! Remote store adapter contract.

use serde::Serialize;
use serde_json::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// One queued write waiting to be mirrored.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingMutation {
    pub key: String,
    /// `None` mirrors a removal.
    pub value: Option<Value>,
    pub queued_at_ms: i64,
    /// Failed push attempts so far.
    pub attempts: u32,
}

/// Stable error shape returned by remote adapters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteErrorEnvelope {
    pub remote_id: String,
    /// Machine-readable code such as `unauthenticated` or `network`.
    pub code: String,
    pub message: String,
    /// Whether the mutation should stay queued for the next flush.
    pub retryable: bool,
}

impl RemoteErrorEnvelope {
    pub fn new(
        remote_id: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
        retryable: bool,
    ) -> Self {
        Self {
            remote_id: remote_id.into(),
            code: code.into(),
            message: message.into(),
            retryable,
        }
    }
}

impl Display for RemoteErrorEnvelope {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "remote `{}` failed with {}: {}",
            self.remote_id, self.code, self.message
        )
    }
}

impl Error for RemoteErrorEnvelope {}

pub type RemoteResult<T> = Result<T, RemoteErrorEnvelope>;

/// Adapter for a remote mirror (cloud document store, sync server, ...).
pub trait RemoteStore {
    fn remote_id(&self) -> &str;
    fn push(&self, mutation: &PendingMutation) -> RemoteResult<()>;
}
