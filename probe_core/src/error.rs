use thiserror::Error;

use crate::wire::WireError;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProbeError {
    #[error("unknown probe oid {0}")]
    UnknownOid(u8),
    #[error("oid {0} already allocated")]
    OidInUse(u8),
    #[error("unknown trigger sink oid {0}")]
    UnknownSink(u8),
    #[error("trigger sink oid {0} already registered")]
    SinkInUse(u8),
    #[error("hardware error: {0}")]
    Hardware(String),
    #[error("malformed command: {0}")]
    Wire(#[from] WireError),
}

impl ProbeError {
    /// Errors after which the controller must halt: continuing would run the
    /// timer path against a missing or half-built probe.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, ProbeError::Wire(_))
    }
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;

/// Missing pieces when assembling a `ProbeTable`.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum BuildError {
    #[error("missing scheduler")]
    MissingScheduler,
    #[error("missing adc setup")]
    MissingAdc,
    #[error("missing host link")]
    MissingLink,
}
