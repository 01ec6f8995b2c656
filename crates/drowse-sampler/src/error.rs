//! Sampler error types.

use drowse_core::CounterId;
use thiserror::Error;

/// Errors that can occur while building samplers or taking samples.
///
/// Tick-time failures are logged by the sampler and never reach readers.
#[derive(Debug, Error)]
pub enum SamplerError {
    #[error("update interval must be greater than 0 ms")]
    InvalidInterval,

    #[error("provider arity mismatch: default has {expected} values, provider returned {actual}")]
    ArityMismatch { expected: usize, actual: usize },

    #[error("no provider for counter {0}")]
    UnknownCounter(CounterId),

    #[error("construction probe failed: {0}")]
    Probe(#[source] Box<SamplerError>),

    #[error("provider failed: {0}")]
    Provider(#[from] anyhow::Error),

    #[error("provider panicked: {0}")]
    ProviderPanicked(String),

    #[error("no tokio runtime available to drive sampler ticks")]
    NoRuntime,
}

pub type SamplerResult<T> = Result<T, SamplerError>;
