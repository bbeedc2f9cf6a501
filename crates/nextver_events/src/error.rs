//! Error types for the event engine.

use thiserror::Error;

/// Result type alias for event operations.
pub type EventResult<T> = Result<T, EventError>;

/// Errors that can surface from registration or emission.
#[derive(Error, Debug)]
pub enum EventError {
    /// A sink was driven through the path it was not registered for, or a
    /// node received a value in a state it can never legitimately be in.
    /// Indicates a wiring bug in the combinator graph.
    #[error("Irregular emission on {node}: {detail}")]
    IrregularEmission { node: &'static str, detail: String },

    /// The hub holds a channel for this event under a different payload type.
    #[error("Channel type mismatch for event: {0}")]
    ChannelType(&'static str),

    /// A subscriber's own logic failed.
    #[error(transparent)]
    Handler(#[from] anyhow::Error),
}

impl EventError {
    pub fn irregular(node: &'static str, detail: impl Into<String>) -> Self {
        Self::IrregularEmission {
            node,
            detail: detail.into(),
        }
    }

    /// Whether this error is a contract violation rather than a handler fault.
    pub fn is_irregular(&self) -> bool {
        matches!(self, Self::IrregularEmission { .. } | Self::ChannelType(_))
    }
}
