//! Error types for Trellis operations.
//!
//! Markup and layout problems never fail a session; they are collected as
//! [`Diagnostic`](trellis_core::error::Diagnostic)s. [`TrellisError`] covers
//! the conditions that do stop work: I/O, configuration, transport failure
//! and export.

use std::io;

use thiserror::Error;

/// Failure reported by the stream transport.
///
/// A transport error ends the generation run that received it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct TransportError {
    message: String,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// The main error type for Trellis operations.
#[derive(Debug, Error)]
pub enum TrellisError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Stream transport failed: {0}")]
    Transport(#[from] TransportError),

    #[error("Export error: {0}")]
    Export(String),
}
