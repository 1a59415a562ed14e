// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Printhost.

use thiserror::Error;

/// Top-level error type for all Printhost operations.
#[derive(Debug, Error)]
pub enum PrinthostError {
    // -- System --
    #[error("failed to create a system: {0}")]
    SystemCreate(String),

    #[error("DNS-SD error: {0}")]
    DnsSd(String),

    #[error("server error: {0}")]
    Server(String),

    #[error("server is not running")]
    NotRunning,

    // -- Credentials --
    #[error("random number generation failed")]
    Random,

    // -- Command line --
    #[error("{0}")]
    Usage(String),

    #[error("unknown sub-command '{0}'")]
    UnknownSubcommand(String),

    #[error("sub-command '{0}' is not supported by this printer application")]
    UnsupportedSubcommand(String),

    #[error("sub-command '{0}' does not accept files")]
    FilesNotAccepted(String),

    #[error("too many {0}")]
    Capacity(&'static str),

    // -- Configuration / persistence --
    #[error("configuration error: {0}")]
    Config(String),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, PrinthostError>;
