// src/errors.rs

//! Crate-wide error type and result alias.

use thiserror::Error;

use crate::config::SettingKey;

#[derive(Error, Debug)]
pub enum TpcError {
    /// Unknown key, wrong value type, conflicting options or a malformed
    /// config file.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// A field the selected action needs is unset (or empty) after resolution.
    #[error("Missing required field: {0}")]
    MissingField(SettingKey),

    /// An external command exited with a non-zero status.
    #[error("Command failed with return code {code}: {command}")]
    ExecutionError { code: i32, command: String },

    #[error("Invalid upload path entry '{0}' (expected <local>:<remote>)")]
    UploadPathError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl TpcError {
    /// Exit code of the failed command, for execution errors.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            TpcError::ExecutionError { code, .. } => Some(*code),
            _ => None,
        }
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, TpcError>;
