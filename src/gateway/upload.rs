// src/gateway/upload.rs

use std::fmt;
use std::str::FromStr;

use crate::errors::{Result, TpcError};

/// One `local:remote` transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadPair {
    pub local: String,
    pub remote: String,
}

impl UploadPair {
    pub fn new(local: impl Into<String>, remote: impl Into<String>) -> Self {
        Self {
            local: local.into(),
            remote: remote.into(),
        }
    }
}

impl fmt::Display for UploadPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.local, self.remote)
    }
}

impl FromStr for UploadPair {
    type Err = TpcError;

    fn from_str(entry: &str) -> Result<Self> {
        let trimmed = entry.trim();
        let Some((local, remote)) = trimmed.split_once(':') else {
            return Err(TpcError::UploadPathError(entry.to_string()));
        };
        if local.is_empty() || remote.is_empty() || remote.contains(':') {
            return Err(TpcError::UploadPathError(entry.to_string()));
        }
        Ok(UploadPair::new(local, remote))
    }
}

/// Parse a comma-separated list of `local:remote` pairs.
///
/// Every entry is parsed before any is returned, so a malformed entry
/// anywhere in the list fails the whole list.
pub fn parse_upload_pairs(spec: &str) -> Result<Vec<UploadPair>> {
    spec.split(',').map(str::parse).collect()
}
