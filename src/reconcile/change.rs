//! Change detection by content digest.
//!
//! Only bytes are compared. Timestamps, sizes, and mtimes are never consulted,
//! so a rerun against unchanged inventory is a true no-op.

use std::io::Read;
use std::path::Path;

use serde::Serialize;
use sha2::{Digest, Sha256};

use super::render::RenderedConfig;
use crate::core::errors::{Result, SyncError};

/// Whether the rendered config needs publishing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangeDecision {
    /// A deployed file exists.
    pub has_previous: bool,
    /// Digest of the deployed file.
    pub previous_hash: Option<String>,
    /// Digest of the rendered config.
    pub new_hash: String,
    /// No previous file, or the digests differ.
    pub should_publish: bool,
}

/// Lower-case hex SHA-256 of `bytes`.
#[must_use]
pub fn content_hash(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// Hash of the file at `path`, or `None` when it does not exist.
pub fn file_hash(path: &Path) -> Result<Option<String>> {
    let mut file = match std::fs::File::open(path) {
        Ok(file) => file,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(SyncError::io(path, err)),
    };

    let mut hasher = Sha256::new();
    let mut buf = [0_u8; 8192];
    loop {
        let read = file.read(&mut buf).map_err(|err| SyncError::io(path, err))?;
        if read == 0 {
            break;
        }
        hasher.update(&buf[..read]);
    }
    Ok(Some(format!("{:x}", hasher.finalize())))
}

/// Compare `rendered` against whatever is deployed at `target`.
pub fn detect(rendered: &RenderedConfig, target: &Path) -> Result<ChangeDecision> {
    let new_hash = content_hash(rendered.as_bytes());
    let previous_hash = file_hash(target)?;
    let should_publish = previous_hash.as_deref() != Some(new_hash.as_str());
    Ok(ChangeDecision {
        has_previous: previous_hash.is_some(),
        previous_hash,
        new_hash,
        should_publish,
    })
}
