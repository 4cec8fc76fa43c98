//! File Namer
//!
//! Maps a request identity onto a stable, filesystem-safe file name:
//! a readable prefix taken from the identity followed by the SHA-256 of
//! the full identity.

use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

/// Extension of every persisted entry.
pub const DATA_FILE_EXTENSION: &str = ".data";

/// Number of identity characters scanned for the readable prefix.
pub const PREFIX_LIMIT: usize = 80;

/// Maximum size of the readable prefix in bytes. Keeps the whole file name
/// well under the common 255-byte limit for non-ASCII identities.
pub const PREFIX_MAX_BYTES: usize = 80;

/// Name prefix of the temp files entries are written through.
pub const TEMP_FILE_PREFIX: &str = ".partial-";

#[derive(Debug, Clone)]
pub struct FileNamer {
    cache_dir: PathBuf,
}

impl FileNamer {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
        }
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    pub fn path_for(&self, request_id: &str) -> PathBuf {
        self.cache_dir.join(file_name_for(request_id))
    }
}

/// Builds `<prefix>.<sha256 hex>.data` for `request_id`.
///
/// The prefix keeps alphanumerics, `.` and `_` from the first
/// [`PREFIX_LIMIT`] characters, replaces every run of other characters with
/// a single `-`, and stops at the first `?` or `#`, or before it would grow
/// past [`PREFIX_MAX_BYTES`]. The digest always covers the whole identity,
/// query and fragment included.
pub fn file_name_for(request_id: &str) -> String {
    let mut name = String::with_capacity(PREFIX_MAX_BYTES + 70);
    let mut last_was_dash = false;
    for ch in request_id.chars().take(PREFIX_LIMIT) {
        let out = if ch.is_alphanumeric() || ch == '.' || ch == '_' {
            ch
        } else if ch == '?' || ch == '#' {
            break;
        } else if last_was_dash {
            continue;
        } else {
            '-'
        };
        if name.len() + out.len_utf8() > PREFIX_MAX_BYTES {
            break;
        }
        last_was_dash = out == '-';
        name.push(out);
    }
    name.push('.');
    name.push_str(&hex::encode(Sha256::digest(request_id.as_bytes())));
    name.push_str(DATA_FILE_EXTENSION);
    name
}

/// Whether `path` looks like a persisted entry: a regular file whose name
/// does not start with `.` and ends in [`DATA_FILE_EXTENSION`].
pub fn is_data_file(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    !name.starts_with('.') && name.ends_with(DATA_FILE_EXTENSION) && path.is_file()
}

/// Whether `path` is a temp file left behind by an entry write.
pub fn is_temp_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|name| name.starts_with(TEMP_FILE_PREFIX))
        && path.is_file()
}
