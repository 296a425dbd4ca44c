//! Path resolver — `<base>/uclip-<uid>`.
//!
//! The path is a pure function of the base directory and the numeric
//! uid, so every invocation by one user lands on the same file and
//! different users never share one.

use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};

use super::ClipboardError;

/// Shared temporary directory holding every user's clipboard.
pub const DEFAULT_BASE_DIR: &str = "/tmp";

/// Paths of this many bytes or more are rejected rather than truncated.
pub const MAX_PATH_LEN: usize = 256;

const FILE_PREFIX: &str = "uclip-";

/// Build the clipboard path for `uid` under `base`.
pub fn clipboard_path(base: &Path, uid: u32) -> Result<PathBuf, ClipboardError> {
    let path = base.join(format!("{FILE_PREFIX}{uid}"));
    let bytes = path.as_os_str().as_bytes();

    if bytes.len() >= MAX_PATH_LEN {
        return Err(ClipboardError::NameTooLong {
            len: bytes.len(),
            max: MAX_PATH_LEN,
        });
    }
    if bytes.contains(&0) {
        return Err(ClipboardError::InvalidPath(path));
    }

    Ok(path)
}
