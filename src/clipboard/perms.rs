//! Permission guarantor — the clipboard is always a regular file owned
//! by the invoking user with mode 0600.
//!
//! Runs before every open. A missing file is created with the right
//! mode, a drifted mode is corrected in place. Anything that cannot be
//! corrected (wrong owner, symlink, directory) is refused.

use std::fs::{self, OpenOptions, Permissions};
use std::io;
use std::os::unix::fs::{MetadataExt, OpenOptionsExt, PermissionsExt};
use std::path::Path;

use nix::libc;

use super::ClipboardError;

/// Owner read + owner write.
pub const CLIPBOARD_MODE: u32 = 0o600;

/// Permission bits compared against [`CLIPBOARD_MODE`].
const MODE_MASK: u32 = 0o7777;

/// What [`ensure_owner_only`] found at the clipboard path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeCheck {
    /// No file existed; one was created with mode 0600.
    Created,
    /// The file existed with mode 0600.
    Unchanged,
    /// The file existed with `previous` and was reset to 0600.
    Corrected { previous: u32 },
}

/// Make sure `path` is a regular file owned by `uid` with mode 0600.
pub fn ensure_owner_only(path: &Path, uid: u32) -> Result<ModeCheck, ClipboardError> {
    let meta = match fs::symlink_metadata(path) {
        Ok(meta) => meta,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            create(path)?;
            return Ok(ModeCheck::Created);
        }
        Err(e) => {
            return Err(ClipboardError::Stat {
                path: path.to_path_buf(),
                source: e,
            });
        }
    };

    if !meta.file_type().is_file() {
        return Err(ClipboardError::NotRegularFile(path.to_path_buf()));
    }
    if meta.uid() != uid {
        return Err(ClipboardError::ForeignOwner {
            path: path.to_path_buf(),
            owner: meta.uid(),
        });
    }

    let mode = meta.mode() & MODE_MASK;
    if mode == CLIPBOARD_MODE {
        return Ok(ModeCheck::Unchanged);
    }

    fs::set_permissions(path, Permissions::from_mode(CLIPBOARD_MODE)).map_err(|e| {
        ClipboardError::Chmod {
            path: path.to_path_buf(),
            source: e,
        }
    })?;
    Ok(ModeCheck::Corrected { previous: mode })
}

/// Create the clipboard and set its mode through the new handle.
fn create(path: &Path) -> Result<(), ClipboardError> {
    let file = OpenOptions::new()
        .write(true)
        .create(true)
        .mode(CLIPBOARD_MODE)
        .custom_flags(libc::O_NOFOLLOW)
        .open(path)
        .map_err(|e| ClipboardError::Create {
            path: path.to_path_buf(),
            source: e,
        })?;

    file.set_permissions(Permissions::from_mode(CLIPBOARD_MODE))
        .map_err(|e| ClipboardError::Chmod {
            path: path.to_path_buf(),
            source: e,
        })?;

    // Drop cannot report close errors; sync surfaces them first.
    file.sync_all().map_err(|e| ClipboardError::Create {
        path: path.to_path_buf(),
        source: e,
    })?;
    drop(file);

    tracing::debug!(path = %path.display(), "created clipboard");
    Ok(())
}
