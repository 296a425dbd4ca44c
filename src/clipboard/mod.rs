//! Per-user file clipboard.
//!
//! Control flow is linear: resolve the path, guarantee owner-only
//! permissions, open and lock the file, copy bytes, return. Every
//! failure comes back as a [`ClipboardError`]; only `main` prints and
//! exits.
//!
//! Store holds an exclusive `flock` and retrieve a shared one for the
//! whole copy, so a retrieve never observes a half-written store.

pub mod copy;
pub mod path;
pub mod perms;

use std::fs::{File, OpenOptions};
use std::io::{self, IsTerminal, Write};
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};

use nix::fcntl::{Flock, FlockArg};
use nix::libc;
use nix::unistd::getuid;

use copy::{CopyOptions, Stream};
use perms::ModeCheck;

/// sysexits.h `EX_USAGE`.
const EX_USAGE: i32 = 64;
/// sysexits.h `EX_UNAVAILABLE`.
const EX_UNAVAILABLE: i32 = 69;

/// Direction of a single invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Standard input → clipboard (`-i`).
    Store,
    /// Clipboard → standard output (`-o`).
    Retrieve,
}

/// Everything one invocation needs, built once from the command line.
#[derive(Debug, Clone)]
pub struct Config {
    pub mode: Mode,
    /// Directory holding `uclip-<uid>`.
    pub base_dir: PathBuf,
    pub copy: CopyOptions,
}

/// Exit-status class of a [`ClipboardError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad invocation or unusable path; nothing was touched.
    Usage,
    /// Filesystem or stream failure.
    Unavailable,
}

impl ErrorKind {
    pub fn exit_code(self) -> i32 {
        match self {
            ErrorKind::Usage => EX_USAGE,
            ErrorKind::Unavailable => EX_UNAVAILABLE,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ClipboardError {
    #[error("clipboard path is {len} bytes (max {})", .max - 1)]
    NameTooLong { len: usize, max: usize },
    #[error("invalid clipboard path {}", .0.display())]
    InvalidPath(PathBuf),
    #[error("failed to stat {}: {source}", .path.display())]
    Stat {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("{} is not a regular file", .0.display())]
    NotRegularFile(PathBuf),
    #[error("{} is owned by uid {owner}", .path.display())]
    ForeignOwner { path: PathBuf, owner: u32 },
    #[error("failed to create {}: {source}", .path.display())]
    Create {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to set mode on {}: {source}", .path.display())]
    Chmod {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to open {}: {source}", .path.display())]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to lock {}: {source}", .path.display())]
    Lock { path: PathBuf, source: nix::Error },
    #[error("error reading {stream}: {source}")]
    Read {
        stream: Stream,
        source: std::io::Error,
    },
    #[error("error writing {stream}: {source}")]
    Write {
        stream: Stream,
        source: std::io::Error,
    },
}

impl ClipboardError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ClipboardError::NameTooLong { .. } => ErrorKind::Usage,
            _ => ErrorKind::Unavailable,
        }
    }
}

/// An open, locked clipboard file.
pub struct Clipboard {
    path: PathBuf,
    file: Flock<File>,
}

impl Clipboard {
    /// Open the clipboard at `path` for `mode` and take the matching lock.
    ///
    /// Blocks while another invocation holds a conflicting lock.
    ///
    /// # Errors
    ///
    /// Returns `ClipboardError::Open` if the file is missing or is a
    /// symlink, and `ClipboardError::Lock` if `flock` fails.
    pub fn open(path: &Path, mode: Mode) -> Result<Self, ClipboardError> {
        let file = OpenOptions::new()
            .read(mode == Mode::Retrieve)
            .write(mode == Mode::Store)
            .custom_flags(libc::O_NOFOLLOW)
            .open(path)
            .map_err(|e| ClipboardError::Open {
                path: path.to_path_buf(),
                source: e,
            })?;

        let arg = match mode {
            Mode::Store => FlockArg::LockExclusive,
            Mode::Retrieve => FlockArg::LockShared,
        };
        let file = Flock::lock(file, arg).map_err(|(_, errno)| ClipboardError::Lock {
            path: path.to_path_buf(),
            source: errno,
        })?;

        Ok(Self {
            path: path.to_path_buf(),
            file,
        })
    }

    /// Replace the clipboard contents with everything left on `input`.
    ///
    /// An input with nothing pending (empty file, empty pipe, `/dev/null`,
    /// or an interactive terminal) is a no-op and the old contents survive.
    /// The clipboard is truncated only once the first byte has arrived.
    ///
    /// # Errors
    ///
    /// Returns `ClipboardError::Read` or `ClipboardError::Write` on a
    /// stream failure, unless `opts.quiet` is set.
    pub fn store(&mut self, input: &mut File, opts: CopyOptions) -> Result<u64, ClipboardError> {
        if input.is_terminal() {
            tracing::debug!("stdin is a terminal, nothing to store");
            return Ok(0);
        }
        let exhausted = copy::is_exhausted(input).map_err(|e| ClipboardError::Read {
            stream: Stream::Stdin,
            source: e,
        })?;
        if exhausted {
            tracing::debug!("stdin is empty, nothing to store");
            return Ok(0);
        }

        let total = copy::copy_stream_with(
            input,
            Stream::Stdin,
            &mut *self.file,
            Stream::Clipboard,
            opts,
            |file: &mut File| file.set_len(0),
        )?;

        tracing::debug!(path = %self.path.display(), total, "stored");
        Ok(total)
    }

    /// Write the whole clipboard to `output`.
    ///
    /// # Errors
    ///
    /// Returns `ClipboardError::Read` or `ClipboardError::Write` on a
    /// stream failure, unless `opts.quiet` is set.
    pub fn retrieve<W: Write>(
        &mut self,
        output: &mut W,
        opts: CopyOptions,
    ) -> Result<u64, ClipboardError> {
        let total = copy::copy_stream(
            &mut *self.file,
            Stream::Clipboard,
            output,
            Stream::Stdout,
            opts,
        )?;

        tracing::debug!(path = %self.path.display(), total, "retrieved");
        Ok(total)
    }
}

/// Run one invocation end to end. Returns the bytes transferred.
///
/// `stdin` is only called for a store, so retrieve works with a closed
/// standard input.
///
/// # Errors
///
/// Returns `ClipboardError::NameTooLong` (usage) before any file is
/// touched if the path is too long. Every other variant is an
/// unavailable error from the permission check, open, lock, or copy.
pub fn run<F, W>(config: &Config, stdin: F, output: &mut W) -> Result<u64, ClipboardError>
where
    F: FnOnce() -> io::Result<File>,
    W: Write,
{
    // The path and the ownership check both key off the real uid.
    let uid = getuid().as_raw();
    let path = path::clipboard_path(&config.base_dir, uid)?;

    if let ModeCheck::Corrected { previous } = perms::ensure_owner_only(&path, uid)? {
        tracing::warn!(
            path = %path.display(),
            previous = %format!("{previous:o}"),
            "clipboard mode corrected"
        );
        eprintln!(
            "uclip: warning: {} had mode {previous:o}, reset to {:o}",
            path.display(),
            perms::CLIPBOARD_MODE
        );
    }

    let mut clipboard = Clipboard::open(&path, config.mode)?;
    match config.mode {
        Mode::Store => {
            let mut input = stdin().map_err(|e| ClipboardError::Read {
                stream: Stream::Stdin,
                source: e,
            })?;
            clipboard.store(&mut input, config.copy)
        }
        Mode::Retrieve => clipboard.retrieve(output, config.copy),
    }
}
