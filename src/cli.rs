use std::ffi::OsString;

use clap::{ArgGroup, Parser};

use crate::clipboard::{ErrorKind, Mode};
use crate::clipboard::copy::DEFAULT_BUFFER_SIZE;

/// Largest accepted `--buffer-size`.
const MAX_BUFFER_SIZE: u64 = 1 << 20;

#[derive(Debug, Parser)]
#[command(name = "uclip", version, about = "Per-user file clipboard for stdin/stdout")]
#[command(group(ArgGroup::new("mode").required(true).args(["store", "retrieve"])))]
pub struct Cli {
    /// Store standard input in the clipboard
    #[arg(short = 'i')]
    pub store: bool,

    /// Write the clipboard to standard output
    #[arg(short = 'o')]
    pub retrieve: bool,

    /// Suppress diagnostics and continue past stream errors
    #[arg(short = 'q')]
    pub quiet: bool,

    /// Copy buffer size in bytes
    #[arg(
        long,
        hide = true,
        default_value_t = DEFAULT_BUFFER_SIZE as u64,
        value_parser = clap::value_parser!(u64).range(1..=MAX_BUFFER_SIZE),
    )]
    pub buffer_size: u64,
}

impl Cli {
    /// The selected mode. The `mode` group guarantees exactly one flag.
    pub fn mode(&self) -> Mode {
        if self.store {
            Mode::Store
        } else {
            Mode::Retrieve
        }
    }
}

/// Parse a full argument list, program name first.
pub fn parse_from<I, T>(args: I) -> Result<Cli, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    Cli::try_parse_from(args)
}

/// Exit status for a parse failure, or `None` for `--help` and
/// `--version`, which clap prints to stdout and exits 0 on its own.
pub fn usage_exit_code(err: &clap::Error) -> Option<i32> {
    err.use_stderr().then(|| ErrorKind::Usage.exit_code())
}
