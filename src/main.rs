mod cli;
mod clipboard;

use std::fs::File;
use std::io::{self, Write};
use std::os::fd::AsFd;
use std::path::PathBuf;

use clipboard::Config;
use clipboard::copy::CopyOptions;
use clipboard::path::DEFAULT_BASE_DIR;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(std::env::var("RUST_LOG").ok().as_deref()))
        .with_writer(io::stderr)
        .init();

    let cli = match cli::parse_from(std::env::args_os()) {
        Ok(cli) => cli,
        Err(e) => match cli::usage_exit_code(&e) {
            Some(code) => {
                let _ = e.print();
                std::process::exit(code);
            }
            None => e.exit(),
        },
    };

    let config = Config {
        mode: cli.mode(),
        base_dir: PathBuf::from(DEFAULT_BASE_DIR),
        copy: CopyOptions {
            // Bounded by the parser's range, so this only fails on 16-bit targets.
            buffer_size: usize::try_from(cli.buffer_size).unwrap_or(usize::MAX),
            quiet: cli.quiet,
        },
    };

    let stdin = || io::stdin().as_fd().try_clone_to_owned().map(File::from);
    let mut stdout = io::stdout().lock();

    match clipboard::run(&config, stdin, &mut stdout) {
        Ok(total) => {
            tracing::debug!(mode = ?config.mode, total, "done");
        }
        Err(e) => {
            let _ = stdout.flush();
            tracing::error!(error = %e, "uclip failed");
            eprintln!("uclip: {e}");
            std::process::exit(e.kind().exit_code());
        }
    }
}

/// Logging stays off unless `RUST_LOG` asks for it, so a fatal error is
/// reported by the single `uclip: ...` line alone.
fn log_filter(directives: Option<&str>) -> EnvFilter {
    directives
        .and_then(|d| EnvFilter::try_new(d).ok())
        .unwrap_or_else(|| EnvFilter::new("off"))
}
