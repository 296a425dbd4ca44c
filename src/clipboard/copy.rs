//! Stream copier — buffered byte relay between a stream and the clipboard.
//!
//! Bytes are opaque: nothing is decoded or transformed. Each buffer is
//! filled until full or end-of-stream, so a short fill is the only end
//! signal, matching `fread` rather than a single `read(2)`.

use std::io::{self, Read, Seek, SeekFrom, Write};

use super::ClipboardError;

/// Copy buffer size used unless overridden.
pub const DEFAULT_BUFFER_SIZE: usize = 4096;

/// Options shared by both copy directions.
#[derive(Debug, Clone, Copy)]
pub struct CopyOptions {
    /// Bytes moved per iteration. Must be non-zero.
    pub buffer_size: usize,
    /// Stop quietly on stream errors and report the partial total.
    pub quiet: bool,
}

impl Default for CopyOptions {
    fn default() -> Self {
        Self {
            buffer_size: DEFAULT_BUFFER_SIZE,
            quiet: false,
        }
    }
}

/// Which end of a copy failed, for error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stream {
    Stdin,
    Stdout,
    Clipboard,
}

impl std::fmt::Display for Stream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Stream::Stdin => "standard input",
            Stream::Stdout => "standard output",
            Stream::Clipboard => "clipboard",
        })
    }
}

/// Copy `reader` into `writer` until a short fill. Returns bytes written.
///
/// With `quiet`, a read or write failure ends the copy early and the
/// bytes moved so far are returned instead of an error.
pub fn copy_stream<R: Read, W: Write>(
    reader: &mut R,
    from: Stream,
    writer: &mut W,
    to: Stream,
    opts: CopyOptions,
) -> Result<u64, ClipboardError> {
    copy_stream_with(reader, from, writer, to, opts, |_| Ok(()))
}

/// Like [`copy_stream`], but calls `before_first_write` on `writer` once
/// the first byte has been read. An input that ends immediately never
/// reaches the hook, so the writer is left untouched.
pub fn copy_stream_with<R, W, F>(
    reader: &mut R,
    from: Stream,
    writer: &mut W,
    to: Stream,
    opts: CopyOptions,
    before_first_write: F,
) -> Result<u64, ClipboardError>
where
    R: Read,
    W: Write,
    F: FnOnce(&mut W) -> io::Result<()>,
{
    let mut buf = vec![0u8; opts.buffer_size.max(1)];
    let mut total: u64 = 0;
    let mut hook = Some(before_first_write);

    loop {
        let (len, read_result) = fill(reader, &mut buf);

        if len > 0 {
            if let Some(hook) = hook.take() {
                if let Err(e) = hook(writer) {
                    return give_up(ClipboardError::Write { stream: to, source: e }, total, opts);
                }
            }
            if let Err(e) = writer.write_all(&buf[..len]) {
                return give_up(ClipboardError::Write { stream: to, source: e }, total, opts);
            }
            total += len as u64;
        }

        if let Err(e) = read_result {
            return give_up(ClipboardError::Read { stream: from, source: e }, total, opts);
        }
        if len < buf.len() {
            break;
        }
    }

    if let Err(e) = writer.flush() {
        return give_up(ClipboardError::Write { stream: to, source: e }, total, opts);
    }

    Ok(total)
}

/// Report whether a seekable input has nothing left to read.
///
/// Seeks to the end, compares with the current position, then rewinds.
/// Inputs that cannot seek (pipes, sockets) report `false`; any other
/// seek failure is returned.
pub fn is_exhausted<S: Seek>(input: &mut S) -> io::Result<bool> {
    let start = match input.stream_position() {
        Ok(pos) => pos,
        Err(e) if e.kind() == io::ErrorKind::NotSeekable => return Ok(false),
        Err(e) => return Err(e),
    };
    let end = match input.seek(SeekFrom::End(0)) {
        Ok(pos) => pos,
        Err(e) if e.kind() == io::ErrorKind::NotSeekable => return Ok(false),
        Err(e) => return Err(e),
    };
    if end <= start {
        return Ok(true);
    }
    input.seek(SeekFrom::Start(start))?;
    Ok(false)
}

/// Read into `buf` until it is full, the stream ends, or an error occurs.
/// Returns the bytes read alongside the outcome so partial data survives
/// a failing read.
fn fill<R: Read>(reader: &mut R, buf: &mut [u8]) -> (usize, io::Result<()>) {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return (filled, Err(e)),
        }
    }
    (filled, Ok(()))
}

fn give_up(err: ClipboardError, total: u64, opts: CopyOptions) -> Result<u64, ClipboardError> {
    if opts.quiet {
        tracing::debug!(error = %err, total, "stream error suppressed");
        Ok(total)
    } else {
        Err(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    /// Yields `data`, then fails every read.
    struct FailingReader {
        data: Cursor<Vec<u8>>,
    }

    impl Read for FailingReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match self.data.read(buf)? {
                0 => Err(io::Error::other("device gone")),
                n => Ok(n),
            }
        }
    }

    /// Hands out at most `chunk` bytes per read, like a pipe.
    struct Trickle {
        data: Cursor<Vec<u8>>,
        chunk: usize,
    }

    impl Read for Trickle {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let n = buf.len().min(self.chunk);
            self.data.read(&mut buf[..n])
        }
    }

    /// Accepts `limit` bytes, then refuses further writes.
    struct FullWriter {
        written: Vec<u8>,
        limit: usize,
    }

    impl Write for FullWriter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            let room = self.limit - self.written.len();
            let n = buf.len().min(room);
            self.written.extend_from_slice(&buf[..n]);
            Ok(n)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn pattern(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 251) as u8).collect()
    }

    fn copy(data: &[u8], opts: CopyOptions) -> (u64, Vec<u8>) {
        let mut out = Vec::new();
        let total = copy_stream(
            &mut Cursor::new(data.to_vec()),
            Stream::Stdin,
            &mut out,
            Stream::Clipboard,
            opts,
        )
        .unwrap();
        (total, out)
    }

    #[test]
    fn copies_across_buffer_boundaries() {
        for len in [0, 1, 4095, 4096, 4097, 10000] {
            let data = pattern(len);
            let (total, out) = copy(&data, CopyOptions::default());
            assert_eq!(total, len as u64, "len {len}");
            assert_eq!(out, data, "len {len}");
        }
    }

    #[test]
    fn small_buffer_copies_everything() {
        let data = pattern(1000);
        let opts = CopyOptions {
            buffer_size: 7,
            quiet: false,
        };
        let (total, out) = copy(&data, opts);
        assert_eq!(total, 1000);
        assert_eq!(out, data);
    }

    #[test]
    fn short_reads_do_not_end_copy() {
        let data = pattern(9000);
        let mut reader = Trickle {
            data: Cursor::new(data.clone()),
            chunk: 100,
        };
        let mut out = Vec::new();
        let total = copy_stream(
            &mut reader,
            Stream::Stdin,
            &mut out,
            Stream::Clipboard,
            CopyOptions::default(),
        )
        .unwrap();
        assert_eq!(total, 9000);
        assert_eq!(out, data);
    }

    #[test]
    fn read_error_is_fatal() {
        let mut reader = FailingReader {
            data: Cursor::new(pattern(10)),
        };
        let err = copy_stream(
            &mut reader,
            Stream::Clipboard,
            &mut Vec::new(),
            Stream::Stdout,
            CopyOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ClipboardError::Read {
                stream: Stream::Clipboard,
                ..
            }
        ));
    }

    #[test]
    fn read_error_suppressed_when_quiet() {
        let mut reader = FailingReader {
            data: Cursor::new(pattern(10)),
        };
        let mut out = Vec::new();
        let opts = CopyOptions {
            quiet: true,
            ..CopyOptions::default()
        };
        let total = copy_stream(&mut reader, Stream::Stdin, &mut out, Stream::Clipboard, opts)
            .unwrap();
        assert_eq!(total, 10);
        assert_eq!(out, pattern(10));
    }

    #[test]
    fn short_write_is_fatal() {
        let mut writer = FullWriter {
            written: Vec::new(),
            limit: 100,
        };
        let err = copy_stream(
            &mut Cursor::new(pattern(500)),
            Stream::Clipboard,
            &mut writer,
            Stream::Stdout,
            CopyOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ClipboardError::Write {
                stream: Stream::Stdout,
                ..
            }
        ));
    }

    #[test]
    fn short_write_suppressed_when_quiet() {
        let mut writer = FullWriter {
            written: Vec::new(),
            limit: 100,
        };
        let opts = CopyOptions {
            buffer_size: 64,
            quiet: true,
        };
        let total = copy_stream(
            &mut Cursor::new(pattern(500)),
            Stream::Clipboard,
            &mut writer,
            Stream::Stdout,
            opts,
        )
        .unwrap();
        // The first 64-byte chunk lands; the second only partially.
        assert_eq!(total, 64);
        assert_eq!(writer.written.len(), 100);
    }

    /// Seek that always fails with `kind`.
    struct BadSeek(io::ErrorKind);

    impl Seek for BadSeek {
        fn seek(&mut self, _pos: SeekFrom) -> io::Result<u64> {
            Err(io::Error::from(self.0))
        }
    }

    #[test]
    fn hook_runs_before_first_write() {
        let mut out = b"stale".to_vec();
        let total = copy_stream_with(
            &mut Cursor::new(b"fresh".to_vec()),
            Stream::Stdin,
            &mut out,
            Stream::Clipboard,
            CopyOptions::default(),
            |w: &mut Vec<u8>| {
                w.clear();
                Ok(())
            },
        )
        .unwrap();
        assert_eq!(total, 5);
        assert_eq!(out, b"fresh");
    }

    #[test]
    fn hook_skipped_for_empty_input() {
        let mut out = b"stale".to_vec();
        let total = copy_stream_with(
            &mut Cursor::new(Vec::new()),
            Stream::Stdin,
            &mut out,
            Stream::Clipboard,
            CopyOptions::default(),
            |w: &mut Vec<u8>| {
                w.clear();
                Ok(())
            },
        )
        .unwrap();
        assert_eq!(total, 0);
        assert_eq!(out, b"stale");
    }

    #[test]
    fn hook_failure_is_write_error() {
        let err = copy_stream_with(
            &mut Cursor::new(b"data".to_vec()),
            Stream::Stdin,
            &mut Vec::new(),
            Stream::Clipboard,
            CopyOptions::default(),
            |_: &mut Vec<u8>| Err(io::Error::other("truncate failed")),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ClipboardError::Write {
                stream: Stream::Clipboard,
                ..
            }
        ));
    }

    #[test]
    fn unseekable_input_not_exhausted() {
        assert!(!is_exhausted(&mut BadSeek(io::ErrorKind::NotSeekable)).unwrap());
    }

    #[test]
    fn other_seek_errors_propagate() {
        let err = is_exhausted(&mut BadSeek(io::ErrorKind::PermissionDenied)).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::PermissionDenied);
    }

    #[test]
    fn empty_input_is_exhausted() {
        let mut input = Cursor::new(Vec::<u8>::new());
        assert!(is_exhausted(&mut input).unwrap());
    }

    #[test]
    fn pending_input_rewound_after_probe() {
        let mut input = Cursor::new(b"abc".to_vec());
        assert!(!is_exhausted(&mut input).unwrap());
        assert_eq!(input.position(), 0);
    }

    #[test]
    fn consumed_input_is_exhausted() {
        let mut input = Cursor::new(b"abc".to_vec());
        input.set_position(3);
        assert!(is_exhausted(&mut input).unwrap());
    }

    #[test]
    fn probe_restores_mid_stream_position() {
        let mut input = Cursor::new(b"abcdef".to_vec());
        input.set_position(2);
        assert!(!is_exhausted(&mut input).unwrap());
        assert_eq!(input.position(), 2);
    }
}
