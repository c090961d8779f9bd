//! Line-oriented I/O with the worker.

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::task::JoinHandle;

use crate::{Error, Result};

/// Reads newline-terminated lines from the worker.
///
/// Generic over the source so the turn driver can be exercised against
/// in-memory pipes. Lines are decoded lossily: invalid UTF-8 becomes
/// U+FFFD rather than an error, so one bad line never ends the stream.
pub struct LineReader<R> {
    reader: R,
    buffer: Vec<u8>,
}

impl<R: AsyncRead + Unpin> LineReader<BufReader<R>> {
    /// Wrap an unbuffered source such as a child's stdout.
    pub fn new(source: R) -> Self {
        Self::buffered(BufReader::new(source))
    }
}

impl<R: AsyncBufRead + Unpin> LineReader<R> {
    pub fn buffered(reader: R) -> Self {
        Self {
            reader,
            buffer: Vec::with_capacity(4096),
        }
    }

    /// Read the next line without its terminator.
    ///
    /// Returns `Ok(None)` at EOF. Blank lines are returned as empty strings.
    pub async fn read_line(&mut self) -> Result<Option<String>> {
        self.buffer.clear();
        let bytes = self
            .reader
            .read_until(b'\n', &mut self.buffer)
            .await
            .map_err(Error::io)?;
        if bytes == 0 {
            return Ok(None);
        }
        let line = String::from_utf8_lossy(&self.buffer);
        Ok(Some(line.trim_end_matches(['\n', '\r']).to_string()))
    }
}

/// Writes newline-terminated lines to the worker's stdin.
pub struct LineWriter<W> {
    writer: W,
}

impl<W: AsyncWrite + Unpin> LineWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Write one line and flush it.
    ///
    /// The worker blocks on stdin for permission replies, so every line is
    /// flushed immediately.
    pub async fn write_line(&mut self, line: &str) -> Result<()> {
        debug_assert!(!line.contains('\n'), "protocol lines must be single-line");
        self.writer
            .write_all(line.as_bytes())
            .await
            .map_err(Error::io)?;
        self.writer.write_all(b"\n").await.map_err(Error::io)?;
        self.writer.flush().await.map_err(Error::io)?;
        Ok(())
    }

    /// Close the stream, signalling EOF to the worker.
    pub async fn shutdown(&mut self) -> Result<()> {
        self.writer.shutdown().await.map_err(Error::io)
    }
}

/// Drain the worker's stderr into debug logs until EOF.
///
/// The worker logs diagnostics there; an undrained pipe would eventually
/// block it, and a closed one kills it on the next write. Only EOF or a
/// real read error stops the drain.
pub fn drain_stderr<R>(stderr: R) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut reader = LineReader::new(stderr);
        loop {
            match reader.read_line().await {
                Ok(Some(line)) if line.is_empty() => {}
                Ok(Some(line)) => tracing::debug!(target: "claude_relay::worker", "{}", line),
                Ok(None) => break,
                Err(e) => {
                    tracing::debug!("stderr read failed: {}", e);
                    break;
                }
            }
        }
    })
}
