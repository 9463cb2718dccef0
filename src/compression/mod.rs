//! Transport decompression for frames received over the connection.
//!
//! The gateway is asked for `zstd-stream` compression on every connection
//! URL; incoming binary frames are concatenated here and decompressed
//! incrementally as they arrive, since a single gateway message can span
//! several WebSocket frames.

use std::{
    error::Error,
    fmt::{Display, Formatter, Result as FmtResult},
};
use zstd_safe::{DStream, InBuffer, OutBuffer};

/// Query argument appended to the connection URL to request streaming
/// zstd compression.
pub const COMPRESSION_FEATURE: &str = "&compress=zstd-stream";

/// Initial size of the buffer a fully decompressed message is assembled
/// into.
const DECOMPRESSED_CAPACITY: usize = 64 * 1024;

/// A frame could not be decompressed.
#[derive(Debug)]
pub struct CompressionError {
    /// Type of error.
    kind: CompressionErrorType,
    /// Source error if available.
    source: Option<Box<dyn Error + Send + Sync>>,
}

impl CompressionError {
    /// Immutable reference to the type of error that occurred.
    pub const fn kind(&self) -> &CompressionErrorType {
        &self.kind
    }

    /// Consume the error, returning the source error if there is any.
    pub fn into_source(self) -> Option<Box<dyn Error + Send + Sync>> {
        self.source
    }
}

impl Display for CompressionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self.kind {
            CompressionErrorType::Decompressing => f.write_str("a frame could not be decompressed"),
            CompressionErrorType::Corrupted => f.write_str("zstd stream made no progress on a non-empty input"),
        }
    }
}

impl Error for CompressionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.source
            .as_ref()
            .map(|source| &**source as &(dyn Error + 'static))
    }
}

/// Type of [`CompressionError`] that occurred.
#[derive(Debug)]
#[non_exhaustive]
pub enum CompressionErrorType {
    /// The zstd decoder reported an error decoding the stream.
    Decompressing,
    /// The zstd decoder consumed no input and produced no output, despite
    /// input remaining; the stream is desynchronized and the connection
    /// must be dropped.
    Corrupted,
}

/// Incremental zstd-stream decompressor for one connection's lifetime.
///
/// A single [`DStream`] is reused across every message received on the
/// connection; zstd's streaming frames carry state between messages, so
/// the decoder must not be recreated mid-session.
pub struct Inflater {
    /// Decompression context, long-lived for the connection.
    stream: DStream<'static>,
    /// Compressed bytes accumulated from WebSocket frames until a message
    /// boundary is found.
    compressed: Vec<u8>,
    /// Buffer the fully decompressed message is written into.
    decompressed: Vec<u8>,
}

impl Inflater {
    /// Create a new decompressor.
    pub fn new() -> Self {
        let mut stream = DStream::create();
        stream.init().expect("zstd decompression context failed to initialize");

        Self {
            stream,
            compressed: Vec::new(),
            decompressed: Vec::with_capacity(DECOMPRESSED_CAPACITY),
        }
    }

    /// Extend the pending-input buffer with bytes from a binary frame.
    pub fn extend(&mut self, bytes: &[u8]) {
        self.compressed.extend_from_slice(bytes);
    }

    /// Attempt to decompress the bytes accumulated so far into a complete
    /// message.
    ///
    /// Returns `Ok(None)` when more frames are needed before a full
    /// message is available.
    pub fn message(&mut self) -> Result<Option<&[u8]>, CompressionError> {
        if self.compressed.is_empty() {
            return Ok(None);
        }

        self.decompressed.clear();
        self.decompressed.resize(DECOMPRESSED_CAPACITY, 0);

        let mut in_buffer = InBuffer::around(&self.compressed);
        let mut out_buffer = OutBuffer::around(&mut self.decompressed);

        let length = self.compressed.len();
        let mut processed = 0;

        loop {
            match self.stream.decompress_stream(&mut out_buffer, &mut in_buffer) {
                Ok(0) => break,
                Ok(_hint) => {}
                Err(code) => {
                    return Err(CompressionError {
                        kind: CompressionErrorType::Decompressing,
                        source: Some(zstd_safe::get_error_name(code).to_owned().into()),
                    })
                }
            }

            let in_pos = in_buffer.pos();
            let progressed = in_pos > processed;
            let read_all_input = in_pos == length;

            if !progressed {
                if read_all_input {
                    break;
                }

                return Err(CompressionError {
                    kind: CompressionErrorType::Corrupted,
                    source: None,
                });
            }

            processed = in_pos;
        }

        let produced = out_buffer.pos();
        self.compressed.clear();

        Ok(Some(&self.decompressed[..produced]))
    }

    /// Reset the compressor's accumulated input for a new gateway session.
    ///
    /// The decoding context itself is not reinitialized; zstd-stream
    /// sessions on the gateway begin a fresh frame on reconnect, which
    /// this decoder handles transparently.
    pub fn reset(&mut self) {
        self.compressed.clear();
        self.decompressed.clear();
    }
}

impl Default for Inflater {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Inflater {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("Inflater")
            .field("compressed_len", &self.compressed.len())
            .field("decompressed_len", &self.decompressed.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::Inflater;

    #[test]
    fn no_input_yields_no_message() {
        let mut inflater = Inflater::new();

        assert!(inflater.message().unwrap().is_none());
    }

    #[test]
    fn reset_clears_pending_input() {
        let mut inflater = Inflater::new();
        inflater.extend(&[0x28, 0xb5, 0x2f, 0xfd]);
        inflater.reset();

        assert!(inflater.message().unwrap().is_none());
    }
}
