//! Self-delimiting `data:` frames over a byte stream.
//!
//! The decoder buffers raw bytes, so frames (and multi-byte characters) split across reads are
//! reassembled before parsing. Comment lines and non-`data` fields are ignored.

use async_stream::try_stream;
use futures_core::Stream;
use futures_util::StreamExt;

const DATA_FIELD: &str = "data:";

/// Largest unterminated frame the decoder buffers before discarding it.
pub const MAX_PENDING_BYTES: usize = 8 * 1024 * 1024;

/// Wrap a single-line payload in a `data:` frame terminated by a blank line.
pub fn encode_frame(payload: &str) -> String {
    debug_assert!(!payload.contains('\n'), "frame payloads must be single-line");
    format!("data: {payload}\n\n")
}

/// Incremental decoder that turns arbitrary byte slices into frame payloads.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buffer: Vec<u8>,
    scanned: usize,
}

impl FrameDecoder {
    /// Create an empty decoder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append bytes and return the payloads of every frame completed by them.
    ///
    /// Bytes already searched for a boundary are not searched again. A pending frame that grows
    /// past [`MAX_PENDING_BYTES`] is discarded.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(bytes);

        let mut payloads = Vec::new();
        // A boundary is at most three bytes, so it can straddle the previous scan end by two.
        while let Some((end, boundary_len)) =
            find_boundary(&self.buffer, self.scanned.saturating_sub(2))
        {
            let block: Vec<u8> = self.buffer.drain(..end + boundary_len).collect();
            self.scanned = 0;
            if let Some(payload) = parse_block(&block[..end]) {
                payloads.push(payload);
            }
        }
        self.scanned = self.buffer.len();

        if self.buffer.len() > MAX_PENDING_BYTES {
            tracing::warn!(
                pending_bytes = self.buffer.len(),
                limit = MAX_PENDING_BYTES,
                "Discarding oversized unterminated frame"
            );
            self.buffer.clear();
            self.scanned = 0;
        }
        payloads
    }

    /// Flush an unterminated trailing frame, if it carries a payload.
    pub fn finish(&mut self) -> Option<String> {
        let block = std::mem::take(&mut self.buffer);
        self.scanned = 0;
        parse_block(&block)
    }

    /// Bytes received but not yet part of a complete frame.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }
}

/// Locate the first blank line at or after `from`. Returns the end of the frame and the
/// boundary length.
fn find_boundary(buffer: &[u8], from: usize) -> Option<(usize, usize)> {
    buffer
        .iter()
        .enumerate()
        .skip(from)
        .filter(|(_, byte)| **byte == b'\n')
        .find_map(|(index, _)| match &buffer[index + 1..] {
            [b'\n', ..] => Some((index, 2)),
            [b'\r', b'\n', ..] => Some((index, 3)),
            _ => None,
        })
}

fn parse_block(block: &[u8]) -> Option<String> {
    let text = match std::str::from_utf8(block) {
        Ok(text) => text,
        Err(error) => {
            tracing::warn!(error = %error, "Dropping frame with invalid UTF-8");
            return None;
        }
    };

    let mut data_lines = Vec::new();
    for line in text.lines() {
        let line = line.trim_end_matches('\r');
        if let Some(value) = line.strip_prefix(DATA_FIELD) {
            data_lines.push(value.strip_prefix(' ').unwrap_or(value));
        }
    }

    if data_lines.is_empty() {
        return None;
    }
    let payload = data_lines.join("\n");
    if payload.trim().is_empty() {
        None
    } else {
        Some(payload)
    }
}

/// Decode a byte stream into frame payloads, honouring a trailing unterminated frame.
pub fn frame_payloads<S, B, E>(byte_stream: S) -> impl Stream<Item = Result<String, E>>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
{
    try_stream! {
        let mut decoder = FrameDecoder::new();
        let mut byte_stream = std::pin::pin!(byte_stream);
        while let Some(chunk) = byte_stream.next().await {
            let chunk = chunk?;
            for payload in decoder.push(chunk.as_ref()) {
                yield payload;
            }
        }
        if let Some(payload) = decoder.finish() {
            yield payload;
        }
    }
}
