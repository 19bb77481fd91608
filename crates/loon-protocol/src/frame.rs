//! Line-delimited JSON framing.
//!
//! A frame is one compact JSON value followed by `\n`. Decoding is
//! byte-driven: bytes accumulate until a newline, then the line is parsed.
//! A line that does not parse is dropped and decoding carries on with the
//! next byte, so garbage on the wire costs at most one line.
//!
//! The blocking `read_frame` pulls one byte per `read` call and never
//! consumes past the newline. That matters on a raw socket whose ownership
//! moves elsewhere after the first frame; wrap the stream in a
//! `BufReader` when that is not a concern.

use std::io::{self, Read, Write};

use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::wire_types::{FRAME_DELIMITER, MAX_FRAME_LEN};

/// Incremental decoder state: the bytes of the current line.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    line: Vec<u8>,
    oversized: bool,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one byte. Returns a value when `byte` completed a well-formed
    /// line.
    pub fn push_byte(&mut self, byte: u8) -> Option<Value> {
        if byte != FRAME_DELIMITER {
            if self.line.len() < MAX_FRAME_LEN {
                self.line.push(byte);
            } else {
                self.oversized = true;
            }
            return None;
        }

        let line = std::mem::take(&mut self.line);
        if std::mem::take(&mut self.oversized) {
            debug!(limit = MAX_FRAME_LEN, "dropping oversized frame");
            return None;
        }

        match serde_json::from_slice::<Value>(&line) {
            Ok(value) => Some(value),
            Err(err) => {
                debug!(error = %err, len = line.len(), "dropping malformed frame");
                None
            }
        }
    }

    /// Feed a chunk, collecting every frame it completes.
    pub fn push_bytes(&mut self, bytes: &[u8]) -> Vec<Value> {
        bytes.iter().filter_map(|&b| self.push_byte(b)).collect()
    }

    /// True while part of a line is buffered.
    pub fn has_partial(&self) -> bool {
        !self.line.is_empty() || self.oversized
    }
}

/// Compact JSON plus the delimiter, ready for a single write.
pub fn encode_frame<T: Serialize + ?Sized>(value: &T) -> serde_json::Result<Vec<u8>> {
    let mut buf = serde_json::to_vec(value)?;
    buf.push(FRAME_DELIMITER);
    Ok(buf)
}

/// Read the next well-formed frame. `Ok(None)` on end of stream, including
/// a stream that closes in the middle of a line.
pub fn read_frame<R: Read + ?Sized>(reader: &mut R) -> io::Result<Option<Value>> {
    let mut decoder = FrameDecoder::new();
    let mut byte = [0u8; 1];

    loop {
        match reader.read(&mut byte) {
            Ok(0) => return Ok(None),
            Ok(_) => {
                if let Some(value) = decoder.push_byte(byte[0]) {
                    return Ok(Some(value));
                }
            }
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(err),
        }
    }
}

/// Write one frame with a single `write_all`.
pub fn write_frame<W: Write + ?Sized, T: Serialize + ?Sized>(
    writer: &mut W,
    value: &T,
) -> io::Result<()> {
    let buf = encode_frame(value)?;
    writer.write_all(&buf)?;
    writer.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decoder_yields_on_newline_only() {
        let mut decoder = FrameDecoder::new();

        assert!(decoder.push_bytes(br#"{"a":"#).is_empty());
        assert!(decoder.has_partial());
        assert_eq!(decoder.push_bytes(b"1}\n"), vec![json!({"a": 1})]);
        assert!(!decoder.has_partial());
    }

    #[test]
    fn blank_lines_are_dropped() {
        let mut decoder = FrameDecoder::new();

        assert_eq!(decoder.push_bytes(b"\n\n7\n"), vec![json!(7)]);
    }

    #[test]
    fn oversized_line_is_dropped_whole() {
        let mut decoder = FrameDecoder::new();
        let mut input = vec![b'"'; MAX_FRAME_LEN + 10];
        input.push(b'\n');
        input.extend_from_slice(b"true\n");

        assert_eq!(decoder.push_bytes(&input), vec![json!(true)]);
    }

    #[test]
    fn encoded_frame_is_one_compact_line() {
        let buf = encode_frame(&json!({"type": "event", "values": {"x": [1, 2]}})).unwrap();

        assert_eq!(buf.last(), Some(&b'\n'));
        assert_eq!(buf.iter().filter(|&&b| b == b'\n').count(), 1);
        assert!(!buf.contains(&b' '));
    }
}
