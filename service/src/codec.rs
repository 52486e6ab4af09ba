//
// Copyright 2017-2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! Wire codec for the session and control protocols
//!
//! Inbound frames are lines terminated by CR LF. The terminator is strict:
//! a bare LF does not end a frame, which is what allows a quoted multi-line
//! `SET` payload to arrive as a single control command. Outbound data is
//! not framed at all: replay chunks pass through verbatim except that each
//! bare LF is rewritten to the wire's CR LF.

use crate::error::ServiceError;
use bytes::{BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

/// Default limit on the length of a single inbound line
pub const DEFAULT_MAX_LINE_LENGTH: usize = 8192;

/// Codec translating between the wire and the service's internal text.
#[derive(Debug, Clone)]
pub struct LineCodec {
    /// Maximum bytes a single line may occupy before the decoder gives up
    max_line_length: usize,
    /// Index into the buffer where the next terminator scan resumes
    next_index: usize,
}

impl LineCodec {
    /// Create a codec with the default line length limit
    pub fn new() -> Self {
        Self::with_max_line_length(DEFAULT_MAX_LINE_LENGTH)
    }

    /// Create a codec with a specific line length limit
    pub fn with_max_line_length(max_line_length: usize) -> Self {
        Self {
            max_line_length,
            next_index: 0,
        }
    }

    /// The configured line length limit
    pub fn max_line_length(&self) -> usize {
        self.max_line_length
    }

    fn find_terminator(haystack: &[u8], from: usize) -> Option<usize> {
        if haystack.len() < 2 {
            return None;
        }
        (from..haystack.len() - 1).find(|&i| haystack[i] == b'\r' && haystack[i + 1] == b'\n')
    }
}

impl Default for LineCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for LineCodec {
    type Item = String;
    type Error = ServiceError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<String>, Self::Error> {
        match Self::find_terminator(src, self.next_index) {
            Some(pos) => {
                let line = src.split_to(pos + 2);
                self.next_index = 0;
                Ok(Some(String::from_utf8_lossy(&line[..pos]).into_owned()))
            }
            None => {
                if src.len() > self.max_line_length {
                    return Err(ServiceError::LineTooLong(self.max_line_length));
                }
                // A trailing CR may pair with the next chunk's LF, so the
                // scan resumes one byte back from the buffer end.
                self.next_index = src.len().saturating_sub(1);
                Ok(None)
            }
        }
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<String>, Self::Error> {
        match self.decode(buf)? {
            Some(line) => Ok(Some(line)),
            None => {
                if !buf.is_empty() {
                    tracing::trace!(bytes = buf.len(), "discarding partial line at eof");
                    buf.clear();
                    self.next_index = 0;
                }
                Ok(None)
            }
        }
    }
}

impl Encoder<&str> for LineCodec {
    type Error = ServiceError;

    fn encode(&mut self, item: &str, dst: &mut BytesMut) -> Result<(), Self::Error> {
        dst.reserve(item.len() + item.len() / 8 + 2);
        let mut prev = 0u8;
        for byte in item.bytes() {
            if byte == b'\n' && prev != b'\r' {
                dst.put_u8(b'\r');
            }
            dst.put_u8(byte);
            prev = byte;
        }
        Ok(())
    }
}

impl Encoder<String> for LineCodec {
    type Error = ServiceError;

    fn encode(&mut self, item: String, dst: &mut BytesMut) -> Result<(), Self::Error> {
        Encoder::<&str>::encode(self, item.as_str(), dst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_all(codec: &mut LineCodec, bytes: &[u8]) -> Vec<String> {
        let mut buffer = BytesMut::from(bytes);
        let mut lines = Vec::new();
        while let Some(line) = codec.decode(&mut buffer).unwrap() {
            lines.push(line);
        }
        lines
    }

    fn encode(text: &str) -> BytesMut {
        let mut codec = LineCodec::new();
        let mut buffer = BytesMut::new();
        codec.encode(text, &mut buffer).unwrap();
        buffer
    }

    #[test]
    fn test_decode_crlf_lines() {
        let mut codec = LineCodec::new();
        let lines = decode_all(&mut codec, b"foo\r\nbar\r\n");
        assert_eq!(lines, vec!["foo".to_string(), "bar".to_string()]);
    }

    #[test]
    fn test_decode_is_strict_about_crlf() {
        // A bare LF does not terminate a frame; the whole quoted payload
        // arrives as one line.
        let mut codec = LineCodec::new();
        let lines = decode_all(&mut codec, b"SET \"line one\nline two\n\"\r\n");
        assert_eq!(lines, vec!["SET \"line one\nline two\n\"".to_string()]);
    }

    #[test]
    fn test_decode_across_chunks() {
        let mut codec = LineCodec::new();
        let mut buffer = BytesMut::from(&b"par"[..]);
        assert_eq!(codec.decode(&mut buffer).unwrap(), None);
        buffer.extend_from_slice(b"tial\r");
        assert_eq!(codec.decode(&mut buffer).unwrap(), None);
        buffer.extend_from_slice(b"\nrest\r\n");
        assert_eq!(codec.decode(&mut buffer).unwrap().as_deref(), Some("partial"));
        assert_eq!(codec.decode(&mut buffer).unwrap().as_deref(), Some("rest"));
    }

    #[test]
    fn test_decode_line_too_long() {
        let mut codec = LineCodec::with_max_line_length(8);
        let mut buffer = BytesMut::from(&b"way past the limit"[..]);
        let err = codec.decode(&mut buffer).unwrap_err();
        assert!(matches!(err, ServiceError::LineTooLong(8)));
    }

    #[test]
    fn test_decode_eof_discards_partial_line() {
        let mut codec = LineCodec::new();
        let mut buffer = BytesMut::from(&b"dangling"[..]);
        assert_eq!(codec.decode_eof(&mut buffer).unwrap(), None);
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_encode_rewrites_bare_lf() {
        assert_eq!(&encode("a\nb\n")[..], b"a\r\nb\r\n");
    }

    #[test]
    fn test_encode_does_not_double_cr() {
        assert_eq!(&encode("a\r\nb\n")[..], b"a\r\nb\r\n");
    }

    #[test]
    fn test_encode_passes_text_through() {
        assert_eq!(&encode("no terminator")[..], b"no terminator");
    }
}
