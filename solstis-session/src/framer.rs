//! Brace-balancing frame extractor
//!
//! Documents end where the count of closing braces equals the count of
//! opening braces. Braces inside JSON string literals are not counted. The
//! scan position and counts survive between calls, so bytes are never
//! rescanned when more data arrives.

use crate::error::{SolstisError, SolstisResult};
use bytes::{Bytes, BytesMut};
use serde_json::Value;

const OPEN_BRACE: u8 = b'{';
const CLOSE_BRACE: u8 = b'}';
const QUOTE: u8 = b'"';
const BACKSLASH: u8 = b'\\';

/// Incremental extractor of brace-delimited JSON documents
#[derive(Debug, Default)]
pub struct FrameExtractor {
    /// Received bytes not yet consumed into a document
    buffer: BytesMut,
    /// Number of leading bytes of `buffer` already scanned
    scanned: usize,
    open_count: usize,
    close_count: usize,
    in_string: bool,
    escaped: bool,
}

impl FrameExtractor {
    /// Create an empty extractor
    pub fn new() -> Self {
        Self::default()
    }

    /// Append bytes received from the transport
    pub fn feed(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Bytes received but not yet returned as part of a document
    pub fn residual(&self) -> &[u8] {
        &self.buffer
    }

    /// Check whether no residual bytes are held
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Check whether a document has been started but not finished
    pub fn in_progress(&self) -> bool {
        self.scanned > 0
    }

    /// Drop all residual bytes and scan state
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Extract the next complete document's raw bytes, if one is buffered
    ///
    /// Returns `Ok(None)` when more bytes are needed. Fails with
    /// [`SolstisError::Framing`] when the buffer does not start with `{`,
    /// which means the stream is desynchronized.
    pub fn try_extract(&mut self) -> SolstisResult<Option<Bytes>> {
        if self.buffer.is_empty() {
            return Ok(None);
        }

        if self.scanned == 0 {
            if self.buffer[0] != OPEN_BRACE {
                return Err(SolstisError::Framing(format!(
                    "Expected '{{' at start of message, but received: 0x{:02X}",
                    self.buffer[0]
                )));
            }
            self.open_count = 1;
            self.close_count = 0;
            self.scanned = 1;
        }

        for i in self.scanned..self.buffer.len() {
            let byte = self.buffer[i];
            if self.in_string {
                if self.escaped {
                    self.escaped = false;
                } else if byte == BACKSLASH {
                    self.escaped = true;
                } else if byte == QUOTE {
                    self.in_string = false;
                }
                continue;
            }
            match byte {
                QUOTE => self.in_string = true,
                OPEN_BRACE => self.open_count += 1,
                CLOSE_BRACE => {
                    self.close_count += 1;
                    if self.close_count == self.open_count {
                        let document = self.buffer.split_to(i + 1).freeze();
                        self.scanned = 0;
                        self.open_count = 0;
                        self.close_count = 0;
                        log::trace!(
                            "Extracted {} byte document, {} residual bytes",
                            document.len(),
                            self.buffer.len()
                        );
                        return Ok(Some(document));
                    }
                }
                _ => {}
            }
        }

        self.scanned = self.buffer.len();
        Ok(None)
    }

    /// Extract and decode the next complete document, if one is buffered
    ///
    /// A brace-balanced span that is not valid JSON is reported as
    /// [`SolstisError::Framing`].
    pub fn next_document(&mut self) -> SolstisResult<Option<Value>> {
        match self.try_extract()? {
            Some(raw) => serde_json::from_slice(&raw).map(Some).map_err(|e| {
                SolstisError::Framing(format!(
                    "Balanced message is not valid JSON ({}): {}",
                    e,
                    String::from_utf8_lossy(&raw)
                ))
            }),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const FIRST: &str = r#"{"message":{"transmission_id":[1],"op":"set_wave_m_reply","parameters":{"status":0,"wavelength":[780.0]}}}"#;
    const SECOND: &str = r#"{"message":{"transmission_id":[0],"op":"automatic_output","parameters":{"wavelength":[777.5],"status":"scan"}}}"#;

    fn extract_all(chunks: &[&[u8]]) -> Vec<Value> {
        let mut extractor = FrameExtractor::new();
        let mut out = Vec::new();
        for chunk in chunks {
            extractor.feed(chunk);
            while let Some(doc) = extractor.next_document().unwrap() {
                out.push(doc);
            }
        }
        assert!(extractor.is_empty());
        out
    }

    #[test]
    fn test_single_document() {
        let docs = extract_all(&[FIRST.as_bytes()]);
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0]["message"]["op"], "set_wave_m_reply");
    }

    #[test]
    fn test_two_documents_in_one_read() {
        let stream = format!("{}{}", FIRST, SECOND);
        let mut extractor = FrameExtractor::new();
        extractor.feed(stream.as_bytes());

        let first = extractor.try_extract().unwrap().unwrap();
        assert_eq!(&first[..], FIRST.as_bytes());
        assert_eq!(extractor.residual(), SECOND.as_bytes());

        let second = extractor.try_extract().unwrap().unwrap();
        assert_eq!(&second[..], SECOND.as_bytes());
        assert!(extractor.is_empty());
        assert!(extractor.try_extract().unwrap().is_none());
    }

    #[test]
    fn test_chunk_boundary_independence() {
        let stream = format!("{}{}{}", FIRST, SECOND, FIRST);
        let bytes = stream.as_bytes();
        let whole = extract_all(&[bytes]);
        assert_eq!(whole.len(), 3);

        for size in 1..=17 {
            let chunks: Vec<&[u8]> = bytes.chunks(size).collect();
            assert_eq!(extract_all(&chunks), whole, "chunk size {}", size);
        }
    }

    #[test]
    fn test_split_at_every_offset() {
        let bytes = FIRST.as_bytes();
        let expected = extract_all(&[bytes]);
        for split in 1..bytes.len() {
            let (a, b) = bytes.split_at(split);
            assert_eq!(extract_all(&[a, b]), expected, "split at {}", split);
        }
        // three-way splits inside the op string and the status value
        let op_at = FIRST.find("set_wave").unwrap() + 3;
        let status_at = FIRST.find("status").unwrap() + 2;
        let docs = extract_all(&[&bytes[..op_at], &bytes[op_at..status_at], &bytes[status_at..]]);
        assert_eq!(docs, expected);
    }

    #[test]
    fn test_partial_state_survives() {
        let mut extractor = FrameExtractor::new();
        extractor.feed(b"{\"a\":{\"b\":");
        assert!(extractor.try_extract().unwrap().is_none());
        assert!(extractor.in_progress());
        extractor.feed(b"1}");
        assert!(extractor.try_extract().unwrap().is_none());
        extractor.feed(b"}{");
        let doc = extractor.next_document().unwrap().unwrap();
        assert_eq!(doc, json!({"a": {"b": 1}}));
        assert_eq!(extractor.residual(), b"{");
    }

    #[test]
    fn test_desynchronized_residual_fails() {
        let mut extractor = FrameExtractor::new();
        extractor.feed(b"xx{}");
        assert!(matches!(
            extractor.try_extract(),
            Err(SolstisError::Framing(_))
        ));
    }

    #[test]
    fn test_balanced_but_corrupt_payload() {
        let mut extractor = FrameExtractor::new();
        extractor.feed(b"{\"message\": nope}");
        assert!(matches!(
            extractor.next_document(),
            Err(SolstisError::Framing(_))
        ));
    }

    #[test]
    fn test_braces_inside_strings_ignored() {
        let doc = r#"{"message":{"op":"x","parameters":{"note":"a } b \" { c"}}}"#;
        let docs = extract_all(&[doc.as_bytes()]);
        assert_eq!(docs[0]["message"]["parameters"]["note"], "a } b \" { c");
    }
}
