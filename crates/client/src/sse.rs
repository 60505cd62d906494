//! Incremental decoder for `text/event-stream` bodies.
//!
//! Bytes arrive in arbitrary chunks; a frame may be split anywhere, even
//! inside a multi-byte character. Only complete lines are decoded.

/// Sentinel some servers send after the last frame.
pub const DONE_SENTINEL: &str = "[DONE]";

/// Buffers partial lines across chunks and yields `data:` payloads.
#[derive(Debug, Default)]
pub struct SseLineDecoder {
    buffer: Vec<u8>,
}

impl SseLineDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk; returns the payloads of every line it completed.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);

        let mut payloads = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            if let Some(data) = data_payload(&line) {
                payloads.push(data);
            }
        }
        payloads
    }

    /// End of body: decode whatever is left as a final line.
    pub fn finish(&mut self) -> Option<String> {
        let rest = std::mem::take(&mut self.buffer);
        data_payload(&rest)
    }
}

/// The payload of a `data:` line, or `None` for blank lines, comments,
/// other fields and the done sentinel.
fn data_payload(line: &[u8]) -> Option<String> {
    let line = String::from_utf8_lossy(line);
    let line = line.trim_end_matches(['\n', '\r']);

    let data = line.strip_prefix("data:")?;
    let data = data.strip_prefix(' ').unwrap_or(data).trim();

    (!data.is_empty() && data != DONE_SENTINEL).then(|| data.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frames_split_across_chunks() {
        let mut decoder = SseLineDecoder::new();
        assert!(decoder.push(b"data: {\"type\":\"con").is_empty());
        let out = decoder.push(b"tent\",\"content\":\"hi\"}\n\ndata: {\"type\":\"done\"}\n\n");
        assert_eq!(
            out,
            [r#"{"type":"content","content":"hi"}"#, r#"{"type":"done"}"#]
        );
    }

    #[test]
    fn multibyte_character_split() {
        let frame = "data: {\"type\":\"content\",\"content\":\"caf\u{e9}\"}\n".as_bytes();
        let cut = frame.iter().position(|&b| b == 0xC3).unwrap() + 1;

        let mut decoder = SseLineDecoder::new();
        assert!(decoder.push(&frame[..cut]).is_empty());
        let out = decoder.push(&frame[cut..]);
        assert_eq!(out, [r#"{"type":"content","content":"café"}"#]);
    }

    #[test]
    fn ignores_comments_fields_and_sentinel() {
        let mut decoder = SseLineDecoder::new();
        let out = decoder.push(b": keep-alive\nevent: message\nid: 7\n\ndata: [DONE]\r\ndata:{\"type\":\"done\"}\r\n");
        assert_eq!(out, [r#"{"type":"done"}"#]);
    }

    #[test]
    fn trailing_line_without_newline() {
        let mut decoder = SseLineDecoder::new();
        assert!(decoder.push(b"data: {\"type\":\"done\"}").is_empty());
        assert_eq!(decoder.finish().as_deref(), Some(r#"{"type":"done"}"#));
        assert_eq!(decoder.finish(), None);
    }
}
