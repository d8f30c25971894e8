/// Incremental decoder for `text/event-stream` bodies.
///
/// Bytes arrive in arbitrary chunks; only complete lines are interpreted, so
/// multi-byte characters split across chunks survive. Each dispatched event
/// yields its `data` payload (multiple `data:` lines joined with `\n`).
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    data: Vec<String>,
}

impl SseDecoder {
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);
        let mut events = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let mut line: Vec<u8> = self.buffer.drain(..=pos).collect();
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            let line = String::from_utf8_lossy(&line);
            if let Some(event) = self.handle_line(&line) {
                events.push(event);
            }
        }
        events
    }

    /// Flushes an event left unterminated when the body ends.
    pub fn finish(&mut self) -> Option<String> {
        if !self.buffer.is_empty() {
            let line = String::from_utf8_lossy(&std::mem::take(&mut self.buffer)).into_owned();
            let line = line.trim_end_matches('\r');
            if let Some(event) = self.handle_line(line) {
                return Some(event);
            }
        }
        self.dispatch()
    }

    fn handle_line(&mut self, line: &str) -> Option<String> {
        if line.is_empty() {
            return self.dispatch();
        }
        if line.starts_with(':') {
            return None;
        }
        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        if field == "data" {
            self.data.push(value.to_string());
        }
        None
    }

    fn dispatch(&mut self) -> Option<String> {
        if self.data.is_empty() {
            return None;
        }
        Some(std::mem::take(&mut self.data).join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decodes_events_across_chunk_boundaries() {
        let mut decoder = SseDecoder::default();
        assert!(decoder.push(b"data: {\"a\":").is_empty());
        assert_eq!(decoder.push(b"1}\n\ndata: two\n"), vec!["{\"a\":1}"]);
        assert_eq!(decoder.push(b"\n"), vec!["two"]);
    }

    #[test]
    fn test_handles_crlf_and_comments() {
        let mut decoder = SseDecoder::default();
        let events = decoder.push(b": keep-alive\r\nevent: message\r\ndata: x\r\n\r\n");
        assert_eq!(events, vec!["x"]);
    }

    #[test]
    fn test_joins_multiline_data() {
        let mut decoder = SseDecoder::default();
        assert_eq!(decoder.push(b"data: a\ndata: b\n\n"), vec!["a\nb"]);
    }

    #[test]
    fn test_split_utf8_character() {
        let text = "data: café\n\n".as_bytes();
        let split = text.len() - 3;
        let mut decoder = SseDecoder::default();
        assert!(decoder.push(&text[..split]).is_empty());
        assert_eq!(decoder.push(&text[split..]), vec!["café"]);
    }

    #[test]
    fn test_finish_flushes_unterminated_event() {
        let mut decoder = SseDecoder::default();
        assert!(decoder.push(b"data: tail").is_empty());
        assert_eq!(decoder.finish(), Some("tail".to_string()));
        assert_eq!(decoder.finish(), None);
    }
}
