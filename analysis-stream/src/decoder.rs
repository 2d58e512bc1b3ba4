//! Frame decoding for the analyze stream.
//!
//! The transport delivers arbitrary text chunks; frames are newline
//! delimited `data: <json>` lines and a chunk may end mid-line, so a
//! partial trailing line is buffered until its newline arrives. A
//! malformed frame is logged and dropped without affecting the rest of
//! the stream.

use tracing::{debug, warn};

use crate::event::RawEvent;

const FRAME_PREFIX: &str = "data: ";

/// Incremental `data: <json>` line decoder.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buffer: String,
    done: bool,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a terminal `done` event has been decoded. The caller
    /// stops reading from the transport once this latches.
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Consume one transport chunk, yielding every event whose frame
    /// completed. Events after a terminal `done` are not yielded.
    pub fn feed(&mut self, chunk: &str) -> Vec<RawEvent> {
        let mut events = Vec::new();
        if self.done {
            return events;
        }
        self.buffer.push_str(chunk);

        while let Some(pos) = self.buffer.find('\n') {
            let line: String = self.buffer.drain(..=pos).collect();
            if self.done {
                break;
            }
            if let Some(event) = Self::decode_line(line.trim_end_matches(['\n', '\r'])) {
                if event.event_type == "done" {
                    self.done = true;
                }
                events.push(event);
            }
        }
        events
    }

    fn decode_line(line: &str) -> Option<RawEvent> {
        let payload = line.strip_prefix(FRAME_PREFIX)?;
        match serde_json::from_str::<RawEvent>(payload) {
            Ok(event) => {
                debug!(event_type = %event.event_type, "decoded frame");
                Some(event)
            }
            Err(e) => {
                warn!(error = %e, line = %line, "dropping malformed frame");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decodes_complete_frames() {
        let mut decoder = FrameDecoder::new();
        let events = decoder.feed("data: {\"type\":\"thinking\",\"message\":\"a\"}\n\ndata: {\"type\":\"log\"}\n\n");
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].event_type, "thinking");
        assert_eq!(events[1].event_type, "log");
    }

    #[test]
    fn test_buffers_line_split_across_chunks() {
        let mut decoder = FrameDecoder::new();
        assert!(decoder.feed("data: {\"type\":\"thi").is_empty());
        let events = decoder.feed("nking\",\"message\":\"a\"}\n");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, "thinking");
    }

    #[test]
    fn test_ignores_non_frame_lines() {
        let mut decoder = FrameDecoder::new();
        let events = decoder.feed(": keepalive\n\nevent: ping\ndata: {\"type\":\"log\"}\n");
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn test_malformed_frame_is_dropped_not_fatal() {
        let mut decoder = FrameDecoder::new();
        let events = decoder.feed("data: {not json}\ndata: {\"type\":\"log\"}\n");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, "log");
    }

    #[test]
    fn test_done_latches_and_stops_yielding() {
        let mut decoder = FrameDecoder::new();
        let events =
            decoder.feed("data: {\"type\":\"done\"}\ndata: {\"type\":\"log\"}\n");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, "done");
        assert!(decoder.is_done());
        assert!(decoder.feed("data: {\"type\":\"log\"}\n").is_empty());
    }

    #[test]
    fn test_crlf_lines() {
        let mut decoder = FrameDecoder::new();
        let events = decoder.feed("data: {\"type\":\"log\"}\r\n");
        assert_eq!(events.len(), 1);
    }
}
