use anyhow::{Context, Result};
use serde::Deserialize;

use crate::model::ResultPayload;

pub const DATA_MARKER: &str = "data:";
const FRAME_DELIMITER: &[u8] = b"\n\n";

/// Splits a chunked analyze stream into complete frames.
///
/// Bytes are buffered across reads; a frame is only released once its blank
/// line terminator has arrived, so a JSON payload split across two network
/// reads is never handed to the parser half-finished.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buf: Vec<u8>,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one read's worth of bytes and returns the payloads of every frame
    /// completed by it, in arrival order.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buf.extend(chunk.iter().copied().filter(|b| *b != b'\r'));

        let mut frames = Vec::new();
        let mut consumed = 0usize;
        while let Some(pos) = find_delimiter(&self.buf[consumed..]) {
            let end = consumed + pos;
            if let Some(payload) = frame_payload(&self.buf[consumed..end]) {
                frames.push(payload);
            }
            consumed = end + FRAME_DELIMITER.len();
        }
        if consumed > 0 {
            self.buf.drain(..consumed);
        }
        frames
    }

    /// Flushes whatever is left once the stream has closed.
    pub fn finish(&mut self) -> Option<String> {
        let rest = std::mem::take(&mut self.buf);
        frame_payload(&rest)
    }

    pub fn pending_len(&self) -> usize {
        self.buf.len()
    }
}

fn find_delimiter(haystack: &[u8]) -> Option<usize> {
    haystack
        .windows(FRAME_DELIMITER.len())
        .position(|w| w == FRAME_DELIMITER)
}

fn frame_payload(raw: &[u8]) -> Option<String> {
    let text = String::from_utf8_lossy(raw);
    let mut data: Vec<&str> = Vec::new();
    for line in text.split('\n') {
        if line.is_empty() || line.starts_with(':') {
            continue;
        }
        if let Some(rest) = line.strip_prefix(DATA_MARKER) {
            data.push(rest.strip_prefix(' ').unwrap_or(rest));
            continue;
        }
        if ["event:", "id:", "retry:"]
            .iter()
            .any(|field| line.starts_with(field))
        {
            continue;
        }
        data.push(line);
    }
    if data.is_empty() {
        return None;
    }
    let payload = data.join("\n");
    if payload.trim().is_empty() {
        None
    } else {
        Some(payload)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    Progress {
        message: Option<String>,
        rate_limit: Option<String>,
    },
    Failed(String),
    Finished(Box<ResultPayload>),
}

impl StreamEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamEvent::Failed(_) | StreamEvent::Finished(_))
    }
}

#[derive(Debug, Deserialize)]
struct RawFrame {
    #[serde(default)]
    progress: Option<String>,
    #[serde(default)]
    rate_limit: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    result: Option<ResultPayload>,
}

pub fn parse_frame(payload: &str) -> Result<StreamEvent> {
    let raw: RawFrame =
        serde_json::from_str(payload.trim()).context("invalid stream frame json")?;
    if let Some(error) = non_empty(raw.error) {
        return Ok(StreamEvent::Failed(error));
    }
    if let Some(result) = raw.result {
        return Ok(StreamEvent::Finished(Box::new(result)));
    }
    Ok(StreamEvent::Progress {
        message: non_empty(raw.progress),
        rate_limit: non_empty(raw.rate_limit),
    })
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
