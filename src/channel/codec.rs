//! Line framing for the process boundary
//!
//! Submission payloads are written to the worker as one JSON string literal
//! per line, so embedded newlines never break framing. Output events come
//! back as one tagged JSON object per line and are decoded exactly once,
//! here. Anything that fails to decode becomes [`OutputEvent::Malformed`].

use crate::error::Result;
use crate::models::OutputEvent;

/// Frame a submission payload as a single line (without the newline)
pub fn encode_payload_line(payload: &str) -> Result<String> {
    Ok(serde_json::to_string(payload)?)
}

/// Decode a framed submission payload
pub fn decode_payload_line(line: &str) -> Result<String> {
    Ok(serde_json::from_str(trim_line_ending(line))?)
}

/// Frame an output event as a single line (without the newline)
pub fn encode_event_line(event: &OutputEvent) -> Result<String> {
    Ok(serde_json::to_string(event)?)
}

/// Decode an output event line, falling back to `Malformed`
pub fn decode_event_line(line: &str) -> OutputEvent {
    let line = trim_line_ending(line);
    match serde_json::from_str::<OutputEvent>(line) {
        Ok(event) => event,
        Err(e) => {
            debug!("Malformed output event ({}): {:?}", e, line);
            OutputEvent::Malformed {
                raw: line.to_string(),
            }
        }
    }
}

fn trim_line_ending(line: &str) -> &str {
    line.strip_suffix('\n')
        .map(|rest| rest.strip_suffix('\r').unwrap_or(rest))
        .unwrap_or(line)
}
