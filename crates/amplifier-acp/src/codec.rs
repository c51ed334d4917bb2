//! Line framing shared by all three transports: UTF-8 + BOM-tolerant on the
//! way in, strict single-line JSON on the way out.

use crate::error::{AcpError, AcpResult};
use amplifier_types::JsonRpcFrame;

const BOM: &str = "\u{feff}";

/// Strip a leading UTF-8 BOM if present, then parse one JSON-RPC frame.
///
/// Parse failures map to `-32700` per the processor contract; callers still
/// need the raw bytes to reply, since a parse failure has no `id`.
pub fn decode_frame(line: &str) -> AcpResult<JsonRpcFrame> {
    let trimmed = line.strip_prefix(BOM).unwrap_or(line);
    serde_json::from_str(trimmed).map_err(|e| AcpError::Parse(e.to_string()))
}

/// Serialize a frame as a single line with no embedded raw newlines.
/// `serde_json::to_string` already escapes `\n` inside string values, so the
/// only invariant to enforce here is "don't pretty-print".
pub fn encode_frame(frame: &JsonRpcFrame) -> AcpResult<String> {
    let text = serde_json::to_string(frame)?;
    debug_assert!(!text.contains('\n'), "encoded frame must not contain a raw newline");
    Ok(text)
}

/// Append the frame terminator used by the stdio and WebSocket transports.
pub fn encode_frame_line(frame: &JsonRpcFrame) -> AcpResult<String> {
    let mut text = encode_frame(frame)?;
    text.push('\n');
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_with_and_without_bom() {
        let frame = JsonRpcFrame::request(json!(1), "initialize", None);
        let plain = encode_frame(&frame).unwrap();
        let with_bom = format!("{BOM}{plain}");
        assert!(decode_frame(&plain).is_ok());
        assert!(decode_frame(&with_bom).is_ok());
    }

    #[test]
    fn parse_failure_maps_to_parse_error() {
        let err = decode_frame("{not json").unwrap_err();
        assert_eq!(err.code(), -32700);
    }

    #[test]
    fn embedded_newlines_survive_as_escapes() {
        let frame = JsonRpcFrame::notification("session/update", Some(json!({"text": "line1\nline2\r\ttab"})));
        let line = encode_frame_line(&frame).unwrap();
        assert_eq!(line.matches('\n').count(), 1, "only the trailing terminator");
        let decoded = decode_frame(line.trim_end()).unwrap();
        assert_eq!(decoded.params.unwrap()["text"], "line1\nline2\r\ttab");
    }

    #[test]
    fn roundtrips_unicode_including_non_bmp() {
        let text = "caf\u{e9} \u{1f600}";
        let frame = JsonRpcFrame::notification("x", Some(json!({"text": text})));
        let line = encode_frame_line(&frame).unwrap();
        let decoded = decode_frame(line.trim_end()).unwrap();
        assert_eq!(decoded.params.unwrap()["text"], text);
    }
}
