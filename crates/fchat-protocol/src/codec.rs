//! Codec trait and the line codec for `OPCODE [json]` frames.
//!
//! A "codec" converts between frames and the text that travels on the
//! socket. The rest of the client only talks to the [`Codec`] trait, so a
//! recording or fuzzing codec can be swapped in without touching the
//! connection code.

use serde_json::{Map, Value};

use crate::{Frame, Opcode, ProtocolError};

/// Length of every opcode on the wire.
pub const OPCODE_LEN: usize = 3;

/// Encodes outgoing commands and decodes incoming lines.
///
/// Both methods are pure: they never touch connection or roster state.
pub trait Codec: Send + Sync + 'static {
    /// Renders `opcode` and its optional body as one wire line.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if the payload can't be serialized.
    fn encode(
        &self,
        opcode: Opcode,
        payload: Option<&Value>,
    ) -> Result<String, ProtocolError>;

    /// Parses one wire line.
    ///
    /// Returns `Ok(None)` for lines too short to carry an opcode; those
    /// are ignored rather than treated as errors.
    ///
    /// # Errors
    /// Returns `ProtocolError::InvalidFrame` or `ProtocolError::Decode`
    /// when the line is malformed.
    fn decode(&self, line: &str) -> Result<Option<Frame>, ProtocolError>;
}

// ---------------------------------------------------------------------------
// LineCodec
// ---------------------------------------------------------------------------

/// The [`Codec`] for the chat protocol: a three-letter uppercase opcode,
/// optionally followed by a single space and a JSON document.
///
/// ## Example
///
/// ```rust
/// use fchat_protocol::{Codec, LineCodec, Opcode};
/// use serde_json::json;
///
/// let codec = LineCodec;
///
/// let line = codec
///     .encode(Opcode::Jch, Some(&json!({"channel": "Frontpage"})))
///     .unwrap();
/// assert_eq!(line, r#"JCH {"channel":"Frontpage"}"#);
///
/// let frame = codec.decode(&line).unwrap().unwrap();
/// assert_eq!(frame.command(), Some(Opcode::Jch));
/// assert_eq!(frame.payload["channel"], "Frontpage");
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct LineCodec;

impl Codec for LineCodec {
    fn encode(
        &self,
        opcode: Opcode,
        payload: Option<&Value>,
    ) -> Result<String, ProtocolError> {
        match payload {
            None => Ok(opcode.as_str().to_string()),
            Some(body) => {
                let json =
                    serde_json::to_string(body).map_err(ProtocolError::Encode)?;
                Ok(format!("{opcode} {json}"))
            }
        }
    }

    fn decode(&self, line: &str) -> Result<Option<Frame>, ProtocolError> {
        if line.chars().nth(OPCODE_LEN - 1).is_none() {
            return Ok(None);
        }

        // Checking bytes first also guarantees the split below lands on a
        // char boundary.
        let head = &line.as_bytes()[..OPCODE_LEN];
        if !head.iter().all(u8::is_ascii_uppercase) {
            return Err(ProtocolError::InvalidFrame(format!(
                "opcode must be three uppercase letters: {:?}",
                truncate(line)
            )));
        }
        let (opcode, rest) = line.split_at(OPCODE_LEN);

        if rest.is_empty() {
            return Ok(Some(Frame::new(opcode, Value::Object(Map::new()))));
        }

        let body = rest.strip_prefix(' ').ok_or_else(|| {
            ProtocolError::InvalidFrame(format!(
                "missing separator after {opcode}"
            ))
        })?;
        let payload: Value =
            serde_json::from_str(body).map_err(ProtocolError::Decode)?;

        Ok(Some(Frame::new(opcode, payload)))
    }
}

/// Keeps error messages readable when a huge line is malformed.
fn truncate(line: &str) -> &str {
    match line.char_indices().nth(32) {
        Some((idx, _)) => &line[..idx],
        None => line,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_encode_without_payload_is_bare_opcode() {
        assert_eq!(LineCodec.encode(Opcode::Pin, None).unwrap(), "PIN");
    }

    #[test]
    fn test_encode_with_payload_appends_json() {
        let line = LineCodec
            .encode(
                Opcode::Sta,
                Some(&json!({"status": "busy", "statusmsg": "brb"})),
            )
            .unwrap();
        assert!(line.starts_with("STA {"));
        let body: Value = serde_json::from_str(&line[4..]).unwrap();
        assert_eq!(body, json!({"status": "busy", "statusmsg": "brb"}));
    }

    #[test]
    fn test_decode_bare_opcode_has_empty_object_payload() {
        let frame = LineCodec.decode("PIN").unwrap().unwrap();
        assert_eq!(frame.opcode, "PIN");
        assert_eq!(frame.payload, json!({}));
    }

    #[test]
    fn test_decode_opcode_with_payload() {
        let frame = LineCodec
            .decode(r#"MSG {"channel":"Frontpage","message":"hi"}"#)
            .unwrap()
            .unwrap();
        assert_eq!(frame.opcode, "MSG");
        assert_eq!(
            frame.payload,
            json!({"channel": "Frontpage", "message": "hi"})
        );
    }

    #[test]
    fn test_decode_short_lines_are_ignored() {
        assert_eq!(LineCodec.decode("").unwrap(), None);
        assert_eq!(LineCodec.decode("PI").unwrap(), None);
        assert_eq!(LineCodec.decode("éa").unwrap(), None);
        assert_eq!(LineCodec.decode("€").unwrap(), None);
    }

    #[test]
    fn test_decode_malformed_json_is_decode_error() {
        let err = LineCodec.decode(r#"MSG {"channel":"#).unwrap_err();
        assert!(matches!(err, ProtocolError::Decode(_)));
    }

    #[test]
    fn test_decode_missing_separator_is_invalid_frame() {
        let err = LineCodec.decode(r#"MSG{"a":1}"#).unwrap_err();
        assert!(matches!(err, ProtocolError::InvalidFrame(_)));
    }

    #[test]
    fn test_decode_lowercase_opcode_is_invalid_frame() {
        let err = LineCodec.decode("pin").unwrap_err();
        assert!(matches!(err, ProtocolError::InvalidFrame(_)));
    }

    #[test]
    fn test_decode_multibyte_prefix_does_not_panic() {
        assert!(LineCodec.decode("é€x {}").is_err());
    }

    #[test]
    fn test_decode_unknown_opcode_still_decodes() {
        let frame = LineCodec.decode(r#"ZZZ {"x":1}"#).unwrap().unwrap();
        assert_eq!(frame.opcode, "ZZZ");
        assert_eq!(frame.command(), None);
    }
}
