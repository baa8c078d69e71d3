use bytes::{Buf, BufMut, BytesMut};
use tracing::debug;

use crate::error::{FrameError, Result};

/// Frame header: magic (2) + length (4) = 6 bytes.
pub const HEADER_SIZE: usize = 6;

/// Magic bytes: "TW" (0x54 0x57).
pub const MAGIC: [u8; 2] = [0x54, 0x57];

/// Default maximum payload size: 16 MiB.
pub const DEFAULT_MAX_PAYLOAD: usize = 16 * 1024 * 1024;

/// Encode one text message into the wire format.
///
/// ```text
/// ┌──────────────┬───────────┬────────────────────────┐
/// │ Magic (2B)   │ Length    │ Payload                │
/// │ 0x54 0x57    │ (4B LE)   │ (Length bytes, UTF-8)  │
/// └──────────────┴───────────┴────────────────────────┘
/// ```
pub fn encode_frame(text: &str, dst: &mut BytesMut) -> Result<()> {
    let len = u32::try_from(text.len()).map_err(|_| FrameError::PayloadTooLarge {
        size: text.len(),
        max: u32::MAX as usize,
    })?;
    dst.reserve(HEADER_SIZE + text.len());
    dst.put_slice(&MAGIC);
    dst.put_u32_le(len);
    dst.put_slice(text.as_bytes());
    Ok(())
}

/// Decode one text message from a buffer.
///
/// Returns `Ok(None)` if the buffer doesn't hold a complete frame yet.
/// On success, consumes the frame bytes from the buffer. A frame whose
/// payload is not UTF-8 is consumed and reported as
/// [`FrameError::InvalidUtf8`].
pub fn decode_frame(src: &mut BytesMut, max_payload: usize) -> Result<Option<String>> {
    if src.len() < HEADER_SIZE {
        return Ok(None);
    }

    if src[0..2] != MAGIC {
        debug!(found = ?&src[0..2], "frame header has bad magic");
        return Err(FrameError::InvalidMagic);
    }

    let payload_len = u32::from_le_bytes([src[2], src[3], src[4], src[5]]) as usize;
    if payload_len > max_payload {
        debug!(size = payload_len, max = max_payload, "frame exceeds payload limit");
        return Err(FrameError::PayloadTooLarge {
            size: payload_len,
            max: max_payload,
        });
    }

    if src.len() < HEADER_SIZE + payload_len {
        return Ok(None);
    }

    src.advance(HEADER_SIZE);
    let payload = src.split_to(payload_len);
    let text = std::str::from_utf8(&payload)?;
    Ok(Some(text.to_owned()))
}

/// Configuration for frame readers and writers.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Maximum payload size in bytes. Default: 16 MiB.
    pub max_payload_size: usize,
    /// Read timeout for blocking operations.
    pub read_timeout: Option<std::time::Duration>,
    /// Write timeout for blocking operations.
    pub write_timeout: Option<std::time::Duration>,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_payload_size: DEFAULT_MAX_PAYLOAD,
            read_timeout: None,
            write_timeout: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_layout() {
        let mut buf = BytesMut::new();
        encode_frame("{}", &mut buf).unwrap();
        assert_eq!(buf.as_ref(), &[0x54, 0x57, 2, 0, 0, 0, b'{', b'}']);
    }

    #[test]
    fn decode_complete_frame() {
        let mut buf = BytesMut::new();
        encode_frame(r#"{"n":"rf","p":"/tmp/x","s":1}"#, &mut buf).unwrap();

        let text = decode_frame(&mut buf, DEFAULT_MAX_PAYLOAD).unwrap().unwrap();
        assert_eq!(text, r#"{"n":"rf","p":"/tmp/x","s":1}"#);
        assert!(buf.is_empty());
    }

    #[test]
    fn decode_incomplete_header() {
        let mut buf = BytesMut::from(&[0x54, 0x57, 0x00][..]);
        assert!(decode_frame(&mut buf, DEFAULT_MAX_PAYLOAD).unwrap().is_none());
        assert_eq!(buf.len(), 3);
    }

    #[test]
    fn decode_incomplete_payload() {
        let mut buf = BytesMut::new();
        encode_frame("hello", &mut buf).unwrap();
        buf.truncate(HEADER_SIZE + 2);

        assert!(decode_frame(&mut buf, DEFAULT_MAX_PAYLOAD).unwrap().is_none());
    }

    #[test]
    fn decode_invalid_magic() {
        let mut buf = BytesMut::from(&[0xFF, 0xFF, 0x00, 0x00, 0x00, 0x00][..]);
        let result = decode_frame(&mut buf, DEFAULT_MAX_PAYLOAD);
        assert!(matches!(result, Err(FrameError::InvalidMagic)));
    }

    #[test]
    fn decode_payload_too_large() {
        let mut buf = BytesMut::new();
        buf.put_slice(&MAGIC);
        buf.put_u32_le(32 * 1024 * 1024);

        let result = decode_frame(&mut buf, DEFAULT_MAX_PAYLOAD);
        assert!(matches!(result, Err(FrameError::PayloadTooLarge { .. })));
    }

    #[test]
    fn decode_rejects_invalid_utf8_and_consumes_it() {
        let mut buf = BytesMut::new();
        buf.put_slice(&MAGIC);
        buf.put_u32_le(2);
        buf.put_slice(&[0xC3, 0x28]);
        encode_frame("next", &mut buf).unwrap();

        let result = decode_frame(&mut buf, DEFAULT_MAX_PAYLOAD);
        assert!(matches!(result, Err(FrameError::InvalidUtf8(_))));

        let next = decode_frame(&mut buf, DEFAULT_MAX_PAYLOAD).unwrap().unwrap();
        assert_eq!(next, "next");
    }

    #[test]
    fn back_to_back_frames() {
        let mut buf = BytesMut::new();
        encode_frame("first", &mut buf).unwrap();
        encode_frame("zweite – ünïcode", &mut buf).unwrap();

        assert_eq!(
            decode_frame(&mut buf, DEFAULT_MAX_PAYLOAD).unwrap().unwrap(),
            "first"
        );
        assert_eq!(
            decode_frame(&mut buf, DEFAULT_MAX_PAYLOAD).unwrap().unwrap(),
            "zweite – ünïcode"
        );
        assert!(buf.is_empty());
    }

    #[test]
    fn empty_message() {
        let mut buf = BytesMut::new();
        encode_frame("", &mut buf).unwrap();
        assert_eq!(
            decode_frame(&mut buf, DEFAULT_MAX_PAYLOAD).unwrap().unwrap(),
            ""
        );
    }
}
