use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};

use crate::codec::{decode_frame, encode_frame, DEFAULT_MAX_PAYLOAD};
use crate::error::{FrameError, Result};

/// `tokio_util` codec for text frames.
///
/// Same wire format as [`FrameReader`](crate::FrameReader) and
/// [`FrameWriter`](crate::FrameWriter), for use with `Framed`.
#[derive(Debug, Clone, Copy)]
pub struct TextFrameCodec {
    max_payload_size: usize,
}

impl TextFrameCodec {
    /// Codec with the default 16 MiB payload limit.
    pub fn new() -> Self {
        Self::with_max_payload(DEFAULT_MAX_PAYLOAD)
    }

    /// Codec with an explicit payload limit, applied in both directions.
    pub fn with_max_payload(max_payload_size: usize) -> Self {
        Self { max_payload_size }
    }
}

impl Default for TextFrameCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for TextFrameCodec {
    type Item = String;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<String>> {
        decode_frame(src, self.max_payload_size)
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<String>> {
        match self.decode(src)? {
            Some(text) => Ok(Some(text)),
            None if src.is_empty() => Ok(None),
            None => Err(FrameError::ConnectionClosed),
        }
    }
}

impl Encoder<String> for TextFrameCodec {
    type Error = FrameError;

    fn encode(&mut self, item: String, dst: &mut BytesMut) -> Result<()> {
        if item.len() > self.max_payload_size {
            return Err(FrameError::PayloadTooLarge {
                size: item.len(),
                max: self.max_payload_size,
            });
        }
        encode_frame(&item, dst)
    }
}

#[cfg(test)]
mod tests {
    use futures_util::{SinkExt, StreamExt};
    use tokio_util::codec::Framed;

    use super::*;

    #[tokio::test]
    async fn framed_roundtrip() {
        let (left, right) = tokio::io::duplex(1024);
        let mut left = Framed::new(left, TextFrameCodec::new());
        let mut right = Framed::new(right, TextFrameCodec::new());

        left.send(r#"{"n":"gsi","p":null,"s":9}"#.to_string())
            .await
            .unwrap();
        let received = right.next().await.unwrap().unwrap();
        assert_eq!(received, r#"{"n":"gsi","p":null,"s":9}"#);
    }

    #[tokio::test]
    async fn truncated_stream_is_connection_closed() {
        let (mut left, right) = tokio::io::duplex(64);
        tokio::io::AsyncWriteExt::write_all(&mut left, &[0x54, 0x57, 9, 0, 0, 0, b'{'])
            .await
            .unwrap();
        drop(left);

        let mut right = Framed::new(right, TextFrameCodec::new());
        let result = right.next().await.unwrap();
        assert!(matches!(result, Err(FrameError::ConnectionClosed)));
    }

    #[test]
    fn encoder_enforces_limit() {
        let mut codec = TextFrameCodec::with_max_payload(2);
        let mut dst = BytesMut::new();
        let err = codec.encode("abc".to_string(), &mut dst).unwrap_err();
        assert!(matches!(err, FrameError::PayloadTooLarge { .. }));
    }
}
