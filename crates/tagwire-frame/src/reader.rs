use std::io::{ErrorKind, Read};

use bytes::BytesMut;
use tagwire_transport::{Stream, TransportError};

use crate::codec::{decode_frame, FrameConfig};
use crate::error::{FrameError, Result};

const INITIAL_BUFFER_CAPACITY: usize = 8 * 1024;
const READ_CHUNK_SIZE: usize = 8 * 1024;

/// Reads whole text messages from any `Read` stream.
///
/// Partial reads are buffered internally; callers always get complete
/// messages.
pub struct FrameReader<T> {
    inner: T,
    buf: BytesMut,
    config: FrameConfig,
}

impl<T: Read> FrameReader<T> {
    /// Create a reader with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a reader with explicit configuration.
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            config,
        }
    }

    /// Read the next complete text message (blocking).
    ///
    /// Returns `Err(FrameError::ConnectionClosed)` at EOF.
    pub fn read_text(&mut self) -> Result<String> {
        loop {
            if let Some(text) = decode_frame(&mut self.buf, self.config.max_payload_size)? {
                return Ok(text);
            }

            let mut chunk = [0u8; READ_CHUNK_SIZE];
            let read = match self.inner.read(&mut chunk) {
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            };

            if read == 0 {
                return Err(FrameError::ConnectionClosed);
            }

            self.buf.extend_from_slice(&chunk[..read]);
        }
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Consume the reader and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Current reader configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}

impl FrameReader<Stream> {
    /// Create a reader for a transport stream and apply the read timeout.
    pub fn for_stream(inner: Stream, config: FrameConfig) -> Result<Self> {
        inner
            .set_read_timeout(config.read_timeout)
            .map_err(transport_to_frame_error)?;
        Ok(Self::with_config(inner, config))
    }
}

pub(crate) fn transport_to_frame_error(err: TransportError) -> FrameError {
    match err {
        TransportError::Io(io) | TransportError::Accept(io) => FrameError::Io(io),
        TransportError::Bind { source, .. } | TransportError::Connect { source, .. } => {
            FrameError::Io(source)
        }
        other => FrameError::Io(std::io::Error::other(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use bytes::BufMut;

    use super::*;
    use crate::codec::{encode_frame, MAGIC};

    fn wire(messages: &[&str]) -> Vec<u8> {
        let mut buf = BytesMut::new();
        for message in messages {
            encode_frame(message, &mut buf).unwrap();
        }
        buf.to_vec()
    }

    #[test]
    fn reads_messages_in_order() {
        let mut reader = FrameReader::new(Cursor::new(wire(&["one", "two", "three"])));

        assert_eq!(reader.read_text().unwrap(), "one");
        assert_eq!(reader.read_text().unwrap(), "two");
        assert_eq!(reader.read_text().unwrap(), "three");
        assert!(matches!(
            reader.read_text(),
            Err(FrameError::ConnectionClosed)
        ));
    }

    #[test]
    fn reads_message_larger_than_chunk() {
        let big = "x".repeat(64 * 1024);
        let mut reader = FrameReader::new(Cursor::new(wire(&[&big])));
        assert_eq!(reader.read_text().unwrap().len(), big.len());
    }

    #[test]
    fn partial_reads_are_reassembled() {
        let reader = ByteByByteReader {
            bytes: wire(&[r#"{"s":1}"#]),
            pos: 0,
        };
        let mut reader = FrameReader::new(reader);
        assert_eq!(reader.read_text().unwrap(), r#"{"s":1}"#);
    }

    #[test]
    fn eof_mid_frame_is_connection_closed() {
        let mut partial = BytesMut::new();
        partial.put_slice(&MAGIC);
        partial.put_u32_le(16);
        partial.put_slice(b"only-part");

        let mut reader = FrameReader::new(Cursor::new(partial.to_vec()));
        assert!(matches!(
            reader.read_text(),
            Err(FrameError::ConnectionClosed)
        ));
    }

    #[test]
    fn oversized_frame_rejected() {
        let mut header = BytesMut::new();
        header.put_slice(&MAGIC);
        header.put_u32_le(1024);

        let config = FrameConfig {
            max_payload_size: 16,
            ..FrameConfig::default()
        };
        let mut reader = FrameReader::with_config(Cursor::new(header.to_vec()), config);
        assert!(matches!(
            reader.read_text(),
            Err(FrameError::PayloadTooLarge { size: 1024, max: 16 })
        ));
    }

    #[test]
    fn interrupted_read_retries() {
        let reader = InterruptedOnce {
            interrupted: false,
            inner: Cursor::new(wire(&["ok"])),
        };
        let mut reader = FrameReader::new(reader);
        assert_eq!(reader.read_text().unwrap(), "ok");
    }

    #[cfg(unix)]
    #[test]
    fn roundtrip_over_socket_pair() {
        let (left, right) = std::os::unix::net::UnixStream::pair().unwrap();
        let mut writer = crate::writer::FrameWriter::new(left);
        let mut reader = FrameReader::new(right);

        writer.send_text("ping").unwrap();
        writer.send_text("pong").unwrap();
        assert_eq!(reader.read_text().unwrap(), "ping");
        assert_eq!(reader.read_text().unwrap(), "pong");
    }

    struct ByteByByteReader {
        bytes: Vec<u8>,
        pos: usize,
    }

    impl Read for ByteByByteReader {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.pos >= self.bytes.len() || buf.is_empty() {
                return Ok(0);
            }
            buf[0] = self.bytes[self.pos];
            self.pos += 1;
            Ok(1)
        }
    }

    struct InterruptedOnce {
        interrupted: bool,
        inner: Cursor<Vec<u8>>,
    }

    impl Read for InterruptedOnce {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if !self.interrupted {
                self.interrupted = true;
                return Err(std::io::Error::from(ErrorKind::Interrupted));
            }
            self.inner.read(buf)
        }
    }
}
