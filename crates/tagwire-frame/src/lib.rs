//! Length-prefixed UTF-8 text framing.
//!
//! A tagwire connection carries one JSON document per frame:
//! - A 2-byte magic number ("TW") for stream synchronization
//! - A 4-byte little-endian payload length
//! - The payload, which must be valid UTF-8
//!
//! Readers hand out whole text messages; writers accept whole text messages.

pub mod codec;
pub mod error;
pub mod reader;
pub mod writer;

#[cfg(feature = "async")]
pub mod text_codec;

pub use codec::{decode_frame, encode_frame, FrameConfig, DEFAULT_MAX_PAYLOAD, HEADER_SIZE, MAGIC};
pub use error::{FrameError, Result};
pub use reader::FrameReader;
pub use writer::FrameWriter;

#[cfg(feature = "async")]
pub use text_codec::TextFrameCodec;
