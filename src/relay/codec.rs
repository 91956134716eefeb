/// Relay wire codec — frames a TCP byte stream into command frames.
///
/// Wire format: `<1 command byte><UTF-8 payload>\n`. Splits inbound bytes on
/// `\n` and serializes outbound frames with the newline terminator, prefixing
/// the payload with `server:` for server-authored frames. A bare newline
/// decodes to a zero-payload frame — the disconnect sentinel the supervisor
/// acts on.
use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use super::command::Command;
use super::frame::Frame;

/// Maximum frame length (including the terminator). Nothing in the chat
/// protocol comes close; this only bounds buffering for a peer that never
/// sends a newline.
const MAX_FRAME_LENGTH: usize = 8192;

/// Prefix written before server-authored payloads.
const SERVER_PREFIX: &str = "server:";

/// Codec error: either an over-long frame or an I/O error.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("frame exceeds maximum length ({MAX_FRAME_LENGTH} bytes)")]
    FrameTooLong,
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// One outbound frame plus its authorship flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outbound {
    pub frame: Frame,
    pub from_server: bool,
}

impl Outbound {
    /// A client frame forwarded verbatim.
    pub fn relay(frame: Frame) -> Self {
        Self {
            frame,
            from_server: false,
        }
    }

    /// A server-authored frame; the payload gets the `server:` prefix.
    pub fn server(command: Command, payload: impl Into<String>) -> Self {
        Self {
            frame: Frame::new(command, payload),
            from_server: true,
        }
    }
}

/// A tokio codec that frames relay commands on `\n` boundaries.
#[derive(Debug, Default)]
pub struct RelayCodec;

impl Decoder for RelayCodec {
    type Item = Frame;
    type Error = CodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let Some(pos) = src.iter().position(|b| *b == b'\n') else {
            // No complete frame yet. Check if the buffer is getting too large.
            if src.len() > MAX_FRAME_LENGTH {
                return Err(CodecError::FrameTooLong);
            }
            return Ok(None);
        };

        // Extract the line (without \n), advance the buffer.
        let line = src.split_to(pos);
        src.advance(1);

        // A bare newline carries no command byte; yield a zero-payload
        // frame so the supervisor treats it as a hang-up.
        if line.is_empty() {
            return Ok(Some(Frame {
                code: 0,
                payload: String::new(),
            }));
        }

        let code = line[0];
        let payload = std::str::from_utf8(&line[1..])
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?
            .to_owned();

        Ok(Some(Frame { code, payload }))
    }
}

impl Encoder<Outbound> for RelayCodec {
    type Error = CodecError;

    fn encode(&mut self, item: Outbound, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let prefix = if item.from_server { SERVER_PREFIX } else { "" };
        dst.reserve(1 + prefix.len() + item.frame.payload.len() + 1);
        dst.put_u8(item.frame.code);
        dst.put_slice(prefix.as_bytes());
        dst.put_slice(item.frame.payload.as_bytes());
        dst.put_u8(b'\n');
        Ok(())
    }
}
