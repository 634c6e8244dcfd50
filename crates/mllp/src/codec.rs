//! Frame codec.

use crate::{MllpError, CARRIAGE_RETURN, END_BLOCK, START_BLOCK};
use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

/// Encodes and decodes MLLP frames as message text.
///
/// Decoding buffers bytes until the end-of-block sequence arrives, drops everything up to and
/// including the start-of-block byte, and decodes the remainder as UTF-8 (invalid sequences are
/// replaced rather than rejected). A frame without a start byte is taken as-is.
#[derive(Clone, Copy, Debug, Default)]
pub struct MllpCodec;

impl MllpCodec {
    pub fn new() -> Self {
        Self
    }
}

fn find_end(buf: &[u8]) -> Option<usize> {
    buf.windows(2)
        .position(|w| w[0] == END_BLOCK && w[1] == CARRIAGE_RETURN)
}

impl Decoder for MllpCodec {
    type Item = String;
    type Error = MllpError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let Some(end) = find_end(src) else {
            return Ok(None);
        };

        let frame = src.split_to(end);
        src.advance(2);

        let body = match frame.iter().position(|b| *b == START_BLOCK) {
            Some(start) => &frame[start + 1..],
            None => &frame[..],
        };
        Ok(Some(String::from_utf8_lossy(body).into_owned()))
    }
}

impl Encoder<String> for MllpCodec {
    type Error = MllpError;

    fn encode(&mut self, item: String, dst: &mut BytesMut) -> Result<(), Self::Error> {
        dst.reserve(item.len() + 3);
        dst.put_u8(START_BLOCK);
        dst.put_slice(item.as_bytes());
        dst.put_u8(END_BLOCK);
        dst.put_u8(CARRIAGE_RETURN);
        Ok(())
    }
}
