//! ## Chunked framing (`spec.md` §4.2).
//!
//! A message is a sequence of chunks — `<u16-be length><length bytes>` —
//! terminated by a zero-length chunk. No chunk may claim a length greater
//! than `0xFFFE`; `0xFFFF` is reserved and is always a protocol error.

use super::{ProtocolError, BE};
use byteorder::{ReadBytesExt, WriteBytesExt};
use std::io::{self, Read, Write};

/// Chunks are capped at this many payload bytes; `write_message` splits
/// longer payloads across multiple chunks.
pub const MAX_CHUNK_LEN: usize = 0xFFFE;

/// Read one complete message by concatenating chunk payloads until a
/// zero-length chunk.
///
/// Returns `Ok(None)` on a short read or clean EOF (the receiver closed the
/// stream) — per `spec.md` §4.2 this is not an error, just end-of-stream.
/// A chunk length of `0xFFFF` is the one condition that is always an
/// error, since it can never appear on a well-formed stream.
pub fn read_message<R: Read>(reader: &mut R) -> Result<Option<Vec<u8>>, ProtocolError> {
    let mut message = Vec::new();
    loop {
        let len = match reader.read_u16::<BE>() {
            Ok(len) => len,
            Err(_) => return Ok(None),
        };
        if len == 0xFFFF {
            return Err(ProtocolError::BadChunk);
        }
        if len == 0 {
            return Ok(Some(message));
        }
        let start = message.len();
        message.resize(start + len as usize, 0);
        if reader.read_exact(&mut message[start..]).is_err() {
            return Ok(None);
        }
    }
}

/// Split `payload` into chunks of at most [`MAX_CHUNK_LEN`] bytes, write
/// each length-prefixed, then a zero-length terminator.
///
/// A partial write here is not recoverable (`spec.md` §4.2): the caller
/// must treat any `Err` as terminal for the session.
pub fn write_message<W: Write>(writer: &mut W, payload: &[u8]) -> io::Result<()> {
    for chunk in payload.chunks(MAX_CHUNK_LEN) {
        writer.write_u16::<BE>(chunk.len() as u16)?;
        writer.write_all(chunk)?;
    }
    writer.write_u16::<BE>(0)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn round_trips_small_payload() {
        let payload = b"hello HME".to_vec();
        let mut buf = Vec::new();
        write_message(&mut buf, &payload).unwrap();
        let mut cursor = Cursor::new(buf);
        let decoded = read_message(&mut cursor).unwrap().unwrap();
        assert_eq!(decoded, payload);
    }

    #[test]
    fn chunks_a_70000_byte_payload_into_three_chunks() {
        let payload = vec![0u8; 70_000];
        let mut buf = Vec::new();
        write_message(&mut buf, &payload).unwrap();

        let first_len = u16::from_be_bytes([buf[0], buf[1]]) as usize;
        let second_off = 2 + first_len;
        let second_len =
            u16::from_be_bytes([buf[second_off], buf[second_off + 1]]) as usize;
        let third_off = second_off + 2 + second_len;
        let third_len = u16::from_be_bytes([buf[third_off], buf[third_off + 1]]) as usize;
        let terminator_off = third_off + 2 + third_len;

        assert_eq!(first_len, MAX_CHUNK_LEN);
        assert_eq!(second_len, MAX_CHUNK_LEN);
        assert_eq!(third_len, 70_000 - 2 * MAX_CHUNK_LEN);
        assert_eq!(&buf[terminator_off..terminator_off + 2], &[0, 0]);

        let mut cursor = Cursor::new(buf);
        let decoded = read_message(&mut cursor).unwrap().unwrap();
        assert_eq!(decoded, payload);
    }

    #[test]
    fn reserved_length_is_an_error() {
        let mut buf = Vec::new();
        buf.write_u16::<BE>(0xFFFF).unwrap();
        let mut cursor = Cursor::new(buf);
        assert!(matches!(
            read_message(&mut cursor),
            Err(ProtocolError::BadChunk)
        ));
    }

    #[test]
    fn clean_eof_before_any_chunk_is_none() {
        let mut cursor = Cursor::new(Vec::<u8>::new());
        assert!(read_message(&mut cursor).unwrap().is_none());
    }

    #[test]
    fn short_read_mid_message_is_none() {
        // Claims a 10-byte chunk but only supplies 3.
        let mut buf = Vec::new();
        buf.write_u16::<BE>(10).unwrap();
        buf.extend_from_slice(b"abc");
        let mut cursor = Cursor::new(buf);
        assert!(read_message(&mut cursor).unwrap().is_none());
    }

    #[test]
    fn empty_message_is_just_the_terminator() {
        let mut buf = Vec::new();
        write_message(&mut buf, &[]).unwrap();
        assert_eq!(buf, vec![0, 0]);
    }
}
