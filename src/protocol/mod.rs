//! ## Wire codec for HME's self-describing primitive values.
//!
//! HME values are written and read as big-endian bytes — note this is the
//! opposite convention from some other binary protocols in this family, so
//! every primitive function here spells out `BE` rather than leaving it
//! implicit.
//!
//! Each function operates over anything implementing `std::io::Read` or
//! `std::io::Write`, which includes both real sockets and in-memory byte
//! slices — the same slice a decoded message's bytes are handed to the
//! event parser as.
//!
//! ## Reading a message
//!
//! - Read one complete message with [`framing::read_message`].
//! - Read `vint(evnum)`, `vint(resource_id)` from the front of it.
//! - Dispatch on `evnum` to read the rest of the payload (see
//!   [`crate::event`]).

pub use byteorder::{BigEndian as BE, ReadBytesExt, WriteBytesExt};
use std::io::{self, Read, Write};

pub mod framing;

/// Errors arising from decoding or encoding HME's wire format.
///
/// These are always local and always terminal for the session that hit
/// them — see `SessionError` for how they combine with transport-level
/// failures.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// A `vuint`/`vdata` length claimed more bytes than the input had left.
    #[error("truncated input: expected more bytes")]
    Truncated,
    /// A `string` payload's bytes were not valid UTF-8.
    #[error("string payload was not valid UTF-8")]
    BadString(#[source] std::string::FromUtf8Error),
    /// A chunk declared a length of `0xFFFF`, which is reserved.
    #[error("chunk length 0xFFFF is reserved")]
    BadChunk,
    /// The 8-byte handshake reply did not begin with `SBTV`.
    #[error("handshake magic did not match 'SBTV'")]
    BadMagic,
    /// A `dict` entry's tag byte was not 0, 1, or 2.
    #[error("dict tag byte {0} is not 0, 1, or 2")]
    BadDictTag(u8),
    /// Underlying I/O failure while decoding/encoding a value already in hand.
    #[error("I/O error")]
    Io(#[from] io::Error),
}

/// A `bool` is one byte, `0` or `1`.
pub fn read_bool<R: Read>(reader: &mut R) -> Result<bool, ProtocolError> {
    Ok(reader.read_u8()? != 0)
}

/// A `bool` is one byte, `0` or `1`.
pub fn write_bool<W: Write>(writer: &mut W, value: bool) -> Result<(), ProtocolError> {
    writer.write_u8(value as u8)?;
    Ok(())
}

/// Read a base-128 little-endian signed variable-length integer.
///
/// Bytes with the high bit clear are continuations; the terminating byte
/// has bit 7 set, bit 6 as the sign, and the low 6 bits as the top of the
/// magnitude.
pub fn read_vint<R: Read>(reader: &mut R) -> Result<i32, ProtocolError> {
    let mut value: i64 = 0;
    let mut shift = 0u32;
    loop {
        let byte = reader.read_u8()?;
        if byte & 0x80 == 0 {
            value += (byte as i64) << shift;
            shift += 7;
        } else {
            value += ((byte & 0x3f) as i64) << shift;
            if byte & 0x40 != 0 {
                value = -value;
            }
            return Ok(value as i32);
        }
    }
}

/// Canonical (no redundant continuation groups) encoding of a signed `vint`.
pub fn write_vint<W: Write>(writer: &mut W, value: i32) -> Result<(), ProtocolError> {
    let negative = value < 0;
    let mut magnitude = (value as i64).unsigned_abs();
    while magnitude > 0x3f {
        writer.write_u8((magnitude & 0x7f) as u8)?;
        magnitude >>= 7;
    }
    let mut terminator = magnitude as u8 | 0x80;
    if negative {
        terminator |= 0x40;
    }
    writer.write_u8(terminator)?;
    Ok(())
}

/// Read a base-128 little-endian unsigned variable-length integer.
pub fn read_vuint<R: Read>(reader: &mut R) -> Result<u32, ProtocolError> {
    let mut value: u64 = 0;
    let mut shift = 0u32;
    loop {
        let byte = reader.read_u8()?;
        if byte & 0x80 == 0 {
            value += (byte as u64) << shift;
            shift += 7;
        } else {
            value += ((byte & 0x7f) as u64) << shift;
            return Ok(value as u32);
        }
    }
}

/// Canonical encoding of an unsigned `vuint`.
pub fn write_vuint<W: Write>(writer: &mut W, value: u32) -> Result<(), ProtocolError> {
    let mut magnitude = value as u64;
    while magnitude >= 0x7f {
        writer.write_u8((magnitude & 0x7f) as u8)?;
        magnitude >>= 7;
    }
    writer.write_u8(magnitude as u8 | 0x80)?;
    Ok(())
}

/// IEEE-754 big-endian 32-bit float.
pub fn read_float<R: Read>(reader: &mut R) -> Result<f32, ProtocolError> {
    Ok(reader.read_f32::<BE>()?)
}

/// IEEE-754 big-endian 32-bit float.
pub fn write_float<W: Write>(writer: &mut W, value: f32) -> Result<(), ProtocolError> {
    writer.write_f32::<BE>(value)?;
    Ok(())
}

/// A `vuint` length followed by that many raw bytes.
pub fn read_vdata<R: Read>(reader: &mut R) -> Result<Vec<u8>, ProtocolError> {
    let len = read_vuint(reader)? as usize;
    let mut buf = vec![0u8; len];
    reader
        .read_exact(&mut buf)
        .map_err(|_| ProtocolError::Truncated)?;
    Ok(buf)
}

/// A `vuint` length followed by that many raw bytes.
pub fn write_vdata<W: Write>(writer: &mut W, bytes: &[u8]) -> Result<(), ProtocolError> {
    write_vuint(writer, bytes.len() as u32)?;
    writer.write_all(bytes)?;
    Ok(())
}

/// A `vdata` whose bytes must be UTF-8.
pub fn read_string<R: Read>(reader: &mut R) -> Result<String, ProtocolError> {
    let bytes = read_vdata(reader)?;
    String::from_utf8(bytes).map_err(ProtocolError::BadString)
}

/// A `vdata` of a string's UTF-8 bytes.
pub fn write_string<W: Write>(writer: &mut W, value: &str) -> Result<(), ProtocolError> {
    write_vdata(writer, value.as_bytes())
}

/// A value stored in a [`Dict`]: either a string or a nested dict.
#[derive(Clone, Debug, PartialEq)]
pub enum DictValue {
    Str(String),
    Dict(Dict),
}

/// An insertion-ordered mapping from string keys to lists of
/// string-or-dict values (`spec.md` §3).
///
/// Kept as a `Vec` of pairs rather than a map: dicts in practice carry a
/// handful of entries (transition params, init-info), so linear lookup is
/// simpler than pulling in a map crate, and it preserves insertion order
/// for free.
pub type Dict = Vec<(String, Vec<DictValue>)>;

/// Look up the first value under `key`, if any.
pub fn dict_get<'a>(dict: &'a Dict, key: &str) -> Option<&'a DictValue> {
    dict.iter()
        .find(|(k, _)| k == key)
        .and_then(|(_, values)| values.first())
}

/// Look up the first string value under `key`, if any.
pub fn dict_get_str<'a>(dict: &'a Dict, key: &str) -> Option<&'a str> {
    match dict_get(dict, key) {
        Some(DictValue::Str(s)) => Some(s.as_str()),
        _ => None,
    }
}

/// Encode a dict, sorting keys ascending at every nesting level (the wire
/// invariant the receiver relies on — `spec.md` §3, §4.1).
pub fn write_dict<W: Write>(writer: &mut W, dict: &Dict) -> Result<(), ProtocolError> {
    let mut sorted: Vec<&(String, Vec<DictValue>)> = dict.iter().collect();
    sorted.sort_by(|a, b| a.0.cmp(&b.0));
    for (key, values) in sorted {
        write_string(writer, key)?;
        for value in values {
            match value {
                DictValue::Str(s) => {
                    writer.write_u8(1)?;
                    write_string(writer, s)?;
                }
                DictValue::Dict(d) => {
                    writer.write_u8(2)?;
                    write_dict(writer, d)?;
                }
            }
        }
        writer.write_u8(0)?;
    }
    write_string(writer, "")?;
    Ok(())
}

/// Decode a dict. Any key order is accepted, per `spec.md` §4.1 — a dict
/// arriving out of order is logged, not rejected.
pub fn read_dict<R: Read>(reader: &mut R) -> Result<Dict, ProtocolError> {
    let mut dict = Dict::new();
    let mut last_key: Option<String> = None;
    loop {
        let key = read_string(reader)?;
        if key.is_empty() {
            break;
        }
        let mut values = Vec::new();
        loop {
            let tag = reader.read_u8()?;
            match tag {
                0 => break,
                1 => values.push(DictValue::Str(read_string(reader)?)),
                2 => values.push(DictValue::Dict(read_dict(reader)?)),
                other => return Err(ProtocolError::BadDictTag(other)),
            }
        }
        if let Some(prev) = &last_key {
            if key.as_str() < prev.as_str() {
                log::warn!("received dict with unsorted keys ({prev:?} before {key:?})");
            }
        }
        last_key = Some(key.clone());
        dict.push((key, values));
    }
    Ok(dict)
}

/// `pack_vint` operating on a whole value, for round-trip tests
/// (`spec.md` §8).
pub fn pack_vint(value: i32) -> Vec<u8> {
    let mut buf = Vec::new();
    write_vint(&mut buf, value).expect("writing to a Vec cannot fail");
    buf
}

/// Inverse of [`pack_vint`].
pub fn unpack_vint(bytes: &[u8]) -> Result<i32, ProtocolError> {
    let mut cursor = bytes;
    read_vint(&mut cursor)
}

/// `pack_vuint` operating on a whole value, for round-trip tests.
pub fn pack_vuint(value: u32) -> Vec<u8> {
    let mut buf = Vec::new();
    write_vuint(&mut buf, value).expect("writing to a Vec cannot fail");
    buf
}

/// Inverse of [`pack_vuint`].
pub fn unpack_vuint(bytes: &[u8]) -> Result<u32, ProtocolError> {
    let mut cursor = bytes;
    read_vuint(&mut cursor)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vint_seed_values() {
        assert_eq!(pack_vint(0), vec![0x80]);
        assert_eq!(pack_vint(-1), vec![0xC1]);
        assert_eq!(pack_vint(63), vec![0xBF]);
        assert_eq!(pack_vint(64), vec![0x40, 0x80]);
        for &v in &[0, -1, 63, 64] {
            assert_eq!(unpack_vint(&pack_vint(v)).unwrap(), v);
        }
    }

    #[test]
    fn vuint_seed_values() {
        assert_eq!(pack_vuint(0), vec![0x80]);
        assert_eq!(pack_vuint(127), vec![0x7F, 0x80]);
        assert_eq!(pack_vuint(128), vec![0x00, 0x81]);
        for &v in &[0, 127, 128] {
            assert_eq!(unpack_vuint(&pack_vuint(v)).unwrap(), v);
        }
    }

    #[test]
    fn vint_round_trips_full_range_sample() {
        for v in (-70_000i32..70_000).step_by(997) {
            assert_eq!(unpack_vint(&pack_vint(v)).unwrap(), v);
        }
        assert_eq!(unpack_vint(&pack_vint(i32::MIN + 1)).unwrap(), i32::MIN + 1);
        assert_eq!(unpack_vint(&pack_vint(i32::MAX)).unwrap(), i32::MAX);
    }

    #[test]
    fn vuint_round_trips_full_range_sample() {
        for v in (0u32..200_000).step_by(997) {
            assert_eq!(unpack_vuint(&pack_vuint(v)).unwrap(), v);
        }
        assert_eq!(unpack_vuint(&pack_vuint(u32::MAX)).unwrap(), u32::MAX);
    }

    #[test]
    fn truncated_vint_is_an_error() {
        // 0x01 has the high bit clear, so a terminator byte never arrives.
        let mut cursor: &[u8] = &[0x01];
        assert!(matches!(read_vint(&mut cursor), Err(ProtocolError::Io(_))));
    }

    #[test]
    fn string_round_trip() {
        let mut buf = Vec::new();
        write_string(&mut buf, "hello, \u{1F4FA}").unwrap();
        let mut cursor: &[u8] = &buf;
        assert_eq!(read_string(&mut cursor).unwrap(), "hello, \u{1F4FA}");
    }

    #[test]
    fn bad_string_is_rejected() {
        let mut buf = Vec::new();
        write_vdata(&mut buf, &[0xff, 0xfe]).unwrap();
        let mut cursor: &[u8] = &buf;
        assert!(matches!(
            read_string(&mut cursor),
            Err(ProtocolError::BadString(_))
        ));
    }

    #[test]
    fn dict_round_trip_and_key_sort() {
        let dict: Dict = vec![
            ("zeta".into(), vec![DictValue::Str("last".into())]),
            ("alpha".into(), vec![DictValue::Str("first".into())]),
            (
                "nested".into(),
                vec![DictValue::Dict(vec![(
                    "b".into(),
                    vec![DictValue::Str("x".into())],
                )])],
            ),
        ];
        let mut buf = Vec::new();
        write_dict(&mut buf, &dict).unwrap();

        // Keys must appear in ascending order on the wire.
        let mut cursor: &[u8] = &buf;
        let first_key = read_string(&mut cursor).unwrap();
        assert_eq!(first_key, "alpha");

        let mut cursor: &[u8] = &buf;
        let decoded = read_dict(&mut cursor).unwrap();
        assert_eq!(dict_get_str(&decoded, "alpha"), Some("first"));
        assert_eq!(dict_get_str(&decoded, "zeta"), Some("last"));
    }

    #[test]
    fn dict_accepts_unsorted_input() {
        // Hand-built out-of-order dict: "zeta" before "alpha".
        let mut buf = Vec::new();
        write_string(&mut buf, "zeta").unwrap();
        buf.push(1);
        write_string(&mut buf, "last").unwrap();
        buf.push(0);
        write_string(&mut buf, "alpha").unwrap();
        buf.push(1);
        write_string(&mut buf, "first").unwrap();
        buf.push(0);
        write_string(&mut buf, "").unwrap();

        let mut cursor: &[u8] = &buf;
        let decoded = read_dict(&mut cursor).unwrap();
        assert_eq!(dict_get_str(&decoded, "alpha"), Some("first"));
        assert_eq!(dict_get_str(&decoded, "zeta"), Some("last"));
    }
}
