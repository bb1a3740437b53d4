//! Big-endian wire primitives shared by the name, question, record and
//! message codecs.
//!
//! Packing appends to a `Vec<u8>` and returns the extended buffer; unpacking
//! reads at an offset and returns the value together with the offset of the
//! first byte after it.

use crate::error::{Error, Result};

// MAX_STRING_LEN is the longest `<character-string>` RFC 1035 permits: the
// length fits in a single prefix octet.
const MAX_STRING_LEN: usize = 255;

pub(crate) fn pack_uint8(mut msg: Vec<u8>, v: u8) -> Vec<u8> {
    msg.push(v);
    msg
}

pub(crate) fn pack_uint16(mut msg: Vec<u8>, v: u16) -> Vec<u8> {
    msg.extend_from_slice(&v.to_be_bytes());
    msg
}

pub(crate) fn pack_uint32(mut msg: Vec<u8>, v: u32) -> Vec<u8> {
    msg.extend_from_slice(&v.to_be_bytes());
    msg
}

pub(crate) fn pack_bytes(mut msg: Vec<u8>, b: &[u8]) -> Vec<u8> {
    msg.extend_from_slice(b);
    msg
}

// pack_str appends a length-prefixed `<character-string>`.
pub(crate) fn pack_str(msg: Vec<u8>, s: &str) -> Result<Vec<u8>> {
    if s.len() > MAX_STRING_LEN {
        return Err(Error::ErrStringTooLong);
    }
    let msg = pack_uint8(msg, s.len() as u8);
    Ok(pack_bytes(msg, s.as_bytes()))
}

pub(crate) fn unpack_uint8(msg: &[u8], off: usize) -> Result<(u8, usize)> {
    if off >= msg.len() {
        return Err(Error::ErrShortBuffer);
    }
    Ok((msg[off], off + 1))
}

pub(crate) fn unpack_uint16(msg: &[u8], off: usize) -> Result<(u16, usize)> {
    if off + 2 > msg.len() {
        return Err(Error::ErrShortBuffer);
    }
    Ok((u16::from_be_bytes([msg[off], msg[off + 1]]), off + 2))
}

pub(crate) fn unpack_uint32(msg: &[u8], off: usize) -> Result<(u32, usize)> {
    if off + 4 > msg.len() {
        return Err(Error::ErrShortBuffer);
    }
    Ok((
        u32::from_be_bytes([msg[off], msg[off + 1], msg[off + 2], msg[off + 3]]),
        off + 4,
    ))
}

pub(crate) fn unpack_bytes<'a>(msg: &'a [u8], off: usize, n: usize) -> Result<(&'a [u8], usize)> {
    if off + n > msg.len() {
        return Err(Error::ErrShortBuffer);
    }
    Ok((&msg[off..off + n], off + n))
}

// unpack_str reads a length-prefixed `<character-string>` and validates it as
// UTF-8.
pub(crate) fn unpack_str(msg: &[u8], off: usize) -> Result<(String, usize)> {
    let (len, off) = unpack_uint8(msg, off)?;
    let (bytes, off) = unpack_bytes(msg, off, len as usize)?;
    let s = std::str::from_utf8(bytes).map_err(|_| Error::ErrInvalidString)?;
    Ok((s.to_owned(), off))
}

