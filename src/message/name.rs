//! Domain names as label sequences, with RFC 1035 §4.1.4 compression on
//! encode and pointer-following decode.

use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::message::packer::*;

// MAX_LABEL_LEN is the longest single label RFC 1035 permits.
const MAX_LABEL_LEN: usize = 63;

// MAX_NAME_LEN caps the encoded form, length prefixes and terminator
// included.
const MAX_NAME_LEN: usize = 255;

// MAX_POINTER_HOPS bounds pointer chases during decoding; any legitimate
// name terminates far earlier, so exceeding it means a loop.
const MAX_POINTER_HOPS: usize = 128;

// The largest offset a 14-bit compression pointer can address.
const MAX_POINTER_OFFSET: usize = 0x3FFF;

/// A DNS domain name: an ordered sequence of labels.
///
/// The empty sequence is the root. Labels are immutable once constructed and
/// each is limited to 63 octets; the encoded form is limited to 255 octets.
/// Equality and hashing fold ASCII letters, so `MyHost.local.` and
/// `myhost.LOCAL.` are the same name; the stored spelling is preserved.
#[derive(Clone, Debug, Default, Eq)]
pub struct Name {
    labels: Vec<String>,
}

impl Name {
    /// Parses a dot-separated name. A trailing dot is accepted and ignored;
    /// `""` and `"."` produce the root name.
    pub fn new(s: &str) -> Result<Self> {
        let s = s.strip_suffix('.').unwrap_or(s);
        if s.is_empty() {
            return Ok(Name::root());
        }
        Self::from_labels(s.split('.').map(str::to_owned).collect())
    }

    /// Builds a name from pre-split labels, validating the RFC 1035 limits.
    pub fn from_labels(labels: Vec<String>) -> Result<Self> {
        for label in &labels {
            if label.is_empty() {
                return Err(Error::ErrEmptyLabel);
            }
            if label.len() > MAX_LABEL_LEN {
                return Err(Error::ErrLabelTooLong);
            }
        }
        let name = Name { labels };
        if name.encoded_len() > MAX_NAME_LEN {
            return Err(Error::ErrNameTooLong);
        }
        Ok(name)
    }

    /// The root name (zero labels).
    pub fn root() -> Self {
        Name { labels: Vec::new() }
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn is_root(&self) -> bool {
        self.labels.is_empty()
    }

    /// Length of the uncompressed encoding: one prefix octet per label plus
    /// the terminator.
    pub fn encoded_len(&self) -> usize {
        self.labels.iter().map(|l| 1 + l.len()).sum::<usize>() + 1
    }

    /// Whether `suffix`'s labels are the tail of this name (case-folded).
    pub fn ends_with(&self, suffix: &Name) -> bool {
        if suffix.labels.len() > self.labels.len() {
            return false;
        }
        let skip = self.labels.len() - suffix.labels.len();
        self.labels[skip..]
            .iter()
            .zip(&suffix.labels)
            .all(|(a, b)| a.eq_ignore_ascii_case(b))
    }

    // Case-folded map key for the label tail starting at `from`.
    fn suffix_key(labels: &[String]) -> String {
        let mut key = String::with_capacity(labels.iter().map(|l| l.len() + 1).sum());
        for label in labels {
            for b in label.bytes() {
                key.push(b.to_ascii_lowercase() as char);
            }
            key.push('.');
        }
        key
    }

    // pack appends the wire format of the name to msg.
    //
    // For each remaining tail of the label sequence the compression map is
    // consulted first; on a hit a 2-octet pointer ends the name. Otherwise
    // the tail's offset is registered (while it still fits in 14 bits) and
    // the head label is written out. Passing `None` disables compression,
    // which SRV targets require on output.
    pub(crate) fn pack(
        &self,
        mut msg: Vec<u8>,
        compression: &mut Option<HashMap<String, usize>>,
        compression_off: usize,
    ) -> Result<Vec<u8>> {
        for i in 0..self.labels.len() {
            let key = Self::suffix_key(&self.labels[i..]);
            if let Some(map) = compression.as_ref() {
                if let Some(&off) = map.get(&key) {
                    return Ok(pack_uint16(msg, 0xC000 | off as u16));
                }
            }
            let off = msg.len() - compression_off;
            if off < MAX_POINTER_OFFSET {
                if let Some(map) = compression.as_mut() {
                    map.insert(key, off);
                }
            }
            let label = &self.labels[i];
            msg = pack_uint8(msg, label.len() as u8);
            msg = pack_bytes(msg, label.as_bytes());
        }
        Ok(pack_uint8(msg, 0))
    }

    // unpack decodes a name starting at `off`, following compression
    // pointers. The returned offset is the first byte after the name at the
    // *starting* position: once the first pointer is taken the outer cursor
    // no longer advances.
    pub(crate) fn unpack(msg: &[u8], off: usize) -> Result<(Name, usize)> {
        let mut labels = Vec::new();
        let mut curr = off;
        let mut new_off = off;
        let mut ptr_taken = false;
        let mut hops = 0;

        loop {
            if curr >= msg.len() {
                return Err(Error::ErrShortBuffer);
            }
            let c = msg[curr];
            match c & 0xC0 {
                0x00 => {
                    if c == 0 {
                        if !ptr_taken {
                            new_off = curr + 1;
                        }
                        return Ok((Name::from_labels(labels)?, new_off));
                    }
                    let len = c as usize;
                    if curr + 1 + len > msg.len() {
                        return Err(Error::ErrShortBuffer);
                    }
                    let label = std::str::from_utf8(&msg[curr + 1..curr + 1 + len])
                        .map_err(|_| Error::ErrInvalidString)?;
                    labels.push(label.to_owned());
                    curr += 1 + len;
                }
                0xC0 => {
                    if curr + 1 >= msg.len() {
                        return Err(Error::ErrShortBuffer);
                    }
                    let target = (((c & 0x3F) as usize) << 8) | msg[curr + 1] as usize;
                    if !ptr_taken {
                        new_off = curr + 2;
                        ptr_taken = true;
                    }
                    hops += 1;
                    if hops > MAX_POINTER_HOPS {
                        return Err(Error::ErrTooManyPointers);
                    }
                    if target >= msg.len() {
                        return Err(Error::ErrInvalidPointer);
                    }
                    curr = target;
                }
                // 0x40 and 0x80 are reserved label types.
                _ => return Err(Error::ErrReservedLabelType),
            }
        }
    }

}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.labels.is_empty() {
            return write!(f, ".");
        }
        for label in &self.labels {
            write!(f, "{label}.")?;
        }
        Ok(())
    }
}

impl FromStr for Name {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Name::new(s)
    }
}

impl PartialEq for Name {
    fn eq(&self, other: &Self) -> bool {
        self.labels.len() == other.labels.len()
            && self
                .labels
                .iter()
                .zip(&other.labels)
                .all(|(a, b)| a.eq_ignore_ascii_case(b))
    }
}

impl Hash for Name {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for label in &self.labels {
            for b in label.bytes() {
                state.write_u8(b.to_ascii_lowercase());
            }
            // Label boundary, so ["ab","c"] and ["a","bc"] hash apart.
            state.write_u8(0);
        }
    }
}
