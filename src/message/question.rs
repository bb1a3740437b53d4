use std::collections::HashMap;
use std::fmt;

use crate::error::{Error, Result};
use crate::message::name::Name;
use crate::message::packer::*;
use crate::message::{DnsClass, DnsType, CLASS_MASK, MDNS_CLASS_FLAG};

/// A DNS question.
///
/// `unicast_response` is the mDNS QU flag, carried in the high bit of the
/// wire-format class field; `class` holds the low 15 bits.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Question {
    pub name: Name,
    pub typ: DnsType,
    pub class: DnsClass,
    pub unicast_response: bool,
}

impl Question {
    pub fn new(name: Name, typ: DnsType, class: DnsClass, unicast_response: bool) -> Self {
        Question {
            name,
            typ,
            class,
            unicast_response,
        }
    }

    // pack appends the wire format of the question to msg.
    pub(crate) fn pack(
        &self,
        mut msg: Vec<u8>,
        compression: &mut Option<HashMap<String, usize>>,
        compression_off: usize,
    ) -> Result<Vec<u8>> {
        msg = self.name.pack(msg, compression, compression_off)?;
        msg = pack_uint16(msg, self.typ as u16);
        let mut class_bits = self.class.0 & CLASS_MASK;
        if self.unicast_response {
            class_bits |= MDNS_CLASS_FLAG;
        }
        Ok(pack_uint16(msg, class_bits))
    }

    pub(crate) fn unpack(msg: &[u8], off: usize) -> Result<(Question, usize)> {
        let (name, off) = Name::unpack(msg, off)?;
        let (typ_code, off) = unpack_uint16(msg, off)?;
        let typ = DnsType::from(typ_code);
        if typ == DnsType::Unsupported {
            return Err(Error::ErrUnsupportedQuestionType);
        }
        let (class_bits, off) = unpack_uint16(msg, off)?;
        Ok((
            Question {
                name,
                typ,
                class: DnsClass(class_bits & CLASS_MASK),
                unicast_response: class_bits & MDNS_CLASS_FLAG != 0,
            },
            off,
        ))
    }
}

impl fmt::Display for Question {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Question{{name: {}, type: {}, class: {}, unicast_response: {}}}",
            self.name, self.typ, self.class, self.unicast_response
        )
    }
}
