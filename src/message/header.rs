//! The 12-octet DNS message header.

use std::fmt;

use crate::error::Result;
use crate::message::packer::*;
use crate::message::{OpCode, RCode};

// HEADER_LEN is the length (in bytes) of a DNS header: six uint16s, no
// padding.
pub(crate) const HEADER_LEN: usize = 12;

const HEADER_BIT_QR: u16 = 1 << 15; // query/response (response=1)
const HEADER_BIT_AA: u16 = 1 << 10; // authoritative
const HEADER_BIT_TC: u16 = 1 << 9; // truncated
const HEADER_BIT_RD: u16 = 1 << 8; // recursion desired
const HEADER_BIT_RA: u16 = 1 << 7; // recursion available

const OPCODE_SHIFT: u16 = 11;
const OPCODE_MASK: u16 = 0xF;
const RCODE_MASK: u16 = 0xF;

/// Flags and id of a DNS message. The four section counts are derived from
/// the section lengths at pack time and live in [`SectionCounts`] while
/// decoding.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
pub struct Header {
    pub id: u16,
    pub response: bool,
    pub op_code: OpCode,
    pub authoritative: bool,
    pub truncated: bool,
    pub recursion_desired: bool,
    pub recursion_available: bool,
    pub rcode: RCode,
}

#[derive(Clone, Copy, Default, Debug)]
pub(crate) struct SectionCounts {
    pub(crate) questions: u16,
    pub(crate) answers: u16,
    pub(crate) authorities: u16,
    pub(crate) additionals: u16,
}

impl Header {
    fn bits(&self) -> u16 {
        let mut bits = (self.op_code & OPCODE_MASK) << OPCODE_SHIFT | self.rcode as u16;
        if self.response {
            bits |= HEADER_BIT_QR;
        }
        if self.authoritative {
            bits |= HEADER_BIT_AA;
        }
        if self.truncated {
            bits |= HEADER_BIT_TC;
        }
        if self.recursion_desired {
            bits |= HEADER_BIT_RD;
        }
        if self.recursion_available {
            bits |= HEADER_BIT_RA;
        }
        bits
    }

    // pack appends the wire format of the header to msg.
    pub(crate) fn pack(&self, mut msg: Vec<u8>, counts: SectionCounts) -> Vec<u8> {
        msg = pack_uint16(msg, self.id);
        msg = pack_uint16(msg, self.bits());
        msg = pack_uint16(msg, counts.questions);
        msg = pack_uint16(msg, counts.answers);
        msg = pack_uint16(msg, counts.authorities);
        pack_uint16(msg, counts.additionals)
    }

    pub(crate) fn unpack(msg: &[u8], off: usize) -> Result<(Header, SectionCounts, usize)> {
        let (id, off) = unpack_uint16(msg, off)?;
        let (bits, off) = unpack_uint16(msg, off)?;
        let (questions, off) = unpack_uint16(msg, off)?;
        let (answers, off) = unpack_uint16(msg, off)?;
        let (authorities, off) = unpack_uint16(msg, off)?;
        let (additionals, off) = unpack_uint16(msg, off)?;

        let header = Header {
            id,
            response: bits & HEADER_BIT_QR != 0,
            op_code: (bits >> OPCODE_SHIFT) & OPCODE_MASK,
            authoritative: bits & HEADER_BIT_AA != 0,
            truncated: bits & HEADER_BIT_TC != 0,
            recursion_desired: bits & HEADER_BIT_RD != 0,
            recursion_available: bits & HEADER_BIT_RA != 0,
            rcode: RCode::from((bits & RCODE_MASK) as u8),
        };
        let counts = SectionCounts {
            questions,
            answers,
            authorities,
            additionals,
        };
        Ok((header, counts, off))
    }
}

impl fmt::Display for Header {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Header{{id: {}, response: {}, op_code: {}, authoritative: {}, truncated: {}, recursion_desired: {}, recursion_available: {}, rcode: {}}}",
            self.id,
            self.response,
            self.op_code,
            self.authoritative,
            self.truncated,
            self.recursion_desired,
            self.recursion_available,
            self.rcode,
        )
    }
}
