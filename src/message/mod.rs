//! DNS message formats: RFC 1035 wire codec with the mDNS extensions of
//! RFC 6762 (QU / cache-flush class bits, id 0, goodbye records).


pub(crate) mod header;
pub(crate) mod name;
mod packer;
pub(crate) mod question;
pub(crate) mod record;

use std::collections::HashMap;
use std::fmt;

use crate::error::{Error, Result};
use header::{Header, SectionCounts, HEADER_LEN};
use name::Name;
use question::Question;
use record::Record;

/// A type of DNS request and response.
#[derive(Default, Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum DnsType {
    A = 1,
    Ptr = 12,
    Hinfo = 13,
    Txt = 16,
    Aaaa = 28,
    Srv = 33,
    Nsec = 47,
    // question.Type only
    Any = 255,

    #[default]
    Unsupported = 0,
}

impl From<u16> for DnsType {
    fn from(v: u16) -> Self {
        match v {
            1 => DnsType::A,
            12 => DnsType::Ptr,
            13 => DnsType::Hinfo,
            16 => DnsType::Txt,
            28 => DnsType::Aaaa,
            33 => DnsType::Srv,
            47 => DnsType::Nsec,
            255 => DnsType::Any,
            _ => DnsType::Unsupported,
        }
    }
}

impl fmt::Display for DnsType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match *self {
            DnsType::A => "A",
            DnsType::Ptr => "PTR",
            DnsType::Hinfo => "HINFO",
            DnsType::Txt => "TXT",
            DnsType::Aaaa => "AAAA",
            DnsType::Srv => "SRV",
            DnsType::Nsec => "NSEC",
            DnsType::Any => "ANY",
            _ => "Unsupported",
        };
        write!(f, "{s}")
    }
}

/// A class of network. Only the low 15 bits are the class proper; the wire
/// high bit is the mDNS QU flag on questions and the cache-flush flag on
/// records, and is split off during decoding.
#[derive(Default, Copy, Clone, Debug, PartialEq, Eq)]
pub struct DnsClass(pub u16);

/// Internet class (IN), the class of effectively all mDNS traffic.
pub const DNSCLASS_INET: DnsClass = DnsClass(1);

/// Any class (*), valid in questions only.
pub const DNSCLASS_ANY: DnsClass = DnsClass(255);

// The low 15 bits of the wire-format class field.
pub(crate) const CLASS_MASK: u16 = 0x7FFF;

// The mDNS flag bit: QU on questions, cache-flush on records.
pub(crate) const MDNS_CLASS_FLAG: u16 = 0x8000;

impl fmt::Display for DnsClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            DNSCLASS_INET => write!(f, "ClassINET"),
            DNSCLASS_ANY => write!(f, "ClassANY"),
            DnsClass(other) => write!(f, "{other}"),
        }
    }
}

/// A DNS operation code.
pub type OpCode = u16;

/// Standard query.
pub const OPCODE_QUERY: OpCode = 0;

/// A DNS response status code.
#[derive(Default, Copy, Clone, Debug, PartialEq, Eq)]
pub enum RCode {
    #[default]
    Success = 0,
    FormatError = 1,
    ServerFailure = 2,
    NameError = 3,
    NotImplemented = 4,
    Refused = 5,
    Unsupported,
}

impl From<u8> for RCode {
    fn from(v: u8) -> Self {
        match v {
            0 => RCode::Success,
            1 => RCode::FormatError,
            2 => RCode::ServerFailure,
            3 => RCode::NameError,
            4 => RCode::NotImplemented,
            5 => RCode::Refused,
            _ => RCode::Unsupported,
        }
    }
}

impl fmt::Display for RCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match *self {
            RCode::Success => "Success",
            RCode::FormatError => "FormatError",
            RCode::ServerFailure => "ServerFailure",
            RCode::NameError => "NameError",
            RCode::NotImplemented => "NotImplemented",
            RCode::Refused => "Refused",
            RCode::Unsupported => "Unsupported",
        };
        write!(f, "{s}")
    }
}

/// The UDP payload limit of standard DNS (RFC 1035 §4.2.1).
pub const MAX_STANDARD_MESSAGE_SIZE: usize = 512;

/// The mDNS payload limit (RFC 6762 §17). The codec does not fragment;
/// transports size their receive buffers from this.
pub const MAX_MDNS_MESSAGE_SIZE: usize = 9000;

// PACK_STARTING_CAP is the initial buffer size allocated during packing;
// most mDNS messages fit a single standard-DNS payload.
const PACK_STARTING_CAP: usize = MAX_STANDARD_MESSAGE_SIZE;

/// A DNS message: header plus the four sections.
#[derive(Clone, Default, Debug, PartialEq, Eq)]
pub struct Message {
    pub header: Header,
    pub questions: Vec<Question>,
    pub answers: Vec<Record>,
    pub authorities: Vec<Record>,
    pub additionals: Vec<Record>,
}

impl Message {
    /// Whether this is an mDNS message: RFC 6762 §18.1 requires id 0.
    pub fn is_mdns(&self) -> bool {
        self.header.id == 0
    }

    /// An mDNS query with one question per requested type, all sharing the
    /// QU flag.
    pub fn mdns_query(name: Name, types: &[DnsType], unicast_response: bool) -> Message {
        Message {
            header: Header::default(),
            questions: types
                .iter()
                .map(|&typ| Question::new(name.clone(), typ, DNSCLASS_INET, unicast_response))
                .collect(),
            ..Default::default()
        }
    }

    /// The standard DNS-SD browse query: a single PTR question for the
    /// service type, multicast response requested.
    pub fn mdns_ptr_query(service_type: Name) -> Message {
        Self::mdns_query(service_type, &[DnsType::Ptr], false)
    }

    /// An authoritative mDNS response.
    pub fn mdns_response(answers: Vec<Record>, additionals: Vec<Record>) -> Message {
        Message {
            header: Header {
                response: true,
                authoritative: true,
                ..Default::default()
            },
            answers,
            additionals,
            ..Default::default()
        }
    }

    /// A goodbye announcement (RFC 6762 §10.1): the records are carried as
    /// answers with their TTLs forced to 0, everything else preserved.
    pub fn mdns_goodbye(records: Vec<Record>) -> Message {
        let answers = records
            .into_iter()
            .map(|mut r| {
                r.ttl = 0;
                r
            })
            .collect();
        Self::mdns_response(answers, Vec::new())
    }

    /// Packs the full message into its wire format.
    pub fn pack(&self) -> Result<Vec<u8>> {
        self.append_pack(Vec::with_capacity(PACK_STARTING_CAP))
    }

    // append_pack is like pack but appends to b and returns the extended
    // buffer.
    pub(crate) fn append_pack(&self, b: Vec<u8>) -> Result<Vec<u8>> {
        if self.questions.len() > u16::MAX as usize {
            return Err(Error::ErrTooManyQuestions);
        }
        if self.answers.len() > u16::MAX as usize {
            return Err(Error::ErrTooManyAnswers);
        }
        if self.authorities.len() > u16::MAX as usize {
            return Err(Error::ErrTooManyAuthorities);
        }
        if self.additionals.len() > u16::MAX as usize {
            return Err(Error::ErrTooManyAdditionals);
        }

        let counts = SectionCounts {
            questions: self.questions.len() as u16,
            answers: self.answers.len() as u16,
            authorities: self.authorities.len() as u16,
            additionals: self.additionals.len() as u16,
        };

        let compression_off = b.len();
        let mut msg = self.header.pack(b, counts);

        // RFC 1035 allows compression for packing and requires decoders to
        // support it, so it is unconditionally enabled. The suffix table is
        // scoped to this single pack call.
        let mut compression = Some(HashMap::new());

        for question in &self.questions {
            msg = question.pack(msg, &mut compression, compression_off)?;
        }
        for answer in &self.answers {
            msg = answer.pack(msg, &mut compression, compression_off)?;
        }
        for authority in &self.authorities {
            msg = authority.pack(msg, &mut compression, compression_off)?;
        }
        for additional in &self.additionals {
            msg = additional.pack(msg, &mut compression, compression_off)?;
        }

        Ok(msg)
    }

    /// Parses a full message. A buffer shorter than the 12 header octets, or
    /// a section shorter than its declared count, fails.
    pub fn unpack(msg: &[u8]) -> Result<Message> {
        if msg.len() < HEADER_LEN {
            return Err(Error::ErrShortBuffer);
        }
        let (header, counts, mut off) = Header::unpack(msg, 0)?;

        let mut questions = Vec::with_capacity(counts.questions as usize);
        for _ in 0..counts.questions {
            let (q, new_off) = Question::unpack(msg, off)?;
            questions.push(q);
            off = new_off;
        }

        let mut sections = [
            Vec::with_capacity(counts.answers as usize),
            Vec::with_capacity(counts.authorities as usize),
            Vec::with_capacity(counts.additionals as usize),
        ];
        let section_counts = [counts.answers, counts.authorities, counts.additionals];
        for (section, &count) in sections.iter_mut().zip(&section_counts) {
            for _ in 0..count {
                let (r, new_off) = Record::unpack(msg, off)?;
                section.push(r);
                off = new_off;
            }
        }
        let [answers, authorities, additionals] = sections;

        Ok(Message {
            header,
            questions,
            answers,
            authorities,
            additionals,
        })
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Message{{header: {}, questions: {}, answers: {}, authorities: {}, additionals: {}}}",
            self.header,
            self.questions.len(),
            self.answers.len(),
            self.authorities.len(),
            self.additionals.len()
        )
    }
}
