use std::fmt;

use bytes::{Buf, BufMut};

use crate::dns_name::{encode_domain_name, parse_domain_name};
use crate::error::DnsError;

/// DNS Question Section
/// Format: QNAME + QTYPE (2 bytes) + QCLASS (2 bytes)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DnsQuestion {
    pub name: String, // Domain name (e.g., "example.com")
    pub qtype: u16,   // Query type (A, AAAA, CNAME, etc.)
    pub qclass: u16,  // Query class (usually IN for Internet)
}

/// DNS Answer/Resource Record Section
/// Format: NAME + TYPE (2 bytes) + CLASS (2 bytes) + TTL (4 bytes) + RDLENGTH (2 bytes) + RDATA
///
/// RDATA is kept as an opaque blob; RDLENGTH is always its length and is
/// only materialized on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DnsAnswer {
    pub name: String,   // Domain name
    pub rtype: u16,     // Record type (A, AAAA, CNAME, etc.)
    pub rclass: u16,    // Record class (usually IN for Internet)
    pub ttl: u32,       // Time to live in seconds
    pub rdata: Vec<u8>, // Resource data (format depends on record type)
}

/// Common DNS record types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordType {
    A = 1,     // IPv4 address
    NS = 2,    // Name server
    CNAME = 5, // Canonical name
    SOA = 6,   // Start of authority
    PTR = 12,  // Pointer record
    MX = 15,   // Mail exchange
    TXT = 16,  // Text record
    AAAA = 28, // IPv6 address
    OPT = 41,  // EDNS0 option
}

impl RecordType {
    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            1 => Some(RecordType::A),
            2 => Some(RecordType::NS),
            5 => Some(RecordType::CNAME),
            6 => Some(RecordType::SOA),
            12 => Some(RecordType::PTR),
            15 => Some(RecordType::MX),
            16 => Some(RecordType::TXT),
            28 => Some(RecordType::AAAA),
            41 => Some(RecordType::OPT),
            _ => None,
        }
    }

    pub fn to_u16(self) -> u16 {
        self as u16
    }
}

/// Common DNS classes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordClass {
    IN = 1, // Internet
    CS = 2, // CSNET (obsolete)
    CH = 3, // CHAOS
    HS = 4, // Hesiod
}

impl RecordClass {
    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            1 => Some(RecordClass::IN),
            2 => Some(RecordClass::CS),
            3 => Some(RecordClass::CH),
            4 => Some(RecordClass::HS),
            _ => None,
        }
    }

    pub fn to_u16(self) -> u16 {
        self as u16
    }
}

/// Renders a record type for logs, falling back to the RFC 3597 `TYPEnn` form
pub struct TypeName(pub u16);

impl fmt::Display for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match RecordType::from_u16(self.0) {
            Some(rtype) => write!(f, "{rtype:?}"),
            None => write!(f, "TYPE{}", self.0),
        }
    }
}

/// Renders a record class for logs, falling back to the RFC 3597 `CLASSnn` form
pub struct ClassName(pub u16);

impl fmt::Display for ClassName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match RecordClass::from_u16(self.0) {
            Some(rclass) => write!(f, "{rclass:?}"),
            None => write!(f, "CLASS{}", self.0),
        }
    }
}

impl DnsQuestion {
    /// Parse a DNS question from bytes starting at the given offset
    /// Returns the question and the new offset after parsing
    pub fn from_bytes(bytes: &[u8], offset: usize) -> Result<(Self, usize), DnsError> {
        let (name, consumed) = parse_domain_name(bytes, offset)?;
        let fields_offset = offset + consumed;

        let mut fields = bytes
            .get(fields_offset..fields_offset + 4)
            .ok_or_else(|| DnsError::format("buffer too small for question type and class"))?;

        let qtype = fields.get_u16();
        let qclass = fields.get_u16();

        Ok((
            DnsQuestion {
                name,
                qtype,
                qclass,
            },
            fields_offset + 4,
        ))
    }

    /// Append the question in wire format to `out`
    pub fn write_to(&self, out: &mut Vec<u8>) -> Result<(), DnsError> {
        out.extend(encode_domain_name(&self.name)?);
        out.put_u16(self.qtype);
        out.put_u16(self.qclass);
        Ok(())
    }

    /// Convert the question to bytes
    pub fn to_bytes(&self) -> Result<Vec<u8>, DnsError> {
        let mut bytes = Vec::new();
        self.write_to(&mut bytes)?;
        Ok(bytes)
    }
}

impl DnsAnswer {
    /// Parse a DNS answer/resource record from bytes starting at the given offset
    /// Returns the answer and the new offset after parsing
    pub fn from_bytes(bytes: &[u8], offset: usize) -> Result<(Self, usize), DnsError> {
        let (name, consumed) = parse_domain_name(bytes, offset)?;
        let fields_offset = offset + consumed;

        let mut fields = bytes
            .get(fields_offset..fields_offset + 10)
            .ok_or_else(|| DnsError::format("buffer too small for answer fields"))?;

        let rtype = fields.get_u16();
        let rclass = fields.get_u16();
        let ttl = fields.get_u32();
        let rdlength = fields.get_u16() as usize;

        let data_offset = fields_offset + 10;
        let rdata = bytes
            .get(data_offset..data_offset + rdlength)
            .ok_or_else(|| {
                DnsError::format(format!(
                    "RDATA of {rdlength} bytes at offset {data_offset} exceeds buffer of {} bytes",
                    bytes.len()
                ))
            })?
            .to_vec();

        Ok((
            DnsAnswer {
                name,
                rtype,
                rclass,
                ttl,
                rdata,
            },
            data_offset + rdlength,
        ))
    }

    /// Append the record in wire format to `out`
    pub fn write_to(&self, out: &mut Vec<u8>) -> Result<(), DnsError> {
        let rdlength = u16::try_from(self.rdata.len()).map_err(|_| {
            DnsError::format(format!("RDATA of {} bytes is too long", self.rdata.len()))
        })?;

        out.extend(encode_domain_name(&self.name)?);
        out.put_u16(self.rtype);
        out.put_u16(self.rclass);
        out.put_u32(self.ttl);
        out.put_u16(rdlength);
        out.extend_from_slice(&self.rdata);
        Ok(())
    }

    /// Convert the answer to bytes
    pub fn to_bytes(&self) -> Result<Vec<u8>, DnsError> {
        let mut bytes = Vec::new();
        self.write_to(&mut bytes)?;
        Ok(bytes)
    }

    /// Create a new DNS answer with the given parameters
    pub fn new(name: String, rtype: u16, rclass: u16, ttl: u32, rdata: Vec<u8>) -> Self {
        DnsAnswer {
            name,
            rtype,
            rclass,
            ttl,
            rdata,
        }
    }

    /// Create an A record (IPv4 address) answer
    pub fn new_a_record(name: String, ttl: u32, ip: [u8; 4]) -> Self {
        Self::new(
            name,
            RecordType::A.to_u16(),
            RecordClass::IN.to_u16(),
            ttl,
            ip.to_vec(),
        )
    }
}
