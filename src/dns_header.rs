use bytes::{Buf, BufMut};

use crate::error::DnsError;

/// Size of the fixed DNS header on the wire
pub const HEADER_LEN: usize = 12;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DnsHeader {
    pub id: u16,
    pub flags: DnsFlags,
    pub question_count: u16,
    pub answer_count: u16,
    pub authority_count: u16,
    pub additional_count: u16,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DnsFlags {
    pub qr: bool,              // Query/Response (false = query, true = response)
    pub opcode: u8,            // Operation code (0 = standard query)
    pub aa: bool,              // Authoritative Answer
    pub tc: bool,              // Truncation
    pub rd: bool,              // Recursion Desired
    pub ra: bool,              // Recursion Available
    pub z: u8,                 // Reserved (must be 0)
    pub rcode: u8,             // Response code (0 = no error, 1 = format error, etc.)
}

impl DnsFlags {
    pub fn to_u16(&self) -> u16 {
        let mut flags: u16 = 0;

        if self.qr { flags |= 1 << 15; }           // QR at bit 15
        flags |= (self.opcode as u16 & 0xF) << 11; // OPCODE at bits 11-14
        if self.aa { flags |= 1 << 10; }           // AA at bit 10
        if self.tc { flags |= 1 << 9; }            // TC at bit 9
        if self.rd { flags |= 1 << 8; }            // RD at bit 8
        if self.ra { flags |= 1 << 7; }            // RA at bit 7
        flags |= (self.z as u16 & 0x7) << 4;       // Z at bits 4-6 (reserved)
        flags |= self.rcode as u16 & 0xF;          // RCODE at bits 0-3

        flags
    }

    pub fn from_u16(flags: u16) -> Self {
        DnsFlags {
            qr: (flags & (1 << 15)) != 0,
            opcode: ((flags >> 11) & 0xF) as u8,
            aa: (flags & (1 << 10)) != 0,
            tc: (flags & (1 << 9)) != 0,
            rd: (flags & (1 << 8)) != 0,
            ra: (flags & (1 << 7)) != 0,
            z: ((flags >> 4) & 0x7) as u8,
            rcode: (flags & 0xF) as u8,
        }
    }
}

impl DnsHeader {
    /// Decode the header from the first 12 bytes of `bytes`
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DnsError> {
        if bytes.len() < HEADER_LEN {
            return Err(DnsError::format(format!(
                "buffer of {} bytes is too small for DNS header",
                bytes.len()
            )));
        }

        let mut buf = &bytes[..HEADER_LEN];
        Ok(DnsHeader {
            id: buf.get_u16(),
            flags: DnsFlags::from_u16(buf.get_u16()),
            question_count: buf.get_u16(),
            answer_count: buf.get_u16(),
            authority_count: buf.get_u16(),
            additional_count: buf.get_u16(),
        })
    }

    pub fn to_bytes(&self) -> [u8; HEADER_LEN] {
        self.to_bytes_with_counts(self.question_count, self.answer_count)
    }

    /// Encode the header with the question and answer counts overridden by
    /// the number of records actually being serialized. Authority and
    /// additional counts are written as they are.
    pub fn to_bytes_with_counts(&self, question_count: u16, answer_count: u16) -> [u8; HEADER_LEN] {
        let mut bytes = [0u8; HEADER_LEN];
        let mut buf = &mut bytes[..];

        buf.put_u16(self.id);
        buf.put_u16(self.flags.to_u16());
        buf.put_u16(question_count);
        buf.put_u16(answer_count);
        buf.put_u16(self.authority_count);
        buf.put_u16(self.additional_count);

        bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_header() -> DnsHeader {
        DnsHeader {
            id: 0xBEEF,
            flags: DnsFlags {
                qr: true,
                opcode: 2,
                aa: true,
                tc: false,
                rd: true,
                ra: true,
                z: 5,
                rcode: 3,
            },
            question_count: 1,
            answer_count: 2,
            authority_count: 3,
            additional_count: 4,
        }
    }

    #[test]
    fn test_flag_bit_positions() {
        let flags = DnsFlags {
            rd: true,
            ..Default::default()
        };
        assert_eq!(flags.to_u16(), 0x0100);

        let flags = DnsFlags::from_u16(0x8180);
        assert!(flags.qr);
        assert!(flags.rd);
        assert!(flags.ra);
        assert_eq!(flags.opcode, 0);
        assert_eq!(flags.rcode, 0);

        let flags = DnsFlags::from_u16(0x7873);
        assert_eq!(flags.opcode, 0xF);
        assert_eq!(flags.z, 7);
        assert_eq!(flags.rcode, 3);
        assert_eq!(flags.to_u16(), 0x7873);
    }

    #[test]
    fn test_header_roundtrip_with_counts() {
        let header = sample_header();
        let decoded = DnsHeader::from_bytes(&header.to_bytes_with_counts(7, 9)).unwrap();

        assert_eq!(decoded.id, header.id);
        assert_eq!(decoded.flags, header.flags);
        assert_eq!(decoded.question_count, 7);
        assert_eq!(decoded.answer_count, 9);
        assert_eq!(decoded.authority_count, 3);
        assert_eq!(decoded.additional_count, 4);
    }

    #[test]
    fn test_header_wire_layout() {
        let bytes = sample_header().to_bytes();
        assert_eq!(
            bytes,
            [0xBE, 0xEF, 0x95, 0xD3, 0, 1, 0, 2, 0, 3, 0, 4]
        );
    }

    #[test]
    fn test_header_too_short() {
        assert!(matches!(
            DnsHeader::from_bytes(&[0u8; 11]),
            Err(DnsError::Format(_))
        ));
    }
}
