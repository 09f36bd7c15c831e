use bytes::BufMut;

use crate::error::DnsError;

/// Longest literal label allowed on the wire
pub const MAX_LABEL_LEN: usize = 63;
/// Longest name allowed on the wire, length bytes and root terminator included
pub const MAX_NAME_LEN: usize = 255;
/// Upper bound on compression pointers followed while decoding one name
const MAX_POINTER_HOPS: usize = 64;

/// Parse a domain name from DNS message format
/// Supports DNS name compression (pointers)
///
/// Returns the dot-joined name (empty for the root) and the number of bytes
/// consumed from `start`. Once a pointer is followed nothing further counts
/// towards the consumed bytes, so a name that is only a pointer consumes 2.
///
/// Pointers must refer to an offset strictly before themselves, which rules
/// out self-references and loops; the hop count is capped as well.
pub fn parse_domain_name(bytes: &[u8], start: usize) -> Result<(String, usize), DnsError> {
    let mut labels: Vec<String> = Vec::new();
    let mut offset = start;
    // Set on the first jump: the caller's cursor stops at the pointer field
    let mut consumed: Option<usize> = None;
    let mut wire_len = 1;
    let mut hops = 0;

    loop {
        let length = *bytes.get(offset).ok_or_else(|| {
            DnsError::format(format!("name at offset {start} runs past end of buffer"))
        })?;

        match length & 0xC0 {
            0xC0 => {
                let low = *bytes.get(offset + 1).ok_or_else(|| {
                    DnsError::format(format!("incomplete compression pointer at offset {offset}"))
                })?;
                let target = u16::from_be_bytes([length & 0x3F, low]) as usize;

                if target >= offset {
                    return Err(DnsError::format(format!(
                        "compression pointer at offset {offset} does not point backwards (target {target})"
                    )));
                }

                hops += 1;
                if hops > MAX_POINTER_HOPS {
                    return Err(DnsError::format(format!(
                        "too many compression pointers in name at offset {start}"
                    )));
                }

                if consumed.is_none() {
                    consumed = Some(offset + 2 - start);
                }
                offset = target;
            }
            0x00 => {
                offset += 1;

                // Root label
                if length == 0 {
                    break;
                }

                let len = length as usize;
                let label = bytes.get(offset..offset + len).ok_or_else(|| {
                    DnsError::format(format!("label at offset {} extends beyond buffer", offset - 1))
                })?;

                wire_len += len + 1;
                if wire_len > MAX_NAME_LEN {
                    return Err(DnsError::format(format!(
                        "name at offset {start} is longer than {MAX_NAME_LEN} bytes"
                    )));
                }

                let label = std::str::from_utf8(label)
                    .map_err(|_| DnsError::format("invalid UTF-8 in domain label"))?;
                // A dot inside a label would split it in two on re-encode
                if label.contains('.') {
                    return Err(DnsError::format(format!(
                        "label {label:?} at offset {} contains a dot",
                        offset - 1
                    )));
                }
                labels.push(label.to_string());
                offset += len;
            }
            _ => {
                return Err(DnsError::format(format!(
                    "unsupported label type {length:#04x} at offset {offset}"
                )));
            }
        }
    }

    let consumed = consumed.unwrap_or(offset - start);
    Ok((labels.join("."), consumed))
}

/// Encode a domain name to DNS message format
/// Format: length-prefixed labels terminated with a null byte
/// Example: "example.com" -> [7]example[3]com[0]
///
/// Names are always written uncompressed. `""`, `"."` and a single trailing
/// dot all denote the root.
pub fn encode_domain_name(name: &str) -> Result<Vec<u8>, DnsError> {
    let mut encoded = Vec::with_capacity(name.len() + 2);
    let name = name.strip_suffix('.').unwrap_or(name);

    if !name.is_empty() {
        for label in name.split('.') {
            if label.is_empty() {
                return Err(DnsError::format(format!("empty label in name {name:?}")));
            }
            if label.len() > MAX_LABEL_LEN {
                return Err(DnsError::format(format!(
                    "label {label:?} is longer than {MAX_LABEL_LEN} bytes"
                )));
            }

            encoded.put_u8(label.len() as u8);
            encoded.put_slice(label.as_bytes());
        }
    }

    encoded.put_u8(0);

    if encoded.len() > MAX_NAME_LEN {
        return Err(DnsError::format(format!(
            "name {name:?} is longer than {MAX_NAME_LEN} bytes"
        )));
    }

    Ok(encoded)
}
