use crate::dns_header::{DnsFlags, DnsHeader, HEADER_LEN};
use crate::dns_question_and_answer::{DnsAnswer, DnsQuestion};
use crate::error::DnsError;

/// A decoded DNS message. Authority and additional records are only
/// reflected through the header counts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DnsMessage {
    pub header: DnsHeader,
    pub questions: Vec<DnsQuestion>,
    pub answers: Vec<DnsAnswer>,
}

/// Decode `count` questions starting at `offset`
/// Returns the questions and the offset just past the last one
pub fn decode_questions(
    buf: &[u8],
    mut offset: usize,
    count: u16,
) -> Result<(Vec<DnsQuestion>, usize), DnsError> {
    let mut questions = Vec::with_capacity(count as usize);

    for _ in 0..count {
        let (question, new_offset) = DnsQuestion::from_bytes(buf, offset)?;
        questions.push(question);
        offset = new_offset;
    }

    Ok((questions, offset))
}

/// Decode `count` resource records starting at `offset`
/// Returns the records and the offset just past the last one
pub fn decode_answers(
    buf: &[u8],
    mut offset: usize,
    count: u16,
) -> Result<(Vec<DnsAnswer>, usize), DnsError> {
    let mut answers = Vec::with_capacity(count as usize);

    for _ in 0..count {
        let (answer, new_offset) = DnsAnswer::from_bytes(buf, offset)?;
        answers.push(answer);
        offset = new_offset;
    }

    Ok((answers, offset))
}

pub fn encode_questions(questions: &[DnsQuestion]) -> Result<Vec<u8>, DnsError> {
    let mut bytes = Vec::new();
    for question in questions {
        question.write_to(&mut bytes)?;
    }
    Ok(bytes)
}

pub fn encode_answers(answers: &[DnsAnswer]) -> Result<Vec<u8>, DnsError> {
    let mut bytes = Vec::new();
    for answer in answers {
        answer.write_to(&mut bytes)?;
    }
    Ok(bytes)
}

/// Number of records in a section, as it goes into a header count
fn section_count(len: usize, section: &str) -> Result<u16, DnsError> {
    u16::try_from(len).map_err(|_| DnsError::format(format!("too many {section} records: {len}")))
}

impl DnsMessage {
    /// Decode header, questions and answers from a full message
    pub fn parse(buf: &[u8]) -> Result<Self, DnsError> {
        let header = DnsHeader::from_bytes(buf)?;
        let (questions, offset) = decode_questions(buf, HEADER_LEN, header.question_count)?;
        let (answers, _) = decode_answers(buf, offset, header.answer_count)?;

        Ok(DnsMessage {
            header,
            questions,
            answers,
        })
    }

    /// Encode the message. Question and answer counts are taken from the
    /// sections themselves rather than from the header.
    pub fn to_bytes(&self) -> Result<Vec<u8>, DnsError> {
        build_message(&self.header, &self.questions, &self.answers)
    }
}

/// Parse the DNS request from the buffer
/// Only the header and question section are read; anything after is ignored
pub fn parse_request(buf: &[u8]) -> Result<(DnsHeader, Vec<DnsQuestion>), DnsError> {
    let header = DnsHeader::from_bytes(buf)?;
    let (questions, _) = decode_questions(buf, HEADER_LEN, header.question_count)?;

    Ok((header, questions))
}

/// Build a single-question query for the upstream resolver from the client's
/// header: QR is cleared and the answer, authority and additional counts are
/// zeroed so none of the client's counts leak upstream.
pub fn create_forward_query(
    request_header: &DnsHeader,
    question: &DnsQuestion,
) -> Result<Vec<u8>, DnsError> {
    let header = DnsHeader {
        flags: DnsFlags {
            qr: false,
            ..request_header.flags
        },
        question_count: 1,
        answer_count: 0,
        authority_count: 0,
        additional_count: 0,
        ..request_header.clone()
    };

    build_message(&header, std::slice::from_ref(question), &[])
}

/// Create the reply header from the first upstream response
///
/// Flags, authority and additional counts come from `template`; the id is the
/// client's and QR is set. Question and answer counts are filled in by
/// [`build_message`] from the sections actually sent.
pub fn create_response_header(template: &DnsHeader, request_id: u16) -> DnsHeader {
    DnsHeader {
        id: request_id,
        flags: DnsFlags {
            qr: true,
            ..template.flags
        },
        ..template.clone()
    }
}

/// Build the complete DNS message bytes
/// The header's question and answer counts are replaced by the section sizes
pub fn build_message(
    header: &DnsHeader,
    questions: &[DnsQuestion],
    answers: &[DnsAnswer],
) -> Result<Vec<u8>, DnsError> {
    let question_count = section_count(questions.len(), "question")?;
    let answer_count = section_count(answers.len(), "answer")?;

    let mut response = Vec::with_capacity(512);

    // Add header
    response.extend_from_slice(&header.to_bytes_with_counts(question_count, answer_count));

    // Add questions (echo them back)
    response.extend(encode_questions(questions)?);

    // Add answers
    response.extend(encode_answers(answers)?);

    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dns_question_and_answer::{RecordClass, RecordType};

    fn question(name: &str) -> DnsQuestion {
        DnsQuestion {
            name: name.to_string(),
            qtype: RecordType::A.to_u16(),
            qclass: RecordClass::IN.to_u16(),
        }
    }

    fn client_header() -> DnsHeader {
        DnsHeader {
            id: 5678,
            flags: DnsFlags {
                rd: true,
                ..Default::default()
            },
            question_count: 2,
            answer_count: 3,
            authority_count: 4,
            additional_count: 1,
        }
    }

    #[test]
    fn test_message_counts_follow_sections() {
        let message = DnsMessage {
            header: DnsHeader {
                question_count: 9,
                answer_count: 0,
                ..client_header()
            },
            questions: vec![question("example.com"), question("example.org")],
            answers: vec![
                DnsAnswer::new_a_record("example.com".to_string(), 60, [1, 2, 3, 4]),
                DnsAnswer::new_a_record("example.org".to_string(), 60, [5, 6, 7, 8]),
                DnsAnswer::new_a_record("example.org".to_string(), 60, [9, 9, 9, 9]),
            ],
        };

        let bytes = message.to_bytes().unwrap();
        let parsed = DnsMessage::parse(&bytes).unwrap();

        assert_eq!(parsed.header.question_count, 2);
        assert_eq!(parsed.header.answer_count, 3);
        assert_eq!(parsed.questions, message.questions);
        assert_eq!(parsed.answers, message.answers);
    }

    #[test]
    fn test_decode_sections_chain_offsets() {
        let questions = vec![question("a.example"), question("b.example")];
        let answers = vec![DnsAnswer::new_a_record("a.example".to_string(), 5, [10, 0, 0, 1])];

        let mut buf = vec![0u8; HEADER_LEN];
        buf.extend(encode_questions(&questions).unwrap());
        let answers_at = buf.len();
        buf.extend(encode_answers(&answers).unwrap());

        let (decoded_questions, offset) = decode_questions(&buf, HEADER_LEN, 2).unwrap();
        assert_eq!(decoded_questions, questions);
        assert_eq!(offset, answers_at);

        let (decoded_answers, offset) = decode_answers(&buf, offset, 1).unwrap();
        assert_eq!(decoded_answers, answers);
        assert_eq!(offset, buf.len());
    }

    #[test]
    fn test_parse_request_with_too_few_questions() {
        let mut buf = client_header().to_bytes_with_counts(2, 0).to_vec();
        buf.extend(question("example.com").to_bytes().unwrap());

        assert!(matches!(parse_request(&buf), Err(DnsError::Format(_))));
    }

    #[test]
    fn test_forward_query_header() {
        let mut header = client_header();
        header.flags.qr = true;
        header.flags.opcode = 0;

        let query = create_forward_query(&header, &question("example.com")).unwrap();
        let (forwarded, questions) = parse_request(&query).unwrap();

        assert_eq!(forwarded.id, 5678);
        assert!(!forwarded.flags.qr);
        assert!(forwarded.flags.rd);
        assert_eq!(forwarded.question_count, 1);
        assert_eq!(forwarded.answer_count, 0);
        assert_eq!(forwarded.authority_count, 0);
        assert_eq!(forwarded.additional_count, 0);
        assert_eq!(questions, vec![question("example.com")]);
    }

    #[test]
    fn test_response_header_from_template() {
        let template = DnsHeader {
            id: 1,
            flags: DnsFlags::from_u16(0x0183), // RD, RA, NXDOMAIN, QR unset
            question_count: 1,
            answer_count: 0,
            authority_count: 1,
            additional_count: 0,
        };

        let header = create_response_header(&template, 5678);
        let bytes = build_message(&header, &[question("example.com")], &[]).unwrap();
        let encoded = DnsHeader::from_bytes(&bytes).unwrap();

        assert_eq!(encoded.id, 5678);
        assert!(encoded.flags.qr);
        assert!(encoded.flags.ra);
        assert_eq!(encoded.flags.rcode, 3);
        assert_eq!(encoded.question_count, 1);
        assert_eq!(encoded.answer_count, 0);
        assert_eq!(encoded.authority_count, 1);
        assert_eq!(encoded.additional_count, 0);
    }
}
