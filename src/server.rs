use std::io;
use std::net::{SocketAddr, UdpSocket};
use std::sync::Arc;
use std::thread;

use tracing::{debug, error, info, warn};

use crate::dns_header::{DnsHeader, HEADER_LEN};
use crate::dns_message::{
    build_message, create_response_header, decode_answers, decode_questions, parse_request,
};
use crate::dns_question_and_answer::{ClassName, TypeName};
use crate::error::DnsError;
use crate::forwarder::Upstream;

/// Largest client datagram accepted (plain UDP DNS, no EDNS)
const MAX_REQUEST_SIZE: usize = 512;

/// DNS Server that handles incoming DNS requests
pub struct DnsServer<U> {
    socket: Arc<UdpSocket>,
    upstream: Arc<U>,
}

impl<U> DnsServer<U>
where
    U: Upstream + Send + Sync + 'static,
{
    /// Create a new DNS server bound to the given address
    /// Every question is forwarded through `upstream`
    pub fn new(bind_addr: SocketAddr, upstream: U) -> Result<Self, DnsError> {
        let socket = UdpSocket::bind(bind_addr)?;

        Ok(Self {
            socket: Arc::new(socket),
            upstream: Arc::new(upstream),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, DnsError> {
        Ok(self.socket.local_addr()?)
    }

    /// Run the DNS server main loop
    /// Each datagram is handled on its own thread, so a slow upstream only
    /// holds up the client whose query is waiting on it.
    pub fn run(&self) -> Result<(), DnsError> {
        info!(addr = %self.local_addr()?, "DNS server listening");

        loop {
            let mut buf = [0u8; MAX_REQUEST_SIZE];
            let (size, source) = match self.socket.recv_from(&mut buf) {
                Ok(received) => received,
                Err(e) if is_transient_recv_error(&e) => {
                    warn!(error = %e, "error receiving data, continuing");
                    continue;
                }
                Err(e) => {
                    error!(error = %e, "error receiving data");
                    return Err(e.into());
                }
            };
            debug!(peer = %source, bytes = size, "received query");

            let request = buf[..size].to_vec();
            let socket = Arc::clone(&self.socket);
            let upstream = Arc::clone(&self.upstream);
            thread::spawn(move || serve_datagram(&socket, upstream.as_ref(), &request, source));
        }
    }
}

/// Receive errors that concern a single exchange rather than the socket itself,
/// e.g. an ICMP port-unreachable reported as `ConnectionReset` on some platforms
fn is_transient_recv_error(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::Interrupted
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionRefused
            | io::ErrorKind::WouldBlock
            | io::ErrorKind::TimedOut
    )
}

/// Answer one client datagram. Failures are logged and the query is dropped
/// without a reply.
fn serve_datagram<U: Upstream + ?Sized>(
    socket: &UdpSocket,
    upstream: &U,
    request: &[u8],
    source: SocketAddr,
) {
    match handle_request(upstream, request) {
        Ok(Some(response)) => match socket.send_to(&response, source) {
            Ok(_) => debug!(peer = %source, bytes = response.len(), "sent response"),
            Err(e) => warn!(peer = %source, error = %e, "failed to send response"),
        },
        Ok(None) => debug!(peer = %source, "query without questions dropped"),
        Err(e) => warn!(peer = %source, error = %e, "dropping query"),
    }
}

/// Handle a DNS request: parse, forward each question, and build the reply
///
/// Questions are forwarded one at a time, in order. The first upstream
/// response supplies the reply's flags; answers from every response are
/// concatenated in question order. Any failure aborts the whole request.
/// Returns `None` when the request carries no questions.
pub fn handle_request<U: Upstream + ?Sized>(
    upstream: &U,
    buf: &[u8],
) -> Result<Option<Vec<u8>>, DnsError> {
    let (request_header, questions) = parse_request(buf)?;

    let mut template: Option<DnsHeader> = None;
    let mut answers = Vec::new();

    for question in &questions {
        let response = upstream.forward(&request_header, question)?;

        let response_header = DnsHeader::from_bytes(&response)?;
        // Skip the echoed question section to reach the answers
        let (_, offset) = decode_questions(&response, HEADER_LEN, response_header.question_count)?;
        let (mut question_answers, _) =
            decode_answers(&response, offset, response_header.answer_count)?;

        debug!(
            id = request_header.id,
            name = %question.name,
            qtype = %TypeName(question.qtype),
            qclass = %ClassName(question.qclass),
            rcode = response_header.flags.rcode,
            answers = question_answers.len(),
            "resolved question"
        );

        answers.append(&mut question_answers);
        template.get_or_insert(response_header);
    }

    let Some(template) = template else {
        return Ok(None);
    };

    let response_header = create_response_header(&template, request_header.id);
    build_message(&response_header, &questions, &answers).map(Some)
}
