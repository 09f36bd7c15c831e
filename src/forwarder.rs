use std::io;
use std::net::{SocketAddr, UdpSocket};
use std::time::Duration;

use tracing::debug;

use crate::dns_header::DnsHeader;
use crate::dns_message::create_forward_query;
use crate::dns_question_and_answer::{ClassName, DnsQuestion, TypeName};
use crate::error::DnsError;

/// Deadline for a single upstream exchange unless configured otherwise
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Largest datagram read back from the resolver (plain UDP DNS, no EDNS)
const MAX_RESPONSE_SIZE: usize = 512;

/// Something that can resolve one question against an upstream resolver
///
/// Implementations send a single-question query derived from the client's
/// header and return the raw response bytes.
pub trait Upstream {
    fn forward(&self, request_header: &DnsHeader, question: &DnsQuestion)
        -> Result<Vec<u8>, DnsError>;
}

/// Forwards questions over UDP, one ephemeral socket per question
#[derive(Debug, Clone)]
pub struct UdpForwarder {
    resolver: SocketAddr,
    timeout: Duration,
}

impl UdpForwarder {
    /// The socket layer cannot wait for zero time, so a zero `timeout` is refused
    pub fn new(resolver: SocketAddr, timeout: Duration) -> Result<Self, DnsError> {
        if timeout.is_zero() {
            return Err(DnsError::Transport(io::Error::new(
                io::ErrorKind::InvalidInput,
                "upstream timeout must be greater than zero",
            )));
        }

        Ok(Self { resolver, timeout })
    }

    pub fn resolver(&self) -> SocketAddr {
        self.resolver
    }
}

impl Upstream for UdpForwarder {
    fn forward(
        &self,
        request_header: &DnsHeader,
        question: &DnsQuestion,
    ) -> Result<Vec<u8>, DnsError> {
        let query = create_forward_query(request_header, question)?;

        // Bind to the resolver's address family; the socket is dropped on every return
        let bind_addr = if self.resolver.is_ipv4() {
            "0.0.0.0:0"
        } else {
            "[::]:0"
        };
        let upstream_socket = UdpSocket::bind(bind_addr)?;
        upstream_socket.set_read_timeout(Some(self.timeout))?;

        upstream_socket.send_to(&query, self.resolver)?;
        debug!(
            resolver = %self.resolver,
            name = %question.name,
            qtype = %TypeName(question.qtype),
            qclass = %ClassName(question.qclass),
            "forwarded question"
        );

        // Any peer may answer; the first datagram wins
        let mut response_buf = [0u8; MAX_RESPONSE_SIZE];
        let (response_size, from) = match upstream_socket.recv_from(&mut response_buf) {
            Ok(received) => received,
            Err(e) if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) => {
                return Err(DnsError::Timeout(self.timeout));
            }
            Err(e) => return Err(e.into()),
        };

        debug!(from = %from, bytes = response_size, "upstream response");
        Ok(response_buf[..response_size].to_vec())
    }
}
