//! A minimal recursive DNS forwarding proxy.
//!
//! Client queries arrive over UDP, each question is relayed to an upstream
//! resolver on its own socket, and the answers are stitched back into one
//! reply carrying the client's id and question list.

pub mod dns_header;
pub mod dns_message;
pub mod dns_name;
pub mod dns_question_and_answer;
pub mod error;
pub mod forwarder;
pub mod server;

pub use error::DnsError;
pub use forwarder::{UdpForwarder, Upstream};
pub use server::DnsServer;
