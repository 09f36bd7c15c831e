use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use dns_forwarding_proxy::forwarder::DEFAULT_TIMEOUT;
use dns_forwarding_proxy::{DnsServer, UdpForwarder};

#[derive(Parser, Debug)]
#[command(name = "dns-server")]
struct Args {
    /// Local UDP address to listen on
    #[arg(long, default_value = "127.0.0.1:2053")]
    bind: SocketAddr,

    /// Upstream DNS resolver address (e.g., 8.8.8.8:53)
    #[arg(long, default_value = "8.8.8.8:53")]
    resolver: SocketAddr,

    /// How long to wait for the resolver to answer one question, in milliseconds
    #[arg(
        long,
        default_value_t = DEFAULT_TIMEOUT.as_millis() as u64,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    timeout_ms: u64,
}

fn main() -> anyhow::Result<()> {
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(env).init();

    let args = Args::parse();
    let forwarder = UdpForwarder::new(args.resolver, Duration::from_millis(args.timeout_ms))
        .context("invalid upstream configuration")?;
    info!(resolver = %forwarder.resolver(), timeout_ms = args.timeout_ms, "using resolver");

    let server = DnsServer::new(args.bind, forwarder)
        .with_context(|| format!("failed to bind to {}", args.bind))?;

    server.run().context("DNS server stopped")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_args() {
        let args = Args::try_parse_from(["dns-server"]).unwrap();
        assert_eq!(args.bind, "127.0.0.1:2053".parse::<SocketAddr>().unwrap());
        assert_eq!(args.resolver, "8.8.8.8:53".parse::<SocketAddr>().unwrap());
        assert_eq!(args.timeout_ms, 5000);
    }

    #[test]
    fn test_zero_timeout_is_rejected() {
        assert!(Args::try_parse_from(["dns-server", "--timeout-ms", "0"]).is_err());

        let args = Args::try_parse_from(["dns-server", "--timeout-ms", "250"]).unwrap();
        assert_eq!(args.timeout_ms, 250);
    }
}
