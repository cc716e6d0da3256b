//! Bind address parsing.
//!
//! Accepts `[ip:]port`. The address part is optional: a string that
//! starts with `:` binds the wildcard address. The port is mandatory.

use std::fmt;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::str::FromStr;

use thiserror::Error;

/// Errors produced while parsing a `[ip:]port` string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    /// Nothing to parse.
    #[error("Invalid address: empty")]
    Empty,

    /// No `:` between address and port.
    #[error("Invalid address: expected [ip:]port, got {0:?}")]
    MissingSeparator(String),

    /// The address part is not an IPv4 literal.
    #[error("Invalid IP address: {0:?}")]
    InvalidIp(String),

    /// The port part is missing, non-numeric, or outside 1..=65535.
    #[error("Invalid port number: {0:?}")]
    InvalidPort(String),
}

/// A validated listen address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BindAddress {
    ip: Ipv4Addr,
    port: u16,
}

impl BindAddress {
    pub fn new(ip: Ipv4Addr, port: u16) -> Self {
        Self { ip, port }
    }

    /// Parse `[ip:]port`.
    pub fn parse(input: &str) -> Result<Self, AddressError> {
        if input.is_empty() {
            return Err(AddressError::Empty);
        }

        let (ip_str, port_str) = input
            .split_once(':')
            .ok_or_else(|| AddressError::MissingSeparator(input.to_string()))?;

        let ip = if ip_str.is_empty() {
            Ipv4Addr::UNSPECIFIED
        } else {
            ip_str
                .parse::<Ipv4Addr>()
                .map_err(|_| AddressError::InvalidIp(ip_str.to_string()))?
        };

        let port = parse_port(port_str)?;

        Ok(Self { ip, port })
    }

    pub fn ip(&self) -> Ipv4Addr {
        self.ip
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// True when bound to the "any" address.
    pub fn is_wildcard(&self) -> bool {
        self.ip.is_unspecified()
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::V4(SocketAddrV4::new(self.ip, self.port))
    }
}

fn parse_port(port_str: &str) -> Result<u16, AddressError> {
    let invalid = || AddressError::InvalidPort(port_str.to_string());

    let num: u32 = port_str.parse().map_err(|_| invalid())?;
    match u16::try_from(num) {
        Ok(0) | Err(_) => Err(invalid()),
        Ok(port) => Ok(port),
    }
}

impl FromStr for BindAddress {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for BindAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.ip, self.port)
    }
}

impl From<BindAddress> for SocketAddr {
    fn from(addr: BindAddress) -> Self {
        addr.socket_addr()
    }
}
