//! Module `data_channel`
//!
//! Per-connection data channel. PASV/EPSV bind a listener the client connects to;
//! PORT records an address the server connects out to. A negotiated channel serves a
//! single transfer and is then dropped back to `Idle`.

use log::{debug, info, warn};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::ops::RangeInclusive;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;

use crate::error::TransferError;

#[derive(Debug, Default)]
pub enum DataChannel {
    #[default]
    Idle,
    Passive {
        listener: TcpListener,
        local_addr: SocketAddr,
        owner_ip: IpAddr,
    },
    Active {
        target: SocketAddr,
    },
}

impl DataChannel {
    pub fn is_negotiated(&self) -> bool {
        !matches!(self, DataChannel::Idle)
    }

    /// Binds a passive listener on `bind_ip`, trying each port of `ports` in turn.
    ///
    /// A range of `0..=0` asks the OS for an ephemeral port.
    pub async fn passive(
        bind_ip: IpAddr,
        ports: RangeInclusive<u16>,
        owner_ip: IpAddr,
    ) -> Result<Self, TransferError> {
        for port in ports {
            let addr = SocketAddr::new(bind_ip, port);
            match TcpListener::bind(addr).await {
                Ok(listener) => {
                    let local_addr = listener
                        .local_addr()
                        .map_err(|e| TransferError::PortBindingFailed(addr, e))?;
                    info!("Passive data listener bound to {} for {}", local_addr, owner_ip);
                    return Ok(DataChannel::Passive {
                        listener,
                        local_addr,
                        owner_ip,
                    });
                }
                Err(e) => debug!("Data port {} unavailable: {}", addr, e),
            }
        }
        Err(TransferError::NoAvailablePort)
    }

    /// Validates a PORT target against the client's control connection address.
    pub fn active(target: SocketAddr, client_addr: SocketAddr) -> Result<Self, TransferError> {
        if target.ip() != client_addr.ip() {
            return Err(TransferError::IpMismatch {
                expected: client_addr.ip().to_string(),
                provided: target.ip().to_string(),
            });
        }
        if target.port() < 1024 {
            return Err(TransferError::InvalidPortRange(target.port()));
        }
        info!("Active data target {} registered for {}", target, client_addr);
        Ok(DataChannel::Active { target })
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        match self {
            DataChannel::Passive { local_addr, .. } => Some(*local_addr),
            _ => None,
        }
    }

    /// Establishes the data connection, waiting at most `wait`.
    pub async fn open(&mut self, wait: Duration) -> Result<TcpStream, TransferError> {
        match self {
            DataChannel::Idle => Err(TransferError::DataChannelNotInitialized),
            DataChannel::Passive {
                listener,
                local_addr,
                owner_ip,
            } => {
                let (stream, peer) = timeout(wait, listener.accept())
                    .await
                    .map_err(|_| TransferError::ConnectionTimeout(*local_addr))?
                    .map_err(TransferError::TransferFailed)?;
                if peer.ip() != *owner_ip {
                    warn!("Rejected data connection from {} (expected {})", peer, owner_ip);
                    return Err(TransferError::IpMismatch {
                        expected: owner_ip.to_string(),
                        provided: peer.ip().to_string(),
                    });
                }
                debug!("Data connection accepted from {}", peer);
                Ok(stream)
            }
            DataChannel::Active { target } => {
                let stream = timeout(wait, TcpStream::connect(*target))
                    .await
                    .map_err(|_| TransferError::ConnectionTimeout(*target))?
                    .map_err(TransferError::TransferFailed)?;
                debug!("Connected to active data target {}", target);
                Ok(stream)
            }
        }
    }

    pub fn close(&mut self) {
        if self.is_negotiated() {
            debug!("Closing data channel");
        }
        *self = DataChannel::Idle;
    }
}

/// Parses the `h1,h2,h3,h4,p1,p2` argument of PORT.
pub fn parse_port_argument(argument: &str) -> Result<SocketAddr, TransferError> {
    let numbers = argument
        .trim()
        .split(',')
        .map(|part| part.trim().parse::<u8>())
        .collect::<Result<Vec<u8>, _>>()
        .map_err(|_| TransferError::InvalidPortCommand(argument.to_string()))?;

    let [h1, h2, h3, h4, p1, p2] = numbers[..] else {
        return Err(TransferError::InvalidPortCommand(argument.to_string()));
    };
    let ip = Ipv4Addr::new(h1, h2, h3, h4);
    let port = (u16::from(p1) << 8) | u16::from(p2);
    Ok(SocketAddr::new(IpAddr::V4(ip), port))
}

/// Parses an EPRT argument such as `|1|132.235.1.2|6275|` or `|2|::1|6275|`.
///
/// The first character is the delimiter. Protocol 1 requires an IPv4 address and
/// protocol 2 an IPv6 one.
pub fn parse_eprt_argument(argument: &str) -> Result<SocketAddr, TransferError> {
    let invalid = || TransferError::InvalidPortCommand(argument.to_string());
    let argument = argument.trim();
    let delimiter = argument.chars().next().ok_or_else(invalid)?;
    let fields: Vec<&str> = argument.split(delimiter).collect();
    let ["", protocol, address, port, ""] = fields[..] else {
        return Err(invalid());
    };

    let ip: IpAddr = address.parse().map_err(|_| invalid())?;
    match (protocol, ip) {
        ("1", IpAddr::V4(_)) | ("2", IpAddr::V6(_)) => {}
        _ => return Err(invalid()),
    }
    let port: u16 = port.parse().map_err(|_| invalid())?;
    Ok(SocketAddr::new(ip, port))
}

/// Formats the `(h1,h2,h3,h4,p1,p2)` part of a 227 reply. IPv4 only.
pub fn format_passive_address(addr: SocketAddr) -> Option<String> {
    let IpAddr::V4(ip) = addr.ip() else {
        return None;
    };
    let [h1, h2, h3, h4] = ip.octets();
    let port = addr.port();
    Some(format!(
        "({},{},{},{},{},{})",
        h1,
        h2,
        h3,
        h4,
        port >> 8,
        port & 0xff
    ))
}
