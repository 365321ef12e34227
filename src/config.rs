use crate::ping_error::{PingError, PingErrorKind, PingResult};
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::time::Duration;

/// How long to wait for a reply before reporting a timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(1000);
/// Pause between a reply and the next probe, unless flooding.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum IpVersion {
    V4,
    V6,
}

impl IpVersion {
    pub(crate) fn parse_address(self, address: &str) -> PingResult<IpAddr> {
        let parsed = match self {
            IpVersion::V4 => address.parse::<Ipv4Addr>().map(IpAddr::V4).ok(),
            IpVersion::V6 => address.parse::<Ipv6Addr>().map(IpAddr::V6).ok(),
        };
        parsed.ok_or_else(|| {
            PingError::new(
                PingErrorKind::InvalidAddress,
                format!("\"{address}\" is not a valid {self} address"),
            )
        })
    }
}

impl TryFrom<u8> for IpVersion {
    type Error = PingError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            4 => Ok(IpVersion::V4),
            6 => Ok(IpVersion::V6),
            _ => Err(invalid_version()),
        }
    }
}

impl fmt::Display for IpVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IpVersion::V4 => write!(f, "IPv4"),
            IpVersion::V6 => write!(f, "IPv6"),
        }
    }
}

fn invalid_version() -> PingError {
    PingError::new(PingErrorKind::Config, "the type is invalid! Use 4 for IPv4 and 6 for IPv6.")
}

#[allow(clippy::module_name_repetitions)]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProbeConfig {
    pub address: String,
    pub ip_version: IpVersion,
    /// Number of probes to send; `0` runs until stopped.
    pub count: u32,
    pub flood: bool,
    pub timeout: Duration,
    pub interval: Duration,
}

impl ProbeConfig {
    pub fn new(address: impl Into<String>, ip_version: IpVersion) -> Self {
        ProbeConfig {
            address: address.into(),
            ip_version,
            count: 0,
            flood: false,
            timeout: DEFAULT_TIMEOUT,
            interval: DEFAULT_INTERVAL,
        }
    }

    /// Validates raw command-line values. Neither the address nor the version has a default.
    pub fn from_args(address: Option<String>, ip_version: Option<u8>, count: u32, flood: bool) -> PingResult<Self> {
        let address = address
            .filter(|address| !address.is_empty())
            .ok_or_else(|| PingError::new(PingErrorKind::Config, "the address is required!"))?;
        let ip_version = ip_version.ok_or_else(invalid_version).and_then(IpVersion::try_from)?;
        Ok(ProbeConfig { count, flood, ..ProbeConfig::new(address, ip_version) })
    }

    pub(crate) fn has_probes_left(&self, sent: u32) -> bool {
        self.count == 0 || sent < self.count
    }
}
