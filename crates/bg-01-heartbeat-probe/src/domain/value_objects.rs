//! Value objects for the heartbeat probe.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::errors::CodecError;

/// Legacy TLS record-layer version used for every record of one probe.
///
/// The ClientHello and the heartbeat request of a single probe always carry
/// the same version bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TlsVersion {
    /// TLS 1.0 (`03 01`)
    #[serde(rename = "1.0")]
    Tls10,
    /// TLS 1.1 (`03 02`)
    #[serde(rename = "1.1")]
    Tls11,
    /// TLS 1.2 (`03 03`)
    #[default]
    #[serde(rename = "1.2")]
    Tls12,
}

impl TlsVersion {
    /// All versions the codec can emit, newest first.
    pub const ALL: [TlsVersion; 3] = [TlsVersion::Tls12, TlsVersion::Tls11, TlsVersion::Tls10];

    /// Record-layer `(major, minor)` bytes.
    pub const fn record_bytes(self) -> [u8; 2] {
        match self {
            Self::Tls10 => [0x03, 0x01],
            Self::Tls11 => [0x03, 0x02],
            Self::Tls12 => [0x03, 0x03],
        }
    }

    /// Inverse of [`TlsVersion::record_bytes`].
    pub fn from_record_bytes(bytes: [u8; 2]) -> Option<Self> {
        match bytes {
            [0x03, 0x01] => Some(Self::Tls10),
            [0x03, 0x02] => Some(Self::Tls11),
            [0x03, 0x03] => Some(Self::Tls12),
            _ => None,
        }
    }
}

impl fmt::Display for TlsVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tls10 => write!(f, "TLS1.0"),
            Self::Tls11 => write!(f, "TLS1.1"),
            Self::Tls12 => write!(f, "TLS1.2"),
        }
    }
}

impl FromStr for TlsVersion {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        let version = normalized
            .strip_prefix("tls")
            .unwrap_or(&normalized)
            .trim_start_matches(['v', ' ']);
        match version {
            "1.0" | "10" => Ok(Self::Tls10),
            "1.1" | "11" => Ok(Self::Tls11),
            "1.2" | "12" => Ok(Self::Tls12),
            _ => Err(CodecError::UnsupportedVersion(s.to_string())),
        }
    }
}

/// Terminal classification of one probe run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Classification {
    /// The peer echoed back more than it was sent.
    Vulnerable,
    /// The peer answered correctly, alerted, or closed the connection.
    NotVulnerable,
    /// No proof either way (timeout, transport failure, unparseable reply).
    Inconclusive,
}

impl Classification {
    /// Whether the classification is a definitive answer.
    pub fn is_conclusive(self) -> bool {
        !matches!(self, Self::Inconclusive)
    }

    /// Stable lowercase label for logs and CLI output.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Vulnerable => "vulnerable",
            Self::NotVulnerable => "not-vulnerable",
            Self::Inconclusive => "inconclusive",
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Host and port a probe is aimed at.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProbeTarget {
    /// DNS name or literal IP address
    pub host: String,
    /// TCP port (443 for HTTPS)
    pub port: u16,
}

impl ProbeTarget {
    /// Create a new target.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl fmt::Display for ProbeTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Bracket bare IPv6 literals so the port stays unambiguous
        if self.host.contains(':') && !self.host.starts_with('[') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}
