use std::fmt;

use crate::IDENT_MARKER;

/// Mode reported by the station on `getState`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceMode {
    Comm,
    Meas,
    /// Anything else, including an empty line after a timeout.
    Unknown(String),
}

impl From<&str> for DeviceMode {
    fn from(line: &str) -> Self {
        match line {
            "COMM" => Self::Comm,
            "MEAS" => Self::Meas,
            other => Self::Unknown(other.to_string()),
        }
    }
}

impl fmt::Display for DeviceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceMode::Comm => f.write_str("COMM"),
            DeviceMode::Meas => f.write_str("MEAS"),
            DeviceMode::Unknown(s) if s.is_empty() => f.write_str("<no reply>"),
            DeviceMode::Unknown(s) => write!(f, "unknown ({})", s),
        }
    }
}

/// Whether a `whoami` reply belongs to a measurement station.
pub fn is_station_ident(reply: &str) -> bool {
    reply.contains(IDENT_MARKER)
}
