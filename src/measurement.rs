use std::fmt;

use chrono::{DateTime, Utc};

use crate::proto::conv::pretty_ts;

/// What a stored sample measures, derived from its type code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeasurementKind {
    /// PT100 sensor, degrees Celsius.
    Temperature,
    Other(u8),
}

impl From<u8> for MeasurementKind {
    fn from(code: u8) -> Self {
        match code {
            1 => Self::Temperature,
            other => Self::Other(other),
        }
    }
}

impl MeasurementKind {
    pub fn unit(&self) -> &'static str {
        match self {
            MeasurementKind::Temperature => "°C",
            MeasurementKind::Other(_) => "",
        }
    }
}

impl fmt::Display for MeasurementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MeasurementKind::Temperature => f.write_str("Temperature"),
            MeasurementKind::Other(code) => write!(f, "Type {}", code),
        }
    }
}

/// One sample read back from storage.
#[derive(Debug, Clone, PartialEq)]
pub struct Measurement {
    pub type_code: u8,
    pub timestamp: DateTime<Utc>,
    pub value: f32,
}

impl Measurement {
    pub fn kind(&self) -> MeasurementKind {
        self.type_code.into()
    }
}

impl fmt::Display for Measurement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = self.kind();
        write!(
            f,
            "{} {}: {} {}",
            pretty_ts(&self.timestamp),
            kind,
            self.value,
            kind.unit()
        )
    }
}

/// All samples of one readout, in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordTable {
    /// Storage baseline set by the last `INIT`.
    pub start: DateTime<Utc>,
    pub records: Vec<Measurement>,
}

impl RecordTable {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Measurement> {
        self.records.iter()
    }
}

impl IntoIterator for RecordTable {
    type Item = Measurement;
    type IntoIter = std::vec::IntoIter<Measurement>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_iter()
    }
}

impl fmt::Display for RecordTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Storage started: {} ({} records)",
            pretty_ts(&self.start),
            self.len()
        )?;
        for record in &self.records {
            writeln!(f, "{}", record)?;
        }
        Ok(())
    }
}

/// Sample printed by the station while measuring with display enabled.
/// The station does not send a time, so it carries the host receive time.
#[derive(Debug, Clone, PartialEq)]
pub struct LiveReading {
    pub received: DateTime<Utc>,
    pub value: f32,
}

impl fmt::Display for LiveReading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {:.3} °C", pretty_ts(&self.received), self.value)
    }
}
