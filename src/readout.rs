//! Decoder for the `READOUT` stream.
//!
//! After `READOUT` the station sends a header line, one line per stored
//! sample and a final `END`:
//!
//! ```text
//! 1700000000; 2;
//! 1, 5, 1065353216;
//! 2, 3, 1077936128;
//! END
//! ```
//!
//! The header carries the storage baseline (UTC epoch seconds) and the number
//! of samples. Each sample carries its type code, the seconds elapsed since the
//! previous sample and the raw bits of an `f32` printed as unsigned decimal.

use chrono::{DateTime, Duration, Utc};
use tracing::{info, trace};

use crate::measurement::{Measurement, RecordTable};
use crate::proto::command::Command;
use crate::proto::conv::{bits_to_f32, epoch_to_datetime};
use crate::proto::transport::Transport;
use crate::proto::{ProtoError, Result};

pub const TERMINATOR: &str = "END";

/// Upper bound for reserving record slots from an untrusted header count.
const PREALLOC_LIMIT: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadoutHeader {
    pub timestamp: i64,
    pub entry_count: usize,
}

impl TryFrom<&str> for ReadoutHeader {
    type Error = ProtoError;

    fn try_from(line: &str) -> Result<Self> {
        let mut fields = line.split(';').map(str::trim);
        let timestamp = match fields.next() {
            Some(f) if !f.is_empty() => f
                .parse::<i64>()
                .map_err(|e| ProtoError::format(line, format!("timestamp: {}", e)))?,
            _ => return Err(ProtoError::format(line, "missing timestamp")),
        };
        let entry_count = match fields.next() {
            Some(f) if !f.is_empty() => f
                .parse::<usize>()
                .map_err(|e| ProtoError::format(line, format!("entry count: {}", e)))?,
            _ => return Err(ProtoError::format(line, "missing entry count")),
        };
        Ok(Self {
            timestamp,
            entry_count,
        })
    }
}

/// A sample line as sent, before the timestamp is reconstructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordLine {
    pub type_code: u8,
    pub delta_secs: u64,
    pub bits: u32,
}

impl RecordLine {
    pub fn value(&self) -> f32 {
        bits_to_f32(self.bits)
    }
}

impl TryFrom<&str> for RecordLine {
    type Error = ProtoError;

    fn try_from(line: &str) -> Result<Self> {
        let fields: Vec<&str> = line.split(',').map(str::trim).collect();
        if fields.len() != 3 {
            return Err(ProtoError::format(
                line,
                format!("expected 3 fields, got {}", fields.len()),
            ));
        }
        let type_code = fields[0]
            .parse::<u8>()
            .map_err(|e| ProtoError::format(line, format!("type: {}", e)))?;
        let delta_secs = fields[1]
            .parse::<u64>()
            .map_err(|e| ProtoError::format(line, format!("delta: {}", e)))?;
        let bits = fields[2]
            .trim_end_matches(';')
            .trim_end()
            .parse::<u32>()
            .map_err(|e| ProtoError::format(line, format!("value: {}", e)))?;
        Ok(Self {
            type_code,
            delta_secs,
            bits,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Header,
    Records { remaining: usize },
    Terminator,
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    NeedMore,
    Done,
}

/// Line driven state machine, fed one received line at a time.
///
/// The first malformed line fails the whole readout, nothing is skipped.
#[derive(Debug)]
pub struct ReadoutDecoder {
    state: State,
    start: Option<DateTime<Utc>>,
    expected: usize,
    elapsed: u64,
    records: Vec<Measurement>,
}

impl Default for ReadoutDecoder {
    fn default() -> Self {
        Self {
            state: State::Header,
            start: None,
            expected: 0,
            elapsed: 0,
            records: Vec::new(),
        }
    }
}

impl ReadoutDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn feed(&mut self, line: &str) -> Result<Step> {
        match self.state {
            State::Header => {
                let header = ReadoutHeader::try_from(line)?;
                let start = epoch_to_datetime(header.timestamp)
                    .ok_or_else(|| ProtoError::format(line, "timestamp out of range"))?;
                self.start = Some(start);
                self.expected = header.entry_count;
                self.records = Vec::with_capacity(header.entry_count.min(PREALLOC_LIMIT));
                self.state = match header.entry_count {
                    0 => State::Terminator,
                    n => State::Records { remaining: n },
                };
                Ok(Step::NeedMore)
            }
            State::Records { remaining } => {
                let start = self.start.ok_or(ProtoError::Abort)?;
                let record = RecordLine::try_from(line)?;
                self.elapsed = self
                    .elapsed
                    .checked_add(record.delta_secs)
                    .ok_or_else(|| ProtoError::format(line, "elapsed time overflows"))?;
                let timestamp = i64::try_from(self.elapsed)
                    .ok()
                    .and_then(Duration::try_seconds)
                    .and_then(|d| start.checked_add_signed(d))
                    .ok_or_else(|| ProtoError::format(line, "timestamp out of range"))?;
                let mea = Measurement {
                    type_code: record.type_code,
                    timestamp,
                    value: record.value(),
                };
                trace!(
                    "record {}/{}: {:?}",
                    self.records.len() + 1,
                    self.expected,
                    mea
                );
                self.records.push(mea);
                self.state = match remaining - 1 {
                    0 => State::Terminator,
                    n => State::Records { remaining: n },
                };
                Ok(Step::NeedMore)
            }
            State::Terminator => {
                if line.trim() != TERMINATOR {
                    return Err(ProtoError::Protocol(format!(
                        "expected {:?} after {} records, got {:?}",
                        TERMINATOR, self.expected, line
                    )));
                }
                self.state = State::Done;
                Ok(Step::Done)
            }
            State::Done => Err(ProtoError::Protocol(format!(
                "unexpected line after {}: {:?}",
                TERMINATOR, line
            ))),
        }
    }

    /// Hands out the table, only after the terminator was seen.
    pub fn finish(self) -> Result<RecordTable> {
        match (self.state, self.start) {
            (State::Done, Some(start)) => Ok(RecordTable {
                start,
                records: self.records,
            }),
            _ => Err(ProtoError::Protocol("readout incomplete".to_string())),
        }
    }
}

/// Runs a complete readout on an open transport.
///
/// Leaves the station in COMM mode.
pub async fn readout(transport: &mut Transport) -> Result<RecordTable> {
    transport.write_line(Command::EnterComm).await?;
    transport.write_line(Command::Readout).await?;

    let mut decoder = ReadoutDecoder::new();
    loop {
        let line = transport.read_line().await?;
        if decoder.feed(&line)? == Step::Done {
            break;
        }
    }
    let table = decoder.finish()?;
    info!(
        port = transport.port(),
        "read {} records starting {}",
        table.len(),
        table.start
    );
    Ok(table)
}
