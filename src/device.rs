use chrono::{DateTime, Utc};
use std::marker::PhantomData;
use tracing::{debug, info, warn};

use crate::channel::CommandChannel;
use crate::measurement::{LiveReading, RecordTable};
use crate::proto::command::Command;
use crate::proto::conv::datetime_to_epoch;
use crate::proto::response::{is_station_ident, DeviceMode};
use crate::proto::transport::{Connector, SerialConnector, Transport};
use crate::proto::{ProtoError, Result};
use crate::readout;

/// Outcome of checking one candidate port.
#[derive(Debug, Clone, PartialEq, Eq)]
enum PortCheck {
    Station,
    Foreign(String),
    Unreachable,
}

/// Connection to a detected measurement station.
///
/// The port is fixed when the session is created. Operations take
/// `&mut self`, a session handles one request at a time.
pub struct Session<C = SerialConnector> {
    port: String,
    channel: CommandChannel<C>,
}

impl Session<SerialConnector> {
    /// Scans all serial ports with the default settings.
    pub async fn new() -> Result<Self> {
        Self::detect(SerialConnector::default()).await
    }
}

impl<C: Connector> Session<C> {
    /// Tries every port offered by `connector` in sorted order and binds
    /// the first one answering `whoami` as a station.
    pub async fn detect(connector: C) -> Result<Self> {
        let channel = CommandChannel::new(connector);
        let mut ports = channel.connector().available_ports()?;
        ports.sort();
        info!("searching for device on {} ports", ports.len());

        for port in &ports {
            match Self::check_port(&channel, port).await {
                PortCheck::Station => {
                    info!(port = port.as_str(), "found measurement station");
                    return Ok(Self {
                        port: port.clone(),
                        channel,
                    });
                }
                PortCheck::Foreign(reply) => {
                    debug!(port = port.as_str(), "different device on port: {:?}", reply)
                }
                PortCheck::Unreachable => {}
            }
        }
        Err(ProtoError::Detection {
            scanned: ports.len(),
        })
    }

    /// Binds `port` directly, after checking the device identifies itself.
    pub async fn with_port(connector: C, port: impl Into<String>) -> Result<Self> {
        let port = port.into();
        let channel = CommandChannel::new(connector);
        let reply = channel.send_single_reply(&port, Command::WhoAmI).await?;
        if is_station_ident(&reply) {
            info!(port = port.as_str(), "measurement station confirmed");
            Ok(Self { port, channel })
        } else {
            warn!(port = port.as_str(), "unexpected whoami reply: {:?}", reply);
            Err(ProtoError::Detection { scanned: 1 })
        }
    }

    async fn check_port(channel: &CommandChannel<C>, port: &str) -> PortCheck {
        match channel.send_single_reply(port, Command::WhoAmI).await {
            Ok(reply) if is_station_ident(&reply) => PortCheck::Station,
            Ok(reply) => PortCheck::Foreign(reply),
            Err(err) => {
                warn!(port, "port could not be used: {}", err);
                PortCheck::Unreachable
            }
        }
    }

    pub fn port(&self) -> &str {
        &self.port
    }

    pub async fn whoami(&mut self) -> Result<String> {
        self.channel
            .send_single_reply(&self.port, Command::WhoAmI)
            .await
    }

    pub async fn state(&mut self) -> Result<DeviceMode> {
        let reply = self
            .channel
            .send_single_reply(&self.port, Command::GetState)
            .await?;
        Ok(DeviceMode::from(reply.as_str()))
    }

    /// Starts measuring. With `display` the station prints every sample.
    ///
    /// Returns `false` if the station does not report MEAS afterwards.
    pub async fn enter_meas_mode(&mut self, display: bool) -> Result<bool> {
        self.channel
            .send_no_reply(&self.port, Command::EnterMeas)
            .await?;
        self.channel
            .send_no_reply(&self.port, Command::DisplayMeas(display))
            .await?;
        self.expect_mode(DeviceMode::Meas).await
    }

    /// Returns `false` if the station does not report COMM afterwards.
    pub async fn enter_comm_mode(&mut self) -> Result<bool> {
        self.channel
            .send_no_reply(&self.port, Command::EnterComm)
            .await?;
        self.expect_mode(DeviceMode::Comm).await
    }

    async fn expect_mode(&mut self, expected: DeviceMode) -> Result<bool> {
        let mode = self.state().await?;
        if mode == expected {
            info!(port = self.port.as_str(), "station in {} mode", mode);
            Ok(true)
        } else {
            warn!(
                port = self.port.as_str(),
                "expected {} mode, station reports {}", expected, mode
            );
            Ok(false)
        }
    }

    /// Clears the station storage and sets its baseline to now (UTC).
    ///
    /// The station stays in COMM mode, call [`Self::enter_meas_mode`] to
    /// resume measuring.
    pub async fn init_storage(&mut self) -> Result<DateTime<Utc>> {
        let now = Utc::now();
        self.init_storage_at(now).await?;
        Ok(now)
    }

    pub async fn init_storage_at(&mut self, baseline: DateTime<Utc>) -> Result<()> {
        if !self.enter_comm_mode().await? {
            warn!(port = self.port.as_str(), "sending INIT without confirmed COMM mode");
        }
        self.channel
            .send_no_reply(&self.port, Command::Init(datetime_to_epoch(&baseline)))
            .await?;
        info!(port = self.port.as_str(), "storage initialized at {}", baseline);
        Ok(())
    }

    /// Sets the sampling interval. The station does not acknowledge it.
    pub async fn set_meas_freq(&mut self, seconds: u32) -> Result<()> {
        self.channel
            .send_no_reply(&self.port, Command::SetFrequency(seconds))
            .await
    }

    /// Downloads all stored samples. Leaves the station in COMM mode.
    pub async fn readout_storage(&mut self) -> Result<RecordTable> {
        let mut transport = self.channel.open(&self.port)?;
        readout::readout(&mut transport).await
    }

    /// Sends an arbitrary command line and collects all reply lines.
    pub async fn send_command(&mut self, line: impl Into<String>) -> Result<Vec<String>> {
        self.channel
            .send_multi_reply(&self.port, Command::Raw(line.into()))
            .await
    }

    /// Keeps the port open to follow samples printed in MEAS mode.
    pub fn live_monitor(&mut self) -> Result<LiveMonitor<'_>> {
        let transport = self.channel.open(&self.port)?;
        Ok(LiveMonitor {
            transport,
            _session: PhantomData,
        })
    }
}

/// Samples printed by a station measuring with display enabled.
///
/// Holds the port until dropped.
pub struct LiveMonitor<'a> {
    transport: Transport,
    _session: PhantomData<&'a mut ()>,
}

impl LiveMonitor<'_> {
    /// `None` if no sample arrived within the read timeout.
    pub async fn next_reading(&mut self) -> Result<Option<LiveReading>> {
        let line = self.transport.read_line().await?;
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }
        let value = line
            .parse::<f32>()
            .map_err(|e| ProtoError::format(line, e))?;
        Ok(Some(LiveReading {
            received: Utc::now(),
            value,
        }))
    }
}
