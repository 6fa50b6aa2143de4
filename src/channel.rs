use tracing::debug;

use crate::proto::command::Command;
use crate::proto::transport::{Connector, Transport};
use crate::proto::Result;

/// Request/response helpers on top of a [`Connector`].
///
/// Every call opens its own transport and drops it before returning,
/// so a hung port never stays claimed between commands.
pub struct CommandChannel<C> {
    connector: C,
}

impl<C: Connector> CommandChannel<C> {
    pub fn new(connector: C) -> Self {
        Self { connector }
    }

    pub fn connector(&self) -> &C {
        &self.connector
    }

    pub(crate) fn open(&self, port: &str) -> Result<Transport> {
        debug!(port, "opening port");
        self.connector.open(port)
    }

    /// Fire and forget, nothing is read back.
    pub async fn send_no_reply(&self, port: &str, cmd: Command) -> Result<()> {
        let mut transport = self.open(port)?;
        transport.write_line(cmd).await
    }

    /// Returns the first reply line, empty if the device stayed silent.
    ///
    /// Safe to use while the device streams measurements, only one line is
    /// consumed.
    pub async fn send_single_reply(&self, port: &str, cmd: Command) -> Result<String> {
        let mut transport = self.open(port)?;
        transport.write_line(cmd).await?;
        transport.read_line().await
    }

    /// Collects reply lines until the device goes quiet.
    ///
    /// Must not be used while the device prints measurements continuously.
    pub async fn send_multi_reply(&self, port: &str, cmd: Command) -> Result<Vec<String>> {
        let mut transport = self.open(port)?;
        transport.write_line(cmd).await?;
        transport.read_lines().await
    }
}
