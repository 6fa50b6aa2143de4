use futures::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_serial::SerialPortBuilderExt;
use tokio_util::codec::{Decoder, Framed};
use tracing::{debug, trace};

use super::{codec::LineCodec, command::Command, ProtoError, Result};
use crate::{DEFAULT_BAUDRATE, DEFAULT_TIMEOUT};

pub trait SerialIo: AsyncRead + AsyncWrite + Send + Unpin {}

impl<T> SerialIo for T where T: AsyncRead + AsyncWrite + Send + Unpin {}

/// Line oriented connection to one serial port.
///
/// The OS handle is released when the transport is dropped, so a transport
/// should never outlive the operation that opened it.
pub struct Transport {
    port: String,
    timeout: Duration,
    stream: Framed<Box<dyn SerialIo>, LineCodec>,
}

impl Transport {
    pub fn new(port: impl Into<String>, io: impl SerialIo + 'static, timeout: Duration) -> Self {
        let io: Box<dyn SerialIo> = Box::new(io);
        Self {
            port: port.into(),
            timeout,
            stream: LineCodec::default().framed(io),
        }
    }

    pub fn port(&self) -> &str {
        &self.port
    }

    /// Writes the command followed by CRLF and flushes it out.
    pub async fn write_line(&mut self, cmd: Command) -> Result<()> {
        debug!(port = %self.port, "> {}", cmd);
        self.stream.send(cmd).await?;
        Ok(())
    }

    /// Reads one line, or whatever arrived before the timeout elapsed.
    ///
    /// A timeout is not an error: the result is then empty or truncated.
    pub async fn read_line(&mut self) -> Result<String> {
        match tokio::time::timeout(self.timeout, self.stream.next()).await {
            Ok(Some(Ok(line))) => {
                debug!(port = %self.port, "< {}", line);
                Ok(line)
            }
            Ok(Some(Err(ioerr))) => Err(ioerr.into()),
            Ok(None) => Err(ProtoError::Abort),
            Err(_elapsed) => {
                let partial = LineCodec::take_partial(self.stream.read_buffer_mut());
                debug!(port = %self.port, "< {:?} (timed out)", partial);
                Ok(partial)
            }
        }
    }

    /// Reads lines until one read times out.
    pub async fn read_lines(&mut self) -> Result<Vec<String>> {
        let mut lines = Vec::new();
        loop {
            match tokio::time::timeout(self.timeout, self.stream.next()).await {
                Ok(Some(Ok(line))) => {
                    debug!(port = %self.port, "< {}", line);
                    lines.push(line);
                }
                Ok(Some(Err(ioerr))) => return Err(ioerr.into()),
                Ok(None) => break,
                Err(_elapsed) => {
                    let partial = LineCodec::take_partial(self.stream.read_buffer_mut());
                    if !partial.is_empty() {
                        lines.push(partial);
                    }
                    break;
                }
            }
        }
        Ok(lines)
    }
}

impl Drop for Transport {
    fn drop(&mut self) {
        trace!(port = %self.port, "closing port");
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SerialConfig {
    pub baudrate: u32,
    /// Per line read timeout.
    pub timeout: Duration,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            baudrate: DEFAULT_BAUDRATE,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Source of transports. Lets the session run against real ports or a
/// simulated station.
pub trait Connector {
    /// Candidate ports, sorted by name.
    fn available_ports(&self) -> Result<Vec<String>>;

    /// Fails with [`ProtoError::PortUnavailable`] if the port can't be opened.
    fn open(&self, port: &str) -> Result<Transport>;
}

#[derive(Debug, Clone, Default)]
pub struct SerialConnector {
    config: SerialConfig,
}

impl SerialConnector {
    pub fn new(config: SerialConfig) -> Self {
        Self { config }
    }
}

impl Connector for SerialConnector {
    fn available_ports(&self) -> Result<Vec<String>> {
        let mut ports: Vec<String> = tokio_serial::available_ports()?
            .into_iter()
            .map(|info| info.port_name)
            .collect();
        ports.sort();
        ports.dedup();
        Ok(ports)
    }

    fn open(&self, port: &str) -> Result<Transport> {
        let stream = tokio_serial::new(port, self.config.baudrate)
            .data_bits(tokio_serial::DataBits::Eight)
            .parity(tokio_serial::Parity::None)
            .stop_bits(tokio_serial::StopBits::One)
            .timeout(self.config.timeout)
            .open_native_async()
            .map_err(|source| ProtoError::PortUnavailable {
                port: port.to_string(),
                source,
            })?;
        Ok(Transport::new(port, stream, self.config.timeout))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proto::fake::FakeBuffer;

    fn transport(data: &[u8]) -> Transport {
        Transport::new(
            "fake0",
            FakeBuffer::new(data.to_vec()),
            Duration::from_millis(20),
        )
    }

    #[tokio::test]
    async fn test_read_line() {
        let mut t = transport(b"MEAS_STATION\r\n");
        assert_eq!(t.read_line().await.unwrap(), "MEAS_STATION");
    }

    #[tokio::test]
    async fn test_read_line_times_out_empty() {
        let mut t = transport(b"");
        assert_eq!(t.read_line().await.unwrap(), "");
    }

    #[tokio::test]
    async fn test_read_line_returns_truncated_data() {
        let mut t = transport(b"COMM\r\nME");
        assert_eq!(t.read_line().await.unwrap(), "COMM");
        assert_eq!(t.read_line().await.unwrap(), "ME");
        assert_eq!(t.read_line().await.unwrap(), "");
    }

    #[tokio::test]
    async fn test_read_lines_until_quiet() {
        let mut t = transport(b"a\r\nb\r\nc");
        assert_eq!(t.read_lines().await.unwrap(), vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_write_line() {
        let mut t = transport(b"");
        assert!(t.write_line(Command::EnterComm).await.is_ok());
    }
}
