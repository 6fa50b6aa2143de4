use std::collections::VecDeque;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::transport::{Connector, Transport};
use super::{ProtoError, Result};

/// Simulated station firmware.
pub(crate) struct FakeStation {
    /// `None` makes the station ignore everything.
    pub ident: Option<String>,
    pub meas_mode: bool,
    pub display: bool,
    pub frequency: u32,
    pub init_timestamp: u64,
    pub records: Vec<(u8, u16, u32)>,
    /// Replaces the generated readout stream when set.
    pub readout_override: Option<Vec<String>>,
    /// Replaces the `getState` reply when set.
    pub state_override: Option<String>,
    pub commands: Vec<String>,
    pub(crate) output: VecDeque<u8>,
}

impl Default for FakeStation {
    fn default() -> Self {
        Self {
            ident: Some("MEAS_STATION".to_string()),
            meas_mode: true,
            display: true,
            frequency: 3,
            init_timestamp: 0,
            records: Vec::new(),
            readout_override: None,
            state_override: None,
            commands: Vec::new(),
            output: VecDeque::new(),
        }
    }
}

impl FakeStation {
    pub(crate) fn shared(self) -> Arc<Mutex<Self>> {
        Arc::new(Mutex::new(self))
    }

    pub(crate) fn push_output(&mut self, line: &str) {
        self.output.extend(line.as_bytes());
        self.output.extend(b"\r\n");
    }

    fn handle(&mut self, line: &str) {
        self.commands.push(line.to_string());
        let ident = match &self.ident {
            Some(ident) => ident.clone(),
            None => return,
        };
        let mut parts = line.split_whitespace();
        let cmd = parts.next().unwrap_or_default();
        let arg = parts.next();
        match (cmd, arg) {
            ("whoami", _) => self.push_output(&ident),
            ("enterMeas", _) => self.meas_mode = true,
            ("enterComm", _) => self.meas_mode = false,
            ("getState", _) => {
                let state = match &self.state_override {
                    Some(state) => state.clone(),
                    None if self.meas_mode => "MEAS".to_string(),
                    None => "COMM".to_string(),
                };
                self.push_output(&state);
            }
            ("displayMeas", Some("ON")) => self.display = true,
            ("displayMeas", Some("OFF")) => self.display = false,
            ("setFrequency", Some(secs)) => {
                if let Ok(secs) = secs.parse() {
                    self.frequency = secs;
                }
            }
            ("READOUT", _) if !self.meas_mode => self.readout(),
            ("INIT", Some(ts)) if !self.meas_mode => {
                let digits: String = ts.chars().take_while(|c| c.is_ascii_digit()).collect();
                if let Ok(ts) = digits.parse() {
                    self.init_timestamp = ts;
                    self.records.clear();
                }
            }
            _ => {}
        }
    }

    fn readout(&mut self) {
        if let Some(lines) = self.readout_override.clone() {
            lines.iter().for_each(|l| self.push_output(l));
            return;
        }
        let header = format!("{}; {};", self.init_timestamp, self.records.len());
        self.push_output(&header);
        for (id, delta, data) in self.records.clone() {
            self.push_output(&format!("{}, {}, {};", id, delta, data));
        }
        self.push_output("END");
    }
}

pub(crate) struct FakeBuffer {
    response_buf: Vec<u8>,
    written: Vec<u8>,
    station: Option<Arc<Mutex<FakeStation>>>,
    handles: Option<Arc<AtomicUsize>>,
}

impl FakeBuffer {
    pub(crate) fn new(response_buf: Vec<u8>) -> Self {
        Self {
            response_buf,
            written: Vec::new(),
            station: None,
            handles: None,
        }
    }

    fn attached(station: Arc<Mutex<FakeStation>>, handles: Arc<AtomicUsize>) -> Self {
        handles.fetch_add(1, Ordering::SeqCst);
        Self {
            response_buf: Vec::new(),
            written: Vec::new(),
            station: Some(station),
            handles: Some(handles),
        }
    }
}

impl Drop for FakeBuffer {
    fn drop(&mut self) {
        if let Some(handles) = &self.handles {
            handles.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

impl tokio::io::AsyncRead for FakeBuffer {
    fn poll_read(
        mut self: Pin<&mut Self>,
        _cx: &mut std::task::Context<'_>,
        buf: &mut tokio::io::ReadBuf<'_>,
    ) -> std::task::Poll<std::io::Result<()>> {
        if let Some(station) = self.station.clone() {
            let mut station = station.lock().unwrap();
            let pending: Vec<u8> = station.output.drain(..).collect();
            self.response_buf.extend(pending);
        }
        if self.response_buf.is_empty() {
            // A silent line; the caller's timeout ends the wait.
            return std::task::Poll::Pending;
        }
        let c = buf.remaining().min(self.response_buf.len());
        buf.put_slice(&self.response_buf[0..c]);
        self.response_buf.drain(0..c);
        std::task::Poll::Ready(Ok(()))
    }
}

impl tokio::io::AsyncWrite for FakeBuffer {
    fn poll_write(
        mut self: Pin<&mut Self>,
        _cx: &mut std::task::Context<'_>,
        buf: &[u8],
    ) -> std::task::Poll<std::result::Result<usize, std::io::Error>> {
        self.written.extend_from_slice(buf);
        while let Some(n) = self.written.windows(2).position(|w| w == b"\r\n") {
            let line: Vec<u8> = self.written.drain(..n + 2).take(n).collect();
            if let Some(station) = &self.station {
                station
                    .lock()
                    .unwrap()
                    .handle(&String::from_utf8_lossy(&line));
            }
        }
        std::task::Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(
        self: Pin<&mut Self>,
        _cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<std::result::Result<(), std::io::Error>> {
        std::task::Poll::Ready(Ok(()))
    }

    fn poll_shutdown(
        self: Pin<&mut Self>,
        _cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<std::result::Result<(), std::io::Error>> {
        std::task::Poll::Ready(Ok(()))
    }
}

pub(crate) enum FakePort {
    Station(Arc<Mutex<FakeStation>>),
    Unreachable,
}

/// Connector over simulated ports, listed in the given order.
pub(crate) struct FakeConnector {
    ports: Vec<(String, FakePort)>,
    pub opened: Mutex<Vec<String>>,
    pub handles: Arc<AtomicUsize>,
}

impl FakeConnector {
    pub(crate) const TIMEOUT: Duration = Duration::from_millis(20);

    pub(crate) fn new(ports: Vec<(&str, FakePort)>) -> Self {
        Self {
            ports: ports
                .into_iter()
                .map(|(name, port)| (name.to_string(), port))
                .collect(),
            opened: Mutex::new(Vec::new()),
            handles: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub(crate) fn single(station: &Arc<Mutex<FakeStation>>) -> Self {
        Self::new(vec![("/dev/ttyUSB0", FakePort::Station(station.clone()))])
    }

    pub(crate) fn open_handles(&self) -> usize {
        self.handles.load(Ordering::SeqCst)
    }
}

impl Connector for FakeConnector {
    fn available_ports(&self) -> Result<Vec<String>> {
        let mut ports: Vec<String> = self.ports.iter().map(|(n, _)| n.clone()).collect();
        ports.sort();
        Ok(ports)
    }

    fn open(&self, port: &str) -> Result<Transport> {
        self.opened.lock().unwrap().push(port.to_string());
        match self.ports.iter().find(|(n, _)| n == port) {
            Some((_, FakePort::Station(station))) => Ok(Transport::new(
                port,
                FakeBuffer::attached(station.clone(), self.handles.clone()),
                Self::TIMEOUT,
            )),
            Some((_, FakePort::Unreachable)) => Err(ProtoError::PortUnavailable {
                port: port.to_string(),
                source: tokio_serial::Error::new(tokio_serial::ErrorKind::NoDevice, "busy"),
            }),
            None => Err(ProtoError::PortUnavailable {
                port: port.to_string(),
                source: tokio_serial::Error::new(
                    tokio_serial::ErrorKind::Io(std::io::ErrorKind::NotFound),
                    "not found",
                ),
            }),
        }
    }
}
