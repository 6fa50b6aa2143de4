//!
//! This library provides communication with a MEAS_STATION temperature logger.
//!
//! <br>
//!
//! # Details
//!
//! - The station is attached through a USB serial adapter (115200 baud, 8N1).
//!
//! - Basic setup and readout
//!
//!   ```no_run
//!   use measstation::Session;
//!   #[tokio::main]
//!   async fn main() -> measstation::Result<()> {
//!       let mut session = Session::new().await?;
//!       eprintln!("Connected to: {}\n", session.port());
//!       let table = session.readout_storage().await?;
//!       for record in table.iter() {
//!           println!("{}", record);
//!       }
//!       Ok(())
//!   }
//!   ```
//!
//! Every operation opens the serial port, talks to the station and closes the
//! port again before returning.
//!

use std::time::Duration;

pub mod channel;
pub mod device;
pub mod measurement;
pub mod proto;
pub mod readout;

pub use device::Session;
pub use measurement::{Measurement, MeasurementKind, RecordTable};
pub use proto::transport::{Connector, SerialConfig, SerialConnector};
pub use proto::{ProtoError, Result};

#[cfg(unix)]
pub const DEFAULT_TTY: &str = "/dev/ttyUSB0";
#[cfg(windows)]
pub const DEFAULT_TTY: &str = "COM1";

/// Default Baudrate of the station firmware.
pub const DEFAULT_BAUDRATE: u32 = 115200;

/// Every single line read gives up after this duration.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(1);

/// Substring of the `whoami` reply identifying the station.
pub const IDENT_MARKER: &str = "MEAS_STATION";
