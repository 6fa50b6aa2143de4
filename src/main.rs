#![deny(clippy::unwrap_used)]

use clap::{arg, command, value_parser, ArgAction};
use std::io::ErrorKind;
use std::process::exit;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use measstation::proto::conv::pretty_ts;
use measstation::{
    ProtoError, Result, SerialConfig, SerialConnector, Session, DEFAULT_BAUDRATE,
    DEFAULT_TIMEOUT,
};

#[tokio::main]
async fn main() {
    let matches = command!() // requires `cargo` feature
        .arg(
            arg!(
                -p --device <PORT> "Serial port of the station, skips auto detection"
            )
            .required(false),
        )
        .arg(arg!(
            -d --debug ... "Turn debugging information on"
        ))
        .arg(
            arg!(
                -b --baudrate <BAUDRATE> "Baudrate"
            )
            .default_value(DEFAULT_BAUDRATE.to_string())
            .value_parser(value_parser!(u32)),
        )
        .arg(
            arg!(
                -t --timeout <MS> "Read timeout in milliseconds"
            )
            .default_value(DEFAULT_TIMEOUT.as_millis().to_string())
            .value_parser(value_parser!(u64)),
        )
        .subcommand(clap::Command::new("detect").about("Search for the station"))
        .subcommand(clap::Command::new("state").about("Current station mode"))
        .subcommand(
            clap::Command::new("meas")
                .about("Enter MEAS mode and start logging")
                .arg(arg!(--display "Print every sample while measuring").action(ArgAction::SetTrue)),
        )
        .subcommand(clap::Command::new("comm").about("Enter COMM mode"))
        .subcommand(
            clap::Command::new("init")
                .about("Clear storage and set its start time to now (leaves COMM mode active)"),
        )
        .subcommand(
            clap::Command::new("frequency")
                .about("Sampling interval")
                .arg(
                    arg!(<seconds> "Seconds between two samples")
                        .value_parser(value_parser!(u32).range(1..)),
                ),
        )
        .subcommand(clap::Command::new("readout").about("Download all stored samples"))
        .subcommand(
            clap::Command::new("send")
                .about("Send a raw command and print all replies")
                .arg(arg!(<command> "Command line, e.g. getState")),
        )
        .subcommand(
            clap::Command::new("monitor")
                .about("Follow samples printed in MEAS mode with display on")
                .arg(
                    arg!(-n --count <N> "Stop after N samples")
                        .required(false)
                        .value_parser(value_parser!(usize)),
                ),
        )
        .subcommand_required(true)
        .get_matches();

    init_logging(matches.get_count("debug"));

    if let Err(e) = handle_args(&matches).await {
        match e {
            ProtoError::Detection { scanned } => {
                eprintln!("No measurement station found ({} ports scanned)", scanned);
            }
            ProtoError::PortUnavailable { port, source } => {
                if source.kind() == tokio_serial::ErrorKind::NoDevice
                    || matches!(source.kind(), tokio_serial::ErrorKind::Io(ErrorKind::NotFound))
                {
                    eprintln!("{}: File not found", port);
                } else {
                    eprintln!("I/O Error: {} [device: {}]", source, port);
                }
            }
            ProtoError::Serial(err) => {
                eprintln!("Serial I/O error: {}", err);
            }
            ProtoError::Io(err) => {
                eprintln!("I/O Error: {}", err);
            }
            ProtoError::Format { line, reason } => {
                eprintln!("Received a malformed line {:?} ({}), aborting!", line, reason);
            }
            ProtoError::Protocol(msg) => {
                eprintln!("Station did not follow the protocol: {}", msg);
            }
            ProtoError::Abort => {
                eprintln!("Failed to communicate with device, aborting!");
            }
        }
        exit(-1);
    }
}

fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("measstation={}", level)));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn handle_args(matches: &clap::ArgMatches) -> Result<()> {
    let config = SerialConfig {
        baudrate: *matches
            .get_one::<u32>("baudrate")
            .unwrap_or(&DEFAULT_BAUDRATE),
        timeout: matches
            .get_one::<u64>("timeout")
            .map(|ms| Duration::from_millis(*ms))
            .unwrap_or(DEFAULT_TIMEOUT),
    };
    let connector = SerialConnector::new(config);

    let mut session = match matches.get_one::<String>("device") {
        Some(port) => Session::with_port(connector, port.clone()).await?,
        None => Session::detect(connector).await?,
    };

    eprintln!("Connected to: {}\n", session.port());

    match matches.subcommand() {
        Some(("detect", _args)) => {
            println!("{}", session.port());
        }
        Some(("state", _args)) => {
            println!("Mode: {}", session.state().await?);
        }
        Some(("meas", args)) => {
            let display = args.get_flag("display");
            report(session.enter_meas_mode(display).await?, "MEAS");
        }
        Some(("comm", _args)) => {
            report(session.enter_comm_mode().await?, "COMM");
        }
        Some(("init", _args)) => {
            let baseline = session.init_storage().await?;
            println!("Storage initialized, start time {}", pretty_ts(&baseline));
        }
        Some(("frequency", args)) => {
            if let Some(seconds) = args.get_one::<u32>("seconds") {
                session.set_meas_freq(*seconds).await?;
                println!("OK");
            }
        }
        Some(("readout", _args)) => {
            let table = session.readout_storage().await?;
            print!("{}", table);
        }
        Some(("send", args)) => {
            if let Some(command) = args.get_one::<String>("command") {
                for line in session.send_command(command.clone()).await? {
                    println!("{}", line);
                }
            }
        }
        Some(("monitor", args)) => {
            let limit = args.get_one::<usize>("count").copied();
            let mut monitor = session.live_monitor()?;
            let mut seen = 0;
            while limit.map_or(true, |n| seen < n) {
                if let Some(reading) = monitor.next_reading().await? {
                    println!("{}", reading);
                    seen += 1;
                }
            }
        }
        _ => {
            unreachable!("subcommand is required")
        }
    }

    Ok(())
}

fn report(confirmed: bool, mode: &str) {
    if confirmed {
        println!("OK, station in {} mode", mode);
    } else {
        eprintln!("Station did not confirm {} mode", mode);
        exit(1);
    }
}
