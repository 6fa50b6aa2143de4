use measstation::{SerialConfig, SerialConnector, Session, DEFAULT_TTY};

#[tokio::main]
async fn main() -> measstation::Result<()> {
    let connector = SerialConnector::new(SerialConfig::default());
    let mut session = Session::with_port(connector, DEFAULT_TTY).await?;

    if !session.enter_meas_mode(true).await? {
        eprintln!("Station did not switch to MEAS mode");
    }

    let mut monitor = session.live_monitor()?;
    loop {
        match monitor.next_reading().await? {
            Some(reading) => println!("{}", reading),
            None => println!("NO_DATA"),
        }
    }
}
