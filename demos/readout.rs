use measstation::Session;

#[tokio::main]
async fn main() -> measstation::Result<()> {
    let mut session = Session::new().await?;
    eprintln!("Connected to: {}\n", session.port());

    let table = session.readout_storage().await?;
    for record in table.iter() {
        println!("{}", record);
    }

    // Readout leaves the station in COMM mode.
    session.enter_meas_mode(false).await?;
    Ok(())
}
