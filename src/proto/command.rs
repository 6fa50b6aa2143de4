use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    WhoAmI,
    // Modes
    EnterComm,
    EnterMeas,
    DisplayMeas(bool),
    GetState,
    // Storage, only accepted in COMM mode
    Init(f64),
    Readout,
    // Sampling
    SetFrequency(u32),
    /// Anything typed by a user, sent as is.
    Raw(String),
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::WhoAmI => f.write_str("whoami"),
            Command::EnterComm => f.write_str("enterComm"),
            Command::EnterMeas => f.write_str("enterMeas"),
            Command::DisplayMeas(true) => f.write_str("displayMeas ON"),
            Command::DisplayMeas(false) => f.write_str("displayMeas OFF"),
            Command::GetState => f.write_str("getState"),
            Command::Init(ts) => write!(f, "INIT {:.6}", ts),
            Command::Readout => f.write_str("READOUT"),
            Command::SetFrequency(secs) => write!(f, "setFrequency {}", secs),
            Command::Raw(line) => f.write_str(line),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_text() {
        assert_eq!(Command::DisplayMeas(false).to_string(), "displayMeas OFF");
        assert_eq!(Command::SetFrequency(10).to_string(), "setFrequency 10");
        assert_eq!(
            Command::Init(1700000000.25).to_string(),
            "INIT 1700000000.250000"
        );
    }
}
