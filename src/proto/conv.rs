use byteorder::{BigEndian, ByteOrder};
use chrono::{DateTime, Local, Utc};

/// The station transmits a sample as the bit pattern of an IEEE-754
/// single, printed as unsigned decimal.
pub fn bits_to_f32(bits: u32) -> f32 {
    let mut buf = [0; 4];
    BigEndian::write_u32(&mut buf, bits);
    BigEndian::read_f32(&buf)
}

/// Inverse of [`bits_to_f32`], what the firmware does before printing.
pub fn f32_to_bits(value: f32) -> u32 {
    let mut buf = [0; 4];
    BigEndian::write_f32(&mut buf, value);
    BigEndian::read_u32(&buf)
}

/// Seconds since the Unix epoch, always interpreted as UTC.
pub fn epoch_to_datetime(secs: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(secs, 0)
}

/// Fractional UTC seconds since the Unix epoch, as sent with `INIT`.
pub fn datetime_to_epoch(ts: &DateTime<Utc>) -> f64 {
    ts.timestamp() as f64 + f64::from(ts.timestamp_subsec_nanos()) / 1_000_000_000.0
}

pub fn pretty_ts(&ts: &DateTime<Utc>) -> String {
    let local: DateTime<Local> = ts.into();
    local.format("%Y-%m-%d %H:%M:%S").to_string()
}
