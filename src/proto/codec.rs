use bytes::BytesMut;
use std::{
    fmt::{self, Write},
    io,
};
use tokio_util::codec::{Decoder, Encoder};

use crate::proto::command::Command;

/// Line framing used by the station firmware.
///
/// Commands go out terminated by CRLF, replies come back one per line
/// terminated by CRLF. Decoded lines have trailing whitespace stripped,
/// so `"MEAS\r\n"` becomes `"MEAS"`.
#[derive(Default)]
pub struct LineCodec;

impl LineCodec {
    /// Drains whatever is buffered without waiting for a line terminator.
    pub(crate) fn take_partial(src: &mut BytesMut) -> String {
        let raw = src.split();
        Self::convert_string(&raw)
    }

    fn convert_string(payload: impl AsRef<[u8]>) -> String {
        String::from_utf8_lossy(payload.as_ref())
            .trim_end()
            .to_string()
    }
}

impl Decoder for LineCodec {
    type Item = String;
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match src.as_ref().iter().position(|b| *b == b'\n') {
            Some(n) => {
                let line = src.split_to(n + 1);
                Ok(Some(Self::convert_string(&line)))
            }
            None => Ok(None),
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match self.decode(src)? {
            Some(line) => Ok(Some(line)),
            None if src.is_empty() => Ok(None),
            None => Ok(Some(Self::take_partial(src))),
        }
    }
}

fn write_fmt_guarded(dst: &mut BytesMut, args: fmt::Arguments<'_>) -> Result<(), io::Error> {
    dst.write_fmt(args)
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e))
}

impl Encoder<Command> for LineCodec {
    type Error = io::Error;

    fn encode(&mut self, item: Command, dst: &mut BytesMut) -> Result<(), Self::Error> {
        write_fmt_guarded(dst, format_args!("{}\r\n", item))
    }
}
