use std::num::IntErrorKind;
use crate::app::AppError;

pub const USAGE: &str = "Usage: rpi-i2c [<div.cdiv> <clkt.tout>]";

/// What the user asked for on the command line.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Command {
    /// Print the current timing values.
    Read,
    /// Set new timing values. Both values are still unvalidated.
    Write { cdiv: i64, tout: i64 },
}

impl Command {
    /// Parses the arguments, without the program name.
    pub fn parse<S: AsRef<str>>(args: &[S]) -> Result<Self, AppError> {
        match args {
            [] => Ok(Command::Read),
            [cdiv, tout] => Ok(Command::Write {
                cdiv: parse_value("CDIV", cdiv.as_ref())?,
                tout: parse_value("TOUT", tout.as_ref())?,
            }),
            _ => Err(AppError::Usage),
        }
    }
}

/// Parses a base-10 value.
///
/// Values too large for an `i64` saturate, so the range check rejects them as out of range
/// instead of unparsable.
fn parse_value(name: &'static str, value: &str) -> Result<i64, AppError> {
    match value.trim().parse::<i64>() {
        Ok(parsed) => Ok(parsed),
        Err(source) => match source.kind() {
            IntErrorKind::PosOverflow => Ok(i64::MAX),
            IntErrorKind::NegOverflow => Ok(i64::MIN),
            _ => Err(AppError::Parse {
                name,
                value: value.to_string(),
                source,
            }),
        },
    }
}
