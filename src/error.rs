//! Our error types for the SIM928.

use thiserror::Error;

pub type Result<T, I> = core::result::Result<T, Error<I>>;

/// Custom error type for SIM928 communications.
///
/// Only transport level faults are reported through this type. Responses the
/// instrument sends which can't be interpreted are turned into sentinel values
/// by the individual commands instead.
#[derive(Error, Debug)]
pub enum Error<I: embedded_io::Error> {
    #[error("Serial communication error")]
    SerialError(I),
    #[error("Failed to open serial port")]
    OpenError(I),
    #[error("Serial port was opened but reports itself closed")]
    NotOpen,
    #[error("Command line does not fit the send buffer")]
    CommandTooLong,
}
