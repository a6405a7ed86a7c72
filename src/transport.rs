//! The byte stream the driver talks over, and how one gets opened.

use crate::config::SerialConfig;

/// A duplex byte stream to the instrument.
///
/// Reads must honour the read timeout the stream was opened with: when nothing
/// arrives in time, return `Ok(0)` or an error whose kind is
/// [`embedded_io::ErrorKind::TimedOut`], never block forever.
pub trait Transport: embedded_io::Read + embedded_io::Write {
    /// Whether the stream is still usable.
    fn is_open(&self) -> bool {
        true
    }

    /// Release the underlying device. The stream is dropped right after.
    fn close(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// Opens a [`Transport`] to a device address, e.g. `/dev/ttyUSB0` or `COM3`.
pub trait Connector {
    type Transport: Transport;

    fn open(
        &mut self,
        address: &str,
        config: &SerialConfig,
    ) -> Result<Self::Transport, <Self::Transport as embedded_io::ErrorType>::Error>;
}

/// Error type produced by the transport of connector `C`.
pub type TransportError<C> =
    <<C as Connector>::Transport as embedded_io::ErrorType>::Error;
