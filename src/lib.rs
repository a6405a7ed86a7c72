//! This crate provides an interface for communicating with and controlling the
//! Stanford Research Systems SIM928 isolated voltage source.
//!
//! The SIM928 is a battery-backed source with an output range of ±20V. It speaks
//! a line oriented ASCII protocol where every command and every response ends
//! with `\r\n`, and only one request may be outstanding at a time.
//!
//! The serial port used for comms is configured like so (see [config::SerialConfig]):
//! * Default baud rate: 9600
//! * Data bits: 8
//! * Stop bits: 1
//! * Parity: None
//! * Flow control: RTS/CTS (hardware), no XON/XOFF
//! * Read timeout: 100ms
//!
//! Any byte stream implementing [embedded_io::Read] & [embedded_io::Write] can be
//! used as transport through the [transport::Connector] trait. Enable the `serial`
//! feature for a connector backed by the `serialport` crate.

pub mod command;
pub mod config;
pub mod error;
pub mod input;
#[cfg(feature = "serial")]
pub mod serial;
pub mod sim928;
pub mod transport;
pub mod types;

#[cfg(test)]
mod mock_serial;

pub use sim928::Sim928;
