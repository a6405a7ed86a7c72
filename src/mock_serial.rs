//! We use this mocking module in unit tests to emulate a serial port.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use crate::config::SerialConfig;
use crate::transport::{Connector, Transport};

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum MockSerialError {
    /// Simulated read timeout, no data arrived.
    #[error("Mock read timed out")]
    Timeout,
    /// Generic simulated error for testing
    #[error("Simulated serial error")]
    SimulatedError,
    /// Simulated failure to open the port.
    #[error("Mock port failed to open")]
    OpenFailed,
}

impl embedded_io::Error for MockSerialError {
    fn kind(&self) -> embedded_io::ErrorKind {
        match self {
            MockSerialError::Timeout => embedded_io::ErrorKind::TimedOut,
            MockSerialError::SimulatedError => embedded_io::ErrorKind::Other,
            MockSerialError::OpenFailed => embedded_io::ErrorKind::NotFound,
        }
    }
}

/// Something that happened on the mock line, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Write(Vec<u8>),
    /// A read call, with the number of bytes it delivered.
    Read(usize),
    Close,
}

#[derive(Default)]
struct MockState {
    /// Pre-configured chunks returned by successive reads.
    reads: VecDeque<Result<Vec<u8>, MockSerialError>>,
    events: Vec<Event>,
    read_calls: usize,
    opens: usize,
    open: bool,
    /// Transport claims to be closed even right after opening.
    report_closed: bool,
    should_error_on_open: bool,
    should_error_on_write: bool,
    read_delay: Option<Duration>,
}

/// Shared handle onto the mock line, kept by tests to script and inspect it
/// while the session owns the transport.
#[derive(Clone, Default)]
pub struct MockLine(Arc<Mutex<MockState>>);

impl MockLine {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.0.lock().unwrap()
    }

    pub fn connector(&self) -> MockConnector {
        MockConnector { line: self.clone() }
    }

    /// Queue a chunk of data returned by a single read.
    pub fn push_read(&self, data: &[u8]) {
        self.state().reads.push_back(Ok(data.to_vec()));
    }

    /// Queue a read which fails with a non timeout error.
    pub fn push_read_error(&self) {
        self.state()
            .reads
            .push_back(Err(MockSerialError::SimulatedError));
    }

    pub fn set_open_error(&self, should_error: bool) {
        self.state().should_error_on_open = should_error;
    }

    pub fn set_write_error(&self, should_error: bool) {
        self.state().should_error_on_write = should_error;
    }

    pub fn set_report_closed(&self, report_closed: bool) {
        self.state().report_closed = report_closed;
    }

    pub fn set_read_delay(&self, delay: Duration) {
        self.state().read_delay = Some(delay);
    }

    /// Everything written, one entry per write call.
    pub fn writes(&self) -> Vec<String> {
        self.state()
            .events
            .iter()
            .filter_map(|event| match event {
                Event::Write(data) => Some(String::from_utf8_lossy(data).into_owned()),
                _ => None,
            })
            .collect()
    }

    pub fn events(&self) -> Vec<Event> {
        self.state().events.clone()
    }

    pub fn read_calls(&self) -> usize {
        self.state().read_calls
    }

    pub fn opens(&self) -> usize {
        self.state().opens
    }

    pub fn is_open(&self) -> bool {
        self.state().open
    }
}

pub struct MockConnector {
    line: MockLine,
}

impl Connector for MockConnector {
    type Transport = MockSerial;

    fn open(&mut self, _address: &str, _config: &SerialConfig) -> Result<MockSerial, MockSerialError> {
        let mut state = self.line.state();
        if state.should_error_on_open {
            return Err(MockSerialError::OpenFailed);
        }
        state.opens += 1;
        state.open = true;
        Ok(MockSerial {
            line: self.line.clone(),
        })
    }
}

/// Our mock type used to emulate a serial port.
pub struct MockSerial {
    line: MockLine,
}

impl embedded_io::ErrorType for MockSerial {
    type Error = MockSerialError;
}

impl embedded_io::Write for MockSerial {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        let mut state = self.line.state();
        if state.should_error_on_write {
            return Err(MockSerialError::SimulatedError);
        }
        state.events.push(Event::Write(buf.to_vec()));
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        if self.line.state().should_error_on_write {
            return Err(MockSerialError::SimulatedError);
        }
        Ok(())
    }
}

impl embedded_io::Read for MockSerial {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        let delay = self.line.state().read_delay;
        if let Some(delay) = delay {
            std::thread::sleep(delay);
        }

        let mut state = self.line.state();
        state.read_calls += 1;
        match state.reads.pop_front() {
            Some(Ok(mut chunk)) => {
                let bytes_to_read = core::cmp::min(buf.len(), chunk.len());
                buf[..bytes_to_read].copy_from_slice(&chunk[..bytes_to_read]);
                if bytes_to_read < chunk.len() {
                    // Leave what didn't fit for the next read.
                    state.reads.push_front(Ok(chunk.split_off(bytes_to_read)));
                }
                state.events.push(Event::Read(bytes_to_read));
                Ok(bytes_to_read)
            }
            Some(Err(err)) => Err(err),
            None => {
                state.events.push(Event::Read(0));
                Err(MockSerialError::Timeout)
            }
        }
    }
}

impl Transport for MockSerial {
    fn is_open(&self) -> bool {
        let state = self.line.state();
        state.open && !state.report_closed
    }

    fn close(&mut self) -> Result<(), Self::Error> {
        let mut state = self.line.state();
        state.open = false;
        state.events.push(Event::Close);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_io::{Error, Read, Write};

    fn open_mock() -> (MockLine, MockSerial) {
        let line = MockLine::new();
        let serial = line
            .connector()
            .open("mock", &SerialConfig::default())
            .unwrap();
        (line, serial)
    }

    #[test]
    fn test_open() {
        let (line, serial) = open_mock();
        assert!(line.is_open());
        assert!(serial.is_open());
        assert_eq!(line.opens(), 1);
    }

    #[test]
    fn test_open_error_simulation() {
        let line = MockLine::new();
        line.set_open_error(true);
        let result = line.connector().open("mock", &SerialConfig::default());
        assert!(matches!(result, Err(MockSerialError::OpenFailed)));
        assert_eq!(line.opens(), 0);
    }

    #[test]
    fn test_write_data() {
        let (line, mut serial) = open_mock();
        serial.write_all(b"*IDN?\r\n").unwrap();
        assert_eq!(line.writes(), vec!["*IDN?\r\n"]);
    }

    #[test]
    fn test_read_chunks_in_order() {
        let (line, mut serial) = open_mock();
        line.push_read(b"12.");
        line.push_read(b"345\r\n");

        let mut buffer = [0u8; 16];
        assert_eq!(serial.read(&mut buffer).unwrap(), 3);
        assert_eq!(&buffer[..3], b"12.");
        assert_eq!(serial.read(&mut buffer).unwrap(), 5);
        assert_eq!(&buffer[..5], b"345\r\n");
        assert_eq!(line.read_calls(), 2);
    }

    #[test]
    fn test_read_partial_chunk() {
        let (line, mut serial) = open_mock();
        line.push_read(b"Long response");

        let mut buffer = [0u8; 5];
        assert_eq!(serial.read(&mut buffer).unwrap(), 5);
        assert_eq!(&buffer, b"Long ");
        assert_eq!(serial.read(&mut buffer).unwrap(), 5);
        assert_eq!(&buffer, b"respo");
    }

    #[test]
    fn test_read_timeout_when_no_data() {
        let (_line, mut serial) = open_mock();
        let mut buffer = [0u8; 10];

        let result = serial.read(&mut buffer);
        assert!(matches!(result, Err(MockSerialError::Timeout)));
        assert_eq!(
            result.unwrap_err().kind(),
            embedded_io::ErrorKind::TimedOut
        );
    }

    #[test]
    fn test_errors_display() {
        assert_eq!(MockSerialError::Timeout.to_string(), "Mock read timed out");
        assert_eq!(
            MockSerialError::OpenFailed.kind(),
            embedded_io::ErrorKind::NotFound
        );
    }

    #[test]
    fn test_error_simulation() {
        let (line, mut serial) = open_mock();
        line.set_write_error(true);
        assert!(serial.write(b"test").is_err());
        assert!(serial.flush().is_err());
        assert!(line.writes().is_empty());

        line.push_read_error();
        let mut buffer = [0u8; 10];
        assert!(matches!(
            serial.read(&mut buffer),
            Err(MockSerialError::SimulatedError)
        ));
    }

    #[test]
    fn test_close() {
        let (line, mut serial) = open_mock();
        serial.close().unwrap();
        assert!(!serial.is_open());
        assert!(!line.is_open());
        assert_eq!(line.events(), vec![Event::Close]);
    }
}
