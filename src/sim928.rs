use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use core::fmt::Write as _;
use embedded_io::{Error as _, ErrorKind, Read as _, Write as _};
use log::{debug, error, info, trace, warn};
use strum::IntoEnumIterator;

use crate::{
    command::{BatteryInfo, Command},
    config::SerialConfig,
    error::{Error, Result},
    input::NumericInput,
    transport::{Connector, Transport, TransportError},
    types::{BatteryState, BatteryStateDescription, ConnectOutcome, Response, State},
};

/// Appended to every command sent.
pub const SEND_TERMINATOR: &str = "\r\n";
/// A response is complete once the received text ends with this.
pub const RESPONSE_TERMINATOR: &[u8] = b"\r\n";
/// Read attempts made for a response before giving up on the terminator.
pub const DEFAULT_MAX_ATTEMPTS: usize = 10;
/// Maximum number of bytes taken from the transport per read.
pub const READ_CHUNK_LEN: usize = 10_000;
/// Setpoints are clamped to ±this many volts.
pub const VOLTAGE_LIMIT: f64 = 20.0;
/// Returned by [`Sim928::read_output_on`] when the state couldn't be read.
pub const UNKNOWN_OUTPUT_STATE: i32 = -1;

type Listener = Arc<dyn Fn(bool) + Send + Sync>;

/// Everything guarded by the transaction lock.
struct Link<C: Connector> {
    connector: C,
    transport: Option<C::Transport>,
    address: Option<String>,
    config: SerialConfig,
}

/// Last values read back from the instrument.
#[derive(Default)]
struct Readings {
    identity: String,
    battery_state: BatteryState,
    battery_description: BatteryStateDescription,
}

/// A session with one SIM928, over any transport a [`Connector`] can open.
///
/// The instrument has no request identifiers, so only one command may be in
/// flight at a time. Every method takes `&self`, a session can be shared
/// between threads with an [`Arc`] and concurrent transactions are run one
/// after the other. Waiters are not queued, there is no fairness guarantee.
///
/// Commands sent while not connected do nothing and return the sentinel of
/// the operation. Responses which can't be parsed also produce the sentinel.
/// Only faults of the transport itself are returned as errors.
///
/// `L` is the capacity of the outbound line buffer, terminator included.
pub struct Sim928<C: Connector, const L: usize = 64> {
    /// Held from a connect or disconnect until its listeners have run.
    transition: Mutex<()>,
    link: Mutex<Link<C>>,
    connected: AtomicBool,
    listeners: Mutex<Vec<Listener>>,
    readings: Mutex<Readings>,
}

/// Locks survive a panic in another thread, the guarded data is always valid.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<C: Connector, const L: usize> Sim928<C, L> {
    /// Create a new, unconnected session. Nothing is opened until [`Self::connect`].
    pub fn new(connector: C) -> Self {
        Self {
            transition: Mutex::new(()),
            link: Mutex::new(Link {
                connector,
                transport: None,
                address: None,
                config: SerialConfig::default(),
            }),
            connected: AtomicBool::new(false),
            listeners: Mutex::new(Vec::new()),
            readings: Mutex::new(Readings::default()),
        }
    }

    /// Open the device at `address` with the SIM928 framing and the given baud rate.
    ///
    /// Does nothing if already connected. Listeners are notified on success.
    pub fn connect(
        &self,
        address: &str,
        baud_rate: u32,
    ) -> Result<ConnectOutcome, TransportError<C>> {
        self.connect_with_config(address, SerialConfig::default().with_baud_rate(baud_rate))
    }

    /// Open the device at `address` with an explicit serial configuration.
    pub fn connect_with_config(
        &self,
        address: &str,
        config: SerialConfig,
    ) -> Result<ConnectOutcome, TransportError<C>> {
        if self.is_connected() {
            return Ok(ConnectOutcome::AlreadyConnected);
        }

        let _transition = lock(&self.transition);
        {
            let mut link = lock(&self.link);
            // Another thread may have connected while we waited for the lock.
            if self.is_connected() {
                return Ok(ConnectOutcome::AlreadyConnected);
            }

            let transport = link.connector.open(address, &config).map_err(|err| {
                error!("Error while connecting to {address}: {err:?}");
                Error::OpenError(err)
            })?;
            if !transport.is_open() {
                error!("Port {address} was opened but reports itself closed");
                return Err(Error::NotOpen);
            }

            link.transport = Some(transport);
            link.address = Some(address.to_owned());
            link.config = config;
            self.connected.store(true, Ordering::SeqCst);
        }

        info!("Connected to {address} at {} baud", config.baud_rate);
        self.notify_listeners(true);
        Ok(ConnectOutcome::Connected)
    }

    /// Close the transport and notify listeners. Does nothing if there is none.
    ///
    /// The session is disconnected even when closing the port fails, the
    /// close error is returned afterwards.
    pub fn disconnect(&self) -> Result<(), TransportError<C>> {
        let _transition = lock(&self.transition);
        let (closed, was_connected) = {
            let mut link = lock(&self.link);
            let Some(mut transport) = link.transport.take() else {
                return Ok(());
            };
            let closed = if transport.is_open() {
                transport.close().map_err(Error::SerialError)
            } else {
                Ok(())
            };
            (closed, self.connected.swap(false, Ordering::SeqCst))
        };

        if was_connected {
            info!("Disconnected");
            self.notify_listeners(false);
        }
        closed
    }

    /// Register a callback invoked with the new state on every connect and disconnect.
    ///
    /// Listeners are called in registration order on the thread that changed
    /// the state. There is no way to remove one.
    ///
    /// A listener may send commands, but must not call [`Self::connect`] or
    /// [`Self::disconnect`]: the next transition waits for every listener of
    /// the current one to return.
    pub fn add_connection_listener(&self, listener: impl Fn(bool) + Send + Sync + 'static) {
        lock(&self.listeners).push(Arc::new(listener));
    }

    fn notify_listeners(&self, connected: bool) {
        // Snapshot, so a listener may register further listeners.
        let listeners = lock(&self.listeners).clone();
        for (index, listener) in listeners.iter().enumerate() {
            if panic::catch_unwind(AssertUnwindSafe(|| listener(connected))).is_err() {
                error!("Connection listener {index} panicked handling connected={connected}");
            }
        }
    }

    /// Whether there is an open transport.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Address used by the last successful connect.
    pub fn device_address(&self) -> Option<String> {
        lock(&self.link).address.clone()
    }

    /// Serial configuration used by the last successful connect.
    pub fn serial_config(&self) -> SerialConfig {
        lock(&self.link).config
    }

    /// Send a line to the instrument and optionally read back a response line.
    ///
    /// Trailing (and leading) `\r`/`\n` are stripped from `command` and
    /// [`SEND_TERMINATOR`] appended. When a response is expected, reads are
    /// repeated until the received text ends with [`RESPONSE_TERMINATOR`] or
    /// `max_attempts` reads were made. A read which times out still counts as
    /// an attempt. Whatever was received is returned either way, check
    /// [`Response::is_complete`] to tell the two apart.
    ///
    /// Returns `Ok(None)` without touching the transport when not connected,
    /// and after the write when no response is expected.
    pub fn send_and_receive(
        &self,
        command: &str,
        expect_response: bool,
        max_attempts: usize,
    ) -> Result<Option<Response>, TransportError<C>> {
        if !self.is_connected() {
            return Ok(None);
        }
        let line = Self::frame(command)?;

        // Held until we return, whichever way that happens.
        let mut link = lock(&self.link);
        let Some(transport) = link.transport.as_mut().filter(|t| t.is_open()) else {
            return Ok(None);
        };

        trace!("Sending {:?}", line.as_str());
        transport
            .write_all(line.as_bytes())
            .map_err(Error::SerialError)?;

        if !expect_response {
            return Ok(None);
        }

        let response = Self::read_response(transport, max_attempts).map_err(Error::SerialError)?;
        Ok(Some(response))
    }

    /// Send a line without waiting for a response.
    pub fn send(&self, command: &str) -> Result<(), TransportError<C>> {
        self.send_and_receive(command, false, DEFAULT_MAX_ATTEMPTS)?;
        Ok(())
    }

    /// Send a line and read back the response, with the default number of attempts.
    pub fn query(&self, command: &str) -> Result<Option<Response>, TransportError<C>> {
        self.send_and_receive(command, true, DEFAULT_MAX_ATTEMPTS)
    }

    /// Send a typed command, reading a response if the command produces one.
    pub fn execute(&self, command: Command) -> Result<Option<Response>, TransportError<C>> {
        let mut rendered: heapless::String<L> = heapless::String::new();
        write!(rendered, "{command}").map_err(|_| Error::CommandTooLong)?;
        self.send_and_receive(&rendered, command.expects_response(), DEFAULT_MAX_ATTEMPTS)
    }

    fn frame(command: &str) -> Result<heapless::String<L>, TransportError<C>> {
        let mut line: heapless::String<L> = heapless::String::new();
        line.push_str(command.trim_matches(['\r', '\n']))
            .map_err(|_| Error::CommandTooLong)?;
        line.push_str(SEND_TERMINATOR)
            .map_err(|_| Error::CommandTooLong)?;
        Ok(line)
    }

    fn read_response(
        transport: &mut C::Transport,
        max_attempts: usize,
    ) -> core::result::Result<Response, TransportError<C>> {
        let mut chunk = vec![0u8; READ_CHUNK_LEN];
        let mut received: Vec<u8> = Vec::new();
        let mut attempts = 0;

        while !received.ends_with(RESPONSE_TERMINATOR) && attempts < max_attempts {
            attempts += 1;
            match transport.read(&mut chunk) {
                Ok(bytes_read) => received.extend_from_slice(&chunk[..bytes_read]),
                // Nothing arrived within the read timeout.
                Err(e) if matches!(e.kind(), ErrorKind::TimedOut) => {}
                Err(e) => return Err(e),
            }
        }

        let complete = received.ends_with(RESPONSE_TERMINATOR);
        if !complete {
            debug!(
                "No response terminator after {attempts} reads, got {} bytes",
                received.len()
            );
        }
        let text = String::from_utf8_lossy(&received).into_owned();
        trace!("Received {text:?}");
        Ok(Response::new(text, complete))
    }

    /// Query the identification string (`*IDN?`).
    ///
    /// When not connected, the last identification read is returned instead.
    pub fn read_ident(&self) -> Result<String, TransportError<C>> {
        match self.execute(Command::Identify)? {
            Some(response) => {
                let identity = response.trimmed().to_owned();
                lock(&self.readings).identity.clone_from(&identity);
                Ok(identity)
            }
            None => Ok(self.identity()),
        }
    }

    /// The identification string from the last [`Self::read_ident`], empty if never read.
    pub fn identity(&self) -> String {
        lock(&self.readings).identity.clone()
    }

    /// Query the battery state (`BATS?`).
    ///
    /// Returns [`BatteryState::UNKNOWN`] when not connected or when the
    /// response can't be parsed. In the latter case the stored state is
    /// reset to unknown as well.
    pub fn read_battery_state(&self) -> Result<BatteryState, TransportError<C>> {
        let Some(response) = self.execute(Command::BatteryState)? else {
            return Ok(BatteryState::UNKNOWN);
        };

        let state = BatteryState::parse(response.text()).unwrap_or_else(|| {
            warn!("Got unparsable battery state from device: {:?}", response.text());
            BatteryState::UNKNOWN
        });
        let mut readings = lock(&self.readings);
        readings.battery_state = state;
        readings.battery_description = state.description();
        Ok(state)
    }

    /// Battery state from the last [`Self::read_battery_state`].
    pub fn battery_state(&self) -> BatteryState {
        lock(&self.readings).battery_state
    }

    /// Description of the battery state from the last [`Self::read_battery_state`].
    pub fn battery_state_description(&self) -> BatteryStateDescription {
        lock(&self.readings).battery_description
    }

    /// Query whether the output is on (`EXON?`). `1` is on, `0` is off.
    ///
    /// Returns [`UNKNOWN_OUTPUT_STATE`] when not connected or unparsable.
    pub fn read_output_on(&self) -> Result<i32, TransportError<C>> {
        let Some(response) = self.execute(Command::OutputEnabled)? else {
            return Ok(UNKNOWN_OUTPUT_STATE);
        };
        Ok(response.trimmed().parse::<i32>().unwrap_or_else(|_| {
            warn!("Got non-integer output state from device: {:?}", response.text());
            UNKNOWN_OUTPUT_STATE
        }))
    }

    /// Turn the output on (`OPON`) or off (`OPOF`).
    pub fn write_output_on(&self, state: impl Into<State>) -> Result<(), TransportError<C>> {
        let command = match state.into() {
            State::On => Command::OutputOn,
            State::Off => Command::OutputOff,
        };
        self.execute(command)?;
        Ok(())
    }

    /// Query the voltage setpoint (`VOLT?`), in volts.
    ///
    /// `None` when not connected or when the response isn't a number.
    pub fn read_volt(&self) -> Result<Option<f64>, TransportError<C>> {
        let Some(response) = self.execute(Command::Voltage)? else {
            return Ok(None);
        };
        match response.trimmed().parse::<f64>() {
            Ok(volt) => Ok(Some(volt)),
            Err(_) => {
                warn!("Got non-float voltage value from device: {:?}", response.text());
                Ok(None)
            }
        }
    }

    /// Set the voltage (`VOLT <v>`), in volts.
    ///
    /// Values beyond ±[`VOLTAGE_LIMIT`] are clamped. Input which isn't a
    /// number is ignored and nothing is sent.
    pub fn write_volt(&self, volt: impl NumericInput) -> Result<(), TransportError<C>> {
        let Some(volt) = volt.as_float() else {
            debug!("Ignoring non-numeric voltage setpoint");
            return Ok(());
        };
        let volt = volt.clamp(-VOLTAGE_LIMIT, VOLTAGE_LIMIT);
        self.execute(Command::SetVoltage(volt))?;
        Ok(())
    }

    /// Clear the status registers (`*CLS`).
    pub fn clear_status(&self) -> Result<(), TransportError<C>> {
        self.execute(Command::ClearStatus)?;
        Ok(())
    }

    /// Override the battery charge cycle, switching batteries immediately (`BCOR`).
    pub fn write_bat_charge_override(&self) -> Result<(), TransportError<C>> {
        self.execute(Command::BatteryChargeOverride)?;
        Ok(())
    }

    /// Query battery pack information (`BIDN? <param>`).
    ///
    /// `parameter` is a [`BatteryInfo`] or its number:
    /// * `0` - Part number.
    /// * `1` - Serial number.
    /// * `2` - Design life, number of charge cycles.
    /// * `3` - Number of charge cycles used.
    /// * `4` - Production date (YYYY-MM-DD).
    ///
    /// Anything else is ignored without sending and gives `None`, as does
    /// not being connected.
    pub fn read_battery_info(
        &self,
        parameter: impl NumericInput,
    ) -> Result<Option<String>, TransportError<C>> {
        let Some(param) = parameter
            .as_integer()
            .and_then(|value| BatteryInfo::try_from(value).ok())
        else {
            debug!("Ignoring out of range battery info parameter");
            return Ok(None);
        };
        let response = self.execute(Command::BatteryInfo(param))?;
        Ok(response.map(|response| response.trimmed().to_owned()))
    }

    /// Query every [`BatteryInfo`] field in turn. Empty when not connected.
    pub fn read_battery_info_all(&self) -> Result<Vec<(BatteryInfo, String)>, TransportError<C>> {
        let mut info = Vec::new();
        for param in BatteryInfo::iter() {
            if let Some(value) = self.read_battery_info(param)? {
                info.push((param, value));
            }
        }
        Ok(info)
    }
}
