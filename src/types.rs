//! This module contains types for the values exchanged with the SIM928.

use strum_macros::{Display, EnumIter, IntoStaticStr};

/// Used to be less ambiguous about whether something is on or off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum State {
    /// Disabled.
    #[default]
    Off,
    /// Enabled.
    On,
}

impl From<State> for bool {
    fn from(value: State) -> Self {
        match value {
            State::Off => false,
            State::On => true,
        }
    }
}

impl From<bool> for State {
    fn from(value: bool) -> Self {
        match value {
            true => State::On,
            false => State::Off,
        }
    }
}

/// Status of one of the two battery packs, as reported by `BATS?`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, Display, IntoStaticStr)]
#[repr(i8)]
pub enum BatteryStatus {
    /// Not yet queried, or the code was not recognised.
    #[strum(to_string = "unknown")]
    Unknown = -1,
    /// Reported as `0`. The instrument gives no description for it.
    #[strum(to_string = "")]
    Idle = 0,
    /// Powering the output.
    #[strum(to_string = "in use")]
    InUse = 1,
    #[strum(to_string = "charging")]
    Charging = 2,
    #[strum(to_string = "ready/standby")]
    Ready = 3,
}

impl From<i32> for BatteryStatus {
    /// Unrecognised codes map to [`BatteryStatus::Unknown`].
    fn from(value: i32) -> Self {
        match value {
            0 => BatteryStatus::Idle,
            1 => BatteryStatus::InUse,
            2 => BatteryStatus::Charging,
            3 => BatteryStatus::Ready,
            _ => BatteryStatus::Unknown,
        }
    }
}

/// The service flag reported as the third field of `BATS?`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, Display, IntoStaticStr)]
pub enum ServiceStatus {
    #[strum(to_string = "unknown")]
    Unknown,
    #[strum(to_string = "ok")]
    Ok,
    #[strum(to_string = "battery service needed")]
    ServiceNeeded,
}

impl From<i32> for ServiceStatus {
    fn from(value: i32) -> Self {
        match value {
            0 => ServiceStatus::Ok,
            _ => ServiceStatus::ServiceNeeded,
        }
    }
}

/// Raw battery state codes as reported by the instrument.
///
/// All fields are `-1` until a `BATS?` response has been parsed successfully.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatteryState {
    pub main: i32,
    pub backup: i32,
    pub service: i32,
}

impl Default for BatteryState {
    fn default() -> Self {
        Self::UNKNOWN
    }
}

impl From<(i32, i32, i32)> for BatteryState {
    fn from((main, backup, service): (i32, i32, i32)) -> Self {
        Self {
            main,
            backup,
            service,
        }
    }
}

impl From<BatteryState> for (i32, i32, i32) {
    fn from(value: BatteryState) -> Self {
        (value.main, value.backup, value.service)
    }
}

impl BatteryState {
    /// Sentinel for "not queried" or "could not be parsed".
    pub const UNKNOWN: Self = Self {
        main: -1,
        backup: -1,
        service: -1,
    };

    pub fn is_unknown(&self) -> bool {
        *self == Self::UNKNOWN
    }

    /// Parse a `BATS?` response, e.g. `"1,2,0\r\n"`.
    ///
    /// Fields past the third are ignored.
    pub fn parse(response: &str) -> Option<Self> {
        let mut fields = response.split(',').map(|field| field.trim().parse::<i32>());
        let main = fields.next()?.ok()?;
        let backup = fields.next()?.ok()?;
        let service = fields.next()?.ok()?;
        Some(Self {
            main,
            backup,
            service,
        })
    }

    /// Human readable description of these codes.
    pub fn description(&self) -> BatteryStateDescription {
        if self.is_unknown() {
            return BatteryStateDescription::default();
        }
        BatteryStateDescription {
            main: self.main.into(),
            backup: self.backup.into(),
            service: self.service.into(),
        }
    }
}

/// Description derived from a [`BatteryState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatteryStateDescription {
    pub main: BatteryStatus,
    pub backup: BatteryStatus,
    pub service: ServiceStatus,
}

impl Default for BatteryStateDescription {
    fn default() -> Self {
        Self {
            main: BatteryStatus::Unknown,
            backup: BatteryStatus::Unknown,
            service: ServiceStatus::Unknown,
        }
    }
}

impl BatteryStateDescription {
    /// The three descriptions as strings, `(main, backup, service)`.
    pub fn as_strs(&self) -> (&'static str, &'static str, &'static str) {
        (self.main.into(), self.backup.into(), self.service.into())
    }
}

/// A response line as read back from the instrument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    text: String,
    complete: bool,
}

impl Response {
    pub(crate) fn new(text: String, complete: bool) -> Self {
        Self { text, complete }
    }

    /// Everything that was received, terminator included.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// The received text without surrounding whitespace and line endings.
    pub fn trimmed(&self) -> &str {
        self.text.trim()
    }

    /// `false` when the read attempts ran out before `\r\n` arrived.
    pub fn is_complete(&self) -> bool {
        self.complete
    }

    pub fn into_text(self) -> String {
        self.text
    }
}

/// What [`Sim928::connect`](crate::Sim928::connect) did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectOutcome {
    /// A new connection was opened and listeners were notified.
    Connected,
    /// There already was a connection. Nothing was done.
    AlreadyConnected,
}
