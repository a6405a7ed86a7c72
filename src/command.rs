//! The SIM928 command vocabulary.
//!
//! Commands are case sensitive ASCII. The line terminator is not part of the
//! rendered command, the session appends it when sending.

use core::fmt;

use strum_macros::{Display, EnumCount, EnumIter};

use crate::input::NumericInput;

/// Commands understood by the SIM928.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    /// `*IDN?` - Identification string.
    Identify,
    /// `*CLS` - Clear all status registers.
    ClearStatus,
    /// `BATS?` - Battery state, `<main>,<backup>,<service>`.
    BatteryState,
    /// `BCOR` - Battery charge override. Switches batteries immediately.
    BatteryChargeOverride,
    /// `BIDN? <param>` - Battery pack information.
    BatteryInfo(BatteryInfo),
    /// `EXON?` - Whether the output is enabled, `0` or `1`.
    OutputEnabled,
    /// `OPON` - Turn the output on.
    OutputOn,
    /// `OPOF` - Turn the output off.
    OutputOff,
    /// `VOLT?` - Voltage setpoint.
    Voltage,
    /// `VOLT <v>` - Set the voltage, rendered with 3 decimal places.
    SetVoltage(f64),
}

impl Command {
    /// Whether the instrument answers this command with a response line.
    pub fn expects_response(&self) -> bool {
        matches!(
            self,
            Command::Identify
                | Command::BatteryState
                | Command::BatteryInfo(_)
                | Command::OutputEnabled
                | Command::Voltage
        )
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Identify => f.write_str("*IDN?"),
            Command::ClearStatus => f.write_str("*CLS"),
            Command::BatteryState => f.write_str("BATS?"),
            Command::BatteryChargeOverride => f.write_str("BCOR"),
            Command::BatteryInfo(param) => write!(f, "BIDN? {}", *param as u8),
            Command::OutputEnabled => f.write_str("EXON?"),
            Command::OutputOn => f.write_str("OPON"),
            Command::OutputOff => f.write_str("OPOF"),
            Command::Voltage => f.write_str("VOLT?"),
            Command::SetVoltage(volt) => write!(f, "VOLT {volt:5.3}"),
        }
    }
}

/// Battery pack information fields, queried with `BIDN?`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, EnumCount, Display)]
#[repr(u8)]
pub enum BatteryInfo {
    /// `PNUM` - Battery pack part number.
    #[strum(to_string = "part number")]
    PartNumber = 0,
    /// `SERIAL` - Battery pack serial number.
    #[strum(to_string = "serial number")]
    SerialNumber = 1,
    /// `MAXCY` - Design life, in charge cycles.
    #[strum(to_string = "max cycles")]
    MaxCycles = 2,
    /// `CYCLES` - Charge cycles used.
    #[strum(to_string = "cycles used")]
    CyclesUsed = 3,
    /// `PDATE` - Production date, `YYYY-MM-DD`.
    #[strum(to_string = "production date")]
    ProductionDate = 4,
}

impl TryFrom<i64> for BatteryInfo {
    type Error = ();
    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(BatteryInfo::PartNumber),
            1 => Ok(BatteryInfo::SerialNumber),
            2 => Ok(BatteryInfo::MaxCycles),
            3 => Ok(BatteryInfo::CyclesUsed),
            4 => Ok(BatteryInfo::ProductionDate),
            _ => Err(()),
        }
    }
}

impl NumericInput for BatteryInfo {
    fn as_float(&self) -> Option<f64> {
        Some(f64::from(*self as u8))
    }

    fn as_integer(&self) -> Option<i64> {
        Some(i64::from(*self as u8))
    }
}
