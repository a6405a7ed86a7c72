//! Serial port settings used when connecting to the SIM928.
//!
//! The instrument only works with one framing configuration, which is what
//! [`SerialConfig::default`] gives you. Only the baud rate is commonly changed.

use fugit::MillisDurationU32;

/// Baud rate used when none is supplied.
pub const DEFAULT_BAUD_RATE: u32 = 9600;

/// Per read timeout. A read returns whatever arrived within this window.
pub const DEFAULT_READ_TIMEOUT: MillisDurationU32 = MillisDurationU32::millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Parity {
    #[default]
    None,
    Odd,
    Even,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StopBits {
    #[default]
    One,
    Two,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DataBits {
    Seven,
    #[default]
    Eight,
}

/// RTS/CTS is `Hardware`, XON/XOFF is `Software`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlowControl {
    None,
    Software,
    #[default]
    Hardware,
}

/// Electrical and framing parameters used to open the transport.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SerialConfig {
    pub baud_rate: u32,
    pub parity: Parity,
    pub stop_bits: StopBits,
    pub data_bits: DataBits,
    pub flow_control: FlowControl,
    /// How long a single read waits for data before giving up.
    pub read_timeout: MillisDurationU32,
}

impl Default for SerialConfig {
    /// 9600 baud, 8N1, hardware flow control, 100ms read timeout.
    fn default() -> Self {
        Self::new(DEFAULT_BAUD_RATE)
    }
}

impl SerialConfig {
    /// Create the fixed SIM928 framing with the given baud rate.
    pub const fn new(baud_rate: u32) -> Self {
        Self {
            baud_rate,
            parity: Parity::None,
            stop_bits: StopBits::One,
            data_bits: DataBits::Eight,
            flow_control: FlowControl::Hardware,
            read_timeout: DEFAULT_READ_TIMEOUT,
        }
    }

    pub fn with_baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }

    pub fn with_read_timeout(mut self, timeout: MillisDurationU32) -> Self {
        self.read_timeout = timeout;
        self
    }

    pub fn with_flow_control(mut self, flow_control: FlowControl) -> Self {
        self.flow_control = flow_control;
        self
    }
}
