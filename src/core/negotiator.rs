//! Automatic baud rate discovery
//!
//! Tries each candidate rate in a fixed order, sends a short probe and
//! accepts the first rate at which the device answers with anything at
//! all. Blocks for up to `settle_time` per candidate, so run it on a
//! thread that is allowed to block.

use crate::core::port::PortHandle;
use crate::domain::config::{LineSettings, Parity};
use crate::domain::error::{SerialTalkerError, SerialTalkerResult};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Candidate rates, most common defaults first
pub const CANDIDATE_BAUD_RATES: [u32; 10] = [
    9600, 115200, 19200, 38400, 57600, 14400, 28800, 4800, 2400, 1200,
];

/// Command written at each candidate rate
pub const PROBE_COMMAND: &str = "AT\r\n";

pub const DEFAULT_SETTLE_TIME: Duration = Duration::from_millis(500);

#[derive(Debug, Clone)]
pub struct BaudRateNegotiator {
    settle_time: Duration,
}

impl BaudRateNegotiator {
    pub fn new() -> Self {
        Self {
            settle_time: DEFAULT_SETTLE_TIME,
        }
    }

    pub fn with_settle_time(settle_time: Duration) -> Self {
        Self { settle_time }
    }

    pub fn settle_time(&self) -> Duration {
        self.settle_time
    }

    /// Find a rate at which `port` answers the probe.
    ///
    /// `port` must already be open. Returns
    /// [`SerialTalkerError::NegotiationExhausted`] when no candidate
    /// produced a response; the caller decides on a fallback.
    pub fn negotiate(
        &self,
        port: &dyn PortHandle,
        data_bits: u8,
        stop_bits: u8,
        parity: Parity,
    ) -> SerialTalkerResult<u32> {
        info!("Negotiating baud rate on '{}'", port.name());

        for baud_rate in CANDIDATE_BAUD_RATES {
            let settings = LineSettings::new(baud_rate, data_bits, stop_bits, parity);
            match self.try_baud_rate(port, &settings) {
                Ok(true) => {
                    info!("Device on '{}' answered at {} baud", port.name(), baud_rate);
                    return Ok(baud_rate);
                }
                Ok(false) => debug!("No response at {} baud", baud_rate),
                Err(e) => debug!("Skipping {} baud: {}", baud_rate, e),
            }
        }

        warn!("No candidate baud rate worked on '{}'", port.name());
        Err(SerialTalkerError::NegotiationExhausted)
    }

    fn try_baud_rate(&self, port: &dyn PortHandle, settings: &LineSettings) -> SerialTalkerResult<bool> {
        port.set_params(settings)?;
        port.write_string(PROBE_COMMAND)?;

        std::thread::sleep(self.settle_time);

        let available = port.bytes_available()?;
        if available == 0 {
            return Ok(false);
        }

        let response = port.read_string(available)?;
        debug!("Probe response at {} baud: {:?}", settings.baud_rate, response);
        Ok(!response.is_empty())
    }
}

impl Default for BaudRateNegotiator {
    fn default() -> Self {
        Self::new()
    }
}
