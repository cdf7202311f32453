//! Timestamped rendering of serial traffic
//!
//! Produces lines such as `[12:34:56.789] RX: Hello` in one of the three
//! [`DisplayMode`]s.

use chrono::{Local, NaiveTime};
use std::fmt;

pub use crate::domain::config::DisplayMode;

const TIME_FORMAT: &str = "%H:%M:%S%.3f";

/// Which way a payload travelled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageDirection {
    Sent,
    Received,
}

impl fmt::Display for MessageDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageDirection::Sent => write!(f, "TX"),
            MessageDirection::Received => write!(f, "RX"),
        }
    }
}

/// Formats messages for display; the mode can be changed at any time
#[derive(Debug, Clone, Default)]
pub struct MessageFormatter {
    display_mode: DisplayMode,
}

impl MessageFormatter {
    pub fn new(display_mode: DisplayMode) -> Self {
        Self { display_mode }
    }

    pub fn display_mode(&self) -> DisplayMode {
        self.display_mode
    }

    pub fn set_display_mode(&mut self, mode: DisplayMode) {
        self.display_mode = mode;
    }

    /// Render `payload` stamped with the current local time
    pub fn format(&self, payload: &str, direction: MessageDirection) -> String {
        self.format_at(payload, direction, Local::now().time())
    }

    /// Render `payload` stamped with `time`
    pub fn format_at(&self, payload: &str, direction: MessageDirection, time: NaiveTime) -> String {
        format!(
            "[{}] {}: {}",
            time.format(TIME_FORMAT),
            direction,
            self.render(payload)
        )
    }

    /// Payload segment only, without timestamp or direction
    pub fn render(&self, payload: &str) -> String {
        if payload.is_empty() {
            return String::new();
        }

        match self.display_mode {
            DisplayMode::Ascii => payload.to_string(),
            DisplayMode::Hex => to_hex(payload),
            DisplayMode::HexAndAscii => format!("{} ({})", to_hex(payload), payload),
        }
    }
}

/// Uppercase hex of each character's code point, space separated
fn to_hex(input: &str) -> String {
    input
        .chars()
        .map(|c| format!("{:02X}", c as u32))
        .collect::<Vec<_>>()
        .join(" ")
}
