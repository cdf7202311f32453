use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::error::{SerialTalkerError, SerialTalkerResult};

/// SerialTalker configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SerialTalkerConfig {
    /// Global configuration
    #[serde(default)]
    pub global: GlobalConfig,
    /// Default serial line configuration
    #[serde(default)]
    pub serial: SerialConfig,
    /// Baud rate negotiation configuration
    #[serde(default)]
    pub negotiation: NegotiationConfig,
}

/// Global configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalConfig {
    /// Default log level
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Number of commands kept in the history buffer
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
    /// Display mode used when rendering traffic
    #[serde(default)]
    pub display_mode: DisplayMode,
    /// Last port a session was opened on
    #[serde(default)]
    pub last_port: Option<String>,
    /// Negotiate the baud rate before connecting
    #[serde(default)]
    pub auto_negotiate: bool,
}

/// Serial line defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerialConfig {
    #[serde(flatten)]
    pub line: LineSettings,
    /// Appended to every line sent from the interactive terminal
    #[serde(default = "default_line_ending")]
    pub line_ending: String,
}

/// Baud rate negotiation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NegotiationConfig {
    /// Time to wait for a probe response at each candidate rate
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,
}

/// Line parameters applied to a port
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineSettings {
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
    #[serde(default = "default_data_bits")]
    pub data_bits: u8,
    #[serde(default = "default_stop_bits")]
    pub stop_bits: u8,
    #[serde(default)]
    pub parity: Parity,
}

/// Parity configuration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Parity {
    #[default]
    None,
    Odd,
    Even,
    Mark,
    Space,
}

/// How message payloads are rendered
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DisplayMode {
    /// Plain text
    #[default]
    Ascii,
    /// Space separated hex codes
    Hex,
    /// Hex codes followed by the text in parentheses
    HexAndAscii,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_history_limit() -> usize {
    50
}

fn default_line_ending() -> String {
    "\r\n".to_string()
}

fn default_settle_ms() -> u64 {
    500
}

fn default_baud_rate() -> u32 {
    9600
}

fn default_data_bits() -> u8 {
    8
}

fn default_stop_bits() -> u8 {
    1
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            history_limit: default_history_limit(),
            display_mode: DisplayMode::default(),
            last_port: None,
            auto_negotiate: false,
        }
    }
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            line: LineSettings::default(),
            line_ending: default_line_ending(),
        }
    }
}

impl Default for NegotiationConfig {
    fn default() -> Self {
        Self {
            settle_ms: default_settle_ms(),
        }
    }
}

impl Default for LineSettings {
    fn default() -> Self {
        Self {
            baud_rate: default_baud_rate(),
            data_bits: default_data_bits(),
            stop_bits: default_stop_bits(),
            parity: Parity::None,
        }
    }
}

impl LineSettings {
    pub fn new(baud_rate: u32, data_bits: u8, stop_bits: u8, parity: Parity) -> Self {
        Self {
            baud_rate,
            data_bits,
            stop_bits,
            parity,
        }
    }

    /// Same framing at a different speed
    pub fn with_baud_rate(self, baud_rate: u32) -> Self {
        Self { baud_rate, ..self }
    }

    /// Reject values no UART accepts
    pub fn validate(&self) -> SerialTalkerResult<()> {
        if self.baud_rate == 0 {
            return Err(SerialTalkerError::parameter_apply("baud rate must be positive"));
        }
        if !(5..=8).contains(&self.data_bits) {
            return Err(SerialTalkerError::parameter_apply(format!(
                "invalid data bits: {}",
                self.data_bits
            )));
        }
        if !(1..=2).contains(&self.stop_bits) {
            return Err(SerialTalkerError::parameter_apply(format!(
                "invalid stop bits: {}",
                self.stop_bits
            )));
        }
        Ok(())
    }
}

impl fmt::Display for LineSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}{}{}",
            self.baud_rate,
            self.data_bits,
            self.parity.short_code(),
            self.stop_bits
        )
    }
}

impl Parity {
    /// Letter used in "8N1" style notation
    pub fn short_code(&self) -> char {
        match self {
            Parity::None => 'N',
            Parity::Odd => 'O',
            Parity::Even => 'E',
            Parity::Mark => 'M',
            Parity::Space => 'S',
        }
    }
}

impl fmt::Display for Parity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Parity::None => write!(f, "none"),
            Parity::Odd => write!(f, "odd"),
            Parity::Even => write!(f, "even"),
            Parity::Mark => write!(f, "mark"),
            Parity::Space => write!(f, "space"),
        }
    }
}

impl fmt::Display for DisplayMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisplayMode::Ascii => write!(f, "ascii"),
            DisplayMode::Hex => write!(f, "hex"),
            DisplayMode::HexAndAscii => write!(f, "hex-and-ascii"),
        }
    }
}

impl FromStr for DisplayMode {
    type Err = SerialTalkerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ascii" | "text" => Ok(DisplayMode::Ascii),
            "hex" => Ok(DisplayMode::Hex),
            "hex-ascii" | "hex-and-ascii" | "both" => Ok(DisplayMode::HexAndAscii),
            other => Err(SerialTalkerError::InvalidInput(format!(
                "unknown display mode '{}'",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_serialization() {
        let config = SerialTalkerConfig::default();
        let toml_str = toml::to_string(&config).unwrap();
        let deserialized: SerialTalkerConfig = toml::from_str(&toml_str).unwrap();

        assert_eq!(deserialized.serial.line, LineSettings::default());
        assert_eq!(deserialized.serial.line_ending, "\r\n");
        assert_eq!(deserialized.negotiation.settle_ms, 500);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: SerialTalkerConfig = toml::from_str(
            r#"
            [global]
            display_mode = "hex-and-ascii"

            [serial]
            baud_rate = 115200
            parity = "mark"
            "#,
        )
        .unwrap();

        assert_eq!(config.global.display_mode, DisplayMode::HexAndAscii);
        assert_eq!(config.global.history_limit, 50);
        assert_eq!(config.serial.line.baud_rate, 115200);
        assert_eq!(config.serial.line.data_bits, 8);
        assert_eq!(config.serial.line.parity, Parity::Mark);
        assert_eq!(config.negotiation.settle_ms, 500);
    }

    #[test]
    fn test_line_settings_validation() {
        assert!(LineSettings::default().validate().is_ok());
        assert!(LineSettings::new(0, 8, 1, Parity::None).validate().is_err());
        assert!(LineSettings::new(9600, 9, 1, Parity::None).validate().is_err());
        assert!(LineSettings::new(9600, 8, 3, Parity::None).validate().is_err());
    }

    #[test]
    fn test_line_settings_display() {
        let settings = LineSettings::new(19200, 7, 2, Parity::Even);
        assert_eq!(settings.to_string(), "19200 7E2");
        assert_eq!(settings.with_baud_rate(9600).baud_rate, 9600);
    }

    #[test]
    fn test_display_mode_parsing() {
        assert_eq!("HEX".parse::<DisplayMode>().unwrap(), DisplayMode::Hex);
        assert_eq!("hex-ascii".parse::<DisplayMode>().unwrap(), DisplayMode::HexAndAscii);
        assert_eq!("ascii".parse::<DisplayMode>().unwrap(), DisplayMode::Ascii);
        assert!("binary".parse::<DisplayMode>().is_err());
    }
}
