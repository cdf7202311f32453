use crate::domain::config::{DisplayMode, LineSettings, Parity};
use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Command line arguments for SerialTalker
#[derive(Parser, Debug)]
#[command(
    name = "serialtalker",
    version = env!("CARGO_PKG_VERSION"),
    about = "Serial terminal for talking to embedded devices",
    long_about = "A serial terminal with automatic baud rate discovery, command history and ASCII/HEX message display."
)]
pub struct Args {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress logging
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text", global = true)]
    pub output: OutputFormat,

    /// Command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// List available serial ports
    Ports,
    /// Find the baud rate a device answers at
    Negotiate {
        /// Serial port path
        #[arg(short, long)]
        port: String,

        #[command(flatten)]
        framing: FramingArgs,
    },
    /// Send one payload and print whatever comes back
    Send {
        /// Serial port path
        #[arg(short, long)]
        port: String,

        /// Baud rate (defaults to the configured rate)
        #[arg(short, long)]
        baud: Option<u32>,

        #[command(flatten)]
        framing: FramingArgs,

        /// Data to send
        data: String,

        /// Data format (text, hex, base64)
        #[arg(short, long, value_enum, default_value = "text")]
        format: DataFormat,

        /// Milliseconds to wait for a response
        #[arg(short, long, default_value = "500")]
        wait: u64,
    },
    /// Open an interactive terminal on a port
    Connect {
        /// Serial port path (defaults to the last port used)
        #[arg(short, long)]
        port: Option<String>,

        /// Baud rate (defaults to the configured rate)
        #[arg(short, long, conflicts_with = "auto")]
        baud: Option<u32>,

        /// Negotiate the baud rate before connecting
        #[arg(short, long)]
        auto: bool,

        #[command(flatten)]
        framing: FramingArgs,

        /// Message display mode
        #[arg(short, long, value_enum)]
        display: Option<DisplayArg>,
    },
    /// Configuration management commands
    Config(ConfigArgs),
    /// Display version information
    Version,
}

/// Character framing overrides shared by port commands
#[derive(ClapArgs, Debug, Clone, Default)]
pub struct FramingArgs {
    /// Data bits (5-8)
    #[arg(long)]
    pub data_bits: Option<u8>,

    /// Stop bits (1-2)
    #[arg(long)]
    pub stop_bits: Option<u8>,

    /// Parity
    #[arg(long, value_enum)]
    pub parity: Option<ParityArg>,
}

impl FramingArgs {
    /// Overlay the given flags on configured settings
    pub fn apply_to(&self, base: LineSettings) -> LineSettings {
        LineSettings {
            baud_rate: base.baud_rate,
            data_bits: self.data_bits.unwrap_or(base.data_bits),
            stop_bits: self.stop_bits.unwrap_or(base.stop_bits),
            parity: self.parity.map(Parity::from).unwrap_or(base.parity),
        }
    }
}

/// Configuration management arguments
#[derive(ClapArgs, Debug)]
pub struct ConfigArgs {
    /// Configuration subcommand
    #[command(subcommand)]
    pub command: ConfigCommand,
}

/// Configuration subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Show current configuration
    Show,
    /// Write a default configuration file
    Init,
    /// Print the configuration file path
    Path,
}

/// Output format options
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputFormat {
    /// Human-readable text output
    Text,
    /// JSON output
    Json,
    /// Table output
    Table,
}

/// Payload encodings for `send`
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataFormat {
    Text,
    Hex,
    Base64,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParityArg {
    None,
    Odd,
    Even,
    Mark,
    Space,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayArg {
    Ascii,
    Hex,
    HexAscii,
}

impl From<ParityArg> for Parity {
    fn from(arg: ParityArg) -> Self {
        match arg {
            ParityArg::None => Parity::None,
            ParityArg::Odd => Parity::Odd,
            ParityArg::Even => Parity::Even,
            ParityArg::Mark => Parity::Mark,
            ParityArg::Space => Parity::Space,
        }
    }
}

impl From<DisplayArg> for DisplayMode {
    fn from(arg: DisplayArg) -> Self {
        match arg {
            DisplayArg::Ascii => DisplayMode::Ascii,
            DisplayArg::Hex => DisplayMode::Hex,
            DisplayArg::HexAscii => DisplayMode::HexAndAscii,
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Table => write!(f, "table"),
        }
    }
}
