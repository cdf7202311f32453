use crate::cli::args::OutputFormat;
use crate::core::session::SessionInfo;
use crate::domain::config::SerialTalkerConfig;
use std::io;
use tabled::{Table, Tabled};

/// Output writer trait for different formats
pub trait OutputWriter {
    fn write_ports(&self, ports: &[String]) -> Result<(), OutputError>;
    fn write_session_info(&self, info: &SessionInfo) -> Result<(), OutputError>;
    fn write_config(&self, config: &SerialTalkerConfig) -> Result<(), OutputError>;
    fn write_message(&self, message: &str) -> Result<(), OutputError>;
    fn write_error(&self, error: &str) -> Result<(), OutputError>;
}

/// Output formatting errors
#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("TOML serialization error: {0}")]
    TomlError(#[from] toml::ser::Error),
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
}

impl From<OutputError> for crate::domain::error::SerialTalkerError {
    fn from(err: OutputError) -> Self {
        Self::Output(err.to_string())
    }
}

/// Console output writer
pub struct ConsoleWriter {
    format: OutputFormat,
}

impl ConsoleWriter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }
}

impl OutputWriter for ConsoleWriter {
    fn write_ports(&self, ports: &[String]) -> Result<(), OutputError> {
        match self.format {
            OutputFormat::Text => {
                if ports.is_empty() {
                    println!("No serial ports found");
                }
                for port in ports {
                    println!("{}", port);
                }
            }
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(ports)?);
            }
            OutputFormat::Table => {
                let rows: Vec<PortTableRow> = ports
                    .iter()
                    .enumerate()
                    .map(|(index, port)| PortTableRow {
                        index,
                        port: port.clone(),
                    })
                    .collect();
                println!("{}", Table::new(rows));
            }
        }
        Ok(())
    }

    fn write_session_info(&self, info: &SessionInfo) -> Result<(), OutputError> {
        match self.format {
            OutputFormat::Text => {
                println!("Session: {}", info.session_id);
                println!("  Port: {}", info.port_name);
                println!("  Settings: {}", info.settings);
                println!("  State: {}", info.state);
                println!("  Bytes sent: {}", info.bytes_sent);
                println!("  Bytes received: {}", info.bytes_received);
                println!("  Uptime: {}s", info.uptime_seconds);
            }
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(info)?);
            }
            OutputFormat::Table => {
                println!("{}", Table::new(vec![SessionTableRow::from(info)]));
            }
        }
        Ok(())
    }

    fn write_config(&self, config: &SerialTalkerConfig) -> Result<(), OutputError> {
        match self.format {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(config)?);
            }
            _ => {
                print!("{}", toml::to_string_pretty(config)?);
            }
        }
        Ok(())
    }

    fn write_message(&self, message: &str) -> Result<(), OutputError> {
        match self.format {
            OutputFormat::Json => {
                let output = serde_json::json!({
                    "message": message,
                    "level": "info"
                });
                println!("{}", serde_json::to_string(&output)?);
            }
            _ => {
                println!("{}", message);
            }
        }
        Ok(())
    }

    fn write_error(&self, error: &str) -> Result<(), OutputError> {
        match self.format {
            OutputFormat::Json => {
                let output = serde_json::json!({
                    "error": error,
                    "level": "error"
                });
                eprintln!("{}", serde_json::to_string(&output)?);
            }
            _ => {
                eprintln!("Error: {}", error);
            }
        }
        Ok(())
    }
}

/// Table row for port listing
#[derive(Tabled)]
struct PortTableRow {
    index: usize,
    port: String,
}

/// Table row for session statistics
#[derive(Tabled)]
struct SessionTableRow {
    id: String,
    port: String,
    settings: String,
    state: String,
    sent: u64,
    received: u64,
    uptime: u64,
}

impl From<&SessionInfo> for SessionTableRow {
    fn from(info: &SessionInfo) -> Self {
        Self {
            id: info.session_id.clone(),
            port: info.port_name.clone(),
            settings: info.settings.to_string(),
            state: info.state.to_string(),
            sent: info.bytes_sent,
            received: info.bytes_received,
            uptime: info.uptime_seconds,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::session::ConnectionState;
    use crate::domain::config::LineSettings;

    #[test]
    fn test_session_table_row() {
        let info = SessionInfo {
            session_id: "id-1".to_string(),
            port_name: "/dev/ttyACM0".to_string(),
            settings: LineSettings::default().with_baud_rate(115200),
            state: ConnectionState::Connected,
            bytes_sent: 4,
            bytes_received: 12,
            uptime_seconds: 3,
        };

        let row = SessionTableRow::from(&info);
        assert_eq!(row.settings, "115200 8N1");
        assert_eq!(row.state, "Connected");

        let rendered = Table::new(vec![row]).to_string();
        assert!(rendered.contains("/dev/ttyACM0"));
    }

    #[test]
    fn test_output_error_converts() {
        let err: crate::domain::error::SerialTalkerError =
            OutputError::IoError(io::Error::new(io::ErrorKind::BrokenPipe, "closed")).into();
        assert!(err.to_string().contains("closed"));
    }
}
