use thiserror::Error;

/// SerialTalker unified error type
#[derive(Error, Debug)]
pub enum SerialTalkerError {
    #[error("Failed to open port '{port}': {message}")]
    PortOpen { port: String, message: String },

    #[error("Failed to apply line parameters: {message}")]
    ParameterApply { message: String },

    #[error("Write failed: {message}")]
    TransportWrite { message: String },

    #[error("Read failed: {message}")]
    TransportRead { message: String },

    #[error("Not connected to any port")]
    NotConnected,

    #[error("No candidate baud rate produced a response")]
    NegotiationExhausted,

    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Output error: {0}")]
    Output(String),
}

impl SerialTalkerError {
    pub fn port_open(port: impl Into<String>, message: impl ToString) -> Self {
        Self::PortOpen {
            port: port.into(),
            message: message.to_string(),
        }
    }

    pub fn parameter_apply(message: impl ToString) -> Self {
        Self::ParameterApply {
            message: message.to_string(),
        }
    }

    pub fn transport_write(message: impl ToString) -> Self {
        Self::TransportWrite {
            message: message.to_string(),
        }
    }

    pub fn transport_read(message: impl ToString) -> Self {
        Self::TransportRead {
            message: message.to_string(),
        }
    }
}

pub type SerialTalkerResult<T> = Result<T, SerialTalkerError>;
