//! SerialTalker Library
//!
//! Serial terminal core: session management over an abstract port,
//! automatic baud rate negotiation, command history and timestamped
//! ASCII/HEX message formatting.

pub mod cli;
pub mod core;
pub mod domain;
pub mod infrastructure;

pub use crate::domain::error::{SerialTalkerError, SerialTalkerResult};
pub use crate::domain::config::{LineSettings, Parity, SerialTalkerConfig};
pub use crate::core::formatter::{DisplayMode, MessageDirection, MessageFormatter};
pub use crate::core::history::CommandHistory;
pub use crate::core::negotiator::BaudRateNegotiator;
pub use crate::core::port::{EventMask, PortEvent, PortFactory, PortHandle, PortLister};
pub use crate::core::session::{ConnectionState, SerialSessionManager, SessionInfo};
