// Core module - Session and negotiation core
pub mod formatter;
pub mod history;
pub mod negotiator;
pub mod port;
pub mod session;

pub use formatter::{DisplayMode, MessageDirection, MessageFormatter};
pub use history::CommandHistory;
pub use negotiator::BaudRateNegotiator;
pub use port::{EventMask, PortEvent, PortFactory, PortHandle, PortListener, PortLister};
pub use session::{ConnectionState, SerialSessionManager, SessionInfo};
