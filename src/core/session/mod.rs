// Session module - Serial session lifecycle
pub mod manager;
pub mod state;

pub use manager::{SerialSessionManager, SessionCallback};
pub use state::{ConnectionState, SessionInfo};
