// Serial module - serialport-backed port handles
pub mod system;

pub use system::{SystemPort, SystemPorts};
