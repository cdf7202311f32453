//! Port capability contract
//!
//! The session core never talks to hardware directly. It asks a
//! [`PortFactory`] for a [`PortHandle`] by name and drives it through this
//! narrow interface, so the same code runs against `serialport` in
//! production and against in-memory ports in tests.

use crate::domain::{config::LineSettings, error::SerialTalkerResult};
use std::fmt;
use std::sync::Arc;

/// Notification delivered by a port's event thread
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PortEvent {
    /// Receive buffer holds this many unread bytes
    RxChar(usize),
    /// The line failed and the port can no longer be used
    Fault(String),
}

/// Selects which events a listener wants
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventMask(u8);

impl EventMask {
    pub const RX_CHAR: EventMask = EventMask(0b01);
    pub const FAULT: EventMask = EventMask(0b10);
    pub const ALL: EventMask = EventMask(0b11);

    pub fn contains(&self, other: EventMask) -> bool {
        self.0 & other.0 == other.0
    }

    /// Whether `event` passes this mask
    pub fn accepts(&self, event: &PortEvent) -> bool {
        match event {
            PortEvent::RxChar(_) => self.contains(EventMask::RX_CHAR),
            PortEvent::Fault(_) => self.contains(EventMask::FAULT),
        }
    }
}

impl std::ops::BitOr for EventMask {
    type Output = EventMask;

    fn bitor(self, rhs: EventMask) -> EventMask {
        EventMask(self.0 | rhs.0)
    }
}

/// Callback invoked on the port's event thread
pub type PortListener = Box<dyn Fn(PortEvent) + Send + Sync>;

/// An individual serial port
///
/// Methods take `&self` because a handle is shared between the caller's
/// thread and the port's own event thread.
pub trait PortHandle: Send + Sync {
    /// Name the handle was created for
    fn name(&self) -> &str;

    fn open(&self) -> SerialTalkerResult<()>;

    fn close(&self) -> SerialTalkerResult<()>;

    fn is_opened(&self) -> bool;

    /// Apply all four line parameters, or none of them
    fn set_params(&self, settings: &LineSettings) -> SerialTalkerResult<()>;

    fn write_string(&self, text: &str) -> SerialTalkerResult<()>;

    /// Read at most `max_len` bytes and decode them as text
    fn read_string(&self, max_len: usize) -> SerialTalkerResult<String>;

    /// Bytes waiting in the receive buffer
    fn bytes_available(&self) -> SerialTalkerResult<usize>;

    /// Start delivering events matching `mask` to `listener`
    fn add_event_listener(&self, listener: PortListener, mask: EventMask) -> SerialTalkerResult<()>;

    /// Stop event delivery. Once this returns no further listener
    /// invocation starts, except when called from the listener itself.
    fn remove_event_listener(&self) -> SerialTalkerResult<()>;
}

impl fmt::Debug for dyn PortHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PortHandle")
            .field("name", &self.name())
            .field("opened", &self.is_opened())
            .finish()
    }
}

/// Produces port handles by name
pub trait PortFactory: Send + Sync {
    fn create(&self, name: &str) -> SerialTalkerResult<Arc<dyn PortHandle>>;
}

/// Enumerates the ports the platform currently exposes
pub trait PortLister: Send + Sync {
    fn list_ports(&self) -> SerialTalkerResult<Vec<String>>;
}
