use crate::core::port::{EventMask, PortEvent, PortFactory, PortHandle, PortListener, PortLister};
use crate::domain::config::{LineSettings, Parity};
use crate::domain::error::{SerialTalkerError, SerialTalkerResult};
use serialport::SerialPort;
use std::io::{ErrorKind, Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// How often the watcher thread checks the receive buffer
const POLL_INTERVAL: Duration = Duration::from_millis(10);

const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(100);

type SharedPort = Arc<Mutex<Option<Box<dyn SerialPort>>>>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Ports provided by the operating system
#[derive(Debug, Clone)]
pub struct SystemPorts {
    read_timeout: Duration,
}

impl SystemPorts {
    pub fn new() -> Self {
        Self {
            read_timeout: DEFAULT_READ_TIMEOUT,
        }
    }

    pub fn with_read_timeout(read_timeout: Duration) -> Self {
        Self { read_timeout }
    }
}

impl Default for SystemPorts {
    fn default() -> Self {
        Self::new()
    }
}

impl PortFactory for SystemPorts {
    fn create(&self, name: &str) -> SerialTalkerResult<Arc<dyn PortHandle>> {
        Ok(Arc::new(SystemPort::new(name, self.read_timeout)))
    }
}

impl PortLister for SystemPorts {
    fn list_ports(&self) -> SerialTalkerResult<Vec<String>> {
        let ports = serialport::available_ports()?;
        Ok(ports.into_iter().map(|p| p.port_name).collect())
    }
}

struct Watcher {
    stop: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

/// A serial port opened through the `serialport` crate.
///
/// Receive events come from a watcher thread that polls the input buffer.
pub struct SystemPort {
    name: String,
    read_timeout: Duration,
    settings: Mutex<LineSettings>,
    port: SharedPort,
    watcher: Mutex<Option<Watcher>>,
}

impl SystemPort {
    pub fn new(name: &str, read_timeout: Duration) -> Self {
        Self {
            name: name.to_string(),
            read_timeout,
            settings: Mutex::new(LineSettings::default()),
            port: Arc::new(Mutex::new(None)),
            watcher: Mutex::new(None),
        }
    }

    fn stop_watcher(&self) -> SerialTalkerResult<()> {
        let Some(watcher) = lock(&self.watcher).take() else {
            return Ok(());
        };
        watcher.stop.store(true, Ordering::SeqCst);

        // The listener itself may be tearing the session down
        if watcher.handle.thread().id() == thread::current().id() {
            return Ok(());
        }
        if watcher.handle.join().is_err() {
            warn!("Receive watcher for '{}' panicked", self.name);
        }
        Ok(())
    }
}

impl PortHandle for SystemPort {
    fn name(&self) -> &str {
        &self.name
    }

    fn open(&self) -> SerialTalkerResult<()> {
        let settings = *lock(&self.settings);
        let mut slot = lock(&self.port);
        if slot.is_some() {
            return Ok(());
        }

        let port = serialport::new(&self.name, settings.baud_rate)
            .data_bits(data_bits(settings.data_bits)?)
            .stop_bits(stop_bits(settings.stop_bits)?)
            .parity(parity(settings.parity)?)
            .flow_control(serialport::FlowControl::None)
            .timeout(self.read_timeout)
            .open()
            .map_err(|e| SerialTalkerError::port_open(&self.name, e))?;

        info!("Serial port '{}' opened", self.name);
        *slot = Some(port);
        Ok(())
    }

    fn close(&self) -> SerialTalkerResult<()> {
        self.stop_watcher()?;
        if lock(&self.port).take().is_some() {
            info!("Serial port '{}' closed", self.name);
        }
        Ok(())
    }

    fn is_opened(&self) -> bool {
        lock(&self.port).is_some()
    }

    fn set_params(&self, settings: &LineSettings) -> SerialTalkerResult<()> {
        settings.validate()?;
        // Fail before touching the port if any value is unsupported
        data_bits(settings.data_bits)?;
        stop_bits(settings.stop_bits)?;
        parity(settings.parity)?;

        let mut current = lock(&self.settings);
        if let Some(port) = lock(&self.port).as_mut() {
            if let Err(e) = apply(port.as_mut(), settings) {
                if apply(port.as_mut(), &current).is_err() {
                    error!("Could not restore previous settings on '{}'", self.name);
                }
                return Err(e);
            }
        }
        *current = *settings;
        debug!("'{}' set to {}", self.name, settings);
        Ok(())
    }

    fn write_string(&self, text: &str) -> SerialTalkerResult<()> {
        let mut slot = lock(&self.port);
        let port = slot
            .as_mut()
            .ok_or_else(|| SerialTalkerError::transport_write("port is not open"))?;

        port.write_all(text.as_bytes())
            .and_then(|_| port.flush())
            .map_err(SerialTalkerError::transport_write)
    }

    fn read_string(&self, max_len: usize) -> SerialTalkerResult<String> {
        let mut slot = lock(&self.port);
        let port = slot
            .as_mut()
            .ok_or_else(|| SerialTalkerError::transport_read("port is not open"))?;

        let mut buffer = vec![0u8; max_len];
        let mut filled = 0;
        while filled < max_len {
            match port.read(&mut buffer[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(ref e) if e.kind() == ErrorKind::TimedOut => break,
                Err(e) => return Err(SerialTalkerError::transport_read(e)),
            }
        }

        Ok(String::from_utf8_lossy(&buffer[..filled]).into_owned())
    }

    fn bytes_available(&self) -> SerialTalkerResult<usize> {
        let slot = lock(&self.port);
        let port = slot
            .as_ref()
            .ok_or_else(|| SerialTalkerError::transport_read("port is not open"))?;

        port.bytes_to_read()
            .map(|n| n as usize)
            .map_err(SerialTalkerError::transport_read)
    }

    fn add_event_listener(&self, listener: PortListener, mask: EventMask) -> SerialTalkerResult<()> {
        self.stop_watcher()?;

        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = Arc::clone(&stop);
        let port = Arc::clone(&self.port);
        let name = self.name.clone();

        let handle = thread::Builder::new()
            .name(format!("serial-rx {}", self.name))
            .spawn(move || watch(port, name, listener, mask, stop_flag))?;

        *lock(&self.watcher) = Some(Watcher { stop, handle });
        Ok(())
    }

    fn remove_event_listener(&self) -> SerialTalkerResult<()> {
        self.stop_watcher()
    }
}

impl Drop for SystemPort {
    fn drop(&mut self) {
        let _ = self.stop_watcher();
    }
}

/// Watcher thread body
fn watch(port: SharedPort, name: String, listener: PortListener, mask: EventMask, stop: Arc<AtomicBool>) {
    debug!("Receive watcher for '{}' started", name);

    while !stop.load(Ordering::SeqCst) {
        // The lock is released before the listener runs; it reads through the same mutex
        let pending = match lock(&port).as_ref() {
            Some(port) => port.bytes_to_read(),
            None => break,
        };

        match pending {
            Ok(0) => {}
            Ok(n) => {
                let event = PortEvent::RxChar(n as usize);
                if mask.accepts(&event) && !stop.load(Ordering::SeqCst) {
                    listener(event);
                }
            }
            Err(e) => {
                error!("Receive watcher for '{}' failed: {}", name, e);
                let event = PortEvent::Fault(e.to_string());
                if mask.accepts(&event) && !stop.load(Ordering::SeqCst) {
                    listener(event);
                }
                break;
            }
        }

        thread::sleep(POLL_INTERVAL);
    }

    debug!("Receive watcher for '{}' stopped", name);
}

fn apply(port: &mut dyn SerialPort, settings: &LineSettings) -> SerialTalkerResult<()> {
    let data = data_bits(settings.data_bits)?;
    let stop = stop_bits(settings.stop_bits)?;
    let parity_mode = parity(settings.parity)?;

    port.set_baud_rate(settings.baud_rate)
        .and_then(|_| port.set_data_bits(data))
        .and_then(|_| port.set_stop_bits(stop))
        .and_then(|_| port.set_parity(parity_mode))
        .map_err(SerialTalkerError::parameter_apply)
}

fn data_bits(bits: u8) -> SerialTalkerResult<serialport::DataBits> {
    match bits {
        5 => Ok(serialport::DataBits::Five),
        6 => Ok(serialport::DataBits::Six),
        7 => Ok(serialport::DataBits::Seven),
        8 => Ok(serialport::DataBits::Eight),
        _ => Err(SerialTalkerError::parameter_apply(format!("invalid data bits: {}", bits))),
    }
}

fn stop_bits(bits: u8) -> SerialTalkerResult<serialport::StopBits> {
    match bits {
        1 => Ok(serialport::StopBits::One),
        2 => Ok(serialport::StopBits::Two),
        _ => Err(SerialTalkerError::parameter_apply(format!("invalid stop bits: {}", bits))),
    }
}

fn parity(parity: Parity) -> SerialTalkerResult<serialport::Parity> {
    match parity {
        Parity::None => Ok(serialport::Parity::None),
        Parity::Odd => Ok(serialport::Parity::Odd),
        Parity::Even => Ok(serialport::Parity::Even),
        Parity::Mark | Parity::Space => Err(SerialTalkerError::parameter_apply(format!(
            "{} parity is not supported by the serial driver",
            parity
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MISSING_PORT: &str = "/dev/serialtalker-missing-port";

    #[test]
    fn test_open_missing_port_fails() {
        let port = SystemPorts::new().create(MISSING_PORT).unwrap();

        let result = port.open();

        assert!(matches!(result, Err(SerialTalkerError::PortOpen { .. })));
        assert!(!port.is_opened());
    }

    #[test]
    fn test_io_on_closed_port_fails() {
        let port = SystemPort::new(MISSING_PORT, DEFAULT_READ_TIMEOUT);

        assert!(matches!(
            port.write_string("AT\r\n"),
            Err(SerialTalkerError::TransportWrite { .. })
        ));
        assert!(matches!(port.read_string(4), Err(SerialTalkerError::TransportRead { .. })));
        assert!(port.bytes_available().is_err());
    }

    #[test]
    fn test_close_and_unsubscribe_are_idempotent() {
        let port = SystemPort::new(MISSING_PORT, DEFAULT_READ_TIMEOUT);
        assert!(port.remove_event_listener().is_ok());
        assert!(port.close().is_ok());
        assert!(port.close().is_ok());
    }

    #[test]
    fn test_set_params_on_closed_port_stores_settings() {
        let port = SystemPort::new(MISSING_PORT, DEFAULT_READ_TIMEOUT);
        let settings = LineSettings::new(57600, 7, 2, Parity::Odd);

        port.set_params(&settings).unwrap();

        assert_eq!(*lock(&port.settings), settings);
    }

    #[test]
    fn test_unsupported_settings_rejected() {
        let port = SystemPort::new(MISSING_PORT, DEFAULT_READ_TIMEOUT);

        for settings in [
            LineSettings::new(9600, 8, 1, Parity::Mark),
            LineSettings::new(9600, 8, 1, Parity::Space),
            LineSettings::new(9600, 4, 1, Parity::None),
            LineSettings::new(9600, 8, 0, Parity::None),
        ] {
            assert!(matches!(
                port.set_params(&settings),
                Err(SerialTalkerError::ParameterApply { .. })
            ));
        }
        assert_eq!(*lock(&port.settings), LineSettings::default());
    }

    #[test]
    fn test_list_ports_does_not_panic() {
        // Containers may expose no ports at all
        let _ = SystemPorts::new().list_ports();
    }

    #[test]
    fn test_watcher_stops_without_port() {
        let port = SystemPort::new(MISSING_PORT, DEFAULT_READ_TIMEOUT);
        port.add_event_listener(Box::new(|_: PortEvent| {}), EventMask::ALL).unwrap();
        // Nothing open, the watcher exits on its own; removing must still return
        assert!(port.remove_event_listener().is_ok());
    }
}
