use crate::core::port::{EventMask, PortEvent, PortFactory, PortHandle, PortListener, PortLister};
use crate::core::session::state::{ConnectionState, SessionInfo};
use crate::domain::config::LineSettings;
use crate::domain::error::{SerialTalkerError, SerialTalkerResult};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Single-argument notification hook
pub type SessionCallback = Arc<dyn Fn(&str) + Send + Sync>;

#[derive(Clone)]
struct SessionCallbacks {
    data_received: SessionCallback,
    error: SessionCallback,
    connected: SessionCallback,
    disconnected: SessionCallback,
}

impl Default for SessionCallbacks {
    fn default() -> Self {
        let noop: SessionCallback = Arc::new(|_: &str| {});
        Self {
            data_received: Arc::clone(&noop),
            error: Arc::clone(&noop),
            connected: Arc::clone(&noop),
            disconnected: noop,
        }
    }
}

/// The open port and everything tied to its lifetime
struct ActiveSession {
    id: String,
    port_name: String,
    port: Arc<dyn PortHandle>,
    settings: LineSettings,
    started_at: Instant,
}

/// State reachable from both the caller's thread and the port's event thread
struct SessionShared {
    state: Mutex<ConnectionState>,
    active: Mutex<Option<ActiveSession>>,
    bytes_sent: AtomicU64,
    bytes_received: AtomicU64,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl SessionShared {
    fn new() -> Self {
        Self {
            state: Mutex::new(ConnectionState::Idle),
            active: Mutex::new(None),
            bytes_sent: AtomicU64::new(0),
            bytes_received: AtomicU64::new(0),
        }
    }

    fn state(&self) -> ConnectionState {
        *lock(&self.state)
    }

    fn set_state(&self, state: ConnectionState) {
        *lock(&self.state) = state;
    }

    /// Store `session` and mark it connected under the same lock
    fn activate(&self, session: ActiveSession) {
        let mut active = lock(&self.active);
        *active = Some(session);
        self.set_state(ConnectionState::Connected);
    }

    fn is_active(&self, session_id: &str) -> bool {
        lock(&self.active)
            .as_ref()
            .is_some_and(|session| session.id == session_id)
    }

    fn take_active(&self) -> Option<ActiveSession> {
        lock(&self.active).take()
    }

    /// Take the active session and go idle, only if it is still `session_id`
    fn take_active_if(&self, session_id: &str) -> Option<ActiveSession> {
        let mut active = lock(&self.active);
        if active.as_ref().is_some_and(|session| session.id == session_id) {
            self.set_state(ConnectionState::Idle);
            active.take()
        } else {
            None
        }
    }

    fn active_port(&self) -> Option<Arc<dyn PortHandle>> {
        lock(&self.active).as_ref().map(|session| Arc::clone(&session.port))
    }
}

/// Unsubscribe first, then close. Errors are logged and dropped.
fn release(session: &ActiveSession) {
    if let Err(e) = session.port.remove_event_listener() {
        warn!("Failed to remove listener on '{}': {}", session.port_name, e);
    }
    close_quietly(session.port.as_ref());
}

fn close_quietly(port: &dyn PortHandle) {
    if let Err(e) = port.close() {
        warn!("Ignoring close error on '{}': {}", port.name(), e);
    }
}

/// Owns the one serial session: its port, subscription, counters and uptime.
///
/// Callbacks run without any internal lock held, so they may call back
/// into the manager, including [`disconnect`](Self::disconnect).
pub struct SerialSessionManager {
    factory: Arc<dyn PortFactory>,
    lister: Arc<dyn PortLister>,
    callbacks: Arc<SessionCallbacks>,
    shared: Arc<SessionShared>,
}

impl SerialSessionManager {
    pub fn new(factory: Arc<dyn PortFactory>, lister: Arc<dyn PortLister>) -> Self {
        Self {
            factory,
            lister,
            callbacks: Arc::new(SessionCallbacks::default()),
            shared: Arc::new(SessionShared::new()),
        }
    }

    pub fn on_data_received<F>(mut self, callback: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        Arc::make_mut(&mut self.callbacks).data_received = Arc::new(callback);
        self
    }

    pub fn on_error<F>(mut self, callback: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        Arc::make_mut(&mut self.callbacks).error = Arc::new(callback);
        self
    }

    pub fn on_connected<F>(mut self, callback: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        Arc::make_mut(&mut self.callbacks).connected = Arc::new(callback);
        self
    }

    pub fn on_disconnected<F>(mut self, callback: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        Arc::make_mut(&mut self.callbacks).disconnected = Arc::new(callback);
        self
    }

    /// Open `port_name` with `settings` and start receiving.
    ///
    /// Any session already open is released first. Failures are reported
    /// to the error callback once and returned.
    pub fn connect(&self, port_name: &str, settings: LineSettings) -> SerialTalkerResult<()> {
        if let Some(previous) = self.shared.take_active() {
            info!("Releasing '{}' before opening '{}'", previous.port_name, port_name);
            release(&previous);
        }
        self.shared.set_state(ConnectionState::Connecting);

        let port = match self.open_port(port_name, &settings) {
            Ok(port) => port,
            Err(e) => return self.fail_connect(port_name, e),
        };

        self.shared.bytes_sent.store(0, Ordering::SeqCst);
        self.shared.bytes_received.store(0, Ordering::SeqCst);

        // Must be visible to the listener before it is attached
        let session_id = uuid::Uuid::new_v4().to_string();
        self.shared.activate(ActiveSession {
            id: session_id.clone(),
            port_name: port_name.to_string(),
            port: Arc::clone(&port),
            settings,
            started_at: Instant::now(),
        });

        let listener = self.receive_listener(session_id.clone(), Arc::downgrade(&port));
        if let Err(e) = port.add_event_listener(listener, EventMask::ALL) {
            if self.shared.take_active_if(&session_id).is_none() {
                // Already torn down and reported
                return Err(e);
            }
            close_quietly(port.as_ref());
            return self.fail_connect(port_name, e);
        }

        if !self.shared.is_active(&session_id) {
            warn!("Session {} on '{}' ended while subscribing", session_id, port_name);
            if let Err(e) = port.remove_event_listener() {
                warn!("Failed to remove listener on '{}': {}", port_name, e);
            }
            close_quietly(port.as_ref());
            return Err(SerialTalkerError::port_open(port_name, "session ended while connecting"));
        }

        info!("Session {} connected to '{}' at {}", session_id, port_name, settings);
        (self.callbacks.connected)(port_name);
        Ok(())
    }

    fn fail_connect(&self, port_name: &str, e: SerialTalkerError) -> SerialTalkerResult<()> {
        self.shared.set_state(ConnectionState::Idle);
        error!("Failed to connect to '{}': {}", port_name, e);
        (self.callbacks.error)(&e.to_string());
        Err(e)
    }

    fn open_port(&self, port_name: &str, settings: &LineSettings) -> SerialTalkerResult<Arc<dyn PortHandle>> {
        if port_name.trim().is_empty() {
            return Err(SerialTalkerError::port_open(port_name, "no port selected"));
        }

        let port = self.factory.create(port_name)?;
        port.open()?;

        if let Err(e) = port.set_params(settings) {
            close_quietly(port.as_ref());
            return Err(e);
        }
        Ok(port)
    }

    /// Inbound path, runs on the port's event thread
    fn receive_listener(&self, session_id: String, port: Weak<dyn PortHandle>) -> PortListener {
        let shared = Arc::clone(&self.shared);
        let callbacks = Arc::clone(&self.callbacks);

        Box::new(move |event| match event {
            PortEvent::RxChar(0) => {}
            PortEvent::RxChar(count) => {
                let Some(port) = port.upgrade() else {
                    return;
                };
                match port.read_string(count) {
                    Ok(text) => {
                        shared
                            .bytes_received
                            .fetch_add(text.len() as u64, Ordering::SeqCst);
                        debug!("Received {} bytes on '{}'", text.len(), port.name());
                        (callbacks.data_received)(&text);
                    }
                    Err(e) => {
                        warn!("Read failed on '{}': {}", port.name(), e);
                        (callbacks.error)(&format!("Error reading from port: {}", e));
                    }
                }
            }
            PortEvent::Fault(message) => {
                error!("Port failure in session {}: {}", session_id, message);
                (callbacks.error)(&format!("Port failure: {}", message));
                if let Some(session) = shared.take_active_if(&session_id) {
                    release(&session);
                    (callbacks.disconnected)("Connection lost");
                }
            }
        })
    }

    /// Close the session if there is one. Always succeeds and always
    /// fires the disconnected callback.
    pub fn disconnect(&self) {
        if let Some(session) = self.shared.take_active() {
            release(&session);
            info!("Session {} on '{}' closed", session.id, session.port_name);
        }
        self.shared.set_state(ConnectionState::Idle);
        (self.callbacks.disconnected)("Disconnected");
    }

    pub fn send_message(&self, text: &str) -> SerialTalkerResult<()> {
        if !self.is_connected() {
            return Err(SerialTalkerError::NotConnected);
        }
        let port = self.shared.active_port().ok_or(SerialTalkerError::NotConnected)?;

        port.write_string(text)?;
        self.shared
            .bytes_sent
            .fetch_add(text.len() as u64, Ordering::SeqCst);
        debug!("Sent {} bytes on '{}'", text.len(), port.name());
        Ok(())
    }

    pub fn bytes_sent(&self) -> u64 {
        self.shared.bytes_sent.load(Ordering::SeqCst)
    }

    pub fn bytes_received(&self) -> u64 {
        self.shared.bytes_received.load(Ordering::SeqCst)
    }

    /// Whole seconds since the last successful connect, 0 when idle
    pub fn uptime_seconds(&self) -> u64 {
        if !self.is_connected() {
            return 0;
        }
        lock(&self.shared.active)
            .as_ref()
            .map(|session| session.started_at.elapsed().as_secs())
            .unwrap_or(0)
    }

    pub fn is_connected(&self) -> bool {
        self.shared.state() == ConnectionState::Connected
    }

    pub fn state(&self) -> ConnectionState {
        self.shared.state()
    }

    pub fn session_info(&self) -> Option<SessionInfo> {
        let state = self.shared.state();
        let active = lock(&self.shared.active);
        let session = active.as_ref()?;

        Some(SessionInfo {
            session_id: session.id.clone(),
            port_name: session.port_name.clone(),
            settings: session.settings,
            state,
            bytes_sent: self.bytes_sent(),
            bytes_received: self.bytes_received(),
            uptime_seconds: session.started_at.elapsed().as_secs(),
        })
    }

    pub fn list_ports(&self) -> SerialTalkerResult<Vec<String>> {
        self.lister.list_ports()
    }
}

impl Drop for SerialSessionManager {
    fn drop(&mut self) {
        if let Some(session) = self.shared.take_active() {
            debug!("Manager dropped with '{}' open, releasing", session.port_name);
            release(&session);
            self.shared.set_state(ConnectionState::Idle);
        }
    }
}
