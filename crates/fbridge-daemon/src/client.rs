//! The daemon protocol client
//!
//! [`DaemonClient`] owns one `flutter daemon` session at a time. Stdout lines
//! are decoded and routed on a single pump task per session, so events reach
//! the device registry strictly in arrival order. Requests may be in flight
//! concurrently; each waits on its own oneshot with its own timeout.
//!
//! All mutable state sits behind one mutex. Public methods and the pump take
//! the lock only for synchronous work and release it before calling any
//! collaborator or awaiting.

use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use serde_json::Value;
use tokio::sync::{mpsc, Notify};

use crate::commands::{DaemonCommand, RequestTracker, DEFAULT_REQUEST_TIMEOUT};
use crate::host::Collaborators;
use crate::process::DaemonProcess;
use crate::protocol::{decode_line, encode_request, DaemonRequest, DaemonResponse, DecodedLine, WireMessage};
use crate::registry::DeviceRegistry;
use fbridge_core::events::{DaemonEvent, DaemonMessage};
use fbridge_core::prelude::*;
use fbridge_core::{Device, PersistenceMode, DAEMON_OUTPUT_TARGET};

/// Capacity of the per-session process event channel
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Tunables for a [`DaemonClient`]
#[derive(Debug, Clone)]
pub struct DaemonConfig {
    /// How long a request waits for its response
    pub request_timeout: Duration,
    /// Extra time the handshake waits for a first `device.added` after
    /// `device.enable` resolved with an empty registry. Zero disables it.
    pub discovery_grace: Duration,
    /// Arguments appended after `daemon`
    pub extra_args: Vec<String>,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            discovery_grace: Duration::ZERO,
            extra_args: Vec::new(),
        }
    }
}

/// Process lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecyclePhase {
    /// No process
    Stopped,
    /// Spawned, waiting for `daemon.connected`
    Starting,
    /// Connected
    Running,
    /// The process exited on its own with a failure
    Crashed,
}

struct ClientState {
    process: Option<DaemonProcess>,
    /// Bumped on every start/stop; events from older sessions are dropped
    session: u64,
    registry: DeviceRegistry,
    phase: LifecyclePhase,
}

impl ClientState {
    fn current_name(&self) -> Option<String> {
        self.registry.current().map(|d| d.name.clone())
    }

    fn is_writable(&self) -> bool {
        self.process.as_ref().is_some_and(DaemonProcess::is_writable)
    }
}

struct ClientInner {
    config: DaemonConfig,
    host: Collaborators,
    tracker: RequestTracker,
    state: Mutex<ClientState>,
    /// Signalled whenever a device is added
    device_arrived: Notify,
    /// Serializes status reports
    report_gate: Mutex<()>,
}

/// Client for one Flutter daemon at a time
///
/// Cheap to clone; clones share the same session. `start` and `try_start`
/// spawn tasks and must be called from within a Tokio runtime. Dropping the
/// last handle kills the process and resolves every pending request with
/// "no response".
#[derive(Clone)]
pub struct DaemonClient {
    inner: Arc<ClientInner>,
}

impl DaemonClient {
    /// Create a stopped client, seeding the selection from the store
    pub fn new(config: DaemonConfig, host: Collaborators) -> Self {
        let selected = host.selection.load_selected();
        if let Some(id) = &selected {
            debug!("Restored selected device: {}", id);
        }

        let state = ClientState {
            process: None,
            session: 0,
            registry: DeviceRegistry::with_selection(selected),
            phase: LifecyclePhase::Stopped,
        };

        Self {
            inner: Arc::new(ClientInner {
                config,
                host,
                tracker: RequestTracker::new(),
                state: Mutex::new(state),
                device_arrived: Notify::new(),
                report_gate: Mutex::new(()),
            }),
        }
    }

    /// Start the daemon, reporting failures to the notifier
    ///
    /// Returns `false` if the daemon was already running or could not be
    /// spawned. Does not wait for `daemon.connected`.
    pub fn start(&self) -> bool {
        match self.try_start() {
            Ok(()) => true,
            Err(Error::AlreadyRunning) => {
                debug!("start() ignored: daemon already running");
                false
            }
            Err(e) => {
                debug!("start() failed: {}", e);
                false
            }
        }
    }

    /// Start the daemon
    ///
    /// Errors: [`Error::AlreadyRunning`], [`Error::WorkspaceNotFound`],
    /// [`Error::FlutterNotFound`] or [`Error::ProcessSpawn`]. Everything but
    /// `AlreadyRunning` is also reported through the notifier.
    pub fn try_start(&self) -> Result<()> {
        let result = self.inner.spawn_session();
        match &result {
            Ok(()) | Err(Error::AlreadyRunning) => {}
            Err(e) => {
                error!("Failed to start daemon: {}", e);
                self.inner
                    .host
                    .notifier
                    .notify(&format!("Flutter daemon not started: {}", e));
            }
        }
        result
    }

    /// Kill the daemon and forget its devices
    ///
    /// The selected id survives. Pending requests resolve with "no response".
    /// Calling this with no process is a no-op.
    pub fn stop(&self) {
        let changed = {
            let mut state = self.inner.state();
            let Some(mut process) = state.process.take() else {
                return;
            };
            state.session += 1;
            state.phase = LifecyclePhase::Stopped;
            process.kill();
            info!("Daemon stopped");
            state.registry.clear_devices()
        };

        let cancelled = self.inner.tracker.cancel_all();
        if cancelled > 0 {
            debug!("Resolved {} pending requests with no response", cancelled);
        }
        if changed {
            self.inner.report_current();
        }
    }

    /// Whether a process exists and accepts writes
    pub fn is_running(&self) -> bool {
        self.inner.state().is_writable()
    }

    pub fn phase(&self) -> LifecyclePhase {
        self.inner.state().phase
    }

    /// Send a request and wait for its response
    ///
    /// `Ok(None)` means the daemon did not answer within the request timeout
    /// (or was stopped while the request was pending). Fails immediately
    /// with [`Error::DaemonNotRunning`] when there is no writable process.
    pub async fn send_request(
        &self,
        method: &str,
        params: Option<Value>,
    ) -> Result<Option<DaemonResponse>> {
        self.inner.send_request(method, params).await
    }

    /// Send a typed command
    pub async fn send_command(&self, command: DaemonCommand) -> Result<Option<DaemonResponse>> {
        debug!("Sending command: {}", command.description());
        self.inner
            .send_request(command.method(), command.params())
            .await
    }

    /// Make `device` the preferred device and persist the choice
    ///
    /// The selection applies even if the device is not currently present.
    pub fn select_device(&self, device: &Device, mode: PersistenceMode) {
        self.inner.state().registry.select(device.id.clone());
        info!("Selected device {} ({})", device.id, mode);

        if let Err(e) = self.inner.host.selection.persist_selection(mode, &device.id) {
            warn!("Failed to persist device selection: {}", e);
        }
        self.inner.report_current();
    }

    /// Known devices in the order they were added
    pub fn devices(&self) -> Vec<Device> {
        self.inner.state().registry.devices().to_vec()
    }

    pub fn current_device(&self) -> Option<Device> {
        self.inner.state().registry.current().cloned()
    }

    pub fn selected_device_id(&self) -> Option<String> {
        self.inner.state().registry.selected_id().map(str::to_string)
    }

    /// Number of requests awaiting a response
    pub fn pending_requests(&self) -> usize {
        self.inner.tracker.pending_count()
    }

    pub fn config(&self) -> &DaemonConfig {
        &self.inner.config
    }

    /// Decode and route one stdout line as if it came from the current session
    pub fn handle_line(&self, line: &str) {
        let session = self.inner.state().session;
        self.inner.handle_line(session, line);
    }

    /// Install a process with no child behind it; returns what it is sent
    #[cfg(any(test, feature = "test-helpers"))]
    pub fn attach_detached(&self) -> mpsc::Receiver<String> {
        let (stdin_tx, stdin_rx) = mpsc::channel(64);
        let mut state = self.inner.state();
        state.session += 1;
        state.phase = LifecyclePhase::Starting;
        state.process = Some(DaemonProcess::detached(stdin_tx));
        stdin_rx
    }
}

impl ClientInner {
    fn state(&self) -> MutexGuard<'_, ClientState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Report the current device as settled
    ///
    /// Reads and reports under the gate so concurrent reporters cannot
    /// deliver an older value last.
    fn report_current(&self) {
        let _gate = self.report_gate.lock().unwrap_or_else(PoisonError::into_inner);
        let name = self.state().current_name();
        self.host.status.report_device_state(name, false);
    }

    fn report_loading(&self) {
        let _gate = self.report_gate.lock().unwrap_or_else(PoisonError::into_inner);
        self.host.status.report_device_state(None, true);
    }

    fn spawn_session(self: &Arc<Self>) -> Result<()> {
        if self.state().is_writable() {
            return Err(Error::AlreadyRunning);
        }

        let working_dir = self
            .host
            .workspace
            .resolve_working_directory()
            .ok_or(Error::WorkspaceNotFound)?;
        let command: PathBuf = self
            .host
            .toolchain
            .toolchain_command()
            .ok_or(Error::FlutterNotFound)?;

        let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);

        let (session, changed) = {
            let mut state = self.state();
            if state.is_writable() {
                return Err(Error::AlreadyRunning);
            }

            state.phase = LifecyclePhase::Starting;
            let process = match DaemonProcess::spawn(
                &command,
                &self.config.extra_args,
                &working_dir,
                event_tx,
            ) {
                Ok(process) => process,
                Err(e) => {
                    state.phase = LifecyclePhase::Stopped;
                    return Err(e);
                }
            };

            // A dead process whose exit has not been processed yet is
            // replaced; its late events belong to an old session.
            state.session += 1;
            state.process = Some(process);
            let changed = state.registry.clear_devices();
            (state.session, changed)
        };

        if changed {
            self.report_current();
        }

        tokio::spawn(pump(Arc::downgrade(self), session, event_rx));
        Ok(())
    }

    async fn send_request(
        &self,
        method: &str,
        params: Option<Value>,
    ) -> Result<Option<DaemonResponse>> {
        let stdin = {
            let state = self.state();
            match state.process.as_ref().filter(|p| p.is_writable()) {
                Some(process) => process.stdin_sender(),
                None => return Err(Error::not_running(method)),
            }
        };

        let id = self.tracker.reserve_id();
        let line = encode_request(&DaemonRequest::new(id, method, params))?;

        // Registered before writing so a fast response cannot miss it
        let response_rx = self.tracker.register(id, method);
        if stdin.send(line).await.is_err() {
            self.tracker.expire(id);
            return Err(Error::not_running(method));
        }

        match tokio::time::timeout(self.config.request_timeout, response_rx).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(_)) => Ok(None),
            Err(_) => {
                if self.tracker.expire(id) {
                    warn!(
                        "No response to {} (#{}) within {:?}",
                        method, id, self.config.request_timeout
                    );
                }
                Ok(None)
            }
        }
    }

    fn on_event(self: &Arc<Self>, session: u64, event: DaemonEvent) {
        match event {
            DaemonEvent::Stdout(line) => self.handle_line(session, &line),
            DaemonEvent::Stderr(line) => warn!(target: DAEMON_OUTPUT_TARGET, "{}", line),
            DaemonEvent::Exited { code } => self.on_exit(session, code),
        }
    }

    fn on_exit(&self, session: u64, code: Option<i32>) {
        let changed = {
            let mut state = self.state();
            if state.session != session {
                return;
            }
            state.process = None;
            state.phase = match code {
                Some(0) => LifecyclePhase::Stopped,
                _ => LifecyclePhase::Crashed,
            };
            state.registry.clear_devices()
        };

        match code {
            Some(0) => info!("Daemon exited"),
            Some(code) => warn!("Daemon exited with code {}", code),
            None => warn!("Daemon terminated without an exit code"),
        }

        self.tracker.cancel_all();
        if changed {
            self.report_current();
        }
    }

    fn handle_line(self: &Arc<Self>, session: u64, line: &str) {
        match decode_line(line) {
            DecodedLine::Passthrough(text) => info!(target: DAEMON_OUTPUT_TARGET, "{}", text),
            DecodedLine::Malformed { line, reason } => {
                warn!("Dropping malformed daemon message ({}): {}", reason, line)
            }
            DecodedLine::Message(message) => self.route(session, message),
        }
    }

    fn route(self: &Arc<Self>, session: u64, message: WireMessage) {
        debug!("<- {}", message.summary());
        let WireMessage {
            id,
            event,
            params,
            result,
            error,
        } = message;

        if let Some(id) = id {
            let response = DaemonResponse { id, result, error };
            if !self.tracker.resolve(response) {
                debug!("Discarding late or unmatched response #{}", id);
            }
        }

        match event {
            Some(event) => match DaemonMessage::from_event(&event, params) {
                Ok(message) => self.on_message(session, message),
                Err(e) => warn!("Dropping {} event: {}", event, e),
            },
            None if id.is_none() => warn!("Dropping daemon message without event"),
            None => {}
        }
    }

    fn on_message(self: &Arc<Self>, session: u64, message: DaemonMessage) {
        match message {
            DaemonMessage::DaemonConnected(connected) => {
                info!(
                    "Daemon connected (version {:?}, pid {:?})",
                    connected.version, connected.pid
                );
                {
                    let mut state = self.state();
                    if state.session != session {
                        return;
                    }
                    state.phase = LifecyclePhase::Running;
                }
                let inner = Arc::clone(self);
                tokio::spawn(async move { inner.handshake(session).await });
            }
            DaemonMessage::DaemonLogMessage(log) => self.host.notifier.notify(&log.message),
            DaemonMessage::DeviceAdded(device) => self.on_device_added(session, device),
            DaemonMessage::DeviceRemoved(device) => self.on_device_removed(session, &device.id),
            DaemonMessage::Unhandled { event } => debug!("Unhandled daemon event: {}", event),
        }
    }

    fn on_device_added(&self, session: u64, device: Device) {
        debug!("Device added: {} ({})", device.id, device.name);
        let changed = {
            let mut state = self.state();
            if state.session != session {
                return;
            }
            state.registry.insert(device)
        };

        self.device_arrived.notify_waiters();
        if changed {
            self.report_current();
        }
    }

    fn on_device_removed(&self, session: u64, id: &str) {
        debug!("Device removed: {}", id);
        let changed = {
            let mut state = self.state();
            if state.session != session {
                return;
            }
            state.registry.remove(id)
        };

        if changed {
            self.report_current();
        }
    }

    /// Enable device discovery and settle the loading state
    async fn handshake(&self, session: u64) {
        self.report_loading();

        let command = DaemonCommand::EnableDevices;
        match self.send_request(command.method(), command.params()).await {
            Ok(Some(response)) if !response.is_success() => {
                warn!("{} failed: {:?}", command.method(), response.error)
            }
            Ok(Some(_)) => debug!("Device discovery enabled"),
            Ok(None) => debug!("No response to {}", command.method()),
            Err(e) => {
                warn!("Handshake aborted: {}", e);
                return;
            }
        }

        if !self.config.discovery_grace.is_zero() {
            let arrived = self.device_arrived.notified();
            let empty = self.state().registry.is_empty();
            if empty {
                let _ = tokio::time::timeout(self.config.discovery_grace, arrived).await;
            }
        }

        // Settle the loading state; with an empty registry this is the
        // final "no device" report
        let current = self.state().session == session;
        if current {
            self.report_current();
        }
    }
}

impl Drop for ClientInner {
    fn drop(&mut self) {
        let state = self.state.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(mut process) = state.process.take() {
            process.kill();
        }
        self.tracker.cancel_all();
    }
}

/// Route one session's process events until the channel closes, the session
/// is replaced, or the client is dropped
async fn pump(inner: Weak<ClientInner>, session: u64, mut events: mpsc::Receiver<DaemonEvent>) {
    while let Some(event) = events.recv().await {
        let Some(client) = inner.upgrade() else {
            break;
        };
        let current = client.state().session;
        if current != session {
            trace!("Session {} superseded by {}", session, current);
            break;
        }
        client.on_event(session, event);
    }
    debug!("Event pump for session {} finished", session);
}
