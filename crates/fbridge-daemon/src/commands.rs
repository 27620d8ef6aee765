//! Request building and response correlation for daemon communication
//!
//! This module provides:
//! - Request ID allocation (per client, never reused)
//! - Pending request tracking and response matching
//! - Typed daemon commands

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use serde_json::Value;
use tokio::sync::oneshot;

use crate::protocol::DaemonResponse;
use fbridge_core::prelude::*;

/// Default bound on how long a request waits for its response
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// What a pending request eventually resolves to; `None` means no answer
pub type ResponseSlot = Option<DaemonResponse>;

/// A request written to the daemon and awaiting its response
struct PendingRequest {
    /// Channel to deliver the outcome
    response_tx: oneshot::Sender<ResponseSlot>,
    /// When this request was registered
    issued_at: Instant,
    /// Method name for logging
    method: String,
}

/// Tracks pending requests and matches responses
///
/// The id counter lives as long as the tracker, which lives as long as the
/// client, so ids are never reused across daemon restarts.
pub struct RequestTracker {
    next_id: AtomicU64,
    pending: Mutex<HashMap<u64, PendingRequest>>,
}

impl RequestTracker {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            pending: Mutex::new(HashMap::new()),
        }
    }

    /// Reserve the next request id
    pub fn reserve_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }

    /// Register a pending request under a reserved id
    pub fn register(&self, id: u64, method: &str) -> oneshot::Receiver<ResponseSlot> {
        let (tx, rx) = oneshot::channel();
        let pending = PendingRequest {
            response_tx: tx,
            issued_at: Instant::now(),
            method: method.to_string(),
        };
        self.pending().insert(id, pending);
        rx
    }

    /// Deliver a response to its pending request
    ///
    /// Returns false if no request with that id is pending (unknown id, or a
    /// late response after the request already timed out).
    pub fn resolve(&self, response: DaemonResponse) -> bool {
        let Some(pending) = self.pending().remove(&response.id) else {
            return false;
        };
        debug!(
            "Response #{} ({}) after {:?}",
            response.id,
            pending.method,
            pending.issued_at.elapsed()
        );
        let _ = pending.response_tx.send(Some(response));
        true
    }

    /// Resolve a request with "no response"
    ///
    /// Idempotent: returns false if the request was already resolved.
    pub fn expire(&self, id: u64) -> bool {
        let Some(pending) = self.pending().remove(&id) else {
            return false;
        };
        debug!(
            "Request #{} ({}) got no response within {:?}",
            id,
            pending.method,
            pending.issued_at.elapsed()
        );
        let _ = pending.response_tx.send(None);
        true
    }

    /// Resolve every pending request with "no response" (e.g., on stop)
    pub fn cancel_all(&self) -> usize {
        let drained: Vec<(u64, PendingRequest)> = self.pending().drain().collect();
        let count = drained.len();
        for (id, req) in drained {
            trace!("Cancelling request #{} ({})", id, req.method);
            let _ = req.response_tx.send(None);
        }
        count
    }

    /// Check whether a request id is still pending
    pub fn is_pending(&self, id: u64) -> bool {
        self.pending().contains_key(&id)
    }

    /// Get the number of pending requests
    pub fn pending_count(&self) -> usize {
        self.pending().len()
    }

    fn pending(&self) -> MutexGuard<'_, HashMap<u64, PendingRequest>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for RequestTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// Daemon methods the client issues
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DaemonCommand {
    /// Start device discovery; devices are then reported via `device.added`
    EnableDevices,
    /// Stop device discovery
    DisableDevices,
    /// Get daemon version
    Version,
}

impl DaemonCommand {
    /// Wire method name
    pub fn method(&self) -> &'static str {
        match self {
            DaemonCommand::EnableDevices => "device.enable",
            DaemonCommand::DisableDevices => "device.disable",
            DaemonCommand::Version => "daemon.version",
        }
    }

    /// Request params, if any
    pub fn params(&self) -> Option<Value> {
        None
    }

    /// Get a human-readable description
    pub fn description(&self) -> &'static str {
        match self {
            DaemonCommand::EnableDevices => "enable devices",
            DaemonCommand::DisableDevices => "disable devices",
            DaemonCommand::Version => "get version",
        }
    }
}
