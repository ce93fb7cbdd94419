//! Broadcast hub: fan-out of server events to connections.
//!
//! Each connection registers an outlet (the sending half of its unbounded
//! outbound channel) and subscribes to the room of the run it joined.
//! Delivery is fire-and-forget; a closed outlet is skipped.

use crate::session::{ConnectionId, RunId};
use parking_lot::Mutex;
use protocol::ServerMessage;
use std::collections::{BTreeSet, HashMap};
use tokio::sync::mpsc;

/// Sending half of a connection's outbound channel.
pub type Outlet = mpsc::UnboundedSender<ServerMessage>;

#[derive(Default)]
struct HubState {
    outlets: HashMap<ConnectionId, Outlet>,
    rooms: HashMap<RunId, BTreeSet<ConnectionId>>,
}

/// Routes server events to registered connections.
#[derive(Default)]
pub struct BroadcastHub {
    state: Mutex<HubState>,
}

impl BroadcastHub {
    /// Create an empty hub.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the outlet of a new connection.
    pub fn register(&self, connection: ConnectionId, outlet: Outlet) {
        self.state.lock().outlets.insert(connection, outlet);
    }

    /// Drop a connection's outlet and every room subscription it holds.
    pub fn unregister(&self, connection: &str) {
        let mut state = self.state.lock();
        state.outlets.remove(connection);
        state.rooms.retain(|_, members| {
            members.remove(connection);
            !members.is_empty()
        });
    }

    /// Add a connection to a run's room.
    pub fn subscribe(&self, connection: &str, run_id: &str) {
        self.state
            .lock()
            .rooms
            .entry(run_id.into())
            .or_default()
            .insert(connection.into());
    }

    /// Remove a connection from a run's room.
    pub fn unsubscribe(&self, connection: &str, run_id: &str) {
        let mut state = self.state.lock();
        if let Some(members) = state.rooms.get_mut(run_id) {
            members.remove(connection);
            if members.is_empty() {
                state.rooms.remove(run_id);
            }
        }
    }

    /// Connections subscribed to a run, in id order.
    pub fn members(&self, run_id: &str) -> Vec<ConnectionId> {
        self.state
            .lock()
            .rooms
            .get(run_id)
            .map(|members| members.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Number of registered connections.
    pub fn connections(&self) -> usize {
        self.state.lock().outlets.len()
    }

    /// Deliver `message` to every member of the run except `exclude`.
    ///
    /// Returns how many outlets accepted the message.
    pub fn emit_to_session(
        &self,
        run_id: &str,
        message: &ServerMessage,
        exclude: Option<&str>,
    ) -> usize {
        let state = self.state.lock();
        let Some(members) = state.rooms.get(run_id) else {
            return 0;
        };

        let mut delivered = 0;
        for member in members {
            if exclude == Some(member.as_str()) {
                continue;
            }
            let Some(outlet) = state.outlets.get(member) else {
                continue;
            };
            if outlet.send(message.clone()).is_ok() {
                delivered += 1;
            } else {
                tracing::debug!(connection = %member, event = message.kind(), "outlet closed");
            }
        }
        tracing::trace!(run = run_id, event = message.kind(), delivered, "broadcast");
        delivered
    }

    /// Deliver `message` to a single connection.
    pub fn emit_to_connection(&self, connection: &str, message: ServerMessage) -> bool {
        let state = self.state.lock();
        let Some(outlet) = state.outlets.get(connection) else {
            return false;
        };
        let kind = message.kind();
        if outlet.send(message).is_err() {
            tracing::debug!(connection, event = kind, "outlet closed");
            return false;
        }
        true
    }
}
