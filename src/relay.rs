//! ==============================================================================
//! relay.rs - the connection set and its broadcast
//! ==============================================================================
//!
//! purpose:
//!     holds one outbound queue per open push connection and fans a reading
//!     out to all of them.
//!
//! relationships:
//!     - used by: server.rs (ingest handler broadcasts, websocket handler
//!       connects/disconnects)
//!
//! delivery model:
//!     each client owns an unbounded queue drained by its websocket task.
//!     broadcasting only enqueues, so a slow client never stalls the producer
//!     or the other clients. a queue whose receiver is gone is skipped and
//!     dropped from the set; the remaining clients still get the frame.
//!
//! ==============================================================================

use crate::domain::Notice;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc;

pub type ClientId = u64;

/// Clone-able handle to the process-wide connection set.
#[derive(Clone, Default)]
pub struct Relay {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    clients: Mutex<HashMap<ClientId, mpsc::UnboundedSender<String>>>,
    next_id: AtomicU64,
    broadcasts: AtomicU64,
}

/// A connected client's end of the relay.
pub struct Subscription {
    pub id: ClientId,
    pub frames: mpsc::UnboundedReceiver<String>,
}

impl Relay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new client.
    ///
    /// The connection-established notice is queued before the client joins
    /// the set, so it is always the first frame the client sees.
    pub fn connect(&self) -> Subscription {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::unbounded_channel();

        match serde_json::to_string(&Notice::connection_established()) {
            Ok(notice) => {
                let _ = tx.send(notice);
            }
            Err(e) => tracing::warn!(client = id, error = %e, "failed to encode connection notice"),
        }

        let connected = {
            let mut clients = self.clients();
            clients.insert(id, tx);
            clients.len()
        };
        tracing::info!(client = id, connected, "client connected");

        Subscription { id, frames: rx }
    }

    pub fn disconnect(&self, id: ClientId) {
        let removed = self.clients().remove(&id).is_some();
        if removed {
            tracing::info!(client = id, connected = self.connected(), "client disconnected");
        }
    }

    /// Queue `payload` for every open client; returns how many got it.
    pub fn broadcast(&self, payload: &str) -> usize {
        self.inner.broadcasts.fetch_add(1, Ordering::Relaxed);

        let mut clients = self.clients();
        let mut delivered = 0;
        let mut gone = Vec::new();

        for (id, tx) in clients.iter() {
            if tx.is_closed() {
                gone.push(*id);
                continue;
            }
            match tx.send(payload.to_owned()) {
                Ok(()) => delivered += 1,
                Err(_) => {
                    tracing::debug!(client = id, "send failed, dropping client");
                    gone.push(*id);
                }
            }
        }

        for id in gone {
            clients.remove(&id);
        }

        tracing::debug!(delivered, bytes = payload.len(), "broadcast");
        delivered
    }

    /// Serialize a received reading once and broadcast it unchanged.
    pub fn broadcast_value(&self, reading: &serde_json::Value) -> serde_json::Result<usize> {
        let payload = serde_json::to_string(reading)?;
        Ok(self.broadcast(&payload))
    }

    pub fn connected(&self) -> usize {
        self.clients().len()
    }

    /// number of broadcasts since start, regardless of recipients
    pub fn broadcasts(&self) -> u64 {
        self.inner.broadcasts.load(Ordering::Relaxed)
    }

    fn clients(&self) -> MutexGuard<'_, HashMap<ClientId, mpsc::UnboundedSender<String>>> {
        self.inner.clients.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::CONNECTION_ESTABLISHED;

    fn drain(sub: &mut Subscription) -> Vec<String> {
        let mut out = Vec::new();
        while let Ok(frame) = sub.frames.try_recv() {
            out.push(frame);
        }
        out
    }

    #[test]
    fn connect_queues_notice_first() {
        let relay = Relay::new();
        let mut sub = relay.connect();
        relay.broadcast(r#"{"ultrasonic":{"distance":1.0}}"#);

        let frames = drain(&mut sub);
        assert_eq!(frames.len(), 2);
        let notice: serde_json::Value = serde_json::from_str(&frames[0]).unwrap();
        assert_eq!(notice["message"], CONNECTION_ESTABLISHED);
        assert_eq!(frames[1], r#"{"ultrasonic":{"distance":1.0}}"#);
    }

    #[test]
    fn broadcast_reaches_every_open_client_once() {
        let relay = Relay::new();
        let mut subs: Vec<_> = (0..4).map(|_| relay.connect()).collect();
        for sub in subs.iter_mut() {
            drain(sub);
        }

        let payload = r#"{"metallicPresence":0.75}"#;
        assert_eq!(relay.broadcast(payload), 4);

        for sub in subs.iter_mut() {
            assert_eq!(drain(sub), vec![payload.to_string()]);
        }
    }

    #[test]
    fn closed_client_is_skipped_and_pruned() {
        let relay = Relay::new();
        let mut alive = relay.connect();
        let dead = relay.connect();
        let mut late = relay.connect();
        drop(dead);
        drain(&mut alive);
        drain(&mut late);

        assert_eq!(relay.broadcast("{}"), 2);
        assert_eq!(relay.connected(), 2);
        assert_eq!(drain(&mut alive), vec!["{}".to_string()]);
        assert_eq!(drain(&mut late), vec!["{}".to_string()]);
    }

    #[test]
    fn broadcast_without_clients_still_counts() {
        let relay = Relay::new();
        assert_eq!(relay.broadcast("{}"), 0);
        assert_eq!(relay.broadcasts(), 1);
    }

    #[test]
    fn disconnect_removes_client() {
        let relay = Relay::new();
        let sub = relay.connect();
        assert_eq!(relay.connected(), 1);
        relay.disconnect(sub.id);
        relay.disconnect(sub.id);
        assert_eq!(relay.connected(), 0);
    }

    #[test]
    fn value_is_forwarded_with_key_order() {
        let relay = Relay::new();
        let mut sub = relay.connect();
        drain(&mut sub);

        let body = r#"{"ultrasonic":{"distance":2.5},"accelerometer":{"az":3,"ax":1,"ay":2}}"#;
        let value: serde_json::Value = serde_json::from_str(body).unwrap();
        assert_eq!(relay.broadcast_value(&value).unwrap(), 1);
        assert_eq!(drain(&mut sub), vec![body.to_string()]);
    }
}
