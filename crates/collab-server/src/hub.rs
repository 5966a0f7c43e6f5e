use dashmap::DashMap;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::protocol::Message;

/// One of the four fan-out destinations a connection can subscribe to
/// (spec §6). `Root` is the legacy alias for `Operations` — both receive
/// the same operation broadcasts, kept distinct because the spec names
/// them as separate subscription patterns.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Destination {
    pub document_id: String,
    pub kind: DestinationKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DestinationKind {
    Root,
    Operations,
    Cursors,
    Users,
}

impl Destination {
    pub fn from_subscription(path: &collab_rooms::SubscriptionPath) -> Self {
        use collab_rooms::SubscriptionPath as S;
        let (document_id, kind) = match path {
            S::Root(d) => (d.clone(), DestinationKind::Root),
            S::Operations(d) => (d.clone(), DestinationKind::Operations),
            S::Cursors(d) => (d.clone(), DestinationKind::Cursors),
            S::Users(d) => (d.clone(), DestinationKind::Users),
        };
        Destination { document_id, kind }
    }

    fn operations(document_id: &str) -> Self {
        Destination {
            document_id: document_id.to_string(),
            kind: DestinationKind::Operations,
        }
    }

    fn root(document_id: &str) -> Self {
        Destination {
            document_id: document_id.to_string(),
            kind: DestinationKind::Root,
        }
    }

    fn cursors(document_id: &str) -> Self {
        Destination {
            document_id: document_id.to_string(),
            kind: DestinationKind::Cursors,
        }
    }

    fn users(document_id: &str) -> Self {
        Destination {
            document_id: document_id.to_string(),
            kind: DestinationKind::Users,
        }
    }
}

/// Per-connection outbound channel, keyed by connection id, grouped by
/// destination. Mirrors the teacher's `SessionConnections.connections`
/// map, generalized from one map per document to one per (document,
/// destination) pair since this protocol has four fan-out patterns per
/// document instead of one.
#[derive(Default)]
pub struct Hub {
    subscribers: DashMap<Destination, DashMap<String, mpsc::UnboundedSender<Message>>>,
}

impl Hub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(
        &self,
        destination: Destination,
        connection_id: &str,
        sender: mpsc::UnboundedSender<Message>,
    ) {
        self.subscribers
            .entry(destination)
            .or_default()
            .insert(connection_id.to_string(), sender);
    }

    pub fn unsubscribe(&self, destination: &Destination, connection_id: &str) {
        if let Some(room) = self.subscribers.get(destination) {
            room.remove(connection_id);
        }
    }

    fn send_to(&self, destination: &Destination, text: String) {
        if let Some(room) = self.subscribers.get(destination) {
            let message = Message::Text(text);
            for entry in room.iter() {
                let _ = entry.value().send(message.clone());
            }
        }
    }

    /// Fans an operation broadcast out to both `/<docId>/operations` and
    /// the legacy `/<docId>` destination.
    pub fn broadcast_operation(&self, document_id: &str, payload: &crate::message::OutboundMessage) {
        let Ok(text) = serde_json::to_string(payload) else {
            log::error!("failed to serialize operation broadcast for {document_id}");
            return;
        };
        self.send_to(&Destination::operations(document_id), text.clone());
        self.send_to(&Destination::root(document_id), text);
    }

    pub fn broadcast_cursor(&self, document_id: &str, payload: &crate::message::OutboundMessage) {
        if let Ok(text) = serde_json::to_string(payload) {
            self.send_to(&Destination::cursors(document_id), text);
        } else {
            log::error!("failed to serialize cursor broadcast for {document_id}");
        }
    }

    pub fn broadcast_presence(&self, document_id: &str, payload: &crate::message::OutboundMessage) {
        if let Ok(text) = serde_json::to_string(payload) {
            self.send_to(&Destination::users(document_id), text);
        } else {
            log::error!("failed to serialize presence broadcast for {document_id}");
        }
    }

    /// Delivers a message to one connection only (spec §7: errors are
    /// surfaced to the submitter, never broadcast).
    pub fn send_direct(&self, sender: &mpsc::UnboundedSender<Message>, payload: &crate::message::OutboundMessage) {
        if let Ok(text) = serde_json::to_string(payload) {
            let _ = sender.send(Message::Text(text));
        }
    }
}
