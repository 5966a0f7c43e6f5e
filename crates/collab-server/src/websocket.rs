use std::sync::Arc;

use collab_rooms::SubscriptionPath;
use collab_types::Operation;
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::protocol::Message;

use crate::app::AppState;
use crate::hub::{Destination, Hub};
use crate::message::{InboundMessage, OutboundMessage};

/// Accepts connections on `config.bind_address` forever, spawning one task
/// per connection (the teacher's `CollaborationWebSocketServer::start`
/// pattern, minus the TLS 1.3 wrapping this deployment doesn't need).
pub async fn serve(state: AppState, hub: Arc<Hub>, bind_address: &str) -> anyhow::Result<()> {
    let listener = TcpListener::bind(bind_address).await?;
    log::info!("collab-server listening on {bind_address}");

    loop {
        let (stream, peer) = listener.accept().await?;
        let state = state.clone();
        let hub = hub.clone();
        tokio::spawn(async move {
            if let Err(err) = handle_connection(stream, state, hub).await {
                log::warn!("connection from {peer} ended with error: {err}");
            }
        });
    }
}

async fn handle_connection(stream: TcpStream, state: AppState, hub: Arc<Hub>) -> anyhow::Result<()> {
    let ws_stream = tokio_tungstenite::accept_async(stream).await?;
    let (mut write, mut read) = ws_stream.split();
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Message>();

    let connection_id = uuid::Uuid::new_v4().to_string();
    let mut subscribed_to: Vec<Destination> = Vec::new();
    let mut connected_user: Option<String> = None;

    let writer = tokio::spawn(async move {
        while let Some(message) = outbound_rx.recv().await {
            if write.send(message).await.is_err() {
                break;
            }
        }
    });

    while let Some(frame) = read.next().await {
        let frame = match frame {
            Ok(frame) => frame,
            Err(err) => {
                log::warn!("websocket read error: {err}");
                break;
            }
        };
        match frame {
            Message::Text(text) => {
                handle_text(
                    &text,
                    &connection_id,
                    &state,
                    &hub,
                    &outbound_tx,
                    &mut subscribed_to,
                    &mut connected_user,
                );
            }
            Message::Close(_) => break,
            _ => {}
        }
    }

    for destination in &subscribed_to {
        hub.unsubscribe(destination, &connection_id);
    }
    if let Some(user_id) = connected_user {
        for event in state.rooms.disconnect(&user_id) {
            let document_id = event_document_id(&event);
            hub.broadcast_presence(&document_id, &event.into());
        }
    }

    drop(outbound_tx);
    let _ = writer.await;
    Ok(())
}

fn event_document_id(event: &collab_rooms::PresenceEvent) -> String {
    match event {
        collab_rooms::PresenceEvent::UserJoined { document_id, .. }
        | collab_rooms::PresenceEvent::UserLeft { document_id, .. } => document_id.clone(),
    }
}

fn handle_text(
    text: &str,
    connection_id: &str,
    state: &AppState,
    hub: &Arc<Hub>,
    outbound_tx: &mpsc::UnboundedSender<Message>,
    subscribed_to: &mut Vec<Destination>,
    connected_user: &mut Option<String>,
) {
    let message: InboundMessage = match serde_json::from_str(text) {
        Ok(message) => message,
        Err(err) => {
            log::debug!("dropping malformed message: {err}");
            hub.send_direct(
                outbound_tx,
                &OutboundMessage::Error {
                    message: format!("malformed message: {err}"),
                    code: "INVALID_OPERATION".to_string(),
                },
            );
            return;
        }
    };

    match message {
        InboundMessage::Subscribe { path, user_id, user_name } => {
            let authorized = handle_subscribe(
                &path,
                &user_id,
                user_name.as_deref(),
                state,
                hub,
                connection_id,
                outbound_tx,
                subscribed_to,
            );
            if authorized {
                *connected_user = Some(user_id);
            }
        }
        InboundMessage::Edit { document_id, user_id, operation, .. } => {
            let accepted = handle_edit(&document_id, &user_id, operation, state, hub, outbound_tx);
            if accepted {
                *connected_user = Some(user_id);
            }
        }
        InboundMessage::Cursor { document_id, user_id, user_name, position } => {
            let accepted = handle_cursor(&document_id, &user_id, user_name.as_deref(), position, state, hub, outbound_tx);
            if accepted {
                *connected_user = Some(user_id);
            }
        }
    }
}

/// Returns whether the subscription was authorized — callers only record the
/// connection as belonging to `user_id` once authorization has actually
/// succeeded, not merely attempted.
fn handle_subscribe(
    path: &str,
    user_id: &str,
    user_name: Option<&str>,
    state: &AppState,
    hub: &Arc<Hub>,
    connection_id: &str,
    outbound_tx: &mpsc::UnboundedSender<Message>,
    subscribed_to: &mut Vec<Destination>,
) -> bool {
    let Some(parsed) = SubscriptionPath::parse(path) else {
        hub.send_direct(
            outbound_tx,
            &OutboundMessage::Error {
                message: format!("unrecognized subscription path {path}"),
                code: "INVALID_OPERATION".to_string(),
            },
        );
        return false;
    };
    let display_name = user_name.unwrap_or(user_id);

    match state.rooms.authorize_subscription(&parsed, user_id, display_name) {
        Ok(()) => {
            let destination = Destination::from_subscription(&parsed);
            hub.subscribe(destination.clone(), connection_id, outbound_tx.clone());
            subscribed_to.push(destination);

            if matches!(&parsed, SubscriptionPath::Users(_)) {
                hub.send_direct(
                    outbound_tx,
                    &OutboundMessage::UsersList {
                        document_id: parsed.document_id().to_string(),
                        users: state.rooms.list(parsed.document_id()),
                    },
                );
            }
            true
        }
        Err(err) => {
            if !err.is_routine() {
                log::error!("subscription authorization error: {err}");
            }
            hub.send_direct(outbound_tx, &OutboundMessage::error(&err));
            false
        }
    }
}

/// Returns whether the edit was accepted (applied or a harmless no-op), as
/// opposed to rejected outright — an operation that never reaches ingest
/// shouldn't mark the connection as belonging to `user_id`.
fn handle_edit(
    document_id: &str,
    user_id: &str,
    operation: crate::message::InboundOperation,
    state: &AppState,
    hub: &Arc<Hub>,
    outbound_tx: &mpsc::UnboundedSender<Message>,
) -> bool {
    let base_version = operation.base_version.unwrap_or(0);
    let kind = match operation.into_kind() {
        Ok(kind) => kind,
        Err(reason) => {
            hub.send_direct(
                outbound_tx,
                &OutboundMessage::Error {
                    message: reason,
                    code: "INVALID_OPERATION".to_string(),
                },
            );
            return false;
        }
    };
    let op = Operation::new(kind, user_id, document_id, base_version);

    match state.sessions.ingest(op) {
        Ok(Some(broadcast)) => {
            hub.broadcast_operation(
                document_id,
                &OutboundMessage::Operation {
                    operation: broadcast.operation,
                    document_id: broadcast.document_id,
                    user_id: broadcast.user_id,
                    timestamp: broadcast.timestamp,
                },
            );
            true
        }
        Ok(None) => true,
        Err(err) => {
            if !err.is_routine() {
                log::error!("edit ingest failed for {document_id}: {err}");
            }
            hub.send_direct(outbound_tx, &OutboundMessage::error(&err));
            false
        }
    }
}

/// Returns whether the cursor relay succeeded — a relay rejected by the room
/// manager (e.g. the user was never subscribed) shouldn't mark the
/// connection as belonging to `user_id`.
fn handle_cursor(
    document_id: &str,
    user_id: &str,
    user_name: Option<&str>,
    position: Option<usize>,
    state: &AppState,
    hub: &Arc<Hub>,
    outbound_tx: &mpsc::UnboundedSender<Message>,
) -> bool {
    let display_name = user_name.unwrap_or(user_id);
    match state.rooms.relay_cursor(document_id, user_id, display_name, position) {
        Ok(cursor) => {
            hub.broadcast_cursor(document_id, &OutboundMessage::CursorUpdate(cursor));
            true
        }
        Err(err) => {
            if !err.is_routine() {
                log::error!("cursor relay failed for {document_id}: {err}");
            }
            hub.send_direct(outbound_tx, &OutboundMessage::error(&err));
            false
        }
    }
}
