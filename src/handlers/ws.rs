use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
    routing::get,
    Router,
};
use futures::{SinkExt, StreamExt};
use tokio::sync::broadcast::{error::RecvError, Receiver};
use tracing::{debug, warn};

use crate::events::UpdateMessage;
use crate::AppState;

/// Live shipment updates. Every poll tick with pending shipments is pushed as
/// one JSON array; client messages are ignored.
pub async fn shipment_updates(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| {
        let updates = state.broadcaster.subscribe();
        forward_updates(socket, updates)
    })
}

async fn forward_updates(socket: WebSocket, mut updates: Receiver<UpdateMessage>) {
    let (mut sender, mut receiver) = socket.split();
    debug!("shipment update subscriber connected");

    loop {
        tokio::select! {
            update = updates.recv() => match update {
                Ok(message) => {
                    if sender.send(Message::Text(message.to_string())).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "shipment update subscriber lagging, batches skipped");
                }
                Err(RecvError::Closed) => break,
            },
            incoming = receiver.next() => match incoming {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
        }
    }

    debug!("shipment update subscriber disconnected");
}

pub fn ws_routes() -> Router<AppState> {
    Router::new().route("/shipments", get(shipment_updates))
}
