//! `/ws` listing feed. Every subscriber gets the current listing on connect
//! and a fresh copy after each publish.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use futures_util::{SinkExt, StreamExt};
use tracing::{debug, warn};

use crate::api::routes::ApiState;

pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<ApiState>) -> Response {
    ws.on_upgrade(move |socket| stream_listings(socket, state))
}

async fn stream_listings(socket: WebSocket, state: ApiState) {
    let (mut sink, mut incoming) = socket.split();
    let mut rx = state.publisher.subscribe();
    state.health.inc_feed_clients();
    debug!(clients = state.health.feed_clients(), "Feed client connected");

    'feed: loop {
        let payload = {
            let listing = rx.borrow_and_update().clone();
            serde_json::to_string(&*listing)
        };
        match payload {
            Ok(text) => {
                if sink.send(Message::Text(text)).await.is_err() {
                    break;
                }
            }
            Err(e) => warn!("Listing serialization failed: {e}"),
        }

        // Wait for the next publish; client frames are only read to notice a close.
        loop {
            tokio::select! {
                changed = rx.changed() => {
                    if changed.is_err() {
                        break 'feed;
                    }
                    continue 'feed;
                }
                msg = incoming.next() => match msg {
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break 'feed,
                    Some(Ok(_)) => {}
                },
            }
        }
    }

    state.health.dec_feed_clients();
    debug!(clients = state.health.feed_clients(), "Feed client disconnected");
}
