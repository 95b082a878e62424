//! WebSocket connection handlers
//!
//! - `/ws`: map clients. Snapshot first, then one frame per hub update.
//! - `/relay`: the traffic simulation pushing position ticks.

use axum::extract::ws::{Message, WebSocket};
use futures::stream::SplitSink;
use futures::{future, SinkExt, StreamExt};
use resq_broadcaster::{HubError, HubMessage, SendFailure};
use std::time::Duration;

use crate::state::AppState;

/// Serve one map client until it disconnects or falls behind
pub async fn handle_connection(socket: WebSocket, state: AppState) {
    let mut subscription = state.hub.subscribe().await;
    let id = subscription.id();
    let (mut ws_tx, mut ws_rx) = socket.split();

    loop {
        tokio::select! {
            biased;

            // Client -> hub first, so a close is seen even while updates keep
            // arriving. Nothing is expected beyond close and keepalives.
            incoming = ws_rx.next() => {
                match incoming {
                    Some(Ok(Message::Close(_))) | None => {
                        tracing::debug!("Subscriber {}: client closed", id);
                        break;
                    }
                    Some(Err(e)) => {
                        tracing::warn!("Subscriber {}: websocket error: {}", id, e);
                        break;
                    }
                    Some(Ok(_)) => {}
                }
            }

            // Hub -> client
            message = subscription.recv() => {
                let Some(message) = message else {
                    tracing::debug!("Subscriber {} closed by hub", id);
                    break;
                };
                if let Err(reason) = forward_to_client(&mut ws_tx, &message, state.send_timeout).await {
                    state.hub.report_failure(&HubError::SubscriberSendFailure { id, reason });
                    break;
                }
            }
        }
    }

    state.hub.unsubscribe(id);
    // A stalled peer would block the close handshake forever
    let _ = tokio::time::timeout(state.send_timeout, ws_tx.close()).await;
}

/// Send one hub message as a text frame, bounded by `send_timeout`
async fn forward_to_client(
    ws_tx: &mut SplitSink<WebSocket, Message>,
    message: &HubMessage,
    send_timeout: Duration,
) -> Result<(), SendFailure> {
    let json = match message.to_json() {
        Ok(json) => json,
        Err(e) => {
            tracing::error!("Failed to serialize {} message: {}", message.kind(), e);
            return Ok(());
        }
    };

    match tokio::time::timeout(send_timeout, ws_tx.send(Message::Text(json))).await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(_)) => Err(SendFailure::Closed),
        Err(_) => Err(SendFailure::Timeout),
    }
}

/// Relay events from one simulator connection until it closes
pub async fn handle_relay(socket: WebSocket, state: AppState) {
    tracing::info!("Upstream feed connected");

    let feed = socket
        .take_while(|msg| future::ready(!matches!(msg, Ok(Message::Close(_)))))
        .filter_map(|msg| {
            future::ready(match msg {
                Ok(Message::Text(text)) => Some(Ok(text)),
                Ok(Message::Binary(bytes)) => Some(Ok(String::from_utf8_lossy(&bytes).into_owned())),
                Ok(_) => None,
                Err(e) => Some(Err(e)),
            })
        });

    state.relay.run(feed).await;
}
