//! Terminal WebSocket endpoint.
//!
//! GET /ws/orders?counter_id=<id>
//!
//! Protocol:
//! - Server → terminal: `initial_data` once, then `new_order`, `order_update`
//!   and `order_status_update` as orders change
//! - Terminal → server: `update_order_status`
//!
//! Bad frames get an `{"error": "..."}` reply; the connection stays open.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use common::{ConnectionId, CounterId};
use domain::OrderStatus;
use fanout::{ErrorReply, InboundMessage, Interest, OutboundMessage};
use futures_util::{Sink, SinkExt, StreamExt};
use order_store::OrderStore;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::state::AppState;

const PING_INTERVAL: Duration = Duration::from_secs(30);

#[derive(Deserialize)]
pub struct WsQuery {
    pub counter_id: Option<CounterId>,
}

/// GET /ws/orders — upgrade to a terminal session.
pub async fn orders<S: OrderStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Query(query): Query<WsQuery>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    let interest = Interest::from_counter(query.counter_id);
    ws.on_upgrade(move |socket| session(socket, state, interest))
}

async fn session<S: OrderStore + Clone + 'static>(
    socket: WebSocket,
    state: Arc<AppState<S>>,
    interest: Interest,
) {
    let connection_id = ConnectionId::new();
    let (mut sink, mut stream) = socket.split();
    let (outbox, mut inbox) = mpsc::channel(state.subscriber_buffer);

    let orders = match state
        .subscriptions
        .join(connection_id, interest, outbox, state.orders.store())
        .await
    {
        Ok(orders) => orders,
        Err(e) => {
            tracing::error!(%connection_id, error = %e, "failed to load initial orders");
            return;
        }
    };

    tracing::info!(%connection_id, %interest, "terminal connected");

    let write_timeout = state.delivery_timeout;
    if send_json(&mut sink, &OutboundMessage::InitialData { orders }, write_timeout)
        .await
        .is_ok()
    {
        let mut ping_interval = tokio::time::interval(PING_INTERVAL);
        ping_interval.tick().await; // skip immediate

        loop {
            tokio::select! {
                _ = ping_interval.tick() => {
                    let ping = sink.send(Message::Ping(Vec::new().into()));
                    if !matches!(tokio::time::timeout(write_timeout, ping).await, Ok(Ok(()))) {
                        break;
                    }
                }

                outbound = inbox.recv() => {
                    // None once the registry evicted this terminal.
                    let Some(message) = outbound else { break };
                    if send_json(&mut sink, message.as_ref(), write_timeout).await.is_err() {
                        break;
                    }
                }

                frame = stream.next() => {
                    match frame {
                        Some(Ok(Message::Text(text))) => {
                            if let Some(reply) = handle_frame(&state, interest, text.as_str()).await
                                && send_json(&mut sink, &reply, write_timeout).await.is_err()
                            {
                                break;
                            }
                        }
                        Some(Ok(Message::Close(_))) | None => break,
                        Some(Err(e)) => {
                            tracing::debug!(%connection_id, error = %e, "socket error");
                            break;
                        }
                        _ => {}
                    }
                }
            }
        }
    }

    state.subscriptions.leave(connection_id).await;
    tracing::info!(%connection_id, "terminal disconnected");
}

/// Handles one text frame and returns the reply to send, if any.
pub(crate) async fn handle_frame<S: OrderStore + Clone + 'static>(
    state: &AppState<S>,
    interest: Interest,
    text: &str,
) -> Option<ErrorReply> {
    let message = match InboundMessage::decode(text) {
        Ok(message) => message,
        Err(e) => {
            tracing::debug!(error = %e, "rejected terminal message");
            return e.reply();
        }
    };

    match message {
        InboundMessage::UpdateOrderStatus { order_id, status } => {
            let status: OrderStatus = match status.parse() {
                Ok(status) => status,
                Err(e) => return Some(ErrorReply::new(e.to_string())),
            };
            match state.orders.update_status(order_id, status).await {
                Ok(result) => {
                    state.publisher.publish_from(result.change, Some(interest));
                    None
                }
                Err(e) if e.is_not_found() => {
                    Some(ErrorReply::new(format!("Order not found: {order_id}")))
                }
                Err(e) => {
                    tracing::error!(%order_id, error = %e, "status update failed");
                    Some(ErrorReply::new(e.to_string()))
                }
            }
        }
    }
}

/// Writes one JSON frame. A socket that does not take the frame within
/// `timeout` counts as gone.
async fn send_json<T, K>(sink: &mut K, msg: &T, timeout: Duration) -> Result<(), ()>
where
    T: Serialize,
    K: Sink<Message, Error = axum::Error> + Unpin,
{
    let json = serde_json::to_string(msg).map_err(|_| ())?;
    match tokio::time::timeout(timeout, sink.send(Message::Text(json.into()))).await {
        Ok(Ok(())) => Ok(()),
        _ => Err(()),
    }
}
