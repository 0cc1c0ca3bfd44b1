//! Downstream WebSocket handlers.
//!
//! Each socket becomes one sink of the relay registry. The first socket of
//! an account brings the upstream connection up with a fresh approval key.

use axum::{
    Json,
    extract::{
        Path, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::{IntoResponse, Response},
};
use futures::{SinkExt, StreamExt};
use serde::Serialize;

use crate::application::ports::BrokerPort;
use crate::domain::order_plan::PlanRepository;
use crate::domain::portfolio::AssetHistoryRepository;
use crate::domain::shared::AccountId;
use crate::domain::trading::ExecutionLog;

use super::controller::AppState;
use super::request::SubscribeRequest;
use super::response::{ApiError, SubscribeResponse};

/// Out-of-band notice to a downstream client.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
enum Notice<'a> {
    Warning { message: &'a str },
    Error { message: String },
}

impl Notice<'_> {
    fn to_message(&self) -> Option<Message> {
        serde_json::to_string(self).ok().map(|s| Message::Text(s.into()))
    }
}

/// `GET /v1/ws/orders/{account_id}`
pub async fn order_socket<B, P, L, H>(
    ws: WebSocketUpgrade,
    State(state): State<AppState<B, P, L, H>>,
    Path(account_id): Path<String>,
) -> Response
where
    B: BrokerPort + 'static,
    P: PlanRepository + 'static,
    L: ExecutionLog + 'static,
    H: AssetHistoryRepository + 'static,
{
    let account = AccountId::new(account_id);
    ws.on_upgrade(move |socket| serve_socket(socket, state, account))
}

async fn serve_socket<B, P, L, H>(mut socket: WebSocket, state: AppState<B, P, L, H>, account: AccountId)
where
    B: BrokerPort,
    P: PlanRepository,
    L: ExecutionLog,
    H: AssetHistoryRepository,
{
    if let Err(message) = ensure_upstream(&state, &account).await {
        if let Some(msg) = (Notice::Error { message }).to_message() {
            let _ = socket.send(msg).await;
        }
        let _ = socket.close().await;
        return;
    }

    let feed_key = match state.accounts.find(&account).await {
        Ok(session) => session.and_then(|s| s.feed_key().map(str::to_string)),
        Err(e) => {
            tracing::warn!(account_id = %account, error = %e, "Session lookup failed");
            None
        }
    };
    match feed_key {
        Some(key) => {
            if let Err(e) = state.relay.subscribe_execution_feed(&key) {
                tracing::warn!(account_id = %account, error = %e, "Execution feed subscribe failed");
            }
        }
        None => {
            let notice = Notice::Warning {
                message: "no feed key registered; execution notices unavailable",
            };
            if let Some(msg) = notice.to_message() {
                let _ = socket.send(msg).await;
            }
        }
    }

    let registry = state.relay.registry();
    let (sink_id, mut events) = registry.register();
    let (mut sender, mut receiver) = socket.split();
    tracing::info!(account_id = %account, sink = %sink_id, "Order socket attached");

    loop {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else { break };
                let Ok(text) = serde_json::to_string(&event) else { continue };
                if sender.send(Message::Text(text.into())).await.is_err() {
                    break;
                }
            }
            inbound = receiver.next() => match inbound {
                Some(Ok(Message::Text(text))) if text.as_str() == "ping" => {
                    if sender.send(Message::Text("pong".into())).await.is_err() {
                        break;
                    }
                }
                Some(Ok(Message::Close(_)) | Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
        }
    }

    registry.remove(sink_id);
    tracing::info!(account_id = %account, sink = %sink_id, "Order socket detached");
}

/// Connect the relay if it is down. Only one attempt; the client may
/// reconnect to retry.
async fn ensure_upstream<B, P, L, H>(
    state: &AppState<B, P, L, H>,
    account: &AccountId,
) -> Result<(), String>
where
    B: BrokerPort,
    P: PlanRepository,
    L: ExecutionLog,
    H: AssetHistoryRepository,
{
    if state.relay.is_connected() {
        return Ok(());
    }
    let key = state.broker.get_approval_key(account).await.map_err(|e| {
        tracing::warn!(account_id = %account, error = %e, "Approval key request failed");
        format!("approval key unavailable: {}", e.broker_message())
    })?;
    state.relay.connect(&key).await.map_err(|e| {
        tracing::warn!(account_id = %account, error = %e, "Relay connect failed");
        format!("real-time stream unavailable: {e}")
    })
}

/// `POST /v1/ws/subscribe`
pub async fn subscribe_prices<B, P, L, H>(
    State(state): State<AppState<B, P, L, H>>,
    Json(request): Json<SubscribeRequest>,
) -> Result<impl IntoResponse, ApiError>
where
    B: BrokerPort,
    P: PlanRepository,
    L: ExecutionLog,
    H: AssetHistoryRepository,
{
    if !state.relay.is_connected() {
        return Err(ApiError::Unavailable(
            "real-time stream is not connected".to_string(),
        ));
    }

    let (codes, skipped) = request.partition();
    let mut subscribed = Vec::with_capacity(codes.len());
    for code in codes {
        match state.relay.subscribe_price_feed(&code) {
            Ok(()) => subscribed.push(code),
            Err(e) => {
                tracing::warn!(code = %code, error = %e, "Price subscribe failed");
                return Err(ApiError::Unavailable(e.to_string()));
            }
        }
    }
    tracing::info!(count = subscribed.len(), "Price feeds subscribed");
    Ok(Json(SubscribeResponse {
        subscribed,
        skipped,
    }))
}
