//! `GET /v1/realtime` (§6): upgrades to a WebSocket and relays each text
//! frame through the engine as an independent chat-mode request, forwarding
//! the resolved channel's reply back over the same socket.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Extension, State};
use axum::response::Response;
use bytes::Bytes;
use futures::StreamExt;

use relay_adaptor::RelayMode;
use relay_engine::RelayRequest;

use crate::auth::AuthenticatedToken;
use crate::state::AppState;

pub async fn realtime_upgrade(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedToken>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state, auth))
}

async fn handle_socket(mut socket: WebSocket, state: AppState, auth: AuthenticatedToken) {
    while let Some(Ok(message)) = socket.next().await {
        let Message::Text(text) = message else {
            continue;
        };

        let model = serde_json::from_str::<serde_json::Value>(&text)
            .ok()
            .and_then(|v| v.get("model").and_then(|m| m.as_str()).map(str::to_string))
            .unwrap_or_else(|| "realtime-default".to_string());

        let request = RelayRequest::new(
            auth.group.clone(),
            model,
            auth.token_id,
            auth.user_id,
            RelayMode::Realtime,
            500,
            Bytes::from(text.into_bytes()),
        );

        match state.engine.relay(request).await {
            Ok(mut upstream) => {
                while let Some(chunk) = upstream.body.next().await {
                    let Ok(bytes) = chunk else { break };
                    if socket
                        .send(Message::Text(String::from_utf8_lossy(&bytes).into_owned()))
                        .await
                        .is_err()
                    {
                        return;
                    }
                }
            }
            Err(err) => {
                if socket.send(Message::Text(err.to_string())).await.is_err() {
                    return;
                }
            }
        }
    }
}
