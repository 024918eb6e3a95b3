//! HTTP front: the listener WebSocket and the finished-track files.
//!
//! | Path | Description |
//! |------|-------------|
//! | `/ws` | WebSocket push channel, see [`crate::protocol`] |
//! | `/tracks/<file>` | Finished WAV assets from the output directory |
//!
//! Every connection gets its own task. The only shared state is the
//! dispatcher's buffer handle, and the only buffer operation is a
//! non-blocking pop.

use std::future::Future;
use std::path::Path;

use axum::Router;
use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use axum::routing::get;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;

use crate::Result;
use crate::protocol::{ClientEvent, Dispatcher, ServerEvent};

#[derive(Clone)]
struct AppState {
    dispatcher: Dispatcher,
}

/// Build the router serving `/ws` and `/tracks/` from `tracks_dir`.
pub fn router(dispatcher: Dispatcher, tracks_dir: impl AsRef<Path>) -> Router {
    Router::new()
        .route("/ws", get(handle_websocket))
        .nest_service("/tracks", ServeDir::new(tracks_dir.as_ref()))
        .layer(CorsLayer::permissive())
        .with_state(AppState { dispatcher })
}

/// Serve until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, app: Router, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    if let Ok(addr) = listener.local_addr() {
        tracing::info!(%addr, "radio server listening");
    }
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}

async fn handle_websocket(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| client_session(socket, state.dispatcher))
}

/// One listener: answer the connect, then every `request_next`, until the
/// socket closes.
async fn client_session(mut socket: WebSocket, dispatcher: Dispatcher) {
    tracing::info!("client connected");
    if send_event(&mut socket, dispatcher.on_connect()).await.is_err() {
        tracing::info!("client left before the first event");
        return;
    }

    while let Some(message) = socket.recv().await {
        let message = match message {
            Ok(m) => m,
            Err(e) => {
                tracing::debug!("websocket receive error: {e}");
                break;
            }
        };
        match message {
            Message::Text(text) => match ClientEvent::parse(text.as_str()) {
                Some(event) => {
                    tracing::info!(?event, "client request");
                    if send_event(&mut socket, dispatcher.handle(event)).await.is_err() {
                        break;
                    }
                }
                None => tracing::warn!(frame = %text.as_str(), "ignoring unknown client event"),
            },
            Message::Close(_) => break,
            // Pings are answered by axum; binary frames mean nothing here.
            _ => {}
        }
    }
    tracing::info!("client disconnected");
}

async fn send_event(socket: &mut WebSocket, event: ServerEvent) -> std::result::Result<(), axum::Error> {
    let text = match serde_json::to_string(&event) {
        Ok(text) => text,
        Err(e) => {
            tracing::error!("could not encode {event:?}: {e}");
            return Ok(());
        }
    };
    socket.send(Message::Text(text.into())).await
}
