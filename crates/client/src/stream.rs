//! Progress notification stream.
//!
//! The backend pushes one JSON-encoded
//! [`ProgressEvent`](chatprint_core::event::ProgressEvent) per message
//! on a one-way channel scoped by client ID. [`ProgressSource`]
//! abstracts that channel so the session runner never sees transport
//! details; [`WsProgressSource`] is the production WebSocket
//! implementation.

use async_trait::async_trait;
use futures::StreamExt;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use chatprint_core::event::ProgressEvent;

/// Transport-agnostic source of progress notifications.
///
/// `None` means the channel closed; the caller hands the session to the
/// completion resolver at that point. Transport-level receive errors
/// are reported the same way -- the closure itself carries no payload
/// that could distinguish them, so disambiguation is the resolver's job.
#[async_trait]
pub trait ProgressSource: Send {
    /// The next decoded notification, or `None` once the channel is
    /// closed.
    async fn next_event(&mut self) -> Option<ProgressEvent>;
}

/// Errors establishing the notification channel.
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    /// Failed to open the WebSocket connection.
    #[error("Connection error: {0}")]
    Connection(String),
}

/// WebSocket implementation of [`ProgressSource`].
///
/// Exactly one channel exists per session; dropping this source closes
/// it, which is also how a caller abandons a session.
pub struct WsProgressSource {
    client_id: String,
    ws_stream: WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>,
}

impl WsProgressSource {
    /// Open the notification channel for one session.
    ///
    /// Appends the client ID as a query parameter so the backend routes
    /// only this session's notifications onto the connection.
    pub async fn connect(ws_url: &str, client_id: &str) -> Result<Self, StreamError> {
        let url = format!("{ws_url}/progress?clientId={client_id}");

        let (ws_stream, _response) = connect_async(&url)
            .await
            .map_err(|e| StreamError::Connection(format!("Failed to connect to {url}: {e}")))?;

        tracing::info!(client_id = %client_id, "Progress stream connected");

        Ok(Self {
            client_id: client_id.to_string(),
            ws_stream,
        })
    }
}

#[async_trait]
impl ProgressSource for WsProgressSource {
    /// Read frames until the next decodable notification.
    ///
    /// Malformed payloads are logged and skipped; a closed or failed
    /// socket yields `None`.
    async fn next_event(&mut self) -> Option<ProgressEvent> {
        while let Some(msg_result) = self.ws_stream.next().await {
            match msg_result {
                Ok(Message::Text(text)) => match serde_json::from_str::<ProgressEvent>(&text) {
                    Ok(event) => return Some(event),
                    Err(e) => {
                        tracing::warn!(
                            client_id = %self.client_id,
                            error = %e,
                            raw_message = %text,
                            "Failed to parse progress notification",
                        );
                    }
                },
                Ok(Message::Ping(_) | Message::Pong(_)) => {
                    // Handled automatically by tungstenite.
                }
                Ok(Message::Close(frame)) => {
                    tracing::info!(client_id = %self.client_id, ?frame, "Progress stream closed");
                    return None;
                }
                Ok(_) => {
                    // Binary / Frame -- the backend never sends these.
                }
                Err(e) => {
                    tracing::error!(
                        client_id = %self.client_id,
                        error = %e,
                        "Progress stream receive error",
                    );
                    return None;
                }
            }
        }
        None
    }
}
