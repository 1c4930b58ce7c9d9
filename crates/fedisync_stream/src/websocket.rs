//! WebSocket transport.
//!
//! The credential travels as the `Sec-WebSocket-Protocol` header, never in
//! the URL or an authorization header.

use crate::error::{StreamError, StreamResult};
use crate::transport::{ChannelMessage, ConnectRequest, StreamChannel, StreamTransport};
use async_trait::async_trait;
use futures::StreamExt;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::SEC_WEBSOCKET_PROTOCOL;
use tokio_tungstenite::tungstenite::http::{HeaderValue, StatusCode};
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::debug;

/// Opens channels with tokio-tungstenite.
#[derive(Debug, Clone, Copy, Default)]
pub struct WebSocketTransport;

impl WebSocketTransport {
    /// Creates a new WebSocket transport.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl StreamTransport for WebSocketTransport {
    async fn open(&self, request: &ConnectRequest) -> StreamResult<Box<dyn StreamChannel>> {
        let mut ws_request = request
            .url
            .as_str()
            .into_client_request()
            .map_err(|e| StreamError::InvalidUrl(e.to_string()))?;

        if let Some(protocol) = &request.protocol {
            let value = HeaderValue::from_str(protocol)
                .map_err(|_| StreamError::AuthenticationFailed("credential is not a valid header value".into()))?;
            ws_request.headers_mut().insert(SEC_WEBSOCKET_PROTOCOL, value);
        }

        let (stream, response) = connect_async(ws_request).await.map_err(map_ws_error)?;
        debug!(status = %response.status(), host = ?request.url.host_str(), "websocket upgraded");

        Ok(Box::new(WebSocketChannel { stream }))
    }
}

struct WebSocketChannel {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl StreamChannel for WebSocketChannel {
    async fn next_message(&mut self) -> Option<StreamResult<ChannelMessage>> {
        let message = match self.stream.next().await? {
            Ok(message) => message,
            Err(WsError::ConnectionClosed | WsError::AlreadyClosed) => return None,
            Err(e) => return Some(Err(map_ws_error(e))),
        };
        Some(Ok(match message {
            Message::Text(text) => ChannelMessage::Text(text),
            Message::Binary(data) => ChannelMessage::Binary(data),
            Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => ChannelMessage::Ping,
            Message::Close(_) => ChannelMessage::Close,
        }))
    }

    async fn close(&mut self) -> StreamResult<()> {
        match self.stream.close(None).await {
            Ok(()) | Err(WsError::ConnectionClosed | WsError::AlreadyClosed) => Ok(()),
            Err(e) => Err(map_ws_error(e)),
        }
    }
}

fn map_ws_error(err: WsError) -> StreamError {
    match err {
        WsError::Http(response) => {
            let status = response.status();
            if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
                StreamError::AuthenticationFailed(status.to_string())
            } else {
                StreamError::Transport {
                    message: format!("upgrade rejected: {status}"),
                    retryable: status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS,
                }
            }
        }
        WsError::Url(e) => StreamError::InvalidUrl(e.to_string()),
        WsError::ConnectionClosed | WsError::AlreadyClosed => StreamError::Closed,
        other => StreamError::transport_retryable(other.to_string()),
    }
}
