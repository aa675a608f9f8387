//! Socket transport used by the session manager.
//!
//! A [`Connector`] opens a [`Transport`]: a pair of channels fed by pump
//! tasks. The session never touches the socket directly, so tests swap in a
//! scripted connector.

use futures::future::BoxFuture;
use futures::{FutureExt, SinkExt, StreamExt};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tracing::{debug, warn};

/// Something the remote end did
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    Message(String),
    Error(String),
    Closed,
}

/// An open connection. Dropping `outbound` closes the socket.
pub struct Transport {
    pub outbound: mpsc::UnboundedSender<String>,
    pub inbound: mpsc::UnboundedReceiver<TransportEvent>,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransportError {
    /// The transport cannot be built at all (bad URL, unsupported scheme)
    #[error("Cannot build transport for {url}: {message}")]
    Setup { url: String, message: String },

    #[error("Failed to reach {url}: {message}")]
    Unreachable { url: String, message: String },

    #[error("Timed out connecting to {url}")]
    Timeout { url: String },
}

pub trait Connector: Send + Sync + 'static {
    fn open(&self, url: &str) -> BoxFuture<'static, Result<Transport, TransportError>>;
}

/// WebSocket client connector
#[derive(Debug, Clone, Copy, Default)]
pub struct WsConnector;

impl Connector for WsConnector {
    fn open(&self, url: &str) -> BoxFuture<'static, Result<Transport, TransportError>> {
        let url = url.to_string();
        async move {
            let request = url
                .as_str()
                .into_client_request()
                .map_err(|e| TransportError::Setup {
                    url: url.clone(),
                    message: e.to_string(),
                })?;

            let (socket, _response) = connect_async(request).await.map_err(|e| match e {
                WsError::Url(_) | WsError::HttpFormat(_) => TransportError::Setup {
                    url: url.clone(),
                    message: e.to_string(),
                },
                other => TransportError::Unreachable {
                    url: url.clone(),
                    message: other.to_string(),
                },
            })?;

            debug!(url = %url, "WebSocket connected");
            Ok(spawn_pumps(socket))
        }
        .boxed()
    }
}

fn spawn_pumps<S>(socket: S) -> Transport
where
    S: futures::Stream<Item = Result<Message, WsError>>
        + futures::Sink<Message, Error = WsError>
        + Send
        + 'static,
{
    let (mut sink, mut stream) = socket.split();
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<String>();
    let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        while let Some(text) = outbound_rx.recv().await {
            if let Err(e) = sink.send(Message::Text(text)).await {
                warn!(error = %e, "Failed to write to collaboration socket");
                break;
            }
        }
        let _ = sink.close().await;
    });

    tokio::spawn(async move {
        while let Some(frame) = stream.next().await {
            let event = match frame {
                Ok(Message::Text(text)) => TransportEvent::Message(text),
                Ok(Message::Binary(bytes)) => match String::from_utf8(bytes) {
                    Ok(text) => TransportEvent::Message(text),
                    Err(_) => {
                        debug!("Ignoring non-UTF-8 binary frame");
                        continue;
                    }
                },
                Ok(Message::Close(_)) => break,
                Ok(_) => continue,
                Err(e) => {
                    let _ = inbound_tx.send(TransportEvent::Error(e.to_string()));
                    break;
                }
            };
            if inbound_tx.send(event).is_err() {
                return;
            }
        }
        let _ = inbound_tx.send(TransportEvent::Closed);
    });

    Transport {
        outbound: outbound_tx,
        inbound: inbound_rx,
    }
}
