//! WebSocket implementation of the presence channel contract.

use crate::events::{TaskType, WireEvent, WireRequest};
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use rehearse_core::error::ChannelError;
use rehearse_core::presence::{ChannelEvent, PresenceChannel, SpeakMode};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream, connect_async, tungstenite::protocol::Message,
};

type WsWriter =
    futures_util::stream::SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;

/// A client for the avatar streaming WebSocket service.
pub struct WsPresenceChannel {
    endpoint: String,
    avatar: String,
    quality: String,
    write: Option<WsWriter>,
    reader: Option<tokio::task::JoinHandle<()>>,
}

impl WsPresenceChannel {
    pub fn new(endpoint: impl Into<String>, avatar: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            avatar: avatar.into(),
            quality: "low".to_string(),
            write: None,
            reader: None,
        }
    }

    pub fn with_quality(mut self, quality: impl Into<String>) -> Self {
        self.quality = quality.into();
        self
    }
}

#[async_trait]
impl PresenceChannel for WsPresenceChannel {
    async fn open(&mut self, token: &str) -> Result<mpsc::Receiver<ChannelEvent>, ChannelError> {
        let url = format!(
            "{}?token={}&avatar={}&quality={}",
            self.endpoint, token, self.avatar, self.quality
        );
        let (ws_stream, _) = connect_async(url)
            .await
            .map_err(|e| ChannelError::Connect {
                message: e.to_string(),
            })?;
        tracing::info!("presence channel connected");

        let (write, mut read) = ws_stream.split();
        self.write = Some(write);

        let (tx, rx) = mpsc::channel(64);
        let handle = tokio::spawn(async move {
            while let Some(message) = read.next().await {
                let message = match message {
                    Ok(message) => message,
                    Err(e) => {
                        tracing::error!("failed to read from presence channel: {e}");
                        let _ = tx.send(ChannelEvent::MediaDisconnected).await;
                        break;
                    }
                };
                match message {
                    Message::Text(text) => match serde_json::from_str::<WireEvent>(&text) {
                        Ok(event) => {
                            if let Some(event) = event.into_channel_event() {
                                if tx.send(event).await.is_err() {
                                    break;
                                }
                            }
                        }
                        Err(e) => {
                            tracing::warn!("unrecognized presence event: {e}");
                        }
                    },
                    Message::Close(reason) => {
                        tracing::info!("presence channel closed: {reason:?}");
                        let _ = tx.send(ChannelEvent::MediaDisconnected).await;
                        break;
                    }
                    Message::Binary(_) => {
                        tracing::warn!("unexpected binary message on presence channel");
                    }
                    _ => {}
                }
            }
        });
        self.reader = Some(handle);
        Ok(rx)
    }

    /// Enqueues a speak task. Resolves once the request is written to the
    /// socket; rendering progress arrives as channel events.
    async fn speak(&mut self, text: &str, mode: SpeakMode) -> Result<(), ChannelError> {
        let Some(write) = self.write.as_mut() else {
            return Err(ChannelError::NotOpen);
        };
        let request = WireRequest::Speak {
            text,
            task_type: TaskType::Repeat,
            task_mode: mode.into(),
        };
        let json = serde_json::to_string(&request).map_err(|e| ChannelError::Send {
            message: e.to_string(),
        })?;
        write
            .send(Message::Text(json))
            .await
            .map_err(|e| ChannelError::Send {
                message: e.to_string(),
            })
    }

    async fn close(&mut self) -> Result<(), ChannelError> {
        if let Some(mut write) = self.write.take() {
            if let Err(e) = write.send(Message::Close(None)).await {
                tracing::debug!("presence close frame failed: {e}");
            }
        }
        if let Some(reader) = self.reader.take() {
            reader.abort();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn speak_before_open_reports_not_open() {
        let mut channel = WsPresenceChannel::new("wss://example.invalid/stream", "host_a");
        let err = channel.speak("hello", SpeakMode::Async).await.unwrap_err();
        assert!(matches!(err, ChannelError::NotOpen));
    }

    #[tokio::test]
    async fn close_without_open_is_a_no_op() {
        let mut channel = WsPresenceChannel::new("wss://example.invalid/stream", "host_a");
        channel.close().await.unwrap();
        channel.close().await.unwrap();
    }
}
