use app::core::hub::{Frame, LiveSink, LiveStream, TransportError};
use async_trait::async_trait;
use axum::{
    body::Bytes,
    extract::ws::{Message, WebSocket},
};
use futures_util::{
    SinkExt, StreamExt,
    stream::{SplitSink, SplitStream},
};

/// Adapts an upgraded axum socket to the hub's transport traits.
pub fn split(socket: WebSocket) -> (WsSink, WsStream) {
    let (sink, stream) = socket.split();
    (WsSink(sink), WsStream(stream))
}

pub struct WsSink(SplitSink<WebSocket, Message>);

pub struct WsStream(SplitStream<WebSocket>);

fn io(e: axum::Error) -> TransportError {
    TransportError::Io(e.to_string())
}

#[async_trait]
impl LiveSink for WsSink {
    async fn send_text(&mut self, text: String) -> Result<(), TransportError> {
        self.0.send(Message::Text(text.into())).await.map_err(io)
    }

    async fn send_ping(&mut self) -> Result<(), TransportError> {
        self.0.send(Message::Ping(Bytes::new())).await.map_err(io)
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.0.close().await.map_err(io)
    }
}

#[async_trait]
impl LiveStream for WsStream {
    async fn next_frame(&mut self) -> Option<Result<Frame, TransportError>> {
        let frame = match self.0.next().await? {
            Ok(Message::Text(text)) => Frame::Text(text.as_str().to_owned()),
            Ok(Message::Binary(bytes)) => match String::from_utf8(bytes.to_vec()) {
                Ok(text) => Frame::Text(text),
                Err(_) => return Some(Err(TransportError::Io("binary frame is not utf-8".into()))),
            },
            Ok(Message::Ping(_) | Message::Pong(_)) => Frame::Control,
            Ok(Message::Close(_)) => return None,
            Err(e) => return Some(Err(io(e))),
        };
        Some(Ok(frame))
    }
}
