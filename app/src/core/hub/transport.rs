use async_trait::async_trait;

/// Inbound unit of a live connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Text(String),
    /// Pings, pongs and other frames that only prove the peer is alive.
    Control,
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("connection closed")]
    Closed,
    #[error("write timed out")]
    WriteTimeout,
    #[error("transport failure: {0}")]
    Io(String),
}

/// Write half of an upgraded connection.
#[async_trait]
pub trait LiveSink: Send {
    async fn send_text(&mut self, text: String) -> Result<(), TransportError>;
    async fn send_ping(&mut self) -> Result<(), TransportError>;
    async fn close(&mut self) -> Result<(), TransportError>;
}

/// Read half of an upgraded connection. `None` once the peer is gone.
#[async_trait]
pub trait LiveStream: Send {
    async fn next_frame(&mut self) -> Option<Result<Frame, TransportError>>;
}
