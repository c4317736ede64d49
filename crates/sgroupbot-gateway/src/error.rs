use tokio_tungstenite::tungstenite;

/// Connection-level errors, returned to the owner of the client.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("WebSocket error: {0}")]
    Transport(#[from] tungstenite::Error),

    #[error("Connection closed by gateway: {0}")]
    Closed(String),

    #[error("Frame codec error: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Failed to resolve gateway endpoint: {0}")]
    Resolve(String),

    #[error("Gateway rejected the session")]
    InvalidSession,

    #[error("Gateway requested a reconnect")]
    ReconnectRequested,

    #[error("Heartbeat failed: {0}")]
    Heartbeat(#[source] tungstenite::Error),

    #[error("Background task failed: {0}")]
    Task(String),

    #[error("Unknown intent: {0}")]
    UnknownIntent(String),
}

pub type GatewayResult<T> = std::result::Result<T, GatewayError>;
