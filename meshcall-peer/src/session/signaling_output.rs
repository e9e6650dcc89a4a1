use crate::error::SessionError;
use async_trait::async_trait;
use meshcall_core::ClientMessage;

/// Client side of the relay connection, as seen by the session and its links.
#[async_trait]
pub trait SignalingOutput: Send + Sync {
    async fn send(&self, msg: ClientMessage) -> Result<(), SessionError>;

    /// Close the relay connection. Further sends fail.
    async fn disconnect(&self);
}
