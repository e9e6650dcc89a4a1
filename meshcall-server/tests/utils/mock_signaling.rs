use async_trait::async_trait;
use meshcall_core::{ParticipantId, ServerMessage};
use meshcall_server::SignalingOutput;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// Mock SignalingOutput that records every delivered message per recipient.
#[derive(Clone, Default)]
pub struct MockSignalingOutput {
    delivered: Arc<Mutex<Vec<(ParticipantId, ServerMessage)>>>,
}

impl MockSignalingOutput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages delivered to `participant`, oldest first.
    pub async fn messages_for(&self, participant: &ParticipantId) -> Vec<ServerMessage> {
        self.delivered
            .lock()
            .await
            .iter()
            .filter(|(to, _)| to == participant)
            .map(|(_, msg)| msg.clone())
            .collect()
    }

    /// Poll until `participant` has at least `count` messages or the timeout expires.
    pub async fn wait_for_messages(
        &self,
        participant: &ParticipantId,
        count: usize,
        timeout_ms: u64,
    ) -> Vec<ServerMessage> {
        let deadline = tokio::time::Instant::now() + Duration::from_millis(timeout_ms);

        loop {
            let messages = self.messages_for(participant).await;
            if messages.len() >= count || tokio::time::Instant::now() >= deadline {
                return messages;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    pub async fn count_left(&self, participant: &ParticipantId, who: &ParticipantId) -> usize {
        self.messages_for(participant)
            .await
            .iter()
            .filter(|m| matches!(m, ServerMessage::Left { participant } if participant == who))
            .count()
    }
}

#[async_trait]
impl SignalingOutput for MockSignalingOutput {
    async fn deliver(&self, to: &ParticipantId, msg: ServerMessage) {
        tracing::debug!("[MockSignaling] deliver to {}: {:?}", to, msg);
        self.delivered.lock().await.push((*to, msg));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_signaling_broadcast_reaches_each_recipient() {
        let signaling = MockSignalingOutput::new();
        let a = ParticipantId::new();
        let b = ParticipantId::new();

        let msg = ServerMessage::Left {
            participant: ParticipantId::new(),
        };
        signaling.broadcast(&[a, b], msg.clone()).await;

        assert_eq!(signaling.messages_for(&a).await, vec![msg.clone()]);
        assert_eq!(signaling.messages_for(&b).await, vec![msg]);
    }
}
