use crate::model::participant::ParticipantId;
use serde::de::{Deserializer, IgnoredAny};
use serde::{Deserialize, Serialize};

pub const DEFAULT_SENDER_LABEL: &str = "Guest";

/// A recognized caption as displayed by every participant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptionEvent {
    pub text: String,
    pub score: Option<f32>,
    pub sender: String,
    /// Milliseconds since the unix epoch.
    pub timestamp: u64,
    pub origin: ParticipantId,
}

/// Caption as submitted by a client to the relay. Every field is optional and untrusted;
/// [`CaptionPayload::into_event`] fills the gaps.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CaptionPayload {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default, deserialize_with = "lenient_score")]
    pub score: Option<f32>,
    #[serde(default)]
    pub sender: Option<String>,
    #[serde(default)]
    pub time: Option<u64>,
}

impl CaptionPayload {
    /// Sanitize into an event. The origin always comes from the relay, never from the payload.
    pub fn into_event(self, origin: ParticipantId, now_ms: u64) -> CaptionEvent {
        CaptionEvent {
            text: self.text.unwrap_or_default(),
            score: self.score.filter(|s| s.is_finite()),
            sender: self
                .sender
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_SENDER_LABEL.to_owned()),
            timestamp: self.time.filter(|t| *t > 0).unwrap_or(now_ms),
            origin,
        }
    }
}

impl From<&CaptionEvent> for CaptionPayload {
    fn from(event: &CaptionEvent) -> Self {
        Self {
            text: Some(event.text.clone()),
            score: event.score,
            sender: Some(event.sender.clone()),
            time: Some(event.timestamp),
        }
    }
}

/// Non-numeric scores become `None` instead of failing the whole message.
fn lenient_score<'de, D>(deserializer: D) -> Result<Option<f32>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Score {
        Number(f32),
        Other(IgnoredAny),
    }

    Ok(match Option::<Score>::deserialize(deserializer)? {
        Some(Score::Number(n)) => Some(n),
        Some(Score::Other(_)) | None => None,
    })
}
