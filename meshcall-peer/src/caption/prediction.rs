use serde::{Deserialize, Serialize};
use tokio::time::{Duration, Instant};

/// 42 hand points times 3 coordinates.
pub const HAND_VALUES: usize = 126;
/// 468 face points times 3 coordinates.
pub const FACE_VALUES: usize = 1404;
pub const FRAME_LEN: usize = HAND_VALUES + FACE_VALUES;

/// Result published by the prediction service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Prediction {
    Label {
        label: String,
        #[serde(default)]
        score: Option<f32>,
    },
    Failure {
        error: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

/// Fixed-size input vector for the prediction service: hand coordinates then face coordinates,
/// each truncated or zero-padded to its slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LandmarkFrame {
    pub vector: Vec<f32>,
    pub normalized: bool,
}

impl LandmarkFrame {
    /// `None` without a visible hand, the model has nothing to work with.
    pub fn from_landmarks(hand: &[Landmark], face: &[Landmark]) -> Option<Self> {
        if hand.is_empty() {
            return None;
        }

        let mut vector = Vec::with_capacity(FRAME_LEN);
        append_slot(&mut vector, hand, HAND_VALUES);
        append_slot(&mut vector, face, FACE_VALUES);

        Some(Self {
            vector,
            normalized: false,
        })
    }
}

fn append_slot(out: &mut Vec<f32>, points: &[Landmark], len: usize) {
    let start = out.len();
    out.extend(
        points
            .iter()
            .flat_map(|p| [p.x, p.y, p.z])
            .take(len),
    );
    out.resize(start + len, 0.0);
}

/// Rate limit for frames sent to the prediction service.
#[derive(Debug)]
pub struct LandmarkThrottle {
    interval: Duration,
    last_sent: Option<Instant>,
}

impl LandmarkThrottle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_sent: None,
        }
    }

    /// `true` when a frame may go out at `now`; the frame is then counted as sent.
    pub fn ready(&mut self, now: Instant) -> bool {
        if let Some(last) = self.last_sent {
            if now.saturating_duration_since(last) < self.interval {
                return false;
            }
        }
        self.last_sent = Some(now);
        true
    }
}
