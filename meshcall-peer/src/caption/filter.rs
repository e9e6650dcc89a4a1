use crate::caption::Prediction;
use crate::config::CaptionFilterConfig;
use tokio::time::Instant;

#[derive(Debug, Clone, PartialEq)]
pub struct AcceptedCaption {
    pub label: String,
    pub score: f32,
}

/// Turns a stream of predictions into captions worth broadcasting.
///
/// A prediction qualifies when it carries a non-ignored label with a score of at least
/// `min_score`. Non-qualifying predictions are skipped without breaking the current streak. A
/// caption is accepted once the same label qualified `stable_hits` times in a row and
/// `cooldown` has passed since the last accepted caption.
#[derive(Debug)]
pub struct CaptionFilter {
    config: CaptionFilterConfig,
    last_label: Option<String>,
    streak: u32,
    last_accepted: Option<Instant>,
}

impl CaptionFilter {
    pub fn new(config: CaptionFilterConfig) -> Self {
        Self {
            config,
            last_label: None,
            streak: 0,
            last_accepted: None,
        }
    }

    pub fn accept(&mut self, prediction: &Prediction, now: Instant) -> Option<AcceptedCaption> {
        let Prediction::Label { label, score } = prediction else {
            return None;
        };

        let label = label.trim();
        let score = score.filter(|s| s.is_finite()).unwrap_or(0.0);
        if label.is_empty() || self.is_ignored(label) || score < self.config.min_score {
            return None;
        }

        if self.last_label.as_deref() == Some(label) {
            self.streak = self.streak.saturating_add(1);
        } else {
            self.last_label = Some(label.to_owned());
            self.streak = 1;
        }

        if self.streak < self.config.stable_hits {
            return None;
        }

        let cooled_down = self
            .last_accepted
            .is_none_or(|last| now.saturating_duration_since(last) >= self.config.cooldown);
        if !cooled_down {
            return None;
        }

        self.last_accepted = Some(now);
        Some(AcceptedCaption {
            label: label.to_owned(),
            score,
        })
    }

    fn is_ignored(&self, label: &str) -> bool {
        self.config
            .ignored_labels
            .iter()
            .any(|ignored| ignored.eq_ignore_ascii_case(label))
    }
}
