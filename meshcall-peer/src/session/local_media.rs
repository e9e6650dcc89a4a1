use crate::media::LocalTrack;
use meshcall_core::MediaKind;
use std::collections::HashMap;

/// Local captures and what is actually being sent.
///
/// The outgoing video is the screen capture while sharing, else the camera if enabled.
#[derive(Debug)]
pub struct LocalMedia {
    microphone: Option<LocalTrack>,
    camera: Option<LocalTrack>,
    screen: Option<LocalTrack>,
    audio_enabled: bool,
    video_enabled: bool,
}

impl Default for LocalMedia {
    fn default() -> Self {
        Self {
            microphone: None,
            camera: None,
            screen: None,
            audio_enabled: true,
            video_enabled: true,
        }
    }
}

impl LocalMedia {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn effective(&self, kind: MediaKind) -> Option<LocalTrack> {
        match kind {
            MediaKind::Audio => self.microphone.clone().filter(|_| self.audio_enabled),
            MediaKind::Video => self
                .screen
                .clone()
                .or_else(|| self.camera.clone().filter(|_| self.video_enabled)),
        }
    }

    pub fn effective_id(&self, kind: MediaKind) -> Option<String> {
        self.effective(kind).map(|track| track.id().to_owned())
    }

    pub fn active_tracks(&self) -> HashMap<MediaKind, LocalTrack> {
        [MediaKind::Audio, MediaKind::Video]
            .into_iter()
            .filter_map(|kind| self.effective(kind).map(|track| (kind, track)))
            .collect()
    }

    pub fn set_capture(&mut self, kind: MediaKind, track: Option<LocalTrack>) {
        match kind {
            MediaKind::Audio => self.microphone = track,
            MediaKind::Video => self.camera = track,
        }
    }

    pub fn set_enabled(&mut self, kind: MediaKind, enabled: bool) {
        match kind {
            MediaKind::Audio => self.audio_enabled = enabled,
            MediaKind::Video => self.video_enabled = enabled,
        }
    }

    pub fn set_screen(&mut self, track: Option<LocalTrack>) {
        self.screen = track;
    }

    pub fn is_sharing_screen(&self) -> bool {
        self.screen.is_some()
    }

    /// Drop every capture.
    pub fn release(&mut self) {
        self.microphone = None;
        self.camera = None;
        self.screen = None;
    }
}
