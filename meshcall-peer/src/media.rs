use meshcall_core::{MediaKind, TrackSource};
use std::fmt;
use std::sync::Arc;
use webrtc::track::track_local::TrackLocal;

/// A captured track ready to be attached to peer links.
#[derive(Clone)]
pub struct LocalTrack {
    pub source: TrackSource,
    pub track: Arc<dyn TrackLocal + Send + Sync>,
}

impl LocalTrack {
    pub fn new(source: TrackSource, track: Arc<dyn TrackLocal + Send + Sync>) -> Self {
        Self { source, track }
    }

    pub fn kind(&self) -> MediaKind {
        self.source.kind()
    }

    pub fn id(&self) -> &str {
        self.track.id()
    }
}

impl fmt::Debug for LocalTrack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalTrack")
            .field("source", &self.source)
            .field("id", &self.track.id())
            .finish()
    }
}

/// A change to one kind of local media.
#[derive(Debug, Clone)]
pub enum MediaUpdate {
    /// A new capture replaces the current one.
    Track(LocalTrack),
    /// Mute or unmute without releasing the capture.
    Enabled(bool),
    Removed,
    /// The device could not be opened.
    Unavailable(String),
}

/// Media received from a remote participant.
pub trait RemoteMedia: Send + Sync {
    fn id(&self) -> String;
    fn stream_id(&self) -> String;
    fn kind(&self) -> MediaKind;
}

pub type RemoteTrack = Arc<dyn RemoteMedia>;
