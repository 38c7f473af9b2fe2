use std::sync::{
    atomic::{
        AtomicU64,
        Ordering,
    },
    Arc,
};

use lb_scrobbler_core::TrackSnapshot;
use log::{
    debug,
    info,
};
use tokio::time::Instant;

/// Shared counter bumped on every session change
///
/// Delayed submissions capture the value current at scheduling time and
/// compare it again before submitting.
#[derive(Debug, Clone, Default)]
pub struct Generation(Arc<AtomicU64>);

impl Generation {
    pub fn current(&self) -> u64 { self.0.load(Ordering::Acquire) }

    pub fn is_current(&self, generation: u64) -> bool { self.current() == generation }

    fn advance(&self) -> u64 { self.0.fetch_add(1, Ordering::AcqRel) + 1 }
}


#[derive(Debug, Clone)]
pub struct Session {
    pub track: TrackSnapshot,
    pub started_at: Instant,
    pub generation: u64,
}

#[derive(Debug, Clone)]
pub enum Transition {
    /// A new track started playing
    Started(Session),
    /// Playback stopped; carries the track that was playing
    Stopped(TrackSnapshot),
    Unchanged,
}

/// Tracks which track is playing and since when
///
/// Does no I/O; callers act on the returned [`Transition`].
#[derive(Debug, Default)]
pub struct SessionTracker {
    current: Option<Session>,
    generation: Generation,
}

impl SessionTracker {
    pub fn new() -> Self { Self::default() }

    /// Handle for checking whether a session is still the current one
    pub fn generation(&self) -> Generation { self.generation.clone() }

    pub fn current(&self) -> Option<&Session> { self.current.as_ref() }

    /// Feeds one filtered snapshot, `None` meaning nothing valid is playing
    pub fn observe(&mut self, snapshot: Option<TrackSnapshot>) -> Transition {
        let Some(track) = snapshot.filter(TrackSnapshot::is_playing) else {
            return match self.current.take() {
                Some(session) => {
                    self.generation.advance();
                    info!("Playback stopped: {}", session.track.title);
                    Transition::Stopped(session.track)
                },
                None => Transition::Unchanged,
            };
        };

        if self.current.as_ref().is_some_and(|s| s.track.same_track(&track)) {
            debug!("Still playing: {track}");
            return Transition::Unchanged;
        }

        let session = Session {
            track,
            started_at: Instant::now(),
            generation: self.generation.advance(),
        };
        self.current = Some(session.clone());
        Transition::Started(session)
    }
}
