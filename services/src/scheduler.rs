use std::{
    collections::BTreeMap,
    sync::Arc,
    time::Duration,
};

use chrono::Utc;
use lb_scrobbler_core::{
    PendingListen,
    TrackIdentity,
    TrackSnapshot,
};
use log::{
    debug,
    error,
    info,
    warn,
};
use parking_lot::Mutex;
use tokio::{
    task::JoinHandle,
    time::{
        self,
        Instant,
    },
};

use crate::{
    config::{
        Features,
        RetryPolicy,
        Settings,
    },
    service::{
        payload,
        Scrobbler,
    },
    session::{
        Generation,
        Session,
    },
    DurableQueue,
    Result,
};

/// Whether a play that began at `started_at` counts as a listen at `now`
pub fn has_played_long_enough(started_at: Instant, now: Instant, min_play_time: Duration) -> bool {
    now.saturating_duration_since(started_at) >= min_play_time
}


/// Sends "playing now" notices and delayed listen submissions for each new session
#[derive(Clone)]
pub struct SubmissionScheduler {
    inner: Arc<Inner>,
}

struct Inner {
    scrobbler: Arc<dyn Scrobbler>,
    cache: Option<DurableQueue>,
    features: Features,
    min_play_time: Duration,
    retry: RetryPolicy,
    generation: Generation,
    /// Delayed submissions that have not finished, by session generation
    scheduled: Mutex<BTreeMap<u64, TrackIdentity>>,
}

impl SubmissionScheduler {
    pub fn new(settings: &Settings, scrobbler: Arc<dyn Scrobbler>, cache: Option<DurableQueue>, generation: Generation) -> Self {
        Self {
            inner: Arc::new(Inner {
                scrobbler,
                cache: cache.filter(|_| settings.features.enable_cache),
                features: settings.features,
                min_play_time: settings.min_play_time,
                retry: settings.retry.clone(),
                generation,
                scheduled: Mutex::new(BTreeMap::new()),
            }),
        }
    }

    /// Tracks whose delayed submission has not completed yet
    pub fn scheduled(&self) -> Vec<TrackIdentity> { self.inner.scheduled.lock().values().cloned().collect() }

    /// Reacts to a new session; never waits on the network
    ///
    /// Returns the handle of the delayed submission when listens are enabled.
    pub fn on_track_changed(&self, session: &Session) -> Option<JoinHandle<()>> {
        let track = &session.track;
        if self.inner.features.enable_listening_now {
            let inner = Arc::clone(&self.inner);
            let track = track.clone();
            tokio::spawn(async move { inner.submit_playing_now(&track).await });
        } else {
            info!("Track detected: {track}");
        }

        if !self.inner.features.enable_listen {
            return None;
        }

        debug!("Starting scrobble delay for: {}", track.title);
        self.inner.scheduled.lock().insert(session.generation, track.identity());
        let inner = Arc::clone(&self.inner);
        let track = track.clone();
        let started_at = session.started_at;
        let generation = session.generation;
        Some(tokio::spawn(async move {
            match started_at.checked_add(inner.min_play_time) {
                Some(deadline) => {
                    time::sleep_until(deadline).await;
                    inner.finish(track, started_at, generation).await;
                },
                None => warn!("Skipping submission: {} - Minimum play time out of range", track.title),
            }
            inner.scheduled.lock().remove(&generation);
        }))
    }
}

impl Inner {
    async fn submit_playing_now(&self, track: &TrackSnapshot) {
        debug!("Submitting Listening now... status");
        let resp = match payload(track) {
            Ok(listen) => self.scrobbler.submit_now_playing(listen).await,
            Err(e) => Err(e),
        };
        match resp {
            Ok(()) => info!("Listening now... {track}"),
            Err(e) => error!("Failed to submit Listening now...: {e}"),
        }
    }

    async fn finish(&self, track: TrackSnapshot, started_at: Instant, generation: u64) {
        if !self.generation.is_current(generation) {
            debug!("Skipping submission: {} - Superseded before minimum play time", track.title);
            return;
        }
        if !has_played_long_enough(started_at, Instant::now(), self.min_play_time) {
            debug!("Skipping submission: {} - Insufficient play time", track.title);
            return;
        }
        self.submit_listen(&track).await;
    }

    async fn submit_listen(&self, track: &TrackSnapshot) {
        match self.submit_with_retry(track).await {
            Ok(()) => info!("Successfully submitted: {track}"),
            Err(_) => match self.cache.as_ref() {
                Some(cache) => {
                    info!("Saving failed submission to cache for later retry...");
                    cache.enqueue(PendingListen::from_track(track, Utc::now().timestamp()));
                    info!("Submission saved to cache");
                },
                None => error!("Submission lost - Cache feature is disabled"),
            },
        }
    }

    async fn submit_with_retry(&self, track: &TrackSnapshot) -> Result<()> {
        let attempts = self.retry.attempts();
        let listened_at = Utc::now().timestamp();
        let mut attempt = 1;
        loop {
            let resp = match payload(&PendingListen::from_track(track, listened_at)) {
                Ok(listen) => self.scrobbler.submit_one(listen).await,
                Err(e) => Err(e),
            };
            match resp {
                Ok(()) => return Ok(()),
                Err(e) => {
                    error!("Submission failed for '{}' by '{}'", track.title, track.artist);
                    error!("Attempt {attempt}/{attempts} - Error: {e}");
                    if attempt >= attempts || !e.is_remote() {
                        warn!("All retry attempts exhausted");
                        return Err(e);
                    }
                },
            }
            info!("Retrying in {} seconds...", self.retry.delay.as_secs_f64());
            time::sleep(self.retry.delay).await;
            attempt += 1;
        }
    }
}
