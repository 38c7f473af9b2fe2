use std::{
    path::Path,
    sync::Arc,
};

use lb_scrobbler_core::TrackSnapshot;
use log::{
    debug,
    error,
};

use crate::{
    config::Settings,
    service::Scrobbler,
    DurableQueue,
    Error,
    IgnoreFilter,
    SessionTracker,
    SnapshotParser,
    SubmissionScheduler,
    Transition,
};

/// Turns changes of the now playing file into submissions
pub struct Pipeline {
    parser: SnapshotParser,
    filter: IgnoreFilter,
    tracker: SessionTracker,
    scheduler: SubmissionScheduler,
}

impl Pipeline {
    pub fn new(settings: &Settings, scrobbler: Arc<dyn Scrobbler>, cache: Option<DurableQueue>) -> Self {
        let tracker = SessionTracker::new();
        let scheduler = SubmissionScheduler::new(settings, scrobbler, cache, tracker.generation());
        Self {
            parser: SnapshotParser::new(&settings.currentsong_file),
            filter: IgnoreFilter::new(&settings.filters),
            tracker,
            scheduler,
        }
    }

    pub fn watched_file(&self) -> &Path { self.parser.path() }

    pub fn scheduler(&self) -> &SubmissionScheduler { &self.scheduler }

    /// Re-reads the now playing file and acts on it
    ///
    /// Returns `None` when the snapshot was suppressed by the ignore filter.
    pub fn refresh(&mut self) -> Option<Transition> {
        let snapshot = self.read();
        self.handle(snapshot)
    }

    /// Acts on one snapshot; `None` means nothing valid is playing
    pub fn handle(&mut self, snapshot: Option<TrackSnapshot>) -> Option<Transition> {
        if snapshot.as_ref().is_some_and(|s| self.filter.should_ignore(s)) {
            return None;
        }

        let transition = self.tracker.observe(snapshot);
        if let Transition::Started(session) = &transition {
            self.scheduler.on_track_changed(session);
        }
        Some(transition)
    }

    fn read(&self) -> Option<TrackSnapshot> {
        match self.parser.read() {
            Ok(snapshot) => Some(snapshot),
            Err(e @ Error::Validation(_)) => {
                debug!("{e}");
                None
            },
            Err(e) => {
                error!("Error parsing song information: {e}");
                None
            },
        }
    }
}
