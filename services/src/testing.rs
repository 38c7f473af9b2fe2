use std::sync::atomic::{
    AtomicBool,
    AtomicUsize,
    Ordering,
};

use async_trait::async_trait;
use lb_scrobbler_core::PendingListen;
use parking_lot::Mutex;

use crate::{
    service::{
        Listen,
        Scrobbler,
    },
    Error,
    Result,
};

/// In-memory service that records what it accepts and fails on demand
#[derive(Default)]
pub(crate) struct FakeScrobbler {
    now_playing: Mutex<Vec<String>>,
    singles: Mutex<Vec<String>>,
    batches: Mutex<Vec<Vec<String>>>,
    accepted: Mutex<Vec<String>>,
    single_attempts: AtomicUsize,
    fail_singles: AtomicUsize,
    fail_batches: AtomicUsize,
    offline: AtomicBool,
}

impl FakeScrobbler {
    pub fn fail_next_singles(&self, n: usize) { self.fail_singles.store(n, Ordering::SeqCst); }

    pub fn fail_next_batches(&self, n: usize) { self.fail_batches.store(n, Ordering::SeqCst); }

    pub fn set_offline(&self, offline: bool) { self.offline.store(offline, Ordering::SeqCst); }

    pub fn now_playing(&self) -> Vec<String> { self.now_playing.lock().clone() }

    pub fn singles(&self) -> Vec<String> { self.singles.lock().clone() }

    pub fn batches(&self) -> Vec<Vec<String>> { self.batches.lock().clone() }

    /// Every listen accepted so far, in submission order
    pub fn accepted(&self) -> Vec<String> { self.accepted.lock().clone() }

    pub fn single_attempts(&self) -> usize { self.single_attempts.load(Ordering::SeqCst) }

    fn check(&self, counter: &AtomicUsize) -> Result<()> {
        let scheduled = counter.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1)).is_ok();
        if scheduled || self.offline.load(Ordering::SeqCst) {
            Err(Error::RemoteUnavailable("connection refused".to_owned()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl Scrobbler for FakeScrobbler {
    async fn authenticate(&self) -> Result<()> { self.check(&AtomicUsize::new(0)) }

    async fn submit_now_playing(&self, track: Listen) -> Result<()> {
        self.check(&AtomicUsize::new(0))?;
        self.now_playing.lock().push(track.track_metadata.track_name);
        Ok(())
    }

    async fn submit_one(&self, listen: Listen) -> Result<()> {
        self.single_attempts.fetch_add(1, Ordering::SeqCst);
        self.check(&self.fail_singles)?;
        let name = listen.track_metadata.track_name;
        self.accepted.lock().push(name.clone());
        self.singles.lock().push(name);
        Ok(())
    }

    async fn submit_batch(&self, listens: Vec<Listen>) -> Result<()> {
        self.check(&self.fail_batches)?;
        let names: Vec<_> = listens.into_iter().map(|l| l.track_metadata.track_name).collect();
        self.accepted.lock().extend(names.iter().cloned());
        self.batches.lock().push(names);
        Ok(())
    }
}


pub(crate) fn pending(name: &str) -> PendingListen {
    PendingListen {
        track_name: name.to_owned(),
        artist_name: "Artist".to_owned(),
        release_name: Some("Album".to_owned()),
        listened_at: 1_700_000_000,
        listening_from: lb_scrobbler_core::LISTENING_FROM.to_owned(),
        tracknumber: None,
    }
}

pub(crate) fn names(listens: &[PendingListen]) -> Vec<&str> { listens.iter().map(|l| l.track_name.as_str()).collect() }
