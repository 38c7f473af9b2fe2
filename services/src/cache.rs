//! Crash-safe FIFO cache of listens the service has not accepted yet.
//!
//! The in-memory queue is authoritative while running and is mirrored to a
//! json file. Writes go to a temporary file in the same directory that is then
//! renamed over the target, so the file on disk is always a complete snapshot.
//!
//! Listens taken out for submission stay "in flight" until the service
//! confirms them. They are still written to disk ahead of the queued entries,
//! so a crash or a flush during a drain never loses them.

use std::{
    collections::VecDeque,
    fs,
    io::{
        self,
        Write,
    },
    path::{
        Path,
        PathBuf,
    },
    sync::{
        atomic::{
            AtomicUsize,
            Ordering,
        },
        Arc,
    },
    time::Duration,
};

use lb_scrobbler_core::PendingListen;
use log::{
    debug,
    error,
    info,
    warn,
};
use parking_lot::Mutex;
use tempfile::NamedTempFile;
use tokio::{
    runtime::Handle,
    task::JoinHandle,
    time,
};

use crate::{
    service::{
        payload,
        Listen,
        Scrobbler,
    },
    Error,
    Result,
};

#[derive(Debug, Clone)]
pub struct CacheOptions {
    /// Oldest entries are evicted beyond this many listens
    pub capacity: usize,
    /// Below this depth listens are submitted one at a time
    pub small_queue_threshold: usize,
    pub batch_size: usize,
    /// Window in which consecutive enqueues collapse into one write
    pub save_delay: Duration,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            capacity: 1000,
            small_queue_threshold: 3,
            batch_size: 10,
            save_delay: Duration::from_millis(500),
        }
    }
}


/// Result of one [`DurableQueue::drain`]
#[derive(Debug)]
pub enum Drained {
    /// Nothing was queued
    Empty,
    Complete {
        submitted: usize,
        dropped: usize,
    },
    /// A submission failed; the listens it carried are back at the front
    Interrupted {
        submitted: usize,
        dropped: usize,
        restored: usize,
        error: Error,
    },
}

impl Drained {
    pub fn is_complete(&self) -> bool { matches!(self, Self::Empty | Self::Complete { .. }) }
}


#[derive(Clone)]
pub struct DurableQueue {
    shared: Arc<Shared>,
}

struct Shared {
    path: PathBuf,
    options: CacheOptions,
    state: Mutex<State>,
    depth: AtomicUsize,
    draining: tokio::sync::Mutex<()>,
}

#[derive(Default)]
struct State {
    listens: VecDeque<PendingListen>,
    in_flight: Vec<PendingListen>,
    save_timer: Option<JoinHandle<()>>,
    save_seq: u64,
}

impl State {
    fn depth(&self) -> usize { self.listens.len() + self.in_flight.len() }
}

impl DurableQueue {
    /// Loads the cache at `path`
    ///
    /// A missing, empty or unreadable file resets the cache to empty and is
    /// rewritten straight away.
    pub fn open(path: impl Into<PathBuf>, options: CacheOptions) -> Self {
        let path = path.into();
        let (mut listens, rewrite) = match load(&path) {
            Ok(Some(listens)) => (listens, false),
            Ok(None) => (VecDeque::new(), true),
            Err(e) => {
                error!("Error handling cache file: {e}");
                (VecDeque::new(), true)
            },
        };
        if listens.len() > options.capacity {
            warn!("Cache holds {} listens; keeping the newest {}", listens.len(), options.capacity);
            listens.drain(..listens.len() - options.capacity);
        }
        if !listens.is_empty() {
            info!("Loaded {} pending listens from {}", listens.len(), path.display());
        }

        let queue = Self {
            shared: Arc::new(Shared {
                depth: AtomicUsize::new(listens.len()),
                state: Mutex::new(State {
                    listens,
                    ..Default::default()
                }),
                path,
                options,
                draining: tokio::sync::Mutex::new(()),
            }),
        };
        if rewrite {
            if let Err(e) = queue.flush() {
                error!("Failed to save cache: {e}");
            }
        }
        queue
    }

    pub fn path(&self) -> &Path { &self.shared.path }

    /// Appends a listen, evicting the oldest queued one when full
    pub fn enqueue(&self, listen: PendingListen) {
        let mut state = self.shared.state.lock();
        if state.depth() >= self.shared.options.capacity {
            if let Some(evicted) = state.listens.pop_front() {
                warn!(
                    "Cache full; dropped oldest listen: {} by {}",
                    evicted.track_name, evicted.artist_name
                );
            }
        }
        state.listens.push_back(listen);
        self.shared.update_depth(&state);
        self.shared.schedule_save(&mut state);
    }

    pub fn has_pending(&self) -> bool { self.len() > 0 }

    /// Queued plus in-flight listens
    pub fn len(&self) -> usize { self.shared.depth.load(Ordering::Acquire) }

    pub fn is_empty(&self) -> bool { !self.has_pending() }

    /// Copy of the queue in delivery order, in-flight listens first
    pub fn pending(&self) -> Vec<PendingListen> {
        let state = self.shared.state.lock();
        state.in_flight.iter().chain(state.listens.iter()).cloned().collect()
    }

    /// Writes the queue to disk now, cancelling any pending delayed write
    ///
    /// # Errors
    ///
    /// Returns an error if the cache file could not be written.
    pub fn flush(&self) -> Result<()> {
        let mut state = self.shared.state.lock();
        if let Some(timer) = state.save_timer.take() {
            timer.abort();
        }
        state.save_seq += 1;
        self.shared.write(&state)
    }

    /// Submits queued listens until the queue is empty or a submission fails
    ///
    /// Small queues go one listen at a time; deeper ones go in batches. A
    /// failed submission puts its listens back at the front in their original
    /// order. Only entries that cannot be turned into a listen are discarded.
    pub async fn drain(&self, scrobbler: &dyn Scrobbler) -> Drained {
        let _draining = self.shared.draining.lock().await;

        let budget = self.shared.state.lock().listens.len();
        if budget == 0 {
            return Drained::Empty;
        }

        let (mut handled, mut submitted, mut dropped) = (0, 0, 0);
        while handled < budget {
            let depth = self.shared.state.lock().listens.len();
            if depth == 0 {
                break;
            }

            let single = depth < self.shared.options.small_queue_threshold;
            let take = if single { 1 } else { self.shared.options.batch_size.max(1) };
            let (listens, bad) = self.shared.take_front(take);
            handled += listens.len() + bad;
            dropped += bad;
            if listens.is_empty() {
                self.shared.confirm();
                continue;
            }

            let count = listens.len();
            let resp = if single {
                match listens.into_iter().next() {
                    Some(listen) => scrobbler.submit_one(listen).await,
                    None => Ok(()),
                }
            } else {
                scrobbler.submit_batch(listens).await
            };

            match resp {
                Ok(()) => {
                    debug!("Submitted {count} cached listen(s)");
                    submitted += count;
                    self.shared.confirm();
                },
                Err(error) => {
                    let restored = self.shared.restore();
                    return Drained::Interrupted {
                        submitted,
                        dropped,
                        restored,
                        error,
                    };
                },
            }
        }

        Drained::Complete { submitted, dropped }
    }
}

impl Shared {
    fn update_depth(&self, state: &State) { self.depth.store(state.depth(), Ordering::Release); }

    /// Restarts the save timer; called with the lock held
    fn schedule_save(self: &Arc<Self>, state: &mut State) {
        if let Some(timer) = state.save_timer.take() {
            timer.abort();
        }
        state.save_seq += 1;

        match Handle::try_current() {
            Ok(handle) => {
                let shared = Arc::clone(self);
                let seq = state.save_seq;
                state.save_timer = Some(handle.spawn(async move {
                    time::sleep(shared.options.save_delay).await;
                    shared.save_if_current(seq);
                }));
            },
            Err(_) => {
                if let Err(e) = self.write(state) {
                    error!("Failed to save cache: {e}");
                }
            },
        }
    }

    fn save_if_current(&self, seq: u64) {
        let mut state = self.state.lock();
        if state.save_seq != seq {
            return;
        }
        state.save_timer = None;
        if let Err(e) = self.write(&state) {
            error!("Failed to save cache: {e}");
        }
    }

    /// Moves up to `n` listens into flight, dropping the ones that cannot be
    /// submitted. Returns the submittable listens and the number dropped.
    fn take_front(&self, n: usize) -> (Vec<Listen>, usize) {
        let mut state = self.state.lock();
        let mut listens = Vec::with_capacity(n);
        let mut dropped = 0;
        for _ in 0..n {
            let Some(pending) = state.listens.pop_front() else {
                break;
            };
            match payload(&pending) {
                Ok(listen) => {
                    listens.push(listen);
                    state.in_flight.push(pending);
                },
                Err(e) => {
                    error!("Error creating listen from cached entry {pending:?}: {e}");
                    dropped += 1;
                },
            }
        }
        self.update_depth(&state);
        (listens, dropped)
    }

    /// Forgets the in-flight listens after the service accepted them
    fn confirm(&self) {
        let mut state = self.state.lock();
        state.in_flight.clear();
        self.update_depth(&state);
        self.write_logged(&state);
    }

    /// Puts the in-flight listens back at the front, in order
    fn restore(&self) -> usize {
        let mut state = self.state.lock();
        let in_flight = std::mem::take(&mut state.in_flight);
        let restored = in_flight.len();
        for listen in in_flight.into_iter().rev() {
            state.listens.push_front(listen);
        }
        while state.listens.len() > self.options.capacity {
            if let Some(evicted) = state.listens.pop_front() {
                warn!(
                    "Cache full; dropped oldest listen: {} by {}",
                    evicted.track_name, evicted.artist_name
                );
            }
        }
        self.update_depth(&state);
        self.write_logged(&state);
        restored
    }

    fn write_logged(&self, state: &State) {
        if let Err(e) = self.write(state) {
            error!("Failed to save cache: {e}");
        }
    }

    fn write(&self, state: &State) -> Result<()> {
        let listens: Vec<_> = state.in_flight.iter().chain(state.listens.iter()).collect();
        write_atomic(&self.path, &serde_json::to_vec(&listens).map_err(io::Error::from)?)?;
        Ok(())
    }
}


/// `Ok(None)` when the file is missing or blank
fn load(path: &Path) -> Result<Option<VecDeque<PendingListen>>> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    if content.trim().is_empty() {
        return Ok(None);
    }
    serde_json::from_str(&content)
        .map(Some)
        .map_err(|source| Error::CacheCorruption {
            path: path.to_owned(),
            source,
        })
}

/// Writes to a sibling temporary file and renames it over `path`
fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let dir = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
    fs::create_dir_all(dir)?;

    let mut file = NamedTempFile::new_in(dir)?;
    file.write_all(bytes)?;
    file.as_file().sync_all()?;
    file.persist(path).map_err(|e| e.error)?;
    Ok(())
}
