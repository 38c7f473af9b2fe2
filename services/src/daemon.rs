use std::{
    path::Path,
    sync::Arc,
};

use log::{
    debug,
    error,
    info,
};
use tokio::task::JoinHandle;

use crate::{
    config::{
        ConfigError,
        Settings,
    },
    service::Scrobbler,
    CacheOptions,
    DurableQueue,
    Pipeline,
    ReconciliationLoop,
    Result,
    Transition,
};

/// The running scrobbler: playback pipeline, listen cache and cache sync
pub struct Daemon {
    pipeline: Pipeline,
    cache: Option<DurableQueue>,
    sync: Option<JoinHandle<()>>,
}

impl Daemon {
    /// Validates the token with the service, then opens the cache and starts
    /// syncing it in the background
    ///
    /// # Errors
    ///
    /// [`Error::Config`](crate::Error::Config) with [`ConfigError::InvalidToken`]
    /// if the token could not be validated.
    pub async fn start(settings: &Settings, scrobbler: Arc<dyn Scrobbler>, default_cache_dir: &Path) -> Result<Self> {
        if let Err(e) = scrobbler.authenticate().await {
            error!("Token validation failed: {e}");
            return Err(ConfigError::InvalidToken.into());
        }
        info!("ListenBrainz token validated");

        let cache = settings
            .features
            .enable_cache
            .then(|| DurableQueue::open(settings.cache_path(default_cache_dir), CacheOptions::default()));
        let sync = cache
            .clone()
            .map(|queue| ReconciliationLoop::new(queue, Arc::clone(&scrobbler), settings.cache_sync_interval).spawn());

        Ok(Self {
            pipeline: Pipeline::new(settings, scrobbler, cache.clone()),
            cache,
            sync,
        })
    }

    pub fn watched_file(&self) -> &Path { self.pipeline.watched_file() }

    pub fn cache(&self) -> Option<&DurableQueue> { self.cache.as_ref() }

    /// Picks up a track that was already playing before the watcher started
    pub fn initial_check(&mut self) -> Option<Transition> {
        debug!("Checking current playback state");
        self.pipeline.refresh()
    }

    pub fn file_changed(&mut self) -> Option<Transition> { self.pipeline.refresh() }

    /// Stops cache sync and writes the cache to disk
    ///
    /// Returns how many delayed submissions had not finished.
    ///
    /// # Errors
    ///
    /// Returns an error if the cache file could not be written.
    pub fn shutdown(self) -> Result<usize> {
        if let Some(sync) = self.sync {
            sync.abort();
        }
        let scheduled = self.pipeline.scheduler().scheduled().len();
        if scheduled > 0 {
            info!("Abandoning {scheduled} scheduled submission(s)");
        }
        if let Some(cache) = &self.cache {
            cache.flush()?;
            info!("Cache saved with {} pending listens", cache.len());
        }
        Ok(scheduled)
    }
}


#[cfg(test)]
mod test {
    use std::{
        fs,
        time::Duration,
    };

    use tempfile::TempDir;
    use tokio::time;

    use super::*;
    use crate::{
        testing::{
            names,
            pending,
            FakeScrobbler,
        },
        Error,
    };

    const PLAYING: &str = "title=A\nartist=Band\nalbum=LP\nstate=play\n";

    fn settings(dir: &TempDir) -> Settings {
        Settings::from_json(&format!(
            r#"{{ "currentsong_file": {:?}, "cache_dir": {:?}, "min_play_time": 30 }}"#,
            dir.path().join("currentsong.txt"),
            dir.path().join("cache")
        ))
        .unwrap()
    }

    async fn start(dir: &TempDir, remote: &Arc<FakeScrobbler>) -> Daemon {
        match Daemon::start(&settings(dir), remote.clone(), dir.path()).await {
            Ok(daemon) => daemon,
            Err(e) => panic!("Failed to start: {e}"),
        }
    }

    #[tokio::test]
    async fn test_start_rejects_unvalidated_token() {
        let dir = TempDir::new().unwrap();
        let remote = Arc::new(FakeScrobbler::default());
        remote.set_offline(true);

        let started = Daemon::start(&settings(&dir), remote.clone(), dir.path()).await;
        assert!(matches!(started, Err(Error::Config(ConfigError::InvalidToken))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_initial_check_picks_up_playing_track() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("currentsong.txt"), PLAYING).unwrap();
        let remote = Arc::new(FakeScrobbler::default());
        let mut daemon = start(&dir, &remote).await;

        assert!(matches!(daemon.initial_check(), Some(Transition::Started(_))));
        assert!(matches!(daemon.file_changed(), Some(Transition::Unchanged)));

        time::sleep(Duration::from_secs(31)).await;
        assert_eq!(remote.now_playing(), ["A"]);
        assert_eq!(remote.singles(), ["A"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_flushes_cache() {
        let dir = TempDir::new().unwrap();
        let remote = Arc::new(FakeScrobbler::default());
        let daemon = start(&dir, &remote).await;

        let cache = daemon.cache().unwrap().clone();
        cache.enqueue(pending("L1"));
        assert_eq!(fs::read_to_string(cache.path()).unwrap(), "[]");

        assert_eq!(daemon.shutdown().unwrap(), 0);
        assert_eq!(cache.path(), dir.path().join("cache").join("pending_listens.json"));
        let reopened = DurableQueue::open(cache.path(), CacheOptions::default());
        assert_eq!(names(&reopened.pending()), ["L1"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_reports_scheduled_submissions() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("currentsong.txt"), PLAYING).unwrap();
        let remote = Arc::new(FakeScrobbler::default());
        let mut daemon = start(&dir, &remote).await;
        daemon.initial_check();

        assert_eq!(daemon.shutdown().unwrap(), 1);
    }
}
