use std::{
    sync::Arc,
    time::Duration,
};

use log::{
    debug,
    error,
    info,
    warn,
};
use tokio::{
    task::JoinHandle,
    time::{
        self,
        Instant,
        MissedTickBehavior,
    },
};

use crate::{
    service::Scrobbler,
    Drained,
    DurableQueue,
};

/// Periodically pushes cached listens to the service
pub struct ReconciliationLoop {
    queue: DurableQueue,
    scrobbler: Arc<dyn Scrobbler>,
    interval: Duration,
}

impl ReconciliationLoop {
    pub fn new(queue: DurableQueue, scrobbler: Arc<dyn Scrobbler>, interval: Duration) -> Self {
        Self {
            queue,
            scrobbler,
            interval: interval.max(Duration::from_secs(1)),
        }
    }

    pub fn spawn(self) -> JoinHandle<()> { tokio::spawn(Arc::new(self).run()) }

    /// Runs [`tick`](Self::tick) every interval until the task is dropped
    ///
    /// A panicking tick is logged and the loop carries on.
    pub async fn run(self: Arc<Self>) {
        let Some(start) = Instant::now().checked_add(self.interval) else {
            warn!("Cache sync interval out of range; cached listens will not be retried");
            return;
        };
        let mut ticker = time::interval_at(start, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let this = Arc::clone(&self);
            if let Err(e) = tokio::spawn(async move { this.tick().await }).await {
                error!("Error in cache sync: {e}");
            }
        }
    }

    /// Drains the queue once if it has anything and the service answers
    pub async fn tick(&self) -> Option<Drained> {
        if !self.queue.has_pending() {
            return None;
        }
        if let Err(e) = self.scrobbler.authenticate().await {
            debug!("Service unreachable, keeping {} cached listens: {e}", self.queue.len());
            return None;
        }

        info!("Connection available. Processing {} cached listens...", self.queue.len());
        let drained = self.queue.drain(self.scrobbler.as_ref()).await;
        match &drained {
            Drained::Empty => {},
            Drained::Complete { submitted, dropped } => {
                info!("Cache processed: {submitted} submitted, {dropped} dropped");
            },
            Drained::Interrupted {
                submitted,
                restored,
                error,
                ..
            } => {
                warn!("Cache processing interrupted after {submitted} listens, {restored} put back: {error}");
            },
        }
        Some(drained)
    }
}
