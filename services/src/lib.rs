pub use lb_scrobbler_core::*;

mod cache;
pub use cache::{
    CacheOptions,
    Drained,
    DurableQueue,
};

pub mod config;

mod daemon;
pub use daemon::Daemon;

mod de;

mod error;
pub use error::{
    Error,
    Result,
};

mod filter;
pub use filter::IgnoreFilter;

mod pipeline;
pub use pipeline::Pipeline;

mod reconcile;
pub use reconcile::ReconciliationLoop;

mod scheduler;
pub use scheduler::{
    has_played_long_enough,
    SubmissionScheduler,
};

pub mod service;

mod session;
pub use session::{
    Generation,
    Session,
    SessionTracker,
    Transition,
};

pub mod snapshot;
pub use snapshot::SnapshotParser;

#[cfg(test)]
mod testing;
