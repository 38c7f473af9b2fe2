use std::path::{
    Path,
    PathBuf,
};

use anyhow::{
    Context,
    Result,
};
use log::{
    debug,
    error,
    info,
};
use notify::{
    Config,
    Event,
    EventKind,
    RecommendedWatcher,
    RecursiveMode,
    Watcher,
};
use tokio::sync::mpsc::{
    self,
    UnboundedReceiver,
};

/// Watches the directory holding `file` and reports each change to it
///
/// When `file` is a symlink into another directory, that directory is watched
/// too. The watcher stops when the returned [`RecommendedWatcher`] is dropped.
pub(crate) fn watch(file: &Path) -> Result<(RecommendedWatcher, UnboundedReceiver<()>)> {
    let dir = file
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."))
        .canonicalize()
        .with_context(|| format!("Missing directory for {}", file.display()))?;
    let target = file.file_name().map(|name| dir.join(name)).context("Now playing path has no file name")?;

    let (tx, rx) = mpsc::unbounded_channel();
    let watched = target.clone();
    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| match res {
            Ok(event) if is_change_to(&event, &watched) => {
                debug!("File watch event: {:?}", event.kind);
                // Receiver gone means shutdown
                let _ = tx.send(());
            },
            Ok(_) => {},
            Err(e) => error!("Watch error: {e}"),
        },
        Config::default(),
    )
    .context("Failed to create file watcher")?;

    for dir in watch_dirs(&dir, &target) {
        watcher.watch(&dir, RecursiveMode::NonRecursive).with_context(|| format!("Failed to watch {}", dir.display()))?;
        debug!("Watching directory {}", dir.display());
    }
    info!("Monitoring {}", target.display());

    Ok((watcher, rx))
}

/// `dir` plus the directory a symlinked `target` resolves into
fn watch_dirs(dir: &Path, target: &Path) -> Vec<PathBuf> {
    let mut dirs = vec![dir.to_owned()];
    if let Some(resolved) = canonical(target).parent().filter(|p| *p != dir) {
        dirs.push(resolved.to_owned());
    }
    dirs
}

/// Matches events on `target` itself or on whatever it currently resolves to
fn is_change_to(event: &Event, target: &Path) -> bool {
    if !matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_)) {
        return false;
    }
    let resolved = canonical(target);
    event.paths.iter().any(|p| p == target || canonical(p) == resolved)
}

fn canonical(path: &Path) -> PathBuf { path.canonicalize().unwrap_or_else(|_| path.to_owned()) }
