use std::{
    path::PathBuf,
    sync::Arc,
};

use anyhow::{
    Context,
    Result,
};
use clap::Parser;
use lb_scrobbler_services::{
    config::Settings,
    service::{
        ListenBrainzClient,
        Scrobbler,
    },
    Daemon,
};
use log::{
    info,
    warn,
};

use crate::args::{
    Args,
    APP_DIR,
};

mod args;
mod logging;
mod watch;


fn load_settings(args: &Args) -> Result<Settings> {
    let (path, explicit) = args.config_path();
    let settings = if explicit || path.exists() {
        Settings::load(&path)?
    } else {
        Settings::default()
    };
    Ok(settings.with_token(args.token).with_api_url(args.url.clone()))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Unable to listen for ctrl-c: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let term = async {
        use tokio::signal::unix::{
            signal,
            SignalKind,
        };
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            },
            Err(e) => {
                warn!("Unable to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            },
        }
    };

    #[cfg(not(unix))]
    let term = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = term => {},
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse_from(wild::args_os());

    #[cfg(debug_assertions)]
    dbg!(&args);

    let settings = load_settings(&args)?;
    logging::init(&settings.logging);
    info!("{} v{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
    info!("Copyright (c) {} | {}", env!("CARGO_PKG_AUTHORS"), env!("CARGO_PKG_LICENSE"));

    let scrobbler: Arc<dyn Scrobbler> = Arc::new(ListenBrainzClient::new(settings.api_url.clone(), settings.token()?));
    let cache_dir = dirs::cache_dir().unwrap_or_else(|| PathBuf::from(".")).join(APP_DIR);
    let mut daemon = Daemon::start(&settings, scrobbler, &cache_dir).await?;

    let (_watcher, mut changes) = watch::watch(daemon.watched_file())?;
    daemon.initial_check();

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            change = changes.recv() => match change {
                Some(()) => {
                    // Collapse a burst of writes into one read
                    while changes.try_recv().is_ok() {}
                    daemon.file_changed();
                },
                None => {
                    warn!("File watcher stopped");
                    break;
                },
            },
            () = &mut shutdown => break,
        }
    }

    info!("Shutting down...");
    daemon.shutdown().context("Failed to save cache")?;

    anyhow::Ok(())
}
