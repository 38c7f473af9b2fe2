use std::path::PathBuf;

use clap::Parser;
use uuid::Uuid;

pub(crate) const APP_DIR: &str = "lb-moode-scrobbler";

/// Scrobble what a moOde audio player is playing to a `ListenBrainz` instance
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub(crate) struct Args {
    /// Settings file [default: <config dir>/lb-moode-scrobbler/settings.json]
    #[arg(short, long, env = "LBMS_CONFIG")]
    pub config: Option<PathBuf>,

    /// ListenBrainz API token; takes precedence over the settings file
    #[arg(short, long, env = "LISTENBRAINZ_TOKEN")]
    pub token: Option<Uuid>,

    /// Url of the listenbrainz compatible API to submit to
    #[arg(short, long)]
    pub url: Option<String>,
}

impl Args {
    /// Where to read settings from, and whether the user asked for that file
    pub fn config_path(&self) -> (PathBuf, bool) {
        match &self.config {
            Some(path) => (path.clone(), true),
            None => (
                dirs::config_dir()
                    .unwrap_or_else(|| PathBuf::from("."))
                    .join(APP_DIR)
                    .join("settings.json"),
                false,
            ),
        }
    }
}


#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parse() {
        let args = Args::parse_from([
            "lb-moode-scrobbler",
            "--config",
            "/etc/scrobbler.json",
            "--token",
            "8d1a3f5c-9a2b-4c7e-b3f1-0d2e4a6c8b90",
        ]);

        assert_eq!(args.config_path(), (PathBuf::from("/etc/scrobbler.json"), true));
        assert!(args.token.is_some());
        assert!(args.url.is_none());
    }

    #[test]
    fn test_verify() {
        use clap::CommandFactory;
        Args::command().debug_assert();
    }
}
