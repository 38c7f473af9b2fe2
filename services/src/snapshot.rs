use std::{
    fs,
    path::{
        Path,
        PathBuf,
    },
};

use lb_scrobbler_core::{
    PlaybackState,
    TrackSnapshot,
};

use crate::{
    Error,
    Result,
};

/// Reads the moOde `currentsong.txt` file
#[derive(Debug, Clone)]
pub struct SnapshotParser {
    path: PathBuf,
}

impl SnapshotParser {
    pub fn new(path: impl Into<PathBuf>) -> Self { Self { path: path.into() } }

    pub fn path(&self) -> &Path { &self.path }

    /// Reads the whole file and parses it
    ///
    /// # Errors
    ///
    /// [`Error::Parse`] if the file cannot be read, [`Error::Validation`] if it
    /// does not name both a title and an artist.
    pub fn read(&self) -> Result<TrackSnapshot> {
        let text = fs::read_to_string(&self.path).map_err(|source| Error::Parse {
            path: self.path.clone(),
            source,
        })?;
        parse(&text)
    }
}


/// Parses `key=value` lines; unknown keys are skipped and the last assignment
/// of a key wins
///
/// # Errors
///
/// [`Error::Validation`] when `title` or `artist` is missing or blank.
pub fn parse(text: &str) -> Result<TrackSnapshot> {
    let mut title = None;
    let mut artist = None;
    let mut snapshot = TrackSnapshot::default();

    for (key, value) in text.lines().filter_map(|l| l.split_once('=')) {
        let value = clean_text(value);
        let slot = match key.trim() {
            "title" => &mut title,
            "artist" => &mut artist,
            "album" => &mut snapshot.album,
            "state" => {
                snapshot.state = value.as_deref().map(PlaybackState::from);
                continue;
            },
            "track" => &mut snapshot.track,
            "date" => &mut snapshot.date,
            "composer" => &mut snapshot.composer,
            "genre" => &mut snapshot.genre,
            "duration" => &mut snapshot.duration,
            "bitrate" => &mut snapshot.bitrate,
            "encoded" => &mut snapshot.encoded,
            _ => continue,
        };
        *slot = value;
    }

    snapshot.title = title.ok_or(Error::Validation("title"))?;
    snapshot.artist = artist.ok_or(Error::Validation("artist"))?;
    Ok(snapshot)
}

/// Decodes html entities and trims; blank values become `None`
fn clean_text(raw: &str) -> Option<String> {
    let decoded = html_escape::decode_html_entities(raw);
    let trimmed = decoded.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_owned())
}
