use std::fmt;

use crate::ListenData;

/// Normalized `state=` value of a now-playing snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackState {
    Play,
    Pause,
    Stop,
    Other(String),
}

impl PlaybackState {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Play => "play",
            Self::Pause => "pause",
            Self::Stop => "stop",
            Self::Other(s) => s.as_str(),
        }
    }
}

impl From<&str> for PlaybackState {
    fn from(value: &str) -> Self {
        let value = value.trim().to_lowercase();
        match value.as_str() {
            "play" => Self::Play,
            "pause" => Self::Pause,
            "stop" => Self::Stop,
            _ => Self::Other(value),
        }
    }
}

impl fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}


/// One validated reading of the now-playing source
///
/// `title` and `artist` are always non-empty; every other field is absent
/// rather than empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackSnapshot {
    pub title: String,
    pub artist: String,
    pub album: Option<String>,
    pub state: Option<PlaybackState>,
    pub track: Option<String>,
    pub date: Option<String>,
    pub composer: Option<String>,
    pub genre: Option<String>,
    pub duration: Option<String>,
    pub bitrate: Option<String>,
    pub encoded: Option<String>,
}

impl TrackSnapshot {
    pub fn is_playing(&self) -> bool { self.state == Some(PlaybackState::Play) }

    pub fn identity(&self) -> TrackIdentity {
        TrackIdentity {
            title: self.title.clone(),
            artist: self.artist.clone(),
            album: self.album.clone(),
        }
    }

    /// Compares only the (title, artist, album) triple
    pub fn same_track(&self, other: &Self) -> bool {
        self.title == other.title && self.artist == other.artist && self.album == other.album
    }

    /// Looks up a field by the key it is published under in the now-playing file
    pub fn field(&self, name: &str) -> Option<&str> {
        match name {
            "title" => Some(self.title.as_str()),
            "artist" => Some(self.artist.as_str()),
            "album" => self.album.as_deref(),
            "state" => self.state.as_ref().map(PlaybackState::as_str),
            "track" => self.track.as_deref(),
            "date" => self.date.as_deref(),
            "composer" => self.composer.as_deref(),
            "genre" => self.genre.as_deref(),
            "duration" => self.duration.as_deref(),
            "bitrate" => self.bitrate.as_deref(),
            "encoded" => self.encoded.as_deref(),
            _ => None,
        }
    }

    /// Leading digits of the `track` field, so `3/12` yields 3
    pub fn track_number(&self) -> Option<u32> {
        let track = self.track.as_deref()?.trim_start();
        let end = track.find(|c: char| !c.is_ascii_digit()).unwrap_or(track.len());
        track[..end].parse().ok()
    }
}

impl ListenData for TrackSnapshot {
    fn track_name(&self) -> &str { self.title.as_str() }

    fn artist_name(&self) -> &str { self.artist.as_str() }

    fn release_name(&self) -> Option<&str> { self.album.as_deref() }

    fn track_number(&self) -> Option<u32> { TrackSnapshot::track_number(self) }
}

impl fmt::Display for TrackSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{} by {}", self.title, self.artist) }
}


/// The part of a snapshot that decides whether two readings are the same play
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TrackIdentity {
    pub title: String,
    pub artist: String,
    pub album: Option<String>,
}

impl fmt::Display for TrackIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{} by {}", self.title, self.artist) }
}


#[cfg(test)]
mod test {
    use super::*;

    fn snapshot(track: Option<&str>) -> TrackSnapshot {
        TrackSnapshot {
            title: "Angel With A Shotgun".to_owned(),
            artist: "The Cab".to_owned(),
            album: Some("Symphony Soldier".to_owned()),
            track: track.map(str::to_owned),
            ..Default::default()
        }
    }

    #[test]
    fn test_state_lowercased() {
        assert_eq!(PlaybackState::from("PLAY"), PlaybackState::Play);
        assert_eq!(PlaybackState::from(" Pause "), PlaybackState::Pause);
        assert_eq!(PlaybackState::from("Buffering"), PlaybackState::Other("buffering".to_owned()));
    }

    #[test]
    fn test_track_number() {
        assert_eq!(snapshot(Some("7")).track_number(), Some(7));
        assert_eq!(snapshot(Some("3/12")).track_number(), Some(3));
        assert_eq!(snapshot(Some("side A")).track_number(), None);
        assert_eq!(snapshot(None).track_number(), None);
    }

    #[test]
    fn test_same_track_ignores_other_fields() {
        let mut other = snapshot(Some("1"));
        other.state = Some(PlaybackState::Play);
        other.bitrate = Some("320 kbps".to_owned());
        assert!(snapshot(None).same_track(&other));

        other.album = None;
        assert!(!snapshot(None).same_track(&other));
    }
}
