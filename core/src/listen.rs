use serde::{
    Deserialize,
    Serialize,
};

use crate::{
    ListenData,
    TrackSnapshot,
    LISTENING_FROM,
};

/// A listen waiting in the local cache for a successful submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingListen {
    pub track_name: String,
    pub artist_name: String,
    #[serde(default)]
    pub release_name: Option<String>,
    pub listened_at: i64,
    #[serde(default = "default_listening_from")]
    pub listening_from: String,
    #[serde(default)]
    pub tracknumber: Option<u32>,
}

impl PendingListen {
    pub fn from_track(track: &TrackSnapshot, listened_at: i64) -> Self {
        Self {
            track_name: track.title.clone(),
            artist_name: track.artist.clone(),
            release_name: track.album.clone(),
            listened_at,
            listening_from: LISTENING_FROM.to_owned(),
            tracknumber: track.track_number(),
        }
    }
}

impl ListenData for PendingListen {
    fn listened_at(&self) -> Option<i64> { Some(self.listened_at) }

    fn track_name(&self) -> &str { self.track_name.as_str() }

    fn artist_name(&self) -> &str { self.artist_name.as_str() }

    fn release_name(&self) -> Option<&str> { self.release_name.as_deref().filter(|r| !r.is_empty()) }

    fn track_number(&self) -> Option<u32> { self.tracknumber }

    fn listening_from(&self) -> &str { self.listening_from.as_str() }
}

fn default_listening_from() -> String { LISTENING_FROM.to_owned() }


#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_de_legacy_record() {
        // Records written before track numbers were cached
        const SAMPLE: &str = r#"{
            "track_name": "Burn Brighter",
            "artist_name": "Lansdowne",
            "release_name": "",
            "listened_at": 1531090963,
            "listening_from": "moOde audio player"
        }"#;

        let listen: PendingListen = serde_json::from_str(SAMPLE).expect("Failed to parse listen");
        assert_eq!(listen.tracknumber, None);
        assert_eq!(listen.release_name.as_deref(), Some(""));
        assert_eq!(ListenData::release_name(&listen), None);
        assert_eq!(ListenData::listened_at(&listen), Some(1_531_090_963));
    }

    #[test]
    fn test_ser_field_names() {
        let track = TrackSnapshot {
            title: "Burn Brighter".to_owned(),
            artist: "Lansdowne".to_owned(),
            track: Some("4".to_owned()),
            ..Default::default()
        };
        let value = serde_json::to_value(PendingListen::from_track(&track, 1_669_318_360)).unwrap();

        assert_eq!(
            value,
            serde_json::json!({
                "track_name": "Burn Brighter",
                "artist_name": "Lansdowne",
                "release_name": null,
                "listened_at": 1_669_318_360,
                "listening_from": "moOde audio player",
                "tracknumber": 4,
            })
        );
    }
}
