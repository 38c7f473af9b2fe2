use ::listenbrainz::raw::request::{
    Payload,
    TrackMetadata,
};
use async_trait::async_trait;
use lb_scrobbler_core::ListenData;
use serde_json::{
    Map,
    Value,
};

use crate::{
    Error,
    Result,
};

mod listenbrainz;
pub use self::listenbrainz::ListenBrainzClient;

pub const SUBMISSION_CLIENT: &str = "lb-moode-scrobbler";

/// A single entry ready to send to the service
pub type Listen = Payload<String>;

/// The remote scrobble service
///
/// Batches are all-or-nothing: an error means none of the listens were accepted.
#[async_trait]
pub trait Scrobbler: Send + Sync {
    /// Checks the configured token with the service
    async fn authenticate(&self) -> Result<()>;

    async fn submit_now_playing(&self, track: Listen) -> Result<()>;

    async fn submit_one(&self, listen: Listen) -> Result<()>;

    async fn submit_batch(&self, listens: Vec<Listen>) -> Result<()>;
}


/// Builds a submittable payload from any listen-like value
///
/// # Errors
///
/// [`Error::Validation`] if the track or artist name is blank.
pub fn payload<L: ListenData + ?Sized>(listen: &L) -> Result<Listen> {
    let track_name = listen.track_name().trim();
    let artist_name = listen.artist_name().trim();
    if track_name.is_empty() {
        return Err(Error::Validation("track name"));
    }
    if artist_name.is_empty() {
        return Err(Error::Validation("artist name"));
    }

    Ok(Payload {
        listened_at: listen.listened_at(),
        track_metadata: TrackMetadata {
            track_name: track_name.to_owned(),
            artist_name: artist_name.to_owned(),
            release_name: listen.release_name().map(str::to_owned),
            additional_info: additional_info(listen),
        },
    })
}

fn additional_info<L: ListenData + ?Sized>(listen: &L) -> Option<Map<String, Value>> {
    let mut info = Map::new();
    info.insert("listening_from".to_owned(), listen.listening_from().into());
    info.insert("submission_client".to_owned(), SUBMISSION_CLIENT.into());
    info.insert("submission_client_version".to_owned(), env!("CARGO_PKG_VERSION").into());
    if let Some(number) = listen.track_number() {
        info.insert("tracknumber".to_owned(), number.into());
    }
    Some(info)
}
