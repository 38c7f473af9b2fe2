mod listen;
mod track;

pub use listen::*;
pub use track::*;

/// Origin label attached to every listen this program submits
pub const LISTENING_FROM: &str = "moOde audio player";

/// Anything that can be turned into a listenbrainz payload
pub trait ListenData {
    /// Epoch seconds; `None` for "playing now" notices
    fn listened_at(&self) -> Option<i64> { None }

    fn track_name(&self) -> &str;
    fn artist_name(&self) -> &str;

    fn release_name(&self) -> Option<&str> { None }

    fn track_number(&self) -> Option<u32> { None }

    fn listening_from(&self) -> &str { LISTENING_FROM }
}
