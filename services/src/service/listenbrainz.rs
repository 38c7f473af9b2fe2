use std::{
    sync::Arc,
    time::Duration,
};

use async_trait::async_trait;
use listenbrainz::raw::{
    request::{
        ListenType,
        SubmitListens,
    },
    Client,
};
use log::{
    debug,
    warn,
};
use tokio::{
    task,
    time,
};
use uuid::Uuid;

use super::{
    Listen,
    Scrobbler,
};
use crate::{
    Error,
    Result,
};

/// [`Scrobbler`] backed by a listenbrainz compatible API
///
/// The underlying client blocks, so every request runs on tokio's blocking pool.
pub struct ListenBrainzClient {
    client: Arc<Client>,
    token: Arc<str>,
}

impl ListenBrainzClient {
    pub fn new(url: Option<String>, token: Uuid) -> Self {
        let client = url.map(Client::new_with_url).unwrap_or_else(Client::new);
        Self {
            client: Arc::new(client),
            token: token.as_hyphenated().to_string().into(),
        }
    }

    async fn submit(&self, listen_type: ListenType, payload: Vec<Listen>) -> Result<()> {
        let client = Arc::clone(&self.client);
        let token = Arc::clone(&self.token);
        let count = payload.len();

        let resp = blocking(move || {
            client.submit_listens(&token, SubmitListens {
                listen_type,
                payload: &payload,
            })
        })
        .await??;
        debug!("Submitted {count} listen(s)");

        if let Some(limit) = resp.rate_limit {
            if limit.remaining == 0 {
                warn!("API rate limit reached; Will continue in {} seconds...", limit.reset_in);
                time::sleep(Duration::from_secs(limit.reset_in)).await;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl Scrobbler for ListenBrainzClient {
    async fn authenticate(&self) -> Result<()> {
        let client = Arc::clone(&self.client);
        let token = Arc::clone(&self.token);

        let resp = blocking(move || client.validate_token(&token)).await??;
        if resp.valid {
            Ok(())
        } else {
            Err(listenbrainz::Error::InvalidToken.into())
        }
    }

    async fn submit_now_playing(&self, track: Listen) -> Result<()> { self.submit(ListenType::PlayingNow, vec![track]).await }

    async fn submit_one(&self, listen: Listen) -> Result<()> { self.submit(ListenType::Single, vec![listen]).await }

    async fn submit_batch(&self, listens: Vec<Listen>) -> Result<()> { self.submit(ListenType::Import, listens).await }
}

async fn blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    task::spawn_blocking(f).await.map_err(|e| Error::RemoteUnavailable(e.to_string()))
}
