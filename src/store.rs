//! REST client for the external persistence API.
//!
//! ERROR HANDLING
//! ==============
//! Every failure here is non-fatal to the in-memory protocol. Writes are
//! fire-and-forget from the session's point of view — the caller logs a
//! warning and moves on, and the next user action naturally re-attempts.
//! Repeated appends of the same batch are acceptable; silent data loss is
//! not, so nothing is retried inline and nothing is swallowed unlogged.

#[cfg(test)]
#[path = "store_test.rs"]
mod store_test;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::SyncError;
use crate::message::{PlaybackUpdate, StrokeBatch};
use crate::recovery::Snapshot;

/// Body of a stroke append (`POST /strokes`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrokeRecord {
    /// Room the batch belongs to.
    pub room: String,
    /// The batch itself.
    #[serde(flatten)]
    pub batch: StrokeBatch,
}

/// Thin client for the stroke/playback persistence service.
#[derive(Debug, Clone)]
pub struct StoreClient {
    http: reqwest::Client,
    base_url: String,
}

impl StoreClient {
    /// Build a client for the service rooted at `base_url`.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self { http: reqwest::Client::new(), base_url }
    }

    /// Ordered stroke history for a room.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Store`] on transport failure and
    /// [`SyncError::StoreStatus`] on a non-success response.
    pub async fn fetch_strokes(&self, room: &str) -> Result<Vec<StrokeBatch>, SyncError> {
        let resp = self.http.get(self.strokes_url(room)).send().await?;
        if !resp.status().is_success() {
            return Err(SyncError::StoreStatus(resp.status()));
        }
        Ok(resp.json().await?)
    }

    /// Append one stroke record.
    ///
    /// # Errors
    ///
    /// See [`StoreClient::fetch_strokes`].
    pub async fn append_stroke(&self, room: &str, batch: StrokeBatch) -> Result<(), SyncError> {
        let record = StrokeRecord { room: room.to_owned(), batch };
        let resp = self
            .http
            .post(format!("{}/strokes", self.base_url))
            .json(&record)
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(SyncError::StoreStatus(resp.status()));
        }
        Ok(())
    }

    /// Delete a room's entire stroke history.
    ///
    /// # Errors
    ///
    /// See [`StoreClient::fetch_strokes`].
    pub async fn clear_strokes(&self, room: &str) -> Result<(), SyncError> {
        let resp = self.http.delete(self.strokes_url(room)).send().await?;
        if !resp.status().is_success() {
            return Err(SyncError::StoreStatus(resp.status()));
        }
        Ok(())
    }

    /// Last known playback row for a room, or `None` if the service has no
    /// row yet (404).
    ///
    /// # Errors
    ///
    /// See [`StoreClient::fetch_strokes`].
    pub async fn fetch_playback(&self, room: &str) -> Result<Option<PlaybackUpdate>, SyncError> {
        let resp = self.http.get(self.playback_url(room)).send().await?;
        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !resp.status().is_success() {
            return Err(SyncError::StoreStatus(resp.status()));
        }
        Ok(Some(resp.json().await?))
    }

    /// Opportunistically update a room's playback row.
    ///
    /// # Errors
    ///
    /// See [`StoreClient::fetch_strokes`].
    pub async fn update_playback(&self, room: &str, update: &PlaybackUpdate) -> Result<(), SyncError> {
        let resp = self
            .http
            .patch(self.playback_url(room))
            .json(update)
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(SyncError::StoreStatus(resp.status()));
        }
        Ok(())
    }

    /// Both authoritative reads for late-joiner recovery, degrading each to
    /// empty on failure so a dead store never blocks a session from going
    /// live.
    pub async fn fetch_snapshot(&self, room: &str) -> Snapshot {
        let strokes = match self.fetch_strokes(room).await {
            Ok(strokes) => strokes,
            Err(e) => {
                warn!(room, error = %e, "stroke history fetch failed; seeding empty");
                Vec::new()
            }
        };
        let playback = match self.fetch_playback(room).await {
            Ok(row) => row,
            Err(e) => {
                warn!(room, error = %e, "playback row fetch failed; seeding empty");
                None
            }
        };
        Snapshot { strokes, playback }
    }

    fn strokes_url(&self, room: &str) -> String {
        format!("{}/strokes/{room}", self.base_url)
    }

    fn playback_url(&self, room: &str) -> String {
        format!("{}/rooms/{room}/playback", self.base_url)
    }
}
