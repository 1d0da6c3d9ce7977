//! Photo gallery sync from a shared album.
//!
//! Photos are fetched from an album-sync service and mirrored into the
//! `photos` collection. Local ids are derived from the album URL and the
//! remote photo id, so syncing the same album twice updates in place.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::model::GalleryPhoto;
use crate::storage::Storage;

/// Prefix of ids given to synced photos.
const SYNC_ID_PREFIX: &str = "sync-";

/// A photo as reported by the album-sync service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlbumPhoto {
    /// Id within the remote album.
    pub id: String,
    /// Full-size image URL.
    pub url: String,
    /// Thumbnail URL.
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    /// Caption, if the album has one.
    #[serde(default)]
    pub caption: Option<String>,
    /// Capture time.
    #[serde(default)]
    pub taken_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct AlbumResponse {
    photos: Vec<AlbumPhoto>,
}

/// Somewhere album photos can be fetched from.
#[async_trait]
pub trait AlbumSource: Send + Sync {
    /// Fetch every photo in the shared album at `album_url`.
    async fn fetch(&self, album_url: &str) -> Result<Vec<AlbumPhoto>>;
}

/// Album source backed by an HTTP sync endpoint.
#[derive(Debug, Clone)]
pub struct HttpAlbumSource {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpAlbumSource {
    /// Create a source that POSTs to `endpoint`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("cornerstone/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }
}

#[async_trait]
impl AlbumSource for HttpAlbumSource {
    async fn fetch(&self, album_url: &str) -> Result<Vec<AlbumPhoto>> {
        debug!("Requesting album {} from {}", album_url, self.endpoint);
        let response = self
            .client
            .post(&self.endpoint)
            .json(&serde_json::json!({ "albumUrl": album_url }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::album_sync(format!(
                "sync endpoint returned {status}"
            )));
        }

        let body: AlbumResponse = response
            .json()
            .await
            .map_err(|e| Error::album_sync(format!("unreadable sync response: {e}")))?;
        Ok(body.photos)
    }
}

/// Counts from one sync.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    /// Photos returned by the album.
    pub fetched: usize,
    /// Photos added to the gallery.
    pub created: usize,
    /// Existing photos that changed.
    pub updated: usize,
    /// Existing photos that were already current.
    pub unchanged: usize,
    /// Photos removed because they left the album.
    pub removed: usize,
}

/// Check that `album_url` is an absolute http(s) URL.
///
/// # Errors
///
/// Returns [`Error::InvalidDocument`] otherwise.
pub fn validate_album_url(album_url: &str) -> Result<()> {
    match reqwest::Url::parse(album_url) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(()),
        _ => Err(Error::invalid(format!(
            "albumUrl must be an http(s) URL: {album_url}"
        ))),
    }
}

/// Local id of a photo synced from `album_url`.
#[must_use]
pub fn photo_id(album_url: &str, remote_id: &str) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(album_url.as_bytes());
    hasher.update(b"\n");
    hasher.update(remote_id.as_bytes());
    let hex = hasher.finalize().to_hex();
    format!("{SYNC_ID_PREFIX}{}", &hex[..16])
}

/// Mirror `photos` from `album_url` into storage.
///
/// Photos keep the album's order. A photo without a caption in the album
/// keeps any caption it already has locally. Photos previously synced from
/// the same album that are no longer in it are deleted. Photos from other
/// albums and hand-made photos are left alone.
///
/// # Errors
///
/// Returns an error if a storage operation fails.
pub fn apply_album(
    storage: &Storage,
    album_url: &str,
    photos: &[AlbumPhoto],
) -> Result<SyncReport> {
    let mut report = SyncReport {
        fetched: photos.len(),
        ..SyncReport::default()
    };

    let existing: Vec<GalleryPhoto> = storage
        .load_all::<GalleryPhoto>()?
        .into_iter()
        .filter(|p| p.album_url.as_deref() == Some(album_url))
        .collect();

    let mut seen = HashSet::new();
    let mut position: u32 = 0;
    for remote in photos {
        if remote.id.trim().is_empty() || remote.url.trim().is_empty() {
            warn!("Skipping album photo without id or url");
            continue;
        }
        let id = photo_id(album_url, &remote.id);
        if !seen.insert(id.clone()) {
            debug!("Skipping duplicate album photo {}", remote.id);
            continue;
        }

        let previous = existing.iter().find(|p| p.id == id);
        let caption = match (&remote.caption, previous) {
            (Some(caption), _) => caption.clone(),
            (None, Some(previous)) => previous.caption.clone(),
            (None, None) => String::new(),
        };
        let photo = GalleryPhoto {
            id,
            image_url: remote.url.clone(),
            thumbnail_url: remote.thumbnail_url.clone(),
            caption,
            taken_at: remote.taken_at,
            album_url: Some(album_url.to_string()),
            order: position,
        };
        position = position.saturating_add(1);

        match previous {
            Some(previous) if *previous == photo => report.unchanged += 1,
            Some(_) => {
                storage.save(&photo)?;
                report.updated += 1;
            }
            None => {
                storage.save(&photo)?;
                report.created += 1;
            }
        }
    }

    for stale in existing.iter().filter(|p| !seen.contains(&p.id)) {
        if storage.remove::<GalleryPhoto>(&stale.id)? {
            report.removed += 1;
        }
    }

    info!(
        "Synced album: {} fetched, {} created, {} updated, {} removed",
        report.fetched, report.created, report.updated, report.removed
    );
    Ok(report)
}

/// Fetch `album_url` from `source` and apply it to storage.
///
/// The storage lock is only taken after the fetch completes.
///
/// # Errors
///
/// Returns an error if the URL is invalid, the fetch fails, or a storage
/// operation fails.
pub async fn sync_album(
    source: &dyn AlbumSource,
    storage: &std::sync::Mutex<Storage>,
    album_url: &str,
) -> Result<SyncReport> {
    validate_album_url(album_url)?;
    let photos = source.fetch(album_url).await?;

    let storage = storage
        .lock()
        .map_err(|_| Error::internal("storage lock poisoned"))?;
    apply_album(&storage, album_url, &photos)
}
