//! Shared handler state.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::auth::SessionStore;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::gallery::{AlbumSource, HttpAlbumSource};
use crate::storage::Storage;

/// State cloned into every handler.
///
/// The storage mutex is never held across an await.
#[derive(Clone)]
pub struct AppState {
    storage: Arc<Mutex<Storage>>,
    config: Arc<Config>,
    sessions: Arc<SessionStore>,
    albums: Option<Arc<dyn AlbumSource>>,
}

impl AppState {
    /// Build state from an open store and loaded configuration.
    ///
    /// Gallery sync is enabled when `gallery.sync_endpoint` is set.
    ///
    /// # Errors
    ///
    /// Returns an error if the album-sync HTTP client cannot be built.
    pub fn new(storage: Storage, config: Config) -> Result<Self> {
        let albums = match &config.gallery.sync_endpoint {
            Some(endpoint) => {
                let source = HttpAlbumSource::new(endpoint.clone(), config.request_timeout())?;
                Some(Arc::new(source) as Arc<dyn AlbumSource>)
            }
            None => None,
        };

        Ok(Self {
            storage: Arc::new(Mutex::new(storage)),
            sessions: Arc::new(SessionStore::new(config.session_ttl())),
            config: Arc::new(config),
            albums,
        })
    }

    /// Replace the album source.
    #[must_use]
    pub fn with_album_source(mut self, source: Arc<dyn AlbumSource>) -> Self {
        self.albums = Some(source);
        self
    }

    /// Lock the store.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock is poisoned.
    pub fn storage(&self) -> Result<MutexGuard<'_, Storage>> {
        self.storage
            .lock()
            .map_err(|_| Error::internal("storage lock poisoned"))
    }

    /// The store mutex itself, for work that locks after an await.
    #[must_use]
    pub fn storage_mutex(&self) -> &Mutex<Storage> {
        &self.storage
    }

    /// Loaded configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Admin sessions.
    #[must_use]
    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// The album source, if gallery sync is configured.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotConfigured`] when no source is set.
    pub fn albums(&self) -> Result<&dyn AlbumSource> {
        self.albums
            .as_deref()
            .ok_or(Error::NotConfigured {
                feature: "gallery sync",
            })
    }
}

impl fmt::Debug for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .field("sessions", &self.sessions)
            .field("albums", &self.albums.is_some())
            .finish_non_exhaustive()
    }
}
