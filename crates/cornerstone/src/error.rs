//! Crate-wide error type.
//!
//! Every fallible operation returns [`Result`]. Status codes for the HTTP
//! API are assigned in `server::error`.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by cornerstone.
#[derive(Error, Debug)]
pub enum Error {
    /// The database file could not be opened.
    #[error("cannot open database {path}: {source}")]
    DatabaseOpen {
        /// Database file.
        path: PathBuf,
        /// Cause reported by `SQLite`.
        #[source]
        source: rusqlite::Error,
    },

    /// Any other `SQLite` failure.
    #[error("database error: {0}")]
    DatabaseQuery(#[from] rusqlite::Error),

    /// The schema could not be brought to the current version.
    #[error("schema migration failed: {message}")]
    DatabaseMigration {
        /// What went wrong.
        message: String,
    },

    /// Figment could not build the configuration.
    #[error("cannot load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// A configuration value is out of range.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Offending key and why.
        message: String,
    },

    /// An optional integration was used without being configured.
    #[error("{feature} is not configured")]
    NotConfigured {
        /// Name of the integration.
        feature: &'static str,
    },

    /// No document with this id.
    #[error("{collection}/{id} not found")]
    NotFound {
        /// Collection searched.
        collection: String,
        /// Requested id.
        id: String,
    },

    /// A document failed validation; nothing was written.
    #[error("invalid document: {message}")]
    InvalidDocument {
        /// Which field and why.
        message: String,
    },

    /// Bad passcode or unknown session token.
    #[error("unauthorized")]
    Unauthorized,

    /// An upload was refused before touching disk.
    #[error("upload rejected: {reason}")]
    UploadRejected {
        /// Why.
        reason: String,
    },

    /// An uploaded file is bigger than `uploads.max_upload_bytes`.
    #[error("upload of {size} bytes exceeds limit of {limit} bytes")]
    UploadTooLarge {
        /// Bytes received.
        size: usize,
        /// Bytes allowed.
        limit: usize,
    },

    /// A request body hit the server's body limit.
    #[error("request body exceeds limit of {limit} bytes")]
    PayloadTooLarge {
        /// Bytes allowed.
        limit: usize,
    },

    /// The upload target does not take this content type.
    #[error("unsupported content type '{content_type}' for {target}")]
    UnsupportedMediaType {
        /// Upload target.
        target: &'static str,
        /// Content type as sent.
        content_type: String,
    },

    /// The album-sync endpoint answered with an error or garbage.
    #[error("album sync failed: {message}")]
    AlbumSync {
        /// What went wrong.
        message: String,
    },

    /// Transport failure talking to the album-sync endpoint.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Filesystem failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A data or upload directory could not be created.
    #[error("cannot create directory {path}: {source}")]
    DirectoryCreate {
        /// Directory that was requested.
        path: PathBuf,
        /// Cause.
        #[source]
        source: std::io::Error,
    },

    /// JSON encoding or decoding failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A broken invariant, such as a poisoned lock.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Shorthand for [`Error::Internal`].
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Shorthand for [`Error::NotFound`].
    #[must_use]
    pub fn not_found(collection: impl ToString, id: impl Into<String>) -> Self {
        Self::NotFound {
            collection: collection.to_string(),
            id: id.into(),
        }
    }

    /// Shorthand for [`Error::InvalidDocument`].
    #[must_use]
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidDocument {
            message: message.into(),
        }
    }

    /// Shorthand for [`Error::UploadRejected`].
    #[must_use]
    pub fn upload_rejected(reason: impl Into<String>) -> Self {
        Self::UploadRejected {
            reason: reason.into(),
        }
    }

    /// Shorthand for [`Error::AlbumSync`].
    #[must_use]
    pub fn album_sync(message: impl Into<String>) -> Self {
        Self::AlbumSync {
            message: message.into(),
        }
    }

    /// Whether the caller sent something wrong, as opposed to the server
    /// or an upstream failing.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::NotFound { .. }
                | Self::InvalidDocument { .. }
                | Self::Unauthorized
                | Self::UploadRejected { .. }
                | Self::UploadTooLarge { .. }
                | Self::PayloadTooLarge { .. }
                | Self::UnsupportedMediaType { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        assert_eq!(Error::Unauthorized.to_string(), "unauthorized");
        assert_eq!(
            Error::not_found("pages", "about").to_string(),
            "pages/about not found"
        );
        assert_eq!(
            Error::NotConfigured {
                feature: "gallery sync"
            }
            .to_string(),
            "gallery sync is not configured"
        );
        assert_eq!(
            Error::PayloadTooLarge { limit: 64 }.to_string(),
            "request body exceeds limit of 64 bytes"
        );
    }

    #[test]
    fn test_client_errors() {
        assert!(Error::invalid("missing title").is_client_error());
        assert!(Error::Unauthorized.is_client_error());
        assert!(Error::UploadTooLarge { size: 10, limit: 5 }.is_client_error());
        assert!(!Error::internal("boom").is_client_error());
        assert!(!Error::album_sync("timeout").is_client_error());
        assert!(!Error::NotConfigured { feature: "x" }.is_client_error());
    }

    #[test]
    fn test_upload_messages_name_the_problem() {
        let msg = Error::UploadTooLarge {
            size: 2048,
            limit: 1024,
        }
        .to_string();
        assert!(msg.contains("2048") && msg.contains("1024"));

        let msg = Error::UnsupportedMediaType {
            target: "brochure",
            content_type: "image/png".to_string(),
        }
        .to_string();
        assert!(msg.contains("brochure") && msg.contains("image/png"));
    }

    #[test]
    fn test_conversions() {
        let err: Error = serde_json::from_str::<u32>("nope").unwrap_err().into();
        assert!(matches!(err, Error::Json(_)));

        let err: Error = std::io::Error::other("disk full").into();
        assert!(err.to_string().contains("disk full"));

        let err: Error = rusqlite::Connection::open_in_memory()
            .unwrap()
            .execute("NOT SQL", [])
            .unwrap_err()
            .into();
        assert!(matches!(err, Error::DatabaseQuery(_)));
    }
}
