//! Fixed-path file uploads.
//!
//! Each [`UploadTarget`] owns a single file name in the upload directory.
//! A new upload replaces the old file.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{Error, Result};

/// Where an upload lands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadTarget {
    /// Portrait shown on the about page.
    Headshot,
    /// Banner image on the home page.
    Hero,
    /// Site logo.
    Logo,
    /// Downloadable program brochure.
    Brochure,
}

impl UploadTarget {
    /// All targets.
    pub const ALL: [UploadTarget; 4] = [Self::Headshot, Self::Hero, Self::Logo, Self::Brochure];

    /// Name used in URLs.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Headshot => "headshot",
            Self::Hero => "hero",
            Self::Logo => "logo",
            Self::Brochure => "brochure",
        }
    }

    /// File name the target is stored under.
    #[must_use]
    pub fn file_name(&self) -> &'static str {
        match self {
            Self::Headshot => "headshot.jpg",
            Self::Hero => "hero.jpg",
            Self::Logo => "logo.png",
            Self::Brochure => "brochure.pdf",
        }
    }

    /// Whether the target accepts a file of `content_type`.
    ///
    /// Parameters such as `; charset=...` are ignored.
    #[must_use]
    pub fn accepts(&self, content_type: &str) -> bool {
        let essence = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        match self {
            Self::Headshot | Self::Hero | Self::Logo => {
                essence.len() > "image/".len() && essence.starts_with("image/")
            }
            Self::Brochure => essence == "application/pdf",
        }
    }

    /// URL the stored file is served at.
    #[must_use]
    pub fn public_url(&self, public_path: &str) -> String {
        format!("{}/{}", public_path.trim_end_matches('/'), self.file_name())
    }
}

impl fmt::Display for UploadTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UploadTarget {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| Error::upload_rejected(format!("unknown upload target: {s}")))
    }
}

/// Result of a stored upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredUpload {
    /// Target written.
    pub target: UploadTarget,
    /// Path on disk.
    #[serde(skip)]
    pub path: PathBuf,
    /// URL the file is served at.
    pub url: String,
    /// Bytes written.
    pub bytes: usize,
}

/// Check an upload without touching the file system.
///
/// # Errors
///
/// Returns [`Error::UploadRejected`] for an empty body,
/// [`Error::UploadTooLarge`] over `limit`, and
/// [`Error::UnsupportedMediaType`] when the target does not take
/// `content_type`.
pub fn check_upload(
    target: UploadTarget,
    data: &[u8],
    content_type: &str,
    limit: usize,
) -> Result<()> {
    if data.is_empty() {
        return Err(Error::upload_rejected("file is empty"));
    }
    if data.len() > limit {
        return Err(Error::UploadTooLarge {
            size: data.len(),
            limit,
        });
    }
    if !target.accepts(content_type) {
        return Err(Error::UnsupportedMediaType {
            target: target.as_str(),
            content_type: content_type.to_string(),
        });
    }
    Ok(())
}

/// Write an upload to its fixed path in `dir`.
///
/// The data goes to a temporary sibling first and is renamed into place, so
/// a failed upload leaves the previous file untouched.
///
/// # Errors
///
/// Returns the errors of [`check_upload`], or an I/O error if the directory
/// cannot be created or the file cannot be written.
pub async fn save_upload(
    dir: &Path,
    public_path: &str,
    target: UploadTarget,
    data: &[u8],
    content_type: &str,
    limit: usize,
) -> Result<StoredUpload> {
    check_upload(target, data, content_type, limit)?;

    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|source| Error::DirectoryCreate {
            path: dir.to_path_buf(),
            source,
        })?;

    let path = dir.join(target.file_name());
    let temp = dir.join(format!(
        ".{}.{}.part",
        target.file_name(),
        Uuid::new_v4().simple()
    ));

    debug!("Writing {} bytes to {}", data.len(), temp.display());
    if let Err(e) = write_then_rename(&temp, &path, data).await {
        if let Err(cleanup) = tokio::fs::remove_file(&temp).await {
            if cleanup.kind() != std::io::ErrorKind::NotFound {
                warn!("Failed to remove {}: {}", temp.display(), cleanup);
            }
        }
        return Err(e);
    }

    info!("Stored {} upload ({} bytes)", target, data.len());
    Ok(StoredUpload {
        target,
        path,
        url: target.public_url(public_path),
        bytes: data.len(),
    })
}

async fn write_then_rename(temp: &Path, path: &Path, data: &[u8]) -> Result<()> {
    tokio::fs::write(temp, data).await?;
    tokio::fs::rename(temp, path).await?;
    Ok(())
}
