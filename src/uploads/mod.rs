/**
 * Media Uploads
 *
 * Multipart file fields are written to the local upload directory and served
 * back under the `/uploads` path. Stored names are `{millis}-{original}` with
 * the original name sanitized to a safe character set.
 */

use std::path::PathBuf;

use axum::extract::multipart::Field;
use chrono::Utc;

use crate::error::ApiError;

/// Where uploaded media lands on disk, and the URL prefix it is served under
#[derive(Clone, Debug)]
pub struct UploadStore {
    dir: PathBuf,
}

impl UploadStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory uploaded files are written to
    pub fn dir(&self) -> &PathBuf {
        &self.dir
    }

    /// Create the upload directory if it does not exist yet
    pub async fn ensure_dir(&self) -> std::io::Result<()> {
        tokio::fs::create_dir_all(&self.dir).await
    }

    /// Persist one multipart file field.
    ///
    /// Returns the public URL path (`/uploads/<name>`) to store on the entity.
    pub async fn store(&self, field: Field<'_>) -> Result<String, ApiError> {
        let original = field.file_name().unwrap_or("upload").to_string();
        let name = format!(
            "{}-{}",
            Utc::now().timestamp_millis(),
            sanitize_file_name(&original)
        );

        let data = field.bytes().await.map_err(|e| {
            tracing::warn!("Failed to read upload body: {:?}", e);
            ApiError::validation("Failed to read uploaded file")
        })?;

        if data.is_empty() {
            return Err(ApiError::validation("No file uploaded."));
        }

        let path = self.dir.join(&name);
        tokio::fs::write(&path, &data).await.map_err(|e| {
            tracing::error!("Failed to write upload to {:?}: {:?}", path, e);
            ApiError::Internal("Failed to store uploaded file".to_string())
        })?;

        tracing::debug!("Stored upload {} ({} bytes)", name, data.len());
        Ok(format!("/uploads/{}", name))
    }
}

/// Reduce a client-supplied file name to a safe character set.
///
/// Path separators and anything outside `[A-Za-z0-9._-]` become `_`, so the
/// stored name cannot escape the upload directory.
pub fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();

    // A name of only dots would resolve to a relative path component
    if cleaned.trim_matches('.').is_empty() {
        "upload".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_keeps_safe_names() {
        assert_eq!(sanitize_file_name("photo.jpg"), "photo.jpg");
        assert_eq!(sanitize_file_name("my-clip_2.mp4"), "my-clip_2.mp4");
    }

    #[test]
    fn test_sanitize_strips_path_components() {
        assert_eq!(sanitize_file_name("../../etc/passwd"), ".._.._etc_passwd");
        assert_eq!(sanitize_file_name("a/b\\c.png"), "a_b_c.png");
    }

    #[test]
    fn test_sanitize_rejects_dot_only_names() {
        assert_eq!(sanitize_file_name(".."), "upload");
        assert_eq!(sanitize_file_name("..."), "upload");
    }

    #[test]
    fn test_sanitize_replaces_spaces_and_unicode() {
        assert_eq!(sanitize_file_name("my photo (1).jpg"), "my_photo__1_.jpg");
    }
}
