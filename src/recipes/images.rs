use crate::config::MediaConfig;
use anyhow::{Context, Result};
use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use uuid::Uuid;

const IMAGE_DIR: &str = "img";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Png,
    Jpeg,
    Gif,
    Webp,
}

impl ImageFormat {
    fn sniff(bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(b"\x89PNG\r\n\x1a\n") {
            Some(Self::Png)
        } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
            Some(Self::Jpeg)
        } else if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
            Some(Self::Gif)
        } else if bytes.len() >= 12 && &bytes[..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
            Some(Self::Webp)
        } else {
            None
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
            Self::Gif => "gif",
            Self::Webp => "webp",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    pub format: ImageFormat,
    pub bytes: Vec<u8>,
}

/// Decodes `data:<mime>;base64,<payload>` or bare base64 into a recognised image.
pub fn decode_image(payload: &str) -> Option<DecodedImage> {
    let payload = payload.trim();
    let encoded = match payload.strip_prefix("data:") {
        Some(rest) => {
            let (header, data) = rest.split_once(',')?;
            if !header.ends_with(";base64") {
                return None;
            }
            data
        }
        None => payload,
    };

    let bytes = BASE64.decode(encoded.trim()).ok()?;
    let format = ImageFormat::sniff(&bytes)?;
    Some(DecodedImage { format, bytes })
}

/// Recipe images on local disk under the media root.
#[derive(Debug, Clone)]
pub struct ImageStore {
    root: PathBuf,
    url_prefix: String,
}

impl ImageStore {
    pub fn new(root: impl Into<PathBuf>, url_prefix: &str) -> Self {
        Self {
            root: root.into(),
            url_prefix: url_prefix.trim_end_matches('/').to_string(),
        }
    }

    pub fn from_config(config: &MediaConfig) -> Self {
        Self::new(&config.root, &config.url)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn url_prefix(&self) -> &str {
        &self.url_prefix
    }

    /// Writes the image and returns its path relative to the media root.
    pub async fn save(&self, image: &DecodedImage) -> Result<String> {
        let dir = self.root.join(IMAGE_DIR);
        tokio::fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("Failed to create image directory: {}", dir.display()))?;

        let file_name = format!("{}.{}", Uuid::new_v4(), image.format.extension());
        let path = dir.join(&file_name);
        tokio::fs::write(&path, &image.bytes)
            .await
            .with_context(|| format!("Failed to write image: {}", path.display()))?;

        debug!(path = %path.display(), "Saved recipe image");
        Ok(format!("{IMAGE_DIR}/{file_name}"))
    }

    /// Deletes a stored image. Failures are logged and otherwise ignored.
    pub async fn remove(&self, relative: &str) {
        if relative.is_empty() || relative.contains("..") {
            return;
        }
        let path = self.root.join(relative);
        if let Err(e) = tokio::fs::remove_file(&path).await {
            warn!(path = %path.display(), error = %e, "Failed to remove recipe image");
        }
    }

    pub fn url(&self, relative: &str) -> String {
        format!("{}/{}", self.url_prefix, relative)
    }
}

#[cfg(test)]
pub(crate) const TINY_PNG: &str = "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNk+M9QDwADhgGAWjR9awAAAABJRU5ErkJggg==";

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(format!("data:image/png;base64,{TINY_PNG}"), Some(ImageFormat::Png))]
    #[case(TINY_PNG.to_string(), Some(ImageFormat::Png))]
    #[case(BASE64.encode([0xFF, 0xD8, 0xFF, 0xE0, 0, 0]), Some(ImageFormat::Jpeg))]
    #[case(BASE64.encode(b"GIF89a\x01\x00"), Some(ImageFormat::Gif))]
    #[case(BASE64.encode(b"RIFF\x00\x00\x00\x00WEBPVP8 "), Some(ImageFormat::Webp))]
    #[case(BASE64.encode(b"plain text"), None)]
    #[case("data:image/png,raw".to_string(), None)]
    #[case("%%%".to_string(), None)]
    fn test_decode_image(#[case] payload: String, #[case] expected: Option<ImageFormat>) {
        assert_eq!(decode_image(&payload).map(|image| image.format), expected);
    }

    #[tokio::test]
    async fn test_save_and_remove() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let store = ImageStore::new(dir.path(), "/media/");
        let image = decode_image(TINY_PNG).context("fixture should decode")?;

        let relative = store.save(&image).await?;
        assert!(relative.starts_with("img/"));
        assert!(relative.ends_with(".png"));
        assert!(dir.path().join(&relative).exists());
        assert_eq!(store.url(&relative), format!("/media/{relative}"));

        store.remove(&relative).await;
        assert!(!dir.path().join(&relative).exists());

        Ok(())
    }
}
