use std::path::Path;

use uuid::Uuid;

use crate::{
    constants::{MEDIA_URL, RECIPE_IMAGE_DIR},
    error::{Error, HtmlError},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Jpeg,
    Png,
    Gif,
    WebP,
    Bmp,
}

impl ImageFormat {
    /// Detects the format from the file signature; the client's filename and
    /// content type are not trusted.
    pub fn sniff(data: &[u8]) -> Option<Self> {
        match data {
            [0xFF, 0xD8, 0xFF, ..] => Some(Self::Jpeg),
            [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, ..] => Some(Self::Png),
            [b'G', b'I', b'F', b'8', b'7' | b'9', b'a', ..] => Some(Self::Gif),
            [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => Some(Self::WebP),
            [b'B', b'M', ..] if data.len() > 26 => Some(Self::Bmp),
            _ => None,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "jpg",
            ImageFormat::Png => "png",
            ImageFormat::Gif => "gif",
            ImageFormat::WebP => "webp",
            ImageFormat::Bmp => "bmp",
        }
    }
}

/// Public URL of a file stored under the media root.
pub fn media_url(path: &str) -> String {
    format!("{MEDIA_URL}{}", path.trim_start_matches('/'))
}

/// Validates and writes an uploaded recipe image under a fresh uuid name.
/// Returns the path relative to `media_root`.
pub async fn save_recipe_image(media_root: &Path, data: &[u8]) -> Result<String, Error> {
    let format = ImageFormat::sniff(data).ok_or(Error::field(
        "image",
        "Upload a valid image. The file you uploaded was either not an image or a corrupted image.",
    ))?;

    let relative = format!("{RECIPE_IMAGE_DIR}/{}.{}", Uuid::new_v4(), format.extension());
    let target = media_root.join(&relative);

    if let Some(parent) = target.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(|e| {
            log::error!("Failed to create {}: {e}", parent.display());
            HtmlError::Internal.default()
        })?;
    }

    tokio::fs::write(&target, data).await.map_err(|e| {
        log::error!("Failed to write {}: {e}", target.display());
        HtmlError::Internal.default()
    })?;

    log::debug!("Stored {} bytes at {}", data.len(), target.display());

    Ok(relative)
}

#[cfg(test)]
mod tests {
    use super::*;

    const JPEG: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F'];

    #[test]
    fn sniffs_common_formats() {
        assert_eq!(ImageFormat::sniff(JPEG), Some(ImageFormat::Jpeg));
        assert_eq!(
            ImageFormat::sniff(b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR"),
            Some(ImageFormat::Png)
        );
        assert_eq!(ImageFormat::sniff(b"GIF89a\x01\x00"), Some(ImageFormat::Gif));
        assert_eq!(
            ImageFormat::sniff(b"RIFF\x24\x00\x00\x00WEBPVP8 "),
            Some(ImageFormat::WebP)
        );
    }

    #[test]
    fn rejects_non_images() {
        assert_eq!(ImageFormat::sniff(b"notanimage"), None);
        assert_eq!(ImageFormat::sniff(b""), None);
        assert_eq!(ImageFormat::sniff(b"BM"), None);
    }

    #[test]
    fn media_url_is_prefixed() {
        assert_eq!(
            media_url("uploads/recipe/a.jpg"),
            "/media/uploads/recipe/a.jpg"
        );
    }

    #[tokio::test]
    async fn saves_valid_image_under_media_root() {
        let root = tempfile::tempdir().unwrap();
        let relative = save_recipe_image(root.path(), JPEG).await.unwrap();

        assert!(relative.starts_with("uploads/recipe/"));
        assert!(relative.ends_with(".jpg"));
        assert!(root.path().join(&relative).exists());
    }

    #[tokio::test]
    async fn refuses_to_save_non_image() {
        let root = tempfile::tempdir().unwrap();
        let error = save_recipe_image(root.path(), b"notanimage").await.unwrap_err();

        assert_eq!(error.code, 400);
        assert!(error.fields.unwrap().contains_key("image"));
        assert!(!root.path().join(RECIPE_IMAGE_DIR).exists());
    }
}
