/// Image sniffing, decoding and derived variants
use culicidae_core::{CatalogError, CatalogResult};
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const JPEG_MAGIC: [u8; 3] = [0xFF, 0xD8, 0xFF];
const PNG_MAGIC: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

/// Accepted upload formats, identified by content rather than file name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageKind {
    Jpeg,
    Png,
    Webp,
}

impl ImageKind {
    /// Detect the format from magic bytes
    pub fn detect(data: &[u8]) -> Option<Self> {
        if data.starts_with(&JPEG_MAGIC) {
            Some(ImageKind::Jpeg)
        } else if data.starts_with(&PNG_MAGIC) {
            Some(ImageKind::Png)
        } else if data.len() >= 12 && &data[0..4] == b"RIFF" && &data[8..12] == b"WEBP" {
            Some(ImageKind::Webp)
        } else {
            None
        }
    }

    /// Name used in `pipeline.allowed_formats`
    pub fn name(&self) -> &'static str {
        match self {
            ImageKind::Jpeg => "jpeg",
            ImageKind::Png => "png",
            ImageKind::Webp => "webp",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ImageKind::Jpeg => "jpg",
            ImageKind::Png => "png",
            ImageKind::Webp => "webp",
        }
    }

    fn image_format(&self) -> ImageFormat {
        match self {
            ImageKind::Jpeg => ImageFormat::Jpeg,
            ImageKind::Png => ImageFormat::Png,
            ImageKind::Webp => ImageFormat::WebP,
        }
    }

    /// Whether the configured allow-list names this format ("jpg" counts as "jpeg")
    pub fn is_allowed(&self, allowed: &[String]) -> bool {
        allowed.iter().any(|name| {
            let name = name.trim().to_ascii_lowercase();
            name == self.name() || name == self.extension()
        })
    }
}

/// Files written for one observation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageArtifacts {
    pub directory: PathBuf,
    pub original: PathBuf,
    /// Square JPEG variants, in configured size order
    pub variants: Vec<PathBuf>,
}

impl ImageArtifacts {
    pub fn files(&self) -> impl Iterator<Item = &PathBuf> {
        std::iter::once(&self.original).chain(self.variants.iter())
    }
}

/// Decode the upload; failures are validation errors
pub fn decode(data: &[u8], kind: ImageKind) -> CatalogResult<DynamicImage> {
    image::load_from_memory_with_format(data, kind.image_format()).map_err(|e| {
        CatalogError::validation(format!("image is not a valid {}: {}", kind.name(), e))
    })
}

/// Write `original.<ext>` plus one `<n>x<n>.jpg` per size into `directory`
pub fn write_artifacts(
    directory: &Path,
    original: &[u8],
    kind: ImageKind,
    image: &DynamicImage,
    sizes: &[u32],
) -> CatalogResult<ImageArtifacts> {
    std::fs::create_dir_all(directory)?;

    let original_path = directory.join(format!("original.{}", kind.extension()));
    std::fs::write(&original_path, original)?;

    let mut variants = Vec::with_capacity(sizes.len());
    for &size in sizes {
        let path = directory.join(format!("{}x{}.jpg", size, size));
        image
            .resize_exact(size, size, FilterType::Triangle)
            .to_rgb8()
            .save_with_format(&path, ImageFormat::Jpeg)
            .map_err(|e| {
                CatalogError::Io(std::io::Error::other(format!(
                    "failed to write {}: {}",
                    path.display(),
                    e
                )))
            })?;
        variants.push(path);
    }

    Ok(ImageArtifacts {
        directory: directory.to_path_buf(),
        original: original_path,
        variants,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgb};
    use std::io::Cursor;
    use tempfile::TempDir;

    fn encoded(format: ImageFormat) -> Vec<u8> {
        let img = ImageBuffer::from_fn(64, 48, |x, y| Rgb([x as u8 * 4, y as u8 * 5, 128u8]));
        let mut out = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(img)
            .write_to(&mut out, format)
            .unwrap();
        out.into_inner()
    }

    #[test]
    fn test_detect_formats() {
        assert_eq!(ImageKind::detect(&encoded(ImageFormat::Jpeg)), Some(ImageKind::Jpeg));
        assert_eq!(ImageKind::detect(&encoded(ImageFormat::Png)), Some(ImageKind::Png));
        assert_eq!(
            ImageKind::detect(b"RIFF\x10\x00\x00\x00WEBPVP8 "),
            Some(ImageKind::Webp)
        );
        assert_eq!(ImageKind::detect(b"GIF89a"), None);
        assert_eq!(ImageKind::detect(b""), None);
        // A .jpg name does not help if the bytes say otherwise
        assert_eq!(ImageKind::detect(b"%PDF-1.7"), None);
    }

    #[test]
    fn test_allowed_formats() {
        let allowed = vec!["JPG".to_string(), "png".to_string()];
        assert!(ImageKind::Jpeg.is_allowed(&allowed));
        assert!(ImageKind::Png.is_allowed(&allowed));
        assert!(!ImageKind::Webp.is_allowed(&allowed));
    }

    #[test]
    fn test_decode_rejects_truncated_image() {
        let mut jpeg = encoded(ImageFormat::Jpeg);
        jpeg.truncate(20);
        assert!(matches!(
            decode(&jpeg, ImageKind::Jpeg),
            Err(CatalogError::Validation(_))
        ));
    }

    #[test]
    fn test_write_artifacts() {
        let temp_dir = TempDir::new().unwrap();
        let png = encoded(ImageFormat::Png);
        let image = decode(&png, ImageKind::Png).unwrap();

        let dir = temp_dir.path().join("obs-1");
        let artifacts = write_artifacts(&dir, &png, ImageKind::Png, &image, &[224, 100]).unwrap();

        assert_eq!(artifacts.original, dir.join("original.png"));
        assert_eq!(artifacts.files().count(), 3);
        assert_eq!(std::fs::read(&artifacts.original).unwrap(), png);

        let thumb = image::open(dir.join("224x224.jpg")).unwrap();
        assert_eq!((thumb.width(), thumb.height()), (224, 224));
        let small = image::open(dir.join("100x100.jpg")).unwrap();
        assert_eq!((small.width(), small.height()), (100, 100));
    }
}
