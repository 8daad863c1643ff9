// Still image loading for file uploads

use crate::error::{EmotionDetectorError, Result};
use crate::models::RasterImage;
use std::path::Path;
use tracing::debug;

/// Container formats accepted for uploads
pub const ALLOWED_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

/// Rejects files whose extension is not jpg, jpeg or png
pub fn check_extension<P: AsRef<Path>>(path: P) -> Result<()> {
    let ext = path
        .as_ref()
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    if ALLOWED_EXTENSIONS.contains(&ext.as_str()) {
        Ok(())
    } else {
        Err(EmotionDetectorError::UnsupportedFormat(if ext.is_empty() {
            format!("{:?}", path.as_ref())
        } else {
            ext
        }))
    }
}

/// Loads and decodes an uploaded image file to RGB
pub fn load_upload<P: AsRef<Path>>(path: P) -> Result<RasterImage> {
    let path = path.as_ref();
    check_extension(path)?;

    let img = image::open(path).map_err(|e| {
        EmotionDetectorError::ImageLoad(format!("Failed to load image from {path:?}: {e}"))
    })?;
    let raster = RasterImage::from_dynamic_image(img);
    debug!(
        "Loaded {:?} ({}x{})",
        path, raster.width, raster.height
    );
    Ok(raster)
}

/// Decodes an in-memory upload; `name` supplies the extension check
pub fn decode_upload(name: &str, bytes: &[u8]) -> Result<RasterImage> {
    check_extension(name)?;
    let img = image::load_from_memory(bytes)?;
    Ok(RasterImage::from_dynamic_image(img))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgb, RgbImage};
    use std::io::Cursor;

    fn encoded_png() -> Vec<u8> {
        let img = RgbImage::from_pixel(4, 2, Rgb([10, 20, 30]));
        let mut bytes = Cursor::new(Vec::new());
        img.write_to(&mut bytes, ImageFormat::Png).unwrap();
        bytes.into_inner()
    }

    #[test]
    fn test_allowed_extensions() {
        for name in ["face.jpg", "face.jpeg", "face.png", "FACE.JPG", "dir/face.Png"] {
            assert!(check_extension(name).is_ok(), "{name}");
        }
    }

    #[test]
    fn test_rejected_extensions() {
        for name in ["face.gif", "face.bmp", "face", "face.png.txt"] {
            let err = check_extension(name).unwrap_err();
            assert!(matches!(err, EmotionDetectorError::UnsupportedFormat(_)), "{name}");
        }
    }

    #[test]
    fn test_decode_upload() {
        let raster = decode_upload("face.png", &encoded_png()).unwrap();
        assert_eq!((raster.width, raster.height), (4, 2));
        assert_eq!(&raster.data[..3], &[10, 20, 30]);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(decode_upload("face.jpg", b"not an image").is_err());
    }

    #[test]
    fn test_load_upload_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("face.png");
        std::fs::write(&path, encoded_png()).unwrap();

        let raster = load_upload(&path).unwrap();
        assert_eq!(raster.data.len(), 4 * 2 * 3);

        let gif = dir.path().join("face.gif");
        std::fs::write(&gif, b"GIF89a").unwrap();
        assert!(matches!(
            load_upload(&gif),
            Err(EmotionDetectorError::UnsupportedFormat(_))
        ));
    }
}
