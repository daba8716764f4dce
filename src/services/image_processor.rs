// src/services/image_processor.rs
use crate::errors::ReviveError;
use crate::models::{EncodedImage, InputImage};
use base64::{Engine as _, engine::general_purpose};
use image::{GenericImageView, ImageFormat};

const FALLBACK_MIME: &str = "application/octet-stream";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageInfo {
    pub width: u32,
    pub height: u32,
    pub mime_type: String,
}

pub struct ImageProcessor {
    max_bytes: usize,
}

impl ImageProcessor {
    pub fn new(max_bytes: usize) -> Self {
        Self { max_bytes }
    }

    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    /// Checks that an upload is a decodable photo and reports what it is.
    pub fn validate_image(&self, image: &InputImage) -> Result<ImageInfo, ReviveError> {
        if image.data.is_empty() {
            return Err(ReviveError::Validation("Uploaded image is empty".to_string()));
        }

        if image.data.len() > self.max_bytes {
            return Err(ReviveError::Validation(format!(
                "Uploaded image is {} bytes, limit is {}",
                image.data.len(),
                self.max_bytes
            )));
        }

        let img = image::load_from_memory(&image.data)
            .map_err(|e| ReviveError::ImageProcessing(format!("Invalid image format: {}", e)))?;

        let (width, height) = img.dimensions();

        Ok(ImageInfo {
            width,
            height,
            mime_type: self.media_type(image),
        })
    }

    /// Declared `image/*` type first, then the sniffed format.
    pub fn media_type(&self, image: &InputImage) -> String {
        if let Some(declared) = image
            .content_type
            .as_deref()
            .filter(|ct| ct.starts_with("image/"))
        {
            return declared.to_string();
        }

        image::guess_format(&image.data)
            .ok()
            .and_then(mime_for_format)
            .unwrap_or(FALLBACK_MIME)
            .to_string()
    }

    pub fn encode(&self, image: &InputImage) -> EncodedImage {
        EncodedImage {
            mime_type: self.media_type(image),
            data: general_purpose::STANDARD.encode(&image.data),
        }
    }
}

fn mime_for_format(format: ImageFormat) -> Option<&'static str> {
    match format {
        ImageFormat::Png => Some("image/png"),
        ImageFormat::Jpeg => Some("image/jpeg"),
        ImageFormat::WebP => Some("image/webp"),
        ImageFormat::Gif => Some("image/gif"),
        ImageFormat::Bmp => Some("image/bmp"),
        ImageFormat::Tiff => Some("image/tiff"),
        _ => None,
    }
}

/// File extension for a media type, used for download names.
pub fn extension_for(mime_type: &str) -> &'static str {
    match mime_type {
        "image/jpeg" | "image/jpg" => "jpg",
        "image/webp" => "webp",
        "image/gif" => "gif",
        "image/bmp" => "bmp",
        "image/tiff" => "tiff",
        _ => "png",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use image::{DynamicImage, ImageBuffer, Rgb};
    use std::io::Cursor;

    fn png_bytes() -> Vec<u8> {
        let img: ImageBuffer<Rgb<u8>, Vec<u8>> = ImageBuffer::from_pixel(4, 3, Rgb([120, 90, 60]));
        let mut out = Vec::new();
        DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut out), ImageFormat::Png)
            .unwrap();
        out
    }

    fn input(data: Vec<u8>, content_type: Option<&str>) -> InputImage {
        InputImage {
            filename: Some("grandma.png".into()),
            content_type: content_type.map(String::from),
            data: Bytes::from(data),
        }
    }

    #[test]
    fn test_validate_png() {
        let processor = ImageProcessor::new(1 << 20);
        let info = processor
            .validate_image(&input(png_bytes(), Some("application/octet-stream")))
            .unwrap();
        assert_eq!((info.width, info.height), (4, 3));
        assert_eq!(info.mime_type, "image/png");
    }

    #[test]
    fn test_rejects_garbage_empty_and_oversized() {
        let processor = ImageProcessor::new(16);
        assert!(matches!(
            processor.validate_image(&input(Vec::new(), None)),
            Err(ReviveError::Validation(_))
        ));
        assert!(matches!(
            processor.validate_image(&input(png_bytes(), None)),
            Err(ReviveError::Validation(_))
        ));

        let processor = ImageProcessor::new(1 << 20);
        assert!(matches!(
            processor.validate_image(&input(b"not an image at all".to_vec(), None)),
            Err(ReviveError::ImageProcessing(_))
        ));
    }

    #[test]
    fn test_declared_type_wins() {
        let processor = ImageProcessor::new(1 << 20);
        let encoded = processor.encode(&input(png_bytes(), Some("image/jpeg")));
        assert_eq!(encoded.mime_type, "image/jpeg");

        let encoded = processor.encode(&input(b"????".to_vec(), None));
        assert_eq!(encoded.mime_type, FALLBACK_MIME);
        assert_eq!(encoded.data, "Pz8/Pw==");
    }

    #[test]
    fn test_extension_for() {
        assert_eq!(extension_for("image/jpeg"), "jpg");
        assert_eq!(extension_for("image/png"), "png");
        assert_eq!(extension_for("application/octet-stream"), "png");
    }
}
