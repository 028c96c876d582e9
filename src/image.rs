//! Image payload decoding, format sniffing, and description.

use std::fmt;
use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

use crate::error::{GenerateError, RequestError};
use crate::generator::{GenerationRequest, Generator, ImageInput};

/// Instruction sent alongside the image.
pub const DESCRIBE_INSTRUCTION: &str =
    "Describe the content of this image in detail, especially any text or UI elements.";
/// Used in place of a description when the model call fails.
pub const FALLBACK_DESCRIPTION: &str = "Image could not be processed or described.";

/// Image formats recognised by magic bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    /// JPEG / JFIF / Exif.
    Jpeg,
    /// PNG.
    Png,
    /// WebP (RIFF container).
    Webp,
    /// GIF87a / GIF89a.
    Gif,
    /// Windows bitmap.
    Bmp,
    /// TIFF, either byte order.
    Tiff,
}

impl ImageKind {
    /// Detects the format from the leading bytes.
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
            Some(ImageKind::Jpeg)
        } else if bytes.starts_with(b"\x89PNG\r\n\x1a\n") {
            Some(ImageKind::Png)
        } else if bytes.len() >= 12 && &bytes[..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
            Some(ImageKind::Webp)
        } else if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
            Some(ImageKind::Gif)
        } else if bytes.starts_with(b"BM") {
            Some(ImageKind::Bmp)
        } else if bytes.starts_with(b"II*\0") || bytes.starts_with(b"MM\0*") {
            Some(ImageKind::Tiff)
        } else {
            None
        }
    }

    /// Short lowercase name (`jpeg`, `png`, ...).
    pub fn name(&self) -> &'static str {
        match self {
            ImageKind::Jpeg => "jpeg",
            ImageKind::Png => "png",
            ImageKind::Webp => "webp",
            ImageKind::Gif => "gif",
            ImageKind::Bmp => "bmp",
            ImageKind::Tiff => "tiff",
        }
    }

    /// MIME type sent to generative APIs.
    pub fn mime_type(&self) -> &'static str {
        match self {
            ImageKind::Jpeg => "image/jpeg",
            ImageKind::Png => "image/png",
            ImageKind::Webp => "image/webp",
            ImageKind::Gif => "image/gif",
            ImageKind::Bmp => "image/bmp",
            ImageKind::Tiff => "image/tiff",
        }
    }

    /// Whether the service accepts this format.
    pub fn is_supported(&self) -> bool {
        matches!(self, ImageKind::Jpeg | ImageKind::Png | ImageKind::Webp)
    }
}

impl fmt::Display for ImageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Image bytes whose format has been checked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    bytes: Vec<u8>,
    kind: ImageKind,
}

impl DecodedImage {
    /// Raw image bytes.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Sniffed format.
    pub fn kind(&self) -> ImageKind {
        self.kind
    }

    /// Borrowed form for generation requests.
    pub fn as_input(&self) -> ImageInput<'_> {
        ImageInput {
            bytes: &self.bytes,
            mime_type: self.kind.mime_type(),
        }
    }
}

/// Decodes a base64 (or `data:` URL) payload and rejects unsupported formats.
pub fn decode_image(payload: &str) -> Result<DecodedImage, RequestError> {
    let encoded = strip_data_url(payload.trim())?;
    let compact: String = encoded.chars().filter(|ch| !ch.is_whitespace()).collect();
    let bytes = STANDARD
        .decode(compact.as_bytes())
        .map_err(|err| RequestError::InvalidImage(err.to_string()))?;
    if bytes.is_empty() {
        return Err(RequestError::InvalidImage("image is empty".to_string()));
    }
    match ImageKind::sniff(&bytes) {
        Some(kind) if kind.is_supported() => Ok(DecodedImage { bytes, kind }),
        Some(kind) => Err(RequestError::UnsupportedImage(kind.name().to_string())),
        None => Err(RequestError::UnsupportedImage("unknown".to_string())),
    }
}

fn strip_data_url(payload: &str) -> Result<&str, RequestError> {
    let Some(rest) = payload.strip_prefix("data:") else {
        return Ok(payload);
    };
    let (header, data) = rest
        .split_once(',')
        .ok_or_else(|| RequestError::InvalidImage("data URL has no payload".to_string()))?;
    if !header.ends_with(";base64") {
        return Err(RequestError::InvalidImage(
            "data URL is not base64 encoded".to_string(),
        ));
    }
    Ok(data)
}

/// Asks the generative model to describe an image.
#[derive(Clone)]
pub struct ImageDescriber {
    generator: Arc<dyn Generator>,
}

impl ImageDescriber {
    /// Describes images through `generator`.
    pub fn new(generator: Arc<dyn Generator>) -> Self {
        Self { generator }
    }

    /// Free-text description of `image`.
    pub async fn describe(&self, image: &DecodedImage) -> Result<String, GenerateError> {
        let request = GenerationRequest::with_image(DESCRIBE_INSTRUCTION, image.as_input());
        self.generator.generate(&request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{encode, RecordingGenerator, GIF_BYTES, JPEG_BYTES, PNG_BYTES, WEBP_BYTES};
    use pretty_assertions::assert_eq;

    #[test]
    fn sniffs_known_formats() {
        assert_eq!(ImageKind::sniff(JPEG_BYTES), Some(ImageKind::Jpeg));
        assert_eq!(ImageKind::sniff(PNG_BYTES), Some(ImageKind::Png));
        assert_eq!(ImageKind::sniff(WEBP_BYTES), Some(ImageKind::Webp));
        assert_eq!(ImageKind::sniff(GIF_BYTES), Some(ImageKind::Gif));
        assert_eq!(ImageKind::sniff(b"BM\0\0\0\0"), Some(ImageKind::Bmp));
        assert_eq!(ImageKind::sniff(b"MM\0*\0\0\0\x08"), Some(ImageKind::Tiff));
        assert_eq!(ImageKind::sniff(b"RIFF\0\0\0\0WAVE"), None);
        assert_eq!(ImageKind::sniff(b"plain text"), None);
    }

    #[test]
    fn decodes_supported_formats() {
        for bytes in [JPEG_BYTES, PNG_BYTES, WEBP_BYTES] {
            let image = decode_image(&encode(bytes)).expect("supported");
            assert_eq!(image.bytes(), bytes);
        }
    }

    #[test]
    fn accepts_data_urls_and_wrapped_lines() {
        let encoded = encode(PNG_BYTES);
        let wrapped = format!("{}\n{}", &encoded[..8], &encoded[8..]);
        let image = decode_image(&format!("data:image/png;base64,{wrapped}")).expect("data URL");
        assert_eq!(image.kind(), ImageKind::Png);
        assert_eq!(image.as_input().mime_type, "image/png");
    }

    #[test]
    fn rejects_unsupported_formats() {
        assert_eq!(
            decode_image(&encode(GIF_BYTES)),
            Err(RequestError::UnsupportedImage("gif".to_string()))
        );
        assert_eq!(
            decode_image(&encode(b"just some text")),
            Err(RequestError::UnsupportedImage("unknown".to_string()))
        );
    }

    #[test]
    fn rejects_invalid_payloads() {
        assert!(matches!(
            decode_image("not base64!!"),
            Err(RequestError::InvalidImage(_))
        ));
        assert!(matches!(
            decode_image("data:image/png,plain"),
            Err(RequestError::InvalidImage(_))
        ));
    }

    #[tokio::test(flavor = "current_thread")]
    async fn describe_sends_image_and_instruction() {
        let generator = Arc::new(RecordingGenerator::answering("a login form"));
        let describer = ImageDescriber::new(generator.clone());
        let image = decode_image(&encode(JPEG_BYTES)).expect("jpeg");
        let description = describer.describe(&image).await.expect("described");
        assert_eq!(description, "a login form");
        let calls = generator.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].prompt, DESCRIBE_INSTRUCTION);
        assert_eq!(calls[0].image_mime, Some("image/jpeg"));
    }
}
