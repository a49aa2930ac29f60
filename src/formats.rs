/// Image format utilities and type-safe format handling
///
/// Output formats are resolved from MIME strings the way browsers report
/// them, so lookups are case-insensitive and tolerate vendor prefixes such
/// as `image/x-png`.
use crate::constants::{COMPRESSED_SUFFIX, FALLBACK_BASE_NAME};
use crate::error::{CompressionError, Result};
use image::ImageFormat;
use std::fmt;
use std::str::FromStr;

/// Formats the default engine can encode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Jpeg,
    Png,
    WebP,
    Gif,
    Bmp,
    Avif,
}

impl OutputFormat {
    /// Returns the file extension for this format
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "jpg",
            OutputFormat::Png => "png",
            OutputFormat::WebP => "webp",
            OutputFormat::Gif => "gif",
            OutputFormat::Bmp => "bmp",
            OutputFormat::Avif => "avif",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "image/jpeg",
            OutputFormat::Png => "image/png",
            OutputFormat::WebP => "image/webp",
            OutputFormat::Gif => "image/gif",
            OutputFormat::Bmp => "image/bmp",
            OutputFormat::Avif => "image/avif",
        }
    }

    /// Convert to the image crate's ImageFormat
    pub fn to_image_format(&self) -> ImageFormat {
        match self {
            OutputFormat::Jpeg => ImageFormat::Jpeg,
            OutputFormat::Png => ImageFormat::Png,
            OutputFormat::WebP => ImageFormat::WebP,
            OutputFormat::Gif => ImageFormat::Gif,
            OutputFormat::Bmp => ImageFormat::Bmp,
            OutputFormat::Avif => ImageFormat::Avif,
        }
    }

    pub fn from_image_format(format: ImageFormat) -> Option<Self> {
        match format {
            ImageFormat::Jpeg => Some(OutputFormat::Jpeg),
            ImageFormat::Png => Some(OutputFormat::Png),
            ImageFormat::WebP => Some(OutputFormat::WebP),
            ImageFormat::Gif => Some(OutputFormat::Gif),
            ImageFormat::Bmp => Some(OutputFormat::Bmp),
            ImageFormat::Avif => Some(OutputFormat::Avif),
            _ => None,
        }
    }

    /// Looks up an encodable format from a MIME string. `None` for
    /// anything the engine cannot write (tiff, heic, empty).
    pub fn from_mime(mime: &str) -> Option<Self> {
        let m = mime.to_lowercase();
        if m.contains("png") {
            Some(OutputFormat::Png)
        } else if m.contains("webp") {
            Some(OutputFormat::WebP)
        } else if m.contains("gif") {
            Some(OutputFormat::Gif)
        } else if m.contains("bmp") {
            Some(OutputFormat::Bmp)
        } else if m.contains("avif") {
            Some(OutputFormat::Avif)
        } else if m.contains("jpeg") || m.contains("jpg") {
            Some(OutputFormat::Jpeg)
        } else {
            None
        }
    }

    /// Whether the encoder honours a quality factor
    pub fn is_lossy(&self) -> bool {
        matches!(self, OutputFormat::Jpeg | OutputFormat::Avif)
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OutputFormat::Jpeg => "JPEG",
            OutputFormat::Png => "PNG",
            OutputFormat::WebP => "WebP",
            OutputFormat::Gif => "GIF",
            OutputFormat::Bmp => "BMP",
            OutputFormat::Avif => "AVIF",
        };
        write!(f, "{}", name)
    }
}

/// Accepts short names (`webp`, `jpg`) as well as MIME strings (`image/webp`).
impl FromStr for OutputFormat {
    type Err = CompressionError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "jpeg" | "jpg" => Ok(OutputFormat::Jpeg),
            "png" => Ok(OutputFormat::Png),
            "webp" => Ok(OutputFormat::WebP),
            "gif" => Ok(OutputFormat::Gif),
            "bmp" => Ok(OutputFormat::Bmp),
            "avif" => Ok(OutputFormat::Avif),
            other if other.starts_with("image/") => OutputFormat::from_mime(other)
                .ok_or_else(|| CompressionError::UnsupportedFormat(s.to_string())),
            _ => Err(CompressionError::UnsupportedFormat(s.to_string())),
        }
    }
}

/// Maps a MIME type to a file extension. Total: anything unrecognised,
/// including the empty string, maps to `jpg`.
pub fn mime_to_ext(mime: &str) -> &'static str {
    OutputFormat::from_mime(mime)
        .map(|f| f.extension())
        .unwrap_or("jpg")
}

/// Drops the last `.ext` from a file name. Names without an extension
/// are returned whole.
pub fn strip_extension(name: &str) -> &str {
    match name.rfind('.') {
        Some(idx) if idx + 1 < name.len() => &name[..idx],
        _ => name,
    }
}

/// Builds `<base>.compressed.<ext>` from the original name (or the
/// fallback base name) and the resolved output MIME type.
pub fn derive_output_name(original_name: Option<&str>, mime: &str) -> String {
    let base = strip_extension(original_name.unwrap_or(FALLBACK_BASE_NAME));
    format!("{}.{}.{}", base, COMPRESSED_SUFFIX, mime_to_ext(mime))
}
