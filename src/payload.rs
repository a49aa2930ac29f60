//! Binary image payloads: the anonymous [`ImageBlob`] and the named
//! [`ImageFile`]. Both are immutable; the byte buffer is shared, so
//! cloning is cheap.

use crate::constants::MAX_FILE_SIZE;
use crate::data_url::{encode_data_url, parse_data_url};
use crate::error::{CompressionError, Result};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use image::ImageFormat;
use std::path::{Component, Path, PathBuf};

const UNKNOWN_MIME_TYPE: &str = "application/octet-stream";

/// Guesses a media type from magic bytes, falling back to
/// `application/octet-stream`.
pub fn sniff_mime_type(bytes: &[u8]) -> String {
    image::guess_format(bytes)
        .map(|f| f.to_mime_type().to_string())
        .unwrap_or_else(|_| UNKNOWN_MIME_TYPE.to_string())
}

/// Bytes plus a media type, without a name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageBlob {
    bytes: Bytes,
    mime_type: String,
}

impl ImageBlob {
    pub fn new(bytes: impl Into<Bytes>, mime_type: impl Into<String>) -> Self {
        Self {
            bytes: bytes.into(),
            mime_type: mime_type.into(),
        }
    }

    /// Builds a blob whose media type is sniffed from the content.
    pub fn from_bytes(bytes: impl Into<Bytes>) -> Self {
        let bytes = bytes.into();
        let mime_type = sniff_mime_type(&bytes);
        Self { bytes, mime_type }
    }

    /// Parses a `data:<mime>;base64,<payload>` string.
    pub fn from_data_url(data_url: &str) -> Result<Self> {
        let (mime_type, bytes) = parse_data_url(data_url)?;
        Ok(Self { bytes, mime_type })
    }

    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }
}

/// A named payload with a modification timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageFile {
    bytes: Bytes,
    name: String,
    mime_type: String,
    last_modified: DateTime<Utc>,
}

impl ImageFile {
    /// Creates a file stamped with the current time.
    pub fn new(
        bytes: impl Into<Bytes>,
        name: impl Into<String>,
        mime_type: impl Into<String>,
    ) -> Self {
        Self {
            bytes: bytes.into(),
            name: name.into(),
            mime_type: mime_type.into(),
            last_modified: Utc::now(),
        }
    }

    pub fn with_last_modified(mut self, last_modified: DateTime<Utc>) -> Self {
        self.last_modified = last_modified;
        self
    }

    /// Reads an image file from disk.
    ///
    /// # Arguments
    /// * `path` - Path to the image file
    ///
    /// # Returns
    /// * `Ok(ImageFile)` named after the path's file name, typed from its
    ///   extension or, failing that, its magic bytes
    /// * `Err(CompressionError)` if the path is missing, is not a file, or
    ///   exceeds `MAX_FILE_SIZE`
    pub async fn from_path(path: &Path) -> Result<Self> {
        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|_| CompressionError::FileNotFound(path.to_path_buf()))?;

        if !metadata.is_file() {
            return Err(CompressionError::InvalidInput(format!(
                "{} is not a file",
                path.display()
            )));
        }
        if metadata.len() > MAX_FILE_SIZE {
            return Err(CompressionError::FileTooLarge(metadata.len(), MAX_FILE_SIZE));
        }

        let bytes = tokio::fs::read(path).await?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| CompressionError::InvalidInput("path has no file name".to_string()))?;
        let mime_type = ImageFormat::from_path(path)
            .map(|f| f.to_mime_type().to_string())
            .unwrap_or_else(|_| sniff_mime_type(&bytes));
        let last_modified = metadata
            .modified()
            .map(DateTime::<Utc>::from)
            .unwrap_or_else(|_| Utc::now());

        Ok(Self {
            bytes: Bytes::from(bytes),
            name,
            mime_type,
            last_modified,
        })
    }

    /// Writes the file as `<dir>/<name>`, creating `dir` when needed.
    ///
    /// Fails with `InvalidInput` when the name is not a single plain file
    /// name (separators, `..`, absolute paths).
    pub async fn write_to_dir(&self, dir: &Path) -> Result<PathBuf> {
        let mut components = Path::new(&self.name).components();
        if !matches!(
            (components.next(), components.next()),
            (Some(Component::Normal(_)), None)
        ) {
            return Err(CompressionError::InvalidInput(format!(
                "output name {:?} must be a plain file name",
                self.name
            )));
        }

        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|_| CompressionError::DirectoryCreationFailed(dir.to_path_buf()))?;
        let path = dir.join(&self.name);
        tokio::fs::write(&path, &self.bytes).await?;
        Ok(path)
    }

    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn last_modified(&self) -> DateTime<Utc> {
        self.last_modified
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    pub fn to_data_url(&self) -> String {
        encode_data_url(&self.mime_type, &self.bytes)
    }
}

/// What the compressor accepts: a named file or an anonymous blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageInput {
    Blob(ImageBlob),
    File(ImageFile),
}

impl ImageInput {
    pub fn bytes(&self) -> &Bytes {
        match self {
            ImageInput::Blob(blob) => blob.bytes(),
            ImageInput::File(file) => file.bytes(),
        }
    }

    pub fn mime_type(&self) -> &str {
        match self {
            ImageInput::Blob(blob) => blob.mime_type(),
            ImageInput::File(file) => file.mime_type(),
        }
    }

    /// The original file name, if the input carries one.
    pub fn name(&self) -> Option<&str> {
        match self {
            ImageInput::Blob(_) => None,
            ImageInput::File(file) => Some(file.name()),
        }
    }

    pub fn size(&self) -> usize {
        self.bytes().len()
    }
}

impl From<ImageBlob> for ImageInput {
    fn from(blob: ImageBlob) -> Self {
        ImageInput::Blob(blob)
    }
}

impl From<ImageFile> for ImageInput {
    fn from(file: ImageFile) -> Self {
        ImageInput::File(file)
    }
}

impl From<&ImageFile> for ImageInput {
    fn from(file: &ImageFile) -> Self {
        ImageInput::File(file.clone())
    }
}
