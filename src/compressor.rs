//! The image compression facade.
//!
//! [`ImageCompressor`] validates input, normalizes options, delegates the
//! actual work to a [`CompressionEngine`], and resolves the output name and
//! media type. Results come in three shapes: a plain [`ImageFile`], a file
//! plus Base64 data URL, or a file plus a registered object URL that must
//! be revoked.

use crate::constants::FALLBACK_MIME_TYPE;
use crate::engine::{CompressionEngine, ImageEngine};
use crate::error::{CompressionError, Result};
use crate::formats::derive_output_name;
use crate::options::CompressOptions;
use crate::payload::{ImageFile, ImageInput};
use crate::registry::{ObjectUrlRegistry, ObjectUrlRevoker};
use std::time::Instant;

/// Output of [`ImageCompressor::compress_to_data_url`].
#[derive(Debug, Clone)]
pub struct DataUrlOutput {
    pub file: ImageFile,
    pub data_url: String,
}

/// Output of [`ImageCompressor::compress_to_object_url`].
#[derive(Debug, Clone)]
pub struct ObjectUrlOutput {
    pub file: ImageFile,
    pub object_url: String,
    pub revoke: ObjectUrlRevoker,
}

#[derive(Debug, Clone)]
pub struct ImageCompressor<E = ImageEngine> {
    engine: E,
    registry: ObjectUrlRegistry,
}

impl Default for ImageCompressor<ImageEngine> {
    fn default() -> Self {
        Self::new(ImageEngine::new())
    }
}

impl<E: CompressionEngine> ImageCompressor<E> {
    pub fn new(engine: E) -> Self {
        Self::with_registry(engine, ObjectUrlRegistry::new())
    }

    /// Uses a caller-provided registry, e.g. one shared between compressors.
    pub fn with_registry(engine: E, registry: ObjectUrlRegistry) -> Self {
        Self { engine, registry }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn registry(&self) -> &ObjectUrlRegistry {
        &self.registry
    }

    /// Compresses an image.
    ///
    /// # Arguments
    /// * `input` - An [`ImageFile`] or anonymous [`ImageBlob`](crate::ImageBlob)
    /// * `options` - Compression options; unset fields take their defaults
    ///
    /// # Returns
    /// * `Ok(ImageFile)` - A new file named by the `file_name` option or
    ///   `<base>.compressed.<ext>`, typed by `file_type`, the engine's
    ///   reported type, or `image/jpeg`, in that order
    /// * `Err(CompressionError::InvalidInput)` - The payload has no bytes
    /// * `Err(CompressionError::Aborted)` - The signal fired before or
    ///   during compression
    /// * Any engine error, unchanged
    pub async fn compress(
        &self,
        input: impl Into<ImageInput>,
        options: CompressOptions,
    ) -> Result<ImageFile> {
        let input = input.into();
        if input.size() == 0 {
            return Err(CompressionError::InvalidInput(
                "input must be a non-empty image file or blob".to_string(),
            ));
        }

        let options = options.normalize();
        options.constraints.check_signal()?;

        let explicit_type = options.constraints.file_type.clone();
        let progress = options.constraints.progress.clone();
        let started = Instant::now();
        let result = self.engine.compress(&input, options.constraints).await;
        // Engines may leave work running after an abort; nothing reaches the
        // caller's callback once this call resolves.
        progress.close();
        let encoded = result?;

        let engine_type = encoded.mime_type.filter(|m| !m.is_empty());
        let mime_type = explicit_type
            .or(engine_type)
            .unwrap_or_else(|| FALLBACK_MIME_TYPE.to_string());
        let name = options
            .file_name
            .unwrap_or_else(|| derive_output_name(input.name(), &mime_type));

        tracing::info!(
            name = %name,
            mime_type = %mime_type,
            original_size = input.size(),
            compressed_size = encoded.bytes.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "image compressed"
        );

        Ok(ImageFile::new(encoded.bytes, name, mime_type))
    }

    /// Compresses, then encodes the result as a Base64 data URL.
    pub async fn compress_to_data_url(
        &self,
        input: impl Into<ImageInput>,
        options: CompressOptions,
    ) -> Result<DataUrlOutput> {
        let file = self.compress(input, options).await?;
        let data_url = file.to_data_url();
        Ok(DataUrlOutput { file, data_url })
    }

    /// Compresses, then registers the result in this compressor's
    /// [`ObjectUrlRegistry`]. Call `revoke.revoke()` when done with the URL.
    pub async fn compress_to_object_url(
        &self,
        input: impl Into<ImageInput>,
        options: CompressOptions,
    ) -> Result<ObjectUrlOutput> {
        let file = self.compress(input, options).await?;
        let object_url = self.registry.register(file.clone());
        let revoke = ObjectUrlRevoker::new(self.registry.clone(), object_url.clone());
        Ok(ObjectUrlOutput {
            file,
            object_url,
            revoke,
        })
    }
}

/// Compresses with the default engine and a throwaway registry.
pub async fn compress_image(
    input: impl Into<ImageInput>,
    options: CompressOptions,
) -> Result<ImageFile> {
    ImageCompressor::default().compress(input, options).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{EncodedImage, EngineConstraints};
    use crate::payload::ImageBlob;
    use crate::signal::{AbortController, AbortSignal};
    use async_trait::async_trait;
    use bytes::Bytes;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Records what it was called with and answers with a fixed result.
    #[derive(Default)]
    struct StubEngine {
        calls: AtomicUsize,
        seen_quality: Mutex<Option<f64>>,
        seen_file_type: Mutex<Option<String>>,
        reported_type: Option<String>,
        fail_with_unsupported: bool,
    }

    impl StubEngine {
        fn reporting(mime: &str) -> Self {
            Self {
                reported_type: Some(mime.to_string()),
                ..Self::default()
            }
        }
    }

    #[async_trait]
    impl CompressionEngine for StubEngine {
        async fn compress(
            &self,
            input: &ImageInput,
            constraints: EngineConstraints,
        ) -> Result<EncodedImage> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.seen_quality.lock() = Some(constraints.initial_quality);
            *self.seen_file_type.lock() = constraints.file_type.clone();
            if self.fail_with_unsupported {
                return Err(CompressionError::UnsupportedFormat("image/x-test".into()));
            }
            constraints.progress.report(50.0);
            constraints.check_signal()?;
            let half = input.size().div_ceil(2);
            Ok(EncodedImage {
                bytes: input.bytes().slice(..half),
                mime_type: self.reported_type.clone(),
            })
        }
    }

    /// Returns at once but keeps reporting progress from another thread.
    struct LingeringEngine;

    #[async_trait]
    impl CompressionEngine for LingeringEngine {
        async fn compress(
            &self,
            input: &ImageInput,
            constraints: EngineConstraints,
        ) -> Result<EncodedImage> {
            let progress = constraints.progress.clone();
            std::thread::spawn(move || {
                std::thread::sleep(std::time::Duration::from_millis(30));
                progress.report(80.0);
            });
            Ok(EncodedImage {
                bytes: input.bytes().clone(),
                mime_type: Some("image/png".to_string()),
            })
        }
    }

    fn photo_png() -> ImageFile {
        ImageFile::new(vec![7u8; 64], "photo.png", "image/png")
    }

    #[tokio::test]
    async fn test_empty_input_is_rejected_before_engine() {
        let engine = Arc::new(StubEngine::reporting("image/png"));
        let compressor = ImageCompressor::new(Arc::clone(&engine));

        let result = compressor
            .compress(ImageBlob::new(Bytes::new(), "image/png"), CompressOptions::new())
            .await;

        assert!(matches!(result, Err(CompressionError::InvalidInput(_))));
        assert_eq!(engine.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_pre_aborted_signal_skips_engine() {
        let engine = Arc::new(StubEngine::reporting("image/png"));
        let compressor = ImageCompressor::new(Arc::clone(&engine));

        let result = compressor
            .compress(
                photo_png(),
                CompressOptions::new().signal(AbortSignal::aborted_signal()),
            )
            .await;

        assert!(result.unwrap_err().is_abort());
        assert_eq!(engine.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_abort_during_engine_is_propagated() {
        let controller = AbortController::new();
        let signal = controller.signal();
        let compressor = ImageCompressor::new(StubEngine::reporting("image/png"));

        let options = CompressOptions::new()
            .signal(signal)
            .on_progress(move |_| controller.abort());
        let result = compressor.compress(photo_png(), options).await;

        assert!(matches!(result, Err(CompressionError::Aborted)));
    }

    #[tokio::test]
    async fn test_quality_is_clamped_before_delegation() {
        let engine = Arc::new(StubEngine::reporting("image/jpeg"));
        let compressor = ImageCompressor::new(Arc::clone(&engine));

        compressor
            .compress(photo_png(), CompressOptions::new().initial_quality(-5.0))
            .await
            .unwrap();
        assert_eq!(*engine.seen_quality.lock(), Some(0.0));

        compressor
            .compress(photo_png(), CompressOptions::new().initial_quality(1.7))
            .await
            .unwrap();
        assert_eq!(*engine.seen_quality.lock(), Some(1.0));
    }

    #[tokio::test]
    async fn test_name_uses_engine_type() {
        let compressor = ImageCompressor::new(StubEngine::reporting("image/webp"));
        let file = compressor
            .compress(photo_png(), CompressOptions::new())
            .await
            .unwrap();

        assert_eq!(file.name(), "photo.compressed.webp");
        assert_eq!(file.mime_type(), "image/webp");
    }

    #[tokio::test]
    async fn test_explicit_file_type_wins() {
        let engine = Arc::new(StubEngine::reporting("image/webp"));
        let compressor = ImageCompressor::new(Arc::clone(&engine));
        let file = compressor
            .compress(photo_png(), CompressOptions::new().file_type("image/avif"))
            .await
            .unwrap();

        assert_eq!(file.name(), "photo.compressed.avif");
        assert_eq!(file.mime_type(), "image/avif");
        assert_eq!(engine.seen_file_type.lock().as_deref(), Some("image/avif"));
    }

    #[tokio::test]
    async fn test_explicit_file_name_wins() {
        let compressor = ImageCompressor::new(StubEngine::reporting("image/webp"));
        let file = compressor
            .compress(photo_png(), CompressOptions::new().file_name("thumb.bin"))
            .await
            .unwrap();

        assert_eq!(file.name(), "thumb.bin");
        assert_eq!(file.mime_type(), "image/webp");
    }

    #[tokio::test]
    async fn test_fallbacks_for_anonymous_input_and_silent_engine() {
        let compressor = ImageCompressor::new(StubEngine::default());
        let file = compressor
            .compress(ImageBlob::new(vec![1u8; 10], "image/png"), CompressOptions::new())
            .await
            .unwrap();

        assert_eq!(file.name(), "image.compressed.jpg");
        assert_eq!(file.mime_type(), "image/jpeg");
    }

    #[tokio::test]
    async fn test_empty_engine_type_falls_back() {
        let compressor = ImageCompressor::new(StubEngine::reporting(""));
        let file = compressor
            .compress(photo_png(), CompressOptions::new())
            .await
            .unwrap();

        assert_eq!(file.mime_type(), "image/jpeg");
        assert_eq!(file.name(), "photo.compressed.jpg");
    }

    #[tokio::test]
    async fn test_input_is_not_mutated() {
        let compressor = ImageCompressor::new(StubEngine::reporting("image/png"));
        let input = photo_png();
        let before = input.clone();

        let out = compressor.compress(&input, CompressOptions::new()).await.unwrap();

        assert_eq!(input, before);
        assert_eq!(out.size(), 32);
        assert!(out.last_modified() >= before.last_modified());
    }

    #[tokio::test]
    async fn test_engine_errors_pass_through() {
        let engine = StubEngine {
            fail_with_unsupported: true,
            ..StubEngine::default()
        };
        let compressor = ImageCompressor::new(engine);

        let result = compressor.compress(photo_png(), CompressOptions::new()).await;
        assert!(matches!(
            result,
            Err(CompressionError::UnsupportedFormat(ref m)) if m == "image/x-test"
        ));
    }

    #[tokio::test]
    async fn test_progress_reaches_callback() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let compressor = ImageCompressor::new(StubEngine::reporting("image/png"));

        compressor
            .compress(
                photo_png(),
                CompressOptions::new().on_progress(move |p| sink.lock().push(p)),
            )
            .await
            .unwrap();

        assert_eq!(*seen.lock(), vec![50.0]);
    }

    #[tokio::test]
    async fn test_no_progress_after_resolution() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let compressor = ImageCompressor::new(LingeringEngine);

        compressor
            .compress(
                photo_png(),
                CompressOptions::new().on_progress(move |p| sink.lock().push(p)),
            )
            .await
            .unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(150)).await;

        assert!(seen.lock().is_empty());
    }

    #[tokio::test]
    async fn test_engine_accessor_exposes_injected_engine() {
        let compressor = ImageCompressor::new(StubEngine::reporting("image/png"));
        compressor
            .compress(photo_png(), CompressOptions::new())
            .await
            .unwrap();
        assert_eq!(compressor.engine().calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_compress_to_data_url() {
        let compressor = ImageCompressor::new(StubEngine::reporting("image/webp"));
        let out = compressor
            .compress_to_data_url(photo_png(), CompressOptions::new())
            .await
            .unwrap();

        assert!(out.data_url.starts_with("data:image/webp;base64,"));
        let blob = ImageBlob::from_data_url(&out.data_url).unwrap();
        assert_eq!(blob.bytes(), out.file.bytes());
    }

    #[tokio::test]
    async fn test_compress_to_object_url_and_revoke() {
        let compressor = ImageCompressor::new(StubEngine::reporting("image/png"));
        let out = compressor
            .compress_to_object_url(photo_png(), CompressOptions::new())
            .await
            .unwrap();

        let registry = compressor.registry();
        assert_eq!(registry.resolve(&out.object_url), Some(out.file.clone()));

        out.revoke.revoke();
        assert!(registry.resolve(&out.object_url).is_none());
        out.revoke.revoke();
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_object_url_failure_registers_nothing() {
        let compressor = ImageCompressor::new(StubEngine::reporting("image/png"));
        let result = compressor
            .compress_to_object_url(
                photo_png(),
                CompressOptions::new().signal(AbortSignal::aborted_signal()),
            )
            .await;

        assert!(result.is_err());
        assert!(compressor.registry().is_empty());
    }
}
