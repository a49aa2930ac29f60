//! Compression engines.
//!
//! The facade treats the engine as a capability: bytes plus constraints in,
//! smaller bytes out. [`ImageEngine`] is the default implementation on top of
//! the `image` codecs and `oxipng`.

use crate::constants::{
    AVIF_ENCODER_SPEED, BYTES_PER_MB, ITERATION_SCALE, LIBDEFLATER_HIGH_LEVEL,
    LIBDEFLATER_LOW_LEVEL, MAX_FILE_SIZE, MAX_IMAGE_DIMENSION, OXIPNG_PRESET, ZOPFLI_ITERATIONS,
    ZOPFLI_MAX_PIXELS,
};
use crate::error::{CompressionError, Result};
use crate::formats::OutputFormat;
use crate::metadata::carry_exif;
use crate::payload::ImageInput;
use crate::progress::ProgressReporter;
use crate::signal::{check_signal, AbortSignal};
use async_trait::async_trait;
use bytes::Bytes;
use image::codecs::avif::AvifEncoder;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType as PngFilterType, PngEncoder};
use image::codecs::webp::WebPEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView};
use oxipng::{Deflaters, Options};
use std::io::Cursor;
use std::num::NonZeroU8;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::oneshot;

/// Normalized options handed to an engine.
#[derive(Debug, Clone)]
pub struct EngineConstraints {
    pub max_size_mb: f64,
    pub max_width_or_height: u32,
    pub use_web_worker: bool,
    /// Quality factor in `[0, 1]`.
    pub initial_quality: f64,
    pub max_iteration: u32,
    pub file_type: Option<String>,
    pub preserve_exif: bool,
    pub progress: ProgressReporter,
    pub signal: Option<AbortSignal>,
}

impl EngineConstraints {
    /// Size target in bytes; `None` when `max_size_mb` is not a positive
    /// finite number.
    pub fn max_size_bytes(&self) -> Option<usize> {
        (self.max_size_mb.is_finite() && self.max_size_mb > 0.0)
            .then(|| (self.max_size_mb * BYTES_PER_MB) as usize)
    }

    pub fn check_signal(&self) -> Result<()> {
        check_signal(self.signal.as_ref())
    }
}

/// Engine output. `mime_type` is whatever the engine reports, possibly
/// nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    pub bytes: Bytes,
    pub mime_type: Option<String>,
}

#[async_trait]
pub trait CompressionEngine: Send + Sync {
    async fn compress(
        &self,
        input: &ImageInput,
        constraints: EngineConstraints,
    ) -> Result<EncodedImage>;
}

#[async_trait]
impl<E: CompressionEngine + ?Sized> CompressionEngine for Arc<E> {
    async fn compress(
        &self,
        input: &ImageInput,
        constraints: EngineConstraints,
    ) -> Result<EncodedImage> {
        (**self).compress(input, constraints).await
    }
}

/// Default engine: decode, fit within the edge cap, then re-encode while
/// shrinking size and quality until the size target or the iteration
/// budget is reached.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageEngine;

impl ImageEngine {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CompressionEngine for ImageEngine {
    async fn compress(
        &self,
        input: &ImageInput,
        constraints: EngineConstraints,
    ) -> Result<EncodedImage> {
        constraints.check_signal()?;
        let source = input.bytes().clone();
        let source_mime = input.mime_type().to_string();
        let signal = constraints.signal.clone();
        let progress = constraints.progress.clone();
        let use_worker = constraints.use_web_worker;

        let (tx, rx) = oneshot::channel();
        let job = move || {
            let _ = tx.send(compress_blocking(&source, &source_mime, &constraints));
        };
        if use_worker {
            rayon::spawn(job);
        } else {
            tokio::task::spawn_blocking(job);
        }

        match signal {
            // The job notices the abort at its next check; the caller does
            // not wait for that, and its later progress is discarded.
            Some(signal) => tokio::select! {
                result = rx => result.map_err(|_| CompressionError::WorkerDisconnected)?,
                _ = signal.aborted() => {
                    progress.close();
                    Err(CompressionError::Aborted)
                }
            },
            None => rx.await.map_err(|_| CompressionError::WorkerDisconnected)?,
        }
    }
}

/// The synchronous compression loop. [`ImageEngine`] runs it on the rayon
/// pool or, without a worker, on tokio's blocking pool.
pub fn compress_blocking(
    source: &Bytes,
    source_mime: &str,
    constraints: &EngineConstraints,
) -> Result<EncodedImage> {
    let progress = &constraints.progress;
    constraints.check_signal()?;
    progress.report(0.0);

    let source_len = source.len();
    if source_len as u64 > MAX_FILE_SIZE {
        return Err(CompressionError::FileTooLarge(source_len as u64, MAX_FILE_SIZE));
    }

    let source_format = image::guess_format(source)
        .ok()
        .and_then(OutputFormat::from_image_format);
    let img = image::load_from_memory(source)?;
    validate_dimensions(&img)?;

    let output_format =
        resolve_output_format(constraints.file_type.as_deref(), source_mime, source_format)?;
    let mut img = resize_to_fit(img, constraints.max_width_or_height);
    let mut quality = constraints.initial_quality;
    let mut encoded = encode_image(&img, output_format, quality)?;

    let max_bytes = constraints.max_size_bytes();
    let over_budget =
        |len: usize| max_bytes.is_some_and(|max| len > max) || len > source_len;

    let total = constraints.max_iteration;
    let mut iteration = 0;
    while iteration < total && over_budget(encoded.len()) {
        constraints.check_signal()?;
        iteration += 1;

        let scaled = scale_image(&img, ITERATION_SCALE);
        let shrunk = scaled.dimensions() != img.dimensions();
        img = scaled;
        if output_format.is_lossy() {
            quality *= ITERATION_SCALE;
        } else if !shrunk {
            break;
        }

        encoded = encode_image(&img, output_format, quality)?;
        tracing::debug!(
            iteration,
            size = encoded.len(),
            quality,
            width = img.width(),
            height = img.height(),
            "compression iteration"
        );
        progress.report_fraction(iteration, total.saturating_add(1));
    }
    constraints.check_signal()?;

    if encoded.len() > source_len && source_format == Some(output_format) {
        tracing::debug!(
            source_len,
            encoded_len = encoded.len(),
            "re-encode is larger than the source; keeping source bytes"
        );
        progress.report(100.0);
        return Ok(EncodedImage {
            bytes: source.clone(),
            mime_type: Some(output_format.mime_type().to_string()),
        });
    }

    if constraints.preserve_exif {
        if output_format == OutputFormat::Jpeg && source_format == Some(OutputFormat::Jpeg) {
            if let Some(with_exif) = carry_exif(source, &encoded) {
                encoded = with_exif;
            }
        } else {
            tracing::debug!(%output_format, "EXIF preservation only applies to JPEG output");
        }
    }

    progress.report(100.0);
    Ok(EncodedImage {
        bytes: Bytes::from(encoded),
        mime_type: Some(output_format.mime_type().to_string()),
    })
}

/// Rejects decoded images whose edges exceed `MAX_IMAGE_DIMENSION`.
pub fn validate_dimensions(img: &DynamicImage) -> Result<()> {
    let (width, height) = img.dimensions();
    if width > MAX_IMAGE_DIMENSION || height > MAX_IMAGE_DIMENSION {
        return Err(CompressionError::InvalidDimensions(
            width,
            height,
            MAX_IMAGE_DIMENSION,
        ));
    }
    Ok(())
}

/// Explicit type first, then the declared or sniffed source type when it
/// is encodable, then JPEG. An explicit type the engine cannot encode is
/// an error.
pub fn resolve_output_format(
    file_type: Option<&str>,
    source_mime: &str,
    source_format: Option<OutputFormat>,
) -> Result<OutputFormat> {
    if let Some(file_type) = file_type {
        return OutputFormat::from_str(file_type);
    }
    Ok(OutputFormat::from_mime(source_mime)
        .or(source_format)
        .unwrap_or(OutputFormat::Jpeg))
}

/// Downscales, preserving aspect ratio, so the longest edge is at most
/// `max_edge`. Zero disables the cap.
pub fn resize_to_fit(img: DynamicImage, max_edge: u32) -> DynamicImage {
    let (width, height) = img.dimensions();
    if max_edge == 0 || width.max(height) <= max_edge {
        return img;
    }
    img.resize(max_edge, max_edge, FilterType::Lanczos3)
}

fn scale_image(img: &DynamicImage, factor: f64) -> DynamicImage {
    let (width, height) = img.dimensions();
    let new_width = ((f64::from(width) * factor).round() as u32).max(1);
    let new_height = ((f64::from(height) * factor).round() as u32).max(1);
    if (new_width, new_height) == (width, height) {
        return img.clone();
    }
    img.resize_exact(new_width, new_height, FilterType::Lanczos3)
}

fn quality_percent(quality: f64) -> u8 {
    (quality * 100.0).round().clamp(1.0, 100.0) as u8
}

/// Encodes `img` as `format`. `quality` only affects lossy formats and the
/// PNG deflater choice.
pub fn encode_image(img: &DynamicImage, format: OutputFormat, quality: f64) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    match format {
        OutputFormat::Jpeg => {
            let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
            rgb.write_with_encoder(JpegEncoder::new_with_quality(
                &mut buf,
                quality_percent(quality),
            ))?;
        }
        OutputFormat::Png => {
            img.write_with_encoder(PngEncoder::new_with_quality(
                &mut buf,
                CompressionType::Default,
                PngFilterType::Adaptive,
            ))?;
            buf = optimize_png(&buf, img, quality)?;
        }
        OutputFormat::WebP => {
            let rgba = DynamicImage::ImageRgba8(img.to_rgba8());
            rgba.write_with_encoder(WebPEncoder::new_lossless(&mut buf))?;
        }
        OutputFormat::Avif => {
            let rgba = DynamicImage::ImageRgba8(img.to_rgba8());
            rgba.write_with_encoder(AvifEncoder::new_with_speed_quality(
                &mut buf,
                AVIF_ENCODER_SPEED,
                quality_percent(quality),
            ))?;
        }
        OutputFormat::Gif | OutputFormat::Bmp => {
            let rgba = DynamicImage::ImageRgba8(img.to_rgba8());
            rgba.write_to(&mut Cursor::new(&mut buf), format.to_image_format())?;
        }
    }
    Ok(buf)
}

fn optimize_png(png: &[u8], img: &DynamicImage, quality: f64) -> Result<Vec<u8>> {
    let mut options = Options::from_preset(OXIPNG_PRESET);
    let pixels = u64::from(img.width()) * u64::from(img.height());

    options.deflate = if quality >= 0.9 && pixels <= ZOPFLI_MAX_PIXELS {
        Deflaters::Zopfli {
            iterations: NonZeroU8::new(ZOPFLI_ITERATIONS).unwrap_or(NonZeroU8::MIN),
        }
    } else if quality >= 0.7 {
        Deflaters::Libdeflater {
            compression: LIBDEFLATER_HIGH_LEVEL,
        }
    } else {
        Deflaters::Libdeflater {
            compression: LIBDEFLATER_LOW_LEVEL,
        }
    };

    oxipng::optimize_from_memory(png, &options)
        .map_err(|e| CompressionError::PngOptimization(e.to_string()))
}
