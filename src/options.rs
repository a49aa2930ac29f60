use crate::constants::{
    DEFAULT_INITIAL_QUALITY, DEFAULT_MAX_ITERATION, DEFAULT_MAX_SIZE_MB,
    DEFAULT_MAX_WIDTH_OR_HEIGHT, DEFAULT_PRESERVE_EXIF, DEFAULT_USE_WEB_WORKER,
};
use crate::engine::EngineConstraints;
use crate::progress::{ProgressHandler, ProgressReporter};
use crate::signal::AbortSignal;
use serde::Deserialize;
use std::fmt;
use std::sync::Arc;

/// Caller-facing compression options. Every field is optional; defaults
/// are applied once by [`CompressOptions::normalize`].
///
/// The serializable subset can be loaded from TOML, e.g.
///
/// ```toml
/// max_size_mb = 0.5
/// max_width_or_height = 1280
/// file_type = "image/webp"
/// ```
#[derive(Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CompressOptions {
    pub max_size_mb: Option<f64>,
    pub max_width_or_height: Option<u32>,
    pub use_web_worker: Option<bool>,
    /// Starting lossy quality; clamped to `[0, 1]`.
    pub initial_quality: Option<f64>,
    pub max_iteration: Option<u32>,
    /// Output MIME type override, e.g. `image/webp`.
    pub file_type: Option<String>,
    pub preserve_exif: Option<bool>,
    pub file_name: Option<String>,
    #[serde(skip)]
    pub on_progress: Option<ProgressHandler>,
    #[serde(skip)]
    pub signal: Option<AbortSignal>,
}

impl CompressOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_size_mb(mut self, value: f64) -> Self {
        self.max_size_mb = Some(value);
        self
    }

    pub fn max_width_or_height(mut self, value: u32) -> Self {
        self.max_width_or_height = Some(value);
        self
    }

    pub fn use_web_worker(mut self, value: bool) -> Self {
        self.use_web_worker = Some(value);
        self
    }

    pub fn initial_quality(mut self, value: f64) -> Self {
        self.initial_quality = Some(value);
        self
    }

    pub fn max_iteration(mut self, value: u32) -> Self {
        self.max_iteration = Some(value);
        self
    }

    pub fn file_type(mut self, value: impl Into<String>) -> Self {
        self.file_type = Some(value.into());
        self
    }

    pub fn preserve_exif(mut self, value: bool) -> Self {
        self.preserve_exif = Some(value);
        self
    }

    pub fn file_name(mut self, value: impl Into<String>) -> Self {
        self.file_name = Some(value.into());
        self
    }

    pub fn on_progress(mut self, handler: impl Fn(f64) + Send + Sync + 'static) -> Self {
        self.on_progress = Some(Arc::new(handler));
        self
    }

    pub fn signal(mut self, signal: AbortSignal) -> Self {
        self.signal = Some(signal);
        self
    }

    /// Fills every unset field from `base`. Fields set on `self` win.
    pub fn or(self, base: CompressOptions) -> Self {
        Self {
            max_size_mb: self.max_size_mb.or(base.max_size_mb),
            max_width_or_height: self.max_width_or_height.or(base.max_width_or_height),
            use_web_worker: self.use_web_worker.or(base.use_web_worker),
            initial_quality: self.initial_quality.or(base.initial_quality),
            max_iteration: self.max_iteration.or(base.max_iteration),
            file_type: self.file_type.or(base.file_type),
            preserve_exif: self.preserve_exif.or(base.preserve_exif),
            file_name: self.file_name.or(base.file_name),
            on_progress: self.on_progress.or(base.on_progress),
            signal: self.signal.or(base.signal),
        }
    }

    /// Resolves defaults and clamps quality.
    pub fn normalize(self) -> NormalizedOptions {
        NormalizedOptions {
            constraints: EngineConstraints {
                max_size_mb: self.max_size_mb.unwrap_or(DEFAULT_MAX_SIZE_MB),
                max_width_or_height: self
                    .max_width_or_height
                    .unwrap_or(DEFAULT_MAX_WIDTH_OR_HEIGHT),
                use_web_worker: self.use_web_worker.unwrap_or(DEFAULT_USE_WEB_WORKER),
                initial_quality: clamp_quality(
                    self.initial_quality.unwrap_or(DEFAULT_INITIAL_QUALITY),
                ),
                max_iteration: self.max_iteration.unwrap_or(DEFAULT_MAX_ITERATION),
                file_type: non_empty(self.file_type),
                preserve_exif: self.preserve_exif.unwrap_or(DEFAULT_PRESERVE_EXIF),
                progress: ProgressReporter::new(self.on_progress),
                signal: self.signal,
            },
            file_name: non_empty(self.file_name),
        }
    }
}

impl fmt::Debug for CompressOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompressOptions")
            .field("max_size_mb", &self.max_size_mb)
            .field("max_width_or_height", &self.max_width_or_height)
            .field("use_web_worker", &self.use_web_worker)
            .field("initial_quality", &self.initial_quality)
            .field("max_iteration", &self.max_iteration)
            .field("file_type", &self.file_type)
            .field("preserve_exif", &self.preserve_exif)
            .field("file_name", &self.file_name)
            .field("on_progress", &self.on_progress.is_some())
            .field("signal", &self.signal)
            .finish()
    }
}

/// Options after defaults are applied: what the engine receives plus the
/// facade-only output name override.
#[derive(Debug, Clone)]
pub struct NormalizedOptions {
    pub constraints: EngineConstraints,
    pub file_name: Option<String>,
}

/// Clamps a quality factor to `[0, 1]`. NaN falls back to the default.
pub fn clamp_quality(quality: f64) -> f64 {
    if quality.is_nan() {
        DEFAULT_INITIAL_QUALITY
    } else {
        quality.clamp(0.0, 1.0)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_defaults() {
        let normalized = CompressOptions::new().normalize();
        let c = &normalized.constraints;
        assert_eq!(c.max_size_mb, 1.0);
        assert_eq!(c.max_width_or_height, 1920);
        assert!(c.use_web_worker);
        assert_eq!(c.initial_quality, 0.92);
        assert_eq!(c.max_iteration, 10);
        assert_eq!(c.file_type, None);
        assert!(!c.preserve_exif);
        assert!(!c.progress.is_enabled());
        assert!(c.signal.is_none());
        assert_eq!(normalized.file_name, None);
    }

    #[test]
    fn test_normalize_clamps_quality() {
        let low = CompressOptions::new().initial_quality(-5.0).normalize();
        assert_eq!(low.constraints.initial_quality, 0.0);

        let high = CompressOptions::new().initial_quality(1.7).normalize();
        assert_eq!(high.constraints.initial_quality, 1.0);

        let nan = CompressOptions::new().initial_quality(f64::NAN).normalize();
        assert_eq!(nan.constraints.initial_quality, 0.92);
    }

    #[test]
    fn test_normalize_treats_empty_strings_as_absent() {
        let normalized = CompressOptions::new().file_type("").file_name("  ").normalize();
        assert_eq!(normalized.constraints.file_type, None);
        assert_eq!(normalized.file_name, None);
    }

    #[test]
    fn test_or_prefers_explicit_fields() {
        let base = CompressOptions::new()
            .max_size_mb(2.0)
            .max_iteration(3)
            .file_type("image/png");
        let merged = CompressOptions::new().max_size_mb(0.5).or(base);
        assert_eq!(merged.max_size_mb, Some(0.5));
        assert_eq!(merged.max_iteration, Some(3));
        assert_eq!(merged.file_type.as_deref(), Some("image/png"));
    }

    #[test]
    fn test_deserialize_from_toml() {
        let options: CompressOptions = toml::from_str(
            "max_size_mb = 0.5\nmax_width_or_height = 1280\nfile_type = \"image/webp\"\n",
        )
        .unwrap();
        assert_eq!(options.max_size_mb, Some(0.5));
        assert_eq!(options.max_width_or_height, Some(1280));
        assert_eq!(options.file_type.as_deref(), Some("image/webp"));
        assert!(options.on_progress.is_none());

        assert!(toml::from_str::<CompressOptions>("unknown = 1").is_err());
    }
}
