pub const DEFAULT_MAX_SIZE_MB: f64 = 1.0;
pub const DEFAULT_MAX_WIDTH_OR_HEIGHT: u32 = 1920;
pub const DEFAULT_USE_WEB_WORKER: bool = true;
pub const DEFAULT_INITIAL_QUALITY: f64 = 0.92;
pub const DEFAULT_MAX_ITERATION: u32 = 10;
pub const DEFAULT_PRESERVE_EXIF: bool = false;

pub const FALLBACK_MIME_TYPE: &str = "image/jpeg";
pub const FALLBACK_BASE_NAME: &str = "image";
pub const COMPRESSED_SUFFIX: &str = "compressed";

pub const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Per-iteration shrink factor applied to both edges and to quality.
pub const ITERATION_SCALE: f64 = 0.95;

pub const MAX_FILE_SIZE: u64 = 100 * 1024 * 1024;
pub const MAX_IMAGE_DIMENSION: u32 = 16384;

pub const AVIF_ENCODER_SPEED: u8 = 8;

pub const ZOPFLI_ITERATIONS: u8 = 15;
pub const LIBDEFLATER_HIGH_LEVEL: u8 = 12;
pub const LIBDEFLATER_LOW_LEVEL: u8 = 8;
pub const OXIPNG_PRESET: u8 = 4;

pub const OBJECT_URL_SCHEME: &str = "blob:img-squeeze/";

pub const MAX_BATCH_FILES: usize = 10_000;

pub const PROGRESS_BAR_TEMPLATE: &str =
    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos:>3}% {msg}";
pub const BATCH_PROGRESS_TEMPLATE: &str =
    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}";

pub const SUPPORTED_IMAGE_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "webp", "bmp", "tiff", "tif", "gif", "avif",
];

pub const DEFAULT_CONFIG_FILE: &str = "img-squeeze.toml";

/// Above this pixel count PNG output skips zopfli regardless of quality.
pub const ZOPFLI_MAX_PIXELS: u64 = 1_000_000;
