pub mod batch;
pub mod cli;
pub mod compressor;
pub mod config;
pub mod constants;
pub mod data_url;
pub mod engine;
pub mod error;
pub mod formats;
pub mod logger;
pub mod metadata;
pub mod options;
pub mod payload;
pub mod progress;
pub mod registry;
pub mod signal;

pub use batch::{batch_compress_images, collect_image_files, is_image_file, BatchSummary};
pub use compressor::{compress_image, DataUrlOutput, ImageCompressor, ObjectUrlOutput};
pub use engine::{CompressionEngine, EncodedImage, EngineConstraints, ImageEngine};
pub use error::{CompressionError, Result};
pub use formats::{derive_output_name, mime_to_ext, OutputFormat};
pub use options::{clamp_quality, CompressOptions, NormalizedOptions};
pub use payload::{ImageBlob, ImageFile, ImageInput};
pub use progress::{ProgressHandler, ProgressReporter};
pub use registry::{ObjectUrlRegistry, ObjectUrlRevoker};
pub use signal::{AbortController, AbortSignal};
