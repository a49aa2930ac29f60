use crate::options::CompressOptions;
use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "img-squeeze",
    about = "Shrink images to a byte budget and a maximum edge length",
    long_about = "img-squeeze re-encodes images until they fit a target size, scaling down \
                  and lowering quality step by step. It supports JPEG, PNG, WebP, AVIF, GIF \
                  and BMP output, optional EXIF preservation, data URL output and parallel \
                  batch processing.",
    version,
    after_help = "EXAMPLES:\n  \
    img-squeeze compress photo.jpg -o ./out --max-size-mb 0.5\n  \
    img-squeeze batch \"./images/*.png\" ./compressed -r -j 4 --file-type image/webp\n  \
    img-squeeze data-url icon.png --max-width-or-height 64"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(short = 'v', long, global = true, help = "Show debug logs")]
    pub verbose: bool,

    #[arg(
        short = 'q',
        long,
        global = true,
        conflicts_with = "verbose",
        help = "Only print errors"
    )]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(
        about = "Compress a single image file",
        long_about = "Compress one image and write it as <name>.compressed.<ext> \
                      into the output directory."
    )]
    Compress {
        #[arg(help = "Input image file path")]
        input: PathBuf,

        #[arg(
            short = 'o',
            long,
            help = "Output directory (default: the input's directory)"
        )]
        output_dir: Option<PathBuf>,

        #[arg(long, help = "Exact output file name")]
        file_name: Option<String>,

        #[command(flatten)]
        compression: CompressionArgs,
    },

    #[command(
        about = "Compress multiple images in parallel",
        long_about = "Process multiple images concurrently. \
                      Supports directory traversal, glob patterns, and recursive processing."
    )]
    Batch {
        #[arg(
            help = "Input directory, file pattern, or glob",
            long_help = "Input can be a directory path, file pattern, or glob expression. \
                         Examples: './images', '*.jpg', '/path/to/images/*.png'"
        )]
        input: String,

        #[arg(help = "Output directory path")]
        output_dir: PathBuf,

        #[arg(short = 'r', long, help = "Process subdirectories recursively")]
        recursive: bool,

        #[arg(
            short = 'j',
            long,
            help = "Number of files processed at once (default: CPU count)",
            long_help = "Number of files compressed concurrently. Also sizes the worker \
                         thread pool. If not specified, uses the number of CPU cores."
        )]
        jobs: Option<usize>,

        #[command(flatten)]
        compression: CompressionArgs,
    },

    #[command(
        name = "data-url",
        about = "Compress an image and print it as a data URL",
        long_about = "Compress one image and print `data:<mime>;base64,<payload>` to stdout."
    )]
    DataUrl {
        #[arg(help = "Input image file path")]
        input: PathBuf,

        #[command(flatten)]
        compression: CompressionArgs,
    },
}

/// Compression flags shared by every subcommand. Unset flags fall back to
/// the config file, then to built-in defaults.
#[derive(ClapArgs, Debug, Clone, Default)]
pub struct CompressionArgs {
    #[arg(long, help = "Target size in megabytes (default: 1)")]
    pub max_size_mb: Option<f64>,

    #[arg(
        long,
        help = "Longest allowed edge in pixels (default: 1920)",
        long_help = "Scale the image down so neither edge exceeds this many pixels, \
                     preserving aspect ratio. 0 disables the cap."
    )]
    pub max_width_or_height: Option<u32>,

    #[arg(
        long,
        help = "Starting quality from 0.0 to 1.0 (default: 0.92)",
        long_help = "Starting quality for lossy formats, from 0.0 to 1.0; values outside \
                     the range are clamped. For PNG, >= 0.9 uses Zopfli on small images."
    )]
    pub quality: Option<f64>,

    #[arg(long, help = "Maximum re-encoding rounds (default: 10)")]
    pub max_iteration: Option<u32>,

    #[arg(
        long,
        help = "Output media type, e.g. image/webp",
        long_help = "Force the output type. Accepts media types (image/webp) or short \
                     names (jpeg, png, webp, avif, gif, bmp)."
    )]
    pub file_type: Option<String>,

    #[arg(long, help = "Copy EXIF metadata from JPEG input to JPEG output")]
    pub preserve_exif: bool,

    #[arg(long, help = "Compress on the calling task instead of the worker pool")]
    pub no_worker: bool,

    #[arg(long, help = "TOML file with default options (default: ./img-squeeze.toml)")]
    pub config: Option<PathBuf>,
}

impl CompressionArgs {
    /// Options explicitly set on the command line.
    pub fn to_options(&self) -> CompressOptions {
        CompressOptions {
            max_size_mb: self.max_size_mb,
            max_width_or_height: self.max_width_or_height,
            use_web_worker: self.no_worker.then_some(false),
            initial_quality: self.quality,
            max_iteration: self.max_iteration,
            file_type: self.file_type.as_deref().map(normalize_file_type),
            preserve_exif: self.preserve_exif.then_some(true),
            ..CompressOptions::default()
        }
    }
}

/// Expands short format names to media types; media types pass through.
fn normalize_file_type(value: &str) -> String {
    match value.parse::<crate::formats::OutputFormat>() {
        Ok(format) => format.mime_type().to_string(),
        Err(_) => value.to_string(),
    }
}
