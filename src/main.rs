use anyhow::{bail, Context, Result};
use clap::Parser;
use img_squeeze::cli::{Args, Commands, CompressionArgs};
use img_squeeze::constants::{BATCH_PROGRESS_TEMPLATE, PROGRESS_BAR_TEMPLATE};
use img_squeeze::{
    batch_compress_images, collect_image_files, config, logger, AbortController, AbortSignal,
    CompressOptions, ImageCompressor, ImageFile,
};
use indicatif::{ProgressBar, ProgressStyle};
use rayon::ThreadPoolBuilder;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    logger::init_logging(args.verbose, args.quiet)?;

    let controller = AbortController::new();
    let signal = controller.signal();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, aborting");
            controller.abort();
        }
    });

    let quiet = args.quiet;
    match args.command {
        Commands::Compress {
            input,
            output_dir,
            file_name,
            compression,
        } => {
            let mut options = build_options(&compression, signal)?;
            if file_name.is_some() {
                options.file_name = file_name;
            }
            compress_file(&input, output_dir, options, quiet).await?;
        }
        Commands::Batch {
            input,
            output_dir,
            recursive,
            jobs,
            compression,
        } => {
            let jobs = jobs.unwrap_or_else(num_cpus::get).max(1);
            setup_thread_pool(jobs);
            let options = build_options(&compression, signal)?;
            run_batch(&input, &output_dir, recursive, jobs, options, quiet).await?;
        }
        Commands::DataUrl { input, compression } => {
            let options = build_options(&compression, signal)?;
            let file = ImageFile::from_path(&input)
                .await
                .with_context(|| format!("failed to read {}", input.display()))?;
            let bar = progress_bar(quiet)?;
            let options = attach_progress(options, &bar);
            let output = ImageCompressor::default()
                .compress_to_data_url(file, options)
                .await?;
            bar.finish_and_clear();
            println!("{}", output.data_url);
        }
    }

    Ok(())
}

/// Command-line flags win over the config file, which wins over defaults.
fn build_options(compression: &CompressionArgs, signal: AbortSignal) -> Result<CompressOptions> {
    let defaults = config::load_defaults(compression.config.as_deref())?;
    Ok(compression.to_options().or(defaults).signal(signal))
}

fn setup_thread_pool(num_threads: usize) {
    if let Err(e) = ThreadPoolBuilder::new()
        .num_threads(num_threads)
        .build_global()
    {
        tracing::warn!("Failed to set thread pool size: {}", e);
    }
}

fn progress_bar(quiet: bool) -> Result<ProgressBar> {
    if quiet {
        return Ok(ProgressBar::hidden());
    }
    let bar = ProgressBar::new(100);
    bar.set_style(ProgressStyle::with_template(PROGRESS_BAR_TEMPLATE)?.progress_chars("#>-"));
    Ok(bar)
}

fn attach_progress(options: CompressOptions, bar: &ProgressBar) -> CompressOptions {
    let bar = bar.clone();
    options.on_progress(move |percent| bar.set_position(percent.round() as u64))
}

async fn compress_file(
    input: &Path,
    output_dir: Option<PathBuf>,
    options: CompressOptions,
    quiet: bool,
) -> Result<()> {
    let file = ImageFile::from_path(input)
        .await
        .with_context(|| format!("failed to read {}", input.display()))?;
    let output_dir = output_dir.unwrap_or_else(|| {
        input
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."))
    });

    if !quiet {
        println!("🗜️  Compressing image: {}", input.display());
    }
    let bar = progress_bar(quiet)?;
    bar.set_message(file.name().to_string());
    let options = attach_progress(options, &bar);

    let original_size = file.size();
    let compressed = ImageCompressor::default().compress(file, options).await?;
    bar.finish_with_message("✅ Compression complete");

    let output = compressed.write_to_dir(&output_dir).await?;
    if !quiet {
        let ratio = (original_size as f64 - compressed.size() as f64) / original_size as f64 * 100.0;
        println!("📁 Output: {}", output.display());
        println!("📊 Original size: {} bytes", original_size);
        println!("📈 Compressed size: {} bytes", compressed.size());
        if ratio > 0.0 {
            println!("✅ Successfully reduced file size by {:.1}%", ratio);
        } else {
            println!("⚠️  File size unchanged or increased by {:.1}%", ratio.abs());
        }
    }
    Ok(())
}

async fn run_batch(
    input: &str,
    output_dir: &Path,
    recursive: bool,
    jobs: usize,
    options: CompressOptions,
    quiet: bool,
) -> Result<()> {
    let files = collect_image_files(input, recursive)?;
    if files.is_empty() {
        if !quiet {
            println!("⚠️  No image files found in the input path");
        }
        return Ok(());
    }

    if !quiet {
        println!("🚀 Starting batch compression...");
        println!("📊 Found {} image files to process", files.len());
    }

    let bar = if quiet {
        ProgressBar::hidden()
    } else {
        let bar = ProgressBar::new(files.len() as u64);
        bar.set_style(ProgressStyle::with_template(BATCH_PROGRESS_TEMPLATE)?.progress_chars("#>-"));
        bar
    };
    let tick = bar.clone();

    let summary = batch_compress_images(
        Arc::new(ImageCompressor::default()),
        files,
        output_dir,
        options,
        jobs,
        Some(Arc::new(move |_: &Path, _: bool| tick.inc(1))),
    )
    .await?;
    bar.finish_with_message("✅ Batch compression complete");

    if !quiet {
        println!("\n📊 Batch Compression Summary:");
        println!("  📁 Total files processed: {}", summary.processed);
        println!("  📊 Total original size: {} bytes", summary.bytes_before);
        println!("  📊 Total compressed size: {} bytes", summary.bytes_after);
        println!("  🎯 Overall compression ratio: {:.1}%", summary.compression_ratio());
        println!("  ⏱️  Total time: {:?}", summary.elapsed);
        println!("  ⚡ Average speed: {:.2} files/second", summary.files_per_second());
        if summary.failed > 0 {
            println!("  ⚠️  Failed files: {}", summary.failed);
        }
    }
    for (path, reason) in &summary.failures {
        eprintln!("❌ Failed to process {}: {}", path.display(), reason);
    }

    if summary.aborted {
        bail!("batch aborted after {} files", summary.processed + summary.failed);
    }
    Ok(())
}
