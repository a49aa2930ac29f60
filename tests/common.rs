#![allow(dead_code)]

use image::{ImageFormat, Rgb, RgbImage};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A noisy gradient; noise keeps encoders from collapsing it to nothing.
pub fn gradient_image(width: u32, height: u32) -> RgbImage {
    let mut state: u32 = 0x1234_5678;
    RgbImage::from_fn(width, height, |x, y| {
        state ^= state << 13;
        state ^= state >> 17;
        state ^= state << 5;
        let noise = (state & 0x3F) as u8;
        Rgb([
            ((x * 255 / width.max(1)) as u8).wrapping_add(noise),
            ((y * 255 / height.max(1)) as u8).wrapping_add(noise / 2),
            noise.wrapping_mul(3),
        ])
    })
}

pub fn write_image(path: &Path, width: u32, height: u32, format: ImageFormat) {
    gradient_image(width, height)
        .save_with_format(path, format)
        .unwrap();
}

pub fn encode_image(width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
    let mut buffer = std::io::Cursor::new(Vec::new());
    gradient_image(width, height)
        .write_to(&mut buffer, format)
        .unwrap();
    buffer.into_inner()
}

/// Writes real images plus one non-image file into `temp_dir`.
pub fn create_test_image_files(temp_dir: &Path) -> Vec<PathBuf> {
    let jpg_file = temp_dir.join("test.jpg");
    let png_file = temp_dir.join("test.png");
    let txt_file = temp_dir.join("test.txt");

    write_image(&jpg_file, 120, 80, ImageFormat::Jpeg);
    write_image(&png_file, 64, 64, ImageFormat::Png);
    File::create(&txt_file)
        .unwrap()
        .write_all(b"not an image")
        .unwrap();

    vec![jpg_file, png_file, txt_file]
}

pub fn create_nested_directory_structure(temp_dir: &Path) -> PathBuf {
    let subdir = temp_dir.join("subdir");
    std::fs::create_dir(&subdir).unwrap();

    write_image(&subdir.join("nested.png"), 40, 30, ImageFormat::Png);
    File::create(subdir.join("nested.txt"))
        .unwrap()
        .write_all(b"nested text")
        .unwrap();

    subdir
}

pub fn create_temp_directory() -> TempDir {
    TempDir::new().unwrap()
}
