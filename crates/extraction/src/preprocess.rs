//! Image preparation ahead of optical recognition
//!
//! resize to working width -> grayscale -> contrast stretch -> unsharp mask -> binarize

use std::io::Cursor;

use image::imageops::{self, FilterType};
use image::{DynamicImage, GrayImage, ImageFormat};

use crate::config::OcrConfig;
use crate::error::ExtractionError;

/// Decode `bytes` and return a binarized grayscale PNG ready for OCR
pub fn preprocess_for_ocr(bytes: &[u8], config: &OcrConfig) -> Result<Vec<u8>, ExtractionError> {
    let img = image::load_from_memory(bytes)?;
    let binarized = preprocess_image(&img, config)?;

    let mut out = Cursor::new(Vec::new());
    DynamicImage::ImageLuma8(binarized).write_to(&mut out, ImageFormat::Png)?;
    Ok(out.into_inner())
}

/// Same pipeline on an already decoded image
pub fn preprocess_image(img: &DynamicImage, config: &OcrConfig) -> Result<GrayImage, ExtractionError> {
    let (width, height) = (img.width(), img.height());
    if width == 0 || height == 0 {
        return Err(ExtractionError::InvalidImage(format!(
            "image has no pixels ({}x{})",
            width, height
        )));
    }

    let target_width = config.working_width.max(1);
    let target_height = scaled_height(width, height, target_width);

    let resized = img.resize_exact(target_width, target_height, FilterType::Lanczos3);
    let mut gray = resized.to_luma8();
    stretch_contrast(&mut gray);

    let mut sharpened = imageops::unsharpen(&gray, config.sharpen_sigma, 0);
    binarize(&mut sharpened, config.binarize_threshold);

    Ok(sharpened)
}

/// Height that keeps the aspect ratio at `target_width`
fn scaled_height(width: u32, height: u32, target_width: u32) -> u32 {
    let scaled = (height as f64 * target_width as f64 / width as f64).round();
    (scaled as u32).max(1)
}

/// Linear stretch of the gray levels to the full 0..=255 range
fn stretch_contrast(img: &mut GrayImage) {
    let (min, max) = img
        .pixels()
        .fold((u8::MAX, u8::MIN), |(lo, hi), p| (lo.min(p.0[0]), hi.max(p.0[0])));

    if max <= min {
        return;
    }

    let range = (max - min) as u32;
    for p in img.pixels_mut() {
        p.0[0] = (((p.0[0] - min) as u32 * 255) / range) as u8;
    }
}

fn binarize(img: &mut GrayImage, threshold: u8) {
    for p in img.pixels_mut() {
        p.0[0] = if p.0[0] >= threshold { 255 } else { 0 };
    }
}
