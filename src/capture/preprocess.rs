//! OCR preprocessing pipeline.
//!
//! The step order is fixed: grayscale → upscale → median denoise → sharpen
//! → binarize → invert. Threshold and sharpen are sensitive to what ran
//! before them, so steps may be toggled but never reordered.

use image::imageops::{self, FilterType};
use image::{DynamicImage, GrayImage};
use imageproc::contrast::{threshold, ThresholdType};
use imageproc::filter::median_filter;

#[derive(Debug, Clone, Copy)]
pub struct PreprocessOptions {
    /// Binarization cutoff: luma above this becomes white, at or below black.
    pub threshold: u8,
    /// Geometric upscale factor; values <= 1.0 disable upscaling.
    pub upscale: f32,
    /// Median filter kernel size; 0 disables denoising.
    pub denoise_kernel: u32,
    pub sharpen: bool,
    /// For light text on dark backgrounds.
    pub invert: bool,
}

impl PreprocessOptions {
    pub fn from_config(cfg: &crate::config::Config) -> Self {
        Self {
            threshold: cfg.threshold,
            upscale: cfg.upscale,
            denoise_kernel: cfg.denoise_kernel,
            sharpen: cfg.sharpen,
            invert: cfg.invert,
        }
    }
}

/// Runs the preprocessing pipeline over a frame. Fully deterministic: the
/// same frame and options always produce the same output image.
pub fn prepare_for_ocr(frame: &DynamicImage, opts: &PreprocessOptions) -> DynamicImage {
    let mut gray: GrayImage = frame.to_luma8();

    if opts.upscale > 1.0 {
        let w = ((gray.width() as f32) * opts.upscale).round().max(1.0) as u32;
        let h = ((gray.height() as f32) * opts.upscale).round().max(1.0) as u32;
        gray = imageops::resize(&gray, w, h, FilterType::CatmullRom);
    }

    if opts.denoise_kernel > 0 {
        // Kernel size maps onto the filter radius: 3 → 1, 5 → 2, ...
        let radius = (opts.denoise_kernel / 2).max(1);
        gray = median_filter(&gray, radius, radius);
    }

    if opts.sharpen {
        gray = imageops::unsharpen(&gray, 1.0, 2);
    }

    gray = threshold(&gray, opts.threshold, ThresholdType::Binary);

    if opts.invert {
        imageops::invert(&mut gray);
    }

    DynamicImage::ImageLuma8(gray)
}
