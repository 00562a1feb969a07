//! Process-wide scaling filter and the resampler it drives.
//!
//! Reuses the `image` crate's resizer rather than hand-rolling one.

use std::sync::atomic::{AtomicU8, Ordering};

use image::imageops::{resize, FilterType};
use image::{ImageBuffer, Rgba};

use crate::glyph::{PixelFormat, PixelImage};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScalingFilter {
    None,
    Nearest,
    Bilinear,
    Cubic,
    Lanczos3,
}

impl ScalingFilter {
    fn to_bits(self) -> u8 {
        match self {
            ScalingFilter::None => 0,
            ScalingFilter::Nearest => 1,
            ScalingFilter::Bilinear => 2,
            ScalingFilter::Cubic => 3,
            ScalingFilter::Lanczos3 => 4,
        }
    }

    fn from_bits(bits: u8) -> ScalingFilter {
        match bits {
            0 => ScalingFilter::None,
            1 => ScalingFilter::Nearest,
            2 => ScalingFilter::Bilinear,
            3 => ScalingFilter::Cubic,
            _ => ScalingFilter::Lanczos3,
        }
    }
}

// Lanczos3 is the highest-quality option and what upstream `fcft` defaults
// to; picked here as the out-of-the-box default absent any `init()` call.
static FILTER: AtomicU8 = AtomicU8::new(4);

/// Sets the process-wide scaling filter. Always succeeds.
pub fn set_scaling_filter(filter: ScalingFilter) -> bool {
    FILTER.store(filter.to_bits(), Ordering::Relaxed);
    true
}

pub(crate) fn current_filter() -> ScalingFilter {
    ScalingFilter::from_bits(FILTER.load(Ordering::Relaxed))
}

/// Resample an `A8R8G8B8` image by `factor` using the process-wide filter.
/// `factor` is the pixel-size fixup; values near 1.0 are a no-op.
/// `ScalingFilter::None` is a byte-for-byte passthrough regardless of
/// `factor`.
pub(crate) fn resample(image: &PixelImage, factor: f64) -> PixelImage {
    debug_assert_eq!(image.format, PixelFormat::A8R8G8B8);
    if (factor - 1.0).abs() < f64::EPSILON {
        return image.clone();
    }

    let filter = match current_filter() {
        ScalingFilter::None => return image.clone(),
        ScalingFilter::Nearest => FilterType::Nearest,
        ScalingFilter::Bilinear => FilterType::Triangle,
        ScalingFilter::Cubic => FilterType::CatmullRom,
        ScalingFilter::Lanczos3 => FilterType::Lanczos3,
    };

    // Our A8R8G8B8 bytes are stored B,G,R,A (little-endian 0xAARRGGBB word);
    // image::Rgba expects R,G,B,A, so swap on the way in and out.
    let mut src: ImageBuffer<Rgba<u8>, Vec<u8>> = ImageBuffer::new(image.width, image.height);
    for y in 0..image.height {
        let row_start = (y * image.stride) as usize;
        for x in 0..image.width {
            let i = row_start + (x * 4) as usize;
            let (b, g, r, a) = (image.pixels[i], image.pixels[i + 1], image.pixels[i + 2], image.pixels[i + 3]);
            src.put_pixel(x, y, Rgba([r, g, b, a]));
        }
    }

    let new_width = ((image.width as f64) * factor).round().max(1.0) as u32;
    let new_height = ((image.height as f64) * factor).round().max(1.0) as u32;
    let resized = resize(&src, new_width, new_height, filter);

    let stride = new_width * 4;
    let mut pixels = Vec::with_capacity((stride * new_height) as usize);
    for y in 0..new_height {
        for x in 0..new_width {
            let Rgba([r, g, b, a]) = *resized.get_pixel(x, y);
            pixels.extend_from_slice(&[b, g, r, a]);
        }
    }

    PixelImage { format: PixelFormat::A8R8G8B8, width: new_width, height: new_height, stride, pixels }
}
