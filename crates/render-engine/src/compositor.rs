//! Frame compositor: fits slide images onto the output canvas.
//!
//! Every frame of the output has the same geometry, taken from the first
//! readable slide and padded to even dimensions for yuv420p.

use std::path::Path;

use image::imageops::{self, FilterType};
use image::{DynamicImage, Rgb, RgbImage};
use slidecast_common::error::{SlidecastError, SlidecastResult};

/// Largest per-axis shortfall that is padded instead of resampled.
pub const PAD_TOLERANCE_PX: u32 = 2;

/// Canvas fill colour.
const BACKGROUND: Rgb<u8> = Rgb([0, 0, 0]);

/// Output frame geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CanvasSize {
    pub width: u32,
    pub height: u32,
}

impl CanvasSize {
    /// Canvas for a source image, each axis rounded up to an even number.
    pub fn from_source(width: u32, height: u32) -> Self {
        Self {
            width: round_up_even(width.max(1)),
            height: round_up_even(height.max(1)),
        }
    }

    /// Read only the image header at `path` and derive the canvas from it.
    pub fn probe(path: &Path) -> SlidecastResult<Self> {
        let (width, height) = image::image_dimensions(path)
            .map_err(|e| SlidecastError::render(format!("{}: {e}", path.display())))?;
        Ok(Self::from_source(width, height))
    }

    /// Bytes per RGB24 frame.
    pub fn frame_bytes(&self) -> usize {
        self.width as usize * self.height as usize * 3
    }
}

fn round_up_even(value: u32) -> u32 {
    value + (value & 1)
}

/// Load the slide image at `path` and fit it onto `canvas`.
pub fn load_frame(path: &Path, canvas: CanvasSize) -> SlidecastResult<RgbImage> {
    let image = image::open(path)
        .map_err(|e| SlidecastError::render(format!("{}: {e}", path.display())))?;
    Ok(normalize_frame(&image, canvas))
}

/// Center `image` on a black canvas.
///
/// Images already within [`PAD_TOLERANCE_PX`] of the canvas on both axes
/// (and no larger) are placed as is. Anything else is scaled uniformly to
/// fit with a bicubic filter.
pub fn normalize_frame(image: &DynamicImage, canvas: CanvasSize) -> RgbImage {
    let source = image.to_rgb8();
    let (src_w, src_h) = source.dimensions();

    let fits = src_w <= canvas.width
        && src_h <= canvas.height
        && canvas.width - src_w <= PAD_TOLERANCE_PX
        && canvas.height - src_h <= PAD_TOLERANCE_PX;

    let placed = if fits {
        source
    } else {
        let (w, h) = fit_within(src_w, src_h, canvas);
        imageops::resize(&source, w, h, FilterType::CatmullRom)
    };

    if placed.dimensions() == (canvas.width, canvas.height) {
        return placed;
    }

    let mut frame = RgbImage::from_pixel(canvas.width, canvas.height, BACKGROUND);
    let x = (canvas.width - placed.width()) / 2;
    let y = (canvas.height - placed.height()) / 2;
    imageops::overlay(&mut frame, &placed, i64::from(x), i64::from(y));
    frame
}

/// Largest size with the source aspect ratio that fits inside `canvas`.
fn fit_within(src_w: u32, src_h: u32, canvas: CanvasSize) -> (u32, u32) {
    let scale_x = canvas.width as f64 / src_w.max(1) as f64;
    let scale_y = canvas.height as f64 / src_h.max(1) as f64;
    let scale = scale_x.min(scale_y);
    let w = ((src_w as f64 * scale).floor() as u32).clamp(1, canvas.width);
    let h = ((src_h as f64 * scale).floor() as u32).clamp(1, canvas.height);
    (w, h)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid(w: u32, h: u32, value: u8) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(w, h, Rgb([value, value, value])))
    }

    #[test]
    fn test_canvas_rounds_up_to_even() {
        assert_eq!(CanvasSize::from_source(1919, 1081), CanvasSize { width: 1920, height: 1082 });
        assert_eq!(CanvasSize::from_source(2560, 1440), CanvasSize { width: 2560, height: 1440 });
        assert_eq!(CanvasSize::from_source(1, 1), CanvasSize { width: 2, height: 2 });
    }

    #[test]
    fn test_odd_image_is_padded_not_scaled() {
        let canvas = CanvasSize::from_source(101, 51);
        let frame = normalize_frame(&solid(101, 51, 200), canvas);
        assert_eq!(frame.dimensions(), (102, 52));
        // Content starts at the origin: (102 - 101) / 2 == 0.
        assert_eq!(frame.get_pixel(0, 0), &Rgb([200, 200, 200]));
        assert_eq!(frame.get_pixel(100, 50), &Rgb([200, 200, 200]));
        // Padding column and row are background.
        assert_eq!(frame.get_pixel(101, 0), &BACKGROUND);
        assert_eq!(frame.get_pixel(0, 51), &BACKGROUND);
    }

    #[test]
    fn test_larger_image_is_letterboxed() {
        let canvas = CanvasSize { width: 100, height: 100 };
        let frame = normalize_frame(&solid(200, 100, 255), canvas);
        assert_eq!(frame.dimensions(), (100, 100));
        // Scaled to 100x50 and centered vertically at y = 25.
        assert_eq!(frame.get_pixel(50, 10), &BACKGROUND);
        assert_eq!(frame.get_pixel(50, 50), &Rgb([255, 255, 255]));
        assert_eq!(frame.get_pixel(50, 90), &BACKGROUND);
    }

    #[test]
    fn test_small_image_is_upscaled_to_fit() {
        let canvas = CanvasSize { width: 100, height: 100 };
        let frame = normalize_frame(&solid(10, 20, 255), canvas);
        // Scaled to 50x100 and centered horizontally at x = 25.
        assert_eq!(frame.get_pixel(10, 50), &BACKGROUND);
        assert_eq!(frame.get_pixel(50, 50), &Rgb([255, 255, 255]));
        assert_eq!(frame.get_pixel(90, 50), &BACKGROUND);
    }

    #[test]
    fn test_fit_within_preserves_aspect() {
        let canvas = CanvasSize { width: 1920, height: 1080 };
        assert_eq!(fit_within(2560, 1440, canvas), (1920, 1080));
        assert_eq!(fit_within(1000, 1000, canvas), (1080, 1080));
    }
}
