//! Multi-sector canvas compositor.
//!
//! Merges the assembled sector images of a layout into one canvas, with a
//! translucent outlined rectangle around each part's footprint to mark the
//! seams. Pure function of its inputs.

use image::{Rgba, RgbaImage};
use imageproc::drawing::{draw_hollow_rect_mut, Blend};
use imageproc::rect::Rect;

use crate::coord::PixelPoint;

/// Seam outline color: translucent white.
const OUTLINE_COLOR: Rgba<u8> = Rgba([255, 255, 255, 95]);

/// Merges part images into a bounding canvas, drawing a seam outline of
/// the given width around each part before pasting it.
///
/// The outline width is the overlay line width for the render's zoom and
/// scale, computed by the caller.
pub fn combine_part_images(parts: &[(PixelPoint, RgbaImage)], outline_width: u32) -> RgbaImage {
    let total_w = parts
        .iter()
        .map(|(offset, image)| offset.0 + image.width() as i64)
        .max()
        .unwrap_or(0)
        .max(0) as u32;
    let total_h = parts
        .iter()
        .map(|(offset, image)| offset.1 + image.height() as i64)
        .max()
        .unwrap_or(0)
        .max(0) as u32;

    let mut canvas = Blend(RgbaImage::from_pixel(total_w, total_h, Rgba([0, 0, 0, 255])));

    for (offset, image) in parts {
        // The outline band sits entirely outside the part footprint: rings
        // from the footprint inflated by 1 up to inflated by outline_width.
        for inflation in 1..=outline_width as i64 {
            let x = offset.0 - inflation;
            let y = offset.1 - inflation;
            let w = image.width() as i64 + 2 * inflation;
            let h = image.height() as i64 + 2 * inflation;
            draw_hollow_rect_mut(
                &mut canvas,
                Rect::at(x as i32, y as i32).of_size(w as u32, h as u32),
                OUTLINE_COLOR,
            );
        }
        image::imageops::overlay(&mut canvas.0, image, offset.0, offset.1);
    }

    canvas.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid(w: u32, h: u32, color: Rgba<u8>) -> RgbaImage {
        RgbaImage::from_pixel(w, h, color)
    }

    #[test]
    fn test_single_part_fills_its_own_canvas() {
        let part = solid(100, 100, Rgba([50, 60, 70, 255]));
        let combined = combine_part_images(&[((0, 0), part)], 7);

        assert_eq!(combined.dimensions(), (100, 100));
        // The outline sits outside the part footprint, so the part covers
        // the canvas completely.
        for pixel in combined.pixels() {
            assert_eq!(pixel, &Rgba([50, 60, 70, 255]));
        }
    }

    #[test]
    fn test_two_parts_produce_union_canvas_with_seam_outlines() {
        let a = solid(100, 100, Rgba([10, 0, 0, 255]));
        let b = solid(80, 80, Rgba([0, 10, 0, 255]));
        let combined = combine_part_images(&[((0, 0), a), ((50, 150), b)], 7);

        // Union of (0,0)+100x100 and (50,150)+80x80.
        assert_eq!(combined.dimensions(), (130, 230));

        assert_eq!(combined.get_pixel(0, 0), &Rgba([10, 0, 0, 255]));
        assert_eq!(combined.get_pixel(99, 99), &Rgba([10, 0, 0, 255]));
        assert_eq!(combined.get_pixel(60, 160), &Rgba([0, 10, 0, 255]));

        // Just outside the second part's footprint the seam outline has
        // brightened the background.
        let seam = combined.get_pixel(49, 150);
        assert!(seam[0] > 0 && seam[0] < 255, "expected translucent seam, got {:?}", seam);

        // Well away from both parts the canvas stays black.
        assert_eq!(combined.get_pixel(120, 20), &Rgba([0, 0, 0, 255]));
    }

    #[test]
    fn test_outline_never_bleeds_into_part_interior() {
        let a = solid(40, 40, Rgba([1, 2, 3, 255]));
        let b = solid(40, 40, Rgba([4, 5, 6, 255]));
        let combined = combine_part_images(&[((0, 0), a), ((60, 0), b)], 5);

        for y in 0..40 {
            for x in 0..40 {
                assert_eq!(combined.get_pixel(x, y), &Rgba([1, 2, 3, 255]));
            }
            for x in 60..100 {
                assert_eq!(combined.get_pixel(x, y), &Rgba([4, 5, 6, 255]));
            }
        }
    }
}
