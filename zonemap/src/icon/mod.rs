//! Icon blending and stroke generation.
//!
//! Two jobs live here:
//!
//! - **Pie composites**: a portal-type key may be a slash-joined list of
//!   sub-types whose markers share one map position. Each sub-type's icon
//!   is masked to an equal pie slice starting at 12 o'clock, so every
//!   represented category stays partially visible in a single marker.
//! - **Badge halos**: access-tier badges get a colored glow generated by
//!   accumulating a radial falloff kernel under every opaque source pixel.
//!   Cost is O(icon pixels x kernel area), fine for icons a few dozen
//!   pixels wide, and results are memoized.

use std::sync::Arc;

use image::imageops::FilterType;
use image::{imageops, Rgba, RgbaImage};

use crate::util::{crop_to_content, Memo};

/// Source pixels with alpha above this contribute to the halo.
const HALO_ALPHA_THRESHOLD: u8 = 128;

/// Blends and memoizes derived icon rasters for one render session.
#[derive(Default)]
pub struct IconBlender {
    resized: Memo<(String, u32), RgbaImage>,
    composites: Memo<(String, u32), RgbaImage>,
    badges: Memo<(String, u32, u32), RgbaImage>,
    kernels: Memo<u32, Arc<Vec<f32>>>,
}

impl IconBlender {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops all memoized rasters. Called between independent runs.
    pub fn clear(&self) {
        self.resized.clear();
        self.composites.clear();
        self.badges.clear();
        self.kernels.clear();
    }

    /// Lanczos-resizes `icon` to a square of `size`, memoized by `key`.
    pub fn resized_icon(&self, key: &str, icon: &RgbaImage, size: u32) -> RgbaImage {
        self.resized
            .get_or_insert_with((key.to_string(), size), || {
                imageops::resize(icon, size, size, FilterType::Lanczos3)
            })
    }

    /// Composites the sub-icons of a slash-joined type into equal pie
    /// slices starting at the top, clockwise in declaration order.
    ///
    /// `key` identifies the composite for memoization (the full
    /// slash-joined type string).
    pub fn pie_composite(&self, key: &str, sub_icons: &[&RgbaImage], size: u32) -> RgbaImage {
        let sources: Vec<RgbaImage> = sub_icons
            .iter()
            .enumerate()
            .map(|(i, icon)| self.resized_icon(&format!("{key}#{i}"), icon, size))
            .collect();
        self.composites.get_or_insert_with((key.to_string(), size), || {
            blend_pie_slices(&sources, size)
        })
    }

    /// Generates a badge icon with a colored halo: the icon composited
    /// over a glow extending `radius` pixels beyond its opaque region,
    /// cropped to the result's content bounding box.
    pub fn outline_badge(
        &self,
        key: &str,
        icon: &RgbaImage,
        radius: u32,
        color: Rgba<u8>,
    ) -> RgbaImage {
        self.badges
            .get_or_insert_with((key.to_string(), radius, icon.width()), || {
                let kernel = self.falloff_kernel(radius);
                build_badge(icon, radius, color, &kernel)
            })
    }

    /// Radial falloff kernel for the given radius, memoized. Values run
    /// from 1.0 at the center to 0.0 past the radius.
    fn falloff_kernel(&self, radius: u32) -> Arc<Vec<f32>> {
        self.kernels.get_or_insert_with(radius, || {
            let edge = 2 * radius + 1;
            let mut kernel = Vec::with_capacity((edge * edge) as usize);
            for ky in 0..edge {
                for kx in 0..edge {
                    let dx = kx as f32 - radius as f32;
                    let dy = ky as f32 - radius as f32;
                    let distance = (dx * dx + dy * dy).sqrt();
                    kernel.push((1.0 - distance / (radius as f32 + 1.0)).clamp(0.0, 1.0));
                }
            }
            Arc::new(kernel)
        })
    }
}

fn blend_pie_slices(sources: &[RgbaImage], size: u32) -> RgbaImage {
    let mut blended = RgbaImage::new(size, size);
    if sources.is_empty() {
        return blended;
    }

    let arc_angle = 360.0 / sources.len() as f64;
    let center = size as f64 / 2.0;
    for (x, y, pixel) in blended.enumerate_pixels_mut() {
        let dx = x as f64 + 0.5 - center;
        let dy = y as f64 + 0.5 - center;
        // Angle measured clockwise from 12 o'clock.
        let angle = (dx.atan2(-dy).to_degrees() + 360.0) % 360.0;
        let slice = ((angle / arc_angle) as usize).min(sources.len() - 1);
        *pixel = *sources[slice].get_pixel(x, y);
    }
    blended
}

fn build_badge(icon: &RgbaImage, radius: u32, color: Rgba<u8>, kernel: &[f32]) -> RgbaImage {
    let (w, h) = icon.dimensions();
    let padded_w = w + 2 * radius;
    let padded_h = h + 2 * radius;
    let edge = 2 * radius + 1;

    let mut accumulated = vec![0.0f32; (padded_w * padded_h) as usize];
    for (x, y, pixel) in icon.enumerate_pixels() {
        if pixel[3] <= HALO_ALPHA_THRESHOLD {
            continue;
        }
        for ky in 0..edge {
            for kx in 0..edge {
                let px = x + kx;
                let py = y + ky;
                accumulated[(py * padded_w + px) as usize] +=
                    kernel[(ky * edge + kx) as usize];
            }
        }
    }

    let mut badge = RgbaImage::new(padded_w, padded_h);
    for (x, y, pixel) in badge.enumerate_pixels_mut() {
        let strength = accumulated[(y * padded_w + x) as usize].min(1.0);
        if strength > 0.0 {
            let alpha = (strength * color[3] as f32).round() as u8;
            *pixel = Rgba([color[0], color[1], color[2], alpha]);
        }
    }

    imageops::overlay(&mut badge, icon, radius as i64, radius as i64);
    crop_to_content(&badge, 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid(size: u32, color: Rgba<u8>) -> RgbaImage {
        RgbaImage::from_pixel(size, size, color)
    }

    #[test]
    fn test_two_way_pie_splits_left_and_right() {
        let blender = IconBlender::new();
        let red = solid(32, Rgba([255, 0, 0, 255]));
        let blue = solid(32, Rgba([0, 0, 255, 255]));

        let composite = blender.pie_composite("red/blue", &[&red, &blue], 32);

        // First slice covers 0..180 degrees clockwise from the top: the
        // right half. Second slice covers the left half.
        assert_eq!(composite.get_pixel(24, 16), &Rgba([255, 0, 0, 255]));
        assert_eq!(composite.get_pixel(7, 16), &Rgba([0, 0, 255, 255]));
    }

    #[test]
    fn test_four_way_pie_hits_all_quadrants() {
        let blender = IconBlender::new();
        let icons: Vec<RgbaImage> = (0..4u8)
            .map(|i| solid(40, Rgba([i * 60, 0, 0, 255])))
            .collect();
        let refs: Vec<&RgbaImage> = icons.iter().collect();

        let composite = blender.pie_composite("a/b/c/d", &refs, 40);

        // Clockwise from the top: NE, SE, SW, NW.
        assert_eq!(composite.get_pixel(30, 10)[0], 0);
        assert_eq!(composite.get_pixel(30, 30)[0], 60);
        assert_eq!(composite.get_pixel(10, 30)[0], 120);
        assert_eq!(composite.get_pixel(10, 10)[0], 180);
    }

    #[test]
    fn test_resized_icon_is_memoized() {
        let blender = IconBlender::new();
        let icon = solid(64, Rgba([9, 9, 9, 255]));

        let first = blender.resized_icon("dungeon", &icon, 24);
        let second = blender.resized_icon("dungeon", &icon, 24);
        assert_eq!(first.dimensions(), (24, 24));
        assert_eq!(first, second);
        assert_eq!(blender.resized.len(), 1);

        blender.clear();
        assert!(blender.resized.is_empty());
    }

    #[test]
    fn test_pie_composite_does_not_shadow_plain_resizes() {
        let blender = IconBlender::new();
        let red = solid(32, Rgba([255, 0, 0, 255]));
        let blue = solid(32, Rgba([0, 0, 255, 255]));

        let composite = blender.pie_composite("red/blue", &[&red, &blue], 32);
        assert_eq!(blender.composites.len(), 1);

        // A plain resize requested under the same key stays a plain resize
        // instead of returning the cached composite.
        let plain = blender.resized_icon("red/blue", &red, 32);
        assert_eq!(plain.get_pixel(7, 16), &Rgba([255, 0, 0, 255]));
        assert_eq!(composite.get_pixel(7, 16), &Rgba([0, 0, 255, 255]));
    }

    #[test]
    fn test_badge_halo_extends_beyond_icon() {
        let blender = IconBlender::new();
        // A small opaque square centered in a transparent field.
        let mut icon = RgbaImage::new(16, 16);
        for y in 6..10 {
            for x in 6..10 {
                icon.put_pixel(x, y, Rgba([200, 200, 200, 255]));
            }
        }

        let badge = blender.outline_badge("gw2", &icon, 3, Rgba([255, 157, 140, 255]));

        // Content grew past the 4x4 square in both axes.
        assert!(badge.width() > 4 && badge.width() <= 16 + 6);
        assert!(badge.height() > 4);

        // Center keeps the original icon pixel, composited on top.
        let center = badge.get_pixel(badge.width() / 2, badge.height() / 2);
        assert_eq!(center[3], 255);
        assert_eq!(center[0], 200);

        // Halo pixels near the edge carry the tint color.
        let edge = badge.get_pixel(0, badge.height() / 2);
        assert!(edge[3] > 0, "expected halo alpha at the badge edge");
        assert_eq!((edge[0], edge[1], edge[2]), (255, 157, 140));
    }

    #[test]
    fn test_fully_transparent_icon_produces_empty_badge() {
        let blender = IconBlender::new();
        let icon = RgbaImage::new(8, 8);
        let badge = blender.outline_badge("none", &icon, 2, Rgba([1, 2, 3, 255]));
        // No opaque source pixels, so nothing accumulates and the crop is
        // a no-op on a transparent buffer.
        assert!(badge.pixels().all(|p| p[3] == 0));
    }
}
