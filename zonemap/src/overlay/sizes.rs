//! Overlay element sizing.
//!
//! Font sizes, stroke widths, icon sizes and line widths are deterministic
//! clamped functions of (zoom, size multiplier). The same tuple recurs for
//! nearly every zone in a render pass, so results are memoized; keys use
//! the raw f64 bit patterns since the inputs come from a finite set of
//! exact values, never from arithmetic noise.

use crate::coord::MapCoordinateSystem;
use crate::util::Memo;

type SizeKey = (u64, u64, u64);

/// Memoized size functions shared by all overlays of a render session.
#[derive(Debug, Default)]
pub struct SizeTables {
    main_font: Memo<SizeKey, u32>,
    sub_font: Memo<SizeKey, u32>,
    legend_font: Memo<SizeKey, u32>,
    icon: Memo<SizeKey, u32>,
    line: Memo<SizeKey, u32>,
    outline: Memo<u32, u32>,
}

fn key(coord: &MapCoordinateSystem, multiplier: f64) -> SizeKey {
    // Zoom factor varies per continent, so it is part of the key.
    (
        coord.zoom().to_bits(),
        coord.params().zoom_factor.to_bits(),
        multiplier.to_bits(),
    )
}

impl SizeTables {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&self) {
        self.main_font.clear();
        self.sub_font.clear();
        self.legend_font.clear();
        self.icon.clear();
        self.line.clear();
        self.outline.clear();
    }

    /// Base scaling term: `multiplier * zoom_factor ^ zoom`. Every other
    /// size is a clamped linear function of this.
    pub fn zoom_size_multiplier(&self, coord: &MapCoordinateSystem, multiplier: f64) -> f64 {
        multiplier * coord.params().zoom_factor.powf(coord.zoom())
    }

    pub fn main_label_font_size(&self, coord: &MapCoordinateSystem, multiplier: f64) -> u32 {
        self.main_font.get_or_insert_with(key(coord, multiplier), || {
            clamp_round(2.5 * self.zoom_size_multiplier(coord, multiplier), 8, 64)
        })
    }

    pub fn sub_label_font_size(&self, coord: &MapCoordinateSystem, multiplier: f64) -> u32 {
        self.sub_font.get_or_insert_with(key(coord, multiplier), || {
            clamp_round(2.0 * self.zoom_size_multiplier(coord, multiplier), 8, 32)
        })
    }

    pub fn legend_font_size(&self, coord: &MapCoordinateSystem, multiplier: f64) -> u32 {
        self.legend_font.get_or_insert_with(key(coord, multiplier), || {
            clamp_round(2.0 * self.zoom_size_multiplier(coord, multiplier), 10, 28)
        })
    }

    pub fn icon_size(&self, coord: &MapCoordinateSystem, multiplier: f64) -> u32 {
        self.icon.get_or_insert_with(key(coord, multiplier), || {
            clamp_round(3.0 * self.zoom_size_multiplier(coord, multiplier), 12, 32)
        })
    }

    pub fn line_width(&self, coord: &MapCoordinateSystem, multiplier: f64) -> u32 {
        self.line.get_or_insert_with(key(coord, multiplier), || {
            clamp_round(0.3 * self.zoom_size_multiplier(coord, multiplier), 1, 32)
        })
    }

    pub fn text_outline_width(&self, font_size: u32) -> u32 {
        self.outline
            .get_or_insert_with(font_size, || clamp_round(0.1 * font_size as f64, 1, 8))
    }
}

fn clamp_round(value: f64, min: u32, max: u32) -> u32 {
    (value.round() as i64).clamp(min as i64, max as i64) as u32
}
