//! Adaptive label layout.
//!
//! Fits a zone's name (and optional secondary lines) into its destination
//! rectangle: the target line width interpolates between one and two times
//! the rectangle width based on how much vertical room the rectangle
//! offers, then a greedy word wrapper fills lines up to that width. Labels
//! are drawn into an oversized transparent buffer first and pasted onto
//! the map according to a two-letter anchor code, so multi-line labels
//! center correctly regardless of line count.
//!
//! Text measurement goes through [`FontMetricsSource`] so layout geometry
//! is testable with fixed metrics; rasterization itself always uses the
//! real font.

use ab_glyph::{FontArc, PxScale};
use image::{Rgba, RgbaImage};
use imageproc::drawing::draw_text_mut;

use crate::assets::{AssetBundle, LoadedFont};
use crate::coord::PixelPoint;
use crate::util::content_bbox;

use super::OverlayError;

const STROKE_COLOR: Rgba<u8> = Rgba([0, 0, 0, 255]);

/// Horizontal part of a label anchor code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelHAlign {
    Left,
    Middle,
    Right,
}

/// Vertical part of a label anchor code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelVAlign {
    Top,
    Middle,
    Bottom,
}

pub type LabelAnchor = (LabelHAlign, LabelVAlign);

/// Parses a two-letter anchor code (`{l,m,r}{t,m,b}`). `None` means the
/// default center anchor. A malformed code is a data-authoring error and
/// aborts the render; silently skipping the label would hide the mistake.
pub fn parse_label_anchor(anchor: Option<&str>) -> Result<LabelAnchor, OverlayError> {
    let Some(code) = anchor else {
        return Ok((LabelHAlign::Middle, LabelVAlign::Middle));
    };
    let invalid = || OverlayError::InvalidLabelAnchor(code.to_string());
    let mut chars = code.chars();
    let (Some(h), Some(v), None) = (chars.next(), chars.next(), chars.next()) else {
        return Err(invalid());
    };
    let h = match h {
        'l' => LabelHAlign::Left,
        'm' => LabelHAlign::Middle,
        'r' => LabelHAlign::Right,
        _ => return Err(invalid()),
    };
    let v = match v {
        't' => LabelVAlign::Top,
        'm' => LabelVAlign::Middle,
        'b' => LabelVAlign::Bottom,
        _ => return Err(invalid()),
    };
    Ok((h, v))
}

/// Text measurement seam for the wrap and stacking math.
pub trait FontMetricsSource {
    fn ascent(&self, size: f32) -> f32;
    /// Descent below the baseline, positive.
    fn descent(&self, size: f32) -> f32;
    fn text_width(&self, size: f32, text: &str) -> f32;
}

impl FontMetricsSource for LoadedFont {
    fn ascent(&self, size: f32) -> f32 {
        LoadedFont::ascent(self, size)
    }

    fn descent(&self, size: f32) -> f32 {
        LoadedFont::descent(self, size)
    }

    fn text_width(&self, size: f32, text: &str) -> f32 {
        LoadedFont::text_width(self, size, text)
    }
}

/// Which of the bundle's two faces a line is drawn with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontKind {
    Regular,
    SemiBold,
}

/// One colored run within a text line. `color == None` falls back to the
/// line's default color at draw time.
#[derive(Debug, Clone)]
pub struct TextLineSegment {
    pub text: String,
    pub color: Option<Rgba<u8>>,
}

impl TextLineSegment {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            color: None,
        }
    }

    pub fn colored(text: impl Into<String>, color: Rgba<u8>) -> Self {
        Self {
            text: text.into(),
            color: Some(color),
        }
    }
}

/// A fully positioned line awaiting rasterization. Lines are collected
/// first and drawn in reverse stacking order so earlier lines end up on
/// top where strokes overlap.
#[derive(Debug, Clone)]
pub struct TextLine {
    pub segments: Vec<TextLineSegment>,
    pub pos_y: f32,
    pub font: FontKind,
    pub font_size: u32,
    pub outline_width: u32,
    /// Optional icon drawn before the first segment. The icon counts
    /// toward the line's advance so icon and text stay jointly anchored.
    pub icon: Option<RgbaImage>,
}

/// Gap between an inline icon and the text that follows it.
const ICON_TEXT_GAP: f32 = 4.0;

/// Greedy word wrap: a word joins the current line unless that would
/// exceed `line_length` and the current line already has at least three
/// characters. Words longer than the line length are never split.
pub fn wrap_text_lines(
    text: &str,
    font: &dyn FontMetricsSource,
    font_size: f32,
    line_length: f64,
) -> Vec<String> {
    let mut lines = vec![String::new()];
    for (i, word) in text.split(' ').enumerate() {
        let current = lines.last().expect("lines is never empty");
        let candidate = if i > 0 {
            format!("{current} {word}")
        } else {
            word.to_string()
        };
        if f64::from(font.text_width(font_size, &candidate)) <= line_length
            || current.chars().count() < 3
        {
            *lines.last_mut().expect("lines is never empty") = candidate;
        } else {
            lines.push(word.to_string());
        }
    }
    lines
}

/// Wraps `label` to fit `label_rect`.
///
/// The target width interpolates from 2x the rectangle width (when the
/// rectangle is too short for multiple lines) down to 1x (when it is tall
/// enough for the extra lines), minus a zoom-scaled edge margin; it is
/// floored at four ascents or `width_tolerance` times the available width
/// and capped at the label buffer width. Explicit newlines always force a
/// break.
#[allow(clippy::too_many_arguments)]
pub fn wrap_label(
    label: &str,
    font: &dyn FontMetricsSource,
    font_size: f32,
    line_margin: i32,
    label_rect: (PixelPoint, PixelPoint),
    buffer_width: u32,
    edge_margin: f64,
    width_tolerance: f64,
) -> Vec<String> {
    let ascent = f64::from(font.ascent(font_size));
    let descent = f64::from(font.descent(font_size));
    let box_width = (label_rect.1 .0 - label_rect.0 .0) as f64;
    let box_height = (label_rect.1 .1 - label_rect.0 .1) as f64;

    let height_for_max_width = 2.75 * (ascent + descent + f64::from(line_margin));
    let height_for_min_width = (ascent + f64::from(line_margin)) + height_for_max_width;
    let height_diff_ratio =
        (box_height - height_for_max_width) / (height_for_min_width - height_for_max_width);
    let ideal_width = (2.0 - height_diff_ratio.clamp(0.0, 1.0)) * box_width - edge_margin;
    let min_width = (4.0 * ascent).max(width_tolerance * (box_width - edge_margin));
    let bounded_width = (buffer_width as f64).min(min_width.max(ideal_width));

    let mut lines = Vec::new();
    for input_line in label.split('\n') {
        lines.extend(wrap_text_lines(input_line, font, font_size, bounded_width));
    }
    lines
}

/// Allocates the transparent scratch buffer a zone's label is drawn into.
/// Oversized on purpose: big enough for the widest plausible wrap of
/// `name` and for anchor math against the far rectangle corner.
pub fn label_buffer(
    name: &str,
    font: &dyn FontMetricsSource,
    font_size: f32,
    label_rect: (PixelPoint, PixelPoint),
) -> RgbaImage {
    let name_width = f64::from(font.text_width(font_size, name));
    let name_height = f64::from(font.ascent(font_size) + font.descent(font_size));
    let width = 250.0_f64
        .max(name_width + 10.0)
        .max((2.0 * label_rect.1 .0 as f64 + 20.0).round());
    let height = 250.0_f64
        .max(10.0 * name_height + 10.0)
        .max((2.0 * label_rect.1 .1 as f64 + 20.0).round());
    RgbaImage::new(width.ceil() as u32, height.ceil() as u32)
}

/// Horizontal draw start inside the label buffer for the given anchor.
pub fn label_start_x(h_align: LabelHAlign, buffer_width: u32) -> f32 {
    match h_align {
        LabelHAlign::Left => 2.0,
        LabelHAlign::Middle => buffer_width as f32 / 2.0,
        LabelHAlign::Right => buffer_width as f32 - 2.0,
    }
}

/// Where to paste the label buffer onto the map so its content honors the
/// anchor. Horizontal placement uses the full buffer width; vertical
/// placement uses the drawn content's bounding box, since line count
/// varies. The small constant nudges compensate for stroke bleed.
pub fn calculate_label_paste_position(
    anchor: LabelAnchor,
    label_image: &RgbaImage,
    label_rect: (PixelPoint, PixelPoint),
) -> PixelPoint {
    let (bbox_top, bbox_bottom) = match content_bbox(label_image) {
        Some((_, top, _, bottom)) => (top as i64, bottom as i64),
        None => (0, 0),
    };
    let width = label_image.width() as i64;

    let x = match anchor.0 {
        LabelHAlign::Left => label_rect.0 .0,
        LabelHAlign::Middle => {
            (((label_rect.0 .0 + label_rect.1 .0 - width + 1) as f64) / 2.0).round() as i64
        }
        LabelHAlign::Right => label_rect.1 .0 - width,
    };
    let y = match anchor.1 {
        LabelVAlign::Top => label_rect.0 .1,
        LabelVAlign::Middle => {
            (((label_rect.0 .1 + label_rect.1 .1 - bbox_bottom + bbox_top) as f64) / 2.0).round()
                as i64
                - 2
        }
        LabelVAlign::Bottom => label_rect.1 .1 - bbox_bottom + bbox_top - 4,
    };
    (x, y)
}

/// Rasterizes one line into the label buffer. Segments are placed by
/// cumulative advance width from the anchored start position; all segments
/// share the line's stroke.
pub fn draw_text_line(
    image: &mut RgbaImage,
    line: &TextLine,
    pos_x: f32,
    default_color: Rgba<u8>,
    h_align: LabelHAlign,
    assets: &AssetBundle,
) {
    let font = match line.font {
        FontKind::Regular => assets.font_regular(),
        FontKind::SemiBold => assets.font_semibold(),
    };
    let size = line.font_size as f32;

    let full_text: String = line.segments.iter().map(|s| s.text.as_str()).collect();
    let icon_advance = line
        .icon
        .as_ref()
        .map_or(0.0, |icon| icon.width() as f32 + ICON_TEXT_GAP);
    let full_length = icon_advance + font.text_width(size, &full_text);
    let mut offset = match h_align {
        LabelHAlign::Left => 0.0,
        LabelHAlign::Middle => -full_length / 2.0,
        LabelHAlign::Right => -full_length,
    };

    if let Some(icon) = &line.icon {
        // Vertically centered on the ascent band.
        let icon_y = line.pos_y + (font.ascent(size) - icon.height() as f32) / 2.0;
        image::imageops::overlay(
            image,
            icon,
            (pos_x + offset).round() as i64,
            icon_y.round().max(0.0) as i64,
        );
        offset += icon_advance;
    }

    for segment in &line.segments {
        let color = segment.color.unwrap_or(default_color);
        draw_stroked_text(
            image,
            &segment.text,
            (pos_x + offset).round() as i32,
            line.pos_y.round() as i32,
            size,
            font.raw(),
            color,
            line.outline_width,
        );
        offset += font.text_width(size, &segment.text);
    }
}

/// Draws text with a black stroke by stamping the text at every offset
/// within the stroke radius, then drawing the fill on top.
#[allow(clippy::too_many_arguments)]
pub fn draw_stroked_text(
    image: &mut RgbaImage,
    text: &str,
    x: i32,
    y: i32,
    font_size: f32,
    font: &FontArc,
    fill: Rgba<u8>,
    outline_width: u32,
) {
    let scale = PxScale::from(font_size);
    let radius = outline_width as i32;
    for dy in -radius..=radius {
        for dx in -radius..=radius {
            if dx * dx + dy * dy <= radius * radius {
                draw_text_mut(image, STROKE_COLOR, x + dx, y + dy, scale, font, text);
            }
        }
    }
    draw_text_mut(image, fill, x, y, scale, font, text);
}

#[cfg(test)]
pub mod test_support {
    use super::FontMetricsSource;

    /// Deterministic metrics for layout tests: every character advances
    /// half the font size, ascent is 80% and descent 20% of it.
    pub struct FixedMetricsFont;

    impl FontMetricsSource for FixedMetricsFont {
        fn ascent(&self, size: f32) -> f32 {
            0.8 * size
        }

        fn descent(&self, size: f32) -> f32 {
            0.2 * size
        }

        fn text_width(&self, size: f32, text: &str) -> f32 {
            0.5 * size * text.chars().count() as f32
        }
    }
}
