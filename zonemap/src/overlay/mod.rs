//! Map overlays: zone boundaries, labels, portals and mastery regions.
//!
//! An overlay draws on top of an assembled sector image using the same
//! coordinate system that placed the tiles. Overlays are selected by
//! [`OverlayKind`], an explicit tag that doubles as the key for per-overlay
//! zone data policies, rather than dispatching on the concrete overlay
//! type.

mod label;
mod mastery;
mod sizes;
mod zone;

pub use label::{
    calculate_label_paste_position, draw_stroked_text, draw_text_line, label_buffer,
    label_start_x, parse_label_anchor, wrap_label, wrap_text_lines, FontKind, FontMetricsSource,
    LabelAnchor, LabelHAlign, LabelVAlign, TextLine, TextLineSegment,
};
pub use mastery::MasteryRegionMapOverlay;
pub use sizes::SizeTables;
pub use zone::ZoneMapOverlay;

use image::{Rgba, RgbaImage};
use thiserror::Error;

use crate::assets::{AssetBundle, AssetError};
use crate::coord::{LegendHAlign, LegendVAlign, MapCoordinateSystem, MapLayout, PixelPoint};
use crate::icon::IconBlender;
use crate::zone::{PortalTable, Zone};

/// Errors raised while drawing an overlay. All fatal: a zone-data mistake
/// should surface during authoring, not produce a silently wrong map.
#[derive(Debug, Error)]
pub enum OverlayError {
    /// A zone carries a malformed label anchor code.
    #[error("Invalid label anchor: {0}")]
    InvalidLabelAnchor(String),

    /// A zone references a mastery region with no configured color.
    #[error("Unknown mastery region '{region}' on zone '{zone}'")]
    UnknownMasteryRegion { zone: String, region: String },

    /// An icon or font the overlay needs is missing from the bundle.
    #[error(transparent)]
    Asset(#[from] AssetError),
}

/// Shared read-only state for one overlay pass.
pub struct OverlayContext<'a> {
    pub assets: &'a AssetBundle,
    pub coord: &'a MapCoordinateSystem,
    pub sizes: &'a SizeTables,
    pub blender: &'a IconBlender,
    pub portals: &'a PortalTable,
    /// User-requested overlay scaling factor, multiplied into every size
    /// function.
    pub scale: f64,
    /// Renders debugging geometry such as label destination rectangles.
    pub debug: bool,
}

/// One drawable overlay variant.
pub trait MapOverlay {
    /// Draws the overlay's content onto an assembled sector image.
    fn draw_overlay(
        &self,
        image: &mut RgbaImage,
        zones: &[Zone],
        ctx: &OverlayContext<'_>,
    ) -> Result<(), OverlayError>;

    /// Draws the overlay's legend onto the final composited image.
    fn draw_legend(
        &self,
        image: &mut RgbaImage,
        layout: &MapLayout,
        ctx: &OverlayContext<'_>,
    ) -> Result<(), OverlayError>;
}

/// Overlay that draws nothing; renders the bare tile canvas.
pub struct NoMapOverlay;

impl MapOverlay for NoMapOverlay {
    fn draw_overlay(
        &self,
        _image: &mut RgbaImage,
        _zones: &[Zone],
        _ctx: &OverlayContext<'_>,
    ) -> Result<(), OverlayError> {
        Ok(())
    }

    fn draw_legend(
        &self,
        _image: &mut RgbaImage,
        _layout: &MapLayout,
        _ctx: &OverlayContext<'_>,
    ) -> Result<(), OverlayError> {
        Ok(())
    }
}

/// Tag identifying an overlay variant. Used for CLI-facing names and as
/// the key of per-overlay zone data policies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OverlayKind {
    Zone,
    ZoneAccess,
    Mastery,
    MasteryAccess,
    None,
}

impl OverlayKind {
    pub const ALL: [OverlayKind; 5] = [
        OverlayKind::Zone,
        OverlayKind::ZoneAccess,
        OverlayKind::Mastery,
        OverlayKind::MasteryAccess,
        OverlayKind::None,
    ];

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "zone" => Some(OverlayKind::Zone),
            "zone_access" => Some(OverlayKind::ZoneAccess),
            "mastery" => Some(OverlayKind::Mastery),
            "mastery_access" => Some(OverlayKind::MasteryAccess),
            "none" => Some(OverlayKind::None),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            OverlayKind::Zone => "zone",
            OverlayKind::ZoneAccess => "zone_access",
            OverlayKind::Mastery => "mastery",
            OverlayKind::MasteryAccess => "mastery_access",
            OverlayKind::None => "none",
        }
    }
}

/// Instantiates the overlay for a kind.
pub fn overlay_for_kind(kind: OverlayKind) -> Box<dyn MapOverlay + Send + Sync> {
    match kind {
        OverlayKind::Zone => Box::new(ZoneMapOverlay::new(false)),
        OverlayKind::ZoneAccess => Box::new(ZoneMapOverlay::new(true)),
        OverlayKind::Mastery => Box::new(MasteryRegionMapOverlay::new(false)),
        OverlayKind::MasteryAccess => Box::new(MasteryRegionMapOverlay::new(true)),
        OverlayKind::None => Box::new(NoMapOverlay),
    }
}

/// Top-left corner of a legend of the given size, pinned to the layout's
/// configured corner at its configured offset.
pub fn calculate_legend_paste_position(
    image_size: (u32, u32),
    legend_size: (u32, u32),
    layout: &MapLayout,
) -> PixelPoint {
    let x = match layout.legend_align.0 {
        LegendHAlign::Left => layout.legend_offset.0,
        LegendHAlign::Right => {
            image_size.0 as i64 - layout.legend_offset.0 - legend_size.0 as i64
        }
    };
    let y = match layout.legend_align.1 {
        LegendVAlign::Top => layout.legend_offset.1,
        LegendVAlign::Bottom => {
            image_size.1 as i64 - layout.legend_offset.1 - legend_size.1 as i64
        }
    };
    (x, y)
}

/// Draws a zone boundary as concentric 1 px rings. The band straddles the
/// rectangle edges: inflated by `floor((w-1)/2)` outward at the top-left
/// and `floor(w/2)` at the bottom-right, then drawn inward `w` rings deep.
pub(crate) fn draw_boundary(
    image: &mut RgbaImage,
    rect: (PixelPoint, PixelPoint),
    line_width: u32,
    color: Rgba<u8>,
) {
    use imageproc::drawing::draw_hollow_rect_mut;
    use imageproc::rect::Rect;

    let lw = line_width as i64;
    let x0 = rect.0 .0 - (lw - 1) / 2;
    let y0 = rect.0 .1 - (lw - 1) / 2;
    let x1 = rect.1 .0 + lw / 2;
    let y1 = rect.1 .1 + lw / 2;
    for i in 0..lw {
        let width = x1 - x0 - 2 * i + 1;
        let height = y1 - y0 - 2 * i + 1;
        if width < 2 || height < 2 {
            break;
        }
        draw_hollow_rect_mut(
            image,
            Rect::at((x0 + i) as i32, (y0 + i) as i32).of_size(width as u32, height as u32),
            color,
        );
    }
}

/// Label anchor and destination rectangle for a zone: the explicit label
/// rect if the zone sets one, otherwise its boundary rect.
pub(crate) fn zone_label_geometry(
    zone: &Zone,
    coord: &MapCoordinateSystem,
    zone_image_rect: (PixelPoint, PixelPoint),
) -> Result<(LabelAnchor, (PixelPoint, PixelPoint)), OverlayError> {
    let rect = match zone.label_rect {
        Some(r) => coord.continent_to_sector_image_rect(r),
        None => zone_image_rect,
    };
    let anchor = parse_label_anchor(zone.label_anchor.as_deref())?;
    Ok((anchor, rect))
}

/// Draws a large stroked title into the layout's legend corner. Used by
/// overlays whose legend is a single heading.
pub fn draw_title(
    title: &str,
    image: &mut RgbaImage,
    layout: &MapLayout,
    ctx: &OverlayContext<'_>,
) {
    let font_size = 2 * ctx.sizes.main_label_font_size(ctx.coord, ctx.scale);
    let outline_width = ctx.sizes.text_outline_width(font_size);
    let padding = 16u32;

    let font = ctx.assets.font_semibold();
    let text_width = font.text_width(font_size as f32, title).ceil() as u32 + 2 * outline_width;
    let text_height =
        (font.ascent(font_size as f32) + font.descent(font_size as f32)).ceil() as u32
            + 2 * outline_width;
    let legend_size = (text_width + 2 * padding, text_height + 2 * padding);

    let (x, y) = calculate_legend_paste_position(image.dimensions(), legend_size, layout);
    draw_stroked_text(
        image,
        title,
        (x + (padding + outline_width) as i64) as i32,
        (y + (padding + outline_width) as i64) as i32,
        font_size as f32,
        font.raw(),
        Rgba([255, 255, 255, 255]),
        outline_width,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coord::MapSector;

    #[test]
    fn test_overlay_kind_names_round_trip() {
        for kind in OverlayKind::ALL {
            assert_eq!(OverlayKind::from_name(kind.name()), Some(kind));
        }
        assert_eq!(OverlayKind::from_name("zones"), None);
        assert_eq!(OverlayKind::from_name(""), None);
    }

    #[test]
    fn test_boundary_band_straddles_the_rect_edge() {
        let mut image = RgbaImage::new(60, 60);
        let white = Rgba([255, 255, 255, 255]);
        draw_boundary(&mut image, ((20, 20), (40, 40)), 4, white);

        // Width 4 inflates 1 px outward at the top-left and 2 px at the
        // bottom-right, so the band covers columns 19..=22 on the left edge.
        assert_eq!(image.get_pixel(19, 30), &white);
        assert_eq!(image.get_pixel(22, 30), &white);
        assert_eq!(image.get_pixel(18, 30)[3], 0);
        assert_eq!(image.get_pixel(23, 30)[3], 0);

        // And columns 39..=42 on the right edge.
        assert_eq!(image.get_pixel(39, 30), &white);
        assert_eq!(image.get_pixel(42, 30), &white);
        assert_eq!(image.get_pixel(43, 30)[3], 0);

        // Interior stays untouched.
        assert_eq!(image.get_pixel(30, 30)[3], 0);
    }

    #[test]
    fn test_legend_pins_to_each_corner() {
        let sector = MapSector::new(1, None);
        let image_size = (1000, 800);
        let legend_size = (200, 100);

        let mut layout = MapLayout::single_sector(sector);
        layout.legend_align = (LegendHAlign::Left, LegendVAlign::Top);
        assert_eq!(
            calculate_legend_paste_position(image_size, legend_size, &layout),
            (16, 16)
        );

        layout.legend_align = (LegendHAlign::Right, LegendVAlign::Top);
        assert_eq!(
            calculate_legend_paste_position(image_size, legend_size, &layout),
            (1000 - 16 - 200, 16)
        );

        layout.legend_align = (LegendHAlign::Left, LegendVAlign::Bottom);
        assert_eq!(
            calculate_legend_paste_position(image_size, legend_size, &layout),
            (16, 800 - 16 - 100)
        );

        layout.legend_align = (LegendHAlign::Right, LegendVAlign::Bottom);
        assert_eq!(
            calculate_legend_paste_position(image_size, legend_size, &layout),
            (784, 684)
        );
    }
}
