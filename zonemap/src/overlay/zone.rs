//! Zone boundary, label and portal overlay.
//!
//! Draw order matters: boundaries first (regular zones before special
//! instances so special outlines stay visible), then portal markers, then
//! labels sorted so that special-instance labels end up on top of the
//! open-world labels they overlap.

use image::{imageops, Rgba, RgbaImage};
use tracing::debug;

use crate::coord::{MapLayout, PixelPoint};
use crate::icon::IconBlender;
use crate::util::crop_to_content;
use crate::zone::{AccessTier, Zone, ZoneCategory};

use super::label::{
    draw_stroked_text, draw_text_line, label_buffer, label_start_x, wrap_label, FontKind,
    FontMetricsSource, TextLine, TextLineSegment,
};
use super::{
    calculate_label_paste_position, calculate_legend_paste_position, draw_boundary,
    zone_label_geometry, MapOverlay, OverlayContext, OverlayError,
};

const BASE_LINE_COLOR: Rgba<u8> = Rgba([255, 255, 255, 255]);
const SPECIAL_LINE_COLOR: Rgba<u8> = Rgba([255, 174, 0, 255]);
const DEBUG_COLOR: Rgba<u8> = Rgba([255, 0, 195, 255]);
const LEGEND_BACKDROP: Rgba<u8> = Rgba([0, 0, 0, 160]);
const LEGEND_OUTLINE: Rgba<u8> = Rgba([255, 255, 255, 160]);

/// Per-category drawing behavior.
#[derive(Debug, Clone, Copy)]
pub struct CategorySettings {
    /// Boundary draw pass; higher draws later (on top).
    pub boundary_order: u8,
    /// Label draw pass; higher pastes later (on top).
    pub label_order: u8,
    /// Special instances get the orange boundary/label color and a
    /// smaller default label.
    pub special: bool,
    /// Show the level range as the secondary label.
    pub show_level: bool,
    /// Fixed secondary label, if any.
    pub label: Option<&'static str>,
}

pub fn category_settings(category: ZoneCategory) -> CategorySettings {
    use ZoneCategory::*;
    let s = |boundary_order, label_order, special, show_level, label| CategorySettings {
        boundary_order,
        label_order,
        special,
        show_level,
        label,
    };
    match category {
        City => s(0, 2, false, false, Some("City")),
        Lobby => s(0, 2, false, false, Some("Lobby")),
        Outpost => s(0, 2, false, false, Some("Outpost")),
        OpenWorld => s(0, 1, false, true, None),
        Festival => s(1, 0, true, false, Some("Festival zone")),
        Homestead => s(1, 0, true, false, Some("Homestead")),
        GuildHall => s(1, 0, true, false, Some("Guild hall")),
        Dungeon => s(1, 0, true, false, Some("Dungeon")),
        Raid => s(1, 0, true, false, Some("Raid")),
        RaidConvergence => s(1, 0, true, false, Some("Convergence")),
        Strike => s(1, 0, true, false, Some("Strike mission")),
        Story => s(1, 0, true, false, Some("Story")),
        HybridInstance => s(1, 0, true, false, Some("Boss instance")),
        PublicInstance => s(1, 0, true, false, Some("Public instance")),
        Lounge => s(0, 0, false, false, Some("Lounge")),
        Misc => s(1, 0, true, false, None),
    }
}

/// Access-tier legend text and color. Labels use non-breaking spaces in
/// the word groups that must never be split by the line wrapper.
#[derive(Debug, Clone, Copy)]
pub struct AccessSettings {
    pub label: &'static str,
    pub color: Rgba<u8>,
}

pub fn access_settings(tier: AccessTier) -> AccessSettings {
    use AccessTier::*;
    let s = |label, color| AccessSettings { label, color };
    match tier {
        Gw2 | Lw1 | Lw2 => s("Core", Rgba([255, 157, 140, 255])),
        Hot => s("Heart\u{A0}of\u{A0}Thorns", Rgba([153, 255, 164, 255])),
        Lw3 => s("Living\u{A0}World Season\u{A0}3", Rgba([186, 255, 193, 255])),
        Pof => s("Path\u{A0}of\u{A0}Fire", Rgba([239, 153, 255, 255])),
        Lw4 => s("Living\u{A0}World Season\u{A0}4", Rgba([246, 196, 255, 255])),
        Lw5 => s("The\u{A0}Icebrood Saga", Rgba([180, 217, 240, 255])),
        Eod => s("End\u{A0}of Dragons", Rgba([140, 255, 245, 255])),
        Soto => s("Secrets\u{A0}of the\u{A0}Obscure", Rgba([255, 226, 115, 255])),
        Gem => s("Gem\u{A0}Store", Rgba([182, 196, 204, 255])),
    }
}

/// Per-portal-type line color and legend text. The icon key equals the
/// portal type key.
#[derive(Debug, Clone, Copy)]
pub struct PortalSettings {
    pub line_color: Option<Rgba<u8>>,
    pub legend: &'static str,
}

/// Portal types in legend order.
pub const PORTAL_TYPES: [&str; 6] = [
    "neighbor",
    "asura_gate",
    "dungeon",
    "fractal",
    "strike",
    "raid",
];

pub fn portal_settings(portal_type: &str) -> Option<PortalSettings> {
    let s = |line_color, legend| PortalSettings { line_color, legend };
    match portal_type {
        "neighbor" => Some(s(Some(Rgba([45, 185, 227, 150])), "Zone portal")),
        "asura_gate" => Some(s(None, "Asura gate / Long distance portal")),
        "dungeon" => Some(s(None, "Dungeon")),
        "fractal" => Some(s(None, "Fractals of the Mists")),
        "strike" => Some(s(None, "Strike mission")),
        "raid" => Some(s(Some(Rgba([199, 76, 42, 150])), "Raid")),
        _ => None,
    }
}

/// Badge icon for an access tier: the base icon wrapped in a halo of the
/// tier's color.
pub fn access_badge(
    blender: &IconBlender,
    icon: &RgbaImage,
    tier: AccessTier,
    icon_size: u32,
    halo_radius: u32,
) -> RgbaImage {
    let settings = access_settings(tier);
    let resized = blender.resized_icon("access", icon, icon_size);
    blender.outline_badge(settings.label, &resized, halo_radius, settings.color)
}

/// Overlay drawing zone boundaries, portal markers and adaptive labels.
pub struct ZoneMapOverlay {
    show_access_requirements: bool,
}

impl ZoneMapOverlay {
    pub fn new(show_access_requirements: bool) -> Self {
        Self {
            show_access_requirements,
        }
    }

    fn portal_icon(
        &self,
        portal_type: &str,
        icon_size: u32,
        ctx: &OverlayContext<'_>,
    ) -> Result<RgbaImage, OverlayError> {
        if portal_type.contains('/') {
            let sub_icons = portal_type
                .split('/')
                .map(|key| ctx.assets.icon(key))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(ctx.blender.pie_composite(portal_type, &sub_icons, icon_size))
        } else {
            Ok(ctx
                .blender
                .resized_icon(portal_type, ctx.assets.icon(portal_type)?, icon_size))
        }
    }

    /// Secondary label line groups: the category/level text, optionally
    /// prefixed with the colored access-tier name. The combined form is
    /// tried first with a relaxed width tolerance; if it wraps, access
    /// and category text fall back to separate lines.
    #[allow(clippy::too_many_arguments)]
    fn sub_label_lines(
        &self,
        zone: &Zone,
        settings: &CategorySettings,
        font: &dyn FontMetricsSource,
        font_size: u32,
        line_margin: i32,
        label_rect: (PixelPoint, PixelPoint),
        buffer_width: u32,
        edge_margin: f64,
    ) -> Vec<Vec<TextLineSegment>> {
        let type_text: Option<String> = if let Some(label) = settings.label {
            Some(label.to_string())
        } else if settings.show_level {
            match (zone.min_level, zone.max_level) {
                (Some(min), Some(max)) if min == max => Some(min.to_string()),
                (Some(min), Some(max)) => Some(format!("{min}\u{2013}{max}")),
                _ => None,
            }
        } else {
            None
        };

        let plain_type_lines = |type_text: &Option<String>| -> Vec<Vec<TextLineSegment>> {
            match type_text {
                Some(text) => wrap_label(
                    text,
                    font,
                    font_size as f32,
                    line_margin,
                    label_rect,
                    buffer_width,
                    edge_margin,
                    1.0,
                )
                .into_iter()
                .map(|line| vec![TextLineSegment::plain(line)])
                .collect(),
                None => Vec::new(),
            }
        };

        let access = match (self.show_access_requirements, zone.access_req) {
            (true, Some(tier)) => access_settings(tier),
            _ => return plain_type_lines(&type_text),
        };

        let single_line_text = match &type_text {
            Some(text) => format!("{} \u{B7} {text}", access.label),
            None => access.label.to_string(),
        };
        let single_lines = wrap_label(
            &single_line_text,
            font,
            font_size as f32,
            line_margin,
            label_rect,
            buffer_width,
            edge_margin,
            1.2,
        );
        if single_lines.len() == 1 {
            let mut segments = vec![TextLineSegment::colored(access.label, access.color)];
            if let Some(text) = type_text {
                segments.push(TextLineSegment::plain(format!(" \u{B7} {text}")));
            }
            return vec![segments];
        }

        let mut lines: Vec<Vec<TextLineSegment>> = wrap_label(
            access.label,
            font,
            font_size as f32,
            line_margin,
            label_rect,
            buffer_width,
            edge_margin,
            1.0,
        )
        .into_iter()
        .map(|line| vec![TextLineSegment::colored(line, access.color)])
        .collect();
        lines.extend(plain_type_lines(&type_text));
        lines
    }

    /// Draws the line joining two far-apart connected portals. The line is
    /// drawn 4x supersampled as stamped filled circles, then Lanczos
    /// downsampled for antialiasing.
    fn draw_portal_connection_line(
        &self,
        image: &mut RgbaImage,
        p1: PixelPoint,
        p2: PixelPoint,
        color: Rgba<u8>,
        ctx: &OverlayContext<'_>,
    ) {
        use imageproc::drawing::draw_filled_circle_mut;

        const SUPER_SAMPLING: i64 = 4;
        let margin = ctx
            .sizes
            .zoom_size_multiplier(ctx.coord, ctx.scale)
            .max(1.0)
            .ceil() as i64;
        let line_width = ctx.sizes.line_width(ctx.coord, ctx.scale) as i64;

        let extent = ((p1.0 - p2.0).abs(), (p1.1 - p2.1).abs());
        let paste = (p1.0.min(p2.0) - margin, p1.1.min(p2.1) - margin);
        let buffer_size = (
            (SUPER_SAMPLING * (extent.0 + 2 * margin)) as u32,
            (SUPER_SAMPLING * (extent.1 + 2 * margin)) as u32,
        );
        let mut buffer = RgbaImage::new(buffer_size.0, buffer_size.1);

        let start = (
            (SUPER_SAMPLING * (p1.0 - paste.0)) as f64,
            (SUPER_SAMPLING * (p1.1 - paste.1)) as f64,
        );
        let end = (
            (SUPER_SAMPLING * (p2.0 - paste.0)) as f64,
            (SUPER_SAMPLING * (p2.1 - paste.1)) as f64,
        );
        let radius = ((SUPER_SAMPLING * line_width) / 2).max(1) as i32;
        let length = ((end.0 - start.0).powi(2) + (end.1 - start.1).powi(2)).sqrt();
        let steps = length.ceil().max(1.0) as i64;
        for step in 0..=steps {
            let t = step as f64 / steps as f64;
            let x = start.0 + t * (end.0 - start.0);
            let y = start.1 + t * (end.1 - start.1);
            draw_filled_circle_mut(
                &mut buffer,
                (x.round() as i32, y.round() as i32),
                radius,
                color,
            );
        }

        let smooth = imageops::resize(
            &buffer,
            (extent.0 + 2 * margin) as u32,
            (extent.1 + 2 * margin) as u32,
            imageops::FilterType::Lanczos3,
        );
        imageops::overlay(image, &smooth, paste.0, paste.1);
    }
}

impl MapOverlay for ZoneMapOverlay {
    fn draw_overlay(
        &self,
        image: &mut RgbaImage,
        zones: &[Zone],
        ctx: &OverlayContext<'_>,
    ) -> Result<(), OverlayError> {
        let line_width = ctx.sizes.line_width(ctx.coord, ctx.scale);

        // Boundary pass.
        let mut ordered: Vec<&Zone> = zones.iter().collect();
        ordered.sort_by_key(|z| (category_settings(z.category).boundary_order, z.id));

        let mut drawn: Vec<(&Zone, (PixelPoint, PixelPoint), CategorySettings)> = Vec::new();
        for zone in ordered {
            if !ctx.coord.is_rect_contained_in_sector(zone.continent_rect) {
                continue;
            }
            let zone_image_rect = ctx.coord.continent_to_sector_image_rect(zone.continent_rect);
            let settings = category_settings(zone.category);
            let line_color = if settings.special {
                SPECIAL_LINE_COLOR
            } else {
                BASE_LINE_COLOR
            };
            draw_boundary(image, zone_image_rect, line_width, line_color);
            drawn.push((zone, zone_image_rect, settings));
        }
        debug!(
            zones = drawn.len(),
            portals = ctx.portals.len(),
            "zone boundaries drawn"
        );

        // Portal pass, in reverse declaration order so earlier types end
        // up on top where markers overlap.
        let icon_size = ctx.sizes.icon_size(ctx.coord, ctx.scale);
        for (portal_type, markers) in ctx.portals.iter().rev() {
            let icon = self.portal_icon(portal_type, icon_size, ctx)?;
            let half = (icon.width() as f64 / 2.0, icon.height() as f64 / 2.0);
            for marker in markers {
                let near = ctx.coord.continent_to_sector_image_coord(marker.endpoint());
                if let Some(far_continent) = marker.far_endpoint() {
                    let far = ctx.coord.continent_to_sector_image_coord(far_continent);
                    if let Some(color) =
                        portal_settings(portal_type).and_then(|s| s.line_color)
                    {
                        self.draw_portal_connection_line(image, near, far, color, ctx);
                    }
                    imageops::overlay(
                        image,
                        &icon,
                        (far.0 as f64 - half.0).round() as i64,
                        (far.1 as f64 - half.1).round() as i64,
                    );
                }
                imageops::overlay(
                    image,
                    &icon,
                    (near.0 as f64 - half.0).round() as i64,
                    (near.1 as f64 - half.1).round() as i64,
                );
            }
        }

        // Label pass.
        drawn.sort_by_key(|(zone, _, settings)| (settings.label_order, zone.id));
        let edge_margin = ctx.sizes.zoom_size_multiplier(ctx.coord, 2.0 * ctx.scale);
        for (zone, zone_image_rect, settings) in drawn {
            let label_multiplier = ctx.scale
                * zone
                    .label_size
                    .unwrap_or(if settings.special { 0.85 } else { 1.0 });
            let main_size = ctx.sizes.main_label_font_size(ctx.coord, label_multiplier);
            let main_margin = (main_size / 8) as i32;
            let main_outline = ctx.sizes.text_outline_width(main_size);
            let sub_size = ctx.sizes.sub_label_font_size(ctx.coord, label_multiplier);
            // Floor division by a negative: the sub label tucks up under
            // the main label's descent.
            let sub_margin = -((sub_size as i32 + 7) / 8);
            let sub_outline = ctx.sizes.text_outline_width(sub_size);

            let (anchor, label_rect) = zone_label_geometry(zone, ctx.coord, zone_image_rect)?;
            if ctx.debug {
                draw_boundary(image, label_rect, 1, DEBUG_COLOR);
            }

            let main_font = ctx.assets.font_semibold();
            let sub_font = ctx.assets.font_regular();
            let mut buffer = label_buffer(&zone.name, main_font, main_size as f32, label_rect);
            let label_color = if settings.special {
                SPECIAL_LINE_COLOR
            } else {
                BASE_LINE_COLOR
            };

            let mut lines: Vec<TextLine> = Vec::new();
            let mut pos_y = 0.0f32;
            for text in wrap_label(
                &zone.name,
                main_font,
                main_size as f32,
                main_margin,
                label_rect,
                buffer.width(),
                edge_margin,
                1.0,
            ) {
                lines.push(TextLine {
                    segments: vec![TextLineSegment::plain(text)],
                    pos_y,
                    font: FontKind::SemiBold,
                    font_size: main_size,
                    outline_width: main_outline,
                    icon: None,
                });
                pos_y += main_font.ascent(main_size as f32) + main_margin as f32;
            }
            pos_y += (main_font.descent(main_size as f32) - main_margin as f32).max(0.0);

            // Badge on the first sub line only; skipped when the bundle
            // has no access icon.
            let mut badge = match (self.show_access_requirements, zone.access_req) {
                (true, Some(tier)) => ctx
                    .assets
                    .icon("access")
                    .ok()
                    .map(|icon| access_badge(ctx.blender, icon, tier, sub_size, sub_outline)),
                _ => None,
            };

            for segments in self.sub_label_lines(
                zone,
                &settings,
                sub_font,
                sub_size,
                sub_margin,
                label_rect,
                buffer.width(),
                edge_margin,
            ) {
                lines.push(TextLine {
                    segments,
                    pos_y,
                    font: FontKind::Regular,
                    font_size: sub_size,
                    outline_width: sub_outline,
                    icon: badge.take(),
                });
                pos_y += sub_font.ascent(sub_size as f32)
                    + sub_font.descent(sub_size as f32)
                    + sub_margin as f32;
            }

            // Reverse order keeps earlier lines on top where strokes
            // overlap.
            let start_x = label_start_x(anchor.0, buffer.width());
            for line in lines.iter().rev() {
                draw_text_line(&mut buffer, line, start_x, label_color, anchor.0, ctx.assets);
            }

            let paste = calculate_label_paste_position(anchor, &buffer, label_rect);
            imageops::overlay(image, &buffer, paste.0, paste.1);
        }

        Ok(())
    }

    fn draw_legend(
        &self,
        image: &mut RgbaImage,
        layout: &MapLayout,
        ctx: &OverlayContext<'_>,
    ) -> Result<(), OverlayError> {
        let font = ctx.assets.font_regular();
        let font_size = ctx.sizes.legend_font_size(ctx.coord, ctx.scale);
        let outline_width = ctx.sizes.text_outline_width(font_size);
        let icon_size = ctx.sizes.icon_size(ctx.coord, ctx.scale);
        let line_width = ctx.sizes.line_width(ctx.coord, ctx.scale);
        let row_height =
            (font.ascent(font_size as f32) + font.descent(font_size as f32)).ceil() as u32;

        let mut buffer = RgbaImage::new(100 * row_height, 20 * row_height);
        let start = (2.0 * ctx.sizes.zoom_size_multiplier(ctx.coord, ctx.scale))
            .round()
            .max(8.0) as i64;
        let padding = 5 + (line_width as f64 / 2.0).ceil() as u32;

        let mut label_y = start;
        for portal_type in PORTAL_TYPES {
            let settings = portal_settings(portal_type)
                .expect("PORTAL_TYPES entries always have settings");
            let icon = self.portal_icon(portal_type, icon_size, ctx)?;
            imageops::overlay(&mut buffer, &icon, start, label_y);

            let text_height = row_height + 2 * outline_width;
            let text_x = start + icon_size as i64 + 6;
            let text_top =
                label_y + (icon_size as f64 / 2.0).round() as i64 - (text_height / 2) as i64;
            draw_stroked_text(
                &mut buffer,
                settings.legend,
                text_x as i32,
                text_top as i32,
                font_size as f32,
                font.raw(),
                BASE_LINE_COLOR,
                outline_width,
            );
            label_y +=
                (icon_size.max(text_height) as f64 + ctx.coord.zoom()).round() as i64;
        }

        let legend = crop_to_content(&buffer, padding);
        let legend_coord =
            calculate_legend_paste_position(image.dimensions(), legend.dimensions(), layout);

        let mut backdrop =
            RgbaImage::from_pixel(legend.width(), legend.height(), LEGEND_BACKDROP);
        draw_boundary(
            &mut backdrop,
            (
                ((line_width as i64 - 1) / 2, (line_width as i64 - 1) / 2),
                (
                    legend.width() as i64 - 1 - line_width as i64 / 2,
                    legend.height() as i64 - 1 - line_width as i64 / 2,
                ),
            ),
            line_width,
            LEGEND_OUTLINE,
        );
        imageops::overlay(image, &backdrop, legend_coord.0, legend_coord.1);
        imageops::overlay(image, &legend, legend_coord.0, legend_coord.1);
        Ok(())
    }
}
