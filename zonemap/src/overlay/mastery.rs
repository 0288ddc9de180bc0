//! Mastery region overlay.
//!
//! Fills every zone with its mastery region's translucent color, outlines
//! it in white and labels it with the zone name plus the region name. Fill
//! order matters: open-world zones first, then cities and outposts, then
//! instanced content, so small zones stay visible on top of the larger
//! fills they sit inside.

use image::{imageops, Rgba, RgbaImage};
use tracing::debug;

use crate::coord::{MapLayout, PixelPoint};
use crate::zone::{Zone, ZoneCategory};

use super::label::{
    draw_text_line, label_buffer, label_start_x, wrap_label, FontKind, FontMetricsSource,
    TextLine, TextLineSegment,
};
use super::zone::access_settings;
use super::{
    calculate_label_paste_position, draw_boundary, draw_title, zone_label_geometry, MapOverlay,
    OverlayContext, OverlayError,
};

const BOUNDARY_COLOR: Rgba<u8> = Rgba([255, 255, 255, 255]);
const TEXT_COLOR: Rgba<u8> = Rgba([255, 255, 255, 255]);
const DEBUG_COLOR: Rgba<u8> = Rgba([255, 0, 195, 255]);

/// Translucent fill color for a mastery region. Unknown regions are a
/// data-authoring error.
pub fn mastery_region_color(region: &str) -> Option<Rgba<u8>> {
    match region {
        "Central Tyria" => Some(Rgba([240, 51, 7, 160])),
        "Heart of Thorns" => Some(Rgba([0, 255, 92, 160])),
        "Path of Fire" => Some(Rgba([202, 5, 237, 160])),
        "Icebrood Saga" => Some(Rgba([20, 153, 255, 160])),
        "End of Dragons" => Some(Rgba([10, 240, 221, 160])),
        "Secrets of the Obscure" => Some(Rgba([255, 207, 13, 160])),
        "Janthir Wilds" => Some(Rgba([28, 44, 116, 160])),
        "Visions of Eternity" => Some(Rgba([235, 118, 9, 160])),
        _ => None,
    }
}

/// Fill order and default label scale per category.
#[derive(Debug, Clone, Copy)]
pub struct MasteryCategorySettings {
    pub order: u8,
    pub label_size: f64,
}

pub fn mastery_category_settings(category: ZoneCategory) -> MasteryCategorySettings {
    use ZoneCategory::*;
    let s = |order, label_size| MasteryCategorySettings { order, label_size };
    match category {
        OpenWorld => s(0, 1.0),
        Story => s(0, 0.8),
        Lounge => s(0, 0.75),
        City | Lobby | Outpost => s(1, 1.0),
        Festival | Homestead | GuildHall => s(1, 0.8),
        Misc => s(1, 0.75),
        PublicInstance => s(2, 0.8),
        Dungeon | Raid | RaidConvergence | HybridInstance => s(3, 0.8),
        Strike => s(3, 0.75),
    }
}

/// Overlay coloring zones by mastery region.
pub struct MasteryRegionMapOverlay {
    show_access_requirements: bool,
}

impl MasteryRegionMapOverlay {
    pub fn new(show_access_requirements: bool) -> Self {
        Self {
            show_access_requirements,
        }
    }

    /// Secondary label: the mastery region name, optionally prefixed with
    /// the colored access-tier name when it fits on the same line.
    #[allow(clippy::too_many_arguments)]
    fn sub_label_lines(
        &self,
        zone: &Zone,
        region: &str,
        font: &dyn FontMetricsSource,
        font_size: u32,
        line_margin: i32,
        label_rect: (PixelPoint, PixelPoint),
        buffer_width: u32,
        edge_margin: f64,
    ) -> Vec<Vec<TextLineSegment>> {
        let region_lines = |tolerance: f64| {
            wrap_label(
                region,
                font,
                font_size as f32,
                line_margin,
                label_rect,
                buffer_width,
                edge_margin,
                tolerance,
            )
        };

        let access = match (self.show_access_requirements, zone.access_req) {
            (true, Some(tier)) => access_settings(tier),
            _ => {
                return region_lines(1.25)
                    .into_iter()
                    .map(|line| vec![TextLineSegment::plain(line)])
                    .collect()
            }
        };

        let combined = format!("{} \u{B7} {region}", access.label);
        let combined_lines = wrap_label(
            &combined,
            font,
            font_size as f32,
            line_margin,
            label_rect,
            buffer_width,
            edge_margin,
            1.2,
        );
        if combined_lines.len() == 1 {
            return vec![vec![
                TextLineSegment::colored(access.label, access.color),
                TextLineSegment::plain(format!(" \u{B7} {region}")),
            ]];
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
        lines.extend(
            region_lines(1.25)
                .into_iter()
                .map(|line| vec![TextLineSegment::plain(line)]),
        );
        lines
    }
}

impl MapOverlay for MasteryRegionMapOverlay {
    fn draw_overlay(
        &self,
        image: &mut RgbaImage,
        zones: &[Zone],
        ctx: &OverlayContext<'_>,
    ) -> Result<(), OverlayError> {
        let line_width = ctx.sizes.line_width(ctx.coord, ctx.scale);

        let mut ordered: Vec<&Zone> = zones.iter().collect();
        ordered.sort_by_key(|z| (mastery_category_settings(z.category).order, z.id));

        // Fill and boundary pass.
        let mut drawn: Vec<(&Zone, (PixelPoint, PixelPoint), &str)> = Vec::new();
        for zone in ordered {
            let Some(region) = zone.mastery_region.as_deref() else {
                continue;
            };
            if !ctx.coord.is_rect_contained_in_sector(zone.continent_rect) {
                continue;
            }
            let fill = mastery_region_color(region).ok_or_else(|| {
                OverlayError::UnknownMasteryRegion {
                    zone: zone.name.clone(),
                    region: region.to_string(),
                }
            })?;

            let zone_image_rect = ctx.coord.continent_to_sector_image_rect(zone.continent_rect);
            let lw = line_width as i64;
            let fill_tl = (
                zone_image_rect.0 .0 - (lw - 1) / 2,
                zone_image_rect.0 .1 - (lw - 1) / 2,
            );
            let fill_size = (
                (zone_image_rect.1 .0 + lw / 2 - fill_tl.0 + 1) as u32,
                (zone_image_rect.1 .1 + lw / 2 - fill_tl.1 + 1) as u32,
            );
            let fill_buffer = RgbaImage::from_pixel(fill_size.0, fill_size.1, fill);
            imageops::overlay(image, &fill_buffer, fill_tl.0, fill_tl.1);
            draw_boundary(image, zone_image_rect, line_width, BOUNDARY_COLOR);

            drawn.push((zone, zone_image_rect, region));
        }
        debug!(zones = drawn.len(), "mastery region fills drawn");

        // Label pass, same order as the fills.
        let edge_margin = ctx.sizes.zoom_size_multiplier(ctx.coord, 2.0 * ctx.scale);
        for (zone, zone_image_rect, region) in drawn {
            let settings = mastery_category_settings(zone.category);
            let label_multiplier = ctx.scale * zone.label_size.unwrap_or(settings.label_size);
            let main_size = ctx.sizes.main_label_font_size(ctx.coord, label_multiplier);
            let main_margin = (main_size / 8) as i32;
            let main_outline = ctx.sizes.text_outline_width(main_size);
            let region_size = ctx.sizes.sub_label_font_size(ctx.coord, label_multiplier);
            let region_margin = (region_size / 8) as i32;
            let region_outline = ctx.sizes.text_outline_width(region_size);

            let (anchor, label_rect) = zone_label_geometry(zone, ctx.coord, zone_image_rect)?;
            if ctx.debug {
                draw_boundary(image, label_rect, 1, DEBUG_COLOR);
            }

            let main_font = ctx.assets.font_semibold();
            let region_font = ctx.assets.font_regular();
            let mut buffer = label_buffer(&zone.name, main_font, main_size as f32, label_rect);

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

            for segments in self.sub_label_lines(
                zone,
                region,
                region_font,
                region_size,
                region_margin,
                label_rect,
                buffer.width(),
                edge_margin,
            ) {
                lines.push(TextLine {
                    segments,
                    pos_y,
                    font: FontKind::Regular,
                    font_size: region_size,
                    outline_width: region_outline,
                    icon: None,
                });
                pos_y += region_font.ascent(region_size as f32) + region_margin as f32;
            }

            let start_x = label_start_x(anchor.0, buffer.width());
            for line in lines.iter().rev() {
                draw_text_line(&mut buffer, line, start_x, TEXT_COLOR, anchor.0, ctx.assets);
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
        draw_title("Mastery regions", image, layout, ctx);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_known_regions_have_colors() {
        for region in [
            "Central Tyria",
            "Heart of Thorns",
            "Path of Fire",
            "Icebrood Saga",
            "End of Dragons",
            "Secrets of the Obscure",
            "Janthir Wilds",
            "Visions of Eternity",
        ] {
            let color = mastery_region_color(region).unwrap();
            assert_eq!(color[3], 160, "fills are translucent for {region}");
        }
        assert!(mastery_region_color("The Mists").is_none());
    }

    #[test]
    fn test_fill_order_puts_instances_on_top() {
        let open_world = mastery_category_settings(ZoneCategory::OpenWorld);
        let city = mastery_category_settings(ZoneCategory::City);
        let raid = mastery_category_settings(ZoneCategory::Raid);
        assert!(open_world.order < city.order);
        assert!(city.order < raid.order);
    }

    #[test]
    fn test_instances_use_smaller_labels() {
        assert_eq!(mastery_category_settings(ZoneCategory::OpenWorld).label_size, 1.0);
        assert_eq!(mastery_category_settings(ZoneCategory::Dungeon).label_size, 0.8);
        assert_eq!(mastery_category_settings(ZoneCategory::Strike).label_size, 0.75);
        // Story and lounge zones fill first but still use reduced labels.
        assert_eq!(mastery_category_settings(ZoneCategory::Story).label_size, 0.8);
        assert_eq!(mastery_category_settings(ZoneCategory::Story).order, 0);
        assert_eq!(mastery_category_settings(ZoneCategory::Lounge).label_size, 0.75);
        assert_eq!(mastery_category_settings(ZoneCategory::Lounge).order, 0);
    }
}
