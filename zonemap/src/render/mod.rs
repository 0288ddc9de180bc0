//! Render orchestration.
//!
//! Ties the pipeline together: for each layout part, build a coordinate
//! system, assemble the tile canvas, draw every requested overlay on a
//! copy of it, then composite multi-part layouts and attach the legend.
//! The session owns the per-run caches (size tables, blended icons) and
//! clears them between runs so long-lived processes stay bounded.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use image::RgbaImage;
use thiserror::Error;
use tracing::info;

use crate::assemble::{AssembleError, MapAssembler};
use crate::assets::{AssetBundle, AssetError};
use crate::composite::combine_part_images;
use crate::coord::{CoordError, MapCoordinateSystem, MapLayout, MapParameters, PixelPoint};
use crate::icon::IconBlender;
use crate::overlay::{
    overlay_for_kind, OverlayContext, OverlayError, OverlayKind, SizeTables,
};
use crate::source::TileSource;
use crate::zone::{PortalTable, Zone, ZoneOverrides};

/// Errors raised while orchestrating a render. Geometry and configuration
/// errors abort before any tile I/O; everything else propagates from the
/// failing stage.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error(transparent)]
    Coord(#[from] CoordError),

    #[error(transparent)]
    Assemble(#[from] AssembleError),

    #[error(transparent)]
    Overlay(#[from] OverlayError),

    #[error(transparent)]
    Asset(#[from] AssetError),

    /// A requested overlay name is not a known [`OverlayKind`].
    #[error("Unknown overlay name '{0}'")]
    UnknownOverlayName(String),

    /// A requested layout name is not in the layout table.
    #[error("Unknown layout name '{0}'")]
    UnknownLayoutName(String),

    /// A layout references a continent with no configured parameters.
    #[error("No map parameters configured for continent {0}")]
    UnknownContinent(u32),
}

/// Caller-tunable rendering switches.
#[derive(Debug, Clone, Copy)]
pub struct RenderOptions {
    /// Overlay scaling factor; multiplies every overlay size function.
    pub scale: f64,
    /// Draw debugging geometry such as label destination rectangles.
    pub debug: bool,
    /// Draw the overlay legend onto the final image.
    pub legend: bool,
    /// Apply the zone data policy (blacklists, overrides, custom zones).
    pub apply_overrides: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            scale: 1.0,
            debug: false,
            legend: true,
            apply_overrides: true,
        }
    }
}

/// Manual corrections to the externally supplied zone data, keyed by the
/// overlay they apply to. Global overrides apply to every overlay;
/// per-overlay entries win over them field by field.
#[derive(Debug, Default)]
pub struct ZoneDataPolicy {
    pub global_overrides: HashMap<i64, ZoneOverrides>,
    pub blacklists: HashMap<OverlayKind, HashSet<i64>>,
    pub overlay_overrides: HashMap<OverlayKind, HashMap<i64, ZoneOverrides>>,
    pub custom_zones: HashMap<OverlayKind, Vec<Zone>>,
}

/// Applies the policy for one overlay kind: blacklisted zones are
/// dropped, overrides merge field by field (global first, then
/// per-overlay), and the overlay's custom zones are appended with id -1
/// when they carry none of their own.
pub fn apply_zone_policy(
    zones: &[Zone],
    kind: OverlayKind,
    policy: &ZoneDataPolicy,
) -> Vec<Zone> {
    let blacklist = policy.blacklists.get(&kind);
    let conditional = policy.overlay_overrides.get(&kind);

    let mut result: Vec<Zone> = Vec::with_capacity(zones.len());
    for zone in zones {
        if blacklist.is_some_and(|b| b.contains(&zone.id)) {
            continue;
        }
        let mut zone = zone.clone();
        if let Some(overrides) = policy.global_overrides.get(&zone.id) {
            overrides.apply(&mut zone);
        }
        if let Some(overrides) = conditional.and_then(|c| c.get(&zone.id)) {
            overrides.apply(&mut zone);
        }
        result.push(zone);
    }

    if let Some(custom) = policy.custom_zones.get(&kind) {
        result.extend(custom.iter().cloned());
    }
    result
}

/// Resolves a layout by name.
pub fn choose_layout<'a>(
    layouts: &'a HashMap<String, MapLayout>,
    name: &str,
) -> Result<&'a MapLayout, RenderError> {
    layouts
        .get(name)
        .ok_or_else(|| RenderError::UnknownLayoutName(name.to_string()))
}

/// Parses overlay names into kinds, failing fast on the first unknown one.
pub fn parse_overlay_names(names: &[String]) -> Result<Vec<OverlayKind>, RenderError> {
    names
        .iter()
        .map(|name| {
            OverlayKind::from_name(name)
                .ok_or_else(|| RenderError::UnknownOverlayName(name.clone()))
        })
        .collect()
}

/// One rendering job: which layout to draw, with which overlays, at which
/// zoom, from which zone/portal data.
pub struct RenderRequest<'a> {
    pub layout_name: &'a str,
    pub layout: &'a MapLayout,
    pub overlays: &'a [OverlayKind],
    pub zoom: f64,
    pub floor: u32,
    pub zones: &'a [Zone],
    pub portals: &'a PortalTable,
    pub policy: &'a ZoneDataPolicy,
    pub options: RenderOptions,
}

/// One finished raster plus the metadata the caller needs to persist it.
pub struct RenderedMap {
    pub layout_name: String,
    pub overlay: OverlayKind,
    pub zoom: f64,
    pub image: RgbaImage,
    /// Pixel offset of each layout part within the final image.
    pub part_offsets: Vec<PixelPoint>,
}

/// Long-lived rendering state: assets, the tile source, per-continent
/// parameters and the per-run caches.
pub struct RenderSession {
    assets: Arc<AssetBundle>,
    source: Arc<dyn TileSource>,
    continents: HashMap<u32, MapParameters>,
    sizes: SizeTables,
    blender: IconBlender,
}

impl RenderSession {
    pub fn new(
        assets: Arc<AssetBundle>,
        source: Arc<dyn TileSource>,
        continents: HashMap<u32, MapParameters>,
    ) -> Self {
        Self {
            assets,
            source,
            continents,
            sizes: SizeTables::new(),
            blender: IconBlender::new(),
        }
    }

    /// Drops the memoized sizes and icon rasters. Called between
    /// independent runs.
    pub fn clear_caches(&self) {
        self.sizes.clear();
        self.blender.clear();
    }

    fn context<'a>(
        &'a self,
        coord: &'a MapCoordinateSystem,
        request: &'a RenderRequest<'_>,
    ) -> OverlayContext<'a> {
        OverlayContext {
            assets: &self.assets,
            coord,
            sizes: &self.sizes,
            blender: &self.blender,
            portals: request.portals,
            scale: request.options.scale,
            debug: request.options.debug,
        }
    }

    /// Renders every (layout part x overlay) of the request and composites
    /// the parts into one image per overlay.
    pub async fn render_layout(
        &self,
        request: &RenderRequest<'_>,
    ) -> Result<Vec<RenderedMap>, RenderError> {
        request.layout.validate()?;
        info!(
            layout = request.layout_name,
            zoom = request.zoom,
            parts = request.layout.parts.len(),
            overlays = request.overlays.len(),
            "rendering layout"
        );

        let assembler = MapAssembler::new(Arc::clone(&self.source));

        // (overlay kind, per-part images in layout order)
        let mut overlay_parts: Vec<(OverlayKind, Vec<(PixelPoint, RgbaImage)>)> = request
            .overlays
            .iter()
            .map(|kind| (*kind, Vec::new()))
            .collect();
        let mut coords: Vec<MapCoordinateSystem> = Vec::new();

        for (part_offset, sector) in &request.layout.parts {
            let params = self
                .continents
                .get(&sector.continent_id)
                .ok_or(RenderError::UnknownContinent(sector.continent_id))?;
            let coord = MapCoordinateSystem::new(params, request.zoom, Some(sector))?;
            let part_pixel_offset = coord.continent_to_full_image_coord(*part_offset);

            let mut base = assembler
                .generate(sector.continent_id, request.floor, &coord)
                .await?;

            let overlay_count = overlay_parts.len();
            for (index, (kind, parts)) in overlay_parts.iter_mut().enumerate() {
                let overlay = overlay_for_kind(*kind);
                let zones = if request.options.apply_overrides {
                    apply_zone_policy(request.zones, *kind, request.policy)
                } else {
                    request.zones.to_vec()
                };

                // The last overlay draws straight onto the base canvas;
                // earlier ones get a copy.
                let mut image = if index + 1 == overlay_count {
                    std::mem::replace(&mut base, RgbaImage::new(0, 0))
                } else {
                    base.clone()
                };
                let ctx = self.context(&coord, request);
                overlay.draw_overlay(&mut image, &zones, &ctx)?;
                parts.push((part_pixel_offset, image));
            }
            coords.push(coord);
        }

        let last_coord = coords.last().expect("validated layout has parts");
        let outline_width = self
            .sizes
            .line_width(last_coord, request.options.scale);

        let mut rendered = Vec::with_capacity(overlay_parts.len());
        for (kind, parts) in overlay_parts {
            let part_offsets: Vec<PixelPoint> = parts.iter().map(|(offset, _)| *offset).collect();
            let mut image = if parts.len() == 1 {
                parts.into_iter().next().expect("one part").1
            } else {
                combine_part_images(&parts, outline_width)
            };

            if request.options.legend {
                let overlay = overlay_for_kind(kind);
                let ctx = self.context(last_coord, request);
                overlay.draw_legend(&mut image, request.layout, &ctx)?;
            }

            info!(
                layout = request.layout_name,
                overlay = kind.name(),
                width = image.width(),
                height = image.height(),
                "overlay rendered"
            );
            rendered.push(RenderedMap {
                layout_name: request.layout_name.to_string(),
                overlay: kind,
                zoom: request.zoom,
                image,
                part_offsets,
            });
        }
        Ok(rendered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coord::MapSector;
    use crate::zone::{AccessTier, ZoneCategory};

    fn zone(id: i64, name: &str) -> Zone {
        Zone {
            id,
            name: name.to_string(),
            category: ZoneCategory::OpenWorld,
            continent_rect: ((1000.0, 1000.0), (2000.0, 2000.0)),
            min_level: Some(1),
            max_level: Some(15),
            label_rect: None,
            label_anchor: None,
            label_size: None,
            access_req: Some(AccessTier::Gw2),
            mastery_region: None,
        }
    }

    #[test]
    fn test_policy_blacklist_is_scoped_to_its_overlay() {
        let zones = vec![zone(1, "Kept"), zone(2, "Dropped")];
        let mut policy = ZoneDataPolicy::default();
        policy
            .blacklists
            .insert(OverlayKind::Mastery, HashSet::from([2]));

        let mastery = apply_zone_policy(&zones, OverlayKind::Mastery, &policy);
        assert_eq!(mastery.len(), 1);
        assert_eq!(mastery[0].id, 1);

        // The zone overlay is unaffected.
        let zone_overlay = apply_zone_policy(&zones, OverlayKind::Zone, &policy);
        assert_eq!(zone_overlay.len(), 2);
    }

    #[test]
    fn test_policy_overlay_overrides_win_over_global() {
        let zones = vec![zone(7, "Original")];
        let mut policy = ZoneDataPolicy::default();
        policy.global_overrides.insert(
            7,
            ZoneOverrides {
                name: Some("Global".to_string()),
                min_level: Some(10),
                ..Default::default()
            },
        );
        policy.overlay_overrides.insert(
            OverlayKind::Zone,
            HashMap::from([(
                7,
                ZoneOverrides {
                    name: Some("Conditional".to_string()),
                    ..Default::default()
                },
            )]),
        );

        let result = apply_zone_policy(&zones, OverlayKind::Zone, &policy);
        // The per-overlay name wins; the global level override survives.
        assert_eq!(result[0].name, "Conditional");
        assert_eq!(result[0].min_level, Some(10));

        let other = apply_zone_policy(&zones, OverlayKind::Mastery, &policy);
        assert_eq!(other[0].name, "Global");
    }

    #[test]
    fn test_policy_appends_custom_zones() {
        let zones = vec![zone(1, "Base")];
        let mut policy = ZoneDataPolicy::default();
        policy
            .custom_zones
            .insert(OverlayKind::Zone, vec![zone(-1, "Synthetic")]);

        let result = apply_zone_policy(&zones, OverlayKind::Zone, &policy);
        assert_eq!(result.len(), 2);
        assert_eq!(result[1].name, "Synthetic");
        assert_eq!(result[1].id, -1);
    }

    #[test]
    fn test_choose_layout_rejects_unknown_names() {
        let layouts = HashMap::from([(
            "TyriaWorld".to_string(),
            MapLayout::single_sector(MapSector::new(1, None)),
        )]);

        assert!(choose_layout(&layouts, "TyriaWorld").is_ok());
        assert!(matches!(
            choose_layout(&layouts, "Cantha"),
            Err(RenderError::UnknownLayoutName(name)) if name == "Cantha"
        ));
    }

    #[test]
    fn test_parse_overlay_names_fails_fast() {
        let kinds =
            parse_overlay_names(&["zone_access".to_string(), "mastery".to_string()]).unwrap();
        assert_eq!(kinds, vec![OverlayKind::ZoneAccess, OverlayKind::Mastery]);

        assert!(matches!(
            parse_overlay_names(&["zone".to_string(), "landmarks".to_string()]),
            Err(RenderError::UnknownOverlayName(name)) if name == "landmarks"
        ));
    }
}
