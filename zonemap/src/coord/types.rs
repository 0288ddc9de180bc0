//! Core geometric types shared across the rendering pipeline.

use thiserror::Error;

/// A point in continent coordinates (the world's fixed coordinate space,
/// independent of zoom).
pub type ContinentPoint = (f64, f64);

/// An axis-aligned rectangle in continent coordinates, stored as
/// (top-left, bottom-right).
pub type ContinentRect = (ContinentPoint, ContinentPoint);

/// A point in image pixel space. Signed, because overlay buffers may be
/// pasted at negative offsets and clipped.
pub type PixelPoint = (i64, i64);

/// Errors raised while constructing coordinate systems or validating
/// layout geometry. All of these are fatal and abort the render before
/// any tile I/O happens.
#[derive(Debug, Error)]
pub enum CoordError {
    /// Requested zoom is outside the continent's supported range.
    #[error("Zoom {zoom} must be in the interval [{min}, {max}]")]
    InvalidZoom { zoom: f64, min: u8, max: u8 },

    /// Sector rectangle is degenerate or lies outside the continent extent.
    #[error("Invalid sector: {0}")]
    InvalidSector(String),

    /// Layout has no parts or a part with a negative offset.
    #[error("Invalid layout: {0}")]
    InvalidLayout(String),
}

/// Immutable per-continent map parameters, loaded once at startup.
///
/// `tile_coord_size_min_zoom` is the edge length of one tile in continent
/// units at the minimum zoom; `tile_dimensions_min_zoom` is the tile grid
/// size at that zoom. Together they define the continent's full extent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapParameters {
    pub continent_id: u32,
    pub tile_coord_size_min_zoom: f64,
    pub tile_dimensions_min_zoom: (u32, u32),
    pub min_zoom: u8,
    pub max_zoom: u8,
    /// Pixel edge length of one raster tile. 256 for the official service.
    pub tile_pixel_size: u32,
    /// Scale ratio between adjacent zoom levels. Must be > 1.
    pub zoom_factor: f64,
}

impl MapParameters {
    /// Creates parameters with the standard 256 px tiles and zoom factor 2.
    pub fn new(
        continent_id: u32,
        tile_coord_size_min_zoom: f64,
        tile_dimensions_min_zoom: (u32, u32),
        min_zoom: u8,
        max_zoom: u8,
    ) -> Self {
        Self {
            continent_id,
            tile_coord_size_min_zoom,
            tile_dimensions_min_zoom,
            min_zoom,
            max_zoom,
            tile_pixel_size: 256,
            zoom_factor: 2.0,
        }
    }

    /// Full continent extent in continent units.
    pub fn full_coord_size(&self) -> (f64, f64) {
        (
            self.tile_coord_size_min_zoom * self.tile_dimensions_min_zoom.0 as f64,
            self.tile_coord_size_min_zoom * self.tile_dimensions_min_zoom.1 as f64,
        )
    }
}

/// A named rectangular crop of a continent's coordinate space.
///
/// `continent_rect == None` selects the continent's full extent.
#[derive(Debug, Clone, PartialEq)]
pub struct MapSector {
    pub continent_id: u32,
    pub continent_rect: Option<ContinentRect>,
}

impl MapSector {
    pub fn new(continent_id: u32, continent_rect: Option<ContinentRect>) -> Self {
        Self {
            continent_id,
            continent_rect,
        }
    }

    /// Sector width in continent units, if a rect is set.
    pub fn width(&self) -> Option<f64> {
        self.continent_rect.map(|r| r.1 .0 - r.0 .0)
    }

    /// Sector height in continent units, if a rect is set.
    pub fn height(&self) -> Option<f64> {
        self.continent_rect.map(|r| r.1 .1 - r.0 .1)
    }
}

/// Horizontal edge the legend is pinned to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LegendHAlign {
    Left,
    Right,
}

/// Vertical edge the legend is pinned to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LegendVAlign {
    Top,
    Bottom,
}

/// An arrangement of one or more sectors into a single composite output,
/// plus the corner and offset the overlay legend is anchored to.
///
/// Part offsets are in continent units so the same layout renders at any
/// zoom; they are converted to pixel offsets per render.
#[derive(Debug, Clone, PartialEq)]
pub struct MapLayout {
    pub parts: Vec<(ContinentPoint, MapSector)>,
    pub legend_align: (LegendHAlign, LegendVAlign),
    pub legend_offset: PixelPoint,
}

impl MapLayout {
    pub fn new(
        parts: Vec<(ContinentPoint, MapSector)>,
        legend_align: (LegendHAlign, LegendVAlign),
    ) -> Self {
        Self {
            parts,
            legend_align,
            legend_offset: (16, 16),
        }
    }

    /// A layout with a single sector at the origin.
    pub fn single_sector(sector: MapSector) -> Self {
        Self::new(vec![((0.0, 0.0), sector)], (LegendHAlign::Right, LegendVAlign::Top))
    }

    /// Checks that the layout has at least one part and no negative offsets.
    pub fn validate(&self) -> Result<(), CoordError> {
        if self.parts.is_empty() {
            return Err(CoordError::InvalidLayout("layout has no parts".into()));
        }
        for (offset, sector) in &self.parts {
            if offset.0 < 0.0 || offset.1 < 0.0 {
                return Err(CoordError::InvalidLayout(format!(
                    "part for continent {} has negative offset {:?}",
                    sector.continent_id, offset
                )));
            }
        }
        Ok(())
    }
}
