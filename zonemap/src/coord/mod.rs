//! Coordinate conversion module
//!
//! Provides conversions between continent coordinates, tile indices and
//! image pixel space for a given (parameters, zoom, sector) triple.
//!
//! A [`MapCoordinateSystem`] is constructed per render request and discarded
//! afterwards. Fractional zoom is supported by fetching tiles at the next
//! integer zoom level (`fetch_zoom = zoom.ceil()`) and exposing both the
//! fetch-zoom transforms (for tile retrieval) and the requested-zoom
//! transforms (for final placement) from the same object.

mod types;

pub use types::{
    ContinentPoint, ContinentRect, CoordError, LegendHAlign, LegendVAlign, MapLayout,
    MapParameters, MapSector, PixelPoint,
};

/// Precomputed transforms bound to one (parameters, zoom, sector) triple.
#[derive(Debug, Clone)]
pub struct MapCoordinateSystem {
    params: MapParameters,
    zoom: f64,
    fetch_zoom: u8,
    /// Edge length of one tile in continent units at the fetch zoom.
    tile_coord_size: f64,
    continent_to_tile_multiplier: f64,
    /// Continent units -> pixels at the fetch (integer) zoom.
    fetch_image_multiplier: f64,
    /// Continent units -> pixels at the requested (possibly fractional) zoom.
    image_multiplier: f64,
    sector_top_left: ContinentPoint,
    sector_bottom_right: ContinentPoint,
    sector_dimensions: (f64, f64),
}

impl MapCoordinateSystem {
    /// Builds the coordinate system for the given zoom and optional sector.
    ///
    /// # Errors
    ///
    /// * [`CoordError::InvalidZoom`] if `zoom` is outside
    ///   `[min_zoom, max_zoom]`.
    /// * [`CoordError::InvalidSector`] if the sector rect lies outside the
    ///   continent's full extent or is not strictly ordered.
    pub fn new(
        params: &MapParameters,
        zoom: f64,
        sector: Option<&MapSector>,
    ) -> Result<Self, CoordError> {
        if zoom < params.min_zoom as f64 || zoom > params.max_zoom as f64 {
            return Err(CoordError::InvalidZoom {
                zoom,
                min: params.min_zoom,
                max: params.max_zoom,
            });
        }

        let full_size = params.full_coord_size();
        let full_rect: ContinentRect = ((0.0, 0.0), (full_size.0 - 1.0, full_size.1 - 1.0));
        let sector_rect = sector
            .and_then(|s| s.continent_rect)
            .unwrap_or(full_rect);

        if sector_rect.0 .0 < full_rect.0 .0
            || sector_rect.0 .1 < full_rect.0 .1
            || sector_rect.1 .0 > full_rect.1 .0
            || sector_rect.1 .1 > full_rect.1 .1
        {
            return Err(CoordError::InvalidSector(format!(
                "sector {:?} must be within bounds {:?}",
                sector_rect, full_rect
            )));
        }
        if sector_rect.0 .0 >= sector_rect.1 .0 || sector_rect.0 .1 >= sector_rect.1 .1 {
            return Err(CoordError::InvalidSector(format!(
                "sector {:?} must be strictly ordered (top-left < bottom-right)",
                sector_rect
            )));
        }

        let fetch_zoom = zoom.ceil() as u8;
        let tile_coord_size = params.tile_pixel_size as f64
            * params.zoom_factor.powi(params.max_zoom as i32 - fetch_zoom as i32);
        let continent_to_tile_multiplier = 1.0 / tile_coord_size;
        let fetch_image_multiplier = params.tile_pixel_size as f64 * continent_to_tile_multiplier;
        let image_multiplier = params.zoom_factor.powf(zoom - params.max_zoom as f64);

        Ok(Self {
            params: *params,
            zoom,
            fetch_zoom,
            tile_coord_size,
            continent_to_tile_multiplier,
            fetch_image_multiplier,
            image_multiplier,
            sector_top_left: sector_rect.0,
            sector_bottom_right: sector_rect.1,
            sector_dimensions: (
                sector_rect.1 .0 - sector_rect.0 .0 + 1.0,
                sector_rect.1 .1 - sector_rect.0 .1 + 1.0,
            ),
        })
    }

    pub fn params(&self) -> &MapParameters {
        &self.params
    }

    /// The requested zoom, possibly fractional.
    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    /// The integer zoom tiles are fetched at (`zoom.ceil()`).
    pub fn fetch_zoom(&self) -> u8 {
        self.fetch_zoom
    }

    /// True when the requested zoom needs a downsampling pass after assembly.
    pub fn has_fractional_zoom(&self) -> bool {
        self.zoom < self.fetch_zoom as f64
    }

    pub fn sector_top_left(&self) -> ContinentPoint {
        self.sector_top_left
    }

    pub fn sector_bottom_right(&self) -> ContinentPoint {
        self.sector_bottom_right
    }

    /// Tile index covering the given continent coordinate at the fetch zoom.
    pub fn continent_to_tile_coord(&self, c: ContinentPoint) -> (i64, i64) {
        (
            (self.continent_to_tile_multiplier * c.0).floor() as i64,
            (self.continent_to_tile_multiplier * c.1).floor() as i64,
        )
    }

    /// Top-left continent coordinate of the given tile index.
    pub fn tile_top_left_continent(&self, tile: (i64, i64)) -> ContinentPoint {
        (
            tile.0 as f64 * self.tile_coord_size,
            tile.1 as f64 * self.tile_coord_size,
        )
    }

    /// Continent coordinate -> full-canvas pixel at the fetch zoom. Used for
    /// tile placement during assembly.
    pub fn continent_to_fetch_image_coord(&self, c: ContinentPoint) -> PixelPoint {
        (
            (self.fetch_image_multiplier * c.0).floor() as i64,
            (self.fetch_image_multiplier * c.1).floor() as i64,
        )
    }

    /// Continent coordinate -> full-canvas pixel at the requested zoom. Used
    /// for layout part offsets.
    pub fn continent_to_full_image_coord(&self, c: ContinentPoint) -> PixelPoint {
        (
            (self.image_multiplier * c.0).floor() as i64,
            (self.image_multiplier * c.1).floor() as i64,
        )
    }

    /// Continent coordinate -> sector-local pixel at the requested zoom.
    pub fn continent_to_sector_image_coord(&self, c: ContinentPoint) -> PixelPoint {
        (
            (self.image_multiplier * (c.0 - self.sector_top_left.0)).floor() as i64,
            (self.image_multiplier * (c.1 - self.sector_top_left.1)).floor() as i64,
        )
    }

    /// Rectangle variant of [`Self::continent_to_sector_image_coord`].
    pub fn continent_to_sector_image_rect(&self, r: ContinentRect) -> (PixelPoint, PixelPoint) {
        (
            self.continent_to_sector_image_coord(r.0),
            self.continent_to_sector_image_coord(r.1),
        )
    }

    /// Sector dimensions in pixels at the fetch zoom (the assembly canvas).
    pub fn sector_fetch_dimensions(&self) -> (u32, u32) {
        (
            (self.fetch_image_multiplier * self.sector_dimensions.0).floor() as u32,
            (self.fetch_image_multiplier * self.sector_dimensions.1).floor() as u32,
        )
    }

    /// Sector dimensions in pixels at the requested zoom (the output image).
    pub fn sector_image_dimensions(&self) -> (u32, u32) {
        (
            (self.image_multiplier * self.sector_dimensions.0).floor() as u32,
            (self.image_multiplier * self.sector_dimensions.1).floor() as u32,
        )
    }

    /// Strict containment: the point must lie strictly between the sector's
    /// corners on both axes. Points exactly on the boundary are excluded so
    /// zones sitting on a composite seam are not rendered twice.
    pub fn is_point_contained_in_sector(&self, c: ContinentPoint) -> bool {
        self.sector_top_left.0 < c.0
            && c.0 < self.sector_bottom_right.0
            && self.sector_top_left.1 < c.1
            && c.1 < self.sector_bottom_right.1
    }

    /// Strict containment of both corners.
    pub fn is_rect_contained_in_sector(&self, r: ContinentRect) -> bool {
        self.is_point_contained_in_sector(r.0) && self.is_point_contained_in_sector(r.1)
    }
}
