//! Tile assembly engine
//!
//! Fetches every tile covering a sector and pastes them into one canvas.
//!
//! # Concurrency
//!
//! Fetches run through `buffer_unordered` bounded by the source's declared
//! `max_parallelism()`. Each tile's destination offset is a pure function
//! of its own (x, y), so final pixel content is independent of completion
//! order. A detached timer task polls a shared atomic counter to log
//! progress; it never touches the data path.
//!
//! # Failure semantics
//!
//! Sources that report `degrades_on_error` (the remote service) have
//! failed fetches replaced with solid black placeholder tiles and logged;
//! for all other sources the first error aborts the whole batch.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use image::imageops::FilterType;
use image::{imageops, Rgba, RgbaImage};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::coord::MapCoordinateSystem;
use crate::source::{TileError, TileSource};

/// Interval between progress log lines while a batch is in flight.
const PROGRESS_INTERVAL: Duration = Duration::from_secs(2);

/// Errors raised while assembling a sector image.
#[derive(Debug, Error)]
pub enum AssembleError {
    /// A tile fetch failed on a source that does not degrade.
    #[error(transparent)]
    Tile(#[from] TileError),
}

/// Assembles sector images from a tile source.
pub struct MapAssembler {
    source: Arc<dyn TileSource>,
}

impl MapAssembler {
    pub fn new(source: Arc<dyn TileSource>) -> Self {
        Self { source }
    }

    /// Fetches all tiles covering the coordinate system's sector and
    /// assembles them into one RGBA canvas at the requested zoom.
    ///
    /// For fractional zoom the canvas is assembled at the fetch zoom and
    /// then Lanczos-downsampled to the requested resolution.
    pub async fn generate(
        &self,
        continent: u32,
        floor: u32,
        coord: &MapCoordinateSystem,
    ) -> Result<RgbaImage, AssembleError> {
        let tile_px = coord.params().tile_pixel_size;
        let (canvas_w, canvas_h) = coord.sector_fetch_dimensions();
        let mut canvas = RgbaImage::from_pixel(canvas_w, canvas_h, Rgba([0, 0, 0, 255]));

        let top_left_tile = coord.continent_to_tile_coord(coord.sector_top_left());
        let bottom_right_tile = coord.continent_to_tile_coord(coord.sector_bottom_right());
        let top_left_image = coord.continent_to_fetch_image_coord(coord.sector_top_left());

        let mut tiles = Vec::new();
        for x in top_left_tile.0..=bottom_right_tile.0 {
            for y in top_left_tile.1..=bottom_right_tile.1 {
                tiles.push((x, y));
            }
        }
        let total = tiles.len();
        debug!(
            continent,
            floor,
            fetch_zoom = coord.fetch_zoom(),
            tiles = total,
            "assembling sector from tile range {:?}..={:?}",
            top_left_tile,
            bottom_right_tile
        );

        let fetched = Arc::new(AtomicUsize::new(0));
        let progress = tokio::spawn({
            let fetched = Arc::clone(&fetched);
            async move {
                let mut interval = tokio::time::interval(PROGRESS_INTERVAL);
                interval.tick().await;
                loop {
                    interval.tick().await;
                    info!(
                        "fetched {}/{} tiles",
                        fetched.load(Ordering::Relaxed),
                        total
                    );
                }
            }
        });

        let fetch_zoom = coord.fetch_zoom();
        let mut results = stream::iter(tiles)
            .map(|(x, y)| {
                let source = Arc::clone(&self.source);
                let fetched = Arc::clone(&fetched);
                async move {
                    let result = source.fetch_tile(continent, floor, fetch_zoom, x, y).await;
                    fetched.fetch_add(1, Ordering::Relaxed);
                    ((x, y), result)
                }
            })
            .buffer_unordered(self.source.max_parallelism().max(1));

        while let Some(((x, y), result)) = results.next().await {
            let tile = match result {
                Ok(tile) => tile,
                Err(error) if self.source.degrades_on_error() => {
                    warn!(x, y, zoom = fetch_zoom, %error, "tile fetch degraded to placeholder");
                    RgbaImage::from_pixel(tile_px, tile_px, Rgba([0, 0, 0, 255]))
                }
                Err(error) => {
                    drop(results);
                    progress.abort();
                    return Err(error.into());
                }
            };

            // Destination depends only on (x, y); every tile covers a
            // disjoint region of the canvas.
            let dest_x = x * tile_px as i64 - top_left_image.0;
            let dest_y = y * tile_px as i64 - top_left_image.1;
            imageops::overlay(&mut canvas, &tile, dest_x, dest_y);
        }
        progress.abort();

        if coord.has_fractional_zoom() {
            let (out_w, out_h) = coord.sector_image_dimensions();
            debug!(
                from = ?(canvas_w, canvas_h),
                to = ?(out_w, out_h),
                "downsampling fractional-zoom canvas"
            );
            canvas = imageops::resize(&canvas, out_w, out_h, FilterType::Lanczos3);
        }

        Ok(canvas)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coord::{MapParameters, MapSector};
    use crate::source::{LocalTileSource, MockHttpClient, RemoteTileSource};
    use async_trait::async_trait;

    fn tyria_params() -> MapParameters {
        MapParameters::new(1, 16384.0, (5, 7), 1, 7)
    }

    /// Tile source producing a distinct solid color per (x, y).
    struct PatternTileSource;

    #[async_trait]
    impl TileSource for PatternTileSource {
        async fn fetch_tile(
            &self,
            _continent: u32,
            _floor: u32,
            _zoom: u8,
            x: i64,
            y: i64,
        ) -> Result<RgbaImage, TileError> {
            let color = Rgba([(x * 10) as u8, (y * 10) as u8, 0, 255]);
            Ok(RgbaImage::from_pixel(256, 256, color))
        }

        fn max_parallelism(&self) -> usize {
            4
        }
    }

    #[tokio::test]
    async fn test_tiles_land_at_offsets_derived_from_their_indices() {
        // Sector spanning tiles (1,1)..=(2,2) at zoom 1.
        let params = tyria_params();
        let sector = MapSector::new(1, Some(((16384.0, 16384.0), (49151.0, 49151.0))));
        let coord = MapCoordinateSystem::new(&params, 1.0, Some(&sector)).unwrap();

        let assembler = MapAssembler::new(Arc::new(PatternTileSource));
        let image = assembler.generate(1, 1, &coord).await.unwrap();

        assert_eq!(image.dimensions(), (512, 512));
        assert_eq!(image.get_pixel(0, 0), &Rgba([10, 10, 0, 255]));
        assert_eq!(image.get_pixel(255, 255), &Rgba([10, 10, 0, 255]));
        assert_eq!(image.get_pixel(256, 0), &Rgba([20, 10, 0, 255]));
        assert_eq!(image.get_pixel(0, 256), &Rgba([10, 20, 0, 255]));
        assert_eq!(image.get_pixel(300, 300), &Rgba([20, 20, 0, 255]));
    }

    #[tokio::test]
    async fn test_remote_fetch_failure_degrades_to_black_placeholder() {
        let params = tyria_params();
        let sector = MapSector::new(1, Some(((16384.0, 16384.0), (32767.0, 32767.0))));
        let coord = MapCoordinateSystem::new(&params, 1.0, Some(&sector)).unwrap();

        let source = RemoteTileSource::new(MockHttpClient::with_error("HTTP 500"));
        let assembler = MapAssembler::new(Arc::new(source));

        // The batch completes despite every fetch failing.
        let image = assembler.generate(1, 1, &coord).await.unwrap();
        assert_eq!(image.dimensions(), (256, 256));
        for pixel in image.pixels() {
            assert_eq!(pixel, &Rgba([0, 0, 0, 255]));
        }
    }

    #[tokio::test]
    async fn test_missing_local_tile_aborts_the_batch() {
        let dir = tempfile::tempdir().unwrap();
        let params = tyria_params();
        let sector = MapSector::new(1, Some(((16384.0, 16384.0), (32767.0, 32767.0))));
        let coord = MapCoordinateSystem::new(&params, 1.0, Some(&sector)).unwrap();

        let assembler = MapAssembler::new(Arc::new(LocalTileSource::new(dir.path())));
        let result = assembler.generate(1, 1, &coord).await;
        assert!(matches!(
            result,
            Err(AssembleError::Tile(TileError::NotFound(_)))
        ));
    }

    #[tokio::test]
    async fn test_fractional_zoom_downsamples_to_requested_resolution() {
        let params = tyria_params();
        let sector = MapSector::new(1, Some(((16384.0, 16384.0), (49151.0, 49151.0))));

        let integer = MapCoordinateSystem::new(&params, 2.0, Some(&sector)).unwrap();
        let fractional = MapCoordinateSystem::new(&params, 1.5, Some(&sector)).unwrap();

        let assembler = MapAssembler::new(Arc::new(PatternTileSource));
        let at_two = assembler.generate(1, 1, &integer).await.unwrap();
        let at_one_and_a_half = assembler.generate(1, 1, &fractional).await.unwrap();

        assert_eq!(at_two.dimensions(), integer.sector_image_dimensions());
        assert_eq!(
            at_one_and_a_half.dimensions(),
            fractional.sector_image_dimensions()
        );
        assert!(at_one_and_a_half.width() < at_two.width());
    }
}
