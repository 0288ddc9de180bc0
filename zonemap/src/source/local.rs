//! Local-filesystem tile source.

use std::path::PathBuf;

use async_trait::async_trait;
use image::RgbaImage;

use super::{TileError, TileSource};

/// Tile source reading tile images from a local directory tree in the
/// format `{root}/{continent}/{floor}/{zoom}/{x}/{y}.jpg`, for instance
/// a dump of that_shaman's map API.
///
/// The tree is assumed complete for the requested extent, so a missing
/// tile aborts the render. Disk reads are sequential (`max_parallelism`
/// of 1).
pub struct LocalTileSource {
    root: PathBuf,
}

impl LocalTileSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn tile_path(&self, continent: u32, floor: u32, zoom: u8, x: i64, y: i64) -> PathBuf {
        self.root
            .join(continent.to_string())
            .join(floor.to_string())
            .join(zoom.to_string())
            .join(x.to_string())
            .join(format!("{}.jpg", y))
    }
}

#[async_trait]
impl TileSource for LocalTileSource {
    async fn fetch_tile(
        &self,
        continent: u32,
        floor: u32,
        zoom: u8,
        x: i64,
        y: i64,
    ) -> Result<RgbaImage, TileError> {
        let path = self.tile_path(continent, floor, zoom, x, y);
        let bytes = tokio::fs::read(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                TileError::NotFound(path.clone())
            } else {
                TileError::Io(path.clone(), e)
            }
        })?;

        let image = image::load_from_memory(&bytes)
            .map_err(|e| TileError::Decode(path.display().to_string(), e))?;
        Ok(image.to_rgba8())
    }

    fn max_parallelism(&self) -> usize {
        1
    }
}
