//! Map tile source abstraction
//!
//! Tiles are fixed-size raster blocks addressed by
//! `(continent, floor, zoom, x, y)`. Two implementations exist:
//!
//! - [`LocalTileSource`] reads a pre-downloaded directory tree. A local
//!   source is assumed complete, so a missing file is fatal.
//! - [`RemoteTileSource`] fetches from the official tile service over HTTP.
//!   Remote sources are assumed transiently unreliable, so the assembler
//!   substitutes a placeholder for failed fetches instead of aborting.
//!
//! Each source declares its own fetch parallelism: 1 for the filesystem,
//! tens for the remote service.

mod http;
mod local;
mod remote;

pub use http::{HttpClient, ReqwestClient};
pub use local::LocalTileSource;
pub use remote::RemoteTileSource;

#[cfg(test)]
pub use http::tests::MockHttpClient;

use std::path::PathBuf;

use async_trait::async_trait;
use image::RgbaImage;
use thiserror::Error;

/// Errors raised while fetching a single tile.
#[derive(Debug, Error)]
pub enum TileError {
    /// A tile file is missing from a local source. Fatal: local sources
    /// are assumed complete.
    #[error("Tile not found: {0}")]
    NotFound(PathBuf),

    /// The remote service returned an error for a tile URL.
    #[error("HTTP error fetching {url}: {reason}")]
    Http { url: String, reason: String },

    /// The fetched bytes were not a decodable image.
    #[error("Failed to decode tile {0}: {1}")]
    Decode(String, image::ImageError),

    /// I/O error reading a local tile.
    #[error("I/O error reading tile {0}: {1}")]
    Io(PathBuf, std::io::Error),
}

/// A provider of map tile rasters.
#[async_trait]
pub trait TileSource: Send + Sync {
    /// Fetches one tile and decodes it to RGBA.
    async fn fetch_tile(
        &self,
        continent: u32,
        floor: u32,
        zoom: u8,
        x: i64,
        y: i64,
    ) -> Result<RgbaImage, TileError>;

    /// Maximum number of concurrent fetches this source tolerates.
    fn max_parallelism(&self) -> usize;

    /// Whether a failed fetch should degrade to a placeholder tile instead
    /// of aborting the batch.
    fn degrades_on_error(&self) -> bool {
        false
    }
}
