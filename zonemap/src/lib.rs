//! Zonemap - Composite zone map rendering for Guild Wars 2
//!
//! This library renders large composite map images by stitching raster
//! tiles from the official tile service (or a local mirror) into a canvas
//! and drawing zone boundaries, adaptively wrapped labels, portal markers
//! and mastery region overlays on top.
//!
//! The pipeline: a [`coord::MapCoordinateSystem`] is built per requested
//! (zoom, sector); an [`assemble::MapAssembler`] fetches and places tiles
//! through a [`source::TileSource`]; overlays draw onto the assembled
//! canvas using the same coordinate system; multi-sector layouts are
//! merged by [`composite::combine_part_images`]. [`render::RenderSession`]
//! orchestrates all of it. Zone/portal metadata, CLI parsing and image
//! file encoding are the caller's job.

pub mod assemble;
pub mod assets;
pub mod composite;
pub mod coord;
pub mod icon;
pub mod overlay;
pub mod render;
pub mod source;
pub mod util;
pub mod zone;

pub use assemble::{AssembleError, MapAssembler};
pub use assets::{AssetBundle, AssetError, LoadedFont};
pub use coord::{
    ContinentPoint, ContinentRect, CoordError, MapCoordinateSystem, MapLayout, MapParameters,
    MapSector, PixelPoint,
};
pub use icon::IconBlender;
pub use overlay::{MapOverlay, OverlayError, OverlayKind};
pub use render::{
    RenderError, RenderOptions, RenderRequest, RenderSession, RenderedMap, ZoneDataPolicy,
};
pub use source::{LocalTileSource, RemoteTileSource, TileError, TileSource};
pub use zone::{AccessTier, PortalMarker, PortalTable, Zone, ZoneCategory, ZoneOverrides};
