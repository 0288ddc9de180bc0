//! Asset loading phase.
//!
//! Fonts and marker icons are loaded once into an immutable [`AssetBundle`]
//! and injected into the components that draw with them. This replaces
//! module-level lazily-populated caches: every asset the render needs is
//! resolved up front, so a missing file fails before any tile I/O starts.
//!
//! Expected directory layout:
//!
//! ```text
//! assets/
//!   fonts/FiraSans-Regular.ttf
//!   fonts/FiraSans-SemiBold.ttf
//!   icons/<key>.png          (portal and access-tier icons)
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use ab_glyph::{Font, FontArc, PxScale, ScaleFont};
use image::RgbaImage;
use thiserror::Error;
use tracing::debug;

/// Errors raised while loading the asset bundle.
#[derive(Debug, Error)]
pub enum AssetError {
    /// I/O error reading an asset file.
    #[error("I/O error reading asset {0}: {1}")]
    Io(PathBuf, std::io::Error),

    /// A font file was unreadable as TrueType/OpenType.
    #[error("Invalid font file: {0}")]
    InvalidFont(PathBuf),

    /// An icon file failed to decode.
    #[error("Failed to decode icon {0}: {1}")]
    Image(PathBuf, image::ImageError),

    /// An icon referenced by overlay settings is not in the bundle.
    #[error("Icon '{0}' is missing from the asset bundle")]
    MissingIcon(String),
}

/// A loaded font face plus the metric helpers the label engine needs.
#[derive(Debug, Clone)]
pub struct LoadedFont {
    font: FontArc,
}

impl LoadedFont {
    pub fn from_bytes(bytes: Vec<u8>, path: &Path) -> Result<Self, AssetError> {
        let font =
            FontArc::try_from_vec(bytes).map_err(|_| AssetError::InvalidFont(path.into()))?;
        Ok(Self { font })
    }

    /// The underlying font for raster text drawing.
    pub fn raw(&self) -> &FontArc {
        &self.font
    }

    /// Ascent above the baseline at the given pixel size.
    pub fn ascent(&self, size: f32) -> f32 {
        self.font.as_scaled(PxScale::from(size)).ascent()
    }

    /// Descent below the baseline at the given pixel size, as a positive
    /// number.
    pub fn descent(&self, size: f32) -> f32 {
        -self.font.as_scaled(PxScale::from(size)).descent()
    }

    /// Advance width of `text` at the given pixel size, including kerning.
    pub fn text_width(&self, size: f32, text: &str) -> f32 {
        let scaled = self.font.as_scaled(PxScale::from(size));
        let mut width = 0.0;
        let mut previous = None;
        for ch in text.chars() {
            let id = self.font.glyph_id(ch);
            if let Some(prev) = previous {
                width += scaled.kern(prev, id);
            }
            width += scaled.h_advance(id);
            previous = Some(id);
        }
        width
    }
}

/// Immutable bundle of fonts and icons shared by all overlays of a render
/// session.
pub struct AssetBundle {
    font_regular: LoadedFont,
    font_semibold: LoadedFont,
    icons: HashMap<String, RgbaImage>,
}

impl AssetBundle {
    /// Loads fonts and every `icons/*.png` under `dir`.
    pub fn load(dir: impl AsRef<Path>) -> Result<Self, AssetError> {
        let dir = dir.as_ref();
        let font_regular = load_font(&dir.join("fonts/FiraSans-Regular.ttf"))?;
        let font_semibold = load_font(&dir.join("fonts/FiraSans-SemiBold.ttf"))?;

        let mut icons = HashMap::new();
        let icons_dir = dir.join("icons");
        let entries =
            std::fs::read_dir(&icons_dir).map_err(|e| AssetError::Io(icons_dir.clone(), e))?;
        for entry in entries {
            let entry = entry.map_err(|e| AssetError::Io(icons_dir.clone(), e))?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("png") {
                continue;
            }
            let Some(key) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let image = image::open(&path)
                .map_err(|e| AssetError::Image(path.clone(), e))?
                .to_rgba8();
            icons.insert(key.to_string(), image);
        }
        debug!(icons = icons.len(), "asset bundle loaded");

        Ok(Self {
            font_regular,
            font_semibold,
            icons,
        })
    }

    /// Builds a bundle from in-memory parts. Intended for tests and
    /// embedders that ship their own assets.
    pub fn from_parts(
        font_regular: LoadedFont,
        font_semibold: LoadedFont,
        icons: HashMap<String, RgbaImage>,
    ) -> Self {
        Self {
            font_regular,
            font_semibold,
            icons,
        }
    }

    pub fn font_regular(&self) -> &LoadedFont {
        &self.font_regular
    }

    pub fn font_semibold(&self) -> &LoadedFont {
        &self.font_semibold
    }

    /// Looks up an icon by key (the PNG file stem).
    pub fn icon(&self, key: &str) -> Result<&RgbaImage, AssetError> {
        lookup_icon(&self.icons, key)
    }
}

fn lookup_icon<'a>(
    icons: &'a HashMap<String, RgbaImage>,
    key: &str,
) -> Result<&'a RgbaImage, AssetError> {
    icons
        .get(key)
        .ok_or_else(|| AssetError::MissingIcon(key.to_string()))
}

fn load_font(path: &Path) -> Result<LoadedFont, AssetError> {
    let bytes = std::fs::read(path).map_err(|e| AssetError::Io(path.into(), e))?;
    LoadedFont::from_bytes(bytes, path)
}
