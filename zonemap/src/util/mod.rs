//! Small shared helpers: session-scoped memoization tables and raster
//! bounding-box utilities.

use std::collections::HashMap;
use std::hash::Hash;

use image::RgbaImage;
use parking_lot::Mutex;

/// An explicit memoization table keyed by input tuple.
///
/// Replaces decorator-style caching on pure functions: tables are owned by
/// the render session and cleared between independent runs so memory stays
/// bounded in long-lived processes. Read-mostly and safe to share across
/// concurrent render passes.
#[derive(Debug, Default)]
pub struct Memo<K, V> {
    map: Mutex<HashMap<K, V>>,
}

impl<K: Eq + Hash + Clone, V: Clone> Memo<K, V> {
    pub fn new() -> Self {
        Self {
            map: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the cached value for `key`, computing and storing it first
    /// if absent.
    pub fn get_or_insert_with(&self, key: K, compute: impl FnOnce() -> V) -> V {
        if let Some(value) = self.map.lock().get(&key) {
            return value.clone();
        }
        // Computed outside the lock; a racing duplicate insert is harmless
        // for pure functions.
        let value = compute();
        self.map.lock().insert(key, value.clone());
        value
    }

    /// Fallible variant; errors are not cached.
    pub fn try_get_or_insert_with<E>(
        &self,
        key: K,
        compute: impl FnOnce() -> Result<V, E>,
    ) -> Result<V, E> {
        if let Some(value) = self.map.lock().get(&key) {
            return Ok(value.clone());
        }
        let value = compute()?;
        self.map.lock().insert(key, value.clone());
        Ok(value)
    }

    pub fn clear(&self) {
        self.map.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.map.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.lock().is_empty()
    }
}

/// Bounding box of all pixels with nonzero alpha, as
/// (left, top, right, bottom) with exclusive right/bottom.
/// Returns `None` for a fully transparent image.
pub fn content_bbox(image: &RgbaImage) -> Option<(u32, u32, u32, u32)> {
    let mut left = u32::MAX;
    let mut top = u32::MAX;
    let mut right = 0u32;
    let mut bottom = 0u32;

    for (x, y, pixel) in image.enumerate_pixels() {
        if pixel[3] > 0 {
            left = left.min(x);
            top = top.min(y);
            right = right.max(x + 1);
            bottom = bottom.max(y + 1);
        }
    }

    if left == u32::MAX {
        None
    } else {
        Some((left, top, right, bottom))
    }
}

/// Crops an image to its content bounding box expanded by `padding`,
/// clamped to the image bounds. Fully transparent images come back
/// unchanged.
pub fn crop_to_content(image: &RgbaImage, padding: u32) -> RgbaImage {
    match content_bbox(image) {
        None => image.clone(),
        Some((left, top, right, bottom)) => {
            let x = left.saturating_sub(padding);
            let y = top.saturating_sub(padding);
            let right = (right + padding).min(image.width());
            let bottom = (bottom + padding).min(image.height());
            image::imageops::crop_imm(image, x, y, right - x, bottom - y).to_image()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_memo_computes_once_per_key() {
        let memo: Memo<(u32, u32), u32> = Memo::new();
        let calls = AtomicUsize::new(0);

        let compute = |a: u32, b: u32| {
            calls.fetch_add(1, Ordering::Relaxed);
            a + b
        };

        assert_eq!(memo.get_or_insert_with((2, 3), || compute(2, 3)), 5);
        assert_eq!(memo.get_or_insert_with((2, 3), || compute(2, 3)), 5);
        assert_eq!(memo.get_or_insert_with((4, 3), || compute(4, 3)), 7);
        assert_eq!(calls.load(Ordering::Relaxed), 2);
    }

    #[test]
    fn test_memo_clear_resets_entries() {
        let memo: Memo<u32, u32> = Memo::new();
        memo.get_or_insert_with(1, || 10);
        assert_eq!(memo.len(), 1);
        memo.clear();
        assert!(memo.is_empty());
    }

    #[test]
    fn test_content_bbox_finds_opaque_region() {
        let mut image = RgbaImage::new(20, 20);
        image.put_pixel(5, 6, Rgba([255, 0, 0, 255]));
        image.put_pixel(10, 12, Rgba([0, 255, 0, 128]));

        assert_eq!(content_bbox(&image), Some((5, 6, 11, 13)));
    }

    #[test]
    fn test_content_bbox_of_transparent_image_is_none() {
        let image = RgbaImage::new(8, 8);
        assert_eq!(content_bbox(&image), None);
    }

    #[test]
    fn test_crop_to_content_with_padding() {
        let mut image = RgbaImage::new(20, 20);
        image.put_pixel(10, 10, Rgba([255, 255, 255, 255]));

        let cropped = crop_to_content(&image, 2);
        assert_eq!(cropped.dimensions(), (5, 5));
        assert_eq!(cropped.get_pixel(2, 2), &Rgba([255, 255, 255, 255]));
    }
}
