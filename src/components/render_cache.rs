use image::RgbaImage;
use std::collections::HashMap;

use crate::assets::TileAssets;
use crate::grid::{Cell, Rotation, TileId};
use crate::ops::transform::transform_tile;

/// Value key for one rendered stamp at one on-screen size.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RenderKey {
    pub tile: TileId,
    pub rotation: Rotation,
    pub mirror: bool,
    pub pixel_size: u32,
}

impl RenderKey {
    pub fn new(cell: Cell, pixel_size: u32) -> Self {
        Self {
            tile: cell.tile,
            rotation: cell.rotation,
            mirror: cell.mirror,
            pixel_size,
        }
    }
}

/// Memoised stamp renders, keyed by [`RenderKey`].
///
/// `T` is whatever display-ready handle the surface hands back for an
/// uploaded bitmap. Entries are only valid for the asset table and pixel
/// size they were made from, so owners must call [`invalidate_all`] on zoom
/// changes and asset reloads. Dropping the cache never changes what the map
/// looks like, only how long the next redraw takes.
///
/// [`invalidate_all`]: RenderCache::invalidate_all
pub struct RenderCache<T> {
    entries: HashMap<RenderKey, T>,
    hits: u64,
    misses: u64,
}

impl<T> Default for RenderCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> RenderCache<T> {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
            hits: 0,
            misses: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, key: &RenderKey) -> bool {
        self.entries.contains_key(key)
    }

    /// `(hits, misses)` since creation.
    pub fn stats(&self) -> (u64, u64) {
        (self.hits, self.misses)
    }

    pub fn invalidate_all(&mut self) {
        self.entries.clear();
    }
}

impl<T: Clone> RenderCache<T> {
    /// Return the cached handle for `key`, rendering it through the
    /// transform engine and `wrap` on a miss.
    pub fn get_or_render<F>(&mut self, key: RenderKey, assets: &TileAssets, wrap: F) -> T
    where
        F: FnOnce(RgbaImage) -> T,
    {
        if let Some(handle) = self.entries.get(&key) {
            self.hits += 1;
            return handle.clone();
        }
        self.misses += 1;
        let img = transform_tile(
            assets.lookup_by_id(key.tile),
            key.rotation,
            key.mirror,
            key.pixel_size,
        );
        let handle = wrap(img);
        self.entries.insert(key, handle.clone());
        handle
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn assets() -> TileAssets {
        TileAssets::from_named_images(
            4,
            vec![("stone".to_string(), RgbaImage::from_pixel(4, 4, Rgba([9, 9, 9, 255])))],
        )
    }

    #[test]
    fn test_second_lookup_is_a_hit() {
        let assets = assets();
        let mut cache: RenderCache<u32> = RenderCache::new();
        let mut uploads = 0;
        let key = RenderKey::new(Cell::new(1, Rotation::R90, false), 16);

        let a = cache.get_or_render(key, &assets, |img| {
            uploads += 1;
            img.width()
        });
        let b = cache.get_or_render(key, &assets, |_| unreachable!());
        assert_eq!((a, b), (16, 16));
        assert_eq!(uploads, 1);
        assert_eq!(cache.stats(), (1, 1));
    }

    #[test]
    fn test_key_includes_transform_and_size() {
        let assets = assets();
        let mut cache: RenderCache<u32> = RenderCache::new();
        let cell = Cell::tile(1);
        cache.get_or_render(RenderKey::new(cell, 16), &assets, |img| img.width());
        cache.get_or_render(RenderKey::new(cell, 32), &assets, |img| img.width());
        cache.get_or_render(RenderKey::new(Cell::new(1, Rotation::R0, true), 16), &assets, |img| img.width());
        assert_eq!(cache.len(), 3);

        cache.invalidate_all();
        assert!(cache.is_empty());
        assert!(!cache.contains(&RenderKey::new(cell, 16)));
    }

    #[test]
    fn test_missing_asset_renders_transparent() {
        let assets = assets();
        let mut cache: RenderCache<RgbaImage> = RenderCache::new();
        let img = cache.get_or_render(RenderKey::new(Cell::tile(42), 8), &assets, |img| img);
        assert_eq!(img.dimensions(), (8, 8));
        assert!(img.pixels().all(|p| p.0[3] == 0));
    }
}
