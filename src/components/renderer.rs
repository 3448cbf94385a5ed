// ============================================================================
// RENDERER — keeps the display surface in sync with the grid
// ============================================================================

use image::RgbaImage;

use crate::assets::TileAssets;
use crate::components::render_cache::{RenderCache, RenderKey};
use crate::components::viewport::Viewport;
use crate::grid::{Grid, LayerId, NUM_LAYERS};
use crate::ops::transform::{Interpolation, resize};

/// Display surface the editor draws onto (a canvas widget, a texture
/// atlas, a test recorder...). The engine never touches pixels on screen
/// itself; it only asks the surface to place and remove bitmaps.
pub trait Surface {
    /// Uploaded, display-ready bitmap. Shared between every cell that shows
    /// the same stamp at the same size.
    type Texture: Clone;
    /// A placed item that can later be removed.
    type Item: Copy;

    fn create_texture(&mut self, image: RgbaImage) -> Self::Texture;
    fn draw(&mut self, texture: &Self::Texture, x: u32, y: u32, layer: LayerId) -> Self::Item;
    fn delete(&mut self, item: Self::Item);
    /// Remove everything currently drawn.
    fn clear(&mut self);

    fn draw_background(&mut self, _image: RgbaImage) {}
    fn set_scroll_region(&mut self, _width: u32, _height: u32) {}
    /// One straight grid-overlay line, drawn above both tile layers.
    fn draw_grid_line(&mut self, _x0: u32, _y0: u32, _x1: u32, _y1: u32) {}
}

/// Owns the surface, the stamp cache and the per-cell `render_handle`
/// shadow array.
pub struct Renderer<S: Surface> {
    surface: S,
    cache: RenderCache<S::Texture>,
    /// `NUM_LAYERS × height × width`, row-major per layer.
    handles: Vec<Option<S::Item>>,
    width: usize,
    height: usize,
    show_grid: bool,
}

impl<S: Surface> Renderer<S> {
    pub fn new(surface: S, width: usize, height: usize) -> Self {
        Self {
            surface,
            cache: RenderCache::new(),
            handles: vec![None; NUM_LAYERS * width * height],
            width,
            height,
            show_grid: true,
        }
    }

    pub fn show_grid(&self) -> bool {
        self.show_grid
    }

    /// Takes effect on the next full redraw.
    pub fn set_show_grid(&mut self, show: bool) {
        self.show_grid = show;
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn cache(&self) -> &RenderCache<S::Texture> {
        &self.cache
    }

    pub fn invalidate_cache(&mut self) {
        self.cache.invalidate_all();
    }

    /// Item currently drawn at a cell, if any.
    pub fn handle_at(&self, layer: LayerId, row: usize, col: usize) -> Option<S::Item> {
        self.slot(layer, row, col).and_then(|i| self.handles[i])
    }

    pub fn drawn_count(&self) -> usize {
        self.handles.iter().filter(|h| h.is_some()).count()
    }

    fn slot(&self, layer: LayerId, row: usize, col: usize) -> Option<usize> {
        if row < self.height && col < self.width {
            Some((layer.index() * self.height + row) * self.width + col)
        } else {
            None
        }
    }

    /// Match a grid of new dimensions. Clears the surface.
    pub fn resize(&mut self, width: usize, height: usize) {
        self.surface.clear();
        self.width = width;
        self.height = height;
        self.handles = vec![None; NUM_LAYERS * width * height];
    }

    /// Redraw a single cell. The previous item at the cell is always
    /// deleted first, so repeated repaints never leak surface items.
    pub fn draw_cell(
        &mut self,
        grid: &Grid,
        assets: &TileAssets,
        viewport: &Viewport,
        layer: LayerId,
        row: usize,
        col: usize,
    ) {
        let Some(slot) = self.slot(layer, row, col) else { return };
        if let Some(item) = self.handles[slot].take() {
            self.surface.delete(item);
        }

        let Some(cell) = grid.get(layer, row as i32, col as i32) else { return };
        if cell.is_empty() || !assets.contains(cell.tile) {
            return;
        }

        let key = RenderKey::new(cell, viewport.pixel_size());
        let surface = &mut self.surface;
        let texture = self
            .cache
            .get_or_render(key, assets, |img| surface.create_texture(img));
        let (x, y) = viewport.cell_origin(row, col);
        self.handles[slot] = Some(self.surface.draw(&texture, x, y, layer));
    }

    /// Clear the surface and draw background plus every cell of both
    /// layers. Keeps the stamp cache.
    pub fn full_redraw(
        &mut self,
        grid: &Grid,
        assets: &TileAssets,
        viewport: &Viewport,
        background: Option<&RgbaImage>,
    ) {
        if grid.width() != self.width || grid.height() != self.height {
            self.resize(grid.width(), grid.height());
        }
        self.surface.clear();
        self.handles.fill(None);

        let (map_w, map_h) = viewport.map_pixel_size(grid.width(), grid.height());
        self.surface.set_scroll_region(map_w, map_h);

        if let Some(bg) = background
            && map_w > 0
            && map_h > 0
        {
            self.surface
                .draw_background(resize(bg, map_w, map_h, Interpolation::Nearest));
        }

        for layer in LayerId::ALL {
            for row in 0..grid.height() {
                for col in 0..grid.width() {
                    self.draw_cell(grid, assets, viewport, layer, row, col);
                }
            }
        }

        if self.show_grid {
            self.draw_grid(viewport, map_w, map_h);
        }
    }

    /// `width + 1` vertical and `height + 1` horizontal lines on cell
    /// boundaries.
    fn draw_grid(&mut self, viewport: &Viewport, map_w: u32, map_h: u32) {
        for col in 0..=self.width {
            let (x, _) = viewport.cell_origin(0, col);
            self.surface.draw_grid_line(x, 0, x, map_h);
        }
        for row in 0..=self.height {
            let (_, y) = viewport.cell_origin(row, 0);
            self.surface.draw_grid_line(0, y, map_w, y);
        }
    }
}
