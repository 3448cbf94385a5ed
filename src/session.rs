use image::RgbaImage;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::assets::{AssetError, AssetLoadReport, TileAssets, load_backgrounds};
use crate::components::history::{HistoryEntry, HistoryManager, Redraw};
use crate::components::renderer::{Renderer, Surface};
use crate::components::tools::{self, BrushSize, Ink, Tool, ToolState};
use crate::components::viewport::Viewport;
use crate::grid::{Cell, EMPTY_TILE, Grid, LayerId};
use crate::io::{self, ProjectError};
use crate::ops::transform::transform_tile;
use crate::settings::EditorSettings;
use crate::{log_err, log_info, log_warn};

/// One open map: grid, history, render cache, tool and zoom state.
///
/// Every component is owned here; nothing is process-global. All methods
/// run synchronously on the caller's thread.
pub struct EditorSession<S: Surface> {
    pub id: Uuid,
    settings: EditorSettings,
    grid: Grid,
    history: HistoryManager,
    pub tools: ToolState,
    viewport: Viewport,
    renderer: Renderer<S>,
    assets: TileAssets,
    tile_dir: PathBuf,
    backgrounds: Vec<RgbaImage>,
    current_background: usize,
    /// `None` for unsaved/untitled maps.
    path: Option<PathBuf>,
    is_dirty: bool,
    name: String,
}

impl<S: Surface> EditorSession<S> {
    /// Blank session with no assets loaded.
    pub fn new(settings: EditorSettings, surface: S) -> Self {
        let grid = Grid::new(settings.map_width, settings.map_height);
        let mut session = Self {
            id: Uuid::new_v4(),
            grid,
            history: HistoryManager::new(settings.max_history),
            tools: ToolState::default(),
            viewport: Viewport::new(settings.base_tile_size, settings.min_zoom, settings.max_zoom),
            renderer: Renderer::new(surface, settings.map_width, settings.map_height),
            assets: TileAssets::new(settings.tile_asset_size),
            tile_dir: settings.tile_dir.clone(),
            backgrounds: Vec::new(),
            current_background: 0,
            path: None,
            is_dirty: false,
            name: "Untitled".to_string(),
            settings,
        };
        session.renderer.set_show_grid(session.settings.show_grid);
        session.full_redraw();
        session
    }

    // ---- accessors ----------------------------------------------------------

    pub fn settings(&self) -> &EditorSettings {
        &self.settings
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn history(&self) -> &HistoryManager {
        &self.history
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn renderer(&self) -> &Renderer<S> {
        &self.renderer
    }

    pub fn surface(&self) -> &S {
        self.renderer.surface()
    }

    pub fn assets(&self) -> &TileAssets {
        &self.assets
    }

    pub fn tile_dir(&self) -> &Path {
        &self.tile_dir
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn is_dirty(&self) -> bool {
        self.is_dirty
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name with a `*` when there are unsaved edits.
    pub fn display_title(&self) -> String {
        if self.is_dirty {
            format!("{}*", self.name)
        } else {
            self.name.clone()
        }
    }

    fn update_name_from_path(&mut self) {
        if let Some(ref path) = self.path {
            self.name = path
                .file_name()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_else(|| "Unknown".to_string());
        }
    }

    // ---- assets -------------------------------------------------------------

    /// Swap in a new tile table. Cached renders belong to the old table and
    /// are dropped. A blank map gets its floor seeded.
    pub fn set_assets(&mut self, assets: TileAssets) {
        self.assets = assets;
        self.renderer.invalidate_cache();
        let stamp_tile = self.tools.stamp.tile;
        if stamp_tile != EMPTY_TILE
            && !self.assets.contains(stamp_tile)
            && let Some(&first) = self.assets.all_ids().first()
        {
            self.tools.select_tile(first);
        }
        if self.grid.is_blank() {
            self.seed_floor();
        }
        self.full_redraw();
    }

    /// Load the tile table from `dir`. On a directory-level error the
    /// current table stays in place.
    pub fn load_assets_from_dir(&mut self, dir: &Path) -> Result<AssetLoadReport, AssetError> {
        let (assets, report) = TileAssets::load_dir(dir, self.settings.tile_asset_size)?;
        self.tile_dir = dir.to_path_buf();
        self.set_assets(assets);
        Ok(report)
    }

    pub fn set_backgrounds(&mut self, backgrounds: Vec<RgbaImage>) {
        self.backgrounds = backgrounds;
        self.current_background = 0;
        self.full_redraw();
    }

    pub fn load_backgrounds_from_dir(&mut self, dir: &Path) -> Result<AssetLoadReport, AssetError> {
        let (images, report) = load_backgrounds(dir)?;
        self.set_backgrounds(images);
        Ok(report)
    }

    pub fn background(&self) -> Option<&RgbaImage> {
        self.backgrounds.get(self.current_background)
    }

    pub fn current_background_index(&self) -> usize {
        self.current_background
    }

    /// Advance to the next background, wrapping around.
    pub fn cycle_background(&mut self) {
        if self.backgrounds.len() > 1 {
            self.current_background = (self.current_background + 1) % self.backgrounds.len();
            self.full_redraw();
        }
    }

    /// Bottom rows of the Background layer get the configured floor tile.
    fn seed_floor(&mut self) {
        let Some(id) = self.assets.lookup_by_name(&self.settings.floor_tile) else {
            return;
        };
        let rows = self.settings.floor_rows.min(self.grid.height());
        let start = self.grid.height() - rows;
        self.grid.fill_rows_from(LayerId::Background, start, Cell::tile(id));
    }

    /// The current stamp as the tile selector shows it: mirrored, rotated
    /// and scaled to `size × size`. Transparent for the eraser or an
    /// unloaded tile.
    pub fn stamp_preview(&self, size: u32) -> RgbaImage {
        let stamp = self.tools.stamp;
        transform_tile(self.assets.lookup_by_id(stamp.tile), stamp.rotation, stamp.mirror, size)
    }

    /// e.g. `Tile: stone`
    pub fn stamp_label(&self) -> String {
        format!("Tile: {}", self.assets.tile_name(self.tools.stamp.tile))
    }

    // ---- rendering ----------------------------------------------------------

    pub fn full_redraw(&mut self) {
        let background = self.backgrounds.get(self.current_background);
        self.renderer
            .full_redraw(&self.grid, &self.assets, &self.viewport, background);
    }

    pub fn show_grid(&self) -> bool {
        self.renderer.show_grid()
    }

    /// Flip the grid-line overlay and redraw.
    pub fn toggle_grid(&mut self) {
        let show = !self.renderer.show_grid();
        self.renderer.set_show_grid(show);
        self.full_redraw();
    }

    fn redraw_cell(&mut self, layer: LayerId, row: usize, col: usize) {
        self.renderer
            .draw_cell(&self.grid, &self.assets, &self.viewport, layer, row, col);
    }

    fn apply_redraw(&mut self, redraw: Redraw) {
        match redraw {
            Redraw::Cell { layer, row, col } => self.redraw_cell(layer, row, col),
            Redraw::Full => self.full_redraw(),
        }
    }

    // ---- zoom / pan ---------------------------------------------------------

    /// Multiply the zoom level. A real change invalidates every cached
    /// render and redraws the whole map.
    pub fn zoom(&mut self, factor: f32) -> bool {
        if !self.viewport.zoom(factor) {
            return false;
        }
        self.renderer.invalidate_cache();
        self.full_redraw();
        true
    }

    pub fn zoom_in(&mut self) -> bool {
        self.zoom(self.settings.zoom_step)
    }

    pub fn zoom_out(&mut self) -> bool {
        self.zoom(1.0 / self.settings.zoom_step)
    }

    pub fn pan_by(&mut self, dx: f32, dy: f32) {
        self.viewport.pan_by(dx, dy);
    }

    // ---- editing ------------------------------------------------------------

    fn record(&mut self, entry: HistoryEntry) {
        self.history.push(entry);
        self.is_dirty = true;
    }

    /// Pointer press/drag with the primary button: apply the current tool.
    pub fn primary_action(&mut self, x: f32, y: f32) -> bool {
        let (row, col) = self.viewport.pixel_to_cell(x, y);
        match (self.tools.tool, self.tools.brush) {
            (Tool::Fill, _) => self.fill_at(row, col),
            (Tool::Paint, BrushSize::Single) => self.paint_at(row, col),
            (Tool::Eraser, BrushSize::Single) => self.erase_at(row, col),
            (Tool::Paint, brush) => self.brush_at(row, col, brush, Ink::Stamp(self.tools.stamp)),
            (Tool::Eraser, brush) => self.brush_at(row, col, brush, Ink::Erase),
        }
    }

    /// Pointer press/drag with the secondary button: always erases.
    pub fn secondary_action(&mut self, x: f32, y: f32) -> bool {
        let (row, col) = self.viewport.pixel_to_cell(x, y);
        if self.tools.tool != Tool::Fill && self.tools.brush == BrushSize::Single {
            self.erase_at(row, col)
        } else {
            self.brush_at(row, col, self.tools.brush, Ink::Erase)
        }
    }

    /// Paint the current stamp into one cell of the current layer.
    pub fn paint_at(&mut self, row: i32, col: i32) -> bool {
        let layer = self.tools.layer;
        let Some(change) = tools::paint_cell(&mut self.grid, layer, row, col, self.tools.stamp) else {
            return false;
        };
        self.record(HistoryEntry::single("Paint", change));
        self.redraw_cell(layer, change.row, change.col);
        true
    }

    pub fn erase_at(&mut self, row: i32, col: i32) -> bool {
        let layer = self.tools.layer;
        let Some(change) = tools::erase_cell(&mut self.grid, layer, row, col) else {
            return false;
        };
        self.record(HistoryEntry::single("Erase", change));
        self.redraw_cell(layer, change.row, change.col);
        true
    }

    /// Brush stroke centred on a cell. The batch is recorded even when it
    /// changed nothing.
    pub fn brush_at(&mut self, row: i32, col: i32, brush: BrushSize, ink: Ink) -> bool {
        let layer = self.tools.layer;
        let batch = tools::brush_stroke(&mut self.grid, layer, row, col, brush.radius(), ink);
        for change in batch.changes() {
            self.renderer
                .draw_cell(&self.grid, &self.assets, &self.viewport, layer, change.row, change.col);
        }
        let changed = !batch.is_empty();
        self.history.push(batch.into());
        if changed {
            self.is_dirty = true;
        }
        changed
    }

    pub fn fill_at(&mut self, row: i32, col: i32) -> bool {
        let layer = self.tools.layer;
        let Some(batch) = tools::flood_fill(&mut self.grid, layer, row, col, self.tools.stamp) else {
            return false;
        };
        self.record(batch.into());
        self.full_redraw();
        true
    }

    /// Eyedropper: copy the cell under the pointer into the stamp if its
    /// tile has a loaded asset.
    pub fn pick_at(&mut self, x: f32, y: f32) -> bool {
        let (row, col) = self.viewport.pixel_to_cell(x, y);
        match self.grid.get(self.tools.layer, row, col) {
            Some(cell) if self.assets.contains(cell.tile) => {
                self.tools.stamp = cell;
                true
            }
            _ => false,
        }
    }

    pub fn undo(&mut self) -> bool {
        match self.history.undo(&mut self.grid) {
            Some(redraw) => {
                self.apply_redraw(redraw);
                self.is_dirty = true;
                true
            }
            None => false,
        }
    }

    pub fn redo(&mut self) -> bool {
        match self.history.redo(&mut self.grid) {
            Some(redraw) => {
                self.apply_redraw(redraw);
                self.is_dirty = true;
                true
            }
            None => false,
        }
    }

    /// Wipe every layer, re-seed the floor and forget all history.
    pub fn clear_map(&mut self) {
        self.grid.fill(Cell::EMPTY);
        self.seed_floor();
        self.history.clear();
        self.is_dirty = true;
        self.full_redraw();
    }

    // ---- persistence --------------------------------------------------------

    pub fn save_project(&mut self, path: &Path) -> Result<(), ProjectError> {
        match io::save_project(&self.grid, &self.tile_dir, path) {
            Ok(()) => {
                log_info!("Saved project to {}", path.display());
                self.path = Some(path.to_path_buf());
                self.update_name_from_path();
                self.is_dirty = false;
                Ok(())
            }
            Err(e) => {
                log_err!("Error saving project {}: {}", path.display(), e);
                Err(e)
            }
        }
    }

    /// Load a project, cropping or padding it to the configured map size.
    /// On failure the current map, history and cache are untouched.
    pub fn load_project(&mut self, path: &Path) -> Result<(), ProjectError> {
        let loaded = match io::load_project(path, self.settings.map_width, self.settings.map_height) {
            Ok(loaded) => loaded,
            Err(e) => {
                log_err!("Error loading project {}: {}", path.display(), e);
                return Err(e);
            }
        };
        if loaded.was_resized() {
            log_warn!(
                "Project {} is {}x{}, fitted to {}x{}",
                path.display(),
                loaded.stored_size.0,
                loaded.stored_size.1,
                loaded.grid.width(),
                loaded.grid.height()
            );
        }

        self.grid = loaded.grid;
        self.renderer.resize(self.grid.width(), self.grid.height());
        self.renderer.invalidate_cache();

        if let Some(dir) = loaded.tile_dir
            && dir != self.tile_dir
            && dir.is_dir()
        {
            match TileAssets::load_dir(&dir, self.settings.tile_asset_size) {
                Ok((assets, _)) => {
                    self.assets = assets;
                    self.tile_dir = dir;
                }
                Err(e) => {
                    log_warn!("Keeping current tiles: {}", e);
                }
            }
        }

        self.history.clear();
        self.path = Some(path.to_path_buf());
        self.update_name_from_path();
        self.is_dirty = false;
        self.full_redraw();
        log_info!("Loaded project from {}", path.display());
        Ok(())
    }

    // ---- export -------------------------------------------------------------

    /// Full-resolution render of the map over the current background.
    pub fn export_image(&self) -> Result<RgbaImage, ProjectError> {
        io::export_image(&self.grid, &self.assets, self.background())
    }

    pub fn export_image_to(&self, path: &Path) -> Result<(), ProjectError> {
        let img = self.export_image()?;
        io::write_image(&img, path)?;
        log_info!("Map image exported to {}", path.display());
        Ok(())
    }

    pub fn export_block_list(&self) -> Option<String> {
        io::block_list_text(&self.grid, &self.assets)
    }

    /// Write the block list. Returns `Ok(false)` when the map is empty and
    /// nothing was written.
    pub fn export_block_list_to(&self, path: &Path) -> Result<bool, ProjectError> {
        let Some(text) = self.export_block_list() else {
            return Ok(false);
        };
        io::write_block_list(&text, path)?;
        Ok(true)
    }
}
