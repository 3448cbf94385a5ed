// ============================================================================
// VIEWPORT — pixel ↔ cell mapping, zoom level and pan offset
// ============================================================================

/// Screen-space mapping for the map canvas.
///
/// Grid coordinates never depend on zoom; only the per-cell pixel size does.
#[derive(Clone, Debug, PartialEq)]
pub struct Viewport {
    base_size: f32,
    zoom: f32,
    min_zoom: f32,
    max_zoom: f32,
    /// Scroll position of the canvas origin, in screen pixels.
    pan: (f32, f32),
}

impl Viewport {
    pub fn new(base_size: u32, min_zoom: f32, max_zoom: f32) -> Self {
        let (min_zoom, max_zoom) = if min_zoom <= max_zoom {
            (min_zoom, max_zoom)
        } else {
            (max_zoom, min_zoom)
        };
        Self {
            base_size: base_size.max(1) as f32,
            zoom: 1.0_f32.clamp(min_zoom, max_zoom),
            min_zoom,
            max_zoom,
            pan: (0.0, 0.0),
        }
    }

    pub fn zoom_level(&self) -> f32 {
        self.zoom
    }

    /// Exact (fractional) size of one cell on screen.
    pub fn cell_size(&self) -> f32 {
        self.base_size * self.zoom
    }

    /// Integer pixel size tiles are rendered at. Never below 1.
    pub fn pixel_size(&self) -> u32 {
        (self.cell_size() as u32).max(1)
    }

    /// Multiply the zoom level, clamped to the configured range.
    /// Returns `true` when the level actually changed, meaning the render
    /// cache is stale and the map needs a full redraw.
    pub fn zoom(&mut self, factor: f32) -> bool {
        if !factor.is_finite() || factor <= 0.0 {
            return false;
        }
        let new_zoom = (self.zoom * factor).clamp(self.min_zoom, self.max_zoom);
        if (new_zoom - self.zoom).abs() < f32::EPSILON {
            return false;
        }
        self.zoom = new_zoom;
        true
    }

    pub fn reset_zoom(&mut self) -> bool {
        let target = 1.0_f32.clamp(self.min_zoom, self.max_zoom);
        let changed = (target - self.zoom).abs() >= f32::EPSILON;
        self.zoom = target;
        changed
    }

    pub fn pan(&self) -> (f32, f32) {
        self.pan
    }

    pub fn pan_by(&mut self, dx: f32, dy: f32) {
        self.pan.0 += dx;
        self.pan.1 += dy;
    }

    pub fn set_pan(&mut self, x: f32, y: f32) {
        self.pan = (x, y);
    }

    /// Map a pointer position (widget pixels) to `(row, col)`. The result may
    /// lie outside the grid; callers treat that as a no-op.
    pub fn pixel_to_cell(&self, x: f32, y: f32) -> (i32, i32) {
        let size = self.cell_size();
        let cx = x + self.pan.0;
        let cy = y + self.pan.1;
        ((cy / size).floor() as i32, (cx / size).floor() as i32)
    }

    /// Top-left canvas pixel of a cell (ignores pan; the surface scrolls).
    pub fn cell_origin(&self, row: usize, col: usize) -> (u32, u32) {
        let size = self.cell_size();
        ((col as f32 * size) as u32, (row as f32 * size) as u32)
    }

    /// Canvas extent for a `width × height` map at the current zoom.
    pub fn map_pixel_size(&self, width: usize, height: usize) -> (u32, u32) {
        let size = self.cell_size();
        ((width as f32 * size) as u32, (height as f32 * size) as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pixel_to_cell_at_base_zoom() {
        let vp = Viewport::new(16, 0.5, 4.0);
        assert_eq!(vp.pixel_to_cell(0.0, 0.0), (0, 0));
        assert_eq!(vp.pixel_to_cell(15.9, 15.9), (0, 0));
        assert_eq!(vp.pixel_to_cell(16.0, 40.0), (2, 1));
        assert_eq!(vp.pixel_to_cell(-1.0, 5.0), (0, -1));
    }

    #[test]
    fn test_zoom_changes_mapping_not_coordinates() {
        let mut vp = Viewport::new(16, 0.5, 4.0);
        assert!(vp.zoom(2.0));
        assert_eq!(vp.pixel_size(), 32);
        assert_eq!(vp.pixel_to_cell(40.0, 70.0), (2, 1));
        assert_eq!(vp.cell_origin(2, 1), (32, 64));
        assert_eq!(vp.map_pixel_size(100, 60), (3200, 1920));
    }

    #[test]
    fn test_zoom_is_clamped() {
        let mut vp = Viewport::new(16, 0.5, 4.0);
        assert!(vp.zoom(10.0));
        assert_eq!(vp.zoom_level(), 4.0);
        assert!(!vp.zoom(1.1));
        assert!(vp.zoom(0.01));
        assert_eq!(vp.zoom_level(), 0.5);
        assert_eq!(vp.pixel_size(), 8);
        assert!(!vp.zoom(0.0));
        assert!(vp.reset_zoom());
        assert_eq!(vp.zoom_level(), 1.0);
    }

    #[test]
    fn test_pan_offsets_pointer() {
        let mut vp = Viewport::new(16, 0.5, 4.0);
        vp.pan_by(32.0, 16.0);
        assert_eq!(vp.pixel_to_cell(0.0, 0.0), (1, 2));
        vp.set_pan(0.0, 0.0);
        assert_eq!(vp.pixel_to_cell(0.0, 0.0), (0, 0));
    }
}
