use image::RgbaImage;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::assets::TileAssets;
use crate::grid::{Cell, Grid, LayerId, NUM_LAYERS, Rotation, TileId};
use crate::ops::transform::{Interpolation, composite_over, resize, transform_tile};
use crate::settings::MAX_MAP_DIM;

// ============================================================================
// PROJECT FILE FORMAT (.map)
// ============================================================================

/// Magic header for the current format.
const MAP_MAGIC_V1: &str = "GMP1";
/// Legacy format: tile ids only, no rotation/mirror arrays.
const MAP_MAGIC_V0: &str = "GMP0";

/// Current on-disk layout. The three arrays are `layers × height × width`,
/// row-major per layer.
#[derive(Serialize, Deserialize)]
pub struct ProjectFileV1 {
    magic: String,
    width: u32,
    height: u32,
    layers: u32,
    /// Tile directory the map was authored against.
    tile_dir: String,
    tiles: Vec<TileId>,
    rotation: Vec<u8>,
    mirror: Vec<u8>,
}

#[derive(Serialize, Deserialize)]
struct ProjectFileV0 {
    magic: String,
    width: u32,
    height: u32,
    layers: u32,
    tiles: Vec<TileId>,
}

/// Error type for project and export file operations
#[derive(Debug)]
pub enum ProjectError {
    Io(std::io::Error),
    Serialize(String),
    InvalidFormat(String),
}

impl std::fmt::Display for ProjectError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProjectError::Io(e) => write!(f, "I/O error: {}", e),
            ProjectError::Serialize(e) => write!(f, "Serialization error: {}", e),
            ProjectError::InvalidFormat(e) => write!(f, "Invalid format: {}", e),
        }
    }
}

impl std::error::Error for ProjectError {}

impl From<std::io::Error> for ProjectError {
    fn from(e: std::io::Error) -> Self {
        ProjectError::Io(e)
    }
}

impl From<Box<bincode::ErrorKind>> for ProjectError {
    fn from(e: Box<bincode::ErrorKind>) -> Self {
        ProjectError::Serialize(e.to_string())
    }
}

impl From<image::ImageError> for ProjectError {
    fn from(e: image::ImageError) -> Self {
        match e {
            image::ImageError::IoError(io) => ProjectError::Io(io),
            other => ProjectError::Serialize(other.to_string()),
        }
    }
}

/// A project read back from disk, already fitted to the requested size.
pub struct LoadedProject {
    pub grid: Grid,
    pub tile_dir: Option<PathBuf>,
    /// Dimensions as stored in the file, before crop/pad.
    pub stored_size: (usize, usize),
}

impl LoadedProject {
    pub fn was_resized(&self) -> bool {
        self.stored_size != (self.grid.width(), self.grid.height())
    }
}

/// Build the serializable project data from a grid.
pub fn build_project(grid: &Grid, tile_dir: &Path) -> ProjectFileV1 {
    let count = NUM_LAYERS * grid.width() * grid.height();
    let mut tiles = Vec::with_capacity(count);
    let mut rotation = Vec::with_capacity(count);
    let mut mirror = Vec::with_capacity(count);

    for layer in LayerId::ALL {
        for cell in grid.layer_cells(layer) {
            tiles.push(cell.tile);
            rotation.push(cell.rotation.to_u8());
            mirror.push(cell.mirror as u8);
        }
    }

    ProjectFileV1 {
        magic: MAP_MAGIC_V1.to_string(),
        width: grid.width() as u32,
        height: grid.height() as u32,
        layers: NUM_LAYERS as u32,
        tile_dir: tile_dir.to_string_lossy().into_owned(),
        tiles,
        rotation,
        mirror,
    }
}

/// Save a grid as a `.map` project file.
///
/// Regular files are written to a sibling temp file and renamed over the
/// target, so a failed write leaves the previous project intact. Special
/// files (devices, pipes) are written in place.
pub fn save_project(grid: &Grid, tile_dir: &Path, path: &Path) -> Result<(), ProjectError> {
    let project = build_project(grid, tile_dir);

    let is_special = path.metadata().is_ok_and(|m| !m.is_file());
    if is_special {
        return write_project_file(&project, path, false);
    }

    let tmp = temp_sibling(path);
    let result = write_project_file(&project, &tmp, true)
        .and_then(|()| std::fs::rename(&tmp, path).map_err(ProjectError::from));
    if result.is_err() {
        let _ = std::fs::remove_file(&tmp);
    }
    result
}

fn write_project_file(project: &ProjectFileV1, path: &Path, sync: bool) -> Result<(), ProjectError> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    bincode::serialize_into(&mut writer, project).map_err(|e| match *e {
        bincode::ErrorKind::Io(io) => ProjectError::Io(io),
        other => ProjectError::Serialize(other.to_string()),
    })?;
    writer.flush()?;
    if sync {
        writer.get_ref().sync_all()?;
    }
    Ok(())
}

fn temp_sibling(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "project".to_string());
    path.with_file_name(format!(".{}.{}.tmp", name, uuid::Uuid::new_v4()))
}

/// Load a `.map` project file (v0 or v1) and fit it to
/// `target_width × target_height`, keeping the top-left overlap.
pub fn load_project(
    path: &Path,
    target_width: usize,
    target_height: usize,
) -> Result<LoadedProject, ProjectError> {
    let raw = std::fs::read(path)?;
    load_project_bytes(&raw, target_width, target_height)
}

pub fn load_project_bytes(
    raw: &[u8],
    target_width: usize,
    target_height: usize,
) -> Result<LoadedProject, ProjectError> {
    if raw.len() < 12 {
        return Err(ProjectError::InvalidFormat("File too small".into()));
    }

    // bincode encodes a String as: 8-byte length prefix + UTF-8 data.
    // Our magic strings are 4 chars, so bytes 8..12 hold the magic.
    let magic = std::str::from_utf8(&raw[8..12]).unwrap_or("");

    let (stored, tile_dir) = match magic {
        MAP_MAGIC_V1 => {
            let p: ProjectFileV1 = bincode::deserialize(raw)?;
            let tile_dir = (!p.tile_dir.is_empty()).then(|| PathBuf::from(&p.tile_dir));
            (decode_arrays(p.width, p.height, p.layers, &p.tiles, &p.rotation, &p.mirror)?, tile_dir)
        }
        MAP_MAGIC_V0 => {
            let p: ProjectFileV0 = bincode::deserialize(raw)?;
            (decode_arrays(p.width, p.height, p.layers, &p.tiles, &[], &[])?, None)
        }
        _ => {
            return Err(ProjectError::InvalidFormat(format!(
                "Unknown magic '{}'",
                magic
            )));
        }
    };

    let stored_size = (stored.width(), stored.height());
    let mut grid = stored;
    grid.resize(target_width, target_height);

    Ok(LoadedProject {
        grid,
        tile_dir,
        stored_size,
    })
}

/// Rebuild a grid from parallel arrays. Rotation or mirror arrays of the
/// wrong length are treated as absent (all zero).
fn decode_arrays(
    width: u32,
    height: u32,
    layers: u32,
    tiles: &[TileId],
    rotation: &[u8],
    mirror: &[u8],
) -> Result<Grid, ProjectError> {
    let (w, h, l) = (width as usize, height as usize, layers as usize);
    if w == 0 || h == 0 {
        return Err(ProjectError::InvalidFormat(
            "Map dimensions cannot be zero".into(),
        ));
    }
    if w > MAX_MAP_DIM || h > MAX_MAP_DIM {
        return Err(ProjectError::InvalidFormat(format!(
            "Map size {}x{} exceeds maximum allowed {}x{}",
            w, h, MAX_MAP_DIM, MAX_MAP_DIM
        )));
    }
    if l == 0 || l > 16 {
        return Err(ProjectError::InvalidFormat(format!(
            "Unsupported layer count {}",
            l
        )));
    }

    let count = l * w * h;
    if tiles.len() != count {
        return Err(ProjectError::InvalidFormat(format!(
            "Tile array has {} entries, expected {}",
            tiles.len(),
            count
        )));
    }
    let rotation = (rotation.len() == count).then_some(rotation);
    let mirror = (mirror.len() == count).then_some(mirror);

    let mut grid = Grid::new(w, h);
    for (li, layer) in LayerId::ALL.into_iter().enumerate().take(l) {
        let base = li * w * h;
        for i in 0..w * h {
            let idx = base + i;
            let cell = Cell::new(
                tiles[idx],
                Rotation::from_u8(rotation.map_or(0, |r| r[idx])),
                mirror.is_some_and(|m| m[idx] != 0),
            );
            grid.set(layer, (i / w) as i32, (i % w) as i32, cell);
        }
    }
    Ok(grid)
}

// ============================================================================
// IMAGE EXPORT
// ============================================================================

/// Composite the whole map at native asset resolution over `background`
/// (Lanczos-scaled to the same size). Without a background the tiles are
/// composited over transparency.
pub fn export_image(
    grid: &Grid,
    assets: &TileAssets,
    background: Option<&RgbaImage>,
) -> Result<RgbaImage, ProjectError> {
    let size = assets.asset_size();
    let (Some(px_w), Some(px_h)) = (
        export_extent(grid.width(), size),
        export_extent(grid.height(), size),
    ) else {
        return Err(ProjectError::InvalidFormat(format!(
            "Export of {}x{} cells at {}px exceeds the image size limit",
            grid.width(),
            grid.height(),
            size
        )));
    };

    // Render each distinct stamp once.
    let mut stamps: Vec<Cell> = LayerId::ALL
        .iter()
        .flat_map(|l| grid.layer_cells(*l).iter().copied())
        .filter(|c| !c.is_empty() && assets.contains(c.tile))
        .collect();
    stamps.sort_by_key(|c| (c.tile, c.rotation.to_u8(), c.mirror));
    stamps.dedup();
    let rendered: HashMap<Cell, RgbaImage> = stamps
        .par_iter()
        .map(|c| (*c, transform_tile(assets.lookup_by_id(c.tile), c.rotation, c.mirror, size)))
        .collect();

    let mut canvas = match background {
        Some(bg) if px_w > 0 && px_h > 0 => resize(bg, px_w, px_h, Interpolation::Lanczos3),
        _ => RgbaImage::new(px_w, px_h),
    };

    for layer in LayerId::ALL {
        for (row, col, cell) in grid.iter_layer(layer) {
            if let Some(tile) = rendered.get(&cell) {
                composite_over(
                    &mut canvas,
                    tile,
                    col as i64 * size as i64,
                    row as i64 * size as i64,
                );
            }
        }
    }
    Ok(canvas)
}

fn export_extent(cells: usize, size: u32) -> Option<u32> {
    u32::try_from(cells).ok()?.checked_mul(size)
}

/// Export the map and write it as an image (format from the extension).
pub fn write_image(img: &RgbaImage, path: &Path) -> Result<(), ProjectError> {
    img.save(path)?;
    Ok(())
}

// ============================================================================
// BLOCK LIST EXPORT
// ============================================================================

/// `(tile_id, count)` over both layers, most used first; ties by id.
pub fn block_counts(grid: &Grid) -> Vec<(TileId, usize)> {
    let mut counts: Vec<(TileId, usize)> = grid.tile_counts().into_iter().collect();
    counts.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    counts
}

/// Text listing every block used, or `None` for an empty map.
pub fn block_list_text(grid: &Grid, assets: &TileAssets) -> Option<String> {
    let counts = block_counts(grid);
    if counts.is_empty() {
        return None;
    }
    let mut lines = vec!["All the blocks used:\n".to_string()];
    for (id, count) in counts {
        lines.push(format!("{} - {}", count, assets.display_name(id)));
    }
    Some(lines.join("\n"))
}

pub fn write_block_list(text: &str, path: &Path) -> Result<(), ProjectError> {
    std::fs::write(path, text)?;
    Ok(())
}
