use image::RgbaImage;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::grid::{EMPTY_TILE, TileId};
use crate::ops::transform::{Interpolation, resize};
use crate::{log_info, log_warn};

// ============================================================================
// ERRORS / LOAD REPORTS
// ============================================================================

/// Failure that aborts loading a whole asset directory.
#[derive(Debug)]
pub enum AssetError {
    MissingDirectory(PathBuf),
    InvalidPattern(String),
}

impl fmt::Display for AssetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetError::MissingDirectory(p) => write!(f, "Directory '{}' not found", p.display()),
            AssetError::InvalidPattern(e) => write!(f, "Invalid asset pattern: {}", e),
        }
    }
}

impl std::error::Error for AssetError {}

/// A single file that could not be decoded. Loading carries on without it.
#[derive(Debug, Clone)]
pub struct AssetLoadFailure {
    pub path: PathBuf,
    pub reason: String,
}

/// Outcome of a directory load, for the UI layer to surface.
#[derive(Debug, Clone, Default)]
pub struct AssetLoadReport {
    pub loaded: usize,
    pub failures: Vec<AssetLoadFailure>,
}

impl AssetLoadReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Sorted list of files in `dir` matching `pattern` (e.g. `"*.png"`).
fn list_files(dir: &Path, pattern: &str) -> Result<Vec<PathBuf>, AssetError> {
    if !dir.is_dir() {
        return Err(AssetError::MissingDirectory(dir.to_path_buf()));
    }
    let full = dir.join(pattern);
    let entries = glob::glob(&full.to_string_lossy())
        .map_err(|e| AssetError::InvalidPattern(e.to_string()))?;
    let mut files: Vec<PathBuf> = entries.flatten().filter(|p| p.is_file()).collect();
    files.sort();
    Ok(files)
}

// ============================================================================
// TILE ASSET TABLE
// ============================================================================

#[derive(Clone)]
pub struct TileAsset {
    pub name: String,
    pub image: RgbaImage,
}

/// `tile_id → base image` plus `name → tile_id`.
///
/// Ids are 1-based positions in load order. A file that failed to decode
/// still consumes its id, leaving a hole that renders as empty.
#[derive(Clone)]
pub struct TileAssets {
    asset_size: u32,
    tiles: Vec<Option<TileAsset>>,
    name_to_id: HashMap<String, TileId>,
}

impl TileAssets {
    pub fn new(asset_size: u32) -> Self {
        Self {
            asset_size,
            tiles: Vec::new(),
            name_to_id: HashMap::new(),
        }
    }

    /// Build a table from in-memory images; ids follow the given order.
    pub fn from_named_images(asset_size: u32, images: Vec<(String, RgbaImage)>) -> Self {
        let mut table = Self::new(asset_size);
        let total = images.len();
        for (name, img) in images {
            if table.push(Some((name, img))).is_none() {
                log_warn!("Tile id space exhausted, {} images ignored", total - table.tiles.len());
                break;
            }
        }
        table
    }

    /// Id the next tile would get; `None` once every `TileId` is taken.
    fn next_id(&self) -> Option<TileId> {
        TileId::try_from(self.tiles.len() + 1).ok()
    }

    fn push(&mut self, entry: Option<(String, RgbaImage)>) -> Option<TileId> {
        let id = self.next_id()?;
        let slot = entry.map(|(name, img)| {
            let image = if img.dimensions() != (self.asset_size, self.asset_size) {
                resize(&img, self.asset_size, self.asset_size, Interpolation::Nearest)
            } else {
                img
            };
            self.name_to_id.insert(name.clone(), id);
            TileAsset { name, image }
        });
        self.tiles.push(slot);
        Some(id)
    }

    /// Load every `*.png` in `dir`, sorted by file name. Undecodable files
    /// are logged, reported and skipped.
    pub fn load_dir(dir: &Path, asset_size: u32) -> Result<(Self, AssetLoadReport), AssetError> {
        let files = list_files(dir, "*.png")?;
        let mut table = Self::new(asset_size);
        let mut report = AssetLoadReport::default();
        table.load_files(files, &mut report);

        log_info!(
            "Loaded {} tile assets from {} ({} failed)",
            report.loaded,
            dir.display(),
            report.failures.len()
        );
        Ok((table, report))
    }

    /// Append `files` in order. Once the id space is full every remaining
    /// file is reported as a failure.
    fn load_files(&mut self, files: Vec<PathBuf>, report: &mut AssetLoadReport) {
        let mut files = files.into_iter();
        while let Some(path) = files.next() {
            if self.next_id().is_none() {
                log_warn!("Tile id limit reached at {}", path.display());
                for path in std::iter::once(path).chain(files) {
                    report.failures.push(AssetLoadFailure {
                        path,
                        reason: format!("tile id limit ({}) reached", TileId::MAX),
                    });
                }
                return;
            }
            let name = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            match image::open(&path) {
                Ok(img) => {
                    self.push(Some((name, img.into_rgba8())));
                    report.loaded += 1;
                }
                Err(e) => {
                    log_warn!("Error loading tile {}: {}", path.display(), e);
                    self.push(None);
                    report.failures.push(AssetLoadFailure {
                        path,
                        reason: e.to_string(),
                    });
                }
            }
        }
    }

    pub fn asset_size(&self) -> u32 {
        self.asset_size
    }

    pub fn len(&self) -> usize {
        self.tiles.iter().filter(|t| t.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn entry(&self, id: TileId) -> Option<&TileAsset> {
        if id == EMPTY_TILE {
            return None;
        }
        self.tiles.get(id as usize - 1).and_then(Option::as_ref)
    }

    pub fn lookup_by_id(&self, id: TileId) -> Option<&RgbaImage> {
        self.entry(id).map(|t| &t.image)
    }

    pub fn lookup_by_name(&self, name: &str) -> Option<TileId> {
        self.name_to_id.get(name).copied()
    }

    pub fn contains(&self, id: TileId) -> bool {
        self.entry(id).is_some()
    }

    /// Every valid id, ascending.
    pub fn all_ids(&self) -> Vec<TileId> {
        self.tiles
            .iter()
            .enumerate()
            .filter(|(_, t)| t.is_some())
            .map(|(i, _)| (i + 1) as TileId)
            .collect()
    }

    pub fn name(&self, id: TileId) -> Option<&str> {
        self.entry(id).map(|t| t.name.as_str())
    }

    /// Label used by the tile selector.
    pub fn tile_name(&self, id: TileId) -> String {
        if id == EMPTY_TILE {
            return "Eraser/Empty".to_string();
        }
        match self.name(id) {
            Some(n) => n.to_string(),
            None => format!("Tile #{}", id),
        }
    }

    /// Human-readable name for exports: `dirt_block` → `Dirt Block`.
    pub fn display_name(&self, id: TileId) -> String {
        match self.name(id) {
            Some(n) => title_case(&n.replace('_', " ")),
            None => format!("Unknown Tile {}", id),
        }
    }

    /// Ids whose name contains `query` (case-insensitive), ascending.
    /// A blank query returns every id.
    pub fn search(&self, query: &str) -> Vec<TileId> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return self.all_ids();
        }
        let mut ids: Vec<TileId> = self
            .name_to_id
            .iter()
            .filter(|(name, _)| name.to_lowercase().contains(&needle))
            .map(|(_, id)| *id)
            .collect();
        ids.sort_unstable();
        ids
    }
}

/// Upper-case the first letter of every alphabetic run, lower-case the rest.
fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_alpha = false;
    for ch in s.chars() {
        if ch.is_alphabetic() {
            if prev_alpha {
                out.extend(ch.to_lowercase());
            } else {
                out.extend(ch.to_uppercase());
            }
            prev_alpha = true;
        } else {
            out.push(ch);
            prev_alpha = false;
        }
    }
    out
}

// ============================================================================
// BACKGROUNDS
// ============================================================================

/// Load every decodable image in `dir`, sorted by file name.
pub fn load_backgrounds(dir: &Path) -> Result<(Vec<RgbaImage>, AssetLoadReport), AssetError> {
    let files = list_files(dir, "*")?;
    let mut images = Vec::with_capacity(files.len());
    let mut report = AssetLoadReport::default();

    for path in files {
        match image::open(&path) {
            Ok(img) => {
                images.push(img.into_rgba8());
                report.loaded += 1;
            }
            Err(e) => {
                log_warn!("Skipping background {}: {}", path.display(), e);
                report.failures.push(AssetLoadFailure {
                    path,
                    reason: e.to_string(),
                });
            }
        }
    }
    Ok((images, report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn solid(size: u32, v: u8) -> RgbaImage {
        RgbaImage::from_pixel(size, size, Rgba([v, v, v, 255]))
    }

    fn sample() -> TileAssets {
        TileAssets::from_named_images(
            4,
            vec![
                ("Bedrock".to_string(), solid(4, 10)),
                ("dirt_block".to_string(), solid(4, 20)),
                ("oak_log".to_string(), solid(8, 30)),
            ],
        )
    }

    #[test]
    fn test_ids_and_names_are_bijective() {
        let assets = sample();
        assert_eq!(assets.all_ids(), vec![1, 2, 3]);
        for id in assets.all_ids() {
            let name = assets.name(id).unwrap();
            assert_eq!(assets.lookup_by_name(name), Some(id));
        }
        assert!(assets.lookup_by_id(0).is_none());
        assert!(assets.lookup_by_id(4).is_none());
    }

    #[test]
    fn test_oversized_asset_is_normalised() {
        let assets = sample();
        assert_eq!(assets.lookup_by_id(3).unwrap().dimensions(), (4, 4));
    }

    #[test]
    fn test_names_for_display() {
        let assets = sample();
        assert_eq!(assets.tile_name(0), "Eraser/Empty");
        assert_eq!(assets.tile_name(2), "dirt_block");
        assert_eq!(assets.tile_name(9), "Tile #9");
        assert_eq!(assets.display_name(2), "Dirt Block");
        assert_eq!(assets.display_name(9), "Unknown Tile 9");
    }

    #[test]
    fn test_search_is_case_insensitive() {
        let assets = sample();
        assert_eq!(assets.search("  "), vec![1, 2, 3]);
        assert_eq!(assets.search("O"), vec![1, 2, 3]);
        assert_eq!(assets.search("LOG"), vec![3]);
        assert!(assets.search("glass").is_empty());
    }

    #[test]
    fn test_missing_directory_is_an_error() {
        let dir = std::env::temp_dir().join(format!("gp-missing-{}", uuid::Uuid::new_v4()));
        assert!(matches!(
            TileAssets::load_dir(&dir, 32),
            Err(AssetError::MissingDirectory(_))
        ));
    }

    #[test]
    fn test_load_dir_skips_broken_files() {
        let dir = std::env::temp_dir().join(format!("gp-tiles-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        solid(2, 50).save(dir.join("a_stone.png")).unwrap();
        std::fs::write(dir.join("b_broken.png"), b"not a png").unwrap();
        solid(4, 90).save(dir.join("c_sand.png")).unwrap();
        std::fs::write(dir.join("notes.txt"), b"ignored").unwrap();

        let (assets, report) = TileAssets::load_dir(&dir, 4).unwrap();
        assert_eq!(report.loaded, 2);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(assets.all_ids(), vec![1, 3]);
        assert_eq!(assets.lookup_by_name("c_sand"), Some(3));
        assert_eq!(assets.lookup_by_id(1).unwrap().dimensions(), (4, 4));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_ids_stop_at_tile_id_max() {
        let mut assets = TileAssets::new(1);
        assets.tiles = vec![None; TileId::MAX as usize - 1];
        assert_eq!(assets.push(Some(("last".to_string(), solid(1, 1)))), Some(TileId::MAX));
        assert_eq!(assets.push(Some(("overflow".to_string(), solid(1, 2)))), None);
        assert_eq!(assets.lookup_by_name("last"), Some(TileId::MAX));
        assert_eq!(assets.lookup_by_name("overflow"), None);

        let mut report = AssetLoadReport::default();
        assets.load_files(vec![PathBuf::from("x.png"), PathBuf::from("y.png")], &mut report);
        assert_eq!(report.loaded, 0);
        assert_eq!(report.failures.len(), 2);
        assert_eq!(assets.tiles.len(), TileId::MAX as usize);
    }
}
