use std::path::{Path, PathBuf};

use crate::log_warn;

/// Persistent editor configuration, stored as `key=value` lines.
#[derive(Clone, Debug, PartialEq)]
pub struct EditorSettings {
    pub map_width: usize,
    pub map_height: usize,
    /// On-screen cell size at zoom 1.0
    pub base_tile_size: u32,
    /// Native square size of tile assets; also the export cell size
    pub tile_asset_size: u32,
    /// Maximum number of undo steps
    pub max_history: usize,
    pub min_zoom: f32,
    pub max_zoom: f32,
    /// Factor applied by zoom in / zoom out
    pub zoom_step: f32,
    pub tile_dir: PathBuf,
    pub background_dir: PathBuf,
    /// Tile seeded along the bottom of a fresh map (empty = none)
    pub floor_tile: String,
    pub floor_rows: usize,
    /// Grid-line overlay on the map canvas
    pub show_grid: bool,
}

impl Default for EditorSettings {
    fn default() -> Self {
        Self {
            map_width: 100,
            map_height: 60,
            base_tile_size: 16,
            tile_asset_size: 32,
            max_history: 100,
            min_zoom: 0.5,
            max_zoom: 4.0,
            zoom_step: 1.1,
            tile_dir: PathBuf::from("tiles"),
            background_dir: PathBuf::from("backgrounds"),
            floor_tile: "Bedrock".to_string(),
            floor_rows: 3,
            show_grid: true,
        }
    }
}

/// Largest accepted map edge, shared with the project loader.
pub const MAX_MAP_DIM: usize = 4096;

/// Largest accepted native tile size in pixels.
pub const MAX_TILE_ASSET_SIZE: u32 = 256;

impl EditorSettings {
    pub(crate) fn settings_path() -> Option<PathBuf> {
        #[cfg(target_os = "windows")]
        {
            let appdata = std::env::var("APPDATA")
                .or_else(|_| std::env::var("USERPROFILE"))
                .ok()?;
            let config_dir = PathBuf::from(appdata).join("GridPlanner");
            let _ = std::fs::create_dir_all(&config_dir);
            return Some(config_dir.join("gridplanner_settings.cfg"));
        }
        #[cfg(not(target_os = "windows"))]
        {
            let config_dir = std::env::var("XDG_CONFIG_HOME")
                .map(PathBuf::from)
                .or_else(|_| std::env::var("HOME").map(|h| PathBuf::from(h).join(".config")))
                .ok()?
                .join("gridplanner");
            let _ = std::fs::create_dir_all(&config_dir);
            Some(config_dir.join("gridplanner_settings.cfg"))
        }
    }

    /// Serialize to the `key=value` config format.
    pub fn to_config_string(&self) -> String {
        format!(
            "map_width={}\n\
             map_height={}\n\
             base_tile_size={}\n\
             tile_asset_size={}\n\
             max_history={}\n\
             min_zoom={}\n\
             max_zoom={}\n\
             zoom_step={}\n\
             tile_dir={}\n\
             background_dir={}\n\
             floor_tile={}\n\
             floor_rows={}\n\
             show_grid={}\n",
            self.map_width,
            self.map_height,
            self.base_tile_size,
            self.tile_asset_size,
            self.max_history,
            self.min_zoom,
            self.max_zoom,
            self.zoom_step,
            self.tile_dir.display(),
            self.background_dir.display(),
            self.floor_tile,
            self.floor_rows,
            self.show_grid,
        )
    }

    /// Parse config text. Unknown keys and bad values keep their defaults.
    pub fn from_config_str(content: &str) -> Self {
        let mut s = Self::default();
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, val)) = line.split_once('=') else {
                log_warn!("settings: ignoring malformed line '{}'", line);
                continue;
            };
            let key = key.trim();
            let val = val.trim();
            match key {
                "map_width" => parse_into(&mut s.map_width, key, val, |v| (1..=MAX_MAP_DIM).contains(v)),
                "map_height" => parse_into(&mut s.map_height, key, val, |v| (1..=MAX_MAP_DIM).contains(v)),
                "base_tile_size" => parse_into(&mut s.base_tile_size, key, val, |v| *v > 0),
                "tile_asset_size" => parse_into(&mut s.tile_asset_size, key, val, |v| {
                    (1..=MAX_TILE_ASSET_SIZE).contains(v)
                }),
                "max_history" => parse_into(&mut s.max_history, key, val, |v| *v > 0),
                "min_zoom" => parse_into(&mut s.min_zoom, key, val, |v: &f32| *v > 0.0),
                "max_zoom" => parse_into(&mut s.max_zoom, key, val, |v: &f32| *v > 0.0),
                "zoom_step" => parse_into(&mut s.zoom_step, key, val, |v: &f32| *v > 1.0),
                "tile_dir" => s.tile_dir = PathBuf::from(val),
                "background_dir" => s.background_dir = PathBuf::from(val),
                "floor_tile" => s.floor_tile = val.to_string(),
                "floor_rows" => parse_into(&mut s.floor_rows, key, val, |_| true),
                "show_grid" => parse_into(&mut s.show_grid, key, val, |_| true),
                _ => {}
            }
        }
        if s.min_zoom > s.max_zoom {
            std::mem::swap(&mut s.min_zoom, &mut s.max_zoom);
        }
        s
    }

    pub fn load_from(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => Self::from_config_str(&content),
            Err(_) => Self::default(),
        }
    }

    pub fn save_to(&self, path: &Path) -> std::io::Result<()> {
        std::fs::write(path, self.to_config_string())
    }

    /// Load settings from disk (returns default if file missing or corrupt)
    pub fn load() -> Self {
        match Self::settings_path() {
            Some(path) => Self::load_from(&path),
            None => Self::default(),
        }
    }
}

fn parse_into<T: std::str::FromStr>(slot: &mut T, key: &str, val: &str, valid: impl Fn(&T) -> bool) {
    match val.parse::<T>() {
        Ok(v) if valid(&v) => *slot = v,
        _ => {
            log_warn!("settings: ignoring invalid value '{}' for {}", val, key);
        }
    }
}
