// ============================================================================
// GridPlanner CLI — headless export of map projects
// ============================================================================
//
// Usage examples:
//   gridplanner --input castle.map --image
//   gridplanner -i maps/*.map --list --output-dir out/
//   gridplanner -i base.map --tiles assets/tiles --background sky.png --image --list
//   gridplanner -i small.map --width 40 --height 20 --image
//
// No window is opened. Each input is loaded, fitted to the map size and
// written as `<stem>.png` and/or `<stem>.txt`.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use clap::Parser;

use crate::assets::TileAssets;
use crate::io;
use crate::settings::{EditorSettings, MAX_MAP_DIM};
use crate::{log_info, log_warn};

// ============================================================================
// CLI argument definition (clap Derive)
// ============================================================================

/// GridPlanner headless map exporter.
#[derive(Parser, Debug)]
#[command(
    name = "gridplanner",
    about = "GridPlanner headless map exporter",
    long_about = "Render tile-map projects to PNG images and count the blocks they\n\
                  use, without opening the editor.\n\n\
                  Example:\n  \
                  gridplanner --input castle.map --image --list\n  \
                  gridplanner -i maps/*.map --image --output-dir out/"
)]
pub struct CliArgs {
    /// Project file(s). Glob patterns accepted (e.g. "maps/*.map").
    #[arg(short, long, required = true, num_args = 1..)]
    pub input: Vec<String>,

    /// Tile asset directory. Defaults to the directory stored in each
    /// project, then to the configured tile directory.
    #[arg(short, long, value_name = "DIR")]
    pub tiles: Option<PathBuf>,

    /// Background image drawn beneath the tiles in exported images.
    #[arg(short, long, value_name = "FILE")]
    pub background: Option<PathBuf>,

    /// Write a PNG render of each map.
    #[arg(long)]
    pub image: bool,

    /// Write a block-list text file for each map.
    #[arg(long)]
    pub list: bool,

    /// Output directory. Files are written next to the input when omitted.
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Map width in cells; larger projects are cropped, smaller ones padded.
    #[arg(long, value_name = "CELLS")]
    pub width: Option<usize>,

    /// Map height in cells.
    #[arg(long, value_name = "CELLS")]
    pub height: Option<usize>,

    /// Print per-file timing and asset warnings.
    #[arg(short, long)]
    pub verbose: bool,
}

// ============================================================================
// Public entry point
// ============================================================================

/// Run all CLI processing and return an OS exit code.
/// `0` = all files succeeded, `1` = one or more files failed.
pub fn run(args: CliArgs, settings: &EditorSettings) -> ExitCode {
    if !args.image && !args.list {
        eprintln!("error: nothing to do; pass --image and/or --list.");
        return ExitCode::FAILURE;
    }

    let width = args.width.unwrap_or(settings.map_width);
    let height = args.height.unwrap_or(settings.map_height);
    if width == 0 || height == 0 || width > MAX_MAP_DIM || height > MAX_MAP_DIM {
        eprintln!(
            "error: map size {}x{} is out of range (1..={} per axis).",
            width, height, MAX_MAP_DIM
        );
        return ExitCode::FAILURE;
    }

    let inputs = resolve_inputs(&args.input);
    if inputs.is_empty() {
        eprintln!("error: no input files matched the given pattern(s).");
        return ExitCode::FAILURE;
    }

    let background = match &args.background {
        Some(path) => match image::open(path) {
            Ok(img) => Some(img.into_rgba8()),
            Err(e) => {
                eprintln!("error: could not read background '{}': {}", path.display(), e);
                return ExitCode::FAILURE;
            }
        },
        None => None,
    };

    if let Some(dir) = &args.output_dir
        && let Err(e) = std::fs::create_dir_all(dir)
    {
        eprintln!(
            "error: could not create output directory '{}': {}",
            dir.display(),
            e
        );
        return ExitCode::FAILURE;
    }

    let job = Job {
        tiles: args.tiles.as_deref(),
        fallback_tiles: &settings.tile_dir,
        asset_size: settings.tile_asset_size,
        background: background.as_ref(),
        image: args.image,
        list: args.list,
        output_dir: args.output_dir.as_deref(),
        width,
        height,
        verbose: args.verbose,
    };

    let total = inputs.len();
    let multi = total > 1;
    let mut any_failure = false;

    for (idx, input_path) in inputs.iter().enumerate() {
        if multi || args.verbose {
            println!("[{}/{}] {}", idx + 1, total, input_path.display());
        }
        let file_start = Instant::now();

        match run_one(input_path, &job) {
            Ok(written) => {
                for path in &written {
                    println!("  → {}", path.display());
                }
                if args.verbose {
                    println!(
                        "  done in {:.0}ms",
                        file_start.elapsed().as_secs_f64() * 1000.0
                    );
                }
            }
            Err(e) => {
                eprintln!("  error: {}", e);
                any_failure = true;
            }
        }
    }

    if any_failure { ExitCode::FAILURE } else { ExitCode::SUCCESS }
}

// ============================================================================
// Per-file processing pipeline
// ============================================================================

struct Job<'a> {
    tiles: Option<&'a Path>,
    fallback_tiles: &'a Path,
    asset_size: u32,
    background: Option<&'a image::RgbaImage>,
    image: bool,
    list: bool,
    output_dir: Option<&'a Path>,
    width: usize,
    height: usize,
    verbose: bool,
}

fn run_one(input: &Path, job: &Job<'_>) -> Result<Vec<PathBuf>, String> {
    // -- Step 1: Load ----------------------------------------------------
    let loaded = io::load_project(input, job.width, job.height)
        .map_err(|e| format!("load failed: {}", e))?;
    if loaded.was_resized() && job.verbose {
        println!(
            "  fitted {}x{} → {}x{}",
            loaded.stored_size.0, loaded.stored_size.1, job.width, job.height
        );
    }

    // -- Step 2: Tiles ---------------------------------------------------
    let tile_dir = job
        .tiles
        .map(Path::to_path_buf)
        .or_else(|| loaded.tile_dir.clone().filter(|d| d.is_dir()))
        .unwrap_or_else(|| job.fallback_tiles.to_path_buf());
    let (assets, report) = TileAssets::load_dir(&tile_dir, job.asset_size)
        .map_err(|e| format!("tiles: {}", e))?;
    if job.verbose {
        for failure in &report.failures {
            println!("  [tiles] skipped {}: {}", failure.path.display(), failure.reason);
        }
    }

    // -- Step 3: Write ---------------------------------------------------
    let mut written = Vec::new();
    if job.image {
        let out = build_output_path(input, job.output_dir, "png")
            .ok_or_else(|| "cannot determine image output path".to_string())?;
        let img = io::export_image(&loaded.grid, &assets, job.background)
            .map_err(|e| format!("image export failed: {}", e))?;
        io::write_image(&img, &out).map_err(|e| format!("image export failed: {}", e))?;
        log_info!("CLI: exported {}", out.display());
        written.push(out);
    }
    if job.list {
        match io::block_list_text(&loaded.grid, &assets) {
            Some(text) => {
                let out = build_output_path(input, job.output_dir, "txt")
                    .ok_or_else(|| "cannot determine list output path".to_string())?;
                io::write_block_list(&text, &out)
                    .map_err(|e| format!("block list export failed: {}", e))?;
                written.push(out);
            }
            None => {
                log_warn!("CLI: {} has no blocks, list skipped", input.display());
                println!("  (map is empty, no block list written)");
            }
        }
    }
    Ok(written)
}

// ============================================================================
// Helpers
// ============================================================================

/// Expand glob patterns and literal paths into a deduplicated, ordered list.
fn resolve_inputs(patterns: &[String]) -> Vec<PathBuf> {
    let mut result: Vec<PathBuf> = Vec::new();

    for pattern in patterns {
        let as_path = Path::new(pattern);

        if as_path.exists() {
            if !result.iter().any(|p| p.as_path() == as_path) {
                result.push(as_path.to_path_buf());
            }
            continue;
        }

        match glob::glob(pattern) {
            Ok(entries) => {
                let mut matched = false;
                for entry in entries.flatten() {
                    if !result.contains(&entry) {
                        result.push(entry);
                    }
                    matched = true;
                }
                if !matched {
                    eprintln!("warning: pattern '{}' matched no files.", pattern);
                }
            }
            Err(e) => {
                eprintln!("warning: invalid glob '{}': {}", pattern, e);
            }
        }
    }

    result
}

/// Output path for one input: `<output_dir>/<stem>.<ext>`, or next to the
/// input when no directory is given.
fn build_output_path(input: &Path, output_dir: Option<&Path>, ext: &str) -> Option<PathBuf> {
    let stem = input.file_stem()?.to_string_lossy().into_owned();
    let file_name = format!("{}.{}", stem, ext);
    match output_dir {
        Some(dir) => Some(dir.join(file_name)),
        None => Some(input.parent().unwrap_or(Path::new(".")).join(file_name)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_path_next_to_input() {
        let out = build_output_path(Path::new("maps/castle.map"), None, "png");
        assert_eq!(out, Some(PathBuf::from("maps/castle.png")));
    }

    #[test]
    fn test_output_path_in_output_dir() {
        let out = build_output_path(Path::new("maps/castle.map"), Some(Path::new("out")), "txt");
        assert_eq!(out, Some(PathBuf::from("out/castle.txt")));
    }

    #[test]
    fn test_resolve_inputs_dedups_literal_paths() {
        let path = std::env::temp_dir().join(format!("gp-cli-{}.map", uuid::Uuid::new_v4()));
        std::fs::write(&path, b"x").unwrap();
        let p = path.to_string_lossy().to_string();
        let inputs = resolve_inputs(&[p.clone(), p]);
        assert_eq!(inputs, vec![path.clone()]);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_args_parse() {
        let args = CliArgs::try_parse_from([
            "gridplanner", "-i", "a.map", "b.map", "--image", "--width", "40", "-v",
        ])
        .unwrap();
        assert_eq!(args.input, vec!["a.map", "b.map"]);
        assert!(args.image && !args.list && args.verbose);
        assert_eq!(args.width, Some(40));
        assert_eq!(args.height, None);
    }
}
