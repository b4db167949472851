use glob::{glob, Pattern};
use image::GenericImageView;
use log::info;
use std::path::Path;

use crate::error::{Error, Result};
use crate::types::{FrameDimensions, OutputDirs};
use crate::utils::ensure_directory;

/// Set up the directory structure for the dataset output. Existing
/// directories and their contents are kept.
pub fn setup_output_directories(root: &Path) -> Result<OutputDirs> {
    let dirs = OutputDirs::new(root.to_path_buf());
    if !root.exists() {
        info!("Creating dataset layout under {}", root.display());
    }
    for dir in [
        &dirs.images_dir,
        &dirs.manifest_dir,
        &dirs.voc_dir,
        &dirs.coco_dir,
        &dirs.cache_dir,
        &dirs.yolo_dir,
    ] {
        ensure_directory(dir)?;
    }
    Ok(dirs)
}

/// Fail with a `NotFound` I/O error unless `path` exists.
pub fn require_path(path: &Path, message: &str) -> Result<()> {
    if path.exists() {
        Ok(())
    } else {
        Err(Error::not_found(path, message))
    }
}

/// Count the regular files in `dir` whose names start with `prefix`.
pub fn count_files(dir: &Path, prefix: &str) -> Result<usize> {
    require_path(dir, "directory not found")?;
    let pattern = format!(
        "{}/{}*",
        Pattern::escape(&dir.to_string_lossy()),
        Pattern::escape(prefix)
    );
    let entries = glob(&pattern)
        .map_err(|e| Error::Config(format!("invalid file pattern {}: {}", pattern, e)))?;
    Ok(entries
        .filter_map(|entry| entry.ok())
        .filter(|path| path.is_file())
        .count())
}

/// Frames are decoded as 3-channel color regardless of how they are stored
pub const FRAME_DEPTH: u8 = 3;

/// Read width and height from a decoded frame image. Grayscale and alpha
/// frames are treated as color, so the depth is always `FRAME_DEPTH`.
pub fn read_frame_dimensions(image_path: &Path) -> Result<FrameDimensions> {
    require_path(image_path, "cannot find the extracted frame images")?;
    let image = image::open(image_path).map_err(|source| Error::Image {
        path: image_path.to_path_buf(),
        source,
    })?;
    let (width, height) = image.dimensions();
    Ok(FrameDimensions {
        width,
        height,
        depth: FRAME_DEPTH,
    })
}
