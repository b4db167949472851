use indicatif::{ProgressBar, ProgressStyle};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Create a progress bar with the given length and label
pub fn create_progress_bar(len: u64, label: &str) -> ProgressBar {
    let pb = ProgressBar::new(len);
    let style = ProgressStyle::with_template(&format!(
        "{{spinner:.green}} [{}] [{{elapsed_precise}}] [{{bar:40.cyan/blue}}] {{pos}}/{{len}} ({{eta}})",
        label
    ))
    .unwrap_or_else(|_| ProgressStyle::default_bar())
    .progress_chars("#>-");
    pb.set_style(style);
    pb
}

/// Create a directory (and its parents) unless it already exists
pub fn ensure_directory(path: &Path) -> Result<PathBuf> {
    if !path.exists() {
        log::debug!("Creating directory {}", path.display());
        fs::create_dir_all(path).map_err(Error::io(path))?;
    }
    Ok(path.to_path_buf())
}

/// Thread pool used for writing per-frame files. Zero workers means one per core.
pub fn create_io_thread_pool(workers: usize) -> Result<rayon::ThreadPool> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .thread_name(|index| format!("sdd-writer-{}", index))
        .build()
        .map_err(|e| Error::Config(format!("failed to build worker pool: {}", e)))
}
