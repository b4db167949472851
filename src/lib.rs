//! Stanford Drone Dataset to detection dataset converter
//!
//! This library turns a per-frame object track log into Pascal VOC XML,
//! COCO JSON and YOLO label annotations, and assigns frames to
//! train/val/test manifests.

pub mod cache;
pub mod coco;
pub mod config;
pub mod error;
pub mod extract;
pub mod io;
pub mod pipeline;
pub mod split;
pub mod track_table;
pub mod types;
pub mod utils;
pub mod voc;
pub mod yolo;

// Re-export commonly used types and functions
pub use cache::{FileCache, MemoryCache, TableCache};
pub use config::{Args, VideoPlan};
pub use error::{Error, Result};
pub use extract::{FfmpegExtractor, FrameExtractor};
pub use pipeline::process_dataset;
pub use split::SplitManifest;
pub use track_table::TrackTable;
pub use types::{Category, FrameDimensions, Observation, Split};
