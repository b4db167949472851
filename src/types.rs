use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

use crate::error::{Error, Result};

// One object's bounding box in one frame, as read from the track log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Observation {
    pub track_id: i64,
    pub x_min: i64,
    pub y_min: i64,
    pub x_max: i64,
    pub y_max: i64,
    /// 1-based frame number
    pub frame_index: u32,
    pub lost: bool,
    pub occluded: bool,
    pub generated: bool,
    /// Label with the surrounding quote characters removed
    pub label: String,
}

/// The closed set of object classes annotated in the Stanford Drone Dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    Pedestrian,
    Biker,
    Cart,
    Skater,
    Bus,
    Car,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::Pedestrian,
        Category::Biker,
        Category::Cart,
        Category::Skater,
        Category::Bus,
        Category::Car,
    ];

    /// Resolve a label string, rejecting anything outside the closed set.
    pub fn from_label(label: &str) -> Result<Self> {
        match label {
            "Pedestrian" => Ok(Category::Pedestrian),
            "Biker" => Ok(Category::Biker),
            "Cart" => Ok(Category::Cart),
            "Skater" => Ok(Category::Skater),
            "Bus" => Ok(Category::Bus),
            "Car" => Ok(Category::Car),
            other => Err(Error::UnknownCategory(other.to_string())),
        }
    }

    /// Stable numeric id shared by the COCO and YOLO encodings.
    pub fn id(self) -> u32 {
        match self {
            Category::Pedestrian => 0,
            Category::Biker => 1,
            Category::Cart => 2,
            Category::Skater => 3,
            Category::Bus => 4,
            Category::Car => 5,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Category::Pedestrian => "Pedestrian",
            Category::Biker => "Biker",
            Category::Cart => "Cart",
            Category::Skater => "Skater",
            Category::Bus => "Bus",
            Category::Car => "Car",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Pixel size of every frame of one video, read from its first frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameDimensions {
    pub width: u32,
    pub height: u32,
    pub depth: u8,
}

// The three dataset splits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Split {
    Train,
    Val,
    Test,
}

impl Split {
    pub const ALL: [Split; 3] = [Split::Train, Split::Val, Split::Test];

    pub fn name(self) -> &'static str {
        match self {
            Split::Train => "train",
            Split::Val => "val",
            Split::Test => "test",
        }
    }

    /// Train and val frames are mirrored into the trainval manifest.
    pub fn in_trainval(self) -> bool {
        matches!(self, Split::Train | Split::Val)
    }
}

/// A `[train, val, test]` triple from the video plan: fractions for the ratio
/// policy, or a one-hot selector for the uniform policy.
pub type SplitRatio = [f64; 3];

// Paths to the output directories of a dataset
#[derive(Debug, Clone)]
pub struct OutputDirs {
    pub root: PathBuf,
    pub images_dir: PathBuf,
    pub manifest_dir: PathBuf,
    pub voc_dir: PathBuf,
    pub coco_dir: PathBuf,
    pub cache_dir: PathBuf,
    pub yolo_dir: PathBuf,
}

impl OutputDirs {
    pub fn new(root: PathBuf) -> Self {
        Self {
            images_dir: root.join("images"),
            manifest_dir: root.join("ImageSets").join("Main"),
            voc_dir: root.join("Annotations"),
            coco_dir: root.join("Annotations_json"),
            cache_dir: root.join("pickle_store"),
            yolo_dir: root.join("labels"),
            root,
        }
    }
}

// Counters reported at the end of a run
#[derive(Debug, Default, Clone)]
pub struct ProcessingStats {
    pub videos_annotated: usize,
    pub videos_skipped: usize,
    pub frames_annotated: usize,
    pub frames_assigned: usize,
}

impl ProcessingStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn print_summary(&self) {
        log::info!("=== Processing Summary ===");
        log::info!("Videos annotated: {}", self.videos_annotated);
        log::info!(
            "Videos skipped (already split into frames): {}",
            self.videos_skipped
        );
        log::info!("Frames annotated: {}", self.frames_annotated);
        log::info!("Frames assigned to a split: {}", self.frames_assigned);
    }
}
