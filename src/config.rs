use clap::Parser;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::types::SplitRatio;

/// Command-line arguments for converting Stanford Drone Dataset videos into a detection dataset.
#[derive(Parser, Debug, Clone)]
#[command(version, long_about = None)]
pub struct Args {
    /// Dataset root containing the `videos` and `annotations` directories
    #[arg(short = 'd', long = "dataset_path")]
    pub dataset_path: String,

    /// Name of the output folder created inside the dataset root
    #[arg(long = "destination", default_value = "sdd")]
    pub destination: String,

    /// JSON file mapping scene -> video index -> [train, val, test]
    #[arg(short = 'p', long = "plan")]
    pub plan: PathBuf,

    /// Total number of training frames (uniform sub-sampling)
    #[arg(long = "num_train")]
    pub num_train: Option<usize>,

    /// Total number of validation frames (uniform sub-sampling)
    #[arg(long = "num_val")]
    pub num_val: Option<usize>,

    /// Total number of test frames (uniform sub-sampling)
    #[arg(long = "num_test")]
    pub num_test: Option<usize>,

    /// Seed for the random ratio split; unseeded when omitted
    #[arg(long = "seed")]
    pub seed: Option<u64>,

    /// Program used to split videos into frames
    #[arg(long = "ffmpeg", default_value = "ffmpeg")]
    pub ffmpeg: String,

    /// Number of threads writing per-frame files (0 = one per core)
    #[arg(long = "workers", default_value_t = 0)]
    pub workers: usize,
}

/// Global frame quotas selecting the uniform sub-sampling policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quotas {
    pub train: usize,
    pub val: usize,
    pub test: usize,
}

impl Args {
    pub fn destination_root(&self) -> PathBuf {
        Path::new(&self.dataset_path).join(&self.destination)
    }

    /// `Some` when all three quotas are given, `None` when none are.
    pub fn quotas(&self) -> Result<Option<Quotas>> {
        match (self.num_train, self.num_val, self.num_test) {
            (Some(train), Some(val), Some(test)) => Ok(Some(Quotas { train, val, test })),
            (None, None, None) => Ok(None),
            _ => Err(Error::Config(
                "num_train, num_val and num_test must be given together".to_string(),
            )),
        }
    }
}

/// Which videos to process and how each one is split.
///
/// Example: `{"nexus": {"0": [0.7, 0.2, 0.1]}, "gates": {"1": [0, 0, 1]}}`.
/// Scenes and videos are visited in sorted order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VideoPlan {
    pub scenes: BTreeMap<String, BTreeMap<u32, SplitRatio>>,
}

/// One video of the plan
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedVideo {
    pub scene: String,
    pub index: u32,
    pub ratio: SplitRatio,
}

impl PlannedVideo {
    /// Frame-name prefix, also used as the cache key
    pub fn prefix(&self) -> String {
        format!("{}_video{}_", self.scene, self.index)
    }
}

impl VideoPlan {
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(Error::io(path))?;
        let plan: VideoPlan = serde_json::from_reader(BufReader::new(file))?;
        plan.validate()?;
        Ok(plan)
    }

    pub fn validate(&self) -> Result<()> {
        for video in self.videos() {
            for value in video.ratio {
                validate_fraction(value).map_err(|e| {
                    Error::Config(format!("{} video {}: {}", video.scene, video.index, e))
                })?;
            }
        }
        Ok(())
    }

    pub fn videos(&self) -> impl Iterator<Item = PlannedVideo> + '_ {
        self.scenes.iter().flat_map(|(scene, videos)| {
            videos.iter().map(move |(index, ratio)| PlannedVideo {
                scene: scene.clone(),
                index: *index,
                ratio: *ratio,
            })
        })
    }

    pub fn len(&self) -> usize {
        self.scenes.values().map(|videos| videos.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// Validate that a split fraction is between 0.0 and 1.0
fn validate_fraction(value: f64) -> std::result::Result<f64, String> {
    if (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(format!("split value {} must be between 0.0 and 1.0", value))
    }
}
