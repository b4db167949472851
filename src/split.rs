//! Train/val/test assignment of frames and the manifest files recording it.

use log::{debug, info};
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::HashSet;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::types::{Split, SplitRatio};

/// Allowance for floating point error when checking that fractions sum to one
const RATIO_SUM_TOLERANCE: f64 = 1e-9;

struct ManifestFile {
    path: PathBuf,
    writer: BufWriter<File>,
    entries: Vec<String>,
}

impl ManifestFile {
    fn create(path: PathBuf) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&path)
            .map_err(Error::io(&path))?;
        Ok(Self {
            path,
            writer: BufWriter::new(file),
            entries: Vec::new(),
        })
    }

    fn append(&mut self, id: &str) -> Result<()> {
        writeln!(self.writer, "{}", id).map_err(Error::io(&self.path))?;
        self.entries.push(id.to_string());
        Ok(())
    }
}

/// The four append-only manifests (`train`, `val`, `test`, `trainval`) of a run.
///
/// Creating a manifest truncates the files. Train and val entries are mirrored
/// into trainval, and a frame identifier can be assigned to one split only.
pub struct SplitManifest {
    train: ManifestFile,
    val: ManifestFile,
    test: ManifestFile,
    trainval: ManifestFile,
    assigned: HashSet<String>,
}

impl SplitManifest {
    pub fn create(dir: &Path) -> Result<Self> {
        Ok(Self {
            train: ManifestFile::create(dir.join("train.txt"))?,
            val: ManifestFile::create(dir.join("val.txt"))?,
            test: ManifestFile::create(dir.join("test.txt"))?,
            trainval: ManifestFile::create(dir.join("trainval.txt"))?,
            assigned: HashSet::new(),
        })
    }

    /// Record `id` under `split`.
    pub fn append(&mut self, split: Split, id: &str) -> Result<()> {
        if !self.assigned.insert(id.to_string()) {
            return Err(Error::Config(format!(
                "frame {} is already assigned to a split",
                id
            )));
        }
        match split {
            Split::Train => self.train.append(id)?,
            Split::Val => self.val.append(id)?,
            Split::Test => self.test.append(id)?,
        }
        if split.in_trainval() {
            self.trainval.append(id)?;
        }
        Ok(())
    }

    pub fn entries(&self, split: Split) -> &[String] {
        match split {
            Split::Train => &self.train.entries,
            Split::Val => &self.val.entries,
            Split::Test => &self.test.entries,
        }
    }

    pub fn trainval(&self) -> &[String] {
        &self.trainval.entries
    }

    pub fn flush(&mut self) -> Result<()> {
        for file in [
            &mut self.train,
            &mut self.val,
            &mut self.test,
            &mut self.trainval,
        ] {
            file.writer.flush().map_err(Error::io(&file.path))?;
        }
        Ok(())
    }
}

pub fn frame_id(prefix: &str, frame_index: u32) -> String {
    format!("{}{}", prefix, frame_index)
}

/// Randomly assign `floor(fraction * frame_count)` frames to each split.
///
/// Test frames are drawn first, then val from the remainder, then train.
/// Frames left over by the truncation are not written to any manifest.
/// Returns the number of frames assigned.
pub fn assign_by_ratio<R: Rng + ?Sized>(
    manifest: &mut SplitManifest,
    rng: &mut R,
    frame_count: u32,
    ratio: SplitRatio,
    prefix: &str,
) -> Result<usize> {
    if ratio
        .iter()
        .any(|fraction| !(0.0..=1.0).contains(fraction))
    {
        return Err(Error::Config(format!(
            "split ratio {:?} has a fraction outside [0, 1]",
            ratio
        )));
    }
    let total: f64 = ratio.iter().sum();
    if total > 1.0 + RATIO_SUM_TOLERANCE {
        return Err(Error::Config(format!(
            "split ratio {:?} sums to {}, more than 1",
            ratio, total
        )));
    }
    let [train_fraction, val_fraction, test_fraction] = ratio;
    let count = |fraction: f64| (fraction * f64::from(frame_count)) as usize;
    let (train_count, val_count, test_count) = (
        count(train_fraction),
        count(val_fraction),
        count(test_fraction),
    );

    let mut pool: Vec<u32> = (1..=frame_count).collect();
    pool.shuffle(rng);

    let (test_frames, rest) = pool.split_at(test_count);
    let (val_frames, rest) = rest.split_at(val_count);
    let train_frames = &rest[..train_count];

    for (split, frames) in [
        (Split::Train, train_frames),
        (Split::Val, val_frames),
        (Split::Test, test_frames),
    ] {
        for &frame_index in frames {
            manifest.append(split, &frame_id(prefix, frame_index))?;
        }
    }

    debug!(
        "{}: {} train, {} val, {} test of {} frames",
        prefix, train_count, val_count, test_count, frame_count
    );
    Ok(train_count + val_count + test_count)
}

/// Frames each split should take from every video assigned to it under the
/// uniform policy. `None` for a split no video feeds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Share {
    pub train: Option<f64>,
    pub val: Option<f64>,
    pub test: Option<f64>,
}

impl Share {
    pub fn get(&self, split: Split) -> Option<f64> {
        match split {
            Split::Train => self.train,
            Split::Val => self.val,
            Split::Test => self.test,
        }
    }
}

/// The split a one-hot plan entry selects.
pub fn one_hot_split(ratio: SplitRatio) -> Result<Split> {
    let selected: Vec<Split> = Split::ALL
        .iter()
        .zip(ratio.iter())
        .filter(|(_, value)| **value == 1.0)
        .map(|(split, _)| *split)
        .collect();
    let others_zero = ratio.iter().all(|value| *value == 0.0 || *value == 1.0);
    match selected.as_slice() {
        [split] if others_zero => Ok(*split),
        _ => Err(Error::Config(format!(
            "uniform split needs exactly one 1 in {:?}",
            ratio
        ))),
    }
}

/// Divide the global quotas among the videos feeding each split.
pub fn calculate_share<'a>(
    ratios: impl IntoIterator<Item = &'a SplitRatio>,
    num_train: usize,
    num_val: usize,
    num_test: usize,
) -> Result<Share> {
    let mut videos = [0usize; 3];
    for ratio in ratios {
        let split = one_hot_split(*ratio)?;
        videos[split as usize] += 1;
    }
    let per_video = |quota: usize, videos: usize| {
        if videos == 0 {
            None
        } else {
            Some(quota as f64 / videos as f64)
        }
    };
    let share = Share {
        train: per_video(num_train, videos[0]),
        val: per_video(num_val, videos[1]),
        test: per_video(num_test, videos[2]),
    };
    info!(
        "Per-video share: train {:?}, val {:?}, test {:?}",
        share.train, share.val, share.test
    );
    Ok(share)
}

/// Assign every `ceil(frame_count / share)`-th frame, starting from frame 1,
/// to the split selected by `one_hot`. Returns the number of frames assigned.
pub fn assign_uniform(
    manifest: &mut SplitManifest,
    frame_count: u32,
    one_hot: SplitRatio,
    share: &Share,
    prefix: &str,
) -> Result<usize> {
    let split = one_hot_split(one_hot)?;
    let share_of_this_video = match share.get(split) {
        Some(value) if value > 0.0 => value,
        _ => {
            return Err(Error::Config(format!(
                "no {} share available for {}",
                split.name(),
                prefix
            )))
        }
    };

    let stride = (f64::from(frame_count) / share_of_this_video).ceil() as usize;
    if stride == 0 {
        return Ok(0);
    }

    let mut assigned = 0;
    for frame_index in (1..=frame_count).step_by(stride) {
        manifest.append(split, &frame_id(prefix, frame_index))?;
        assigned += 1;
    }
    debug!(
        "{}: {} {} frames at stride {}",
        prefix,
        assigned,
        split.name(),
        stride
    );
    Ok(assigned)
}
