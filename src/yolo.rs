//! YOLO style label files: one text file per frame, one
//! `class x_center y_center width height` line per observation, all values
//! relative to the frame size.

use indicatif::ProgressBar;
use rayon::prelude::*;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::track_table::TrackTable;
use crate::types::{Category, FrameDimensions, Observation};

/// Calculate the normalized center box of an observation.
///
/// The lower corner is clamped to 0 and the upper corner to the frame size,
/// each bound independently; a box still inverted after clamping keeps its
/// stored min corner and an absolute size.
pub fn calculate_bounding_box(
    observation: &Observation,
    dims: FrameDimensions,
) -> (f64, f64, f64, f64) {
    let frame_width = i64::from(dims.width);
    let frame_height = i64::from(dims.height);

    let x_min = observation.x_min.max(0);
    let y_min = observation.y_min.max(0);
    let x_max = observation.x_max.min(frame_width);
    let y_max = observation.y_max.min(frame_height);

    let box_width = (x_max - x_min).abs() as f64;
    let box_height = (y_max - y_min).abs() as f64;

    let x_center = x_min as f64 + box_width / 2.0;
    let y_center = y_min as f64 + box_height / 2.0;

    (
        x_center / frame_width as f64,
        y_center / frame_height as f64,
        box_width / frame_width as f64,
        box_height / frame_height as f64,
    )
}

/// Writes normalized-box label files.
#[derive(Debug, Clone, Copy, Default)]
pub struct YoloEncoder;

impl YoloEncoder {
    pub fn new() -> Self {
        Self
    }

    /// Label lines for one frame, without trailing newlines.
    pub fn encode(
        &self,
        table: &TrackTable,
        dims: FrameDimensions,
        frame_index: u32,
    ) -> Result<Vec<String>> {
        table
            .observations_in_frame(frame_index)
            .map(|observation| {
                let category = Category::from_label(&observation.label)?;
                let (x_center, y_center, width, height) =
                    calculate_bounding_box(observation, dims);
                Ok(format!(
                    "{} {:.6} {:.6} {:.6} {:.6}",
                    category.id(),
                    x_center,
                    y_center,
                    width,
                    height
                ))
            })
            .collect()
    }

    pub fn output_path(dest_dir: &Path, prefix: &str, frame_index: u32) -> PathBuf {
        dest_dir.join(format!("{}{}.txt", prefix, frame_index))
    }

    /// Encode and write one frame. The file is truncated first; an empty frame
    /// produces an empty file.
    pub fn write_frame(
        &self,
        table: &TrackTable,
        dims: FrameDimensions,
        prefix: &str,
        frame_index: u32,
        dest_dir: &Path,
    ) -> Result<PathBuf> {
        let lines = self.encode(table, dims, frame_index)?;
        let path = Self::output_path(dest_dir, prefix, frame_index);

        let mut label_data = String::with_capacity(lines.len() * 48);
        for line in &lines {
            label_data.push_str(line);
            label_data.push('\n');
        }

        let mut writer = BufWriter::new(File::create(&path).map_err(Error::io(&path))?);
        writer
            .write_all(label_data.as_bytes())
            .and_then(|_| writer.flush())
            .map_err(Error::io(&path))?;
        Ok(path)
    }

    /// Write label files for frames `1..=frame_count` in parallel.
    pub fn write_frames(
        &self,
        table: &TrackTable,
        dims: FrameDimensions,
        prefix: &str,
        frame_count: u32,
        dest_dir: &Path,
        pb: &ProgressBar,
    ) -> Result<()> {
        (1..=frame_count).into_par_iter().try_for_each(|frame_index| {
            self.write_frame(table, dims, prefix, frame_index, dest_dir)?;
            pb.inc(1);
            Ok(())
        })
    }
}
