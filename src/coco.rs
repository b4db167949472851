//! COCO style catalog of one video
//!
//! Every frame becomes an image record and every observation an annotation
//! record with an absolute `[x, y, width, height]` box. A second "tiny"
//! catalog holding only the first ten frames is written for quick experiments.

use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::track_table::TrackTable;
use crate::types::{Category, FrameDimensions};

pub const DEFAULT_DESCRIPTION: &str = "Stanford UAV Dataset";

/// Number of frames captured by the tiny catalog
pub const TINY_FRAME_COUNT: u32 = 10;

/// Boxes are absolute `[x, y, width, height]`
pub const BBOX_MODE_XYWH_ABS: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Info {
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryEntry {
    pub id: u32,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Image {
    pub id: u32,
    pub width: u32,
    pub height: u32,
    pub depth: u8,
    pub file_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    pub id: u64,
    pub image_id: u32,
    pub category_id: u32,
    pub bbox: [f64; 4], // [x, y, width, height]
    pub iscrowd: u32,
    pub bbox_mode: u32,
    pub area: f64,
}

/// Complete catalog document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CocoFile {
    pub info: Vec<Info>,
    pub images: Vec<Image>,
    pub annotations: Vec<Annotation>,
    pub categories: Vec<CategoryEntry>,
}

impl CocoFile {
    pub fn new(description: &str) -> Self {
        Self {
            info: vec![Info {
                description: description.to_string(),
            }],
            images: Vec::new(),
            annotations: Vec::new(),
            categories: Category::ALL
                .iter()
                .map(|category| CategoryEntry {
                    id: category.id(),
                    name: category.name().to_string(),
                })
                .collect(),
        }
    }

    /// Write the catalog as JSON indented by four spaces, replacing any existing file.
    pub fn write(&self, path: &Path) -> Result<()> {
        let file = File::create(path).map_err(Error::io(path))?;
        let mut writer = BufWriter::new(file);
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut writer, formatter);
        self.serialize(&mut serializer)?;
        writer.flush().map_err(Error::io(path))
    }
}

/// Accumulates frames into a catalog in frame order.
///
/// Annotation ids are `frame_index + counter`, where the counter restarts each
/// frame from the last enumeration index used by the previous non-empty frame.
/// Tooling built against earlier exports of this dataset keys on these values.
#[derive(Debug, Clone)]
pub struct CatalogBuilder {
    prefix: String,
    dims: FrameDimensions,
    running_counter: u64,
    catalog: CocoFile,
}

impl CatalogBuilder {
    pub fn new(prefix: &str, dims: FrameDimensions, description: &str) -> Self {
        Self {
            prefix: prefix.to_string(),
            dims,
            running_counter: 0,
            catalog: CocoFile::new(description),
        }
    }

    /// Add the image record and annotations of one frame.
    pub fn push_frame(&mut self, table: &TrackTable, frame_index: u32) -> Result<()> {
        self.catalog.images.push(Image {
            id: frame_index,
            width: self.dims.width,
            height: self.dims.height,
            depth: self.dims.depth,
            file_name: format!("{}{}.jpg", self.prefix, frame_index),
        });

        let mut count = self.running_counter;
        for observation in table.observations_in_frame(frame_index) {
            let category = Category::from_label(&observation.label)?;

            let box_width = (observation.x_max as f64 - observation.x_min as f64).abs();
            let box_height = (observation.y_max as f64 - observation.y_min as f64).abs();

            self.catalog.annotations.push(Annotation {
                id: u64::from(frame_index) + count,
                image_id: frame_index,
                category_id: category.id(),
                bbox: [
                    observation.x_min as f64,
                    observation.y_min as f64,
                    box_width,
                    box_height,
                ],
                iscrowd: 0,
                bbox_mode: BBOX_MODE_XYWH_ABS,
                area: box_width * box_height,
            });

            self.running_counter = count;
            count += 1;
        }
        Ok(())
    }

    pub fn catalog(&self) -> &CocoFile {
        &self.catalog
    }

    pub fn finish(self) -> CocoFile {
        self.catalog
    }
}

/// Builds and writes the per-video catalogs.
#[derive(Debug, Clone)]
pub struct CocoEncoder {
    pub description: String,
}

impl Default for CocoEncoder {
    fn default() -> Self {
        Self {
            description: DEFAULT_DESCRIPTION.to_string(),
        }
    }
}

impl CocoEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the catalog for frames `1..=frame_count` without touching the filesystem.
    pub fn encode(
        &self,
        table: &TrackTable,
        dims: FrameDimensions,
        prefix: &str,
        frame_count: u32,
    ) -> Result<CocoFile> {
        let mut builder = CatalogBuilder::new(prefix, dims, &self.description);
        for frame_index in 1..=frame_count {
            builder.push_frame(table, frame_index)?;
        }
        Ok(builder.finish())
    }

    pub fn output_path(dest_dir: &Path, prefix: &str) -> PathBuf {
        dest_dir.join(format!("{}.json", prefix))
    }

    pub fn tiny_output_path(dest_dir: &Path, prefix: &str) -> PathBuf {
        dest_dir.join(format!("{}tiny.json", prefix))
    }

    /// Build the catalog and write it to `dest_dir`. The tiny catalog is written
    /// as soon as frame 10 is reached, so it survives a failure in a later frame.
    pub fn write_catalogs(
        &self,
        table: &TrackTable,
        dims: FrameDimensions,
        prefix: &str,
        frame_count: u32,
        dest_dir: &Path,
    ) -> Result<CocoFile> {
        let mut builder = CatalogBuilder::new(prefix, dims, &self.description);
        for frame_index in 1..=frame_count {
            builder.push_frame(table, frame_index)?;
            if frame_index == TINY_FRAME_COUNT {
                let tiny_path = Self::tiny_output_path(dest_dir, prefix);
                builder.catalog().write(&tiny_path)?;
                info!("Wrote {}", tiny_path.display());
            }
        }
        if frame_count < TINY_FRAME_COUNT {
            warn!(
                "{} has only {} frames; tiny catalog not written",
                prefix, frame_count
            );
        }

        let catalog = builder.finish();
        let path = Self::output_path(dest_dir, prefix);
        catalog.write(&path)?;
        info!("Wrote {}", path.display());
        Ok(catalog)
    }
}
