//! Pascal VOC style region-box documents, one XML file per frame.
//!
//! Boxes are written exactly as they appear in the track log. Unlike the YOLO
//! labels they are not clamped to the frame, so out-of-frame or inverted boxes
//! reach consumers of these files unchanged.

use indicatif::ProgressBar;
use rayon::prelude::*;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::track_table::TrackTable;
use crate::types::FrameDimensions;

pub const DEFAULT_DATABASE: &str = "Stanford Drone Dataset";
pub const POSE_UNSPECIFIED: &str = "Unspecified";

/// One `<object>` entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VocObject {
    pub name: String,
    pub pose: &'static str,
    pub truncated: bool,
    pub difficult: bool,
    pub x_min: i64,
    pub y_min: i64,
    pub x_max: i64,
    pub y_max: i64,
}

/// The annotation document for a single frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VocDocument {
    pub folder: String,
    pub database: String,
    pub filename: String,
    pub size: FrameDimensions,
    pub segmented: bool,
    pub objects: Vec<VocObject>,
}

impl VocDocument {
    pub fn to_xml(&self) -> String {
        let mut xml = String::with_capacity(256 + self.objects.len() * 256);
        xml.push_str("<annotation>\n");
        push_element(&mut xml, 1, "folder", &self.folder);
        xml.push_str("\t<source>\n");
        push_element(&mut xml, 2, "database", &self.database);
        xml.push_str("\t</source>\n");
        xml.push_str("\t<size>\n");
        push_element(&mut xml, 2, "width", &self.size.width.to_string());
        push_element(&mut xml, 2, "height", &self.size.height.to_string());
        push_element(&mut xml, 2, "depth", &self.size.depth.to_string());
        xml.push_str("\t</size>\n");
        push_element(&mut xml, 1, "segmented", flag(self.segmented));
        push_element(&mut xml, 1, "filename", &self.filename);

        for object in &self.objects {
            xml.push_str("\t<object>\n");
            push_element(&mut xml, 2, "name", &object.name);
            push_element(&mut xml, 2, "pose", object.pose);
            push_element(&mut xml, 2, "truncated", flag(object.truncated));
            push_element(&mut xml, 2, "difficult", flag(object.difficult));
            xml.push_str("\t\t<bndbox>\n");
            push_element(&mut xml, 3, "xmin", &object.x_min.to_string());
            push_element(&mut xml, 3, "ymin", &object.y_min.to_string());
            push_element(&mut xml, 3, "xmax", &object.x_max.to_string());
            push_element(&mut xml, 3, "ymax", &object.y_max.to_string());
            xml.push_str("\t\t</bndbox>\n");
            xml.push_str("\t</object>\n");
        }

        xml.push_str("</annotation>\n");
        xml
    }
}

fn flag(value: bool) -> &'static str {
    if value {
        "1"
    } else {
        "0"
    }
}

fn push_element(xml: &mut String, depth: usize, tag: &str, text: &str) {
    for _ in 0..depth {
        xml.push('\t');
    }
    xml.push_str(&format!("<{}>{}</{}>\n", tag, escape_text(text), tag));
}

fn escape_text(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Builds and writes region-box documents.
#[derive(Debug, Clone)]
pub struct VocEncoder {
    /// Output folder name recorded in each document
    pub folder: String,
    pub database: String,
}

impl VocEncoder {
    pub fn new(folder: impl Into<String>) -> Self {
        Self {
            folder: folder.into(),
            database: DEFAULT_DATABASE.to_string(),
        }
    }

    /// Build the document for one frame. Never fails: labels outside the
    /// category set and out-of-frame boxes are passed through.
    pub fn encode(
        &self,
        table: &TrackTable,
        dims: FrameDimensions,
        prefix: &str,
        frame_index: u32,
    ) -> VocDocument {
        let objects = table
            .observations_in_frame(frame_index)
            .map(|observation| VocObject {
                name: observation.label.replace('"', ""),
                pose: POSE_UNSPECIFIED,
                truncated: observation.occluded,
                difficult: false,
                x_min: observation.x_min,
                y_min: observation.y_min,
                x_max: observation.x_max,
                y_max: observation.y_max,
            })
            .collect();

        VocDocument {
            folder: self.folder.clone(),
            database: self.database.clone(),
            filename: format!("{}{}", prefix, frame_index),
            size: dims,
            segmented: false,
            objects,
        }
    }

    pub fn output_path(dest_dir: &Path, prefix: &str, frame_index: u32) -> PathBuf {
        dest_dir.join(format!("{}{}.xml", prefix, frame_index))
    }

    /// Encode and write one frame, replacing any existing file.
    pub fn write_frame(
        &self,
        table: &TrackTable,
        dims: FrameDimensions,
        prefix: &str,
        frame_index: u32,
        dest_dir: &Path,
    ) -> Result<PathBuf> {
        let document = self.encode(table, dims, prefix, frame_index);
        let path = Self::output_path(dest_dir, prefix, frame_index);
        let mut writer = BufWriter::new(File::create(&path).map_err(Error::io(&path))?);
        writer
            .write_all(document.to_xml().as_bytes())
            .and_then(|_| writer.flush())
            .map_err(Error::io(&path))?;
        Ok(path)
    }

    /// Write documents for frames `1..=frame_count` in parallel.
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

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn table(text: &str) -> TrackTable {
        TrackTable::parse(Cursor::new(text), Path::new("log")).unwrap()
    }

    const DIMS: FrameDimensions = FrameDimensions {
        width: 1400,
        height: 1900,
        depth: 3,
    };

    #[test]
    fn raw_coordinates_and_labels_pass_through() {
        let table = table("7 -5 20 1500 10 3 0 1 0 \"Dog\"\n");
        let document = VocEncoder::new("sdd").encode(&table, DIMS, "nexus_video0_", 3);

        assert_eq!(document.filename, "nexus_video0_3");
        assert_eq!(document.objects.len(), 1);
        let object = &document.objects[0];
        assert_eq!(object.name, "Dog");
        assert!(object.truncated);
        assert!(!object.difficult);
        assert_eq!((object.x_min, object.y_min, object.x_max, object.y_max), (-5, 20, 1500, 10));
    }

    #[test]
    fn xml_layout() {
        let table = table("0 1 2 3 4 1 0 0 0 \"Biker\"\n");
        let xml = VocEncoder::new("sdd").encode(&table, DIMS, "p_", 1).to_xml();

        assert!(xml.starts_with("<annotation>\n\t<folder>sdd</folder>\n"));
        assert!(xml.contains("<database>Stanford Drone Dataset</database>"));
        assert!(xml.contains("\t\t<width>1400</width>\n\t\t<height>1900</height>\n\t\t<depth>3</depth>\n"));
        assert!(xml.contains("<segmented>0</segmented>"));
        assert!(xml.contains("<filename>p_1</filename>"));
        assert!(xml.contains("<name>Biker</name>"));
        assert!(xml.contains("<pose>Unspecified</pose>"));
        assert!(xml.contains("<truncated>0</truncated>"));
        assert!(xml.contains("\t\t\t<xmin>1</xmin>\n\t\t\t<ymin>2</ymin>\n\t\t\t<xmax>3</xmax>\n\t\t\t<ymax>4</ymax>\n"));
        assert!(xml.ends_with("</annotation>\n"));
    }

    #[test]
    fn empty_frame_has_no_objects() {
        let table = table("0 1 2 3 4 1 0 0 0 \"Biker\"\n");
        let document = VocEncoder::new("sdd").encode(&table, DIMS, "p_", 2);
        assert!(document.objects.is_empty());
        assert!(!document.to_xml().contains("<object>"));
    }

    #[test]
    fn text_is_escaped() {
        assert_eq!(escape_text("a<b>&c"), "a&lt;b&gt;&amp;c");
    }
}
