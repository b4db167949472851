//! Track log parsing and per-frame lookup.
//!
//! The log is the Stanford Drone Dataset `annotations.txt` layout: one
//! whitespace-separated line per object per frame with the fixed column order
//! `track_id x_min y_min x_max y_max frame lost occluded generated "label"`.
//! Columns are read by position only, so a log with a different layout is
//! not detected beyond the column count and integer checks.

use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::str::FromStr;

use crate::cache::TableCache;
use crate::error::{Error, Result};
use crate::types::Observation;

/// Number of columns in every track log line
pub const LOG_COLUMNS: usize = 10;

/// All observations of one video, indexed by frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<Observation>", into = "Vec<Observation>")]
pub struct TrackTable {
    observations: Vec<Observation>,
    by_frame: HashMap<u32, Vec<usize>>,
}

impl From<Vec<Observation>> for TrackTable {
    fn from(observations: Vec<Observation>) -> Self {
        let mut by_frame: HashMap<u32, Vec<usize>> = HashMap::new();
        for (position, observation) in observations.iter().enumerate() {
            by_frame
                .entry(observation.frame_index)
                .or_default()
                .push(position);
        }
        Self {
            observations,
            by_frame,
        }
    }
}

impl From<TrackTable> for Vec<Observation> {
    fn from(table: TrackTable) -> Self {
        table.observations
    }
}

impl TrackTable {
    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    /// Observations in log order.
    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    /// Observations recorded for `frame_index`, in the order they appear in the log.
    /// Frames with no observations yield nothing.
    pub fn observations_in_frame(&self, frame_index: u32) -> impl Iterator<Item = &Observation> {
        self.by_frame
            .get(&frame_index)
            .map(|positions| positions.as_slice())
            .unwrap_or_default()
            .iter()
            .map(move |&position| &self.observations[position])
    }

    /// Parse a complete track log from any buffered reader. `path` is only used
    /// for error messages.
    pub fn parse<R: BufRead>(reader: R, path: &Path) -> Result<Self> {
        let mut observations = Vec::new();
        for (number, line) in reader.lines().enumerate() {
            let line = line.map_err(Error::io(path))?;
            if line.trim().is_empty() {
                continue;
            }
            observations.push(parse_line(&line, path, number + 1)?);
        }
        Ok(Self::from(observations))
    }
}

fn parse_line(line: &str, path: &Path, line_number: usize) -> Result<Observation> {
    let columns: Vec<&str> = line.split_whitespace().collect();
    if columns.len() != LOG_COLUMNS {
        return Err(Error::Parse {
            path: path.to_path_buf(),
            line: line_number,
            message: format!(
                "expected {} columns, found {}",
                LOG_COLUMNS,
                columns.len()
            ),
        });
    }

    let field = |index: usize, name: &str| -> Result<i64> {
        parse_number(columns[index], path, line_number, name)
    };

    Ok(Observation {
        track_id: field(0, "track_id")?,
        x_min: field(1, "xmin")?,
        y_min: field(2, "ymin")?,
        x_max: field(3, "xmax")?,
        y_max: field(4, "ymax")?,
        frame_index: parse_number(columns[5], path, line_number, "frame")?,
        lost: field(6, "lost")? != 0,
        occluded: field(7, "occluded")? != 0,
        generated: field(8, "generated")? != 0,
        label: columns[9].replace('"', ""),
    })
}

fn parse_number<T: FromStr>(value: &str, path: &Path, line: usize, name: &str) -> Result<T> {
    value.parse().map_err(|_| Error::Parse {
        path: path.to_path_buf(),
        line,
        message: format!("column {} is not an integer: {:?}", name, value),
    })
}

/// Load the track table for one video, reusing a previously parsed table
/// stored under `cache_key` when the cache has one.
pub fn load(log_path: &Path, cache_key: &str, cache: &dyn TableCache) -> Result<TrackTable> {
    if let Some(table) = cache.get(cache_key)? {
        debug!(
            "Using cached track table for {} ({} observations)",
            cache_key,
            table.len()
        );
        return Ok(table);
    }

    if !log_path.exists() {
        return Err(Error::not_found(log_path, "annotation file not found"));
    }
    let file = File::open(log_path).map_err(Error::io(log_path))?;
    let table = TrackTable::parse(BufReader::new(file), log_path)?;
    info!(
        "Parsed {} observations from {}",
        table.len(),
        log_path.display()
    );

    cache.put(cache_key, &table)?;
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use std::fs;
    use std::io::Cursor;

    const LOG: &str = "\
0 10 20 30 40 1 0 0 0 \"Pedestrian\"
1 50 60 70 80 2 0 1 0 \"Biker\"
2 11 21 31 41 1 0 0 1 \"Car\"

3 5 5 9 9 4 1 0 0 \"Cart\"
";

    fn parse(text: &str) -> Result<TrackTable> {
        TrackTable::parse(Cursor::new(text), Path::new("annotations.txt"))
    }

    #[test]
    fn parses_all_columns() {
        let table = parse(LOG).unwrap();
        assert_eq!(table.len(), 4);
        let second = &table.observations()[1];
        assert_eq!(second.track_id, 1);
        assert_eq!((second.x_min, second.y_min, second.x_max, second.y_max), (50, 60, 70, 80));
        assert_eq!(second.frame_index, 2);
        assert!(!second.lost);
        assert!(second.occluded);
        assert!(!second.generated);
        assert_eq!(second.label, "Biker");
    }

    #[test]
    fn groups_by_frame_in_log_order() {
        let table = parse(LOG).unwrap();
        let frame_one: Vec<i64> = table.observations_in_frame(1).map(|o| o.track_id).collect();
        assert_eq!(frame_one, vec![0, 2]);
        assert_eq!(table.observations_in_frame(2).count(), 1);
        assert_eq!(table.observations_in_frame(3).count(), 0);
        assert_eq!(table.observations_in_frame(0).count(), 0);
        assert_eq!(table.observations_in_frame(1000).count(), 0);
    }

    #[test]
    fn wrong_column_count_is_a_parse_error() {
        let err = parse("0 10 20 30 40 1 0 0 \"Pedestrian\"\n").unwrap_err();
        match err {
            Error::Parse { line, message, .. } => {
                assert_eq!(line, 1);
                assert!(message.contains("expected 10 columns"));
            }
            other => panic!("expected a parse error, got {:?}", other),
        }
    }

    #[test]
    fn non_integer_column_is_a_parse_error() {
        let err = parse("0 10 20 thirty 40 1 0 0 0 \"Pedestrian\"\n").unwrap_err();
        assert!(matches!(err, Error::Parse { line: 1, .. }));
    }

    #[test]
    fn serde_round_trip_rebuilds_the_frame_index() {
        let table = parse(LOG).unwrap();
        let json = serde_json::to_string(&table).unwrap();
        let restored: TrackTable = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, table);
        assert_eq!(restored.observations_in_frame(1).count(), 2);
    }

    #[test]
    fn load_reuses_cached_table_and_reports_missing_log() {
        let dir = tempfile::tempdir().unwrap();
        let log_path = dir.path().join("annotations.txt");
        fs::write(&log_path, LOG).unwrap();
        let cache = MemoryCache::new();

        let first = load(&log_path, "nexus_video0_", &cache).unwrap();
        assert_eq!(first.len(), 4);
        assert_eq!(cache.len(), 1);

        // A cached table is returned without parsing the log again
        fs::write(&log_path, "garbage line\n").unwrap();
        let second = load(&log_path, "nexus_video0_", &cache).unwrap();
        assert_eq!(second, first);

        // Without a cache entry the log is read, and a missing one is an I/O error
        fs::remove_file(&log_path).unwrap();
        let err = load(&log_path, "nexus_video1_", &cache).unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
        assert_eq!(cache.len(), 1);
    }
}
