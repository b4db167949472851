use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};

use sdd2dataset::{process_dataset, Args, Error, FrameExtractor, Result, VideoPlan};

/// Writes blank JPEG frames instead of decoding a video.
struct StubExtractor {
    frames: u32,
    calls: RefCell<Vec<String>>,
}

impl StubExtractor {
    fn new(frames: u32) -> Self {
        Self {
            frames,
            calls: RefCell::new(Vec::new()),
        }
    }
}

impl FrameExtractor for StubExtractor {
    fn extract(&self, _video: &Path, images_dir: &Path, prefix: &str) -> Result<u32> {
        self.calls.borrow_mut().push(prefix.to_string());
        for frame in 1..=self.frames {
            let path = images_dir.join(format!("{}{}.jpg", prefix, frame));
            image::RgbImage::new(64, 48).save(&path).unwrap();
        }
        Ok(self.frames)
    }
}

fn write_video(root: &Path, scene: &str, index: u32, log: &str) {
    let video_dir = root.join("videos").join(scene).join(format!("video{}", index));
    fs::create_dir_all(&video_dir).unwrap();
    fs::write(video_dir.join("video.mov"), b"not a real video").unwrap();

    let annotation_dir = root
        .join("annotations")
        .join(scene)
        .join(format!("video{}", index));
    fs::create_dir_all(&annotation_dir).unwrap();
    fs::write(annotation_dir.join("annotations.txt"), log).unwrap();
}

fn track_log(frames: u32) -> String {
    let mut log = String::new();
    for frame in 1..=frames {
        log.push_str(&format!("0 {} 10 {} 30 {} 0 0 0 \"Pedestrian\"\n", frame, frame + 8, frame));
        log.push_str(&format!("1 -4 20 70 40 {} 0 1 0 \"Biker\"\n", frame));
    }
    log
}

fn args(root: &Path, quotas: Option<(usize, usize, usize)>) -> Args {
    Args {
        dataset_path: root.to_string_lossy().into_owned(),
        destination: "sdd".to_string(),
        plan: PathBuf::from("plan.json"),
        num_train: quotas.map(|q| q.0),
        num_val: quotas.map(|q| q.1),
        num_test: quotas.map(|q| q.2),
        seed: Some(11),
        ffmpeg: "ffmpeg".to_string(),
        workers: 2,
    }
}

fn lines(path: PathBuf) -> Vec<String> {
    fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect()
}

#[test]
fn ratio_run_writes_all_outputs() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    write_video(root, "nexus", 0, &track_log(12));
    let plan: VideoPlan = serde_json::from_str(r#"{"nexus": {"0": [0.5, 0.25, 0.25]}}"#).unwrap();
    let extractor = StubExtractor::new(12);

    let stats = process_dataset(&args(root, None), &plan, &extractor).unwrap();
    assert_eq!(stats.videos_annotated, 1);
    assert_eq!(stats.frames_annotated, 12);
    assert_eq!(stats.frames_assigned, 12);

    let out = root.join("sdd");
    for frame in 1..=12 {
        assert!(out.join("Annotations").join(format!("nexus_video0_{}.xml", frame)).exists());
        assert!(out.join("labels").join(format!("nexus_video0_{}.txt", frame)).exists());
    }
    assert!(out.join("Annotations_json/nexus_video0_.json").exists());
    assert!(out.join("Annotations_json/nexus_video0_tiny.json").exists());
    assert!(out.join("pickle_store/nexus_video0_annotation.json").exists());

    let xml = fs::read_to_string(out.join("Annotations/nexus_video0_1.xml")).unwrap();
    assert!(xml.contains("<width>64</width>"));
    assert!(xml.contains("<height>48</height>"));
    assert!(xml.contains("<folder>sdd</folder>"));
    assert!(xml.contains("<xmin>-4</xmin>"));

    let label = fs::read_to_string(out.join("labels/nexus_video0_1.txt")).unwrap();
    let label_lines: Vec<&str> = label.lines().collect();
    assert_eq!(label_lines.len(), 2);
    assert!(label_lines[1].starts_with("1 "));

    let manifests = out.join("ImageSets/Main");
    assert_eq!(lines(manifests.join("train.txt")).len(), 6);
    assert_eq!(lines(manifests.join("val.txt")).len(), 3);
    assert_eq!(lines(manifests.join("test.txt")).len(), 3);
    assert_eq!(lines(manifests.join("trainval.txt")).len(), 9);
}

#[test]
fn second_run_skips_extraction_and_resets_manifests() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    write_video(root, "nexus", 0, &track_log(20));
    write_video(root, "deathCircle", 1, &track_log(20));
    let plan: VideoPlan =
        serde_json::from_str(r#"{"nexus": {"0": [1, 0, 0]}, "deathCircle": {"1": [0, 0, 1]}}"#)
            .unwrap();

    let first = StubExtractor::new(20);
    process_dataset(&args(root, Some((10, 0, 4))), &plan, &first).unwrap();
    assert_eq!(
        first.calls.borrow().as_slice(),
        ["deathCircle_video1_", "nexus_video0_"]
    );

    let manifests = root.join("sdd/ImageSets/Main");
    let train = lines(manifests.join("train.txt"));
    let test = lines(manifests.join("test.txt"));
    // stride ceil(20 / 10) = 2 and ceil(20 / 4) = 5
    assert_eq!(train.len(), 10);
    assert_eq!(train[1], "nexus_video0_3");
    assert_eq!(test, vec!["deathCircle_video1_1", "deathCircle_video1_6", "deathCircle_video1_11", "deathCircle_video1_16"]);

    let second = StubExtractor::new(20);
    let stats = process_dataset(&args(root, Some((10, 0, 4))), &plan, &second).unwrap();
    assert!(second.calls.borrow().is_empty());
    assert_eq!(stats.videos_skipped, 2);
    assert_eq!(lines(manifests.join("train.txt")), train);
    assert_eq!(lines(manifests.join("trainval.txt")), train);
    assert_eq!(lines(manifests.join("test.txt")), test);
}

#[test]
fn unknown_category_aborts_the_run() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    write_video(root, "little", 0, "0 1 1 5 5 1 0 0 0 \"Dog\"\n");
    let plan: VideoPlan = serde_json::from_str(r#"{"little": {"0": [0.5, 0.5, 0]}}"#).unwrap();

    let err = process_dataset(&args(root, None), &plan, &StubExtractor::new(3)).unwrap_err();
    assert!(matches!(err, Error::UnknownCategory(_)));
    // Region-box documents written before the failure are left in place
    assert!(root.join("sdd/Annotations/little_video0_1.xml").exists());
}

#[test]
fn missing_video_directory_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    write_video(root, "gates", 0, &track_log(2));
    let plan: VideoPlan = serde_json::from_str(r#"{"gates": {"3": [1, 0, 0]}}"#).unwrap();

    let err = process_dataset(&args(root, None), &plan, &StubExtractor::new(2)).unwrap_err();
    assert!(matches!(err, Error::Io { .. }));
}

#[test]
fn uniform_policy_needs_a_share_for_the_selected_split() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    write_video(root, "quad", 0, &track_log(4));
    let plan: VideoPlan = serde_json::from_str(r#"{"quad": {"0": [0, 1, 0]}}"#).unwrap();

    let err = process_dataset(&args(root, Some((10, 0, 0))), &plan, &StubExtractor::new(4))
        .unwrap_err();
    assert!(matches!(err, Error::Config(_)));
}
