//! Per-video driver: frame extraction, the three annotation encodings and the
//! train/val/test split, one video after another.

use log::{info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::{Path, PathBuf};

use crate::cache::{FileCache, TableCache};
use crate::coco::CocoEncoder;
use crate::config::{Args, PlannedVideo, VideoPlan};
use crate::error::{Error, Result};
use crate::extract::FrameExtractor;
use crate::io::{count_files, read_frame_dimensions, require_path, setup_output_directories};
use crate::split::{assign_by_ratio, assign_uniform, calculate_share, Share, SplitManifest};
use crate::track_table;
use crate::types::{OutputDirs, ProcessingStats};
use crate::utils::{create_io_thread_pool, create_progress_bar};
use crate::voc::VocEncoder;
use crate::yolo::YoloEncoder;

/// Paths of one video's inputs inside the dataset root
#[derive(Debug, Clone)]
pub struct VideoInputs {
    pub video_dir: PathBuf,
    pub video_file: PathBuf,
    pub annotation_file: PathBuf,
}

impl VideoInputs {
    pub fn new(dataset_root: &Path, video: &PlannedVideo) -> Self {
        let video_name = format!("video{}", video.index);
        let video_dir = dataset_root
            .join("videos")
            .join(&video.scene)
            .join(&video_name);
        Self {
            video_file: video_dir.join("video.mov"),
            annotation_file: dataset_root
                .join("annotations")
                .join(&video.scene)
                .join(&video_name)
                .join("annotations.txt"),
            video_dir,
        }
    }
}

enum SplitPolicy {
    Ratio(StdRng),
    Uniform(Share),
}

/// Write the VOC, COCO and YOLO annotations of one video whose frames are
/// already extracted. Returns the number of frames annotated.
pub fn annotate_video(
    table: &track_table::TrackTable,
    dirs: &OutputDirs,
    folder: &str,
    prefix: &str,
    frame_count: u32,
    pool: &rayon::ThreadPool,
) -> Result<u32> {
    let first_frame = dirs.images_dir.join(format!("{}1.jpg", prefix));
    let dims = read_frame_dimensions(&first_frame)?;
    info!(
        "{}: {} frames of {}x{}x{}",
        prefix, frame_count, dims.width, dims.height, dims.depth
    );

    let voc = VocEncoder::new(folder);
    let voc_pb = create_progress_bar(u64::from(frame_count), "VOC");
    pool.install(|| voc.write_frames(table, dims, prefix, frame_count, &dirs.voc_dir, &voc_pb))?;
    voc_pb.finish_with_message("VOC annotations complete");

    CocoEncoder::new().write_catalogs(table, dims, prefix, frame_count, &dirs.coco_dir)?;

    let yolo = YoloEncoder::new();
    let yolo_pb = create_progress_bar(u64::from(frame_count), "YOLO");
    pool.install(|| yolo.write_frames(table, dims, prefix, frame_count, &dirs.yolo_dir, &yolo_pb))?;
    yolo_pb.finish_with_message("YOLO labels complete");

    Ok(frame_count)
}

fn frame_count_on_disk(images_dir: &Path, prefix: &str) -> Result<u32> {
    let count = count_files(images_dir, prefix)?;
    u32::try_from(count).map_err(|_| Error::Config(format!("too many frames for {}", prefix)))
}

/// Main dataset processing pipeline
pub fn process_dataset(
    args: &Args,
    plan: &VideoPlan,
    extractor: &dyn FrameExtractor,
) -> Result<ProcessingStats> {
    let dataset_root = PathBuf::from(&args.dataset_path);
    require_path(&dataset_root, "dataset folder not found")?;

    let dirs = setup_output_directories(&args.destination_root())?;
    let mut manifest = SplitManifest::create(&dirs.manifest_dir)?;
    let cache = FileCache::new(&dirs.cache_dir);
    let pool = create_io_thread_pool(args.workers)?;

    let mut policy = match args.quotas()? {
        Some(quotas) => {
            let ratios: Vec<_> = plan.videos().map(|video| video.ratio).collect();
            SplitPolicy::Uniform(calculate_share(
                ratios.iter(),
                quotas.train,
                quotas.val,
                quotas.test,
            )?)
        }
        None => SplitPolicy::Ratio(match args.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }),
    };

    let mut stats = ProcessingStats::new();
    for video in plan.videos() {
        process_video(
            &dataset_root,
            &dirs,
            args,
            &video,
            extractor,
            &cache,
            &pool,
            &mut manifest,
            &mut policy,
            &mut stats,
        )?;
    }
    manifest.flush()?;

    stats.print_summary();
    info!("Done.");
    Ok(stats)
}

#[allow(clippy::too_many_arguments)]
fn process_video(
    dataset_root: &Path,
    dirs: &OutputDirs,
    args: &Args,
    video: &PlannedVideo,
    extractor: &dyn FrameExtractor,
    cache: &dyn TableCache,
    pool: &rayon::ThreadPool,
    manifest: &mut SplitManifest,
    policy: &mut SplitPolicy,
    stats: &mut ProcessingStats,
) -> Result<()> {
    let scene_dir = dataset_root.join("videos").join(&video.scene);
    require_path(&scene_dir, "scene not found")?;

    let inputs = VideoInputs::new(dataset_root, video);
    require_path(&inputs.video_dir, "video directory not found")?;
    if count_files(&inputs.video_dir, "")? != 1 {
        return Err(Error::Config(format!(
            "{} should contain one file",
            inputs.video_dir.display()
        )));
    }

    let prefix = video.prefix();
    if frame_count_on_disk(&dirs.images_dir, &prefix)? == 0 {
        info!("Splitting {}", inputs.video_file.display());
        extractor.extract(&inputs.video_file, &dirs.images_dir, &prefix)?;
        info!("Splitting {} complete.", inputs.video_file.display());

        info!("Annotating frames from {}", inputs.video_file.display());
        require_path(&inputs.annotation_file, "annotation file not found")?;
        let frame_count = frame_count_on_disk(&dirs.images_dir, &prefix)?;
        let table = track_table::load(&inputs.annotation_file, &prefix, cache)?;
        let annotated = annotate_video(&table, dirs, &args.destination, &prefix, frame_count, pool)?;
        stats.videos_annotated += 1;
        stats.frames_annotated += annotated as usize;
        info!("Annotation complete.");
    } else {
        warn!(
            "{} is already split into frames. Skipping...",
            inputs.video_file.display()
        );
        stats.videos_skipped += 1;
    }

    let frame_count = frame_count_on_disk(&dirs.images_dir, &prefix)?;
    let assigned = match policy {
        SplitPolicy::Ratio(rng) => {
            assign_by_ratio(manifest, rng, frame_count, video.ratio, &prefix)?
        }
        SplitPolicy::Uniform(share) => {
            assign_uniform(manifest, frame_count, video.ratio, share, &prefix)?
        }
    };
    stats.frames_assigned += assigned;
    info!("Successfully created train-val-test split for {}.", prefix);
    Ok(())
}
