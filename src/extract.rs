//! Splitting a video into numbered frame images.

use log::{debug, info};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::error::{Error, Result};
use crate::io::count_files;

/// Produces `<prefix>1.jpg`, `<prefix>2.jpg`, ... in `images_dir` and reports how
/// many frames were written.
pub trait FrameExtractor {
    fn extract(&self, video: &Path, images_dir: &Path, prefix: &str) -> Result<u32>;
}

/// Extracts frames by running the `ffmpeg` executable.
#[derive(Debug, Clone)]
pub struct FfmpegExtractor {
    program: PathBuf,
}

impl Default for FfmpegExtractor {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

impl FfmpegExtractor {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn command(&self, video: &Path, images_dir: &Path, prefix: &str) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.arg("-i")
            .arg(video)
            .arg(format!("{}%d.jpg", prefix))
            .current_dir(images_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::null());
        cmd
    }
}

impl FrameExtractor for FfmpegExtractor {
    fn extract(&self, video: &Path, images_dir: &Path, prefix: &str) -> Result<u32> {
        let video = video.canonicalize().map_err(Error::io(video))?;
        let mut cmd = self.command(&video, images_dir, prefix);
        debug!("Running {:?}", cmd);

        let output = cmd.output().map_err(Error::io(&self.program))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let last_line = stderr.lines().last().unwrap_or_default();
            return Err(Error::Io {
                path: video.clone(),
                source: std::io::Error::new(
                    std::io::ErrorKind::Other,
                    format!("frame extraction failed ({}): {}", output.status, last_line),
                ),
            });
        }

        let frames = count_files(images_dir, prefix)?;
        info!("Extracted {} frames from {}", frames, video.display());
        u32::try_from(frames)
            .map_err(|_| Error::Config(format!("too many frames in {}", video.display())))
    }
}
