// src/movie.rs
//
// Snapshot animation: stitch the `m*.jpg` snapshots mumax3 writes into
// `movie.mp4` and `movie.gif` with ffmpeg.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;

use log::{info, warn};

use crate::error::{Result, ScripterError};

pub const MOVIE_MP4: &str = "movie.mp4";
pub const MOVIE_GIF: &str = "movie.gif";
const FRAME_LIST: &str = "movie_frames.txt";

#[derive(Debug, Clone)]
pub struct MovieOptions {
    pub fps: u32,
    /// Remove the snapshots once the mp4 exists.
    pub delete_frames: bool,
    pub ffmpeg: PathBuf,
}

impl Default for MovieOptions {
    fn default() -> Self {
        Self {
            fps: 10,
            delete_frames: false,
            ffmpeg: PathBuf::from("ffmpeg"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct MovieReport {
    pub mp4: PathBuf,
    pub gif: PathBuf,
    pub frames: usize,
    pub skipped: Vec<PathBuf>,
}

/// Split `images` into frames that decode and frames that don't.
pub fn check_frames(images: &[PathBuf]) -> (Vec<PathBuf>, Vec<PathBuf>) {
    info!("Checking images for corruption.");
    let mut good = Vec::with_capacity(images.len());
    let mut bad = Vec::new();
    for img in images {
        match image::open(img) {
            Ok(_) => good.push(img.clone()),
            Err(e) => {
                warn!("Bad file: {} ({})", img.display(), e);
                bad.push(img.clone());
            }
        }
    }
    (good, bad)
}

/// ffmpeg concat-demuxer input: one `file`/`duration` pair per frame. The last
/// frame is listed twice so its duration is honoured.
pub fn write_frame_list(path: &Path, frames: &[PathBuf], fps: u32) -> Result<()> {
    let mut f = fs::File::create(path)?;
    let duration = 1.0 / fps.max(1) as f64;
    for frame in frames {
        let quoted = frame.display().to_string().replace('\'', r"'\''");
        writeln!(f, "file '{}'", quoted)?;
        writeln!(f, "duration {}", duration)?;
    }
    if let Some(last) = frames.last() {
        writeln!(f, "file '{}'", last.display().to_string().replace('\'', r"'\''"))?;
    }
    Ok(())
}

fn ffmpeg(exe: &Path, list: &Path, extra: &[&str], output: &Path) -> Result<()> {
    let status = Command::new(exe)
        .args(["-y", "-loglevel", "error", "-f", "concat", "-safe", "0", "-i"])
        .arg(list)
        .args(extra)
        .arg(output)
        .status()?;
    if !status.success() {
        return Err(ScripterError::Tool {
            program: exe.display().to_string(),
            status,
        });
    }
    Ok(())
}

/// Build `movie.mp4` and `movie.gif` in `out_dir` from `images` (in order).
pub fn make_movie(images: &[PathBuf], out_dir: &Path, opts: &MovieOptions) -> Result<MovieReport> {
    let (frames, skipped) = check_frames(images);
    if frames.is_empty() {
        return Err(ScripterError::missing("readable snapshot images", out_dir));
    }

    let list = out_dir.join(FRAME_LIST);
    write_frame_list(&list, &frames, opts.fps)?;

    let mp4 = out_dir.join(MOVIE_MP4);
    let gif = out_dir.join(MOVIE_GIF);
    let fps = opts.fps.to_string();

    info!("Making mp4...");
    let result = ffmpeg(
        &opts.ffmpeg,
        &list,
        &[
            "-r",
            &fps,
            // yuv420p needs even dimensions
            "-vf",
            "pad=ceil(iw/2)*2:ceil(ih/2)*2",
            "-pix_fmt",
            "yuv420p",
        ],
        &mp4,
    )
    .and_then(|_| {
        info!("mp4 saved");
        info!("Making gif...");
        ffmpeg(&opts.ffmpeg, &list, &["-r", &fps], &gif)
    });
    let _ = fs::remove_file(&list);
    result?;
    info!("Gif saved");

    if opts.delete_frames && mp4.is_file() {
        for frame in &frames {
            if let Err(e) = fs::remove_file(frame) {
                warn!("File {} cannot be removed: {}", frame.display(), e);
            }
        }
        info!("Done removing files.");
    }

    Ok(MovieReport {
        mp4,
        gif,
        frames: frames.len(),
        skipped,
    })
}
