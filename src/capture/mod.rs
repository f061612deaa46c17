//! Frame Capture Layer
//!
//! Supplies the current camera frame on demand. Device acquisition itself is
//! done elsewhere; this crate reads frames that a camera tool keeps writing
//! to disk, or serves a fixed image.

pub mod frame;

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use thiserror::Error;
use tracing::{debug, info};

use frame::CapturedFrame;

/// File extensions accepted when reading frames from a directory
const FRAME_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp", "webp"];

/// Errors raised while acquiring a frame
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("no frames available at {0}")]
    NoFrames(PathBuf),
    #[error("failed to read frame source: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to decode frame {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("frame decoding task failed: {0}")]
    Task(String),
}

/// Something that can hand out the current frame
#[async_trait]
pub trait FrameSource: Send + Sync {
    /// Capture the frame visible right now
    async fn capture(&self) -> Result<CapturedFrame, CaptureError>;

    /// Human readable description for logs
    fn describe(&self) -> String;
}

/// Where an [`ImageFileSource`] reads from
#[derive(Debug)]
enum FileTarget {
    /// A single file, re-read on every capture
    Single(PathBuf),
    /// Sorted frame files, served round-robin
    Sequence { files: Vec<PathBuf>, next: AtomicUsize },
}

/// Frame source backed by image files on disk
#[derive(Debug)]
pub struct ImageFileSource {
    root: PathBuf,
    target: FileTarget,
}

impl ImageFileSource {
    /// Open a file or a directory of frames
    pub fn open(path: &Path) -> Result<Self, CaptureError> {
        let target = if path.is_dir() {
            let files = list_frame_files(path)?;
            if files.is_empty() {
                return Err(CaptureError::NoFrames(path.to_path_buf()));
            }
            info!("Serving {} frames from {:?}", files.len(), path);
            FileTarget::Sequence {
                files,
                next: AtomicUsize::new(0),
            }
        } else if path.is_file() {
            info!("Serving frames from {:?}", path);
            FileTarget::Single(path.to_path_buf())
        } else {
            return Err(CaptureError::NoFrames(path.to_path_buf()));
        };

        Ok(Self {
            root: path.to_path_buf(),
            target,
        })
    }

    /// Number of distinct frames this source cycles through
    pub fn frame_count(&self) -> usize {
        match &self.target {
            FileTarget::Single(_) => 1,
            FileTarget::Sequence { files, .. } => files.len(),
        }
    }

    fn next_path(&self) -> PathBuf {
        match &self.target {
            FileTarget::Single(path) => path.clone(),
            FileTarget::Sequence { files, next } => {
                let index = next.fetch_add(1, Ordering::Relaxed) % files.len();
                files[index].clone()
            }
        }
    }
}

#[async_trait]
impl FrameSource for ImageFileSource {
    async fn capture(&self) -> Result<CapturedFrame, CaptureError> {
        let path = self.next_path();
        debug!("Capturing frame from {:?}", path);

        tokio::task::spawn_blocking(move || {
            image::open(&path)
                .map(CapturedFrame::from_dynamic)
                .map_err(|source| CaptureError::Decode { path, source })
        })
        .await
        .map_err(|e| CaptureError::Task(e.to_string()))?
    }

    fn describe(&self) -> String {
        format!("{} ({} frame(s))", self.root.display(), self.frame_count())
    }
}

/// Frame source that always returns the same image
#[cfg(test)]
#[derive(Debug, Clone)]
pub struct StaticFrameSource {
    frame: CapturedFrame,
}

#[cfg(test)]
impl StaticFrameSource {
    pub fn new(frame: CapturedFrame) -> Self {
        Self { frame }
    }
}

#[cfg(test)]
#[async_trait]
impl FrameSource for StaticFrameSource {
    async fn capture(&self) -> Result<CapturedFrame, CaptureError> {
        Ok(CapturedFrame::new(self.frame.image.clone()))
    }

    fn describe(&self) -> String {
        let (w, h) = self.frame.dimensions();
        format!("static {}x{} frame", w, h)
    }
}

/// List frame files in a directory, sorted by name
fn list_frame_files(dir: &Path) -> Result<Vec<PathBuf>, CaptureError> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file() && is_frame_file(path))
        .collect();
    files.sort();
    Ok(files)
}

fn is_frame_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| FRAME_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}
