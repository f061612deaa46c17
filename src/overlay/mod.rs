//! Presentation Layer
//!
//! Render sinks receive the question and answer thumbnails produced by the
//! mode engine. The engine only ever hands out copies; sinks never see or
//! mutate engine state.

pub mod widgets;

use image::RgbaImage;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use widgets::{accent_color, framed_thumbnail};

/// The two lists shown to the player
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RenderArea {
    /// Codes currently sought
    Question,
    /// Confirmed matches
    Answer,
}

impl RenderArea {
    pub const ALL: [RenderArea; 2] = [RenderArea::Question, RenderArea::Answer];

    pub fn as_str(&self) -> &'static str {
        match self {
            RenderArea::Question => "question",
            RenderArea::Answer => "answer",
        }
    }
}

impl fmt::Display for RenderArea {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Destination for rendered entries
pub trait RenderSink: Send {
    /// Append an entry for `code` to `area`
    fn render(&mut self, area: RenderArea, code: &str, image: &RgbaImage, color: &str);

    /// Remove every entry from `area`
    fn clear(&mut self, area: RenderArea);
}

impl<S: RenderSink + ?Sized> RenderSink for Box<S> {
    fn render(&mut self, area: RenderArea, code: &str, image: &RgbaImage, color: &str) {
        (**self).render(area, code, image, color)
    }

    fn clear(&mut self, area: RenderArea) {
        (**self).clear(area)
    }
}

/// An entry as handed to a sink
#[cfg(test)]
#[derive(Debug, Clone)]
pub struct RenderEntry {
    pub code: String,
    pub image: RgbaImage,
    pub color: String,
}

/// Sink that keeps entries in memory
#[cfg(test)]
#[derive(Debug, Default)]
pub struct MemorySink {
    question: Vec<RenderEntry>,
    answer: Vec<RenderEntry>,
}

#[cfg(test)]
impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Entries currently shown in an area, oldest first
    pub fn entries(&self, area: RenderArea) -> &[RenderEntry] {
        match area {
            RenderArea::Question => &self.question,
            RenderArea::Answer => &self.answer,
        }
    }

    /// Codes currently shown in an area, oldest first
    pub fn codes(&self, area: RenderArea) -> Vec<&str> {
        self.entries(area).iter().map(|e| e.code.as_str()).collect()
    }

    fn area_mut(&mut self, area: RenderArea) -> &mut Vec<RenderEntry> {
        match area {
            RenderArea::Question => &mut self.question,
            RenderArea::Answer => &mut self.answer,
        }
    }
}

#[cfg(test)]
impl RenderSink for MemorySink {
    fn render(&mut self, area: RenderArea, code: &str, image: &RgbaImage, color: &str) {
        self.area_mut(area).push(RenderEntry {
            code: code.to_string(),
            image: image.clone(),
            color: color.to_string(),
        });
    }

    fn clear(&mut self, area: RenderArea) {
        self.area_mut(area).clear();
    }
}

/// Sink that writes framed thumbnails as PNG files, one directory per area.
///
/// Files are named `<seq>_<code>.png` so a directory listing shows entries in
/// render order. I/O failures are logged and otherwise ignored.
#[derive(Debug)]
pub struct DirectorySink {
    root: PathBuf,
    seq: u64,
}

impl DirectorySink {
    /// Create the area directories under `root`, removing stale thumbnails
    pub fn create(root: &Path) -> anyhow::Result<Self> {
        for area in RenderArea::ALL {
            std::fs::create_dir_all(root.join(area.as_str()))?;
        }

        let mut sink = Self {
            root: root.to_path_buf(),
            seq: 0,
        };
        for area in RenderArea::ALL {
            sink.clear(area);
        }

        info!("Rendering thumbnails to {:?}", root);
        Ok(sink)
    }

    /// Directory holding an area's thumbnails
    pub fn area_dir(&self, area: RenderArea) -> PathBuf {
        self.root.join(area.as_str())
    }
}

impl RenderSink for DirectorySink {
    fn render(&mut self, area: RenderArea, code: &str, image: &RgbaImage, color: &str) {
        if image.width() == 0 || image.height() == 0 {
            debug!("Skipping empty thumbnail for {} in {} area", code, area);
            return;
        }
        self.seq += 1;

        let path = self
            .area_dir(area)
            .join(format!("{:05}_{}.png", self.seq, code));
        let framed = framed_thumbnail(image, accent_color(color));

        match framed.save(&path) {
            Ok(()) => debug!("Rendered {} to {:?}", code, path),
            Err(e) => warn!("Failed to write thumbnail {:?}: {}", path, e),
        }
    }

    fn clear(&mut self, area: RenderArea) {
        let dir = self.area_dir(area);
        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Failed to list {:?}: {}", dir, e);
                return;
            }
        };

        for path in entries.filter_map(|e| e.ok().map(|e| e.path())) {
            if path.extension().and_then(|ext| ext.to_str()) != Some("png") {
                continue;
            }
            if let Err(e) = std::fs::remove_file(&path) {
                warn!("Failed to remove {:?}: {}", path, e);
            }
        }
    }
}
