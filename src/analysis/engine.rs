//! Mode engine
//!
//! Owns the round state: the active code set (codes sought right now), the
//! code cache (answer crops captured so far) and the reveal history (codes
//! already shown as a match this round).
//!
//! Every reveal goes through [`ModeEngine::sync_cache`], which both tick paths
//! call, so the order in which the player switches modes never loses a match.
//! Only codes that are both active and cached are ever added to the reveal
//! history; it is cleared only by a reset, so a code is revealed at most once
//! per round even if it drops out of view and comes back.

use image::RgbaImage;
use std::collections::{HashMap, HashSet};
use tracing::{debug, info};
use uuid::Uuid;

use super::events::TickReport;
use super::ScanMode;
use crate::config::AppConfig;
use crate::overlay::{RenderArea, RenderSink};
use crate::vision::{crop_code, is_code, CodeRect, CropMargins, DetectedCode};

/// Engine settings
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Crop profile for question thumbnails
    pub question_margins: CropMargins,
    /// Crop profile for answer captures
    pub answer_margins: CropMargins,
    /// Accent color for question entries
    pub question_color: String,
    /// Accent color for revealed answers
    pub answer_color: String,
    /// Whether a soft reset also drops captured answers
    pub soft_reset_clears_cache: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            question_margins: CropMargins::question(),
            answer_margins: CropMargins::answer(),
            question_color: "#ff9800".to_string(),
            answer_color: "#4caf50".to_string(),
            soft_reset_clears_cache: false,
        }
    }
}

impl EngineConfig {
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            question_margins: config.crop.question,
            answer_margins: config.crop.answer,
            question_color: config.render.question_color.clone(),
            answer_color: config.render.answer_color.clone(),
            soft_reset_clears_cache: config.reset.soft_clears_cache,
        }
    }
}

/// An answer crop remembered for a code
#[derive(Debug, Clone)]
pub struct CachedCapture {
    /// Crop taken with the answer margin profile
    pub image: RgbaImage,
    /// Rectangle the crop was taken around
    pub rect: CodeRect,
}

/// Question/answer matching state machine
pub struct ModeEngine<S: RenderSink> {
    id: Uuid,
    config: EngineConfig,
    sink: S,
    /// Sought codes in detection order
    active: Vec<String>,
    cache: HashMap<String, CachedCapture>,
    revealed: HashSet<String>,
}

impl<S: RenderSink> ModeEngine<S> {
    /// Create an engine with empty round state
    pub fn new(sink: S, config: EngineConfig) -> Self {
        let id = Uuid::new_v4();
        info!(engine = %id, "Mode engine created");
        Self {
            id,
            config,
            sink,
            active: Vec::new(),
            cache: HashMap::new(),
            revealed: HashSet::new(),
        }
    }

    /// Identifier used to tell concurrent game sessions apart in logs
    pub fn id(&self) -> Uuid {
        self.id
    }

    #[cfg(test)]
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Apply a tick in the given mode
    pub fn apply(&mut self, mode: ScanMode, frame: &RgbaImage, detected: &[DetectedCode]) -> TickReport {
        match mode {
            ScanMode::Seeking => self.on_seeking_tick(frame, detected),
            ScanMode::Matching => self.on_matching_tick(frame, detected),
        }
    }

    /// Question tick: the detected codes become the active set, the question
    /// area is redrawn, and any active code already cached is revealed.
    pub fn on_seeking_tick(&mut self, frame: &RgbaImage, detected: &[DetectedCode]) -> TickReport {
        let mut report = TickReport::new(ScanMode::Seeking);
        let detected = usable_codes(detected);

        self.active = detected.iter().map(|d| d.code.clone()).collect();

        self.sink.clear(RenderArea::Question);
        for d in &detected {
            let thumbnail = crop_code(frame, &d.rect, &self.config.question_margins);
            self.sink
                .render(RenderArea::Question, &d.code, &thumbnail, &self.config.question_color);
        }

        report.detected = self.active.clone();
        report.revealed = self.sync_cache();

        debug!(engine = %self.id, "Question tick: active {:?}", self.active);
        report
    }

    /// Answer tick: every detected code is cropped and cached, whether it is
    /// active or not, then matches are synchronized.
    pub fn on_matching_tick(&mut self, frame: &RgbaImage, detected: &[DetectedCode]) -> TickReport {
        let mut report = TickReport::new(ScanMode::Matching);
        let detected = usable_codes(detected);

        for d in &detected {
            let capture = CachedCapture {
                image: crop_code(frame, &d.rect, &self.config.answer_margins),
                rect: d.rect,
            };
            if self.cache.insert(d.code.clone(), capture).is_none() {
                info!(engine = %self.id, "Captured answer for {}", d.code);
            } else {
                debug!(engine = %self.id, "Refreshed answer for {}", d.code);
            }
            report.detected.push(d.code.clone());
            report.cached.push(d.code.clone());
        }

        report.revealed = self.sync_cache();
        report
    }

    /// Reveal every active, cached code that hasn't been revealed yet, in
    /// active-set order. Returns the codes revealed by this call.
    pub fn sync_cache(&mut self) -> Vec<String> {
        let mut newly_revealed = Vec::new();

        for code in &self.active {
            if self.revealed.contains(code) {
                continue;
            }
            let Some(capture) = self.cache.get(code) else {
                continue;
            };

            self.revealed.insert(code.clone());
            self.sink
                .render(RenderArea::Answer, code, &capture.image, &self.config.answer_color);
            info!(engine = %self.id, "Revealed match for {} captured at {}", code, capture.rect);
            newly_revealed.push(code.clone());
        }

        newly_revealed
    }

    /// Clear the round. A hard reset (or a soft one when configured so) also
    /// drops every captured answer.
    pub fn reset(&mut self, hard: bool) {
        for area in RenderArea::ALL {
            self.sink.clear(area);
        }
        self.active.clear();
        self.revealed.clear();

        let clear_cache = hard || self.config.soft_reset_clears_cache;
        if clear_cache {
            self.cache.clear();
        }

        info!(
            engine = %self.id,
            "{} reset; {} cached answer(s) kept",
            if hard { "Hard" } else { "Soft" },
            self.cache.len()
        );
    }

    /// Tear the engine down, clearing both areas, and hand back the sink
    pub fn dispose(mut self) -> S {
        for area in RenderArea::ALL {
            self.sink.clear(area);
        }
        info!(engine = %self.id, "Mode engine disposed");
        self.sink
    }

    /// Active codes in detection order
    pub fn active_codes(&self) -> &[String] {
        &self.active
    }

    #[cfg(test)]
    pub fn is_active(&self, code: &str) -> bool {
        self.active.iter().any(|c| c == code)
    }

    #[cfg(test)]
    pub fn cached(&self, code: &str) -> Option<&CachedCapture> {
        self.cache.get(code)
    }

    /// Cached codes, sorted
    pub fn cached_codes(&self) -> Vec<String> {
        let mut codes: Vec<String> = self.cache.keys().cloned().collect();
        codes.sort();
        codes
    }

    #[cfg(test)]
    pub fn is_revealed(&self, code: &str) -> bool {
        self.revealed.contains(code)
    }

    /// Revealed codes, sorted
    pub fn revealed_codes(&self) -> Vec<String> {
        let mut codes: Vec<String> = self.revealed.iter().cloned().collect();
        codes.sort();
        codes
    }
}

/// Detected codes that are well-formed, first occurrence only
fn usable_codes(detected: &[DetectedCode]) -> Vec<&DetectedCode> {
    let mut seen = HashSet::new();
    detected
        .iter()
        .filter(|d| {
            if !is_code(&d.code) {
                debug!("Ignoring malformed code {:?}", d.code);
                return false;
            }
            seen.insert(d.code.as_str())
        })
        .collect()
}
