//! Command handlers behind the CLI
//!
//! The interactive console reads commands line by line and drives a
//! [`HuntApp`]; `scan` runs one detection over an image file.

use anyhow::{Context, Result};
use std::io::Write;
use std::path::Path;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, Lines};
use tracing::{debug, warn};

use crate::analysis::ScanMode;
use crate::app::{HuntApp, TickOutcome};
use crate::capture::{FrameSource, ImageFileSource};
use crate::hotkey;
use crate::overlay::RenderSink;
use crate::shared::HuntCommand;
use crate::vision::{crop_code, CropMargins, DetectedCode, DetectionSession};

/// Read commands from `input` until it closes or `quit` is entered
pub async fn run_console<R, S, W>(app: &mut HuntApp<S>, input: R, out: &mut W) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    S: RenderSink + 'static,
    W: Write,
{
    let mut lines = input.lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        let command = match hotkey::parse_command(&line) {
            Ok(command) => command,
            Err(e) => {
                writeln!(out, "{} (type `help` for commands)", e)?;
                continue;
            }
        };

        if command.needs_confirmation() && !confirm(&mut lines, out).await? {
            writeln!(out, "Cancelled")?;
            continue;
        }

        if !handle_command(app, command, out).await? {
            break;
        }
    }
    Ok(())
}

/// Ask before a destructive command; closed input counts as "no"
async fn confirm<R, W>(lines: &mut Lines<R>, out: &mut W) -> Result<bool>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    writeln!(out, "This also discards every captured answer. Continue? [y/N]")?;
    Ok(lines
        .next_line()
        .await?
        .is_some_and(|answer| hotkey::is_confirmation(&answer)))
}

/// Run one console command; returns `false` when the console should close
pub async fn handle_command<S, W>(
    app: &mut HuntApp<S>,
    command: HuntCommand,
    out: &mut W,
) -> Result<bool>
where
    S: RenderSink + 'static,
    W: Write,
{
    match command {
        HuntCommand::SetMode(mode) => {
            app.set_mode(mode);
            writeln!(out, "{} mode", app.mode())?;
        }
        HuntCommand::Press => {
            if !app.press() {
                writeln!(out, "Already scanning")?;
            }
        }
        HuntCommand::Release => {
            if !app.release() {
                writeln!(out, "Not scanning")?;
            }
        }
        HuntCommand::HoldFor(duration) => {
            app.hold_for(duration).await;
            app.wait_idle().await;
            writeln!(out, "{}", app.status())?;
        }
        HuntCommand::ScanOnce => match app.tick().await {
            TickOutcome::Applied(report) => {
                writeln!(out, "{}: {}", report.mode, report.detected.join(" "))?;
                if !report.cached.is_empty() {
                    writeln!(out, "Captured: {}", report.cached.join(" "))?;
                }
                if report.has_reveals() {
                    writeln!(out, "Matched: {}", report.revealed.join(" "))?;
                }
            }
            TickOutcome::Dropped => writeln!(out, "A scan is already running")?,
            TickOutcome::NoFrame => {
                let status = app.status();
                writeln!(
                    out,
                    "No frame: {}",
                    status.last_error.as_deref().unwrap_or("unknown error")
                )?;
            }
            TickOutcome::Disposed => {}
        },
        HuntCommand::Reset { hard } => {
            app.reset(hard);
            writeln!(out, "{}", if hard { "Hard reset" } else { "Reset" })?;
        }
        HuntCommand::Status => writeln!(out, "{}", app.status())?,
        HuntCommand::Help => writeln!(out, "{}", hotkey::HELP)?,
        HuntCommand::Quit => return Ok(false),
    }
    Ok(true)
}

/// Detect the codes in one image, printing each. With `save`, a crop per code
/// is written using `margins`.
pub async fn scan_image<W: Write>(
    session: &DetectionSession,
    image: &Path,
    mode: ScanMode,
    margins: &CropMargins,
    save: Option<&Path>,
    out: &mut W,
) -> Result<Vec<DetectedCode>> {
    let frame = ImageFileSource::open(image)?.capture().await?;
    let detected = session.detect(&frame).await;

    if detected.is_empty() {
        writeln!(out, "No codes found in {}", image.display())?;
        return Ok(detected);
    }

    if let Some(dir) = save {
        std::fs::create_dir_all(dir).with_context(|| format!("Failed to create {:?}", dir))?;
    }

    for code in &detected {
        writeln!(out, "{}  at {}", code.code, code.rect)?;

        let Some(dir) = save else {
            continue;
        };
        let crop = crop_code(&frame.image, &code.rect, margins);
        if crop.width() == 0 || crop.height() == 0 {
            warn!("Crop for {} is empty; not saved", code.code);
            continue;
        }
        let path = dir.join(format!("{}_{}.png", code.code, mode.label()));
        crop.save(&path)
            .with_context(|| format!("Failed to write {:?}", path))?;
        debug!("Saved crop {:?}", path);
    }

    Ok(detected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{EngineConfig, ModeEngine};
    use crate::capture::frame::CapturedFrame;
    use crate::capture::StaticFrameSource;
    use crate::overlay::MemorySink;
    use crate::vision::{RecognizerError, TextRecognizer, TextToken};
    use async_trait::async_trait;
    use image::{Rgba, RgbaImage};
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::tempdir;
    use tokio::io::BufReader;

    /// Sees the same codes in every frame
    struct FixedRecognizer(Vec<TextToken>);

    impl FixedRecognizer {
        fn session(codes: &[&str]) -> DetectionSession {
            let tokens = codes
                .iter()
                .enumerate()
                .map(|(i, code)| TextToken::with_box(*code, 10.0 + i as f32 * 80.0, 10.0, 50.0, 20.0))
                .collect();
            DetectionSession::new(Arc::new(Self(tokens)))
        }
    }

    #[async_trait]
    impl TextRecognizer for FixedRecognizer {
        async fn recognize(&self, _frame: &CapturedFrame) -> Result<Vec<TextToken>, RecognizerError> {
            Ok(self.0.clone())
        }

        fn name(&self) -> &str {
            "fixed"
        }
    }

    fn hunt(codes: &[&str]) -> HuntApp<MemorySink> {
        HuntApp::new(
            ModeEngine::new(MemorySink::new(), EngineConfig::default()),
            FixedRecognizer::session(codes),
            Arc::new(StaticFrameSource::new(CapturedFrame::new(RgbaImage::new(320, 240)))),
            Duration::from_secs(1),
            ScanMode::Seeking,
        )
    }

    async fn run_script(app: &mut HuntApp<MemorySink>, script: &str) -> String {
        let mut out = Vec::new();
        run_console(app, BufReader::new(script.as_bytes()), &mut out)
            .await
            .unwrap();
        String::from_utf8(out).unwrap()
    }

    #[tokio::test]
    async fn test_console_answer_then_question_matches() {
        let mut app = hunt(&["123"]);

        let output = run_script(&mut app, "a\ns\nq\ns\n").await;

        assert!(output.contains("answer mode"));
        assert!(output.contains("Captured: 123"));
        assert!(output.contains("question: 123"));
        assert!(output.contains("Matched: 123"));
        assert_eq!(app.status().revealed, vec!["123"]);
    }

    #[tokio::test]
    async fn test_hard_reset_declined_keeps_cache() {
        let mut app = hunt(&["123"]);

        let output = run_script(&mut app, "a\ns\nhard-reset\nno\n").await;

        assert!(output.contains("Continue? [y/N]"));
        assert!(output.contains("Cancelled"));
        assert_eq!(app.status().cached, vec!["123"]);
    }

    #[tokio::test]
    async fn test_hard_reset_confirmed_clears_cache() {
        let mut app = hunt(&["123"]);
        run_script(&mut app, "a\ns\n").await;

        let output = run_script(&mut app, "HARD-RESET\nyes\n").await;

        assert!(output.contains("Hard reset"));
        assert!(app.status().cached.is_empty());
    }

    #[tokio::test]
    async fn test_hard_reset_with_closed_input_is_cancelled() {
        let mut app = hunt(&["123"]);
        run_script(&mut app, "a\ns\n").await;

        let output = run_script(&mut app, "hard-reset\n").await;

        assert!(output.contains("Cancelled"));
        assert_eq!(app.status().cached, vec!["123"]);
    }

    #[tokio::test]
    async fn test_soft_reset_needs_no_confirmation() {
        let mut app = hunt(&["123"]);
        run_script(&mut app, "a\ns\nq\ns\n").await;

        let output = run_script(&mut app, "reset\nstatus\n").await;

        assert!(!output.contains("Continue?"));
        assert!(output.contains("Reset"));
        let status = app.status();
        assert!(status.revealed.is_empty());
        assert_eq!(status.cached, vec!["123"]);
    }

    #[tokio::test]
    async fn test_console_reports_bad_input_and_stops_at_quit() {
        let mut app = hunt(&["123"]);

        let output = run_script(&mut app, "jump\n\nhold 1 2\nquit\ns\n").await;

        assert!(output.contains("Unknown command: jump (type `help` for commands)"));
        assert!(output.contains("Too many arguments"));
        assert_eq!(app.status().ticks_completed, 0);
    }

    #[tokio::test]
    async fn test_press_and_release_commands() {
        let mut app = hunt(&["123"]);

        let output = run_script(&mut app, "release\npress\npress\n").await;
        assert!(output.contains("Not scanning"));
        assert!(output.contains("Already scanning"));
        assert!(app.status().holding);

        run_script(&mut app, "release\n").await;
        assert!(!app.status().holding);
        app.wait_idle().await;
    }

    #[tokio::test]
    async fn test_status_and_help() {
        let mut app = hunt(&[]);

        let output = run_script(&mut app, "status\nhelp\n").await;

        assert!(output.contains("mode: question"));
        assert!(output.contains("hard-reset"));
    }

    fn write_frame(dir: &Path) -> std::path::PathBuf {
        let path = dir.join("frame.png");
        RgbaImage::from_pixel(200, 100, Rgba([40, 80, 120, 255]))
            .save(&path)
            .unwrap();
        path
    }

    #[tokio::test]
    async fn test_scan_image_lists_codes() {
        let dir = tempdir().unwrap();
        let image = write_frame(dir.path());
        let mut out = Vec::new();

        let detected = scan_image(
            &FixedRecognizer::session(&["123"]),
            &image,
            ScanMode::Seeking,
            &CropMargins::question(),
            None,
            &mut out,
        )
        .await
        .unwrap();

        assert_eq!(detected.len(), 1);
        let output = String::from_utf8(out).unwrap();
        assert!(output.contains("123  at (10, 10, 50x20)"));
    }

    #[tokio::test]
    async fn test_scan_image_saves_crops_with_mode_margins() {
        let dir = tempdir().unwrap();
        let image = write_frame(dir.path());
        let crops = dir.path().join("crops");
        let mut out = Vec::new();

        scan_image(
            &FixedRecognizer::session(&["123"]),
            &image,
            ScanMode::Matching,
            &CropMargins::answer(),
            Some(&crops),
            &mut out,
        )
        .await
        .unwrap();

        let saved = image::open(crops.join("123_answer.png")).unwrap();
        // x: 0..92, y: 2..100 after clamping to the 200x100 frame
        assert_eq!((saved.width(), saved.height()), (92, 98));
    }

    #[tokio::test]
    async fn test_scan_image_without_codes() {
        let dir = tempdir().unwrap();
        let image = write_frame(dir.path());
        let mut out = Vec::new();

        let detected = scan_image(
            &FixedRecognizer::session(&[]),
            &image,
            ScanMode::Seeking,
            &CropMargins::question(),
            None,
            &mut out,
        )
        .await
        .unwrap();

        assert!(detected.is_empty());
        assert!(String::from_utf8(out).unwrap().starts_with("No codes found"));
    }

    #[tokio::test]
    async fn test_scan_missing_image_fails() {
        let dir = tempdir().unwrap();
        let mut out = Vec::new();

        let result = scan_image(
            &FixedRecognizer::session(&["123"]),
            &dir.path().join("missing.png"),
            ScanMode::Seeking,
            &CropMargins::question(),
            None,
            &mut out,
        )
        .await;

        assert!(result.is_err());
    }
}
