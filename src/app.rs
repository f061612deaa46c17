//! Application Coordinator
//!
//! Drives scans against the mode engine: single ticks, the press-and-hold
//! repeat loop, and resets. At most one scan is in flight at a time; a tick
//! requested while another is pending is dropped. Releasing the hold stops
//! further repeats but lets an in-flight scan finish and apply its result.

use parking_lot::{Mutex, RwLock};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::analysis::{ModeEngine, ScanMode, TickReport};
use crate::capture::FrameSource;
use crate::overlay::RenderSink;
use crate::shared::SharedHuntState;
use crate::vision::DetectionSession;

/// How a requested tick ended
#[derive(Debug, Clone)]
pub enum TickOutcome {
    /// The scan ran and its result was applied
    Applied(TickReport),
    /// Another scan was in flight; nothing ran
    Dropped,
    /// No frame could be captured
    NoFrame,
    /// The engine was disposed while the scan was running
    Disposed,
}

impl TickOutcome {
    #[cfg(test)]
    pub fn report(&self) -> Option<&TickReport> {
        match self {
            TickOutcome::Applied(report) => Some(report),
            _ => None,
        }
    }
}

/// Snapshot of the hunt for display
#[derive(Debug, Clone)]
pub struct HuntStatus {
    pub mode: ScanMode,
    pub holding: bool,
    pub active: Vec<String>,
    pub cached: Vec<String>,
    pub revealed: Vec<String>,
    pub last_detected: Vec<String>,
    pub ticks_completed: u64,
    pub ticks_dropped: u64,
    pub last_error: Option<String>,
}

impl fmt::Display for HuntStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "mode: {}{}",
            self.mode,
            if self.holding { " (scanning)" } else { "" }
        )?;
        writeln!(f, "questions: {}", join_codes(&self.active))?;
        writeln!(f, "matches:   {}", join_codes(&self.revealed))?;
        writeln!(f, "captured:  {}", join_codes(&self.cached))?;
        writeln!(f, "last scan: {}", join_codes(&self.last_detected))?;
        write!(
            f,
            "ticks: {} completed, {} dropped",
            self.ticks_completed, self.ticks_dropped
        )?;
        if let Some(error) = &self.last_error {
            write!(f, "\nlast error: {}", error)?;
        }
        Ok(())
    }
}

fn join_codes(codes: &[String]) -> String {
    if codes.is_empty() {
        "-".to_string()
    } else {
        codes.join(" ")
    }
}

/// Releases the in-flight flag when the tick ends, however it ends
struct InFlightGuard<'a>(&'a AtomicBool);

impl<'a> InFlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Everything a tick needs, shared with spawned repeat tasks
struct TickRunner<S: RenderSink> {
    engine: Mutex<Option<ModeEngine<S>>>,
    session: DetectionSession,
    source: Arc<dyn FrameSource>,
    state: RwLock<SharedHuntState>,
    in_flight: AtomicBool,
}

impl<S: RenderSink> TickRunner<S> {
    async fn run(&self) -> TickOutcome {
        let Some(_guard) = InFlightGuard::acquire(&self.in_flight) else {
            self.state.write().runtime.ticks_dropped += 1;
            debug!("Scan already in flight; dropping tick");
            return TickOutcome::Dropped;
        };

        // Mode at capture time decides how the frame is used
        let mode = self.state.read().mode;

        let frame = match self.source.capture().await {
            Ok(frame) => frame,
            Err(e) => {
                warn!("Frame capture from {} failed: {}", self.source.describe(), e);
                self.state.write().runtime.set_error(e.to_string());
                return TickOutcome::NoFrame;
            }
        };

        let detected = self.session.detect(&frame).await;

        let report = {
            let mut engine = self.engine.lock();
            let Some(engine) = engine.as_mut() else {
                debug!("Engine disposed during scan; discarding result");
                return TickOutcome::Disposed;
            };
            engine.apply(mode, &frame.image, &detected)
        };

        {
            let mut state = self.state.write();
            state.runtime.ticks_completed += 1;
            state.runtime.last_detected = report.detected.clone();
            state.runtime.clear_error();
        }

        debug!(
            "{} tick: detected {:?}, revealed {:?}",
            mode, report.detected, report.revealed
        );
        TickOutcome::Applied(report)
    }

    fn with_engine<R>(&self, f: impl FnOnce(&mut ModeEngine<S>) -> R) -> Option<R> {
        self.engine.lock().as_mut().map(f)
    }
}

/// The running repeat loop of a held scan button
struct HoldTask {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

/// Scan driver owning one game session
pub struct HuntApp<S: RenderSink + 'static> {
    runner: Arc<TickRunner<S>>,
    interval: Duration,
    hold: Option<HoldTask>,
}

impl<S: RenderSink + 'static> HuntApp<S> {
    /// Create a driver around an engine, a detection session and a frame source
    pub fn new(
        engine: ModeEngine<S>,
        session: DetectionSession,
        source: Arc<dyn FrameSource>,
        interval: Duration,
        mode: ScanMode,
    ) -> Self {
        info!(
            engine = %engine.id(),
            "Scanning {} via {} every {:?}",
            source.describe(),
            session.backend(),
            interval
        );
        Self {
            runner: Arc::new(TickRunner {
                engine: Mutex::new(Some(engine)),
                session,
                source,
                state: RwLock::new(SharedHuntState::new(mode)),
                in_flight: AtomicBool::new(false),
            }),
            interval,
            hold: None,
        }
    }

    /// Switch the mode used by ticks that start from now on
    pub fn set_mode(&self, mode: ScanMode) {
        let mut state = self.runner.state.write();
        if state.mode != mode {
            info!("Switched to {} mode", mode);
        }
        state.mode = mode;
    }

    pub fn mode(&self) -> ScanMode {
        self.runner.state.read().mode
    }

    /// Run one guarded scan now
    pub async fn tick(&self) -> TickOutcome {
        self.runner.run().await
    }

    /// Whether a scan is currently in flight
    pub fn is_scanning(&self) -> bool {
        self.runner.in_flight.load(Ordering::Acquire)
    }

    /// Start scanning: one tick now, then one every interval until released.
    /// Returns `false` if already held.
    pub fn press(&mut self) -> bool {
        if self.hold.is_some() {
            return false;
        }

        let token = CancellationToken::new();
        let cancelled = token.clone();
        let runner = Arc::clone(&self.runner);
        let interval = self.interval;

        let handle = tokio::spawn(async move {
            loop {
                // Each tick runs on its own so a slow scan drops repeats
                // instead of stretching the cadence
                let tick_runner = Arc::clone(&runner);
                tokio::spawn(async move {
                    tick_runner.run().await;
                });

                tokio::select! {
                    _ = cancelled.cancelled() => break,
                    _ = tokio::time::sleep(interval) => {}
                }
            }
        });

        self.runner.state.write().runtime.is_holding = true;
        self.hold = Some(HoldTask { token, handle });
        info!("Scan pressed");
        true
    }

    /// Stop repeating. An in-flight scan still completes and applies.
    /// Returns `false` if nothing was held.
    pub fn release(&mut self) -> bool {
        let Some(hold) = self.hold.take() else {
            return false;
        };
        hold.token.cancel();
        self.runner.state.write().runtime.is_holding = false;
        info!("Scan released");
        true
    }

    /// Press, keep scanning for `duration`, release
    pub async fn hold_for(&mut self, duration: Duration) {
        self.press();
        tokio::time::sleep(duration).await;
        self.release();
    }

    /// Wait until no scan is in flight
    pub async fn wait_idle(&self) {
        while self.is_scanning() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    /// Clear the round; `hard` also drops every captured answer
    pub fn reset(&self, hard: bool) {
        self.runner.with_engine(|engine| engine.reset(hard));
    }

    /// Read-only access to the engine, if not yet disposed
    pub fn inspect<R>(&self, f: impl FnOnce(&ModeEngine<S>) -> R) -> Option<R> {
        self.runner.with_engine(|engine| f(engine))
    }

    /// Snapshot of the hunt
    pub fn status(&self) -> HuntStatus {
        let state = self.runner.state.read().clone();
        let (active, cached, revealed) = self
            .inspect(|engine| {
                (
                    engine.active_codes().to_vec(),
                    engine.cached_codes(),
                    engine.revealed_codes(),
                )
            })
            .unwrap_or_default();

        HuntStatus {
            mode: state.mode,
            holding: state.runtime.is_holding,
            active,
            cached,
            revealed,
            last_detected: state.runtime.last_detected,
            ticks_completed: state.runtime.ticks_completed,
            ticks_dropped: state.runtime.ticks_dropped,
            last_error: state.runtime.last_error,
        }
    }

    /// Stop scanning, let the in-flight scan finish, and dispose the engine.
    /// Returns the render sink.
    pub async fn shutdown(mut self) -> Option<S> {
        if let Some(hold) = self.hold.take() {
            hold.token.cancel();
            if let Err(e) = hold.handle.await {
                warn!("Scan loop ended abnormally: {}", e);
            }
        }
        self.wait_idle().await;

        let engine = self.runner.engine.lock().take();
        engine.map(ModeEngine::dispose)
    }
}

impl<S: RenderSink + 'static> Drop for HuntApp<S> {
    fn drop(&mut self) {
        if let Some(hold) = self.hold.take() {
            hold.token.cancel();
        }
    }
}
