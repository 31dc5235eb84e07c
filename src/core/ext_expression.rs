//! Background face-expression inference with a cadenced dispatch gate.
//!
//! One worker thread owns the service client. The frame loop hands it at
//! most one job at a time; results come back as wholesale summary
//! snapshots over a channel, so the loop never reads state the worker is
//! still writing.

use std::sync::mpsc::{sync_channel, Receiver, SyncSender, TrySendError};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use colored::{Color, Colorize};
use once_cell::sync::Lazy;

use super::status::StatusBar;
use super::vision::{ExpressionService, ExpressionSet, FaceAnnotation, NUM_EXPRESSIONS};

static STA_ON: Lazy<Arc<str>> = Lazy::new(|| format!("{}", "FACE".color(Color::Green)).into());
static STA_OFF: Lazy<Arc<str>> = Lazy::new(|| format!("{}", "FACE".color(Color::Red)).into());

/// Headwearer snapshots require at least this headwear ordinal.
pub const HEADWEAR_MIN_ORDINAL: u8 = 2;

/// Outcome of the most recent successful inference call.
#[derive(Debug, Clone)]
pub struct ExpressionSummary {
    pub faces: Vec<FaceAnnotation>,
    /// Mean likelihood ordinal per expression, indexed by `Expression`.
    /// All 1.0 when no face was detected: a deliberate neutral-ish
    /// fallback rather than a "no signal" zero.
    pub averages: [f32; NUM_EXPRESSIONS],
    /// Expressions of the face with the highest headwear likelihood, when
    /// that likelihood clears [`HEADWEAR_MIN_ORDINAL`].
    pub headwearer: Option<ExpressionSet>,
}

impl Default for ExpressionSummary {
    fn default() -> Self {
        Self {
            faces: Vec::new(),
            averages: [1.0; NUM_EXPRESSIONS],
            headwearer: None,
        }
    }
}

/// Derive averages and the headwearer snapshot from one call's face list.
pub fn summarize(faces: Vec<FaceAnnotation>) -> ExpressionSummary {
    let mut averages = [1.0; NUM_EXPRESSIONS];
    if !faces.is_empty() {
        for (i, slot) in averages.iter_mut().enumerate() {
            let sum: f32 = faces
                .iter()
                .map(|f| f.expressions.levels[i].ordinal() as f32)
                .sum();
            *slot = sum / faces.len() as f32;
        }
    }

    let mut headwearer = None;
    let mut max_headwear = 0u8;
    for face in &faces {
        let headwear = face.expressions.headwear.ordinal();
        if headwear > max_headwear && headwear >= HEADWEAR_MIN_ORDINAL {
            max_headwear = headwear;
            headwearer = Some(face.expressions.clone());
        }
    }

    ExpressionSummary {
        averages,
        headwearer,
        faces,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WorkerState {
    Idle,
    InFlight,
}

/// Dispatch gate: a new job needs both the wall-clock cadence and an idle
/// worker. The cadence alone (the reference behavior) would let a slow
/// call overlap the next one.
struct DispatchGate {
    state: WorkerState,
    interval: Duration,
    last_dispatch: Instant,
}

impl DispatchGate {
    fn new(interval: Duration) -> Self {
        Self {
            state: WorkerState::Idle,
            interval,
            last_dispatch: Instant::now(),
        }
    }

    fn try_arm(&mut self, now: Instant) -> bool {
        if self.state == WorkerState::Idle
            && now.saturating_duration_since(self.last_dispatch) >= self.interval
        {
            self.state = WorkerState::InFlight;
            self.last_dispatch = now;
            true
        } else {
            false
        }
    }

    fn settle(&mut self) {
        self.state = WorkerState::Idle;
    }
}

pub struct ExtExpression {
    jobs: SyncSender<Vec<u8>>,
    results: Receiver<Option<ExpressionSummary>>,
    gate: DispatchGate,
    summary: ExpressionSummary,
    last_result: Option<Instant>,
}

impl ExtExpression {
    pub fn new(service: Box<dyn ExpressionService>, interval: Duration) -> Self {
        let (jobs, job_receiver) = sync_channel::<Vec<u8>>(1);
        let (result_sender, results) = sync_channel(4);

        thread::spawn(move || worker_loop(job_receiver, result_sender, service));

        Self {
            jobs,
            results,
            gate: DispatchGate::new(interval),
            summary: ExpressionSummary::default(),
            last_result: None,
        }
    }

    /// Per-frame step: absorb any finished result, maybe dispatch the
    /// current frame, and report liveness to the status bar.
    pub fn step(&mut self, image_jpeg: &[u8], status: &mut StatusBar) {
        if let Some(outcome) = self.results.try_iter().last() {
            self.gate.settle();
            if let Some(summary) = outcome {
                self.summary = summary;
                self.last_result = Some(Instant::now());
            }
        }

        if !image_jpeg.is_empty() && self.gate.try_arm(Instant::now()) {
            match self.jobs.try_send(image_jpeg.to_vec()) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    // bounded to one outstanding job; the gate should make this unreachable
                    log::debug!("expression job queue full, skipping frame");
                    self.gate.settle();
                }
                Err(TrySendError::Disconnected(_)) => {
                    log::warn!("expression worker has exited");
                    self.gate.settle();
                }
            }
        }

        let alive = self
            .last_result
            .map(|at| at.elapsed() < Duration::from_secs(3))
            .unwrap_or(false);
        status.add_item(if alive { STA_ON.clone() } else { STA_OFF.clone() });
    }

    /// Most recent published snapshot; the neutral default until the first
    /// successful call completes.
    pub fn summary(&self) -> &ExpressionSummary {
        &self.summary
    }
}

fn worker_loop(
    jobs: Receiver<Vec<u8>>,
    results: SyncSender<Option<ExpressionSummary>>,
    service: Box<dyn ExpressionService>,
) {
    while let Ok(image) = jobs.recv() {
        let started = Instant::now();
        let outcome = match service.detect_faces(&image) {
            Ok(faces) => {
                log::debug!(
                    "expression call: {} face(s) in {:.2}s",
                    faces.len(),
                    started.elapsed().as_secs_f32()
                );
                Some(summarize(faces))
            }
            Err(e) => {
                log::warn!("expression call failed: {}", e);
                None
            }
        };
        if results.send(outcome).is_err() {
            return;
        }
    }
}
