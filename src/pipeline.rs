//! Application state controller.
//!
//! The pipeline is a small state machine:
//!
//! ```text
//!            load                choose color            begin
//! Empty ───────────▶ Loaded ───────────────▶ ColorSelected ─────▶ Generating
//!   ▲                  ▲                        ▲      ▲              │
//!   │ reset            │ load (from any state)  │      │ acknowledge  │ failure
//!   │                  │                        │      └──── Failed ◀─┤
//!   │                  │                        │ choose color        │ success
//!   └──────────────────┴────────────────────────┴──────── Ready ◀─────┘
//!                                                          │ ▲
//!                                                          └─┘ export
//! ```
//!
//! Everything that belongs to one upload (the source image, the chosen color,
//! the generated result, the last error) lives in a `Cycle`. Loading a new
//! file drops the old cycle and retires its id, so a late completion for the
//! old cycle is recognized and discarded instead of overwriting newer state.
//!
//! At most one request is in flight. [`Controller::begin_generation`] hands out
//! a [`GenerationJob`] only from `ColorSelected` with nothing outstanding;
//! every other call is a no-op that returns `None`.

use crate::credentials::Credentials;
use crate::export::{ExportError, ExportRenderer};
use crate::generation::{GenerationError, ImageGenerator};
use crate::imaging::ImageBackend;
use crate::types::{ColorChoice, EncodedFile, EncodedImage, GenerationResult, PrintSize};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Empty,
    Loaded,
    ColorSelected,
    Generating,
    Ready,
    Failed,
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Empty => "empty",
            Self::Loaded => "loaded",
            Self::ColorSelected => "color selected",
            Self::Generating => "generating",
            Self::Ready => "ready",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("no photo loaded")]
    NoImage,
    #[error("choose a background color first")]
    NoColor,
    #[error("a generation request is already in progress")]
    Busy,
    #[error("no generated photo to export (state: {0})")]
    NotReady(PipelineState),
    #[error("nothing to acknowledge (state: {0})")]
    NotFailed(PipelineState),
    #[error(transparent)]
    Generation(#[from] GenerationError),
    #[error(transparent)]
    Export(#[from] ExportError),
}

/// Identity of one upload cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleId(u64);

/// Everything owned by one upload.
#[derive(Debug)]
struct Cycle {
    id: CycleId,
    source: EncodedImage,
    color: Option<ColorChoice>,
    result: Option<GenerationResult>,
    error: Option<GenerationError>,
}

/// Inputs for one generation request, handed out by
/// [`Controller::begin_generation`].
#[derive(Debug, Clone)]
pub struct GenerationJob {
    cycle: CycleId,
    pub image: EncodedImage,
    pub color: ColorChoice,
}

impl GenerationJob {
    pub fn cycle(&self) -> CycleId {
        self.cycle
    }
}

/// What happened to a finished request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// Applied; the controller moved to `Ready` or `Failed`.
    Applied(PipelineState),
    /// The job's cycle was replaced while it ran; the outcome was dropped.
    Discarded,
}

#[derive(Debug)]
pub struct Controller {
    state: PipelineState,
    cycle: Option<Cycle>,
    next_cycle: u64,
    in_flight: Option<CycleId>,
}

impl Default for Controller {
    fn default() -> Self {
        Self::new()
    }
}

impl Controller {
    pub fn new() -> Self {
        Self {
            state: PipelineState::Empty,
            cycle: None,
            next_cycle: 0,
            in_flight: None,
        }
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn source(&self) -> Option<&EncodedImage> {
        self.cycle.as_ref().map(|c| &c.source)
    }

    pub fn color(&self) -> Option<ColorChoice> {
        self.cycle.as_ref().and_then(|c| c.color)
    }

    pub fn result(&self) -> Option<&GenerationResult> {
        self.cycle.as_ref().and_then(|c| c.result.as_ref())
    }

    /// The error that moved the pipeline to `Failed`, until acknowledged.
    pub fn last_error(&self) -> Option<&GenerationError> {
        self.cycle.as_ref().and_then(|c| c.error.as_ref())
    }

    fn transition(&mut self, to: PipelineState) {
        if self.state != to {
            tracing::info!(from = %self.state, %to, "pipeline state");
        }
        self.state = to;
    }

    /// Start a new cycle with a validated image. Allowed from any state.
    ///
    /// The previous cycle (color, result, error) is dropped and returned so
    /// the caller can see what was released.
    pub fn load(&mut self, image: EncodedImage) -> Option<EncodedImage> {
        let id = CycleId(self.next_cycle);
        self.next_cycle += 1;
        let previous = self.cycle.replace(Cycle {
            id,
            source: image,
            color: None,
            result: None,
            error: None,
        });
        self.transition(PipelineState::Loaded);
        previous.map(|c| c.source)
    }

    /// Choose (or re-choose) the background color.
    ///
    /// Re-choosing from `Ready` or `Failed` drops the previous result or error.
    pub fn select_color(&mut self, color: ColorChoice) -> Result<(), PipelineError> {
        match self.state {
            PipelineState::Empty => Err(PipelineError::NoImage),
            PipelineState::Generating => Err(PipelineError::Busy),
            PipelineState::Loaded
            | PipelineState::ColorSelected
            | PipelineState::Ready
            | PipelineState::Failed => {
                let cycle = self.cycle.as_mut().ok_or(PipelineError::NoImage)?;
                cycle.color = Some(color);
                cycle.result = None;
                cycle.error = None;
                self.transition(PipelineState::ColorSelected);
                Ok(())
            }
        }
    }

    /// Why generation cannot start right now, if it cannot.
    pub fn generation_blocker(&self) -> Option<PipelineError> {
        if self.in_flight.is_some() {
            return Some(PipelineError::Busy);
        }
        match self.state {
            PipelineState::ColorSelected => None,
            PipelineState::Empty => Some(PipelineError::NoImage),
            PipelineState::Generating => Some(PipelineError::Busy),
            PipelineState::Loaded | PipelineState::Ready | PipelineState::Failed => {
                Some(PipelineError::NoColor)
            }
        }
    }

    /// Move to `Generating` and hand out the request inputs.
    ///
    /// Returns `None`, changing nothing, unless the state is `ColorSelected`
    /// and no request is outstanding.
    pub fn begin_generation(&mut self) -> Option<GenerationJob> {
        if self.generation_blocker().is_some() {
            tracing::debug!(state = %self.state, "generate ignored");
            return None;
        }
        let cycle = self.cycle.as_ref()?;
        let color = cycle.color?;
        let job = GenerationJob {
            cycle: cycle.id,
            image: cycle.source.clone(),
            color,
        };
        self.in_flight = Some(cycle.id);
        self.transition(PipelineState::Generating);
        Some(job)
    }

    /// Apply the outcome of a job.
    ///
    /// Outcomes for a retired cycle are dropped; the in-flight slot is
    /// released either way.
    pub fn finish_generation(
        &mut self,
        job: &GenerationJob,
        outcome: Result<EncodedImage, GenerationError>,
    ) -> Completion {
        if self.in_flight == Some(job.cycle) {
            self.in_flight = None;
        }

        let generating = self.state == PipelineState::Generating;
        let current = self
            .cycle
            .as_mut()
            .filter(|c| generating && c.id == job.cycle);
        let Some(cycle) = current else {
            tracing::warn!("discarding result of a superseded generation request");
            return Completion::Discarded;
        };

        match outcome {
            Ok(image) => {
                cycle.result = Some(GenerationResult::new(image));
                cycle.error = None;
                self.transition(PipelineState::Ready);
            }
            Err(err) => {
                tracing::error!(error = %err, "generation failed");
                cycle.error = Some(err);
                self.transition(PipelineState::Failed);
            }
        }
        Completion::Applied(self.state)
    }

    /// Dismiss a failure and return to `ColorSelected`, keeping image and color.
    pub fn acknowledge_failure(&mut self) -> Result<Option<GenerationError>, PipelineError> {
        if self.state != PipelineState::Failed {
            return Err(PipelineError::NotFailed(self.state));
        }
        let error = self.cycle.as_mut().and_then(|c| c.error.take());
        self.transition(PipelineState::ColorSelected);
        Ok(error)
    }

    /// Drop everything and return to `Empty`.
    pub fn reset(&mut self) {
        self.cycle = None;
        self.transition(PipelineState::Empty);
    }

    /// Run one generation end to end.
    ///
    /// While this future is pending the controller is mutably borrowed, so
    /// no second trigger can reach it.
    pub async fn generate<G: ImageGenerator>(
        &mut self,
        generator: &G,
        credentials: &Credentials,
    ) -> Result<&GenerationResult, PipelineError> {
        let job = match self.generation_blocker() {
            Some(blocker) => return Err(blocker),
            None => self.begin_generation().ok_or(PipelineError::NoColor)?,
        };
        let outcome = generator.generate(&job.image, job.color, credentials).await;
        self.finish_generation(&job, outcome);

        if self.state == PipelineState::Ready {
            return self.result().ok_or(PipelineError::NotReady(self.state));
        }
        // The cycle keeps its error until the failure is acknowledged.
        Err(self
            .last_error()
            .cloned()
            .map(PipelineError::Generation)
            .unwrap_or(PipelineError::NotReady(self.state)))
    }

    /// Export the current result. Only valid in `Ready`; state is unchanged.
    pub fn export<B: ImageBackend>(
        &self,
        renderer: &ExportRenderer<B>,
        size: PrintSize,
    ) -> Result<EncodedFile, PipelineError> {
        if self.state != PipelineState::Ready {
            return Err(PipelineError::NotReady(self.state));
        }
        let result = self.result().ok_or(PipelineError::NotReady(self.state))?;
        Ok(renderer.export(result.image(), size)?)
    }
}
