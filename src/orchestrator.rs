// src/orchestrator.rs
//! Lifecycle of one restoration run.
//!
//! A run drives two futures side by side: the cosmetic progress ticker and
//! the request pipeline. The ticker holds at the soft cap until the pipeline
//! settles, then runs to 100%. The outcome is delivered once both are done
//! and the grace delay has passed. Events go out on an unbounded channel;
//! every send happens under the run lock after checking the phase, so nothing
//! is emitted once `cancel` has returned.
use log::{debug, error, info, trace, warn};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::{mpsc, watch};
use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;

use crate::config::TickerConfig;
use crate::demo::demo_after;
use crate::errors::FailureReason;
use crate::models::{
    InputImage, OptionSet, ProgressState, RestorationOutcome, RestorationRequest, RunEvent,
    RunPhase,
};
use crate::services::config_deriver::derive;
use crate::services::gemini::ImageModel;
use crate::services::image_processor::ImageProcessor;
use crate::template::RestorationTemplate;

/// Collaborators shared by every run.
#[derive(Clone)]
pub struct RestorationContext {
    /// `None` forces every run down the demo path.
    pub model: Option<Arc<dyn ImageModel>>,
    pub processor: Arc<ImageProcessor>,
    pub template: Arc<RestorationTemplate>,
    pub ticker: TickerConfig,
}

struct RunState {
    phase: RunPhase,
    progress: ProgressState,
    events: Option<mpsc::UnboundedSender<RunEvent>>,
}

struct RunShared {
    state: Mutex<RunState>,
}

impl RunShared {
    fn lock(&self) -> MutexGuard<'_, RunState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, progress: ProgressState) {
        let mut state = self.lock();
        if state.phase != RunPhase::Running || state.progress == progress {
            return;
        }
        trace!("progress {}% (settled: {})", progress.percent, progress.settled);
        state.progress = progress;
        if let Some(events) = &state.events {
            let _ = events.send(RunEvent::Progress(progress));
        }
    }

    fn finish(&self, outcome: RestorationOutcome) {
        let mut state = self.lock();
        if state.phase != RunPhase::Running {
            debug!("dropping outcome of a run that is no longer running");
            return;
        }
        state.phase = if outcome.is_success() {
            RunPhase::Completed
        } else {
            RunPhase::Failed
        };
        if let Some(events) = state.events.take() {
            let _ = events.send(RunEvent::Finished(outcome));
        }
    }
}

/// Owns a single restoration run.
///
/// Start it once; a second `start` is ignored. Dropping the orchestrator
/// cancels the run.
pub struct Orchestrator {
    context: RestorationContext,
    shared: Arc<RunShared>,
    cancel: CancellationToken,
}

impl Orchestrator {
    pub fn new(context: RestorationContext) -> (Self, mpsc::UnboundedReceiver<RunEvent>) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let orchestrator = Self {
            context,
            shared: Arc::new(RunShared {
                state: Mutex::new(RunState {
                    phase: RunPhase::Idle,
                    progress: ProgressState::default(),
                    events: Some(events_tx),
                }),
            }),
            cancel: CancellationToken::new(),
        };
        (orchestrator, events_rx)
    }

    pub fn phase(&self) -> RunPhase {
        self.shared.lock().phase
    }

    pub fn progress(&self) -> ProgressState {
        self.shared.lock().progress
    }

    /// Begins the run. Must be called from within a tokio runtime.
    ///
    /// Returns `false` without doing anything unless the run is idle.
    pub fn start(&self, image: Option<InputImage>, options: OptionSet) -> bool {
        {
            let mut state = self.shared.lock();
            if state.phase != RunPhase::Idle {
                debug!("ignoring start, run is {:?}", state.phase);
                return false;
            }
            state.phase = RunPhase::Running;
        }

        info!(
            "Starting restoration run ({}) with options {:?}",
            if image.is_some() { "live" } else { "demo" },
            options
        );

        let context = self.context.clone();
        let shared = Arc::clone(&self.shared);
        let cancel = self.cancel.clone();

        tokio::spawn(async move {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    debug!("restoration run torn down");
                }
                outcome = drive(&context, &shared, image, options) => {
                    shared.finish(outcome);
                }
            }
        });

        true
    }

    /// Stops the run. No event is emitted after this returns.
    ///
    /// Returns `false` if the run had already finished or been cancelled.
    pub fn cancel(&self) -> bool {
        let cancelled = {
            let mut state = self.shared.lock();
            if state.phase.is_terminal() {
                false
            } else {
                state.phase = RunPhase::Cancelled;
                state.events = None;
                true
            }
        };
        self.cancel.cancel();
        if cancelled {
            info!("Restoration run cancelled");
        }
        cancelled
    }
}

impl Drop for Orchestrator {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn drive(
    context: &RestorationContext,
    shared: &RunShared,
    image: Option<InputImage>,
    options: OptionSet,
) -> RestorationOutcome {
    let (settled_tx, settled_rx) = watch::channel(false);

    let pipeline = async move {
        let outcome = run_pipeline(context, image, &options).await;
        let _ = settled_tx.send(true);
        outcome
    };

    let (outcome, ()) = tokio::join!(pipeline, run_ticker(context.ticker, settled_rx, shared));

    time::sleep(context.ticker.grace).await;
    outcome
}

async fn run_ticker(config: TickerConfig, settled: watch::Receiver<bool>, shared: &RunShared) {
    let steps = u64::from(config.steps());
    let period = config.period();
    let mut interval = time::interval_at(Instant::now() + period, period);
    let mut step: u64 = 0;

    loop {
        interval.tick().await;
        step += 1;

        let is_settled = *settled.borrow();
        let cap = if is_settled { 100 } else { u64::from(config.soft_cap.min(100)) };
        // rounded step / steps as a percentage
        let percent = ((step * 200 + steps) / (steps * 2)).min(cap) as u8;

        shared.publish(ProgressState {
            percent,
            settled: is_settled,
        });

        if is_settled && percent >= 100 {
            break;
        }
    }
}

async fn run_pipeline(
    context: &RestorationContext,
    image: Option<InputImage>,
    options: &OptionSet,
) -> RestorationOutcome {
    let (image, model) = match (image, context.model.as_ref()) {
        (Some(image), Some(model)) => (image, model),
        (image, _) => {
            if image.is_some() {
                warn!("No image model configured, serving the demo result");
            }
            time::sleep(context.ticker.demo_delay).await;
            return RestorationOutcome::Success(demo_after());
        }
    };

    let encoded = context.processor.encode(&image);
    let instruction = match derive(&context.template, options).to_instruction() {
        Ok(instruction) => instruction,
        Err(e) => {
            error!("Failed to build restoration instruction: {}", e);
            return RestorationOutcome::Failure(e.into());
        }
    };

    let request = RestorationRequest {
        image: encoded,
        instruction,
    };

    info!(
        "Sending {} image to {} with options {:?}",
        request.image.mime_type,
        model.name(),
        options
    );

    match model.generate(&request).await {
        Ok(response) => {
            info!("Response received from {}", model.name());
            let outcome = response.into_outcome();
            match &outcome {
                RestorationOutcome::Success(_) => {}
                RestorationOutcome::Failure(FailureReason::ModelReturnedTextOnly(text)) => {
                    warn!("Model returned text instead of an image: {}", text);
                }
                RestorationOutcome::Failure(reason) => warn!("{}", reason),
            }
            outcome
        }
        Err(e) => {
            error!("API error: {}", e);
            RestorationOutcome::Failure(e.into())
        }
    }
}
