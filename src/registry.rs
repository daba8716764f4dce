// src/registry.rs
use chrono::{DateTime, Utc};
use log::debug;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::demo::demo_before;
use crate::models::{
    ImageReference, InputImage, OptionSet, ProgressState, RestorationOutcome, RunEvent, RunPhase,
};
use crate::orchestrator::{Orchestrator, RestorationContext};

#[derive(Debug, Clone, Serialize)]
pub struct RunSnapshot {
    pub run_id: Uuid,
    pub phase: RunPhase,
    pub progress: ProgressState,
    pub options: OptionSet,
    pub demo: bool,
    pub before: ImageReference,
    pub outcome: Option<RestorationOutcome>,
    pub created_at: DateTime<Utc>,
}

struct RunEntry {
    options: OptionSet,
    demo: bool,
    before: ImageReference,
    created_at: DateTime<Utc>,
    orchestrator: Orchestrator,
    outcome: Arc<Mutex<Option<RestorationOutcome>>>,
}

/// How long a finished run stays readable before it is dropped.
pub const DEFAULT_RUN_RETENTION: Duration = Duration::from_secs(600);

/// In-memory map of restoration runs, keyed by run id.
///
/// Finished runs are evicted `retention` after their outcome arrives.
#[derive(Clone)]
pub struct RunRegistry {
    context: RestorationContext,
    retention: Duration,
    runs: Arc<RwLock<HashMap<Uuid, RunEntry>>>,
}

impl RunRegistry {
    pub fn new(context: RestorationContext) -> Self {
        Self::with_retention(context, DEFAULT_RUN_RETENTION)
    }

    pub fn with_retention(context: RestorationContext, retention: Duration) -> Self {
        Self {
            context,
            retention,
            runs: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn is_live(&self) -> bool {
        self.context.model.is_some()
    }

    pub async fn create(&self, image: Option<InputImage>, options: OptionSet) -> Uuid {
        let run_id = Uuid::new_v4();
        let demo = image.is_none() || !self.is_live();
        let before = match &image {
            Some(image) => self.context.processor.encode(image).into_reference(),
            None => demo_before(),
        };

        let (orchestrator, mut events) = Orchestrator::new(self.context.clone());
        let outcome = Arc::new(Mutex::new(None));

        let sink = Arc::clone(&outcome);
        let runs = Arc::clone(&self.runs);
        let retention = self.retention;
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                if let RunEvent::Finished(result) = event {
                    *sink.lock().unwrap_or_else(PoisonError::into_inner) = Some(result);

                    tokio::time::sleep(retention).await;
                    if runs.write().await.remove(&run_id).is_some() {
                        debug!("evicted finished run {}", run_id);
                    }
                    return;
                }
            }
            debug!("event stream for run {} closed", run_id);
        });

        orchestrator.start(image, options);

        self.runs.write().await.insert(
            run_id,
            RunEntry {
                options,
                demo,
                before,
                created_at: Utc::now(),
                orchestrator,
                outcome,
            },
        );

        run_id
    }

    pub async fn snapshot(&self, run_id: &Uuid) -> Option<RunSnapshot> {
        let runs = self.runs.read().await;
        let entry = runs.get(run_id)?;
        let outcome = entry
            .outcome
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        Some(RunSnapshot {
            run_id: *run_id,
            // the outcome lands after the phase flips, report both consistently
            phase: match (&outcome, entry.orchestrator.phase()) {
                (None, RunPhase::Completed | RunPhase::Failed) => RunPhase::Running,
                (_, phase) => phase,
            },
            progress: entry.orchestrator.progress(),
            options: entry.options,
            demo: entry.demo,
            before: entry.before.clone(),
            outcome,
            created_at: entry.created_at,
        })
    }

    /// Cancels and forgets a run.
    pub async fn cancel(&self, run_id: &Uuid) -> bool {
        match self.runs.write().await.remove(run_id) {
            Some(entry) => {
                entry.orchestrator.cancel();
                true
            }
            None => false,
        }
    }

    pub async fn len(&self) -> usize {
        self.runs.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TickerConfig;
    use crate::demo::demo_after;
    use crate::services::image_processor::ImageProcessor;
    use crate::template::RestorationTemplate;
    use std::time::Duration;

    fn registry() -> RunRegistry {
        RunRegistry::new(RestorationContext {
            model: None,
            processor: Arc::new(ImageProcessor::new(1 << 20)),
            template: Arc::new(RestorationTemplate::baseline()),
            ticker: TickerConfig::default(),
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_demo_run_lifecycle() {
        let registry = registry();
        let run_id = registry.create(None, OptionSet::default()).await;

        let snapshot = registry.snapshot(&run_id).await.unwrap();
        assert_eq!(snapshot.phase, RunPhase::Running);
        assert!(snapshot.demo);
        assert_eq!(snapshot.before, demo_before());
        assert!(snapshot.outcome.is_none());

        tokio::time::sleep(Duration::from_secs(5)).await;
        let snapshot = registry.snapshot(&run_id).await.unwrap();
        assert_eq!(snapshot.phase, RunPhase::Completed);
        assert_eq!(snapshot.progress.percent, 100);
        assert_eq!(
            snapshot.outcome,
            Some(RestorationOutcome::Success(demo_after()))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_finished_runs_are_evicted_after_retention() {
        let registry = RunRegistry::with_retention(
            registry().context,
            Duration::from_secs(60),
        );
        let mut run_ids = Vec::new();
        for _ in 0..5 {
            run_ids.push(registry.create(None, OptionSet::default()).await);
        }
        assert_eq!(registry.len().await, 5);

        // finished, still within the retention window
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(registry.len().await, 5);
        let snapshot = registry.snapshot(&run_ids[0]).await.unwrap();
        assert_eq!(snapshot.phase, RunPhase::Completed);

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(registry.len().await, 0);
        for run_id in &run_ids {
            assert!(registry.snapshot(run_id).await.is_none());
            assert!(!registry.cancel(run_id).await);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_running_runs_are_kept() {
        let registry = RunRegistry::with_retention(
            registry().context,
            Duration::from_millis(1),
        );
        let run_id = registry.create(None, OptionSet::default()).await;

        tokio::time::sleep(Duration::from_secs(2)).await;
        let snapshot = registry.snapshot(&run_id).await.unwrap();
        assert!(snapshot.outcome.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_removes_run() {
        let registry = registry();
        let run_id = registry.create(None, OptionSet::default()).await;
        assert_eq!(registry.len().await, 1);

        assert!(registry.cancel(&run_id).await);
        assert!(registry.snapshot(&run_id).await.is_none());
        assert!(!registry.cancel(&run_id).await);
        assert_eq!(registry.len().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_uploaded_photo_is_the_before_image() {
        let registry = registry();
        let image = InputImage {
            filename: Some("a.png".into()),
            content_type: Some("image/png".into()),
            data: bytes::Bytes::from_static(b"RIFF"),
        };
        let run_id = registry.create(Some(image), OptionSet::default()).await;
        let snapshot = registry.snapshot(&run_id).await.unwrap();
        assert_eq!(
            snapshot.before,
            ImageReference::Data {
                mime_type: "image/png".into(),
                data: "UklGRg==".into(),
            }
        );
        // no model configured, so the run is a demo run
        assert!(snapshot.demo);
    }
}
