//! Render job controller.
//!
//! Owns the project status machine around a pipeline run:
//!
//! ```text
//! draft | completed | failed ──generate──▶ processing ──▶ completed
//!                                                    └──▶ failed
//! ```
//!
//! Preconditions are checked before `processing` is written, so a rejected
//! request leaves the status untouched. Once a run has entered
//! `processing` it always ends in a terminal status: the run lives on its
//! own task, so a caller that stops waiting does not stop the run.
//! Every status write is checked against [`ProjectStatus::can_transition_to`].

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use metrics::{counter, histogram};
use tokio::task::{JoinError, JoinHandle};
use tracing::{error, warn, Instrument};

use reel_models::{ProjectId, ProjectStatus, RenderProject};

use crate::context::RenderContext;
use crate::error::{RenderError, RenderResult};
use crate::logging::JobLogger;
use crate::output::video_url;
use crate::pipeline::{run_pipeline, ClipTally, PipelineOutput};

/// Result of one generation run that reached a terminal status.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderOutcome {
    pub project_id: ProjectId,
    /// `Completed` or `Failed`
    pub status: ProjectStatus,
    /// Reference recorded on the project when completed
    pub video_url: Option<String>,
    pub output_path: Option<PathBuf>,
    pub clips_rendered: usize,
    pub clips_failed: usize,
    /// Failure cause when the run failed
    pub error: Option<String>,
    pub elapsed: Duration,
}

impl RenderOutcome {
    pub fn is_success(&self) -> bool {
        self.status == ProjectStatus::Completed
    }
}

/// Runs generations, at most one at a time per project.
#[derive(Clone)]
pub struct RenderController {
    ctx: Arc<RenderContext>,
    in_flight: Arc<Mutex<HashSet<ProjectId>>>,
}

/// Marks a project as being generated until dropped.
struct InFlightGuard {
    set: Arc<Mutex<HashSet<ProjectId>>>,
    project_id: ProjectId,
}

impl InFlightGuard {
    fn acquire(set: &Arc<Mutex<HashSet<ProjectId>>>, project_id: &ProjectId) -> Option<Self> {
        let mut projects = set.lock().unwrap_or_else(|e| e.into_inner());
        if !projects.insert(project_id.clone()) {
            return None;
        }
        Some(Self {
            set: Arc::clone(set),
            project_id: project_id.clone(),
        })
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        let mut projects = self.set.lock().unwrap_or_else(|e| e.into_inner());
        projects.remove(&self.project_id);
    }
}

/// A run that passed its preconditions and is now `processing`.
struct AcceptedRun {
    project: RenderProject,
    _guard: InFlightGuard,
    started: Instant,
}

impl RenderController {
    pub fn new(ctx: RenderContext) -> Self {
        Self {
            ctx: Arc::new(ctx),
            in_flight: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    pub fn context(&self) -> &RenderContext {
        &self.ctx
    }

    /// Whether a generation is running for `project_id` in this process.
    pub fn is_generating(&self, project_id: &ProjectId) -> bool {
        self.in_flight
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(project_id)
    }

    /// Generate the project's video and wait for the run to finish.
    ///
    /// Errors are returned only for rejected requests; a run that started
    /// reports its terminal status in the outcome. Dropping the returned
    /// future abandons the wait, not the run.
    pub async fn generate(&self, project_id: &ProjectId) -> RenderResult<RenderOutcome> {
        let started = Instant::now();
        let handle = self.generate_detached(project_id).await?;
        Ok(match handle.await {
            Ok(outcome) => outcome,
            Err(e) => self.aborted_outcome(project_id, e, started.elapsed()).await,
        })
    }

    /// Accept a generation and finish it on a background task.
    ///
    /// Returns once the project is `processing`. The task reaches a
    /// terminal status even if the handle is dropped.
    pub async fn generate_detached(
        &self,
        project_id: &ProjectId,
    ) -> RenderResult<JoinHandle<RenderOutcome>> {
        let run = self.accept(project_id).await?;
        let controller = self.clone();
        Ok(tokio::spawn(async move { controller.execute(run).await }))
    }

    async fn accept(&self, project_id: &ProjectId) -> RenderResult<AcceptedRun> {
        let guard = InFlightGuard::acquire(&self.in_flight, project_id)
            .ok_or_else(|| RenderError::AlreadyProcessing(project_id.clone()))?;

        let project = self
            .ctx
            .store
            .find_project(project_id)
            .await?
            .ok_or_else(|| RenderError::ProjectNotFound(project_id.clone()))?;

        if !project.has_images() {
            return Err(RenderError::validation("No images uploaded"));
        }
        project.settings()?;

        let mut status = project.status;
        if !status.can_start_generation() {
            // Nothing in this process owns the run, so it died mid-flight
            warn!(project_id = %project_id, "Project was left processing by an earlier run, regenerating");
            self.set_status(project_id, status, ProjectStatus::Failed).await?;
            status = ProjectStatus::Failed;
        }
        self.set_status(project_id, status, ProjectStatus::Processing).await?;

        Ok(AcceptedRun {
            project,
            _guard: guard,
            started: Instant::now(),
        })
    }

    async fn execute(&self, run: AcceptedRun) -> RenderOutcome {
        let logger = JobLogger::new(&run.project.id, "generate");
        let span = logger.create_span();
        self.execute_logged(run, logger).instrument(span).await
    }

    async fn execute_logged(&self, run: AcceptedRun, logger: JobLogger) -> RenderOutcome {
        let project = &run.project;
        logger.log_start(&format!(
            "{} images, {}s, {}",
            project.images.len(),
            project.duration,
            project.resolution
        ));

        let mut tally = ClipTally::default();
        let result = self.run_and_record(project, &logger, &mut tally).await;
        let elapsed = run.started.elapsed();
        histogram!("reel_render_duration_seconds").record(elapsed.as_secs_f64());

        match result {
            Ok((output, url)) => {
                counter!("reel_render_jobs_total", "status" => "completed").increment(1);
                logger.log_completion(&format!(
                    "{} in {:.1}s ({} clips skipped)",
                    output.file_name,
                    elapsed.as_secs_f64(),
                    output.clips.failed
                ));
                completed_outcome(&project.id, output, url, elapsed)
            }
            Err(e) => {
                counter!("reel_render_jobs_total", "status" => "failed").increment(1);
                let message = e.detailed_message();
                logger.log_error(&format!("{} stage failed: {}", e.stage(), message));

                if let Err(store_err) = self
                    .set_status(&project.id, ProjectStatus::Processing, ProjectStatus::Failed)
                    .await
                {
                    logger.log_error(&format!("Could not record failed status: {}", store_err));
                }

                RenderOutcome {
                    project_id: project.id.clone(),
                    status: ProjectStatus::Failed,
                    video_url: None,
                    output_path: None,
                    clips_rendered: tally.rendered,
                    clips_failed: tally.failed,
                    error: Some(message),
                    elapsed,
                }
            }
        }
    }

    /// Record `failed` for a run whose task ended without an outcome.
    async fn aborted_outcome(
        &self,
        project_id: &ProjectId,
        err: JoinError,
        elapsed: Duration,
    ) -> RenderOutcome {
        error!(project_id = %project_id, "Render task ended without an outcome: {}", err);
        counter!("reel_render_jobs_total", "status" => "failed").increment(1);

        if let Err(store_err) = self
            .set_status(project_id, ProjectStatus::Processing, ProjectStatus::Failed)
            .await
        {
            error!(project_id = %project_id, "Could not record failed status: {}", store_err);
        }

        RenderOutcome {
            project_id: project_id.clone(),
            status: ProjectStatus::Failed,
            video_url: None,
            output_path: None,
            clips_rendered: 0,
            clips_failed: 0,
            error: Some(format!("Render task aborted: {}", err)),
            elapsed,
        }
    }

    /// Write `to` after checking it is a legal move from `from`.
    async fn set_status(
        &self,
        project_id: &ProjectId,
        from: ProjectStatus,
        to: ProjectStatus,
    ) -> RenderResult<()> {
        check_transition(from, to)?;
        self.ctx.store.update_status(project_id, to).await?;
        Ok(())
    }

    /// Run the pipeline, then record the output reference and `completed`.
    async fn run_and_record(
        &self,
        project: &RenderProject,
        logger: &JobLogger,
        tally: &mut ClipTally,
    ) -> RenderResult<(PipelineOutput, String)> {
        let output = run_pipeline(&self.ctx, project, logger, tally).await?;
        let url = video_url(&self.ctx.config.video_url_prefix, &output.file_name);
        self.ctx
            .store
            .update_output_reference(&project.id, &url)
            .await?;
        self.set_status(&project.id, ProjectStatus::Processing, ProjectStatus::Completed)
            .await?;
        Ok((output, url))
    }
}

fn check_transition(from: ProjectStatus, to: ProjectStatus) -> RenderResult<()> {
    if from.can_transition_to(to) {
        Ok(())
    } else {
        Err(RenderError::InvalidTransition { from, to })
    }
}

fn completed_outcome(
    project_id: &ProjectId,
    output: PipelineOutput,
    url: String,
    elapsed: Duration,
) -> RenderOutcome {
    RenderOutcome {
        project_id: project_id.clone(),
        status: ProjectStatus::Completed,
        video_url: Some(url),
        output_path: Some(output.output_path),
        clips_rendered: output.clips.rendered,
        clips_failed: output.clips.failed,
        error: None,
        elapsed,
    }
}
