//! Fail-fast refresh executor
//!
//! `DeploymentRefresher::run` walks a `RefreshPlan` strictly in order, handing
//! each step to its collaborator and waiting for it to return before starting
//! the next. The first failure ends the run:
//!
//! - steps after the failing one are never invoked
//! - steps before it are not rolled back; every step is idempotent, so the
//!   remedy is to fix the cause and run the whole refresh again

use crate::collaborator::{CollaboratorResult, Collaborators};
use crate::engine::plan::{RefreshPlan, Step};
use crate::error::Result;
use crate::types::StepKind;
use std::time::{Duration, Instant};
use tracing::{error, info};

/// A step that ran to completion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedStep {
    pub kind: StepKind,
    pub elapsed: Duration,
}

/// Outcome of a fully successful run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefreshReport {
    pub completed: Vec<CompletedStep>,
}

impl RefreshReport {
    pub fn total_elapsed(&self) -> Duration {
        self.completed.iter().map(|s| s.elapsed).sum()
    }
}

/// Executes refresh plans against a set of collaborators
pub struct DeploymentRefresher<C> {
    collaborators: C,
}

impl<C: Collaborators> DeploymentRefresher<C> {
    pub fn new(collaborators: C) -> Self {
        Self { collaborators }
    }

    pub fn collaborators(&self) -> &C {
        &self.collaborators
    }

    pub fn into_collaborators(self) -> C {
        self.collaborators
    }

    /// Run every step of `plan` in order, stopping at the first failure.
    ///
    /// The plan is validated first; an invalid plan runs nothing.
    pub fn run(&mut self, plan: &RefreshPlan) -> Result<RefreshReport> {
        plan.validate()?;
        info!(steps = plan.len(), "starting refresh");

        let mut report = RefreshReport::default();
        let total = plan.len();

        for (index, step) in plan.steps.iter().enumerate() {
            let kind = step.kind();
            info!(position = index + 1, total, step = %step, "running step");

            let started = Instant::now();
            let result = self.dispatch(step);
            let elapsed = started.elapsed();

            if let Err(e) = result {
                error!(position = index + 1, %kind, error = %e, "step failed, aborting refresh");
                return Err(e.into_refresh_error(kind));
            }

            info!(position = index + 1, %kind, ?elapsed, "step completed");
            report.completed.push(CompletedStep { kind, elapsed });
        }

        info!(elapsed = ?report.total_elapsed(), "refresh completed");
        Ok(report)
    }

    fn dispatch(&mut self, step: &Step) -> CollaboratorResult {
        let c = &mut self.collaborators;
        match step {
            Step::PullImage { image } => c.pull_image(image),
            Step::EnsureDir { path } => c.ensure_dir(path),
            Step::Chown { path, owner } => c.chown(path, owner),
            Step::StopStack { descriptor } => c.stop_stack(descriptor),
            Step::StartStack { descriptor } => c.start_stack(descriptor),
        }
    }
}
