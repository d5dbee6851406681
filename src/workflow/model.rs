// Copyright (c) Chris Gunn.
// Licensed under the MIT license.

use crate::{diagnostics::TemplateValidationError, templates::TemplateToken};

pub const DEFAULT_CONDITION: &str = "success()";

/// A converted workflow. Values that may still hold expressions are kept as
/// tokens so they can be evaluated later.
#[derive(Clone, Debug, Default)]
pub struct WorkflowTemplate {
    pub name: Option<String>,
    pub run_name: Option<TemplateToken>,
    pub events: Vec<String>,
    pub env: Option<TemplateToken>,
    pub defaults: Option<TemplateToken>,
    pub concurrency: Option<TemplateToken>,
    pub permissions: Option<TemplateToken>,
    pub jobs: Vec<Job>,
    pub errors: Vec<TemplateValidationError>,
}

impl WorkflowTemplate {
    pub fn job(&self, id: &str) -> Option<&Job> {
        self.jobs.iter().find(|x| x.id == id)
    }
}

#[derive(Clone, Debug)]
pub struct Job {
    pub id: String,
    pub name: Option<TemplateToken>,
    /// String tokens naming the jobs this one waits for.
    pub needs: Vec<TemplateToken>,
    pub condition: String,
    pub strategy: Option<TemplateToken>,
    pub concurrency: Option<TemplateToken>,
    pub permissions: Option<TemplateToken>,
    pub kind: JobKind,
}

impl Job {
    pub fn new(id: impl Into<String>, kind: JobKind) -> Job {
        Job {
            id: id.into(),
            name: None,
            needs: Vec::new(),
            condition: DEFAULT_CONDITION.to_string(),
            strategy: None,
            concurrency: None,
            permissions: None,
            kind,
        }
    }

    pub fn need_ids(&self) -> impl Iterator<Item = &str> {
        self.needs.iter().filter_map(TemplateToken::as_str)
    }
}

#[derive(Clone, Debug)]
pub enum JobKind {
    /// Runs its own steps on a runner.
    Steps(Box<StepsJob>),
    /// Calls a reusable workflow.
    Reusable(ReusableJob),
}

#[derive(Clone, Debug, Default)]
pub struct StepsJob {
    pub runs_on: Option<TemplateToken>,
    pub environment: Option<TemplateToken>,
    pub outputs: Option<TemplateToken>,
    pub env: Option<TemplateToken>,
    pub defaults: Option<TemplateToken>,
    pub timeout_minutes: Option<TemplateToken>,
    pub continue_on_error: Option<TemplateToken>,
    pub container: Option<TemplateToken>,
    pub services: Option<TemplateToken>,
    pub steps: Vec<Step>,
}

#[derive(Clone, Debug, Default)]
pub struct ReusableJob {
    pub uses: String,
    pub with: Option<TemplateToken>,
    pub secrets: Option<TemplateToken>,
}

#[derive(Clone, Debug)]
pub struct Step {
    pub id: String,
    pub name: Option<TemplateToken>,
    pub condition: String,
    pub continue_on_error: Option<TemplateToken>,
    pub timeout_minutes: Option<TemplateToken>,
    pub env: Option<TemplateToken>,
    pub action: StepAction,
}

#[derive(Clone, Debug)]
pub enum StepAction {
    Run {
        script: TemplateToken,
        shell: Option<TemplateToken>,
        working_directory: Option<TemplateToken>,
    },
    Uses {
        uses: String,
        with: Option<TemplateToken>,
    },
}
