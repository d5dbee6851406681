// Copyright (c) Chris Gunn.
// Licensed under the MIT license.

// Maps a validated workflow token tree onto workflow, job and step records.

#[cfg(test)]
mod tests;

use anyhow::{anyhow, Error};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use super::{
    jobs::validate_needs,
    model::{Job, JobKind, ReusableJob, StepsJob, WorkflowTemplate, DEFAULT_CONDITION},
    steps::convert_steps,
};
use crate::{
    expressions::STATUS_FUNCTIONS,
    templates::{TemplateContext, TemplateToken, TokenKind},
};

const MAX_IDENTIFIER_LENGTH: usize = 100;

pub const INVALID_IDENTIFIER: &str = "IDs may only contain alphanumeric characters, '_', and '-'. IDs must start with a letter or '_' and must be less than 100 characters.";

static IDENTIFIER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[_a-zA-Z][a-zA-Z0-9_-]*$").expect("identifier pattern"));

pub fn is_valid_identifier(id: &str) -> bool {
    id.len() < MAX_IDENTIFIER_LENGTH && IDENTIFIER.is_match(id)
}

/// Converts the output of reading `workflow-root`. Problems are recorded in
/// `context`; the returned workflow carries a copy of every error collected so
/// far.
pub fn convert_workflow(context: &mut TemplateContext, token: &TemplateToken) -> WorkflowTemplate {
    let mut workflow = WorkflowTemplate::default();

    match token.assert_mapping("workflow root") {
        Ok(pairs) => {
            for (key, value) in pairs {
                let Some(key) = key.as_str() else {
                    continue;
                };

                let result = match key {
                    "name" => value
                        .assert_string("name")
                        .map(|name| workflow.name = Some(name.to_string())),
                    "run-name" => {
                        workflow.run_name = Some(value.clone());
                        Ok(())
                    }
                    "on" => convert_events(value).map(|events| workflow.events = events),
                    "env" => {
                        workflow.env = Some(value.clone());
                        Ok(())
                    }
                    "defaults" => {
                        workflow.defaults = Some(value.clone());
                        Ok(())
                    }
                    "concurrency" => {
                        workflow.concurrency = Some(value.clone());
                        Ok(())
                    }
                    "permissions" => {
                        workflow.permissions = Some(value.clone());
                        Ok(())
                    }
                    "jobs" => convert_jobs(context, value).map(|jobs| {
                        validate_needs(context, value, &jobs);
                        workflow.jobs = jobs;
                    }),
                    _ => Err(anyhow!("Unexpected workflow property '{}'", key)),
                };

                if let Err(err) = result {
                    context.error(value, err);
                }
            }
        }
        Err(err) => context.error(token, err),
    }

    debug!(
        events = workflow.events.len(),
        jobs = workflow.jobs.len(),
        "converted workflow"
    );
    workflow.errors = context.errors.iter().cloned().collect();
    workflow
}

/// Event names from the string, sequence or mapping form of `on`.
pub fn convert_events(token: &TemplateToken) -> Result<Vec<String>, Error> {
    match &token.kind {
        TokenKind::String(event) => Ok(vec![event.value.clone()]),
        TokenKind::Sequence(items) => items
            .iter()
            .map(|x| x.assert_string("on").map(str::to_string))
            .collect(),
        TokenKind::Mapping(pairs) => pairs
            .iter()
            .map(|(key, _)| key.assert_string("on").map(str::to_string))
            .collect(),
        _ => Err(token.assert_unexpected_value("on")),
    }
}

/// The condition text of an `if`. Conditions that do not check the status of
/// earlier work only run on success.
pub fn convert_condition(context: &TemplateContext, token: &TemplateToken) -> String {
    let condition = match &token.kind {
        TokenKind::BasicExpression(expression) => expression.expression.trim().to_string(),
        _ => token.display().trim().to_string(),
    };

    if condition.is_empty() {
        return DEFAULT_CONDITION.to_string();
    }

    let checks_status = context
        .parser()
        .parse(&condition)
        .map_or(false, |expr| expr.calls_any_function(&STATUS_FUNCTIONS));

    match checks_status {
        true => condition,
        false => format!("{} && ({})", DEFAULT_CONDITION, condition),
    }
}

fn convert_jobs(context: &mut TemplateContext, token: &TemplateToken) -> Result<Vec<Job>, Error> {
    let mut jobs = Vec::new();
    for (key, value) in token.assert_mapping("jobs")? {
        let Some(id) = key.as_str() else {
            continue;
        };

        if !is_valid_identifier(id) {
            context.error(key, format!("The identifier '{}' is invalid. {}", id, INVALID_IDENTIFIER));
        }

        match convert_job(context, id, value) {
            Ok(job) => jobs.push(job),
            Err(err) => context.error(value, err),
        }
    }
    Ok(jobs)
}

fn convert_job(context: &mut TemplateContext, id: &str, token: &TemplateToken) -> Result<Job, Error> {
    let pairs = token.assert_mapping("job")?;
    let reusable = pairs.iter().any(|(key, _)| key.as_str() == Some("uses"));
    let mut steps_job = StepsJob::default();
    let mut reusable_job = ReusableJob::default();
    let mut job = Job::new(id, JobKind::Reusable(ReusableJob::default()));

    for (key, value) in pairs {
        let Some(key) = key.as_str() else {
            continue;
        };

        let value_token = Some(value.clone());
        match key {
            "name" => job.name = value_token,
            "needs" => job.needs = convert_needs(value)?,
            "if" => job.condition = convert_condition(context, value),
            "strategy" => job.strategy = value_token,
            "concurrency" => job.concurrency = value_token,
            "permissions" => job.permissions = value_token,
            "runs-on" => steps_job.runs_on = value_token,
            "environment" => steps_job.environment = value_token,
            "outputs" => steps_job.outputs = value_token,
            "env" => steps_job.env = value_token,
            "defaults" => steps_job.defaults = value_token,
            "timeout-minutes" => steps_job.timeout_minutes = value_token,
            "continue-on-error" => steps_job.continue_on_error = value_token,
            "container" => steps_job.container = value_token,
            "services" => steps_job.services = value_token,
            "steps" => steps_job.steps = convert_steps(context, value)?,
            "uses" => reusable_job.uses = value.assert_string("uses")?.to_string(),
            "with" => reusable_job.with = value_token,
            "secrets" => reusable_job.secrets = value_token,
            _ => return Err(anyhow!("Unexpected job property '{}'", key)),
        }
    }

    job.kind = match reusable {
        true => JobKind::Reusable(reusable_job),
        false => JobKind::Steps(Box::new(steps_job)),
    };
    Ok(job)
}

fn convert_needs(token: &TemplateToken) -> Result<Vec<TemplateToken>, Error> {
    match &token.kind {
        TokenKind::String(_) => Ok(vec![token.clone()]),
        TokenKind::Sequence(items) => items
            .iter()
            .map(|x| x.assert_string("needs item").map(|_| x.clone()))
            .collect(),
        _ => Err(token.assert_unexpected_value("needs")),
    }
}
