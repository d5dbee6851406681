// Copyright (c) Chris Gunn.
// Licensed under the MIT license.

// CI workflow documents: the bundled schema, reading and conversion.

pub mod converter;
pub mod jobs;
pub mod model;
pub mod schema;
pub mod steps;
pub mod strategy;

#[cfg(test)]
mod tests;

use tracing::debug;

pub use converter::convert_workflow;
pub use jobs::validate_needs;
pub use model::{Job, JobKind, ReusableJob, Step, StepAction, StepsJob, WorkflowTemplate};
pub use schema::load_workflow_schema;
pub use strategy::evaluate_strategy;

use crate::templates::{parse_yaml_events, read_template, EventObjectReader, TemplateContext, TemplateToken};

pub const WORKFLOW_ROOT: &str = "workflow-root";

/// Reads a workflow file against `workflow-root`. YAML errors are recorded
/// against the file and yield `None`.
pub fn parse_workflow(context: &mut TemplateContext, file_name: &str, content: &str) -> Option<TemplateToken> {
    let file_id = context.get_file_id(file_name);
    let events = match parse_yaml_events(content, Some(file_id)) {
        Ok(events) => events,
        Err(err) => {
            context.file_error(Some(file_id), err);
            return None;
        }
    };

    debug!(file = file_name, events = events.len(), "parsed workflow yaml");
    let mut object_reader = EventObjectReader::new(events);
    read_template(context, WORKFLOW_ROOT, &mut object_reader, Some(file_id))
}

/// Reads and converts a workflow file in one pass.
pub fn load_workflow(context: &mut TemplateContext, file_name: &str, content: &str) -> WorkflowTemplate {
    match parse_workflow(context, file_name, content) {
        Some(token) => convert_workflow(context, &token),
        None => WorkflowTemplate {
            errors: context.errors.iter().cloned().collect(),
            ..WorkflowTemplate::default()
        },
    }
}
