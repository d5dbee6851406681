// Copyright (c) Chris Gunn.
// Licensed under the MIT license.

#[cfg(test)]
mod tests;

use std::collections::HashSet;

use anyhow::{bail, Error};

use super::{
    converter::{convert_condition, is_valid_identifier, INVALID_IDENTIFIER},
    model::{Step, StepAction, DEFAULT_CONDITION},
};
use crate::templates::{TemplateContext, TemplateToken};

const MAX_GENERATED_ID_LENGTH: usize = 90;

/// Converts a job's `steps` sequence. Steps without an explicit `id` are
/// given a generated one that is unique within the job.
pub fn convert_steps(context: &mut TemplateContext, token: &TemplateToken) -> Result<Vec<Step>, Error> {
    let mut steps = Vec::new();
    let mut explicit_ids: Vec<Option<TemplateToken>> = Vec::new();
    for item in token.assert_sequence("steps")? {
        match convert_step(context, item) {
            Ok(Some((step, id_token))) => {
                steps.push(step);
                explicit_ids.push(id_token);
            }
            // Already reported while reading.
            Ok(None) => {}
            Err(err) => context.error(item, err),
        }
    }

    let mut known = HashSet::new();
    for id_token in explicit_ids.iter().flatten() {
        let id = id_token.display();
        if !is_valid_identifier(&id) {
            context.error(id_token, format!("The identifier '{}' is invalid. {}", id, INVALID_IDENTIFIER));
        } else if id.starts_with("__") {
            context.error(
                id_token,
                format!("The identifier '{}' is invalid. IDs starting with '__' are reserved.", id),
            );
        }

        if !known.insert(id.to_lowercase()) {
            context.error(
                id_token,
                format!(
                    "The identifier '{}' may not be used more than once within the same scope.",
                    id
                ),
            );
        }
    }

    for step in steps.iter_mut().filter(|x| x.id.is_empty()) {
        let base = generated_id_base(&step.action);
        let mut id = base.clone();
        let mut attempt = 1;
        while !known.insert(id.to_lowercase()) {
            attempt += 1;
            id = format!("{}_{}", base, attempt);
        }
        step.id = id;
    }

    Ok(steps)
}

fn convert_step(
    context: &mut TemplateContext,
    token: &TemplateToken,
) -> Result<Option<(Step, Option<TemplateToken>)>, Error> {
    let mut id_token = None;
    let mut step = Step {
        id: String::new(),
        name: None,
        condition: DEFAULT_CONDITION.to_string(),
        continue_on_error: None,
        timeout_minutes: None,
        env: None,
        action: StepAction::Run {
            script: TemplateToken::null(None, None),
            shell: None,
            working_directory: None,
        },
    };

    let mut script = None;
    let mut shell = None;
    let mut working_directory = None;
    let mut uses = None;
    let mut with = None;

    for (key, value) in token.assert_mapping("step")? {
        let Some(key) = key.as_str() else {
            continue;
        };

        match key {
            "id" => {
                step.id = value.assert_string("step id")?.to_string();
                id_token = Some(value.clone());
            }
            "name" => step.name = Some(value.clone()),
            "if" => step.condition = convert_condition(context, value),
            "continue-on-error" => step.continue_on_error = Some(value.clone()),
            "timeout-minutes" => step.timeout_minutes = Some(value.clone()),
            "env" => step.env = Some(value.clone()),
            "run" => script = Some(value.clone()),
            "shell" => shell = Some(value.clone()),
            "working-directory" => working_directory = Some(value.clone()),
            "uses" => uses = Some(value.assert_string("step uses")?.to_string()),
            "with" => with = Some(value.clone()),
            _ => bail!("Unexpected step property '{}'", key),
        }
    }

    step.action = match (script, uses) {
        (Some(script), None) => StepAction::Run {
            script,
            shell,
            working_directory,
        },
        (None, Some(uses)) => StepAction::Uses { uses, with },
        _ => return Ok(None),
    };

    Ok(Some((step, id_token)))
}

fn generated_id_base(action: &StepAction) -> String {
    let name = match action {
        StepAction::Run { .. } => "run".to_string(),
        StepAction::Uses { uses, .. } => action_name(uses),
    };

    let mut id = String::from("__");
    id.extend(name.chars().map(|c| match c.is_ascii_alphanumeric() || c == '_' {
        true => c,
        false => '_',
    }));
    id.truncate(MAX_GENERATED_ID_LENGTH);
    id
}

// `owner/repo` for repository actions, the image for docker actions and
// `self` for actions in the same repository.
fn action_name(uses: &str) -> String {
    if let Some(image) = uses.strip_prefix("docker://") {
        return image.to_string();
    }

    if uses.starts_with("./") || uses.starts_with(".\\") {
        return "self".to_string();
    }

    let path = uses.split_once('@').map_or(uses, |(path, _)| path);
    let segments: Vec<&str> = path.split(['/', '\\']).filter(|x| !x.is_empty()).collect();
    match segments.as_slice() {
        [owner, repo, ..] => format!("{}/{}", owner, repo),
        _ => path.to_string(),
    }
}
