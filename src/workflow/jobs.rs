// Copyright (c) Chris Gunn.
// Licensed under the MIT license.


use std::collections::{HashSet, VecDeque};

use tracing::debug;

use super::model::Job;
use crate::templates::{TemplateContext, TemplateToken};

/// Checks that every job's `needs` can be satisfied. Jobs without outstanding
/// needs are resolved one at a time, striking their id from the jobs still
/// waiting. Whatever is left over is either an unknown job or part of a cycle,
/// reported once per unresolved need.
pub fn validate_needs(context: &mut TemplateContext, jobs_token: &TemplateToken, jobs: &[Job]) {
    let mut ready: VecDeque<&Job> = VecDeque::new();
    let mut waiting: Vec<(&Job, Vec<&TemplateToken>)> = Vec::new();
    for job in jobs {
        match job.needs.is_empty() {
            true => ready.push_back(job),
            false => waiting.push((job, job.needs.iter().collect())),
        }
    }

    if ready.is_empty() {
        context.error(
            jobs_token,
            "The workflow must contain at least one job with no dependencies.",
        );
        return;
    }

    while let Some(resolved) = ready.pop_front() {
        let mut index = 0;
        while index < waiting.len() {
            let (job, needs) = &mut waiting[index];
            needs.retain(|need| need.as_str() != Some(resolved.id.as_str()));
            if needs.is_empty() {
                ready.push_back(*job);
                waiting.remove(index);
            } else {
                index += 1;
            }
        }
    }

    let known: HashSet<&str> = jobs.iter().map(|x| x.id.as_str()).collect();
    for (job, needs) in waiting {
        for need in needs {
            let name = need.display();
            let message = match known.contains(name.as_str()) {
                true => format!(
                    "Job '{}' depends on job '{}' which creates a cycle in the dependency graph.",
                    job.id, name
                ),
                false => format!("Job '{}' depends on unknown job '{}'.", job.id, name),
            };
            context.error(need, message);
        }
    }

    debug!(jobs = jobs.len(), "validated job dependencies");
}
