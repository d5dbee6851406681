// Copyright (c) Chris Gunn.
// Licensed under the MIT license.

#[cfg(test)]
mod tests;

use super::model::Job;
use crate::templates::{evaluate_template, TemplateContext, TemplateToken};

pub const STRATEGY: &str = "strategy";

/// Expands a job's `strategy` with the contexts registered on `context`.
/// Returns `None` for jobs without a strategy.
pub fn evaluate_strategy(context: &mut TemplateContext, job: &Job) -> Option<TemplateToken> {
    let strategy = job.strategy.as_ref()?;
    evaluate_template(context, STRATEGY, strategy, strategy.file_id)
}

/// Whether the strategy still has to be evaluated before its matrix can be
/// used.
pub fn has_unevaluated_matrix(strategy: &TemplateToken) -> bool {
    strategy.get("matrix").map_or(false, |matrix| {
        matrix.traverse().any(|x| x.is_expression())
    })
}
