// Copyright (c) Chris Gunn.
// Licensed under the MIT license.

use std::{fmt::Display, sync::Arc};

use tracing::debug;

use super::{schema::TemplateSchema, tokens::TemplateToken};
use crate::{
    diagnostics::{error_prefix, TemplateValidationError, TemplateValidationErrors},
    expressions::{data::Data, EvaluationContext, ExpressionParser, FunctionImpl},
};

pub const DEFAULT_MAX_ERRORS: usize = 100;
pub const DEFAULT_MAX_MESSAGE_LENGTH: usize = 0;

/// Per-pass state for reading or evaluating templates: the schema, collected
/// errors, the file table and values available to expressions.
pub struct TemplateContext {
    schema: Arc<TemplateSchema>,
    pub errors: TemplateValidationErrors,
    file_names: Vec<String>,
    evaluation: EvaluationContext,
    parser: ExpressionParser,
}

impl TemplateContext {
    pub fn new(schema: Arc<TemplateSchema>) -> TemplateContext {
        TemplateContext::with_limits(schema, DEFAULT_MAX_ERRORS, DEFAULT_MAX_MESSAGE_LENGTH)
    }

    pub fn with_limits(schema: Arc<TemplateSchema>, max_errors: usize, max_message_length: usize) -> TemplateContext {
        TemplateContext {
            schema,
            errors: TemplateValidationErrors::new(max_errors, max_message_length),
            file_names: Vec::new(),
            evaluation: EvaluationContext::new(),
            parser: ExpressionParser::new(),
        }
    }

    pub fn schema(&self) -> &Arc<TemplateSchema> {
        &self.schema
    }

    pub fn parser(&self) -> &ExpressionParser {
        &self.parser
    }

    pub fn get_file_id(&mut self, file_name: &str) -> usize {
        if let Some(id) = self.file_names.iter().position(|x| x == file_name) {
            return id;
        }

        self.file_names.push(file_name.to_string());
        self.file_names.len() - 1
    }

    pub fn get_file_name(&self, file_id: usize) -> Option<&str> {
        self.file_names.get(file_id).map(String::as_str)
    }

    /// Makes a named value available to evaluated expressions.
    pub fn add_context(&mut self, name: impl Into<String>, value: Data) {
        self.evaluation.add_context(name, value);
    }

    pub fn add_function(&mut self, name: impl Into<String>, function: FunctionImpl) {
        self.evaluation.add_function(name, function);
    }

    pub fn evaluation_context(&self) -> &EvaluationContext {
        &self.evaluation
    }

    /// Whether an evaluator context entry (`github`, `hashFiles()`) can be
    /// resolved during evaluation.
    pub fn is_available(&self, entry: &str) -> bool {
        match entry.find('(') {
            Some(paren) => self.evaluation.has_function(&entry[..paren]),
            None => self.evaluation.context(entry).is_some(),
        }
    }

    /// Records an error against a token's file and position.
    pub fn error(&mut self, token: &TemplateToken, message: impl Display) {
        let file_name = token.file_id.and_then(|id| self.get_file_name(id));
        let start = token.range.map(|range| range.start);
        let prefix = error_prefix(file_name, start.map(|x| x.line), start.map(|x| x.column));
        self.add_error(TemplateValidationError::new(message.to_string(), prefix, token.range));
    }

    /// Records an error against a whole file.
    pub fn file_error(&mut self, file_id: Option<usize>, message: impl Display) {
        let file_name = file_id.and_then(|id| self.get_file_name(id));
        let prefix = error_prefix(file_name, None, None);
        self.add_error(TemplateValidationError::new(message.to_string(), prefix, None));
    }

    fn add_error(&mut self, error: TemplateValidationError) {
        debug!(message = %error.message(), "template error");
        self.errors.add(error);
    }
}
