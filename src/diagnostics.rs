// Copyright (c) Chris Gunn.
// Licensed under the MIT license.

// Collects the non-fatal errors produced while reading or evaluating a template.


use std::fmt;

use anyhow::{anyhow, Error};

use crate::templates::tokens::TokenRange;

const TRUNCATED_SUFFIX: &str = "[...]";

#[derive(Clone, Debug, PartialEq)]
pub struct TemplateValidationError {
    pub raw_message: String,
    pub prefix: String,
    pub range: Option<TokenRange>,
}

impl TemplateValidationError {
    pub fn new(raw_message: impl Into<String>, prefix: impl Into<String>, range: Option<TokenRange>) -> Self {
        TemplateValidationError {
            raw_message: raw_message.into(),
            prefix: prefix.into(),
            range,
        }
    }

    pub fn message(&self) -> String {
        match self.prefix.is_empty() {
            true => self.raw_message.clone(),
            false => format!("{}: {}", self.prefix, self.raw_message),
        }
    }
}

impl fmt::Display for TemplateValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message())
    }
}

/// Ordered error list with optional caps on the error count and message length.
///
/// A cap of zero means unlimited. Errors beyond `max_errors` are dropped and
/// messages longer than `max_message_length` are truncated.
#[derive(Clone, Debug, Default)]
pub struct TemplateValidationErrors {
    max_errors: usize,
    max_message_length: usize,
    errors: Vec<TemplateValidationError>,
}

impl TemplateValidationErrors {
    pub fn new(max_errors: usize, max_message_length: usize) -> Self {
        TemplateValidationErrors {
            max_errors,
            max_message_length,
            errors: Vec::new(),
        }
    }

    pub fn add(&mut self, error: TemplateValidationError) {
        if self.max_errors > 0 && self.errors.len() >= self.max_errors {
            return;
        }

        let mut error = error;
        if self.max_message_length > 0 && error.raw_message.chars().count() > self.max_message_length {
            let truncated: String = error.raw_message.chars().take(self.max_message_length).collect();
            error.raw_message = format!("{}{}", truncated, TRUNCATED_SUFFIX);
        }

        self.errors.push(error);
    }

    pub fn count(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TemplateValidationError> {
        self.errors.iter()
    }

    pub fn messages(&self) -> Vec<String> {
        self.errors.iter().map(TemplateValidationError::message).collect()
    }

    pub fn clear(&mut self) {
        self.errors.clear();
    }

    pub fn into_vec(self) -> Vec<TemplateValidationError> {
        self.errors
    }

    /// Fails when any error has been collected.
    pub fn check(&self) -> Result<(), Error> {
        if self.errors.is_empty() {
            return Ok(());
        }

        let messages = self.messages().join(",");
        Err(anyhow!("The template is not valid. {}", messages))
    }
}

impl<'a> IntoIterator for &'a TemplateValidationErrors {
    type Item = &'a TemplateValidationError;
    type IntoIter = std::slice::Iter<'a, TemplateValidationError>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

pub fn error_prefix(file_name: Option<&str>, line: Option<usize>, column: Option<usize>) -> String {
    match (file_name, line, column) {
        (Some(file_name), Some(line), Some(column)) => format!("{} (Line: {}, Col: {})", file_name, line, column),
        (Some(file_name), _, _) => file_name.to_string(),
        (None, Some(line), Some(column)) => format!("(Line: {}, Col: {})", line, column),
        _ => String::new(),
    }
}
