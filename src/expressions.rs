// Copyright (c) Chris Gunn.
// Licensed under the MIT license.

// The `${{ ... }}` expression language: lexing, parsing, validation against the
// allowed context, and evaluation.

pub mod ast;
pub mod data;
pub mod evaluator;
mod functions;
mod lexer;
pub mod parser;

use thiserror::Error;

pub use ast::{BinaryOp, Expr, ExprKind, IndexKind, Literal};
pub use data::Data;
pub use evaluator::{evaluate, EvaluationContext, FunctionImpl};
pub use parser::ExpressionParser;

pub const MAX_EXPRESSION_DEPTH: usize = 50;
pub const MAX_EXPRESSION_LENGTH: usize = 21_000;

#[derive(Clone, Debug, Error, PartialEq)]
pub enum ExpressionError {
    #[error("Unexpected symbol: '{symbol}'. Located at position {position} within expression: {expression}")]
    UnexpectedSymbol {
        symbol: String,
        position: usize,
        expression: String,
    },

    #[error("Unexpected end of expression: '{expression}'")]
    UnexpectedEnd { expression: String },

    #[error("Unrecognized named-value: '{name}'. Located at position {position} within expression: {expression}")]
    UnrecognizedNamedValue {
        name: String,
        position: usize,
        expression: String,
    },

    #[error("Unrecognized function: '{name}'. Located at position {position} within expression: {expression}")]
    UnrecognizedFunction {
        name: String,
        position: usize,
        expression: String,
    },

    #[error("Too few parameters supplied: '{name}'. Located at position {position} within expression: {expression}")]
    TooFewParameters {
        name: String,
        position: usize,
        expression: String,
    },

    #[error("Too many parameters supplied: '{name}'. Located at position {position} within expression: {expression}")]
    TooManyParameters {
        name: String,
        position: usize,
        expression: String,
    },

    #[error("Exceeded max expression depth {0}")]
    MaxDepthExceeded(usize),

    #[error("Exceeded max expression length {0}")]
    MaxLengthExceeded(usize),

    #[error("{0}")]
    Evaluation(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FunctionSignature {
    pub name: String,
    pub min_args: usize,
    pub max_args: usize,
}

/// Named contexts and extra functions an expression may reference.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AllowedContext {
    pub named_contexts: Vec<String>,
    pub functions: Vec<FunctionSignature>,
}

impl AllowedContext {
    pub fn has_named_context(&self, name: &str) -> bool {
        self.named_contexts.iter().any(|x| x.eq_ignore_ascii_case(name))
    }

    pub fn function(&self, name: &str) -> Option<&FunctionSignature> {
        self.functions.iter().find(|x| x.name.eq_ignore_ascii_case(name))
    }
}

/// Splits schema context entries such as `github` and `hashFiles(1,255)` into
/// named contexts and function signatures.
///
/// Entries with malformed parameter counts (e.g. evaluator context `success()`)
/// are treated as functions accepting any number of arguments.
pub fn split_allowed_context(allowed_context: &[String]) -> AllowedContext {
    let mut result = AllowedContext::default();
    for item in allowed_context {
        let Some(paren) = item.find('(') else {
            result.named_contexts.push(item.clone());
            continue;
        };

        let name = item[..paren].to_string();
        let params = item[paren + 1..].trim_end_matches(')');
        let mut counts = params.split(',').map(|x| x.trim().parse::<usize>());
        let signature = match (counts.next(), counts.next()) {
            (Some(Ok(min_args)), Some(Ok(max_args))) => FunctionSignature {
                name,
                min_args,
                max_args,
            },
            _ => FunctionSignature {
                name,
                min_args: 0,
                max_args: usize::MAX,
            },
        };
        result.functions.push(signature);
    }
    result
}

/// Names of the functions that report job/step status. An `if` condition that
/// calls none of them is implicitly combined with `success()`.
pub const STATUS_FUNCTIONS: [&str; 4] = ["success", "failure", "cancelled", "always"];
