// Copyright (c) Chris Gunn.
// Licensed under the MIT license.

// Checks shared by the reader and the template evaluator.

use std::{collections::HashSet, sync::Arc};

use super::{
    context::TemplateContext,
    definition_info::DefinitionInfo,
    schema::Definition,
    tokens::{TemplateToken, TokenKind, TokenType},
};

pub const EXPRESSION_NOT_ALLOWED: &str = "A template expression is not allowed in this context";

pub fn unexpected_value(token: &TemplateToken) -> String {
    format!("Unexpected value '{}'", token.display())
}

/// Checks a scalar read at a position described by `definition`.
pub fn validate_scalar(context: &mut TemplateContext, scalar: TemplateToken, definition: &DefinitionInfo) -> TemplateToken {
    match &scalar.kind {
        TokenKind::Null | TokenKind::Boolean(_) | TokenKind::Number(_) | TokenKind::String(_) => {
            validate_literal(context, scalar, definition)
        }
        TokenKind::BasicExpression(_) => {
            if definition.allowed_context().is_empty() {
                context.error(&scalar, EXPRESSION_NOT_ALLOWED);
            }
            scalar.with_definition_info(definition.clone())
        }
        TokenKind::InsertExpression | TokenKind::Sequence(_) | TokenKind::Mapping(_) => {
            context.error(&scalar, unexpected_value(&scalar));
            scalar
        }
    }
}

/// Matches a literal against every reachable scalar definition. A literal
/// that only matches once coerced to a string is replaced by that string.
pub fn validate_literal(context: &mut TemplateContext, literal: TemplateToken, definition: &DefinitionInfo) -> TemplateToken {
    let definitions = definition.scalar_definitions();
    if let Some(matched) = definitions.iter().find(|x| x.is_match(&literal)) {
        return literal.with_definition_info(definition.child_with_definition(matched.clone()));
    }

    if literal.token_type() != TokenType::String {
        let string = TemplateToken::string(literal.file_id, literal.range, literal.display());
        if let Some(matched) = definitions.iter().find(|x| x.is_match(&string)) {
            return string.with_definition_info(definition.child_with_definition(matched.clone()));
        }
    }

    context.error(&literal, unexpected_value(&literal));
    literal
}

/// Mapping keys are strings; other literals are converted.
pub fn to_key_string(key: TemplateToken) -> TemplateToken {
    match key.kind {
        TokenKind::String(_) => key,
        _ => TemplateToken::string(key.file_id, key.range, key.display()),
    }
}

/// Case-insensitive set of the keys seen in one mapping.
#[derive(Default)]
pub struct KeySet {
    upper_keys: HashSet<String>,
}

impl KeySet {
    /// Returns false when the key was already present.
    pub fn insert(&mut self, key: &str) -> bool {
        self.upper_keys.insert(key.to_uppercase())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.upper_keys.contains(&key.to_uppercase())
    }
}

/// Reports an ambiguous mapping when several candidates remain, otherwise
/// the required properties missing from the remaining candidate.
pub fn check_mapping_candidates(
    context: &mut TemplateContext,
    mapping: &mut TemplateToken,
    definition: &DefinitionInfo,
    candidates: &[Arc<Definition>],
    keys: &KeySet,
    has_expression_key: bool,
) {
    if candidates.len() > 1 {
        let mut hit_count: Vec<(&str, usize)> = Vec::new();
        for candidate in candidates {
            let Some(candidate) = candidate.as_mapping() else {
                continue;
            };
            for name in candidate.properties.keys() {
                match hit_count.iter_mut().find(|(x, _)| *x == name.as_str()) {
                    Some((_, count)) => *count += 1,
                    None => hit_count.push((name, 1)),
                }
            }
        }

        let mut unique: Vec<&str> = hit_count
            .into_iter()
            .filter(|(_, count)| *count == 1)
            .map(|(name, _)| name)
            .collect();
        unique.sort_unstable();

        context.error(
            mapping,
            format!(
                "There's not enough info to determine what you meant. Add one of these properties: {}",
                unique.join(", ")
            ),
        );
        mapping.set_definition_info(definition.clone());
        return;
    }

    let Some(candidate) = candidates.first() else {
        return;
    };

    if !has_expression_key {
        if let Some(mapping_definition) = candidate.as_mapping() {
            for (name, property) in &mapping_definition.properties {
                if property.required && !keys.contains(name) {
                    context.error(mapping, format!("Required property is missing: {}", name));
                }
            }
        }
    }

    mapping.set_definition_info(definition.child_with_definition(candidate.clone()));
}
