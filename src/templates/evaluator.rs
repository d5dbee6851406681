// Copyright (c) Chris Gunn.
// Licensed under the MIT license.

// Expands a template whose expressions can now be evaluated, re-validating the
// result against the schema.

#[cfg(test)]
mod tests;

use std::sync::Arc;

use anyhow::{bail, Error};
use tracing::debug;

use super::{
    context::TemplateContext,
    definition_info::{ContextMode, DefinitionInfo},
    schema::{Definition, DefinitionKind, DefinitionType, ANY},
    tokens::TemplateToken,
    unraveler::TemplateUnraveler,
    validation::{
        check_mapping_candidates, to_key_string, validate_literal, validate_scalar, KeySet, EXPRESSION_NOT_ALLOWED,
    },
};

/// Evaluates `template` against the definition `type_key`. Expressions are
/// expanded where every name in their allowed context has been supplied to
/// `context`; elsewhere they are kept as expressions.
///
/// Returns `None` when the template cannot be walked, after recording the
/// failure against the file.
pub fn evaluate_template(
    context: &mut TemplateContext,
    type_key: &str,
    template: &TemplateToken,
    file_id: Option<usize>,
) -> Option<TemplateToken> {
    let definition = match DefinitionInfo::new(context.schema(), type_key, ContextMode::Evaluator) {
        Ok(definition) => definition,
        Err(err) => {
            context.file_error(file_id, err);
            return None;
        }
    };

    let mut evaluator = TemplateEvaluator {
        unraveler: TemplateUnraveler::new(context, template.clone()),
    };

    let result = evaluator.evaluate(&definition).and_then(|token| {
        evaluator.unraveler.read_end()?;
        Ok(token)
    });

    match result {
        Ok(token) => {
            debug!(definition = type_key, "evaluated template");
            Some(token)
        }
        Err(err) => {
            evaluator.unraveler.context().file_error(file_id, err);
            None
        }
    }
}

struct TemplateEvaluator<'a> {
    unraveler: TemplateUnraveler<'a>,
}

impl<'a> TemplateEvaluator<'a> {
    fn expand(&mut self, definition: &DefinitionInfo) -> bool {
        let allowed_context = definition.allowed_context();
        let context = self.unraveler.context();
        !allowed_context.is_empty() && allowed_context.iter().all(|x| context.is_available(x))
    }

    fn evaluate(&mut self, definition: &DefinitionInfo) -> Result<TemplateToken, Error> {
        let expand = self.expand(definition);

        if let Some(scalar) = self.unraveler.allow_scalar(expand) {
            return Ok(validate_scalar(self.unraveler.context(), scalar, definition));
        }

        if let Some(mut sequence) = self.unraveler.allow_sequence_start(expand) {
            let item_type = definition
                .definitions_of_type(DefinitionType::Sequence)
                .first()
                .and_then(|x| match &x.kind {
                    DefinitionKind::Sequence { item_type } => Some(item_type.clone()),
                    _ => None,
                });

            match item_type {
                Some(item_type) => {
                    let item_definition = definition.child(&item_type)?;
                    while !self.unraveler.allow_sequence_end(expand) {
                        let item = self.evaluate(&item_definition)?;
                        sequence.push_item(item);
                    }
                }
                None => {
                    self.unraveler.context().error(&sequence, "A sequence was not expected");
                    while !self.unraveler.allow_sequence_end(false) {
                        self.unraveler.skip_sequence_item()?;
                    }
                }
            }

            sequence.set_definition_info(definition.clone());
            return Ok(sequence);
        }

        if let Some(mut mapping) = self.unraveler.allow_mapping_start(expand) {
            let candidates = definition.definitions_of_type(DefinitionType::Mapping);
            if candidates.is_empty() {
                self.unraveler.context().error(&mapping, "A mapping was not expected");
                while !self.unraveler.allow_mapping_end(false) {
                    self.unraveler.skip_mapping_key()?;
                    self.unraveler.skip_mapping_value()?;
                }
                mapping.set_definition_info(definition.clone());
                return Ok(mapping);
            }

            self.evaluate_mapping(definition, candidates, expand, &mut mapping)?;
            return Ok(mapping);
        }

        bail!("Expected a scalar value, a sequence, or a mapping")
    }

    fn evaluate_mapping(
        &mut self,
        definition: &DefinitionInfo,
        mut candidates: Vec<Arc<Definition>>,
        expand: bool,
        mapping: &mut TemplateToken,
    ) -> Result<(), Error> {
        let schema = definition.schema().clone();
        let loose_types = candidates
            .first()
            .and_then(|x| x.as_mapping())
            .and_then(|x| x.loose_key_type.clone().zip(x.loose_value_type.clone()));
        let mut loose_definitions: Option<(DefinitionInfo, DefinitionInfo)> = None;

        let mut keys = KeySet::default();
        let mut has_expression_key = false;
        while let Some(key) = self.unraveler.allow_scalar(expand) {
            if key.is_expression() {
                has_expression_key = true;
                if definition.allowed_context().is_empty() {
                    self.unraveler.context().error(&key, EXPRESSION_NOT_ALLOWED);
                    self.unraveler.skip_mapping_value()?;
                    continue;
                }

                let value = self.evaluate(&definition.child(ANY)?)?;
                mapping.push_pair(key, value);
                continue;
            }

            let key = to_key_string(key);
            let name = key.display();
            if !keys.insert(&name) {
                self.unraveler
                    .context()
                    .error(&key, format!("'{}' is already defined", name));
                self.unraveler.skip_mapping_value()?;
                continue;
            }

            if let Some(property) = schema.match_property_and_filter(&mut candidates, &name) {
                let value = self.evaluate(&definition.child(&property.type_key)?)?;
                mapping.push_pair(key, value);
                continue;
            }

            if let Some((key_type, value_type)) = &loose_types {
                if loose_definitions.is_none() {
                    loose_definitions = Some((definition.child(key_type)?, definition.child(value_type)?));
                }
                if let Some((key_definition, value_definition)) = &loose_definitions {
                    let key = validate_literal(self.unraveler.context(), key, key_definition);
                    let value = self.evaluate(value_definition)?;
                    mapping.push_pair(key, value);
                    continue;
                }
            }

            self.unraveler
                .context()
                .error(&key, format!("Unexpected value '{}'", name));
            self.unraveler.skip_mapping_value()?;
        }

        check_mapping_candidates(
            self.unraveler.context(),
            mapping,
            definition,
            &candidates,
            &keys,
            has_expression_key,
        );

        self.unraveler.read_mapping_end()
    }
}
