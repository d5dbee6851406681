// Copyright (c) Chris Gunn.
// Licensed under the MIT license.

use std::{fmt, sync::Arc};

use anyhow::Error;

use super::schema::{Definition, DefinitionType, TemplateSchema};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContextMode {
    Reader,
    Evaluator,
}

/// A definition together with the expression context accumulated on the path
/// from the root. Children extend a copy of the parent's context.
#[derive(Clone)]
pub struct DefinitionInfo {
    schema: Arc<TemplateSchema>,
    definition: Arc<Definition>,
    allowed_context: Arc<Vec<String>>,
    mode: ContextMode,
}

impl fmt::Debug for DefinitionInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DefinitionInfo")
            .field("definition", &self.definition.key)
            .field("allowed_context", &self.allowed_context)
            .field("mode", &self.mode)
            .finish()
    }
}

impl DefinitionInfo {
    pub fn new(schema: &Arc<TemplateSchema>, key: &str, mode: ContextMode) -> Result<DefinitionInfo, Error> {
        let definition = schema.get_definition(key)?.clone();
        let allowed_context = Arc::new(context_of(&definition, mode).to_vec());
        Ok(DefinitionInfo {
            schema: schema.clone(),
            definition,
            allowed_context,
            mode,
        })
    }

    pub fn child(&self, key: &str) -> Result<DefinitionInfo, Error> {
        let definition = self.schema.get_definition(key)?.clone();
        Ok(self.child_with_definition(definition))
    }

    pub fn child_with_definition(&self, definition: Arc<Definition>) -> DefinitionInfo {
        let added = context_of(&definition, self.mode);
        let allowed_context = match added.is_empty() {
            true => self.allowed_context.clone(),
            false => {
                let mut context = self.allowed_context.as_ref().clone();
                for item in added {
                    if !context.iter().any(|x| x.eq_ignore_ascii_case(item)) {
                        context.push(item.clone());
                    }
                }
                Arc::new(context)
            }
        };

        DefinitionInfo {
            schema: self.schema.clone(),
            definition,
            allowed_context,
            mode: self.mode,
        }
    }

    pub fn schema(&self) -> &Arc<TemplateSchema> {
        &self.schema
    }

    pub fn definition(&self) -> &Arc<Definition> {
        &self.definition
    }

    pub fn key(&self) -> &str {
        &self.definition.key
    }

    pub fn allowed_context(&self) -> &[String] {
        &self.allowed_context
    }

    pub fn mode(&self) -> ContextMode {
        self.mode
    }

    pub fn scalar_definitions(&self) -> Vec<Arc<Definition>> {
        self.schema.get_scalar_definitions(&self.definition)
    }

    pub fn definitions_of_type(&self, definition_type: DefinitionType) -> Vec<Arc<Definition>> {
        self.schema.get_definitions_of_type(&self.definition, definition_type)
    }
}

fn context_of(definition: &Definition, mode: ContextMode) -> &[String] {
    match mode {
        ContextMode::Reader => &definition.reader_context,
        ContextMode::Evaluator => &definition.evaluator_context,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::templates::schema::{DefinitionKind, StringDefinition, STRING};

    fn schema() -> Arc<TemplateSchema> {
        let mut schema = TemplateSchema::new();
        schema.add(
            Definition::new("parent", DefinitionKind::String(StringDefinition::default()))
                .with_context(&["github", "hashFiles(1,255)"])
                .unwrap(),
        );
        schema.add(
            Definition::new("child", DefinitionKind::String(StringDefinition::default()))
                .with_context(&["GITHUB", "matrix"])
                .unwrap(),
        );
        Arc::new(schema)
    }

    #[test]
    fn child_extends_parent_context() {
        let schema = schema();
        let parent = DefinitionInfo::new(&schema, "parent", ContextMode::Reader).unwrap();
        let child = parent.child("child").unwrap();

        assert_eq!(parent.allowed_context(), ["github", "hashFiles(1,255)"]);
        assert_eq!(child.allowed_context(), ["github", "hashFiles(1,255)", "matrix"]);

        let plain = child.child(STRING).unwrap();
        assert_eq!(plain.allowed_context(), child.allowed_context());
    }

    #[test]
    fn evaluator_context_strips_parameter_counts() {
        let schema = schema();
        let parent = DefinitionInfo::new(&schema, "parent", ContextMode::Evaluator).unwrap();
        assert_eq!(parent.allowed_context(), ["github", "hashFiles()"]);
        assert_eq!(parent.child("child").unwrap().mode(), ContextMode::Evaluator);
    }

    #[test]
    fn missing_definition() {
        let schema = schema();
        let err = DefinitionInfo::new(&schema, "nope", ContextMode::Reader).unwrap_err();
        assert_eq!(err.to_string(), "Schema definition 'nope' not found");
    }
}
