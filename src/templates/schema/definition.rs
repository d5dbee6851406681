// Copyright (c) Chris Gunn.
// Licensed under the MIT license.

use anyhow::{bail, Error};
use hashlink::LinkedHashMap;

use crate::templates::tokens::{TemplateToken, TokenKind};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DefinitionType {
    Null,
    Boolean,
    Number,
    String,
    Sequence,
    Mapping,
    OneOf,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StringDefinition {
    pub constant: Option<String>,
    pub ignore_case: bool,
    pub require_non_empty: bool,
    pub is_expression: bool,
    pub allowed_values: Vec<String>,
}

impl StringDefinition {
    pub fn is_match(&self, value: &str) -> bool {
        let equals = |expected: &str| match self.ignore_case {
            true => expected.eq_ignore_ascii_case(value),
            false => expected == value,
        };

        if let Some(constant) = &self.constant {
            return equals(constant);
        }

        if !self.allowed_values.is_empty() {
            return self.allowed_values.iter().any(|x| equals(x));
        }

        !self.require_non_empty || !value.is_empty()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PropertyDefinition {
    pub type_key: String,
    pub required: bool,
    pub description: Option<String>,
}

impl PropertyDefinition {
    pub fn new(type_key: impl Into<String>) -> PropertyDefinition {
        PropertyDefinition {
            type_key: type_key.into(),
            required: false,
            description: None,
        }
    }

    pub fn required(type_key: impl Into<String>) -> PropertyDefinition {
        PropertyDefinition {
            required: true,
            ..PropertyDefinition::new(type_key)
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MappingDefinition {
    pub properties: LinkedHashMap<String, PropertyDefinition>,
    pub loose_key_type: Option<String>,
    pub loose_value_type: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DefinitionKind {
    Null,
    Boolean,
    Number,
    String(StringDefinition),
    Sequence { item_type: String },
    Mapping(MappingDefinition),
    OneOf(Vec<String>),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Definition {
    pub key: String,
    pub description: Option<String>,
    // Verbatim, e.g. `hashFiles(1,255)`.
    pub reader_context: Vec<String>,
    // Parameter counts stripped, e.g. `hashFiles()`.
    pub evaluator_context: Vec<String>,
    pub kind: DefinitionKind,
}

impl Definition {
    pub fn new(key: impl Into<String>, kind: DefinitionKind) -> Definition {
        Definition {
            key: key.into(),
            description: None,
            reader_context: Vec::new(),
            evaluator_context: Vec::new(),
            kind,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Definition {
        self.description = Some(description.into());
        self
    }

    pub fn with_context<S: AsRef<str>>(mut self, context: &[S]) -> Result<Definition, Error> {
        self.set_context(context)?;
        Ok(self)
    }

    pub fn set_context<S: AsRef<str>>(&mut self, context: &[S]) -> Result<(), Error> {
        let mut reader_context: Vec<String> = Vec::new();
        let mut evaluator_context: Vec<String> = Vec::new();
        for item in context {
            let item = item.as_ref();
            if reader_context.iter().any(|x| x.eq_ignore_ascii_case(item)) {
                bail!("Duplicate context item '{}' on definition '{}'", item, self.key);
            }
            reader_context.push(item.to_string());

            let evaluator_item = match item.find('(') {
                Some(paren) => format!("{}()", &item[..paren]),
                None => item.to_string(),
            };
            if evaluator_context.iter().any(|x| x.eq_ignore_ascii_case(&evaluator_item)) {
                bail!("Duplicate context item '{}' on definition '{}'", evaluator_item, self.key);
            }
            evaluator_context.push(evaluator_item);
        }

        self.reader_context = reader_context;
        self.evaluator_context = evaluator_context;
        Ok(())
    }

    pub fn definition_type(&self) -> DefinitionType {
        match &self.kind {
            DefinitionKind::Null => DefinitionType::Null,
            DefinitionKind::Boolean => DefinitionType::Boolean,
            DefinitionKind::Number => DefinitionType::Number,
            DefinitionKind::String(_) => DefinitionType::String,
            DefinitionKind::Sequence { .. } => DefinitionType::Sequence,
            DefinitionKind::Mapping(_) => DefinitionType::Mapping,
            DefinitionKind::OneOf(_) => DefinitionType::OneOf,
        }
    }

    pub fn is_scalar(&self) -> bool {
        matches!(
            self.kind,
            DefinitionKind::Null | DefinitionKind::Boolean | DefinitionKind::Number | DefinitionKind::String(_)
        )
    }

    pub fn as_mapping(&self) -> Option<&MappingDefinition> {
        match &self.kind {
            DefinitionKind::Mapping(mapping) => Some(mapping),
            _ => None,
        }
    }

    pub fn as_string(&self) -> Option<&StringDefinition> {
        match &self.kind {
            DefinitionKind::String(string) => Some(string),
            _ => None,
        }
    }

    /// Whether a literal token satisfies this scalar definition.
    pub fn is_match(&self, literal: &TemplateToken) -> bool {
        match (&self.kind, &literal.kind) {
            (DefinitionKind::Null, TokenKind::Null) => true,
            (DefinitionKind::Boolean, TokenKind::Boolean(_)) => true,
            (DefinitionKind::Number, TokenKind::Number(_)) => true,
            (DefinitionKind::String(string), TokenKind::String(token)) => string.is_match(&token.value),
            _ => false,
        }
    }
}
