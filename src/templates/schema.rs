// Copyright (c) Chris Gunn.
// Licensed under the MIT license.

mod definition;
pub mod internal;

use std::sync::Arc;

use anyhow::{anyhow, bail, Error};
use hashlink::LinkedHashMap;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

pub use definition::{
    Definition, DefinitionKind, DefinitionType, MappingDefinition, PropertyDefinition, StringDefinition,
};

use super::{
    context::TemplateContext,
    object_reader::{EventObjectReader, ObjectReader},
    reader::read_template,
    tokens::TemplateToken,
    yaml_object_reader::parse_yaml_events,
};

pub const NULL: &str = "null";
pub const BOOLEAN: &str = "boolean";
pub const NUMBER: &str = "number";
pub const STRING: &str = "string";
pub const SEQUENCE: &str = "sequence";
pub const MAPPING: &str = "mapping";
pub const ANY: &str = "any";
pub const NON_EMPTY_STRING: &str = "non-empty-string";
pub const SEQUENCE_OF_NON_EMPTY_STRING: &str = "sequence-of-non-empty-string";

const LOAD_MAX_ERRORS: usize = 10;
const LOAD_MAX_MESSAGE_LENGTH: usize = 500;

static DEFINITION_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z_][a-zA-Z0-9_-]*$").expect("definition name pattern"));

/// An immutable graph of named definitions.
#[derive(Clone, Debug, PartialEq)]
pub struct TemplateSchema {
    pub version: Option<String>,
    definitions: LinkedHashMap<String, Arc<Definition>>,
}

impl Default for TemplateSchema {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateSchema {
    /// A schema holding only the built-in definitions.
    pub fn new() -> TemplateSchema {
        let mut schema = TemplateSchema {
            version: None,
            definitions: LinkedHashMap::new(),
        };

        schema.add(Definition::new(NULL, DefinitionKind::Null));
        schema.add(Definition::new(BOOLEAN, DefinitionKind::Boolean));
        schema.add(Definition::new(NUMBER, DefinitionKind::Number));
        schema.add(Definition::new(STRING, DefinitionKind::String(StringDefinition::default())));
        schema.add(Definition::new(
            SEQUENCE,
            DefinitionKind::Sequence {
                item_type: ANY.to_string(),
            },
        ));
        schema.add(Definition::new(
            MAPPING,
            DefinitionKind::Mapping(MappingDefinition {
                properties: LinkedHashMap::new(),
                loose_key_type: Some(STRING.to_string()),
                loose_value_type: Some(ANY.to_string()),
            }),
        ));
        schema.add(Definition::new(
            ANY,
            DefinitionKind::OneOf(
                [NULL, BOOLEAN, NUMBER, STRING, SEQUENCE, MAPPING]
                    .iter()
                    .map(|x| x.to_string())
                    .collect(),
            ),
        ));
        schema.add(Definition::new(
            NON_EMPTY_STRING,
            DefinitionKind::String(StringDefinition {
                require_non_empty: true,
                ..StringDefinition::default()
            }),
        ));
        schema.add(Definition::new(
            SEQUENCE_OF_NON_EMPTY_STRING,
            DefinitionKind::Sequence {
                item_type: NON_EMPTY_STRING.to_string(),
            },
        ));

        schema
    }

    pub fn add(&mut self, definition: Definition) {
        self.definitions.insert(definition.key.clone(), Arc::new(definition));
    }

    /// Reads a schema description and validates the resulting graph.
    pub fn load(object_reader: &mut dyn ObjectReader) -> Result<TemplateSchema, Error> {
        let meta_schema = Arc::new(internal::template_schema()?);
        let mut context = TemplateContext::with_limits(meta_schema, LOAD_MAX_ERRORS, LOAD_MAX_MESSAGE_LENGTH);
        let template = read_template(&mut context, internal::TEMPLATE_SCHEMA, object_reader, None);
        context.errors.check()?;

        let template = template.ok_or_else(|| anyhow!("The schema description is empty"))?;
        let schema = TemplateSchema::from_token(&template)?;
        schema.validate()?;

        debug!(
            version = schema.version.as_deref().unwrap_or(""),
            definitions = schema.definitions.len(),
            "loaded template schema"
        );
        Ok(schema)
    }

    pub fn from_yaml(content: &str) -> Result<TemplateSchema, Error> {
        let events = parse_yaml_events(content, None)?;
        let mut object_reader = EventObjectReader::new(events);
        TemplateSchema::load(&mut object_reader)
    }

    fn from_token(template: &TemplateToken) -> Result<TemplateSchema, Error> {
        let mut schema = TemplateSchema::new();

        for (key, value) in template.assert_mapping("template schema")? {
            match key.assert_string("template schema key")? {
                "version" => schema.version = Some(value.assert_string("version")?.to_string()),
                "definitions" => {
                    for (name, definition) in value.assert_mapping("definitions")? {
                        let name = name.assert_string("definition name")?;
                        let definition = convert_definition(name, definition)?;
                        schema.add(definition);
                    }
                }
                _ => return Err(key.assert_unexpected_value("template schema key")),
            }
        }

        Ok(schema)
    }

    pub fn get_definition(&self, key: &str) -> Result<&Arc<Definition>, Error> {
        self.definitions
            .get(key)
            .ok_or_else(|| anyhow!("Schema definition '{}' not found", key))
    }

    pub fn definitions(&self) -> impl Iterator<Item = &Arc<Definition>> {
        self.definitions.values()
    }

    /// The scalar definitions reachable from `definition`, expanding one level
    /// of one-of.
    pub fn get_scalar_definitions(&self, definition: &Arc<Definition>) -> Vec<Arc<Definition>> {
        match &definition.kind {
            DefinitionKind::OneOf(one_of) => one_of
                .iter()
                .filter_map(|key| self.definitions.get(key))
                .filter(|x| x.is_scalar())
                .cloned()
                .collect(),
            _ if definition.is_scalar() => vec![definition.clone()],
            _ => Vec::new(),
        }
    }

    pub fn get_definitions_of_type(
        &self,
        definition: &Arc<Definition>,
        definition_type: DefinitionType,
    ) -> Vec<Arc<Definition>> {
        match &definition.kind {
            DefinitionKind::OneOf(one_of) => one_of
                .iter()
                .filter_map(|key| self.definitions.get(key))
                .filter(|x| x.definition_type() == definition_type)
                .cloned()
                .collect(),
            _ if definition.definition_type() == definition_type => vec![definition.clone()],
            _ => Vec::new(),
        }
    }

    /// Finds the property among the candidate mappings. When only some of the
    /// candidates define it, the others are removed.
    pub fn match_property_and_filter(
        &self,
        candidates: &mut Vec<Arc<Definition>>,
        property_name: &str,
    ) -> Option<PropertyDefinition> {
        let mut result = None;
        let mut not_found_in_some = false;
        for candidate in candidates.iter() {
            match candidate.as_mapping().and_then(|x| x.properties.get(property_name)) {
                Some(property) => result = Some(property.clone()),
                None => not_found_in_some = true,
            }
        }

        if result.is_some() && not_found_in_some {
            candidates.retain(|x| {
                x.as_mapping()
                    .map_or(false, |x| x.properties.contains_key(property_name))
            });
        }

        result
    }

    /// Checks names, references and one-of rules. One-of definitions are
    /// checked after all others.
    pub fn validate(&self) -> Result<(), Error> {
        let mut one_of_definitions = Vec::new();
        for (name, definition) in &self.definitions {
            if !DEFINITION_NAME.is_match(name) {
                bail!("Invalid definition name '{}'", name);
            }

            match &definition.kind {
                DefinitionKind::OneOf(_) => one_of_definitions.push(definition),
                _ => self.validate_definition(definition)?,
            }
        }

        for definition in one_of_definitions {
            self.validate_one_of(definition)?;
        }

        Ok(())
    }

    fn validate_definition(&self, definition: &Definition) -> Result<(), Error> {
        let name = &definition.key;
        match &definition.kind {
            DefinitionKind::Null | DefinitionKind::Boolean | DefinitionKind::Number | DefinitionKind::OneOf(_) => {}
            DefinitionKind::String(string) => {
                if string.constant.is_some() && string.require_non_empty {
                    bail!(
                        "Properties 'constant' and 'require-non-empty' cannot both be set on '{}'",
                        name
                    );
                }
            }
            DefinitionKind::Sequence { item_type } => {
                if item_type.is_empty() {
                    bail!("Type not specified for the sequence '{}'", name);
                }
                self.get_definition(item_type)?;
            }
            DefinitionKind::Mapping(mapping) => {
                match (&mapping.loose_key_type, &mapping.loose_value_type) {
                    (Some(key_type), Some(value_type)) => {
                        self.get_definition(key_type)?;
                        self.get_definition(value_type)?;
                    }
                    (Some(_), None) => bail!(
                        "Property 'loose-key-type' is defined but 'loose-value-type' is not defined on '{}'",
                        name
                    ),
                    (None, Some(_)) => bail!(
                        "Property 'loose-value-type' is defined but 'loose-key-type' is not defined on '{}'",
                        name
                    ),
                    (None, None) => {}
                }

                for (property_name, property) in &mapping.properties {
                    if property.type_key.is_empty() {
                        bail!("Type not specified for the property '{}' on '{}'", property_name, name);
                    }
                    self.get_definition(&property.type_key)?;
                }
            }
        }
        Ok(())
    }

    fn validate_one_of(&self, definition: &Definition) -> Result<(), Error> {
        let name = &definition.key;
        let DefinitionKind::OneOf(one_of) = &definition.kind else {
            return self.validate_definition(definition);
        };

        if one_of.is_empty() {
            bail!("Property 'one-of' does not contain any references on '{}'", name);
        }

        let mut seen: Vec<&str> = Vec::new();
        let mut mappings: Vec<&MappingDefinition> = Vec::new();
        let mut strings: Vec<&StringDefinition> = Vec::new();
        let mut found_loose_key_type = false;
        let mut found_sequence = false;
        let mut found_null = false;
        let mut found_boolean = false;
        let mut found_number = false;

        for nested_type in one_of {
            if seen.contains(&nested_type.as_str()) {
                bail!("'one-of' '{}' is already specified on '{}'", nested_type, name);
            }
            seen.push(nested_type);

            let nested = self.get_definition(nested_type)?;
            if !nested.reader_context.is_empty() {
                bail!(
                    "'{}' is referenced by the one-of '{}' and may not define context",
                    nested_type,
                    name
                );
            }

            let duplicate = |found: &mut bool, type_name: &str| -> Result<(), Error> {
                if *found {
                    bail!("'{}' refers to more than one definition of type '{}'", name, type_name);
                }
                *found = true;
                Ok(())
            };

            match &nested.kind {
                DefinitionKind::Mapping(mapping) => {
                    found_loose_key_type |= mapping.loose_key_type.is_some();
                    mappings.push(mapping);
                }
                DefinitionKind::Sequence { .. } => duplicate(&mut found_sequence, SEQUENCE)?,
                DefinitionKind::Null => duplicate(&mut found_null, NULL)?,
                DefinitionKind::Boolean => duplicate(&mut found_boolean, BOOLEAN)?,
                DefinitionKind::Number => duplicate(&mut found_number, NUMBER)?,
                DefinitionKind::String(string) => {
                    if let Some(first) = strings.first() {
                        if first.constant.is_none() {
                            bail!(
                                "'{}' refers to more than one '{}', but the first does not set 'constant'",
                                name,
                                STRING
                            );
                        }
                    }
                    strings.push(string);
                }
                DefinitionKind::OneOf(_) => {
                    bail!("'{}' refers to the one-of '{}'. A one-of may not be nested", name, nested_type);
                }
            }
        }

        if mappings.len() > 1 {
            if found_loose_key_type {
                bail!(
                    "'{}' refers to more than one mapping, and at least one sets 'loose-key-type'",
                    name
                );
            }

            let mut seen_properties: LinkedHashMap<&str, &PropertyDefinition> = LinkedHashMap::new();
            for mapping in mappings {
                for (property_name, property) in &mapping.properties {
                    if let Some(existing) = seen_properties.get(property_name.as_str()) {
                        if existing.type_key != property.type_key {
                            bail!(
                                "'{}' contains two mappings with the same property '{}', but each refers to a different type. All matching properties must refer to the same type.",
                                name,
                                property_name
                            );
                        }
                    }
                    seen_properties.insert(property_name, property);
                }
            }
        }

        Ok(())
    }
}

fn convert_definition(name: &str, token: &TemplateToken) -> Result<Definition, Error> {
    let mut description = None;
    let mut context: Vec<String> = Vec::new();
    let mut kind = None;

    for (key, value) in token.assert_mapping("definition")? {
        match key.assert_string("definition key")? {
            "description" => description = Some(value.assert_string("description")?.to_string()),
            "context" => {
                for item in value.assert_sequence("context")? {
                    context.push(item.assert_string("context item")?.to_string());
                }
            }
            "null" => kind = Some(DefinitionKind::Null),
            "boolean" => kind = Some(DefinitionKind::Boolean),
            "number" => kind = Some(DefinitionKind::Number),
            "string" => kind = Some(DefinitionKind::String(convert_string(value)?)),
            "sequence" => {
                let mut item_type = String::new();
                for (key, value) in value.assert_mapping("sequence")? {
                    match key.assert_string("sequence key")? {
                        "item-type" => item_type = value.assert_string("item-type")?.to_string(),
                        _ => return Err(key.assert_unexpected_value("sequence key")),
                    }
                }
                kind = Some(DefinitionKind::Sequence { item_type });
            }
            "mapping" => kind = Some(DefinitionKind::Mapping(convert_mapping(value)?)),
            "one-of" => {
                let mut one_of = Vec::new();
                for item in value.assert_sequence("one-of")? {
                    one_of.push(item.assert_string("one-of item")?.to_string());
                }
                kind = Some(DefinitionKind::OneOf(one_of));
            }
            _ => return Err(key.assert_unexpected_value("definition key")),
        }
    }

    let kind = kind.ok_or_else(|| anyhow!("Definition '{}' does not specify a type", name))?;
    let mut definition = Definition::new(name, kind);
    definition.description = description;
    definition.set_context(&context)?;
    Ok(definition)
}

fn convert_string(token: &TemplateToken) -> Result<StringDefinition, Error> {
    let mut string = StringDefinition::default();
    for (key, value) in token.assert_mapping("string")? {
        match key.assert_string("string key")? {
            "constant" => string.constant = Some(value.assert_string("constant")?.to_string()),
            "ignore-case" => string.ignore_case = value.assert_boolean("ignore-case")?,
            "require-non-empty" => string.require_non_empty = value.assert_boolean("require-non-empty")?,
            "is-expression" => string.is_expression = value.assert_boolean("is-expression")?,
            "allowed-values" => {
                for item in value.assert_sequence("allowed-values")? {
                    string
                        .allowed_values
                        .push(item.assert_string("allowed-values item")?.to_string());
                }
            }
            _ => return Err(key.assert_unexpected_value("string key")),
        }
    }
    Ok(string)
}

fn convert_mapping(token: &TemplateToken) -> Result<MappingDefinition, Error> {
    let mut mapping = MappingDefinition::default();
    for (key, value) in token.assert_mapping("mapping")? {
        match key.assert_string("mapping key")? {
            "properties" => {
                for (property_name, property_value) in value.assert_mapping("properties")? {
                    let property_name = property_name.assert_string("property name")?;
                    let property = convert_property(property_value)?;
                    mapping.properties.insert(property_name.to_string(), property);
                }
            }
            "loose-key-type" => mapping.loose_key_type = Some(value.assert_string("loose-key-type")?.to_string()),
            "loose-value-type" => {
                mapping.loose_value_type = Some(value.assert_string("loose-value-type")?.to_string())
            }
            _ => return Err(key.assert_unexpected_value("mapping key")),
        }
    }
    Ok(mapping)
}

fn convert_property(token: &TemplateToken) -> Result<PropertyDefinition, Error> {
    if let Some(type_key) = token.as_str() {
        return Ok(PropertyDefinition::new(type_key));
    }

    let mut property = PropertyDefinition::new("");
    for (key, value) in token.assert_mapping("property")? {
        match key.assert_string("property key")? {
            "type" => property.type_key = value.assert_string("type")?.to_string(),
            "required" => property.required = value.assert_boolean("required")?,
            "description" => property.description = Some(value.assert_string("description")?.to_string()),
            _ => return Err(key.assert_unexpected_value("property key")),
        }
    }
    Ok(property)
}
