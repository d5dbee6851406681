// Copyright (c) Chris Gunn.
// Licensed under the MIT license.

// The meta schema that schema descriptions are read against.

use anyhow::Error;
use hashlink::LinkedHashMap;

use super::{
    Definition, DefinitionKind, MappingDefinition, PropertyDefinition, TemplateSchema, BOOLEAN, NON_EMPTY_STRING,
    SEQUENCE_OF_NON_EMPTY_STRING, STRING,
};

pub const TEMPLATE_SCHEMA: &str = "template-schema";
const DEFINITIONS: &str = "definitions";
const DEFINITION: &str = "definition";
const NULL_DEFINITION: &str = "null-definition";
const NULL_DEFINITION_PROPERTIES: &str = "null-definition-properties";
const BOOLEAN_DEFINITION: &str = "boolean-definition";
const BOOLEAN_DEFINITION_PROPERTIES: &str = "boolean-definition-properties";
const NUMBER_DEFINITION: &str = "number-definition";
const NUMBER_DEFINITION_PROPERTIES: &str = "number-definition-properties";
const STRING_DEFINITION: &str = "string-definition";
const STRING_DEFINITION_PROPERTIES: &str = "string-definition-properties";
const SEQUENCE_DEFINITION: &str = "sequence-definition";
const SEQUENCE_DEFINITION_PROPERTIES: &str = "sequence-definition-properties";
const MAPPING_DEFINITION: &str = "mapping-definition";
const MAPPING_DEFINITION_PROPERTIES: &str = "mapping-definition-properties";
const ONE_OF_DEFINITION: &str = "one-of-definition";
const PROPERTIES: &str = "properties";
const PROPERTY_VALUE: &str = "property-value";
const MAPPING_PROPERTY_VALUE: &str = "mapping-property-value";

fn mapping(properties: &[(&str, PropertyDefinition)]) -> DefinitionKind {
    let mut map = LinkedHashMap::new();
    for (name, property) in properties {
        map.insert(name.to_string(), property.clone());
    }
    DefinitionKind::Mapping(MappingDefinition {
        properties: map,
        loose_key_type: None,
        loose_value_type: None,
    })
}

fn loose_mapping(key_type: &str, value_type: &str) -> DefinitionKind {
    DefinitionKind::Mapping(MappingDefinition {
        properties: LinkedHashMap::new(),
        loose_key_type: Some(key_type.to_string()),
        loose_value_type: Some(value_type.to_string()),
    })
}

// Every kind of definition shares `description` and `context`, and is told
// apart by the one required property naming its kind.
fn kind_definition(key: &str, kind_property: &str, properties_type: &str) -> Definition {
    Definition::new(
        key,
        mapping(&[
            ("description", PropertyDefinition::new(STRING)),
            ("context", PropertyDefinition::new(SEQUENCE_OF_NON_EMPTY_STRING)),
            (kind_property, PropertyDefinition::required(properties_type)),
        ]),
    )
}

pub fn template_schema() -> Result<TemplateSchema, Error> {
    let mut schema = TemplateSchema::new();

    schema.add(Definition::new(
        TEMPLATE_SCHEMA,
        mapping(&[
            ("version", PropertyDefinition::new(NON_EMPTY_STRING)),
            (DEFINITIONS, PropertyDefinition::new(DEFINITIONS)),
        ]),
    ));

    schema.add(Definition::new(DEFINITIONS, loose_mapping(NON_EMPTY_STRING, DEFINITION)));

    schema.add(Definition::new(
        DEFINITION,
        DefinitionKind::OneOf(
            [
                NULL_DEFINITION,
                BOOLEAN_DEFINITION,
                NUMBER_DEFINITION,
                STRING_DEFINITION,
                SEQUENCE_DEFINITION,
                MAPPING_DEFINITION,
                ONE_OF_DEFINITION,
            ]
            .iter()
            .map(|x| x.to_string())
            .collect(),
        ),
    ));

    schema.add(kind_definition(NULL_DEFINITION, "null", NULL_DEFINITION_PROPERTIES));
    schema.add(Definition::new(NULL_DEFINITION_PROPERTIES, mapping(&[])));

    schema.add(kind_definition(BOOLEAN_DEFINITION, "boolean", BOOLEAN_DEFINITION_PROPERTIES));
    schema.add(Definition::new(BOOLEAN_DEFINITION_PROPERTIES, mapping(&[])));

    schema.add(kind_definition(NUMBER_DEFINITION, "number", NUMBER_DEFINITION_PROPERTIES));
    schema.add(Definition::new(NUMBER_DEFINITION_PROPERTIES, mapping(&[])));

    schema.add(kind_definition(STRING_DEFINITION, "string", STRING_DEFINITION_PROPERTIES));
    schema.add(Definition::new(
        STRING_DEFINITION_PROPERTIES,
        mapping(&[
            ("constant", PropertyDefinition::new(NON_EMPTY_STRING)),
            ("ignore-case", PropertyDefinition::new(BOOLEAN)),
            ("require-non-empty", PropertyDefinition::new(BOOLEAN)),
            ("is-expression", PropertyDefinition::new(BOOLEAN)),
            ("allowed-values", PropertyDefinition::new(SEQUENCE_OF_NON_EMPTY_STRING)),
        ]),
    ));

    schema.add(kind_definition(SEQUENCE_DEFINITION, "sequence", SEQUENCE_DEFINITION_PROPERTIES));
    schema.add(Definition::new(
        SEQUENCE_DEFINITION_PROPERTIES,
        mapping(&[("item-type", PropertyDefinition::required(NON_EMPTY_STRING))]),
    ));

    schema.add(kind_definition(MAPPING_DEFINITION, "mapping", MAPPING_DEFINITION_PROPERTIES));
    schema.add(Definition::new(
        MAPPING_DEFINITION_PROPERTIES,
        mapping(&[
            (PROPERTIES, PropertyDefinition::new(PROPERTIES)),
            ("loose-key-type", PropertyDefinition::new(NON_EMPTY_STRING)),
            ("loose-value-type", PropertyDefinition::new(NON_EMPTY_STRING)),
        ]),
    ));
    schema.add(Definition::new(PROPERTIES, loose_mapping(NON_EMPTY_STRING, PROPERTY_VALUE)));
    schema.add(Definition::new(
        PROPERTY_VALUE,
        DefinitionKind::OneOf(vec![NON_EMPTY_STRING.to_string(), MAPPING_PROPERTY_VALUE.to_string()]),
    ));
    schema.add(Definition::new(
        MAPPING_PROPERTY_VALUE,
        mapping(&[
            ("type", PropertyDefinition::required(NON_EMPTY_STRING)),
            ("required", PropertyDefinition::new(BOOLEAN)),
            ("description", PropertyDefinition::new(STRING)),
        ]),
    ));

    schema.add(kind_definition(ONE_OF_DEFINITION, "one-of", SEQUENCE_OF_NON_EMPTY_STRING));

    schema.validate()?;
    Ok(schema)
}
