// Copyright (c) Chris Gunn.
// Licensed under the MIT license.

// Schema-driven template model: tokens, schema definitions, the structural
// reader and the lazy template evaluator.

pub mod context;
pub mod definition_info;
pub mod evaluator;
pub mod object_reader;
pub mod reader;
pub mod schema;
pub mod tokens;
pub mod unraveler;
mod validation;
pub mod yaml_object_reader;

pub use context::TemplateContext;
pub use definition_info::DefinitionInfo;
pub use evaluator::evaluate_template;
pub use object_reader::{EventObjectReader, ObjectReader, ParseEvent};
pub use reader::read_template;
pub use schema::{Definition, DefinitionKind, DefinitionType, TemplateSchema};
pub use tokens::{Position, TemplateToken, TokenKind, TokenRange, TokenType};
pub use unraveler::TemplateUnraveler;
pub use yaml_object_reader::parse_yaml_events;

pub const OPEN_EXPRESSION: &str = "${{";
pub const CLOSE_EXPRESSION: &str = "}}";
pub const INSERT_DIRECTIVE: &str = "insert";
