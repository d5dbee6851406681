// Copyright (c) Chris Gunn.
// Licensed under the MIT license.

// Reads object reader events into a token tree, validating each node against
// the schema definition of its position.

#[cfg(test)]
mod tests;

use std::sync::Arc;

use anyhow::{bail, Error};

use super::{
    context::TemplateContext,
    definition_info::{ContextMode, DefinitionInfo},
    object_reader::ObjectReader,
    schema::{Definition, DefinitionKind, DefinitionType, ANY},
    tokens::{BasicExpressionToken, Position, StringToken, TemplateToken, TokenKind, TokenRange},
    validation::{
        check_mapping_candidates, to_key_string, validate_literal, validate_scalar, KeySet, EXPRESSION_NOT_ALLOWED,
    },
    CLOSE_EXPRESSION, INSERT_DIRECTIVE, OPEN_EXPRESSION,
};
use crate::expressions::split_allowed_context;

const UNEXPECTED_NODE: &str = "Expected a scalar value, a sequence, or a mapping";

/// Reads one document. Recoverable problems are recorded in the context and
/// reading continues; a structural desync abandons the document and is
/// reported against the file.
pub fn read_template(
    context: &mut TemplateContext,
    type_key: &str,
    object_reader: &mut dyn ObjectReader,
    file_id: Option<usize>,
) -> Option<TemplateToken> {
    let mut reader = TemplateReader {
        context,
        object_reader,
        file_id,
    };

    match reader.read_document(type_key) {
        Ok(token) => Some(token),
        Err(err) => {
            reader.context.file_error(file_id, err);
            None
        }
    }
}

struct TemplateReader<'a> {
    context: &'a mut TemplateContext,
    object_reader: &'a mut dyn ObjectReader,
    file_id: Option<usize>,
}

impl<'a> TemplateReader<'a> {
    fn read_document(&mut self, type_key: &str) -> Result<TemplateToken, Error> {
        self.object_reader.validate_start()?;
        let definition = DefinitionInfo::new(self.context.schema(), type_key, ContextMode::Reader)?;
        let value = self.read_value(&definition)?;
        self.object_reader.validate_end()?;
        Ok(value)
    }

    fn read_value(&mut self, definition: &DefinitionInfo) -> Result<TemplateToken, Error> {
        if let Some(literal) = self.object_reader.allow_literal() {
            let scalar = match implicit_expression(&literal, definition) {
                Some(raw) => match self.parse_into_expression_token(&raw, literal.range, definition) {
                    Ok(expression) => expression,
                    Err(message) => {
                        self.context.error(&literal, message);
                        literal
                    }
                },
                None => self.parse_scalar(literal, definition),
            };
            return Ok(validate_scalar(self.context, scalar, definition));
        }

        if let Some(mut sequence) = self.object_reader.allow_sequence_start() {
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
                    while !self.object_reader.allow_sequence_end() {
                        let item = self.read_value(&item_definition)?;
                        sequence.push_item(item);
                    }
                }
                None => {
                    self.context.error(&sequence, "A sequence was not expected");
                    while !self.object_reader.allow_sequence_end() {
                        self.skip_value()?;
                    }
                }
            }

            sequence.set_definition_info(definition.clone());
            return Ok(sequence);
        }

        if let Some(mut mapping) = self.object_reader.allow_mapping_start() {
            let candidates = definition.definitions_of_type(DefinitionType::Mapping);
            if candidates.is_empty() {
                self.context.error(&mapping, "A mapping was not expected");
                while !self.object_reader.allow_mapping_end() {
                    self.skip_value()?;
                    self.skip_value()?;
                }
                mapping.set_definition_info(definition.clone());
                return Ok(mapping);
            }

            // A single mapping with only loose properties.
            let loose_only = match candidates.as_slice() {
                [only] => only
                    .as_mapping()
                    .filter(|x| x.properties.is_empty())
                    .and_then(|x| x.loose_key_type.clone().zip(x.loose_value_type.clone()))
                    .map(|types| (only.clone(), types)),
                _ => None,
            };

            match loose_only {
                Some((only, (key_type, value_type))) => {
                    let key_definition = definition.child(&key_type)?;
                    let value_definition = definition.child(&value_type)?;
                    self.read_loose_mapping(definition, &key_definition, &value_definition, &mut mapping)?;
                    mapping.set_definition_info(definition.child_with_definition(only));
                }
                None => self.read_well_known_mapping(definition, candidates, &mut mapping)?,
            }
            return Ok(mapping);
        }

        bail!(UNEXPECTED_NODE)
    }

    fn read_loose_mapping(
        &mut self,
        definition: &DefinitionInfo,
        key_definition: &DefinitionInfo,
        value_definition: &DefinitionInfo,
        mapping: &mut TemplateToken,
    ) -> Result<(), Error> {
        let mut keys = KeySet::default();
        while let Some(raw_key) = self.object_reader.allow_literal() {
            let key = self.parse_scalar(raw_key, definition);
            if key.is_expression() {
                self.read_expression_key(definition, key, mapping)?;
                continue;
            }

            let key = to_key_string(key);
            let name = key.display();
            if !keys.insert(&name) {
                self.context.error(&key, format!("'{}' is already defined", name));
                self.skip_value()?;
                continue;
            }

            let key = validate_literal(self.context, key, key_definition);
            let value = self.read_value(value_definition)?;
            mapping.push_pair(key, value);
        }

        self.expect_mapping_end()
    }

    fn read_well_known_mapping(
        &mut self,
        definition: &DefinitionInfo,
        mut candidates: Vec<Arc<Definition>>,
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
        while let Some(raw_key) = self.object_reader.allow_literal() {
            let key = self.parse_scalar(raw_key, definition);
            if key.is_expression() {
                has_expression_key = true;
                self.read_expression_key(definition, key, mapping)?;
                continue;
            }

            let key = to_key_string(key);
            let name = key.display();
            if !keys.insert(&name) {
                self.context.error(&key, format!("'{}' is already defined", name));
                self.skip_value()?;
                continue;
            }

            if let Some(property) = schema.match_property_and_filter(&mut candidates, &name) {
                let value_definition = definition.child(&property.type_key)?;
                let value = self.read_value(&value_definition)?;
                mapping.push_pair(key, value);
                continue;
            }

            if let Some((key_type, value_type)) = &loose_types {
                if loose_definitions.is_none() {
                    loose_definitions = Some((definition.child(key_type)?, definition.child(value_type)?));
                }
                if let Some((key_definition, value_definition)) = &loose_definitions {
                    let key = validate_literal(self.context, key, key_definition);
                    let value = self.read_value(value_definition)?;
                    mapping.push_pair(key, value);
                    continue;
                }
            }

            self.context.error(&key, format!("Unexpected value '{}'", name));
            self.skip_value()?;
        }

        check_mapping_candidates(self.context, mapping, definition, &candidates, &keys, has_expression_key);
        self.expect_mapping_end()
    }

    fn read_expression_key(
        &mut self,
        definition: &DefinitionInfo,
        key: TemplateToken,
        mapping: &mut TemplateToken,
    ) -> Result<(), Error> {
        if definition.allowed_context().is_empty() {
            self.context.error(&key, EXPRESSION_NOT_ALLOWED);
            return self.skip_value();
        }

        let value_definition = definition.child(ANY)?;
        let value = self.read_value(&value_definition)?;
        mapping.push_pair(key.with_definition_info(definition.clone()), value);
        Ok(())
    }

    fn expect_mapping_end(&mut self) -> Result<(), Error> {
        if !self.object_reader.allow_mapping_end() {
            bail!("Expected mapping end");
        }
        Ok(())
    }

    fn skip_value(&mut self) -> Result<(), Error> {
        if self.object_reader.allow_literal().is_some() {
            return Ok(());
        }

        if self.object_reader.allow_sequence_start().is_some() {
            while !self.object_reader.allow_sequence_end() {
                self.skip_value()?;
            }
            return Ok(());
        }

        if self.object_reader.allow_mapping_start().is_some() {
            while !self.object_reader.allow_mapping_end() {
                self.skip_value()?;
                self.skip_value()?;
            }
            return Ok(());
        }

        bail!(UNEXPECTED_NODE)
    }

    /// Splits a string literal into text and `${{ }}` segments. Returns the
    /// token unchanged when it holds no expression or cannot be parsed.
    fn parse_scalar(&mut self, token: TemplateToken, definition: &DefinitionInfo) -> TemplateToken {
        let raw = match &token.kind {
            TokenKind::String(string) => string.source.clone().unwrap_or_else(|| string.value.clone()),
            _ => return token,
        };

        let Some(first_start) = raw.find(OPEN_EXPRESSION) else {
            return token;
        };

        let bytes = raw.as_bytes();
        let mut segments: Vec<TemplateToken> = Vec::new();
        let mut next_start = Some(first_start);
        let mut i = 0;
        while i < raw.len() {
            let start = match next_start {
                Some(start) if start == i => start,
                Some(start) => {
                    add_text(&mut segments, &token, &raw[i..start]);
                    i = start;
                    continue;
                }
                None => {
                    add_text(&mut segments, &token, &raw[i..]);
                    break;
                }
            };

            // Find the closing braces, ignoring any inside string literals.
            i = start + OPEN_EXPRESSION.len();
            let mut end = None;
            let mut in_string = false;
            while i < bytes.len() {
                match bytes[i] {
                    b'\'' => in_string = !in_string,
                    b'}' if !in_string && bytes[i - 1] == b'}' => {
                        end = Some(i + 1);
                        i += 1;
                        break;
                    }
                    _ => {}
                }
                i += 1;
            }

            let Some(end) = end else {
                self.context.error(
                    &token,
                    "The expression is not closed. An unescaped ${{ sequence was found, but the closing }} sequence was not found.",
                );
                return token;
            };

            let inner = &raw[start + OPEN_EXPRESSION.len()..end - CLOSE_EXPRESSION.len()];
            let range = segment_range(&token, &raw, start, end);
            let expression = match self.parse_into_expression_token(inner, range, definition) {
                Ok(expression) => expression,
                Err(message) => {
                    self.context.error(&token, message);
                    return token;
                }
            };

            if matches!(expression.kind, TokenKind::InsertExpression) && (start > 0 || end < raw.len()) {
                self.context.error(
                    &token,
                    format!(
                        "The directive '{}' is not allowed in this context. Directives are not supported for expressions that are embedded within a string. Directives are only supported when the entire value is an expression.",
                        INSERT_DIRECTIVE
                    ),
                );
                return token;
            }

            segments.push(expression);
            next_start = raw[end..].find(OPEN_EXPRESSION).map(|x| x + end);
        }

        if segments.len() == 1 {
            let Some(segment) = segments.pop() else {
                return token;
            };

            // `${{ 'text' }}` is just text.
            if let TokenKind::BasicExpression(expression) = &segment.kind {
                let literal = self
                    .context
                    .parser()
                    .parse(&expression.expression)
                    .ok()
                    .and_then(|x| x.as_string_literal().map(str::to_string));
                if let Some(value) = literal {
                    let kind = TokenKind::String(StringToken {
                        value,
                        source: Some(raw),
                    });
                    return TemplateToken::new(token.file_id, token.range, kind);
                }
            }
            return segment;
        }

        let mut format = String::new();
        let mut args = String::new();
        let mut original_expressions = Vec::new();
        for segment in segments {
            match &segment.kind {
                TokenKind::String(string) => {
                    let escaped = string
                        .value
                        .replace('\'', "''")
                        .replace('{', "{{")
                        .replace('}', "}}");
                    format.push_str(&escaped);
                }
                TokenKind::BasicExpression(expression) => {
                    format.push_str(&format!("{{{}}}", original_expressions.len()));
                    args.push_str(", ");
                    args.push_str(&expression.expression);
                    original_expressions.push(segment);
                }
                _ => {}
            }
        }

        let kind = TokenKind::BasicExpression(BasicExpressionToken {
            expression: format!("format('{}'{})", format, args),
            original_expressions: Some(original_expressions),
            source: Some(raw),
        });
        TemplateToken::new(token.file_id, token.range, kind)
    }

    fn parse_into_expression_token(
        &self,
        raw_expression: &str,
        range: Option<TokenRange>,
        definition: &DefinitionInfo,
    ) -> Result<TemplateToken, String> {
        let trimmed = raw_expression.trim();
        if trimmed.is_empty() {
            return Err("An expression was expected".to_string());
        }

        if match_directive(trimmed, INSERT_DIRECTIVE, 0)? {
            return Ok(TemplateToken::new(self.file_id, range, TokenKind::InsertExpression));
        }

        let allowed = split_allowed_context(definition.allowed_context());
        self.context
            .parser()
            .parse_and_validate(trimmed, &allowed)
            .map_err(|err| err.to_string())?;

        Ok(TemplateToken::expression(self.file_id, range, trimmed))
    }
}

/// The text of a value that is an expression without `${{ }}` delimiters,
/// such as a step's `if` condition.
fn implicit_expression(token: &TemplateToken, definition: &DefinitionInfo) -> Option<String> {
    let raw = token.as_str()?;
    if raw.contains(OPEN_EXPRESSION) {
        return None;
    }

    definition
        .scalar_definitions()
        .iter()
        .any(|x| x.as_string().map_or(false, |x| x.is_expression))
        .then(|| raw.to_string())
}

fn add_text(segments: &mut Vec<TemplateToken>, token: &TemplateToken, text: &str) {
    if let Some(TokenKind::String(previous)) = segments.last_mut().map(|x| &mut x.kind) {
        previous.value.push_str(text);
        return;
    }
    segments.push(TemplateToken::string(token.file_id, token.range, text));
}

/// Narrows the range to a sub-expression when the token's text maps onto its
/// columns, i.e. a single-line plain scalar.
fn segment_range(token: &TemplateToken, raw: &str, start: usize, end: usize) -> Option<TokenRange> {
    let range = token.range?;
    let width = range.end.column.saturating_sub(range.start.column);
    if range.start.line != range.end.line || width != raw.chars().count() {
        return Some(range);
    }

    let column = |offset: usize| range.start.column + raw[..offset].chars().count();
    Some(TokenRange::new(
        Position {
            line: range.start.line,
            column: column(start),
        },
        Position {
            line: range.start.line,
            column: column(end),
        },
    ))
}

/// Whether `expression` is the directive followed by exactly `expected`
/// whitespace-separated parameters.
fn match_directive(expression: &str, directive: &str, expected: usize) -> Result<bool, String> {
    let Some(rest) = expression.strip_prefix(directive) else {
        return Ok(false);
    };
    if !rest.is_empty() && !rest.starts_with(char::is_whitespace) {
        return Ok(false);
    }

    let mut parameters: Vec<&str> = Vec::new();
    let mut in_string = false;
    let mut parens = 0;
    let mut start = 0;
    for (i, c) in rest.char_indices() {
        if c.is_whitespace() && !in_string && parens == 0 {
            if start < i {
                parameters.push(&rest[start..i]);
            }
            start = i + c.len_utf8();
        } else if c == '\'' {
            in_string = !in_string;
        } else if c == '(' && !in_string {
            parens += 1;
        } else if c == ')' && !in_string {
            parens -= 1;
        }
    }
    if start < rest.len() {
        parameters.push(&rest[start..]);
    }

    if parameters.len() != expected {
        return Err(format!(
            "Exactly {} parameter(s) were expected following the directive '{}'. Actual parameter count: {}",
            expected,
            directive,
            parameters.len()
        ));
    }
    Ok(true)
}
