// Copyright (c) Chris Gunn.
// Licensed under the MIT license.

#[cfg(test)]
mod tests;

use std::fmt;

use anyhow::{anyhow, Error};

use super::definition_info::DefinitionInfo;
use crate::expressions::data::{format_number, Data};

/// 1-based line and column.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TokenRange {
    pub start: Position,
    pub end: Position,
}

impl TokenRange {
    pub fn new(start: Position, end: Position) -> TokenRange {
        TokenRange { start, end }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TokenType {
    Null,
    Boolean,
    Number,
    String,
    Sequence,
    Mapping,
    BasicExpression,
    InsertExpression,
}

impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TokenType::Null => "Null",
            TokenType::Boolean => "Boolean",
            TokenType::Number => "Number",
            TokenType::String => "String",
            TokenType::Sequence => "Sequence",
            TokenType::Mapping => "Mapping",
            TokenType::BasicExpression => "BasicExpression",
            TokenType::InsertExpression => "InsertExpression",
        };
        f.write_str(name)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct StringToken {
    pub value: String,
    // Raw text before expression folding, when it differs from `value`.
    pub source: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct BasicExpressionToken {
    pub expression: String,
    // Set when the expression was folded from text mixed with several
    // expressions into a single `format(...)` call.
    pub original_expressions: Option<Vec<TemplateToken>>,
    pub source: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum TokenKind {
    Null,
    Boolean(bool),
    Number(f64),
    String(StringToken),
    Sequence(Vec<TemplateToken>),
    Mapping(Vec<(TemplateToken, TemplateToken)>),
    BasicExpression(BasicExpressionToken),
    InsertExpression,
}

#[derive(Clone, Debug)]
pub struct TemplateToken {
    pub file_id: Option<usize>,
    pub range: Option<TokenRange>,
    pub kind: TokenKind,
    definition_info: Option<DefinitionInfo>,
}

// Definition info is not part of a token's identity.
impl PartialEq for TemplateToken {
    fn eq(&self, other: &Self) -> bool {
        self.file_id == other.file_id && self.range == other.range && self.kind == other.kind
    }
}

impl TemplateToken {
    pub fn new(file_id: Option<usize>, range: Option<TokenRange>, kind: TokenKind) -> TemplateToken {
        TemplateToken {
            file_id,
            range,
            kind,
            definition_info: None,
        }
    }

    pub fn null(file_id: Option<usize>, range: Option<TokenRange>) -> TemplateToken {
        TemplateToken::new(file_id, range, TokenKind::Null)
    }

    pub fn string(file_id: Option<usize>, range: Option<TokenRange>, value: impl Into<String>) -> TemplateToken {
        let kind = TokenKind::String(StringToken {
            value: value.into(),
            source: None,
        });
        TemplateToken::new(file_id, range, kind)
    }

    pub fn expression(file_id: Option<usize>, range: Option<TokenRange>, expression: impl Into<String>) -> TemplateToken {
        let kind = TokenKind::BasicExpression(BasicExpressionToken {
            expression: expression.into(),
            original_expressions: None,
            source: None,
        });
        TemplateToken::new(file_id, range, kind)
    }

    pub fn sequence(file_id: Option<usize>, range: Option<TokenRange>) -> TemplateToken {
        TemplateToken::new(file_id, range, TokenKind::Sequence(Vec::new()))
    }

    pub fn mapping(file_id: Option<usize>, range: Option<TokenRange>) -> TemplateToken {
        TemplateToken::new(file_id, range, TokenKind::Mapping(Vec::new()))
    }

    /// A copy of this token without children, keeping its position and
    /// definition info.
    pub fn shell(&self) -> TemplateToken {
        let kind = match &self.kind {
            TokenKind::Sequence(_) => TokenKind::Sequence(Vec::new()),
            TokenKind::Mapping(_) => TokenKind::Mapping(Vec::new()),
            kind => kind.clone(),
        };
        TemplateToken {
            file_id: self.file_id,
            range: self.range,
            kind,
            definition_info: self.definition_info.clone(),
        }
    }

    pub fn token_type(&self) -> TokenType {
        match &self.kind {
            TokenKind::Null => TokenType::Null,
            TokenKind::Boolean(_) => TokenType::Boolean,
            TokenKind::Number(_) => TokenType::Number,
            TokenKind::String(_) => TokenType::String,
            TokenKind::Sequence(_) => TokenType::Sequence,
            TokenKind::Mapping(_) => TokenType::Mapping,
            TokenKind::BasicExpression(_) => TokenType::BasicExpression,
            TokenKind::InsertExpression => TokenType::InsertExpression,
        }
    }

    pub fn is_literal(&self) -> bool {
        matches!(
            self.kind,
            TokenKind::Null | TokenKind::Boolean(_) | TokenKind::Number(_) | TokenKind::String(_)
        )
    }

    pub fn is_expression(&self) -> bool {
        matches!(self.kind, TokenKind::BasicExpression(_) | TokenKind::InsertExpression)
    }

    pub fn is_scalar(&self) -> bool {
        self.is_literal() || self.is_expression()
    }

    pub fn definition_info(&self) -> Option<&DefinitionInfo> {
        self.definition_info.as_ref()
    }

    /// Each pass assigns a token's info once. The evaluator assigns its own
    /// info to the copy it builds.
    pub fn set_definition_info(&mut self, info: DefinitionInfo) {
        self.definition_info = Some(info);
    }

    pub fn with_definition_info(mut self, info: DefinitionInfo) -> TemplateToken {
        self.set_definition_info(info);
        self
    }

    pub fn as_str(&self) -> Option<&str> {
        match &self.kind {
            TokenKind::String(string) => Some(&string.value),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&Vec<TemplateToken>> {
        match &self.kind {
            TokenKind::Sequence(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_mapping(&self) -> Option<&Vec<(TemplateToken, TemplateToken)>> {
        match &self.kind {
            TokenKind::Mapping(pairs) => Some(pairs),
            _ => None,
        }
    }

    /// Adds an item to a sequence token. Ignored for other kinds.
    pub fn push_item(&mut self, item: TemplateToken) {
        if let TokenKind::Sequence(items) = &mut self.kind {
            items.push(item);
        }
    }

    /// Adds a pair to a mapping token. Ignored for other kinds.
    pub fn push_pair(&mut self, key: TemplateToken, value: TemplateToken) {
        if let TokenKind::Mapping(pairs) = &mut self.kind {
            pairs.push((key, value));
        }
    }

    /// Looks up a mapping value by its literal string key.
    pub fn get(&self, key: &str) -> Option<&TemplateToken> {
        self.as_mapping()?
            .iter()
            .find(|(k, _)| k.as_str() == Some(key))
            .map(|(_, v)| v)
    }

    pub fn display(&self) -> String {
        match &self.kind {
            TokenKind::Null => String::new(),
            TokenKind::Boolean(value) => value.to_string(),
            TokenKind::Number(value) => format_number(*value),
            TokenKind::String(string) => string.value.clone(),
            TokenKind::Sequence(_) => TokenType::Sequence.to_string(),
            TokenKind::Mapping(_) => TokenType::Mapping.to_string(),
            TokenKind::BasicExpression(expr) => format!("${{{{ {} }}}}", expr.expression),
            TokenKind::InsertExpression => format!("${{{{ {} }}}}", super::INSERT_DIRECTIVE),
        }
    }

    fn unexpected_type(&self, what: &str, expected: TokenType) -> Error {
        anyhow!(
            "Unexpected type '{}' encountered while reading '{}'. The type '{}' was expected.",
            self.token_type(),
            what,
            expected
        )
    }

    pub fn assert_mapping(&self, what: &str) -> Result<&Vec<(TemplateToken, TemplateToken)>, Error> {
        self.as_mapping()
            .ok_or_else(|| self.unexpected_type(what, TokenType::Mapping))
    }

    pub fn assert_sequence(&self, what: &str) -> Result<&Vec<TemplateToken>, Error> {
        self.as_sequence()
            .ok_or_else(|| self.unexpected_type(what, TokenType::Sequence))
    }

    pub fn assert_string(&self, what: &str) -> Result<&str, Error> {
        self.as_str().ok_or_else(|| self.unexpected_type(what, TokenType::String))
    }

    pub fn assert_boolean(&self, what: &str) -> Result<bool, Error> {
        match &self.kind {
            TokenKind::Boolean(value) => Ok(*value),
            _ => Err(self.unexpected_type(what, TokenType::Boolean)),
        }
    }

    pub fn assert_number(&self, what: &str) -> Result<f64, Error> {
        match &self.kind {
            TokenKind::Number(value) => Ok(*value),
            _ => Err(self.unexpected_type(what, TokenType::Number)),
        }
    }

    pub fn assert_literal(&self, what: &str) -> Result<&TemplateToken, Error> {
        match self.is_literal() {
            true => Ok(self),
            false => Err(anyhow!(
                "Unexpected type '{}' encountered while reading '{}'. A literal was expected.",
                self.token_type(),
                what
            )),
        }
    }

    pub fn assert_scalar(&self, what: &str) -> Result<&TemplateToken, Error> {
        match self.is_scalar() {
            true => Ok(self),
            false => Err(anyhow!(
                "Unexpected type '{}' encountered while reading '{}'. A scalar was expected.",
                self.token_type(),
                what
            )),
        }
    }

    pub fn assert_unexpected_value(&self, what: &str) -> Error {
        anyhow!("Error while reading '{}'. Unexpected value '{}'", what, self.display())
    }

    /// Depth-first, pre-order walk over this token and its descendants.
    /// Mapping keys are visited before their values.
    pub fn traverse(&self) -> Traverse<'_> {
        Traverse { stack: vec![self] }
    }

    /// Builds a token tree from an evaluation result. Dictionary keys become
    /// string tokens.
    pub fn from_data(data: &Data, file_id: Option<usize>, range: Option<TokenRange>) -> TemplateToken {
        let kind = match data {
            Data::Null => TokenKind::Null,
            Data::Boolean(value) => TokenKind::Boolean(*value),
            Data::Number(value) => TokenKind::Number(*value),
            Data::String(value) => TokenKind::String(StringToken {
                value: value.as_ref().clone(),
                source: None,
            }),
            Data::Array(items) => TokenKind::Sequence(
                items
                    .iter()
                    .map(|item| TemplateToken::from_data(item, file_id, range))
                    .collect(),
            ),
            Data::Dictionary(map) => TokenKind::Mapping(
                map.iter()
                    .map(|(key, value)| {
                        (
                            TemplateToken::string(file_id, range, key.clone()),
                            TemplateToken::from_data(value, file_id, range),
                        )
                    })
                    .collect(),
            ),
        };
        TemplateToken::new(file_id, range, kind)
    }

    /// Converts a literal tree into expression data. Expressions are kept as
    /// their display text.
    pub fn to_data(&self) -> Data {
        match &self.kind {
            TokenKind::Null => Data::Null,
            TokenKind::Boolean(value) => Data::Boolean(*value),
            TokenKind::Number(value) => Data::Number(*value),
            TokenKind::String(string) => Data::string(string.value.clone()),
            TokenKind::Sequence(items) => Data::array(items.iter().map(TemplateToken::to_data).collect()),
            TokenKind::Mapping(pairs) => Data::dictionary(pairs.iter().map(|(k, v)| (k.display(), v.to_data()))),
            TokenKind::BasicExpression(_) | TokenKind::InsertExpression => Data::string(self.display()),
        }
    }
}

pub struct Traverse<'a> {
    stack: Vec<&'a TemplateToken>,
}

impl<'a> Iterator for Traverse<'a> {
    type Item = &'a TemplateToken;

    fn next(&mut self) -> Option<Self::Item> {
        let token = self.stack.pop()?;
        match &token.kind {
            TokenKind::Sequence(items) => self.stack.extend(items.iter().rev()),
            TokenKind::Mapping(pairs) => {
                for (key, value) in pairs.iter().rev() {
                    self.stack.push(value);
                    self.stack.push(key);
                }
            }
            _ => {}
        }
        Some(token)
    }
}
