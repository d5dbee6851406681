// Copyright (c) Chris Gunn.
// Licensed under the MIT license.

// Walks a token tree one node at a time, substituting expression results as
// nodes are reached.


use std::collections::VecDeque;

use anyhow::{bail, Error};
use tracing::debug;

use super::{
    context::TemplateContext,
    tokens::{TemplateToken, TokenKind, TokenType},
};
use crate::expressions::evaluate as evaluate_expression;

enum Frame {
    Root {
        token: Option<TemplateToken>,
    },
    Sequence {
        items: VecDeque<TemplateToken>,
    },
    Mapping {
        pairs: VecDeque<(TemplateToken, TemplateToken)>,
        // The value of the pair whose key was just read.
        pending_value: Option<TemplateToken>,
    },
}

// An expression removed from the current frame for evaluation.
enum Pending {
    Root(TemplateToken),
    Item(TemplateToken),
    Key(TemplateToken, TemplateToken),
    Value(TemplateToken),
}

/// Pull reader over a template. Every `allow_*` call takes an `expand` flag;
/// when set, an expression at the current position is evaluated first and
/// its result read in its place.
///
/// Failed evaluations are recorded in the context and degrade instead of
/// aborting: a value or root becomes `""`, a sequence item becomes `""`, a
/// mapping key drops its pair and an insert contributes nothing.
pub struct TemplateUnraveler<'a> {
    context: &'a mut TemplateContext,
    stack: Vec<Frame>,
}

impl<'a> TemplateUnraveler<'a> {
    pub fn new(context: &'a mut TemplateContext, template: TemplateToken) -> TemplateUnraveler<'a> {
        TemplateUnraveler {
            context,
            stack: vec![Frame::Root { token: Some(template) }],
        }
    }

    pub fn context(&mut self) -> &mut TemplateContext {
        self.context
    }

    pub fn allow_scalar(&mut self, expand: bool) -> Option<TemplateToken> {
        self.unravel(expand);
        if !self.current().map_or(false, TemplateToken::is_scalar) {
            return None;
        }
        self.take_current()
    }

    /// Enters a sequence, returning it without its items.
    pub fn allow_sequence_start(&mut self, expand: bool) -> Option<TemplateToken> {
        self.unravel(expand);
        if self.current().map(TemplateToken::token_type) != Some(TokenType::Sequence) {
            return None;
        }

        let token = self.take_current()?;
        let shell = token.shell();
        if let TokenKind::Sequence(items) = token.kind {
            self.stack.push(Frame::Sequence { items: items.into() });
        }
        Some(shell)
    }

    pub fn allow_sequence_end(&mut self, expand: bool) -> bool {
        self.unravel(expand);
        if !matches!(self.stack.last(), Some(Frame::Sequence { items }) if items.is_empty()) {
            return false;
        }
        self.stack.pop();
        true
    }

    /// Enters a mapping, returning it without its pairs.
    pub fn allow_mapping_start(&mut self, expand: bool) -> Option<TemplateToken> {
        self.unravel(expand);
        if self.current().map(TemplateToken::token_type) != Some(TokenType::Mapping) {
            return None;
        }

        let token = self.take_current()?;
        let shell = token.shell();
        if let TokenKind::Mapping(pairs) = token.kind {
            self.stack.push(Frame::Mapping {
                pairs: pairs.into(),
                pending_value: None,
            });
        }
        Some(shell)
    }

    pub fn allow_mapping_end(&mut self, expand: bool) -> bool {
        self.unravel(expand);
        let at_end = matches!(
            self.stack.last(),
            Some(Frame::Mapping { pairs, pending_value: None }) if pairs.is_empty()
        );
        if !at_end {
            return false;
        }
        self.stack.pop();
        true
    }

    pub fn skip_sequence_item(&mut self) -> Result<(), Error> {
        match self.stack.last_mut() {
            Some(Frame::Sequence { items }) if !items.is_empty() => {
                items.pop_front();
                Ok(())
            }
            _ => bail!("Expected a sequence item"),
        }
    }

    /// Skips the next key. Its value is read or skipped next.
    pub fn skip_mapping_key(&mut self) -> Result<(), Error> {
        match self.stack.last_mut() {
            Some(Frame::Mapping { pairs, pending_value }) if pending_value.is_none() => match pairs.pop_front() {
                Some((_, value)) => {
                    *pending_value = Some(value);
                    Ok(())
                }
                None => bail!("Expected a mapping key"),
            },
            _ => bail!("Expected a mapping key"),
        }
    }

    pub fn skip_mapping_value(&mut self) -> Result<(), Error> {
        match self.stack.last_mut() {
            Some(Frame::Mapping { pending_value, .. }) if pending_value.is_some() => {
                *pending_value = None;
                Ok(())
            }
            _ => bail!("Expected a mapping value"),
        }
    }

    pub fn read_sequence_end(&mut self) -> Result<(), Error> {
        if !self.allow_sequence_end(false) {
            bail!("Expected sequence end");
        }
        Ok(())
    }

    pub fn read_mapping_end(&mut self) -> Result<(), Error> {
        if !self.allow_mapping_end(false) {
            bail!("Expected mapping end");
        }
        Ok(())
    }

    pub fn read_end(&mut self) -> Result<(), Error> {
        match self.stack.as_slice() {
            [Frame::Root { token: None }] => Ok(()),
            _ => bail!("Expected end of template"),
        }
    }

    fn current(&self) -> Option<&TemplateToken> {
        match self.stack.last()? {
            Frame::Root { token } => token.as_ref(),
            Frame::Sequence { items } => items.front(),
            Frame::Mapping { pairs, pending_value } => match pending_value {
                Some(value) => Some(value),
                None => pairs.front().map(|(key, _)| key),
            },
        }
    }

    // Reading a key leaves its value pending.
    fn take_current(&mut self) -> Option<TemplateToken> {
        match self.stack.last_mut()? {
            Frame::Root { token } => token.take(),
            Frame::Sequence { items } => items.pop_front(),
            Frame::Mapping { pairs, pending_value } => match pending_value.take() {
                Some(value) => Some(value),
                None => {
                    let (key, value) = pairs.pop_front()?;
                    *pending_value = Some(value);
                    Some(key)
                }
            },
        }
    }

    fn take_expression(&mut self) -> Option<Pending> {
        let is_basic = |token: &TemplateToken| matches!(token.kind, TokenKind::BasicExpression(_));
        match self.stack.last_mut()? {
            Frame::Root { token } => match token.as_ref().map_or(false, is_basic) {
                true => token.take().map(Pending::Root),
                false => None,
            },
            Frame::Sequence { items } => match items.front().map_or(false, is_basic) {
                true => items.pop_front().map(Pending::Item),
                false => None,
            },
            Frame::Mapping { pairs, pending_value } => match pending_value.as_ref().map(is_basic) {
                Some(true) => pending_value.take().map(Pending::Value),
                Some(false) => None,
                None => match pairs.front().map_or(false, |(key, _)| key.is_expression()) {
                    true => pairs.pop_front().map(|(key, value)| Pending::Key(key, value)),
                    false => None,
                },
            },
        }
    }

    fn unravel(&mut self, expand: bool) {
        if !expand {
            return;
        }

        while let Some(pending) = self.take_expression() {
            match pending {
                Pending::Root(expression) => {
                    let value = self.evaluate_or_empty(&expression);
                    if let Some(Frame::Root { token }) = self.stack.last_mut() {
                        *token = Some(value);
                    }
                    return;
                }
                Pending::Value(expression) => {
                    let value = self.evaluate_or_empty(&expression);
                    if let Some(Frame::Mapping { pending_value, .. }) = self.stack.last_mut() {
                        *pending_value = Some(value);
                    }
                    return;
                }
                Pending::Item(expression) => {
                    let items = match self.evaluate(&expression) {
                        Some(TemplateToken {
                            kind: TokenKind::Sequence(items),
                            ..
                        }) => items,
                        Some(value) => vec![value],
                        None => vec![empty_string(&expression)],
                    };
                    if let Some(Frame::Sequence { items: queue }) = self.stack.last_mut() {
                        for item in items.into_iter().rev() {
                            queue.push_front(item);
                        }
                    }
                }
                Pending::Key(key, value) => {
                    let pairs = match key.kind {
                        TokenKind::InsertExpression => self.insert_pairs(&key, value),
                        _ => match self.evaluate(&key) {
                            Some(result) if result.is_literal() => {
                                let key = TemplateToken::string(key.file_id, key.range, result.display());
                                vec![(key, value)]
                            }
                            Some(_) => {
                                self.context.error(&key, "Expected a string");
                                Vec::new()
                            }
                            None => Vec::new(),
                        },
                    };
                    if let Some(Frame::Mapping { pairs: queue, .. }) = self.stack.last_mut() {
                        for pair in pairs.into_iter().rev() {
                            queue.push_front(pair);
                        }
                    }
                }
            }
        }
    }

    // Pairs contributed by `${{ insert }}: <value>`.
    fn insert_pairs(
        &mut self,
        key: &TemplateToken,
        value: TemplateToken,
    ) -> Vec<(TemplateToken, TemplateToken)> {
        let value = match value.kind {
            TokenKind::BasicExpression(_) => match self.evaluate(&value) {
                Some(result) => result,
                None => return Vec::new(),
            },
            _ => value,
        };

        match value.kind {
            TokenKind::Mapping(pairs) => pairs,
            _ => {
                self.context.error(key, "Expected a mapping");
                Vec::new()
            }
        }
    }

    fn evaluate(&mut self, token: &TemplateToken) -> Option<TemplateToken> {
        let TokenKind::BasicExpression(expression) = &token.kind else {
            return Some(token.clone());
        };

        let result = self
            .context
            .parser()
            .parse(&expression.expression)
            .and_then(|expr| evaluate_expression(&expr, self.context.evaluation_context()));

        match result {
            Ok(data) => {
                debug!(expression = %expression.expression, result = data.type_name(), "evaluated expression");
                Some(TemplateToken::from_data(&data, token.file_id, token.range))
            }
            Err(err) => {
                self.context.error(token, err);
                None
            }
        }
    }

    fn evaluate_or_empty(&mut self, token: &TemplateToken) -> TemplateToken {
        self.evaluate(token).unwrap_or_else(|| empty_string(token))
    }
}

fn empty_string(token: &TemplateToken) -> TemplateToken {
    TemplateToken::string(token.file_id, token.range, "")
}
