// Copyright (c) Chris Gunn.
// Licensed under the MIT license.

use std::collections::VecDeque;

use anyhow::{bail, Error};

use super::tokens::TemplateToken;

/// Structural events produced by a document front end. Collection starts carry
/// an empty sequence or mapping token holding the position.
#[derive(Clone, Debug, PartialEq)]
pub enum ParseEvent {
    DocumentStart,
    DocumentEnd,
    Literal(TemplateToken),
    SequenceStart(TemplateToken),
    SequenceEnd,
    MappingStart(TemplateToken),
    MappingEnd,
}

/// Pull interface consumed by the structural reader. Each `allow_*` call
/// consumes the next event only when it has the requested shape.
pub trait ObjectReader {
    fn allow_literal(&mut self) -> Option<TemplateToken>;
    fn allow_sequence_start(&mut self) -> Option<TemplateToken>;
    fn allow_sequence_end(&mut self) -> bool;
    fn allow_mapping_start(&mut self) -> Option<TemplateToken>;
    fn allow_mapping_end(&mut self) -> bool;
    fn validate_start(&mut self) -> Result<(), Error>;
    fn validate_end(&mut self) -> Result<(), Error>;
}

pub struct EventObjectReader {
    events: VecDeque<ParseEvent>,
}

impl EventObjectReader {
    pub fn new(events: Vec<ParseEvent>) -> EventObjectReader {
        EventObjectReader {
            events: events.into(),
        }
    }
}

impl ObjectReader for EventObjectReader {
    fn allow_literal(&mut self) -> Option<TemplateToken> {
        match self.events.front() {
            Some(ParseEvent::Literal(_)) => match self.events.pop_front() {
                Some(ParseEvent::Literal(token)) => Some(token),
                _ => None,
            },
            _ => None,
        }
    }

    fn allow_sequence_start(&mut self) -> Option<TemplateToken> {
        match self.events.front() {
            Some(ParseEvent::SequenceStart(_)) => match self.events.pop_front() {
                Some(ParseEvent::SequenceStart(token)) => Some(token),
                _ => None,
            },
            _ => None,
        }
    }

    fn allow_sequence_end(&mut self) -> bool {
        if let Some(ParseEvent::SequenceEnd) = self.events.front() {
            self.events.pop_front();
            return true;
        }
        false
    }

    fn allow_mapping_start(&mut self) -> Option<TemplateToken> {
        match self.events.front() {
            Some(ParseEvent::MappingStart(_)) => match self.events.pop_front() {
                Some(ParseEvent::MappingStart(token)) => Some(token),
                _ => None,
            },
            _ => None,
        }
    }

    fn allow_mapping_end(&mut self) -> bool {
        if let Some(ParseEvent::MappingEnd) = self.events.front() {
            self.events.pop_front();
            return true;
        }
        false
    }

    fn validate_start(&mut self) -> Result<(), Error> {
        match self.events.pop_front() {
            Some(ParseEvent::DocumentStart) => Ok(()),
            _ => bail!("Expected the start of a document"),
        }
    }

    fn validate_end(&mut self) -> Result<(), Error> {
        match self.events.pop_front() {
            Some(ParseEvent::DocumentEnd) if self.events.is_empty() => Ok(()),
            _ => bail!("Expected the end of the document"),
        }
    }
}
