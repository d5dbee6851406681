// Copyright (c) Chris Gunn.
// Licensed under the MIT license.

// Turns YAML text into the flat event list read by the structural reader.


use anyhow::{bail, Error};
use saphyr_parser::{Event, Marker, Parser as YamlParser, TScalarStyle};

use super::{
    object_reader::ParseEvent,
    tokens::{Position, StringToken, TemplateToken, TokenKind, TokenRange},
};

enum Frame {
    Sequence { start: usize },
    Mapping { start: usize, first_key: bool },
}

struct EventBuilder {
    file_id: Option<usize>,
    events: Vec<ParseEvent>,
    stack: Vec<Frame>,
}

pub fn parse_yaml_events(content: &str, file_id: Option<usize>) -> Result<Vec<ParseEvent>, Error> {
    let mut builder = EventBuilder {
        file_id,
        events: Vec::new(),
        stack: Vec::new(),
    };

    let mut yaml_parser = YamlParser::new_from_str(content);
    let mut documents = 0;
    loop {
        let (event, marker) = yaml_parser.next_token()?;
        match event {
            Event::StreamEnd => break,
            Event::DocumentStart { .. } => {
                documents += 1;
                if documents > 1 {
                    bail!("{}: Multiple documents are not supported", format_marker(&marker));
                }
                builder.events.push(ParseEvent::DocumentStart);
            }
            Event::DocumentEnd { .. } => builder.events.push(ParseEvent::DocumentEnd),
            Event::Alias(..) => bail!("{}: YAML aliases are not supported", format_marker(&marker)),
            Event::Scalar(value, style, ..) => builder.scalar(value, style, &marker),
            Event::SequenceStart(..) => builder.sequence_start(&marker),
            Event::SequenceEnd => builder.collection_end(ParseEvent::SequenceEnd, &marker)?,
            Event::MappingStart(..) => builder.mapping_start(&marker),
            Event::MappingEnd => builder.collection_end(ParseEvent::MappingEnd, &marker)?,
            _ => {}
        }
    }

    // An empty file reads as a single null.
    if documents == 0 {
        let start = Position { line: 1, column: 1 };
        let token = TemplateToken::null(file_id, Some(TokenRange::new(start, start)));
        builder.events = vec![ParseEvent::DocumentStart, ParseEvent::Literal(token), ParseEvent::DocumentEnd];
    }

    Ok(builder.events)
}

fn to_position(marker: &Marker) -> Position {
    Position {
        line: marker.line(),
        column: marker.col() + 1,
    }
}

fn format_marker(marker: &Marker) -> String {
    let position = to_position(marker);
    format!("(Line: {}, Col: {})", position.line, position.column)
}

impl EventBuilder {
    // The first node inside a block mapping moves the mapping's start onto
    // its first key.
    fn node_start(&mut self, start: Position) {
        if let Some(Frame::Mapping { start: index, first_key }) = self.stack.last_mut() {
            if *first_key {
                *first_key = false;
                if let Some(ParseEvent::MappingStart(token)) = self.events.get_mut(*index) {
                    if let Some(range) = &mut token.range {
                        range.start = start;
                    }
                }
            }
        }
    }

    fn scalar(&mut self, value: String, style: TScalarStyle, marker: &Marker) {
        let start = to_position(marker);
        self.node_start(start);

        let quoted = match style {
            TScalarStyle::SingleQuoted | TScalarStyle::DoubleQuoted => 2,
            _ => 0,
        };
        let end = Position {
            line: start.line,
            column: start.column + value.chars().count() + quoted,
        };

        let kind = match style {
            TScalarStyle::Plain => resolve_plain(value),
            _ => TokenKind::String(StringToken { value, source: None }),
        };

        let token = TemplateToken::new(self.file_id, Some(TokenRange::new(start, end)), kind);
        self.events.push(ParseEvent::Literal(token));
    }

    fn sequence_start(&mut self, marker: &Marker) {
        let start = to_position(marker);
        self.node_start(start);

        self.stack.push(Frame::Sequence {
            start: self.events.len(),
        });
        let token = TemplateToken::sequence(self.file_id, Some(TokenRange::new(start, start)));
        self.events.push(ParseEvent::SequenceStart(token));
    }

    fn mapping_start(&mut self, marker: &Marker) {
        let start = to_position(marker);
        self.node_start(start);

        self.stack.push(Frame::Mapping {
            start: self.events.len(),
            first_key: true,
        });
        let token = TemplateToken::mapping(self.file_id, Some(TokenRange::new(start, start)));
        self.events.push(ParseEvent::MappingStart(token));
    }

    fn collection_end(&mut self, event: ParseEvent, marker: &Marker) -> Result<(), Error> {
        let start = match (self.stack.pop(), &event) {
            (Some(Frame::Sequence { start }), ParseEvent::SequenceEnd) => start,
            (Some(Frame::Mapping { start, .. }), ParseEvent::MappingEnd) => start,
            _ => bail!("{}: Unbalanced collection end", format_marker(marker)),
        };

        let end = to_position(marker);
        match self.events.get_mut(start) {
            Some(ParseEvent::SequenceStart(token)) | Some(ParseEvent::MappingStart(token)) => {
                if let Some(range) = &mut token.range {
                    range.end = end.max(range.start);
                }
            }
            _ => bail!("{}: Unbalanced collection end", format_marker(marker)),
        }

        self.events.push(event);
        Ok(())
    }
}

/// Applies the YAML core schema to a plain scalar.
fn resolve_plain(value: String) -> TokenKind {
    let yaml = saphyr::Yaml::from_str(&value);
    match yaml {
        saphyr::Yaml::Null => TokenKind::Null,
        saphyr::Yaml::Boolean(value) => TokenKind::Boolean(value),
        saphyr::Yaml::Integer(value) => TokenKind::Number(value as f64),
        saphyr::Yaml::Real(_) => match yaml.as_f64() {
            Some(number) => TokenKind::Number(number),
            None => TokenKind::String(StringToken { value, source: None }),
        },
        _ => TokenKind::String(StringToken { value, source: None }),
    }
}
