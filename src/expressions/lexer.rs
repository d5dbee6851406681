// Copyright (c) Chris Gunn.
// Licensed under the MIT license.

use std::ops::Range;

use chumsky::{
    error::Simple,
    primitive::{choice, end, filter, just, none_of},
    text::{self, TextParser},
    Parser,
};

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Token {
    // Kept as source text so that tokens stay hashable.
    Number(String),
    String(String),
    Ident(String),
    Dot,
    Comma,
    Star,
    LBracket,
    RBracket,
    LParen,
    RParen,
    Not,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Token::Number(value) => f.write_str(value),
            Token::String(value) => write!(f, "'{}'", value.replace('\'', "''")),
            Token::Ident(name) => f.write_str(name),
            Token::Dot => f.write_str("."),
            Token::Comma => f.write_str(","),
            Token::Star => f.write_str("*"),
            Token::LBracket => f.write_str("["),
            Token::RBracket => f.write_str("]"),
            Token::LParen => f.write_str("("),
            Token::RParen => f.write_str(")"),
            Token::Not => f.write_str("!"),
            Token::Eq => f.write_str("=="),
            Token::Ne => f.write_str("!="),
            Token::Lt => f.write_str("<"),
            Token::Le => f.write_str("<="),
            Token::Gt => f.write_str(">"),
            Token::Ge => f.write_str(">="),
            Token::And => f.write_str("&&"),
            Token::Or => f.write_str("||"),
        }
    }
}

pub fn gen_lexer() -> impl Parser<char, Vec<(Token, Range<usize>)>, Error = Simple<char>> {
    let hex = just("0x")
        .or(just("0X"))
        .ignore_then(filter(|c: &char| c.is_ascii_hexdigit()).repeated().at_least(1))
        .collect::<String>()
        .map(|digits| format!("0x{}", digits));

    let frac = just('.').chain(text::digits(10));

    let exp = just('e')
        .or(just('E'))
        .chain(just('+').or(just('-')).or_not())
        .chain::<char, _, _>(text::digits(10));

    let decimal = just('-')
        .or_not()
        .chain::<char, _, _>(text::int(10))
        .chain::<char, _, _>(frac.or_not().flatten())
        .chain::<char, _, _>(exp.or_not().flatten())
        .collect::<String>();

    let number = hex.or(decimal).map(Token::Number).labelled("number");

    // Single quotes are escaped by doubling them.
    let string = just('\'')
        .ignore_then(just("''").to('\'').or(none_of("'")).repeated())
        .then_ignore(just('\''))
        .collect::<String>()
        .map(Token::String)
        .labelled("string");

    let ident = filter(|c: &char| c.is_ascii_alphabetic() || *c == '_')
        .chain(filter(|c: &char| c.is_ascii_alphanumeric() || *c == '_' || *c == '-').repeated())
        .collect::<String>()
        .map(Token::Ident)
        .labelled("identifier");

    let op = choice((
        just("==").to(Token::Eq),
        just("!=").to(Token::Ne),
        just("<=").to(Token::Le),
        just(">=").to(Token::Ge),
        just("&&").to(Token::And),
        just("||").to(Token::Or),
        just('<').to(Token::Lt),
        just('>').to(Token::Gt),
        just('!').to(Token::Not),
    ));

    let ctrl = choice((
        just('.').to(Token::Dot),
        just(',').to(Token::Comma),
        just('*').to(Token::Star),
        just('[').to(Token::LBracket),
        just(']').to(Token::RBracket),
        just('(').to(Token::LParen),
        just(')').to(Token::RParen),
    ));

    let token = string.or(number).or(ident).or(op).or(ctrl);

    token
        .map_with_span(|tok, span| (tok, span))
        .padded()
        .repeated()
        .then_ignore(end())
}
