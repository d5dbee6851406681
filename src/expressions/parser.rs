// Copyright (c) Chris Gunn.
// Licensed under the MIT license.


use std::ops::Range;

use chumsky::{prelude::*, Stream};

use super::{
    ast::{BinaryOp, Expr, ExprKind, IndexKind, Literal},
    data::parse_number,
    functions::builtin_function,
    lexer::{gen_lexer, Token},
    AllowedContext, ExpressionError, MAX_EXPRESSION_DEPTH, MAX_EXPRESSION_LENGTH,
};

pub struct ExpressionParser {
    lexer: Box<dyn Parser<char, Vec<(Token, Range<usize>)>, Error = Simple<char>>>,
    parser: Box<dyn Parser<Token, Expr, Error = Simple<Token>>>,
}

impl Default for ExpressionParser {
    fn default() -> Self {
        Self::new()
    }
}

impl ExpressionParser {
    pub fn new() -> ExpressionParser {
        let lexer = gen_lexer();
        let parser = gen_expression_parser();
        ExpressionParser {
            lexer: Box::new(lexer),
            parser: Box::new(parser),
        }
    }

    /// Parses the expression syntax only.
    pub fn parse(&self, expression: &str) -> Result<Expr, ExpressionError> {
        if expression.chars().count() > MAX_EXPRESSION_LENGTH {
            return Err(ExpressionError::MaxLengthExceeded(MAX_EXPRESSION_LENGTH));
        }

        let tokens = self.lexer.parse(expression).map_err(|errs| {
            let err = errs.into_iter().next();
            match err.as_ref().and_then(|err| err.found().map(|found| (*found, err.span()))) {
                Some((found, span)) => ExpressionError::UnexpectedSymbol {
                    symbol: found.to_string(),
                    position: span.start + 1,
                    expression: expression.to_string(),
                },
                None => ExpressionError::UnexpectedEnd {
                    expression: expression.to_string(),
                },
            }
        })?;

        // Bound the nesting before handing the tokens to the recursive parser.
        // A run of `!` nests as deeply as a run of `(`.
        let mut nesting = 0usize;
        let mut nots = 0usize;
        for (token, _) in &tokens {
            match token {
                Token::LParen | Token::LBracket => nesting += 1,
                Token::Not => nots += 1,
                Token::RParen | Token::RBracket => {
                    nesting = nesting.saturating_sub(1);
                    nots = 0;
                }
                _ => nots = 0,
            }
            if nesting + nots > MAX_EXPRESSION_DEPTH {
                return Err(ExpressionError::MaxDepthExceeded(MAX_EXPRESSION_DEPTH));
            }
        }

        let len = expression.chars().count();
        let eoi = len..len + 1;
        let expr = self
            .parser
            .parse(Stream::from_iter(eoi, tokens.into_iter()))
            .map_err(|errs| {
                let err = errs.into_iter().next();
                match err.as_ref().and_then(|err| err.found().map(|found| (found.clone(), err.span()))) {
                    Some((found, span)) => ExpressionError::UnexpectedSymbol {
                        symbol: found.to_string(),
                        position: span.start + 1,
                        expression: expression.to_string(),
                    },
                    None => ExpressionError::UnexpectedEnd {
                        expression: expression.to_string(),
                    },
                }
            })?;

        Ok(expr)
    }

    /// Parses the expression and checks every named value and function call
    /// against the allowed context.
    pub fn parse_and_validate(&self, expression: &str, allowed: &AllowedContext) -> Result<Expr, ExpressionError> {
        let expr = self.parse(expression)?;
        validate_names(&expr, expression, allowed)?;
        Ok(expr)
    }
}

fn validate_names(expr: &Expr, expression: &str, allowed: &AllowedContext) -> Result<(), ExpressionError> {
    let mut result = Ok(());
    expr.walk(&mut |node| {
        if result.is_err() {
            return;
        }

        match &node.kind {
            ExprKind::NamedValue(name) if !allowed.has_named_context(name) => {
                result = Err(ExpressionError::UnrecognizedNamedValue {
                    name: name.clone(),
                    position: node.position(),
                    expression: expression.to_string(),
                });
            }
            ExprKind::FunctionCall { name, args } => {
                let (min_args, max_args) = match (builtin_function(name), allowed.function(name)) {
                    (Some(builtin), _) => (builtin.min_args, builtin.max_args),
                    (None, Some(signature)) => (signature.min_args, signature.max_args),
                    (None, None) => {
                        result = Err(ExpressionError::UnrecognizedFunction {
                            name: name.clone(),
                            position: node.position(),
                            expression: expression.to_string(),
                        });
                        return;
                    }
                };

                if args.len() < min_args {
                    result = Err(ExpressionError::TooFewParameters {
                        name: name.clone(),
                        position: node.position(),
                        expression: expression.to_string(),
                    });
                } else if args.len() > max_args {
                    result = Err(ExpressionError::TooManyParameters {
                        name: name.clone(),
                        position: node.position(),
                        expression: expression.to_string(),
                    });
                }
            }
            _ => {}
        }
    });
    result
}

fn fold_binary(left: Expr, (op, right): (BinaryOp, Expr)) -> Expr {
    let span = left.span.start..right.span.end;
    let kind = ExprKind::Binary {
        op,
        left: Box::new(left),
        right: Box::new(right),
    };
    Expr::new(kind, span)
}

fn gen_expression_parser() -> impl Parser<Token, Expr, Error = Simple<Token>> {
    let expr = recursive(|expr| {
        let literal = select! {
            Token::Number(value) => Literal::Number(parse_number(&value)),
            Token::String(value) => Literal::String(value),
            Token::Ident(word) if word == "null" => Literal::Null,
            Token::Ident(word) if word == "true" => Literal::Boolean(true),
            Token::Ident(word) if word == "false" => Literal::Boolean(false),
            Token::Ident(word) if word == "NaN" => Literal::Number(f64::NAN),
            Token::Ident(word) if word == "Infinity" => Literal::Number(f64::INFINITY),
        }
        .map_with_span(|literal, span| Expr::new(ExprKind::Literal(literal), span))
        .labelled("value");

        let ident = select! { Token::Ident(name) => name }.labelled("identifier");

        let args = expr
            .clone()
            .separated_by(just(Token::Comma))
            .delimited_by(just(Token::LParen), just(Token::RParen));

        let call = ident
            .clone()
            .then(args)
            .map_with_span(|(name, args), span| Expr::new(ExprKind::FunctionCall { name, args }, span));

        let named_value = ident
            .clone()
            .map_with_span(|name, span| Expr::new(ExprKind::NamedValue(name), span));

        let grouping = expr
            .clone()
            .delimited_by(just(Token::LParen), just(Token::RParen))
            .map_with_span(|inner, span| Expr::new(ExprKind::Grouping(Box::new(inner)), span));

        let atom = literal.or(call).or(named_value).or(grouping);

        let property = just(Token::Dot).ignore_then(
            ident
                .map(IndexKind::Property)
                .or(just(Token::Star).to(IndexKind::Wildcard)),
        );

        let index = just(Token::Star)
            .to(IndexKind::Wildcard)
            .or(expr.clone().map(|index| IndexKind::Expr(Box::new(index))))
            .delimited_by(just(Token::LBracket), just(Token::RBracket));

        let postfix = atom
            .then(property.or(index).map_with_span(|index, span| (index, span)).repeated())
            .foldl(|object, (index, span): (IndexKind, Range<usize>)| {
                let span = object.span.start..span.end;
                let kind = ExprKind::Index {
                    object: Box::new(object),
                    index,
                };
                Expr::new(kind, span)
            })
            .boxed();

        let unary = just(Token::Not)
            .map_with_span(|_, span: Range<usize>| span)
            .repeated()
            .then(postfix)
            .foldr(|not_span, operand| {
                let span = not_span.start..operand.span.end;
                Expr::new(ExprKind::Not(Box::new(operand)), span)
            })
            .boxed();

        let comparison_op = choice((
            just(Token::Lt).to(BinaryOp::Lt),
            just(Token::Le).to(BinaryOp::Le),
            just(Token::Gt).to(BinaryOp::Gt),
            just(Token::Ge).to(BinaryOp::Ge),
        ));
        let comparison = unary
            .clone()
            .then(comparison_op.then(unary).repeated())
            .foldl(fold_binary)
            .boxed();

        let equality_op = just(Token::Eq).to(BinaryOp::Eq).or(just(Token::Ne).to(BinaryOp::Ne));
        let equality = comparison
            .clone()
            .then(equality_op.then(comparison).repeated())
            .foldl(fold_binary)
            .boxed();

        let and = equality
            .clone()
            .then(just(Token::And).to(BinaryOp::And).then(equality).repeated())
            .foldl(fold_binary)
            .boxed();

        and.clone()
            .then(just(Token::Or).to(BinaryOp::Or).then(and).repeated())
            .foldl(fold_binary)
    });

    expr.then_ignore(end())
}
