// Copyright (c) Chris Gunn.
// Licensed under the MIT license.

use std::ops::Range;

#[derive(Clone, Debug, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    // Character offsets within the expression source.
    pub span: Range<usize>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ExprKind {
    Literal(Literal),
    NamedValue(String),
    Index {
        object: Box<Expr>,
        index: IndexKind,
    },
    FunctionCall {
        name: String,
        args: Vec<Expr>,
    },
    Not(Box<Expr>),
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Grouping(Box<Expr>),
}

#[derive(Clone, Debug, PartialEq)]
pub enum Literal {
    Null,
    Boolean(bool),
    Number(f64),
    String(String),
}

#[derive(Clone, Debug, PartialEq)]
pub enum IndexKind {
    Property(String),
    Expr(Box<Expr>),
    Wildcard,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinaryOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

impl Expr {
    pub fn new(kind: ExprKind, span: Range<usize>) -> Expr {
        Expr { kind, span }
    }

    /// 1-based position used in error messages.
    pub fn position(&self) -> usize {
        self.span.start + 1
    }

    pub fn as_string_literal(&self) -> Option<&str> {
        match &self.kind {
            ExprKind::Literal(Literal::String(value)) => Some(value),
            ExprKind::Grouping(inner) => inner.as_string_literal(),
            _ => None,
        }
    }

    /// Visits this node and every descendant, parents first.
    pub fn walk<'a>(&'a self, visit: &mut dyn FnMut(&'a Expr)) {
        visit(self);
        match &self.kind {
            ExprKind::Literal(_) | ExprKind::NamedValue(_) => {}
            ExprKind::Index { object, index } => {
                object.walk(visit);
                if let IndexKind::Expr(index) = index {
                    index.walk(visit);
                }
            }
            ExprKind::FunctionCall { args, .. } => {
                for arg in args {
                    arg.walk(visit);
                }
            }
            ExprKind::Not(operand) | ExprKind::Grouping(operand) => operand.walk(visit),
            ExprKind::Binary { left, right, .. } => {
                left.walk(visit);
                right.walk(visit);
            }
        }
    }

    pub fn calls_any_function(&self, names: &[&str]) -> bool {
        let mut found = false;
        self.walk(&mut |expr| {
            if let ExprKind::FunctionCall { name, .. } = &expr.kind {
                if names.iter().any(|x| x.eq_ignore_ascii_case(name)) {
                    found = true;
                }
            }
        });
        found
    }
}
