// Copyright (c) Chris Gunn.
// Licensed under the MIT license.

#[cfg(test)]
mod tests;

use std::{cmp::Ordering, fmt, rc::Rc};

use super::{
    ast::{BinaryOp, Expr, ExprKind, IndexKind, Literal},
    data::Data,
    functions::builtin_function,
    ExpressionError,
};

pub type FunctionImpl = Rc<dyn Fn(&[Data]) -> Result<Data, ExpressionError>>;

/// Named context values and extra functions available while evaluating.
/// Names are matched case-insensitively.
#[derive(Clone, Default)]
pub struct EvaluationContext {
    contexts: Vec<(String, Data)>,
    functions: Vec<(String, FunctionImpl)>,
}

impl fmt::Debug for EvaluationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EvaluationContext")
            .field("contexts", &self.contexts)
            .field("functions", &self.functions.iter().map(|(name, _)| name).collect::<Vec<_>>())
            .finish()
    }
}

impl EvaluationContext {
    pub fn new() -> EvaluationContext {
        EvaluationContext::default()
    }

    pub fn add_context(&mut self, name: impl Into<String>, value: Data) {
        let name = name.into();
        self.contexts.retain(|(x, _)| !x.eq_ignore_ascii_case(&name));
        self.contexts.push((name, value));
    }

    pub fn context(&self, name: &str) -> Option<&Data> {
        self.contexts
            .iter()
            .find(|(x, _)| x.eq_ignore_ascii_case(name))
            .map(|(_, value)| value)
    }

    pub fn add_function(&mut self, name: impl Into<String>, function: FunctionImpl) {
        let name = name.into();
        self.functions.retain(|(x, _)| !x.eq_ignore_ascii_case(&name));
        self.functions.push((name, function));
    }

    pub fn function(&self, name: &str) -> Option<&FunctionImpl> {
        self.functions
            .iter()
            .find(|(x, _)| x.eq_ignore_ascii_case(name))
            .map(|(_, function)| function)
    }

    pub fn has_function(&self, name: &str) -> bool {
        self.function(name).is_some() || builtin_function(name).is_some()
    }
}

// The result of a wildcard index keeps applying later indexers to every item.
enum Value {
    Data(Data),
    Filtered(Vec<Data>),
}

impl Value {
    fn into_data(self) -> Data {
        match self {
            Value::Data(data) => data,
            Value::Filtered(items) => Data::array(items),
        }
    }

    fn is_truthy(&self) -> bool {
        match self {
            Value::Data(data) => data.is_truthy(),
            Value::Filtered(_) => true,
        }
    }
}

pub fn evaluate(expr: &Expr, context: &EvaluationContext) -> Result<Data, ExpressionError> {
    Ok(eval(expr, context)?.into_data())
}

fn eval(expr: &Expr, context: &EvaluationContext) -> Result<Value, ExpressionError> {
    let value = match &expr.kind {
        ExprKind::Literal(literal) => Value::Data(match literal {
            Literal::Null => Data::Null,
            Literal::Boolean(value) => Data::Boolean(*value),
            Literal::Number(value) => Data::Number(*value),
            Literal::String(value) => Data::string(value.clone()),
        }),
        ExprKind::NamedValue(name) => match context.context(name) {
            Some(value) => Value::Data(value.clone()),
            None => {
                return Err(ExpressionError::Evaluation(format!(
                    "Unrecognized named-value: '{}'",
                    name
                )))
            }
        },
        ExprKind::Index { object, index } => {
            let object = eval(object, context)?;
            match index {
                IndexKind::Wildcard => wildcard(object),
                IndexKind::Property(name) => apply_index(object, &Data::string(name.clone())),
                IndexKind::Expr(index) => {
                    let key = eval(index, context)?.into_data();
                    apply_index(object, &key)
                }
            }
        }
        ExprKind::FunctionCall { name, args } => {
            let args = args
                .iter()
                .map(|arg| Ok(eval(arg, context)?.into_data()))
                .collect::<Result<Vec<_>, ExpressionError>>()?;
            Value::Data(call_function(name, &args, context)?)
        }
        ExprKind::Not(operand) => Value::Data(Data::Boolean(!eval(operand, context)?.is_truthy())),
        ExprKind::Grouping(inner) => eval(inner, context)?,
        ExprKind::Binary { op, left, right } => {
            let left = eval(left, context)?;
            match op {
                BinaryOp::And => match left.is_truthy() {
                    true => eval(right, context)?,
                    false => left,
                },
                BinaryOp::Or => match left.is_truthy() {
                    true => left,
                    false => eval(right, context)?,
                },
                op => {
                    let left = left.into_data();
                    let right = eval(right, context)?.into_data();
                    Value::Data(Data::Boolean(compare(*op, &left, &right)))
                }
            }
        }
    };
    Ok(value)
}

fn compare(op: BinaryOp, left: &Data, right: &Data) -> bool {
    match op {
        BinaryOp::Eq => left.loose_equals(right),
        BinaryOp::Ne => !left.loose_equals(right),
        BinaryOp::Lt => left.loose_compare(right) == Some(Ordering::Less),
        BinaryOp::Le => matches!(left.loose_compare(right), Some(Ordering::Less | Ordering::Equal)),
        BinaryOp::Gt => left.loose_compare(right) == Some(Ordering::Greater),
        BinaryOp::Ge => matches!(left.loose_compare(right), Some(Ordering::Greater | Ordering::Equal)),
        BinaryOp::And | BinaryOp::Or => false,
    }
}

fn call_function(name: &str, args: &[Data], context: &EvaluationContext) -> Result<Data, ExpressionError> {
    if let Some(builtin) = builtin_function(name) {
        if args.len() < builtin.min_args {
            return Err(ExpressionError::Evaluation(format!("Too few parameters supplied: '{}'", name)));
        }
        if args.len() > builtin.max_args {
            return Err(ExpressionError::Evaluation(format!("Too many parameters supplied: '{}'", name)));
        }
        return (builtin.call)(args);
    }

    match context.function(name) {
        Some(function) => function(args),
        None => Err(ExpressionError::Evaluation(format!(
            "Function '{}' is not available during evaluation",
            name
        ))),
    }
}

fn wildcard(object: Value) -> Value {
    match object {
        Value::Data(data) => Value::Filtered(data.children()),
        Value::Filtered(items) => Value::Filtered(items.iter().flat_map(Data::children).collect()),
    }
}

fn apply_index(object: Value, key: &Data) -> Value {
    match object {
        Value::Data(data) => Value::Data(index_data(&data, key)),
        Value::Filtered(items) => Value::Filtered(
            items
                .iter()
                .map(|item| index_data(item, key))
                .filter(|x| *x != Data::Null)
                .collect(),
        ),
    }
}

fn index_data(data: &Data, key: &Data) -> Data {
    match data {
        Data::Array(items) => {
            let index = key.to_number();
            if index.is_nan() || index < 0.0 {
                return Data::Null;
            }
            items.get(index.floor() as usize).cloned().unwrap_or(Data::Null)
        }
        Data::Dictionary(_) if key.is_primitive() => data.get(&key.to_display_string()).cloned().unwrap_or(Data::Null),
        _ => Data::Null,
    }
}
