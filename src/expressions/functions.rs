// Copyright (c) Chris Gunn.
// Licensed under the MIT license.

use std::rc::Rc;

use hashlink::LinkedHashMap;

use super::{data::Data, ExpressionError};

pub struct BuiltinFunction {
    pub name: &'static str,
    pub min_args: usize,
    pub max_args: usize,
    pub call: fn(&[Data]) -> Result<Data, ExpressionError>,
}

static BUILTIN_FUNCTIONS: [BuiltinFunction; 7] = [
    BuiltinFunction {
        name: "contains",
        min_args: 2,
        max_args: 2,
        call: contains,
    },
    BuiltinFunction {
        name: "endsWith",
        min_args: 2,
        max_args: 2,
        call: ends_with,
    },
    BuiltinFunction {
        name: "format",
        min_args: 1,
        max_args: 255,
        call: format,
    },
    BuiltinFunction {
        name: "fromJSON",
        min_args: 1,
        max_args: 1,
        call: from_json,
    },
    BuiltinFunction {
        name: "join",
        min_args: 1,
        max_args: 2,
        call: join,
    },
    BuiltinFunction {
        name: "startsWith",
        min_args: 2,
        max_args: 2,
        call: starts_with,
    },
    BuiltinFunction {
        name: "toJSON",
        min_args: 1,
        max_args: 1,
        call: to_json,
    },
];

pub fn builtin_function(name: &str) -> Option<&'static BuiltinFunction> {
    BUILTIN_FUNCTIONS.iter().find(|x| x.name.eq_ignore_ascii_case(name))
}

fn contains(args: &[Data]) -> Result<Data, ExpressionError> {
    let (search, item) = (&args[0], &args[1]);
    let found = match search {
        Data::Array(items) => items.iter().any(|x| x.loose_equals(item)),
        Data::Dictionary(_) => false,
        _ => item.is_primitive()
            && search
                .to_display_string()
                .to_uppercase()
                .contains(&item.to_display_string().to_uppercase()),
    };
    Ok(Data::Boolean(found))
}

fn starts_with(args: &[Data]) -> Result<Data, ExpressionError> {
    let (left, right) = (&args[0], &args[1]);
    if !left.is_primitive() || !right.is_primitive() {
        return Ok(Data::Boolean(false));
    }

    let left = left.to_display_string().to_uppercase();
    let right = right.to_display_string().to_uppercase();
    Ok(Data::Boolean(left.starts_with(&right)))
}

fn ends_with(args: &[Data]) -> Result<Data, ExpressionError> {
    let (left, right) = (&args[0], &args[1]);
    if !left.is_primitive() || !right.is_primitive() {
        return Ok(Data::Boolean(false));
    }

    let left = left.to_display_string().to_uppercase();
    let right = right.to_display_string().to_uppercase();
    Ok(Data::Boolean(left.ends_with(&right)))
}

fn join(args: &[Data]) -> Result<Data, ExpressionError> {
    let separator = match args.get(1) {
        Some(separator) if separator.is_primitive() => separator.to_display_string(),
        _ => ",".to_string(),
    };

    let joined = match &args[0] {
        Data::Array(items) => items
            .iter()
            .filter(|x| x.is_primitive())
            .map(Data::to_display_string)
            .collect::<Vec<_>>()
            .join(&separator),
        Data::Dictionary(_) => String::new(),
        value => value.to_display_string(),
    };
    Ok(Data::string(joined))
}

/// `{N}` placeholders refer to the remaining arguments; `{{` and `}}` are
/// literal braces.
fn format(args: &[Data]) -> Result<Data, ExpressionError> {
    let format = args[0].to_display_string();
    let invalid = || ExpressionError::Evaluation(format!("The following format string is invalid: '{}'", format));

    let mut result = String::new();
    let mut chars = format.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                result.push('{');
            }
            '{' => {
                let mut digits = String::new();
                loop {
                    match chars.next() {
                        Some('}') => break,
                        Some(c) if c.is_ascii_digit() => digits.push(c),
                        _ => return Err(invalid()),
                    }
                }

                let index = digits.parse::<usize>().map_err(|_| invalid())?;
                let Some(arg) = args.get(index + 1) else {
                    return Err(ExpressionError::Evaluation(format!(
                        "The following format string references more arguments than were supplied: '{}'",
                        format
                    )));
                };
                result.push_str(&arg.to_display_string());
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                result.push('}');
            }
            '}' => return Err(invalid()),
            c => result.push(c),
        }
    }

    Ok(Data::string(result))
}

fn to_json(args: &[Data]) -> Result<Data, ExpressionError> {
    let value = to_json_value(&args[0]);
    let json = serde_json::to_string_pretty(&value).map_err(|err| ExpressionError::Evaluation(err.to_string()))?;
    Ok(Data::string(json))
}

fn from_json(args: &[Data]) -> Result<Data, ExpressionError> {
    let text = args[0].to_display_string();
    if text.trim().is_empty() {
        return Err(ExpressionError::Evaluation(
            "Empty string passed to fromJSON".to_string(),
        ));
    }

    let value: serde_json::Value = serde_json::from_str(&text)
        .map_err(|err| ExpressionError::Evaluation(format!("Error parsing fromJson: {}", err)))?;
    Ok(from_json_value(&value))
}

pub fn to_json_value(data: &Data) -> serde_json::Value {
    match data {
        Data::Null => serde_json::Value::Null,
        Data::Boolean(value) => serde_json::Value::Bool(*value),
        Data::Number(value) => {
            if value.fract() == 0.0 && value.abs() < 1e15 {
                serde_json::Value::from(*value as i64)
            } else {
                serde_json::Number::from_f64(*value)
                    .map(serde_json::Value::Number)
                    .unwrap_or(serde_json::Value::Null)
            }
        }
        Data::String(value) => serde_json::Value::String(value.as_ref().clone()),
        Data::Array(items) => serde_json::Value::Array(items.iter().map(to_json_value).collect()),
        Data::Dictionary(map) => serde_json::Value::Object(
            map.iter()
                .map(|(key, value)| (key.clone(), to_json_value(value)))
                .collect(),
        ),
    }
}

pub fn from_json_value(value: &serde_json::Value) -> Data {
    match value {
        serde_json::Value::Null => Data::Null,
        serde_json::Value::Bool(value) => Data::Boolean(*value),
        serde_json::Value::Number(value) => Data::Number(value.as_f64().unwrap_or(f64::NAN)),
        serde_json::Value::String(value) => Data::string(value.clone()),
        serde_json::Value::Array(items) => Data::array(items.iter().map(from_json_value).collect()),
        serde_json::Value::Object(map) => {
            let mut entries = LinkedHashMap::new();
            for (key, value) in map {
                entries.insert(key.clone(), from_json_value(value));
            }
            Data::Dictionary(Rc::new(entries))
        }
    }
}
