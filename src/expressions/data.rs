// Copyright (c) Chris Gunn.
// Licensed under the MIT license.

// Values produced by evaluating an expression.


use std::{cmp::Ordering, rc::Rc};

use hashlink::LinkedHashMap;

#[derive(Clone, Debug, PartialEq)]
pub enum Data {
    Null,
    Boolean(bool),
    Number(f64),
    String(Rc<String>),
    Array(Rc<Vec<Data>>),
    // Keys keep their original casing; lookups ignore case.
    Dictionary(Rc<LinkedHashMap<String, Data>>),
}

impl Data {
    pub fn string(value: impl Into<String>) -> Data {
        Data::String(Rc::new(value.into()))
    }

    pub fn array(items: Vec<Data>) -> Data {
        Data::Array(Rc::new(items))
    }

    pub fn dictionary<K: Into<String>>(entries: impl IntoIterator<Item = (K, Data)>) -> Data {
        let mut map = LinkedHashMap::new();
        for (key, value) in entries {
            map.insert(key.into(), value);
        }
        Data::Dictionary(Rc::new(map))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Data::Null => "null",
            Data::Boolean(_) => "boolean",
            Data::Number(_) => "number",
            Data::String(_) => "string",
            Data::Array(_) => "array",
            Data::Dictionary(_) => "object",
        }
    }

    pub fn is_primitive(&self) -> bool {
        !matches!(self, Data::Array(_) | Data::Dictionary(_))
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Data::Null => false,
            Data::Boolean(value) => *value,
            Data::Number(value) => *value != 0.0 && !value.is_nan(),
            Data::String(value) => !value.is_empty(),
            Data::Array(_) | Data::Dictionary(_) => true,
        }
    }

    pub fn to_number(&self) -> f64 {
        match self {
            Data::Null => 0.0,
            Data::Boolean(value) => match value {
                true => 1.0,
                false => 0.0,
            },
            Data::Number(value) => *value,
            Data::String(value) => parse_number(value),
            Data::Array(_) | Data::Dictionary(_) => f64::NAN,
        }
    }

    /// String coercion used by `format`, `join`, string comparisons and
    /// mapping keys.
    pub fn to_display_string(&self) -> String {
        match self {
            Data::Null => String::new(),
            Data::Boolean(value) => value.to_string(),
            Data::Number(value) => format_number(*value),
            Data::String(value) => value.as_ref().clone(),
            Data::Array(_) => "Array".to_string(),
            Data::Dictionary(_) => "Object".to_string(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Data> {
        let Data::Dictionary(map) = self else {
            return None;
        };

        if let Some(value) = map.get(key) {
            return Some(value);
        }

        map.iter().find(|(k, _)| k.eq_ignore_ascii_case(key)).map(|(_, v)| v)
    }

    /// Child values of an array or dictionary, in order.
    pub fn children(&self) -> Vec<Data> {
        match self {
            Data::Array(items) => items.as_ref().clone(),
            Data::Dictionary(map) => map.values().cloned().collect(),
            _ => Vec::new(),
        }
    }

    /// Equality with type coercion: mismatched kinds compare as numbers,
    /// strings ignore case, and collections compare by reference.
    pub fn loose_equals(&self, other: &Data) -> bool {
        match (self, other) {
            (Data::Null, Data::Null) => true,
            (Data::Boolean(left), Data::Boolean(right)) => left == right,
            (Data::Number(left), Data::Number(right)) => left == right,
            (Data::String(left), Data::String(right)) => left.to_uppercase() == right.to_uppercase(),
            (Data::Array(left), Data::Array(right)) => Rc::ptr_eq(left, right),
            (Data::Dictionary(left), Data::Dictionary(right)) => Rc::ptr_eq(left, right),
            _ => self.to_number() == other.to_number(),
        }
    }

    pub fn loose_compare(&self, other: &Data) -> Option<Ordering> {
        match (self, other) {
            (Data::String(left), Data::String(right)) => Some(left.to_uppercase().cmp(&right.to_uppercase())),
            _ => self.to_number().partial_cmp(&other.to_number()),
        }
    }
}

impl From<bool> for Data {
    fn from(value: bool) -> Self {
        Data::Boolean(value)
    }
}

impl From<f64> for Data {
    fn from(value: f64) -> Self {
        Data::Number(value)
    }
}

impl From<&str> for Data {
    fn from(value: &str) -> Self {
        Data::string(value)
    }
}

impl From<String> for Data {
    fn from(value: String) -> Self {
        Data::string(value)
    }
}

pub fn format_number(value: f64) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }

    if value.is_infinite() {
        return match value > 0.0 {
            true => "Infinity".to_string(),
            false => "-Infinity".to_string(),
        };
    }

    if value == value.trunc() && value.abs() < 1e15 {
        // Also folds -0 into 0.
        return format!("{}", value as i64);
    }

    format!("{}", value)
}

pub fn parse_number(value: &str) -> f64 {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return 0.0;
    }

    let (negative, unsigned) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };

    let magnitude = if let Some(hex) = unsigned.strip_prefix("0x").or_else(|| unsigned.strip_prefix("0X")) {
        i64::from_str_radix(hex, 16).map(|x| x as f64).unwrap_or(f64::NAN)
    } else if let Some(octal) = unsigned.strip_prefix("0o").or_else(|| unsigned.strip_prefix("0O")) {
        i64::from_str_radix(octal, 8).map(|x| x as f64).unwrap_or(f64::NAN)
    } else if unsigned == "Infinity" {
        f64::INFINITY
    } else if unsigned == "NaN" {
        f64::NAN
    } else if unsigned.chars().all(|c| c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '+' | '-')) {
        unsigned.parse::<f64>().unwrap_or(f64::NAN)
    } else {
        f64::NAN
    };

    match negative {
        true => -magnitude,
        false => magnitude,
    }
}
