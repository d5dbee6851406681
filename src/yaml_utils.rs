// Copyright (c) Chris Gunn.
// Licensed under the MIT license.

// Conversions between YAML documents, template tokens and expression data.

#[cfg(test)]
mod tests;

use std::{fs, path::Path};

use anyhow::{bail, Context, Error};
use saphyr::{Hash, Yaml, YamlEmitter, YamlLoader};

use crate::{
    expressions::data::{format_number, parse_number, Data},
    templates::{TemplateToken, TokenKind},
};

/// Expressions that were not expanded are written as `${{ ... }}` text.
pub fn token_to_yaml(token: &TemplateToken) -> Yaml {
    match &token.kind {
        TokenKind::Null => Yaml::Null,
        TokenKind::Boolean(value) => Yaml::Boolean(*value),
        TokenKind::Number(value) => number_to_yaml(*value),
        TokenKind::String(string) => Yaml::String(string.value.clone()),
        TokenKind::Sequence(items) => Yaml::Array(items.iter().map(token_to_yaml).collect()),
        TokenKind::Mapping(pairs) => {
            let mut hash = Hash::new();
            for (key, value) in pairs {
                hash.insert(Yaml::String(key.display()), token_to_yaml(value));
            }
            Yaml::Hash(hash)
        }
        TokenKind::BasicExpression(_) | TokenKind::InsertExpression => Yaml::String(token.display()),
    }
}

fn number_to_yaml(value: f64) -> Yaml {
    if value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
        return Yaml::Integer(value as i64);
    }
    Yaml::Real(format_number(value))
}

pub fn yaml_to_data(yaml: &Yaml) -> Result<Data, Error> {
    let data = match yaml {
        Yaml::Null => Data::Null,
        Yaml::Boolean(value) => Data::Boolean(*value),
        Yaml::Integer(value) => Data::Number(*value as f64),
        Yaml::Real(value) => Data::Number(parse_number(value)),
        Yaml::String(value) => Data::string(value.clone()),
        Yaml::Array(items) => Data::array(items.iter().map(yaml_to_data).collect::<Result<_, _>>()?),
        Yaml::Hash(hash) => {
            let mut entries = Vec::with_capacity(hash.len());
            for (key, value) in hash {
                entries.push((yaml_key(key)?, yaml_to_data(value)?));
            }
            Data::dictionary(entries)
        }
        Yaml::Alias(_) | Yaml::BadValue => bail!("Unsupported YAML value"),
    };
    Ok(data)
}

fn yaml_key(key: &Yaml) -> Result<String, Error> {
    let key = match key {
        Yaml::String(value) | Yaml::Real(value) => value.clone(),
        Yaml::Integer(value) => value.to_string(),
        Yaml::Boolean(value) => value.to_string(),
        _ => bail!("Unsupported YAML mapping key"),
    };
    Ok(key)
}

pub fn yaml_emit_to_string(doc: &Yaml) -> Result<String, Error> {
    let mut out_str = String::new();
    let mut emitter = YamlEmitter::new(&mut out_str);
    emitter.dump(doc)?;
    Ok(out_str)
}

/// Loads the first document of a YAML file; an empty file is `null`.
pub fn yaml_load_from_file(filename: &Path) -> Result<Yaml, Error> {
    let content =
        fs::read_to_string(filename).with_context(|| format!("Failed to read '{}'", filename.display()))?;
    let docs = YamlLoader::load_from_str(&content).with_context(|| format!("Failed to parse '{}'", filename.display()))?;
    Ok(docs.into_iter().next().unwrap_or(Yaml::Null))
}
