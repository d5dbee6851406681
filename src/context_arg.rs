// Copyright (c) Chris Gunn.
// Licensed under the MIT license.

use std::path::PathBuf;

use anyhow::{anyhow, Error};

/// A `NAME=FILE.yaml` command line argument supplying an expression context.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContextArg {
    pub name: String,
    pub path: PathBuf,
}

// Used as a clap value parser.
pub fn parse_context_arg(arg: &str) -> Result<ContextArg, Error> {
    let (name, path) = arg
        .split_once('=')
        .ok_or_else(|| anyhow!("Expected NAME=FILE, found '{}'", arg))?;

    let name = name.trim();
    if name.is_empty() || path.is_empty() {
        return Err(anyhow!("Expected NAME=FILE, found '{}'", arg));
    }

    Ok(ContextArg {
        name: name.to_string(),
        path: PathBuf::from(path),
    })
}
