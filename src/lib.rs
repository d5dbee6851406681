// Copyright (c) Chris Gunn.
// Licensed under the MIT license.

pub mod diagnostics;
pub mod expressions;
pub mod templates;
pub mod workflow;
pub mod yaml_utils;
