// Copyright (c) Chris Gunn.
// Licensed under the MIT license.

use anyhow::{Context, Error};

use crate::templates::TemplateSchema;

const WORKFLOW_SCHEMA: &str = include_str!("workflow-v1.0.yaml");

/// Loads the bundled workflow schema. Callers load it once and share it.
pub fn load_workflow_schema() -> Result<TemplateSchema, Error> {
    TemplateSchema::from_yaml(WORKFLOW_SCHEMA).context("Failed to load the workflow schema")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::WORKFLOW_ROOT;

    #[test]
    fn loads() {
        let schema = load_workflow_schema().unwrap();
        assert_eq!(schema.version.as_deref(), Some("workflow-v1.0"));
        for key in [WORKFLOW_ROOT, "jobs", "job", "step", "strategy", "runs-on"] {
            assert!(schema.get_definition(key).is_ok(), "{}", key);
        }
    }
}
