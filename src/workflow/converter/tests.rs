use std::sync::Arc;

use super::*;
use crate::templates::TemplateSchema;

fn context() -> TemplateContext {
    TemplateContext::new(Arc::new(TemplateSchema::new()))
}

fn string(value: &str) -> TemplateToken {
    TemplateToken::string(None, None, value)
}

#[test]
fn identifiers() {
    assert!(is_valid_identifier("build"));
    assert!(is_valid_identifier("_build-2"));
    assert!(!is_valid_identifier("2build"));
    assert!(!is_valid_identifier("build job"));
    assert!(!is_valid_identifier(""));
    assert!(is_valid_identifier(&"a".repeat(99)));
    assert!(!is_valid_identifier(&"a".repeat(100)));
}

#[test]
fn conditions() {
    let context = context();
    let condition = |token: TemplateToken| convert_condition(&context, &token);

    assert_eq!(condition(TemplateToken::null(None, None)), "success()");
    assert_eq!(condition(string("  ")), "success()");
    assert_eq!(
        condition(TemplateToken::expression(None, None, "github.ref == 'main'")),
        "success() && (github.ref == 'main')"
    );
    assert_eq!(condition(TemplateToken::expression(None, None, "always()")), "always()");
    assert_eq!(
        condition(TemplateToken::expression(None, None, "!cancelled() && x")),
        "!cancelled() && x"
    );
    assert_eq!(
        condition(TemplateToken::expression(None, None, "Failure()")),
        "Failure()"
    );
    assert_eq!(
        condition(TemplateToken::new(None, None, TokenKind::Boolean(true))),
        "success() && (true)"
    );
}

#[test]
fn events() {
    assert_eq!(convert_events(&string("push")).unwrap(), vec!["push"]);

    let mut sequence = TemplateToken::sequence(None, None);
    sequence.push_item(string("push"));
    sequence.push_item(string("release"));
    assert_eq!(convert_events(&sequence).unwrap(), vec!["push", "release"]);

    let mut mapping = TemplateToken::mapping(None, None);
    mapping.push_pair(string("workflow_dispatch"), TemplateToken::null(None, None));
    mapping.push_pair(string("schedule"), TemplateToken::sequence(None, None));
    assert_eq!(convert_events(&mapping).unwrap(), vec!["workflow_dispatch", "schedule"]);

    assert!(convert_events(&TemplateToken::null(None, None)).is_err());
}

#[test]
fn non_mapping_root() {
    let mut context = context();
    let workflow = convert_workflow(&mut context, &string("x"));
    assert!(workflow.jobs.is_empty());
    assert_eq!(
        context.errors.messages(),
        vec!["Unexpected type 'String' encountered while reading 'workflow root'. The type 'Mapping' was expected."]
    );
    assert_eq!(workflow.errors.len(), 1);
}
