use std::sync::Arc;

use super::*;
use crate::templates::TemplateSchema;

fn string(value: &str) -> TemplateToken {
    TemplateToken::string(None, None, value)
}

fn step(pairs: &[(&str, &str)]) -> TemplateToken {
    let mut mapping = TemplateToken::mapping(None, None);
    for (key, value) in pairs {
        mapping.push_pair(string(key), string(value));
    }
    mapping
}

fn convert(items: Vec<TemplateToken>) -> (Vec<Step>, Vec<String>) {
    let mut context = TemplateContext::new(Arc::new(TemplateSchema::new()));
    let mut sequence = TemplateToken::sequence(None, None);
    for item in items {
        sequence.push_item(item);
    }
    let steps = convert_steps(&mut context, &sequence).unwrap();
    (steps, context.errors.messages())
}

fn ids(steps: &[Step]) -> Vec<&str> {
    steps.iter().map(|x| x.id.as_str()).collect()
}

#[test]
fn generated_ids() {
    let (steps, errors) = convert(vec![
        step(&[("run", "make")]),
        step(&[("uses", "actions/checkout@v4")]),
        step(&[("run", "make test")]),
        step(&[("uses", "docker://alpine:3.8")]),
        step(&[("uses", "./.github/actions/local")]),
        step(&[("uses", "owner/repo/path/to/action@main")]),
        step(&[("id", "__run_2"), ("run", "x")]),
        step(&[("run", "y")]),
    ]);
    assert_eq!(
        ids(&steps),
        vec![
            "__run",
            "__actions_checkout",
            "__run_3",
            "__alpine_3_8",
            "__self",
            "__owner_repo",
            "__run_2",
            "__run_4",
        ]
    );
    assert_eq!(
        errors,
        vec!["The identifier '__run_2' is invalid. IDs starting with '__' are reserved."]
    );
}

#[test]
fn explicit_ids() {
    let (steps, errors) = convert(vec![
        step(&[("id", "build"), ("run", "make")]),
        step(&[("id", "Build"), ("run", "make")]),
        step(&[("id", "bad id"), ("run", "make")]),
    ]);
    assert_eq!(ids(&steps), vec!["build", "Build", "bad id"]);
    assert_eq!(
        errors,
        vec![
            "The identifier 'Build' may not be used more than once within the same scope.",
            "The identifier 'bad id' is invalid. IDs may only contain alphanumeric characters, '_', and '-'. IDs must start with a letter or '_' and must be less than 100 characters.",
        ]
    );
}

#[test]
fn step_fields() {
    let (steps, errors) = convert(vec![
        step(&[("uses", "actions/setup-node@v4"), ("name", "Setup")]),
        step(&[("run", "make"), ("shell", "bash"), ("if", "always()")]),
    ]);
    assert!(errors.is_empty());

    assert_eq!(steps[0].name.as_ref().and_then(TemplateToken::as_str), Some("Setup"));
    assert_eq!(steps[0].condition, "success()");
    assert!(matches!(&steps[0].action, StepAction::Uses { uses, with: None } if uses == "actions/setup-node@v4"));

    assert_eq!(steps[1].condition, "always()");
    match &steps[1].action {
        StepAction::Run { script, shell, .. } => {
            assert_eq!(script.as_str(), Some("make"));
            assert_eq!(shell.as_ref().and_then(TemplateToken::as_str), Some("bash"));
        }
        StepAction::Uses { .. } => panic!("expected a run step"),
    }
}

#[test]
fn incomplete_steps_are_skipped() {
    let (steps, errors) = convert(vec![step(&[("name", "nothing")]), step(&[("run", "make")])]);
    assert_eq!(ids(&steps), vec!["__run"]);
    assert!(errors.is_empty());
}
