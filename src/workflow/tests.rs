use std::{fmt::Write, fs, path::Path, sync::Arc};

use super::*;

macro_rules! testlist {
    ($($name:ident,)*) => {
    $(
        #[test]
        fn $name() {
            run_test(stringify!($name))
        }
    )*
    }
}

testlist! {
    basic,
    conditions,
    invalid,
    needs,
    no_root_job,
}

fn run_test(name: &str) {
    let rootdir = Path::new(env!("CARGO_MANIFEST_DIR"));
    let test_data_dir = rootdir.join("src/workflow/tests/testdata");

    let test_file = test_data_dir.join(format!("tests/{}.txt", name));
    let expected_file = test_data_dir.join(format!("expected/{}.txt", name));
    let actual_dir = test_data_dir.join("actual");
    let actual_file = actual_dir.join(format!("{}.txt", name));

    let test = fs::read_to_string(&test_file).unwrap();

    let schema = Arc::new(load_workflow_schema().unwrap());
    let mut context = TemplateContext::new(schema);
    let workflow = load_workflow(&mut context, &format!("{}.yml", name), &test);
    let actual = format_workflow(&workflow);

    fs::create_dir_all(actual_dir).unwrap();
    fs::write(actual_file, &actual).unwrap();

    let expected = fs::read_to_string(expected_file).unwrap();
    assert_eq!(expected, actual);
}

fn format_workflow(workflow: &WorkflowTemplate) -> String {
    let mut string = String::new();

    string.push_str("ERRORS:\n");
    if workflow.errors.is_empty() {
        string.push_str("<None>\n");
    }
    for error in &workflow.errors {
        writeln!(string, "{}", error).unwrap();
    }

    writeln!(string, "NAME: {}", workflow.name.as_deref().unwrap_or("<None>")).unwrap();
    writeln!(string, "EVENTS: {}", workflow.events.join(", ")).unwrap();

    string.push_str("JOBS:\n");
    for job in &workflow.jobs {
        let needs: Vec<&str> = job.need_ids().collect();
        writeln!(string, "- {} needs=[{}] if={}", job.id, needs.join(", "), job.condition).unwrap();

        match &job.kind {
            JobKind::Steps(steps_job) => {
                for step in &steps_job.steps {
                    let action = match &step.action {
                        StepAction::Run { script, .. } => format!("run: {}", script.display()),
                        StepAction::Uses { uses, .. } => format!("uses: {}", uses),
                    };
                    writeln!(string, "  - {} if={} {}", step.id, step.condition, action).unwrap();
                }
            }
            JobKind::Reusable(reusable) => writeln!(string, "  uses: {}", reusable.uses).unwrap(),
        }
    }

    string
}

#[test]
fn yaml_errors_are_reported_against_the_file() {
    let schema = Arc::new(load_workflow_schema().unwrap());
    let mut context = TemplateContext::new(schema);
    let workflow = load_workflow(&mut context, "broken.yml", "on: [push\n");

    assert!(workflow.jobs.is_empty());
    assert_eq!(workflow.errors.len(), 1);
    assert!(workflow.errors[0].message().starts_with("broken.yml: "));
}

#[test]
fn missing_required_properties() {
    let schema = Arc::new(load_workflow_schema().unwrap());
    let mut context = TemplateContext::new(schema);
    let workflow = load_workflow(&mut context, "w.yml", "name: x\n");

    let messages: Vec<String> = workflow.errors.iter().map(|x| x.raw_message.clone()).collect();
    assert_eq!(
        messages,
        vec!["Required property is missing: on", "Required property is missing: jobs"]
    );
}
