use std::sync::Arc;

use super::*;
use crate::{
    expressions::data::Data,
    workflow::{load_workflow, load_workflow_schema},
};

const WORKFLOW: &str = "on: push
jobs:
  build:
    runs-on: ${{ matrix.os }}
    strategy:
      fail-fast: false
      matrix:
        os: ${{ fromJSON(vars.oses) }}
        node: [18, 20]
    steps:
      - run: echo hi
  plain:
    runs-on: linux
    steps:
      - run: echo hi
";

fn context() -> TemplateContext {
    TemplateContext::new(Arc::new(load_workflow_schema().unwrap()))
}

#[test]
fn expands_matrix() {
    let mut context = context();
    let workflow = load_workflow(&mut context, "ci.yml", WORKFLOW);
    assert!(workflow.errors.is_empty(), "{:?}", workflow.errors);

    let build = workflow.job("build").unwrap();
    assert!(has_unevaluated_matrix(build.strategy.as_ref().unwrap()));

    context.add_context("github", Data::dictionary([("ref", Data::string("main"))]));
    context.add_context("inputs", Data::dictionary(Vec::<(String, Data)>::new()));
    context.add_context("vars", Data::dictionary([("oses", Data::string(r#"["linux", "windows"]"#))]));
    context.add_context("needs", Data::dictionary(Vec::<(String, Data)>::new()));

    let strategy = evaluate_strategy(&mut context, build).unwrap();
    assert!(context.errors.is_empty(), "{:?}", context.errors.messages());
    assert!(!has_unevaluated_matrix(&strategy));
    assert_eq!(
        strategy.to_data(),
        Data::dictionary([
            ("fail-fast", Data::Boolean(false)),
            (
                "matrix",
                Data::dictionary([
                    ("os", Data::array(vec![Data::string("linux"), Data::string("windows")])),
                    ("node", Data::array(vec![Data::Number(18.0), Data::Number(20.0)])),
                ])
            ),
        ])
    );

    assert!(evaluate_strategy(&mut context, workflow.job("plain").unwrap()).is_none());
}

#[test]
fn unavailable_context_keeps_expressions() {
    let mut context = context();
    let workflow = load_workflow(&mut context, "ci.yml", WORKFLOW);
    context.add_context("vars", Data::dictionary([("oses", Data::string("[]"))]));

    let strategy = evaluate_strategy(&mut context, workflow.job("build").unwrap()).unwrap();
    assert!(has_unevaluated_matrix(&strategy));
    assert!(context.errors.is_empty());
}
