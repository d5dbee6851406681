use super::*;
use crate::expressions::ExpressionParser;

fn github() -> Data {
    Data::dictionary([
        ("event_name", Data::from("push")),
        ("ref", Data::from("refs/heads/main")),
        (
            "event",
            Data::dictionary([(
                "commits",
                Data::array(vec![
                    Data::dictionary([("id", Data::from("a1")), ("count", Data::from(2.0))]),
                    Data::dictionary([("id", Data::from("b2"))]),
                ]),
            )]),
        ),
    ])
}

fn context() -> EvaluationContext {
    let mut context = EvaluationContext::new();
    context.add_context("github", github());
    context.add_function("always", Rc::new(|_: &[Data]| -> Result<Data, ExpressionError> { Ok(Data::Boolean(true)) }));
    context
}

fn eval_str(expression: &str) -> Result<Data, ExpressionError> {
    let parser = ExpressionParser::new();
    let expr = parser.parse(expression)?;
    evaluate(&expr, &context())
}

#[test]
fn property_lookup() {
    assert_eq!(eval_str("github.event_name").unwrap(), Data::from("push"));
    assert_eq!(eval_str("GITHUB.Event_Name").unwrap(), Data::from("push"));
    assert_eq!(eval_str("github['ref']").unwrap(), Data::from("refs/heads/main"));
    assert_eq!(eval_str("github.event.commits[1].id").unwrap(), Data::from("b2"));
    assert_eq!(eval_str("github.event.commits[5].id").unwrap(), Data::Null);
    assert_eq!(eval_str("github.missing.deeper").unwrap(), Data::Null);
}

#[test]
fn wildcard_filters() {
    assert_eq!(
        eval_str("github.event.commits.*.id").unwrap(),
        Data::array(vec![Data::from("a1"), Data::from("b2")])
    );
    assert_eq!(
        eval_str("github.event.commits.*.count").unwrap(),
        Data::array(vec![Data::from(2.0)])
    );
    assert_eq!(eval_str("contains(github.event.commits.*.id, 'B2')").unwrap(), Data::Boolean(true));
}

#[test]
fn logical_operators_return_operands() {
    assert_eq!(eval_str("'' || 'fallback'").unwrap(), Data::from("fallback"));
    assert_eq!(eval_str("'a' && 'b'").unwrap(), Data::from("b"));
    assert_eq!(eval_str("0 && 'b'").unwrap(), Data::from(0.0));
    assert_eq!(eval_str("!github").unwrap(), Data::Boolean(false));
}

#[test]
fn comparisons() {
    assert_eq!(eval_str("github.event_name == 'PUSH'").unwrap(), Data::Boolean(true));
    assert_eq!(eval_str("'1' == 1").unwrap(), Data::Boolean(true));
    assert_eq!(eval_str("1 < 2 && 'b' > 'A'").unwrap(), Data::Boolean(true));
    assert_eq!(eval_str("null >= 0").unwrap(), Data::Boolean(true));
    assert_eq!(eval_str("'abc' < 1").unwrap(), Data::Boolean(false));
}

#[test]
fn builtin_functions() {
    assert_eq!(
        eval_str("format('{0}/{1} {{x}}', github.ref, 3)").unwrap(),
        Data::from("refs/heads/main/3 {x}")
    );
    assert_eq!(eval_str("startsWith(github.ref, 'REFS/')").unwrap(), Data::Boolean(true));
    assert_eq!(eval_str("endsWith(github.ref, 'main')").unwrap(), Data::Boolean(true));
    assert_eq!(eval_str("join(github.event.commits.*.id, '+')").unwrap(), Data::from("a1+b2"));
    assert_eq!(eval_str("join('abc')").unwrap(), Data::from("abc"));
    assert_eq!(eval_str("fromJSON('[1, true]')[1]").unwrap(), Data::Boolean(true));
    assert_eq!(eval_str("toJSON(fromJSON('{\"a\":1}'))").unwrap(), Data::from("{\n  \"a\": 1\n}"));
    assert_eq!(eval_str("always()").unwrap(), Data::Boolean(true));
}

#[test]
fn evaluation_errors() {
    let err = eval_str("format('{1}', 'a')").unwrap_err();
    assert_eq!(
        err.to_string(),
        "The following format string references more arguments than were supplied: '{1}'"
    );

    let err = eval_str("format('{a}')").unwrap_err();
    assert_eq!(err.to_string(), "The following format string is invalid: '{a}'");

    assert!(eval_str("fromJSON('{')").is_err());
    assert!(eval_str("hashFiles('x')").is_err());
    assert!(eval_str("inputs.name").is_err());
}

#[test]
fn builtin_arity_is_checked_before_calling() {
    let err = eval_str("contains(1)").unwrap_err();
    assert_eq!(err.to_string(), "Too few parameters supplied: 'contains'");

    let err = eval_str("startsWith('a')").unwrap_err();
    assert_eq!(err.to_string(), "Too few parameters supplied: 'startsWith'");

    let err = eval_str("toJSON(1, 2)").unwrap_err();
    assert_eq!(err.to_string(), "Too many parameters supplied: 'toJSON'");
}
