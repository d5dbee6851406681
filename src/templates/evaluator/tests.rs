use super::*;
use crate::{
    expressions::data::Data,
    templates::{
        object_reader::EventObjectReader, reader::read_template, schema::TemplateSchema,
        yaml_object_reader::parse_yaml_events,
    },
};

const SCHEMA: &str = r#"
definitions:
  root:
    mapping:
      properties:
        env: env
        count: count
        late: late
        items: items
  env:
    context: [matrix]
    mapping:
      loose-key-type: non-empty-string
      loose-value-type: any
  count:
    context: [matrix]
    number: {}
  late:
    context: [matrix, github]
    string: {}
  items:
    context: [matrix]
    sequence:
      item-type: string
"#;

fn context() -> TemplateContext {
    let schema = TemplateSchema::from_yaml(SCHEMA).unwrap();
    TemplateContext::new(Arc::new(schema))
}

fn matrix() -> Data {
    Data::dictionary([
        ("os", Data::string("linux")),
        ("count", Data::Number(3.0)),
        ("list", Data::array(vec![Data::Number(1.0), Data::Number(2.0)])),
        ("extra", Data::dictionary([("c", Data::Number(3.0))])),
    ])
}

fn read_and_evaluate(content: &str) -> (Option<TemplateToken>, Vec<String>) {
    let mut context = context();
    let file_id = context.get_file_id("test.yml");
    let events = parse_yaml_events(content, Some(file_id)).unwrap();
    let template = read_template(&mut context, "root", &mut EventObjectReader::new(events), Some(file_id)).unwrap();
    assert_eq!(context.errors.messages(), Vec::<String>::new());

    context.add_context("matrix", matrix());
    let token = evaluate_template(&mut context, "root", &template, Some(file_id));
    let messages = context.errors.iter().map(|x| x.raw_message.clone()).collect();
    (token, messages)
}

#[test]
fn expands_available_context() {
    let content = "env:
  a: 1
  ${{ insert }}: ${{ matrix.extra }}
  b: 2
count: ${{ matrix.count }}
late: ${{ github.sha }}
items:
  - x
  - ${{ matrix.list }}
";
    let (token, errors) = read_and_evaluate(content);
    assert_eq!(errors, Vec::<String>::new());

    let token = token.unwrap();
    assert_eq!(
        token.to_data(),
        Data::dictionary([
            (
                "env",
                Data::dictionary([
                    ("a", Data::Number(1.0)),
                    ("c", Data::Number(3.0)),
                    ("b", Data::Number(2.0)),
                ])
            ),
            ("count", Data::Number(3.0)),
            ("late", Data::string("${{ github.sha }}")),
            (
                "items",
                Data::array(vec![Data::string("x"), Data::string("1"), Data::string("2")])
            ),
        ])
    );

    let count = token.get("count").unwrap();
    assert_eq!(count.definition_info().unwrap().mode(), ContextMode::Evaluator);
    assert_eq!(count.definition_info().unwrap().key(), "count");
}

#[test]
fn results_are_validated() {
    let (token, errors) = read_and_evaluate("count: ${{ matrix.os }}\n");
    assert_eq!(errors, vec!["Unexpected value 'linux'"]);
    assert_eq!(token.unwrap().get("count").unwrap().as_str(), Some("linux"));

    let (token, errors) = read_and_evaluate("count: ${{ matrix.extra }}\n");
    assert_eq!(errors, vec!["A mapping was not expected"]);
    assert!(token.is_some());
}

#[test]
fn missing_definition() {
    let mut context = context();
    let template = TemplateToken::string(None, None, "x");
    assert!(evaluate_template(&mut context, "nope", &template, None).is_none());
    assert_eq!(context.errors.messages(), vec!["Schema definition 'nope' not found"]);
}
