use super::*;
use crate::templates::{
    object_reader::{EventObjectReader, ParseEvent},
    schema::TemplateSchema,
    tokens::TokenType,
    yaml_object_reader::parse_yaml_events,
};

const SCHEMA: &str = r#"
version: reader-test
definitions:
  root:
    mapping:
      properties:
        name: non-empty-string
        count: number
        flag: boolean
        items: item-list
        env: env
        thing: thing
        cond: condition
        extra: mapping
  env:
    context:
      - github
    mapping:
      loose-key-type: non-empty-string
      loose-value-type: string
  item-list:
    sequence:
      item-type: string
  thing:
    one-of:
      - thing-a
      - thing-b
  thing-a:
    mapping:
      properties:
        a:
          type: string
          required: true
        b: string
  thing-b:
    mapping:
      properties:
        a: string
        c: string
  condition:
    context:
      - github
      - always(0,0)
    string:
      is-expression: true
"#;

fn schema() -> Arc<TemplateSchema> {
    Arc::new(TemplateSchema::from_yaml(SCHEMA).unwrap())
}

fn read(content: &str) -> (Option<TemplateToken>, Vec<String>) {
    let mut context = TemplateContext::new(schema());
    let file_id = context.get_file_id("test.yml");
    let events = parse_yaml_events(content, Some(file_id)).unwrap();
    let mut object_reader = EventObjectReader::new(events);
    let token = read_template(&mut context, "root", &mut object_reader, Some(file_id));
    let messages = context.errors.iter().map(|x| x.raw_message.clone()).collect();
    (token, messages)
}

fn read_ok(content: &str) -> TemplateToken {
    let (token, errors) = read(content);
    assert_eq!(errors, Vec::<String>::new());
    token.unwrap()
}

fn expression_of(token: &TemplateToken) -> &str {
    match &token.kind {
        TokenKind::BasicExpression(expression) => &expression.expression,
        kind => panic!("expected an expression, got {:?}", kind),
    }
}

#[test]
fn reads_literals() {
    let token = read_ok("name: hello\ncount: 3\nflag: true\nitems:\n  - one\n  - two\n");
    assert_eq!(token.as_mapping().unwrap().len(), 4);
    assert_eq!(token.get("name").unwrap().as_str(), Some("hello"));
    assert_eq!(token.get("count").unwrap().kind, TokenKind::Number(3.0));
    assert_eq!(token.get("flag").unwrap().kind, TokenKind::Boolean(true));
    assert_eq!(token.get("items").unwrap().as_sequence().unwrap().len(), 2);
    assert_eq!(token.definition_info().unwrap().key(), "root");
}

#[test]
fn literals_coerce_to_strings() {
    let token = read_ok("name: 123\n");
    assert_eq!(token.get("name").unwrap().as_str(), Some("123"));
}

#[test]
fn unexpected_value() {
    let mut context = TemplateContext::new(schema());
    let file_id = context.get_file_id("test.yml");
    let events = parse_yaml_events("count: abc\n", Some(file_id)).unwrap();
    let token = read_template(&mut context, "root", &mut EventObjectReader::new(events), Some(file_id));

    assert!(token.is_some());
    assert_eq!(
        context.errors.messages(),
        vec!["test.yml (Line: 1, Col: 8): Unexpected value 'abc'"]
    );
}

#[test]
fn unknown_and_duplicate_keys() {
    let (token, errors) = read("name: a\nother: b\nNAME: c\nflag: false\n");
    assert_eq!(
        errors,
        vec!["Unexpected value 'other'", "'NAME' is already defined"]
    );

    // Reading continues after the skipped values.
    let token = token.unwrap();
    assert_eq!(token.get("name").unwrap().as_str(), Some("a"));
    assert_eq!(token.get("flag").unwrap().kind, TokenKind::Boolean(false));
    assert!(token.get("other").is_none());
}

#[test]
fn empty_and_null_keys_are_duplicates() {
    let (token, errors) = read("extra:\n  \"\": a\n  ~: b\n  k: c\n  \"\": d\n");
    assert_eq!(errors, vec!["'' is already defined", "'' is already defined"]);

    let token = token.unwrap();
    let pairs = token.get("extra").unwrap().as_mapping().unwrap();
    assert_eq!(pairs.len(), 2);
    assert_eq!(pairs[0].0.as_str(), Some(""));
    assert_eq!(pairs[0].1.as_str(), Some("a"));
    assert_eq!(pairs[1].0.as_str(), Some("k"));
}

#[test]
fn unexpected_sequence_items_are_skipped() {
    let (token, errors) = read("items: [a, {x: 1}, b]
flag: true
");
    assert_eq!(errors, vec!["A mapping was not expected"]);

    let token = token.unwrap();
    let items = token.get("items").unwrap().as_sequence().unwrap();
    assert_eq!(items.len(), 3);
    assert_eq!(items[0].as_str(), Some("a"));
    assert!(items[1].as_mapping().unwrap().is_empty());
    assert_eq!(items[2].as_str(), Some("b"));
    assert_eq!(token.get("flag").unwrap().kind, TokenKind::Boolean(true));
}

#[test]
fn unexpected_collections() {
    let (token, errors) = read("name:\n  - a\n  - b\ncount:\n  x: 1\nflag: true\n");
    assert_eq!(errors, vec!["A sequence was not expected", "A mapping was not expected"]);

    let token = token.unwrap();
    assert_eq!(token.get("name").unwrap().token_type(), TokenType::Sequence);
    assert!(token.get("name").unwrap().as_sequence().unwrap().is_empty());
    assert_eq!(token.get("flag").unwrap().kind, TokenKind::Boolean(true));
}

#[test]
fn expressions_require_context() {
    let (_, errors) = read("name: ${{ 1 }}\n");
    assert_eq!(errors, vec!["A template expression is not allowed in this context"]);

    let (_, errors) = read("name: ${{ github.sha }}\n");
    assert_eq!(
        errors,
        vec!["Unrecognized named-value: 'github'. Located at position 1 within expression: github.sha"]
    );

    let (_, errors) = read("${{ 1 }}: x\n");
    assert_eq!(errors, vec!["A template expression is not allowed in this context"]);
}

#[test]
fn expressions_in_context() {
    let token = read_ok("env:\n  SHA: ${{ github.sha }}\n  ${{ github.key }}: value\n");
    let env = token.get("env").unwrap();
    assert_eq!(env.definition_info().unwrap().allowed_context(), ["github"]);

    let pairs = env.as_mapping().unwrap();
    assert_eq!(expression_of(&pairs[0].1), "github.sha");
    assert_eq!(expression_of(&pairs[1].0), "github.key");
    assert_eq!(pairs[1].1.as_str(), Some("value"));

    // Expressions carry the info of the position they were read at.
    assert_eq!(pairs[0].1.definition_info().unwrap().key(), "string");
    assert_eq!(pairs[1].0.definition_info().unwrap().key(), "env");

    let token = read_ok("cond: always()\n");
    assert_eq!(token.get("cond").unwrap().definition_info().unwrap().key(), "condition");
}

#[test]
fn string_literal_expression_is_text() {
    let token = read_ok("name: ${{ 'it''s' }}\n");
    let name = token.get("name").unwrap();
    assert_eq!(
        name.kind,
        TokenKind::String(StringToken {
            value: "it's".to_string(),
            source: Some("${{ 'it''s' }}".to_string()),
        })
    );
}

#[test]
fn mixed_text_folds_into_format() {
    let token = read_ok("env:\n  A: \"it's {x} ${{ github.a }}-${{ github.b }}\"\n");
    let value = token.get("env").unwrap().get("A").unwrap();
    let TokenKind::BasicExpression(expression) = &value.kind else {
        panic!("expected an expression");
    };

    assert_eq!(expression.expression, "format('it''s {{x}} {0}-{1}', github.a, github.b)");
    assert_eq!(expression.source.as_deref(), Some("it's {x} ${{ github.a }}-${{ github.b }}"));
    let originals = expression.original_expressions.as_ref().unwrap();
    assert_eq!(originals.len(), 2);
    assert_eq!(expression_of(&originals[1]), "github.b");
}

#[test]
fn sub_expression_ranges() {
    let token = read_ok("env:\n  A: x ${{ github.a }}\n");
    let value = token.get("env").unwrap().get("A").unwrap();
    let TokenKind::BasicExpression(expression) = &value.kind else {
        panic!("expected an expression");
    };

    let original = &expression.original_expressions.as_ref().unwrap()[0];
    let range = original.range.unwrap();
    assert_eq!(range.start, Position { line: 2, column: 8 });
    assert_eq!(range.end, Position { line: 2, column: 23 });
}

#[test]
fn expression_syntax_errors() {
    let (token, errors) = read("env:\n  A: ${{ github.a\n");
    assert_eq!(
        errors,
        vec!["The expression is not closed. An unescaped ${{ sequence was found, but the closing }} sequence was not found."]
    );
    let value = token.unwrap().get("env").unwrap().get("A").unwrap().clone();
    assert_eq!(value.as_str(), Some("${{ github.a"));

    let (_, errors) = read("env:\n  A: ${{ }}\n");
    assert_eq!(errors, vec!["An expression was expected"]);

    // Braces inside string literals do not close the expression.
    let token = read_ok("env:\n  A: ${{ format('}}', github.a) }}\n");
    let value = token.get("env").unwrap().get("A").unwrap();
    assert_eq!(expression_of(value), "format('}}', github.a)");
}

#[test]
fn insert_directive() {
    let (_, errors) = read("env:\n  A: x ${{ insert }}\n");
    assert_eq!(
        errors,
        vec!["The directive 'insert' is not allowed in this context. Directives are not supported for expressions that are embedded within a string. Directives are only supported when the entire value is an expression."]
    );

    let (_, errors) = read("env:\n  ${{ insert foo }}: x\n");
    assert_eq!(
        errors,
        vec!["Exactly 0 parameter(s) were expected following the directive 'insert'. Actual parameter count: 1"]
    );

    let token = read_ok("env:\n  ${{ insert }}: x\n");
    let pairs = token.get("env").unwrap().as_mapping().unwrap().clone();
    assert_eq!(pairs[0].0.kind, TokenKind::InsertExpression);

    // Only legal as a key.
    let (_, errors) = read("env:\n  A: ${{ insert }}\n");
    assert_eq!(errors, vec!["Unexpected value '${{ insert }}'"]);
}

#[test]
fn implicit_expressions() {
    let token = read_ok("cond: always()\n");
    assert_eq!(expression_of(token.get("cond").unwrap()), "always()");

    let token = read_ok("cond: ${{ github.ref == 'main' }}\n");
    assert_eq!(expression_of(token.get("cond").unwrap()), "github.ref == 'main'");

    let (token, errors) = read("cond: success()\n");
    assert_eq!(
        errors,
        vec!["Unrecognized function: 'success'. Located at position 1 within expression: success()"]
    );
    assert_eq!(token.unwrap().get("cond").unwrap().as_str(), Some("success()"));
}

#[test]
fn one_of_mapping_disambiguation() {
    let (token, errors) = read("thing:\n  a: x\n");
    assert_eq!(
        errors,
        vec!["There's not enough info to determine what you meant. Add one of these properties: b, c"]
    );
    assert_eq!(token.unwrap().get("thing").unwrap().definition_info().unwrap().key(), "thing");

    let (_, errors) = read("thing:\n  b: x\n");
    assert_eq!(errors, vec!["Required property is missing: a"]);

    let token = read_ok("thing:\n  c: x\n  a: y\n");
    assert_eq!(token.get("thing").unwrap().definition_info().unwrap().key(), "thing-b");
}

#[test]
fn desync_abandons_document() {
    let mut context = TemplateContext::new(schema());
    let file_id = context.get_file_id("test.yml");
    let position = Position { line: 1, column: 1 };
    let range = Some(TokenRange::new(position, position));
    let events = vec![
        ParseEvent::DocumentStart,
        ParseEvent::MappingStart(TemplateToken::mapping(Some(file_id), range)),
        ParseEvent::Literal(TemplateToken::string(Some(file_id), range, "name")),
        ParseEvent::Literal(TemplateToken::string(Some(file_id), range, "x")),
        ParseEvent::DocumentEnd,
    ];

    let token = read_template(&mut context, "root", &mut EventObjectReader::new(events), Some(file_id));
    assert!(token.is_none());
    assert_eq!(context.errors.messages(), vec!["test.yml: Expected mapping end"]);
}

#[test]
fn reading_is_deterministic() {
    let content = "name: ${{ 1 }}\nother: x\nthing:\n  a: b\nenv:\n  A: v ${{ github.a }}\n";
    let (first, first_errors) = read(content);
    let (second, second_errors) = read(content);
    assert_eq!(first, second);
    assert_eq!(first_errors, second_errors);
    assert_eq!(first_errors.len(), 3);
}
