use super::*;

fn at(line: usize, column: usize) -> Option<TokenRange> {
    let position = Position { line, column };
    Some(TokenRange::new(position, position))
}

fn sample() -> TemplateToken {
    let mut items = TemplateToken::sequence(Some(0), at(2, 3));
    items.push_item(TemplateToken::string(Some(0), at(2, 5), "x"));
    items.push_item(TemplateToken::new(Some(0), at(3, 5), TokenKind::Number(1.5)));

    let mut root = TemplateToken::mapping(Some(0), at(1, 1));
    root.push_pair(TemplateToken::string(Some(0), at(1, 1), "items"), items);
    root.push_pair(
        TemplateToken::string(Some(0), at(4, 1), "when"),
        TemplateToken::expression(Some(0), at(4, 7), "github.ref"),
    );
    root
}

#[test]
fn display() {
    assert_eq!(TemplateToken::null(None, None).display(), "");
    assert_eq!(TemplateToken::new(None, None, TokenKind::Boolean(false)).display(), "false");
    assert_eq!(TemplateToken::new(None, None, TokenKind::Number(3.0)).display(), "3");
    assert_eq!(TemplateToken::sequence(None, None).display(), "Sequence");
    assert_eq!(TemplateToken::mapping(None, None).display(), "Mapping");
    assert_eq!(TemplateToken::expression(None, None, "a.b").display(), "${{ a.b }}");
    assert_eq!(TemplateToken::new(None, None, TokenKind::InsertExpression).display(), "${{ insert }}");
}

#[test]
fn traverse_visits_keys_before_values() {
    let root = sample();
    let visited: Vec<String> = root.traverse().map(TemplateToken::display).collect();
    assert_eq!(visited, vec!["Mapping", "items", "Sequence", "x", "1.5", "when", "${{ github.ref }}"]);
}

#[test]
fn assertions() {
    let root = sample();
    assert_eq!(root.assert_mapping("root").unwrap().len(), 2);

    let err = root.assert_sequence("root").unwrap_err();
    assert_eq!(
        err.to_string(),
        "Unexpected type 'Mapping' encountered while reading 'root'. The type 'Sequence' was expected."
    );

    let when = root.get("when").unwrap();
    assert!(when.assert_scalar("when").is_ok());
    assert_eq!(
        when.assert_literal("when").unwrap_err().to_string(),
        "Unexpected type 'BasicExpression' encountered while reading 'when'. A literal was expected."
    );
    assert_eq!(
        when.assert_unexpected_value("when").to_string(),
        "Error while reading 'when'. Unexpected value '${{ github.ref }}'"
    );
}

#[test]
fn shell_drops_children() {
    let root = sample();
    let shell = root.shell();
    assert_eq!(shell.range, root.range);
    assert_eq!(shell.as_mapping().map(Vec::len), Some(0));
}

#[test]
fn data_conversion() {
    let data = Data::dictionary([
        ("name", Data::string("ci")),
        ("tags", Data::array(vec![Data::Boolean(true), Data::Null])),
    ]);
    let token = TemplateToken::from_data(&data, Some(1), at(5, 2));

    assert_eq!(token.get("name").unwrap().as_str(), Some("ci"));
    let tags = token.get("tags").unwrap().as_sequence().unwrap();
    assert_eq!(tags[0].kind, TokenKind::Boolean(true));
    assert_eq!(tags[1].range, at(5, 2));
    assert_eq!(token.to_data(), data);

    let root = sample();
    let converted = root.to_data();
    assert_eq!(converted.get("when"), Some(&Data::string("${{ github.ref }}")));
}
