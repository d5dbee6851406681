use super::*;

fn string(value: &str) -> TemplateToken {
    TemplateToken::string(None, None, value)
}

#[test]
fn tokens_to_yaml() {
    let mut items = TemplateToken::sequence(None, None);
    items.push_item(TemplateToken::new(None, None, TokenKind::Number(2.0)));
    items.push_item(TemplateToken::new(None, None, TokenKind::Number(2.5)));
    items.push_item(TemplateToken::expression(None, None, "matrix.os"));

    let mut mapping = TemplateToken::mapping(None, None);
    mapping.push_pair(string("b"), TemplateToken::new(None, None, TokenKind::Boolean(true)));
    mapping.push_pair(string("a"), items);
    mapping.push_pair(string("n"), TemplateToken::null(None, None));

    let yaml = token_to_yaml(&mapping);
    let hash = yaml.as_hash().unwrap();
    let keys: Vec<&str> = hash.keys().filter_map(Yaml::as_str).collect();
    assert_eq!(keys, vec!["b", "a", "n"]);
    assert_eq!(yaml["b"], Yaml::Boolean(true));
    assert_eq!(yaml["a"][0], Yaml::Integer(2));
    assert_eq!(yaml["a"][1], Yaml::Real("2.5".to_string()));
    assert_eq!(yaml["a"][2], Yaml::String("${{ matrix.os }}".to_string()));
    assert_eq!(yaml["n"], Yaml::Null);
}

#[test]
fn emitted_yaml_loads_back() {
    let mut mapping = TemplateToken::mapping(None, None);
    mapping.push_pair(string("runs-on"), TemplateToken::expression(None, None, "matrix.os"));
    mapping.push_pair(string("name"), string("build: all"));

    let yaml = token_to_yaml(&mapping);
    let text = yaml_emit_to_string(&yaml).unwrap();
    let docs = YamlLoader::load_from_str(&text).unwrap();
    assert_eq!(docs, vec![yaml]);
}

#[test]
fn yaml_to_expression_data() {
    let docs = YamlLoader::load_from_str("os: linux\ncount: 3\nratio: 0.5\nflags: [true, null]\n1: one\n").unwrap();
    let data = yaml_to_data(&docs[0]).unwrap();
    assert_eq!(
        data,
        Data::dictionary([
            ("os", Data::string("linux")),
            ("count", Data::Number(3.0)),
            ("ratio", Data::Number(0.5)),
            ("flags", Data::array(vec![Data::Boolean(true), Data::Null])),
            ("1", Data::string("one")),
        ])
    );

    let docs = YamlLoader::load_from_str("? [a]\n: b\n").unwrap();
    assert!(yaml_to_data(&docs[0]).is_err());
}
