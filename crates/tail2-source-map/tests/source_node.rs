//! Building code with SourceNode trees and re-attaching provenance to
//! already-mapped code.

use pretty_assertions::assert_eq;
use regex::Regex;
use tail2_source_map::*;

const CODE: &str = "function foo() {\n  return 1;\n}\n";

fn mapped_code() -> (SourceMapGenerator, SourceMapConsumer) {
    let mut generator = SourceMapGenerator::new(GeneratorOptions::default());
    for mapping in [
        NewMapping::new(Position::new(1, 0), "a.js", Position::new(1, 0)),
        NewMapping::new(Position::new(1, 9), "a.js", Position::new(1, 9)).with_name("foo"),
        NewMapping::new(Position::new(2, 2), "a.js", Position::new(2, 2)),
        NewMapping::new(Position::new(3, 0), "a.js", Position::new(3, 0)),
    ] {
        generator.add_mapping(mapping).unwrap();
    }
    generator.set_source_content("a.js", Some("original source".into()));
    let json = generator.to_json_string().unwrap();
    (generator, SourceMapConsumer::parse(&json).unwrap())
}

#[test]
fn test_emitted_map() {
    let node = SourceNode::new()
        .with_child(SourceNode::from_origin(1, 0, "a.js").with_child("function "))
        .with_child(
            SourceNode::from_origin(1, 9, "a.js")
                .with_name("foo")
                .with_child("foo() {\n"),
        )
        .with_child("  ")
        .with_child(SourceNode::from_origin(2, 2, "a.js").with_child("return 1;\n"))
        .with_child(SourceNode::from_origin(3, 0, "a.js").with_child("}\n"));

    let CodeWithSourceMap { code, mut map } = node
        .to_string_with_source_map(GeneratorOptions::default())
        .unwrap();
    assert_eq!(code, CODE);
    insta::assert_snapshot!(
        map.to_json_string().unwrap(),
        @r#"{"version":3,"sources":["a.js"],"names":["foo"],"mappings":"AAAA,SAASA;EACP;AACF"}"#
    );
}

#[test]
fn test_from_string_and_back_preserves_code_and_map() {
    let (mut original, consumer) = mapped_code();
    let node = SourceNode::from_string_with_source_map(CODE, &consumer, None).unwrap();
    assert_eq!(node.to_string(), CODE);

    let CodeWithSourceMap { code, mut map } = node
        .to_string_with_source_map(GeneratorOptions::default())
        .unwrap();
    assert_eq!(code, CODE);
    assert_eq!(map.to_json().unwrap(), original.to_json().unwrap());
}

#[test]
fn test_from_string_with_relative_path() {
    let (_, consumer) = mapped_code();
    let node = SourceNode::from_string_with_source_map(CODE, &consumer, Some("src")).unwrap();

    let mut sources = Vec::new();
    node.walk(|_, provenance| {
        if let Some(source) = provenance.source {
            if !sources.contains(&source) {
                sources.push(source);
            }
        }
    });
    assert_eq!(sources, vec!["src/a.js"]);

    let mut contents = Vec::new();
    node.walk_source_contents(&mut |source, content| {
        contents.push((source.to_string(), content.to_string()));
    });
    assert_eq!(
        contents,
        vec![("src/a.js".to_string(), "original source".to_string())]
    );
}

#[test]
fn test_recomposing_mapped_pieces() {
    let (_, consumer) = mapped_code();
    let body = SourceNode::from_string_with_source_map(CODE, &consumer, None).unwrap();

    let mut wrapper = SourceNode::new();
    wrapper
        .add("(function() {\n")
        .add(body)
        .add("})();\n");

    let CodeWithSourceMap { code, mut map } = wrapper
        .to_string_with_source_map(GeneratorOptions::default())
        .unwrap();
    assert_eq!(code, format!("(function() {{\n{CODE}}})();\n"));

    // everything shifted down one line
    let consumer = SourceMapConsumer::from_generator(&mut map, &ConsumerOptions::default()).unwrap();
    let original = consumer
        .original_position_for(2, 9, Bias::GreatestLowerBound)
        .unwrap();
    assert_eq!(original.name.as_deref(), Some("foo"));
    assert_eq!((original.line, original.column), (Some(1), Some(9)));
    assert!(!consumer
        .original_position_for(1, 0, Bias::GreatestLowerBound)
        .unwrap()
        .is_found());
}

#[test]
fn test_crlf_line_endings() {
    let mut generator = SourceMapGenerator::new(GeneratorOptions::default());
    generator
        .add_mapping(NewMapping::new(Position::new(1, 0), "w.js", Position::new(1, 0)))
        .unwrap();
    generator
        .add_mapping(NewMapping::new(Position::new(2, 0), "w.js", Position::new(2, 0)))
        .unwrap();
    let consumer = SourceMapConsumer::from_generator(&mut generator, &ConsumerOptions::default())
        .unwrap();

    let code = "a();\r\nb();\r\n";
    let node = SourceNode::from_string_with_source_map(code, &consumer, None).unwrap();
    assert_eq!(node.to_string(), code);

    let mut leaves = Vec::new();
    node.walk(|text, provenance| leaves.push((text.to_string(), provenance.line)));
    assert_eq!(
        leaves,
        vec![
            ("a();\r\n".to_string(), Some(1)),
            ("b();\r\n".to_string(), Some(2)),
        ]
    );
}

#[test]
fn test_join_and_replace_right() {
    let mut node = SourceNode::new();
    node.add_all([
        SourceNode::from_origin(1, 0, "a.js").with_child("a"),
        SourceNode::from_origin(2, 0, "b.js").with_child("b;  "),
    ]);
    node.join(", ");
    node.replace_right(&Regex::new(r"\s+$").unwrap(), "");
    assert_eq!(node.to_string(), "a, b;");

    let mut map = node
        .to_string_with_source_map(GeneratorOptions {
            file: Some("joined.js".into()),
            ..Default::default()
        })
        .unwrap()
        .map;
    insta::assert_snapshot!(
        map.to_json_string().unwrap(),
        @r#"{"version":3,"sources":["a.js","b.js"],"names":[],"mappings":"AAAA,C,ECCA","file":"joined.js"}"#
    );
}
