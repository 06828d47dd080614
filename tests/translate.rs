#![allow(clippy::unwrap_used)] // test code OK

use std::path::PathBuf;

use confxp::ast::{Document, Value};
use confxp::render::to_toml;
use confxp::translator::Translator;
use confxp::{ErrorKind, ParseConfig, translate};

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn document<const N: usize>(entries: [(&str, Value); N]) -> Document {
    entries.into_iter().collect()
}

fn int(n: i64) -> Value {
    Value::Integer(n)
}

#[test]
fn test_parse_file() {
    let mut translator = Translator::new();
    let result = translator.parse_file(fixture("sample.conf")).unwrap();

    let expected = document([
        ("title_size", int(3)),
        ("area", int(3200)),
        (
            "screen",
            Value::Document(document([
                ("width", int(80)),
                ("height", int(40)),
                (
                    "inner",
                    Value::Document(document([("width", int(76)), ("height", int(36))])),
                ),
            ])),
        ),
    ]);
    assert_eq!(result, expected);
    assert_eq!(
        translator.constants().bindings(),
        vec![("HEIGHT", 40), ("MARGIN", 2), ("WIDTH", 80)]
    );
}

#[test]
fn test_file_renders_to_equivalent_toml() {
    let result = Translator::new().parse_file(fixture("sample.conf")).unwrap();
    let text = to_toml(&result).unwrap();
    let table: toml::Table = text.parse().unwrap();

    assert_eq!(table["area"].as_integer(), Some(3200));
    assert_eq!(table["screen"]["inner"]["width"].as_integer(), Some(76));
    assert!(text.contains("[screen.inner]"), "{text}");
}

#[test]
fn test_undefined_constant_in_file() {
    let err = Translator::new()
        .parse_file(fixture("undefined.conf"))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Value);
    assert_eq!(err.line(), Some(2));
    assert!(err.to_string().contains("undefined constant 'B'"));
}

#[test]
fn test_unterminated_comment_in_file() {
    let lenient = Translator::new()
        .parse_file(fixture("unterminated.conf"))
        .unwrap();
    assert_eq!(lenient, document([("kept", int(1))]));

    let err = Translator::with_config(ParseConfig::strict())
        .parse_file(fixture("unterminated.conf"))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Syntax);
    assert_eq!(err.line(), Some(2));
}

#[test]
fn test_translate_one_shot() {
    let source = "\
(define X 10);
(define Y 5);
{ sum : ^(X) + ^(Y); diff : ^(X) - ^(Y); }
";
    let result = translate(source, &ParseConfig::default()).unwrap();
    assert_eq!(result, document([("sum", int(15)), ("diff", int(5))]));
}

#[test]
fn test_deep_nesting_with_siblings() {
    let source = "{ top : 0; a : { one : 1; b : { two : 2; c : 5; three : 3; }; four : 4; }; five : 5; }";
    let result = translate(source, &ParseConfig::default()).unwrap();

    let a = result.get("a").and_then(Value::as_document).unwrap();
    let b = a.get("b").and_then(Value::as_document).unwrap();
    assert_eq!(b.get("c"), Some(&int(5)));
    assert_eq!(b.keys().collect::<Vec<_>>(), vec!["two", "c", "three"]);
    assert_eq!(a.keys().collect::<Vec<_>>(), vec!["one", "b", "four"]);
    assert_eq!(result.keys().collect::<Vec<_>>(), vec!["top", "a", "five"]);
}
