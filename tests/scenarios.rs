use pretty_assertions::assert_eq;
use sql_pattern::cache::{CachingPatternParser, MemoryCache, PatternCache};
use sql_pattern::codec::{
    ArrayCodec, Discrete, Element, IntegerCodec, Range, RangeCodec, TextCodec, TextEncoder, TypeName, ValueParser,
    ValueSerializer,
};
use sql_pattern::{Error, ParamKey, PatternParser, SqlPatternParser};
use std::collections::HashMap;
use std::sync::Arc;

fn parser() -> SqlPatternParser {
    SqlPatternParser::new().unwrap()
}

#[test]
fn test_positional_placeholder_between_words() {
    let pattern = parser()
        .parse("SELECT * FROM person WHERE id = % AND is_active")
        .unwrap();

    assert_eq!(pattern.raw_sql(), "SELECT * FROM person WHERE id =  AND is_active");
    assert_eq!(pattern.placeholder_count(), 1);
    let placeholder = &pattern.placeholders()[0];
    assert_eq!(placeholder.offset(), 32);
    assert_eq!(placeholder.key(), &ParamKey::Position(0));
    assert_eq!(placeholder.type_name(), None);
}

#[test]
fn test_array_suffixes_collapse() {
    let pattern = parser().parse("SELECT %bigint[][][][2]").unwrap();

    assert_eq!(pattern.raw_sql(), "SELECT [2]");
    assert_eq!(pattern.placeholders()[0].offset(), 7);
    assert_eq!(pattern.placeholders()[0].type_name(), Some("bigint[]"));
}

#[test]
fn test_array_serialize_with_nulls() {
    let codec = ArrayCodec::new(IntegerCodec::int4());
    let value = vec![Element::Value(3), Element::Null, Element::Value(1)];

    assert_eq!(
        codec.serialize(&value, false).unwrap(),
        "ARRAY[3,NULL,1]::pg_catalog.int4[]"
    );
}

#[test]
fn test_array_serialize_rejects_ragged_value() {
    let codec = ArrayCodec::new(IntegerCodec::int4());
    let value = vec![
        Element::Array(vec![Element::Value(1), Element::Value(2), Element::Value(3)]),
        Element::Null,
    ];

    assert!(matches!(codec.serialize(&value, false), Err(Error::InvalidArgument(_))));
}

#[test]
fn test_fill_mixed_placeholders() {
    let pattern = parser()
        .parse("SELECT * FROM %:tbl WHERE name = % AND ord %% 2 = 0 AND %s:cond")
        .unwrap();
    let values = HashMap::from([
        (ParamKey::Position(0), "'John'"),
        (ParamKey::from("tbl"), "person"),
        (ParamKey::from("cond"), "is_active"),
    ]);

    assert_eq!(
        pattern.fill_sql(&values).unwrap(),
        "SELECT * FROM person WHERE name = 'John' AND ord % 2 = 0 AND is_active"
    );
}

#[test]
fn test_escapes_shorten_raw_sql_by_one_each() {
    let template = "SELECT '%%', 100 %% 7, '%%%%'";
    let pattern = parser().parse(template).unwrap();

    assert_eq!(pattern.placeholder_count(), 0);
    assert_eq!(pattern.raw_sql().len(), template.len() - 4);
    assert_eq!(pattern.raw_sql(), "SELECT '%', 100 % 7, '%%'");
}

#[test]
fn test_offsets_are_ordered_and_in_bounds() {
    let pattern = parser()
        .parse("INSERT INTO t VALUES (%, %text:a, %\"My Type\", %{double precision}:b, %:a, %)")
        .unwrap();

    let offsets: Vec<usize> = pattern.placeholders().iter().map(|p| p.offset()).collect();
    assert_eq!(offsets.len(), 6);
    assert!(offsets.windows(2).all(|w| w[0] <= w[1]));
    assert!(offsets.iter().all(|&o| o <= pattern.raw_sql().len()));
}

#[test]
fn test_positional_numbering_follows_appearance() {
    let pattern = parser().parse("SELECT %, %:x, %int, %:x, %").unwrap();

    let positions: Vec<usize> = pattern
        .positional_placeholders()
        .iter()
        .filter_map(|p| p.key().position())
        .collect();
    assert_eq!(positions, vec![0, 1, 2]);
    assert_eq!(pattern.named_placeholders()["x"].len(), 2);
}

#[test]
fn test_fill_requires_every_key() {
    let pattern = parser().parse("SELECT %:a, %:b").unwrap();
    let values = HashMap::from([(ParamKey::from("a"), "1")]);

    assert!(matches!(pattern.fill_sql(&values), Err(Error::InvalidArgument(_))));
}

#[test]
fn test_sequential_fill() {
    let pattern = parser().parse("SELECT %int4, %text:name, %:name").unwrap();
    let mut filler = pattern.filler();

    let mut seen = Vec::new();
    while let Some(placeholder) = filler.current() {
        seen.push(placeholder.key().to_string());
        let text = match placeholder.type_name() {
            Some("int4") => IntegerCodec::int4().serialize(&5, false).unwrap(),
            _ => TextCodec::new().serialize(&"x".to_string(), false).unwrap(),
        };
        filler.supply(text).unwrap();
        filler.advance().unwrap();
    }

    assert!(filler.is_done());
    assert_eq!(seen, vec!["#0", ":name", ":name"]);
    assert_eq!(filler.finish().unwrap(), "SELECT 5, 'x', 'x'");
}

#[test]
fn test_sequential_fill_without_value() {
    let pattern = parser().parse("SELECT %").unwrap();
    let mut filler = pattern.filler();

    assert!(matches!(filler.advance(), Err(Error::NoData(ParamKey::Position(0)))));
}

#[test]
fn test_parse_error_offsets() {
    match parser().parse("SELECT 1, %\"unterminated") {
        Err(Error::Parse { offset, .. }) => assert_eq!(offset, 11),
        other => panic!("expected parse error, got {other:?}"),
    }
    match parser().parse("SELECT %{open") {
        Err(Error::Parse { offset, .. }) => assert_eq!(offset, 8),
        other => panic!("expected parse error, got {other:?}"),
    }
}

#[test]
fn test_array_text_round_trip() {
    let codec = ArrayCodec::new(TextCodec::new());
    let value = vec![
        Element::Array(vec![
            Element::Value("a,b".to_string()),
            Element::Null,
        ]),
        Element::Array(vec![
            Element::Value("NULL".to_string()),
            Element::Value("say \"hi\"".to_string()),
        ]),
    ];

    let text = codec.encode_text(&value).unwrap();
    assert_eq!(codec.parse(&text).unwrap(), value);
}

#[test]
fn test_array_parse_error_offset() {
    let codec = ArrayCodec::new(IntegerCodec::int4());

    match codec.parse("{1,x,3}") {
        Err(Error::Parse { offset, .. }) => assert_eq!(offset, 3),
        other => panic!("expected parse error, got {other:?}"),
    }
}

#[test]
fn test_discrete_range_round_trip() {
    let codec = RangeCodec::new(IntegerCodec::int4(), TypeName::new("pg_catalog", "int4range"), Discrete);

    let range = codec.create(Some(1), Some(5), false, true).unwrap();
    assert_eq!(range.lower(), Some(&2));
    assert_eq!(range.upper(), Some(&6));
    assert_eq!(codec.encode_text(&range).unwrap(), "[2,6)");
    assert_eq!(codec.parse("[2,6)").unwrap(), range);
    assert_eq!(codec.serialize(&range, true).unwrap(), "pg_catalog.int4range(2, 6)");

    assert_eq!(codec.parse("(3,4)").unwrap(), Range::Empty);
}

#[test]
fn test_caching_parser_reuses_patterns() {
    let cache = Arc::new(MemoryCache::new());
    let parser = CachingPatternParser::new(parser(), Arc::clone(&cache));
    let template = "SELECT * FROM person WHERE id = %int8:id";

    let first = parser.parse(template).unwrap();
    let second = parser.parse(template).unwrap();

    assert_eq!(first, second);
    assert_eq!(cache.len(), 1);
    let key = parser.cache_key(template);
    assert!(key.starts_with("sqlpattern."));
    assert_eq!(cache.get(&key).unwrap(), Some(first));
}
