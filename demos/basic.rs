//! Basic example: parse a template, encode values, and fill it
//!
//! Run with: cargo run --example basic
//!
//! No database is needed; the filled SQL is printed.

use sql_pattern::codec::{
    ArrayCodec, Discrete, Element, IntegerCodec, RangeCodec, TextCodec, TypeName, ValueSerializer,
};
use sql_pattern::{Error, PatternParser, SqlPatternParser};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let parser = SqlPatternParser::new()?;

    // Example 1: Inspect the placeholders of a template
    println!("--- Example 1: Parsing ---");
    let pattern = parser.parse(
        "SELECT * FROM person
         WHERE id = ANY(%int4[]:ids)
           AND name ILIKE %text:name || '%%'
           AND age <@ %int4range
           AND %:extra",
    )?;

    println!("Raw SQL: {}", pattern.raw_sql());
    for placeholder in pattern.placeholders() {
        println!(
            "  {} at offset {} (type: {})",
            placeholder.key(),
            placeholder.offset(),
            placeholder.type_name().unwrap_or("none")
        );
    }

    // Example 2: Fill through a binder using the codecs
    println!("\n--- Example 2: Filling ---");
    let ids = ArrayCodec::new(IntegerCodec::int4());
    let ages = RangeCodec::new(IntegerCodec::int4(), TypeName::new("pg_catalog", "int4range"), Discrete);
    let age_range = ages.create(Some(18), Some(65), true, true)?;
    let id_values = vec![Element::Value(1), Element::Value(2), Element::Null];

    let sql = pattern.fill_with(|p| {
        if p.is_positional() {
            return ages.serialize(&age_range, false);
        }
        match p.key().name() {
            Some("ids") => ids.serialize(&id_values, false),
            Some("name") => TextCodec::new().serialize(&"O'Brien".to_string(), false),
            Some("extra") => Ok("TRUE".to_string()),
            _ => Err(Error::NoData(p.key().clone())),
        }
    })?;
    println!("{sql}");

    // Example 3: Encoding errors surface before any SQL is produced
    println!("\n--- Example 3: Invalid values ---");
    let ragged = vec![
        Element::Array(vec![Element::Value(1), Element::Value(2)]),
        Element::Value(3),
    ];
    match ids.serialize(&ragged, true) {
        Ok(sql) => println!("Unexpected success: {sql}"),
        Err(e) => println!("Rejected: {e}"),
    }

    // Example 4: Parse errors report the offending offset
    println!("\n--- Example 4: Invalid template ---");
    match parser.parse("SELECT %\"unterminated") {
        Ok(_) => println!("Unexpected success"),
        Err(e) => println!("Rejected: {e}"),
    }

    println!("\n✓ All examples completed successfully!");

    Ok(())
}
