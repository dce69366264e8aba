#![allow(clippy::expect_used)]

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::fmt::Write;
use xmlite::serial::serialize;
use xmlite::{Document, ParseOptions};

// ---------------------------------------------------------------------------
// Document generators
// ---------------------------------------------------------------------------

/// Generates a small XML document with approximately 10 elements.
fn make_small_xml() -> String {
    let mut xml = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<root>\n");
    for i in 0..10 {
        let _ = writeln!(xml, "  <item id=\"{i}\">Value {i}</item>");
    }
    xml.push_str("</root>\n");
    xml
}

/// Generates a medium XML document with approximately 500 elements.
fn make_medium_xml() -> String {
    let mut xml = String::from("<?xml version=\"1.0\"?>\n<catalog>\n");
    for i in 0..500 {
        let _ = writeln!(
            xml,
            "  <book id=\"bk{i}\"><title>Title {i}</title>\
             <author>Author {i}</author>\
             <price>{}.99</price></book>",
            10 + i
        );
    }
    xml.push_str("</catalog>\n");
    xml
}

/// Generates an XML document where each element has `num_attrs` attributes.
fn make_attr_heavy_xml(num_attrs: usize) -> String {
    let mut xml = String::from("<?xml version=\"1.0\"?>\n<root>\n");
    for i in 0..10 {
        let _ = write!(xml, "  <element");
        for j in 0..num_attrs {
            let _ = write!(xml, " attr{j}=\"value_{i}_{j}\"");
        }
        xml.push_str("/>\n");
    }
    xml.push_str("</root>\n");
    xml
}

/// Generates a text-heavy document with entity references.
fn make_text_heavy_xml() -> String {
    let mut xml = String::from("<doc>\n");
    for i in 0..200 {
        let _ = writeln!(
            xml,
            "  <p>Paragraph {i} with &amp; entities &lt;and&gt; some   condensable   runs</p>"
        );
    }
    xml.push_str("</doc>\n");
    xml
}

// ---------------------------------------------------------------------------
// Benches
// ---------------------------------------------------------------------------

fn bench_parse(c: &mut Criterion) {
    let small = make_small_xml();
    let medium = make_medium_xml();
    let attrs = make_attr_heavy_xml(50);
    let text = make_text_heavy_xml();

    c.bench_function("parse_small", |b| {
        b.iter(|| Document::parse_str(black_box(&small)).expect("well-formed"));
    });
    c.bench_function("parse_medium", |b| {
        b.iter(|| Document::parse_str(black_box(&medium)).expect("well-formed"));
    });
    c.bench_function("parse_attr_heavy", |b| {
        b.iter(|| Document::parse_str(black_box(&attrs)).expect("well-formed"));
    });
    c.bench_function("parse_text_heavy", |b| {
        b.iter(|| Document::parse_str(black_box(&text)).expect("well-formed"));
    });
    c.bench_function("parse_no_condense", |b| {
        let opts = ParseOptions::default().condense_whitespace(false);
        b.iter(|| Document::parse_str_with_options(black_box(&text), &opts).expect("well-formed"));
    });
}

fn bench_serialize(c: &mut Criterion) {
    let medium = Document::parse_str(&make_medium_xml()).expect("well-formed");
    let attrs = Document::parse_str(&make_attr_heavy_xml(50)).expect("well-formed");

    c.bench_function("serialize_medium", |b| {
        b.iter(|| serialize(black_box(&medium)));
    });
    c.bench_function("serialize_attr_heavy", |b| {
        b.iter(|| serialize(black_box(&attrs)));
    });
}

fn bench_round_trip(c: &mut Criterion) {
    let medium = make_medium_xml();
    c.bench_function("round_trip_medium", |b| {
        b.iter(|| {
            let doc = Document::parse_str(black_box(&medium)).expect("well-formed");
            serialize(&doc)
        });
    });
}

criterion_group!(benches, bench_parse, bench_serialize, bench_round_trip);
criterion_main!(benches);
