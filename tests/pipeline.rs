use std::fs;
use std::path::Path;

use serde_json::json;
use tempfile::TempDir;

use blake_fragments::error::Error;
use blake_fragments::export::{export_fragments, ExportOptions};
use blake_fragments::extract::{extract_directory, ArchiveCopy};
use blake_fragments::matrix::MatrixIndex;
use blake_fragments::models::DocumentRecord;
use blake_fragments::source::{Catalog, MemorySource};
use blake_fragments::Document;

const ABEL_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<bad id="abel.a">
  <objdesc>
    <desc id="abel.a.illbk.01">
      <phystext>
        <lg>
          <l><note>The plate number is obscured.</note></l>
          <l>Jehovah<space extent="1"/>What</l>
        </lg>
      </phystext>
    </desc>
    <desc id="abel.a.illbk.02">
      <phystext>
        <lg>
          <l>Wave shadows of
             discontent</l>
          <lg><lg><l>and in what <hi>houses</hi> dwell</l></lg></lg>
        </lg>
      </phystext>
    </desc>
  </objdesc>
</bad>
"#;

fn write_xml(dir: &Path, name: &str, xml: &str) {
    fs::create_dir_all(dir).unwrap();
    fs::write(dir.join(name), xml).unwrap();
}

fn record(docid: u64, title: &str, text: &str, rows: serde_json::Value) -> DocumentRecord {
    serde_json::from_value(json!({
        "doctype": 1,
        "docid": docid,
        "title": title,
        "text": text,
        "documents": {"rows": rows},
    }))
    .unwrap()
}

#[test]
fn test_extract_scenario_from_markup() {
    let tmp = TempDir::new().unwrap();
    write_xml(tmp.path(), "abel.a.xml", ABEL_XML);

    let copy = ArchiveCopy::open(&tmp.path().join("abel.a.xml")).unwrap();
    let objects = copy.objects().unwrap();
    assert_eq!(objects.len(), 2);
    assert_eq!(objects[0].text(), "Jehovah What");
    assert!(!objects[0].text().contains("obscured"));
    assert_eq!(
        objects[1].text(),
        "Wave shadows of discontent\nand in what houses dwell"
    );
}

#[test]
fn test_extract_directory_is_idempotent() {
    let tmp = TempDir::new().unwrap();
    let xml_dir = tmp.path().join("xml");
    let text_dir = tmp.path().join("text");
    write_xml(&xml_dir, "abel.a.xml", ABEL_XML);

    extract_directory(&xml_dir, &text_dir).unwrap();
    let first = fs::read(text_dir.join("abel.a.illbk.02.txt")).unwrap();
    extract_directory(&xml_dir, &text_dir).unwrap();
    let second = fs::read(text_dir.join("abel.a.illbk.02.txt")).unwrap();
    assert_eq!(first, second);
    assert!(!first.ends_with(b"\n"));
}

#[test]
fn test_extract_missing_directory() {
    let err = extract_directory(Path::new("/nonexistent/xml"), Path::new("/tmp/out")).unwrap_err();
    assert!(matches!(err, Error::MissingResource(_)));
}

#[test]
fn test_relations_scenario() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("blake-relations.csv");
    fs::write(&path, "desc_id,same_matrix_ids\na,\"b,c\"\n").unwrap();

    let index = MatrixIndex::load_path(&path).unwrap();
    assert!(index.same_matrix("a", "b"));
    assert!(index.same_matrix("b", "a"));
    assert!(!index.same_matrix("b", "c"));
}

#[test]
fn test_extracted_text_feeds_export() {
    let tmp = TempDir::new().unwrap();
    let xml_dir = tmp.path().join("xml");
    let text_dir = tmp.path().join("text");
    write_xml(&xml_dir, "abel.a.xml", ABEL_XML);
    extract_directory(&xml_dir, &text_dir).unwrap();

    // What the comparison service would hold after loading the text files.
    let wave = fs::read_to_string(text_dir.join("abel.a.illbk.02.txt")).unwrap();
    let source = MemorySource::from_records([
        record(
            10,
            "abel.a.illbk.02.txt",
            &wave,
            json!([
                {"doctype": 1, "docid": 11, "fragments": [[16, 16, 22, 1]]},
                {"doctype": 1, "docid": 12, "fragments": [[0, 0, 12, 2]]}
            ]),
        ),
        record(11, "vda.h.illbk.07.txt", &wave, json!([])),
        record(12, "abel.b.illbk.02.txt", &wave, json!([])),
    ]);
    let catalog = Catalog::new(source);

    let relations = tmp.path().join("blake-relations.csv");
    fs::write(
        &relations,
        "desc_id,same_matrix_ids\nabel.b.illbk.02,abel.a.illbk.02\nvda.h.illbk.07,\n",
    )
    .unwrap();
    let index = MatrixIndex::load_path(&relations).unwrap();

    let mut out = Vec::new();
    let options = ExportOptions {
        exclusions: Some(&index),
        page_size: 2,
        ..ExportOptions::default()
    };
    let summary = export_fragments(&catalog, &mut out, &options).unwrap();
    let csv = String::from_utf8(out).unwrap();

    assert_eq!(
        csv,
        "primary_desc_id,match_desc_id,fragment\r\n\
         abel.a.illbk.02,vda.h.illbk.07,discontent<br>and in what\r\n"
    );
    assert_eq!(summary.documents, 3);
    assert_eq!(summary.excluded, 1);
    assert_eq!(summary.fragments, 1);
}

#[test]
fn test_export_without_exclusions_keeps_same_matrix_rows() {
    let catalog = Catalog::new(MemorySource::from_records([
        record(
            1,
            "s-los.e.illbk.06.txt",
            "Los sat",
            json!([{"doctype": 1, "docid": 2, "fragments": [[0, 0, 7, 1]]}]),
        ),
        record(2, "s-los.c.illbk.06.txt", "Los sat", json!([])),
    ]));

    let mut out = Vec::new();
    export_fragments(&catalog, &mut out, &ExportOptions::default()).unwrap();
    let csv = String::from_utf8(out).unwrap();
    assert!(csv.contains("s-los.e.illbk.06,s-los.c.illbk.06,Los sat\r\n"));
}

#[test]
fn test_saved_records_replay_offline() {
    let tmp = TempDir::new().unwrap();
    let doc = Document::from_record(record(
        89,
        "vda.h.illbk.07.txt",
        "Wave shadows",
        json!([{"doctype": 1, "docid": 199, "fragments": [[0, 0, 4, 1]]}]),
    ));
    let path = tmp.path().join("vda.h.illbk.07.json");
    doc.write_json(&path).unwrap();

    let reloaded = Document::from_json_file(&path).unwrap();
    assert_eq!(reloaded.desc_id(), "vda.h.illbk.07");
    assert_eq!(reloaded.match_rows().len(), 1);
    assert_eq!(reloaded.fragment(5, 7), "shadows");
}
