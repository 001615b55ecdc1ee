//! Documents as held by the comparison service.
//!
//! A [`Document`] wraps a [`DocumentRecord`] and adds the Blake Archive
//! naming scheme: a title such as `vda.h.illbk.07.txt` yields the descriptor
//! id `vda.h.illbk.07` and, for five-segment titles, the work/copy/form/page
//! components.
//!
//! Reloading the service may reassign `(doctype, docid)` pairs, so a document
//! fetched later under the same identity is not guaranteed to be the same
//! text.

use std::cell::OnceCell;
use std::fmt;
use std::path::Path;

use serde_json::Value;

use crate::error::{Error, Result};
use crate::locate;
use crate::models::{DocumentRecord, MatchRow};

/// Components parsed from a five-segment title.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TitleParts {
    pub work: String,
    pub copy: String,
    pub form: String,
    pub page: String,
}

/// Descriptor id: the title with its final dot-delimited segment removed.
///
/// A title without any dot has an empty descriptor id.
pub fn descriptor_id(title: &str) -> String {
    match title.rfind('.') {
        Some(idx) => title[..idx].to_string(),
        None => String::new(),
    }
}

/// Work/copy/form/page for titles of exactly five segments, else `None`.
pub fn title_parts(title: &str) -> Option<TitleParts> {
    let segments: Vec<&str> = title.split('.').collect();
    match segments.as_slice() {
        [work, copy, form, page, _ext] => Some(TitleParts {
            work: work.to_string(),
            copy: copy.to_string(),
            form: form.to_string(),
            page: page.to_string(),
        }),
        _ => None,
    }
}

/// An immutable snapshot of one service document.
pub struct Document {
    record: DocumentRecord,
    desc_id: String,
    parts: Option<TitleParts>,
    char_offsets: OnceCell<Vec<usize>>,
}

impl Document {
    pub fn from_record(record: DocumentRecord) -> Document {
        let desc_id = descriptor_id(&record.title);
        let parts = title_parts(&record.title);
        Document {
            record,
            desc_id,
            parts,
            char_offsets: OnceCell::new(),
        }
    }

    /// Build from an already-decoded JSON value (e.g. a saved record).
    pub fn from_json_value(value: Value) -> Result<Document> {
        Ok(Document::from_record(serde_json::from_value(value)?))
    }

    /// Load a record previously written with [`Document::write_json`].
    pub fn from_json_file(path: &Path) -> Result<Document> {
        if !path.exists() {
            return Err(Error::MissingResource(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path)?;
        Ok(Document::from_record(serde_json::from_str(&content)?))
    }

    pub fn doctype(&self) -> u64 {
        self.record.doctype
    }

    pub fn docid(&self) -> u64 {
        self.record.docid
    }

    pub fn title(&self) -> &str {
        &self.record.title
    }

    pub fn text(&self) -> &str {
        &self.record.text
    }

    pub fn desc_id(&self) -> &str {
        &self.desc_id
    }

    pub fn work(&self) -> Option<&str> {
        self.parts.as_ref().map(|p| p.work.as_str())
    }

    pub fn copy(&self) -> Option<&str> {
        self.parts.as_ref().map(|p| p.copy.as_str())
    }

    pub fn form(&self) -> Option<&str> {
        self.parts.as_ref().map(|p| p.form.as_str())
    }

    pub fn page(&self) -> Option<&str> {
        self.parts.as_ref().map(|p| p.page.as_str())
    }

    pub fn title_parts(&self) -> Option<&TitleParts> {
        self.parts.as_ref()
    }

    pub fn match_rows(&self) -> &[MatchRow] {
        self.record.match_rows()
    }

    pub fn record(&self) -> &DocumentRecord {
        &self.record
    }

    /// The record as received, unrecognized fields included.
    pub fn to_record(&self) -> DocumentRecord {
        self.record.clone()
    }

    pub fn write_json(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, serde_json::to_string(&self.record)?)?;
        Ok(())
    }

    /// Substring of this document's text, in characters.
    ///
    /// Same semantics as [`locate::fragment_text`]; the character index is
    /// built on first use and kept for later calls.
    pub fn fragment(&self, start: i64, length: i64) -> &str {
        let offsets = self
            .char_offsets
            .get_or_init(|| locate::char_offsets(&self.record.text));
        locate::slice_with_offsets(&self.record.text, offsets, start, length)
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<Document {}>", self.desc_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(title: &str, text: &str) -> Document {
        Document::from_json_value(json!({
            "doctype": 1,
            "docid": 89,
            "title": title,
            "text": text,
        }))
        .unwrap()
    }

    #[test]
    fn five_segment_title() {
        let d = doc("vda.h.illbk.07.txt", "");
        assert_eq!(d.desc_id(), "vda.h.illbk.07");
        assert_eq!(d.work(), Some("vda"));
        assert_eq!(d.copy(), Some("h"));
        assert_eq!(d.form(), Some("illbk"));
        assert_eq!(d.page(), Some("07"));
    }

    #[test]
    fn short_title_has_no_parts() {
        let d = doc("but518.wc.01.txt", "");
        assert_eq!(d.desc_id(), "but518.wc.01");
        assert!(d.title_parts().is_none());
        assert!(d.work().is_none() && d.copy().is_none());
        assert!(d.form().is_none() && d.page().is_none());
    }

    #[test]
    fn six_segment_title_has_no_parts() {
        let d = doc("a.b.c.d.e.txt", "");
        assert_eq!(d.desc_id(), "a.b.c.d.e");
        assert!(d.title_parts().is_none());
    }

    #[test]
    fn title_without_dot() {
        assert_eq!(descriptor_id("untitled"), "");
    }

    #[test]
    fn fragment_counts_characters() {
        let d = doc("x.y.txt", "Wave shadows\nof discontent");
        assert_eq!(d.fragment(0, 4), "Wave");
        assert_eq!(d.fragment(13, 2), "of");
        assert_eq!(d.fragment(19, 100), "content");
        assert_eq!(d.fragment(500, 10), "");
    }

    #[test]
    fn debug_shows_desc_id() {
        assert_eq!(
            format!("{:?}", doc("vda.h.illbk.07.txt", "")),
            "<Document vda.h.illbk.07>"
        );
    }

    #[test]
    fn write_and_reload_keeps_extra_fields() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("saved").join("vda.h.illbk.07.json");
        let d = Document::from_json_value(json!({
            "doctype": 1,
            "docid": 89,
            "title": "vda.h.illbk.07.txt",
            "text": "Wave",
            "characters": 4,
        }))
        .unwrap();
        d.write_json(&path).unwrap();

        let reloaded = Document::from_json_file(&path).unwrap();
        assert_eq!(reloaded.record(), d.record());
        assert_eq!(reloaded.record().extra["characters"], json!(4));
    }

    #[test]
    fn to_record_rebuilds_an_equal_document() {
        let d = Document::from_json_value(json!({
            "doctype": "1",
            "docid": 89,
            "title": "vda.h.illbk.07.txt",
            "text": "Wave shadows",
            "documents": {"rows": [{"doctype": 1, "docid": 199, "fragments": [[0, 5, 7, 1]]}]},
            "success": true,
        }))
        .unwrap();

        let rebuilt = Document::from_record(d.to_record());
        assert_eq!(rebuilt.record(), d.record());
        assert_eq!(rebuilt.desc_id(), "vda.h.illbk.07");
        assert_eq!(rebuilt.match_rows()[0].fragments[0].match_start, 5);
        assert_eq!(rebuilt.to_record().extra["success"], json!(true));
    }

    #[test]
    fn missing_json_file() {
        let err = Document::from_json_file(Path::new("/nonexistent/doc.json")).unwrap_err();
        assert!(matches!(err, Error::MissingResource(_)));
    }
}
