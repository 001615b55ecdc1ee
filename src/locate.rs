//! Fragment location: turning `(start, length)` pairs into text.
//!
//! Offsets from the comparison service count Unicode scalar values. Ranges
//! running past the end are truncated, and a start beyond the end gives an
//! empty string; neither is an error.

use crate::document::Document;
use crate::models::FragmentSpec;

/// Marker written in place of line breaks in exported fragment text.
pub const LINE_BREAK_MARKER: &str = "<br>";

/// `text[start..start + length]`, counted in characters.
///
/// A negative start or length locates nothing.
pub fn fragment_text(text: &str, start: i64, length: i64) -> &str {
    slice_with_offsets(text, &char_offsets(text), start, length)
}

/// Byte offset of every character start, followed by `text.len()`.
pub(crate) fn char_offsets(text: &str) -> Vec<usize> {
    let mut offsets: Vec<usize> = text.char_indices().map(|(idx, _)| idx).collect();
    offsets.push(text.len());
    offsets
}

/// [`fragment_text`] using a precomputed [`char_offsets`] table.
pub(crate) fn slice_with_offsets<'t>(
    text: &'t str,
    offsets: &[usize],
    start: i64,
    length: i64,
) -> &'t str {
    if start < 0 || length < 0 {
        return "";
    }
    let char_count = offsets.len().saturating_sub(1) as u64;
    let (start, length) = (start as u64, length as u64);
    let begin = start.min(char_count) as usize;
    let end = start.saturating_add(length).min(char_count) as usize;
    &text[offsets[begin]..offsets[end]]
}

/// A run of text in the matching document, as described by one fragment
/// entry of a match row.
#[derive(Debug, Clone, Copy)]
pub struct Fragment<'d> {
    doc: &'d Document,
    spec: FragmentSpec,
}

impl<'d> Fragment<'d> {
    pub fn new(doc: &'d Document, spec: FragmentSpec) -> Self {
        Self { doc, spec }
    }

    /// Document the text is taken from.
    pub fn doc(&self) -> &'d Document {
        self.doc
    }

    pub fn spec(&self) -> FragmentSpec {
        self.spec
    }

    /// Start offset within [`Fragment::doc`].
    pub fn begin(&self) -> i64 {
        self.spec.match_start
    }

    pub fn length(&self) -> i64 {
        self.spec.length
    }

    pub fn text(&self) -> &'d str {
        self.doc.fragment(self.begin(), self.length())
    }

    /// Text with line breaks replaced by [`LINE_BREAK_MARKER`].
    pub fn text_cleaned(&self) -> String {
        self.text().replace('\n', LINE_BREAK_MARKER)
    }
}
