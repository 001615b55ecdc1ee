//! Same-matrix relations between archival objects.
//!
//! Copies printed from the same plate share text for reasons that have
//! nothing to do with reuse, so matches between them are dropped from the
//! export. The relations come from a CSV with (at least) the columns
//! `desc_id` and `same_matrix_ids`, the latter a comma-joined list:
//!
//! ```text
//! desc_id,same_matrix_ids
//! s-los.e.illbk.06,"s-los.c.illbk.06,s-los.d.illbk.06"
//! milton.d.illbk.05,
//! ```
//!
//! The table is expected to list each relation from both sides, but nothing
//! enforces that; [`MatrixIndex::same_matrix`] therefore looks in both
//! directions.

use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use serde::Deserialize;
use tracing::debug;

use crate::error::{Error, Result};

#[derive(Debug, Deserialize)]
struct RelationRow {
    desc_id: String,
    same_matrix_ids: String,
}

/// Descriptor id → ids of objects from the same matrix.
///
/// Objects without relations have no entry at all.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatrixIndex {
    matrices: HashMap<String, Vec<String>>,
}

impl MatrixIndex {
    /// Build from `(desc_id, same_matrix_ids)` pairs in table order.
    ///
    /// Rows with an empty id list are skipped. Repeated ids accumulate,
    /// duplicates included.
    pub fn from_rows<I, K, V>(rows: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: AsRef<str>,
    {
        let mut matrices: HashMap<String, Vec<String>> = HashMap::new();
        for (desc_id, ids) in rows {
            let ids = ids.as_ref();
            if ids.is_empty() {
                continue;
            }
            matrices
                .entry(desc_id.into())
                .or_default()
                .extend(ids.split(',').map(str::to_string));
        }
        Self { matrices }
    }

    /// Read a relations CSV with a header row.
    pub fn load<R: Read>(reader: R) -> Result<Self> {
        let mut csv_reader = csv::Reader::from_reader(reader);
        let mut rows = Vec::new();
        for row in csv_reader.deserialize::<RelationRow>() {
            let row = row?;
            rows.push((row.desc_id, row.same_matrix_ids));
        }
        let index = Self::from_rows(rows);
        debug!(entries = index.len(), "loaded matrix relations");
        Ok(index)
    }

    pub fn load_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::MissingResource(path.to_path_buf()));
        }
        Self::load(std::fs::File::open(path)?)
    }

    /// Whether either object lists the other as sharing its matrix.
    ///
    /// Unknown ids are simply not related.
    pub fn same_matrix(&self, a: &str, b: &str) -> bool {
        self.lists(a, b) || self.lists(b, a)
    }

    fn lists(&self, owner: &str, other: &str) -> bool {
        self.matrices
            .get(owner)
            .is_some_and(|ids| ids.iter().any(|id| id == other))
    }

    pub fn get(&self, desc_id: &str) -> Option<&[String]> {
        self.matrices.get(desc_id).map(Vec::as_slice)
    }

    pub fn contains(&self, desc_id: &str) -> bool {
        self.matrices.contains_key(desc_id)
    }

    pub fn len(&self) -> usize {
        self.matrices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matrices.is_empty()
    }
}
