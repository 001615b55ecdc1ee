//! Document sources: the Superfastmatch HTTP API and an in-memory stand-in.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────┐     ┌──────────────────────────┐
//! │  DataSource    │     │         Catalog          │
//! │ SuperfastClient│────▶│ records → Document (ctor)│──▶ documents()
//! │ MemorySource   │     │ rows → Match (resolver)  │──▶ matches()
//! └────────────────┘     └──────────────────────────┘
//! ```
//!
//! A [`DataSource`] only deals in raw [`DocumentRecord`]s. The [`Catalog`]
//! turns records into [`Document`]s with a configurable constructor and
//! walks the cursor-paginated listing lazily, one point lookup per listed
//! document.
//!
//! Requests are issued one at a time and never retried.

use std::collections::{BTreeMap, VecDeque};
use std::time::Duration;

use reqwest::StatusCode;
use tracing::debug;

use crate::config::ApiConfig;
use crate::document::Document;
use crate::error::{Error, Result};
use crate::matches::{DocumentResolver, Match};
use crate::matrix::MatrixIndex;
use crate::models::{Cursors, DocumentPage, DocumentRecord, DocumentRef};

/// Read-only access to documents and their match tables.
pub trait DataSource {
    /// Full record of one document.
    ///
    /// Returns [`Error::NotFound`] for an unknown identity.
    fn fetch_document(&self, doctype: u64, docid: u64) -> Result<DocumentRecord>;

    /// One page of the document listing. `cursor` is `None` for the first
    /// page and otherwise the token returned with the previous page.
    fn list_page(&self, limit: usize, cursor: Option<&str>) -> Result<DocumentPage>;
}

// ═══════════════════════════════════════════════════════════════════════
// Superfastmatch HTTP API
// ═══════════════════════════════════════════════════════════════════════

/// Blocking client for a Superfastmatch server.
pub struct SuperfastClient {
    client: reqwest::blocking::Client,
    base_url: String,
}

impl SuperfastClient {
    /// `base_url` should look like `http://127.0.0.1:8080/`.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            base_url: format!("{}/", base_url.trim_end_matches('/')),
        })
    }

    pub fn from_config(api: &ApiConfig) -> Result<Self> {
        Self::new(&api.base_url(), api.timeout())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// URL for a path below the base URL, e.g. `document/1/89`.
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path.trim_start_matches('/'))
    }

    fn get(&self, path: &str, query: &[(&str, String)]) -> Result<reqwest::blocking::Response> {
        let url = self.url(path);
        debug!(url = %url, ?query, "GET");
        let resp = self.client.get(&url).query(query).send()?;
        Ok(resp)
    }

    fn check(resp: reqwest::blocking::Response) -> Result<reqwest::blocking::Response> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body = resp.text().unwrap_or_default();
        Err(Error::Server {
            status: status.as_u16(),
            body,
        })
    }

    /// Raw body of the server's status page.
    pub fn status(&self) -> Result<String> {
        let resp = Self::check(self.get("status", &[])?)?;
        Ok(resp.text()?)
    }
}

impl DataSource for SuperfastClient {
    fn fetch_document(&self, doctype: u64, docid: u64) -> Result<DocumentRecord> {
        let resp = self.get(&format!("document/{}/{}", doctype, docid), &[])?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Err(Error::NotFound { doctype, docid });
        }
        let body = Self::check(resp)?.text()?;
        Ok(serde_json::from_str(&body)?)
    }

    fn list_page(&self, limit: usize, cursor: Option<&str>) -> Result<DocumentPage> {
        let mut query = vec![("limit", limit.to_string())];
        if let Some(cursor) = cursor {
            query.push(("cursor", cursor.to_string()));
        }
        let body = Self::check(self.get("document/", &query)?)?.text()?;
        Ok(serde_json::from_str(&body)?)
    }
}

// ═══════════════════════════════════════════════════════════════════════
// In-memory source
// ═══════════════════════════════════════════════════════════════════════

/// Records held in memory, listed in `(doctype, docid)` order.
///
/// Used for tests and for replaying records saved with
/// [`Document::write_json`].
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    records: BTreeMap<(u64, u64), DocumentRecord>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: impl IntoIterator<Item = DocumentRecord>) -> Self {
        let mut source = Self::new();
        for record in records {
            source.insert(record);
        }
        source
    }

    /// Add or replace a record under its own identity.
    pub fn insert(&mut self, record: DocumentRecord) {
        self.records.insert((record.doctype, record.docid), record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl DataSource for MemorySource {
    fn fetch_document(&self, doctype: u64, docid: u64) -> Result<DocumentRecord> {
        self.records
            .get(&(doctype, docid))
            .cloned()
            .ok_or(Error::NotFound { doctype, docid })
    }

    fn list_page(&self, limit: usize, cursor: Option<&str>) -> Result<DocumentPage> {
        let offset = match cursor {
            Some(token) => token
                .parse::<usize>()
                .map_err(|_| Error::InvalidArgument(format!("unknown cursor: {:?}", token)))?,
            None => 0,
        };
        let rows: Vec<DocumentRef> = self
            .records
            .keys()
            .skip(offset)
            .take(limit)
            .map(|&(doctype, docid)| DocumentRef { doctype, docid })
            .collect();
        let end = offset + rows.len();
        let next = if rows.is_empty() || end >= self.records.len() {
            String::new()
        } else {
            end.to_string()
        };
        Ok(DocumentPage {
            rows,
            cursors: Cursors { next },
        })
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Catalog
// ═══════════════════════════════════════════════════════════════════════

/// Turns a fetched record into a [`Document`].
pub type DocumentConstructor = Box<dyn Fn(DocumentRecord) -> Document>;

/// A data source plus the constructor used for every document it yields.
pub struct Catalog<S> {
    source: S,
    constructor: DocumentConstructor,
}

impl<S: DataSource> Catalog<S> {
    /// Catalog building documents with [`Document::from_record`].
    pub fn new(source: S) -> Self {
        Self::with_constructor(source, Document::from_record)
    }

    pub fn with_constructor<F>(source: S, constructor: F) -> Self
    where
        F: Fn(DocumentRecord) -> Document + 'static,
    {
        Self {
            source,
            constructor: Box::new(constructor),
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn document(&self, doctype: u64, docid: u64) -> Result<Document> {
        let record = self.source.fetch_document(doctype, docid)?;
        Ok((self.constructor)(record))
    }

    /// Identities of every listed document, fetched page by page.
    pub fn document_refs(&self, page_size: usize) -> DocumentRefs<'_, S> {
        DocumentRefs {
            source: &self.source,
            page_size,
            buffer: VecDeque::new(),
            cursor: None,
            exhausted: false,
        }
    }

    /// Every listed document, each fetched when the iterator reaches it.
    pub fn documents(&self, page_size: usize) -> impl Iterator<Item = Result<Document>> + '_ {
        self.document_refs(page_size)
            .map(move |doc_ref| doc_ref.and_then(|r| self.document(r.doctype, r.docid)))
    }

    /// Matches of `primary`, one per row of its match table, with each
    /// counterpart fetched when the iterator reaches it.
    pub fn matches<'a>(
        &'a self,
        primary: &'a Document,
        exclusions: Option<&'a MatrixIndex>,
    ) -> impl Iterator<Item = Result<Match<'a>>> + 'a {
        primary.match_rows().iter().map(move |row| {
            let mut builder = Match::builder(primary).row(row.clone());
            if let Some(index) = exclusions {
                builder = builder.exclusions(index);
            }
            builder.build(self)
        })
    }
}

impl<S: DataSource> DocumentResolver for Catalog<S> {
    fn resolve(&self, doctype: u64, docid: u64) -> Result<Document> {
        self.document(doctype, docid)
    }
}

/// Iterator over the cursor-paginated document listing.
///
/// Stops after the first error.
pub struct DocumentRefs<'s, S> {
    source: &'s S,
    page_size: usize,
    buffer: VecDeque<DocumentRef>,
    cursor: Option<String>,
    exhausted: bool,
}

impl<S: DataSource> Iterator for DocumentRefs<'_, S> {
    type Item = Result<DocumentRef>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(doc_ref) = self.buffer.pop_front() {
                return Some(Ok(doc_ref));
            }
            if self.exhausted {
                return None;
            }
            let page = match self.source.list_page(self.page_size, self.cursor.as_deref()) {
                Ok(page) => page,
                Err(e) => {
                    self.exhausted = true;
                    return Some(Err(e));
                }
            };
            debug!(rows = page.rows.len(), next = %page.cursors.next, "fetched document page");
            self.cursor = page.next_cursor().map(str::to_string);
            self.exhausted = self.cursor.is_none();
            self.buffer.extend(page.rows);
        }
    }
}
