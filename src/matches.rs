//! Matches between a primary document and one counterpart.
//!
//! A [`Match`] groups every fragment the comparison service found shared
//! between two documents. It is built from one row of the primary's match
//! table (the counterpart is then looked up through a [`DocumentResolver`])
//! or, when the counterpart is already in hand, directly from that document.
//!
//! Same-matrix exclusion is answered from a [`MatrixIndex`] handed to the
//! builder; a match built without one reports
//! [`Error::Precondition`](crate::error::Error::Precondition) from
//! [`Match::excluded`] rather than guessing.

use crate::document::Document;
use crate::error::{Error, Result};
use crate::locate::Fragment;
use crate::matrix::MatrixIndex;
use crate::models::{FragmentSpec, MatchRow};

/// Looks up a document by its service identity.
pub trait DocumentResolver {
    fn resolve(&self, doctype: u64, docid: u64) -> Result<Document>;
}

impl<F> DocumentResolver for F
where
    F: Fn(u64, u64) -> Result<Document>,
{
    fn resolve(&self, doctype: u64, docid: u64) -> Result<Document> {
        self(doctype, docid)
    }
}

/// Builder for [`Match`]. Exactly one of [`row`](MatchBuilder::row) and
/// [`counterpart`](MatchBuilder::counterpart) must be supplied.
pub struct MatchBuilder<'a> {
    primary: &'a Document,
    row: Option<MatchRow>,
    counterpart: Option<Document>,
    exclusions: Option<&'a MatrixIndex>,
}

impl<'a> MatchBuilder<'a> {
    pub fn row(mut self, row: MatchRow) -> Self {
        self.row = Some(row);
        self
    }

    pub fn counterpart(mut self, counterpart: Document) -> Self {
        self.counterpart = Some(counterpart);
        self
    }

    pub fn exclusions(mut self, exclusions: &'a MatrixIndex) -> Self {
        self.exclusions = Some(exclusions);
        self
    }

    /// Finish the match, resolving the counterpart of a row through
    /// `resolver`.
    pub fn build<R: DocumentResolver + ?Sized>(self, resolver: &R) -> Result<Match<'a>> {
        let (row, counterpart) = match (self.row, self.counterpart) {
            (Some(row), None) => {
                let counterpart = resolver.resolve(row.doctype, row.docid)?;
                (Some(row), counterpart)
            }
            (None, Some(counterpart)) => (None, counterpart),
            (None, None) => {
                return Err(Error::InvalidArgument(
                    "a match row or a counterpart document must be supplied".to_string(),
                ))
            }
            (Some(_), Some(_)) => {
                return Err(Error::InvalidArgument(
                    "supply either a match row or a counterpart document, not both".to_string(),
                ))
            }
        };
        Ok(Match {
            primary: self.primary,
            counterpart,
            row,
            exclusions: self.exclusions,
        })
    }
}

/// Two documents sharing one or more fragments.
#[derive(Debug)]
pub struct Match<'a> {
    primary: &'a Document,
    counterpart: Document,
    row: Option<MatchRow>,
    exclusions: Option<&'a MatrixIndex>,
}

impl<'a> Match<'a> {
    pub fn builder(primary: &'a Document) -> MatchBuilder<'a> {
        MatchBuilder {
            primary,
            row: None,
            counterpart: None,
            exclusions: None,
        }
    }

    pub fn primary(&self) -> &'a Document {
        self.primary
    }

    pub fn counterpart(&self) -> &Document {
        &self.counterpart
    }

    /// The match-table row this match was built from, if any.
    pub fn row(&self) -> Option<&MatchRow> {
        self.row.as_ref()
    }

    pub fn fragment_specs(&self) -> &[FragmentSpec] {
        self.row
            .as_ref()
            .map(|row| row.fragments.as_slice())
            .unwrap_or(&[])
    }

    /// Shared fragments, as text of the counterpart, in row order.
    ///
    /// A match built from a counterpart document alone has none.
    pub fn fragments(&self) -> impl Iterator<Item = Fragment<'_>> + '_ {
        self.fragment_specs()
            .iter()
            .map(move |spec| Fragment::new(&self.counterpart, *spec))
    }

    /// Whether the two documents come from the same matrix.
    pub fn excluded(&self) -> Result<bool> {
        let index = self.exclusions.ok_or_else(|| {
            Error::Precondition("no matrix relations attached to this match".to_string())
        })?;
        Ok(index.same_matrix(self.primary.desc_id(), self.counterpart.desc_id()))
    }
}
