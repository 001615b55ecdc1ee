//! Export matched fragments as CSV.
//!
//! Walks every document the source lists, every match of each, and writes
//! one row per shared fragment:
//!
//! ```text
//! primary_desc_id,match_desc_id,fragment
//! vda.h.illbk.07,vda.g.illbk.07,and in what houses dwell<br>the daughters
//! ```
//!
//! With a [`MatrixIndex`], matches between copies from the same matrix are
//! left out. Output is a pure function of the source's current state, so an
//! interrupted export is redone by running it again.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::time::Duration;

use tracing::{debug, info};

use crate::error::Result;
use crate::matrix::MatrixIndex;
use crate::progress::{ExportProgressEvent, ExportProgressReporter, NoProgress};
use crate::source::{Catalog, DataSource};

pub const CSV_HEADER: [&str; 3] = ["primary_desc_id", "match_desc_id", "fragment"];

/// Knobs for [`export_fragments`].
pub struct ExportOptions<'a> {
    /// Same-matrix relations; `None` exports every match.
    pub exclusions: Option<&'a MatrixIndex>,
    /// Listing page size.
    pub page_size: usize,
    /// Pause before each primary document and each match.
    pub request_delay: Duration,
    pub progress: &'a dyn ExportProgressReporter,
}

impl Default for ExportOptions<'_> {
    fn default() -> Self {
        Self {
            exclusions: None,
            page_size: 100,
            request_delay: Duration::ZERO,
            progress: &NoProgress,
        }
    }
}

/// Counts from one export run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExportSummary {
    pub documents: usize,
    /// Matches written (excluded ones not counted).
    pub matches: usize,
    pub excluded: usize,
    pub fragments: usize,
}

fn pause(delay: Duration) {
    if !delay.is_zero() {
        std::thread::sleep(delay);
    }
}

/// Write the fragment CSV for every document in `catalog` to `writer`.
pub fn export_fragments<S, W>(
    catalog: &Catalog<S>,
    writer: W,
    options: &ExportOptions<'_>,
) -> Result<ExportSummary>
where
    S: DataSource,
    W: Write,
{
    let mut csv_writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::CRLF)
        .from_writer(writer);
    csv_writer.write_record(CSV_HEADER)?;

    let mut summary = ExportSummary::default();
    for primary in catalog.documents(options.page_size) {
        let primary = primary?;
        debug!(
            title = primary.title(),
            doctype = primary.doctype(),
            docid = primary.docid(),
            "exporting matches"
        );
        options.progress.report(ExportProgressEvent::Document {
            title: primary.title().to_string(),
            doctype: primary.doctype(),
            docid: primary.docid(),
        });
        summary.documents += 1;
        pause(options.request_delay);

        for matched in catalog.matches(&primary, options.exclusions) {
            pause(options.request_delay);
            let matched = matched?;
            let counterpart = matched.counterpart();

            if options.exclusions.is_some() && matched.excluded()? {
                debug!(
                    primary = primary.desc_id(),
                    counterpart = counterpart.desc_id(),
                    "same matrix, skipping"
                );
                options.progress.report(ExportProgressEvent::Skipped {
                    title: counterpart.title().to_string(),
                });
                summary.excluded += 1;
                continue;
            }

            options.progress.report(ExportProgressEvent::Match {
                title: counterpart.title().to_string(),
            });
            summary.matches += 1;
            for fragment in matched.fragments() {
                csv_writer.write_record([
                    primary.desc_id(),
                    fragment.doc().desc_id(),
                    fragment.text_cleaned().as_str(),
                ])?;
                summary.fragments += 1;
            }
        }
    }

    csv_writer.flush()?;
    info!(
        documents = summary.documents,
        matches = summary.matches,
        excluded = summary.excluded,
        fragments = summary.fragments,
        "export finished"
    );
    Ok(summary)
}

/// [`export_fragments`] into a file, creating parent directories.
pub fn export_to_path<S: DataSource>(
    catalog: &Catalog<S>,
    path: &Path,
    options: &ExportOptions<'_>,
) -> Result<ExportSummary> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let file = File::create(path)?;
    export_fragments(catalog, BufWriter::new(file), options)
}
