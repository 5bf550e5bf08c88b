//! CSV report output.
//!
//! Serializes [`PaperRecord`]s into the fixed six-column layout, either to a
//! file or to the console.

use crate::extractor::PaperRecord;
use crate::error::Result;
use serde::Serialize;
use std::io;
use std::path::Path;
use tracing::info;

/// CSV column order for the report
pub const COLUMNS: &[&str] = &[
    "PubmedID",
    "Title",
    "Publication Date",
    "Non-academic Author(s)",
    "Company Affiliation(s)",
    "Corresponding Author Email",
];

/// Banner printed before console output
pub const CONSOLE_BANNER: &str = "--- PubMed Papers with Non-Academic Authors ---";

/// One flattened CSV row; field order must match [`COLUMNS`]
#[derive(Debug, Serialize)]
struct ReportRow<'a> {
    #[serde(rename = "PubmedID")]
    pubmed_id: &'a str,
    #[serde(rename = "Title")]
    title: &'a str,
    #[serde(rename = "Publication Date")]
    publication_date: &'a str,
    #[serde(rename = "Non-academic Author(s)")]
    authors: String,
    #[serde(rename = "Company Affiliation(s)")]
    affiliations: String,
    #[serde(rename = "Corresponding Author Email")]
    email: &'a str,
}

impl<'a> From<&'a PaperRecord> for ReportRow<'a> {
    fn from(record: &'a PaperRecord) -> Self {
        Self {
            pubmed_id: &record.pubmed_id,
            title: &record.title,
            publication_date: &record.publication_date,
            authors: record.author_names(),
            affiliations: record.company_affiliations(),
            email: record.corresponding_email(),
        }
    }
}

/// Write header and rows to any writer.
///
/// The header is written even when `records` is empty.
pub fn write_records<W: io::Write>(records: &[PaperRecord], writer: W) -> Result<()> {
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);

    wtr.write_record(COLUMNS)?;
    for record in records {
        wtr.serialize(ReportRow::from(record))?;
    }

    wtr.flush()?;
    Ok(())
}

/// Write records to `path`, or to stdout when no path is given.
///
/// The file is only created once every row has been serialized.
pub fn write_csv(records: &[PaperRecord], path: Option<&Path>) -> Result<()> {
    match path {
        Some(path) => {
            let mut buf = Vec::new();
            write_records(records, &mut buf)?;
            std::fs::write(path, buf)?;
            info!(rows = records.len(), path = %path.display(), "CSV written");
            println!("\nResults written to {}", path.display());
        }
        None => {
            println!("\n{}\n", CONSOLE_BANNER);
            let stdout = io::stdout();
            write_records(records, stdout.lock())?;
        }
    }
    Ok(())
}
