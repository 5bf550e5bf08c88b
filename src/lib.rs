//! # pubmed-industry
//!
//! Finds PubMed papers with at least one non-academic (pharma/biotech)
//! author and exports them as CSV.
//!
//! ## Modules
//!
//! - [`fetcher`] - NCBI E-utilities client (esearch + efetch)
//! - [`classifier`] - Keyword heuristic for industry affiliations
//! - [`extractor`] - efetch XML walk producing [`PaperRecord`]s
//! - [`writer`] - Six-column CSV report
//! - [`error`] - Custom error types
//!
//! ## Usage
//!
//! ```rust,no_run
//! use pubmed_industry::{extractor, fetcher::PubMedClient, writer};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = PubMedClient::new()?;
//!     let ids = client.search("crispr therapeutics", 20).await?;
//!     let xml = client.fetch_details(&ids).await?;
//!     let papers = extractor::extract_paper_data(&xml)?;
//!     writer::write_csv(&papers, None)?;
//!     Ok(())
//! }
//! ```

pub mod classifier;
pub mod error;
pub mod extractor;
pub mod fetcher;
pub mod writer;

pub use classifier::is_non_academic;
pub use error::{PubmedError, Result};
pub use extractor::{extract_paper_data, NonAcademicAuthor, PaperRecord};
