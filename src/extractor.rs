//! PubMed efetch XML extraction.
//!
//! Walks a `PubmedArticleSet` document and turns every article with at least
//! one non-academic author into a [`PaperRecord`]. Articles without such an
//! author are dropped. Missing fields fall back to placeholders instead of
//! failing the whole document; malformed XML is an error.

use crate::classifier::is_non_academic;
use crate::error::{PubmedError, Result};
use quick_xml::events::Event;
use quick_xml::Reader;
use regex::Regex;
use serde::Serialize;
use tracing::{debug, info};

/// Publication date used when neither `Year` nor `MedlineDate` is present
pub const UNKNOWN_DATE: &str = "Unknown";

/// Email column value when no qualifying affiliation carries an address
pub const EMAIL_NOT_FOUND: &str = "Not found";

/// Separator for multi-author columns
pub const JOIN_SEPARATOR: &str = "; ";

/// Email address pattern applied to affiliation text
pub const EMAIL_PATTERN: &str = r"[a-zA-Z0-9_.+-]+@[a-zA-Z0-9-]+\.[a-zA-Z0-9.-]+";

/// An author whose affiliation was classified as non-academic
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NonAcademicAuthor {
    /// "ForeName LastName", trimmed
    pub name: String,
    /// Raw affiliation text
    pub affiliation: String,
}

/// One qualifying article
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaperRecord {
    /// PubMed identifier
    pub pubmed_id: String,
    /// Article title
    pub title: String,
    /// `Year`, else `MedlineDate`, else [`UNKNOWN_DATE`]
    pub publication_date: String,
    /// Non-academic authors in document order (never empty)
    pub authors: Vec<NonAcademicAuthor>,
    /// First email found across the qualifying affiliations
    pub email: Option<String>,
}

impl PaperRecord {
    /// Author names joined with [`JOIN_SEPARATOR`]
    pub fn author_names(&self) -> String {
        self.authors
            .iter()
            .map(|a| a.name.as_str())
            .collect::<Vec<_>>()
            .join(JOIN_SEPARATOR)
    }

    /// Affiliations joined with [`JOIN_SEPARATOR`], parallel to [`Self::author_names`]
    pub fn company_affiliations(&self) -> String {
        self.authors
            .iter()
            .map(|a| a.affiliation.as_str())
            .collect::<Vec<_>>()
            .join(JOIN_SEPARATOR)
    }

    /// Email or [`EMAIL_NOT_FOUND`]
    pub fn corresponding_email(&self) -> &str {
        self.email.as_deref().unwrap_or(EMAIL_NOT_FOUND)
    }
}

/// Extract qualifying papers from an efetch XML document.
///
/// # Errors
///
/// Returns an error if the document is empty, truncated or not well-formed.
pub fn extract_paper_data(xml: &str) -> Result<Vec<PaperRecord>> {
    let email_pattern = Regex::new(EMAIL_PATTERN).map_err(|e| PubmedError::Parse(e.to_string()))?;
    let mut walker = DocumentWalker::new(&email_pattern);

    let mut reader = Reader::from_str(xml);
    let mut depth = 0usize;
    let mut seen_root = false;

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                if depth == 0 {
                    seen_root = open_root(seen_root)?;
                }
                depth += 1;
                walker.start(e.local_name().as_ref(), depth);
            }
            Event::Empty(e) => {
                if depth == 0 {
                    seen_root = open_root(seen_root)?;
                }
                walker.start(e.local_name().as_ref(), depth + 1);
                walker.end(depth + 1);
            }
            Event::End(_) => {
                walker.end(depth);
                depth = depth.saturating_sub(1);
            }
            Event::Text(e) => {
                let text = e
                    .unescape()
                    .map_err(|err| PubmedError::Parse(format!("Invalid text content: {}", err)))?;
                walker.text(&text);
            }
            Event::CData(e) => walker.text(&String::from_utf8_lossy(&e)),
            Event::Eof => break,
            _ => {}
        }
    }

    if !seen_root {
        return Err(PubmedError::Parse("Empty XML document".to_string()));
    }
    if depth != 0 {
        return Err(PubmedError::Parse(
            "Unexpected end of XML document".to_string(),
        ));
    }

    info!(papers = walker.records.len(), "Extraction complete");
    Ok(walker.records)
}

/// A well-formed document has exactly one top-level element
fn open_root(seen_root: bool) -> Result<bool> {
    if seen_root {
        return Err(PubmedError::Parse(
            "Multiple root elements in XML document".to_string(),
        ));
    }
    Ok(true)
}

/// Text-bearing elements we read
#[derive(Debug, Clone, Copy)]
enum Field {
    Pmid,
    Title,
    Year,
    MedlineDate,
    ForeName,
    LastName,
    Affiliation,
}

/// Text being collected for a field until its element closes
struct Capture {
    field: Field,
    depth: usize,
    text: String,
}

#[derive(Default)]
struct AuthorNode {
    depth: usize,
    fore_name: Option<String>,
    last_name: Option<String>,
    /// Depth of the first `AffiliationInfo` while it is open
    affiliation_info_depth: Option<usize>,
    has_affiliation_info: bool,
    affiliation: Option<String>,
}

impl AuthorNode {
    fn new(depth: usize) -> Self {
        Self {
            depth,
            ..Default::default()
        }
    }

    fn open(&mut self, name: &[u8], depth: usize) -> Option<Field> {
        let direct_child = depth == self.depth + 1;
        match name {
            b"ForeName" if direct_child && self.fore_name.is_none() => Some(Field::ForeName),
            b"LastName" if direct_child && self.last_name.is_none() => Some(Field::LastName),
            // only the first AffiliationInfo counts
            b"AffiliationInfo" if !self.has_affiliation_info => {
                self.has_affiliation_info = true;
                self.affiliation_info_depth = Some(depth);
                None
            }
            b"Affiliation"
                if self.affiliation.is_none()
                    && self.affiliation_info_depth.is_some_and(|d| depth == d + 1) =>
            {
                Some(Field::Affiliation)
            }
            _ => None,
        }
    }

    fn close(&mut self, depth: usize) {
        if self.affiliation_info_depth == Some(depth) {
            self.affiliation_info_depth = None;
        }
    }

    fn full_name(&self) -> String {
        format!(
            "{} {}",
            self.fore_name.as_deref().unwrap_or(""),
            self.last_name.as_deref().unwrap_or("")
        )
        .trim()
        .to_string()
    }

    /// Raw `Affiliation` text; `None` when the author has no `AffiliationInfo` at all
    fn affiliation_text(&self) -> Option<String> {
        self.has_affiliation_info
            .then(|| self.affiliation.clone().unwrap_or_default())
    }
}

#[derive(Default)]
struct ArticleNode {
    depth: usize,
    pmid: Option<String>,
    title: Option<String>,
    has_pub_date: bool,
    /// Depth of the first `PubDate` while it is open
    pub_date_depth: Option<usize>,
    year: Option<String>,
    medline_date: Option<String>,
    author: Option<AuthorNode>,
    authors: Vec<AuthorNode>,
}

impl ArticleNode {
    fn new(depth: usize) -> Self {
        Self {
            depth,
            ..Default::default()
        }
    }

    fn in_pub_date(&self, depth: usize) -> bool {
        self.pub_date_depth.is_some_and(|d| depth == d + 1)
    }

    fn open(&mut self, name: &[u8], depth: usize) -> Option<Field> {
        match name {
            b"PMID" if self.pmid.is_none() => return Some(Field::Pmid),
            b"ArticleTitle" if self.title.is_none() => return Some(Field::Title),
            b"PubDate" if !self.has_pub_date => {
                self.has_pub_date = true;
                self.pub_date_depth = Some(depth);
                return None;
            }
            b"Year" if self.year.is_none() && self.in_pub_date(depth) => {
                return Some(Field::Year)
            }
            b"MedlineDate" if self.medline_date.is_none() && self.in_pub_date(depth) => {
                return Some(Field::MedlineDate)
            }
            _ => {}
        }

        match self.author.as_mut() {
            Some(author) => author.open(name, depth),
            None => {
                if name == b"Author" {
                    self.author = Some(AuthorNode::new(depth));
                }
                None
            }
        }
    }

    fn close(&mut self, depth: usize) {
        if self.pub_date_depth == Some(depth) {
            self.pub_date_depth = None;
        }
        if self.author.as_ref().is_some_and(|a| a.depth == depth) {
            if let Some(author) = self.author.take() {
                self.authors.push(author);
            }
        } else if let Some(author) = self.author.as_mut() {
            author.close(depth);
        }
    }

    fn assign(&mut self, field: Field, text: String) {
        match field {
            Field::Pmid => self.pmid = Some(text),
            Field::Title => self.title = Some(text),
            Field::Year => self.year = Some(text),
            Field::MedlineDate => self.medline_date = Some(text),
            Field::ForeName | Field::LastName | Field::Affiliation => {
                let Some(author) = self.author.as_mut() else {
                    return;
                };
                match field {
                    Field::ForeName => author.fore_name = Some(text),
                    Field::LastName => author.last_name = Some(text),
                    _ => author.affiliation = Some(text),
                }
            }
        }
    }

    fn into_record(self, email_pattern: &Regex) -> Option<PaperRecord> {
        let pubmed_id = non_empty(self.pmid).unwrap_or_default();

        let mut authors = Vec::new();
        let mut email = None;
        for author in &self.authors {
            let Some(affiliation) = author.affiliation_text() else {
                continue;
            };
            if !is_non_academic(&affiliation) {
                continue;
            }
            if email.is_none() {
                email = email_pattern
                    .find(&affiliation)
                    .map(|m| m.as_str().to_string());
            }
            authors.push(NonAcademicAuthor {
                name: author.full_name(),
                affiliation,
            });
        }

        if authors.is_empty() {
            debug!(pmid = %pubmed_id, "No non-academic authors, dropping article");
            return None;
        }

        debug!(
            pmid = %pubmed_id,
            authors = authors.len(),
            "Keeping article"
        );

        Some(PaperRecord {
            pubmed_id,
            title: non_empty(self.title).unwrap_or_default(),
            publication_date: non_empty(self.year)
                .or_else(|| non_empty(self.medline_date))
                .unwrap_or_else(|| UNKNOWN_DATE.to_string()),
            authors,
            email,
        })
    }
}

/// Trimmed value, `None` if absent or blank
fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Event sink that tracks the current article, author and captured field
struct DocumentWalker<'a> {
    email_pattern: &'a Regex,
    article: Option<ArticleNode>,
    capture: Option<Capture>,
    records: Vec<PaperRecord>,
}

impl<'a> DocumentWalker<'a> {
    fn new(email_pattern: &'a Regex) -> Self {
        Self {
            email_pattern,
            article: None,
            capture: None,
            records: Vec::new(),
        }
    }

    fn start(&mut self, name: &[u8], depth: usize) {
        if self.article.is_none() {
            if name == b"PubmedArticle" {
                self.article = Some(ArticleNode::new(depth));
            }
            return;
        }
        // markup inside a captured field (e.g. <i> in a title) is plain text to us
        if self.capture.is_some() {
            return;
        }
        if let Some(field) = self.article.as_mut().and_then(|a| a.open(name, depth)) {
            self.capture = Some(Capture {
                field,
                depth,
                text: String::new(),
            });
        }
    }

    fn text(&mut self, text: &str) {
        if let Some(capture) = self.capture.as_mut() {
            capture.text.push_str(text);
        }
    }

    fn end(&mut self, depth: usize) {
        if self.capture.as_ref().is_some_and(|c| c.depth == depth) {
            if let (Some(capture), Some(article)) = (self.capture.take(), self.article.as_mut()) {
                article.assign(capture.field, capture.text);
            }
            return;
        }

        let Some(article) = self.article.as_mut() else {
            return;
        };
        if article.depth != depth {
            article.close(depth);
            return;
        }

        if let Some(article) = self.article.take() {
            if let Some(record) = article.into_record(self.email_pattern) {
                self.records.push(record);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn article(body: &str) -> String {
        format!(
            r#"<?xml version="1.0"?>
<!DOCTYPE PubmedArticleSet PUBLIC "-//NLM//DTD PubMedArticle, 1st January 2024//EN" "https://dtd.nlm.nih.gov/ncbi/pubmed/out/pubmed_240101.dtd">
<PubmedArticleSet>
  <PubmedArticle>
    <MedlineCitation Status="MEDLINE" Owner="NLM">
      {}
    </MedlineCitation>
  </PubmedArticle>
</PubmedArticleSet>"#,
            body
        )
    }

    fn author(fore: &str, last: &str, affiliation: &str) -> String {
        format!(
            "<Author ValidYN=\"Y\"><LastName>{}</LastName><ForeName>{}</ForeName>\
             <AffiliationInfo><Affiliation>{}</Affiliation></AffiliationInfo></Author>",
            last, fore, affiliation
        )
    }

    fn citation(pmid: &str, title: &str, pub_date: &str, authors: &str) -> String {
        article(&format!(
            "<PMID Version=\"1\">{}</PMID>\
             <Article><Journal><JournalIssue><PubDate>{}</PubDate></JournalIssue></Journal>\
             <ArticleTitle>{}</ArticleTitle><AuthorList>{}</AuthorList></Article>",
            pmid, pub_date, title, authors
        ))
    }

    #[test]
    fn test_keeps_article_with_company_author() -> Result<()> {
        let xml = citation(
            "123",
            "Test",
            "<Year>2023</Year>",
            &author("Ada", "Lovelace", "Acme Biotech Inc, contact: a@acme.com"),
        );

        let papers = extract_paper_data(&xml)?;
        assert_eq!(papers.len(), 1);
        assert_eq!(papers[0].pubmed_id, "123");
        assert_eq!(papers[0].title, "Test");
        assert_eq!(papers[0].publication_date, "2023");
        assert_eq!(papers[0].author_names(), "Ada Lovelace");
        assert_eq!(papers[0].corresponding_email(), "a@acme.com");
        Ok(())
    }

    #[test]
    fn test_drops_academic_only_article() -> Result<()> {
        let xml = citation(
            "456",
            "Academic",
            "<Year>2020</Year>",
            &author("Jane", "Doe", "Stanford University"),
        );
        assert!(extract_paper_data(&xml)?.is_empty());
        Ok(())
    }

    #[test]
    fn test_publication_date_fallbacks() -> Result<()> {
        let affil = author("A", "B", "Genentech Inc");

        let medline = citation("1", "T", "<MedlineDate>2019 Jan-Feb</MedlineDate>", &affil);
        assert_eq!(extract_paper_data(&medline)?[0].publication_date, "2019 Jan-Feb");

        let neither = citation("1", "T", "<Season>Spring</Season>", &affil);
        assert_eq!(extract_paper_data(&neither)?[0].publication_date, UNKNOWN_DATE);

        let no_pub_date = article(&format!(
            "<PMID>1</PMID><Article><ArticleTitle>T</ArticleTitle><AuthorList>{}</AuthorList></Article>",
            affil
        ));
        assert_eq!(extract_paper_data(&no_pub_date)?[0].publication_date, UNKNOWN_DATE);
        Ok(())
    }

    #[test]
    fn test_multiple_company_authors_joined() -> Result<()> {
        let authors = [
            author("Ann", "One", "Pfizer Inc, New York"),
            author("Bob", "Two", "Harvard University"),
            author("Cy", "Three", "Roche Pharma AG; cy@roche.com"),
        ]
        .concat();
        let xml = citation("789", "Joined", "<Year>2024</Year>", &authors);

        let papers = extract_paper_data(&xml)?;
        assert_eq!(papers.len(), 1);
        let paper = &papers[0];
        assert_eq!(paper.authors.len(), 2);
        assert_eq!(paper.author_names(), "Ann One; Cy Three");
        assert_eq!(
            paper.company_affiliations(),
            "Pfizer Inc, New York; Roche Pharma AG; cy@roche.com"
        );
        assert_eq!(paper.corresponding_email(), "cy@roche.com");
        Ok(())
    }

    #[test]
    fn test_first_email_wins() -> Result<()> {
        let authors = [
            author("A", "First", "Alpha Labs, first@alpha.io"),
            author("B", "Second", "Beta Corp, second@beta.io"),
        ]
        .concat();
        let xml = citation("1", "T", "<Year>2021</Year>", &authors);
        assert_eq!(extract_paper_data(&xml)?[0].email.as_deref(), Some("first@alpha.io"));
        Ok(())
    }

    #[test]
    fn test_missing_email_and_names() -> Result<()> {
        let authors = "<Author><LastName>Solo</LastName>\
            <AffiliationInfo><Affiliation>Moderna Therapeutics</Affiliation></AffiliationInfo></Author>\
            <Author><CollectiveName>Consortium</CollectiveName>\
            <AffiliationInfo><Affiliation>BioNTech GmbH</Affiliation></AffiliationInfo></Author>";
        let xml = citation("1", "T", "<Year>2021</Year>", authors);

        let paper = &extract_paper_data(&xml)?[0];
        assert_eq!(paper.author_names(), "Solo; ");
        assert_eq!(paper.email, None);
        assert_eq!(paper.corresponding_email(), EMAIL_NOT_FOUND);
        Ok(())
    }

    #[test]
    fn test_author_without_affiliation_is_skipped() -> Result<()> {
        let authors = format!(
            "<Author><LastName>Nowhere</LastName><ForeName>Ned</ForeName></Author>{}",
            author("Ida", "Corp", "Illumina Inc")
        );
        let xml = citation("1", "T", "<Year>2021</Year>", &authors);
        assert_eq!(extract_paper_data(&xml)?[0].author_names(), "Ida Corp");
        Ok(())
    }

    #[test]
    fn test_only_first_affiliation_info_is_read() -> Result<()> {
        let authors = "<Author><LastName>Dual</LastName><ForeName>Dee</ForeName>\
            <AffiliationInfo><Affiliation>Yale University</Affiliation></AffiliationInfo>\
            <AffiliationInfo><Affiliation>Acme Pharma Ltd</Affiliation></AffiliationInfo></Author>";
        let xml = citation("1", "T", "<Year>2021</Year>", authors);
        assert!(extract_paper_data(&xml)?.is_empty());
        Ok(())
    }

    #[test]
    fn test_title_with_markup_and_entities() -> Result<()> {
        let xml = citation(
            "1",
            "Effects of <i>E. coli</i> &amp; friends",
            "<Year>2022</Year>",
            &author("A", "B", "Amgen Inc"),
        );
        assert_eq!(extract_paper_data(&xml)?[0].title, "Effects of E. coli & friends");
        Ok(())
    }

    #[test]
    fn test_multiple_articles_keep_document_order() -> Result<()> {
        let xml = r#"<PubmedArticleSet>
  <PubmedArticle><MedlineCitation><PMID>10</PMID><Article><ArticleTitle>First</ArticleTitle>
    <AuthorList><Author><LastName>X</LastName><AffiliationInfo><Affiliation>Merck &amp; Co., Inc.</Affiliation></AffiliationInfo></Author></AuthorList>
  </Article></MedlineCitation></PubmedArticle>
  <PubmedArticle><MedlineCitation><PMID>20</PMID><Article><ArticleTitle>Skipped</ArticleTitle>
    <AuthorList><Author><LastName>Y</LastName><AffiliationInfo><Affiliation>MIT Department of Biology</Affiliation></AffiliationInfo></Author></AuthorList>
  </Article></MedlineCitation></PubmedArticle>
  <PubmedArticle><MedlineCitation><PMID>30</PMID><Article><ArticleTitle>Third</ArticleTitle>
    <AuthorList><Author><LastName>Z</LastName><AffiliationInfo><Affiliation>Biogen LLC</Affiliation></AffiliationInfo></Author></AuthorList>
  </Article></MedlineCitation></PubmedArticle>
</PubmedArticleSet>"#;

        let ids: Vec<String> = extract_paper_data(xml)?
            .into_iter()
            .map(|p| p.pubmed_id)
            .collect();
        assert_eq!(ids, vec!["10", "30"]);
        Ok(())
    }

    #[test]
    fn test_affiliation_text_is_kept_raw() -> Result<()> {
        let xml = citation(
            "1",
            "T",
            "<Year>2021</Year>",
            &author("A", "B", "\n  Vertex Pharmaceuticals Inc, Boston  "),
        );
        let paper = &extract_paper_data(&xml)?[0];
        assert_eq!(
            paper.authors[0].affiliation,
            "\n  Vertex Pharmaceuticals Inc, Boston  "
        );
        Ok(())
    }

    #[test]
    fn test_empty_article_set() -> Result<()> {
        assert!(extract_paper_data("<PubmedArticleSet></PubmedArticleSet>")?.is_empty());
        assert!(extract_paper_data("<PubmedArticleSet/>")?.is_empty());
        Ok(())
    }

    #[test]
    fn test_malformed_xml_is_an_error() {
        assert!(extract_paper_data("").is_err());
        assert!(extract_paper_data("<PubmedArticleSet><PubmedArticle>").is_err());
        assert!(extract_paper_data("<PubmedArticleSet></PubmedArticle>").is_err());
    }

    #[test]
    fn test_multiple_roots_are_rejected() {
        assert!(matches!(
            extract_paper_data("<a/><b/>"),
            Err(PubmedError::Parse(_))
        ));
        assert!(extract_paper_data("<PubmedArticleSet></PubmedArticleSet><PubmedArticleSet/>").is_err());
    }
}
