//! Affiliation classifier.
//!
//! Decides from free-text affiliation whether an author works in industry.
//! Matching is a case-insensitive substring test with no word boundaries, so
//! `"inc"` also fires inside `"Incorporated"` or `"Lincoln"`. Any academic
//! keyword vetoes the non-academic signal.

/// Substrings that suggest a company affiliation.
pub const NON_ACADEMIC_KEYWORDS: &[&str] = &[
    "pharma",
    "biotech",
    "inc",
    "ltd",
    "llc",
    "corporation",
    "corp",
    "gmbh",
    "company",
    "therapeutics",
    "laboratories",
    "labs",
];

/// Substrings that mark an academic or clinical affiliation.
pub const ACADEMIC_KEYWORDS: &[&str] = &[
    "university",
    "college",
    "school",
    "institute",
    "hospital",
    "faculty",
    "department",
    "centre",
    "center",
];

/// Returns `true` if the affiliation looks non-academic.
///
/// True iff at least one [`NON_ACADEMIC_KEYWORDS`] entry occurs and no
/// [`ACADEMIC_KEYWORDS`] entry does.
pub fn is_non_academic(affiliation: &str) -> bool {
    let lower = affiliation.to_lowercase();
    let industry = NON_ACADEMIC_KEYWORDS.iter().any(|k| lower.contains(k));
    industry && !ACADEMIC_KEYWORDS.iter().any(|k| lower.contains(k))
}
