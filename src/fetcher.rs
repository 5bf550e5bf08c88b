//! NCBI E-utilities client.
//!
//! Two sequential calls: `esearch` for PubMed IDs, then `efetch` for the
//! article XML of those IDs. No retries; any failure is returned to the caller.

use crate::error::{OptionExt, PubmedError, Result};
use serde::Deserialize;
use tracing::{debug, info, warn};
use url::Url;

/// E-utilities base URL
pub const DEFAULT_BASE_URL: &str = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils/";

/// Default number of IDs requested from `esearch`
pub const DEFAULT_MAX_RESULTS: usize = 20;

const USER_AGENT: &str = concat!("pubmed-industry/", env!("CARGO_PKG_VERSION"));

/// PubMed E-utilities client
pub struct PubMedClient {
    client: reqwest::Client,
    base_url: Url,
    api_key: Option<String>,
}

impl PubMedClient {
    /// Create a client against the public NCBI endpoint
    pub fn new() -> Result<Self> {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    /// Create a client against a custom base URL (mirrors, mock servers)
    pub fn with_base_url(base_url: &str) -> Result<Self> {
        // Url::join drops the last segment unless the base ends with '/'
        let normalized = format!("{}/", base_url.trim_end_matches('/'));
        let base_url = Url::parse(&normalized)
            .map_err(|e| PubmedError::Config(format!("Invalid base URL '{}': {}", base_url, e)))?;

        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| PubmedError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url,
            api_key: None,
        })
    }

    /// Attach an NCBI API key to every request
    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key.filter(|k| !k.trim().is_empty());
        self
    }

    /// Search PubMed and return matching IDs in relevance order.
    pub async fn search(&self, query: &str, max_results: usize) -> Result<Vec<String>> {
        let url = self.build_url(
            "esearch.fcgi",
            &[
                ("db", "pubmed"),
                ("term", query),
                ("retmode", "json"),
                ("retmax", &max_results.to_string()),
            ],
        )?;

        info!(query = query, max_results = max_results, "Searching PubMed");
        let body = self.get_text(&url).await?;

        let response: ESearchResponse = serde_json::from_str(&body)?;
        let ids = response
            .esearchresult
            .ok_or_parse("Missing 'esearchresult' in esearch response")?
            .idlist;

        info!(count = ids.len(), "PubMed search complete");
        Ok(ids)
    }

    /// Fetch the efetch XML document for the given IDs.
    pub async fn fetch_details(&self, ids: &[String]) -> Result<String> {
        if ids.is_empty() {
            return Err(PubmedError::Validation(
                "No PubMed IDs to fetch".to_string(),
            ));
        }

        let joined = ids.join(",");
        let url = self.build_url(
            "efetch.fcgi",
            &[("db", "pubmed"), ("id", &joined), ("retmode", "xml")],
        )?;

        info!(count = ids.len(), "Fetching PubMed article details");
        let xml = self.get_text(&url).await?;
        debug!(bytes = xml.len(), "Received efetch document");
        Ok(xml)
    }

    /// Build an endpoint URL with query parameters
    fn build_url(&self, endpoint: &str, params: &[(&str, &str)]) -> Result<Url> {
        let mut url = self
            .base_url
            .join(endpoint)
            .map_err(|e| PubmedError::Config(format!("Invalid endpoint '{}': {}", endpoint, e)))?;

        {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in params {
                pairs.append_pair(key, value);
            }
            if let Some(key) = &self.api_key {
                pairs.append_pair("api_key", key);
            }
        }

        Ok(url)
    }

    async fn get_text(&self, url: &Url) -> Result<String> {
        debug!(url = %redact(url), "GET");
        let response = self.client.get(url.as_str()).send().await?;
        let status = response.status();

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), error = %error_text, "E-utilities error");
            return Err(PubmedError::Api {
                code: status.as_u16(),
                message: format!("E-utilities error: {}", status),
            });
        }

        Ok(response.text().await?)
    }
}

/// URL with the API key masked, for logging
fn redact(url: &Url) -> String {
    let mut redacted = url.clone();
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| {
            let v = if k == "api_key" { "***".into() } else { v.into_owned() };
            (k.into_owned(), v)
        })
        .collect();
    redacted.query_pairs_mut().clear().extend_pairs(pairs);
    redacted.to_string()
}

// === E-utilities Response Types ===

#[derive(Debug, Deserialize)]
struct ESearchResponse {
    esearchresult: Option<ESearchResult>,
}

#[derive(Debug, Deserialize)]
struct ESearchResult {
    #[serde(default)]
    idlist: Vec<String>,
}
