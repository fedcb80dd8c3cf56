//! Paper retrieval from the arXiv API.

pub mod atom;

use backoff::ExponentialBackoff;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use log::debug;
use reqwest::blocking::Client;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::thread;
use std::time::Duration;

use crate::config::{QueryDefaults, RetrieverConfig};
use crate::error::RetrievalError;
use crate::paper::Paper;
use crate::progress::{noop_observer, Phase, ProgressEvent, SharedObserver};

/// Operators that mark a query as already written in arXiv search syntax
const QUERY_OPERATORS: [&str; 6] = ["au:", "ti:", "abs:", "cat:", "AND", "OR"];

/// Sort criterion understood by the arXiv API. Order is always descending.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortBy {
    #[default]
    SubmittedDate,
    LastUpdatedDate,
    Relevance,
}

impl SortBy {
    pub fn as_api_str(&self) -> &'static str {
        match self {
            SortBy::SubmittedDate => "submittedDate",
            SortBy::LastUpdatedDate => "lastUpdatedDate",
            SortBy::Relevance => "relevance",
        }
    }

    /// Unknown names fall back to submission date
    pub fn from_str_loose(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "lastupdateddate" | "updated" => SortBy::LastUpdatedDate,
            "relevance" => SortBy::Relevance,
            _ => SortBy::SubmittedDate,
        }
    }
}

/// What to fetch.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchParams {
    pub query: String,
    pub max_results: usize,
    pub days_back: i64,
    pub categories: Vec<String>,
    pub sort_by: SortBy,
}

impl SearchParams {
    pub fn new(query: impl Into<String>) -> Self {
        Self::from_defaults(query, &QueryDefaults::default())
    }

    pub fn from_defaults(query: impl Into<String>, defaults: &QueryDefaults) -> Self {
        Self {
            query: query.into(),
            max_results: defaults.max_papers,
            days_back: defaults.days_back,
            categories: defaults.categories.clone(),
            sort_by: defaults.sort_by,
        }
    }

    pub fn max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }

    pub fn days_back(mut self, days_back: i64) -> Self {
        self.days_back = days_back;
        self
    }

    pub fn categories(mut self, categories: Vec<String>) -> Self {
        self.categories = categories;
        self
    }

    pub fn sort_by(mut self, sort_by: SortBy) -> Self {
        self.sort_by = sort_by;
        self
    }

    /// The source query that is actually sent, categories included
    pub fn search_query(&self) -> String {
        construct_query(&self.query, &self.categories)
    }

    /// Single-request URL for the whole candidate window, `None` if `base_url` is not a URL
    pub fn api_url(&self, base_url: &str) -> Option<Url> {
        let query = page_query(&self.search_query(), 0, self.max_results * 2, self.sort_by);
        Url::parse_with_params(base_url, &query).ok()
    }
}

pub struct PaperRetriever {
    config: RetrieverConfig,
    client: Client,
    observer: SharedObserver,
}

impl PaperRetriever {
    pub fn new(config: RetrieverConfig) -> Result<Self, RetrievalError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("surveyor/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            config,
            client,
            observer: noop_observer(),
        })
    }

    pub fn with_observer(mut self, observer: SharedObserver) -> Self {
        self.observer = observer;
        self
    }

    /// Fetch papers, reporting transport failures as an empty result.
    ///
    /// An empty list therefore means either "nothing matched" or "the source was
    /// unreachable"; see [`suggest_query_improvements`] for the former.
    pub fn fetch_papers(&self, params: &SearchParams) -> Vec<Paper> {
        match self.try_fetch_papers(params) {
            Ok(papers) => papers,
            Err(e) => {
                self.observer.on_event(&ProgressEvent::Warning {
                    phase: Phase::Retrieval,
                    message: format!("Error fetching papers: {}", e),
                });
                Vec::new()
            }
        }
    }

    pub fn try_fetch_papers(&self, params: &SearchParams) -> Result<Vec<Paper>, RetrievalError> {
        self.try_fetch_papers_at(params, Utc::now())
    }

    /// Fetch with an explicit "now" for the date filter.
    ///
    /// Requests twice `max_results` candidates, keeps those published at or after
    /// `now - days_back`, and stops as soon as `max_results` are accepted.
    pub fn try_fetch_papers_at(
        &self,
        params: &SearchParams,
        now: DateTime<Utc>,
    ) -> Result<Vec<Paper>, RetrievalError> {
        let search_query = params.search_query();
        self.observer.on_event(&ProgressEvent::PhaseStarted {
            phase: Phase::Retrieval,
            detail: search_query.clone(),
        });

        let candidates = params.max_results * 2;
        // An out-of-range window means "no lower bound"
        let threshold = ChronoDuration::try_days(params.days_back)
            .and_then(|window| now.checked_sub_signed(window))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        let page_size = self.config.page_size.max(1);

        let mut papers = Vec::new();
        let mut start = 0;
        while start < candidates && papers.len() < params.max_results {
            if start > 0 {
                thread::sleep(self.config.page_delay());
            }
            let page_len = page_size.min(candidates - start);
            let page = self.fetch_page(&search_query, start, page_len, params.sort_by)?;
            let received = page.len();

            for paper in page {
                if paper.published >= threshold {
                    papers.push(paper);
                    if papers.len() >= params.max_results {
                        break;
                    }
                }
            }

            // A short page means the source has nothing more to give
            if received < page_len {
                break;
            }
            start += page_len;
        }

        self.observer.on_event(&ProgressEvent::PhaseCompleted {
            phase: Phase::Retrieval,
            count: papers.len(),
        });
        Ok(papers)
    }

    pub fn search_by_author(&self, author_name: &str, max_results: usize) -> Vec<Paper> {
        let params = SearchParams::new(format!("au:{}", author_name)).max_results(max_results);
        self.fetch_papers(&params)
    }

    pub fn search_by_category(&self, category: &str, max_results: usize) -> Vec<Paper> {
        let params = SearchParams::new(format!("cat:{}", category))
            .max_results(max_results)
            .categories(Vec::new());
        self.fetch_papers(&params)
    }

    /// Retrieve one paper by its arXiv id, `None` if missing or on failure
    pub fn get_paper_by_id(&self, arxiv_id: &str) -> Option<Paper> {
        let result = self
            .send_with_retry(&[("id_list", arxiv_id.to_string())])
            .and_then(|body| atom::parse_feed(&body));
        match result {
            Ok(papers) => papers.into_iter().next(),
            Err(e) => {
                self.observer.on_event(&ProgressEvent::Warning {
                    phase: Phase::Retrieval,
                    message: format!("Error retrieving paper {}: {}", arxiv_id, e),
                });
                None
            }
        }
    }

    fn fetch_page(
        &self,
        search_query: &str,
        start: usize,
        max_results: usize,
        sort_by: SortBy,
    ) -> Result<Vec<Paper>, RetrievalError> {
        let query = page_query(search_query, start, max_results, sort_by);
        let body = self.send_with_retry(&query)?;
        atom::parse_feed(&body)
    }

    /// GET the API with exponential backoff, giving up after `num_retries` retries.
    /// Client errors (4xx other than 429) are not retried.
    fn send_with_retry(&self, query: &[(&str, String)]) -> Result<String, RetrievalError> {
        let policy = ExponentialBackoff {
            initial_interval: Duration::from_millis(500),
            max_interval: Duration::from_secs(10),
            max_elapsed_time: None,
            ..Default::default()
        };

        let mut attempts = 0;
        let operation = || {
            attempts += 1;
            debug!("Querying arXiv (attempt {}): {:?}", attempts, query);
            let outcome = self
                .client
                .get(&self.config.base_url)
                .query(query)
                .send()
                .map_err(RetrievalError::from)
                .and_then(|response| {
                    let status = response.status();
                    if status.is_success() {
                        response.text().map_err(RetrievalError::from)
                    } else {
                        Err(RetrievalError::ApiError(status.as_u16()))
                    }
                });

            outcome.map_err(|e| {
                let retryable = match &e {
                    RetrievalError::ApiError(code) => *code == 429 || *code >= 500,
                    RetrievalError::NetworkError(_) => true,
                    _ => false,
                };
                if retryable && attempts <= self.config.num_retries {
                    backoff::Error::transient(e)
                } else {
                    backoff::Error::permanent(e)
                }
            })
        };

        backoff::retry(policy, operation).map_err(|e| match e {
            backoff::Error::Permanent(err) => err,
            backoff::Error::Transient { err, .. } => err,
        })
    }
}

fn page_query(search_query: &str, start: usize, max_results: usize, sort_by: SortBy) -> [(&'static str, String); 5] {
    [
        ("search_query", search_query.to_string()),
        ("start", start.to_string()),
        ("max_results", max_results.to_string()),
        ("sortBy", sort_by.as_api_str().to_string()),
        ("sortOrder", "descending".to_string()),
    ]
}

/// Build the source query.
///
/// Queries that already use field operators or boolean connectives pass through
/// untouched; anything else becomes a title-or-abstract search, AND-ed with an
/// OR-group of the requested categories.
pub fn construct_query(query: &str, categories: &[String]) -> String {
    if QUERY_OPERATORS.iter().any(|op| query.contains(op)) {
        return query.to_string();
    }

    let base_query = format!("(ti:{} OR abs:{})", query, query);
    if categories.is_empty() {
        return base_query;
    }

    let category_query = categories
        .iter()
        .map(|cat| format!("cat:{}", cat))
        .collect::<Vec<_>>()
        .join(" OR ");
    format!("{} AND ({})", base_query, category_query)
}

/// Reject empty queries and queries with unbalanced parentheses
pub fn validate_query(query: &str) -> Result<(), RetrievalError> {
    if query.trim().is_empty() {
        return Err(RetrievalError::InvalidQuery("Query cannot be empty".to_string()));
    }
    if query.matches('(').count() != query.matches(')').count() {
        return Err(RetrievalError::InvalidQuery("Unbalanced parentheses in query".to_string()));
    }
    Ok(())
}

/// Hints for a query that returned nothing or very little
pub fn suggest_query_improvements(query: &str, num_results: usize) -> Vec<String> {
    match num_results {
        0 => vec![
            "Try broader search terms".to_string(),
            "Remove date restrictions".to_string(),
            "Check category codes".to_string(),
            format!("Try: 'ti:{}' or 'abs:{}'", query, query),
        ],
        1..=4 => vec![
            "Consider expanding time range".to_string(),
            "Try related keywords".to_string(),
            "Remove category filters".to_string(),
        ],
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_url_encodes_constructed_query() {
        let params = SearchParams::new("graph nets")
            .max_results(5)
            .categories(vec!["cs.LG".to_string()]);
        let url = params.api_url("https://export.arxiv.org/api/query").unwrap();
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();

        assert_eq!(pairs[0].1, "(ti:graph nets OR abs:graph nets) AND (cat:cs.LG)");
        assert_eq!(pairs[2], ("max_results".to_string(), "10".to_string()));
        assert!(!url.as_str().contains(' '));
        assert!(params.api_url("not a url").is_none());
    }

    #[test]
    fn test_construct_query_plain() {
        assert_eq!(construct_query("diffusion", &[]), "(ti:diffusion OR abs:diffusion)");
    }

    #[test]
    fn test_construct_query_with_categories() {
        let cats = vec!["cs.LG".to_string(), "cs.CV".to_string()];
        assert_eq!(
            construct_query("diffusion", &cats),
            "(ti:diffusion OR abs:diffusion) AND (cat:cs.LG OR cat:cs.CV)"
        );
    }

    #[test]
    fn test_construct_query_passthrough() {
        let cats = vec!["cs.LG".to_string()];
        assert_eq!(construct_query("au:Hinton", &cats), "au:Hinton");
        assert_eq!(construct_query("gan AND vae", &cats), "gan AND vae");
    }

    #[test]
    fn test_validate_query() {
        assert!(validate_query("ti:(graph networks)").is_ok());
        let empty = validate_query("   ").unwrap_err();
        assert_eq!(empty.to_string(), "Invalid query: Query cannot be empty");
        let unbalanced = validate_query("(ti:graph").unwrap_err();
        assert!(unbalanced.to_string().contains("Unbalanced parentheses"));
    }

    #[test]
    fn test_suggestions() {
        assert_eq!(suggest_query_improvements("x", 0).len(), 4);
        assert_eq!(suggest_query_improvements("x", 3).len(), 3);
        assert!(suggest_query_improvements("x", 5).is_empty());
    }

    #[test]
    fn test_sort_by_loose() {
        assert_eq!(SortBy::from_str_loose("relevance"), SortBy::Relevance);
        assert_eq!(SortBy::from_str_loose("lastUpdatedDate"), SortBy::LastUpdatedDate);
        assert_eq!(SortBy::from_str_loose("whatever"), SortBy::SubmittedDate);
    }
}
