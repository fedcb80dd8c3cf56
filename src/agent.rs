//! Workflows that sequence retrieval, summarization, analysis, reporting and
//! session storage.
//!
//! Phases run strictly one after another. An empty retrieval stops the query
//! workflow early with suggestions instead of an error.

use anyhow::Context;
use std::path::PathBuf;

use crate::analysis::{compare_topics, AnalysisSnapshot, TopicComparison};
use crate::config::{AppConfig, QueryDefaults};
use crate::error::SurveyError;
use crate::paper::{Insights, Paper, ResearchDirection};
use crate::progress::{noop_observer, Phase, ProgressEvent, SharedObserver};
use crate::report::{ReportFormat, ReportGenerator};
use crate::retrieval::{suggest_query_improvements, validate_query, PaperRetriever, SearchParams};
use crate::session::{SearchHit, Session, SessionMetadata, SessionStore};
use crate::summarize::PaperSummarizer;
use crate::util::file_timestamp;

/// Papers per topic when comparing and no limit is given
pub const DEFAULT_COMPARE_PAPERS: usize = 10;

/// Per-call overrides of the configured query defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryOptions {
    pub max_papers: Option<usize>,
    pub days_back: Option<i64>,
    pub deep_analysis: bool,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            max_papers: None,
            days_back: None,
            deep_analysis: true,
        }
    }
}

/// Everything a completed research query produced.
#[derive(Debug, Clone)]
pub struct ResearchResults {
    pub query: String,
    pub papers: Vec<Paper>,
    pub insights: Insights,
    pub research_directions: Vec<ResearchDirection>,
    pub analysis: AnalysisSnapshot,
    pub report: String,
    pub report_path: PathBuf,
}

#[derive(Debug, Clone)]
pub enum ResearchOutcome {
    Completed(Box<ResearchResults>),
    /// Nothing retrieved; hints for a better query
    NoPapers { suggestions: Vec<String> },
}

#[derive(Debug, Clone)]
pub struct ComparisonResults {
    pub comparison: TopicComparison,
    pub report: String,
    pub report_path: PathBuf,
}

pub struct ResearchAgent {
    retriever: PaperRetriever,
    summarizer: PaperSummarizer,
    reports: ReportGenerator,
    sessions: SessionStore,
    defaults: QueryDefaults,
    observer: SharedObserver,
}

impl ResearchAgent {
    pub fn new(
        retriever: PaperRetriever,
        summarizer: PaperSummarizer,
        reports: ReportGenerator,
        sessions: SessionStore,
        defaults: QueryDefaults,
    ) -> Self {
        Self {
            retriever,
            summarizer,
            reports,
            sessions,
            defaults,
            observer: noop_observer(),
        }
    }

    /// Build every component from configuration, sharing one observer
    pub fn from_config(config: &AppConfig, observer: SharedObserver) -> anyhow::Result<Self> {
        let retriever = PaperRetriever::new(config.retriever.clone())
            .context("Failed to create arXiv client")?
            .with_observer(observer.clone());
        let summarizer = PaperSummarizer::from_config(&config.providers, config.summarizer.clone())
            .context("Failed to configure the language model provider")?
            .with_observer(observer.clone());
        let reports = ReportGenerator::new(config.report.clone());
        let sessions = SessionStore::from_config(&config.session).with_observer(observer.clone());

        Ok(Self::new(retriever, summarizer, reports, sessions, config.defaults.clone()).with_observer(observer))
    }

    pub fn with_observer(mut self, observer: SharedObserver) -> Self {
        self.observer = observer;
        self
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Retrieve, summarize, analyze and render one query, saving the Markdown report.
    pub fn run_research_query(&self, query: &str, options: &QueryOptions) -> Result<ResearchOutcome, SurveyError> {
        validate_query(query)?;

        let mut params = SearchParams::from_defaults(query, &self.defaults);
        if let Some(max_papers) = options.max_papers {
            params = params.max_results(max_papers);
        }
        if let Some(days_back) = options.days_back {
            params = params.days_back(days_back);
        }

        let mut papers = self.retriever.fetch_papers(&params);
        if papers.is_empty() {
            return Ok(ResearchOutcome::NoPapers {
                suggestions: suggest_query_improvements(query, 0),
            });
        }

        self.summarizer.summarize_papers_fast(&mut papers);
        if options.deep_analysis {
            self.summarizer.analyze_papers_deep(&mut papers, None);
        }
        let insights = self.summarizer.extract_key_insights(&papers);
        let research_directions = self.summarizer.generate_research_directions(&papers, &insights);

        self.observer.on_event(&ProgressEvent::PhaseStarted {
            phase: Phase::TrendAnalysis,
            detail: String::new(),
        });
        let analysis = AnalysisSnapshot::of(&papers);
        self.observer.on_event(&ProgressEvent::PhaseCompleted {
            phase: Phase::TrendAnalysis,
            count: papers.len(),
        });

        self.observer.on_event(&ProgressEvent::PhaseStarted {
            phase: Phase::Report,
            detail: String::new(),
        });
        let report =
            self.reports
                .generate_markdown_report(&params, &papers, &insights, &research_directions, Some(&analysis));
        let report_path = self.reports.save_report(
            &report,
            &format!("research_report_{}", file_timestamp()),
            ReportFormat::Markdown,
        )?;
        self.observer.on_event(&ProgressEvent::PhaseCompleted {
            phase: Phase::Report,
            count: 1,
        });

        Ok(ResearchOutcome::Completed(Box::new(ResearchResults {
            query: query.to_string(),
            papers,
            insights,
            research_directions,
            analysis,
            report,
            report_path,
        })))
    }

    /// Fetch both topics and save a side-by-side comparison report
    pub fn compare_topics(&self, topic1: &str, topic2: &str, max_papers: Option<usize>) -> Result<ComparisonResults, SurveyError> {
        validate_query(topic1)?;
        validate_query(topic2)?;
        let max_papers = max_papers.unwrap_or(DEFAULT_COMPARE_PAPERS);

        let papers1 = self
            .retriever
            .fetch_papers(&SearchParams::from_defaults(topic1, &self.defaults).max_results(max_papers));
        let papers2 = self
            .retriever
            .fetch_papers(&SearchParams::from_defaults(topic2, &self.defaults).max_results(max_papers));

        let comparison = compare_topics(&papers1, &papers2, topic1, topic2);
        let report = self.reports.generate_comparison_report(&comparison);
        let report_path =
            self.reports
                .save_report(&report, &format!("comparison_{}", file_timestamp()), ReportFormat::Markdown)?;

        Ok(ComparisonResults {
            comparison,
            report,
            report_path,
        })
    }

    pub fn store_session(&self, name: &str, results: &ResearchResults) -> Result<SessionMetadata, SurveyError> {
        Ok(self.sessions.store(
            name,
            &results.query,
            &results.papers,
            &results.insights,
            &results.research_directions,
        )?)
    }

    pub fn load_session(&self, name: &str) -> Result<Session, SurveyError> {
        Ok(self.sessions.load(name)?)
    }

    pub fn query_session(&self, name: &str, query: &str, k: usize) -> Result<Vec<SearchHit>, SurveyError> {
        Ok(self.sessions.query(name, query, k)?)
    }

    /// Returns the number of papers added
    pub fn update_session(&self, name: &str, papers: &[Paper]) -> Result<usize, SurveyError> {
        Ok(self.sessions.update(name, papers)?)
    }

    pub fn list_sessions(&self) -> Result<Vec<String>, SurveyError> {
        Ok(self.sessions.list()?)
    }

    pub fn delete_session(&self, name: &str) -> Result<(), SurveyError> {
        Ok(self.sessions.delete(name)?)
    }

    pub fn export_session_summary(&self, name: &str) -> Result<String, SurveyError> {
        Ok(self.sessions.export_session_summary(name)?)
    }

    /// Render the results in `format` and save them next to the Markdown report
    pub fn export(&self, results: &ResearchResults, format: ReportFormat) -> Result<PathBuf, SurveyError> {
        let (content, stem) = match format {
            ReportFormat::Markdown => (results.report.clone(), "research_report"),
            ReportFormat::Bibtex => (self.reports.generate_bibtex(&results.papers), "references"),
            ReportFormat::Json => (
                self.reports
                    .generate_json(&results.papers, &results.insights, &results.research_directions)?,
                "research_data",
            ),
        };
        Ok(self
            .reports
            .save_report(&content, &format!("{}_{}", stem, file_timestamp()), format)?)
    }
}
