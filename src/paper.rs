//! Records passed between the pipeline stages.
//!
//! A [`Paper`] is created by the retriever, enriched in place by the summarizer
//! (`fast_summary`, `deep_analysis`) and read-only afterwards. [`Insights`] and
//! [`ResearchDirection`] are derived once per batch.

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};

/// One retrieved academic work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paper {
    /// Short source id without version suffix, e.g. `2401.01234`
    pub id: String,
    pub title: String,
    pub authors: Vec<String>,
    pub published: DateTime<Utc>,
    pub updated: DateTime<Utc>,
    /// Plain-text abstract
    #[serde(rename = "summary")]
    pub abstract_text: String,
    pub categories: Vec<String>,
    pub primary_category: String,
    pub entry_url: String,
    pub pdf_url: Option<String>,
    pub comment: Option<String>,
    pub journal_ref: Option<String>,
    pub doi: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fast_summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deep_analysis: Option<DeepAnalysis>,
}

impl Paper {
    pub fn builder(id: impl Into<String>, title: impl Into<String>) -> PaperBuilder {
        PaperBuilder::new(id, title)
    }

    pub fn year(&self) -> i32 {
        self.published.year()
    }

    /// Lower-cased `title + " " + abstract`, the text all keyword matching runs against
    pub fn searchable_text(&self) -> String {
        format!("{} {}", self.title, self.abstract_text).to_lowercase()
    }
}

/// Builder for Paper to allow for cleaner creation
pub struct PaperBuilder {
    paper: Paper,
}

impl PaperBuilder {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        let id = id.into();
        let epoch = DateTime::<Utc>::default();
        Self {
            paper: Paper {
                entry_url: format!("http://arxiv.org/abs/{}", id),
                id,
                title: title.into(),
                authors: Vec::new(),
                published: epoch,
                updated: epoch,
                abstract_text: String::new(),
                categories: Vec::new(),
                primary_category: String::new(),
                pdf_url: None,
                comment: None,
                journal_ref: None,
                doi: None,
                fast_summary: None,
                deep_analysis: None,
            },
        }
    }

    pub fn authors<I, S>(mut self, authors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.paper.authors = authors.into_iter().map(Into::into).collect();
        self
    }

    /// Sets both `published` and, until overridden, `updated`
    pub fn published(mut self, published: DateTime<Utc>) -> Self {
        self.paper.published = published;
        self.paper.updated = published;
        self
    }

    pub fn updated(mut self, updated: DateTime<Utc>) -> Self {
        self.paper.updated = updated;
        self
    }

    pub fn abstract_text(mut self, text: impl Into<String>) -> Self {
        self.paper.abstract_text = text.into();
        self
    }

    /// Sets the category tags; the first one becomes primary unless one was set already
    pub fn categories<I, S>(mut self, categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.paper.categories = categories.into_iter().map(Into::into).collect();
        if self.paper.primary_category.is_empty() {
            self.paper.primary_category = self.paper.categories.first().cloned().unwrap_or_default();
        }
        self
    }

    pub fn primary_category(mut self, category: impl Into<String>) -> Self {
        self.paper.primary_category = category.into();
        self
    }

    pub fn entry_url(mut self, url: impl Into<String>) -> Self {
        self.paper.entry_url = url.into();
        self
    }

    pub fn pdf_url(mut self, url: Option<String>) -> Self {
        self.paper.pdf_url = url;
        self
    }

    pub fn comment(mut self, comment: Option<String>) -> Self {
        self.paper.comment = comment;
        self
    }

    pub fn journal_ref(mut self, journal_ref: Option<String>) -> Self {
        self.paper.journal_ref = journal_ref;
        self
    }

    pub fn doi(mut self, doi: Option<String>) -> Self {
        self.paper.doi = doi;
        self
    }

    pub fn build(self) -> Paper {
        self.paper
    }
}

/// Structured per-paper critique produced by the deep analysis pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeepAnalysis {
    #[serde(default)]
    pub contributions: Vec<String>,
    #[serde(default)]
    pub methods: Vec<String>,
    #[serde(default)]
    pub results: Vec<String>,
    #[serde(default)]
    pub limitations: Vec<String>,
    #[serde(default)]
    pub relations: Vec<String>,
    #[serde(default)]
    pub applications: Vec<String>,
}

impl DeepAnalysis {
    /// Record used when the model answered with text that is not a JSON object
    pub fn from_raw_text(raw: impl Into<String>) -> Self {
        Self {
            contributions: vec![raw.into()],
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.contributions.is_empty()
            && self.methods.is_empty()
            && self.results.is_empty()
            && self.limitations.is_empty()
            && self.relations.is_empty()
            && self.applications.is_empty()
    }
}

/// An insight list entry: either a bare string or an `{item, details}` pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum InsightEntry {
    Detailed {
        item: String,
        #[serde(default)]
        details: String,
    },
    Text(String),
}

impl InsightEntry {
    pub fn item(&self) -> &str {
        match self {
            InsightEntry::Detailed { item, .. } => item,
            InsightEntry::Text(text) => text,
        }
    }

    pub fn details(&self) -> Option<&str> {
        match self {
            InsightEntry::Detailed { details, .. } => Some(details),
            InsightEntry::Text(_) => None,
        }
    }

    /// `- item: details` / `- item`, the shape used in prompts and index chunks
    pub fn as_bullet(&self) -> String {
        match self {
            InsightEntry::Detailed { item, details } => format!("- {}: {}", item, details),
            InsightEntry::Text(text) => format!("- {}", text),
        }
    }
}

impl From<&str> for InsightEntry {
    fn from(text: &str) -> Self {
        InsightEntry::Text(text.to_string())
    }
}

/// Cross-paper findings. All six lists are always present, possibly empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Insights {
    #[serde(default)]
    pub common_methods: Vec<InsightEntry>,
    #[serde(default)]
    pub datasets_used: Vec<InsightEntry>,
    #[serde(default)]
    pub metrics: Vec<InsightEntry>,
    #[serde(default)]
    pub limitations: Vec<InsightEntry>,
    #[serde(default)]
    pub research_gaps: Vec<InsightEntry>,
    #[serde(default)]
    pub emerging_themes: Vec<InsightEntry>,
}

impl Insights {
    /// JSON keys in their canonical order
    pub const KEYS: [&'static str; 6] = [
        "common_methods",
        "datasets_used",
        "metrics",
        "limitations",
        "research_gaps",
        "emerging_themes",
    ];

    pub fn is_empty(&self) -> bool {
        self.sections().iter().all(|(_, entries)| entries.is_empty())
    }

    /// `(key, entries)` pairs in canonical order
    pub fn sections(&self) -> [(&'static str, &[InsightEntry]); 6] {
        [
            ("common_methods", self.common_methods.as_slice()),
            ("datasets_used", self.datasets_used.as_slice()),
            ("metrics", self.metrics.as_slice()),
            ("limitations", self.limitations.as_slice()),
            ("research_gaps", self.research_gaps.as_slice()),
            ("emerging_themes", self.emerging_themes.as_slice()),
        ]
    }

    pub fn section_mut(&mut self, key: &str) -> Option<&mut Vec<InsightEntry>> {
        match key {
            "common_methods" => Some(&mut self.common_methods),
            "datasets_used" => Some(&mut self.datasets_used),
            "metrics" => Some(&mut self.metrics),
            "limitations" => Some(&mut self.limitations),
            "research_gaps" => Some(&mut self.research_gaps),
            "emerging_themes" => Some(&mut self.emerging_themes),
            _ => None,
        }
    }
}

/// A proposed follow-on project.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResearchDirection {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub motivation: String,
    #[serde(default)]
    pub approach: String,
    #[serde(default)]
    pub expected_contribution: String,
    #[serde(default)]
    pub required_resources: String,
    #[serde(default)]
    pub timeline: String,
    /// Free text, no canonical ordering
    #[serde(default)]
    pub difficulty: String,
}
