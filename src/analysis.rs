//! Deterministic statistics over a paper batch. No network calls.

use chrono::{Datelike, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};

use crate::paper::{Insights, Paper};

static WORD_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b[a-z]{3,}\b").expect("Invalid word regex pattern"));

static STOP_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "the", "a", "an", "in", "on", "at", "for", "to", "of", "and", "or", "is", "are", "was", "were", "be", "been",
        "being", "have", "has", "had", "do", "does", "did", "will", "would", "could", "should", "this", "that",
        "these", "those", "we", "our", "they", "their", "with", "from", "by", "as", "which", "can", "using", "used",
    ]
    .into_iter()
    .collect()
});

/// Methodology categories and the substrings that signal them
pub const METHOD_KEYWORDS: [(&str, &[&str]); 7] = [
    ("deep_learning", &["neural", "deep learning", "cnn", "rnn", "lstm", "transformer"]),
    ("machine_learning", &["classification", "regression", "clustering", "supervised", "unsupervised"]),
    ("reinforcement_learning", &["reinforcement", "policy", "reward", "agent", "q-learning"]),
    ("optimization", &["optimization", "gradient", "optimizer", "sgd", "adam"]),
    ("probabilistic", &["bayesian", "probabilistic", "stochastic", "distribution"]),
    ("generative", &["generative", "gan", "vae", "diffusion", "autoencoder"]),
    ("attention", &["attention", "self-attention", "cross-attention", "multi-head"]),
];

pub const DATASET_PATTERNS: [&str; 17] = [
    "imagenet",
    "coco",
    "mnist",
    "cifar",
    "glue",
    "squad",
    "wikitext",
    "openwebtext",
    "common crawl",
    "bookcorpus",
    "librispeech",
    "voxceleb",
    "kinetics",
    "youtube",
    "ms marco",
    "natural questions",
    "hotpotqa",
];

pub const DEFAULT_TOP_TERMS: usize = 20;

/// Counter that remembers first-seen order, so ties rank in insertion order
#[derive(Debug, Default)]
struct Tally {
    order: Vec<String>,
    counts: HashMap<String, usize>,
}

impl Tally {
    fn add(&mut self, key: &str) {
        match self.counts.get_mut(key) {
            Some(count) => *count += 1,
            None => {
                self.order.push(key.to_string());
                self.counts.insert(key.to_string(), 1);
            }
        }
    }

    fn len(&self) -> usize {
        self.order.len()
    }

    /// Descending by count; `sort_by` is stable so ties keep insertion order
    fn most_common(&self, limit: Option<usize>) -> Vec<(String, usize)> {
        let mut ranked: Vec<(String, usize)> = self
            .order
            .iter()
            .map(|key| (key.clone(), self.counts[key]))
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1));
        if let Some(limit) = limit {
            ranked.truncate(limit);
        }
        ranked
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TemporalTrends {
    pub by_year: BTreeMap<i32, usize>,
    /// Keyed `YYYY-MM`
    pub by_month: BTreeMap<String, usize>,
    pub total_papers: usize,
    /// `None` for an empty batch
    pub date_range: Option<DateRange>,
}

pub fn analyze_temporal_trends(papers: &[Paper]) -> TemporalTrends {
    let mut by_year = BTreeMap::new();
    let mut by_month = BTreeMap::new();
    for paper in papers {
        *by_year.entry(paper.year()).or_insert(0) += 1;
        *by_month.entry(paper.published.format("%Y-%m").to_string()).or_insert(0) += 1;
    }

    let start = papers.iter().map(|p| p.published).min();
    let end = papers.iter().map(|p| p.published).max();
    let date_range = start.zip(end).map(|(start, end)| DateRange {
        start: start.date_naive(),
        end: end.date_naive(),
    });

    TemporalTrends {
        by_year,
        by_month,
        total_papers: papers.len(),
        date_range,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryDistribution {
    /// Every primary category, most frequent first
    pub primary_categories: Vec<(String, usize)>,
    /// Top 10 over all category tags
    pub all_categories: Vec<(String, usize)>,
    pub category_diversity: usize,
}

pub fn analyze_categories(papers: &[Paper]) -> CategoryDistribution {
    let mut primary = Tally::default();
    let mut all = Tally::default();
    for paper in papers {
        primary.add(&paper.primary_category);
        for category in &paper.categories {
            all.add(category);
        }
    }

    CategoryDistribution {
        primary_categories: primary.most_common(None),
        all_categories: all.most_common(Some(10)),
        category_diversity: all.len(),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuthorPatterns {
    pub top_authors: Vec<(String, usize)>,
    pub total_unique_authors: usize,
    pub avg_collaboration_size: f64,
    pub max_collaboration_size: usize,
    pub min_collaboration_size: usize,
}

/// Author counts and co-author list sizes; all sizes are zero for an empty batch
pub fn analyze_authors(papers: &[Paper]) -> AuthorPatterns {
    let mut authors = Tally::default();
    for author in papers.iter().flat_map(|p| p.authors.iter()) {
        authors.add(author);
    }
    let sizes: Vec<usize> = papers.iter().map(|p| p.authors.len()).collect();
    let avg = if sizes.is_empty() {
        0.0
    } else {
        sizes.iter().sum::<usize>() as f64 / sizes.len() as f64
    };

    AuthorPatterns {
        top_authors: authors.most_common(Some(10)),
        total_unique_authors: authors.len(),
        avg_collaboration_size: avg,
        max_collaboration_size: sizes.iter().copied().max().unwrap_or(0),
        min_collaboration_size: sizes.iter().copied().min().unwrap_or(0),
    }
}

/// Most frequent words of three or more letters across titles and abstracts
pub fn extract_common_terms(papers: &[Paper], top_n: usize) -> Vec<(String, usize)> {
    let text = papers
        .iter()
        .map(Paper::searchable_text)
        .collect::<Vec<_>>()
        .join(" ");

    let mut terms = Tally::default();
    for word in WORD_REGEX.find_iter(&text).map(|m| m.as_str()) {
        if !STOP_WORDS.contains(word) {
            terms.add(word);
        }
    }
    terms.most_common(Some(top_n))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MethodologyPatterns {
    /// All seven categories in their fixed order
    pub method_distribution: Vec<(String, usize)>,
    /// First category with the highest count, `None` when nothing matched
    pub most_common: Option<String>,
    pub diversity_score: usize,
}

impl MethodologyPatterns {
    pub fn count(&self, method: &str) -> usize {
        self.method_distribution
            .iter()
            .find(|(name, _)| name == method)
            .map(|(_, count)| *count)
            .unwrap_or(0)
    }
}

pub fn detect_methodology_patterns(papers: &[Paper]) -> MethodologyPatterns {
    let texts: Vec<String> = papers.iter().map(Paper::searchable_text).collect();
    let method_distribution: Vec<(String, usize)> = METHOD_KEYWORDS
        .iter()
        .map(|(method, keywords)| {
            let count = texts
                .iter()
                .filter(|text| keywords.iter().any(|kw| text.contains(kw)))
                .count();
            (method.to_string(), count)
        })
        .collect();

    let mut most_common: Option<(&str, usize)> = None;
    for (method, count) in &method_distribution {
        if *count > 0 && most_common.map_or(true, |(_, best)| *count > best) {
            most_common = Some((method.as_str(), *count));
        }
    }

    MethodologyPatterns {
        most_common: most_common.map(|(method, _)| method.to_string()),
        diversity_score: method_distribution.iter().filter(|(_, c)| *c > 0).count(),
        method_distribution,
    }
}

/// Known dataset names mentioned in titles or abstracts, top 10
pub fn identify_dataset_mentions(papers: &[Paper]) -> Vec<(String, usize)> {
    let mut datasets = Tally::default();
    for text in papers.iter().map(Paper::searchable_text) {
        for dataset in DATASET_PATTERNS {
            if text.contains(dataset) {
                datasets.add(dataset);
            }
        }
    }
    datasets.most_common(Some(10))
}

/// The 15 most frequent deep-analysis limitations, exact-string matches only
pub fn identify_limitations(papers: &[Paper]) -> Vec<String> {
    let mut limitations = Tally::default();
    for limitation in papers
        .iter()
        .filter_map(|p| p.deep_analysis.as_ref())
        .flat_map(|analysis| analysis.limitations.iter())
    {
        limitations.add(limitation);
    }
    limitations
        .most_common(Some(15))
        .into_iter()
        .map(|(limitation, _)| limitation)
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GapKind {
    Methodological,
    Temporal,
    Application,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResearchGap {
    #[serde(rename = "type")]
    pub kind: GapKind,
    pub description: String,
    pub details: String,
}

/// Heuristic gap list from the batch and its insights
pub fn identify_research_gaps(papers: &[Paper], insights: &Insights) -> Vec<ResearchGap> {
    let mut gaps = Vec::new();

    if insights.common_methods.len() > 1 && insights.datasets_used.len() > 1 {
        gaps.push(ResearchGap {
            kind: GapKind::Methodological,
            description: "Potential for combining different methodological approaches".to_string(),
            details: format!(
                "Methods like {} could be tested with alternative datasets",
                insights.common_methods[0].item()
            ),
        });
    }

    let temporal = analyze_temporal_trends(papers);
    if let Some((year, count)) = temporal.by_year.iter().next_back() {
        if *count < 3 {
            gaps.push(ResearchGap {
                kind: GapKind::Temporal,
                description: "Limited recent work in this area".to_string(),
                details: format!("Only {} papers in {}", count, year),
            });
        }
    }

    for gap in insights.research_gaps.iter().take(3) {
        gaps.push(ResearchGap {
            kind: GapKind::Application,
            description: gap.item().to_string(),
            details: gap.details().unwrap_or_default().to_string(),
        });
    }

    gaps
}

#[derive(Debug, Clone, PartialEq)]
pub struct CitationScore<'a> {
    pub paper: &'a Paper,
    pub citation_score: u32,
    pub factors: Vec<String>,
}

pub fn analyze_citation_potential(papers: &[Paper]) -> Vec<CitationScore<'_>> {
    citation_potential_at(papers, chrono::Utc::now().year())
}

/// Score against an explicit current year, highest first (stable for ties)
pub fn citation_potential_at(papers: &[Paper], current_year: i32) -> Vec<CitationScore<'_>> {
    let mut scored: Vec<CitationScore<'_>> = papers
        .iter()
        .map(|paper| {
            let mut score = 0;
            let mut factors = Vec::new();

            match current_year - paper.year() {
                0 => {
                    score += 5;
                    factors.push(format!("Very recent ({})", paper.year()));
                }
                1 => {
                    score += 3;
                    factors.push(format!("Recent ({})", paper.year()));
                }
                // Includes negative ages: published "after" the current year
                i32::MIN..=2 => score += 1,
                _ => {}
            }
            if paper.journal_ref.is_some() {
                score += 3;
                factors.push("Peer-reviewed".to_string());
            }
            if paper.doi.is_some() {
                score += 2;
                factors.push("Has DOI".to_string());
            }
            if paper.categories.len() > 2 {
                score += 1;
                factors.push("Interdisciplinary".to_string());
            }

            CitationScore {
                paper,
                citation_score: score,
                factors,
            }
        })
        .collect();

    scored.sort_by(|a, b| b.citation_score.cmp(&a.citation_score));
    scored
}

/// Per-topic slice of a comparison
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopicAnalysis {
    pub topic: String,
    pub paper_count: usize,
    pub temporal: TemporalTrends,
    pub methodologies: MethodologyPatterns,
    pub categories: CategoryDistribution,
}

impl TopicAnalysis {
    pub fn of(topic: &str, papers: &[Paper]) -> Self {
        Self {
            topic: topic.to_string(),
            paper_count: papers.len(),
            temporal: analyze_temporal_trends(papers),
            methodologies: detect_methodology_patterns(papers),
            categories: analyze_categories(papers),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopicComparison {
    pub first: TopicAnalysis,
    pub second: TopicAnalysis,
}

pub fn compare_topics(papers1: &[Paper], papers2: &[Paper], topic1: &str, topic2: &str) -> TopicComparison {
    TopicComparison {
        first: TopicAnalysis::of(topic1, papers1),
        second: TopicAnalysis::of(topic2, papers2),
    }
}

/// The statistics the Markdown report renders as trend tables
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisSnapshot {
    pub temporal: TemporalTrends,
    pub categories: CategoryDistribution,
}

impl AnalysisSnapshot {
    pub fn of(papers: &[Paper]) -> Self {
        Self {
            temporal: analyze_temporal_trends(papers),
            categories: analyze_categories(papers),
        }
    }
}
