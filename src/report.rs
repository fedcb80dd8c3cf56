//! Report rendering: Markdown, BibTeX, JSON and topic comparisons.

pub mod bibtex;

use serde_json::json;
use std::fmt;
use std::fs;
use std::io;
use std::path::PathBuf;
use std::str::FromStr;

use crate::analysis::{AnalysisSnapshot, TopicComparison};
use crate::config::ReportConfig;
use crate::paper::{InsightEntry, Insights, Paper, ResearchDirection};
use crate::retrieval::SearchParams;
use crate::util::{format_authors, report_timestamp, sanitize_filename};

pub use bibtex::{citation_key, generate_bibtex, BibEntry};

/// Entries shown per insight section
const SECTION_LIMIT: usize = 5;
const ARXIV_QUERY_URL: &str = "https://export.arxiv.org/api/query";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Markdown,
    Bibtex,
    Json,
}

impl ReportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ReportFormat::Markdown => ".md",
            ReportFormat::Bibtex => ".bib",
            ReportFormat::Json => ".json",
        }
    }
}

impl FromStr for ReportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "md" | "markdown" => Ok(ReportFormat::Markdown),
            "bib" | "bibtex" => Ok(ReportFormat::Bibtex),
            "json" => Ok(ReportFormat::Json),
            other => Err(format!("unknown report format '{}' (expected md, bib or json)", other)),
        }
    }
}

impl fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ReportFormat::Markdown => "markdown",
            ReportFormat::Bibtex => "bibtex",
            ReportFormat::Json => "json",
        };
        f.write_str(name)
    }
}

pub struct ReportGenerator {
    config: ReportConfig,
}

impl ReportGenerator {
    pub fn new(config: ReportConfig) -> Self {
        Self { config }
    }

    pub fn generate_markdown_report(
        &self,
        search: &SearchParams,
        papers: &[Paper],
        insights: &Insights,
        research_directions: &[ResearchDirection],
        analysis: Option<&AnalysisSnapshot>,
    ) -> String {
        let mut lines: Vec<String> = Vec::new();
        let date_range = date_range(papers);
        let query = &search.query;

        lines.push(format!("# 📘 Research Report: {}", query));
        lines.push(String::new());
        lines.push(format!("**Generated:** {}", report_timestamp()));
        lines.push(format!("**Papers Analyzed:** {}", papers.len()));
        if let Some((start, end)) = &date_range {
            lines.push(format!("**Date Range:** {} to {}", start, end));
        }
        push_rule(&mut lines);

        lines.push("## 🔍 Summary of Recent Works".to_string());
        lines.push(String::new());
        for (i, paper) in papers.iter().enumerate() {
            lines.extend(paper_section(paper, i + 1));
        }

        lines.push("## 🧠 Cross-Paper Analysis".to_string());
        lines.push(String::new());
        numbered_section(&mut lines, "Dominant Approaches", &insights.common_methods, "No details available");
        bullet_section(&mut lines, "Common Datasets & Benchmarks", &insights.datasets_used);
        bullet_section(&mut lines, "Evaluation Metrics", &insights.metrics);
        push_rule(&mut lines);

        lines.push("## 🚨 Identified Limitations & Gaps".to_string());
        lines.push(String::new());
        numbered_section(&mut lines, "Limitations Across Papers", &insights.limitations, "");
        numbered_section(&mut lines, "Research Gaps Discovered", &insights.research_gaps, "No details available");
        push_rule(&mut lines);

        if !research_directions.is_empty() {
            lines.push("## 🚀 Suggested Research Directions".to_string());
            lines.push(String::new());
            lines.push("### High-Priority Projects".to_string());
            lines.push(String::new());
            for (i, project) in research_directions.iter().enumerate() {
                lines.push(format!("{}. **{}**", i + 1, or_placeholder(&project.title, "Untitled Project")));
                lines.push(format!("   - **Motivation:** {}", or_placeholder(&project.motivation, "N/A")));
                lines.push(format!("   - **Approach:** {}", or_placeholder(&project.approach, "N/A")));
                lines.push(format!(
                    "   - **Expected Contribution:** {}",
                    or_placeholder(&project.expected_contribution, "N/A")
                ));
                lines.push(format!(
                    "   - **Required Resources:** {}",
                    or_placeholder(&project.required_resources, "N/A")
                ));
                lines.push(format!("   - **Timeline:** {}", or_placeholder(&project.timeline, "N/A")));
                lines.push(format!("   - **Difficulty:** {}", or_placeholder(&project.difficulty, "N/A")));
                lines.push(String::new());
            }
        }

        bullet_section(&mut lines, "Emerging Themes", &insights.emerging_themes);
        push_rule(&mut lines);

        if let Some(snapshot) = analysis {
            lines.push("## 📊 Trend Analysis".to_string());
            lines.push(String::new());
            lines.push("### Publication Timeline".to_string());
            lines.push(String::new());
            for (year, count) in &snapshot.temporal.by_year {
                lines.push(format!("- **{}**: {} papers", year, count));
            }
            lines.push(String::new());
            lines.push("### Category Distribution".to_string());
            lines.push(String::new());
            for (category, count) in snapshot.categories.primary_categories.iter().take(SECTION_LIMIT) {
                lines.push(format!("- **{}**: {} papers", category, count));
            }
            lines.push(String::new());
            push_rule(&mut lines);
        }

        lines.push("## 📚 Complete References".to_string());
        lines.push(String::new());
        for (i, paper) in papers.iter().enumerate() {
            lines.push(format!(
                "[{}] {} ({}). \"{}\". *arXiv:{}*",
                i + 1,
                format_authors(&paper.authors, 3),
                paper.year(),
                paper.title,
                paper.id
            ));
            lines.push(format!("    🔗 {}", paper.entry_url));
            lines.push(String::new());
        }
        push_rule(&mut lines);

        lines.push("## 🔧 Reproducibility Notes".to_string());
        lines.push(String::new());
        lines.push(format!("**Search Query Used:** `{}`", query));
        lines.push(format!("**Source Query:** `{}`", search.search_query()));
        if let Some((start, end)) = &date_range {
            lines.push(format!("**Date Range:** {} to {}", start, end));
        }
        lines.push(format!("**Papers Retrieved:** {}", papers.len()));
        if let Some(url) = search.api_url(ARXIV_QUERY_URL) {
            lines.push(String::new());
            lines.push(format!(
                "**To reproduce this search** (then keep papers from the last {} days):",
                search.days_back
            ));
            lines.push("```text".to_string());
            lines.push(url.to_string());
            lines.push("```".to_string());
        }
        push_rule(&mut lines);

        lines.push(format!("*Report generated by surveyor v{}*", env!("CARGO_PKG_VERSION")));
        lines.push(String::new());

        lines.join("\n")
    }

    pub fn generate_bibtex(&self, papers: &[Paper]) -> String {
        generate_bibtex(papers)
    }

    /// Pretty JSON with a metadata block, RFC 3339 timestamps throughout
    pub fn generate_json(
        &self,
        papers: &[Paper],
        insights: &Insights,
        research_directions: &[ResearchDirection],
    ) -> Result<String, serde_json::Error> {
        let data = json!({
            "metadata": {
                "generated_at": chrono::Local::now().to_rfc3339(),
                "total_papers": papers.len(),
            },
            "papers": papers,
            "insights": insights,
            "research_directions": research_directions,
        });
        serde_json::to_string_pretty(&data)
    }

    pub fn generate_comparison_report(&self, comparison: &TopicComparison) -> String {
        let first = &comparison.first;
        let second = &comparison.second;
        let mut lines: Vec<String> = Vec::new();

        lines.push(format!("# 🆚 Comparative Analysis: {} vs {}", first.topic, second.topic));
        lines.push(String::new());
        lines.push(format!("**Generated:** {}", report_timestamp()));
        push_rule(&mut lines);

        lines.push("## 📊 Overview".to_string());
        lines.push(String::new());
        lines.push(table_header("Metric", &first.topic, &second.topic));
        lines.push(table_divider(&first.topic, &second.topic));
        lines.push(format!("| Papers Found | {} | {} |", first.paper_count, second.paper_count));
        lines.push(String::new());

        lines.push("## 📈 Temporal Trends".to_string());
        lines.push(String::new());
        for topic in [first, second] {
            lines.push(format!("### {}", topic.topic));
            for (year, count) in &topic.temporal.by_year {
                lines.push(format!("- **{}**: {} papers", year, count));
            }
            lines.push(String::new());
        }

        lines.push("## 🔬 Methodologies".to_string());
        lines.push(String::new());
        lines.push(table_header("Method", &first.topic, &second.topic));
        lines.push(table_divider(&first.topic, &second.topic));

        let mut methods: Vec<&str> = first
            .methodologies
            .method_distribution
            .iter()
            .chain(second.methodologies.method_distribution.iter())
            .map(|(method, _)| method.as_str())
            .collect();
        methods.sort_unstable();
        methods.dedup();
        for method in methods {
            lines.push(format!(
                "| {} | {} | {} |",
                method,
                first.methodologies.count(method),
                second.methodologies.count(method)
            ));
        }
        push_rule(&mut lines);

        lines.push(format!("*Comparison generated by surveyor v{}*", env!("CARGO_PKG_VERSION")));
        lines.push(String::new());

        lines.join("\n")
    }

    /// Write `content` under the output directory and return the path.
    ///
    /// The name is sanitised and gets the format's extension unless it already has it.
    pub fn save_report(&self, content: &str, filename: &str, format: ReportFormat) -> io::Result<PathBuf> {
        fs::create_dir_all(&self.config.output_dir)?;

        let mut name = sanitize_filename(filename);
        if !name.ends_with(format.extension()) {
            name.push_str(format.extension());
        }

        let path = self.config.output_dir.join(name);
        fs::write(&path, content)?;
        log::info!("Saved {} report to {:?}", format, path);
        Ok(path)
    }
}

fn date_range(papers: &[Paper]) -> Option<(String, String)> {
    let start = papers.iter().map(|p| p.published).min()?;
    let end = papers.iter().map(|p| p.published).max()?;
    Some((start.format("%Y-%m-%d").to_string(), end.format("%Y-%m-%d").to_string()))
}

fn push_rule(lines: &mut Vec<String>) {
    lines.push(String::new());
    lines.push("---".to_string());
    lines.push(String::new());
}

fn or_placeholder<'a>(value: &'a str, placeholder: &'a str) -> &'a str {
    if value.trim().is_empty() {
        placeholder
    } else {
        value
    }
}

fn paper_section(paper: &Paper, index: usize) -> Vec<String> {
    let mut lines = vec![
        format!("### [{}] {}", index, paper.title),
        String::new(),
        format!("**Authors:** {}", format_authors(&paper.authors, 3)),
        format!(
            "**Published:** {} | **arXiv:** [{}]({})",
            paper.published.format("%Y-%m-%d"),
            paper.id,
            paper.entry_url
        ),
        format!(
            "**Categories:** {}",
            paper.categories.iter().take(3).cloned().collect::<Vec<_>>().join(", ")
        ),
        String::new(),
    ];

    if let Some(summary) = &paper.fast_summary {
        lines.push("**Summary:**".to_string());
        lines.push(summary.clone());
        lines.push(String::new());
    }

    if let Some(analysis) = &paper.deep_analysis {
        if !analysis.contributions.is_empty() {
            lines.push("**Key Contributions:**".to_string());
            for contribution in analysis.contributions.iter().take(3) {
                lines.push(format!("- {}", contribution));
            }
            lines.push(String::new());
        }
        if !analysis.methods.is_empty() {
            let methods = analysis.methods.iter().take(3).cloned().collect::<Vec<_>>();
            lines.push(format!("**Methods:** {}", methods.join(", ")));
            lines.push(String::new());
        }
        if let Some(result) = analysis.results.first() {
            lines.push(format!("**Results:** {}", result));
            lines.push(String::new());
        }
    }

    lines.push("---".to_string());
    lines.push(String::new());
    lines
}

/// `1. **item**` followed by an indented details line
fn numbered_section(lines: &mut Vec<String>, heading: &str, entries: &[InsightEntry], missing_details: &str) {
    if entries.is_empty() {
        return;
    }
    lines.push(format!("### {}", heading));
    lines.push(String::new());
    for (i, entry) in entries.iter().take(SECTION_LIMIT).enumerate() {
        match entry.details() {
            Some(details) => {
                lines.push(format!("{}. **{}**", i + 1, entry.item()));
                lines.push(format!("   - {}", or_placeholder(details, missing_details)));
            }
            None => lines.push(format!("{}. {}", i + 1, entry.item())),
        }
        lines.push(String::new());
    }
}

/// `- **item**: details` bullets
fn bullet_section(lines: &mut Vec<String>, heading: &str, entries: &[InsightEntry]) {
    if entries.is_empty() {
        return;
    }
    lines.push(format!("### {}", heading));
    lines.push(String::new());
    for entry in entries.iter().take(SECTION_LIMIT) {
        match entry.details() {
            Some(details) => lines.push(format!("- **{}**: {}", entry.item(), details)),
            None => lines.push(format!("- {}", entry.item())),
        }
    }
    lines.push(String::new());
}

fn table_header(label: &str, first: &str, second: &str) -> String {
    format!("| {} | {} | {} |", label, first, second)
}

fn table_divider(first: &str, second: &str) -> String {
    format!(
        "|--------|{}|{}|",
        "-".repeat(first.chars().count().max(3)),
        "-".repeat(second.chars().count().max(3))
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_format_parsing() {
        assert_eq!("md".parse::<ReportFormat>(), Ok(ReportFormat::Markdown));
        assert_eq!("BibTeX".parse::<ReportFormat>(), Ok(ReportFormat::Bibtex));
        assert!("pdf".parse::<ReportFormat>().is_err());
        assert_eq!(ReportFormat::Json.extension(), ".json");
    }

    #[test]
    fn test_or_placeholder() {
        assert_eq!(or_placeholder("  ", "N/A"), "N/A");
        assert_eq!(or_placeholder("x", "N/A"), "x");
    }
}
