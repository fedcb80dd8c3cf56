use crate::paper::{InsightEntry, Insights, Paper};

/// Papers listed in the deep-analysis context block
pub const CONTEXT_PAPERS: usize = 5;
/// Entries per insight list passed to direction generation
pub const DIRECTION_CONTEXT_ITEMS: usize = 5;

pub fn fast_summary(paper: &Paper) -> String {
    format!(
        "Summarize this research paper in 2-3 clear, technical sentences.

Title: {}
Abstract: {}

Focus on:
1. Main contribution or novelty
2. Methods or techniques used
3. Key results or findings

Be specific and technical. Avoid generic statements.",
        paper.title, paper.abstract_text
    )
}

/// Numbered `title (year)` lines for the first few papers
pub fn context_block(papers: &[Paper]) -> String {
    papers
        .iter()
        .take(CONTEXT_PAPERS)
        .enumerate()
        .map(|(i, p)| format!("{}. {} ({})", i + 1, p.title, p.year()))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn deep_analysis(paper: &Paper, context: &str) -> String {
    let authors = paper.authors.iter().take(5).cloned().collect::<Vec<_>>().join(", ");
    format!(
        "Analyze this research paper in detail:

Title: {}
Authors: {}
Published: {}
Abstract: {}

Related recent papers:
{}

Provide a structured analysis:

1. NOVEL CONTRIBUTIONS (what's genuinely new?)
2. METHODS AND TECHNIQUES (specific algorithms, architectures, approaches)
3. KEY RESULTS (metrics, performance, findings)
4. LIMITATIONS (explicitly stated or implied)
5. RELATIONS (how it builds on or differs from related work)
6. POTENTIAL APPLICATIONS (practical use cases)

Be specific, technical, and objective. Format as JSON with keys: contributions, methods, results, limitations, relations, applications (each as array of strings).",
        paper.title,
        authors,
        paper.published.format("%Y-%m-%d"),
        paper.abstract_text,
        context
    )
}

pub fn insights(papers: &[Paper]) -> String {
    let summaries = papers
        .iter()
        .enumerate()
        .map(|(i, paper)| {
            let mut block = format!("{}. {}\n", i + 1, paper.title);
            block.push_str(&format!(
                "   Summary: {}\n",
                paper.fast_summary.as_deref().unwrap_or("N/A")
            ));
            if let Some(analysis) = &paper.deep_analysis {
                let methods = analysis.methods.iter().take(3).cloned().collect::<Vec<_>>();
                block.push_str(&format!("   Methods: {}\n", methods.join(", ")));
            }
            block
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "Analyze these {} research papers and identify patterns:

{}

Provide a comprehensive analysis:

1. COMMON METHODS: Which techniques/frameworks appear across multiple papers?
2. DATASETS USED: What datasets are commonly used? Any gaps?
3. EVALUATION METRICS: What metrics are used? Are they consistent?
4. RECURRING LIMITATIONS: What limitations appear across papers?
5. RESEARCH GAPS: What areas are underexplored?
6. EMERGING THEMES: What new directions are emerging?

Format as JSON with keys: common_methods, datasets_used, metrics, limitations, research_gaps, emerging_themes (each as array of objects with 'item' and 'details' fields).",
        papers.len(),
        summaries
    )
}

pub fn research_directions(num_papers: usize, insights: &Insights) -> String {
    format!(
        "Based on analysis of {} recent papers:

Research Gaps Identified:
{}

Emerging Themes:
{}

Common Limitations:
{}

Generate 3-5 concrete research project ideas that address these gaps and limitations.

For each project, provide:
1. TITLE: Catchy, descriptive title
2. MOTIVATION: Why this matters (2-3 sentences)
3. APPROACH: How to tackle it (specific methods)
4. EXPECTED CONTRIBUTION: What's novel
5. REQUIRED RESOURCES: Compute, data, expertise needed
6. TIMELINE: Rough estimate (weeks/months)
7. DIFFICULTY: Low/Medium/High

Format as a JSON object with a \"projects\" array of project objects using the keys: title, motivation, approach, expected_contribution, required_resources, timeline, difficulty.",
        num_papers,
        format_items(&insights.research_gaps),
        format_items(&insights.emerging_themes),
        format_items(&insights.limitations)
    )
}

fn format_items(items: &[InsightEntry]) -> String {
    if items.is_empty() {
        return "None identified".to_string();
    }
    items
        .iter()
        .take(DIRECTION_CONTEXT_ITEMS)
        .map(InsightEntry::as_bullet)
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_items_truncates_and_handles_empty() {
        assert_eq!(format_items(&[]), "None identified");
        let items: Vec<InsightEntry> = (0..7).map(|i| InsightEntry::Text(format!("gap {}", i))).collect();
        let formatted = format_items(&items);
        assert_eq!(formatted.lines().count(), 5);
        assert!(formatted.starts_with("- gap 0"));
    }

    #[test]
    fn test_context_block_uses_first_five() {
        let papers: Vec<Paper> = (0..7).map(|i| Paper::builder(i.to_string(), format!("P{}", i)).build()).collect();
        let block = context_block(&papers);
        assert_eq!(block.lines().count(), 5);
        assert_eq!(block.lines().next(), Some("1. P0 (1970)"));
    }
}
