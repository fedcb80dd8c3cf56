use chrono::{TimeZone, Utc};
use tempfile::tempdir;

use surveyor::analysis::{compare_topics, AnalysisSnapshot};
use surveyor::config::ReportConfig;
use surveyor::paper::{DeepAnalysis, InsightEntry, Insights, Paper, ResearchDirection};
use surveyor::report::{citation_key, generate_bibtex, ReportFormat, ReportGenerator};
use surveyor::retrieval::SearchParams;

fn sample_papers() -> Vec<Paper> {
    let mut first = Paper::builder("2401.01234", "Sparse Mixture of Experts")
        .authors(["Alice Smith", "Bob Jones", "Carol White", "Dan Brown"])
        .published(Utc.with_ymd_and_hms(2024, 1, 5, 0, 0, 0).unwrap())
        .abstract_text("A neural routing approach.")
        .categories(["cs.LG", "cs.CL"])
        .build();
    first.fast_summary = Some("Routes tokens to experts.".to_string());
    first.deep_analysis = Some(DeepAnalysis {
        contributions: vec!["Sparse routing".to_string()],
        methods: vec!["Top-2 gating".to_string()],
        results: vec!["2x faster training".to_string()],
        ..DeepAnalysis::default()
    });

    let second = Paper::builder("2312.05678", "Dense Baselines")
        .authors(["Eve Black"])
        .published(Utc.with_ymd_and_hms(2023, 12, 20, 0, 0, 0).unwrap())
        .abstract_text("A generative diffusion baseline.")
        .categories(["cs.CV"])
        .build();

    vec![first, second]
}

fn sample_insights() -> Insights {
    Insights {
        common_methods: vec![InsightEntry::Detailed {
            item: "Mixture of experts".to_string(),
            details: "Used by most papers".to_string(),
        }],
        datasets_used: vec!["C4".into()],
        research_gaps: vec![InsightEntry::Detailed {
            item: "Load balancing".to_string(),
            details: String::new(),
        }],
        ..Insights::default()
    }
}

fn sample_directions() -> Vec<ResearchDirection> {
    vec![ResearchDirection {
        title: "Adaptive Routing".to_string(),
        motivation: "Experts are underused".to_string(),
        difficulty: "High".to_string(),
        ..ResearchDirection::default()
    }]
}

fn generator(dir: &std::path::Path) -> ReportGenerator {
    ReportGenerator::new(ReportConfig {
        output_dir: dir.to_path_buf(),
    })
}

#[test]
fn test_markdown_report_sections() {
    let dir = tempdir().unwrap();
    let papers = sample_papers();
    let snapshot = AnalysisSnapshot::of(&papers);
    let report = generator(dir.path()).generate_markdown_report(
        &SearchParams::new("mixture of experts"),
        &papers,
        &sample_insights(),
        &sample_directions(),
        Some(&snapshot),
    );

    assert!(report.starts_with("# 📘 Research Report: mixture of experts"));
    assert!(report.contains("**Papers Analyzed:** 2"));
    assert!(report.contains("**Date Range:** 2023-12-20 to 2024-01-05"));
    assert!(report.contains("### [1] Sparse Mixture of Experts"));
    assert!(report.contains("**Authors:** Alice Smith, Bob Jones, Carol White et al."));
    assert!(report.contains("**Summary:**\nRoutes tokens to experts."));
    assert!(report.contains("**Key Contributions:**\n- Sparse routing"));
    assert!(report.contains("**Results:** 2x faster training"));
    assert!(report.contains("1. **Mixture of experts**\n   - Used by most papers"));
    assert!(report.contains("1. **Load balancing**\n   - No details available"));
    assert!(report.contains("- C4"));
    assert!(report.contains("1. **Adaptive Routing**"));
    assert!(report.contains("   - **Approach:** N/A"));
    assert!(report.contains("- **2024**: 1 papers"));
    assert!(report.contains("## 📚 Complete References"));
    assert!(report.contains("🔗 http://arxiv.org/abs/2401.01234"));
    assert!(report.contains("**Search Query Used:** `mixture of experts`"));
    assert!(report.contains("*Report generated by surveyor v"));
}

#[test]
fn test_markdown_report_section_order() {
    let dir = tempdir().unwrap();
    let papers = sample_papers();
    let snapshot = AnalysisSnapshot::of(&papers);
    let insights = Insights {
        emerging_themes: vec!["Conditional computation".into()],
        ..sample_insights()
    };
    let report = generator(dir.path()).generate_markdown_report(
        &SearchParams::new("mixture of experts"),
        &papers,
        &insights,
        &sample_directions(),
        Some(&snapshot),
    );

    let headings = [
        "# 📘 Research Report",
        "## 🔍 Summary of Recent Works",
        "### [1] Sparse Mixture of Experts",
        "### [2] Dense Baselines",
        "## 🧠 Cross-Paper Analysis",
        "## 🚨 Identified Limitations & Gaps",
        "## 🚀 Suggested Research Directions",
        "### Emerging Themes",
        "## 📊 Trend Analysis",
        "## 📚 Complete References",
        "## 🔧 Reproducibility Notes",
        "*Report generated by surveyor v",
    ];
    let offsets: Vec<usize> = headings
        .iter()
        .map(|heading| report.find(heading).unwrap_or_else(|| panic!("missing {:?}", heading)))
        .collect();
    assert!(offsets.windows(2).all(|w| w[0] < w[1]), "sections out of order: {:?}", offsets);
}

#[test]
fn test_reproducibility_notes_use_source_query() {
    let dir = tempdir().unwrap();
    let papers = sample_papers();
    let search = SearchParams::new("mixture of experts")
        .max_results(4)
        .categories(vec!["cs.LG".to_string()]);
    let report = generator(dir.path()).generate_markdown_report(&search, &papers, &Insights::default(), &[], None);

    assert!(report.contains("**Search Query Used:** `mixture of experts`"));
    assert!(report.contains(
        "**Source Query:** `(ti:mixture of experts OR abs:mixture of experts) AND (cat:cs.LG)`"
    ));
    let url = search.api_url("https://export.arxiv.org/api/query").unwrap();
    assert!(report.contains(&format!("```text\n{}\n```", url)));
    assert!(url.as_str().contains("max_results=8"));
    assert!(!url.as_str().contains("mixture of experts"));
}

#[test]
fn test_markdown_report_omits_empty_sections() {
    let dir = tempdir().unwrap();
    let report = generator(dir.path()).generate_markdown_report(&SearchParams::new("nothing"), &[], &Insights::default(), &[], None);

    assert!(report.contains("**Papers Analyzed:** 0"));
    assert!(!report.contains("**Date Range:**"));
    assert!(!report.contains("Suggested Research Directions"));
    assert!(!report.contains("Trend Analysis"));
    assert!(!report.contains("### Dominant Approaches"));
}

#[test]
fn test_bibtex_generation() {
    let papers = sample_papers();
    assert_eq!(citation_key("2401.01234"), "2401_01234");

    let bibtex = generate_bibtex(&papers);
    let expected_first = "@article{2401_01234,
  author = {Alice Smith and Bob Jones and Carol White and Dan Brown},
  title = {Sparse Mixture of Experts},
  journal = {arXiv preprint arXiv:2401.01234},
  year = {2024},
  url = {http://arxiv.org/abs/2401.01234}
}";
    assert!(bibtex.starts_with(expected_first));
    assert!(bibtex.contains("}\n\n@article{2312_05678,"));
    assert_eq!(bibtex.matches("@article{").count(), 2);
}

#[test]
fn test_json_export() {
    let dir = tempdir().unwrap();
    let papers = sample_papers();
    let json = generator(dir.path())
        .generate_json(&papers, &sample_insights(), &sample_directions())
        .unwrap();

    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["metadata"]["total_papers"], 2);
    assert!(value["metadata"]["generated_at"].is_string());
    assert_eq!(value["papers"][0]["id"], "2401.01234");
    assert_eq!(value["papers"][0]["summary"], "A neural routing approach.");
    assert_eq!(value["papers"][0]["published"], "2024-01-05T00:00:00Z");
    assert_eq!(value["insights"]["common_methods"][0]["item"], "Mixture of experts");
    assert_eq!(value["insights"]["metrics"], serde_json::json!([]));
    assert_eq!(value["research_directions"][0]["title"], "Adaptive Routing");
}

#[test]
fn test_comparison_report() {
    let dir = tempdir().unwrap();
    let papers = sample_papers();
    let comparison = compare_topics(&papers[..1], &papers[1..], "experts", "diffusion");
    let report = generator(dir.path()).generate_comparison_report(&comparison);

    assert!(report.starts_with("# 🆚 Comparative Analysis: experts vs diffusion"));
    assert!(report.contains("| Papers Found | 1 | 1 |"));
    assert!(report.contains("| deep_learning | 1 | 0 |"));
    assert!(report.contains("| generative | 0 | 1 |"));
    assert!(report.contains("### experts\n- **2024**: 1 papers"));
}

#[test]
fn test_save_report() {
    let dir = tempdir().unwrap();
    let output_dir = dir.path().join("reports");
    let generator = generator(&output_dir);

    let path = generator
        .save_report("# Report", "research:report?1", ReportFormat::Markdown)
        .unwrap();
    assert_eq!(path, output_dir.join("research_report_1.md"));
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "# Report");

    let path = generator.save_report("{}", "data.json", ReportFormat::Json).unwrap();
    assert_eq!(path.file_name().unwrap(), "data.json");
}
