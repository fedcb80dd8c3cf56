use chrono::Local;
use std::collections::BTreeSet;

/// Show up to `max_authors` names joined by commas, then "et al." when more exist
pub fn format_authors(authors: &[String], max_authors: usize) -> String {
    if authors.len() <= max_authors {
        authors.join(", ")
    } else {
        format!("{} et al.", authors[..max_authors].join(", "))
    }
}

/// Truncate text to `max_chars` characters, appending "..." when cut
pub fn truncate_text(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let cut: String = text.chars().take(max_chars).collect();
    format!("{}...", cut)
}

/// Replace characters that are invalid in file names with `_`
pub fn sanitize_filename(filename: &str) -> String {
    filename
        .chars()
        .map(|c| if "<>:\"/\\|?*".contains(c) { '_' } else { c })
        .collect()
}

/// Local timestamp used in report headers, `YYYY-MM-DD HH:MM:SS`
pub fn report_timestamp() -> String {
    Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Timestamp safe to embed in file names
pub fn file_timestamp() -> String {
    Local::now().format("%Y-%m-%d_%H-%M-%S").to_string()
}

/// Extract keywords from a free-text query, dropping short words and stop words
pub fn extract_keywords(query: &str) -> Vec<String> {
    const STOP_WORDS: [&str; 11] = ["the", "a", "an", "in", "on", "at", "for", "to", "of", "and", "or"];
    query
        .to_lowercase()
        .split_whitespace()
        .filter(|w| w.chars().count() > 2 && !STOP_WORDS.contains(w))
        .map(str::to_string)
        .collect()
}

/// Suggest related search keywords for well-known topics (at most five, sorted)
pub fn suggest_related_keywords(query: &str) -> Vec<String> {
    const KEYWORD_MAP: [(&str, &[&str]); 7] = [
        ("transformer", &["attention", "bert", "gpt", "self-attention", "encoder-decoder"]),
        ("vision", &["image", "cnn", "visual", "computer vision", "object detection"]),
        ("nlp", &["language", "text", "linguistic", "natural language", "bert"]),
        ("quantum", &["qubit", "quantum computing", "quantum algorithm", "entanglement"]),
        ("reinforcement", &["rl", "policy", "reward", "agent", "q-learning"]),
        ("gan", &["generative", "adversarial", "generator", "discriminator"]),
        ("diffusion", &["denoising", "score-based", "ddpm", "generative model"]),
    ];

    // Whole words only, so "organic" is not about GANs
    let keywords = extract_keywords(query);
    let suggestions: BTreeSet<&str> = KEYWORD_MAP
        .iter()
        .filter(|(key, _)| keywords.iter().any(|word| word.starts_with(key)))
        .flat_map(|(_, related)| related.iter().copied())
        .collect();
    suggestions.into_iter().take(5).map(str::to_string).collect()
}

/// Common arXiv category codes with descriptions
pub fn arxiv_categories() -> &'static [(&'static str, &'static str)] {
    &[
        ("cs.AI", "Artificial Intelligence"),
        ("cs.LG", "Machine Learning"),
        ("cs.CL", "Computation and Language"),
        ("cs.CV", "Computer Vision"),
        ("cs.NE", "Neural and Evolutionary Computing"),
        ("cs.RO", "Robotics"),
        ("stat.ML", "Statistics - Machine Learning"),
        ("quant-ph", "Quantum Physics"),
        ("physics.comp-ph", "Computational Physics"),
        ("math.OC", "Optimization and Control"),
        ("eess.SP", "Signal Processing"),
        ("eess.IV", "Image and Video Processing"),
    ]
}

/// Rough reading time at 225 words per minute
pub fn estimate_reading_time(word_count: usize) -> String {
    let minutes = word_count as f64 / 225.0;
    if minutes < 1.0 {
        "< 1 min".to_string()
    } else if minutes < 60.0 {
        format!("{} min", minutes as u64)
    } else {
        format!("{:.1} hours", minutes / 60.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_format_authors() {
        assert_eq!(format_authors(&names(&["A", "B", "C", "D"]), 3), "A, B, C et al.");
        assert_eq!(format_authors(&names(&["A", "B", "C"]), 3), "A, B, C");
        assert_eq!(format_authors(&names(&["A"]), 3), "A");
        assert_eq!(format_authors(&[], 3), "");
    }

    #[test]
    fn test_truncate_text() {
        assert_eq!(truncate_text("short", 10), "short");
        assert_eq!(truncate_text("abcdef", 3), "abc...");
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("a/b:c?.md"), "a_b_c_.md");
    }

    #[test]
    fn test_extract_keywords() {
        assert_eq!(extract_keywords("The future of AI and vision"), vec!["future", "vision"]);
    }

    #[test]
    fn test_suggest_related_keywords() {
        let suggestions = suggest_related_keywords("Vision Transformer");
        assert_eq!(suggestions.len(), 5);
        assert!(suggestions.iter().all(|s| !s.is_empty()));
        assert!(suggest_related_keywords("graph theory").is_empty());
        assert!(suggest_related_keywords("organic chemistry").is_empty());
        assert_eq!(suggest_related_keywords("GANs for art"), vec!["adversarial", "discriminator", "generative", "generator"]);
    }

    #[test]
    fn test_estimate_reading_time() {
        assert_eq!(estimate_reading_time(100), "< 1 min");
        assert_eq!(estimate_reading_time(450), "2 min");
        assert_eq!(estimate_reading_time(27000), "2.0 hours");
    }
}
