use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::RetrievalError;
use crate::paper::Paper;

// Patterns for the arXiv Atom feed, compiled once
static ENTRY_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)<entry>(.*?)</entry>").expect("Invalid entry regex pattern")
});
static ID_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)<id>(.*?)</id>").expect("Invalid id regex pattern")
});
static TITLE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)<title[^>]*>(.*?)</title>").expect("Invalid title regex pattern")
});
static SUMMARY_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)<summary[^>]*>(.*?)</summary>").expect("Invalid summary regex pattern")
});
static PUBLISHED_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"<published>([^<]+)</published>").expect("Invalid published regex pattern")
});
static UPDATED_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"<updated>([^<]+)</updated>").expect("Invalid updated regex pattern")
});
static AUTHOR_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)<author>\s*<name>(.*?)</name>").expect("Invalid author regex pattern")
});
static CATEGORY_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"<category[^>]*\bterm="([^"]+)""#).expect("Invalid category regex pattern")
});
static PRIMARY_CATEGORY_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"<arxiv:primary_category[^>]*\bterm="([^"]+)""#).expect("Invalid primary category regex pattern")
});
static LINK_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"<link\b([^>]*?)/?>").expect("Invalid link regex pattern")
});
static ATTRIBUTE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"([a-zA-Z_:]+)="([^"]*)""#).expect("Invalid attribute regex pattern")
});
static COMMENT_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)<arxiv:comment[^>]*>(.*?)</arxiv:comment>").expect("Invalid comment regex pattern")
});
static JOURNAL_REF_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)<arxiv:journal_ref[^>]*>(.*?)</arxiv:journal_ref>").expect("Invalid journal ref regex pattern")
});
static DOI_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)<arxiv:doi[^>]*>(.*?)</arxiv:doi>").expect("Invalid DOI regex pattern")
});
static VERSION_SUFFIX_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"v\d+$").expect("Invalid version suffix regex pattern")
});

/// Parse an arXiv API Atom response into papers.
///
/// Entries without a parseable id or publication date are skipped. A feed whose
/// only entry is an API error report is turned into a `ParseError`.
pub fn parse_feed(xml: &str) -> Result<Vec<Paper>, RetrievalError> {
    if !xml.contains("<feed") {
        return Err(RetrievalError::ParseError("response is not an Atom feed".to_string()));
    }

    let mut papers = Vec::new();
    for cap in ENTRY_REGEX.captures_iter(xml) {
        let entry = &cap[1];

        let id_url = capture_text(&ID_REGEX, entry).unwrap_or_default();
        if id_url.contains("/api/errors") {
            let message = capture_text(&SUMMARY_REGEX, entry).unwrap_or_else(|| "unknown error".to_string());
            return Err(RetrievalError::ParseError(format!("arXiv API error: {}", message)));
        }

        match parse_entry(entry) {
            Some(paper) => papers.push(paper),
            None => log::debug!("Skipping malformed feed entry {}", id_url),
        }
    }

    Ok(papers)
}

fn parse_entry(entry: &str) -> Option<Paper> {
    let id_url = capture_text(&ID_REGEX, entry)?;
    let id = short_id(&id_url);
    if id.is_empty() {
        return None;
    }

    let published = parse_timestamp(&capture_text(&PUBLISHED_REGEX, entry)?)?;
    let updated = capture_text(&UPDATED_REGEX, entry)
        .and_then(|s| parse_timestamp(&s))
        .unwrap_or(published);

    let title = capture_text(&TITLE_REGEX, entry).unwrap_or_default();
    let summary = capture_text(&SUMMARY_REGEX, entry).unwrap_or_default();

    let authors: Vec<String> = AUTHOR_REGEX
        .captures_iter(entry)
        .map(|c| clean_text(&c[1]))
        .filter(|name| !name.is_empty())
        .collect();

    let categories: Vec<String> = CATEGORY_REGEX
        .captures_iter(entry)
        .map(|c| c[1].to_string())
        .collect();
    let primary_category = PRIMARY_CATEGORY_REGEX
        .captures(entry)
        .map(|c| c[1].to_string())
        .or_else(|| categories.first().cloned())
        .unwrap_or_default();

    // Abstract page is the alternate link, the PDF is tagged by title or media type
    let mut entry_url = id_url.clone();
    let mut pdf_url = None;
    for link in LINK_REGEX.captures_iter(entry) {
        let attrs = &link[1];
        let href = attribute(attrs, "href");
        let Some(href) = href else { continue };
        let rel = attribute(attrs, "rel").unwrap_or_default();
        let link_type = attribute(attrs, "type").unwrap_or_default();
        let link_title = attribute(attrs, "title").unwrap_or_default();

        if link_title == "pdf" || link_type == "application/pdf" {
            pdf_url = Some(href);
        } else if rel == "alternate" {
            entry_url = href;
        }
    }

    Some(
        Paper::builder(id, title)
            .authors(authors)
            .published(published)
            .updated(updated)
            .abstract_text(summary)
            .primary_category(primary_category)
            .categories(categories)
            .entry_url(entry_url)
            .pdf_url(pdf_url)
            .comment(capture_text(&COMMENT_REGEX, entry))
            .journal_ref(capture_text(&JOURNAL_REF_REGEX, entry))
            .doi(capture_text(&DOI_REGEX, entry))
            .build(),
    )
}

/// `http://arxiv.org/abs/2401.01234v2` -> `2401.01234`
pub fn short_id(id_url: &str) -> String {
    let raw = match id_url.rfind("/abs/") {
        Some(pos) => &id_url[pos + 5..],
        None => id_url,
    };
    VERSION_SUFFIX_REGEX.replace(raw.trim(), "").to_string()
}

fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn capture_text(regex: &Regex, text: &str) -> Option<String> {
    regex
        .captures(text)
        .map(|c| clean_text(&c[1]))
        .filter(|s| !s.is_empty())
}

fn attribute(attrs: &str, name: &str) -> Option<String> {
    ATTRIBUTE_REGEX
        .captures_iter(attrs)
        .find(|c| &c[1] == name)
        .map(|c| unescape_xml(&c[2]))
}

/// Collapse whitespace runs and decode the predefined XML entities
fn clean_text(text: &str) -> String {
    unescape_xml(&text.split_whitespace().collect::<Vec<&str>>().join(" "))
}

fn unescape_xml(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_id() {
        assert_eq!(short_id("http://arxiv.org/abs/2401.01234v2"), "2401.01234");
        assert_eq!(short_id("http://arxiv.org/abs/hep-th/9901001v1"), "hep-th/9901001");
        assert_eq!(short_id("2401.01234"), "2401.01234");
    }

    #[test]
    fn test_clean_text() {
        assert_eq!(clean_text("  Deep\n   Learning &amp; Friends "), "Deep Learning & Friends");
    }

    #[test]
    fn test_error_feed() {
        let xml = r#"<feed xmlns="http://www.w3.org/2005/Atom"><entry><id>http://arxiv.org/api/errors#incorrect_id_format</id><title>Error</title><summary>incorrect id format</summary></entry></feed>"#;
        let err = parse_feed(xml).unwrap_err();
        assert!(err.to_string().contains("incorrect id format"));
    }

    #[test]
    fn test_not_a_feed() {
        assert!(parse_feed("<html>rate limited</html>").is_err());
    }

    #[test]
    fn test_entry_without_date_is_skipped() {
        let xml = r#"<feed><entry><id>http://arxiv.org/abs/1234.5678v1</id><title>x</title></entry></feed>"#;
        assert!(parse_feed(xml).unwrap().is_empty());
    }
}
