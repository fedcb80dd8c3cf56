use std::fmt;

use crate::paper::Paper;

/// A BibTeX entry with fields kept in insertion order
#[derive(Debug, Clone, PartialEq)]
pub struct BibEntry {
    pub key: String,
    pub entry_type: String,
    pub fields: Vec<(String, String)>,
}

/// Builder for BibEntry to allow for cleaner creation
pub struct BibEntryBuilder {
    entry: BibEntry,
}

impl BibEntryBuilder {
    pub fn new(key: impl Into<String>, entry_type: impl Into<String>) -> Self {
        Self {
            entry: BibEntry {
                key: key.into(),
                entry_type: entry_type.into(),
                fields: Vec::new(),
            },
        }
    }

    /// Add a field, replacing an earlier value for the same name
    pub fn field(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.entry.set(&field.into(), value.into());
        self
    }

    pub fn build(self) -> BibEntry {
        self.entry
    }
}

impl BibEntry {
    pub fn builder(key: impl Into<String>, entry_type: impl Into<String>) -> BibEntryBuilder {
        BibEntryBuilder::new(key, entry_type)
    }

    pub fn set(&mut self, field: &str, value: String) {
        match self.fields.iter_mut().find(|(name, _)| name == field) {
            Some((_, existing)) => *existing = value,
            None => self.fields.push((field.to_string(), value)),
        }
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, value)| value.as_str())
    }

    /// `@article` entry for an arXiv paper
    pub fn from_paper(paper: &Paper) -> Self {
        BibEntry::builder(citation_key(&paper.id), "article")
            .field("author", paper.authors.join(" and "))
            .field("title", paper.title.clone())
            .field("journal", format!("arXiv preprint arXiv:{}", paper.id))
            .field("year", paper.year().to_string())
            .field("url", paper.entry_url.clone())
            .build()
    }
}

impl fmt::Display for BibEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "@{}{{{},", self.entry_type, self.key)?;
        let last = self.fields.len().saturating_sub(1);
        for (i, (name, value)) in self.fields.iter().enumerate() {
            let separator = if i == last { "" } else { "," };
            writeln!(f, "  {} = {{{}}}{}", name, value, separator)?;
        }
        write!(f, "}}")
    }
}

/// Source id with every `.` replaced by `_`
pub fn citation_key(id: &str) -> String {
    id.replace('.', "_")
}

/// One `@article` per paper, separated by blank lines
pub fn generate_bibtex(papers: &[Paper]) -> String {
    papers
        .iter()
        .map(|paper| BibEntry::from_paper(paper).to_string())
        .collect::<Vec<_>>()
        .join("\n\n")
}
