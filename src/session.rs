//! Persisted research sessions with a searchable embedding index.
//!
//! Layout: one directory per session under the configured root, holding
//! `metadata.json` and `index.json`. Both files are always written together;
//! a directory with only one of them is reported as corrupt.

pub mod embedding;
pub mod index;

use chrono::{DateTime, Utc};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::config::SessionConfig;
use crate::error::SessionError;
use crate::paper::{InsightEntry, Insights, Paper, ResearchDirection};
use crate::progress::{noop_observer, Phase, ProgressEvent, SharedObserver};

pub use embedding::{Embedder, OpenAiEmbedder};
pub use index::{Chunk, ChunkKind, SearchHit, VectorIndex};

pub const METADATA_FILE: &str = "metadata.json";
pub const INDEX_FILE: &str = "index.json";
/// Hits returned by a session query unless the caller asks otherwise
pub const DEFAULT_QUERY_K: usize = 5;

/// Contents of `metadata.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionMetadata {
    pub session_name: String,
    pub query: String,
    pub num_papers: usize,
    pub created_at: DateTime<Utc>,
    pub papers: Vec<Paper>,
    #[serde(default)]
    pub insights: Insights,
    #[serde(default)]
    pub research_directions: Vec<ResearchDirection>,
}

/// A loaded session.
#[derive(Debug, Clone)]
pub struct Session {
    pub metadata: SessionMetadata,
    pub index: VectorIndex,
}

pub struct SessionStore {
    root: PathBuf,
    embedder: Option<Box<dyn Embedder>>,
    observer: SharedObserver,
}

impl SessionStore {
    /// Without an embedder, loading, listing and deleting still work; storing and querying fail.
    pub fn new(root: impl Into<PathBuf>, embedder: Option<Box<dyn Embedder>>) -> Self {
        Self {
            root: root.into(),
            embedder,
            observer: noop_observer(),
        }
    }

    pub fn from_config(config: &SessionConfig) -> Self {
        let embedder = match OpenAiEmbedder::from_config(config) {
            Some(Ok(embedder)) => Some(Box::new(embedder) as Box<dyn Embedder>),
            Some(Err(e)) => {
                warn!("Could not initialise embeddings: {}", e);
                None
            }
            None => {
                warn!("No embedding API key configured, session storage disabled");
                None
            }
        };
        Self::new(config.persist_root.clone(), embedder)
    }

    pub fn with_observer(mut self, observer: SharedObserver) -> Self {
        self.observer = observer;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn has_embedder(&self) -> bool {
        self.embedder.is_some()
    }

    fn embedder(&self) -> Result<&dyn Embedder, SessionError> {
        self.embedder.as_deref().ok_or(SessionError::EmbeddingUnavailable)
    }

    fn session_dir(&self, name: &str) -> Result<PathBuf, SessionError> {
        validate_session_name(name)?;
        Ok(self.root.join(name))
    }

    /// Embed and persist a session, replacing any session with the same name.
    ///
    /// Nothing is written unless every chunk was embedded.
    pub fn store(
        &self,
        name: &str,
        query: &str,
        papers: &[Paper],
        insights: &Insights,
        research_directions: &[ResearchDirection],
    ) -> Result<SessionMetadata, SessionError> {
        self.store_with_timestamp(name, query, papers, insights, research_directions, Utc::now())
    }

    fn store_with_timestamp(
        &self,
        name: &str,
        query: &str,
        papers: &[Paper],
        insights: &Insights,
        research_directions: &[ResearchDirection],
        created_at: DateTime<Utc>,
    ) -> Result<SessionMetadata, SessionError> {
        let final_dir = self.session_dir(name)?;
        let embedder = self.embedder()?;
        self.observer.on_event(&ProgressEvent::PhaseStarted {
            phase: Phase::Session,
            detail: name.to_string(),
        });

        let chunks = prepare_chunks(papers, insights, research_directions);
        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let vectors = embedder.embed_batch(&texts)?;
        let index = VectorIndex::build(embedder.model_name(), chunks, vectors)?;

        let metadata = SessionMetadata {
            session_name: name.to_string(),
            query: query.to_string(),
            num_papers: papers.len(),
            created_at,
            papers: papers.to_vec(),
            insights: insights.clone(),
            research_directions: research_directions.to_vec(),
        };

        // Write both files into a staging directory, then move it into place
        fs::create_dir_all(&self.root)?;
        let staging = self.root.join(format!(".{}.tmp", name));
        if staging.exists() {
            fs::remove_dir_all(&staging)?;
        }
        fs::create_dir_all(&staging)?;
        let written = fs::write(staging.join(METADATA_FILE), serde_json::to_string_pretty(&metadata)?)
            .map_err(SessionError::from)
            .and_then(|_| index.save(&staging.join(INDEX_FILE)));
        if let Err(e) = written {
            let _ = fs::remove_dir_all(&staging);
            return Err(e);
        }
        if final_dir.exists() {
            fs::remove_dir_all(&final_dir)?;
        }
        fs::rename(&staging, &final_dir)?;

        info!(
            "Session {} stored at {:?}: {} papers, {} chunks indexed",
            name,
            final_dir,
            papers.len(),
            index.len()
        );
        self.observer.on_event(&ProgressEvent::PhaseCompleted {
            phase: Phase::Session,
            count: index.len(),
        });
        Ok(metadata)
    }

    pub fn load(&self, name: &str) -> Result<Session, SessionError> {
        let dir = self.session_dir(name)?;
        if !dir.is_dir() {
            return Err(SessionError::NotFound(name.to_string()));
        }

        let metadata_path = dir.join(METADATA_FILE);
        let index_path = dir.join(INDEX_FILE);
        match (metadata_path.is_file(), index_path.is_file()) {
            (true, true) => {}
            (false, false) => return Err(SessionError::NotFound(name.to_string())),
            (has_metadata, _) => {
                let missing = if has_metadata { INDEX_FILE } else { METADATA_FILE };
                return Err(SessionError::Corrupt {
                    name: name.to_string(),
                    reason: format!("{} is missing", missing),
                });
            }
        }

        let metadata: SessionMetadata =
            serde_json::from_str(&fs::read_to_string(&metadata_path)?).map_err(|e| SessionError::Corrupt {
                name: name.to_string(),
                reason: format!("unreadable {}: {}", METADATA_FILE, e),
            })?;
        let index = VectorIndex::load(&index_path).map_err(|e| SessionError::Corrupt {
            name: name.to_string(),
            reason: format!("unreadable {}: {}", INDEX_FILE, e),
        })?;

        info!("Session {} loaded: {} papers", name, metadata.num_papers);
        Ok(Session { metadata, index })
    }

    /// Nearest chunks to `query_text`, closest first
    pub fn query(&self, name: &str, query_text: &str, k: usize) -> Result<Vec<SearchHit>, SessionError> {
        let session = self.load(name)?;
        let embedder = self.embedder()?;
        if session.index.model() != embedder.model_name() {
            warn!(
                "Session {} was indexed with {}, querying with {}",
                name,
                session.index.model(),
                embedder.model_name()
            );
        }
        let vector = embedder.embed(query_text)?;
        Ok(session.index.search(&vector, k))
    }

    /// Add papers not already in the session and re-store the union.
    ///
    /// Returns how many papers were added; zero means nothing was rewritten.
    pub fn update(&self, name: &str, new_papers: &[Paper]) -> Result<usize, SessionError> {
        let session = self.load(name)?;
        let existing: HashSet<&str> = session.metadata.papers.iter().map(|p| p.id.as_str()).collect();

        let mut seen = HashSet::new();
        let fresh: Vec<Paper> = new_papers
            .iter()
            .filter(|p| !existing.contains(p.id.as_str()) && seen.insert(p.id.clone()))
            .cloned()
            .collect();
        if fresh.is_empty() {
            info!("No new papers to add to session {}", name);
            return Ok(0);
        }

        let mut all_papers = session.metadata.papers.clone();
        all_papers.extend(fresh.iter().cloned());
        self.store_with_timestamp(
            name,
            &session.metadata.query,
            &all_papers,
            &session.metadata.insights,
            &session.metadata.research_directions,
            session.metadata.created_at,
        )?;
        Ok(fresh.len())
    }

    /// Names of the directories under the root that hold a metadata file, sorted
    pub fn list(&self) -> Result<Vec<String>, SessionError> {
        if !self.root.is_dir() {
            return Ok(Vec::new());
        }

        let mut sessions = Vec::new();
        for entry in WalkDir::new(&self.root).min_depth(1).max_depth(1) {
            let entry = entry.map_err(|e| SessionError::Io(e.into()))?;
            if !entry.file_type().is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().to_string();
            if name.starts_with('.') {
                continue;
            }
            if entry.path().join(METADATA_FILE).is_file() {
                sessions.push(name);
            }
        }
        sessions.sort();
        Ok(sessions)
    }

    pub fn delete(&self, name: &str) -> Result<(), SessionError> {
        let dir = self.session_dir(name)?;
        if !dir.is_dir() {
            return Err(SessionError::NotFound(name.to_string()));
        }
        fs::remove_dir_all(&dir)?;
        info!("Session {} deleted", name);
        Ok(())
    }

    /// Short Markdown overview: query, size, creation time and the first five papers
    pub fn export_session_summary(&self, name: &str) -> Result<String, SessionError> {
        let metadata = self.load(name)?.metadata;

        let mut summary = format!("# Session: {}\n\n", name);
        summary.push_str(&format!("**Query:** {}\n", metadata.query));
        summary.push_str(&format!("**Papers:** {}\n", metadata.num_papers));
        summary.push_str(&format!("**Created:** {}\n\n", metadata.created_at.to_rfc3339()));
        summary.push_str("## Papers:\n");
        for paper in metadata.papers.iter().take(5) {
            summary.push_str(&format!("- {} ({})\n", paper.title, paper.year()));
        }
        if metadata.papers.len() > 5 {
            summary.push_str(&format!("- ... and {} more\n", metadata.papers.len() - 5));
        }
        Ok(summary)
    }
}

/// Session names become directory names: non-empty, no separators, no leading dot
pub fn validate_session_name(name: &str) -> Result<(), SessionError> {
    let invalid = name.trim().is_empty()
        || name.starts_with('.')
        || name.contains(['/', '\\'])
        || name.contains('\0');
    if invalid {
        return Err(SessionError::InvalidName(name.to_string()));
    }
    Ok(())
}

/// Split a session into embeddable chunks: one per paper, one for the
/// insights (when there are any) and one per research direction.
pub fn prepare_chunks(papers: &[Paper], insights: &Insights, research_directions: &[ResearchDirection]) -> Vec<Chunk> {
    let mut chunks = Vec::with_capacity(papers.len() + research_directions.len() + 1);

    for paper in papers {
        let authors = paper.authors.iter().take(5).cloned().collect::<Vec<_>>().join(", ");
        let mut text = format!(
            "Title: {}\n\nAuthors: {}\n\nAbstract: {}\n\n",
            paper.title, authors, paper.abstract_text
        );
        if let Some(summary) = &paper.fast_summary {
            text.push_str(&format!("Summary: {}\n\n", summary));
        }
        if let Some(analysis) = &paper.deep_analysis {
            if !analysis.contributions.is_empty() {
                text.push_str(&format!("Contributions: {}\n\n", analysis.contributions.join(" ")));
            }
            if !analysis.methods.is_empty() {
                text.push_str(&format!("Methods: {}\n\n", analysis.methods.join(" ")));
            }
        }
        chunks.push(Chunk {
            kind: ChunkKind::Paper,
            source_id: Some(paper.id.clone()),
            text,
        });
    }

    if !insights.is_empty() {
        let mut text = String::from("Research Insights:\n\n");
        for (key, entries) in insights.sections() {
            text.push_str(&format!("{}:\n", title_case(key)));
            for entry in entries.iter().take(5) {
                text.push_str(&InsightEntry::as_bullet(entry));
                text.push('\n');
            }
            text.push('\n');
        }
        chunks.push(Chunk {
            kind: ChunkKind::Insights,
            source_id: None,
            text,
        });
    }

    for (i, direction) in research_directions.iter().enumerate() {
        let text = format!(
            "Research Direction {}:\n\nTitle: {}\n\nMotivation: {}\n\nApproach: {}\n\nExpected Contribution: {}\n\n",
            i + 1,
            direction.title,
            direction.motivation,
            direction.approach,
            direction.expected_contribution
        );
        chunks.push(Chunk {
            kind: ChunkKind::ResearchDirection,
            source_id: None,
            text,
        });
    }

    chunks
}

/// `common_methods` -> `Common Methods`
fn title_case(key: &str) -> String {
    key.split('_')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_session_name() {
        assert!(validate_session_name("vit-2024").is_ok());
        assert!(validate_session_name("").is_err());
        assert!(validate_session_name("../etc").is_err());
        assert!(validate_session_name(".hidden").is_err());
        assert!(validate_session_name("a\\b").is_err());
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("common_methods"), "Common Methods");
        assert_eq!(title_case("metrics"), "Metrics");
    }

    #[test]
    fn test_chunks_skip_empty_insights() {
        let papers = vec![Paper::builder("1", "A").build()];
        let chunks = prepare_chunks(&papers, &Insights::default(), &[ResearchDirection::default()]);
        let kinds: Vec<ChunkKind> = chunks.iter().map(|c| c.kind).collect();
        assert_eq!(kinds, vec![ChunkKind::Paper, ChunkKind::ResearchDirection]);
        assert_eq!(chunks[0].source_id.as_deref(), Some("1"));
    }
}
