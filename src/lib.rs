//! Literature surveys over arXiv: retrieval, LLM summarization, cross-paper
//! statistics, reports and searchable research sessions.

pub mod agent;
pub mod analysis;
pub mod command;
pub mod config;
pub mod error;
pub mod llm;
pub mod paper;
pub mod progress;
pub mod report;
pub mod retrieval;
pub mod session;
pub mod summarize;
pub mod util;

pub use agent::{QueryOptions, ResearchAgent, ResearchOutcome, ResearchResults};
pub use config::AppConfig;
pub use error::SurveyError;
pub use paper::{DeepAnalysis, InsightEntry, Insights, Paper, ResearchDirection};
