//! LLM-backed enrichment of a paper batch.
//!
//! Per-paper passes isolate failures: a failed call degrades that paper to a
//! placeholder and the pass moves on. Batch-level calls return an empty but
//! well-formed value on failure.

pub mod decode;
pub mod prompts;

use log::info;
use std::thread;
use std::time::Duration;

use crate::config::{PassSettings, ProvidersConfig, SummarizerConfig};
use crate::error::LlmError;
use crate::llm::{ChatRequest, CompletionClient, OpenAiCompatClient};
use crate::paper::{DeepAnalysis, Insights, Paper, ResearchDirection};
use crate::progress::{noop_observer, Phase, ProgressEvent, SharedObserver};

/// Placeholder stored when the fast summary call fails
pub const SUMMARY_UNAVAILABLE: &str = "Summary unavailable";

pub struct PaperSummarizer {
    primary: Box<dyn CompletionClient>,
    secondary: Option<Box<dyn CompletionClient>>,
    config: SummarizerConfig,
    observer: SharedObserver,
}

impl PaperSummarizer {
    pub fn new(
        primary: Box<dyn CompletionClient>,
        secondary: Option<Box<dyn CompletionClient>>,
        config: SummarizerConfig,
    ) -> Self {
        Self {
            primary,
            secondary,
            config,
            observer: noop_observer(),
        }
    }

    /// Primary provider is mandatory; the secondary one is used only when its key resolves.
    pub fn from_config(providers: &ProvidersConfig, config: SummarizerConfig) -> Result<Self, LlmError> {
        let primary = OpenAiCompatClient::from_config(&providers.primary, "GROQ_API_KEY")?;
        let secondary = match &providers.secondary {
            Some(provider) => match OpenAiCompatClient::from_config(provider, "OPENAI_API_KEY") {
                Ok(client) => Some(Box::new(client) as Box<dyn CompletionClient>),
                Err(e) => {
                    info!("Secondary model disabled ({}), using {} for all passes", e, providers.primary.model);
                    None
                }
            },
            None => None,
        };
        Ok(Self::new(Box::new(primary), secondary, config))
    }

    pub fn with_observer(mut self, observer: SharedObserver) -> Self {
        self.observer = observer;
        self
    }

    /// Model used for deep analysis and the aggregation calls
    pub fn analysis_model(&self) -> &str {
        self.analysis_client().model_name()
    }

    fn analysis_client(&self) -> &dyn CompletionClient {
        self.secondary.as_deref().unwrap_or(self.primary.as_ref())
    }

    fn analysis_request(&self, prompt: String, settings: PassSettings) -> ChatRequest {
        ChatRequest::from_prompt(prompt, settings.temperature, settings.max_tokens)
            .json(self.secondary.is_some() && self.analysis_client().supports_json_mode())
    }

    /// Set `fast_summary` on every paper, using the placeholder on failure.
    pub fn summarize_papers_fast(&self, papers: &mut [Paper]) {
        let total = papers.len();
        self.observer.on_event(&ProgressEvent::PhaseStarted {
            phase: Phase::FastSummary,
            detail: self.primary.model_name().to_string(),
        });

        for (i, paper) in papers.iter_mut().enumerate() {
            let settings = self.config.fast;
            let request = ChatRequest::from_prompt(prompts::fast_summary(paper), settings.temperature, settings.max_tokens);
            match self.primary.complete(&request) {
                Ok(summary) => paper.fast_summary = Some(summary.trim().to_string()),
                Err(e) => {
                    self.item_failed(Phase::FastSummary, &paper.id, &e);
                    paper.fast_summary = Some(SUMMARY_UNAVAILABLE.to_string());
                }
            }
            self.observer.on_event(&ProgressEvent::ItemCompleted {
                phase: Phase::FastSummary,
                index: i + 1,
                total,
            });
            self.throttle(i, total, self.config.fast_delay());
        }

        self.observer.on_event(&ProgressEvent::PhaseCompleted {
            phase: Phase::FastSummary,
            count: total,
        });
    }

    /// Set `deep_analysis` on every paper.
    ///
    /// `context` lists related papers for the prompt (first five, by title and
    /// year); the batch itself is used when it is `None`.
    pub fn analyze_papers_deep(&self, papers: &mut [Paper], context: Option<&[Paper]>) {
        let total = papers.len();
        let context_text = prompts::context_block(context.unwrap_or(&*papers));
        self.observer.on_event(&ProgressEvent::PhaseStarted {
            phase: Phase::DeepAnalysis,
            detail: self.analysis_model().to_string(),
        });

        for (i, paper) in papers.iter_mut().enumerate() {
            let request = self.analysis_request(prompts::deep_analysis(paper, &context_text), self.config.deep);
            let analysis = match self.analysis_client().complete(&request) {
                Ok(raw) => decode::decode_deep_analysis(&raw).unwrap_or_else(|e| {
                    log::debug!("Deep analysis for {} is not structured ({}), keeping raw text", paper.id, e);
                    DeepAnalysis::from_raw_text(raw)
                }),
                Err(e) => {
                    self.item_failed(Phase::DeepAnalysis, &paper.id, &e);
                    DeepAnalysis::default()
                }
            };
            paper.deep_analysis = Some(analysis);
            self.observer.on_event(&ProgressEvent::ItemCompleted {
                phase: Phase::DeepAnalysis,
                index: i + 1,
                total,
            });
            self.throttle(i, total, self.config.deep_delay());
        }

        self.observer.on_event(&ProgressEvent::PhaseCompleted {
            phase: Phase::DeepAnalysis,
            count: total,
        });
    }

    /// Cross-paper insights; all six lists empty when the call or decoding fails.
    pub fn extract_key_insights(&self, papers: &[Paper]) -> Insights {
        self.observer.on_event(&ProgressEvent::PhaseStarted {
            phase: Phase::Insights,
            detail: self.analysis_model().to_string(),
        });

        let request = self.analysis_request(prompts::insights(papers), self.config.insights);
        let result = self
            .analysis_client()
            .complete(&request)
            .map_err(|e| e.to_string())
            .and_then(|raw| decode::decode_insights(&raw).map_err(|e| e.to_string()));

        match result {
            Ok(insights) => {
                self.observer.on_event(&ProgressEvent::PhaseCompleted {
                    phase: Phase::Insights,
                    count: insights.sections().iter().map(|(_, entries)| entries.len()).sum(),
                });
                insights
            }
            Err(reason) => {
                self.warn(Phase::Insights, format!("Failed to extract insights: {}", reason));
                Insights::default()
            }
        }
    }

    /// Project proposals built from the gaps, themes and limitations; empty on failure.
    pub fn generate_research_directions(&self, papers: &[Paper], insights: &Insights) -> Vec<ResearchDirection> {
        self.observer.on_event(&ProgressEvent::PhaseStarted {
            phase: Phase::ResearchDirections,
            detail: self.analysis_model().to_string(),
        });

        let request = self.analysis_request(prompts::research_directions(papers.len(), insights), self.config.directions);
        let result = self
            .analysis_client()
            .complete(&request)
            .map_err(|e| e.to_string())
            .and_then(|raw| decode::decode_directions(&raw).map_err(|e| e.to_string()));

        match result {
            Ok(directions) => {
                self.observer.on_event(&ProgressEvent::PhaseCompleted {
                    phase: Phase::ResearchDirections,
                    count: directions.len(),
                });
                directions
            }
            Err(reason) => {
                self.warn(Phase::ResearchDirections, format!("Failed to generate directions: {}", reason));
                Vec::new()
            }
        }
    }

    fn item_failed(&self, phase: Phase, id: &str, error: &LlmError) {
        self.observer.on_event(&ProgressEvent::ItemFailed {
            phase,
            item: id.to_string(),
            reason: error.to_string(),
        });
    }

    fn warn(&self, phase: Phase, message: String) {
        self.observer.on_event(&ProgressEvent::Warning { phase, message });
    }

    /// Fixed pause between calls, skipped after the last one
    fn throttle(&self, index: usize, total: usize, delay: Duration) {
        if index + 1 < total && !delay.is_zero() {
            thread::sleep(delay);
        }
    }
}
