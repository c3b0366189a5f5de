//! Bounded state machine answering one question.
//!
//! ```text
//! DetectKeywords → Retrieve → CheckRelevance → Generate → Done
//!                     ↑             │
//!                     └─────────────┘  (at most max_reretrieves times)
//! ```
//!
//! With branching disabled the machine is the straight line
//! `DetectKeywords → Retrieve → Generate → Done`.
//!
//! Every transition takes the state by value and returns the next state, so
//! each one can be exercised on its own. The only awaits are the embedding
//! call inside `Retrieve` and the generation call inside `Generate`; both
//! observe the query's cancellation token. Failures are terminal for the
//! query and are never retried here.

use super::context::format_context;
use super::index::VectorIndex;
use super::prompt::{build_prompt, PromptTemplates};
use super::relevance::{LengthScorer, RelevanceGate, RelevanceScorer};
use super::retriever::{RetrievalMode, RetrievalQuery, RetrieveError, Retriever};
use super::types::Document;
use crate::config::{Config, KeywordPrompt, LlmConfig};
use crate::provider::{GenerateRequest, Provider, ProviderError};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Appended to the question on every retrieval after the first.
pub const RERETRIEVE_MARKER: &str = " (detailed search)";

/// States of the answering machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    DetectKeywords,
    Retrieve,
    CheckRelevance,
    Generate,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::DetectKeywords => "detect_keywords",
            Stage::Retrieve => "retrieve",
            Stage::CheckRelevance => "check_relevance",
            Stage::Generate => "generate",
            Stage::Done => "done",
        };
        f.write_str(name)
    }
}

/// Errors that end a query.
#[derive(Debug, Error)]
pub enum AnswerError {
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// Embedding failed or the query vector did not fit the index.
    #[error("retrieve stage failed: {0}")]
    Retrieve(#[source] RetrieveError),

    #[error("generate stage failed: {0}")]
    Generation(#[source] ProviderError),

    #[error("{stage} stage cancelled")]
    Cancelled { stage: Stage },
}

impl AnswerError {
    /// The stage that failed; `None` for requests rejected before running.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            AnswerError::InvalidQuery(_) => None,
            AnswerError::Retrieve(_) => Some(Stage::Retrieve),
            AnswerError::Generation(_) => Some(Stage::Generate),
            AnswerError::Cancelled { stage } => Some(*stage),
        }
    }
}

impl From<RetrieveError> for AnswerError {
    fn from(error: RetrieveError) -> Self {
        match error {
            RetrieveError::InvalidQuery(msg) => AnswerError::InvalidQuery(msg),
            RetrieveError::Cancelled => AnswerError::Cancelled {
                stage: Stage::Retrieve,
            },
            other => AnswerError::Retrieve(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, AnswerError>;

/// State threaded through the machine for one question.
///
/// `context` and `answer` stay `None` until `Generate` has run.
#[derive(Debug, Clone, PartialEq)]
pub struct RagState {
    pub question: String,
    pub documents: Vec<Document>,
    pub context: Option<String>,
    pub answer: Option<String>,
    pub retrieval_count: usize,
    pub keywords_detected: Vec<String>,
}

impl RagState {
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            documents: Vec::new(),
            context: None,
            answer: None,
            retrieval_count: 0,
            keywords_detected: Vec::new(),
        }
    }

    /// Re-retrievals performed so far (rounds after the first).
    pub fn reretrieves_done(&self) -> usize {
        self.retrieval_count.saturating_sub(1)
    }

    /// Text sent to the retriever for the next round.
    pub fn retrieval_text(&self) -> String {
        if self.retrieval_count > 0 {
            format!("{}{}", self.question, RERETRIEVE_MARKER)
        } else {
            self.question.clone()
        }
    }
}

/// What a caller gets back for a question.
#[derive(Debug, Clone, Serialize)]
pub struct Answer {
    pub answer: String,
    pub documents: Vec<Document>,
    pub retrieval_count: usize,
    pub keywords_detected: Vec<String>,
}

impl From<RagState> for Answer {
    fn from(state: RagState) -> Self {
        Self {
            answer: state.answer.unwrap_or_default(),
            documents: state.documents,
            retrieval_count: state.retrieval_count,
            keywords_detected: state.keywords_detected,
        }
    }
}

/// Per-query knobs.
#[derive(Debug, Clone)]
pub struct AnswerOptions {
    pub k: usize,
    pub use_mmr: bool,
    pub mmr_diversity: f32,
    pub max_reretrieves: usize,
    pub enable_branching: bool,
    pub keyword_templates: Vec<KeywordPrompt>,
    pub reretrieve_threshold: f32,
    pub max_context_docs: usize,
    pub relevance_saturation_chars: f32,
}

impl Default for AnswerOptions {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl AnswerOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            k: config.retrieval.k,
            use_mmr: config.retrieval.use_mmr,
            mmr_diversity: config.retrieval.mmr_diversity,
            max_reretrieves: config.graph.max_reretrieves,
            enable_branching: config.graph.enable_branching,
            keyword_templates: config.graph.keyword_prompts.clone(),
            reretrieve_threshold: config.graph.reretrieve_threshold,
            max_context_docs: config.retrieval.max_context_docs,
            relevance_saturation_chars: config.graph.relevance_saturation_chars,
        }
    }
}

/// Validated form of [`AnswerOptions`] for one run.
struct Plan {
    query: RetrievalQuery,
    templates: PromptTemplates,
    gate: RelevanceGate,
    enable_branching: bool,
    max_context_docs: usize,
}

/// Runs the answering machine against a retriever and a generator.
///
/// Holds no per-query state; one instance serves any number of concurrent
/// questions.
#[derive(Clone)]
pub struct Orchestrator {
    retriever: Retriever,
    generator: Arc<dyn Provider>,
    llm: LlmConfig,
    scorer: Option<Arc<dyn RelevanceScorer>>,
}

impl Orchestrator {
    pub fn new(retriever: Retriever, generator: Arc<dyn Provider>, llm: LlmConfig) -> Self {
        Self {
            retriever,
            generator,
            llm,
            scorer: None,
        }
    }

    /// Replaces the default length-based relevance scorer.
    pub fn with_scorer(mut self, scorer: Arc<dyn RelevanceScorer>) -> Self {
        self.scorer = Some(scorer);
        self
    }

    pub fn index(&self) -> &VectorIndex {
        self.retriever.index()
    }

    /// Answers `question`.
    ///
    /// # Arguments
    ///
    /// * `question` - Raw user question; must not be blank
    /// * `options` - Retrieval, branching and prompt settings for this query
    ///
    /// # Returns
    ///
    /// The generated answer with the documents of the final retrieval round,
    /// the number of rounds run and the detected keywords.
    pub async fn answer(&self, question: &str, options: &AnswerOptions) -> Result<Answer> {
        self.answer_with_cancel(question, options, &CancellationToken::new())
            .await
    }

    pub async fn answer_with_cancel(
        &self,
        question: &str,
        options: &AnswerOptions,
        cancel: &CancellationToken,
    ) -> Result<Answer> {
        self.run(question, options, cancel).await.map(Answer::from)
    }

    /// Runs the machine to `Done` and returns the full final state.
    pub async fn run(
        &self,
        question: &str,
        options: &AnswerOptions,
        cancel: &CancellationToken,
    ) -> Result<RagState> {
        let plan = self.plan(question, options)?;

        let mut state = RagState::new(question);
        let mut stage = Stage::DetectKeywords;

        loop {
            debug!(%stage, retrieval_count = state.retrieval_count, "Entering stage");
            match stage {
                Stage::DetectKeywords => {
                    state = detect_keywords(state, &plan.templates);
                    stage = Stage::Retrieve;
                }
                Stage::Retrieve => {
                    state = self.retrieve(state, &plan, cancel).await?;
                    stage = if plan.enable_branching {
                        Stage::CheckRelevance
                    } else {
                        Stage::Generate
                    };
                }
                Stage::CheckRelevance => {
                    let (next_state, next) = check_relevance(state, &plan.gate);
                    state = next_state;
                    stage = next;
                }
                Stage::Generate => {
                    state = self.generate(state, &plan.templates, cancel).await?;
                    stage = Stage::Done;
                }
                Stage::Done => break,
            }
        }

        info!(
            retrieval_count = state.retrieval_count,
            documents = state.documents.len(),
            keywords = ?state.keywords_detected,
            "Answered question"
        );
        Ok(state)
    }

    fn plan(&self, question: &str, options: &AnswerOptions) -> Result<Plan> {
        if question.trim().is_empty() {
            return Err(AnswerError::InvalidQuery("question is empty".to_string()));
        }
        if options.max_context_docs == 0 {
            return Err(AnswerError::InvalidQuery(
                "max_context_docs must be at least 1".to_string(),
            ));
        }

        let mode = RetrievalMode::from_options(options.use_mmr, options.mmr_diversity)?;
        let query = RetrievalQuery::new(question, options.k, mode)?;

        let scorer = self.scorer.clone().unwrap_or_else(|| {
            Arc::new(LengthScorer {
                saturation_chars: options.relevance_saturation_chars,
            })
        });

        Ok(Plan {
            query,
            templates: PromptTemplates::new(options.keyword_templates.clone()),
            gate: RelevanceGate::new(scorer, options.reretrieve_threshold, options.max_reretrieves),
            enable_branching: options.enable_branching,
            max_context_docs: options.max_context_docs,
        })
    }

    /// `Retrieve`: fetches documents for the (possibly broadened) question.
    async fn retrieve(
        &self,
        mut state: RagState,
        plan: &Plan,
        cancel: &CancellationToken,
    ) -> Result<RagState> {
        let query = plan.query.with_text(state.retrieval_text());
        let results = self.retriever.retrieve_with_cancel(&query, cancel).await?;

        state.documents = results
            .into_iter()
            .take(plan.max_context_docs)
            .map(|r| r.document)
            .collect();
        state.retrieval_count += 1;

        info!(
            round = state.retrieval_count,
            query = %query.text(),
            documents = state.documents.len(),
            "Retrieval round complete"
        );
        Ok(state)
    }

    /// `Generate`: builds the prompt and asks the generator for the answer.
    async fn generate(
        &self,
        mut state: RagState,
        templates: &PromptTemplates,
        cancel: &CancellationToken,
    ) -> Result<RagState> {
        let context = format_context(&state.documents);
        let instruction = templates.template_for(&state.keywords_detected);
        let prompt = build_prompt(instruction, &state.question, &context);

        let request = GenerateRequest::new(&self.llm.model, prompt)
            .with_temperature(self.llm.temperature)
            .with_top_p(self.llm.top_p)
            .with_top_k(self.llm.top_k);

        debug!(model = %self.llm.model, documents = state.documents.len(), "Generating answer");
        let answer = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return Err(AnswerError::Cancelled { stage: Stage::Generate });
            }
            result = self.generator.generate(request) => result.map_err(AnswerError::Generation)?,
        };

        state.context = Some(context);
        state.answer = Some(answer);
        Ok(state)
    }
}

/// `DetectKeywords`: records every registered keyword found in the question.
pub fn detect_keywords(mut state: RagState, templates: &PromptTemplates) -> RagState {
    state.keywords_detected = templates.detect(&state.question);
    if !state.keywords_detected.is_empty() {
        debug!(keywords = ?state.keywords_detected, "Detected keywords");
    }
    state
}

/// `CheckRelevance`: chooses between another retrieval round and generation.
pub fn check_relevance(state: RagState, gate: &RelevanceGate) -> (RagState, Stage) {
    let decision = gate.assess(&state.documents, state.reretrieves_done());
    debug!(
        relevance = ?decision.relevance,
        reretrieves_done = state.reretrieves_done(),
        max_reretrieves = gate.max_reretrieves(),
        needs_reretrieve = decision.needs_reretrieve,
        "Checked relevance"
    );

    let next = if decision.needs_reretrieve {
        Stage::Retrieve
    } else {
        Stage::Generate
    };
    (state, next)
}
