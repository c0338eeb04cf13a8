//! Match Ranking Service — turns a search request plus a candidate set into
//! an ordered, persisted list of matches.
//!
//! The deterministic scorer is the guaranteed baseline: the AI-enhancement
//! collaborator may adjust final scores, but its failures and timeouts are
//! absorbed here and never change the ranking order or abort a run.

use std::cmp::Ordering;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinSet;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::errors::EngineError;
use crate::matching::enhancement::{EnhancementContext, MatchEnhancer};
use crate::matching::scorer::{self, MatchScore};
use crate::models::{Match, Property, SearchRequest};
use crate::repository::{CandidateFilter, CrmRepository};

/// Per-call ranking knobs.
#[derive(Debug, Clone)]
pub struct RankOptions {
    /// Matches scoring below this algorithmic total are dropped.
    pub min_score: f64,
    pub limit: usize,
    /// None defers to the enhancement feature flag in configuration.
    pub use_ai: Option<bool>,
}

impl Default for RankOptions {
    fn default() -> Self {
        Self {
            min_score: 60.0,
            limit: 10,
            use_ai: None,
        }
    }
}

pub struct MatchingService {
    repo: Arc<dyn CrmRepository>,
    enhancer: Arc<dyn MatchEnhancer>,
    config: EngineConfig,
}

impl MatchingService {
    /// Configuration is validated here so a bad weight table fails at
    /// construction, never mid-ranking.
    pub fn new(
        repo: Arc<dyn CrmRepository>,
        enhancer: Arc<dyn MatchEnhancer>,
        config: EngineConfig,
    ) -> Result<Self, EngineError> {
        config.validate()?;
        Ok(Self {
            repo,
            enhancer,
            config,
        })
    }

    /// Repository-backed entry point: loads the request, pulls candidates,
    /// and ranks them. A missing request surfaces as `NotFound` before any
    /// scoring begins.
    pub async fn find_matches_for_request(
        &self,
        request_id: Uuid,
        options: &RankOptions,
    ) -> Result<Vec<Match>, EngineError> {
        let request = self
            .repo
            .get_request(request_id)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("search request {request_id}")))?;
        request.validate()?;

        let filter = CandidateFilter::for_request(&request, self.config.candidate_buffer);
        let candidates = self.repo.list_candidates(&filter).await?;
        debug!(
            "evaluating {} candidate properties for request {}",
            candidates.len(),
            request_id
        );

        self.rank_matches(&request, candidates, options).await
    }

    /// Scores, filters, orders, optionally AI-enhances, and persists matches
    /// for one request over the given candidates.
    ///
    /// Ordering is fully deterministic: total score descending, ties broken
    /// by more recent listing date (fresher inventory first), then by
    /// property id. Enhancement runs after ordering and does not reorder.
    pub async fn rank_matches(
        &self,
        request: &SearchRequest,
        candidates: Vec<Property>,
        options: &RankOptions,
    ) -> Result<Vec<Match>, EngineError> {
        if candidates.is_empty() {
            return Ok(Vec::new());
        }
        let candidate_count = candidates.len();

        let mut scored: Vec<(Property, MatchScore)> = candidates
            .into_iter()
            .filter(|property| passes_basic_filters(request, property, self.config.candidate_buffer))
            .map(|property| {
                let score = scorer::score(request, &property, &self.config.scoring);
                (property, score)
            })
            .filter(|(_, score)| score.total >= options.min_score)
            .collect();

        scored.sort_by(|a, b| {
            b.1.total
                .partial_cmp(&a.1.total)
                .unwrap_or(Ordering::Equal)
                .then_with(|| b.0.listed_at.cmp(&a.0.listed_at))
                .then_with(|| a.0.id.cmp(&b.0.id))
        });
        scored.truncate(options.limit);

        let mut matches: Vec<Match> = scored
            .iter()
            .map(|(property, score)| {
                Match::new(request.id, property.id, score.total, score.components)
            })
            .collect();

        let use_ai = options.use_ai.unwrap_or(self.config.enhancement.enabled);
        if use_ai && !matches.is_empty() {
            self.enhance_matches(&mut matches).await;
        }

        for m in &matches {
            self.repo.save_match(m).await?;
        }

        info!(
            "ranked {} matches for request {} from {} candidates (min_score {}, limit {})",
            matches.len(),
            request.id,
            candidate_count,
            options.min_score,
            options.limit
        );
        Ok(matches)
    }

    /// Runs the enhancement collaborator over the surviving matches.
    ///
    /// Calls are concurrent and failure-isolated: each has its own timeout,
    /// and any error or timeout leaves that match on its algorithmic score.
    async fn enhance_matches(&self, matches: &mut [Match]) {
        let timeout = Duration::from_secs(self.config.enhancement.timeout_secs);
        let mut calls: JoinSet<_> = JoinSet::new();

        for (idx, m) in matches.iter().enumerate() {
            let enhancer = Arc::clone(&self.enhancer);
            let context = EnhancementContext {
                request_id: m.request_id,
                property_id: m.property_id,
                algorithmic_score: m.score_total,
            };
            calls.spawn(async move {
                let outcome = tokio::time::timeout(timeout, enhancer.enhance(&context)).await;
                (idx, context, outcome)
            });
        }

        while let Some(joined) = calls.join_next().await {
            let Ok((idx, context, outcome)) = joined else {
                continue;
            };
            match outcome {
                Ok(Ok(enhanced)) => {
                    matches[idx].ai_score = Some(enhanced.final_score.clamp(0.0, 100.0));
                    matches[idx].ai_analysis = enhanced.analysis;
                }
                Ok(Err(e)) => warn!(
                    "match enhancement failed for request {} / property {}: {e}; keeping algorithmic score",
                    context.request_id, context.property_id
                ),
                Err(_) => warn!(
                    "match enhancement timed out after {}s for request {} / property {}; keeping algorithmic score",
                    timeout.as_secs(),
                    context.request_id,
                    context.property_id
                ),
            }
        }
    }
}

/// The original pre-scoring sanity filter: contract type must match, the
/// listing must still be active, the type must be acceptable, and price and
/// surface must fall within the buffered requested ranges.
fn passes_basic_filters(request: &SearchRequest, property: &Property, buffer: f64) -> bool {
    if property.status.is_closed() {
        return false;
    }
    if property.contract_type != request.contract_type {
        return false;
    }

    if !request.property_types.is_empty() {
        let matches_type = request
            .property_types
            .iter()
            .any(|wanted| wanted.trim().eq_ignore_ascii_case(property.property_type.trim()));
        if !matches_type {
            return false;
        }
    }

    if let (Some(price), Some(min), Some(max)) = (
        property.price_for(request.contract_type),
        request.budget_min,
        request.budget_max,
    ) {
        if price < min * (1.0 - buffer) || price > max * (1.0 + buffer) {
            return false;
        }
    }

    if let (Some(surface), Some(min), Some(max)) = (
        property.surface_sqm,
        request.surface_min,
        request.surface_max,
    ) {
        if surface < min * (1.0 - buffer) || surface > max * (1.0 + buffer) {
            return false;
        }
    }

    true
}
