//! AI Enhancement collaborator — the single point of entry for the external
//! AI matching service.
//!
//! The collaborator is strictly optional: it may adjust a match's final
//! score, but the deterministic algorithmic score is always sufficient. The
//! ranking service wraps every call in a timeout and falls back silently on
//! any failure, so nothing in this module is allowed to block or fail a
//! ranking. One attempt per match, no retries — a stale AI adjustment is not
//! correctness-critical.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum EnhanceError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("AI backend error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("AI backend returned no final score")]
    EmptyScore,
}

/// Everything the collaborator needs to judge one match.
#[derive(Debug, Clone, Copy)]
pub struct EnhancementContext {
    pub request_id: Uuid,
    pub property_id: Uuid,
    pub algorithmic_score: f64,
}

/// The collaborator's verdict.
#[derive(Debug, Clone)]
pub struct EnhancedScore {
    pub final_score: f64,
    pub analysis: Option<String>,
}

/// Pluggable enhancement strategy, injected into the ranking service as
/// `Arc<dyn MatchEnhancer>` and swapped at startup via configuration.
#[async_trait]
pub trait MatchEnhancer: Send + Sync {
    async fn enhance(&self, context: &EnhancementContext) -> Result<EnhancedScore, EnhanceError>;
}

#[derive(Debug, Serialize)]
struct EnhanceRequest {
    request_id: String,
    property_id: String,
    algorithmic_score: u32,
}

#[derive(Debug, Deserialize)]
struct EnhanceResponse {
    #[serde(default)]
    success: bool,
    #[serde(rename = "finalScore")]
    final_score: Option<f64>,
    #[serde(rename = "aiAnalysis")]
    ai_analysis: Option<String>,
}

/// HTTP client for the AI backend's `/ai/matching/enhance` endpoint.
#[derive(Clone)]
pub struct HttpMatchEnhancer {
    client: Client,
    base_url: String,
}

impl HttpMatchEnhancer {
    pub fn new(base_url: String, timeout: std::time::Duration) -> Self {
        Self {
            client: Client::builder()
                .timeout(timeout)
                .build()
                .expect("Failed to build HTTP client"),
            base_url,
        }
    }
}

#[async_trait]
impl MatchEnhancer for HttpMatchEnhancer {
    async fn enhance(&self, context: &EnhancementContext) -> Result<EnhancedScore, EnhanceError> {
        let body = EnhanceRequest {
            request_id: context.request_id.to_string(),
            property_id: context.property_id.to_string(),
            algorithmic_score: context.algorithmic_score.round().clamp(0.0, 100.0) as u32,
        };

        let response = self
            .client
            .post(format!("{}/ai/matching/enhance", self.base_url))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(EnhanceError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: EnhanceResponse = response.json().await?;
        if !parsed.success {
            return Err(EnhanceError::EmptyScore);
        }
        let final_score = parsed.final_score.ok_or(EnhanceError::EmptyScore)?;

        Ok(EnhancedScore {
            final_score: final_score.clamp(0.0, 100.0),
            analysis: parsed.ai_analysis,
        })
    }
}

/// Builds the enhancer the configuration asks for: the HTTP client when the
/// feature flag is on, the no-op echo otherwise.
pub fn enhancer_from_config(config: &crate::config::EnhancementConfig) -> Arc<dyn MatchEnhancer> {
    if config.enabled {
        Arc::new(HttpMatchEnhancer::new(
            config.base_url.clone(),
            std::time::Duration::from_secs(config.timeout_secs),
        ))
    } else {
        Arc::new(NoopEnhancer)
    }
}

/// Enhancement strategy used when the feature flag is off: echoes the
/// algorithmic score unchanged.
pub struct NoopEnhancer;

#[async_trait]
impl MatchEnhancer for NoopEnhancer {
    async fn enhance(&self, context: &EnhancementContext) -> Result<EnhancedScore, EnhanceError> {
        Ok(EnhancedScore {
            final_score: context.algorithmic_score,
            analysis: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enhance_response_parses_backend_payload() {
        let raw = r#"{"success": true, "algorithmicScore": 85, "finalScore": 91.0, "aiAnalysis": "Strong semantic fit."}"#;
        let parsed: EnhanceResponse = serde_json::from_str(raw).unwrap();
        assert!(parsed.success);
        assert_eq!(parsed.final_score, Some(91.0));
        assert_eq!(parsed.ai_analysis.as_deref(), Some("Strong semantic fit."));
    }

    #[test]
    fn test_enhance_response_tolerates_missing_fields() {
        let parsed: EnhanceResponse = serde_json::from_str(r#"{"success": false}"#).unwrap();
        assert!(!parsed.success);
        assert!(parsed.final_score.is_none());
    }

    #[test]
    fn test_enhance_request_serializes_ids_and_rounded_score() {
        let context = EnhancementContext {
            request_id: Uuid::nil(),
            property_id: Uuid::nil(),
            algorithmic_score: 94.75,
        };
        let body = EnhanceRequest {
            request_id: context.request_id.to_string(),
            property_id: context.property_id.to_string(),
            algorithmic_score: context.algorithmic_score.round().clamp(0.0, 100.0) as u32,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["algorithmic_score"], 95);
        assert_eq!(json["request_id"], Uuid::nil().to_string());
    }

    #[test]
    fn test_enhancer_from_config_respects_feature_flag() {
        let mut config = crate::config::EnhancementConfig::default();
        config.enabled = false;
        // The flag-off path must never build an HTTP client.
        let _noop = enhancer_from_config(&config);
        config.enabled = true;
        let _http = enhancer_from_config(&config);
    }

    #[tokio::test]
    async fn test_noop_enhancer_echoes_algorithmic_score() {
        let context = EnhancementContext {
            request_id: Uuid::new_v4(),
            property_id: Uuid::new_v4(),
            algorithmic_score: 72.5,
        };
        let result = NoopEnhancer.enhance(&context).await.unwrap();
        assert_eq!(result.final_score, 72.5);
        assert!(result.analysis.is_none());
    }
}
