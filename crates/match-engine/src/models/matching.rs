use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::ComponentWeights;
use crate::errors::EngineError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    Suggested,
    Contacted,
    Rejected,
    Converted,
}

impl MatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchStatus::Suggested => "suggested",
            MatchStatus::Contacted => "contacted",
            MatchStatus::Rejected => "rejected",
            MatchStatus::Converted => "converted",
        }
    }

    pub fn parse(value: &str) -> Result<Self, EngineError> {
        match value {
            "suggested" => Ok(MatchStatus::Suggested),
            "contacted" => Ok(MatchStatus::Contacted),
            "rejected" => Ok(MatchStatus::Rejected),
            "converted" => Ok(MatchStatus::Converted),
            other => Err(EngineError::MalformedEntity(format!(
                "unknown match status '{other}'"
            ))),
        }
    }
}

/// Per-component scores, each normalized to [0,100] before weighting.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub zone: f64,
    pub budget: f64,
    #[serde(rename = "type")]
    pub type_match: f64,
    pub surface: f64,
    pub availability: f64,
    pub priority: f64,
    pub affinity: f64,
}

impl ScoreBreakdown {
    /// Weighted sum of the components. The total score invariant is exactly
    /// this value.
    pub fn weighted_total(&self, weights: &ComponentWeights) -> f64 {
        self.zone * weights.zone
            + self.budget * weights.budget
            + self.type_match * weights.type_match
            + self.surface * weights.surface
            + self.availability * weights.availability
            + self.priority * weights.priority
            + self.affinity * weights.affinity
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchQuality {
    Excellent,
    Good,
    Fair,
    Poor,
}

/// A persisted request↔property scoring result. Immutable once created,
/// except for the status transitions driven by downstream human action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Match {
    pub id: Uuid,
    pub request_id: Uuid,
    pub property_id: Uuid,
    /// Deterministic algorithmic total, 0–100.
    pub score_total: f64,
    pub breakdown: ScoreBreakdown,
    /// AI-adjusted score, present only when the enhancement collaborator
    /// answered in time.
    pub ai_score: Option<f64>,
    pub ai_analysis: Option<String>,
    pub status: MatchStatus,
    pub created_at: DateTime<Utc>,
}

impl Match {
    pub fn new(request_id: Uuid, property_id: Uuid, total: f64, breakdown: ScoreBreakdown) -> Self {
        Self {
            id: Uuid::new_v4(),
            request_id,
            property_id,
            score_total: total,
            breakdown,
            ai_score: None,
            ai_analysis: None,
            status: MatchStatus::Suggested,
            created_at: Utc::now(),
        }
    }

    /// The score callers should present: AI-adjusted when present, otherwise
    /// the algorithmic baseline.
    pub fn final_score(&self) -> f64 {
        self.ai_score.unwrap_or(self.score_total)
    }

    pub fn quality(&self) -> MatchQuality {
        match self.score_total {
            s if s >= 80.0 => MatchQuality::Excellent,
            s if s >= 60.0 => MatchQuality::Good,
            s if s >= 40.0 => MatchQuality::Fair,
            _ => MatchQuality::Poor,
        }
    }
}
