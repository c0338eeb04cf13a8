use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::EngineError;
use crate::models::property::ContractType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriorityTier {
    Low,
    Medium,
    High,
    Urgent,
}

impl PriorityTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            PriorityTier::Low => "low",
            PriorityTier::Medium => "medium",
            PriorityTier::High => "high",
            PriorityTier::Urgent => "urgent",
        }
    }

    pub fn parse(value: &str) -> Result<Self, EngineError> {
        match value {
            "low" => Ok(PriorityTier::Low),
            "medium" => Ok(PriorityTier::Medium),
            "high" => Ok(PriorityTier::High),
            "urgent" => Ok(PriorityTier::Urgent),
            other => Err(EngineError::MalformedEntity(format!(
                "unknown priority tier '{other}'"
            ))),
        }
    }
}

/// A client's search criteria. Read-only to the scoring core; the
/// contact-facing workflow that creates and revises it lives elsewhere.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchRequest {
    pub id: Uuid,
    pub contact_id: Uuid,
    pub contract_type: ContractType,
    /// Ordered, most-preferred first.
    pub preferred_zones: Vec<String>,
    pub budget_min: Option<f64>,
    pub budget_max: Option<f64>,
    pub property_types: Vec<String>,
    pub surface_min: Option<f64>,
    pub surface_max: Option<f64>,
    /// The date by which the client needs the property available.
    pub needed_by: Option<NaiveDate>,
    pub priority: PriorityTier,
    pub updated_at: DateTime<Utc>,
}

impl SearchRequest {
    /// Range invariants: min ≤ max when both bounds are present.
    pub fn validate(&self) -> Result<(), EngineError> {
        if let (Some(min), Some(max)) = (self.budget_min, self.budget_max) {
            if min > max {
                return Err(EngineError::MalformedEntity(format!(
                    "request {}: budget min {min} exceeds max {max}",
                    self.id
                )));
            }
        }
        if let (Some(min), Some(max)) = (self.surface_min, self.surface_max) {
            if min > max {
                return Err(EngineError::MalformedEntity(format!(
                    "request {}: surface min {min} exceeds max {max}",
                    self.id
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_request() -> SearchRequest {
        SearchRequest {
            id: Uuid::new_v4(),
            contact_id: Uuid::new_v4(),
            contract_type: ContractType::Sale,
            preferred_zones: vec!["Brera".to_string()],
            budget_min: Some(300_000.0),
            budget_max: Some(450_000.0),
            property_types: vec!["apartment".to_string()],
            surface_min: Some(60.0),
            surface_max: Some(90.0),
            needed_by: None,
            priority: PriorityTier::Medium,
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_valid_ranges_pass() {
        make_request().validate().unwrap();
    }

    #[test]
    fn test_inverted_budget_rejected() {
        let mut request = make_request();
        request.budget_min = Some(500_000.0);
        assert!(matches!(
            request.validate(),
            Err(EngineError::MalformedEntity(_))
        ));
    }

    #[test]
    fn test_half_open_ranges_pass() {
        let mut request = make_request();
        request.budget_max = None;
        request.surface_min = None;
        request.validate().unwrap();
    }
}
