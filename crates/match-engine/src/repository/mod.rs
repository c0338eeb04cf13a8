// Persistence seam. The engine only ever talks to `CrmRepository`; the
// Postgres implementation lives in `pg`.

pub mod pg;

use async_trait::async_trait;
use uuid::Uuid;

use crate::errors::EngineError;
use crate::models::{Building, ContractType, Match, Property, SearchRequest};

pub use pg::PgRepository;

/// Default cap on candidate listings pulled for one ranking run.
pub const DEFAULT_CANDIDATE_LIMIT: i64 = 500;

/// Narrowing criteria for candidate listing, derived from a request with a
/// buffer so that near-range properties still reach the scorer.
#[derive(Debug, Clone)]
pub struct CandidateFilter {
    pub contract_type: ContractType,
    pub property_types: Vec<String>,
    pub price_min: Option<f64>,
    pub price_max: Option<f64>,
    pub surface_min: Option<f64>,
    pub surface_max: Option<f64>,
    pub limit: i64,
}

impl CandidateFilter {
    pub fn for_request(request: &SearchRequest, buffer: f64) -> Self {
        Self {
            contract_type: request.contract_type,
            property_types: request.property_types.clone(),
            price_min: request.budget_min.map(|v| v * (1.0 - buffer)),
            price_max: request.budget_max.map(|v| v * (1.0 + buffer)),
            surface_min: request.surface_min.map(|v| v * (1.0 - buffer)),
            surface_max: request.surface_max.map(|v| v * (1.0 + buffer)),
            limit: DEFAULT_CANDIDATE_LIMIT,
        }
    }
}

/// The persistence collaborator the engine depends on.
#[async_trait]
pub trait CrmRepository: Send + Sync {
    async fn get_request(&self, id: Uuid) -> Result<Option<SearchRequest>, EngineError>;

    async fn get_property(&self, id: Uuid) -> Result<Option<Property>, EngineError>;

    async fn get_building(&self, id: Uuid) -> Result<Option<Building>, EngineError>;

    async fn list_candidates(&self, filter: &CandidateFilter)
        -> Result<Vec<Property>, EngineError>;

    /// The whole portfolio, for global urgency recalculation.
    async fn list_properties(&self) -> Result<Vec<Property>, EngineError>;

    async fn list_building_properties(
        &self,
        building_id: Uuid,
    ) -> Result<Vec<Property>, EngineError>;

    async fn save_match(&self, m: &Match) -> Result<(), EngineError>;

    async fn update_property_urgency(&self, id: Uuid, score: u8) -> Result<(), EngineError>;

    async fn update_building_urgency(&self, id: Uuid, score: u8) -> Result<(), EngineError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PriorityTier;
    use chrono::Utc;

    #[test]
    fn test_candidate_filter_applies_buffer() {
        let request = SearchRequest {
            id: Uuid::new_v4(),
            contact_id: Uuid::new_v4(),
            contract_type: ContractType::Sale,
            preferred_zones: vec![],
            budget_min: Some(300_000.0),
            budget_max: Some(450_000.0),
            property_types: vec!["apartment".to_string()],
            surface_min: Some(60.0),
            surface_max: Some(90.0),
            needed_by: None,
            priority: PriorityTier::Medium,
            updated_at: Utc::now(),
        };
        let filter = CandidateFilter::for_request(&request, 0.2);
        assert_eq!(filter.price_min, Some(240_000.0));
        assert_eq!(filter.price_max, Some(540_000.0));
        assert_eq!(filter.surface_min, Some(48.0));
        assert_eq!(filter.surface_max, Some(108.0));
        assert_eq!(filter.limit, DEFAULT_CANDIDATE_LIMIT);
    }

    #[test]
    fn test_candidate_filter_keeps_open_bounds_open() {
        let request = SearchRequest {
            id: Uuid::new_v4(),
            contact_id: Uuid::new_v4(),
            contract_type: ContractType::Rent,
            preferred_zones: vec![],
            budget_min: None,
            budget_max: None,
            property_types: vec![],
            surface_min: None,
            surface_max: None,
            needed_by: None,
            priority: PriorityTier::Low,
            updated_at: Utc::now(),
        };
        let filter = CandidateFilter::for_request(&request, 0.2);
        assert!(filter.price_min.is_none());
        assert!(filter.price_max.is_none());
        assert!(filter.property_types.is_empty());
    }
}
