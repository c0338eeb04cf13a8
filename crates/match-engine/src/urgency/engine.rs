//! Urgency scoring — a deterministic, explainable 0–5 attention signal per
//! property, aggregated to buildings, plus the recompute triggers that write
//! the cached scores back through the repository.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::UrgencyConfig;
use crate::errors::EngineError;
use crate::models::Property;
use crate::repository::CrmRepository;
use crate::urgency::signals;

// ────────────────────────────────────────────────────────────────────────────
// Pure scoring
// ────────────────────────────────────────────────────────────────────────────

/// Per-signal breakdown of one urgency computation, for explainability.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UrgencyBreakdown {
    pub age: f64,
    pub price_change: f64,
    pub activity: f64,
    pub combined: f64,
    pub score: u8,
}

/// Computes the 0–5 urgency score for a property.
///
/// Closed listings (sold/rented/archived) are terminal and score 0. Listings
/// younger than the new-listing window score the configured floor — "new"
/// must not be mistaken for "stagnant". Everything else combines the
/// weighted signals and maps the result through the band cut points.
///
/// Pure: no side effects, deterministic for a given `now`. Persisting the
/// score onto the entity is the caller's responsibility.
pub fn compute_property_urgency(
    property: &Property,
    now: DateTime<Utc>,
    config: &UrgencyConfig,
) -> u8 {
    compute_property_urgency_breakdown(property, now, config).score
}

/// Same computation with the per-signal breakdown exposed.
pub fn compute_property_urgency_breakdown(
    property: &Property,
    now: DateTime<Utc>,
    config: &UrgencyConfig,
) -> UrgencyBreakdown {
    if property.status.is_closed() {
        return UrgencyBreakdown {
            age: 0.0,
            price_change: 0.0,
            activity: 0.0,
            combined: 0.0,
            score: 0,
        };
    }

    let age_days = signals::age_days(property.listed_at, now);

    // New-listing override: a fixed low-urgency floor, regardless of the
    // other signals.
    if let Some(days) = age_days {
        if (days as i64) < config.new_listing_days {
            return UrgencyBreakdown {
                age: 0.0,
                price_change: 0.0,
                activity: 0.0,
                combined: 0.0,
                score: config.new_listing_floor.min(5),
            };
        }
    }

    let age = signals::age_signal(age_days, config);
    let price_change = signals::price_change_signal(&property.price_history, now, config);
    let activity = signals::activity_deficit_signal(
        property.views_count,
        property.contacts_count,
        age_days,
        config,
    );

    let weights = &config.signal_weights;
    // Past the override window the new-listing signal contributes nothing.
    let combined = (weights.age * age
        + weights.price_change * price_change
        + weights.activity * activity)
        .clamp(0.0, 1.0);

    UrgencyBreakdown {
        age,
        price_change,
        activity,
        combined,
        score: band(combined, &config.band_cuts),
    }
}

/// Maps a combined [0,1] value to an integer band: the number of cut points
/// at or below the value (floor semantics at each boundary).
fn band(combined: f64, cuts: &[f64; 5]) -> u8 {
    cuts.iter().filter(|cut| combined >= **cut).count() as u8
}

/// Aggregate urgency for a building: the maximum score among member
/// properties that are still active, 0 if none qualify.
///
/// Reads the members' cached scores — freshness is the caller's concern.
pub fn compute_building_urgency(members: &[Property]) -> u8 {
    members
        .iter()
        .filter(|p| !p.status.is_closed())
        .map(|p| p.urgency_score)
        .max()
        .unwrap_or(0)
}

/// Display band for a 0–5 urgency score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UrgencyLevel {
    Closed,
    New,
    Optimal,
    Monitor,
    Warning,
    Urgent,
}

impl UrgencyLevel {
    pub fn from_score(score: u8) -> Self {
        match score {
            0 => UrgencyLevel::Closed,
            1 => UrgencyLevel::New,
            2 => UrgencyLevel::Optimal,
            3 => UrgencyLevel::Monitor,
            4 => UrgencyLevel::Warning,
            _ => UrgencyLevel::Urgent,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Recompute triggers
// ────────────────────────────────────────────────────────────────────────────

/// Outcome of a recompute trigger: how much was touched, and how the
/// recomputed property scores distribute over the six bands.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecalcSummary {
    pub properties_updated: usize,
    pub buildings_updated: usize,
    /// Count of recomputed properties per score 0..=5.
    pub distribution: [usize; 6],
}

impl RecalcSummary {
    fn record(&mut self, score: u8) {
        self.properties_updated += 1;
        self.distribution[usize::from(score.min(5))] += 1;
    }
}

/// Explicit, idempotent urgency recomputation over the repository: one
/// property, one building's members, or the whole portfolio. Never invoked
/// implicitly — the source-of-truth inputs (views, price changes) arrive
/// asynchronously, so staleness between triggers is tolerated by design.
pub struct UrgencyService {
    repo: Arc<dyn CrmRepository>,
    config: UrgencyConfig,
}

impl UrgencyService {
    pub fn new(repo: Arc<dyn CrmRepository>, config: UrgencyConfig) -> Self {
        Self { repo, config }
    }

    /// Recomputes a single property, then refreshes its building aggregate.
    pub async fn recompute_property(&self, property_id: Uuid) -> Result<RecalcSummary, EngineError> {
        let property = self
            .repo
            .get_property(property_id)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("property {property_id}")))?;

        let now = Utc::now();
        let mut summary = RecalcSummary::default();

        let score = compute_property_urgency(&property, now, &self.config);
        self.repo.update_property_urgency(property.id, score).await?;
        summary.record(score);
        debug!("property {} urgency recomputed to {}", property.id, score);

        if let Some(building_id) = property.building_id {
            self.refresh_building(building_id, &mut summary).await?;
        }

        info!(
            "urgency recomputed for property {}: {} ({:?})",
            property_id,
            score,
            UrgencyLevel::from_score(score)
        );
        Ok(summary)
    }

    /// Recomputes every property in a building, then the building aggregate.
    pub async fn recompute_building(&self, building_id: Uuid) -> Result<RecalcSummary, EngineError> {
        self.repo
            .get_building(building_id)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("building {building_id}")))?;

        let properties = self.repo.list_building_properties(building_id).await?;
        let now = Utc::now();
        let mut summary = RecalcSummary::default();

        for property in &properties {
            let score = compute_property_urgency(property, now, &self.config);
            self.repo.update_property_urgency(property.id, score).await?;
            summary.record(score);
        }

        self.refresh_building(building_id, &mut summary).await?;

        info!(
            "urgency recomputed for building {}: {} properties",
            building_id, summary.properties_updated
        );
        Ok(summary)
    }

    /// Global recalculation over the whole portfolio.
    pub async fn recompute_portfolio(&self) -> Result<RecalcSummary, EngineError> {
        let properties = self.repo.list_properties().await?;
        info!("recomputing urgency for {} properties", properties.len());

        let now = Utc::now();
        let mut summary = RecalcSummary::default();
        let mut building_ids = std::collections::BTreeSet::new();

        for property in &properties {
            let score = compute_property_urgency(property, now, &self.config);
            self.repo.update_property_urgency(property.id, score).await?;
            summary.record(score);
            if let Some(building_id) = property.building_id {
                building_ids.insert(building_id);
            }
        }

        for building_id in building_ids {
            self.refresh_building(building_id, &mut summary).await?;
        }

        info!(
            "portfolio urgency recomputed: {} properties, {} buildings",
            summary.properties_updated, summary.buildings_updated
        );
        Ok(summary)
    }

    /// Re-reads a building's members (with their freshly written scores) and
    /// writes the max-aggregate back.
    async fn refresh_building(
        &self,
        building_id: Uuid,
        summary: &mut RecalcSummary,
    ) -> Result<(), EngineError> {
        let members = self.repo.list_building_properties(building_id).await?;
        let aggregate = compute_building_urgency(&members);
        self.repo
            .update_building_urgency(building_id, aggregate)
            .await?;
        summary.buildings_updated += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Building, ContractType, PriceChange, PropertyStatus};
    use crate::repository::CandidateFilter;
    use crate::models::{Match, SearchRequest};
    use async_trait::async_trait;
    use chrono::Duration;
    use std::collections::HashMap;
    use std::sync::Mutex;

    fn make_property(status: PropertyStatus, listed_days_ago: Option<i64>) -> Property {
        Property {
            id: Uuid::new_v4(),
            building_id: None,
            zone: Some("Brera".to_string()),
            property_type: "apartment".to_string(),
            contract_type: ContractType::Sale,
            price_sale: Some(380_000.0),
            price_rent_monthly: None,
            surface_sqm: Some(75.0),
            status,
            available_from: None,
            listed_at: listed_days_ago.map(|d| Utc::now() - Duration::days(d)),
            price_history: vec![],
            views_count: 0,
            contacts_count: 0,
            urgency_score: 0,
        }
    }

    fn config() -> UrgencyConfig {
        UrgencyConfig::default()
    }

    #[test]
    fn test_sold_and_archived_score_zero() {
        let now = Utc::now();
        for status in [
            PropertyStatus::Sold,
            PropertyStatus::Rented,
            PropertyStatus::Archived,
        ] {
            // Even a maximally stagnant listing scores 0 once closed.
            let mut property = make_property(status, Some(200));
            property.price_history = vec![PriceChange {
                changed_at: now,
                old_price: 400_000.0,
                new_price: 300_000.0,
            }];
            assert_eq!(compute_property_urgency(&property, now, &config()), 0);
        }
    }

    #[test]
    fn test_new_listing_scores_the_floor() {
        let now = Utc::now();
        let mut property = make_property(PropertyStatus::Available, Some(3));
        // Strong urgency signals that must be ignored inside the window.
        property.price_history = vec![PriceChange {
            changed_at: now,
            old_price: 400_000.0,
            new_price: 300_000.0,
        }];
        let cfg = config();
        assert_eq!(
            compute_property_urgency(&property, now, &cfg),
            cfg.new_listing_floor
        );
    }

    #[test]
    fn test_stagnant_listing_is_urgent() {
        let now = Utc::now();
        // 120 days on market, zero interest.
        let property = make_property(PropertyStatus::Available, Some(120));
        assert_eq!(compute_property_urgency(&property, now, &config()), 5);
    }

    #[test]
    fn test_active_listing_with_healthy_interest_scores_low() {
        let now = Utc::now();
        let mut property = make_property(PropertyStatus::Available, Some(30));
        property.views_count = 40;
        property.contacts_count = 5;
        let score = compute_property_urgency(&property, now, &config());
        assert!(score <= 1, "score was {score}");
    }

    #[test]
    fn test_recent_price_cut_raises_urgency() {
        let now = Utc::now();
        let mut with_cut = make_property(PropertyStatus::Available, Some(45));
        with_cut.views_count = 10;
        let without_cut = with_cut.clone();
        with_cut.price_history = vec![PriceChange {
            changed_at: now - Duration::days(5),
            old_price: 400_000.0,
            new_price: 360_000.0,
        }];
        let cfg = config();
        assert!(
            compute_property_urgency(&with_cut, now, &cfg)
                >= compute_property_urgency(&without_cut, now, &cfg)
        );
    }

    #[test]
    fn test_missing_listing_date_still_scores() {
        let now = Utc::now();
        let property = make_property(PropertyStatus::Available, None);
        let breakdown = compute_property_urgency_breakdown(&property, now, &config());
        // Both age-dependent signals fall back to neutral; the score lands
        // mid-band instead of failing.
        assert_eq!(breakdown.age, 0.5);
        assert_eq!(breakdown.activity, 0.5);
        assert!(breakdown.score <= 5);
    }

    #[test]
    fn test_building_urgency_is_max_of_active_members() {
        let mut a = make_property(PropertyStatus::Available, Some(30));
        a.urgency_score = 2;
        let mut b = make_property(PropertyStatus::Available, Some(30));
        b.urgency_score = 4;
        let mut sold = make_property(PropertyStatus::Sold, Some(30));
        sold.urgency_score = 5; // stale cache on a closed unit must not leak
        assert_eq!(compute_building_urgency(&[a, b, sold]), 4);
    }

    #[test]
    fn test_building_urgency_empty_or_all_closed_is_zero() {
        assert_eq!(compute_building_urgency(&[]), 0);
        let mut sold = make_property(PropertyStatus::Sold, Some(30));
        sold.urgency_score = 3;
        let archived = make_property(PropertyStatus::Archived, Some(30));
        assert_eq!(compute_building_urgency(&[sold, archived]), 0);
    }

    #[test]
    fn test_band_boundaries_floor_semantics() {
        let cuts = [0.10, 0.25, 0.40, 0.60, 0.78];
        assert_eq!(band(0.0, &cuts), 0);
        assert_eq!(band(0.10, &cuts), 1); // at the boundary, the band is entered
        assert_eq!(band(0.2499, &cuts), 1);
        assert_eq!(band(0.25, &cuts), 2);
        assert_eq!(band(1.0, &cuts), 5);
    }

    #[test]
    fn test_urgency_level_labels() {
        assert_eq!(UrgencyLevel::from_score(0), UrgencyLevel::Closed);
        assert_eq!(UrgencyLevel::from_score(1), UrgencyLevel::New);
        assert_eq!(UrgencyLevel::from_score(5), UrgencyLevel::Urgent);
    }

    // ── recompute trigger tests ──────────────────────────────────────────

    #[derive(Default)]
    struct TestRepo {
        properties: Mutex<HashMap<Uuid, Property>>,
        buildings: Mutex<HashMap<Uuid, Building>>,
    }

    impl TestRepo {
        fn insert_property(&self, property: Property) {
            self.properties
                .lock()
                .unwrap()
                .insert(property.id, property);
        }

        fn insert_building(&self, building: Building) {
            self.buildings
                .lock()
                .unwrap()
                .insert(building.id, building);
        }

        fn property_score(&self, id: Uuid) -> u8 {
            self.properties.lock().unwrap()[&id].urgency_score
        }

        fn building_score(&self, id: Uuid) -> u8 {
            self.buildings.lock().unwrap()[&id].urgency_score
        }
    }

    #[async_trait]
    impl CrmRepository for TestRepo {
        async fn get_request(&self, _id: Uuid) -> Result<Option<SearchRequest>, EngineError> {
            Ok(None)
        }

        async fn get_property(&self, id: Uuid) -> Result<Option<Property>, EngineError> {
            Ok(self.properties.lock().unwrap().get(&id).cloned())
        }

        async fn get_building(&self, id: Uuid) -> Result<Option<Building>, EngineError> {
            Ok(self.buildings.lock().unwrap().get(&id).cloned())
        }

        async fn list_candidates(
            &self,
            _filter: &CandidateFilter,
        ) -> Result<Vec<Property>, EngineError> {
            Ok(vec![])
        }

        async fn list_properties(&self) -> Result<Vec<Property>, EngineError> {
            Ok(self.properties.lock().unwrap().values().cloned().collect())
        }

        async fn list_building_properties(
            &self,
            building_id: Uuid,
        ) -> Result<Vec<Property>, EngineError> {
            Ok(self
                .properties
                .lock()
                .unwrap()
                .values()
                .filter(|p| p.building_id == Some(building_id))
                .cloned()
                .collect())
        }

        async fn save_match(&self, _m: &Match) -> Result<(), EngineError> {
            Ok(())
        }

        async fn update_property_urgency(&self, id: Uuid, score: u8) -> Result<(), EngineError> {
            if let Some(p) = self.properties.lock().unwrap().get_mut(&id) {
                p.urgency_score = score;
            }
            Ok(())
        }

        async fn update_building_urgency(&self, id: Uuid, score: u8) -> Result<(), EngineError> {
            if let Some(b) = self.buildings.lock().unwrap().get_mut(&id) {
                b.urgency_score = score;
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_recompute_property_not_found() {
        let service = UrgencyService::new(Arc::new(TestRepo::default()), config());
        let err = service.recompute_property(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, EngineError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_recompute_property_writes_back_and_updates_building() {
        let repo = Arc::new(TestRepo::default());
        let building_id = Uuid::new_v4();
        repo.insert_building(Building {
            id: building_id,
            zone: Some("Brera".to_string()),
            urgency_score: 0,
        });
        let mut property = make_property(PropertyStatus::Available, Some(120));
        property.building_id = Some(building_id);
        let property_id = property.id;
        repo.insert_property(property);

        let service = UrgencyService::new(Arc::clone(&repo) as Arc<dyn CrmRepository>, config());
        let summary = service.recompute_property(property_id).await.unwrap();

        assert_eq!(summary.properties_updated, 1);
        assert_eq!(summary.buildings_updated, 1);
        assert_eq!(repo.property_score(property_id), 5);
        assert_eq!(repo.building_score(building_id), 5);
        assert_eq!(summary.distribution[5], 1);
    }

    #[tokio::test]
    async fn test_recompute_building_refreshes_all_members() {
        let repo = Arc::new(TestRepo::default());
        let building_id = Uuid::new_v4();
        repo.insert_building(Building {
            id: building_id,
            zone: None,
            urgency_score: 0,
        });

        let mut stagnant = make_property(PropertyStatus::Available, Some(120));
        stagnant.building_id = Some(building_id);
        let mut fresh = make_property(PropertyStatus::Available, Some(2));
        fresh.building_id = Some(building_id);
        let mut sold = make_property(PropertyStatus::Sold, Some(300));
        sold.building_id = Some(building_id);
        repo.insert_property(stagnant);
        repo.insert_property(fresh);
        repo.insert_property(sold);

        let service = UrgencyService::new(Arc::clone(&repo) as Arc<dyn CrmRepository>, config());
        let summary = service.recompute_building(building_id).await.unwrap();

        assert_eq!(summary.properties_updated, 3);
        assert_eq!(summary.buildings_updated, 1);
        // Max over active members: the stagnant one dominates.
        assert_eq!(repo.building_score(building_id), 5);
    }

    #[tokio::test]
    async fn test_recompute_portfolio_counts_and_distribution() {
        let repo = Arc::new(TestRepo::default());
        repo.insert_property(make_property(PropertyStatus::Available, Some(120)));
        repo.insert_property(make_property(PropertyStatus::Available, Some(3)));
        repo.insert_property(make_property(PropertyStatus::Sold, Some(50)));

        let service = UrgencyService::new(Arc::clone(&repo) as Arc<dyn CrmRepository>, config());
        let summary = service.recompute_portfolio().await.unwrap();

        assert_eq!(summary.properties_updated, 3);
        assert_eq!(summary.buildings_updated, 0);
        assert_eq!(summary.distribution[5], 1); // stagnant
        assert_eq!(summary.distribution[1], 1); // new floor
        assert_eq!(summary.distribution[0], 1); // sold
    }
}
