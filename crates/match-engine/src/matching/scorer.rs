//! Compatibility Scorer — 7-component weighted fit between a search request
//! and a property, producing a 0–100 total and a per-component breakdown.
//!
//! Pure and deterministic: no I/O, no clock reads, identical inputs yield
//! bit-identical output. Missing optional fields degrade the affected
//! component to the configured neutral value instead of failing, so ranking
//! always completes over well-formed-but-incomplete entities.

use serde::{Deserialize, Serialize};

use crate::config::ScoringConfig;
use crate::models::{PriorityTier, Property, ScoreBreakdown, SearchRequest};

/// Scorer output: the weighted total plus its breakdown.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MatchScore {
    pub total: f64,
    pub components: ScoreBreakdown,
}

/// Scores one property against one request.
///
/// The total is exactly the weighted sum of the seven components; the
/// weights are validated to sum to 1.0 at configuration load, so the total
/// stays within [0,100] by construction.
pub fn score(request: &SearchRequest, property: &Property, config: &ScoringConfig) -> MatchScore {
    let components = ScoreBreakdown {
        zone: zone_score(request, property, config),
        budget: budget_score(request, property, config),
        type_match: type_score(request, property, config),
        surface: surface_score(request, property, config),
        availability: availability_score(request, property, config),
        priority: priority_score(request.priority, config),
        affinity: affinity_score(property.urgency_score),
    };

    MatchScore {
        total: components.weighted_total(&config.weights),
        components,
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Components
// ────────────────────────────────────────────────────────────────────────────

/// Zone match: 100 for the most-preferred zone, decaying multiplicatively by
/// rank position for lower-ranked zones, 0 for a zone not on the list.
fn zone_score(request: &SearchRequest, property: &Property, config: &ScoringConfig) -> f64 {
    if request.preferred_zones.is_empty() {
        return config.neutral_score;
    }
    let Some(zone) = property.zone.as_deref() else {
        return 0.0;
    };
    let zone = normalize(zone);

    match request
        .preferred_zones
        .iter()
        .position(|preferred| normalize(preferred) == zone)
    {
        Some(rank) => 100.0 * config.zone_rank_decay.powi(rank as i32),
        None => 0.0,
    }
}

/// Budget fit: inside the requested range scores 100; outside, the score
/// decays linearly with the distance from the range (as a fraction of the
/// range width), bottoming out at 0 once the distance exceeds
/// `range_tolerance` times the width.
fn budget_score(request: &SearchRequest, property: &Property, config: &ScoringConfig) -> f64 {
    let price = property.price_for(request.contract_type);
    match (price, request.budget_min, request.budget_max) {
        (Some(price), Some(min), Some(max)) => range_fit_score(price, min, max, config),
        // Unknown price or a half-open budget: fit cannot be judged.
        _ => config.neutral_score,
    }
}

/// Type match is binary: mismatched types are disqualifying in practice, so
/// there is no partial credit.
fn type_score(request: &SearchRequest, property: &Property, config: &ScoringConfig) -> f64 {
    if request.property_types.is_empty() {
        return config.neutral_score;
    }
    let property_type = normalize(&property.property_type);
    if request
        .property_types
        .iter()
        .any(|wanted| normalize(wanted) == property_type)
    {
        100.0
    } else {
        0.0
    }
}

/// Surface fit: same linear-decay-from-range logic as the budget component.
fn surface_score(request: &SearchRequest, property: &Property, config: &ScoringConfig) -> f64 {
    match (property.surface_sqm, request.surface_min, request.surface_max) {
        (Some(surface), Some(min), Some(max)) => range_fit_score(surface, min, max, config),
        _ => config.neutral_score,
    }
}

/// Availability fit: available on/before the requested date scores 100;
/// after it, the score decays with the day gap and bottoms out at 0 beyond
/// `max_wait_days`. An immediately-available property satisfies any date.
fn availability_score(request: &SearchRequest, property: &Property, config: &ScoringConfig) -> f64 {
    let Some(available_from) = property.available_from else {
        return 100.0;
    };
    let Some(needed_by) = request.needed_by else {
        return config.neutral_score;
    };

    let gap_days = (available_from - needed_by).num_days();
    if gap_days <= 0 {
        return 100.0;
    }
    let max_wait = config.max_wait_days as f64;
    (100.0 * (1.0 - gap_days as f64 / max_wait)).max(0.0)
}

/// Priority weight: how much attention the request itself should receive,
/// independent of property fit.
fn priority_score(priority: PriorityTier, config: &ScoringConfig) -> f64 {
    match priority {
        PriorityTier::Low => config.priority_scores.low,
        PriorityTier::Medium => config.priority_scores.medium,
        PriorityTier::High => config.priority_scores.high,
        PriorityTier::Urgent => config.priority_scores.urgent,
    }
}

/// Affinity: the property's cached 0–5 urgency rescaled to [0,100], so
/// listings that need to move get surfaced.
fn affinity_score(urgency: u8) -> f64 {
    f64::from(urgency.min(5)) * 20.0
}

/// Shared linear decay for the budget and surface components.
fn range_fit_score(value: f64, min: f64, max: f64, config: &ScoringConfig) -> f64 {
    if value >= min && value <= max {
        return 100.0;
    }
    let distance = if value < min { min - value } else { value - max };
    // Degenerate min == max ranges still need a defined decay.
    let width = (max - min).max(1.0);
    let overshoot = distance / width;
    if overshoot >= config.range_tolerance {
        return 0.0;
    }
    100.0 * (1.0 - overshoot / config.range_tolerance)
}

fn normalize(value: &str) -> String {
    value.trim().to_lowercase()
}
