//! Engine configuration — every weight, threshold, and band cut point the
//! scoring and urgency logic uses lives here, loaded once and validated at
//! load time. Nothing downstream hard-codes a tunable.
//!
//! Hot reload is re-load-and-swap: callers build a fresh `EngineConfig` (from
//! env or a JSON file) and pass it by reference into scorer/urgency calls, so
//! concurrent runs with different tables (A/B weight experiments) cannot
//! interfere.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::errors::EngineError;

/// Weights for the 7 compatibility components. Must sum to 1.0.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentWeights {
    pub zone: f64,
    pub budget: f64,
    #[serde(rename = "type")]
    pub type_match: f64,
    pub surface: f64,
    pub availability: f64,
    pub priority: f64,
    pub affinity: f64,
}

impl Default for ComponentWeights {
    fn default() -> Self {
        Self {
            zone: 0.25,
            budget: 0.20,
            type_match: 0.15,
            surface: 0.15,
            availability: 0.10,
            priority: 0.05,
            affinity: 0.10,
        }
    }
}

impl ComponentWeights {
    pub fn sum(&self) -> f64 {
        self.zone
            + self.budget
            + self.type_match
            + self.surface
            + self.availability
            + self.priority
            + self.affinity
    }
}

/// Fixed component scores for the four request priority tiers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriorityScores {
    pub low: f64,
    pub medium: f64,
    pub high: f64,
    pub urgent: f64,
}

impl Default for PriorityScores {
    fn default() -> Self {
        Self {
            low: 25.0,
            medium: 50.0,
            high: 75.0,
            urgent: 100.0,
        }
    }
}

/// Compatibility scorer tunables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringConfig {
    pub weights: ComponentWeights,
    /// Multiplicative decay per zone rank: rank 0 scores 100, rank r scores
    /// 100 * zone_rank_decay^r.
    pub zone_rank_decay: f64,
    /// Distance-from-range, as a multiple of the range width, at which the
    /// budget/surface fit bottoms out at 0.
    pub range_tolerance: f64,
    /// Day gap past the requested availability date at which the
    /// availability fit bottoms out at 0.
    pub max_wait_days: i64,
    pub priority_scores: PriorityScores,
    /// Documented neutral value for components whose inputs are missing.
    pub neutral_score: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            weights: ComponentWeights::default(),
            zone_rank_decay: 0.75,
            range_tolerance: 1.5,
            max_wait_days: 180,
            priority_scores: PriorityScores::default(),
            neutral_score: 50.0,
        }
    }
}

/// Weights for the four urgency signals. Must sum to 1.0.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalWeights {
    pub age: f64,
    pub price_change: f64,
    pub activity: f64,
    pub new_listing: f64,
}

impl Default for SignalWeights {
    fn default() -> Self {
        Self {
            age: 0.35,
            price_change: 0.15,
            activity: 0.45,
            new_listing: 0.05,
        }
    }
}

impl SignalWeights {
    pub fn sum(&self) -> f64 {
        self.age + self.price_change + self.activity + self.new_listing
    }
}

/// Urgency engine tunables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UrgencyConfig {
    pub signal_weights: SignalWeights,
    /// Ascending cut points mapping the combined [0,1] value to bands 0–5:
    /// the band is the number of cut points at or below the value.
    pub band_cuts: [f64; 5],
    /// Listings younger than this many days score the fixed new-listing
    /// floor, regardless of the other signals.
    pub new_listing_days: i64,
    pub new_listing_floor: u8,
    /// Age signal ramps linearly from 0 at `age_low_days` on market to 1 at
    /// `age_high_days`.
    pub age_low_days: i64,
    pub age_high_days: i64,
    /// Only price reductions within this window count.
    pub price_window_days: i64,
    /// Scale factor on the relative price drop: with 10.0, a 10% reduction
    /// made today saturates the signal.
    pub price_magnitude_scale: f64,
    /// Expected views+contacts per day on market; fewer than this reads as
    /// stagnation.
    pub expected_daily_interest: f64,
}

impl Default for UrgencyConfig {
    fn default() -> Self {
        Self {
            signal_weights: SignalWeights::default(),
            band_cuts: [0.10, 0.25, 0.40, 0.60, 0.78],
            new_listing_days: 7,
            new_listing_floor: 1,
            age_low_days: 7,
            age_high_days: 90,
            price_window_days: 30,
            price_magnitude_scale: 10.0,
            expected_daily_interest: 0.5,
        }
    }
}

/// AI enhancement collaborator settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnhancementConfig {
    /// Feature flag: when false the ranking service never calls the
    /// collaborator.
    pub enabled: bool,
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for EnhancementConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            base_url: "http://localhost:8000".to_string(),
            timeout_secs: 30,
        }
    }
}

/// The full engine configuration value object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    pub scoring: ScoringConfig,
    pub urgency: UrgencyConfig,
    pub enhancement: EnhancementConfig,
    /// Fractional buffer applied around requested price/surface ranges when
    /// pre-filtering candidates (0.2 = ±20%).
    pub candidate_buffer: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            scoring: ScoringConfig::default(),
            urgency: UrgencyConfig::default(),
            enhancement: EnhancementConfig::default(),
            candidate_buffer: 0.2,
        }
    }
}

const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

impl EngineConfig {
    /// Loads configuration from the environment.
    ///
    /// `MATCH_ENGINE_CONFIG` may point at a JSON file with the full weight
    /// tables; otherwise the documented defaults apply. The enhancement
    /// collaborator settings can be overridden individually via
    /// `AI_MATCHING_ENABLED`, `AI_BACKEND_URL`, and `AI_TIMEOUT_SECS`.
    pub fn from_env() -> Result<Self, EngineError> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let mut config = match std::env::var("MATCH_ENGINE_CONFIG") {
            Ok(path) => Self::from_json_file(&path)?,
            Err(_) => Self::default(),
        };

        if let Ok(enabled) = std::env::var("AI_MATCHING_ENABLED") {
            config.enhancement.enabled = enabled == "1" || enabled.eq_ignore_ascii_case("true");
        }
        if let Ok(url) = std::env::var("AI_BACKEND_URL") {
            config.enhancement.base_url = url;
        }
        if let Ok(secs) = std::env::var("AI_TIMEOUT_SECS") {
            config.enhancement.timeout_secs = secs.parse().map_err(|_| {
                EngineError::InvalidConfiguration(
                    "AI_TIMEOUT_SECS must be a positive integer".to_string(),
                )
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Loads and validates a JSON configuration file. Re-invoking this and
    /// swapping the result is the supported hot-reload path.
    pub fn from_json_file(path: &str) -> Result<Self, EngineError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            EngineError::InvalidConfiguration(format!("cannot read config file '{path}': {e}"))
        })?;
        let config: Self = serde_json::from_str(&raw).map_err(|e| {
            EngineError::InvalidConfiguration(format!("cannot parse config file '{path}': {e}"))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Fails fast on any invariant violation. Called at load time so that a
    /// bad table never reaches mid-computation.
    pub fn validate(&self) -> Result<(), EngineError> {
        let invalid = |msg: String| Err(EngineError::InvalidConfiguration(msg));

        let weight_sum = self.scoring.weights.sum();
        if (weight_sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return invalid(format!(
                "component weights must sum to 1.0, got {weight_sum}"
            ));
        }

        let signal_sum = self.urgency.signal_weights.sum();
        if (signal_sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return invalid(format!(
                "urgency signal weights must sum to 1.0, got {signal_sum}"
            ));
        }

        let cuts = &self.urgency.band_cuts;
        if cuts.windows(2).any(|w| w[0] >= w[1]) {
            return invalid(format!("band cut points must be strictly ascending: {cuts:?}"));
        }
        if cuts[0] < 0.0 || cuts[4] > 1.0 {
            return invalid(format!("band cut points must lie within [0,1]: {cuts:?}"));
        }

        if self.urgency.new_listing_floor > 5 {
            return invalid(format!(
                "new-listing floor must be within 0..=5, got {}",
                self.urgency.new_listing_floor
            ));
        }
        if self.urgency.age_high_days <= self.urgency.age_low_days {
            return invalid("age_high_days must exceed age_low_days".to_string());
        }
        if self.urgency.price_window_days <= 0 {
            return invalid("price_window_days must be positive".to_string());
        }

        if !(0.0..=1.0).contains(&self.scoring.zone_rank_decay) {
            return invalid(format!(
                "zone_rank_decay must lie within [0,1], got {}",
                self.scoring.zone_rank_decay
            ));
        }
        if self.scoring.range_tolerance <= 0.0 {
            return invalid("range_tolerance must be positive".to_string());
        }
        if self.scoring.max_wait_days <= 0 {
            return invalid("max_wait_days must be positive".to_string());
        }

        if self.enhancement.timeout_secs == 0 {
            return invalid("enhancement timeout must be positive".to_string());
        }
        if self.candidate_buffer < 0.0 {
            return invalid("candidate_buffer must be non-negative".to_string());
        }

        Ok(())
    }
}

/// Reads a required environment variable, mirroring the bootstrap style of
/// the batch binary.
pub fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}
