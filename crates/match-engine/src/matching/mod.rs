// Matching subsystem: the deterministic compatibility scorer, the ranking
// service that orchestrates it, and the optional AI-enhancement collaborator.
// All AI calls go through enhancement — no other module talks to the backend.

pub mod enhancement;
pub mod ranking;
pub mod scorer;

pub use enhancement::{
    enhancer_from_config, EnhanceError, EnhancedScore, EnhancementContext, HttpMatchEnhancer,
    MatchEnhancer, NoopEnhancer,
};
pub use ranking::{MatchingService, RankOptions};
pub use scorer::{score, MatchScore};
