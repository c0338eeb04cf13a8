// Urgency engine: per-property 0–5 scoring, building aggregation, and the
// explicit recompute triggers (single property, building, whole portfolio).

pub mod engine;
pub mod signals;

pub use engine::{
    compute_building_urgency, compute_property_urgency, compute_property_urgency_breakdown,
    RecalcSummary, UrgencyBreakdown, UrgencyLevel, UrgencyService,
};
