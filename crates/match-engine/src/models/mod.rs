pub mod matching;
pub mod property;
pub mod request;

pub use matching::{Match, MatchQuality, MatchStatus, ScoreBreakdown};
pub use property::{Building, ContractType, PriceChange, Property, PropertyStatus};
pub use request::{PriorityTier, SearchRequest};
