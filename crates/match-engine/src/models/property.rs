use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::EngineError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContractType {
    Sale,
    Rent,
}

impl ContractType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContractType::Sale => "sale",
            ContractType::Rent => "rent",
        }
    }

    pub fn parse(value: &str) -> Result<Self, EngineError> {
        match value {
            "sale" => Ok(ContractType::Sale),
            "rent" => Ok(ContractType::Rent),
            other => Err(EngineError::MalformedEntity(format!(
                "unknown contract type '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyStatus {
    Draft,
    Available,
    Reserved,
    Sold,
    Rented,
    Archived,
}

impl PropertyStatus {
    /// Terminal states: no urgency, never matchable.
    pub fn is_closed(&self) -> bool {
        matches!(
            self,
            PropertyStatus::Sold | PropertyStatus::Rented | PropertyStatus::Archived
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PropertyStatus::Draft => "draft",
            PropertyStatus::Available => "available",
            PropertyStatus::Reserved => "reserved",
            PropertyStatus::Sold => "sold",
            PropertyStatus::Rented => "rented",
            PropertyStatus::Archived => "archived",
        }
    }

    pub fn parse(value: &str) -> Result<Self, EngineError> {
        match value {
            "draft" => Ok(PropertyStatus::Draft),
            "available" => Ok(PropertyStatus::Available),
            "reserved" => Ok(PropertyStatus::Reserved),
            "sold" => Ok(PropertyStatus::Sold),
            "rented" => Ok(PropertyStatus::Rented),
            "archived" => Ok(PropertyStatus::Archived),
            other => Err(EngineError::MalformedEntity(format!(
                "unknown property status '{other}'"
            ))),
        }
    }
}

/// One entry of a property's price-change history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceChange {
    pub changed_at: DateTime<Utc>,
    pub old_price: f64,
    pub new_price: f64,
}

impl PriceChange {
    pub fn is_reduction(&self) -> bool {
        self.new_price < self.old_price
    }
}

/// A listing. Read-only to the scoring core; the cached `urgency_score` is
/// written back by the urgency recompute triggers via the repository.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Property {
    pub id: Uuid,
    pub building_id: Option<Uuid>,
    pub zone: Option<String>,
    pub property_type: String,
    pub contract_type: ContractType,
    pub price_sale: Option<f64>,
    pub price_rent_monthly: Option<f64>,
    pub surface_sqm: Option<f64>,
    pub status: PropertyStatus,
    /// None means immediately available.
    pub available_from: Option<NaiveDate>,
    pub listed_at: Option<DateTime<Utc>>,
    pub price_history: Vec<PriceChange>,
    pub views_count: u32,
    pub contacts_count: u32,
    /// Cached 0–5 urgency score.
    pub urgency_score: u8,
}

impl Property {
    /// The price relevant to a request's contract type.
    pub fn price_for(&self, contract: ContractType) -> Option<f64> {
        match contract {
            ContractType::Sale => self.price_sale,
            ContractType::Rent => self.price_rent_monthly,
        }
    }
}

/// Aggregation root for properties sharing a physical structure. The cached
/// `urgency_score` is the maximum over active member properties.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Building {
    pub id: Uuid,
    pub zone: Option<String>,
    pub urgency_score: u8,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parse_roundtrip() {
        for status in [
            PropertyStatus::Draft,
            PropertyStatus::Available,
            PropertyStatus::Reserved,
            PropertyStatus::Sold,
            PropertyStatus::Rented,
            PropertyStatus::Archived,
        ] {
            assert_eq!(PropertyStatus::parse(status.as_str()).unwrap(), status);
        }
        assert!(PropertyStatus::parse("gone").is_err());
    }

    #[test]
    fn test_closed_statuses() {
        assert!(PropertyStatus::Sold.is_closed());
        assert!(PropertyStatus::Rented.is_closed());
        assert!(PropertyStatus::Archived.is_closed());
        assert!(!PropertyStatus::Available.is_closed());
        assert!(!PropertyStatus::Reserved.is_closed());
        assert!(!PropertyStatus::Draft.is_closed());
    }

    #[test]
    fn test_price_for_contract_type() {
        let property = Property {
            id: Uuid::new_v4(),
            building_id: None,
            zone: None,
            property_type: "apartment".to_string(),
            contract_type: ContractType::Sale,
            price_sale: Some(380_000.0),
            price_rent_monthly: Some(1_500.0),
            surface_sqm: None,
            status: PropertyStatus::Available,
            available_from: None,
            listed_at: None,
            price_history: vec![],
            views_count: 0,
            contacts_count: 0,
            urgency_score: 0,
        };
        assert_eq!(property.price_for(ContractType::Sale), Some(380_000.0));
        assert_eq!(property.price_for(ContractType::Rent), Some(1_500.0));
    }
}
