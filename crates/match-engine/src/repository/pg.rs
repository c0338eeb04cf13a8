//! Postgres implementation of `CrmRepository`.
//!
//! Rows are fetched as plain `FromRow` structs and converted into domain
//! entities; enum columns are stored as text and parsed, with unknown values
//! surfacing as `MalformedEntity`.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::{FromRow, PgPool};
use tracing::info;
use uuid::Uuid;

use crate::errors::EngineError;
use crate::models::{
    Building, ContractType, Match, PriceChange, PriorityTier, Property, PropertyStatus,
    SearchRequest,
};
use crate::repository::{CandidateFilter, CrmRepository};

const PROPERTY_COLUMNS: &str = "id, building_id, zone, property_type, contract_type, price_sale, \
     price_rent_monthly, surface_sqm, status, available_from, listed_at, \
     price_history, views_count, contacts_count, urgency_score";

pub struct PgRepository {
    pool: PgPool,
}

impl PgRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects a fresh pool and wraps it.
    pub async fn connect(database_url: &str) -> Result<Self, EngineError> {
        info!("Connecting to PostgreSQL...");
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await?;
        info!("PostgreSQL connection pool established");
        Ok(Self::new(pool))
    }
}

#[derive(Debug, FromRow)]
struct PropertyRow {
    id: Uuid,
    building_id: Option<Uuid>,
    zone: Option<String>,
    property_type: String,
    contract_type: String,
    price_sale: Option<f64>,
    price_rent_monthly: Option<f64>,
    surface_sqm: Option<f64>,
    status: String,
    available_from: Option<NaiveDate>,
    listed_at: Option<DateTime<Utc>>,
    price_history: serde_json::Value,
    views_count: i32,
    contacts_count: i32,
    urgency_score: i16,
}

impl TryFrom<PropertyRow> for Property {
    type Error = EngineError;

    fn try_from(row: PropertyRow) -> Result<Self, Self::Error> {
        let price_history: Vec<PriceChange> = if row.price_history.is_null() {
            Vec::new()
        } else {
            serde_json::from_value(row.price_history).map_err(|e| {
                EngineError::MalformedEntity(format!(
                    "property {}: unreadable price history: {e}",
                    row.id
                ))
            })?
        };

        Ok(Property {
            id: row.id,
            building_id: row.building_id,
            zone: row.zone,
            property_type: row.property_type,
            contract_type: ContractType::parse(&row.contract_type)?,
            price_sale: row.price_sale,
            price_rent_monthly: row.price_rent_monthly,
            surface_sqm: row.surface_sqm,
            status: PropertyStatus::parse(&row.status)?,
            available_from: row.available_from,
            listed_at: row.listed_at,
            price_history,
            views_count: row.views_count.max(0) as u32,
            contacts_count: row.contacts_count.max(0) as u32,
            urgency_score: row.urgency_score.clamp(0, 5) as u8,
        })
    }
}

#[derive(Debug, FromRow)]
struct RequestRow {
    id: Uuid,
    contact_id: Uuid,
    contract_type: String,
    preferred_zones: Vec<String>,
    budget_min: Option<f64>,
    budget_max: Option<f64>,
    property_types: Vec<String>,
    surface_min: Option<f64>,
    surface_max: Option<f64>,
    needed_by: Option<NaiveDate>,
    priority: String,
    updated_at: DateTime<Utc>,
}

impl TryFrom<RequestRow> for SearchRequest {
    type Error = EngineError;

    fn try_from(row: RequestRow) -> Result<Self, Self::Error> {
        Ok(SearchRequest {
            id: row.id,
            contact_id: row.contact_id,
            contract_type: ContractType::parse(&row.contract_type)?,
            preferred_zones: row.preferred_zones,
            budget_min: row.budget_min,
            budget_max: row.budget_max,
            property_types: row.property_types,
            surface_min: row.surface_min,
            surface_max: row.surface_max,
            needed_by: row.needed_by,
            priority: PriorityTier::parse(&row.priority)?,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct BuildingRow {
    id: Uuid,
    zone: Option<String>,
    urgency_score: i16,
}

impl From<BuildingRow> for Building {
    fn from(row: BuildingRow) -> Self {
        Building {
            id: row.id,
            zone: row.zone,
            urgency_score: row.urgency_score.clamp(0, 5) as u8,
        }
    }
}

fn into_properties(rows: Vec<PropertyRow>) -> Result<Vec<Property>, EngineError> {
    rows.into_iter().map(Property::try_from).collect()
}

#[async_trait]
impl CrmRepository for PgRepository {
    async fn get_request(&self, id: Uuid) -> Result<Option<SearchRequest>, EngineError> {
        let row = sqlx::query_as::<_, RequestRow>(
            r#"
            SELECT id, contact_id, contract_type, preferred_zones, budget_min,
                   budget_max, property_types, surface_min, surface_max,
                   needed_by, priority, updated_at
            FROM search_requests
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(SearchRequest::try_from).transpose()
    }

    async fn get_property(&self, id: Uuid) -> Result<Option<Property>, EngineError> {
        let row = sqlx::query_as::<_, PropertyRow>(&format!(
            "SELECT {PROPERTY_COLUMNS} FROM properties WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Property::try_from).transpose()
    }

    async fn get_building(&self, id: Uuid) -> Result<Option<Building>, EngineError> {
        let row = sqlx::query_as::<_, BuildingRow>(
            "SELECT id, zone, urgency_score FROM buildings WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Building::from))
    }

    async fn list_candidates(
        &self,
        filter: &CandidateFilter,
    ) -> Result<Vec<Property>, EngineError> {
        let rows = sqlx::query_as::<_, PropertyRow>(&format!(
            r#"
            SELECT {PROPERTY_COLUMNS}
            FROM properties
            WHERE contract_type = $1
              AND status NOT IN ('sold', 'rented', 'archived')
              AND (cardinality($2::text[]) = 0 OR property_type = ANY($2))
              AND ($3::double precision IS NULL
                   OR (CASE WHEN contract_type = 'sale' THEN price_sale ELSE price_rent_monthly END) IS NULL
                   OR (CASE WHEN contract_type = 'sale' THEN price_sale ELSE price_rent_monthly END) >= $3)
              AND ($4::double precision IS NULL
                   OR (CASE WHEN contract_type = 'sale' THEN price_sale ELSE price_rent_monthly END) IS NULL
                   OR (CASE WHEN contract_type = 'sale' THEN price_sale ELSE price_rent_monthly END) <= $4)
              AND ($5::double precision IS NULL OR surface_sqm IS NULL OR surface_sqm >= $5)
              AND ($6::double precision IS NULL OR surface_sqm IS NULL OR surface_sqm <= $6)
            ORDER BY listed_at DESC NULLS LAST
            LIMIT $7
            "#
        ))
        .bind(filter.contract_type.as_str())
        .bind(&filter.property_types)
        .bind(filter.price_min)
        .bind(filter.price_max)
        .bind(filter.surface_min)
        .bind(filter.surface_max)
        .bind(filter.limit)
        .fetch_all(&self.pool)
        .await?;

        into_properties(rows)
    }

    async fn list_properties(&self) -> Result<Vec<Property>, EngineError> {
        let rows = sqlx::query_as::<_, PropertyRow>(&format!(
            "SELECT {PROPERTY_COLUMNS} FROM properties"
        ))
        .fetch_all(&self.pool)
        .await?;

        into_properties(rows)
    }

    async fn list_building_properties(
        &self,
        building_id: Uuid,
    ) -> Result<Vec<Property>, EngineError> {
        let rows = sqlx::query_as::<_, PropertyRow>(&format!(
            "SELECT {PROPERTY_COLUMNS} FROM properties WHERE building_id = $1"
        ))
        .bind(building_id)
        .fetch_all(&self.pool)
        .await?;

        into_properties(rows)
    }

    async fn save_match(&self, m: &Match) -> Result<(), EngineError> {
        sqlx::query(
            r#"
            INSERT INTO matches
                (id, request_id, property_id, score_total, score_zone,
                 score_budget, score_type, score_surface, score_availability,
                 score_priority, score_affinity, ai_score, ai_analysis,
                 status, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            "#,
        )
        .bind(m.id)
        .bind(m.request_id)
        .bind(m.property_id)
        .bind(m.score_total)
        .bind(m.breakdown.zone)
        .bind(m.breakdown.budget)
        .bind(m.breakdown.type_match)
        .bind(m.breakdown.surface)
        .bind(m.breakdown.availability)
        .bind(m.breakdown.priority)
        .bind(m.breakdown.affinity)
        .bind(m.ai_score)
        .bind(m.ai_analysis.as_deref())
        .bind(m.status.as_str())
        .bind(m.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn update_property_urgency(&self, id: Uuid, score: u8) -> Result<(), EngineError> {
        sqlx::query("UPDATE properties SET urgency_score = $2 WHERE id = $1")
            .bind(id)
            .bind(i16::from(score))
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn update_building_urgency(&self, id: Uuid, score: u8) -> Result<(), EngineError> {
        sqlx::query("UPDATE buildings SET urgency_score = $2 WHERE id = $1")
            .bind(id)
            .bind(i16::from(score))
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
