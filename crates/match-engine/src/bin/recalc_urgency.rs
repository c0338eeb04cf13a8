//! Batch urgency recalculation.
//!
//! Usage:
//!   recalc-urgency                      # whole portfolio
//!   recalc-urgency --property <uuid>    # one property (and its building)
//!   recalc-urgency --building <uuid>    # all properties in one building

use std::sync::Arc;

use anyhow::{bail, Result};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use uuid::Uuid;

use match_engine::config::{require_env, EngineConfig};
use match_engine::repository::PgRepository;
use match_engine::urgency::{RecalcSummary, UrgencyLevel, UrgencyService};

#[tokio::main]
async fn main() -> Result<()> {
    let config = EngineConfig::from_env()?;

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting urgency recalculation v{}", env!("CARGO_PKG_VERSION"));

    let database_url = require_env("DATABASE_URL")?;
    let repo = Arc::new(PgRepository::connect(&database_url).await?);
    let service = UrgencyService::new(repo, config.urgency.clone());

    let summary = match parse_scope()? {
        Scope::Portfolio => service.recompute_portfolio().await?,
        Scope::Property(id) => service.recompute_property(id).await?,
        Scope::Building(id) => service.recompute_building(id).await?,
    };

    report(&summary);
    Ok(())
}

enum Scope {
    Portfolio,
    Property(Uuid),
    Building(Uuid),
}

fn parse_scope() -> Result<Scope> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    match args.as_slice() {
        [] => Ok(Scope::Portfolio),
        [flag, id] if flag == "--property" => Ok(Scope::Property(id.parse()?)),
        [flag, id] if flag == "--building" => Ok(Scope::Building(id.parse()?)),
        _ => bail!("usage: recalc-urgency [--property <uuid> | --building <uuid>]"),
    }
}

fn report(summary: &RecalcSummary) {
    info!("Properties updated: {}", summary.properties_updated);
    info!("Buildings updated:  {}", summary.buildings_updated);
    info!("Urgency distribution:");
    for (score, count) in summary.distribution.iter().enumerate().rev() {
        info!(
            "  {:?} ({}): {}",
            UrgencyLevel::from_score(score as u8),
            score,
            count
        );
    }

    if summary.distribution[5] > 0 {
        warn!(
            "{} properties need urgent attention",
            summary.distribution[5]
        );
    }
}
