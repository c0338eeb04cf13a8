//! The four normalized urgency signals, each mapped to [0,1].
//!
//! A missing input (e.g. no listing date) degrades the affected signal to
//! the neutral 0.5 instead of failing the computation, so a bulk recompute
//! never aborts on one incomplete listing.

use chrono::{DateTime, Utc};

use crate::config::UrgencyConfig;
use crate::models::PriceChange;

/// Neutral value used when a signal's inputs are missing.
pub const NEUTRAL_SIGNAL: f64 = 0.5;

/// Days on market, when the listing date is known.
pub fn age_days(listed_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Option<f64> {
    listed_at.map(|listed| {
        let secs = (now - listed).num_seconds();
        (secs.max(0) as f64) / 86_400.0
    })
}

/// Time-on-market signal: piecewise-linear ramp from 0 at `age_low_days` to
/// 1 at `age_high_days`. Longer on market ⇒ higher urgency.
pub fn age_signal(age_days: Option<f64>, config: &UrgencyConfig) -> f64 {
    let Some(days) = age_days else {
        return NEUTRAL_SIGNAL;
    };
    let low = config.age_low_days as f64;
    let high = config.age_high_days as f64;
    ((days - low) / (high - low)).clamp(0.0, 1.0)
}

/// Price-reduction signal: recent reductions push urgency up. Each reduction
/// within the window contributes its relative drop, scaled and weighted by
/// recency; the sum is capped at 1.
pub fn price_change_signal(
    history: &[PriceChange],
    now: DateTime<Utc>,
    config: &UrgencyConfig,
) -> f64 {
    let window = config.price_window_days as f64;
    let mut signal = 0.0;

    for change in history {
        if !change.is_reduction() || change.old_price <= 0.0 {
            continue;
        }
        let days_ago = (now - change.changed_at).num_seconds() as f64 / 86_400.0;
        if days_ago < 0.0 || days_ago > window {
            continue;
        }
        let drop_fraction = (change.old_price - change.new_price) / change.old_price;
        let recency = 1.0 - days_ago / window;
        signal += drop_fraction * config.price_magnitude_scale * recency;
    }

    signal.clamp(0.0, 1.0)
}

/// Activity-deficit signal: a listing with many days on market but little
/// view/contact interest reads as stagnant. 0 when interest keeps pace with
/// the expected daily rate, 1 when there is none.
pub fn activity_deficit_signal(
    views: u32,
    contacts: u32,
    age_days: Option<f64>,
    config: &UrgencyConfig,
) -> f64 {
    let Some(days) = age_days else {
        return NEUTRAL_SIGNAL;
    };
    let expected = days * config.expected_daily_interest;
    if expected <= 0.0 {
        return 0.0;
    }
    let actual = f64::from(views) + f64::from(contacts);
    (1.0 - actual / expected).clamp(0.0, 1.0)
}
