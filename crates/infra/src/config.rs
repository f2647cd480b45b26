use anniv_scheduler_domain::{ProjectionHorizon, ReminderAdvancer};
use std::{fmt::Display, str::FromStr, time::Duration};
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct Config {
    /// Seconds between two scans for due reminder slots
    pub poll_interval_secs: u64,
    /// Maximum number of slots a single scan claims at once.
    /// A scan keeps claiming until a batch comes back smaller than this.
    pub claim_batch_size: i64,
    /// Search bounds used when projecting lunar anniversaries
    pub projection_horizon: ProjectionHorizon,
    /// How many already passed cycles a slot may skip when it is advanced
    /// before it is considered exhausted
    pub advance_max_cycles: u32,
    /// Where dispatch requests are posted. Dispatches are only logged when
    /// this is not set.
    pub notification_webhook_url: Option<String>,
    /// Shared secret sent along with every dispatch request
    pub notification_webhook_key: String,
    pub notification_timeout: Duration,
}

impl Config {
    pub fn new() -> Self {
        let defaults = ProjectionHorizon::default();
        let projection_horizon = ProjectionHorizon {
            lunar_years: parse_env_or("PROJECTION_LUNAR_YEARLY_HORIZON", defaults.lunar_years)
                .max(1),
            lunar_months: parse_env_or("PROJECTION_LUNAR_MONTHLY_HORIZON", defaults.lunar_months)
                .max(1),
            lunar_periods: parse_env_or("PROJECTION_LUNAR_PERIOD_HORIZON", defaults.lunar_periods)
                .max(1),
        };

        let notification_webhook_url = match std::env::var("NOTIFICATION_WEBHOOK_URL") {
            Ok(url) if !url.trim().is_empty() => Some(url),
            _ => {
                info!(
                    "Did not find NOTIFICATION_WEBHOOK_URL environment variable. Reminder dispatches will only be logged."
                );
                None
            }
        };

        Self {
            poll_interval_secs: parse_env_or("SCANNER_POLL_INTERVAL_SECS", 60).max(1),
            claim_batch_size: parse_env_or("SCANNER_CLAIM_BATCH_SIZE", 100).max(1),
            projection_horizon,
            advance_max_cycles: parse_env_or("ADVANCE_MAX_CYCLES", 8).max(1),
            notification_webhook_url,
            notification_webhook_key: std::env::var("NOTIFICATION_WEBHOOK_KEY").unwrap_or_default(),
            notification_timeout: Duration::from_secs(
                parse_env_or("NOTIFICATION_TIMEOUT_SECS", 10).max(1),
            ),
        }
    }

    pub fn advancer(&self) -> ReminderAdvancer {
        ReminderAdvancer::new(self.projection_horizon, self.advance_max_cycles)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

/// Reads and parses an environment variable, falling back to `default` when
/// it is absent or malformed
fn parse_env_or<T>(key: &str, default: T) -> T
where
    T: FromStr + Display,
{
    match std::env::var(key) {
        Ok(value) => match value.trim().parse::<T>() {
            Ok(value) => value,
            Err(_) => {
                warn!(
                    "The given {}: {} is not valid, falling back to the default: {}.",
                    key, value, default
                );
                default
            }
        },
        Err(_) => default,
    }
}
