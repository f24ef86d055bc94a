//! Marketplace tunables shared by the core services.
//!
//! The server loads these from a TOML/JSON file or inline JSON; every field
//! has a default so partial documents are accepted.

use chrono::Duration;
use repomart_model::Cents;
use serde::{Deserialize, Serialize};

use crate::payouts::policy::PayoutPolicy;

/// Upper bound for hour-based settings: ten years.
const MAX_HOURS: i64 = 10 * 365 * 24;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketplaceSettings {
    /// ISO currency code every price and payout is expressed in.
    pub currency: String,
    /// Platform share of each sale in basis points (1000 = 10%).
    pub platform_fee_bps: u32,
    /// Smallest non-zero listing price.
    pub min_price: Cents,
    pub max_price: Cents,
    pub payout: PayoutSettings,
    pub sessions: SessionSettings,
    /// Maximum number of stored searches per user.
    pub search_history_cap: i64,
    pub moderation: ModerationSettings,
}

impl Default for MarketplaceSettings {
    fn default() -> Self {
        Self {
            currency: "usd".to_string(),
            platform_fee_bps: 1_000,
            min_price: Cents(100),
            max_price: Cents(1_000_000),
            payout: PayoutSettings::default(),
            sessions: SessionSettings::default(),
            search_history_cap: 50,
            moderation: ModerationSettings::default(),
        }
    }
}

impl MarketplaceSettings {
    pub fn payout_policy(&self) -> PayoutPolicy {
        PayoutPolicy {
            minimum: self.payout.minimum,
            cooldown: Duration::hours(self.payout.cooldown_hours),
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.platform_fee_bps > 10_000 {
            return Err("platform_fee_bps cannot exceed 10000".into());
        }
        if self.min_price.is_negative() || self.min_price > self.max_price {
            return Err("min_price must be between 0 and max_price".into());
        }
        if self.payout.minimum.get() <= 0 {
            return Err("payout.minimum must be positive".into());
        }
        if !(0..=MAX_HOURS).contains(&self.payout.cooldown_hours) {
            return Err(format!("payout.cooldown_hours must be between 0 and {MAX_HOURS}"));
        }
        if !(1..=MAX_HOURS).contains(&self.sessions.ttl_hours) {
            return Err(format!("sessions.ttl_hours must be between 1 and {MAX_HOURS}"));
        }
        if self.currency.len() != 3
            || !self.currency.chars().all(|c| c.is_ascii_lowercase())
        {
            return Err("currency must be a lowercase ISO 4217 code".into());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PayoutSettings {
    pub minimum: Cents,
    pub cooldown_hours: i64,
}

impl Default for PayoutSettings {
    fn default() -> Self {
        Self {
            minimum: Cents(1_000),
            cooldown_hours: 7 * 24,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    pub ttl_hours: i64,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self { ttl_hours: 72 }
    }
}

impl SessionSettings {
    pub fn ttl(&self) -> Duration {
        Duration::hours(self.ttl_hours)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModerationSettings {
    /// Replaces the built-in word list when non-empty.
    pub profanity_words: Vec<String>,
    /// Added on top of whichever list is active.
    pub extra_profanity_words: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let settings: MarketplaceSettings =
            serde_json::from_str(r#"{"platform_fee_bps": 1500, "payout": {"minimum": 5000}}"#)
                .unwrap();
        assert_eq!(settings.platform_fee_bps, 1_500);
        assert_eq!(settings.payout.minimum, Cents(5_000));
        assert_eq!(settings.payout.cooldown_hours, 168);
        assert_eq!(settings.currency, "usd");
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn rejects_fee_above_full_amount() {
        let settings = MarketplaceSettings {
            platform_fee_bps: 12_000,
            ..Default::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn rejects_out_of_range_hours() {
        let mut settings = MarketplaceSettings::default();
        settings.sessions.ttl_hours = 999_999_999_999_999;
        assert!(settings.validate().is_err());

        let mut settings = MarketplaceSettings::default();
        settings.payout.cooldown_hours = i64::MAX;
        assert!(settings.validate().is_err());

        let mut settings = MarketplaceSettings::default();
        settings.sessions.ttl_hours = MAX_HOURS;
        settings.payout.cooldown_hours = 0;
        assert!(settings.validate().is_ok());
        assert_eq!(settings.sessions.ttl(), Duration::hours(MAX_HOURS));
    }
}
