// src/pipeline/alert.rs

//! Tiered alert dispatch with per-key cooldown.

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::error::Result;
use crate::models::{DiscordConfig, Record, Tier, WatchConfig};
use crate::services::Notifier;
use crate::storage::StateGuard;

/// Stand-in for a missing date or shift in alert keys.
const KEY_PLACEHOLDER: &str = "-";

/// Stand-in for a missing date or shift in messages.
const MESSAGE_PLACEHOLDER: &str = "?";

/// What happened to one alert candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlertOutcome {
    Sent { tier: Tier, key: String },
    /// Same key sent within the cooldown window
    Suppressed { tier: Tier, key: String },
    /// Tier has no template
    NoTemplate(Tier),
    /// No notifier configured
    Disabled,
}

/// Composite cooldown key: `label|target|date|shift|tier`.
pub fn alert_key(record: &Record, tier: Tier) -> String {
    format!(
        "{}|{}|{}|{}|{}",
        record.list_label,
        record.target_id,
        record.date.as_deref().unwrap_or(KEY_PLACEHOLDER),
        record.shift.as_deref().unwrap_or(KEY_PLACEHOLDER),
        tier
    )
}

/// Fill a message template for `record`.
pub fn render(template: &str, ping: &str, record: &Record) -> String {
    template
        .replace("{ping}", ping)
        .replace("{label}", &record.list_label)
        .replace("{rank}", &record.rank.to_string())
        .replace("{target}", &record.target_id)
        .replace("{shift}", record.shift.as_deref().unwrap_or(MESSAGE_PLACEHOLDER))
        .replace("{date}", record.date.as_deref().unwrap_or(MESSAGE_PLACEHOLDER))
        .trim()
        .to_string()
}

/// Decides whether a qualifying record is announced, and announces it.
pub struct AlertDispatcher<'a> {
    watch: &'a WatchConfig,
    discord: Option<&'a DiscordConfig>,
    notifier: &'a dyn Notifier,
}

impl<'a> AlertDispatcher<'a> {
    pub fn new(
        watch: &'a WatchConfig,
        discord: Option<&'a DiscordConfig>,
        notifier: &'a dyn Notifier,
    ) -> Self {
        Self {
            watch,
            discord,
            notifier,
        }
    }

    /// Send the alert for `record` unless disabled, templateless or cooling down.
    ///
    /// A successful send is recorded and flushed to disk before returning.
    /// Delivery failures are returned to the caller untouched.
    pub async fn dispatch(
        &self,
        record: &Record,
        state: &mut StateGuard,
        now: DateTime<Utc>,
    ) -> Result<AlertOutcome> {
        let discord = match self.discord {
            Some(discord) if self.notifier.is_enabled() => discord,
            _ => return Ok(AlertOutcome::Disabled),
        };

        let tier = self.watch.tier_for(record.rank);
        let Some(template) = discord.template(tier) else {
            debug!(tier = %tier, target = %record.target_id, "No template for tier");
            return Ok(AlertOutcome::NoTemplate(tier));
        };

        let key = alert_key(record, tier);
        if !state.should_alert(&key, self.watch.cooldown(), now) {
            info!(key = %key, "Skipping alert due to cooldown");
            return Ok(AlertOutcome::Suppressed { tier, key });
        }

        let message = render(template, discord.ping(tier), record);
        info!(
            tier = %tier,
            list = %record.list_label,
            target = %record.target_id,
            rank = record.rank,
            "Sending notification"
        );
        self.notifier.send(&message).await?;

        state.state_mut().record_alert(key.clone(), now);
        state.flush().await?;
        Ok(AlertOutcome::Sent { tier, key })
    }
}
