use anniv_scheduler_domain::{ReminderChannel, ReminderDispatch};
use chrono::NaiveDate;
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{error, info};

/// The boundary reminder dispatches leave the scheduler through.
///
/// Delivery is at least once: a dispatch whose slot could not be advanced
/// afterwards is sent again on a later scan, with the same `dedupeKey`.
#[async_trait::async_trait]
pub trait INotifier: Send + Sync {
    async fn dispatch(&self, dispatch: &ReminderDispatch) -> anyhow::Result<()>;
}

/// Body of a dispatch request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReminderDispatchDTO {
    pub dedupe_key: String,
    pub rule_id: String,
    pub slot_id: String,
    pub user_id: String,
    pub anniversary_id: String,
    pub channels: Vec<ReminderChannel>,
    pub occurrence_date: NaiveDate,
    pub scheduled_at: i64,
}

impl ReminderDispatchDTO {
    pub fn new(dispatch: &ReminderDispatch) -> Self {
        Self {
            dedupe_key: dispatch.dedupe_key(),
            rule_id: dispatch.rule_id.to_string(),
            slot_id: dispatch.slot_id.to_string(),
            user_id: dispatch.user_id.to_string(),
            anniversary_id: dispatch.anniversary_id.to_string(),
            channels: dispatch.channels.clone(),
            occurrence_date: dispatch.occurrence_date,
            scheduled_at: dispatch.scheduled_at,
        }
    }
}

const WEBHOOK_KEY_HEADER: &str = "anniv-scheduler-webhook-key";

/// Posts every dispatch as json to a configured webhook
pub struct WebhookNotifier {
    client: Client,
    url: Url,
    key: String,
}

impl WebhookNotifier {
    /// Fails on a malformed url or when the http client cannot be built
    pub fn new(url: &str, key: String, timeout: Duration) -> anyhow::Result<Self> {
        let url = Url::parse(url)?;
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, url, key })
    }
}

#[async_trait::async_trait]
impl INotifier for WebhookNotifier {
    async fn dispatch(&self, dispatch: &ReminderDispatch) -> anyhow::Result<()> {
        let body = ReminderDispatchDTO::new(dispatch);
        match self
            .client
            .post(self.url.clone())
            .header(WEBHOOK_KEY_HEADER, &self.key)
            .json(&body)
            .send()
            .await
        {
            Ok(res) => {
                res.error_for_status().map_err(|e| {
                    error!(
                        "[Unexpected Response] Reminder webhook rejected dispatch {}. Error message: {:?}",
                        body.dedupe_key, e
                    );
                    anyhow::Error::new(e)
                })?;
                Ok(())
            }
            Err(e) => {
                error!(
                    "[Network Error] Reminder webhook unreachable for dispatch {}. Error message: {:?}",
                    body.dedupe_key, e
                );
                Err(anyhow::Error::new(e))
            }
        }
    }
}

/// Only logs dispatches, used when no webhook is configured
pub struct LogNotifier {}

#[async_trait::async_trait]
impl INotifier for LogNotifier {
    async fn dispatch(&self, dispatch: &ReminderDispatch) -> anyhow::Result<()> {
        let body = ReminderDispatchDTO::new(dispatch);
        info!(
            dedupe_key = %body.dedupe_key,
            user_id = %body.user_id,
            occurrence_date = %body.occurrence_date,
            "Reminder dispatch: {}",
            serde_json::to_string(&body)?
        );
        Ok(())
    }
}
