//! Webhook notification: a `POST` with a small JSON payload per start/stop
//! event, optionally behind basic auth.

use async_trait::async_trait;
use chrono::{DateTime, Local};
use reqwest::Client;
use serde::Serialize;

use crate::{api::client, config::WebhookSettings, integrations::Integration, prelude::*};

pub struct Webhook {
    client: Client,
    settings: WebhookSettings,
    instance_name: String,
}

#[derive(Serialize)]
struct Event<'a> {
    event: &'a str,
    name: &'a str,
    timestamp: DateTime<Local>,
}

impl Webhook {
    pub fn try_new(settings: WebhookSettings, instance_name: String) -> Result<Self> {
        Ok(Self { client: client::try_new()?, settings, instance_name })
    }

    async fn send(&self, event: &str) -> Result {
        let payload =
            Event { event, name: &self.instance_name, timestamp: Local::now() };
        let mut request = self.client.post(&self.settings.url).json(&payload);
        if let (Some(username), Some(password)) =
            (&self.settings.username, &self.settings.password)
        {
            request = request.basic_auth(username, Some(password));
        }
        request
            .send()
            .await
            .context("failed to send the webhook request")?
            .error_for_status()
            .context("the webhook endpoint rejected the event")?;
        Ok(())
    }
}

#[async_trait]
impl Integration for Webhook {
    fn name(&self) -> &'static str {
        "webhook"
    }

    async fn turn_on(&self) -> Result {
        self.send("start").await
    }

    async fn turn_off(&self) -> Result {
        self.send("stop").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_payload_shape() {
        let payload = Event { event: "start", name: "attic-heater", timestamp: Local::now() };
        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(value["event"], "start");
        assert_eq!(value["name"], "attic-heater");
        assert!(value["timestamp"].is_string());
    }
}
