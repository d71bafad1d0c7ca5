//! Smart plug control over the Shelly Gen1 local HTTP API:
//! `GET /relay/0?turn=on|off`, optionally behind basic auth.

use async_trait::async_trait;
use reqwest::Client;

use crate::{api::client, config::SmartPlugSettings, integrations::Integration, prelude::*};

pub struct SmartPlug {
    client: Client,
    settings: SmartPlugSettings,
}

impl SmartPlug {
    pub fn try_new(settings: SmartPlugSettings) -> Result<Self> {
        Ok(Self { client: client::try_new()?, settings })
    }

    async fn switch(&self, turn: &str) -> Result {
        let url = format!("{}/relay/0", self.settings.url.trim_end_matches('/'));
        let mut request = self.client.get(url).query(&[("turn", turn)]);
        if let (Some(username), Some(password)) =
            (&self.settings.username, &self.settings.password)
        {
            request = request.basic_auth(username, Some(password));
        }
        request
            .send()
            .await
            .context("failed to reach the smart plug")?
            .error_for_status()
            .context("the smart plug rejected the request")?;
        Ok(())
    }
}

#[async_trait]
impl Integration for SmartPlug {
    fn name(&self) -> &'static str {
        "smart-plug"
    }

    async fn turn_on(&self) -> Result {
        self.switch("on").await
    }

    async fn turn_off(&self) -> Result {
        self.switch("off").await
    }
}
