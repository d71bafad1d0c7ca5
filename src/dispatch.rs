//! Fans one start/stop event out to every configured integration. Each
//! integration gets its own retry policy, and a failing one never blocks or
//! cancels its sibling: whatever happens here stays here, the scheduler only
//! ever sees logs.

use crate::{
    config::Settings,
    integrations::{Integration, shelly::SmartPlug, webhook::Webhook},
    prelude::*,
    retry::RetryPolicy,
};

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Action {
    Start,
    Stop,
}

pub struct ActionDispatcher {
    integrations: Vec<(Box<dyn Integration>, RetryPolicy)>,
}

impl ActionDispatcher {
    pub fn try_from_settings(settings: &Settings) -> Result<Self> {
        let mut integrations: Vec<(Box<dyn Integration>, RetryPolicy)> = Vec::new();
        if let Some(plug) = &settings.device.smart_plug {
            integrations.push((Box::new(SmartPlug::try_new(plug.clone())?), plug.retry));
        }
        if let Some(webhook) = &settings.device.webhook {
            integrations.push((
                Box::new(Webhook::try_new(webhook.clone(), settings.name.clone())?),
                webhook.retry,
            ));
        }
        Ok(Self { integrations })
    }

    #[cfg(test)]
    pub fn from_integrations(
        integrations: Vec<(Box<dyn Integration>, RetryPolicy)>,
    ) -> Self {
        Self { integrations }
    }

    pub fn is_empty(&self) -> bool {
        self.integrations.is_empty()
    }

    pub async fn on_start(&self) {
        self.dispatch(Action::Start).await;
    }

    pub async fn on_stop(&self) {
        self.dispatch(Action::Stop).await;
    }

    pub async fn dispatch(&self, action: Action) {
        for (integration, retry) in &self.integrations {
            let integration = &**integration;
            let outcome = retry
                .run(move || async move {
                    match action {
                        Action::Start => integration.turn_on().await,
                        Action::Stop => integration.turn_off().await,
                    }
                })
                .await;
            match outcome {
                Ok(()) => {
                    info!(integration = integration.name(), ?action, "action delivered");
                }
                Err(error) => {
                    error!(
                        integration = integration.name(),
                        ?action,
                        error = format!("{error:#}"),
                        "integration failed, continuing with the others",
                    );
                }
            }
        }
    }
}
