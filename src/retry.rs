use std::{future::Future, time::Duration};

use serde_with::serde_as;
use tokio::time::sleep;

use crate::prelude::*;

/// Bounded retry with a fixed delay between attempts. No backoff: the
/// providers this wraps either recover within a couple of minutes or stay
/// down for the day.
#[serde_as]
#[derive(Copy, Clone, Debug, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RetryPolicy {
    #[serde(default = "RetryPolicy::default_attempts")]
    pub attempts: u32,

    #[serde_as(as = "serde_with::DurationSeconds<u64>")]
    #[serde(rename = "delay_seconds", default = "RetryPolicy::default_delay")]
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { attempts: Self::default_attempts(), delay: Self::default_delay() }
    }
}

impl RetryPolicy {
    const fn default_attempts() -> u32 {
        3
    }

    const fn default_delay() -> Duration {
        Duration::from_secs(10)
    }

    /// Run the operation until it succeeds or the attempts are exhausted,
    /// sleeping for the configured delay after every failed attempt but the
    /// last. Exhaustion yields the final error.
    pub async fn run<T, F, Fut>(self, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let attempts = self.attempts.max(1);
        let mut attempt = 1;
        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(error) if attempt < attempts => {
                    warn!(attempt, error = format!("{error:#}"), "attempt failed, retrying…");
                    attempt += 1;
                    sleep(self.delay).await;
                }
                Err(error) => return Err(error),
            }
        }
    }
}
