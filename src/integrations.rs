pub mod shelly;
pub mod webhook;

use async_trait::async_trait;

use crate::prelude::*;

/// A destination for start/stop events: the plug that actually powers the
/// device, or a webhook that tells some other system about it. Integrations
/// are independent of each other; the dispatcher guards every call.
#[async_trait]
pub trait Integration: Send + Sync {
    fn name(&self) -> &'static str;

    async fn turn_on(&self) -> Result;

    async fn turn_off(&self) -> Result;
}
