use crate::prelude::*;

use async_trait::async_trait;
use std::time::Duration;

// Link {{{
#[async_trait]
pub trait Link {
    async fn is_up(&mut self) -> bool;

    /// Kicks off a reconnect. Bounded; never waits for the link to come back.
    async fn reconnect(&mut self);

    /// Housekeeping slot, called every tick and between metrics during a poll.
    async fn service(&mut self);
} // }}}

// NetworkLink {{{
/// Watches the operational state of one interface via sysfs. Association and
/// DHCP belong to the OS; all this does is notice when the link drops.
pub struct NetworkLink {
    interface: Option<String>,
    reconnect_delay: Duration,
}

impl NetworkLink {
    pub fn new(config: &config::Network) -> Self {
        Self {
            interface: config.interface().map(str::to_owned),
            reconnect_delay: config.reconnect_delay(),
        }
    }

    pub fn interface(&self) -> Option<&str> {
        self.interface.as_deref()
    }

    /// Polls `is_up` until it reports true or `limit` passes.
    pub async fn wait_until_up(&mut self, limit: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + limit;

        loop {
            if self.is_up().await {
                return true;
            }
            if tokio::time::Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }
}

#[async_trait]
impl Link for NetworkLink {
    async fn is_up(&mut self) -> bool {
        let Some(interface) = &self.interface else {
            return true;
        };

        let path = format!("/sys/class/net/{}/operstate", interface);
        match tokio::fs::read_to_string(&path).await {
            Ok(state) => state.trim() == "up",
            Err(e) => {
                debug!("reading {}: {}", path, e);
                false
            }
        }
    }

    async fn reconnect(&mut self) {
        info!(
            "{} disconnected. Waiting {}ms for it to come back...",
            self.interface.as_deref().unwrap_or("network"),
            self.reconnect_delay.as_millis()
        );
        tokio::time::sleep(self.reconnect_delay).await;
    }

    async fn service(&mut self) {
        tokio::task::yield_now().await;
    }
} // }}}
