use std::time::Duration;

use reqwest::Client;
use serde::Serialize;
use shared::shared_wheel_game::HostAction;

use crate::error::Error;

const CALLBACK_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Serialize)]
struct ActionBatch<'a> {
    chat_id: i64,
    actions: &'a [HostAction],
}

/// Pushes deferred actions to the host's callback endpoint.
#[derive(Debug, Clone)]
pub struct HostClient {
    client: Client,
    callback_url: Option<String>,
}

impl HostClient {
    pub fn new(callback_url: Option<String>) -> Self {
        Self {
            client: Client::new(),
            callback_url,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.callback_url.is_some()
    }

    pub async fn deliver(&self, chat_id: i64, actions: &[HostAction]) -> Result<(), Error> {
        let Some(url) = self.callback_url.as_deref() else {
            return Ok(());
        };

        self.client
            .post(url)
            .timeout(CALLBACK_TIMEOUT)
            .json(&ActionBatch { chat_id, actions })
            .send()
            .await?
            .error_for_status()?;

        tracing::debug!(chat_id, "Delivered {} action(s)", actions.len());
        Ok(())
    }
}
