//! Helpers for the application's captured-email test endpoint.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use testkit_core::{Error, Result};

use crate::client::{HttpTestClient, RequestOptions};

/// Endpoint listing captured outbound emails.
pub const OUTBOX_PATH: &str = "/__test__/emails";

/// Endpoint discarding captured emails.
pub const OUTBOX_CLEAR_PATH: &str = "/__test__/emails/clear";

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// One email captured by the application under test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailRecord {
    #[serde(default)]
    pub to: Vec<String>,
    #[serde(default)]
    pub from: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub html: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
}

/// Reads and clears the application's test outbox over HTTP.
pub struct Outbox {
    client: HttpTestClient,
}

impl Outbox {
    pub fn new(client: &HttpTestClient) -> Self {
        Self {
            client: client.clone(),
        }
    }

    /// All captured emails, oldest first.
    pub async fn list(&self) -> Result<Vec<EmailRecord>> {
        let response = self
            .client
            .get_with(
                OUTBOX_PATH,
                RequestOptions {
                    expected_status: Some(vec![200]),
                    ..RequestOptions::default()
                },
            )
            .await?;
        response.json()
    }

    /// Discards every captured email.
    pub async fn clear(&self) -> Result<()> {
        self.client
            .post_with(
                OUTBOX_CLEAR_PATH,
                RequestOptions {
                    expected_status: Some(vec![200, 204]),
                    ..RequestOptions::default()
                },
            )
            .await?;
        Ok(())
    }

    /// Polls until an email matching the predicate shows up.
    pub async fn wait_for<F>(&self, predicate: F, timeout: Duration) -> Result<EmailRecord>
    where
        F: Fn(&EmailRecord) -> bool,
    {
        let start = Instant::now();
        loop {
            if let Some(email) = self.list().await?.into_iter().find(|e| predicate(e)) {
                return Ok(email);
            }
            if start.elapsed() >= timeout {
                return Err(Error::Timeout {
                    elapsed_ms: timeout.as_millis() as u64,
                });
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    /// Shortcut for the common wait: any email to one recipient.
    pub async fn wait_for_recipient(
        &self,
        address: &str,
        timeout: Duration,
    ) -> Result<EmailRecord> {
        let address = address.to_string();
        self.wait_for(move |email| email.to.iter().any(|to| to == &address), timeout)
            .await
    }
}
